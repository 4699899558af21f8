//! The embedder bridge: one model handle, five operations.
//!
//! ```text
//! Uninitialized --initialize ok--> Ready --dispose / teardown--> Uninitialized
//!                                  Ready --initialize--> (release) --> Ready | Uninitialized
//! ```
//!
//! Arguments are validated before the state check, so a malformed call never
//! reaches inference. Every operation runs to completion on the caller's
//! thread; there is no timeout and no cancellation.

use serde::{Deserialize, Serialize};

use crate::config::EmbedderConfig;
use crate::embedding::{assets, Embedding, EmbeddingBackend, ModelOptions};
use crate::error::{BridgeError, Result};

/// Runtime version reported by `getModelInfo`. Part of the wire contract.
pub const RUNTIME_VERSION: &str = "0.10.14";

const INIT_MESSAGE: &str = "TextEmbedder initialized successfully";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InitStatus {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelInfo {
    pub initialized: bool,
    pub platform: String,
    #[serde(rename = "mediapipe_version")]
    pub runtime_version: String,
}

pub struct Bridge<B: EmbeddingBackend> {
    backend: B,
    config: EmbedderConfig,
    handle: Option<B::Handle>,
}

impl<B: EmbeddingBackend> Bridge<B> {
    pub fn new(backend: B, config: EmbedderConfig) -> Self {
        Self {
            backend,
            config,
            handle: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.is_some()
    }

    pub fn config(&self) -> &EmbedderConfig {
        &self.config
    }

    /// Load a model, replacing (and first releasing) any loaded one.
    /// `None` or an empty path selects the configured default model.
    pub fn initialize(&mut self, model_path: Option<&str>, quantize: bool) -> Result<InitStatus> {
        if let Err(e) = self.release_handle() {
            log::warn!("Failed to release previous model: {:?}", e);
        }

        let identifier = match model_path {
            Some(path) if !path.is_empty() => path,
            _ => self.config.default_model.as_str(),
        };

        let asset = assets::resolve(&self.config.assets_dir, identifier)
            .ok_or_else(|| BridgeError::ModelNotFound(identifier.to_string()))?;

        log::info!(
            "Initializing text embedder with {:?} (quantize: {})",
            asset.model,
            quantize
        );
        let options = ModelOptions { asset, quantize };
        let handle = self
            .backend
            .load(&options)
            .map_err(BridgeError::Initialization)?;
        self.handle = Some(handle);

        Ok(InitStatus {
            success: true,
            message: INIT_MESSAGE.to_string(),
        })
    }

    /// Embed one non-empty text. Quantized embeddings come back widened to floats.
    pub fn embed(&mut self, text: Option<&str>) -> Result<Vec<f32>> {
        let text = require_text(text, "Text is required", "Text cannot be empty")?;
        let (backend, handle) = self.ready()?;

        log::debug!("Embedding {} bytes of text", text.len());
        let embedding = backend
            .embed(handle, text)
            .map_err(BridgeError::Embedding)?
            .into_iter()
            .next()
            .ok_or(BridgeError::NoEmbedding)?;

        Ok(embedding.into_f32_vec())
    }

    /// Embed both texts and compare them. Not transactional: either inference
    /// failing fails the whole call.
    pub fn cosine_similarity(&mut self, text1: Option<&str>, text2: Option<&str>) -> Result<f64> {
        let text1 = require_text(text1, "Both texts are required", "Texts cannot be empty")?;
        let text2 = require_text(text2, "Both texts are required", "Texts cannot be empty")?;
        let (backend, handle) = self.ready()?;

        let first = first_embedding(backend, handle, text1)?;
        let second = first_embedding(backend, handle, text2)?;

        let (Some(first), Some(second)) = (first, second) else {
            return Err(BridgeError::NoEmbedding);
        };

        first
            .cosine_similarity(&second)
            .map_err(|e| BridgeError::Similarity(e.into()))
    }

    pub fn model_info(&self) -> Result<ModelInfo> {
        if self.handle.is_none() {
            return Err(BridgeError::NotInitialized);
        }

        Ok(ModelInfo {
            initialized: true,
            platform: self.config.platform_name(),
            runtime_version: RUNTIME_VERSION.to_string(),
        })
    }

    /// Release the model if one is loaded. Safe to call repeatedly.
    pub fn dispose(&mut self) -> Result<bool> {
        self.release_handle().map_err(BridgeError::Dispose)?;
        Ok(true)
    }

    /// Forced release when the shell detaches. Never fails.
    pub fn teardown(&mut self) {
        if let Err(e) = self.release_handle() {
            log::warn!("Failed to release model during teardown: {:?}", e);
        }
    }

    fn ready(&mut self) -> Result<(&mut B, &mut B::Handle)> {
        match self.handle.as_mut() {
            Some(handle) => Ok((&mut self.backend, handle)),
            None => Err(BridgeError::NotInitialized),
        }
    }

    // The handle leaves the bridge before release, so a failed release is never retried
    fn release_handle(&mut self) -> anyhow::Result<()> {
        match self.handle.take() {
            Some(handle) => {
                log::info!("Releasing text embedding model");
                self.backend.release(handle)
            }
            None => Ok(()),
        }
    }
}

impl<B: EmbeddingBackend> Drop for Bridge<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn first_embedding<B: EmbeddingBackend>(
    backend: &mut B,
    handle: &mut B::Handle,
    text: &str,
) -> Result<Option<Embedding>> {
    let embeddings = backend
        .embed(handle, text)
        .map_err(BridgeError::Similarity)?;
    Ok(embeddings.into_iter().next())
}

fn require_text<'a>(text: Option<&'a str>, missing: &str, empty: &str) -> Result<&'a str> {
    match text {
        None => Err(BridgeError::InvalidArgument(missing.to_string())),
        Some("") => Err(BridgeError::InvalidArgument(empty.to_string())),
        Some(text) => Ok(text),
    }
}
