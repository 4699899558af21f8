//! On-device sentence embeddings behind a method-call bridge.
//!
//! ```text
//! shell (Tauri webview | stdio) -> MethodCall -> Bridge -> EmbeddingBackend
//!                                                  |          (ONNX Runtime)
//!                               MethodResult <-----+
//! ```
//!
//! # Example
//!
//! ```ignore
//! use text_embedder_lib::{Bridge, EmbedderConfig, TextBackend};
//!
//! let mut bridge = Bridge::new(TextBackend::new(), EmbedderConfig::default());
//! bridge.initialize(None, false)?;
//! let vector = bridge.embed(Some("hello"))?;
//! let similarity = bridge.cosine_similarity(Some("hello"), Some("hi there"))?;
//! bridge.dispose()?;
//! ```

pub mod bridge;
pub mod channel;
pub mod config;
pub mod embedding;
pub mod error;
#[cfg(feature = "tauri")]
pub mod plugin;

#[cfg(test)]
mod testing;

pub use bridge::{Bridge, InitStatus, ModelInfo};
pub use channel::{MethodCall, MethodResult};
pub use config::EmbedderConfig;
pub use embedding::TextBackend;
pub use error::{BridgeError, MethodError, Result};
#[cfg(feature = "tauri")]
pub use plugin::init;
