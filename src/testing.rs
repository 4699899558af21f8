// Scripted backend and asset fixtures shared by unit tests

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use crate::embedding::assets::{MODEL_FILE, TOKENIZER_FILE};
use crate::embedding::{Embedding, EmbeddingBackend, ModelOptions};

const DIMENSION: usize = 8;

#[derive(Default, Clone)]
pub struct Counters {
    pub loads: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
    pub inferences: Arc<AtomicUsize>,
}

impl Counters {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn inferences(&self) -> usize {
        self.inferences.load(Ordering::SeqCst)
    }
}

pub struct FakeHandle {
    pub options: ModelOptions,
}

/// Deterministic stand-in for a native runtime
#[derive(Default)]
pub struct FakeBackend {
    pub counters: Counters,
    pub fail_load: bool,
    pub fail_release: bool,
    /// Inference succeeds with zero embeddings
    pub no_results: bool,
    /// Inference on this exact text raises
    pub fail_on: Option<String>,
    /// Vector length follows the text length instead of a fixed dimension
    pub ragged: bool,
}

impl FakeBackend {
    pub fn new() -> (Self, Counters) {
        let backend = Self::default();
        let counters = backend.counters.clone();
        (backend, counters)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let dim = if self.ragged { text.len() } else { DIMENSION };
        let mut v = vec![1.0f32; dim];
        for (i, b) in text.bytes().enumerate() {
            v[i % dim] += f32::from(b) / 255.0;
        }
        v
    }
}

impl EmbeddingBackend for FakeBackend {
    type Handle = FakeHandle;

    fn load(&mut self, options: &ModelOptions) -> Result<FakeHandle> {
        if self.fail_load {
            bail!("corrupt model file");
        }
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        Ok(FakeHandle {
            options: options.clone(),
        })
    }

    fn embed(&mut self, handle: &mut FakeHandle, text: &str) -> Result<Vec<Embedding>> {
        self.counters.inferences.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.as_deref() == Some(text) {
            bail!("interpreter crashed");
        }
        if self.no_results {
            return Ok(Vec::new());
        }

        let v = self.vector_for(text);
        if handle.options.quantize {
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            let unit: Vec<f32> = v.iter().map(|x| x / norm).collect();
            Ok(vec![Embedding::quantize(&unit)])
        } else {
            Ok(vec![Embedding::Float(v)])
        }
    }

    fn release(&mut self, _handle: FakeHandle) -> Result<()> {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            bail!("close failed");
        }
        Ok(())
    }
}

/// Assets directory holding one model directory per name
pub fn assets_with(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        write_model(dir.path(), name);
    }
    dir
}

fn write_model(root: &Path, name: &str) {
    let model_dir = root.join(name);
    fs::create_dir_all(&model_dir).unwrap();
    fs::write(model_dir.join(MODEL_FILE), b"onnx").unwrap();
    fs::write(model_dir.join(TOKENIZER_FILE), b"{}").unwrap();
}
