// Sentence embeddings for the bridge
// - assets: model identifier -> model/tokenizer files
// - backend: the capability each platform implements
// - text: ONNX Runtime backend (linked on desktop, loaded from the app bundle on mobile)

pub mod assets;
pub mod backend;
pub mod download;

pub mod text;

use thiserror::Error;

pub use assets::ModelAsset;
pub use backend::{EmbeddingBackend, ModelOptions};
pub use text::TextBackend;

/// One embedding produced by a backend.
/// Quantized embeddings hold scalar-quantized components in [-128, 127].
#[derive(Debug, Clone, PartialEq)]
pub enum Embedding {
    Float(Vec<f32>),
    Quantized(Vec<i8>),
}

#[derive(Error, Debug, PartialEq)]
pub enum SimilarityError {
    #[error("Cannot compare embeddings of different dimensions ({0} vs {1})")]
    LengthMismatch(usize, usize),

    #[error("Cannot compare a quantized embedding with a float embedding")]
    MixedKinds,

    #[error("Cannot compute cosine similarity of a zero-norm embedding")]
    ZeroNorm,
}

impl Embedding {
    /// Scalar-quantize an L2-normalized vector to i8
    pub fn quantize(values: &[f32]) -> Self {
        Embedding::Quantized(
            values
                .iter()
                .map(|v| (v * 128.0).round().clamp(-128.0, 127.0) as i8)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Embedding::Float(v) => v.len(),
            Embedding::Quantized(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_quantized(&self) -> bool {
        matches!(self, Embedding::Quantized(_))
    }

    /// Float components; quantized components are widened one by one
    pub fn into_f32_vec(self) -> Vec<f32> {
        match self {
            Embedding::Float(v) => v,
            Embedding::Quantized(v) => v.into_iter().map(f32::from).collect(),
        }
    }

    /// Cosine similarity between two embeddings of the same kind and length
    pub fn cosine_similarity(&self, other: &Embedding) -> Result<f64, SimilarityError> {
        match (self, other) {
            (Embedding::Float(a), Embedding::Float(b)) => cosine(a, b),
            (Embedding::Quantized(a), Embedding::Quantized(b)) => cosine(a, b),
            _ => Err(SimilarityError::MixedKinds),
        }
    }
}

fn cosine<T: Copy + Into<f64>>(a: &[T], b: &[T]) -> Result<f64, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::LengthMismatch(a.len(), b.len()));
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y): (f64, f64) = (x.into(), y.into());
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SimilarityError::ZeroNorm);
    }

    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}
