use super::{Embedding, ModelAsset};

/// Everything a backend needs to construct a model handle
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    pub asset: ModelAsset,
    /// Produce scalar-quantized embeddings instead of floats
    pub quantize: bool,
}

/// Native embedding runtime for one platform.
///
/// The bridge owns at most one `Handle` at a time and hands it back through
/// `release` exactly once. Calls are synchronous and run to completion.
pub trait EmbeddingBackend {
    type Handle;

    fn load(&mut self, options: &ModelOptions) -> anyhow::Result<Self::Handle>;

    /// Run inference on one text. An empty result is not an error here.
    fn embed(&mut self, handle: &mut Self::Handle, text: &str) -> anyhow::Result<Vec<Embedding>>;

    fn release(&mut self, handle: Self::Handle) -> anyhow::Result<()>;
}
