// Text embedding backend on ONNX Runtime
// Sentence-transformer models: HuggingFace tokenizer, mean pooling, L2 normalization

use anyhow::{anyhow, bail, Context, Result};
use ndarray::{Array1, Array2, ArrayViewD};
use ort::{session::Session, value::Tensor};
use tokenizers::Tokenizer;

use super::{Embedding, EmbeddingBackend, ModelOptions};

const NORM_EPS: f32 = 1e-12;

/// A loaded sentence-transformer model
pub struct OnnxModel {
    session: Session,
    tokenizer: Tokenizer,
    output_name: String,
    /// BERT-style exports take token_type_ids, others reject it
    token_types: bool,
    quantize: bool,
}

impl OnnxModel {
    /// Load model and tokenizer from files
    pub fn new(options: &ModelOptions) -> Result<Self> {
        let asset = &options.asset;
        log::info!("Loading text embedding model from {:?}", asset.model);
        log::info!("Loading tokenizer from {:?}", asset.tokenizer);

        let session = Session::builder()
            .context("Failed to create session builder")?
            .commit_from_file(&asset.model)
            .with_context(|| format!("Failed to load text model {:?}", asset.model))?;

        let tokenizer = Tokenizer::from_file(&asset.tokenizer)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

        log::debug!("Text model inputs: {:?}", session.inputs);
        log::debug!("Text model outputs: {:?}", session.outputs);

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "last_hidden_state".to_string());
        let token_types = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        Ok(Self {
            session,
            tokenizer,
            output_name,
            token_types,
            quantize: options.quantize,
        })
    }

    pub fn embed_text(&mut self, text: &str) -> Result<Embedding> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        let ids: Vec<i64> = encoding.get_ids().iter().map(|&x| x as i64).collect();
        let attention: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| x as i64)
            .collect();
        let seq_len = ids.len();

        log::debug!("Tokenized to {} tokens", seq_len);

        let input_ids = Array2::from_shape_vec((1, seq_len), ids)
            .context("Failed to create input_ids array")?;
        let attention_mask = Array2::from_shape_vec((1, seq_len), attention)
            .context("Failed to create attention_mask array")?;

        let input_ids_tensor =
            Tensor::from_array(input_ids).context("Failed to create input_ids tensor")?;
        let attention_mask_tensor = Tensor::from_array(attention_mask.clone())
            .context("Failed to create attention_mask tensor")?;

        let output_name = self.output_name.clone();
        let outputs = if self.token_types {
            // token_type_ids: all zeros for single-sentence input
            let token_type_ids_tensor = Tensor::from_array(Array2::<i64>::zeros((1, seq_len)))
                .context("Failed to create token_type_ids tensor")?;
            self.session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "token_type_ids" => token_type_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])
        } else {
            self.session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])
        }
        .context("Inference failed")?;

        let output = outputs
            .get(&output_name)
            .ok_or_else(|| anyhow!("Output '{}' not found", output_name))?;

        let hidden = output
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let shape = hidden.shape().to_vec();
        log::debug!("Text output shape: {:?}", shape);

        let pooled = match shape.len() {
            3 => {
                let attention_f32 = attention_mask.mapv(|x| x as f32);
                mean_pooling(&hidden, &attention_f32, seq_len, shape[2])
            }
            // Already pooled
            2 => Array1::from_iter((0..shape[1]).map(|i| hidden[[0, i]])),
            _ => bail!("Unexpected output shape: {:?}", shape),
        };

        let values = l2_normalize(pooled)?.to_vec();
        if self.quantize {
            Ok(Embedding::quantize(&values))
        } else {
            Ok(Embedding::Float(values))
        }
    }
}

/// Mean pooling over token embeddings using attention mask
fn mean_pooling(
    hidden: &ArrayViewD<f32>,
    attention_mask: &Array2<f32>,
    seq_len: usize,
    hidden_dim: usize,
) -> Array1<f32> {
    let mut pooled = Array1::<f32>::zeros(hidden_dim);
    let mut total_weight = 0.0f32;

    for i in 0..seq_len {
        let weight = attention_mask[[0, i]];
        total_weight += weight;
        for j in 0..hidden_dim {
            pooled[j] += hidden[[0, i, j]] * weight;
        }
    }

    let divisor = total_weight.max(1e-9);
    pooled.mapv(|x| x / divisor)
}

fn l2_normalize(embedding: Array1<f32>) -> Result<Array1<f32>> {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < NORM_EPS {
        bail!("Zero-norm embedding");
    }
    Ok(embedding.mapv(|x| x / norm))
}

/// ONNX Runtime backend for every target
#[derive(Default)]
pub struct TextBackend;

impl TextBackend {
    pub fn new() -> Self {
        Self
    }
}

impl EmbeddingBackend for TextBackend {
    type Handle = OnnxModel;

    fn load(&mut self, options: &ModelOptions) -> Result<OnnxModel> {
        OnnxModel::new(options)
    }

    fn embed(&mut self, handle: &mut OnnxModel, text: &str) -> Result<Vec<Embedding>> {
        handle.embed_text(text).map(|embedding| vec![embedding])
    }

    fn release(&mut self, handle: OnnxModel) -> Result<()> {
        drop(handle);
        log::info!("Text embedding model released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_mean_pooling_skips_masked_tokens() {
        // Two real tokens and one padding token
        let hidden = Array3::from_shape_vec(
            (1, 3, 2),
            vec![1.0, 2.0, 3.0, 4.0, 100.0, 100.0],
        )
        .unwrap()
        .into_dyn();
        let mask = Array2::from_shape_vec((1, 3), vec![1.0, 1.0, 0.0]).unwrap();

        let pooled = mean_pooling(&hidden.view(), &mask, 3, 2);
        assert_eq!(pooled.to_vec(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_l2_normalize() {
        let normalized = l2_normalize(Array1::from_vec(vec![3.0, 4.0])).unwrap();
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);

        assert!(l2_normalize(Array1::zeros(4)).is_err());
    }

    #[test]
    fn test_load_reports_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let options = ModelOptions {
            asset: crate::embedding::ModelAsset {
                model: dir.path().join("model.onnx"),
                tokenizer: dir.path().join("tokenizer.json"),
            },
            quantize: false,
        };

        let err = match TextBackend::new().load(&options) {
            Ok(_) => panic!("loaded a model from an empty directory"),
            Err(e) => format!("{:#}", e),
        };
        assert!(err.contains("model.onnx"), "{}", err);
    }

    #[test]
    fn test_backend_handle_is_onnx_model() {
        // Same backend on every target, mobile included
        let load: fn(&mut TextBackend, &ModelOptions) -> Result<OnnxModel> =
            <TextBackend as EmbeddingBackend>::load;
        let release: fn(&mut TextBackend, OnnxModel) -> Result<()> =
            <TextBackend as EmbeddingBackend>::release;
        let _ = (load, release);
    }
}
