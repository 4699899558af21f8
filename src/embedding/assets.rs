// Model asset resolution
// An identifier names either a model directory (model.onnx + tokenizer.json)
// or a single .onnx file with tokenizer.json beside it.
// Relative identifiers resolve against the configured assets directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
const MODEL_EXTENSION: &str = "onnx";

/// Files backing one loadable model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAsset {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
}

impl ModelAsset {
    fn in_dir(dir: &Path) -> Option<Self> {
        Self::existing(dir.join(MODEL_FILE), dir.join(TOKENIZER_FILE))
    }

    fn from_model_file(model: PathBuf) -> Option<Self> {
        let tokenizer = model.with_file_name(TOKENIZER_FILE);
        Self::existing(model, tokenizer)
    }

    fn existing(model: PathBuf, tokenizer: PathBuf) -> Option<Self> {
        (model.is_file() && tokenizer.is_file()).then_some(Self { model, tokenizer })
    }
}

/// Resolve a model identifier to its files.
/// Returns `None` when any required file is missing.
pub fn resolve(assets_dir: &Path, identifier: &str) -> Option<ModelAsset> {
    let requested = Path::new(identifier);
    let candidate = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        assets_dir.join(requested)
    };

    if candidate.is_dir() {
        return ModelAsset::in_dir(&candidate);
    }

    if candidate.extension().is_some_and(|ext| ext == MODEL_EXTENSION) {
        return ModelAsset::from_model_file(candidate);
    }

    // "name" -> "name.onnx"; appended rather than replaced so "bge-v1.5" stays intact
    let mut with_extension: OsString = candidate.into_os_string();
    with_extension.push(".");
    with_extension.push(MODEL_EXTENSION);
    ModelAsset::from_model_file(PathBuf::from(with_extension))
}
