//! Method-call channel: named operations with JSON arguments in, uniform results out.
//!
//! | method             | arguments                          | success value                     |
//! |--------------------|------------------------------------|-----------------------------------|
//! | `initialize`       | `modelPath?: string, quantize?: bool` | `{success, message}`           |
//! | `embed`            | `text: string`                     | `[float]`                         |
//! | `cosineSimilarity` | `text1: string, text2: string`     | `float`                           |
//! | `getModelInfo`     |                                    | `{initialized, platform, mediapipe_version}` |
//! | `dispose`          |                                    | `true`                            |
//!
//! Any other method name yields [`MethodResult::NotImplemented`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::bridge::Bridge;
use crate::embedding::EmbeddingBackend;
use crate::error::{BridgeError, MethodError};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// String argument; a value of any other JSON type counts as absent
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }

    pub fn bool_arg(&self, key: &str) -> Option<bool> {
        self.arguments.get(key).and_then(Value::as_bool)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResult {
    Success { value: Value },
    Error(MethodError),
    /// The method name itself is unknown
    NotImplemented,
}

impl MethodResult {
    pub fn is_success(&self) -> bool {
        matches!(self, MethodResult::Success { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            MethodResult::Success { value } => Some(value),
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            MethodResult::Error(e) => Some(e.code.as_str()),
            _ => None,
        }
    }
}

impl From<crate::error::Result<Value>> for MethodResult {
    fn from(outcome: crate::error::Result<Value>) -> Self {
        match outcome {
            Ok(value) => MethodResult::Success { value },
            Err(e) => {
                log::debug!("Method failed with {}: {}", e.code(), e);
                MethodResult::Error(e.into())
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Initialize,
    Embed,
    CosineSimilarity,
    GetModelInfo,
    Dispose,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Method::Initialize),
            "embed" => Some(Method::Embed),
            "cosineSimilarity" => Some(Method::CosineSimilarity),
            "getModelInfo" => Some(Method::GetModelInfo),
            "dispose" => Some(Method::Dispose),
            _ => None,
        }
    }
}

impl<B: EmbeddingBackend> Bridge<B> {
    /// Dispatch one call. Never panics on bad input; every failure becomes a result.
    pub fn handle_call(&mut self, call: &MethodCall) -> MethodResult {
        let Some(method) = Method::from_name(&call.method) else {
            log::debug!("Unknown method {:?}", call.method);
            return MethodResult::NotImplemented;
        };

        let outcome = match method {
            Method::Initialize => self
                .initialize(
                    call.str_arg("modelPath"),
                    call.bool_arg("quantize").unwrap_or(false),
                )
                .map(|status| json!({ "success": status.success, "message": status.message })),
            Method::Embed => self.embed(call.str_arg("text")).map(Value::from),
            Method::CosineSimilarity => self
                .cosine_similarity(call.str_arg("text1"), call.str_arg("text2"))
                .map(Value::from),
            Method::GetModelInfo => self
                .model_info()
                .and_then(|info| serde_json::to_value(info).map_err(BridgeError::Info)),
            Method::Dispose => self.dispose().map(Value::Bool),
        };

        outcome.into()
    }
}

/// Serve JSON-lines method calls until `reader` reaches EOF.
/// One call per line in, one result per line out; blank lines are skipped.
pub async fn serve_lines<B, R, W>(bridge: &mut Bridge<B>, reader: R, mut writer: W) -> Result<()>
where
    B: EmbeddingBackend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.split(b'\n');

    while let Some(raw) = lines.next_segment().await.context("Failed to read call")? {
        let result = match String::from_utf8(raw) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<MethodCall>(line) {
                    Ok(call) => bridge.handle_call(&call),
                    Err(e) => malformed(e),
                }
            }
            Err(e) => malformed(e),
        };

        let mut out = serde_json::to_vec(&result).context("Failed to encode result")?;
        out.push(b'\n');
        writer.write_all(&out).await.context("Failed to write result")?;
        writer.flush().await.context("Failed to flush result")?;
    }

    Ok(())
}

fn malformed(e: impl std::fmt::Display) -> MethodResult {
    MethodResult::Error(MethodError::new(
        "INVALID_ARGUMENT",
        format!("Malformed method call: {}", e),
    ))
}
