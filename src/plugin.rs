//! Tauri v2 plugin exposing the bridge to the webview.
//!
//! Register with `.plugin(text_embedder_lib::init())`. Optional settings live
//! under `plugins.text-embedder` in `tauri.conf.json` (see [`EmbedderConfig`]);
//! a relative `assetsDir` is resolved against the app's resource directory.
//! Besides the typed commands, `invoke` accepts a raw method call and returns
//! the full [`MethodResult`], including the not-implemented signal.

use std::path::Path;

use serde_json::Value;
use tauri::plugin::{Builder, TauriPlugin};
use tauri::{AppHandle, Emitter, Manager, Runtime, State};
use tokio::sync::Mutex;

use crate::bridge::{Bridge, InitStatus, ModelInfo};
use crate::channel::{MethodCall, MethodResult};
use crate::config::EmbedderConfig;
use crate::embedding::{download, TextBackend};
use crate::error::MethodError;

pub const PLUGIN_NAME: &str = "text-embedder";
pub const DOWNLOAD_PROGRESS_EVENT: &str = "download_progress";

/// Managed state: the platform bridge behind an async mutex, one request at a time
pub struct EmbedderState {
    bridge: Mutex<Bridge<TextBackend>>,
}

impl EmbedderState {
    pub fn new(bridge: Bridge<TextBackend>) -> Self {
        Self {
            bridge: Mutex::new(bridge),
        }
    }
}

// Commands

#[tauri::command]
async fn initialize(
    state: State<'_, EmbedderState>,
    model_path: Option<String>,
    quantize: Option<bool>,
) -> Result<InitStatus, MethodError> {
    let mut bridge = state.bridge.lock().await;
    Ok(bridge.initialize(model_path.as_deref(), quantize.unwrap_or(false))?)
}

#[tauri::command]
async fn embed(
    state: State<'_, EmbedderState>,
    text: Option<String>,
) -> Result<Vec<f32>, MethodError> {
    let mut bridge = state.bridge.lock().await;
    Ok(bridge.embed(text.as_deref())?)
}

#[tauri::command]
async fn cosine_similarity(
    state: State<'_, EmbedderState>,
    text1: Option<String>,
    text2: Option<String>,
) -> Result<f64, MethodError> {
    let mut bridge = state.bridge.lock().await;
    Ok(bridge.cosine_similarity(text1.as_deref(), text2.as_deref())?)
}

#[tauri::command]
async fn get_model_info(state: State<'_, EmbedderState>) -> Result<ModelInfo, MethodError> {
    let bridge = state.bridge.lock().await;
    Ok(bridge.model_info()?)
}

#[tauri::command]
async fn dispose(state: State<'_, EmbedderState>) -> Result<bool, MethodError> {
    let mut bridge = state.bridge.lock().await;
    Ok(bridge.dispose()?)
}

/// Fetch a known model into the assets directory, emitting `download_progress` events
#[tauri::command]
async fn download_model<R: Runtime>(
    app: AppHandle<R>,
    state: State<'_, EmbedderState>,
    model: Option<String>,
) -> Result<String, MethodError> {
    let (assets_dir, id) = model_assets_dir(state.bridge.lock().await.config(), model.as_deref());
    let spec = download::find_model(&id).ok_or_else(|| {
        MethodError::new("MODEL_NOT_FOUND", format!("No download source known for model {}", id))
    })?;

    let dir = download::download_model(&assets_dir, spec, |progress| {
        let _ = app.emit(DOWNLOAD_PROGRESS_EVENT, progress);
    })
    .await
    .map_err(|e| MethodError {
        code: "DOWNLOAD_ERROR".to_string(),
        message: format!("Failed to download model {}: {}", id, e),
        details: Some(format!("{:?}", e)),
    })?;

    Ok(dir.to_string_lossy().into_owned())
}

#[tauri::command]
async fn invoke(
    state: State<'_, EmbedderState>,
    method: String,
    arguments: Option<Value>,
) -> Result<MethodResult, MethodError> {
    let call = MethodCall::new(method, arguments.unwrap_or(Value::Null));
    let mut bridge = state.bridge.lock().await;
    Ok(bridge.handle_call(&call))
}

pub fn init<R: Runtime>() -> TauriPlugin<R, Option<EmbedderConfig>> {
    Builder::<R, Option<EmbedderConfig>>::new(PLUGIN_NAME)
        .invoke_handler(tauri::generate_handler![
            initialize,
            download_model,
            embed,
            cosine_similarity,
            get_model_info,
            dispose,
            invoke
        ])
        .setup(|app, api| {
            let config = api.config().clone().unwrap_or_default();
            let config = if config.assets_dir.is_relative() {
                with_resource_dir(config, &app.path().resource_dir()?)
            } else {
                config
            };

            log::info!(
                "Text embedder plugin ready (assets: {:?}, default model: {})",
                config.assets_dir,
                config.default_model
            );
            app.manage(EmbedderState::new(Bridge::new(TextBackend::new(), config)));
            Ok(())
        })
        .on_drop(|app| {
            // Engine detach: release now rather than whenever the state is dropped
            let Some(state) = app.try_state::<EmbedderState>() else {
                return;
            };
            match state.bridge.try_lock() {
                Ok(mut bridge) => bridge.teardown(),
                Err(_) => log::warn!("Text embedder busy during teardown; model released on drop"),
            };
        })
        .build()
}

/// Anchor a relative `assetsDir` at the app's resource directory
fn with_resource_dir(config: EmbedderConfig, resource_dir: &Path) -> EmbedderConfig {
    if config.assets_dir.is_relative() {
        let assets_dir = resource_dir.join(&config.assets_dir);
        config.with_assets_dir(assets_dir)
    } else {
        config
    }
}

/// Assets directory and model id a download targets; defaults to the configured model
fn model_assets_dir(config: &EmbedderConfig, model: Option<&str>) -> (std::path::PathBuf, String) {
    let id = match model {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => config.default_model.clone(),
    };
    (config.assets_dir.clone(), id)
}
