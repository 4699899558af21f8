// Model download into the assets directory
// Files land at <assets_dir>/<model id>/, the directory layout assets::resolve expects

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::assets::{MODEL_FILE, TOKENIZER_FILE};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

pub struct ModelFile {
    pub url: &'static str,
    pub filename: &'static str,
    /// Used as the total when the server sends no content length
    pub size_hint: u64,
}

pub struct ModelSpec {
    pub id: &'static str,
    pub files: &'static [ModelFile],
}

pub const KNOWN_MODELS: &[ModelSpec] = &[ModelSpec {
    id: "all-MiniLM-L6-v2",
    files: &[
        ModelFile {
            url: "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx",
            filename: MODEL_FILE,
            size_hint: 90_400_000,
        },
        ModelFile {
            url: "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json",
            filename: TOKENIZER_FILE,
            size_hint: 466_000,
        },
    ],
}];

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct DownloadProgress {
    pub filename: String,
    pub downloaded: u64,
    pub total: u64,
}

pub fn find_model(id: &str) -> Option<&'static ModelSpec> {
    KNOWN_MODELS.iter().find(|spec| spec.id == id)
}

pub fn model_dir(assets_dir: &Path, spec: &ModelSpec) -> PathBuf {
    assets_dir.join(spec.id)
}

/// Download every file of `spec` that is not already present.
/// Existing non-empty files are kept and reported as complete.
pub async fn download_model<F>(
    assets_dir: &Path,
    spec: &ModelSpec,
    mut on_progress: F,
) -> Result<PathBuf>
where
    F: FnMut(&DownloadProgress),
{
    let dir = model_dir(assets_dir, spec);
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;

    for file in spec.files {
        let file_path = dir.join(file.filename);

        if fs::metadata(&file_path).is_ok_and(|m| m.len() > 0) {
            log::info!("File {} already exists, skipping...", file.filename);
            on_progress(&DownloadProgress {
                filename: file.filename.to_string(),
                downloaded: file.size_hint,
                total: file.size_hint,
            });
            continue;
        }

        log::info!("[Download] Starting download of {} to {:?}", file.url, file_path);

        let client = reqwest::Client::new();
        let response = client
            .get(file.url)
            .send()
            .await
            .with_context(|| format!("Request for {} failed", file.filename))?;

        if !response.status().is_success() {
            bail!(
                "Download failed for {} with status: {}",
                file.filename,
                response.status()
            );
        }

        let total = response.content_length().unwrap_or(file.size_hint);

        // Only complete files ever appear under the final name
        let partial_path = file_path.with_extension("part");
        write_stream(&partial_path, response.bytes_stream(), |downloaded| {
            on_progress(&DownloadProgress {
                filename: file.filename.to_string(),
                downloaded,
                total,
            })
        })
        .await?;

        fs::rename(&partial_path, &file_path)
            .with_context(|| format!("Failed to move {:?} into place", partial_path))?;

        on_progress(&DownloadProgress {
            filename: file.filename.to_string(),
            downloaded: total,
            total,
        });

        log::info!("[Download] Successfully saved to {:?}", file_path);
    }

    Ok(dir)
}

/// Copy `stream` into a new file at `path`, reporting the byte count at most every 100ms.
/// On failure the file is removed again.
async fn write_stream<S, B, E, F>(path: &Path, stream: S, on_chunk: F) -> Result<u64>
where
    S: futures_util::Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
    F: FnMut(u64),
{
    let written = copy_stream(path, stream, on_chunk).await;
    if written.is_err() && path.exists() {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("Failed to remove partial download {:?}: {}", path, e);
        }
    }
    written
}

async fn copy_stream<S, B, E, F>(path: &Path, mut stream: S, mut on_chunk: F) -> Result<u64>
where
    S: futures_util::Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
    F: FnMut(u64),
{
    let mut out =
        fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut downloaded: u64 = 0;
    let mut last_emit = Instant::now();

    while let Some(item) = stream.next().await {
        let chunk = item.context("Download stream interrupted")?;
        let chunk = chunk.as_ref();
        out.write_all(chunk).context("Failed to write model file")?;
        downloaded += chunk.len() as u64;

        if last_emit.elapsed() > PROGRESS_INTERVAL {
            on_chunk(downloaded);
            last_emit = Instant::now();
        }
    }
    out.flush().context("Failed to flush model file")?;

    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::assets;

    #[test]
    fn test_default_model_is_known() {
        let spec = find_model(crate::config::DEFAULT_MODEL).unwrap();
        assert!(spec.files.iter().any(|f| f.filename == MODEL_FILE));
        assert!(spec.files.iter().any(|f| f.filename == TOKENIZER_FILE));
        assert!(find_model("universal_sentence_encoder").is_none());
    }

    #[tokio::test]
    async fn test_existing_files_are_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let spec = find_model("all-MiniLM-L6-v2").unwrap();
        let target = model_dir(dir.path(), spec);
        fs::create_dir_all(&target).unwrap();
        for file in spec.files {
            fs::write(target.join(file.filename), b"cached").unwrap();
        }

        let mut events = Vec::new();
        let out = download_model(dir.path(), spec, |p| events.push(p.clone()))
            .await
            .unwrap();

        assert_eq!(out, target);
        assert_eq!(events.len(), spec.files.len());
        assert!(events.iter().all(|e| e.downloaded == e.total));

        // The downloaded layout is what initialize resolves
        assert!(assets::resolve(dir.path(), spec.id).is_some());
    }

    #[tokio::test]
    async fn test_write_stream_writes_all_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.part");
        let chunks: Vec<std::result::Result<&[u8], std::io::Error>> =
            vec![Ok(&b"abc"[..]), Ok(&b"defg"[..])];

        let written = write_stream(&path, futures_util::stream::iter(chunks), |_| {})
            .await
            .unwrap();

        assert_eq!(written, 7);
        assert_eq!(fs::read(&path).unwrap(), b"abcdefg");
    }

    #[tokio::test]
    async fn test_interrupted_stream_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.part");
        let chunks: Vec<std::result::Result<&[u8], std::io::Error>> = vec![
            Ok(&b"abc"[..]),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];

        let err = write_stream(&path, futures_util::stream::iter(chunks), |_| {})
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Download stream interrupted"));
        assert!(!path.exists());
    }
}
