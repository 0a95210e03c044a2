use futures::channel::mpsc;
use futures::sink::SinkExt;
use futures::{AsyncReadExt, AsyncWriteExt};
use pocketmind_core::protocol::DownloadEvent;
use pocketmind_core::{ModelDescriptor, PocketError};
use std::path::{Path, PathBuf};

/// Extension of local model files; everything else is ignored by listings.
pub const MODEL_EXTENSION: &str = "gguf";

/// Minimum fraction advance between two progress callbacks.
const PROGRESS_STEP: f64 = 0.01;

const COPY_BUF_SIZE: usize = 64 * 1024;

/// The flat local directory model files live in.
///
/// All queries fail soft: a missing or unreadable directory reads as "no
/// models", never as an error. Only directory creation and downloads report
/// failures to the caller.
#[derive(Debug, Clone)]
pub struct ModelStore {
    models_dir: PathBuf,
}

impl ModelStore {
    /// Resolve the platform store: `$POCKETMIND_HOME/models` if set,
    /// otherwise `models/` under the pocketmind config directory.
    pub fn open() -> Result<Self, PocketError> {
        let home = if let Ok(custom) = std::env::var("POCKETMIND_HOME") {
            PathBuf::from(custom)
        } else {
            dirs::config_dir()
                .ok_or_else(|| PocketError::Store("could not resolve config directory".into()))?
                .join("pocketmind")
        };
        Ok(Self::with_root(home))
    }

    /// Store rooted at an explicit directory; models live in `<root>/models`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: root.into().join("models"),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn model_path(&self, file_name: &str) -> PathBuf {
        self.models_dir.join(file_name)
    }

    /// True iff a file with this name exists in the models directory.
    /// I/O failures read as absent.
    pub fn model_exists(&self, file_name: &str) -> bool {
        self.model_path(file_name).is_file()
    }

    /// Idempotent; creates the models directory if absent.
    pub fn ensure_models_dir(&self) -> Result<(), PocketError> {
        std::fs::create_dir_all(&self.models_dir)?;
        Ok(())
    }

    /// File names of locally present models, sorted. Entries without the
    /// model extension are skipped; I/O failures yield an empty list.
    pub fn list_local_models(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.models_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut names = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_model = path.is_file()
                && path
                    .extension()
                    .map_or(false, |ext| ext == MODEL_EXTENSION);
            if is_model {
                if let Some(name) = path.file_name() {
                    names.push(name.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        names
    }

    /// Download a catalog entry into the store.
    ///
    /// Ensures the directory first. If the target file already exists the
    /// call short-circuits with its path and no transfer happens. Otherwise
    /// the bytes are streamed into `<file_name>.part` and renamed into place
    /// on success; on failure the partial file is removed.
    ///
    /// `on_progress` receives the transferred fraction at a bounded rate
    /// (whole-percent steps plus the final byte), 0.0 while the total size
    /// is unknown. Single-flight is the caller's concern, not the store's.
    pub async fn download<F>(
        &self,
        descriptor: &ModelDescriptor,
        mut on_progress: F,
    ) -> Result<PathBuf, PocketError>
    where
        F: FnMut(f64),
    {
        self.ensure_models_dir()?;

        let target = self.model_path(&descriptor.local_file_name);
        if target.exists() {
            log::debug!(
                "{} already present, skipping transfer",
                descriptor.local_file_name
            );
            return Ok(target);
        }

        log::info!(
            "downloading {} from {}",
            descriptor.local_file_name,
            descriptor.source_url
        );

        let part = self.model_path(&format!("{}.part", descriptor.local_file_name));
        match transfer(&descriptor.source_url, &part, &mut on_progress).await {
            Ok(()) => {
                async_std::fs::rename(&part, &target).await?;
                Ok(target)
            }
            Err(e) => {
                let _ = async_std::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    /// Event-based variant of [`download`](Self::download) for callers that
    /// want a stream instead of a callback. Progress events are lossy when
    /// the receiver lags; Started/Complete/Error are always delivered.
    pub fn download_stream(&self, descriptor: &ModelDescriptor) -> mpsc::Receiver<DownloadEvent> {
        let (mut tx, rx) = mpsc::channel(64);
        let store = self.clone();
        let descriptor = descriptor.clone();

        async_std::task::spawn(async move {
            let _ = tx
                .send(DownloadEvent::Started(descriptor.local_file_name.clone()))
                .await;

            let mut progress_tx = tx.clone();
            let result = store
                .download(&descriptor, |fraction| {
                    let _ = progress_tx.try_send(DownloadEvent::Progress(fraction));
                })
                .await;

            match result {
                Ok(path) => {
                    let _ = tx
                        .send(DownloadEvent::Complete(path.to_string_lossy().into_owned()))
                        .await;
                }
                Err(e) => {
                    let _ = tx.send(DownloadEvent::Error(e.to_string())).await;
                }
            }
        });

        rx
    }
}

async fn transfer<F>(url: &str, dest: &Path, on_progress: &mut F) -> Result<(), PocketError>
where
    F: FnMut(f64),
{
    let client = surf::Client::new().with(RedirectMiddleware::new(5));

    let mut response = client
        .get(url)
        .await
        .map_err(|e| PocketError::DownloadFailed(format!("request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PocketError::DownloadFailed(format!("status {}", status)));
    }

    let total = response.len().unwrap_or(0) as u64;

    let std_file = std::fs::File::create(dest)?;
    let mut file: async_std::fs::File = std_file.into();

    let mut written: u64 = 0;
    let mut last_reported = 0.0_f64;
    let mut buf = vec![0u8; COPY_BUF_SIZE];

    loop {
        let n = response
            .read(&mut buf)
            .await
            .map_err(|e| PocketError::DownloadFailed(format!("stream read: {}", e)))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).await?;
        written += n as u64;

        if total > 0 {
            let fraction = written as f64 / total as f64;
            if fraction - last_reported >= PROGRESS_STEP || written == total {
                last_reported = fraction;
                on_progress(fraction);
            }
        }
    }

    file.flush().await?;
    Ok(())
}

/// Follows HTTP redirects up to a bounded depth. Hugging Face `resolve`
/// URLs answer with a redirect to a CDN, which surf does not follow on its
/// own.
struct RedirectMiddleware {
    max_attempts: u8,
}

impl RedirectMiddleware {
    fn new(max_attempts: u8) -> Self {
        Self { max_attempts }
    }
}

#[surf::utils::async_trait]
impl surf::middleware::Middleware for RedirectMiddleware {
    async fn handle(
        &self,
        req: surf::Request,
        client: surf::Client,
        next: surf::middleware::Next<'_>,
    ) -> surf::Result<surf::Response> {
        let mut attempts = 0;
        let mut current_req = req;

        loop {
            if attempts > self.max_attempts {
                return Err(surf::Error::from_str(
                    surf::StatusCode::LoopDetected,
                    "too many redirects",
                ));
            }

            let response = next.run(current_req.clone(), client.clone()).await?;

            if response.status().is_redirection() {
                if let Some(location) = response.header("Location") {
                    let location = location.last().as_str().to_string();
                    // Locations are usually absolute; fall back to joining
                    // against the current URL for relative ones.
                    let new_url = match surf::Url::parse(&location) {
                        Ok(url) => url,
                        Err(_) => match current_req.url().join(&location) {
                            Ok(url) => url,
                            Err(_) => {
                                return Err(surf::Error::from_str(
                                    surf::StatusCode::BadGateway,
                                    "invalid redirect location",
                                ))
                            }
                        },
                    };

                    current_req = surf::Request::new(current_req.method(), new_url);
                    attempts += 1;
                    continue;
                }
            }

            return Ok(response);
        }
    }
}
