use crate::store::ModelStore;
use pocketmind_core::{ModelDescriptor, PocketError};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Transient state of the one in-flight download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadState {
    pub file_name: String,
    /// Transferred fraction, clamped into [0, 1].
    pub fraction: f64,
    pub active: bool,
}

/// Coordinates downloads on behalf of a UI.
///
/// At most one download is active at a time, regardless of descriptor; a
/// second request is rejected with [`PocketError::DownloadInFlight`] and
/// leaves the first untouched. A finished download is not surfaced to the
/// embedding caller until it is explicitly acknowledged.
pub struct DownloadController {
    store: ModelStore,
    state: Arc<Mutex<Option<DownloadState>>>,
    pending: Option<(String, PathBuf)>,
}

impl DownloadController {
    pub fn new(store: ModelStore) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(None)),
            pending: None,
        }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().unwrap().as_ref().map_or(false, |s| s.active)
    }

    /// Progress of the named download, if it is the active one.
    pub fn progress(&self, file_name: &str) -> Option<f64> {
        self.state
            .lock()
            .unwrap()
            .as_ref()
            .filter(|s| s.file_name == file_name)
            .map(|s| s.fraction)
    }

    /// Run a download to completion, forwarding clamped progress fractions
    /// to `on_progress`. Success is recorded but not surfaced; call
    /// [`acknowledge`](Self::acknowledge) to take the result. On failure the
    /// single-flight slot is cleared and the error returned, leaving the
    /// controller retryable.
    pub async fn download<F>(
        &mut self,
        descriptor: &ModelDescriptor,
        mut on_progress: F,
    ) -> Result<(), PocketError>
    where
        F: FnMut(f64),
    {
        self.begin(descriptor)?;

        let state = self.state.clone();
        let result = self
            .store
            .download(descriptor, |fraction| {
                // The transport occasionally reports just past the ends;
                // clamp before anything downstream sees the value.
                let fraction = clamp_fraction(fraction);
                if let Some(s) = state.lock().unwrap().as_mut() {
                    s.fraction = fraction;
                }
                on_progress(fraction);
            })
            .await;

        *self.state.lock().unwrap() = None;

        match result {
            Ok(path) => {
                self.pending = Some((descriptor.local_file_name.clone(), path));
                Ok(())
            }
            Err(e) => {
                log::warn!("download of {} failed: {}", descriptor.local_file_name, e);
                Err(e)
            }
        }
    }

    /// Take the completed download, if any. The final local path is only
    /// handed out here, after the caller explicitly asks for it.
    pub fn acknowledge(&mut self) -> Option<(String, PathBuf)> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn begin(&self, descriptor: &ModelDescriptor) -> Result<(), PocketError> {
        let mut slot = self.state.lock().unwrap();
        if slot.as_ref().map_or(false, |s| s.active) {
            return Err(PocketError::DownloadInFlight);
        }
        *slot = Some(DownloadState {
            file_name: descriptor.local_file_name.clone(),
            fraction: 0.0,
            active: true,
        });
        Ok(())
    }
}

fn clamp_fraction(fraction: f64) -> f64 {
    fraction.clamp(0.0, 1.0)
}
