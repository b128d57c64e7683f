use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use cliprelay_permissions::{request_all, Capability, Platform};
use log::{debug, error, info, warn};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::commands::LifecycleCommand;
use super::events::LifecycleEvent;
use super::session::SessionStore;
use super::state::{SessionState, UploadState};
use super::view::ScreenModel;
use crate::config::LifecycleConfig;
use crate::services::{Services, TransferState};

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CAPACITY: usize = 64;

/// Drives the capture → compress → upload → download → playback cycle.
///
/// Cheap to clone; all clones share one session. Operations never return
/// errors: every collaborator failure is turned into session state and an
/// event.
#[derive(Clone)]
pub struct MediaLifecycleController {
    inner: Arc<Inner>,
}

struct Inner {
    services: Services,
    config: LifecycleConfig,
    platform: Platform,
    session: SessionStore,
    events: broadcast::Sender<LifecycleEvent>,
    /// Stamp of the latest refresh/download request; older ones are stale
    request_seq: AtomicU64,
    download_token: Mutex<Option<CancellationToken>>,
    upload_token: Mutex<Option<CancellationToken>>,
    shutdown_token: CancellationToken,
}

impl MediaLifecycleController {
    pub fn new(services: Services, config: LifecycleConfig, platform: Platform) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                services,
                config,
                platform,
                session: SessionStore::new(),
                events,
                request_seq: AtomicU64::new(0),
                download_token: Mutex::new(None),
                upload_token: Mutex::new(None),
                shutdown_token: CancellationToken::new(),
            }),
        }
    }

    pub fn session(&self) -> SessionState {
        self.inner.session.current()
    }

    pub fn screen(&self) -> ScreenModel {
        ScreenModel::from(&self.inner.session.current())
    }

    pub fn subscribe_session(&self) -> watch::Receiver<SessionState> {
        self.inner.session.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.inner.config
    }

    /// Ask for device permissions and look for an existing asset.
    ///
    /// Both run concurrently; the asset lookup never waits on, or depends
    /// on, the permission answers.
    pub async fn initialize(&self) {
        info!("Initializing lifecycle controller ({:?})", self.inner.platform);
        tokio::join!(self.request_permissions(), self.refresh_remote_asset());
    }

    async fn request_permissions(&self) {
        let grants = request_all(
            self.inner.services.permissions.as_ref(),
            self.inner.platform,
        )
        .await;

        let camera = grants.is_granted(Capability::Camera);
        let microphone = grants.is_granted(Capability::Microphone);
        if !camera {
            warn!("Camera permission not granted; recording will fail when attempted");
        }

        self.inner.session.set_permissions(camera, microphone);
        self.emit(LifecycleEvent::PermissionsResolved { camera, microphone });
    }

    /// Look up the asset slot once and download it if present.
    ///
    /// An empty slot clears `local_path` without raising the error flag.
    pub async fn refresh_remote_asset(&self) {
        self.refresh_with_retries(1, Duration::ZERO).await;
    }

    async fn refresh_with_retries(&self, attempts: u32, backoff: Duration) {
        let seq = self.next_request();
        let reference = &self.inner.config.storage_ref;
        let storage = &self.inner.services.storage;

        let mut attempt = 1;
        let lookup = loop {
            match storage.download_url(reference).await {
                Err(e) if e.is_not_found() && attempt < attempts => {
                    debug!(
                        "Asset '{}' not visible yet (attempt {}/{})",
                        reference, attempt, attempts
                    );
                    attempt += 1;
                    if !self.sleep_unless_shutdown(backoff).await {
                        return;
                    }
                }
                other => break other,
            }
        };

        if self.is_stale(seq) {
            debug!("Dropping lookup result of superseded request #{}", seq);
            return;
        }

        match lookup {
            Ok(url) => self.download_for_request(seq, url).await,
            Err(e) => {
                if e.is_not_found() {
                    info!("No asset in '{}' yet", reference);
                } else {
                    warn!("Failed to look up asset '{}': {}", reference, e);
                }
                self.cancel_download();
                self.inner.session.clear_asset();
                self.emit(LifecycleEvent::AssetMissing);
            }
        }
    }

    /// Fetch `url` into local storage. Single attempt, no retry.
    ///
    /// Supersedes (and cancels) any download already in flight.
    pub async fn download_asset(&self, url: impl Into<String>) {
        let seq = self.next_request();
        self.download_for_request(seq, url.into()).await;
    }

    async fn download_for_request(&self, seq: u64, url: String) {
        let token = replace_token(&self.inner.download_token, &self.inner.shutdown_token);

        self.inner.session.begin_download();
        self.emit(LifecycleEvent::DownloadStarted { url: url.clone() });
        info!("Downloading asset from {}", url);

        let result = self.inner.services.fetcher.fetch(&url, &token).await;

        if self.is_stale(seq) {
            debug!("Dropping download result of superseded request #{}", seq);
            return;
        }
        if self.inner.shutdown_token.is_cancelled() {
            debug!("Download #{} interrupted by shutdown", seq);
            self.inner.session.abandon_download();
            return;
        }

        match result {
            Ok(path) => {
                info!("Asset ready at {:?}", path);
                self.inner.session.finish_download(path.clone());
                self.emit(LifecycleEvent::DownloadFinished { path });
            }
            Err(e) => {
                error!("Download of {} failed: {}", url, e);
                self.inner.session.fail_download();
                self.emit(LifecycleEvent::DownloadFailed {
                    message: e.to_string(),
                    user_message: e.user_message(),
                });
            }
        }
    }

    /// Start a clip. Ignored while already recording.
    ///
    /// Returns the handle of the spawned capture task, which runs until the
    /// clip is delivered and, on success, through the whole upload and
    /// re-download. Must be called from within a Tokio runtime.
    pub fn start_recording(&self) -> Option<JoinHandle<()>> {
        if !self.inner.session.begin_recording() {
            debug!("Already recording, ignoring start");
            return None;
        }

        info!("Recording started");
        self.emit(LifecycleEvent::RecordingStarted);

        let controller = self.clone();
        Some(tokio::spawn(async move {
            controller.capture_and_upload().await;
        }))
    }

    async fn capture_and_upload(&self) {
        let options = self.inner.config.record_options.clone();

        let capture = tokio::select! {
            _ = self.inner.shutdown_token.cancelled() => {
                debug!("Shutdown while waiting for the clip");
                return;
            }
            capture = self.inner.services.camera.record(options) => capture,
        };

        match capture {
            Ok(media) => {
                info!("Captured clip at {:?}", media.uri);
                self.inner.session.set_captured(media.clone());
                self.emit(LifecycleEvent::Captured { uri: media.uri });
                self.upload_flow().await;
            }
            Err(e) => {
                // The recording flag is left as is; only stop_recording clears it
                error!("Capture failed: {}", e);
                self.emit(LifecycleEvent::CaptureFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    /// End the current clip. Always allowed.
    ///
    /// The clip itself is delivered later through the capture task.
    pub async fn stop_recording(&self) {
        self.inner.services.camera.stop_recording().await;
        self.inner.session.end_recording();
        info!("Recording stopped");
        self.emit(LifecycleEvent::RecordingStopped);
    }

    /// Compress the captured clip, upload it into the slot and, once the
    /// transfer succeeds, fetch it back as the new playable asset.
    ///
    /// A newer upload cancels this one.
    pub async fn upload_flow(&self) {
        let Some(media) = self.inner.session.captured() else {
            warn!("No captured clip to upload");
            return;
        };

        let upload_id = Uuid::new_v4();
        let token = replace_token(&self.inner.upload_token, &self.inner.shutdown_token);

        self.inner.session.begin_upload();
        self.emit(LifecycleEvent::UploadStarted { upload_id });
        info!("Upload {} started for {:?}", upload_id, media.uri);

        let quality = self.inner.config.compression_quality;
        let compressed = tokio::select! {
            _ = token.cancelled() => {
                debug!("Upload {} superseded during compression", upload_id);
                return;
            }
            result = self.inner.services.compressor.compress(&media.uri, quality) => result,
        };

        let compressed = match compressed {
            Ok(path) => path,
            Err(e) => {
                self.abort_upload(upload_id, &token, format!("Compression failed: {}", e));
                return;
            }
        };

        let reference = &self.inner.config.storage_ref;
        let mut task = match self
            .inner
            .services
            .storage
            .put_file(reference, &compressed)
            .await
        {
            Ok(task) => task,
            Err(e) => {
                self.abort_upload(upload_id, &token, format!("Upload failed to start: {}", e));
                return;
            }
        };

        let mut succeeded = false;
        loop {
            let snapshot = tokio::select! {
                _ = token.cancelled() => {
                    task.cancel();
                    debug!("Upload {} superseded during transfer", upload_id);
                    return;
                }
                snapshot = task.next_snapshot() => snapshot,
            };

            let Some(snapshot) = snapshot else {
                break;
            };

            let state = UploadState::from(snapshot.state);
            let progress = snapshot.percent();
            debug!("Upload {} {}: {}%", upload_id, state, progress);

            self.inner.session.record_transfer(state, progress);
            self.emit(LifecycleEvent::UploadProgress {
                upload_id,
                state,
                progress,
            });

            if snapshot.state.is_terminal() {
                succeeded = snapshot.state == TransferState::Success;
                break;
            }
        }

        if !succeeded {
            warn!("Upload {} ended without success", upload_id);
            return;
        }

        info!("Upload {} complete, refreshing asset", upload_id);
        self.refresh_after_upload(&token).await;
    }

    fn abort_upload(&self, upload_id: Uuid, token: &CancellationToken, message: String) {
        if token.is_cancelled() {
            debug!("Upload {} superseded: {}", upload_id, message);
            return;
        }

        error!("Upload {}: {}", upload_id, message);
        self.inner.session.fail_upload();
        self.emit(LifecycleEvent::UploadFailed { upload_id, message });
    }

    /// The storage backend may not serve a fresh object right away: wait at
    /// least the configured delay, then poll the slot a bounded number of times.
    async fn refresh_after_upload(&self, token: &CancellationToken) {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(self.inner.config.refresh_delay()) => {}
        }

        self.refresh_with_retries(
            self.inner.config.refresh_attempts.max(1),
            self.inner.config.refresh_backoff(),
        )
        .await;
    }

    /// Open or close the playback overlay. Opening without an asset is allowed.
    pub fn toggle_playback_overlay(&self, visible: bool) {
        self.inner.session.set_modal_visible(visible);
        self.emit(LifecycleEvent::PlaybackToggled { visible });
    }

    /// Cancel every in-flight download, upload and capture wait.
    pub fn shutdown(&self) {
        info!("Shutting down lifecycle controller");
        self.inner.shutdown_token.cancel();
    }

    /// Command loop - consumes commands until the channel closes or `Shutdown`
    pub async fn run(self, mut command_rx: mpsc::Receiver<LifecycleCommand>) {
        while let Some(command) = command_rx.recv().await {
            debug!("Command: {:?}", command);

            match command {
                LifecycleCommand::StartRecording => {
                    self.start_recording();
                }
                LifecycleCommand::StopRecording => self.stop_recording().await,
                LifecycleCommand::ToggleRecording => {
                    if self.inner.session.is_recording() {
                        self.stop_recording().await;
                    } else {
                        self.start_recording();
                    }
                }
                LifecycleCommand::RefreshAsset => {
                    let controller = self.clone();
                    tokio::spawn(async move {
                        controller.refresh_remote_asset().await;
                    });
                }
                LifecycleCommand::SetPlaybackVisible(visible) => {
                    self.toggle_playback_overlay(visible);
                }
                LifecycleCommand::Shutdown => {
                    self.shutdown();
                    break;
                }
            }
        }

        info!("Lifecycle command loop finished");
    }

    fn emit(&self, event: LifecycleEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    fn next_request(&self) -> u64 {
        self.inner.request_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_stale(&self, seq: u64) -> bool {
        self.inner.request_seq.load(Ordering::SeqCst) != seq
    }

    fn cancel_download(&self) {
        let token = self
            .inner
            .download_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
        }
    }

    /// Returns `false` if shutdown interrupted the sleep
    async fn sleep_unless_shutdown(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.inner.shutdown_token.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

/// Install a fresh child token in `slot`, cancelling the one it replaces
fn replace_token(
    slot: &Mutex<Option<CancellationToken>>,
    parent: &CancellationToken,
) -> CancellationToken {
    let token = parent.child_token();
    let previous = slot
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(token.clone());
    if let Some(previous) = previous {
        previous.cancel();
    }
    token
}
