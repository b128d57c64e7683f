use std::path::Path;
use std::sync::Arc;

use cliprelay_permissions::{Platform, PermissionRequester};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{self, JsonFileStore, LifecycleConfig, StorageConfig};
use crate::error::Error;
use crate::lifecycle::{LifecycleCommand, MediaLifecycleController};
use crate::services::{
    CameraDevice, FfmpegCompressor, HttpFetcher, LocalBlobStore, Services,
};

/// Commands queued before the loop picks them up
const COMMAND_BUFFER: usize = 32;

/// A running controller and the channel that drives it
pub struct LifecycleHandle {
    pub controller: MediaLifecycleController,
    pub sender: mpsc::Sender<LifecycleCommand>,
    pub task: JoinHandle<()>,
}

/// Read both config keys from the JSON file at `path`
pub fn load_config(path: &Path) -> Result<(LifecycleConfig, StorageConfig), Error> {
    let store = JsonFileStore::open(path)?;
    Ok((
        config::load_lifecycle_config(&store),
        config::load_storage_config(&store),
    ))
}

/// Assemble the reference collaborators around the host's camera and
/// permission bridge.
pub fn default_services(
    storage: &StorageConfig,
    camera: Arc<dyn CameraDevice>,
    permissions: Arc<dyn PermissionRequester>,
) -> Result<Services, Error> {
    let blob_store = LocalBlobStore::new(&storage.root_dir)?;
    let compressor = FfmpegCompressor::default().with_output_dir(storage.cache_dir.join("compressed"));
    let fetcher = HttpFetcher::new(&storage.cache_dir);

    Ok(Services {
        camera,
        compressor: Arc::new(compressor),
        storage: Arc::new(blob_store),
        fetcher: Arc::new(fetcher),
        permissions,
    })
}

/// Build the controller, run its start-up sequence in the background and
/// start the command loop. Must be called from within a Tokio runtime.
pub fn spawn_controller(
    services: Services,
    config: LifecycleConfig,
    platform: Platform,
) -> LifecycleHandle {
    info!("ClipRelay v{}", env!("CARGO_PKG_VERSION"));

    let controller = MediaLifecycleController::new(services, config, platform);
    let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);

    let init_controller = controller.clone();
    tokio::spawn(async move {
        init_controller.initialize().await;
    });

    let task = tokio::spawn(controller.clone().run(receiver));

    LifecycleHandle {
        controller,
        sender,
        task,
    }
}

/// Config file, reference collaborators and controller in one step
pub fn start(
    config_path: &Path,
    camera: Arc<dyn CameraDevice>,
    permissions: Arc<dyn PermissionRequester>,
) -> Result<LifecycleHandle, Error> {
    let (lifecycle_config, storage_config) = load_config(config_path)?;
    let services = default_services(&storage_config, camera, permissions)?;
    Ok(spawn_controller(services, lifecycle_config, Platform::current()))
}
