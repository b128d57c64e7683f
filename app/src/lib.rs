//! ClipRelay: record a short clip, upload it into a single storage slot and
//! play the uploaded copy back.
//!
//! The host supplies the camera and the OS permission bridge; everything else
//! has a reference implementation in [`services`].

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod log;
pub mod services;
pub mod setup;

pub use cliprelay_permissions::{Capability, Grants, PermissionStatus, Platform};
pub use error::Error;
pub use lifecycle::{
    LifecycleCommand, LifecycleEvent, MediaLifecycleController, Phase, ScreenModel, SessionState,
    UploadState,
};
pub use setup::{spawn_controller, start, LifecycleHandle};
