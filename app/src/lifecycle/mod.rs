mod commands;
mod controller;
mod events;
mod session;
mod state;
mod view;

// Public exports
pub use commands::LifecycleCommand;
pub use controller::MediaLifecycleController;
pub use events::LifecycleEvent;
pub use session::SessionStore;
pub use state::{Phase, SessionState, UploadState};
pub use view::{OverlayContent, ScreenModel, DOWNLOAD_ERROR_MESSAGE};
