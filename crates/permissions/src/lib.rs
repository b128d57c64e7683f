//! Platform-aware permission request plans.
//!
//! This crate knows *which* permissions to ask for on each platform and in
//! which order. The actual prompt is delegated to a [`PermissionRequester`]
//! supplied by the host (the OS bridge on a phone, a stub on desktop).
//!
//! # Example
//!
//! ```no_run
//! use cliprelay_permissions::{request_all, Capability, Platform, PermissionRequester};
//!
//! async fn ask(requester: &dyn PermissionRequester) {
//!     let grants = request_all(requester, Platform::current()).await;
//!     if !grants.is_granted(Capability::Camera) {
//!         println!("camera access was not granted");
//!     }
//! }
//! ```

mod capability;
mod platform;

pub use capability::{Capability, Grants, PermissionStatus};
pub use platform::Platform;

use log::{debug, warn};
use thiserror::Error;

/// Errors a permission bridge can report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PermissionError {
    /// The OS prompt could not be shown or did not answer.
    #[error("Permission request failed: {0}")]
    RequestFailed(String),

    /// No permission bridge exists for this platform.
    #[error("Platform not supported")]
    UnsupportedPlatform,
}

/// Bridge to the OS permission prompt.
#[async_trait::async_trait]
pub trait PermissionRequester: Send + Sync {
    /// Prompt for every capability in `capabilities` as one batch.
    async fn request(&self, capabilities: &[Capability]) -> Result<Grants, PermissionError>;
}

/// Run the platform's request plan wave by wave and merge the answers.
///
/// A wave that fails stops the plan: later waves are never requested.
/// Failures are logged and never returned; whatever was granted before the
/// failure is kept.
pub async fn request_all(requester: &dyn PermissionRequester, platform: Platform) -> Grants {
    let mut grants = Grants::new();

    for wave in platform.request_plan() {
        match requester.request(&wave).await {
            Ok(answer) => {
                debug!("Permission wave {:?} answered: {:?}", wave, answer);
                grants.merge(answer);
            }
            Err(e) => {
                warn!("Permission wave {:?} failed: {}", wave, e);
                break;
            }
        }
    }

    grants
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedRequester {
        calls: Mutex<Vec<Vec<Capability>>>,
        fail_on_call: Option<usize>,
        status: PermissionStatus,
    }

    impl ScriptedRequester {
        fn new(status: PermissionStatus) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on_call: None,
                status,
            }
        }
    }

    #[async_trait::async_trait]
    impl PermissionRequester for ScriptedRequester {
        async fn request(&self, capabilities: &[Capability]) -> Result<Grants, PermissionError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(capabilities.to_vec());
            if self.fail_on_call == Some(calls.len()) {
                return Err(PermissionError::RequestFailed("prompt dismissed".into()));
            }
            Ok(capabilities.iter().map(|c| (*c, self.status)).collect())
        }
    }

    #[test]
    fn test_ios_plan_is_single_wave() {
        assert_eq!(
            Platform::Ios.request_plan(),
            vec![vec![Capability::Camera, Capability::Microphone]]
        );
    }

    #[test]
    fn test_android_plan_asks_storage_second() {
        let plan = Platform::Android.request_plan();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0], vec![Capability::Camera]);
        assert!(plan[1].contains(&Capability::ReadExternalStorage));
        assert!(plan[1].contains(&Capability::WriteExternalStorage));
    }

    #[tokio::test]
    async fn test_request_all_runs_waves_in_order() {
        let requester = ScriptedRequester::new(PermissionStatus::Granted);
        let grants = request_all(&requester, Platform::Android).await;

        let calls = requester.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], vec![Capability::Camera]);
        assert!(grants.is_granted(Capability::Camera));
        assert!(grants.is_granted(Capability::WriteExternalStorage));
        // Android never asks for the microphone
        assert_eq!(grants.status(Capability::Microphone), None);
    }

    #[tokio::test]
    async fn test_failed_wave_stops_the_plan() {
        let mut requester = ScriptedRequester::new(PermissionStatus::Granted);
        requester.fail_on_call = Some(1);

        let grants = request_all(&requester, Platform::Android).await;

        assert_eq!(requester.calls.lock().unwrap().len(), 1);
        assert!(grants.is_empty());
    }

    #[tokio::test]
    async fn test_denied_is_recorded_but_not_granted() {
        let requester = ScriptedRequester::new(PermissionStatus::Denied);
        let grants = request_all(&requester, Platform::Ios).await;

        assert_eq!(
            grants.status(Capability::Camera),
            Some(PermissionStatus::Denied)
        );
        assert!(!grants.is_granted(Capability::Microphone));
    }
}
