//! Platform detection and per-platform request plans.

use crate::Capability;

/// Host platform family, which decides the permission set to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
    Desktop,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else {
            Platform::Desktop
        }
    }

    /// Ordered permission waves for this platform.
    ///
    /// Each wave is requested as one prompt batch. A wave is only requested
    /// once the previous one has resolved.
    ///
    /// - **iOS**: camera and microphone together.
    /// - **Android**: camera first, then external storage read/write.
    /// - **Desktop**: same as iOS.
    pub fn request_plan(self) -> Vec<Vec<Capability>> {
        match self {
            Platform::Ios | Platform::Desktop => {
                vec![vec![Capability::Camera, Capability::Microphone]]
            }
            Platform::Android => vec![
                vec![Capability::Camera],
                vec![
                    Capability::ReadExternalStorage,
                    Capability::WriteExternalStorage,
                ],
            ],
        }
    }
}
