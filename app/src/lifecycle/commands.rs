/// Commands for driving the lifecycle controller from a UI thread
/// These are sent through an mpsc channel so the sender never awaits the work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Start a new clip (ignored while recording)
    StartRecording,
    /// Stop the current clip; upload follows when the camera delivers it
    StopRecording,
    /// The record button: stop while recording, start otherwise
    ToggleRecording,
    /// Look for the uploaded asset and download it
    RefreshAsset,
    /// Open or close the playback overlay
    SetPlaybackVisible(bool),
    /// Cancel in-flight work and leave the command loop
    Shutdown,
}
