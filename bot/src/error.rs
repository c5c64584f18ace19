use cavebot_engine::{Cancelled, DeviceError};
use thiserror::Error;

use crate::chapters::ChapterId;

/// Recoverable screen situations raised by the popup reactor and the
/// survival loop. The session controller is the only place that catches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScreenError {
    #[error("main menu reached")]
    MainScreen,
    #[error("game crashed to desktop")]
    CrashDesktop,
    #[error("run closed through the alternate endgame path")]
    AltEndgame,
    #[error("screen state could not be resolved")]
    UnknownState,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Screen(#[from] ScreenError),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("device failure: {0}")]
    Device(DeviceError),
    #[error("chapter {0} is not supported")]
    UnknownChapter(ChapterId),
    #[error("level {level} is outside 0..={max}")]
    LevelOutOfRange { level: u32, max: u32 },
}

impl From<DeviceError> for RunError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Cancelled(c) => Self::Cancelled(c),
            other => Self::Device(other),
        }
    }
}

pub type RunResult<T> = Result<T, RunError>;

#[cfg(test)]
mod tests {
    use cavebot_engine::StopReason;

    use super::*;

    #[test]
    fn device_cancellation_is_not_a_device_failure() {
        let err = RunError::from(DeviceError::Cancelled(Cancelled(StopReason::Stop)));
        assert!(matches!(err, RunError::Cancelled(Cancelled(StopReason::Stop))));

        let err = RunError::from(DeviceError::Transport("usb".into()));
        assert!(matches!(err, RunError::Device(_)));
    }
}
