pub mod adb;
pub mod coords;
pub mod device;
pub mod frame;
pub mod helper;
pub mod pacer;
pub mod scripted;

use std::io;

use thiserror::Error;

pub use coords::{CoordinateLibrary, CoordinateTable, Direction, Resolution};
pub use device::{ActionExecutor, Device};
pub use frame::{AbilityOffer, ExpBar, Frame, FrameState};
pub use pacer::{Cancelled, Clock, ManualClock, Pacer, RunSignal, StopReason, SystemClock};

/// Failures raised by the device side: transports, classifiers and
/// coordinate tables.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("no {kind} coordinate named '{name}'")]
    MissingCoordinate { kind: &'static str, name: String },
    #[error("invalid coordinates: {0}")]
    InvalidCoordinate(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl DeviceError {
    /// The stop request that interrupted a gesture, if that is what happened.
    pub fn cancellation(&self) -> Option<Cancelled> {
        match self {
            Self::Cancelled(c) => Some(*c),
            _ => None,
        }
    }
}

/// Reads the screen: captures frames, labels them and answers template probes.
///
/// Passing `None` for the frame means "capture a fresh one first".
pub trait FrameClassifier {
    fn capture_frame(&mut self) -> Result<Frame, DeviceError>;

    fn classify(&mut self, frame: Option<&Frame>) -> Result<FrameState, DeviceError>;

    /// Whether the named template image is present on screen.
    fn matches_template(&mut self, name: &str, frame: Option<&Frame>) -> Result<bool, DeviceError>;

    fn exp_bar(&mut self, frame: Option<&Frame>) -> Result<ExpBar, DeviceError>;

    /// True once the experience bar differs from `start`, i.e. a room was cleared.
    fn exp_bar_changed(&mut self, start: &ExpBar, frame: Option<&Frame>) -> Result<bool, DeviceError>;

    fn ability_offer(&mut self, frame: Option<&Frame>) -> Result<Option<AbilityOffer>, DeviceError>;

    fn set_ability_threshold(&mut self, _threshold: f32) {}
}

impl<T: FrameClassifier + ?Sized> FrameClassifier for Box<T> {
    fn capture_frame(&mut self) -> Result<Frame, DeviceError> {
        (**self).capture_frame()
    }

    fn classify(&mut self, frame: Option<&Frame>) -> Result<FrameState, DeviceError> {
        (**self).classify(frame)
    }

    fn matches_template(&mut self, name: &str, frame: Option<&Frame>) -> Result<bool, DeviceError> {
        (**self).matches_template(name, frame)
    }

    fn exp_bar(&mut self, frame: Option<&Frame>) -> Result<ExpBar, DeviceError> {
        (**self).exp_bar(frame)
    }

    fn exp_bar_changed(&mut self, start: &ExpBar, frame: Option<&Frame>) -> Result<bool, DeviceError> {
        (**self).exp_bar_changed(start, frame)
    }

    fn ability_offer(&mut self, frame: Option<&Frame>) -> Result<Option<AbilityOffer>, DeviceError> {
        (**self).ability_offer(frame)
    }

    fn set_ability_threshold(&mut self, threshold: f32) {
        (**self).set_ability_threshold(threshold)
    }
}

impl<T: ActionExecutor + ?Sized> ActionExecutor for Box<T> {
    fn tap(&mut self, x: u32, y: u32) -> Result<(), DeviceError> {
        (**self).tap(x, y)
    }

    fn swipe(&mut self, from: (u32, u32), to: (u32, u32), seconds: f32) -> Result<(), DeviceError> {
        (**self).swipe(from, to, seconds)
    }

    fn resolution(&mut self) -> Result<Resolution, DeviceError> {
        (**self).resolution()
    }
}
