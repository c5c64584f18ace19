use tracing::debug;

use crate::coords::{CoordinateTable, Direction, Resolution};
use crate::pacer::RunSignal;
use crate::DeviceError;

/// Transport that actually touches the device screen, in pixels.
pub trait ActionExecutor {
    fn tap(&mut self, x: u32, y: u32) -> Result<(), DeviceError>;

    /// Drag from `from` to `to`; returns once the gesture has finished.
    fn swipe(&mut self, from: (u32, u32), to: (u32, u32), seconds: f32) -> Result<(), DeviceError>;

    fn resolution(&mut self) -> Result<Resolution, DeviceError>;
}

/// Named-coordinate front end over an [`ActionExecutor`].
///
/// Every gesture checks the run signal first so nothing reaches the device
/// after a stop or pause has been requested.
pub struct Device<E> {
    executor: E,
    coords: CoordinateTable,
    resolution: Resolution,
    signal: RunSignal,
}

impl<E: ActionExecutor> Device<E> {
    pub fn new(executor: E, coords: CoordinateTable, signal: RunSignal) -> Self {
        Self {
            executor,
            coords,
            resolution: Resolution::default(),
            signal,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        debug!("new resolution set: {}x{}", resolution.width, resolution.height);
        self.resolution = resolution;
    }

    /// Asks the transport for the real screen size and adopts it.
    pub fn query_resolution(&mut self) -> Result<Resolution, DeviceError> {
        let resolution = self.executor.resolution()?;
        self.set_resolution(resolution);
        Ok(resolution)
    }

    pub fn coords(&self) -> &CoordinateTable {
        &self.coords
    }

    pub fn set_coords(&mut self, coords: CoordinateTable) {
        self.coords = coords;
    }

    pub fn tap(&mut self, name: &str) -> Result<(), DeviceError> {
        self.signal.check()?;
        let (nx, ny) = self.coords.button(name)?;
        let (x, y) = self.resolution.scale(nx, ny);
        debug!("tapping on {name} at [{x}, {y}]");
        self.executor.tap(x, y)
    }

    pub fn swipe(&mut self, direction: Direction, seconds: f32) -> Result<(), DeviceError> {
        self.signal.check()?;
        let [start, stop] = self.coords.movement(direction)?;
        let from = self.resolution.scale(start[0], start[1]);
        let to = self.resolution.scale(stop[0], stop[1]);
        debug!("swiping {} in {seconds:.2}", direction.describe());
        self.executor.swipe(from, to, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacer::StopReason;
    use crate::scripted::{Action, RecordingExecutor};

    fn table() -> CoordinateTable {
        CoordinateTable::from_json(
            r#"{"resume":[0.5,0.5]}"#,
            r#"{"n":[[0.5,0.75],[0.5,0.25]]}"#,
        )
        .unwrap()
    }

    #[test]
    fn tap_scales_to_current_resolution() {
        let recorder = RecordingExecutor::new(Resolution::new(720, 1280));
        let mut device = Device::new(recorder.clone(), table(), RunSignal::new());
        device.query_resolution().unwrap();
        device.tap("resume").unwrap();

        assert_eq!(recorder.actions(), vec![Action::Tap { x: 360, y: 640 }]);
    }

    #[test]
    fn swipe_uses_movement_pair() {
        let recorder = RecordingExecutor::new(Resolution::new(1000, 1000));
        let mut device = Device::new(recorder.clone(), table(), RunSignal::new());
        device.set_resolution(Resolution::new(1000, 1000));
        device.swipe(Direction::N, 1.5).unwrap();

        assert_eq!(
            recorder.actions(),
            vec![Action::Swipe {
                from: (500, 750),
                to: (500, 250),
                seconds: 1.5
            }]
        );
    }

    #[test]
    fn nothing_is_sent_after_stop() {
        let recorder = RecordingExecutor::new(Resolution::default());
        let signal = RunSignal::new();
        let mut device = Device::new(recorder.clone(), table(), signal.clone());
        signal.request_stop();

        let err = device.tap("resume").unwrap_err();
        assert!(matches!(err, DeviceError::Cancelled(c) if c.0 == StopReason::Stop));
        assert!(recorder.actions().is_empty());
    }
}
