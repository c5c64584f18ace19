use std::ffi::OsString;
use std::process::{Command, Output};

use tracing::debug;

use crate::coords::Resolution;
use crate::device::ActionExecutor;
use crate::DeviceError;

fn adb_bin() -> OsString {
    std::env::var_os("CAVEBOT_ADB_BIN").unwrap_or_else(|| OsString::from("adb"))
}

/// Executor backed by the `adb` command line tool.
#[derive(Debug, Clone, Default)]
pub struct AdbExecutor {
    serial: Option<String>,
}

impl AdbExecutor {
    pub fn new(serial: Option<String>) -> Self {
        Self { serial }
    }

    pub fn available() -> bool {
        Command::new(adb_bin())
            .arg("version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn shell(&self, args: &[String]) -> Result<Output, DeviceError> {
        let mut command = Command::new(adb_bin());
        if let Some(serial) = &self.serial {
            command.arg("-s").arg(serial);
        }
        command.arg("shell").args(args);
        debug!("adb shell {}", args.join(" "));
        let output = command.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DeviceError::Transport(format!(
                "adb shell {} failed: {stderr}",
                args.join(" ")
            )));
        }
        Ok(output)
    }
}

impl ActionExecutor for AdbExecutor {
    fn tap(&mut self, x: u32, y: u32) -> Result<(), DeviceError> {
        self.shell(&[
            "input".into(),
            "tap".into(),
            x.to_string(),
            y.to_string(),
        ])?;
        Ok(())
    }

    fn swipe(&mut self, from: (u32, u32), to: (u32, u32), seconds: f32) -> Result<(), DeviceError> {
        let millis = (seconds.max(0.0) * 1000.0).round() as u64;
        self.shell(&[
            "input".into(),
            "swipe".into(),
            from.0.to_string(),
            from.1.to_string(),
            to.0.to_string(),
            to.1.to_string(),
            millis.to_string(),
        ])?;
        Ok(())
    }

    fn resolution(&mut self) -> Result<Resolution, DeviceError> {
        let output = self.shell(&["wm".into(), "size".into()])?;
        let text = String::from_utf8_lossy(&output.stdout);
        parse_wm_size(&text)
            .ok_or_else(|| DeviceError::Protocol(format!("unexpected `wm size` output: {text}")))
    }
}

/// Reads `Physical size: 1080x1920`, preferring an `Override size` line.
fn parse_wm_size(text: &str) -> Option<Resolution> {
    let mut physical = None;
    let mut overridden = None;
    for line in text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let Some((w, h)) = value.trim().split_once('x') else {
            continue;
        };
        let (Ok(width), Ok(height)) = (w.trim().parse(), h.trim().parse()) else {
            continue;
        };
        let res = Resolution::new(width, height);
        if label.trim().starts_with("Override") {
            overridden = Some(res);
        } else {
            physical = Some(res);
        }
    }
    overridden.or(physical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_physical_size() {
        assert_eq!(
            parse_wm_size("Physical size: 1080x2400\n"),
            Some(Resolution::new(1080, 2400))
        );
    }

    #[test]
    fn override_size_wins() {
        let text = "Physical size: 1440x3040\nOverride size: 1080x2280\n";
        assert_eq!(parse_wm_size(text), Some(Resolution::new(1080, 2280)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_wm_size("error: no devices/emulators found"), None);
    }
}
