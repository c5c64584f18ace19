use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::frame::{AbilityOffer, ExpBar, Frame, FrameState};
use crate::{DeviceError, FrameClassifier};

/// One request line sent to the helper.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HelperRequest<'a> {
    Capture,
    Classify { frame: Option<u64> },
    Template { name: &'a str, frame: Option<u64> },
    ExpBar { frame: Option<u64> },
    ExpChanged { start: &'a [u8], frame: Option<u64> },
    AbilityOffer { frame: Option<u64> },
    SetAbilityThreshold { value: f32 },
}

/// One reply line. Only the field matching the request is filled in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelperReply {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub frame: Option<u64>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub matched: Option<bool>,
    #[serde(default)]
    pub samples: Option<Vec<u8>>,
    #[serde(default)]
    pub changed: Option<bool>,
    #[serde(default)]
    pub offer: Option<AbilityOffer>,
}

fn missing(field: &str) -> DeviceError {
    DeviceError::Protocol(format!("helper reply without '{field}'"))
}

/// Classifier that delegates image work to an external process speaking
/// newline-delimited JSON on stdin/stdout.
pub struct HelperClassifier<R, W> {
    reader: R,
    writer: W,
    child: Option<Child>,
}

impl HelperClassifier<BufReader<ChildStdout>, ChildStdin> {
    /// Spawns `command` through the shell and talks to it over pipes.
    pub fn spawn(command: &str) -> Result<Self, DeviceError> {
        debug!("starting classifier helper: {command}");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DeviceError::Transport("helper stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DeviceError::Transport("helper stdout unavailable".into()))?;
        Ok(Self {
            reader: BufReader::new(stdout),
            writer: stdin,
            child: Some(child),
        })
    }
}

impl<R: BufRead, W: Write> HelperClassifier<R, W> {
    pub fn from_streams(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            child: None,
        }
    }

    fn call(&mut self, request: &HelperRequest<'_>) -> Result<HelperReply, DeviceError> {
        let line = serde_json::to_string(request)
            .map_err(|e| DeviceError::Protocol(format!("encode request: {e}")))?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;

        let mut reply = String::new();
        if self.reader.read_line(&mut reply)? == 0 {
            return Err(DeviceError::Transport("helper closed its output".into()));
        }
        let reply: HelperReply = serde_json::from_str(reply.trim())
            .map_err(|e| DeviceError::Protocol(format!("decode reply: {e}")))?;
        if let Some(error) = reply.error {
            return Err(DeviceError::Transport(error));
        }
        Ok(reply)
    }
}

impl<R, W> Drop for HelperClassifier<R, W> {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                warn!("failed to stop classifier helper: {e}");
            }
            let _ = child.wait();
        }
    }
}

impl<R: BufRead, W: Write> FrameClassifier for HelperClassifier<R, W> {
    fn capture_frame(&mut self) -> Result<Frame, DeviceError> {
        let reply = self.call(&HelperRequest::Capture)?;
        reply.frame.map(Frame::new).ok_or_else(|| missing("frame"))
    }

    fn classify(&mut self, frame: Option<&Frame>) -> Result<FrameState, DeviceError> {
        let reply = self.call(&HelperRequest::Classify {
            frame: frame.map(|f| f.id),
        })?;
        let label = reply.state.ok_or_else(|| missing("state"))?;
        // Labels the helper does not know about count as an unknown screen.
        Ok(label.parse().unwrap_or_else(|_| {
            warn!("helper returned unrecognised state '{label}'");
            FrameState::Unknown
        }))
    }

    fn matches_template(&mut self, name: &str, frame: Option<&Frame>) -> Result<bool, DeviceError> {
        let reply = self.call(&HelperRequest::Template {
            name,
            frame: frame.map(|f| f.id),
        })?;
        reply.matched.ok_or_else(|| missing("matched"))
    }

    fn exp_bar(&mut self, frame: Option<&Frame>) -> Result<ExpBar, DeviceError> {
        let reply = self.call(&HelperRequest::ExpBar {
            frame: frame.map(|f| f.id),
        })?;
        let samples = reply.samples.ok_or_else(|| missing("samples"))?;
        Ok(ExpBar { samples })
    }

    fn exp_bar_changed(&mut self, start: &ExpBar, frame: Option<&Frame>) -> Result<bool, DeviceError> {
        let reply = self.call(&HelperRequest::ExpChanged {
            start: &start.samples,
            frame: frame.map(|f| f.id),
        })?;
        reply.changed.ok_or_else(|| missing("changed"))
    }

    fn ability_offer(&mut self, frame: Option<&Frame>) -> Result<Option<AbilityOffer>, DeviceError> {
        let reply = self.call(&HelperRequest::AbilityOffer {
            frame: frame.map(|f| f.id),
        })?;
        Ok(reply.offer)
    }

    fn set_ability_threshold(&mut self, threshold: f32) {
        if let Err(e) = self.call(&HelperRequest::SetAbilityThreshold { value: threshold }) {
            warn!("helper rejected ability threshold {threshold}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use super::*;

    fn helper(replies: &str) -> HelperClassifier<Cursor<Vec<u8>>, Vec<u8>> {
        HelperClassifier::from_streams(Cursor::new(replies.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn requests_are_tagged_json_lines() {
        let mut h = helper("{\"frame\":7}\n{\"state\":\"mistery_vendor\"}\n");
        let frame = h.capture_frame().unwrap();
        assert_eq!(frame, Frame::new(7));
        assert_eq!(h.classify(Some(&frame)).unwrap(), FrameState::MysteryVendor);

        let sent = String::from_utf8(h.writer.clone()).unwrap();
        let lines: Vec<&str> = sent.lines().collect();
        assert_eq!(lines[0], r#"{"op":"capture"}"#);
        assert_eq!(lines[1], r#"{"op":"classify","frame":7}"#);
    }

    #[test]
    fn unknown_labels_become_unknown() {
        let mut h = helper("{\"state\":\"boss_room\"}\n");
        assert_eq!(h.classify(None).unwrap(), FrameState::Unknown);
    }

    #[test]
    fn helper_errors_surface_as_transport_errors() {
        let mut h = helper("{\"error\":\"screencap failed\"}\n");
        match h.matches_template("door_open_1", None) {
            Err(DeviceError::Transport(msg)) => assert_eq!(msg, "screencap failed"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn closed_helper_is_reported() {
        let mut h = HelperClassifier::from_streams(Cursor::new(Vec::new()), io::sink());
        assert!(matches!(h.capture_frame(), Err(DeviceError::Transport(_))));
    }

    #[test]
    fn missing_offer_is_none() {
        let mut h = helper("{}\n");
        assert_eq!(h.ability_offer(None).unwrap(), None);
    }
}
