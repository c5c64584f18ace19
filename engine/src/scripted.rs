use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::coords::Resolution;
use crate::device::ActionExecutor;
use crate::frame::{AbilityOffer, ExpBar, Frame, FrameState};
use crate::{DeviceError, FrameClassifier};

#[derive(Debug)]
struct Script {
    states: VecDeque<FrameState>,
    fallback: FrameState,
    templates: HashMap<String, VecDeque<bool>>,
    template_defaults: HashMap<String, bool>,
    exp_changes: VecDeque<bool>,
    exp_default: bool,
    offers: VecDeque<AbilityOffer>,
    next_frame: u64,
    classify_calls: usize,
    template_calls: HashMap<String, usize>,
    ability_threshold: Option<f32>,
}

impl Script {
    fn new(fallback: FrameState) -> Self {
        Self {
            states: VecDeque::new(),
            fallback,
            templates: HashMap::new(),
            template_defaults: HashMap::new(),
            exp_changes: VecDeque::new(),
            exp_default: false,
            offers: VecDeque::new(),
            next_frame: 0,
            classify_calls: 0,
            template_calls: HashMap::new(),
            ability_threshold: None,
        }
    }
}

/// Classifier that replays a prepared sequence of answers.
///
/// Queued answers are consumed first; once a queue is empty the matching
/// default is returned. Clones share one script so a caller can keep feeding
/// it while the run loop owns another handle.
#[derive(Debug, Clone)]
pub struct ScriptedClassifier {
    script: Arc<Mutex<Script>>,
}

impl Default for ScriptedClassifier {
    fn default() -> Self {
        Self::new(FrameState::InGame)
    }
}

impl ScriptedClassifier {
    pub fn new(fallback: FrameState) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::new(fallback))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_state(&self, state: FrameState) -> &Self {
        self.lock().states.push_back(state);
        self
    }

    pub fn push_states<I: IntoIterator<Item = FrameState>>(&self, states: I) -> &Self {
        self.lock().states.extend(states);
        self
    }

    pub fn set_fallback(&self, state: FrameState) -> &Self {
        self.lock().fallback = state;
        self
    }

    pub fn clear_states(&self) -> &Self {
        self.lock().states.clear();
        self
    }

    pub fn push_template(&self, name: &str, matched: bool) -> &Self {
        self.lock()
            .templates
            .entry(name.to_string())
            .or_default()
            .push_back(matched);
        self
    }

    pub fn set_template(&self, name: &str, matched: bool) -> &Self {
        self.lock()
            .template_defaults
            .insert(name.to_string(), matched);
        self
    }

    pub fn push_exp_change(&self, changed: bool) -> &Self {
        self.lock().exp_changes.push_back(changed);
        self
    }

    pub fn set_exp_default(&self, changed: bool) -> &Self {
        self.lock().exp_default = changed;
        self
    }

    pub fn push_offer(&self, offer: AbilityOffer) -> &Self {
        self.lock().offers.push_back(offer);
        self
    }

    pub fn classify_calls(&self) -> usize {
        self.lock().classify_calls
    }

    pub fn template_calls(&self, name: &str) -> usize {
        self.lock().template_calls.get(name).copied().unwrap_or(0)
    }

    pub fn frames_captured(&self) -> u64 {
        self.lock().next_frame
    }

    pub fn pending_states(&self) -> usize {
        self.lock().states.len()
    }

    pub fn ability_threshold(&self) -> Option<f32> {
        self.lock().ability_threshold
    }

    /// Parses a plain-text script, one directive per line:
    ///
    /// ```text
    /// # comment
    /// in_game x3
    /// template door_open_2 true
    /// default least_5_energy true
    /// exp true
    /// fallback endgame
    /// ```
    pub fn from_script(text: &str) -> Result<Self, DeviceError> {
        let classifier = Self::default();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let bad = |what: &str| DeviceError::Protocol(format!("script line {}: {what}", index + 1));
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                ["template", name, value] => {
                    classifier.push_template(name, parse_bool(value).ok_or_else(|| bad(*value))?);
                }
                ["default", name, value] => {
                    classifier.set_template(name, parse_bool(value).ok_or_else(|| bad(*value))?);
                }
                ["exp", value] => {
                    classifier.push_exp_change(parse_bool(value).ok_or_else(|| bad(*value))?);
                }
                ["fallback", state] => {
                    classifier.set_fallback(state.parse().map_err(|_| bad(*state))?);
                }
                [state] => {
                    classifier.push_state(state.parse().map_err(|_| bad(*state))?);
                }
                [state, repeat] => {
                    let count = repeat
                        .strip_prefix('x')
                        .and_then(|n| n.parse::<usize>().ok())
                        .ok_or_else(|| bad(*repeat))?;
                    let state: FrameState = state.parse().map_err(|_| bad(*state))?;
                    classifier.push_states(std::iter::repeat_n(state, count));
                }
                _ => return Err(bad(line)),
            }
        }
        Ok(classifier)
    }

    pub fn from_file(path: &Path) -> Result<Self, DeviceError> {
        Self::from_script(&fs::read_to_string(path)?)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

impl FrameClassifier for ScriptedClassifier {
    fn capture_frame(&mut self) -> Result<Frame, DeviceError> {
        let mut script = self.lock();
        script.next_frame += 1;
        Ok(Frame::new(script.next_frame))
    }

    fn classify(&mut self, _frame: Option<&Frame>) -> Result<FrameState, DeviceError> {
        let mut script = self.lock();
        script.classify_calls += 1;
        let fallback = script.fallback;
        Ok(script.states.pop_front().unwrap_or(fallback))
    }

    fn matches_template(&mut self, name: &str, _frame: Option<&Frame>) -> Result<bool, DeviceError> {
        let mut script = self.lock();
        *script.template_calls.entry(name.to_string()).or_default() += 1;
        if let Some(answer) = script.templates.get_mut(name).and_then(VecDeque::pop_front) {
            return Ok(answer);
        }
        Ok(script.template_defaults.get(name).copied().unwrap_or(false))
    }

    fn exp_bar(&mut self, _frame: Option<&Frame>) -> Result<ExpBar, DeviceError> {
        Ok(ExpBar::default())
    }

    fn exp_bar_changed(&mut self, _start: &ExpBar, _frame: Option<&Frame>) -> Result<bool, DeviceError> {
        let mut script = self.lock();
        let fallback = script.exp_default;
        Ok(script.exp_changes.pop_front().unwrap_or(fallback))
    }

    fn ability_offer(&mut self, _frame: Option<&Frame>) -> Result<Option<AbilityOffer>, DeviceError> {
        Ok(self.lock().offers.pop_front())
    }

    fn set_ability_threshold(&mut self, threshold: f32) {
        self.lock().ability_threshold = Some(threshold);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Tap { x: u32, y: u32 },
    Swipe { from: (u32, u32), to: (u32, u32), seconds: f32 },
}

/// Executor that only remembers what it was asked to do.
#[derive(Debug, Clone)]
pub struct RecordingExecutor {
    actions: Arc<Mutex<Vec<Action>>>,
    resolution: Resolution,
    echo: bool,
}

impl RecordingExecutor {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            actions: Arc::new(Mutex::new(Vec::new())),
            resolution,
            echo: false,
        }
    }

    /// Also log every action at info level (dry runs).
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Action>> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn actions(&self) -> Vec<Action> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn swipe_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|a| matches!(a, Action::Swipe { .. }))
            .count()
    }

    pub fn tap_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|a| matches!(a, Action::Tap { .. }))
            .count()
    }
}

impl ActionExecutor for RecordingExecutor {
    fn tap(&mut self, x: u32, y: u32) -> Result<(), DeviceError> {
        if self.echo {
            info!("[dry-run] tap {x},{y}");
        }
        self.lock().push(Action::Tap { x, y });
        Ok(())
    }

    fn swipe(&mut self, from: (u32, u32), to: (u32, u32), seconds: f32) -> Result<(), DeviceError> {
        if self.echo {
            info!(
                "[dry-run] swipe {},{} -> {},{} in {seconds:.2}s",
                from.0, from.1, to.0, to.1
            );
        }
        self.lock().push(Action::Swipe { from, to, seconds });
        Ok(())
    }

    fn resolution(&mut self) -> Result<Resolution, DeviceError> {
        Ok(self.resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_states_then_fallback() {
        let mut classifier = ScriptedClassifier::new(FrameState::Unknown);
        classifier.push_states([FrameState::InGame, FrameState::AdAsk]);

        assert_eq!(classifier.classify(None).unwrap(), FrameState::InGame);
        assert_eq!(classifier.classify(None).unwrap(), FrameState::AdAsk);
        assert_eq!(classifier.classify(None).unwrap(), FrameState::Unknown);
        assert_eq!(classifier.classify_calls(), 3);
    }

    #[test]
    fn templates_consume_queue_before_default() {
        let mut classifier = ScriptedClassifier::default();
        classifier.set_template("door_open_1", true);
        classifier.push_template("door_open_1", false);

        assert!(!classifier.matches_template("door_open_1", None).unwrap());
        assert!(classifier.matches_template("door_open_1", None).unwrap());
        assert!(!classifier.matches_template("never_set", None).unwrap());
        assert_eq!(classifier.template_calls("door_open_1"), 2);
    }

    #[test]
    fn script_text_is_parsed() {
        let mut classifier = ScriptedClassifier::from_script(
            "# warm up\nmenu_home\nin_game x2\nfallback endgame\ntemplate least_5_energy true\nexp true\n",
        )
        .unwrap();

        assert_eq!(classifier.classify(None).unwrap(), FrameState::MenuHome);
        assert_eq!(classifier.classify(None).unwrap(), FrameState::InGame);
        assert_eq!(classifier.classify(None).unwrap(), FrameState::InGame);
        assert_eq!(classifier.classify(None).unwrap(), FrameState::Endgame);
        assert!(classifier.matches_template("least_5_energy", None).unwrap());
        assert!(classifier.exp_bar_changed(&ExpBar::default(), None).unwrap());
    }

    #[test]
    fn bad_script_lines_name_the_line() {
        let err = ScriptedClassifier::from_script("in_game\nteleport now please").unwrap_err();
        match err {
            DeviceError::Protocol(msg) => assert!(msg.contains("line 2"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn recorder_shares_actions_between_clones() {
        let recorder = RecordingExecutor::new(Resolution::default());
        let mut handle = recorder.clone();
        handle.tap(1, 2).unwrap();
        handle.swipe((0, 0), (1, 1), 0.5).unwrap();

        assert_eq!(recorder.tap_count(), 1);
        assert_eq!(recorder.swipe_count(), 1);
    }
}
