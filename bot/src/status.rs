use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One reason a session ended the way it did. A session can collect several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    MainScreen,
    CrashDesktop,
    ScreenUnknown,
    ExceptionUnknown,
    WonGame,
    ExitEngine,
    YouDied,
    ProbablyWon,
    ProbablyStuck,
    PausedGame,
    AltEndgame,
}

impl Outcome {
    pub const ALL: [Outcome; 11] = [
        Outcome::MainScreen,
        Outcome::CrashDesktop,
        Outcome::ScreenUnknown,
        Outcome::ExceptionUnknown,
        Outcome::WonGame,
        Outcome::ExitEngine,
        Outcome::YouDied,
        Outcome::ProbablyWon,
        Outcome::ProbablyStuck,
        Outcome::PausedGame,
        Outcome::AltEndgame,
    ];

    /// Additive code used by the statistics file.
    pub fn code(self) -> u32 {
        match self {
            Self::MainScreen => 1,
            Self::CrashDesktop => 2,
            Self::ScreenUnknown => 3,
            Self::ExceptionUnknown => 4,
            Self::WonGame => 5,
            Self::ExitEngine => 6,
            Self::YouDied => 7,
            Self::ProbablyWon => 8,
            Self::ProbablyStuck => 9,
            Self::PausedGame => 10,
            Self::AltEndgame => 11,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MainScreen => "main_screen",
            Self::CrashDesktop => "crash_desktop",
            Self::ScreenUnknown => "screen_unknown",
            Self::ExceptionUnknown => "exception_unknown",
            Self::WonGame => "won_game",
            Self::ExitEngine => "exit_engine",
            Self::YouDied => "you_died",
            Self::ProbablyWon => "probably_won",
            Self::ProbablyStuck => "probably_stuck",
            Self::PausedGame => "paused_game",
            Self::AltEndgame => "alt_endgame",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|o| o.label() == s.trim())
            .ok_or_else(|| format!("unknown outcome '{s}'"))
    }
}

/// Ordered, duplicate-free outcome list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcomes(Vec<Outcome>);

impl Outcomes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: Outcome) {
        if !self.0.contains(&outcome) {
            self.0.push(outcome);
        }
    }

    pub fn contains(&self, outcome: Outcome) -> bool {
        self.0.contains(&outcome)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Outcome] {
        &self.0
    }

    pub fn code(&self) -> u32 {
        self.0.iter().map(|o| o.code()).sum()
    }
}

impl FromIterator<Outcome> for Outcomes {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        let mut outcomes = Self::new();
        for outcome in iter {
            outcomes.push(outcome);
        }
        outcomes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartStatus {
    #[default]
    Unknown,
    Normal,
    CrashDesktop,
}

impl StartStatus {
    pub fn code(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Normal => 1,
            Self::CrashDesktop => 2,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Normal,
            2 => Self::CrashDesktop,
            _ => Self::Unknown,
        }
    }
}
