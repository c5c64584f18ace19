#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use cavebot::{
    BUTTONS, Bot, BotConfig, BotEvent, LocalSettings, MemoryStatistics, Notifier, SharedSettings,
    StatusBoard,
};
use cavebot_engine::scripted::{Action, RecordingExecutor, ScriptedClassifier};
use cavebot_engine::{
    CoordinateTable, Direction, FrameState, ManualClock, Pacer, Resolution, RunSignal,
};

pub type TestBot = Bot<ScriptedClassifier, RecordingExecutor>;

/// A bot wired to scripted collaborators, plus handles to inspect them.
pub struct Harness {
    pub bot: TestBot,
    pub screen: ScriptedClassifier,
    pub device: RecordingExecutor,
    pub clock: ManualClock,
    pub stats: MemoryStatistics,
    pub signal: RunSignal,
    pub notifier: Notifier,
    pub settings: SharedSettings,
    pub status: StatusBoard,
    events: Arc<Mutex<Vec<BotEvent>>>,
}

/// Each button gets its own column so taps can be mapped back to names.
pub fn button_position(name: &str) -> (f32, f32) {
    let index = BUTTONS
        .iter()
        .position(|b| *b == name)
        .unwrap_or_else(|| panic!("unknown button {name}"));
    ((index as f32 + 1.0) / 50.0, 0.5)
}

pub fn coordinate_table() -> CoordinateTable {
    CoordinateTable {
        buttons: BUTTONS
            .iter()
            .map(|name| {
                let (x, y) = button_position(name);
                (name.to_string(), vec![x, y])
            })
            .collect(),
        movements: Direction::ALL
            .iter()
            .map(|d| (d.code().to_string(), [[0.5, 0.7], [0.5, 0.5]]))
            .collect(),
    }
}

pub fn test_config() -> BotConfig {
    BotConfig {
        max_game_loops: 1,
        ..BotConfig::default()
    }
}

impl Harness {
    pub fn new(settings: LocalSettings) -> Self {
        let signal = RunSignal::new();
        Self::with_clock(settings, ManualClock::new(), signal)
    }

    /// `clock` may be a tripping clock built on `signal`.
    pub fn with_clock(settings: LocalSettings, clock: ManualClock, signal: RunSignal) -> Self {
        let screen = ScriptedClassifier::new(FrameState::InGame);
        let device = RecordingExecutor::new(Resolution::default());
        let stats = MemoryStatistics::new();
        let notifier = Notifier::new();
        let status = StatusBoard::attach(&notifier);
        let events = Arc::new(Mutex::new(Vec::new()));
        {
            let events = events.clone();
            notifier.subscribe(move |e| events.lock().unwrap().push(e.clone()));
        }
        let settings = SharedSettings::in_memory(settings, notifier.clone());
        let pacer = Pacer::new(clock.clone(), signal.clone());
        let bot = Bot::new(
            screen.clone(),
            device.clone(),
            coordinate_table(),
            pacer,
            settings.clone(),
            stats.clone(),
        )
        .with_config(test_config());

        Self {
            bot,
            screen,
            device,
            clock,
            stats,
            signal,
            notifier,
            settings,
            status,
            events,
        }
    }

    pub fn chapter(chapter: u32) -> Self {
        Self::new(LocalSettings {
            selected_dungeon: chapter,
            ..LocalSettings::default()
        })
    }

    pub fn configure(self, f: impl FnOnce(TestBot) -> TestBot) -> Self {
        Self {
            bot: f(self.bot),
            ..self
        }
    }

    pub fn with_config(self, f: impl FnOnce(&mut BotConfig)) -> Self {
        let mut config = self.bot.config().clone();
        f(&mut config);
        self.configure(|bot| bot.with_config(config))
    }

    /// Button names of every tap, in order.
    pub fn tapped(&self) -> Vec<&'static str> {
        let resolution = Resolution::default();
        self.device
            .actions()
            .iter()
            .filter_map(|action| match action {
                Action::Tap { x, y } => BUTTONS.iter().copied().find(|name| {
                    let (nx, ny) = button_position(name);
                    resolution.scale(nx, ny) == (*x, *y)
                }),
                Action::Swipe { .. } => None,
            })
            .collect()
    }

    pub fn taps_of(&self, name: &str) -> usize {
        self.tapped().iter().filter(|t| **t == name).count()
    }

    pub fn events(&self) -> Vec<BotEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BotEvent::Log(line) => Some(line),
                _ => None,
            })
            .collect()
    }
}
