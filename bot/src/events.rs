use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::chapters::ChapterId;
use crate::settings::{EnergyStrategy, HealingStrategy};

/// Fire-and-forget notifications raised while the bot runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum BotEvent {
    LevelChanged(u32),
    Log(String),
    ResolutionChanged { width: u32, height: u32 },
    DataFolderChanged(String),
    NoEnergy,
    GameWon,
    GamePaused,
    HealingStrategyChanged(HealingStrategy),
    EnergyStrategyChanged(EnergyStrategy),
    VipSubChanged(bool),
    BattlepassAdvSubChanged(bool),
    ReviveIfDeadChanged(bool),
    ChapterChanged(ChapterId),
    AbilitiesThresholdChanged(f32),
}

type Subscriber = Box<dyn Fn(&BotEvent) + Send>;

/// Broadcasts events to every subscriber. Clones share the subscriber list.
#[derive(Clone, Default)]
pub struct Notifier {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&BotEvent) + Send + 'static,
    {
        self.lock().push(Box::new(subscriber));
    }

    /// Subscribers must not emit from inside their callback.
    pub fn emit(&self, event: BotEvent) {
        for subscriber in self.lock().iter() {
            subscriber(&event);
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.lock().len())
            .finish()
    }
}

const RECENT_LOG_LINES: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub level: u32,
    pub chapter: Option<ChapterId>,
    pub resolution: Option<(u32, u32)>,
    pub data_folder: Option<String>,
    pub wins: u32,
    pub no_energy: bool,
    pub paused: bool,
    pub recent_logs: Vec<String>,
}

#[derive(Debug, Default)]
struct Board {
    snapshot: StatusSnapshot,
    logs: VecDeque<String>,
}

/// Subscriber that keeps the latest observable state for the control API.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    board: Arc<Mutex<Board>>,
}

impl StatusBoard {
    pub fn attach(notifier: &Notifier) -> Self {
        let status = Self::default();
        let handle = status.clone();
        notifier.subscribe(move |event| handle.observe(event));
        status
    }

    fn lock(&self) -> MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn observe(&self, event: &BotEvent) {
        let mut board = self.lock();
        match event {
            BotEvent::LevelChanged(level) => {
                board.snapshot.level = *level;
                board.snapshot.paused = false;
            }
            BotEvent::Log(line) => {
                if board.logs.len() == RECENT_LOG_LINES {
                    board.logs.pop_front();
                }
                board.logs.push_back(line.clone());
            }
            BotEvent::ResolutionChanged { width, height } => {
                board.snapshot.resolution = Some((*width, *height));
            }
            BotEvent::DataFolderChanged(folder) => {
                board.snapshot.data_folder = Some(folder.clone());
            }
            BotEvent::NoEnergy => board.snapshot.no_energy = true,
            BotEvent::GameWon => {
                board.snapshot.wins += 1;
                board.snapshot.no_energy = false;
            }
            BotEvent::GamePaused => board.snapshot.paused = true,
            BotEvent::ChapterChanged(id) => board.snapshot.chapter = Some(*id),
            _ => {}
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let board = self.lock();
        let mut snapshot = board.snapshot.clone();
        snapshot.recent_logs = board.logs.iter().cloned().collect();
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_sees_every_event() {
        let notifier = Notifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let seen = seen.clone();
            notifier.subscribe(move |e| seen.lock().unwrap().push(e.clone()));
        }
        notifier.emit(BotEvent::GameWon);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn status_board_tracks_level_and_caps_logs() {
        let notifier = Notifier::new();
        let status = StatusBoard::attach(&notifier);
        notifier.emit(BotEvent::LevelChanged(7));
        for i in 0..60 {
            notifier.emit(BotEvent::Log(format!("line {i}")));
        }
        notifier.emit(BotEvent::GameWon);

        let snap = status.snapshot();
        assert_eq!(snap.level, 7);
        assert_eq!(snap.wins, 1);
        assert_eq!(snap.recent_logs.len(), RECENT_LOG_LINES);
        assert_eq!(snap.recent_logs[0], "line 10");
    }

    #[test]
    fn events_serialize_with_a_tag() {
        let json = serde_json::to_string(&BotEvent::LevelChanged(3)).unwrap();
        assert_eq!(json, r#"{"event":"level_changed","value":3}"#);
    }
}
