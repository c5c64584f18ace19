pub mod abilities;
pub mod bot;
pub mod chapters;
pub mod config;
pub mod control_api;
pub mod controller;
pub mod error;
pub mod events;
pub mod gates;
pub mod levels;
pub mod macros;
pub mod popups;
pub mod session;
pub mod settings;
pub mod statistics;
pub mod status;
pub mod survival;

pub use abilities::{AbilityPick, TierList};
pub use bot::{Bot, SmartHeal, TemplateSmartHeal, BUTTONS};
pub use chapters::{ChapterId, ChapterKind, ChapterTable, DungeonChapter, LevelType};
pub use config::BotConfig;
pub use controller::{RunEnd, RunOutcome};
pub use error::{RunError, RunResult, ScreenError};
pub use events::{BotEvent, Notifier, StatusBoard, StatusSnapshot};
pub use session::RunSession;
pub use settings::{
    EnergyStrategy, HealingStrategy, LocalSettings, SettingsError, SettingsPatch, SettingsStore,
    SharedSettings,
};
pub use statistics::{
    CsvStatistics, MemoryStatistics, StatisticsRecord, StatisticsSink, StatisticsSummary,
};
pub use status::{Outcome, Outcomes, StartStatus};
pub use survival::SurvivalEnd;
