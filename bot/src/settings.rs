use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::chapters::{ChapterId, ChapterTable};
use crate::events::{BotEvent, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealingStrategy {
    #[default]
    AlwaysHeal,
    AlwaysPowerUp,
    SmartHeal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyStrategy {
    AlwaysBuy,
    AlwaysBuy2,
    AlwaysBuy3,
    AlwaysBuy4,
    #[default]
    NoBuy,
}

impl EnergyStrategy {
    /// Energy refills that may be bought per energy window.
    pub fn purchase_cap(self) -> u32 {
        match self {
            Self::AlwaysBuy => 1,
            Self::AlwaysBuy2 => 2,
            Self::AlwaysBuy3 => 3,
            Self::AlwaysBuy4 => 4,
            Self::NoBuy => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy '{0}'")]
pub struct UnknownStrategy(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("chapter {0} is not supported")]
    UnknownChapter(ChapterId),
}

fn parse_snake<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, UnknownStrategy> {
    serde_json::from_value(serde_json::Value::String(s.trim().to_ascii_lowercase()))
        .map_err(|_| UnknownStrategy(s.to_string()))
}

impl FromStr for HealingStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_snake(s)
    }
}

impl FromStr for EnergyStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_snake(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSettings {
    #[serde(default)]
    pub healing_strategy: HealingStrategy,
    #[serde(default)]
    pub energy_strategy: EnergyStrategy,
    #[serde(default)]
    pub vip_sub: bool,
    #[serde(default)]
    pub battlepass_adv_sub: bool,
    #[serde(default)]
    pub revive_if_dead: bool,
    #[serde(default = "default_dungeon")]
    pub selected_dungeon: ChapterId,
    #[serde(default = "default_threshold")]
    pub abilities_threshold: f32,
}

fn default_dungeon() -> ChapterId {
    6
}

fn default_threshold() -> f32 {
    2.0
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            healing_strategy: HealingStrategy::default(),
            energy_strategy: EnergyStrategy::default(),
            vip_sub: false,
            battlepass_adv_sub: false,
            revive_if_dead: false,
            selected_dungeon: default_dungeon(),
            abilities_threshold: default_threshold(),
        }
    }
}

impl LocalSettings {
    /// Returns the cleaned settings and whether anything had to change.
    pub fn sanitized(mut self) -> (Self, bool) {
        if self.abilities_threshold.is_finite() && self.abilities_threshold > 0.0 {
            return (self, false);
        }
        warn!(
            "abilities threshold {} is not positive, using {}",
            self.abilities_threshold,
            default_threshold()
        );
        self.abilities_threshold = default_threshold();
        (self, true)
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(explicit) = lookup("CAVEBOT_SETTINGS_PATH").filter(|v| !v.trim().is_empty()) {
            return Self::at(explicit);
        }

        let base = lookup("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| lookup("HOME").map(|home| PathBuf::from(home).join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));

        Self::at(base.join("cavebot").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load(&self) -> LocalSettings {
        let Ok(bytes) = fs::read(&self.path) else {
            debug!("no settings at {}, using defaults", self.path.display());
            return LocalSettings::default();
        };
        serde_json::from_slice::<LocalSettings>(&bytes).unwrap_or_else(|e| {
            warn!("ignoring malformed settings {}: {e}", self.path.display());
            LocalSettings::default()
        })
    }

    pub fn save(&self, settings: &LocalSettings) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(settings)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, text)
    }
}

/// Partial update, as accepted by the control API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SettingsPatch {
    pub healing_strategy: Option<HealingStrategy>,
    pub energy_strategy: Option<EnergyStrategy>,
    pub vip_sub: Option<bool>,
    pub battlepass_adv_sub: Option<bool>,
    pub revive_if_dead: Option<bool>,
    pub selected_dungeon: Option<ChapterId>,
    pub abilities_threshold: Option<f32>,
}

/// Write-through settings handle shared by the run loop and the control API.
///
/// Every change is saved right away and announced on the notifier. A failed
/// save is logged and the value stays in memory for this process.
#[derive(Debug, Clone)]
pub struct SharedSettings {
    current: Arc<Mutex<LocalSettings>>,
    store: Option<SettingsStore>,
    notifier: Notifier,
}

impl SharedSettings {
    pub fn open(store: SettingsStore, notifier: Notifier) -> Self {
        let (settings, changed) = store.load().sanitized();
        let shared = Self {
            current: Arc::new(Mutex::new(settings)),
            store: Some(store),
            notifier,
        };
        if changed {
            shared.persist(&shared.snapshot());
        }
        shared
    }

    pub fn in_memory(settings: LocalSettings, notifier: Notifier) -> Self {
        Self {
            current: Arc::new(Mutex::new(settings.sanitized().0)),
            store: None,
            notifier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LocalSettings> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> LocalSettings {
        self.lock().clone()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn persist(&self, settings: &LocalSettings) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(settings) {
                warn!("failed to save settings to {}: {e}", store.path().display());
            }
        }
    }

    fn update(&self, change: impl FnOnce(&mut LocalSettings), event: BotEvent) {
        let snapshot = {
            let mut current = self.lock();
            change(&mut current);
            current.clone()
        };
        self.persist(&snapshot);
        self.notifier.emit(event);
    }

    pub fn set_healing_strategy(&self, strategy: HealingStrategy) {
        debug!("healing strategy -> {strategy:?}");
        self.update(
            |s| s.healing_strategy = strategy,
            BotEvent::HealingStrategyChanged(strategy),
        );
    }

    pub fn set_energy_strategy(&self, strategy: EnergyStrategy) {
        debug!("energy strategy -> {strategy:?}");
        self.update(
            |s| s.energy_strategy = strategy,
            BotEvent::EnergyStrategyChanged(strategy),
        );
    }

    pub fn set_vip_sub(&self, enabled: bool) {
        self.update(|s| s.vip_sub = enabled, BotEvent::VipSubChanged(enabled));
    }

    pub fn set_battlepass_adv_sub(&self, enabled: bool) {
        self.update(
            |s| s.battlepass_adv_sub = enabled,
            BotEvent::BattlepassAdvSubChanged(enabled),
        );
    }

    pub fn set_revive_if_dead(&self, enabled: bool) {
        self.update(
            |s| s.revive_if_dead = enabled,
            BotEvent::ReviveIfDeadChanged(enabled),
        );
    }

    /// Only chapters the bot can play are accepted.
    pub fn set_chapter(&self, chapter: ChapterId) -> Result<(), SettingsError> {
        if !ChapterTable::builtin().contains(chapter) {
            return Err(SettingsError::UnknownChapter(chapter));
        }
        debug!("selected dungeon -> {chapter}");
        self.update(
            |s| s.selected_dungeon = chapter,
            BotEvent::ChapterChanged(chapter),
        );
        Ok(())
    }

    /// Non-positive thresholds are replaced with the default.
    pub fn set_abilities_threshold(&self, threshold: f32) {
        let snapshot = {
            let mut current = self.lock();
            current.abilities_threshold = threshold;
            let (clean, _) = current.clone().sanitized();
            *current = clean.clone();
            clean
        };
        self.persist(&snapshot);
        self.notifier
            .emit(BotEvent::AbilitiesThresholdChanged(snapshot.abilities_threshold));
    }

    /// Checks the whole patch before changing anything.
    pub fn apply(&self, patch: SettingsPatch) -> Result<(), SettingsError> {
        if let Some(chapter) = patch.selected_dungeon {
            if !ChapterTable::builtin().contains(chapter) {
                return Err(SettingsError::UnknownChapter(chapter));
            }
        }
        if let Some(v) = patch.healing_strategy {
            self.set_healing_strategy(v);
        }
        if let Some(v) = patch.energy_strategy {
            self.set_energy_strategy(v);
        }
        if let Some(v) = patch.vip_sub {
            self.set_vip_sub(v);
        }
        if let Some(v) = patch.battlepass_adv_sub {
            self.set_battlepass_adv_sub(v);
        }
        if let Some(v) = patch.revive_if_dead {
            self.set_revive_if_dead(v);
        }
        if let Some(v) = patch.selected_dungeon {
            self.set_chapter(v)?;
        }
        if let Some(v) = patch.abilities_threshold {
            self.set_abilities_threshold(v);
        }
        Ok(())
    }
}
