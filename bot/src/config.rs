use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Loop budgets and waits of the run loop.
///
/// The numbers are tuned against one version of the game, so all of them can
/// be changed from a JSON file or `CAVEBOT_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub max_popup_loops: u32,
    pub max_game_loops: u32,
    pub playtime_seconds: u32,
    pub check_seconds: u32,
    pub final_boss_rounds: u32,
    pub sleep_between_screens: f32,
    pub unknown_retry_limit: u32,
    pub unknown_recheck_wait: f32,
    pub endgame_load_wait: f32,
    pub intro_wait: f32,
    pub crash_restart_wait: f32,
    pub cold_load_wait: f32,
    pub not_responding_wait: f32,
    pub energy_regen_wait: f32,
    pub farm_revisit_checks: u32,
    pub smart_heal_template: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            max_popup_loops: 10,
            max_game_loops: 1000,
            playtime_seconds: 60,
            check_seconds: 6,
            final_boss_rounds: 5,
            sleep_between_screens: 8.0,
            unknown_retry_limit: 3,
            unknown_recheck_wait: 8.0,
            endgame_load_wait: 8.0,
            intro_wait: 10.0,
            crash_restart_wait: 90.0,
            cold_load_wait: 60.0,
            not_responding_wait: 10.0,
            energy_regen_wait: 3605.0,
            farm_revisit_checks: 2,
            smart_heal_template: "smart_heal_hp_check".to_string(),
        }
    }
}

impl BotConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Optional file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn with_overrides<F>(self, mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let l = &mut lookup;
        Self {
            max_popup_loops: count(l, "CAVEBOT_MAX_POPUP_LOOPS", self.max_popup_loops),
            max_game_loops: count(l, "CAVEBOT_MAX_GAME_LOOPS", self.max_game_loops),
            playtime_seconds: count(l, "CAVEBOT_PLAYTIME_SECONDS", self.playtime_seconds),
            check_seconds: count(l, "CAVEBOT_CHECK_SECONDS", self.check_seconds),
            final_boss_rounds: count(l, "CAVEBOT_FINAL_BOSS_ROUNDS", self.final_boss_rounds),
            sleep_between_screens: seconds(
                l,
                "CAVEBOT_SLEEP_BETWEEN_SCREENS",
                self.sleep_between_screens,
            ),
            unknown_retry_limit: count(l, "CAVEBOT_UNKNOWN_RETRY_LIMIT", self.unknown_retry_limit),
            unknown_recheck_wait: seconds(
                l,
                "CAVEBOT_UNKNOWN_RECHECK_WAIT",
                self.unknown_recheck_wait,
            ),
            endgame_load_wait: seconds(l, "CAVEBOT_ENDGAME_LOAD_WAIT", self.endgame_load_wait),
            intro_wait: seconds(l, "CAVEBOT_INTRO_WAIT", self.intro_wait),
            crash_restart_wait: seconds(l, "CAVEBOT_CRASH_RESTART_WAIT", self.crash_restart_wait),
            cold_load_wait: seconds(l, "CAVEBOT_COLD_LOAD_WAIT", self.cold_load_wait),
            not_responding_wait: seconds(
                l,
                "CAVEBOT_NOT_RESPONDING_WAIT",
                self.not_responding_wait,
            ),
            energy_regen_wait: seconds(l, "CAVEBOT_ENERGY_REGEN_WAIT", self.energy_regen_wait),
            farm_revisit_checks: count(l, "CAVEBOT_FARM_REVISIT_CHECKS", self.farm_revisit_checks),
            smart_heal_template: lookup("CAVEBOT_SMART_HEAL_TEMPLATE")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(self.smart_heal_template),
        }
    }
}

fn count<F>(lookup: &mut F, key: &str, default: u32) -> u32
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn seconds<F>(lookup: &mut F, key: &str, default: f32) -> f32
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}
