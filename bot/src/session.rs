use chrono::{DateTime, Local};

use crate::chapters::ChapterId;
use crate::settings::{HealingStrategy, LocalSettings};
use crate::status::{Outcome, Outcomes, StartStatus};

/// Mutable state of the run loop. Owned by the bot; nothing else writes it.
#[derive(Debug, Clone)]
pub struct RunSession {
    pub level: u32,
    pub chapter: ChapterId,
    pub start_status: StartStatus,
    pub outcomes: Outcomes,
    /// Revive when the "you died" screen shows up.
    pub dead_check: bool,
    pub battlepass_adv: bool,
    pub vip: bool,
    pub healing_strategy: HealingStrategy,
    /// Last smart-heal verdict: true heals, false powers up.
    pub smart_heal_choice: bool,
    /// Set after a crash restart; the next combat level starts with a nudge.
    pub restart_pending: bool,
    pub energy_purchases: u32,
    pub unknown_streak: u32,
    pub level_start: u32,
    pub started_at: DateTime<Local>,
    /// Level reached when the run was closed early.
    pub terminal_level: Option<u32>,
    /// The current session already has its statistics record.
    pub recorded: bool,
    /// Outer-loop iterations finished so far; survives a pause and resume.
    pub completed_loops: u32,
}

impl RunSession {
    pub fn new(settings: &LocalSettings) -> Self {
        let mut session = Self {
            level: 0,
            chapter: settings.selected_dungeon,
            start_status: StartStatus::Unknown,
            outcomes: Outcomes::new(),
            dead_check: false,
            battlepass_adv: false,
            vip: false,
            healing_strategy: HealingStrategy::default(),
            smart_heal_choice: true,
            restart_pending: false,
            energy_purchases: 0,
            unknown_streak: 0,
            level_start: 0,
            started_at: Local::now(),
            terminal_level: None,
            recorded: false,
            completed_loops: 0,
        };
        session.refresh(settings);
        session
    }

    /// Re-reads the strategy flags; the level and counters are kept.
    pub fn refresh(&mut self, settings: &LocalSettings) {
        self.dead_check = settings.revive_if_dead;
        self.battlepass_adv = settings.battlepass_adv_sub;
        self.vip = settings.vip_sub;
        self.healing_strategy = settings.healing_strategy;
        self.chapter = settings.selected_dungeon;
    }

    pub fn reset_statuses(&mut self) {
        self.start_status = StartStatus::Normal;
        self.outcomes.clear();
        self.terminal_level = None;
        self.recorded = false;
    }

    pub fn push_outcome(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    /// Ends the current run early: the level is remembered for statistics
    /// and the next session starts from the menu.
    pub fn close_run(&mut self) {
        self.terminal_level = Some(self.level);
        self.level = 0;
    }

    pub fn level_end(&self) -> u32 {
        self.terminal_level.unwrap_or(self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_copies_flags_but_keeps_progress() {
        let mut settings = LocalSettings::default();
        let mut session = RunSession::new(&settings);
        session.level = 7;

        settings.revive_if_dead = true;
        settings.selected_dungeon = 3;
        session.refresh(&settings);
        assert!(session.dead_check);
        assert_eq!(session.chapter, 3);
        assert_eq!(session.level, 7);
    }

    #[test]
    fn close_run_remembers_the_level() {
        let mut session = RunSession::new(&LocalSettings::default());
        session.level = 12;
        session.close_run();
        assert_eq!(session.level, 0);
        assert_eq!(session.level_end(), 12);

        session.reset_statuses();
        assert_eq!(session.level_end(), 0);
        assert_eq!(session.start_status, StartStatus::Normal);
    }
}
