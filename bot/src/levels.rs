//! One handler per level type, all driven by the chapter's macro set.

use cavebot_engine::{ActionExecutor, FrameClassifier, FrameState};
use tracing::{debug, info};

use crate::bot::Bot;
use crate::chapters::LevelType;
use crate::error::RunResult;
use crate::macros::{
    self, ANGEL_LEAVE, ARENA_APPROACH, ARENA_DODGE, ARENA_EXIT, ARENA_TO_DOOR, BOSS_APPROACH,
    BOSS_ENGAGE, BOSS_TO_DOOR, CRASH_NUDGE, DOOR_WATCH_EXIT, DOOR_WATCH_POST, ESCAPE_PLANS,
    FINAL_SWEEP, FinalBossPlan, HEAL_APPROACH, HEAL_CENTER, HEAL_LEAVE, HEAL_REACH, INTRO_FIRST,
    INTRO_LEAVE, INTRO_SECOND, MacroSet,
};
use crate::settings::HealingStrategy;

const BOSS_DIED_TEMPLATES: [&str; 3] = ["boss_died_3", "boss_died_6", "boss_died_10"];

impl<C: FrameClassifier, E: ActionExecutor> Bot<C, E> {
    pub fn play_level(&mut self, kind: LevelType) -> RunResult<()> {
        info!("level {}: {kind}", self.session.level);
        match kind {
            LevelType::Intro => self.intro_level(),
            LevelType::Normal => self.normal_level(),
            LevelType::Heal => self.heal_level(),
            LevelType::Boss => self.boss_level(),
            LevelType::FinalBoss => self.final_boss_level(),
        }
    }

    fn macro_set(&self) -> MacroSet {
        self.macros.get(self.session.chapter)
    }

    /// After a crash restart the hero spawns a little short of the usual spot.
    fn crash_nudge(&mut self) -> RunResult<()> {
        if self.session.restart_pending {
            self.swipe(CRASH_NUDGE)?;
            self.wait(2.0)?;
            self.session.restart_pending = false;
        }
        Ok(())
    }

    fn intro_level(&mut self) -> RunResult<()> {
        debug!("getting start items");
        self.wait(self.config.intro_wait)?;
        self.resolve_popups()?;
        self.swipe(INTRO_FIRST)?;
        self.resolve_popups()?;
        self.swipe(INTRO_SECOND)?;
        self.resolve_popups()?;
        self.log("Leaving Start Room");
        self.swipe(INTRO_LEAVE)?;
        self.log("Entering Dungeon!");
        self.wait(0.5)
    }

    fn normal_level(&mut self) -> RunResult<()> {
        self.crash_nudge()?;
        let set = self.macro_set();
        self.log(format!("Crossing Dungeon ({})", set.name));
        let steps = macros::resolve(set.traversal, self.session.level);
        self.run_macro(&steps, 0.0)?;
        self.survive(self.config.playtime_seconds, false)?;
        self.resolve_popups()?;
        self.exit_dungeon()
    }

    fn heal_level(&mut self) -> RunResult<()> {
        if self.session.healing_strategy == HealingStrategy::SmartHeal {
            debug!("smart heal check");
            self.session.smart_heal_choice = self.smart_heal.should_heal(&mut self.classifier)?;
        }
        self.log("Centering Self");
        self.run_macro(HEAL_CENTER, 0.0)?;
        self.log("Approaching Healer");
        self.swipe(HEAL_APPROACH)?;
        self.resolve_popups()?;
        self.swipe(HEAL_REACH)?;
        self.resolve_popups()?;
        self.log("Leaving Healer");
        self.run_macro(HEAL_LEAVE, 0.0)?;
        self.log("Left Dungeon");
        self.wait(0.5)
    }

    fn boss_level(&mut self) -> RunResult<()> {
        self.crash_nudge()?;
        let plan = self.macro_set().boss;
        let level = self.session.level;
        self.log("Attacking Boss");
        self.run_macro(BOSS_APPROACH, 0.0)?;
        if plan.resolve_before_tweaks.contains(&level) {
            self.resolve_popups()?;
        }
        self.run_macro(&macros::resolve(plan.approach_tweaks, level), 0.0)?;
        self.run_macro(BOSS_ENGAGE, 0.0)?;
        self.survive(self.config.playtime_seconds, true)?;
        self.resolve_popups()?;
        if let Some(sweep) = plan.after_fight {
            self.run_macro(sweep, 0.0)?;
            self.wait(2.0)?;
            self.resolve_popups()?;
        }
        self.log("Moving to Door");
        self.run_macro(BOSS_TO_DOOR, 0.0)?;
        if let Some(detour) = plan.door_detour {
            self.run_macro(detour, 0.0)?;
            self.wait(2.0)?;
            self.resolve_popups()?;
            self.run_macro(&macros::resolve(plan.after_detour, level), 0.0)?;
        }
        self.exit_dungeon()
    }

    fn final_boss_level(&mut self) -> RunResult<()> {
        self.crash_nudge()?;
        self.log("Final Boss Appeared");
        self.log("Attacking Final Boss");
        match self.macro_set().final_boss {
            FinalBossPlan::DoorWatch => self.watch_final_boss()?,
            FinalBossPlan::Arena { door_detour } => self.dodge_final_boss(door_detour)?,
        }

        self.wait(self.config.endgame_load_wait)?;
        let mut state = self.classify()?;
        match state {
            FrameState::Endgame => return Ok(()),
            FrameState::InGame => info!("still in game after the final boss, trying to escape"),
            other => info!("state after the final boss: {other}"),
        }

        let mut round = 0usize;
        while state == FrameState::InGame {
            if self.session.dead_check {
                self.check_if_dead()?;
            } else {
                self.wait(self.config.sleep_between_screens)?;
            }
            if (1..=ESCAPE_PLANS.len()).contains(&round) {
                let (name, steps, settle) = ESCAPE_PLANS[round - 1];
                info!("trying escape plan {name}");
                self.log(format!("Escape Plan {name}!"));
                if self.session.dead_check || self.session.battlepass_adv {
                    self.check_if_dead()?;
                }
                self.run_macro(steps, 0.0)?;
                self.wait(settle)?;
            } else if round > ESCAPE_PLANS.len() + 1 {
                break;
            }
            state = self.classify()?;
            if state == FrameState::AngelHeal {
                self.heal_tap()?;
                self.wait(2.0)?;
                self.run_macro(ANGEL_LEAVE, 0.0)?;
                self.wait(2.0)?;
                state = self.classify()?;
            }
            self.run_macro(FINAL_SWEEP, 0.0)?;
            self.wait(2.0)?;
            round += 1;
        }
        Ok(())
    }

    /// Park by the wall and wait for one of the boss-died screens.
    fn watch_final_boss(&mut self) -> RunResult<()> {
        self.swipe(DOOR_WATCH_POST)?;
        'rounds: for round in 0..self.config.final_boss_rounds {
            self.wait(self.config.sleep_between_screens)?;
            for (n, template) in (1..).zip(BOSS_DIED_TEMPLATES) {
                if self.template(template)? {
                    debug!("boss dead after {round} rounds");
                    self.log(format!("Boss Dead #{n}"));
                    break 'rounds;
                }
            }
            if self.session.dead_check || self.session.battlepass_adv {
                self.check_if_dead()?;
            }
        }
        self.resolve_popups()?;
        self.log("No Loot Left");
        self.log("Leaving Dungeon");
        self.run_macro(DOOR_WATCH_EXIT, 0.0)?;
        self.log("Left Dungeon!");
        Ok(())
    }

    /// Dodge left and right in the arena for a fixed number of rounds.
    fn dodge_final_boss(&mut self, door_detour: Option<&'static [macros::Step]>) -> RunResult<()> {
        self.run_macro(ARENA_APPROACH, 0.0)?;
        for _ in 1..self.config.final_boss_rounds {
            self.log("Avoiding Boss");
            if self.session.dead_check {
                for step in ARENA_DODGE {
                    self.check_if_dead()?;
                    self.swipe(*step)?;
                }
            } else {
                self.run_macro(ARENA_DODGE, 0.0)?;
                self.wait(self.config.sleep_between_screens)?;
            }
        }
        self.resolve_popups()?;
        self.log("Moving to Door");
        self.run_macro(ARENA_TO_DOOR, 0.0)?;
        if let Some(detour) = door_detour {
            self.run_macro(detour, 0.0)?;
            self.resolve_popups()?;
        }
        self.log("No Loot Left");
        self.log("Leaving Dungeon");
        self.run_macro(ARENA_EXIT, 0.0)?;
        self.log("Left Dungeon!");
        Ok(())
    }

    /// Walks out through the door, retrying once with the chapter's fallback
    /// route if a popup interrupted the first attempt.
    pub(crate) fn exit_dungeon(&mut self) -> RunResult<()> {
        if self.classify()? != FrameState::InGame {
            self.resolve_popups()?;
        }
        let set = self.macro_set();
        self.log("No Loot Left");
        self.log("Leaving Dungeon");
        self.run_macro(set.exit, 0.0)?;
        self.log("Left Dungeon");
        self.wait(0.5)?;

        match self.classify()? {
            FrameState::Endgame => debug!("endgame after leaving"),
            FrameState::InGame => {}
            other => {
                debug!("not in game after leaving: {other}");
                self.resolve_popups()?;
                self.run_macro(set.exit_retry, 0.0)?;
                self.log("Left Dungeon Again");
                self.wait(0.5)?;
            }
        }
        Ok(())
    }
}
