//! The combat window of a level: keep moving and poll for the signals that
//! say the room is cleared.

use cavebot_engine::{ActionExecutor, ExpBar, Frame, FrameClassifier, FrameState};
use tracing::debug;

use crate::bot::Bot;
use crate::error::{RunResult, ScreenError};
use crate::macros::{self, CombatPattern, ESCAPE_ROUTES, NUDGE};
use crate::status::Outcome;

/// Why the survival loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurvivalEnd {
    ExpGained,
    /// One of the three door templates, numbered from 1.
    DoorOpen(u8),
    /// A between-rooms screen showed up.
    LevelScreen(FrameState),
    /// The budget ran out without a signal.
    TimeUp,
}

const DOOR_TEMPLATES: [&str; 3] = ["door_open_1", "door_open_2", "door_open_3"];

impl<C: FrameClassifier, E: ActionExecutor> Bot<C, E> {
    /// Counts down `budget` seconds and polls every `check_seconds` of it.
    ///
    /// Boss fights skip the experience-bar signal since the bar does not move
    /// until the boss is down.
    pub fn survive(&mut self, budget: u32, is_boss: bool) -> RunResult<SurvivalEnd> {
        let cadence = self.config.check_seconds.max(1);
        let start_exp = self.classifier.exp_bar(None)?;
        debug!("auto playing for {budget}s");
        self.log("Searching Dungeon");
        if self.session.dead_check || self.session.battlepass_adv {
            self.check_if_dead()?;
        }

        let mut recheck = false;
        for remaining in (1..=budget).rev() {
            if remaining % cadence != 0 && !recheck {
                continue;
            }
            recheck = false;
            self.pacer.check()?;
            let frame = self.capture()?;
            let state = self.classify_frame(&frame)?;
            debug!("countdown {remaining}: {state}");

            if state == FrameState::InGame {
                if let Some(end) = self.fight(remaining, budget, &start_exp, &frame, !is_boss)? {
                    return Ok(end);
                }
                continue;
            }
            match self.outside_level(state)? {
                OutsideLevel::Ended => return Ok(SurvivalEnd::LevelScreen(state)),
                OutsideLevel::Recheck => recheck = true,
                OutsideLevel::Continue => {}
            }
        }
        debug!("survival budget spent");
        Ok(SurvivalEnd::TimeUp)
    }

    /// One in-level tick: run the chapter's combat pattern, then look for a
    /// completion signal in priority order.
    fn fight(
        &mut self,
        remaining: u32,
        budget: u32,
        start_exp: &ExpBar,
        frame: &Frame,
        check_exp: bool,
    ) -> RunResult<Option<SurvivalEnd>> {
        let pattern = self.macros.get(self.session.chapter).combat;
        match pattern {
            CombatPattern::BossAvoidance | CombatPattern::Patrol => {
                self.log(if pattern == CombatPattern::Patrol {
                    "Doing Patrol"
                } else {
                    "Avoiding Boss"
                });
                self.check_if_dead()?;
                let careful = self.session.dead_check
                    || (self.session.battlepass_adv
                        && self.session.level > pattern.dead_check_after_level());
                if careful {
                    for step in pattern.steps() {
                        self.swipe(*step)?;
                        self.check_if_dead()?;
                    }
                } else {
                    self.run_macro(pattern.steps(), pattern.delay())?;
                }
            }
            CombatPattern::EscapeRoutes => {
                let index = macros::escape_route_index(remaining, budget);
                self.log(format!("Escape route #{}", index + 1));
                self.run_macro(ESCAPE_ROUTES[index], pattern.delay())?;
            }
        }

        if check_exp && self.classifier.exp_bar_changed(start_exp, Some(frame))? {
            self.log("Gained Experience");
            return Ok(Some(SurvivalEnd::ExpGained));
        }
        for (door, template) in (1u8..).zip(DOOR_TEMPLATES) {
            if self.template_on(template, frame)? {
                self.log(format!("Door {door} is Open"));
                return Ok(Some(SurvivalEnd::DoorOpen(door)));
            }
        }
        if macros::should_nudge(remaining, budget) {
            debug!("moving closer to the door");
            self.swipe(NUDGE)?;
        }
        Ok(None)
    }

    fn outside_level(&mut self, state: FrameState) -> RunResult<OutsideLevel> {
        match state {
            FrameState::Endgame => {
                self.session.push_outcome(Outcome::YouDied);
                self.alt_endgame_close()?;
                Ok(OutsideLevel::Continue)
            }
            FrameState::RepeatEndgameQuestion => {
                self.answer_death()?;
                Ok(OutsideLevel::Continue)
            }
            FrameState::AbilityRefresh => {
                self.tap("close_ability_refresh")?;
                self.wait(1.0)?;
                Ok(OutsideLevel::Continue)
            }
            FrameState::CrashDesktopOpen => Err(ScreenError::CrashDesktop.into()),
            FrameState::Unknown => {
                self.confirm_unknown()?;
                Ok(OutsideLevel::Recheck)
            }
            s if s.is_main_menu() => Err(ScreenError::MainScreen.into()),
            s if s.ends_level() => {
                self.log(level_screen_line(s));
                Ok(OutsideLevel::Ended)
            }
            _ => Ok(OutsideLevel::Continue),
        }
    }
}

enum OutsideLevel {
    Ended,
    Recheck,
    Continue,
}

fn level_screen_line(state: FrameState) -> &'static str {
    match state {
        FrameState::SelectAbility => "New Abilities",
        FrameState::FortuneWheel => "Fortune Wheel",
        FrameState::DevilQuestion => "Devil Arrived",
        FrameState::MysteryVendor => "Mystery Vendor",
        FrameState::AdAsk => "Ad Ask",
        FrameState::AngelHeal => "Angel Arrived",
        _ => "Level ended",
    }
}
