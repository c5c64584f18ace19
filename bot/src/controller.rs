//! The outer loop: start-screen recovery, pre-flight gates, one chapter run,
//! and the single place where run errors are caught and recorded.

use cavebot_engine::{ActionExecutor, Cancelled, FrameClassifier, FrameState, StopReason};
use chrono::Local;
use tracing::{debug, error, info};

use crate::bot::Bot;
use crate::error::{RunError, RunResult, ScreenError};
use crate::events::BotEvent;
use crate::status::{Outcome, StartStatus};

/// How one iteration of the outer loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Played,
    Recovered(ScreenError),
    Paused,
    Stopped,
}

/// Why [`Bot::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// `max_game_loops` iterations done.
    Completed,
    Paused,
    Stopped,
}

impl<C: FrameClassifier, E: ActionExecutor> Bot<C, E> {
    /// Plays sessions until the loop budget is spent, a pause or stop is
    /// requested, or an unexpected failure ends the process.
    ///
    /// The loop count is kept on the session, so calling `run` again after a
    /// pause continues the same budget. A paused iteration is not counted.
    pub fn run(&mut self) -> RunResult<RunEnd> {
        while self.session.completed_loops < self.config.max_game_loops {
            let iteration = self.session.completed_loops + 1;
            match self.run_once()? {
                RunOutcome::Paused => return Ok(RunEnd::Paused),
                RunOutcome::Stopped => return Ok(RunEnd::Stopped),
                outcome => debug!("loop {iteration} ended: {outcome:?}"),
            }
            self.session.completed_loops = iteration;
            info!(">>> completed bot loop {iteration} <<<");
        }
        info!("max bot loops reached, farming complete");
        self.log("Farming complete!");
        Ok(RunEnd::Completed)
    }

    /// One session: from whatever screen is showing to the end of a chapter
    /// or the first error. Every termination appends exactly one record.
    pub fn run_once(&mut self) -> RunResult<RunOutcome> {
        let result = self.attempt_session();
        match result {
            Ok(()) => Ok(RunOutcome::Played),
            Err(RunError::Screen(err)) => self.recover(err),
            Err(RunError::Cancelled(Cancelled(reason))) => Ok(self.cancelled(reason)),
            Err(err) => {
                error!("unknown problem: {err}");
                self.log("Unknown Problem... halp!");
                self.session.push_outcome(Outcome::ExceptionUnknown);
                self.session.push_outcome(Outcome::ExitEngine);
                self.record_statistics();
                Err(err)
            }
        }
    }

    fn attempt_session(&mut self) -> RunResult<()> {
        let settings = self.settings.snapshot();
        self.session.refresh(&settings);
        self.classifier.set_ability_threshold(settings.abilities_threshold);
        self.session.reset_statuses();
        self.session.started_at = Local::now();
        self.session.level_start = self.session.level;

        if self.session.unknown_streak > self.config.unknown_retry_limit {
            info!("unknown state streak {}, resetting the menu", self.session.unknown_streak);
            self.tap("open_game")?;
            self.wait(0.5)?;
            self.tap("farm_back")?;
            self.session.unknown_streak = 0;
            self.wait(5.0)?;
        }

        let state = self.classify()?;
        info!("start state: {state}");
        self.recover_start_screen(state)?;
        self.correct_level()?;

        let level = self.session.level;
        self.session.level_start = level;
        self.notifier.emit(BotEvent::LevelChanged(level));
        if level > 0 {
            self.dismiss_ads()?;
        } else {
            self.ensure_energy()?;
        }

        debug!("selected dungeon is {}", self.session.chapter);
        info!("new game, starting from level {}", self.session.level);
        self.session.started_at = Local::now();
        if self.session.level == 0 && state != FrameState::InGame {
            self.choose_cave()
        } else {
            self.play_one_game()
        }
    }

    fn recover_start_screen(&mut self, state: FrameState) -> RunResult<()> {
        match state {
            FrameState::GameNotResponding => {
                info!("closing the game to restart it");
                self.tap("game_not_respond_ok")?;
                self.wait(self.config.not_responding_wait)
            }
            FrameState::MenuTalents | FrameState::MenuEvents => {
                info!("changing to the world menu");
                self.tap("menu_world_left")?;
                self.wait(2.0)
            }
            FrameState::MenuEquip | FrameState::MenuShop => {
                info!("changing to the world menu");
                self.tap("menu_world_right")?;
                self.wait(2.0)
            }
            FrameState::MonsterFarmHome | FrameState::MenuExpedition => {
                info!("changing to the world menu");
                self.tap("farm_back")?;
                self.wait(6.0)
            }
            FrameState::CrashDesktopOpen => {
                self.session.start_status = StartStatus::CrashDesktop;
                self.session.restart_pending = true;
                info!("opening the game again");
                self.tap("open_game")?;
                self.wait(self.config.crash_restart_wait)
            }
            FrameState::CrashLoadScreen1 | FrameState::CrashLoadScreen2 => {
                info!("game still loading, waiting");
                self.wait(self.config.cold_load_wait)
            }
            _ => Ok(()),
        }
    }

    /// Back to 0 when the home menu is showing mid-chapter, back to 1 when
    /// the stored level is past the end of the chapter.
    fn correct_level(&mut self) -> RunResult<()> {
        let level = self.session.level;
        if level == 0 {
            return Ok(());
        }
        let max = self.chapters.get(self.session.chapter)?.max_level();
        if self.template("menu_home")? {
            debug!("home menu detected, setting level 0");
            self.session.level = 0;
        } else if level > max {
            debug!("level {level} is past the chapter end {max}, setting level 1");
            self.session.level = 1;
        }
        self.wait(0.5)
    }

    /// Enters the selected chapter from the main menu.
    pub fn choose_cave(&mut self) -> RunResult<()> {
        self.log("Main Menu");
        self.tap("start")?;
        self.wait(6.0)?;
        if self.template("quick_raid_option")? {
            debug!("quick raid option shown, starting without it");
            self.tap("start_no_raid")?;
        } else {
            debug!("no quick raid option yet");
        }
        self.play_one_game()
    }

    /// Plays every level from the current one to the chapter's end, then
    /// classifies how the run finished.
    pub fn play_one_game(&mut self) -> RunResult<()> {
        let chapter = self.chapters.get(self.session.chapter)?.clone();
        let max = chapter.max_level();
        let level = self.session.level;
        if level > max {
            return Err(RunError::LevelOutOfRange { level, max });
        }
        debug!("running a {max} level dungeon");
        loop {
            let level = self.session.level;
            let kind = chapter
                .level_type(level)
                .ok_or(RunError::LevelOutOfRange { level, max })?;
            self.play_level(kind)?;
            if level >= max {
                break;
            }
            self.change_level(level + 1);
        }
        self.finish_run()
    }

    /// Looks at the screen after the last level and records the session.
    fn finish_run(&mut self) -> RunResult<()> {
        self.wait(self.config.endgame_load_wait)?;
        let state = self.classify()?;
        info!("end state: {state}");
        match state {
            FrameState::MenuHome => {
                info!("home menu after the last level");
                self.session.push_outcome(Outcome::MainScreen);
                self.record_statistics();
            }
            FrameState::InGame => {
                info!("still in game, most likely stuck");
                self.session.push_outcome(Outcome::ProbablyStuck);
                self.record_statistics();
            }
            FrameState::AngelHeal => {
                info!("angel after the last level, maybe stuck");
                self.session.push_outcome(Outcome::ProbablyStuck);
                self.record_statistics();
                self.session.level = 2;
                self.wait(0.5)?;
            }
            FrameState::Endgame => self.won()?,
            _ => {
                info!("unexpected end screen, maybe a level up");
                self.session.push_outcome(Outcome::ProbablyStuck);
                self.tap("level_up_endgame")?;
                self.wait(self.config.endgame_load_wait)?;
                if self.classify()? == FrameState::Endgame {
                    self.won()?;
                } else {
                    self.record_statistics();
                }
            }
        }
        Ok(())
    }

    fn won(&mut self) -> RunResult<()> {
        self.session.push_outcome(Outcome::WonGame);
        self.record_statistics();
        info!("you won");
        self.log("You won, Game over!");
        self.notifier.emit(BotEvent::GameWon);
        self.close_endgame()
    }

    fn recover(&mut self, err: ScreenError) -> RunResult<RunOutcome> {
        info!("{err}, restarting now");
        let outcome = match err {
            ScreenError::MainScreen => Outcome::MainScreen,
            ScreenError::CrashDesktop => Outcome::CrashDesktop,
            ScreenError::AltEndgame => Outcome::AltEndgame,
            ScreenError::UnknownState => Outcome::ScreenUnknown,
        };
        self.session.push_outcome(outcome);
        self.record_statistics();
        self.log("Preparing to restart game");
        if err != ScreenError::UnknownState {
            return Ok(RunOutcome::Recovered(err));
        }
        match self.settle_unknown() {
            Ok(()) => Ok(RunOutcome::Recovered(err)),
            Err(RunError::Cancelled(Cancelled(reason))) => Ok(self.cancelled(reason)),
            Err(other) => Err(other),
        }
    }

    fn settle_unknown(&mut self) -> RunResult<()> {
        let state = self.classify()?;
        info!("state after the unknown screen: {state}");
        self.wait(4.0)?;
        self.session.unknown_streak += 1;
        Ok(())
    }

    fn cancelled(&mut self, reason: StopReason) -> RunOutcome {
        match reason {
            StopReason::Pause => {
                info!("pause requested");
                self.session.push_outcome(Outcome::PausedGame);
                self.record_statistics();
                self.notifier.emit(BotEvent::GamePaused);
                RunOutcome::Paused
            }
            StopReason::Stop => {
                info!("stop requested, closing");
                self.session.push_outcome(Outcome::ExitEngine);
                self.record_statistics();
                RunOutcome::Stopped
            }
        }
    }
}
