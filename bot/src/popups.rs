//! Interstitial screens between rooms: rewards, offers, pauses and the
//! screens that end a run early.

use cavebot_engine::{ActionExecutor, FrameClassifier, FrameState};
use tracing::{debug, error, info};

use crate::abilities;
use crate::bot::Bot;
use crate::error::{RunResult, ScreenError};
use crate::status::Outcome;

impl<C: FrameClassifier, E: ActionExecutor> Bot<C, E> {
    /// Polls the screen once a second and answers whatever popup is showing
    /// until the game is back in a level.
    ///
    /// Returns the number of polls it took. Gives up with
    /// [`ScreenError::UnknownState`] after `max_popup_loops + 1` polls, even
    /// when every screen on the way was handled.
    pub fn resolve_popups(&mut self) -> RunResult<u32> {
        let limit = self.config.max_popup_loops + 1;
        for poll in 1..=limit {
            self.wait(1.0)?;
            let state = self.classify()?;
            debug!("popup poll {poll}: {state}");
            if state == FrameState::InGame {
                return Ok(poll);
            }
            self.react_to_popup(state)?;
        }
        info!("popup loop reached {limit} polls");
        Err(ScreenError::UnknownState.into())
    }

    fn react_to_popup(&mut self, state: FrameState) -> RunResult<()> {
        match state {
            FrameState::Endgame => {
                self.session.push_outcome(Outcome::ProbablyWon);
                info!("endgame out of cycle, most likely won");
                self.alt_endgame_close()
            }
            FrameState::RepeatEndgameQuestion => self.answer_death(),
            FrameState::AbilityRefresh => {
                self.tap("close_ability_refresh")?;
                self.wait(1.0)
            }
            FrameState::SelectAbility => self.choose_best_ability(),
            FrameState::FortuneWheel => {
                self.tap("wheel_start")?;
                self.wait(6.0)
            }
            FrameState::DevilQuestion => {
                self.tap("daemon_reject")?;
                self.wait(2.0)
            }
            FrameState::AdAsk | FrameState::SpecialGiftRespin => self.answer_ad_offer(),
            FrameState::MysteryVendor => {
                if self.session.battlepass_adv && self.template("mystery_vendor_ad")? {
                    debug!("collecting free vendor item");
                    self.tap("wheel_start")?;
                    self.wait(6.0)?;
                }
                self.tap("wheel_back")?;
                self.wait(2.0)
            }
            // The back button shows up a moment later as special_gift_respin.
            FrameState::SpecialGiftRespinNoBackButton => self.wait(2.0),
            FrameState::AngelHeal => {
                self.heal_tap()?;
                self.wait(2.0)
            }
            FrameState::OnPause => {
                self.tap("resume")?;
                self.wait(2.0)
            }
            FrameState::TimePrize => {
                self.tap("collect_time_prize")?;
                self.wait(5.0)?;
                self.tap("resume")?;
                self.wait(2.0)
            }
            FrameState::CrashDesktopOpen => Err(ScreenError::CrashDesktop.into()),
            FrameState::Unknown => self.confirm_unknown(),
            state if state.is_main_menu() => Err(ScreenError::MainScreen.into()),
            other => {
                debug!("no popup action for {other}");
                Ok(())
            }
        }
    }

    /// Ad offers: battle-pass holders take the free reward, others decline.
    fn answer_ad_offer(&mut self) -> RunResult<()> {
        if self.session.battlepass_adv {
            self.tap("wheel_start")?;
            self.wait(6.0)
        } else {
            self.tap("wheel_back")?;
            self.wait(2.0)
        }
    }

    /// "Play again?" after dying: revive when allowed, else close the run.
    pub(crate) fn answer_death(&mut self) -> RunResult<()> {
        self.session.push_outcome(Outcome::YouDied);
        if self.session.dead_check || self.session.battlepass_adv {
            return self.press_if_dead();
        }
        info!("revive is off, enable it to spend gems on reviving");
        self.wait(3.0)?;
        info!("you most likely died");
        self.alt_endgame_close()
    }

    /// Closes the endgame screen from anywhere inside a level. Always ends
    /// with [`ScreenError::AltEndgame`] so the controller records the run.
    pub(crate) fn alt_endgame_close(&mut self) -> RunResult<()> {
        self.session.close_run();
        let state = self.classify()?;
        info!("alt endgame state: {state}");
        self.log("You died or won!");
        self.log("Either way, it's over!");
        self.close_endgame()?;
        Err(ScreenError::AltEndgame.into())
    }

    /// Double-checks an `unknown` screen: one more look, then a longer wait
    /// and a last look before giving up.
    pub(crate) fn confirm_unknown(&mut self) -> RunResult<()> {
        debug!("unknown screen, checking again");
        if self.classify()? != FrameState::Unknown {
            return Ok(());
        }
        self.wait(self.config.unknown_recheck_wait)?;
        debug!("unknown screen, checking a last time");
        if self.classify()? != FrameState::Unknown {
            return Ok(());
        }
        error!("screen is still unknown");
        Err(ScreenError::UnknownState.into())
    }

    pub(crate) fn choose_best_ability(&mut self) -> RunResult<()> {
        let offer = self.classifier.ability_offer(None)?;
        match offer.and_then(|offer| abilities::pick(&offer, &self.tiers)) {
            Some((slot, name)) => {
                debug!("best ability is {name}");
                self.log(format!("Choosing '{name}'"));
                self.tap(slot.button())?;
            }
            None => {
                error!("unable to choose the best ability");
                self.log("Choosing 'Left Button'");
                self.tap("ability_left")?;
            }
        }
        self.wait(1.0)
    }
}
