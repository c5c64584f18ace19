//! Main-menu chores that run before a session starts: dismissing ads and
//! making sure there is enough energy to enter a chapter.

use cavebot_engine::{ActionExecutor, FrameClassifier, FrameState};
use tracing::{debug, info};

use crate::bot::Bot;
use crate::error::RunResult;
use crate::events::BotEvent;

/// A template that, when present on the home screen, is answered with a
/// fixed tap sequence.
struct AdProbe {
    template: &'static str,
    taps: &'static [(&'static str, f32)],
    vip_only: bool,
    effect: ProbeEffect,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ProbeEffect {
    None,
    /// A new season drops the battle-pass until it is bought again.
    EndBattlepass,
    /// Daily VIP rewards also reset the energy purchase count.
    ResetEnergyPurchases,
}

const fn probe(template: &'static str, taps: &'static [(&'static str, f32)]) -> AdProbe {
    AdProbe {
        template,
        taps,
        vip_only: false,
        effect: ProbeEffect::None,
    }
}

const VIP_TAPS: &[(&str, f32)] = &[("collect_vip_rewards", 6.0), ("close_vip_rewards", 4.0)];

const AD_PROBES: &[AdProbe] = &[
    probe("game_announcement", &[("close_announcement", 4.0)]),
    probe("legendary_challenge", &[("close_legendary_challenge", 4.0)]),
    AdProbe {
        effect: ProbeEffect::EndBattlepass,
        ..probe("popup_new_season", &[("close_new_season", 4.0)])
    },
    probe(
        "popup_home_patrol",
        &[("collect_hero_patrol", 6.0), ("collect_hero_patrol", 0.0)],
    ),
    probe("btn_home_time_reward", &[("close_hero_patrol", 4.0)]),
    AdProbe {
        template: "popup_vip_rewards",
        taps: VIP_TAPS,
        vip_only: true,
        effect: ProbeEffect::ResetEnergyPurchases,
    },
    AdProbe {
        template: "popup_vip_rewards",
        taps: VIP_TAPS,
        vip_only: true,
        effect: ProbeEffect::None,
    },
    probe("popup_need_this", &[("close_need_this", 4.0)]),
    probe("popup_need_this_1", &[("close_need_this", 4.0)]),
    probe("popup_need_this_2", &[("close_need_this_2", 4.0)]),
    probe("popup_welcome_back", &[("close_need_this", 4.0)]),
    probe("time_prize", &[("collect_time_prize", 5.0), ("resume", 2.0)]),
    probe("crash_continue_yes", &[("continue_yes", 10.0)]),
];

const FARM_ENERGY: [&str; 4] = ["farm_energy_1", "farm_energy_2", "farm_energy_3", "farm_energy_4"];

impl<C: FrameClassifier, E: ActionExecutor> Bot<C, E> {
    /// Runs every home-screen probe once. A new frame is captured only after
    /// a probe actually tapped something.
    pub fn dismiss_ads(&mut self) -> RunResult<()> {
        self.log("Checking conditions");
        let mut frame = self.capture()?;
        let mut changed = false;
        for probe in AD_PROBES {
            if probe.vip_only && !self.session.vip {
                continue;
            }
            if changed {
                frame = self.capture()?;
                changed = false;
            }
            debug!("checking for {}", probe.template);
            if !self.template_on(probe.template, &frame)? {
                continue;
            }
            info!("answering {}", probe.template);
            match probe.effect {
                ProbeEffect::EndBattlepass => self.session.battlepass_adv = false,
                ProbeEffect::ResetEnergyPurchases => self.session.energy_purchases = 0,
                ProbeEffect::None => {}
            }
            for (button, wait) in probe.taps {
                self.tap(button)?;
                self.wait(*wait)?;
            }
            changed = true;
        }
        Ok(())
    }

    /// Makes sure the hero has at least five energy, trying free sources
    /// first, then purchases allowed by the energy strategy, then waiting.
    pub fn ensure_energy(&mut self) -> RunResult<()> {
        loop {
            self.dismiss_ads()?;
            match self.classify()? {
                FrameState::MenuHome => {}
                FrameState::Endgame => self.close_endgame()?,
                other => {
                    debug!("energy check skipped on {other}");
                    break;
                }
            }
            info!("checking for energy");
            if self.template("least_5_energy")? {
                info!("energy is good");
                break;
            }

            if self.session.battlepass_adv && self.free_ad_energy()? {
                continue;
            }
            if self.farm_energy()? {
                continue;
            }

            self.log("Energy Strategy Check");
            let cap = self.settings.snapshot().energy_strategy.purchase_cap();
            match self.classify()? {
                FrameState::MenuHome if cap > 0 && self.session.energy_purchases < cap => {
                    self.tap("open_energy_buy")?;
                    self.wait(8.0)?;
                    self.tap("buy_more_energy")?;
                    self.wait(6.0)?;
                    self.session.energy_purchases += 1;
                    info!("bought energy ({}/{cap})", self.session.energy_purchases);
                }
                FrameState::InGame => break,
                _ => self.wait_for_energy()?,
            }
        }
        Ok(())
    }

    /// Battle-pass holders get energy for watching an ad. Returns whether it
    /// was collected.
    fn free_ad_energy(&mut self) -> RunResult<bool> {
        self.log("Free Energy Check");
        self.tap("open_energy_buy")?;
        self.wait(8.0)?;
        if self.template("free_ad_energy")? {
            info!("collecting free ad energy");
            self.tap("get_ad_energy")?;
            self.wait(6.0)?;
            return Ok(true);
        }
        self.tap("close_energy_buy")?;
        self.wait(4.0)?;
        Ok(false)
    }

    /// Visits the monster farm and picks up its energy. Returns whether a
    /// visit happened.
    fn farm_energy(&mut self) -> RunResult<bool> {
        self.log("Farm Energy Check");
        self.tap("farm_open")?;
        self.wait(6.0)?;
        let frame = self.capture()?;
        let visit = self.template_on("monster_farm_visit", &frame)?;
        let free = self.template_on("monster_farm_visit_free", &frame)?;
        let visited = visit || free;
        if visited {
            info!("collecting monster farm energy");
            if free {
                self.tap("farm_visit")?;
                self.wait(4.0)?;
            }
            self.tap("farm_visit")?;
            self.wait(4.0)?;
            self.collect_farm_energy()?;
            for _ in 0..self.config.farm_revisit_checks {
                let frame = self.capture()?;
                if self.template_on("monster_farm_visit_again", &frame)? {
                    info!("monster farm has energy again");
                    self.tap("farm_visit_again")?;
                    self.wait(4.0)?;
                    self.collect_farm_energy()?;
                }
            }
            self.wait(2.0)?;
            self.tap("farm_back")?;
            self.wait(4.0)?;
        }
        self.tap("farm_back")?;
        self.wait(6.0)?;
        Ok(visited)
    }

    /// Each pile is tapped twice: once to open it, once to close the reward.
    fn collect_farm_energy(&mut self) -> RunResult<()> {
        for pile in FARM_ENERGY {
            self.tap(pile)?;
            self.wait(2.0)?;
            self.tap(pile)?;
            self.wait(2.0)?;
        }
        Ok(())
    }

    fn wait_for_energy(&mut self) -> RunResult<()> {
        info!("no energy, waiting for it to regenerate");
        self.log("No Energy");
        self.notifier.emit(BotEvent::NoEnergy);
        self.wait(self.config.energy_regen_wait)
    }
}
