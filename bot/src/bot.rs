use cavebot_engine::{
    ActionExecutor, CoordinateLibrary, CoordinateTable, Device, DeviceError, Frame, FrameClassifier,
    FrameState, Pacer,
};
use chrono::Local;
use tracing::{debug, info, warn};

use crate::abilities::TierList;
use crate::chapters::ChapterTable;
use crate::config::BotConfig;
use crate::error::RunResult;
use crate::events::{BotEvent, Notifier};
use crate::macros::{MacroTable, Step};
use crate::session::RunSession;
use crate::settings::{HealingStrategy, SharedSettings};
use crate::statistics::{StatisticsRecord, StatisticsSink};

/// Every button name the run loop can tap. A coordinate table should cover
/// all of them.
pub const BUTTONS: &[&str] = &[
    "ability_center",
    "ability_left",
    "ability_right",
    "buy_more_energy",
    "close_ability_refresh",
    "close_announcement",
    "close_end",
    "close_energy_buy",
    "close_hero_patrol",
    "close_legendary_challenge",
    "close_need_this",
    "close_need_this_2",
    "close_new_season",
    "close_vip_rewards",
    "collect_hero_patrol",
    "collect_time_prize",
    "collect_vip_rewards",
    "continue_yes",
    "daemon_reject",
    "farm_back",
    "farm_energy_1",
    "farm_energy_2",
    "farm_energy_3",
    "farm_energy_4",
    "farm_open",
    "farm_visit",
    "farm_visit_again",
    "game_not_respond_ok",
    "get_ad_energy",
    "heal_left",
    "heal_right",
    "level_up_endgame",
    "menu_world_left",
    "menu_world_right",
    "open_energy_buy",
    "open_game",
    "resume",
    "revive_ad",
    "revive_gems",
    "start",
    "start_no_raid",
    "wheel_back",
    "wheel_start",
];

/// Names from [`BUTTONS`] the table has no coordinates for.
pub fn missing_buttons(table: &CoordinateTable) -> Vec<&'static str> {
    BUTTONS
        .iter()
        .copied()
        .filter(|name| table.button(name).is_err())
        .collect()
}

/// Decides whether the heal level should heal (true) or power up (false).
pub trait SmartHeal: Send {
    fn should_heal(&mut self, classifier: &mut dyn FrameClassifier) -> Result<bool, DeviceError>;
}

/// Heals unless the "HP above half" template is on screen.
#[derive(Debug, Clone)]
pub struct TemplateSmartHeal {
    template: String,
}

impl TemplateSmartHeal {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl SmartHeal for TemplateSmartHeal {
    fn should_heal(&mut self, classifier: &mut dyn FrameClassifier) -> Result<bool, DeviceError> {
        let healthy = classifier.matches_template(&self.template, None)?;
        if healthy {
            debug!("HP greater than 50%");
        } else {
            info!("HP less than 50%");
        }
        Ok(!healthy)
    }
}

/// The run controller: owns the collaborators and the session state.
///
/// Behaviour is split over several modules, each adding an `impl` block:
/// popups, survival, levels, gates and the controller itself.
pub struct Bot<C, E> {
    pub(crate) classifier: C,
    pub(crate) device: Device<E>,
    pub(crate) pacer: Pacer,
    pub(crate) settings: SharedSettings,
    pub(crate) notifier: Notifier,
    pub(crate) statistics: Box<dyn StatisticsSink>,
    pub(crate) config: BotConfig,
    pub(crate) chapters: ChapterTable,
    pub(crate) macros: MacroTable,
    pub(crate) tiers: TierList,
    pub(crate) smart_heal: Box<dyn SmartHeal>,
    pub(crate) session: RunSession,
}

impl<C: FrameClassifier, E: ActionExecutor> Bot<C, E> {
    pub fn new(
        mut classifier: C,
        executor: E,
        coords: CoordinateTable,
        pacer: Pacer,
        settings: SharedSettings,
        statistics: impl StatisticsSink + 'static,
    ) -> Self {
        let config = BotConfig::default();
        let snapshot = settings.snapshot();
        classifier.set_ability_threshold(snapshot.abilities_threshold);
        let device = Device::new(executor, coords, pacer.signal().clone());
        Self {
            classifier,
            device,
            pacer,
            notifier: settings.notifier().clone(),
            settings,
            statistics: Box::new(statistics),
            smart_heal: Box::new(TemplateSmartHeal::new(config.smart_heal_template.clone())),
            config,
            chapters: ChapterTable::builtin(),
            macros: MacroTable::builtin(),
            tiers: TierList::default(),
            session: RunSession::new(&snapshot),
        }
    }

    /// Replaces the budgets; also resets the smart-heal probe to the
    /// configured template.
    pub fn with_config(mut self, config: BotConfig) -> Self {
        self.smart_heal = Box::new(TemplateSmartHeal::new(config.smart_heal_template.clone()));
        self.config = config;
        self
    }

    pub fn with_tier_list(mut self, tiers: TierList) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn with_smart_heal(mut self, smart_heal: impl SmartHeal + 'static) -> Self {
        self.smart_heal = Box::new(smart_heal);
        self
    }

    pub fn with_chapters(mut self, chapters: ChapterTable) -> Self {
        self.chapters = chapters;
        self
    }

    pub fn with_macros(mut self, macros: MacroTable) -> Self {
        self.macros = macros;
        self
    }

    pub fn session(&self) -> &RunSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut RunSession {
        &mut self.session
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn device(&self) -> &Device<E> {
        &self.device
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Reads the screen size from the device and loads the matching
    /// coordinate folder.
    pub fn connect(&mut self, library: &CoordinateLibrary) -> RunResult<()> {
        let resolution = self.device.query_resolution()?;
        self.notifier.emit(BotEvent::ResolutionChanged {
            width: resolution.width,
            height: resolution.height,
        });
        let (bucket, table) = library.select(resolution)?;
        let missing = missing_buttons(&table);
        if !missing.is_empty() {
            warn!("coordinates in {bucket} lack {} buttons: {}", missing.len(), missing.join(", "));
        }
        self.device.set_coords(table);
        self.notifier.emit(BotEvent::DataFolderChanged(bucket));
        Ok(())
    }

    /// One line for the user-facing log.
    pub(crate) fn log(&self, line: impl Into<String>) {
        let line = line.into();
        info!("{line}");
        self.notifier.emit(BotEvent::Log(line));
    }

    pub(crate) fn tap(&mut self, name: &str) -> RunResult<()> {
        self.device.tap(name)?;
        Ok(())
    }

    pub(crate) fn swipe(&mut self, step: Step) -> RunResult<()> {
        self.device.swipe(step.direction, step.seconds)?;
        Ok(())
    }

    pub(crate) fn wait(&self, seconds: f32) -> RunResult<()> {
        self.pacer.wait(seconds)?;
        Ok(())
    }

    /// Swipes each step in order, waiting `delay` seconds after each one.
    pub(crate) fn run_macro(&mut self, steps: &[Step], delay: f32) -> RunResult<()> {
        for step in steps {
            self.swipe(*step)?;
            if delay > 0.0 {
                self.wait(delay)?;
            }
        }
        Ok(())
    }

    pub(crate) fn capture(&mut self) -> RunResult<Frame> {
        Ok(self.classifier.capture_frame()?)
    }

    pub(crate) fn classify(&mut self) -> RunResult<FrameState> {
        let state = self.classifier.classify(None)?;
        debug!("state: {state}");
        Ok(state)
    }

    pub(crate) fn classify_frame(&mut self, frame: &Frame) -> RunResult<FrameState> {
        let state = self.classifier.classify(Some(frame))?;
        debug!("state: {state}");
        Ok(state)
    }

    pub(crate) fn template(&mut self, name: &str) -> RunResult<bool> {
        Ok(self.classifier.matches_template(name, None)?)
    }

    pub(crate) fn template_on(&mut self, name: &str, frame: &Frame) -> RunResult<bool> {
        Ok(self.classifier.matches_template(name, Some(frame))?)
    }

    pub(crate) fn change_level(&mut self, level: u32) {
        self.session.level = level;
        self.notifier.emit(BotEvent::LevelChanged(level));
    }

    /// Appends the statistics record of the session that just ended. Later
    /// calls for the same session are ignored.
    pub(crate) fn record_statistics(&mut self) {
        if self.session.recorded {
            debug!("session already recorded");
            return;
        }
        self.session.recorded = true;
        let now = Local::now();
        let record = StatisticsRecord {
            session_start: self.session.started_at,
            session_end: now,
            level_start: self.session.level_start,
            level_end: self.session.level_end(),
            duration_seconds: (now - self.session.started_at).num_seconds(),
            chapter: self.session.chapter,
            start_status: self.session.start_status,
            outcomes: self.session.outcomes.clone(),
        };
        debug!(
            "recording session: level {} -> {}, end status {}",
            record.level_start,
            record.level_end,
            record.end_status_code()
        );
        self.statistics.record(&record);
    }

    pub(crate) fn check_if_dead(&mut self) -> RunResult<()> {
        debug!("started dead check");
        if self.template("you_died_ad")? {
            self.press_if_dead()?;
        }
        Ok(())
    }

    pub(crate) fn press_if_dead(&mut self) -> RunResult<()> {
        if self.session.battlepass_adv {
            self.tap("revive_ad")?;
            info!("revived with an ad");
        } else {
            self.tap("revive_gems")?;
            info!("revived with gems");
        }
        self.wait(0.5)
    }

    /// Taps the angel's heal or power-up side according to the strategy.
    pub(crate) fn heal_tap(&mut self) -> RunResult<()> {
        let heal = match self.session.healing_strategy {
            HealingStrategy::AlwaysHeal => true,
            HealingStrategy::AlwaysPowerUp => false,
            HealingStrategy::SmartHeal => self.session.smart_heal_choice,
        };
        self.tap(if heal { "heal_right" } else { "heal_left" })
    }

    /// Leaves the endgame screen for the main menu.
    pub(crate) fn close_endgame(&mut self) -> RunResult<()> {
        debug!("closing endgame, back to the main menu");
        self.tap("close_end")?;
        self.session.level = 0;
        self.wait(self.config.endgame_load_wait)
    }
}
