mod common;

use cavebot::{HealingStrategy, LevelType, LocalSettings, RunError, ScreenError};
use cavebot_engine::FrameState;
use cavebot_engine::scripted::Action;
use common::Harness;

fn smart_heal_harness() -> Harness {
    Harness::new(LocalSettings {
        selected_dungeon: 6,
        healing_strategy: HealingStrategy::SmartHeal,
        ..LocalSettings::default()
    })
}

#[test]
fn smart_heal_heals_when_hp_is_low() {
    let mut h = smart_heal_harness();
    h.screen.set_template("smart_heal_hp_check", false);
    h.screen.push_states([FrameState::AngelHeal, FrameState::InGame]);

    h.bot.play_level(LevelType::Heal).unwrap();
    assert_eq!(h.tapped(), vec!["heal_right"]);
    assert!(h.bot.session().smart_heal_choice);
}

#[test]
fn smart_heal_powers_up_when_hp_is_high() {
    let mut h = smart_heal_harness();
    h.screen.set_template("smart_heal_hp_check", true);
    h.screen.push_states([FrameState::AngelHeal, FrameState::InGame]);

    h.bot.play_level(LevelType::Heal).unwrap();
    assert_eq!(h.tapped(), vec!["heal_left"]);
}

#[test]
fn fixed_strategies_skip_the_hp_probe() {
    let mut h = Harness::new(LocalSettings {
        selected_dungeon: 6,
        healing_strategy: HealingStrategy::AlwaysPowerUp,
        ..LocalSettings::default()
    });
    h.screen.push_states([FrameState::AngelHeal, FrameState::InGame]);

    h.bot.play_level(LevelType::Heal).unwrap();
    assert_eq!(h.tapped(), vec!["heal_left"]);
    assert_eq!(h.screen.template_calls("smart_heal_hp_check"), 0);
}

#[test]
fn normal_level_crosses_survives_and_exits() {
    let mut h = Harness::chapter(6);
    h.screen.set_template("door_open_1", true);

    h.bot.play_level(LevelType::Normal).unwrap();
    let logs = h.logs();
    assert_eq!(logs[0], "Crossing Dungeon (d6)");
    assert!(logs.contains(&"Door 1 is Open".to_string()));
    assert_eq!(logs.last().map(String::as_str), Some("Left Dungeon"));
}

#[test]
fn exit_is_retried_when_a_popup_interrupts() {
    let mut h = Harness::chapter(6);
    h.screen.set_template("door_open_1", true);
    // survive, popups, pre-exit check, post-exit check, then the retry's popups.
    h.screen.push_states([
        FrameState::InGame,
        FrameState::InGame,
        FrameState::InGame,
        FrameState::DevilQuestion,
        FrameState::DevilQuestion,
        FrameState::InGame,
    ]);

    h.bot.play_level(LevelType::Normal).unwrap();
    assert!(h.logs().contains(&"Left Dungeon Again".to_string()));
    assert_eq!(h.taps_of("daemon_reject"), 1);
}

#[test]
fn crash_restart_nudges_the_next_combat_level_once() {
    let mut h = Harness::chapter(6);
    h.screen.set_template("door_open_1", true);
    h.bot.session_mut().restart_pending = true;

    h.bot.play_level(LevelType::Normal).unwrap();
    let first = h.device.actions().first().cloned();
    assert!(matches!(first, Some(Action::Swipe { seconds, .. }) if seconds == 0.45));
    assert!(!h.bot.session().restart_pending);
}

#[test]
fn intro_level_resolves_popups_between_steps() {
    let mut h = Harness::chapter(6);
    h.screen.push_states([
        FrameState::FortuneWheel,
        FrameState::InGame,
        FrameState::InGame,
        FrameState::InGame,
    ]);

    h.bot.play_level(LevelType::Intro).unwrap();
    assert_eq!(h.tapped(), vec!["wheel_start"]);
    assert_eq!(h.device.swipe_count(), 3);
    assert!(h.logs().contains(&"Entering Dungeon!".to_string()));
}

#[test]
fn final_boss_that_ends_the_chapter_skips_escape_plans() {
    let mut h = Harness::chapter(6);
    h.screen.set_template("boss_died_3", true);
    h.screen.push_states([FrameState::InGame, FrameState::Endgame]);

    h.bot.play_level(LevelType::FinalBoss).unwrap();
    let logs = h.logs();
    assert!(logs.contains(&"Boss Dead #1".to_string()));
    assert!(!logs.iter().any(|l| l.starts_with("Escape Plan")));
}

#[test]
fn stuck_final_boss_tries_every_escape_plan_then_gives_up() {
    let mut h = Harness::chapter(6);
    h.screen.set_template("boss_died_6", true);

    h.bot.play_level(LevelType::FinalBoss).unwrap();
    let plans: Vec<String> = h
        .logs()
        .into_iter()
        .filter(|l| l.starts_with("Escape Plan"))
        .collect();
    assert_eq!(
        plans,
        ["A", "B", "C", "D", "E"].map(|p| format!("Escape Plan {p}!"))
    );
}

#[test]
fn boss_level_main_menu_raises() {
    let mut h = Harness::chapter(6);
    h.screen.push_state(FrameState::MenuHome);

    let err = h.bot.play_level(LevelType::Boss).unwrap_err();
    assert!(matches!(err, RunError::Screen(ScreenError::MainScreen)));
}
