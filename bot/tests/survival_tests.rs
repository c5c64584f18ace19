mod common;

use cavebot::{RunError, ScreenError, SurvivalEnd};
use cavebot_engine::{FrameState, StopReason};
use common::Harness;

#[test]
fn open_door_ends_the_countdown_at_that_poll() {
    let mut h = Harness::chapter(6);
    for _ in 0..2 {
        h.screen.push_template("door_open_2", false);
    }
    h.screen.push_template("door_open_2", true);

    assert_eq!(h.bot.survive(60, false).unwrap(), SurvivalEnd::DoorOpen(2));
    assert_eq!(h.screen.classify_calls(), 3);
    assert_eq!(h.screen.template_calls("door_open_3"), 2);
    assert!(h.logs().contains(&"Door 2 is Open".to_string()));
}

#[test]
fn polls_follow_the_check_cadence() {
    let mut h = Harness::chapter(6);

    assert_eq!(h.bot.survive(60, false).unwrap(), SurvivalEnd::TimeUp);
    assert_eq!(h.screen.classify_calls(), 10);
}

#[test]
fn experience_signal_is_skipped_for_bosses() {
    let mut h = Harness::chapter(6);
    h.screen.set_exp_default(true);
    assert_eq!(h.bot.survive(60, true).unwrap(), SurvivalEnd::TimeUp);

    let mut h = Harness::chapter(6);
    h.screen.set_exp_default(true);
    assert_eq!(h.bot.survive(60, false).unwrap(), SurvivalEnd::ExpGained);
    assert_eq!(h.screen.classify_calls(), 1);
}

#[test]
fn between_rooms_screen_ends_the_level() {
    let mut h = Harness::chapter(6);
    h.screen.push_states([FrameState::InGame, FrameState::FortuneWheel]);

    assert_eq!(
        h.bot.survive(60, false).unwrap(),
        SurvivalEnd::LevelScreen(FrameState::FortuneWheel)
    );
    assert!(h.logs().contains(&"Fortune Wheel".to_string()));
}

#[test]
fn escape_routes_split_the_budget_in_fifths() {
    let mut h = Harness::chapter(1).with_config(|c| c.check_seconds = 1);

    assert_eq!(h.bot.survive(10, false).unwrap(), SurvivalEnd::TimeUp);
    let routes: Vec<String> = h
        .logs()
        .into_iter()
        .filter(|l| l.starts_with("Escape route"))
        .collect();
    let expected: Vec<String> = [1, 1, 2, 2, 3, 3, 4, 4, 5, 5]
        .iter()
        .map(|n| format!("Escape route #{n}"))
        .collect();
    assert_eq!(routes, expected);
}

#[test]
fn patrol_nudges_toward_the_door_after_a_quarter() {
    let mut h = Harness::chapter(6).with_config(|c| c.check_seconds = 10);

    h.bot.survive(40, false).unwrap();
    // Patrol has five steps per poll; polls at 30, 20 and 10 add a nudge.
    assert_eq!(h.device.swipe_count(), 4 * 5 + 3);
}

#[test]
fn unknown_screen_triggers_an_immediate_recheck() {
    let mut h = Harness::chapter(6);
    h.screen.push_states([
        FrameState::Unknown,
        FrameState::InGame,
        FrameState::AngelHeal,
    ]);

    assert_eq!(
        h.bot.survive(60, false).unwrap(),
        SurvivalEnd::LevelScreen(FrameState::AngelHeal)
    );
    // Unknown, its confirmation, then the recheck one second later.
    assert_eq!(h.screen.classify_calls(), 3);
}

#[test]
fn main_menu_during_combat_raises() {
    let mut h = Harness::chapter(6);
    h.screen.push_state(FrameState::MenuHome);

    let err = h.bot.survive(60, false).unwrap_err();
    assert!(matches!(err, RunError::Screen(ScreenError::MainScreen)));
}

#[test]
fn stop_request_interrupts_survival() {
    let mut h = Harness::chapter(6);
    h.signal.request_stop();

    let err = h.bot.survive(60, false).unwrap_err();
    assert!(matches!(err, RunError::Cancelled(c) if c.0 == StopReason::Stop));
    assert!(h.device.is_empty());
}
