mod common;

use cavebot::{Outcome, RunError, ScreenError, TierList};
use cavebot_engine::{AbilityOffer, FrameState, StopReason};
use common::Harness;

#[test]
fn popup_loop_answers_screens_until_in_game() {
    let mut h = Harness::chapter(6);
    h.screen.push_states([
        FrameState::FortuneWheel,
        FrameState::DevilQuestion,
        FrameState::OnPause,
        FrameState::InGame,
    ]);

    assert_eq!(h.bot.resolve_popups().unwrap(), 4);
    assert_eq!(h.tapped(), vec!["wheel_start", "daemon_reject", "resume"]);
}

#[test]
fn popup_loop_gives_up_after_max_plus_one_polls() {
    let mut h = Harness::chapter(6);
    h.screen.set_fallback(FrameState::FortuneWheel);

    let err = h.bot.resolve_popups().unwrap_err();
    assert!(matches!(err, RunError::Screen(ScreenError::UnknownState)));
    assert_eq!(h.screen.classify_calls(), 11);
    assert_eq!(h.taps_of("wheel_start"), 11);
}

#[test]
fn endgame_inside_a_level_closes_the_run() {
    let mut h = Harness::chapter(6);
    h.bot.session_mut().level = 7;
    h.screen.push_state(FrameState::Endgame);

    let err = h.bot.resolve_popups().unwrap_err();
    assert!(matches!(err, RunError::Screen(ScreenError::AltEndgame)));
    assert!(h.bot.session().outcomes.contains(Outcome::ProbablyWon));
    assert_eq!(h.bot.session().level, 0);
    assert_eq!(h.bot.session().level_end(), 7);
    assert_eq!(h.tapped(), vec!["close_end"]);
}

#[test]
fn main_menu_means_the_run_is_over() {
    let mut h = Harness::chapter(6);
    h.screen.push_state(FrameState::MenuShop);

    let err = h.bot.resolve_popups().unwrap_err();
    assert!(matches!(err, RunError::Screen(ScreenError::MainScreen)));
}

#[test]
fn crash_to_desktop_is_raised() {
    let mut h = Harness::chapter(6);
    h.screen.push_state(FrameState::CrashDesktopOpen);

    let err = h.bot.resolve_popups().unwrap_err();
    assert!(matches!(err, RunError::Screen(ScreenError::CrashDesktop)));
}

#[test]
fn unknown_screen_is_checked_twice_before_giving_up() {
    let mut h = Harness::chapter(6);
    h.screen.push_states([FrameState::Unknown; 3]);

    let err = h.bot.resolve_popups().unwrap_err();
    assert!(matches!(err, RunError::Screen(ScreenError::UnknownState)));
    assert_eq!(h.screen.classify_calls(), 3);
}

#[test]
fn unknown_screen_that_clears_keeps_polling() {
    let mut h = Harness::chapter(6);
    h.screen
        .push_states([FrameState::Unknown, FrameState::Unknown, FrameState::AngelHeal]);

    assert_eq!(h.bot.resolve_popups().unwrap(), 2);
}

#[test]
fn ability_choice_follows_the_tier_list() {
    let tiers: TierList = [("multishot", 1), ("front_arrow", 2), ("heal", 5)]
        .into_iter()
        .collect();
    let mut h = Harness::chapter(6).configure(|bot| bot.with_tier_list(tiers));
    h.screen.push_offer(AbilityOffer {
        left: "heal".into(),
        center: "front_arrow".into(),
        right: "multishot".into(),
    });
    h.screen.push_state(FrameState::SelectAbility);

    h.bot.resolve_popups().unwrap();
    assert_eq!(h.tapped(), vec!["ability_right"]);
    assert!(h.logs().contains(&"Choosing 'multishot'".to_string()));
}

#[test]
fn unranked_ability_falls_back_to_left() {
    let mut h = Harness::chapter(6);
    h.screen.push_offer(AbilityOffer {
        left: "a".into(),
        center: "b".into(),
        right: "c".into(),
    });
    h.screen.push_state(FrameState::SelectAbility);

    h.bot.resolve_popups().unwrap();
    assert_eq!(h.tapped(), vec!["ability_left"]);
}

#[test]
fn ad_offers_depend_on_the_battlepass() {
    let mut h = Harness::chapter(6);
    h.screen.push_state(FrameState::AdAsk);
    h.bot.resolve_popups().unwrap();
    assert_eq!(h.tapped(), vec!["wheel_back"]);

    let mut h = Harness::chapter(6);
    h.bot.session_mut().battlepass_adv = true;
    h.screen.push_state(FrameState::SpecialGiftRespin);
    h.bot.resolve_popups().unwrap();
    assert_eq!(h.tapped(), vec!["wheel_start"]);
}

#[test]
fn death_without_revive_closes_the_run() {
    let mut h = Harness::chapter(6);
    h.screen.push_state(FrameState::RepeatEndgameQuestion);

    let err = h.bot.resolve_popups().unwrap_err();
    assert!(matches!(err, RunError::Screen(ScreenError::AltEndgame)));
    assert!(h.bot.session().outcomes.contains(Outcome::YouDied));
    assert_eq!(h.tapped(), vec!["close_end"]);
}

#[test]
fn death_with_revive_spends_gems_and_continues() {
    let mut h = Harness::chapter(6);
    h.bot.session_mut().dead_check = true;
    h.screen.push_state(FrameState::RepeatEndgameQuestion);

    h.bot.resolve_popups().unwrap();
    assert_eq!(h.tapped(), vec!["revive_gems"]);
    assert!(h.bot.session().outcomes.contains(Outcome::YouDied));
}

#[test]
fn stop_request_cancels_before_the_first_poll() {
    let mut h = Harness::chapter(6);
    h.signal.request_stop();

    let err = h.bot.resolve_popups().unwrap_err();
    assert!(matches!(err, RunError::Cancelled(c) if c.0 == StopReason::Stop));
    assert_eq!(h.screen.classify_calls(), 0);
    assert!(h.device.is_empty());
}
