mod common;

use cavebot::{BotEvent, Outcome, RunEnd};
use cavebot_engine::FrameState;
use common::Harness;

#[test]
fn chapter_six_is_played_from_the_menu_to_a_win() {
    let mut h = Harness::chapter(6);
    h.screen.set_template("least_5_energy", true);
    h.screen.set_template("door_open_1", true);
    h.screen.set_template("boss_died_3", true);
    h.screen.set_exp_default(true);
    h.screen.push_states([FrameState::MenuHome; 2]);

    // Once the final level starts: its popup check, the post-fight look and
    // the end screen.
    let screen = h.screen.clone();
    h.notifier.subscribe(move |event| {
        if *event == BotEvent::LevelChanged(20) {
            screen.push_states([FrameState::InGame, FrameState::Endgame, FrameState::Endgame]);
        }
    });

    assert_eq!(h.bot.run().unwrap(), RunEnd::Completed);

    let records = h.stats.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.outcomes.as_slice(), &[Outcome::WonGame]);
    assert_eq!(record.chapter, 6);
    assert_eq!(record.level_start, 0);
    assert_eq!(record.level_end, 20);

    let levels: Vec<u32> = h
        .events()
        .into_iter()
        .filter_map(|e| match e {
            BotEvent::LevelChanged(level) => Some(level),
            _ => None,
        })
        .collect();
    assert_eq!(levels, (0..=20).collect::<Vec<_>>());
    assert!(h.events().contains(&BotEvent::GameWon));
    assert_eq!(h.taps_of("close_end"), 1);
    assert_eq!(h.bot.session().level, 0);
    assert_eq!(h.status.snapshot().wins, 1);
}
