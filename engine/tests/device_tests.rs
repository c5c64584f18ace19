use std::fs;
use std::time::Duration;

use cavebot_engine::scripted::{Action, RecordingExecutor, ScriptedClassifier};
use cavebot_engine::{
    CoordinateLibrary, Device, DeviceError, Direction, FrameClassifier, FrameState, ManualClock,
    Pacer, Resolution, RunSignal, StopReason,
};

fn temp_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("cavebot-engine-{tag}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_bucket(root: &std::path::Path, bucket: &str, resume: [f32; 2]) {
    let dir = root.join("coords").join(bucket);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("buttons.json"),
        format!("{{\"resume\":[{},{}]}}", resume[0], resume[1]),
    )
    .unwrap();
    fs::write(
        dir.join("movements.json"),
        r#"{"n":[[0.5,0.8],[0.5,0.6]],"w":[[0.5,0.8],[0.3,0.8]]}"#,
    )
    .unwrap();
}

#[test]
fn library_picks_exact_bucket_when_present() {
    let root = temp_dir("exact");
    write_bucket(&root, "1080x1920", [0.5, 0.5]);
    write_bucket(&root, "720x1280", [0.1, 0.1]);

    let library = CoordinateLibrary::new(&root);
    assert_eq!(library.buckets(), vec!["1080x1920", "720x1280"]);
    let (bucket, table) = library.select(Resolution::new(720, 1280)).unwrap();
    assert_eq!(bucket, "720x1280");
    assert_eq!(table.button("resume").unwrap(), (0.1, 0.1));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn library_falls_back_to_first_bucket() {
    let root = temp_dir("fallback");
    write_bucket(&root, "1080x1920", [0.5, 0.5]);

    let (bucket, _) = CoordinateLibrary::new(&root)
        .select(Resolution::new(1440, 3200))
        .unwrap();
    assert_eq!(bucket, "1080x1920");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn empty_library_is_an_error() {
    let root = temp_dir("empty");
    let err = CoordinateLibrary::new(&root)
        .select(Resolution::default())
        .unwrap_err();
    assert!(matches!(err, DeviceError::InvalidCoordinate(_)));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn device_stops_mid_sequence_when_pacer_trips() {
    let root = temp_dir("trip");
    write_bucket(&root, "1080x1920", [0.5, 0.5]);
    let (_, table) = CoordinateLibrary::new(&root)
        .select(Resolution::default())
        .unwrap();

    let signal = RunSignal::new();
    let clock = ManualClock::new().tripping(Duration::from_secs(2), signal.clone(), StopReason::Pause);
    let pacer = Pacer::new(clock, signal.clone());
    let recorder = RecordingExecutor::new(Resolution::default());
    let mut device = Device::new(recorder.clone(), table, signal.clone());

    device.swipe(Direction::N, 1.0).unwrap();
    let waited = pacer.wait(5.0);
    assert!(waited.is_err());
    let err = device.swipe(Direction::W, 1.0).unwrap_err();

    assert_eq!(err.cancellation().map(|c| c.0), Some(StopReason::Pause));
    assert_eq!(recorder.swipe_count(), 1);
    assert!(matches!(recorder.actions()[0], Action::Swipe { .. }));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn scripted_classifier_can_be_fed_from_another_handle() {
    let feeder = ScriptedClassifier::new(FrameState::Unknown);
    let mut owned = feeder.clone();

    assert_eq!(owned.classify(None).unwrap(), FrameState::Unknown);
    feeder.push_state(FrameState::AngelHeal);
    assert_eq!(owned.classify(None).unwrap(), FrameState::AngelHeal);
    assert_eq!(feeder.classify_calls(), 2);
}
