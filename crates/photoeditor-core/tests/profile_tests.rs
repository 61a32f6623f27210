use std::time::Duration;

use photoeditor_core::config::ProcessorConfig;
use photoeditor_core::processor::ImageProcessor;
use photoeditor_core::profile::{
    PROFILE_DIR_ENV, PROFILE_ENV, ProcessorProfile, RunOutcome, is_profiling_enabled,
    profile_output_path, write_profile,
};
use photoeditor_test_harness::fixtures::{fixture_dir, gradient_image};

fn profiled_session() -> ProcessorProfile {
    let config = ProcessorConfig::default().with_profiling(true);
    let processor = ImageProcessor::with_image(gradient_image(48, 48), config).unwrap();
    processor.change_brightness(12.0).unwrap();
    processor.change_gamma(0.6).unwrap();
    assert!(processor.wait_until_idle(Duration::from_secs(10)));
    processor.profile().unwrap()
}

#[test]
fn test_write_profile_roundtrip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("session.profile.json");

    let profile = profiled_session();
    write_profile(&profile, &path).unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    let loaded: ProcessorProfile = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded, profile);
}

#[test]
fn test_profile_json_fields() {
    let profile = profiled_session();
    let value = serde_json::to_value(&profile).unwrap();
    assert!(value["runs"].is_array());
    assert!(value["p95_run_ms"].is_number());
    assert_eq!(value["total_runs"].as_u64().unwrap() as usize, profile.runs.len());

    let last = profile.runs.last().unwrap();
    assert_eq!(last.outcome, RunOutcome::Completed);
    assert_eq!(last.settings.gamma, 0.6);
}

#[test]
fn test_profile_env_handling() {
    // Env vars are process-wide; keep every env assertion in this one test.
    unsafe { std::env::set_var(PROFILE_ENV, "TRUE") };
    assert!(is_profiling_enabled());
    assert!(ProcessorConfig::from_env().profiling);

    unsafe { std::env::set_var(PROFILE_ENV, "0") };
    assert!(!is_profiling_enabled());

    unsafe { std::env::remove_var(PROFILE_ENV) };
    assert!(!ProcessorConfig::from_env().profiling);

    let fallback = fixture_dir();
    unsafe { std::env::remove_var(PROFILE_DIR_ENV) };
    assert_eq!(
        profile_output_path(fallback.path()),
        fallback.path().join("photoeditor.profile.json")
    );

    let override_dir = fixture_dir();
    unsafe { std::env::set_var(PROFILE_DIR_ENV, override_dir.path()) };
    assert_eq!(
        profile_output_path(fallback.path()),
        override_dir.path().join("photoeditor.profile.json")
    );
    unsafe { std::env::remove_var(PROFILE_DIR_ENV) };
}
