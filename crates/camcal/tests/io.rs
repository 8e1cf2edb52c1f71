use camcal::calib::{CameraIntrinsics, Distortion, Pose, SolveOptions, ViewResult};
use camcal::io::{load_calibration, save_calibration, CalibIoError, SessionConfig};
use camcal::{CalibrationResult, PatternGeometry};
use std::fs;

#[test]
fn session_config_round_trips_and_applies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let mut config = SessionConfig::new("/dev/video0", PatternGeometry::new(9, 6, 25.0).unwrap());
    config.solve = Some(SolveOptions {
        zero_tangential: true,
        ..SolveOptions::default()
    });
    config.write_json(&path).unwrap();
    let loaded = SessionConfig::load_json(&path).unwrap();
    assert_eq!(loaded.camera_address, "/dev/video0");
    assert_eq!(loaded.pattern, config.pattern);
    assert!(loaded.solve.unwrap().zero_tangential);

    let minimal = dir.path().join("minimal.json");
    fs::write(
        &minimal,
        r#"{
            "camera_address": "frames/",
            "pattern": { "pattern_width": 7, "pattern_height": 5, "square_size_mm": 30.0 }
        }"#,
    )
    .unwrap();
    let loaded = SessionConfig::load_json(&minimal).unwrap();
    assert_eq!(loaded.min_views, 10);
    assert_eq!(loaded.capture.grab_timeout_ms, 500);
    assert_eq!(loaded.capture.reconnect_delay_ms, 1000);
    assert!(!loaded.sequence.looping);
    assert_eq!(
        loaded.output_path(),
        std::path::PathBuf::from("camcal_calibration.json")
    );
    assert_eq!(loaded.build_pipeline().geometry().pattern_width(), 7);
}

#[test]
fn invalid_pattern_in_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(
        &path,
        r#"{
            "camera_address": "frames/",
            "pattern": { "pattern_width": 9, "pattern_height": 6, "square_size_mm": -1.0 }
        }"#,
    )
    .unwrap();
    assert!(matches!(
        SessionConfig::load_json(&path),
        Err(CalibIoError::Geometry(_))
    ));
    assert!(matches!(
        SessionConfig::load_json(dir.path().join("missing.json")),
        Err(CalibIoError::Io(_))
    ));
}

#[test]
fn calibration_result_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calibration.json");
    let result = CalibrationResult {
        rms_error: 0.1875,
        intrinsics: CameraIntrinsics::new(812.5, 809.25, 321.0, 238.5),
        distortion: Distortion::new(-0.25, 0.0625, 0.00048828125, -0.000244140625),
        image_width: 640,
        image_height: 480,
        views: vec![ViewResult {
            pose: Pose {
                rvec: [0.125, -0.25, 0.0625],
                tvec: [-80.0, -50.0, 600.0],
            },
            rms_error: 0.15625,
        }],
    };

    save_calibration(&result, &path).unwrap();
    assert_eq!(load_calibration(&path).unwrap(), result);

    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(load_calibration(&path), Err(CalibIoError::Json(_))));
}
