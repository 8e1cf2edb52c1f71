use approx::assert_abs_diff_eq;
use camcal::calib::{project_point, Distortion, SolveError, SolveOptions};
use camcal::chessboard::ChessboardParams;
use camcal::synthetic::{board_facing_camera, project_corners, render_checkerboard, SyntheticCamera};
use camcal::{
    detect_pattern, rectify, solve, CalibrationPipeline, Frame, Observation, ObservationSet,
    PatternGeometry,
};
use nalgebra::Point2;

const TILTS: [[f64; 3]; 5] = [
    [0.35, -0.3, 0.1],
    [-0.3, 0.35, -0.05],
    [0.4, 0.25, 0.15],
    [-0.35, -0.25, -0.1],
    [0.1, 0.45, 0.0],
];

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn geometry() -> PatternGeometry {
    PatternGeometry::new(9, 6, 25.0).unwrap()
}

fn max_error(found: &[Point2<f32>], truth: &[Point2<f64>]) -> f64 {
    found
        .iter()
        .zip(truth)
        .map(|(f, t)| ((f.x as f64 - t.x).powi(2) + (f.y as f64 - t.y).powi(2)).sqrt())
        .fold(0.0, f64::max)
}

#[test]
fn detected_corners_follow_object_point_order() {
    init_logging();
    let camera = SyntheticCamera::pinhole(500.0, 640, 480);
    let pose = board_facing_camera(&geometry(), TILTS[0], 500.0);
    let mut frame = render_checkerboard(&camera, &geometry(), &pose, 4);

    let corners = detect_pattern(&mut frame, 9, 6).expect("board found");
    assert_eq!(corners.len(), 54);
    let truth = project_corners(&camera, &geometry(), &pose);
    let err = max_error(&corners, &truth);
    assert!(err < 0.35, "max corner error {err}");
}

#[test]
fn default_single_view_solve_holds_principal_point() {
    init_logging();
    let camera = SyntheticCamera::pinhole(500.0, 640, 480);
    for tilt in &TILTS[..3] {
        let mut pipeline = CalibrationPipeline::new(geometry());
        let pose = board_facing_camera(&geometry(), *tilt, 500.0);
        let mut frame = render_checkerboard(&camera, &geometry(), &pose, 4);
        assert!(pipeline.add_observation(&mut frame), "tilt {tilt:?}");

        let result = pipeline.solve().expect("solve");
        assert!(result.rms_error < 0.2, "tilt {tilt:?}: rms {}", result.rms_error);
        assert_abs_diff_eq!(result.intrinsics.fx, 500.0, epsilon = 15.0);
        assert_abs_diff_eq!(result.intrinsics.fy, 500.0, epsilon = 15.0);
        assert_eq!((result.intrinsics.cx, result.intrinsics.cy), (319.5, 239.5));
        assert_eq!((result.distortion.p1, result.distortion.p2), (0.0, 0.0));
    }
}

#[test]
fn solve_rejects_a_size_other_than_the_recorded_one() {
    let camera = SyntheticCamera::pinhole(500.0, 640, 480);
    let pose = board_facing_camera(&geometry(), TILTS[1], 500.0);
    let mut frame = render_checkerboard(&camera, &geometry(), &pose, 4);
    let corners = detect_pattern(&mut frame, 9, 6).expect("board found");

    let mut set = ObservationSet::new();
    let obs = Observation::from_detection(&geometry(), &corners).unwrap();
    set.push(obs, 640, 480).unwrap();
    assert_eq!(
        solve(set, &geometry(), 800, 600, &SolveOptions::default()),
        Err(SolveError::InvalidImageSize {
            width: 800,
            height: 600
        })
    );
}

#[test]
fn single_view_calibration_matches_the_rendering_camera() {
    init_logging();
    let camera = SyntheticCamera::pinhole(500.0, 640, 480);
    let options = SolveOptions {
        fix_principal_point: true,
        zero_tangential: true,
        ..SolveOptions::default()
    };
    let mut pipeline =
        CalibrationPipeline::with_params(geometry(), ChessboardParams::default(), options);

    let pose = board_facing_camera(&geometry(), TILTS[0], 500.0);
    let mut frame = render_checkerboard(&camera, &geometry(), &pose, 4);
    assert!(pipeline.add_observation(&mut frame));

    let result = pipeline.solve().expect("solve");
    assert!(result.rms_error < 0.2, "rms {}", result.rms_error);
    assert_abs_diff_eq!(result.intrinsics.fx, 500.0, epsilon = 10.0);
    assert_abs_diff_eq!(result.intrinsics.fy, 500.0, epsilon = 10.0);
    assert_eq!((result.image_width, result.image_height), (640, 480));
    assert!(pipeline.is_empty());
}

#[test]
fn multi_view_calibration_recovers_distortion() {
    init_logging();
    let camera = SyntheticCamera::pinhole(500.0, 640, 480)
        .with_distortion(Distortion::new(-0.15, 0.0, 0.0, 0.0));
    let mut pipeline = CalibrationPipeline::new(geometry());
    for tilt in TILTS {
        let pose = board_facing_camera(&geometry(), tilt, 500.0);
        let mut frame = render_checkerboard(&camera, &geometry(), &pose, 4);
        assert!(pipeline.add_observation(&mut frame), "tilt {tilt:?}");
    }
    assert_eq!(pipeline.len(), TILTS.len());

    let result = pipeline.solve().expect("solve");
    assert!(result.rms_error < 0.2, "rms {}", result.rms_error);
    assert_abs_diff_eq!(result.intrinsics.fx, 500.0, epsilon = 10.0);
    assert_abs_diff_eq!(result.intrinsics.cx, 319.5, epsilon = 5.0);
    assert_abs_diff_eq!(result.distortion.k1, -0.15, epsilon = 0.05);
    assert_eq!(result.views.len(), TILTS.len());
}

#[test]
fn rectified_frame_matches_the_pinhole_projection() {
    init_logging();
    let distorted = SyntheticCamera::pinhole(500.0, 640, 480)
        .with_distortion(Distortion::new(-0.2, 0.05, 0.0, 0.0));
    let pinhole = SyntheticCamera::pinhole(500.0, 640, 480);
    let pose = board_facing_camera(&geometry(), TILTS[1], 500.0);
    let frame = render_checkerboard(&distorted, &geometry(), &pose, 4);

    let calibration = camcal::CalibrationResult {
        rms_error: 0.0,
        intrinsics: distorted.intrinsics,
        distortion: distorted.distortion,
        image_width: 640,
        image_height: 480,
        views: Vec::new(),
    };
    let mut rectified = rectify(&frame, &calibration);
    assert_eq!(rectify(&frame, &calibration), rectified);

    let corners = detect_pattern(&mut rectified, 9, 6).expect("board found after rectify");
    let truth = project_corners(&pinhole, &geometry(), &pose);
    let err = max_error(&corners, &truth);
    assert!(err < 0.5, "max corner error {err}");

    // sanity: the distortion is large enough to matter
    let bent = project_point(
        &distorted.intrinsics,
        &distorted.distortion,
        &pose.rotation(),
        &pose.translation(),
        &geometry().object_points()[0],
    );
    assert!((bent - truth[0]).norm() > 1.0);
}

#[test]
fn blank_frames_are_not_observations() {
    init_logging();
    let mut pipeline = CalibrationPipeline::new(geometry());
    let mut blank = Frame::filled(320, 240, [128, 128, 128]);
    assert!(!pipeline.add_observation(&mut blank));
    assert_eq!(blank, Frame::filled(320, 240, [128, 128, 128]));
    assert_eq!(pipeline.solve(), Err(SolveError::NoObservations));
}

#[test]
fn frames_of_another_size_are_rejected() {
    init_logging();
    let pose = board_facing_camera(&geometry(), TILTS[0], 500.0);
    let mut pipeline = CalibrationPipeline::new(geometry());

    let big = SyntheticCamera::pinhole(500.0, 640, 480);
    let mut frame = render_checkerboard(&big, &geometry(), &pose, 2);
    assert!(pipeline.add_observation(&mut frame));

    let other = SyntheticCamera::pinhole(500.0, 600, 480);
    let mut frame = render_checkerboard(&other, &geometry(), &pose, 2);
    assert!(!pipeline.add_observation(&mut frame));
    assert_eq!(pipeline.len(), 1);
}
