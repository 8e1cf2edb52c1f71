use camcal::boundary::{compute_calibration, flatten_points, undistort, BoundaryError};
use camcal::synthetic::{board_facing_camera, render_checkerboard, SyntheticCamera};
use camcal::{detect_pattern, PatternGeometry};

#[test]
fn flat_calibration_round_trip() {
    let _ = env_logger::builder().is_test(true).try_init();
    let geometry = PatternGeometry::new(9, 6, 25.0).unwrap();
    let camera = SyntheticCamera::pinhole(500.0, 640, 480);

    let mut views = Vec::new();
    for tilt in [[0.35, -0.3, 0.1], [-0.3, 0.35, -0.05], [0.4, 0.25, 0.15]] {
        let pose = board_facing_camera(&geometry, tilt, 500.0);
        let mut frame = render_checkerboard(&camera, &geometry, &pose, 4);
        let corners = detect_pattern(&mut frame, 9, 6).expect("board found");
        let flat = flatten_points(&corners);
        assert_eq!(flat.len(), 108);
        views.push(flat);
    }

    let (rms, distortion, k) = compute_calibration(&views, &geometry, 640, 480).unwrap();
    assert!(rms < 0.3, "rms {rms}");
    assert!((k[0] - 500.0).abs() < 15.0, "{k:?}");
    assert!((k[4] - 500.0).abs() < 15.0, "{k:?}");
    assert_eq!([k[1], k[3], k[6], k[7], k[8]], [0.0, 0.0, 0.0, 0.0, 1.0]);
    assert!(distortion.iter().all(|d| d.is_finite()));

    let pose = board_facing_camera(&geometry, [0.0; 3], 500.0);
    let frame = render_checkerboard(&camera, &geometry, &pose, 1);
    let out = undistort(&frame, &k, &distortion).unwrap();
    assert_eq!(out.dimensions(), (640, 480));
    assert_eq!(
        undistort(&frame, &k, &distortion[..3]).unwrap_err(),
        BoundaryError::DistortionLength(3)
    );
}

#[test]
fn flat_single_view_calibration_uses_default_options() {
    let geometry = PatternGeometry::new(9, 6, 25.0).unwrap();
    let camera = SyntheticCamera::pinhole(500.0, 640, 480);
    for tilt in [[0.35, -0.3, 0.1], [-0.3, 0.35, -0.05]] {
        let pose = board_facing_camera(&geometry, tilt, 500.0);
        let mut frame = render_checkerboard(&camera, &geometry, &pose, 4);
        let corners = detect_pattern(&mut frame, 9, 6).expect("board found");

        let (rms, distortion, k) =
            compute_calibration(&[flatten_points(&corners)], &geometry, 640, 480).unwrap();
        assert!(rms < 0.2, "tilt {tilt:?}: rms {rms}");
        assert!((k[0] - 500.0).abs() < 15.0, "tilt {tilt:?}: {k:?}");
        assert!((k[4] - 500.0).abs() < 15.0, "tilt {tilt:?}: {k:?}");
        assert_eq!([k[2], k[5]], [319.5, 239.5]);
        assert_eq!(&distortion[2..], &[0.0, 0.0]);
    }
}
