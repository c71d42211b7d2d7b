//! End-to-end tests for the detection loop state machine, run against the
//! synthetic frame source and the scripted backend.

use std::sync::Arc;
use std::time::Duration;

use yolo_ar_rs::{
    CanvasSize, DetectionController, DetectionEvent, LoopState, PipelineConfig, SizeRegistry,
    StubDetector, SyntheticSource,
};

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        inference_interval_ms: 0,
        resume_settle_ms: 0,
        score_threshold: 0.7,
        ..Default::default()
    }
}

fn source() -> SyntheticSource {
    SyntheticSource::new(1280, 720).with_target(560.0, 260.0, 160.0, 200.0)
}

fn hit_detector() -> StubDetector {
    StubDetector::new(640, 640).with_detections(vec![(300.0, 280.0, 80.0, 100.0, 0.9, 0.0)])
}

#[test]
fn camera_ready_event_on_start() {
    let mut c = DetectionController::new(source(), hit_detector(), CanvasSize::new(960.0, 540.0), fast_config());
    c.start().unwrap();
    let events = c.events();
    assert!(matches!(events.try_recv(), Ok(DetectionEvent::CameraReady)));
}

#[test]
fn camera_denied_is_degraded_not_fatal() {
    let src = SyntheticSource::new(1280, 720).denying_permission();
    let mut c = DetectionController::new(src, hit_detector(), CanvasSize::new(960.0, 540.0), fast_config());
    c.start().unwrap(); // completes successfully in degraded form
    let events = c.events();
    assert!(matches!(events.try_recv(), Ok(DetectionEvent::CameraDenied)));
    // loop stays dormant: no frame events ever
    c.tick().unwrap();
    assert!(events.try_recv().is_err());
}

#[test]
fn single_shot_pauses_on_detection() {
    let mut config = fast_config();
    config.pause_on_detection = true;
    let mut c = DetectionController::new(source(), hit_detector(), CanvasSize::new(960.0, 540.0), config);
    c.start().unwrap();
    let events = c.events();
    events.try_recv().unwrap(); // CameraReady

    c.tick().unwrap();
    match events.try_recv() {
        Ok(DetectionEvent::Frame(Some(det))) => {
            assert!((det.score - 0.9).abs() < 1e-6);
            // remapped into canvas space
            assert!(det.bounding_box.x >= 0.0);
            assert!(det.bounding_box.x <= 960.0);
        }
        other => panic!("expected a detection frame, got {:?}", other),
    }
    assert_eq!(c.state(), LoopState::Paused);
    // the hit also freezes the video
    assert!(!c.source_playing());

    // no further attempts start while paused
    c.tick().unwrap();
    assert!(events.try_recv().is_err());
}

#[test]
fn resume_re_arms_after_settle() {
    let mut config = fast_config();
    config.pause_on_detection = true;
    let mut c = DetectionController::new(source(), hit_detector(), CanvasSize::new(960.0, 540.0), config);
    c.start().unwrap();
    let events = c.events();
    events.try_recv().unwrap();

    c.tick().unwrap();
    events.try_recv().unwrap(); // the detection frame
    assert_eq!(c.state(), LoopState::Paused);

    c.resume();
    assert!(c.source_playing()); // video restarted immediately
    std::thread::sleep(Duration::from_millis(5));
    c.tick().unwrap(); // first tick past the settle deadline re-arms and runs
    assert!(matches!(events.try_recv(), Ok(DetectionEvent::Frame(Some(_)))));
}

#[test]
fn resume_does_not_cancel_detection_pause() {
    let mut c = DetectionController::new(source(), hit_detector(), CanvasSize::new(960.0, 540.0), fast_config());
    c.start().unwrap();
    let events = c.events();
    events.try_recv().unwrap();

    c.detection_pause();
    c.resume(); // settle deadline elapses, but the loop was not paused
    std::thread::sleep(Duration::from_millis(5));
    c.tick().unwrap();
    assert_eq!(c.state(), LoopState::DetectionPaused);
    assert!(events.try_recv().is_err());
}

#[test]
fn continuous_mode_reports_empty_frames() {
    let detector = StubDetector::new(640, 640); // nothing scripted
    let mut c = DetectionController::new(source(), detector, CanvasSize::new(960.0, 540.0), fast_config());
    c.start().unwrap();
    let events = c.events();
    events.try_recv().unwrap();

    c.tick().unwrap();
    assert!(matches!(events.try_recv(), Ok(DetectionEvent::Frame(None))));
    // loop went back to idle and keeps going
    assert_eq!(c.state(), LoopState::Idle);
    c.tick().unwrap();
    assert!(matches!(events.try_recv(), Ok(DetectionEvent::Frame(None))));
}

#[test]
fn interval_gates_attempts() {
    let mut config = fast_config();
    config.inference_interval_ms = 10_000;
    let detector = StubDetector::new(640, 640);
    let mut c = DetectionController::new(source(), detector, CanvasSize::new(960.0, 540.0), config);
    c.start().unwrap();
    let events = c.events();
    events.try_recv().unwrap();

    c.tick().unwrap();
    assert!(matches!(events.try_recv(), Ok(DetectionEvent::Frame(None))));
    // second tick inside the interval: no attempt
    c.tick().unwrap();
    assert!(events.try_recv().is_err());
}

#[test]
fn recoverable_backend_error_keeps_loop_alive() {
    let detector = StubDetector::new(640, 640).failing("transient backend failure");
    let mut c = DetectionController::new(source(), detector, CanvasSize::new(960.0, 540.0), fast_config());
    c.start().unwrap();

    // absorbed: tick returns Ok and the loop unwinds to idle
    c.tick().unwrap();
    assert_eq!(c.state(), LoopState::Idle);
    c.tick().unwrap();
    assert_eq!(c.state(), LoopState::Idle);
}

#[test]
fn fatal_transform_error_pauses_loop() {
    // zero-sized canvas: crop passes (full frame) but the remap's global
    // canvas validation fails, which is fatal
    let mut c = DetectionController::new(source(), hit_detector(), CanvasSize::new(0.0, 0.0), fast_config());
    c.start().unwrap();
    let err = c.tick().unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(c.state(), LoopState::Paused);
}

#[test]
fn fractional_crop_origin_remaps_exactly() {
    // 1281x640 video on a 2:1 canvas crops to 1280 wide with origin
    // x = 0.5; the sliced tensor and the recorded crop size must agree,
    // or the remap picks up a sub-pixel error
    let src = SyntheticSource::new(1281, 640);
    let detector = StubDetector::new(640, 640)
        .with_detections(vec![(300.0, 280.0, 80.0, 100.0, 0.9, 0.0)]);
    let mut c = DetectionController::new(src, detector, CanvasSize::new(960.0, 480.0), fast_config());
    c.start().unwrap();
    let events = c.events();
    events.try_recv().unwrap();

    c.tick().unwrap();
    match events.try_recv() {
        Ok(DetectionEvent::Frame(Some(det))) => {
            // letterbox scale 0.5 (1280x640 -> 640x320, top pad 160),
            // then canvas scale 0.75
            let b = det.bounding_box;
            assert!((b.x - 450.0).abs() < 1e-2);
            assert!((b.y - 180.0).abs() < 1e-2);
            assert!((b.width - 120.0).abs() < 1e-2);
            assert!((b.height - 150.0).abs() < 1e-2);
        }
        other => panic!("expected a detection frame, got {:?}", other),
    }
}

#[test]
fn detection_pause_skips_inference() {
    let mut c = DetectionController::new(source(), hit_detector(), CanvasSize::new(960.0, 540.0), fast_config());
    c.start().unwrap();
    let events = c.events();
    events.try_recv().unwrap();

    c.detection_pause();
    assert_eq!(c.state(), LoopState::DetectionPaused);
    c.tick().unwrap();
    assert!(events.try_recv().is_err());

    c.detection_resume();
    c.tick().unwrap();
    assert!(matches!(events.try_recv(), Ok(DetectionEvent::Frame(Some(_)))));
}

#[test]
fn dispose_stops_everything() {
    let mut c = DetectionController::new(source(), hit_detector(), CanvasSize::new(960.0, 540.0), fast_config());
    c.start().unwrap();
    let events = c.events();
    events.try_recv().unwrap();

    c.dispose();
    c.tick().unwrap();
    assert!(events.try_recv().is_err());
    c.resume(); // no-op after dispose
    c.tick().unwrap();
    assert!(events.try_recv().is_err());
}

#[test]
fn memory_pressure_triggers_cleanup_event() {
    let detector = StubDetector::new(640, 640).leaking(60); // over the default threshold of 50
    let mut c = DetectionController::new(source(), detector, CanvasSize::new(960.0, 540.0), fast_config());
    c.start().unwrap();
    let events = c.events();
    events.try_recv().unwrap();

    c.tick().unwrap();
    let mut saw_pressure = false;
    while let Ok(event) = events.try_recv() {
        if let DetectionEvent::MemoryPressure { live, threshold } = event {
            assert!(live > threshold);
            saw_pressure = true;
        }
    }
    assert!(saw_pressure);
}

#[test]
fn estimation_augments_top_detection() {
    let registry = Arc::new(SizeRegistry::new());
    registry.register("person", 0.45, 1.7).unwrap();

    let mut config = fast_config();
    config.estimate_3d = true;
    let detector = StubDetector::new(640, 640)
        .with_names(vec!["person".to_string()])
        .with_detections(vec![(300.0, 280.0, 80.0, 100.0, 0.9, 0.0)]);
    let mut c = DetectionController::new(source(), detector, CanvasSize::new(960.0, 540.0), config)
        .with_registry(registry);
    c.start().unwrap();
    let events = c.events();
    events.try_recv().unwrap();

    c.tick().unwrap();
    match events.try_recv() {
        Ok(DetectionEvent::Frame(Some(det))) => {
            assert_eq!(det.class_name.as_deref(), Some("person"));
            let depth = det.depth.expect("depth should be estimated");
            assert!(depth > 0.0);
            assert!(det.orientation.is_some());
        }
        other => panic!("expected an augmented detection, got {:?}", other),
    }
}

#[test]
fn top_detection_is_highest_score() {
    let detector = StubDetector::new(640, 640).with_detections(vec![
        (100.0, 100.0, 40.0, 40.0, 0.75, 0.0),
        (300.0, 280.0, 80.0, 100.0, 0.95, 0.0),
        (500.0, 400.0, 30.0, 30.0, 0.85, 0.0),
    ]);
    let mut c = DetectionController::new(source(), detector, CanvasSize::new(960.0, 540.0), fast_config());
    c.start().unwrap();
    let events = c.events();
    events.try_recv().unwrap();

    c.tick().unwrap();
    match events.try_recv() {
        Ok(DetectionEvent::Frame(Some(det))) => assert!((det.score - 0.95).abs() < 1e-6),
        other => panic!("expected the top detection, got {:?}", other),
    }
}
