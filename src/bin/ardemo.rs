//! 合成视频流演示 (Synthetic-stream demo)
//!
//! 运行完整检测管线: 合成帧源 + 脚本化后端 + 3D估计
//! cargo run --bin ardemo -- --frames 20 --interval 100

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use yolo_ar_rs::{
    CanvasSize, DetectionController, DetectionEvent, ModelMetadata, PipelineConfig, StubDetector,
    SyntheticSource,
};

#[derive(Parser, Debug)]
#[command(about = "Real-time detection pipeline demo on a synthetic stream")]
struct Args {
    /// Number of host frames to simulate
    #[arg(long, default_value_t = 30)]
    frames: u32,

    /// Inference interval in milliseconds
    #[arg(long, default_value_t = 100)]
    interval: u64,

    /// Score threshold
    #[arg(long, default_value_t = 0.7)]
    conf: f32,

    /// Camera field of view in degrees
    #[arg(long, default_value_t = 50.0)]
    fov: f32,

    /// Pause the loop after the first detection (single-shot UX)
    #[arg(long, default_value_t = false)]
    pause_on_detect: bool,

    /// Skip the depth/orientation estimator
    #[arg(long, default_value_t = false)]
    no_3d: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!(
        "🚀 检测管线演示启动 (session {})",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let source = SyntheticSource::new(1280, 720)
        .with_target(560.0, 260.0, 160.0, 200.0)
        .with_jitter(4.0);

    // scripted backend: input shape and labels from model metadata,
    // one "person" drifting through letterbox space
    let meta = ModelMetadata::from_json(r#"{"imgsz": [640, 640], "names": {"0": "person"}}"#)?;
    let detector = StubDetector::from_metadata(&meta)
        .with_script(vec![
            vec![],
            vec![(300.0, 280.0, 80.0, 100.0, 0.82, 0.0)],
            vec![(310.0, 282.0, 80.0, 100.0, 0.88, 0.05)],
            vec![(322.0, 285.0, 82.0, 102.0, 0.91, 0.05)],
        ]);

    let config = PipelineConfig {
        inference_interval_ms: args.interval,
        score_threshold: args.conf,
        camera_fov_deg: args.fov,
        pause_on_detection: args.pause_on_detect,
        estimate_3d: !args.no_3d,
        ..Default::default()
    };

    let canvas = CanvasSize::new(960.0, 540.0);
    let mut controller = DetectionController::new(source, detector, canvas, config);
    controller.registry().register("person", 0.45, 1.7)?;

    controller.start()?;
    let events = controller.events();

    println!("✅ 摄像头就绪, 开始检测循环 ({}帧)", args.frames);

    for _ in 0..args.frames {
        if let Err(e) = controller.tick() {
            eprintln!("❌ 致命错误, 循环暂停: {}", e);
            break;
        }
        while let Ok(event) = events.try_recv() {
            match event {
                DetectionEvent::CameraReady => println!("📷 camera ready"),
                DetectionEvent::CameraDenied => println!("🚫 camera denied"),
                DetectionEvent::Frame(Some(det)) => {
                    let b = det.bounding_box;
                    print!(
                        "🎯 {} score={:.2} box=({:.0},{:.0} {:.0}x{:.0})",
                        det.class_name.as_deref().unwrap_or("object"),
                        det.score,
                        b.x,
                        b.y,
                        b.width,
                        b.height
                    );
                    if let Some(depth) = det.depth {
                        print!(" depth={:.2}m", depth);
                    }
                    if let Some(o) = det.orientation {
                        print!(" pitch={:.1}° roll={:.1}°", o.pitch, o.roll);
                    }
                    println!();
                }
                DetectionEvent::Frame(None) => println!("·  no detection"),
                DetectionEvent::MemoryPressure { live, threshold } => {
                    println!("⚠️  memory pressure: {} live tensors (limit {})", live, threshold)
                }
            }
        }
        std::thread::sleep(Duration::from_millis(args.interval / 2 + 1));
    }

    controller.dispose();
    println!("👋 演示结束");
    Ok(())
}
