/// 帧控制器 (Detection loop / frame controller)
///
/// 宿主每帧调用 `tick`; 控制器按间隔节流, 串联
/// 裁剪 → letterbox → 推理 → 解码 → 重映射 → (可选)3D估计,
/// 并在出错时分类处理, 保证循环不会悄悄挂起
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{error, info, warn};
use ndarray::{s, Axis, Ix3};

use crate::backend::Detector;
use crate::detection::{decode_output, Detection};
use crate::error::PipelineError;
use crate::estimate::{
    add_3d_to_detections, focal_length_from_fov, EstimationContext, SizeRegistry,
};
use crate::input::{CanvasSize, FrameSource, SourceError};
use crate::pipeline::crop::{compute_crop, CropRegion};
use crate::pipeline::{shared_registry, DetectionEvent, PipelineConfig};
use crate::transform::{letterbox, transform_to_canvas};

/// 循环状态 (Loop state)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the next scheduled attempt.
    Idle,
    /// One detection attempt in flight. The idle gate guarantees at most
    /// one at a time.
    Processing,
    /// Loop halted; only an explicit resume restarts it.
    Paused,
    /// Camera keeps running, inference is skipped.
    DetectionPaused,
}

/// Cache key for the crop region: (video w, video h, canvas w, canvas h).
type CropKey = (u32, u32, u32, u32);

pub struct DetectionController<S: FrameSource, D: Detector> {
    source: S,
    detector: D,
    canvas: CanvasSize,
    config: PipelineConfig,
    registry: Arc<SizeRegistry>,

    state: LoopState,
    camera_ready: bool,
    disposed: bool,
    last_attempt: Option<Instant>,
    resume_at: Option<Instant>,
    crop_cache: Option<(CropKey, CropRegion)>,

    // previous frame's detections, for motion-based depth
    previous: Vec<Detection>,
    previous_at: Option<Instant>,

    events_tx: Sender<DetectionEvent>,
    events_rx: Receiver<DetectionEvent>,
}

impl<S: FrameSource, D: Detector> DetectionController<S, D> {
    pub fn new(source: S, detector: D, canvas: CanvasSize, config: PipelineConfig) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            source,
            detector,
            canvas,
            config,
            registry: shared_registry(),
            state: LoopState::Idle,
            camera_ready: false,
            disposed: false,
            last_attempt: None,
            resume_at: None,
            crop_cache: None,
            previous: Vec::new(),
            previous_at: None,
            events_tx,
            events_rx,
        }
    }

    /// Use an isolated size registry instead of the process-wide default.
    pub fn with_registry(mut self, registry: Arc<SizeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Acquire the camera stream.
    ///
    /// Permission denial is routed to the `CameraDenied` event and start
    /// completes in degraded form (the loop stays dormant); any other
    /// source failure is fatal.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        match self.source.open() {
            Ok(()) => {
                self.camera_ready = true;
                let _ = self.events_tx.send(DetectionEvent::CameraReady);
                info!("camera ready, detection loop armed");
                Ok(())
            }
            Err(SourceError::PermissionDenied) => {
                warn!("camera permission denied, running without camera");
                let _ = self.events_tx.send(DetectionEvent::CameraDenied);
                Ok(())
            }
            Err(SourceError::Other(e)) => {
                error!("camera failed to open: {}", e);
                Err(PipelineError::NotInitialized("camera"))
            }
        }
    }

    /// Event stream (camera lifecycle, per-frame results, memory pressure).
    pub fn events(&self) -> Receiver<DetectionEvent> {
        self.events_rx.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn registry(&self) -> &SizeRegistry {
        &self.registry
    }

    /// Whether the underlying video stream is currently playing.
    pub fn source_playing(&self) -> bool {
        self.source.is_playing()
    }

    /// Drive the loop. Call once per rendered frame from the host's
    /// frame-scheduling primitive; actual cadence is bounded below by the
    /// caller's refresh rate and above by `inference_interval_ms`.
    ///
    /// Returns `Err` only for fatal failures, after pausing the loop.
    pub fn tick(&mut self) -> Result<(), PipelineError> {
        if self.disposed {
            return Ok(());
        }

        // settle gate: resume() records a deadline; the first tick past it
        // re-arms a paused loop on a fresh frame. Only the full pause state
        // is eligible; a detection pause is lifted by detection_resume.
        if self.state == LoopState::Paused {
            if let Some(deadline) = self.resume_at {
                if Instant::now() >= deadline {
                    self.resume_at = None;
                    self.last_attempt = None;
                    self.state = LoopState::Idle;
                }
            }
        }

        if self.state != LoopState::Idle || !self.camera_ready {
            return Ok(());
        }
        let now = Instant::now();
        if let Some(last) = self.last_attempt {
            if now.duration_since(last) < Duration::from_millis(self.config.inference_interval_ms)
            {
                return Ok(());
            }
        }

        self.state = LoopState::Processing;
        self.last_attempt = Some(now);

        let outcome = self.process_frame();
        let result = match outcome {
            Ok(top) => {
                let found = top.is_some();
                let _ = self.events_tx.send(DetectionEvent::Frame(top));
                if found && self.config.pause_on_detection {
                    // single-shot UX: freeze the video on the hit
                    self.source.pause();
                    self.state = LoopState::Paused;
                    self.resume_at = None;
                }
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                error!("fatal detection error, pausing loop: {}", e);
                self.state = LoopState::Paused;
                self.resume_at = None;
                Err(e)
            }
            Err(e) => {
                warn!("recoverable detection error, will retry: {}", e);
                Ok(())
            }
        };

        // cleanup phase: unwind to idle unless a transition already happened
        if self.state == LoopState::Processing {
            self.state = LoopState::Idle;
        }
        result
    }

    /// One detection attempt. Every intermediate tensor (cropped frame,
    /// letterboxed input, batched input, raw output) is scoped to this
    /// call and dropped on all exit paths.
    fn process_frame(&mut self) -> Result<Option<Detection>, PipelineError> {
        let (video_w, video_h) = self.source.dimensions();
        if video_w == 0 || video_h == 0 {
            return Err(PipelineError::NotInitialized("video dimensions"));
        }
        let crop = self.crop_region(video_w, video_h);

        let frame = self.source.frame().map_err(PipelineError::Unexpected)?;
        let frame = frame
            .into_dimensionality::<Ix3>()
            .map_err(|_| PipelineError::InvalidShape("frame is not (h, w, c)".into()))?;

        // both ends round, so a fractional crop origin cannot make the
        // slice disagree with the recorded crop size
        let (x0, y0) = (crop.x.round() as usize, crop.y.round() as usize);
        let (x1, y1) = (
            (crop.x + crop.width).round() as usize,
            (crop.y + crop.height).round() as usize,
        );
        if y1 > frame.shape()[0] || x1 > frame.shape()[1] || x0 >= x1 || y0 >= y1 {
            return Err(PipelineError::InvalidShape(format!(
                "crop {:?} exceeds frame {:?}",
                crop,
                frame.shape()
            )));
        }
        let cropped = frame.slice(s![y0..y1, x0..x1, ..]).to_owned().into_dyn();

        let (input_h, input_w) = self.detector.input_shape();
        let (padded, mut info) = letterbox(cropped.view(), input_h, input_w)?;
        // record the crop dimensions actually sliced
        info.cropped_width = Some((x1 - x0) as f32);
        info.cropped_height = Some((y1 - y0) as f32);

        let batched = padded.insert_axis(Axis(0));
        let raw = self.detector.run(batched).map_err(PipelineError::Unexpected)?;
        let mut detections = decode_output(raw.view(), self.config.score_threshold);
        drop(raw);

        // single-class models get their label attached; multi-class output
        // carries no class channel in this raw layout
        if self.detector.class_names().len() == 1 {
            let name = self.detector.class_names()[0].clone();
            for det in &mut detections {
                det.class_name = Some(name.clone());
            }
        }

        let mut detections = transform_to_canvas(detections, &info, self.canvas)?;

        if self.config.estimate_3d && !detections.is_empty() {
            let now = Instant::now();
            let dt = self
                .previous_at
                .map(|t| now.duration_since(t).as_secs_f32())
                .filter(|dt| *dt > 0.0);
            let ctx = EstimationContext {
                focal_length: focal_length_from_fov(self.config.camera_fov_deg, self.canvas.width),
                image_width: self.canvas.width,
                image_height: self.canvas.height,
                class_name: None,
            };
            let previous = dt.map(|dt| (self.previous.as_slice(), dt));
            add_3d_to_detections(&mut detections, &ctx, &self.registry, previous);
        }

        self.check_memory_pressure();

        self.previous = detections.clone();
        self.previous_at = Some(Instant::now());

        Ok(detections.into_iter().next())
    }

    /// Soft observability hook: warn and trigger a backend cleanup pass
    /// when live tensor handles exceed the threshold. Never a failure.
    fn check_memory_pressure(&mut self) {
        let live = self.detector.live_tensors();
        let threshold = self.config.tensor_cleanup_threshold;
        if live > threshold {
            warn!("live tensors {} exceed threshold {}, cleaning up", live, threshold);
            let _ = self
                .events_tx
                .send(DetectionEvent::MemoryPressure { live, threshold });
            self.detector.cleanup();
        }
    }

    /// Crop region, recomputed only when video or canvas dimensions change.
    fn crop_region(&mut self, video_w: u32, video_h: u32) -> CropRegion {
        let key = (
            video_w,
            video_h,
            self.canvas.width as u32,
            self.canvas.height as u32,
        );
        if let Some((cached_key, cached)) = self.crop_cache {
            if cached_key == key {
                return cached;
            }
        }
        let crop = compute_crop(video_w, video_h, self.canvas);
        self.crop_cache = Some((key, crop));
        crop
    }

    /// Halt the loop; optionally freeze the video too. Cancels any
    /// pending resume deadline.
    pub fn pause(&mut self, pause_camera: bool) {
        self.state = LoopState::Paused;
        self.resume_at = None;
        if pause_camera {
            self.source.pause();
        }
    }

    /// Restart the video and re-arm the loop after the settle delay, so a
    /// stale frame does not immediately re-trigger.
    pub fn resume(&mut self) {
        if self.disposed {
            return;
        }
        if !self.source.is_playing() {
            self.source.play();
        }
        self.resume_at =
            Some(Instant::now() + Duration::from_millis(self.config.resume_settle_ms));
    }

    /// Skip inference while the camera keeps running.
    pub fn detection_pause(&mut self) {
        if self.state == LoopState::Idle {
            self.state = LoopState::DetectionPaused;
        }
    }

    pub fn detection_resume(&mut self) {
        if self.state == LoopState::DetectionPaused {
            self.state = LoopState::Idle;
        }
    }

    /// Cancel the loop, release the camera stream and backend resources.
    /// An in-flight attempt is never interrupted (ticks are synchronous);
    /// subsequent ticks are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.state = LoopState::Paused;
        self.source.close();
        self.detector.cleanup();
        info!("detection controller disposed");
    }

    /// Update the canvas size (invalidates the crop cache via the key).
    pub fn set_canvas(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
    }
}

impl<S: FrameSource, D: Detector> Drop for DetectionController<S, D> {
    fn drop(&mut self) {
        self.dispose();
    }
}
