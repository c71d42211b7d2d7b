/// 合成帧源 (Synthetic frame source)
///
/// 渐变背景 + 可选亮色目标块, 用于测试与演示
use anyhow::Result;
use ndarray::{Array, IxDyn};
use rand::Rng;

use crate::input::{FrameSource, SourceError};

/// A frame source that renders a dark gradient with an optional bright
/// rectangular target, jittered a little every frame so motion-based
/// estimation has something to chew on.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    /// Target rectangle (x, y, w, h) in source pixels, if any.
    target: Option<(f32, f32, f32, f32)>,
    jitter_px: f32,
    playing: bool,
    opened: bool,
    deny_permission: bool,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            target: None,
            jitter_px: 0.0,
            playing: false,
            opened: false,
            deny_permission: false,
            frame_count: 0,
        }
    }

    pub fn with_target(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.target = Some((x, y, w, h));
        self
    }

    pub fn with_jitter(mut self, px: f32) -> Self {
        self.jitter_px = px;
        self
    }

    /// Simulate a platform permission denial on `open`.
    pub fn denying_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl FrameSource for SyntheticSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.deny_permission {
            return Err(SourceError::PermissionDenied);
        }
        self.opened = true;
        self.playing = true;
        Ok(())
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame(&mut self) -> Result<Array<f32, IxDyn>> {
        if !self.opened {
            anyhow::bail!("source not opened");
        }
        self.frame_count += 1;
        let (h, w) = (self.height as usize, self.width as usize);
        let mut frame = Array::from_shape_fn(IxDyn(&[h, w, 3]), |idx| {
            // dark horizontal gradient
            0.1 + 0.2 * (idx[1] as f32 / w as f32)
        });

        if let Some((tx, ty, tw, th)) = self.target {
            let mut rng = rand::thread_rng();
            let (jx, jy) = if self.jitter_px > 0.0 {
                (
                    rng.gen_range(-self.jitter_px..=self.jitter_px),
                    rng.gen_range(-self.jitter_px..=self.jitter_px),
                )
            } else {
                (0.0, 0.0)
            };
            let x0 = ((tx + jx).max(0.0) as usize).min(w);
            let y0 = ((ty + jy).max(0.0) as usize).min(h);
            let x1 = ((tx + jx + tw).max(0.0) as usize).min(w);
            let y1 = ((ty + jy + th).max(0.0) as usize).min(h);
            for y in y0..y1 {
                for x in x0..x1 {
                    frame[[y, x, 0]] = 0.9;
                    frame[[y, x, 1]] = 0.8;
                    frame[[y, x, 2]] = 0.2;
                }
            }
        }
        Ok(frame)
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn close(&mut self) {
        self.opened = false;
        self.playing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_shape_and_range() {
        let mut src = SyntheticSource::new(64, 48);
        src.open().unwrap();
        let frame = src.frame().unwrap();
        assert_eq!(frame.shape(), &[48, 64, 3]);
        assert!(frame.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_frame_before_open_fails() {
        let mut src = SyntheticSource::new(64, 48);
        assert!(src.frame().is_err());
    }

    #[test]
    fn test_permission_denied() {
        let mut src = SyntheticSource::new(64, 48).denying_permission();
        assert!(matches!(src.open(), Err(SourceError::PermissionDenied)));
    }

    #[test]
    fn test_play_pause() {
        let mut src = SyntheticSource::new(64, 48);
        src.open().unwrap();
        assert!(src.is_playing());
        src.pause();
        assert!(!src.is_playing());
        src.play();
        assert!(src.is_playing());
    }
}
