/// 裁剪区域计算 (Crop region computation)
///
/// 视频与画布宽高比不一致时, 居中裁掉多余的一侧
use crate::input::CanvasSize;

/// Centered crop of the source video, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Reconcile source and canvas aspect ratios.
///
/// A relatively wider video gets its width cropped down (centered) to
/// match the canvas ratio; a relatively taller one gets its height
/// cropped; matching ratios use the full frame.
pub fn compute_crop(video_w: u32, video_h: u32, canvas: CanvasSize) -> CropRegion {
    let (vw, vh) = (video_w as f32, video_h as f32);
    let video_ratio = vw / vh;
    let canvas_ratio = canvas.width / canvas.height;

    if video_ratio > canvas_ratio {
        let new_w = vh * canvas_ratio;
        CropRegion {
            x: (vw - new_w) / 2.0,
            y: 0.0,
            width: new_w,
            height: vh,
        }
    } else if video_ratio < canvas_ratio {
        let new_h = vw / canvas_ratio;
        CropRegion {
            x: 0.0,
            y: (vh - new_h) / 2.0,
            width: vw,
            height: new_h,
        }
    } else {
        CropRegion {
            x: 0.0,
            y: 0.0,
            width: vw,
            height: vh,
        }
    }
}
