/// Letterbox变换 (Letterbox transform)
///
/// 保持宽高比缩放到目标尺寸, 余量对称零填充
use ndarray::{Array, ArrayViewD, IxDyn};

use crate::error::PipelineError;

/// Inverse-mapping record for one letterboxed frame.
///
/// Computed fresh per frame right before inference, consumed right after
/// for the coordinate remap, not retained. `cropped_width`/`cropped_height`
/// are attached downstream (the crop step) and are required before
/// remapping to canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Uniform scale applied to the source, > 0.
    pub scale: f32,
    /// Padding offset (pixels) added above the scaled image.
    pub top: f32,
    /// Padding offset (pixels) added left of the scaled image.
    pub left: f32,
    /// Post-scale, pre-pad dimensions.
    pub scaled_width: f32,
    pub scaled_height: f32,
    /// Dimensions of the pre-letterbox crop region.
    pub cropped_width: Option<f32>,
    pub cropped_height: Option<f32>,
}

/// Bilinear sample of one channel at fractional source coordinates.
fn sample_bilinear(src: &ArrayViewD<'_, f32>, y: f32, x: f32, c: usize) -> f32 {
    let (h, w) = (src.shape()[0], src.shape()[1]);
    let x0 = x.floor().max(0.0) as usize;
    let y0 = y.floor().max(0.0) as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = (x - x0 as f32).clamp(0.0, 1.0);
    let fy = (y - y0 as f32).clamp(0.0, 1.0);

    let p00 = src[[y0, x0, c]];
    let p01 = src[[y0, x1, c]];
    let p10 = src[[y1, x0, c]];
    let p11 = src[[y1, x1, c]];

    let top = p00 * (1.0 - fx) + p01 * fx;
    let bottom = p10 * (1.0 - fx) + p11 * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Resize a (h, w, c) tensor to (out_h, out_w, c) with bilinear interpolation.
fn resize_bilinear(
    src: &ArrayViewD<'_, f32>,
    out_h: usize,
    out_w: usize,
) -> Array<f32, IxDyn> {
    let (src_h, src_w, channels) = (src.shape()[0], src.shape()[1], src.shape()[2]);
    let mut out = Array::zeros(IxDyn(&[out_h, out_w, channels]));

    let sy = src_h as f32 / out_h as f32;
    let sx = src_w as f32 / out_w as f32;
    for y in 0..out_h {
        // half-pixel centers, as cv2.resize / the GPU samplers do
        let src_y = ((y as f32 + 0.5) * sy - 0.5).clamp(0.0, (src_h - 1) as f32);
        for x in 0..out_w {
            let src_x = ((x as f32 + 0.5) * sx - 0.5).clamp(0.0, (src_w - 1) as f32);
            for c in 0..channels {
                out[[y, x, c]] = sample_bilinear(src, src_y, src_x, c);
            }
        }
    }
    out
}

/// Scale + zero-pad `input` to exactly `(target_h, target_w)`.
///
/// `input` must be a 3-dimensional (height, width, channels) tensor; the
/// channel axis is never padded. Scale is `min(tw/w, th/h)`, so the source
/// is never upscaled past the target and aspect ratio is preserved. The
/// intermediate resized buffer is scoped to this call and dropped on every
/// exit path.
pub fn letterbox(
    input: ArrayViewD<'_, f32>,
    target_h: usize,
    target_w: usize,
) -> Result<(Array<f32, IxDyn>, LetterboxInfo), PipelineError> {
    if input.ndim() != 3 {
        return Err(PipelineError::InvalidShape(format!(
            "letterbox expects a 3-dim (h, w, c) tensor, got {} dims",
            input.ndim()
        )));
    }
    if target_h == 0 || target_w == 0 {
        return Err(PipelineError::InvalidShape(format!(
            "invalid letterbox target {}x{}",
            target_w, target_h
        )));
    }
    let (src_h, src_w, channels) = (input.shape()[0], input.shape()[1], input.shape()[2]);
    if src_h == 0 || src_w == 0 || channels == 0 {
        return Err(PipelineError::InvalidShape(format!(
            "empty source tensor {}x{}x{}",
            src_h, src_w, channels
        )));
    }

    let scale = (target_w as f32 / src_w as f32).min(target_h as f32 / src_h as f32);
    let scaled_w = (src_w as f32 * scale).round() as usize;
    let scaled_h = (src_h as f32 * scale).round() as usize;
    if scaled_w > target_w || scaled_h > target_h {
        // cannot happen given the scale formula; checked anyway
        return Err(PipelineError::InvalidShape(format!(
            "scaled {}x{} exceeds letterbox target {}x{}",
            scaled_w, scaled_h, target_w, target_h
        )));
    }

    let resized = resize_bilinear(&input, scaled_h.max(1), scaled_w.max(1));

    let pad_w = target_w - scaled_w;
    let pad_h = target_h - scaled_h;
    let top = pad_h / 2;
    let left = pad_w / 2;

    let mut output = Array::zeros(IxDyn(&[target_h, target_w, channels]));
    for y in 0..resized.shape()[0] {
        for x in 0..resized.shape()[1] {
            for c in 0..channels {
                output[[top + y, left + x, c]] = resized[[y, x, c]];
            }
        }
    }

    let info = LetterboxInfo {
        scale,
        top: top as f32,
        left: left as f32,
        scaled_width: scaled_w as f32,
        scaled_height: scaled_h as f32,
        cropped_width: None,
        cropped_height: None,
    };
    Ok((output, info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn gradient(h: usize, w: usize, c: usize) -> Array<f32, IxDyn> {
        Array::from_shape_fn(IxDyn(&[h, w, c]), |idx| {
            (idx[0] + idx[1] + idx[2]) as f32 / (h + w + c) as f32
        })
    }

    #[test]
    fn test_output_shape_and_info() {
        let src = gradient(480, 640, 3);
        let (out, info) = letterbox(src.view(), 640, 640).unwrap();
        assert_eq!(out.shape(), &[640, 640, 3]);
        assert!((info.scale - 1.0).abs() < 1e-6);
        assert_eq!(info.scaled_width, 640.0);
        assert_eq!(info.scaled_height, 480.0);
        assert_eq!(info.left, 0.0);
        assert_eq!(info.top, 80.0);
    }

    #[test]
    fn test_scale_never_exceeds_target() {
        let src = gradient(1080, 1920, 3);
        let (_, info) = letterbox(src.view(), 640, 640).unwrap();
        assert!(info.scaled_width <= 640.0);
        assert!(info.scaled_height <= 640.0);
        assert!((info.scale - 640.0 / 1920.0).abs() < 1e-6);
    }

    #[test]
    fn test_padding_is_zero() {
        let src = Array::ones(IxDyn(&[100, 200, 3]));
        let (out, info) = letterbox(src.view(), 640, 640).unwrap();
        // row above the top padding boundary stays zero
        assert_eq!(out[[0, 0, 0]], 0.0);
        assert_eq!(out[[(info.top as usize) - 1, 320, 1]], 0.0);
        // inside the scaled region the ones survive
        assert!((out[[info.top as usize + 10, 320, 0]] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_symmetric_padding_split() {
        let src = gradient(100, 640, 3);
        let (_, info) = letterbox(src.view(), 640, 640).unwrap();
        let scaled_h = info.scaled_height as usize;
        let pad = 640 - scaled_h;
        assert_eq!(info.top as usize, pad / 2);
    }

    #[test]
    fn test_rejects_wrong_rank() {
        let src = Array::zeros(IxDyn(&[640, 640]));
        let err = letterbox(src.view(), 640, 640).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_rejects_zero_target() {
        let src = gradient(10, 10, 3);
        assert!(letterbox(src.view(), 0, 640).is_err());
        assert!(letterbox(src.view(), 640, 0).is_err());
    }

    #[test]
    fn test_channel_axis_not_padded() {
        let src = gradient(100, 200, 4);
        let (out, _) = letterbox(src.view(), 640, 640).unwrap();
        assert_eq!(out.shape()[2], 4);
    }
}
