/// 检测解码器 (Detection decoder)
///
/// 模型原始输出 → 经过验证、按置信度降序排列的检测列表
use ndarray::{ArrayViewD, Axis};

use crate::detection::{BoundingBox, Detection};

/// Number of channels required before any decoding happens:
/// x, y, w, h, score. A sixth (angle) channel is optional.
const MIN_CHANNELS: usize = 5;

/// Decode per-channel model output into valid detections, best first.
///
/// `channels` holds parallel arrays indexed by detection slot:
/// `[xs, ys, widths, heights, scores, angles?]`. Returns empty (never an
/// error) when fewer than 5 channels are supplied, when `threshold` is
/// outside [0, 1], or when any of the first 5 arrays is empty — absence
/// of detections is a normal outcome.
///
/// Per-slot validation skips (does not fail) on any violation: the score
/// must be finite and strictly greater than `threshold`; x/y/w/h must be
/// finite; width and height must be non-negative. A missing, short, or
/// non-finite angle entry defaults to exactly 0.
pub fn find_valid_detections(
    channels: &[Vec<f32>],
    declared_count: usize,
    threshold: f32,
) -> Vec<Detection> {
    if channels.len() < MIN_CHANNELS {
        return Vec::new();
    }
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Vec::new();
    }
    if channels[..MIN_CHANNELS].iter().any(|c| c.is_empty()) {
        return Vec::new();
    }

    let min_len = channels[..MIN_CHANNELS]
        .iter()
        .map(|c| c.len())
        .min()
        .unwrap_or(0);
    let count = declared_count.min(min_len);
    let angles = channels.get(MIN_CHANNELS);

    let mut detections = Vec::new();
    for i in 0..count {
        let score = channels[4][i];
        if !score.is_finite() || score <= threshold {
            continue;
        }
        let (x, y, w, h) = (channels[0][i], channels[1][i], channels[2][i], channels[3][i]);
        if !x.is_finite() || !y.is_finite() || !w.is_finite() || !h.is_finite() {
            continue;
        }
        if w < 0.0 || h < 0.0 {
            continue;
        }
        let angle = angles
            .and_then(|a| a.get(i))
            .copied()
            .filter(|a| a.is_finite())
            .unwrap_or(0.0);

        detections.push(Detection::new(BoundingBox::new(x, y, w, h), angle, score));
    }

    // sort_by is stable: equal scores retain encounter order
    detections.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    detections
}

/// Decode a raw detector output tensor.
///
/// Accepts the batched `(1, rows, n)` shape or the already-squeezed
/// `(rows, n)`, splits the row axis into per-channel vectors and runs
/// `find_valid_detections`. Anything else decodes to empty.
pub fn decode_output(output: ArrayViewD<'_, f32>, threshold: f32) -> Vec<Detection> {
    let squeezed = if output.ndim() == 3 && output.shape()[0] == 1 {
        output.index_axis_move(Axis(0), 0)
    } else {
        output
    };
    if squeezed.ndim() != 2 {
        return Vec::new();
    }

    let count = squeezed.shape()[1];
    let channels: Vec<Vec<f32>> = squeezed
        .axis_iter(Axis(0))
        .map(|row| row.iter().copied().collect())
        .collect();
    find_valid_detections(&channels, count, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn test_single_detection_scenario() {
        let channels = vec![
            vec![100.0],
            vec![150.0],
            vec![50.0],
            vec![30.0],
            vec![0.9],
            vec![1.5],
        ];
        let dets = find_valid_detections(&channels, 1, 0.5);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bounding_box, BoundingBox::new(100.0, 150.0, 50.0, 30.0));
        assert!((dets[0].angle - 1.5).abs() < 1e-6);
        assert!((dets[0].score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_too_few_channels_returns_empty() {
        let channels = vec![vec![1.0]; 4];
        assert!(find_valid_detections(&channels, 1, 0.5).is_empty());
    }

    #[test]
    fn test_threshold_out_of_range_returns_empty() {
        let channels = vec![vec![1.0]; 5];
        assert!(find_valid_detections(&channels, 1, 1.5).is_empty());
        assert!(find_valid_detections(&channels, 1, -0.1).is_empty());
        assert!(find_valid_detections(&channels, 1, f32::NAN).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let channels = vec![
            vec![10.0, 10.0],
            vec![10.0, 10.0],
            vec![5.0, 5.0],
            vec![5.0, 5.0],
            vec![0.5, 0.5 + 1e-4],
        ];
        let dets = find_valid_detections(&channels, 2, 0.5);
        // score == threshold excluded, score == threshold + ε included
        assert_eq!(dets.len(), 1);
        assert!(dets[0].score > 0.5);
    }

    #[test]
    fn test_sorted_descending_and_stable() {
        let channels = vec![
            vec![1.0, 2.0, 3.0, 4.0],
            vec![1.0, 2.0, 3.0, 4.0],
            vec![5.0, 5.0, 5.0, 5.0],
            vec![5.0, 5.0, 5.0, 5.0],
            vec![0.6, 0.9, 0.6, 0.8],
        ];
        let dets = find_valid_detections(&channels, 4, 0.5);
        assert_eq!(dets.len(), 4);
        assert!((dets[0].score - 0.9).abs() < 1e-6);
        assert!((dets[1].score - 0.8).abs() < 1e-6);
        // the two 0.6 entries keep encounter order (x = 1.0 before x = 3.0)
        assert_eq!(dets[2].bounding_box.x, 1.0);
        assert_eq!(dets[3].bounding_box.x, 3.0);
    }

    #[test]
    fn test_invalid_slots_are_skipped_not_fatal() {
        let channels = vec![
            vec![1.0, f32::NAN, 3.0],
            vec![1.0, 2.0, 3.0],
            vec![5.0, 5.0, -1.0],
            vec![5.0, 5.0, 5.0],
            vec![0.9, 0.9, 0.9],
        ];
        let dets = find_valid_detections(&channels, 3, 0.5);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bounding_box.x, 1.0);
    }

    #[test]
    fn test_short_angle_array_defaults_to_zero() {
        let channels = vec![
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![5.0, 5.0],
            vec![5.0, 5.0],
            vec![0.9, 0.8],
            vec![1.2], // shorter than count
        ];
        let dets = find_valid_detections(&channels, 2, 0.5);
        assert_eq!(dets.len(), 2);
        assert!((dets[0].angle - 1.2).abs() < 1e-6);
        assert_eq!(dets[1].angle, 0.0);
    }

    #[test]
    fn test_non_finite_angle_defaults_to_zero() {
        let channels = vec![
            vec![1.0],
            vec![1.0],
            vec![5.0],
            vec![5.0],
            vec![0.9],
            vec![f32::NAN],
        ];
        let dets = find_valid_detections(&channels, 1, 0.5);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].angle, 0.0);
    }

    #[test]
    fn test_declared_count_clamped_to_shortest_channel() {
        let channels = vec![
            vec![1.0, 2.0],
            vec![1.0],
            vec![5.0, 5.0],
            vec![5.0, 5.0],
            vec![0.9, 0.9],
        ];
        let dets = find_valid_detections(&channels, 10, 0.5);
        assert_eq!(dets.len(), 1);
    }

    #[test]
    fn test_decode_output_squeezes_batch_axis() {
        let data = vec![100.0, 150.0, 50.0, 30.0, 0.9];
        let output = Array::from_shape_vec((1, 5, 1), data).unwrap().into_dyn();
        let dets = decode_output(output.view(), 0.5);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bounding_box.width, 50.0);
    }

    #[test]
    fn test_decode_output_rejects_wrong_rank() {
        let output = Array::from_shape_vec(vec![5], vec![0.0; 5]).unwrap();
        assert!(decode_output(output.view(), 0.5).is_empty());
    }
}
