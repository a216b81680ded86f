//! Temporal smoothing of crop centers.

/// Frames covered by a smoothing window of `window_secs` at `frame_rate`.
///
/// Always odd and at least 1 so the window is centered on its frame.
pub fn window_frames(window_secs: f64, frame_rate: f64) -> usize {
    if !window_secs.is_finite() || window_secs <= 0.0 || frame_rate <= 0.0 {
        return 1;
    }
    let frames = (window_secs * frame_rate).round().max(1.0) as usize;
    if frames % 2 == 0 {
        frames + 1
    } else {
        frames
    }
}

/// Centered moving average; the window shrinks at both ends of the series.
pub fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || data.len() < 2 {
        return data.to_vec();
    }

    let pad = window / 2;
    let mut result = Vec::with_capacity(data.len());

    for i in 0..data.len() {
        let start = i.saturating_sub(pad);
        let end = (i + pad + 1).min(data.len());
        let slice = &data[start..end];
        result.push(slice.iter().sum::<f64>() / slice.len() as f64);
    }

    result
}

/// Limit frame-to-frame movement to `max_step` pixels.
pub fn limit_step(data: &[f64], max_step: f64) -> Vec<f64> {
    if !max_step.is_finite() || max_step <= 0.0 {
        return data.to_vec();
    }

    let mut limited = Vec::with_capacity(data.len());
    for &value in data {
        let next = match limited.last() {
            Some(&prev) => {
                let delta: f64 = value - prev;
                prev + delta.clamp(-max_step, max_step)
            }
            None => value,
        };
        limited.push(next);
    }
    limited
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_frames_is_odd() {
        assert_eq!(window_frames(0.5, 30.0), 15);
        assert_eq!(window_frames(0.5, 24.0), 13);
        assert_eq!(window_frames(0.0, 30.0), 1);
        assert_eq!(window_frames(0.01, 30.0), 1);
    }

    #[test]
    fn test_moving_average() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let smoothed = moving_average(&data, 3);

        assert_eq!(smoothed.len(), 5);
        assert!((smoothed[0] - 1.5).abs() < 1e-9); // (1+2)/2 at the edge
        assert!((smoothed[1] - 2.0).abs() < 1e-9);
        assert!((smoothed[2] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_moving_average_damps_a_spike() {
        let mut data = vec![100.0; 9];
        data[4] = 1000.0;
        let smoothed = moving_average(&data, 5);
        assert!((smoothed[4] - 280.0).abs() < 1e-9);
        assert!(smoothed.iter().all(|v| *v <= 280.0 + 1e-9));
    }

    #[test]
    fn test_limit_step() {
        let limited = limit_step(&[0.0, 100.0, 100.0, -50.0], 20.0);
        assert_eq!(limited, vec![0.0, 20.0, 40.0, 20.0]);
        assert_eq!(limit_step(&[0.0, 100.0], 0.0), vec![0.0, 100.0]);
    }
}
