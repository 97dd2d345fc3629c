//! Arrival-time lateness estimation via total least squares linear
//! regression, ported from `LinearRegression`/`RTPSink::Source::addReportBlock`
//! timing code: a ring buffer of (RTP timestamp, media-time arrival) points
//! feeds a line fit whose normal form `(n1, n2, b)` predicts the expected
//! arrival for a given RTP time; the residual against the actual arrival,
//! scaled into milliseconds, is the packet's lateness.
use std::collections::VecDeque;

const EPSILON: f64 = 1.0E-4;

pub struct LinearRegression {
    capacity: usize,
    points: VecDeque<(f64, f64)>,
    sum_x: f64,
    sum_y: f64,
}

impl LinearRegression {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
            sum_x: 0.0,
            sum_y: 0.0,
        }
    }

    pub fn add_point(&mut self, x: f64, y: f64) {
        if self.points.len() == self.capacity {
            if let Some((ox, oy)) = self.points.pop_front() {
                self.sum_x -= ox;
                self.sum_y -= oy;
            }
        }
        self.points.push_back((x, y));
        self.sum_x += x;
        self.sum_y += y;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fits the line `n1*x + n2*y = b` via total least squares over the
    /// mean-centered points, returning the normal form `(n1, n2, b)`.
    /// Returns `None` until at least 2 points have been collected, or if the
    /// fit degenerates to a vertical line (`n2` too close to zero to predict
    /// `y` from `x`).
    pub fn approx_line(&self) -> Option<(f64, f64, f64)> {
        let n = self.points.len();
        if n < 2 {
            return None;
        }
        let n_f = n as f64;
        let mean_x = self.sum_x / n_f;
        let mean_y = self.sum_y / n_f;

        let mut sum_x2 = 0.0;
        let mut sum_y2 = 0.0;
        let mut sum_xy = 0.0;
        for &(x, y) in &self.points {
            let dx = x - mean_x;
            let dy = y - mean_y;
            sum_x2 += dx * dx;
            sum_y2 += dy * dy;
            sum_xy += dx * dy;
        }

        let t = sum_x2 + sum_y2;
        let d = sum_x2 * sum_y2 - sum_xy * sum_xy;
        let root = (t * t * 0.25 - d).max(0.0).sqrt();
        let l1 = t * 0.5 - root;

        let (n1, n2) = if sum_xy.abs() > EPSILON {
            let n1 = sum_xy;
            let n2 = l1 - sum_x2;
            let norm = (n1 * n1 + n2 * n2).sqrt();
            if norm < EPSILON {
                return None;
            }
            (n1 / norm, n2 / norm)
        } else if sum_x2 >= sum_y2 {
            (0.0, 1.0)
        } else {
            (1.0, 0.0)
        };

        if n2.abs() < EPSILON {
            return None;
        }

        let b = n1 * mean_x + n2 * mean_y;
        Some((n1, n2, b))
    }
}

/// Tracks RTP arrival lateness for one SSRC, per `RTPSink::Source`'s
/// `(rtpTime, arrivalTime)` regression: each accepted packet adds a point
/// `(rtpTime, arrivalMedia)`, where `arrivalMedia` is the wall-clock arrival
/// time converted into 90kHz media-clock units (`micros * 9 / 100`). The
/// fitted line predicts the arrival time the packet was "due"; the
/// difference, scaled by `1/90`, is the lateness in milliseconds. The
/// largest lateness seen is kept for diagnostics.
pub struct JitterEstimator {
    regression: LinearRegression,
    max_lateness_ms: f64,
}

impl JitterEstimator {
    pub fn new() -> Self {
        Self {
            regression: LinearRegression::new(1000),
            max_lateness_ms: 0.0,
        }
    }

    /// Feeds one packet's `(rtpTime, arrivalMedia)` pair through the
    /// regression and returns its lateness in milliseconds, or `None` while
    /// too few points have accumulated to fit a line.
    pub fn add_sample(&mut self, rtp_time: f64, arrival_media: f64) -> Option<f64> {
        self.regression.add_point(rtp_time, arrival_media);
        let (n1, n2, b) = self.regression.approx_line()?;
        let expected = (b - n1 * rtp_time) / n2;
        let lateness_ms = (arrival_media - expected) / 90.0;
        if lateness_ms > self.max_lateness_ms {
            self.max_lateness_ms = lateness_ms;
        }
        Some(lateness_ms)
    }

    /// The largest lateness observed across every `add_sample` call so far.
    pub fn max_lateness_ms(&self) -> f64 {
        self.max_lateness_ms
    }
}

impl Default for JitterEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_perfect_line() {
        let mut r = LinearRegression::new(100);
        for i in 0..10 {
            r.add_point(i as f64, 2.0 * i as f64 + 5.0);
        }
        let (n1, n2, b) = r.approx_line().unwrap();
        let predict = |x: f64| (b - n1 * x) / n2;
        assert!((predict(0.0) - 5.0).abs() < 1e-6);
        assert!((predict(10.0) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn too_few_points_returns_none() {
        let mut r = LinearRegression::new(100);
        assert!(r.approx_line().is_none());
        r.add_point(0.0, 0.0);
        assert!(r.approx_line().is_none());
    }

    #[test]
    fn ring_buffer_evicts_oldest() {
        let mut r = LinearRegression::new(3);
        r.add_point(0.0, 0.0);
        r.add_point(1.0, 10.0);
        r.add_point(2.0, 20.0);
        r.add_point(3.0, 30.0);
        assert_eq!(r.len(), 3);
        let (n1, n2, b) = r.approx_line().unwrap();
        let predict = |x: f64| (b - n1 * x) / n2;
        assert!((predict(1.0) - 10.0).abs() < 1e-6);
        assert!((predict(3.0) - 30.0).abs() < 1e-6);
    }

    #[test]
    fn jitter_estimator_reports_zero_lateness_for_constant_delay() {
        let mut j = JitterEstimator::new();
        let mut lateness = None;
        for i in 0..20 {
            let rtp_time = f64::from(i) * 900.0;
            let arrival_media = rtp_time + 1000.0;
            lateness = j.add_sample(rtp_time, arrival_media);
        }
        let lateness = lateness.unwrap();
        assert!(lateness.abs() < 1e-6, "lateness={lateness}");
        assert!(j.max_lateness_ms().abs() < 1e-6);
    }

    #[test]
    fn jitter_estimator_tracks_max_lateness_for_a_late_packet() {
        let mut j = JitterEstimator::new();
        for i in 0..10 {
            let rtp_time = f64::from(i) * 900.0;
            let arrival_media = rtp_time + 1000.0;
            j.add_sample(rtp_time, arrival_media);
        }

        // One packet arrives 900 ticks (10ms at 90kHz) later than the fit.
        let late_rtp_time = 10.0 * 900.0;
        let late_arrival_media = late_rtp_time + 1000.0 + 900.0;
        let lateness = j.add_sample(late_rtp_time, late_arrival_media).unwrap();

        assert!(lateness > 0.0, "lateness={lateness}");
        assert!((j.max_lateness_ms() - lateness).abs() < 1e-9);
    }
}
