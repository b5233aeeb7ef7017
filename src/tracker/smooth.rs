use std::collections::VecDeque;

use crate::config::SmoothingConfig;
use crate::features::PostureFeatures;
use crate::scoring::PostureMetrics;

/// 直近Nフレームの移動平均による姿勢メトリクス平滑化
///
/// 平均後にスコアは2刻み、その他の特徴量は0.5刻みに丸めて表示のちらつきを抑える。
/// サンプル数が `min_samples` 未満の間は生の値をそのまま返す。
pub struct Smoother {
    window: usize,
    min_samples: usize,
    score_step: f64,
    metric_step: f64,
    buffer: VecDeque<PostureMetrics>,
}

fn quantize(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

impl Smoother {
    pub fn new(window: usize, min_samples: usize) -> Self {
        Self {
            window,
            min_samples,
            score_step: 2.0,
            metric_step: 0.5,
            buffer: VecDeque::with_capacity(window + 1),
        }
    }

    pub fn from_config(config: &SmoothingConfig) -> Self {
        Self {
            score_step: config.score_step,
            metric_step: config.metric_step,
            ..Self::new(config.window, config.min_samples)
        }
    }

    pub fn apply(&mut self, raw: PostureMetrics) -> PostureMetrics {
        self.buffer.push_back(raw);
        while self.buffer.len() > self.window {
            self.buffer.pop_front();
        }

        if self.buffer.len() < self.min_samples {
            return raw;
        }

        let n = self.buffer.len() as f64;
        let features = match PostureFeatures::mean(self.buffer.iter().map(|m| &m.features)) {
            Some(mean) => mean.map(|_, v| quantize(v, self.metric_step)),
            None => return raw,
        };
        let score = self.buffer.iter().map(|m| m.score).sum::<f64>() / n;

        PostureMetrics {
            features,
            score: quantize(score, self.score_step),
            // 数値でない項目は最新フレームの値
            confidence: raw.confidence,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::from_config(&SmoothingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Confidence;

    fn metrics(spine: f64, score: f64) -> PostureMetrics {
        PostureMetrics {
            features: PostureFeatures { spine_angle: spine, ..Default::default() },
            score,
            confidence: Confidence::High,
        }
    }

    fn approx_eq_f64(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_passthrough_below_min_samples() {
        let mut s = Smoother::default();
        let first = metrics(3.3, 71.0);
        assert_eq!(s.apply(first), first);
        let second = metrics(1.1, 80.0);
        assert_eq!(s.apply(second), second);
    }

    #[test]
    fn test_mean_and_quantization() {
        let mut s = Smoother::default();
        s.apply(metrics(1.0, 70.0));
        s.apply(metrics(2.0, 71.0));
        let result = s.apply(metrics(3.2, 75.0));
        // spine mean 2.066.. → 2.0, score mean 72 → 72
        assert!(approx_eq_f64(result.features.spine_angle, 2.0, 1e-9));
        assert!(approx_eq_f64(result.score, 72.0, 1e-9));

        let result = s.apply(metrics(4.0, 77.0));
        // spine mean 2.55 → 2.5, score mean 73.25 → 74
        assert!(approx_eq_f64(result.features.spine_angle, 2.5, 1e-9));
        assert!(approx_eq_f64(result.score, 74.0, 1e-9));
    }

    #[test]
    fn test_buffer_bounded() {
        let mut s = Smoother::default();
        for i in 0..40 {
            s.apply(metrics(i as f64, 70.0));
            assert!(s.len() <= 12);
        }
        assert_eq!(s.len(), 12);
    }

    #[test]
    fn test_spike_ages_out() {
        let mut s = Smoother::default();
        s.apply(metrics(100.0, 90.0));
        for _ in 0..10 {
            s.apply(metrics(0.0, 60.0));
        }
        // 12サンプル中にスパイクが残っている
        let last = s.apply(metrics(0.0, 60.0));
        assert!(last.features.spine_angle > 0.0);

        let last = s.apply(metrics(0.0, 60.0));
        assert_eq!(last.features.spine_angle, 0.0);
        assert_eq!(last.score, 60.0);
    }

    #[test]
    fn test_reset() {
        let mut s = Smoother::default();
        for _ in 0..5 {
            s.apply(metrics(10.0, 80.0));
        }
        s.reset();
        assert!(s.is_empty());
        // リセット後の最初のフレームは素通し
        let raw = metrics(1.3, 63.0);
        assert_eq!(s.apply(raw), raw);
    }
}
