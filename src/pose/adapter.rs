use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::mode::AnalysisMode;
use crate::pose::{Landmark, LandmarkFrame, LandmarkIndex};

/// 左右の幅がこれ未満なら比率計算が発散するため除外
const MIN_SEGMENT_WIDTH: f64 = 1e-4;

/// 姿勢推定エンジンから届く1フレーム分の生データ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub landmarks: Vec<Landmark>,
}

impl RawFrame {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }
}

/// フレームを解析に使えない理由
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameRejection {
    #[error("expected {expected} landmarks, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },
    #[error("landmark {index:?} has non-finite coordinates")]
    NonFinite { index: LandmarkIndex },
    #[error("landmark {index:?} visibility {visibility:.2} below {threshold:.2}")]
    LowVisibility {
        index: LandmarkIndex,
        visibility: f64,
        threshold: f64,
    },
    #[error("{left:?} and {right:?} overlap horizontally")]
    DegenerateSpan {
        left: LandmarkIndex,
        right: LandmarkIndex,
    },
}

/// 生フレームをモード別に検証して `LandmarkFrame` へ変換する
#[derive(Debug, Clone)]
pub struct FrameAdapter {
    visibility_threshold: f64,
}

impl FrameAdapter {
    pub fn new(visibility_threshold: f64) -> Self {
        Self { visibility_threshold }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.visibility_threshold)
    }

    pub fn visibility_threshold(&self) -> f64 {
        self.visibility_threshold
    }

    /// 必須ランドマークが揃っていない・見えていないフレームは拒否する
    pub fn adapt(&self, raw: &RawFrame, mode: AnalysisMode) -> Result<LandmarkFrame, FrameRejection> {
        if raw.landmarks.len() != LandmarkIndex::COUNT {
            return Err(FrameRejection::LandmarkCount {
                expected: LandmarkIndex::COUNT,
                actual: raw.landmarks.len(),
            });
        }

        let mut frame = LandmarkFrame::default();
        frame.landmarks.copy_from_slice(&raw.landmarks);

        for &index in mode.required_landmarks() {
            let lm = frame.get(index);
            if !lm.is_finite() {
                return Err(FrameRejection::NonFinite { index });
            }
            if !lm.is_visible(self.visibility_threshold) {
                return Err(FrameRejection::LowVisibility {
                    index,
                    visibility: lm.visibility,
                    threshold: self.visibility_threshold,
                });
            }
        }

        // 肩・腰の傾き比率は左右のX幅で割る
        if mode.uses_posture_features() {
            use LandmarkIndex::*;
            for (left, right) in [(LeftShoulder, RightShoulder), (LeftHip, RightHip)] {
                if (frame.get(left).x - frame.get(right).x).abs() < MIN_SEGMENT_WIDTH {
                    return Err(FrameRejection::DegenerateSpan { left, right });
                }
            }
        }

        Ok(frame)
    }
}

impl Default for FrameAdapter {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_frame(visibility: f64) -> RawFrame {
        let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0, visibility); LandmarkIndex::COUNT];
        landmarks[LandmarkIndex::LeftShoulder as usize].x = 0.6;
        landmarks[LandmarkIndex::RightShoulder as usize].x = 0.4;
        landmarks[LandmarkIndex::LeftHip as usize].x = 0.57;
        landmarks[LandmarkIndex::RightHip as usize].x = 0.43;
        RawFrame::new(landmarks)
    }

    #[test]
    fn test_accepts_visible_frame() {
        let adapter = FrameAdapter::new(0.5);
        let frame = adapter.adapt(&full_frame(0.9), AnalysisMode::Posture).unwrap();
        assert_eq!(frame.get(LandmarkIndex::LeftShoulder).x, 0.6);
    }

    #[test]
    fn test_rejects_wrong_count() {
        let adapter = FrameAdapter::new(0.5);
        let raw = RawFrame::new(vec![Landmark::default(); 17]);
        assert_eq!(
            adapter.adapt(&raw, AnalysisMode::Squat),
            Err(FrameRejection::LandmarkCount { expected: 33, actual: 17 })
        );
    }

    #[test]
    fn test_rejects_invisible_shoulder_in_posture() {
        let adapter = FrameAdapter::new(0.5);
        let mut raw = full_frame(0.9);
        raw.landmarks[LandmarkIndex::LeftShoulder as usize].visibility = 0.0;
        let result = adapter.adapt(&raw, AnalysisMode::Posture);
        assert!(matches!(
            result,
            Err(FrameRejection::LowVisibility { index: LandmarkIndex::LeftShoulder, .. })
        ));
    }

    #[test]
    fn test_squat_ignores_upper_body_visibility() {
        let adapter = FrameAdapter::new(0.5);
        let mut raw = full_frame(0.9);
        raw.landmarks[LandmarkIndex::LeftShoulder as usize].visibility = 0.0;
        raw.landmarks[LandmarkIndex::LeftEar as usize].visibility = 0.0;
        assert!(adapter.adapt(&raw, AnalysisMode::Squat).is_ok());
    }

    #[test]
    fn test_rejects_non_finite() {
        let adapter = FrameAdapter::new(0.5);
        let mut raw = full_frame(0.9);
        raw.landmarks[LandmarkIndex::RightKnee as usize].y = f64::NAN;
        assert_eq!(
            adapter.adapt(&raw, AnalysisMode::Squat),
            Err(FrameRejection::NonFinite { index: LandmarkIndex::RightKnee })
        );
    }

    #[test]
    fn test_rejects_zero_shoulder_width() {
        let adapter = FrameAdapter::new(0.5);
        let mut raw = full_frame(0.9);
        raw.landmarks[LandmarkIndex::RightShoulder as usize].x = 0.6;
        assert!(matches!(
            adapter.adapt(&raw, AnalysisMode::Posture),
            Err(FrameRejection::DegenerateSpan { .. })
        ));
        // 腕立てでは肩幅の比率は使わない
        assert!(adapter.adapt(&raw, AnalysisMode::Pushup).is_ok());
    }
}
