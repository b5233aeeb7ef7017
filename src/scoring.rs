//! 姿勢スコアの合成: 閾値超過分の重み付き減点、良好な指標へのボーナス、
//! 表示用の揺らぎとクランプ

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::features::{PostureFeature, PostureFeatures};
use crate::pose::{LandmarkFrame, LandmarkIndex};
use crate::random::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
}

/// 1フレーム（または平滑化後）の特徴量と合成スコア
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureMetrics {
    pub features: PostureFeatures,
    pub score: f64,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Copy)]
pub struct PenaltyRule {
    pub feature: PostureFeature,
    pub threshold: f64,
    pub weight: f64,
    pub cap: f64,
}

impl PenaltyRule {
    const fn new(feature: PostureFeature, threshold: f64, weight: f64, cap: f64) -> Self {
        Self { feature, threshold, weight, cap }
    }

    pub fn penalty(&self, value: f64) -> f64 {
        if value > self.threshold {
            ((value - self.threshold) * self.weight).min(self.cap)
        } else {
            0.0
        }
    }
}

pub const PENALTY_RULES: [PenaltyRule; 10] = [
    PenaltyRule::new(PostureFeature::SpineAngle, 4.0, 2.0, 25.0),
    PenaltyRule::new(PostureFeature::ShoulderTilt, 3.0, 2.5, 20.0),
    PenaltyRule::new(PostureFeature::HeadForwardAngle, 18.0, 1.0, 15.0),
    PenaltyRule::new(PostureFeature::NeckAngle, 12.0, 1.2, 15.0),
    PenaltyRule::new(PostureFeature::HipTilt, 4.0, 1.5, 10.0),
    PenaltyRule::new(PostureFeature::PelvisAlignment, 8.0, 1.0, 10.0),
    PenaltyRule::new(PostureFeature::ShoulderRoll, 6.0, 1.0, 8.0),
    PenaltyRule::new(PostureFeature::ShoulderProtraction, 10.0, 0.5, 5.0),
    PenaltyRule::new(PostureFeature::OverallSymmetry, 10.0, 0.7, 7.0),
    PenaltyRule::new(PostureFeature::TorsoLean, 8.0, 0.6, 5.0),
];

/// (特徴量, この値未満で加点, 点数)。合計は最大5
const BONUS_RULES: [(PostureFeature, f64, f64); 4] = [
    (PostureFeature::SpineAngle, 2.0, 2.0),
    (PostureFeature::ShoulderTilt, 2.0, 1.0),
    (PostureFeature::NeckAngle, 8.0, 1.0),
    (PostureFeature::HeadForwardAngle, 12.0, 1.0),
];

const BASE_SCORE: f64 = 100.0;

pub struct PostureScorer {
    floor: f64,
    ceiling: f64,
    jitter: f64,
    high_confidence_visibility: f64,
}

impl PostureScorer {
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            floor: config.floor,
            ceiling: config.ceiling,
            jitter: config.jitter,
            high_confidence_visibility: config.high_confidence_visibility,
        }
    }

    /// 揺らぎ・クランプ前のスコア
    pub fn base_score(features: &PostureFeatures) -> f64 {
        let penalty: f64 = PENALTY_RULES
            .iter()
            .map(|rule| rule.penalty(features.get(rule.feature)))
            .sum();
        let bonus: f64 = BONUS_RULES
            .iter()
            .filter(|(feature, limit, _)| features.get(*feature) < *limit)
            .map(|(_, _, points)| points)
            .sum();
        BASE_SCORE - penalty + bonus
    }

    /// `[floor, ceiling]` に収まる整数スコア
    pub fn score(&self, features: &PostureFeatures, rng: &mut dyn RandomSource) -> f64 {
        let variation = (rng.next_unit() - 0.5) * 2.0 * self.jitter;
        (Self::base_score(features) + variation)
            .clamp(self.floor, self.ceiling)
            .round()
    }

    pub fn confidence(&self, frame: &LandmarkFrame) -> Confidence {
        if frame.get(LandmarkIndex::Nose).visibility > self.high_confidence_visibility {
            Confidence::High
        } else {
            Confidence::Medium
        }
    }

    pub fn assess(
        &self,
        frame: &LandmarkFrame,
        features: PostureFeatures,
        rng: &mut dyn RandomSource,
    ) -> PostureMetrics {
        PostureMetrics {
            score: self.score(&features, rng),
            confidence: self.confidence(frame),
            features,
        }
    }
}

impl Default for PostureScorer {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract_posture;
    use crate::features::posture::tests::upright_frame;
    use crate::random::{FixedRandom, StdRandom};

    #[test]
    fn test_penalty_rule_caps() {
        let rule = PENALTY_RULES[0];
        assert_eq!(rule.penalty(3.0), 0.0);
        assert_eq!(rule.penalty(6.0), 4.0);
        assert_eq!(rule.penalty(90.0), 25.0);
    }

    #[test]
    fn test_perfect_posture_gets_full_bonus() {
        // torso_lean は直立でも閾値を超える
        let features = PostureFeatures { torso_lean: 180.0, ..Default::default() };
        assert_eq!(PostureScorer::base_score(&features), 100.0 - 5.0 + 5.0);
    }

    #[test]
    fn test_penalties_accumulate() {
        let features = PostureFeatures {
            spine_angle: 9.0,         // -10
            shoulder_tilt: 5.0,       // -5
            neck_angle: 10.0,         // 減点なし
            head_forward_angle: 20.0, // -2
            ..Default::default()
        };
        assert!((PostureScorer::base_score(&features) - 83.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_clamped_to_ceiling() {
        let scorer = PostureScorer::default();
        let features = extract_posture(&upright_frame());
        assert_eq!(scorer.score(&features, &mut FixedRandom(0.5)), 92.0);
        assert_eq!(scorer.score(&features, &mut FixedRandom(0.999)), 92.0);
    }

    #[test]
    fn test_score_clamped_to_floor_for_extreme_input() {
        let scorer = PostureScorer::default();
        let features = PostureFeatures {
            spine_angle: 1e6,
            shoulder_tilt: 1e6,
            head_forward_angle: 1e6,
            shoulder_roll: 1e6,
            arm_symmetry: 1e6,
            neck_angle: 1e6,
            hip_tilt: 1e6,
            torso_lean: 1e6,
            shoulder_protraction: 1e6,
            pelvis_alignment: 1e6,
            overall_symmetry: 1e6,
        };
        assert_eq!(scorer.score(&features, &mut FixedRandom(0.999)), 55.0);
    }

    #[test]
    fn test_score_always_within_band() {
        let scorer = PostureScorer::default();
        let mut rng = StdRandom::seeded(42);
        for i in 0..200 {
            let v = i as f64 * 0.7;
            let features = PostureFeatures {
                spine_angle: v,
                shoulder_tilt: v / 2.0,
                neck_angle: v / 3.0,
                ..Default::default()
            };
            let score = scorer.score(&features, &mut rng);
            assert!((55.0..=92.0).contains(&score), "score {} out of band", score);
            assert_eq!(score, score.round());
        }
    }

    #[test]
    fn test_jitter_bounds() {
        let scorer = PostureScorer::default();
        let features = PostureFeatures {
            spine_angle: 16.5, // -25
            torso_lean: 180.0, // -5
            shoulder_tilt: 2.5, // 加点・減点なし
            neck_angle: 9.0,
            head_forward_angle: 13.0,
            ..Default::default()
        };
        assert_eq!(PostureScorer::base_score(&features), 70.0);
        assert_eq!(scorer.score(&features, &mut FixedRandom(0.0)), 67.0);
        assert_eq!(scorer.score(&features, &mut FixedRandom(0.5)), 70.0);
        assert_eq!(scorer.score(&features, &mut FixedRandom(0.99)), 73.0);
    }

    #[test]
    fn test_confidence_from_nose_visibility() {
        let scorer = PostureScorer::default();
        let mut frame = upright_frame();
        assert_eq!(scorer.confidence(&frame), Confidence::High);
        frame.landmarks[LandmarkIndex::Nose as usize].visibility = 0.8;
        assert_eq!(scorer.confidence(&frame), Confidence::Medium);
    }
}
