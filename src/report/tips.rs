//! レポートのカテゴリ別アドバイス集

use crate::random::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TipCategory {
    SpineAlignment,
    ShoulderBalance,
    HeadPosition,
    NeckPosture,
    HipAlignment,
    OverallSymmetry,
    General,
}

impl TipCategory {
    pub const ALL: [TipCategory; 7] = [
        Self::SpineAlignment,
        Self::ShoulderBalance,
        Self::HeadPosition,
        Self::NeckPosture,
        Self::HipAlignment,
        Self::OverallSymmetry,
        Self::General,
    ];

    /// 未知の指標名は一般カテゴリにフォールバック
    pub fn from_metric_name(name: &str) -> Self {
        match name {
            "spineAlignment" | "spine_alignment" => Self::SpineAlignment,
            "shoulderBalance" | "shoulder_balance" => Self::ShoulderBalance,
            "headPosition" | "head_position" => Self::HeadPosition,
            "neckPosture" | "neck_posture" => Self::NeckPosture,
            "hipAlignment" | "hip_alignment" => Self::HipAlignment,
            "overallSymmetry" | "overall_symmetry" => Self::OverallSymmetry,
            _ => Self::General,
        }
    }

    pub fn tips(self) -> &'static [&'static str] {
        match self {
            Self::SpineAlignment => SPINE_ALIGNMENT,
            Self::ShoulderBalance => SHOULDER_BALANCE,
            Self::HeadPosition => HEAD_POSITION,
            Self::NeckPosture => NECK_POSTURE,
            Self::HipAlignment => HIP_ALIGNMENT,
            Self::OverallSymmetry => OVERALL_SYMMETRY,
            Self::General => GENERAL,
        }
    }
}

/// カテゴリから重複なしで最大 `count` 件をランダムな順で選ぶ
pub fn pick_tips(category: TipCategory, count: usize, rng: &mut dyn RandomSource) -> Vec<&'static str> {
    let mut pool: Vec<&'static str> = category.tips().to_vec();
    let take = count.min(pool.len());
    // 部分 Fisher-Yates
    for i in 0..take {
        let j = i + rng.next_index(pool.len() - i);
        pool.swap(i, j);
    }
    pool.truncate(take);
    pool
}

const SPINE_ALIGNMENT: &[&str] = &[
    "Imagine a string pulling you up from the crown of your head",
    "Keep your ears aligned directly over your shoulders",
    "Think 'tall spine' throughout the day to maintain alignment",
    "Use a lumbar support cushion if sitting for long periods",
    "Practice wall angels to improve spinal positioning",
    "Set hourly reminders to check and correct your spine alignment",
    "Sleep with a pillow that keeps your neck in its natural curve",
    "Consider a standing desk to reduce prolonged sitting",
    "Strengthen your core muscles to support your spine",
    "Practice the 'book on head' drill for better posture awareness",
];

const SHOULDER_BALANCE: &[&str] = &[
    "Check that your monitor is centered in front of you",
    "Avoid carrying heavy bags on one shoulder",
    "Practice shoulder blade squeezes throughout the day",
    "Keep your keyboard and mouse at the same height",
    "Sleep on your back or alternate sides to prevent imbalances",
    "Do doorway chest stretches to counteract forward shoulders",
    "Strengthen your rear deltoids and rhomboids",
    "Avoid sleeping on your stomach, which strains the shoulders",
    "Use both hands equally when carrying items",
    "Practice wall push-ups to strengthen shoulder stabilizers",
];

const HEAD_POSITION: &[&str] = &[
    "Pull your chin back slightly to reduce forward head posture",
    "Position your monitor so the top is at eye level",
    "Avoid looking down at your phone for long stretches",
    "Strengthen your deep neck flexors with chin tucks",
    "Take breaks from reading to look up and around",
    "Use a document holder next to your monitor when typing",
    "Practice neck retraction exercises during the day",
    "Avoid sleeping with too many pillows under your head",
    "Hold devices at eye level when possible",
    "Do upper trap stretches to relieve forward head tension",
];

const NECK_POSTURE: &[&str] = &[
    "Perform gentle neck rolls in both directions",
    "Strengthen your neck muscles with light resistance work",
    "Avoid cradling your phone between ear and shoulder",
    "Use a headset for long phone calls",
    "Practice slow 'nod yes, shake no' movements for neck mobility",
    "Apply heat to tight neck muscles",
    "Massage the base of your skull to relieve tension",
    "Keep your head neutral while sleeping",
    "Do levator scapulae stretches regularly",
    "Consider an ergonomic pillow designed for neck support",
];

const HIP_ALIGNMENT: &[&str] = &[
    "Sit with your feet flat on the floor, hip-width apart",
    "Keep your hips level when standing and walking",
    "Strengthen your glutes to support hip alignment",
    "Stretch your hip flexors if you sit for long periods",
    "Practice single-leg balance exercises",
    "Use a seat cushion to keep a good hip angle",
    "Avoid crossing your legs for long periods",
    "Do hip circles and figure-8s for mobility",
    "Sleep with a pillow between your knees if you sleep on your side",
    "See a physical therapist for persistent hip issues",
];

const OVERALL_SYMMETRY: &[&str] = &[
    "Practice yoga or Pilates for balanced muscle development",
    "Alternate which side you sleep on",
    "Use both hands equally for daily activities",
    "Strengthen your weaker side with targeted exercises",
    "Notice when you favor one side during activities",
    "Add unilateral exercises to address imbalances",
    "Check that your workspace is set up symmetrically",
    "Practice single-arm and single-leg exercises",
    "Use a mirror to check your alignment",
    "Consider working with a movement specialist",
];

const GENERAL: &[&str] = &[
    "Take a 2-minute posture break every 30 minutes",
    "Set up your workspace ergonomically",
    "Exercise regularly to maintain strength and flexibility",
    "Stay hydrated to keep your muscles working well",
    "Get enough sleep for muscle recovery",
    "Practice mindfulness to increase body awareness",
    "Wear supportive, well-fitted shoes",
    "Maintain a healthy weight to reduce postural strain",
    "Get a professional posture assessment if problems persist",
    "Use reminders to build better posture habits",
    "Practice deep breathing to relax tense muscles",
    "Add stretching to your daily routine",
    "Be patient: posture improvement takes consistency",
    "Focus on progress, not perfection",
    "Celebrate small improvements in your posture awareness",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::StdRandom;
    use std::collections::HashSet;

    #[test]
    fn test_every_category_has_tips() {
        for category in TipCategory::ALL {
            assert!(!category.tips().is_empty(), "{:?} empty", category);
        }
    }

    #[test]
    fn test_metric_name_fallback() {
        assert_eq!(TipCategory::from_metric_name("neckPosture"), TipCategory::NeckPosture);
        assert_eq!(TipCategory::from_metric_name("hip_alignment"), TipCategory::HipAlignment);
        assert_eq!(TipCategory::from_metric_name("kneeValgus"), TipCategory::General);
    }

    #[test]
    fn test_pick_without_replacement() {
        let mut rng = StdRandom::seeded(3);
        for _ in 0..20 {
            let picked = pick_tips(TipCategory::General, 6, &mut rng);
            assert_eq!(picked.len(), 6);
            let unique: HashSet<_> = picked.iter().collect();
            assert_eq!(unique.len(), 6);
            assert!(picked.iter().all(|t| GENERAL.contains(t)));
        }
    }

    #[test]
    fn test_pick_more_than_available() {
        let mut rng = StdRandom::seeded(9);
        let picked = pick_tips(TipCategory::NeckPosture, 50, &mut rng);
        assert_eq!(picked.len(), NECK_POSTURE.len());
    }
}
