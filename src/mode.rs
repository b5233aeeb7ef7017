use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pose::LandmarkIndex;

/// ユーザーが選んだ解析モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Posture,
    Pushup,
    Squat,
    Plank,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 4] = [Self::Posture, Self::Pushup, Self::Squat, Self::Plank];

    /// このモードでフレームを解析するのに必須で、見えている必要があるランドマーク
    pub fn required_landmarks(self) -> &'static [LandmarkIndex] {
        use LandmarkIndex::*;
        match self {
            Self::Posture | Self::Plank => &[
                LeftEye, RightEye, LeftEar, RightEar, LeftShoulder, RightShoulder, LeftElbow,
                RightElbow, LeftHip, RightHip, LeftKnee, RightKnee,
            ],
            Self::Pushup => &[LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftHip, RightHip],
            Self::Squat => &[LeftHip, RightHip, LeftKnee, RightKnee],
        }
    }

    /// 姿勢特徴量一式を使うモードか
    pub fn uses_posture_features(self) -> bool {
        matches!(self, Self::Posture | Self::Plank)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Posture => "posture",
            Self::Pushup => "pushup",
            Self::Squat => "squat",
            Self::Plank => "plank",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "posture" => Ok(Self::Posture),
            "pushup" | "push-up" => Ok(Self::Pushup),
            "squat" => Ok(Self::Squat),
            "plank" => Ok(Self::Plank),
            other => Err(anyhow::anyhow!("unknown analysis mode: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("posture".parse::<AnalysisMode>().unwrap(), AnalysisMode::Posture);
        assert_eq!("Push-Up".parse::<AnalysisMode>().unwrap(), AnalysisMode::Pushup);
        assert_eq!(" squat ".parse::<AnalysisMode>().unwrap(), AnalysisMode::Squat);
        assert!("lunge".parse::<AnalysisMode>().is_err());
    }

    #[test]
    fn test_display_round_trips_parse() {
        for mode in AnalysisMode::ALL {
            assert_eq!(mode.to_string().parse::<AnalysisMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_squat_needs_only_lower_body() {
        let required = AnalysisMode::Squat.required_landmarks();
        assert!(!required.contains(&LandmarkIndex::LeftShoulder));
        assert!(required.contains(&LandmarkIndex::RightKnee));
    }
}
