use serde::{Deserialize, Serialize};

use crate::config::ExerciseConfig;
use crate::pose::{LandmarkFrame, LandmarkIndex};

/// 1フレームで観測した運動中の位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Up,
    Down,
    Middle,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Middle => "middle",
        }
    }
}

/// 腕立て・スクワットの1フレーム解析結果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExerciseReading {
    pub position: Position,
    /// 判定に使った角度（度）
    pub angle: f64,
    /// フォーム品質 (0〜100)
    pub form_quality: u32,
}

/// 運動モード用の簡易角度計算と位置分類
#[derive(Debug, Clone)]
pub struct ExerciseAnalyzer {
    pushup_up_angle: f64,
    pushup_down_angle: f64,
    squat_down_margin: f64,
    squat_up_margin: f64,
}

impl ExerciseAnalyzer {
    pub fn from_config(config: &ExerciseConfig) -> Self {
        Self {
            pushup_up_angle: config.pushup_up_angle,
            pushup_down_angle: config.pushup_down_angle,
            squat_down_margin: config.squat_down_margin,
            squat_up_margin: config.squat_up_margin,
        }
    }

    /// 腕立て: 肩→肘の縦方向オフセット角で上下を判定
    pub fn pushup(&self, frame: &LandmarkFrame) -> ExerciseReading {
        use LandmarkIndex::*;
        let left_shoulder = frame.get(LeftShoulder);
        let left_elbow = frame.get(LeftElbow);

        let shoulder_y = frame.midpoint(LeftShoulder, RightShoulder).y;
        let elbow_y = frame.midpoint(LeftElbow, RightElbow).y;
        let angle = f64::atan2(elbow_y - shoulder_y, (left_elbow.x - left_shoulder.x).abs()).to_degrees();

        let position = if angle > self.pushup_up_angle {
            Position::Up
        } else if angle < self.pushup_down_angle {
            Position::Down
        } else {
            Position::Middle
        };

        // 肩と腰が一直線から外れるほど減点
        let shoulder_center = frame.midpoint(LeftShoulder, RightShoulder);
        let hip_center = frame.midpoint(LeftHip, RightHip);
        let deviation = (shoulder_center.y - hip_center.y).abs();
        let form_quality = (100.0 - deviation * 1000.0).max(0.0).round() as u32;

        ExerciseReading { position, angle, form_quality }
    }

    /// スクワット: 腰と膝の高さ関係で上下を判定（画像座標はyが下向き）
    ///
    /// 角度は腰が膝より下がるほど正に大きくなり、深いしゃがみほど高評価
    pub fn squat(&self, frame: &LandmarkFrame) -> ExerciseReading {
        use LandmarkIndex::*;
        let left_hip = frame.get(LeftHip);
        let left_knee = frame.get(LeftKnee);

        let hip_y = frame.midpoint(LeftHip, RightHip).y;
        let knee_y = frame.midpoint(LeftKnee, RightKnee).y;
        let angle = f64::atan2(hip_y - knee_y, (left_knee.x - left_hip.x).abs()).to_degrees();

        let position = if hip_y > knee_y + self.squat_down_margin {
            Position::Down
        } else if hip_y < knee_y - self.squat_up_margin {
            Position::Up
        } else {
            Position::Middle
        };

        let form_quality = if angle > 45.0 {
            angle.min(100.0)
        } else {
            (angle * 2.0).max(0.0)
        };

        ExerciseReading {
            position,
            angle,
            form_quality: form_quality.round() as u32,
        }
    }
}

impl Default for ExerciseAnalyzer {
    fn default() -> Self {
        Self::from_config(&ExerciseConfig::default())
    }
}
