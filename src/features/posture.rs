use serde::{Deserialize, Serialize};

use crate::pose::{Landmark, LandmarkFrame, LandmarkIndex};

/// 姿勢特徴量の種類（角度は度、比率はパーセント）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostureFeature {
    SpineAngle,
    ShoulderTilt,
    HeadForwardAngle,
    ShoulderRoll,
    ArmSymmetry,
    NeckAngle,
    HipTilt,
    TorsoLean,
    ShoulderProtraction,
    PelvisAlignment,
    OverallSymmetry,
}

impl PostureFeature {
    pub const COUNT: usize = 11;

    pub const ALL: [PostureFeature; Self::COUNT] = [
        Self::SpineAngle,
        Self::ShoulderTilt,
        Self::HeadForwardAngle,
        Self::ShoulderRoll,
        Self::ArmSymmetry,
        Self::NeckAngle,
        Self::HipTilt,
        Self::TorsoLean,
        Self::ShoulderProtraction,
        Self::PelvisAlignment,
        Self::OverallSymmetry,
    ];
}

/// 1フレームから導出した姿勢特徴量
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PostureFeatures {
    pub spine_angle: f64,
    pub shoulder_tilt: f64,
    pub head_forward_angle: f64,
    pub shoulder_roll: f64,
    pub arm_symmetry: f64,
    pub neck_angle: f64,
    pub hip_tilt: f64,
    pub torso_lean: f64,
    pub shoulder_protraction: f64,
    pub pelvis_alignment: f64,
    pub overall_symmetry: f64,
}

impl PostureFeatures {
    pub fn get(&self, feature: PostureFeature) -> f64 {
        match feature {
            PostureFeature::SpineAngle => self.spine_angle,
            PostureFeature::ShoulderTilt => self.shoulder_tilt,
            PostureFeature::HeadForwardAngle => self.head_forward_angle,
            PostureFeature::ShoulderRoll => self.shoulder_roll,
            PostureFeature::ArmSymmetry => self.arm_symmetry,
            PostureFeature::NeckAngle => self.neck_angle,
            PostureFeature::HipTilt => self.hip_tilt,
            PostureFeature::TorsoLean => self.torso_lean,
            PostureFeature::ShoulderProtraction => self.shoulder_protraction,
            PostureFeature::PelvisAlignment => self.pelvis_alignment,
            PostureFeature::OverallSymmetry => self.overall_symmetry,
        }
    }

    fn slot(&mut self, feature: PostureFeature) -> &mut f64 {
        match feature {
            PostureFeature::SpineAngle => &mut self.spine_angle,
            PostureFeature::ShoulderTilt => &mut self.shoulder_tilt,
            PostureFeature::HeadForwardAngle => &mut self.head_forward_angle,
            PostureFeature::ShoulderRoll => &mut self.shoulder_roll,
            PostureFeature::ArmSymmetry => &mut self.arm_symmetry,
            PostureFeature::NeckAngle => &mut self.neck_angle,
            PostureFeature::HipTilt => &mut self.hip_tilt,
            PostureFeature::TorsoLean => &mut self.torso_lean,
            PostureFeature::ShoulderProtraction => &mut self.shoulder_protraction,
            PostureFeature::PelvisAlignment => &mut self.pelvis_alignment,
            PostureFeature::OverallSymmetry => &mut self.overall_symmetry,
        }
    }

    /// 全特徴量に同じ変換を適用
    pub fn map(&self, mut f: impl FnMut(PostureFeature, f64) -> f64) -> Self {
        let mut out = *self;
        for feature in PostureFeature::ALL {
            *out.slot(feature) = f(feature, self.get(feature));
        }
        out
    }

    /// 特徴量ごとの算術平均。空なら `None`
    pub fn mean<'a>(samples: impl IntoIterator<Item = &'a PostureFeatures>) -> Option<Self> {
        let mut sum = PostureFeatures::default();
        let mut n = 0usize;
        for sample in samples {
            sum = sum.map(|feature, acc| acc + sample.get(feature));
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(sum.map(|_, total| total / n as f64))
    }
}

/// p2 を頂点とする p1-p2-p3 の角度（度、0〜180）
pub fn angle_at(p1: &Landmark, p2: &Landmark, p3: &Landmark) -> f64 {
    let v1 = (p1.x - p2.x, p1.y - p2.y);
    let v2 = (p3.x - p2.x, p3.y - p2.y);
    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let det = v1.0 * v2.1 - v1.1 * v2.0;
    f64::atan2(det, dot).to_degrees().abs()
}

/// 左右の高さ差を横幅で割った傾き（%）
fn tilt_ratio(left: &Landmark, right: &Landmark) -> f64 {
    let height_diff = (left.y - right.y).abs();
    let width = (left.x - right.x).abs();
    height_diff / width * 100.0
}

/// 姿勢特徴量を計算する。フレームはアダプタで検証済みであること
pub fn extract_posture(frame: &LandmarkFrame) -> PostureFeatures {
    use LandmarkIndex::*;

    let left_shoulder = frame.get(LeftShoulder);
    let right_shoulder = frame.get(RightShoulder);
    let left_hip = frame.get(LeftHip);
    let right_hip = frame.get(RightHip);

    let shoulder_center = frame.midpoint(LeftShoulder, RightShoulder);
    let hip_center = frame.midpoint(LeftHip, RightHip);
    let ear_center = frame.midpoint(LeftEar, RightEar);
    let eye_center = frame.midpoint(LeftEye, RightEye);

    // 腰→肩ベクトルの鉛直からのずれ
    let spine_dx = shoulder_center.x - hip_center.x;
    let spine_dy = shoulder_center.y - hip_center.y;
    let spine_angle = f64::atan2(spine_dx, spine_dy.abs()).to_degrees().abs();

    let shoulder_tilt = tilt_ratio(left_shoulder, right_shoulder);

    let head_forward_angle = f64::atan2(
        (ear_center.x - shoulder_center.x).abs(),
        (ear_center.y - shoulder_center.y).abs(),
    )
    .to_degrees();

    let shoulder_roll = (left_shoulder.z - right_shoulder.z).abs() * 100.0;

    let left_arm = angle_at(left_shoulder, frame.get(LeftElbow), left_hip);
    let right_arm = angle_at(right_shoulder, frame.get(RightElbow), right_hip);
    let arm_symmetry = (left_arm - right_arm).abs();

    let neck_angle = f64::atan2(
        eye_center.x - ear_center.x,
        (eye_center.y - ear_center.y).abs(),
    )
    .to_degrees()
    .abs();

    let hip_tilt = tilt_ratio(left_hip, right_hip);

    // 画像下向き(+y)基準の符号付き角度。直立時は180°付近になる
    let torso_lean = f64::atan2(spine_dx, spine_dy).to_degrees().abs();

    let shoulder_protraction = (shoulder_center.z - ear_center.z).abs() * 100.0;

    let left_hip_knee = (left_hip.y - frame.get(LeftKnee).y).abs() * 100.0;
    let right_hip_knee = (right_hip.y - frame.get(RightKnee).y).abs() * 100.0;
    let pelvis_alignment = (left_hip_knee - right_hip_knee).abs();

    let overall_symmetry = (shoulder_tilt + hip_tilt + arm_symmetry / 5.0 + pelvis_alignment) / 4.0;

    PostureFeatures {
        spine_angle,
        shoulder_tilt,
        head_forward_angle,
        shoulder_roll,
        arm_symmetry,
        neck_angle,
        hip_tilt,
        torso_lean,
        shoulder_protraction,
        pelvis_alignment,
        overall_symmetry,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pose::Landmark;

    /// 正面を向いて真っ直ぐ立っている骨格
    pub(crate) fn upright_frame() -> LandmarkFrame {
        use LandmarkIndex::*;
        let mut frame = LandmarkFrame::default();
        let mut set = |idx: LandmarkIndex, x: f64, y: f64| {
            frame.landmarks[idx as usize] = Landmark::new(x, y, 0.0, 0.95);
        };
        set(Nose, 0.5, 0.15);
        set(LeftEye, 0.52, 0.12);
        set(RightEye, 0.48, 0.12);
        set(LeftEar, 0.55, 0.13);
        set(RightEar, 0.45, 0.13);
        set(LeftShoulder, 0.6, 0.3);
        set(RightShoulder, 0.4, 0.3);
        set(LeftElbow, 0.63, 0.45);
        set(RightElbow, 0.37, 0.45);
        set(LeftWrist, 0.63, 0.58);
        set(RightWrist, 0.37, 0.58);
        set(LeftHip, 0.56, 0.6);
        set(RightHip, 0.44, 0.6);
        set(LeftKnee, 0.56, 0.78);
        set(RightKnee, 0.44, 0.78);
        set(LeftAnkle, 0.56, 0.95);
        set(RightAnkle, 0.44, 0.95);
        frame
    }

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_upright_frame_is_aligned() {
        let f = extract_posture(&upright_frame());
        assert!(approx_eq(f.spine_angle, 0.0, 1e-9));
        assert!(approx_eq(f.shoulder_tilt, 0.0, 1e-9));
        assert!(approx_eq(f.head_forward_angle, 0.0, 1e-9));
        assert!(approx_eq(f.neck_angle, 0.0, 1e-9));
        assert!(approx_eq(f.hip_tilt, 0.0, 1e-9));
        assert!(approx_eq(f.arm_symmetry, 0.0, 1e-9));
        assert!(approx_eq(f.pelvis_alignment, 0.0, 1e-9));
        assert!(approx_eq(f.overall_symmetry, 0.0, 1e-9));
        assert!(approx_eq(f.torso_lean, 180.0, 1e-9));
    }

    #[test]
    fn test_shoulder_tilt_ratio() {
        let mut frame = upright_frame();
        // 肩幅0.2に対して高さ差0.02 → 10%
        frame.landmarks[LandmarkIndex::LeftShoulder as usize].y = 0.32;
        let f = extract_posture(&frame);
        assert!(approx_eq(f.shoulder_tilt, 10.0, 1e-6));
    }

    #[test]
    fn test_spine_lean_detected() {
        let mut frame = upright_frame();
        // 肩を右へ0.3 ずらす（垂直距離0.3）→ 45°
        for idx in [LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder] {
            frame.landmarks[idx as usize].x += 0.3;
        }
        let f = extract_posture(&frame);
        assert!(approx_eq(f.spine_angle, 45.0, 1e-6));
        assert!(approx_eq(f.torso_lean, 135.0, 1e-6));
    }

    #[test]
    fn test_depth_metrics() {
        let mut frame = upright_frame();
        frame.landmarks[LandmarkIndex::LeftShoulder as usize].z = 0.05;
        frame.landmarks[LandmarkIndex::RightShoulder as usize].z = -0.03;
        let f = extract_posture(&frame);
        assert!(approx_eq(f.shoulder_roll, 8.0, 1e-6));
        // 肩中心z=0.01, 耳中心z=0 → 1.0
        assert!(approx_eq(f.shoulder_protraction, 1.0, 1e-6));
    }

    #[test]
    fn test_angle_at_right_angle() {
        let a = Landmark::new(1.0, 0.0, 0.0, 1.0);
        let o = Landmark::new(0.0, 0.0, 0.0, 1.0);
        let b = Landmark::new(0.0, 1.0, 0.0, 1.0);
        assert!(approx_eq(angle_at(&a, &o, &b), 90.0, 1e-9));
        assert!(approx_eq(angle_at(&b, &o, &a), 90.0, 1e-9));
    }

    #[test]
    fn test_features_non_negative_for_jittered_frames() {
        use crate::mode::AnalysisMode;
        use crate::pose::{FrameAdapter, RawFrame};
        use crate::random::{RandomSource, StdRandom};

        let adapter = FrameAdapter::default();
        let mut rng = StdRandom::seeded(2024);
        let mut accepted = 0;

        for _ in 0..400 {
            let mut landmarks = upright_frame().landmarks.to_vec();
            for lm in landmarks.iter_mut() {
                lm.x += (rng.next_unit() - 0.5) * 0.3;
                lm.y += (rng.next_unit() - 0.5) * 0.3;
                lm.z = (rng.next_unit() - 0.5) * 0.4;
                // ときどき見えないランドマークを混ぜる
                lm.visibility = if rng.next_unit() < 0.02 { 0.1 } else { 0.6 + rng.next_unit() * 0.4 };
            }
            // アダプタが受け付けたフレームだけを対象にする
            let Ok(frame) = adapter.adapt(&RawFrame::new(landmarks), AnalysisMode::Posture) else {
                continue;
            };
            accepted += 1;

            let f = extract_posture(&frame);
            for feature in PostureFeature::ALL {
                let v = f.get(feature);
                assert!(v.is_finite() && v >= 0.0, "{:?} = {}", feature, v);
            }
        }
        assert!(accepted > 100, "only {} frames passed the adapter", accepted);
    }

    #[test]
    fn test_mean_of_features() {
        let a = PostureFeatures { spine_angle: 2.0, hip_tilt: 4.0, ..Default::default() };
        let b = PostureFeatures { spine_angle: 4.0, hip_tilt: 0.0, ..Default::default() };
        let m = PostureFeatures::mean([&a, &b]).unwrap();
        assert!(approx_eq(m.spine_angle, 3.0, 1e-9));
        assert!(approx_eq(m.hip_tilt, 2.0, 1e-9));
        assert!(PostureFeatures::mean(std::iter::empty()).is_none());
    }
}
