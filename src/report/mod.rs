//! 収集ウィンドウから作るセッションレポート: 指標ごとの平均、3段階評価、
//! カテゴリ別のアドバイス

pub mod tips;
pub mod window;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ReportConfig;
use crate::features::{PostureFeature, PostureFeatures};
use crate::random::RandomSource;
use crate::scoring::PostureMetrics;

pub use tips::{pick_tips, TipCategory};
pub use window::{CollectionWindow, WindowPhase, WindowStatus};

pub const LIMITATIONS: [&str; 6] = [
    "Analysis based on a 2D camera view - depth perception is limited",
    "Single-angle assessment may not capture full postural complexity",
    "Lighting and camera quality affect measurement precision",
    "Results are estimates for general awareness, not medical diagnosis",
    "Full-body assessment requires professional evaluation",
    "Clothing and camera distance can affect accuracy",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Excellent,
    Good,
    NeedsImprovement,
}

impl Status {
    /// `value <= excellent` なら Excellent、`value <= good` なら Good
    pub fn classify(value: f64, (excellent, good): (f64, f64)) -> Self {
        if value <= excellent {
            Status::Excellent
        } else if value <= good {
            Status::Good
        } else {
            Status::NeedsImprovement
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Excellent => "Excellent",
            Status::Good => "Good",
            Status::NeedsImprovement => "Needs Improvement",
        })
    }
}

/// レポートに載せる指標
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportMetric {
    SpineAlignment,
    ShoulderBalance,
    HeadPosition,
    NeckPosture,
    HipAlignment,
    OverallSymmetry,
}

impl ReportMetric {
    pub const ALL: [ReportMetric; 6] = [
        Self::SpineAlignment,
        Self::ShoulderBalance,
        Self::HeadPosition,
        Self::NeckPosture,
        Self::HipAlignment,
        Self::OverallSymmetry,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::SpineAlignment => "spineAlignment",
            Self::ShoulderBalance => "shoulderBalance",
            Self::HeadPosition => "headPosition",
            Self::NeckPosture => "neckPosture",
            Self::HipAlignment => "hipAlignment",
            Self::OverallSymmetry => "overallSymmetry",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SpineAlignment => "spine alignment",
            Self::ShoulderBalance => "shoulder balance",
            Self::HeadPosition => "head position",
            Self::NeckPosture => "neck posture",
            Self::HipAlignment => "hip alignment",
            Self::OverallSymmetry => "overall symmetry",
        }
    }

    pub fn feature(self) -> PostureFeature {
        match self {
            Self::SpineAlignment => PostureFeature::SpineAngle,
            Self::ShoulderBalance => PostureFeature::ShoulderTilt,
            Self::HeadPosition => PostureFeature::HeadForwardAngle,
            Self::NeckPosture => PostureFeature::NeckAngle,
            Self::HipAlignment => PostureFeature::HipTilt,
            Self::OverallSymmetry => PostureFeature::OverallSymmetry,
        }
    }

    /// (Excellent の上限, Good の上限)
    pub fn thresholds(self) -> (f64, f64) {
        match self {
            Self::SpineAlignment => (6.0, 12.0),
            Self::ShoulderBalance => (5.0, 10.0),
            Self::HeadPosition => (20.0, 35.0),
            Self::NeckPosture => (15.0, 25.0),
            Self::HipAlignment => (6.0, 12.0),
            Self::OverallSymmetry => (12.0, 20.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub metric: ReportMetric,
    /// ウィンドウ内の平均（0.1単位で丸め）
    pub value: f64,
    pub status: Status,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub average_score: u32,
    pub sample_count: usize,
    /// [`ReportMetric::ALL`] の順に1件ずつ
    pub measurements: Vec<Measurement>,
    pub limitations: Vec<String>,
    pub recommendations: Vec<String>,
    pub generated_at_ms: u64,
}

impl SessionReport {
    pub fn measurement(&self, metric: ReportMetric) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.metric == metric)
    }
}

/// テキスト書き出し用の書式（見出し・各指標・番号付きの制限事項と推奨事項）
impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "POSTURE ANALYSIS REPORT")?;
        writeln!(f, "Generated: {}ms", self.generated_at_ms)?;
        writeln!(f, "Overall Score: {}/100", self.average_score)?;
        writeln!(f)?;
        writeln!(f, "DETAILED MEASUREMENTS:")?;
        for (i, m) in self.measurements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}: {} - {}", m.metric.name(), m.value, m.status)?;
            writeln!(f, "{}", m.recommendation)?;
        }
        writeln!(f)?;
        writeln!(f, "LIMITATIONS:")?;
        for (i, l) in self.limitations.iter().enumerate() {
            writeln!(f, "{}. {}", i + 1, l)?;
        }
        writeln!(f)?;
        write!(f, "RECOMMENDATIONS:")?;
        for (i, r) in self.recommendations.iter().enumerate() {
            write!(f, "\n{}. {}", i + 1, r)?;
        }
        Ok(())
    }
}

fn first_tip(category: TipCategory, rng: &mut dyn RandomSource) -> &'static str {
    pick_tips(category, 1, rng).into_iter().next().unwrap_or_default()
}

pub struct ReportGenerator {
    recommendation_count: usize,
}

impl ReportGenerator {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            recommendation_count: config.recommendation_count,
        }
    }

    fn recommendation(metric: ReportMetric, status: Status, rng: &mut dyn RandomSource) -> String {
        let category = TipCategory::from_metric_name(metric.name());
        match status {
            Status::Excellent => format!(
                "Your {} is excellent! {}",
                metric.label(),
                first_tip(TipCategory::General, rng)
            ),
            Status::Good => format!("Your {} is good. {}", metric.label(), first_tip(category, rng)),
            Status::NeedsImprovement => first_tip(category, rng).to_string(),
        }
    }

    /// サンプルが空なら panic。呼び出し側は1件以上集めてから呼ぶ
    pub fn generate(&self, samples: &[PostureMetrics], now_ms: u64, rng: &mut dyn RandomSource) -> SessionReport {
        assert!(!samples.is_empty(), "report requested from an empty collection window");

        let mean = PostureFeatures::mean(samples.iter().map(|m| &m.features)).unwrap_or_default();
        let average_score = samples.iter().map(|m| m.score).sum::<f64>() / samples.len() as f64;

        let measurements = ReportMetric::ALL
            .iter()
            .map(|&metric| {
                let value = mean.get(metric.feature());
                let status = Status::classify(value, metric.thresholds());
                Measurement {
                    metric,
                    value: (value * 10.0).round() / 10.0,
                    status,
                    recommendation: Self::recommendation(metric, status, rng),
                }
            })
            .collect();

        SessionReport {
            average_score: average_score.round().max(0.0) as u32,
            sample_count: samples.len(),
            measurements,
            limitations: LIMITATIONS.iter().map(|s| s.to_string()).collect(),
            recommendations: pick_tips(TipCategory::General, self.recommendation_count, rng)
                .into_iter()
                .map(str::to_string)
                .collect(),
            generated_at_ms: now_ms,
        }
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}
