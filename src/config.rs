use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub exercise: ExerciseConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// 必須ランドマークの可視性の下限
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f64,
    /// 起動中にこの時間フレームが来なければカメラ停止とみなす
    #[serde(default = "default_stall_timeout_ms")]
    pub stall_timeout_ms: u64,
}

fn default_visibility_threshold() -> f64 { 0.5 }
fn default_stall_timeout_ms() -> u64 { 3000 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: default_visibility_threshold(),
            stall_timeout_ms: default_stall_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// 平均を取る直近フレーム数
    #[serde(default = "default_window")]
    pub window: usize,
    /// サンプル数がこれ未満の間は生の値をそのまま返す
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_score_step")]
    pub score_step: f64,
    #[serde(default = "default_metric_step")]
    pub metric_step: f64,
}

fn default_window() -> usize { 12 }
fn default_min_samples() -> usize { 3 }
fn default_score_step() -> f64 { 2.0 }
fn default_metric_step() -> f64 { 0.5 }

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            min_samples: default_min_samples(),
            score_step: default_score_step(),
            metric_step: default_metric_step(),
        }
    }
}

/// 表示用のクランプと揺らぎ。表示スコアを前向きな範囲に保つためのもので、測定値ではない
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_floor")]
    pub floor: f64,
    #[serde(default = "default_ceiling")]
    pub ceiling: f64,
    /// [-jitter, +jitter] の一様な揺らぎ
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    /// 鼻の可視性がこれを超えると信頼度 `High`
    #[serde(default = "default_high_confidence_visibility")]
    pub high_confidence_visibility: f64,
}

fn default_floor() -> f64 { 55.0 }
fn default_ceiling() -> f64 { 92.0 }
fn default_jitter() -> f64 { 3.0 }
fn default_high_confidence_visibility() -> f64 { 0.8 }

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            floor: default_floor(),
            ceiling: default_ceiling(),
            jitter: default_jitter(),
            high_confidence_visibility: default_high_confidence_visibility(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseConfig {
    /// 腕の角度（度）がこれを超えると腕立ての上
    #[serde(default = "default_pushup_up_angle")]
    pub pushup_up_angle: f64,
    /// 腕の角度（度）がこれ未満なら腕立ての下
    #[serde(default = "default_pushup_down_angle")]
    pub pushup_down_angle: f64,
    /// 腰が膝よりこれ以上下（正規化y）ならスクワットの下
    #[serde(default = "default_squat_down_margin")]
    pub squat_down_margin: f64,
    /// 腰が膝よりこれ以上上なら立位
    #[serde(default = "default_squat_up_margin")]
    pub squat_up_margin: f64,
}

fn default_pushup_up_angle() -> f64 { 80.0 }
fn default_pushup_down_angle() -> f64 { 30.0 }
fn default_squat_down_margin() -> f64 { 0.05 }
fn default_squat_up_margin() -> f64 { 0.1 }

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            pushup_up_angle: default_pushup_up_angle(),
            pushup_down_angle: default_pushup_down_angle(),
            squat_down_margin: default_squat_down_margin(),
            squat_up_margin: default_squat_up_margin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_stabilize_secs")]
    pub stabilize_secs: u64,
    #[serde(default = "default_collect_secs")]
    pub collect_secs: u64,
    /// 各レポートに付ける一般アドバイスの件数
    #[serde(default = "default_recommendation_count")]
    pub recommendation_count: usize,
}

fn default_stabilize_secs() -> u64 { 10 }
fn default_collect_secs() -> u64 { 5 }
fn default_recommendation_count() -> usize { 6 }

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            stabilize_secs: default_stabilize_secs(),
            collect_secs: default_collect_secs(),
            recommendation_count: default_recommendation_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_listen_addr() -> String { "127.0.0.1:7878".to_string() }
fn default_tick_interval_ms() -> u64 { 1000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// ファイルが無い・不正な場合はデフォルト値
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("using default config ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.analysis.visibility_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Validation(format!(
                "visibility_threshold {} outside [0, 1]",
                threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.scoring.high_confidence_visibility) {
            return Err(ConfigError::Validation(format!(
                "high_confidence_visibility {} outside [0, 1]",
                self.scoring.high_confidence_visibility
            )));
        }
        if self.scoring.floor > self.scoring.ceiling {
            return Err(ConfigError::Validation(format!(
                "score floor {} above ceiling {}",
                self.scoring.floor, self.scoring.ceiling
            )));
        }
        if self.scoring.jitter < 0.0 {
            return Err(ConfigError::Validation("jitter must be non-negative".to_string()));
        }
        if self.smoothing.window == 0 {
            return Err(ConfigError::Validation("smoothing window must be positive".to_string()));
        }
        if self.smoothing.score_step <= 0.0 || self.smoothing.metric_step <= 0.0 {
            return Err(ConfigError::Validation("quantization steps must be positive".to_string()));
        }
        if self.exercise.pushup_down_angle >= self.exercise.pushup_up_angle {
            return Err(ConfigError::Validation(
                "pushup_down_angle must be below pushup_up_angle".to_string(),
            ));
        }
        if self.server.tick_interval_ms == 0 {
            return Err(ConfigError::Validation("tick_interval_ms must be positive".to_string()));
        }
        Ok(())
    }
}
