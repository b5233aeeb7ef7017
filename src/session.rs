//! 解析セッション: 1回のカメラ起動に紐づく状態をすべて所有する
//!
//! フレームコールバック ([`AnalysisSession::process_frame`]) と周期タイマー
//! ([`AnalysisSession::tick`]) の2つが状態を更新する。どちらも `&mut self` なので、
//! マルチスレッドのホストはセッションを1つの Mutex で包めばモード切替・停止が
//! 次のフレームに対してアトミックになる。

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Config, ReportConfig};
use crate::features::{extract_posture, ExerciseAnalyzer, ExerciseReading};
use crate::mode::AnalysisMode;
use crate::pose::{FrameAdapter, LandmarkFrame, RawFrame};
use crate::random::{RandomSource, StdRandom};
use crate::report::{CollectionWindow, ReportGenerator, SessionReport, WindowStatus};
use crate::scoring::{PostureMetrics, PostureScorer};
use crate::tracker::{format_mm_ss, PlankTick, PlankTimer, RepCounter, RepState, Smoother};

const STATUS_IDLE: &str = "Ready to start";
const STATUS_ACTIVE: &str = "Camera active - Position yourself in view";
const STATUS_REPOSITION: &str = "Position yourself in front of the camera";
const STATUS_STALLED: &str = "No frames from the camera - check the camera connection";
const STATUS_STOPPED: &str = "Camera stopped";

/// 一度も解析できなかった運動セッションの既定スコア
const DEFAULT_EXERCISE_SCORE: f64 = 75.0;

/// 運動モード用のカウンタとタイマー
#[derive(Debug, Clone, Default)]
pub struct ExerciseState {
    pub pushups: RepCounter,
    pub squats: RepCounter,
    pub plank: PlankTimer,
    pub form_quality: u32,
}

impl ExerciseState {
    pub fn reset(&mut self) {
        self.pushups.reset();
        self.squats.reset();
        self.plank.stop();
        self.form_quality = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reading {
    Posture(PostureMetrics),
    Exercise {
        reading: ExerciseReading,
        state: RepState,
        count: u32,
    },
    Plank {
        form_quality: u32,
        elapsed_seconds: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameUpdate {
    pub mode: AnalysisMode,
    pub reading: Reading,
    pub status: String,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    Update(FrameUpdate),
    Rejected { reason: String, status: String },
    Report(SessionReport),
    PlankTick(PlankTick),
    Status(String),
    Stalled { last_frame_ms: Option<u64> },
}

/// 停止時に保存層へ渡す要約
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub mode: AnalysisMode,
    pub duration_secs: u64,
    pub score: f64,
    pub improvements: Vec<String>,
    pub exercise_count: Option<u32>,
    pub form_quality: Option<u32>,
}

fn posture_feedback(score: f64) -> &'static str {
    if score >= 85.0 {
        "Outstanding posture! Keep it up!"
    } else if score >= 78.0 {
        "Excellent posture!"
    } else if score >= 75.0 {
        "Really good posture! (75+ is excellent)"
    } else if score >= 70.0 {
        "Good posture, well done!"
    } else if score >= 65.0 {
        "Fair posture - keep improving!"
    } else {
        "Focus on key areas for better posture"
    }
}

fn pushup_feedback(form_quality: u32) -> &'static str {
    if form_quality > 80 {
        "Perfect form!"
    } else if form_quality > 60 {
        "Keep body straight"
    } else {
        "Improve form - straight line head to feet"
    }
}

fn squat_feedback(form_quality: u32) -> &'static str {
    if form_quality > 75 {
        "Great depth!"
    } else if form_quality > 50 {
        "Go deeper"
    } else {
        "Squat lower"
    }
}

fn plank_feedback(form_quality: u32) -> &'static str {
    if form_quality > 80 {
        "Perfect plank form!"
    } else {
        "Keep body straight and core tight"
    }
}

fn window_status_text(status: WindowStatus) -> String {
    match status {
        WindowStatus::Stabilizing { remaining_secs } => format!("Stabilizing... {}s", remaining_secs),
        WindowStatus::Collecting { remaining_secs } => format!("Analyzing... {}s", remaining_secs),
        WindowStatus::Ready => "Posture report generated!".to_string(),
        WindowStatus::Reported => "Analyzing posture - Report available".to_string(),
    }
}

pub struct AnalysisSession {
    mode: AnalysisMode,
    active: bool,
    started_at_ms: u64,
    last_frame_ms: Option<u64>,
    stalled: bool,
    stall_timeout_ms: u64,

    adapter: FrameAdapter,
    exercise_analyzer: ExerciseAnalyzer,
    scorer: PostureScorer,
    smoother: Smoother,
    report_generator: ReportGenerator,
    report_config: ReportConfig,

    window: Option<CollectionWindow>,
    report: Option<SessionReport>,
    exercise: ExerciseState,
    latest_metrics: Option<PostureMetrics>,
    status: String,
    feedback: Option<String>,

    rng: Box<dyn RandomSource>,
}

impl AnalysisSession {
    pub fn new(config: &Config, rng: Box<dyn RandomSource>) -> Self {
        Self {
            mode: AnalysisMode::default(),
            active: false,
            started_at_ms: 0,
            last_frame_ms: None,
            stalled: false,
            stall_timeout_ms: config.analysis.stall_timeout_ms,
            adapter: FrameAdapter::from_config(&config.analysis),
            exercise_analyzer: ExerciseAnalyzer::from_config(&config.exercise),
            scorer: PostureScorer::from_config(&config.scoring),
            smoother: Smoother::from_config(&config.smoothing),
            report_generator: ReportGenerator::from_config(&config.report),
            report_config: config.report.clone(),
            window: None,
            report: None,
            exercise: ExerciseState::default(),
            latest_metrics: None,
            status: STATUS_IDLE.to_string(),
            feedback: None,
            rng,
        }
    }

    pub fn with_entropy(config: &Config) -> Self {
        Self::new(config, Box::new(StdRandom::from_entropy()))
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn latest_metrics(&self) -> Option<&PostureMetrics> {
        self.latest_metrics.as_ref()
    }

    pub fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    pub fn exercise(&self) -> &ExerciseState {
        &self.exercise
    }

    pub fn pushup_count(&self) -> u32 {
        self.exercise.pushups.count()
    }

    pub fn squat_count(&self) -> u32 {
        self.exercise.squats.count()
    }

    pub fn plank_elapsed_seconds(&self) -> u64 {
        self.exercise.plank.elapsed_seconds()
    }

    pub fn smoothing_len(&self) -> usize {
        self.smoother.len()
    }

    /// 起動単位の状態をまとめて破棄し、現在のモードが必要とするタイマーを張り直す
    fn reset_state(&mut self, now_ms: u64) {
        self.smoother.reset();
        self.exercise.reset();
        self.report = None;
        self.latest_metrics = None;
        self.feedback = None;
        self.window = None;

        if self.active {
            match self.mode {
                AnalysisMode::Posture => {
                    self.window = Some(CollectionWindow::new(now_ms, &self.report_config));
                }
                AnalysisMode::Plank => self.exercise.plank.start(now_ms),
                AnalysisMode::Pushup | AnalysisMode::Squat => {}
            }
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        if self.active {
            debug!("start ignored, session already active");
            return;
        }
        self.active = true;
        self.started_at_ms = now_ms;
        self.last_frame_ms = None;
        self.stalled = false;
        self.reset_state(now_ms);
        self.status = STATUS_ACTIVE.to_string();
        info!(mode = %self.mode, "session started");
    }

    /// セッションを終了する。以降に届いたフレームは無視される
    pub fn stop(&mut self, now_ms: u64) -> Option<SessionSummary> {
        if !self.active {
            return None;
        }
        let summary = self.summary(now_ms);

        self.active = false;
        self.exercise.plank.stop();
        self.window = None;
        self.report = None;
        self.smoother.reset();
        self.latest_metrics = None;
        self.feedback = None;
        self.status = STATUS_STOPPED.to_string();
        info!(mode = %self.mode, duration_secs = summary.duration_secs, "session stopped");
        Some(summary)
    }

    fn summary(&self, now_ms: u64) -> SessionSummary {
        let duration_secs = now_ms.saturating_sub(self.started_at_ms) / 1000;
        let form_quality = self.exercise.form_quality;
        let exercise_score = if form_quality > 0 {
            form_quality as f64
        } else {
            DEFAULT_EXERCISE_SCORE
        };

        let (score, improvements, exercise_count, form) = match self.mode {
            AnalysisMode::Posture => match &self.latest_metrics {
                Some(metrics) => (metrics.score, vec!["Session completed".to_string()], None, None),
                None => (0.0, Vec::new(), None, None),
            },
            AnalysisMode::Pushup => {
                let count = self.exercise.pushups.count();
                (
                    exercise_score,
                    vec![format!("Completed {} push-ups", count)],
                    Some(count),
                    Some(form_quality),
                )
            }
            AnalysisMode::Squat => {
                let count = self.exercise.squats.count();
                (
                    exercise_score,
                    vec![format!("Completed {} squats", count)],
                    Some(count),
                    Some(form_quality),
                )
            }
            AnalysisMode::Plank => (
                exercise_score,
                vec![format!(
                    "Held plank for {}",
                    format_mm_ss(self.exercise.plank.elapsed_seconds())
                )],
                None,
                Some(form_quality),
            ),
        };

        SessionSummary {
            mode: self.mode,
            duration_secs,
            score,
            improvements,
            exercise_count,
            form_quality: form,
        }
    }

    /// 平滑化バッファ・運動状態・収集ウィンドウを一度にリセットしてから切り替える
    pub fn switch_mode(&mut self, mode: AnalysisMode, now_ms: u64) {
        if mode == self.mode {
            return;
        }
        info!(from = %self.mode, to = %mode, "switching mode");
        self.mode = mode;
        self.reset_state(now_ms);
        if self.active {
            self.status = STATUS_ACTIVE.to_string();
        }
    }

    /// 回数をクリア。プランク中なら0秒から数え直す
    pub fn reset_exercise(&mut self, now_ms: u64) {
        self.exercise.reset();
        self.feedback = None;
        if self.active && self.mode == AnalysisMode::Plank {
            self.exercise.plank.start(now_ms);
        }
    }

    pub fn process_frame(&mut self, raw: &RawFrame, now_ms: u64) -> Vec<SessionEvent> {
        if !self.active {
            debug!("frame ignored, session inactive");
            return Vec::new();
        }
        self.last_frame_ms = Some(now_ms);
        self.stalled = false;

        let frame = match self.adapter.adapt(raw, self.mode) {
            Ok(frame) => frame,
            Err(reason) => {
                debug!(%reason, "frame rejected");
                self.status = STATUS_REPOSITION.to_string();
                self.feedback = None;
                return vec![SessionEvent::Rejected {
                    reason: reason.to_string(),
                    status: self.status.clone(),
                }];
            }
        };

        match self.mode {
            AnalysisMode::Posture => self.process_posture(&frame, now_ms),
            AnalysisMode::Pushup | AnalysisMode::Squat => self.process_reps(&frame),
            AnalysisMode::Plank => self.process_plank(&frame),
        }
    }

    fn process_posture(&mut self, frame: &LandmarkFrame, now_ms: u64) -> Vec<SessionEvent> {
        let raw = self.scorer.assess(frame, extract_posture(frame), self.rng.as_mut());
        let smoothed = self.smoother.apply(raw);
        self.latest_metrics = Some(smoothed);
        self.feedback = Some(posture_feedback(smoothed.score).to_string());

        let mut events = Vec::new();
        let window_status = self.window.as_mut().map(|w| w.observe(now_ms, smoothed));
        let mut report = None;
        if let Some(window_status) = window_status {
            self.status = window_status_text(window_status);
            if window_status == WindowStatus::Ready {
                report = self.finish_report(now_ms);
            }
        }

        events.push(SessionEvent::Update(FrameUpdate {
            mode: self.mode,
            reading: Reading::Posture(smoothed),
            status: self.status.clone(),
            feedback: self.feedback.clone(),
        }));
        if let Some(report) = report {
            events.push(SessionEvent::Report(report));
        }
        events
    }

    fn finish_report(&mut self, now_ms: u64) -> Option<SessionReport> {
        let window = self.window.as_mut()?;
        let samples = window.finish();
        let report = self.report_generator.generate(&samples, now_ms, self.rng.as_mut());
        info!(
            samples = report.sample_count,
            average_score = report.average_score,
            "posture report generated"
        );
        self.report = Some(report.clone());
        Some(report)
    }

    fn process_reps(&mut self, frame: &LandmarkFrame) -> Vec<SessionEvent> {
        let (reading, counter, label, feedback) = match self.mode {
            AnalysisMode::Pushup => {
                let reading = self.exercise_analyzer.pushup(frame);
                (reading, &mut self.exercise.pushups, "Push-up", pushup_feedback(reading.form_quality))
            }
            _ => {
                let reading = self.exercise_analyzer.squat(frame);
                (reading, &mut self.exercise.squats, "Squat", squat_feedback(reading.form_quality))
            }
        };

        if counter.observe(reading.position) {
            debug!(count = counter.count(), "{} repetition", label);
        }
        let state = counter.state();
        let count = counter.count();

        self.exercise.form_quality = reading.form_quality;
        self.status = format!("{} position: {}", label, reading.position.as_str());
        self.feedback = Some(feedback.to_string());

        vec![SessionEvent::Update(FrameUpdate {
            mode: self.mode,
            reading: Reading::Exercise { reading, state, count },
            status: self.status.clone(),
            feedback: self.feedback.clone(),
        })]
    }

    /// プランクのフォームは同じフレームの姿勢スコア（平滑化なし）
    fn process_plank(&mut self, frame: &LandmarkFrame) -> Vec<SessionEvent> {
        let features = extract_posture(frame);
        let form_quality = self.scorer.score(&features, self.rng.as_mut()) as u32;
        self.exercise.form_quality = form_quality;
        self.feedback = Some(plank_feedback(form_quality).to_string());

        vec![SessionEvent::Update(FrameUpdate {
            mode: self.mode,
            reading: Reading::Plank {
                form_quality,
                elapsed_seconds: self.exercise.plank.elapsed_seconds(),
            },
            status: self.status.clone(),
            feedback: self.feedback.clone(),
        })]
    }

    /// 1秒周期: プランク経過・レポート進行・フレーム途絶の検知
    pub fn tick(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        if !self.active {
            return Vec::new();
        }
        let mut events = Vec::new();

        if let Some(tick) = self.exercise.plank.tick(now_ms) {
            events.push(SessionEvent::PlankTick(tick));
        }

        let window_status = self.window.as_mut().map(|w| w.tick(now_ms));
        if let Some(window_status) = window_status {
            if window_status != WindowStatus::Reported {
                self.status = window_status_text(window_status);
                events.push(SessionEvent::Status(self.status.clone()));
            }
            if window_status == WindowStatus::Ready {
                if let Some(report) = self.finish_report(now_ms) {
                    events.push(SessionEvent::Report(report));
                }
            }
        }

        let last_seen = self.last_frame_ms.unwrap_or(self.started_at_ms);
        if !self.stalled && now_ms.saturating_sub(last_seen) >= self.stall_timeout_ms {
            self.stalled = true;
            self.status = STATUS_STALLED.to_string();
            warn!(last_frame_ms = ?self.last_frame_ms, "no frames from pose engine");
            events.push(SessionEvent::Stalled {
                last_frame_ms: self.last_frame_ms,
            });
        }

        events
    }
}
