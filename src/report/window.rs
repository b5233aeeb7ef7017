use crate::config::ReportConfig;
use crate::scoring::PostureMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// 姿勢が落ち着くまでの間。サンプルは捨てる
    Stabilizing,
    /// 平滑化後のサンプルをレポート用に保持
    Collecting,
    /// レポート作成済み。次の起動まで固定
    Reported,
}

impl WindowPhase {
    /// 時間による遷移。`Reported` へは [`CollectionWindow::finish`] からのみ入る
    pub fn advance(self, elapsed_ms: u64, stabilize_ms: u64) -> WindowPhase {
        match self {
            WindowPhase::Stabilizing if elapsed_ms >= stabilize_ms => WindowPhase::Collecting,
            phase => phase,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    Stabilizing { remaining_secs: u64 },
    Collecting { remaining_secs: u64 },
    /// 収集時間が終わり、サンプルがレポート待ち
    Ready,
    Reported,
}

#[derive(Debug, Clone)]
pub struct CollectionWindow {
    started_at_ms: u64,
    stabilize_ms: u64,
    total_ms: u64,
    phase: WindowPhase,
    samples: Vec<PostureMetrics>,
}

impl CollectionWindow {
    pub fn new(started_at_ms: u64, config: &ReportConfig) -> Self {
        let stabilize_ms = config.stabilize_secs * 1000;
        Self {
            started_at_ms,
            stabilize_ms,
            total_ms: stabilize_ms + config.collect_secs * 1000,
            phase: WindowPhase::Stabilizing,
            samples: Vec::new(),
        }
    }

    pub fn phase(&self) -> WindowPhase {
        self.phase
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    fn elapsed(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_at_ms)
    }

    fn status(&self, elapsed_ms: u64) -> WindowStatus {
        match self.phase {
            WindowPhase::Stabilizing => WindowStatus::Stabilizing {
                remaining_secs: (self.stabilize_ms / 1000).saturating_sub(elapsed_ms / 1000),
            },
            WindowPhase::Collecting if elapsed_ms >= self.total_ms && !self.samples.is_empty() => {
                WindowStatus::Ready
            }
            WindowPhase::Collecting => WindowStatus::Collecting {
                remaining_secs: (self.total_ms / 1000).saturating_sub(elapsed_ms / 1000),
            },
            WindowPhase::Reported => WindowStatus::Reported,
        }
    }

    /// 平滑化済みサンプルを1件渡す
    pub fn observe(&mut self, now_ms: u64, metrics: PostureMetrics) -> WindowStatus {
        let elapsed = self.elapsed(now_ms);
        self.phase = self.phase.advance(elapsed, self.stabilize_ms);
        if self.phase == WindowPhase::Collecting {
            self.samples.push(metrics);
        }
        self.status(elapsed)
    }

    /// サンプルなしのタイマー更新
    pub fn tick(&mut self, now_ms: u64) -> WindowStatus {
        let elapsed = self.elapsed(now_ms);
        self.phase = self.phase.advance(elapsed, self.stabilize_ms);
        self.status(elapsed)
    }

    /// ウィンドウを固定し、集めたサンプルを引き渡す
    pub fn finish(&mut self) -> Vec<PostureMetrics> {
        assert_eq!(self.phase, WindowPhase::Collecting, "collection window finished twice");
        assert!(!self.samples.is_empty(), "collection window finished without samples");
        self.phase = WindowPhase::Reported;
        std::mem::take(&mut self.samples)
    }
}
