use serde::{Deserialize, Serialize};

/// プランク経過時間の通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlankTick {
    pub elapsed_seconds: u64,
    pub active: bool,
}

/// 開始時刻からの経過秒を数えるタイマー
///
/// 停止すると経過時間は破棄され、再開時は0から数え直す。
#[derive(Debug, Clone, Default)]
pub struct PlankTimer {
    started_at_ms: Option<u64>,
    elapsed_seconds: u64,
}

impl PlankTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, now_ms: u64) {
        self.started_at_ms = Some(now_ms);
        self.elapsed_seconds = 0;
    }

    pub fn stop(&mut self) {
        self.started_at_ms = None;
        self.elapsed_seconds = 0;
    }

    pub fn is_active(&self) -> bool {
        self.started_at_ms.is_some()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// 1秒周期で呼ぶ。停止中は `None`
    pub fn tick(&mut self, now_ms: u64) -> Option<PlankTick> {
        let started = self.started_at_ms?;
        self.elapsed_seconds = now_ms.saturating_sub(started) / 1000;
        Some(PlankTick {
            elapsed_seconds: self.elapsed_seconds,
            active: true,
        })
    }
}

/// mm:ss 表記
pub fn format_mm_ss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
