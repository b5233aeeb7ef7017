use serde::{Deserialize, Serialize};

use crate::features::Position;

/// 回数カウンタの内部状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepState {
    #[default]
    Ready,
    Up,
    Down,
}

impl RepState {
    /// 唯一の遷移関数。戻り値の bool は1回完了したか
    ///
    /// ready → up（最初の up 観測時のみ）、up → down、down → up（ここでカウント）。
    /// それ以外の組み合わせは状態を変えない。
    pub fn next(self, observed: Position) -> (RepState, bool) {
        match (self, observed) {
            (RepState::Ready, Position::Up) => (RepState::Up, false),
            (RepState::Up, Position::Down) => (RepState::Down, false),
            (RepState::Down, Position::Up) => (RepState::Up, true),
            (state, _) => (state, false),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// 運動1種類分の回数カウンタ
#[derive(Debug, Clone, Default)]
pub struct RepCounter {
    state: RepState,
    count: u32,
}

impl RepCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 観測した位置を反映し、1回完了したら true
    pub fn observe(&mut self, position: Position) -> bool {
        let (next, completed) = self.state.next(position);
        self.state = next;
        if completed {
            self.count += 1;
        }
        completed
    }

    pub fn state(&self) -> RepState {
        self.state
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        self.state = RepState::Ready;
        self.count = 0;
    }
}
