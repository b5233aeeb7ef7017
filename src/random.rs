//! スコアの揺らぎとアドバイス選択に使う差し替え可能な乱数源

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource: Send {
    /// [0, 1) の一様乱数
    fn next_unit(&mut self) -> f64;

    /// `0..len` の一様なインデックス。`len` は1以上
    fn next_index(&mut self, len: usize) -> usize {
        assert!(len > 0, "next_index on empty range");
        ((self.next_unit() * len as f64) as usize).min(len - 1)
    }
}

/// 任意の `rand` 生成器をラップする
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng + Send> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn next_index(&mut self, len: usize) -> usize {
        assert!(len > 0, "next_index on empty range");
        self.rng.gen_range(0..len)
    }
}

pub type StdRandom = RngSource<StdRng>;

impl StdRandom {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

/// 常に同じ値を返す。0.5 ならスコアの揺らぎは0
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = StdRandom::seeded(7);
        let mut b = StdRandom::seeded(7);
        for _ in 0..10 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
    }

    #[test]
    fn test_next_index_in_range() {
        let mut rng = StdRandom::seeded(1);
        for _ in 0..100 {
            assert!(rng.next_index(3) < 3);
        }
        let mut fixed = FixedRandom(0.999_999);
        assert_eq!(fixed.next_index(4), 3);
    }
}
