// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::SegError;

const GOLDEN_GAMMA: u64 = 0x9e3779b97f4a7c15;

/// Source of randomness for every tie the post-processing resolves.
///
/// All randomized decisions (majority-vote ties, merge-direction ties and
/// edge-merge ties) draw from an explicit `TieBreaker` so callers can pin the
/// outcome. There is no process-global random state anywhere in the workspace.
pub trait TieBreaker {
    /// Returns the next raw 64-bit draw.
    fn next_u64(&mut self) -> u64;

    /// Returns an index in `0..upper_exclusive`.
    fn pick(&mut self, upper_exclusive: usize) -> Result<usize, SegError> {
        if upper_exclusive == 0 {
            return Err(SegError::invalid_input(
                "TieBreaker.pick requires upper_exclusive >= 1; got 0",
            ));
        }

        let value = self.next_u64();
        let modulus = u64::try_from(upper_exclusive)
            .map_err(|_| SegError::resource_limit("tie-break upper_exclusive conversion overflow"))?;
        usize::try_from(value % modulus)
            .map_err(|_| SegError::resource_limit("tie-break sampled index conversion overflow"))
    }

    /// Returns a single random bit (`0` or `1`).
    fn bit(&mut self) -> u8 {
        (self.next_u64() & 1) as u8
    }
}

impl<T: TieBreaker + ?Sized> TieBreaker for &mut T {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// Seedable SplitMix64 generator with a platform-independent stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StableRng {
    state: u64,
}

impl StableRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(GOLDEN_GAMMA),
        }
    }

    /// Derives an independent stream for item `index` of a batch.
    ///
    /// The derived seed depends only on `(seed, index)`, so batch results do
    /// not depend on evaluation order.
    pub fn for_stream(seed: u64, index: usize) -> Self {
        let mut mixer = Self::new(seed ^ (index as u64).wrapping_mul(0xa0761d6478bd642f));
        Self::new(mixer.next_u64())
    }
}

impl Default for StableRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TieBreaker for StableRng {
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }
}

/// Replays a fixed list of raw draws, cycling when exhausted.
///
/// `pick(n)` yields `draw % n` and `bit()` yields `draw & 1`, so a script of
/// `[0]` always chooses the first candidate and the left/first option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptedTieBreaker {
    draws: Vec<u64>,
    cursor: usize,
    taken: usize,
}

impl ScriptedTieBreaker {
    pub fn new(draws: Vec<u64>) -> Result<Self, SegError> {
        if draws.is_empty() {
            return Err(SegError::invalid_input(
                "ScriptedTieBreaker requires at least one draw",
            ));
        }
        Ok(Self {
            draws,
            cursor: 0,
            taken: 0,
        })
    }

    pub fn constant(draw: u64) -> Self {
        Self {
            draws: vec![draw],
            cursor: 0,
            taken: 0,
        }
    }

    /// Number of draws consumed so far.
    pub fn draws_taken(&self) -> usize {
        self.taken
    }
}

impl TieBreaker for ScriptedTieBreaker {
    fn next_u64(&mut self) -> u64 {
        let value = self.draws[self.cursor];
        self.cursor = (self.cursor + 1) % self.draws.len();
        self.taken = self.taken.saturating_add(1);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::{ScriptedTieBreaker, StableRng, TieBreaker};

    #[test]
    fn stable_rng_is_deterministic_per_seed() {
        let mut a = StableRng::new(42);
        let mut b = StableRng::new(42);
        let mut c = StableRng::new(43);
        let first: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
        let second: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
        let other: Vec<u64> = (0..8).map(|_| c.next_u64()).collect();
        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn pick_stays_in_range_and_rejects_zero() {
        let mut rng = StableRng::new(7);
        for upper in 1..20 {
            let idx = rng.pick(upper).expect("pick should succeed");
            assert!(idx < upper);
        }
        let err = rng.pick(0).expect_err("zero range should fail");
        assert!(err.to_string().contains("upper_exclusive >= 1"));
    }

    #[test]
    fn bits_cover_both_values() {
        let mut rng = StableRng::new(11);
        let bits: Vec<u8> = (0..64).map(|_| rng.bit()).collect();
        assert!(bits.contains(&0));
        assert!(bits.contains(&1));
        assert!(bits.iter().all(|&bit| bit <= 1));
    }

    #[test]
    fn stream_derivation_is_index_sensitive() {
        let mut a = StableRng::for_stream(5, 0);
        let mut b = StableRng::for_stream(5, 1);
        let mut a_again = StableRng::for_stream(5, 0);
        let first = a.next_u64();
        assert_ne!(first, b.next_u64());
        assert_eq!(first, a_again.next_u64());
    }

    #[test]
    fn scripted_tie_breaker_cycles_and_counts() {
        let mut script = ScriptedTieBreaker::new(vec![1, 2, 5]).expect("script should be valid");
        assert_eq!(script.bit(), 1);
        assert_eq!(script.pick(2).expect("pick should succeed"), 0);
        assert_eq!(script.pick(3).expect("pick should succeed"), 2);
        assert_eq!(script.next_u64(), 1);
        assert_eq!(script.draws_taken(), 4);

        assert!(ScriptedTieBreaker::new(vec![]).is_err());
    }

    fn pick_pair<R: TieBreaker>(mut rng: R) -> (usize, usize) {
        (
            rng.pick(2).expect("pick should succeed"),
            rng.pick(4).expect("pick should succeed"),
        )
    }

    #[test]
    fn mutable_reference_forwards_draws() {
        let mut script = ScriptedTieBreaker::constant(3);
        assert_eq!(pick_pair(&mut script), (1, 3));
        assert_eq!(script.draws_taken(), 2);
    }
}
