// Seeded random number generator shared by every Meridian crate.
//
// xoshiro256++ with SplitMix64 seed expansion. Action resolution itself is
// free of randomness; the only consumers are decision makers (the reference
// automated player breaks ties with it) and test fixtures that scatter units
// across a map. Both need to reproduce a match exactly from a seed, so the
// generator state is serializable and stored next to whoever owns it.
//
// See also: `meridian_sim::automated` for the main consumer.
//
// **Critical constraint: determinism.** Output depends only on the seed and
// the number of prior draws. No floating point in the core generator, no
// platform-dependent widths, no stdlib randomness.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ state. Cloning forks the stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRng {
    s: [u64; 4],
}

impl MatchRng {
    /// Expand a single `u64` seed into the 256-bit state.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        let mut s = [0u64; 4];
        for word in &mut s {
            *word = splitmix64(&mut sm);
        }
        Self { s }
    }

    /// Derive an independent stream for a sub-consumer (e.g. one player).
    ///
    /// Consumes one draw from `self`, so the parent stream advances too.
    pub fn fork(&mut self, salt: u64) -> Self {
        Self::new(self.next_u64() ^ salt.rotate_left(32))
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = self.s[0]
            .wrapping_add(self.s[3])
            .rotate_left(23)
            .wrapping_add(self.s[0]);
        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform integer in `[low, high)`, unbiased by rejection sampling.
    ///
    /// Returns `low` when the range is empty instead of panicking, so callers
    /// picking from a possibly-empty candidate list stay panic free.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        let span = high - low;
        if span.is_power_of_two() {
            return low + (self.next_u64() & (span - 1));
        }
        let threshold = span.wrapping_neg() % span;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + r % span;
            }
        }
    }

    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Integer percentage roll: true with probability `percent / 100`.
    pub fn chance(&mut self, percent: u8) -> bool {
        self.range_u64(0, 100) < u64::from(percent)
    }

    /// Pick one element uniformly, or `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.range_usize(0, items.len()))
        }
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range_usize(0, i + 1);
            items.swap(i, j);
        }
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = MatchRng::new(7);
        let mut b = MatchRng::new(7);
        for _ in 0..500 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn u32_draws_are_the_high_half() {
        let mut a = MatchRng::new(21);
        let mut b = MatchRng::new(21);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), (b.next_u64() >> 32) as u32);
        }
    }

    #[test]
    fn seeds_diverge() {
        let mut a = MatchRng::new(7);
        let mut b = MatchRng::new(8);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn range_stays_in_bounds() {
        let mut rng = MatchRng::new(99);
        for _ in 0..5_000 {
            let v = rng.range_u64(3, 17);
            assert!((3..17).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn empty_range_returns_low() {
        let mut rng = MatchRng::new(1);
        assert_eq!(rng.range_u64(5, 5), 5);
        assert_eq!(rng.range_usize(4, 2), 4);
    }

    #[test]
    fn chance_extremes() {
        let mut rng = MatchRng::new(3);
        for _ in 0..200 {
            assert!(!rng.chance(0));
            assert!(rng.chance(100));
        }
    }

    #[test]
    fn pick_from_empty_is_none() {
        let mut rng = MatchRng::new(3);
        let empty: [u8; 0] = [];
        assert!(rng.pick(&empty).is_none());
        assert_eq!(rng.pick(&[9]), Some(&9));
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = MatchRng::new(11);
        let mut items: Vec<u32> = (0..32).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn fork_is_deterministic() {
        let mut a = MatchRng::new(42);
        let mut b = MatchRng::new(42);
        let mut fa = a.fork(2);
        let mut fb = b.fork(2);
        assert_eq!(fa.next_u64(), fb.next_u64());
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn state_survives_json() {
        let mut rng = MatchRng::new(5);
        for _ in 0..10 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: MatchRng = serde_json::from_str(&json).unwrap();
        assert_eq!(rng.next_u64(), restored.next_u64());
    }
}
