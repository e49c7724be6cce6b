//! Deterministic per-turn random number generator
//!
//! The whole simulation draws from a single 32-bit Mulberry32 stream seeded
//! from the scenario seed. Same seed, same infinite sequence; no external
//! entropy is ever consulted. The generator implements [`rand::RngCore`] so
//! call sites can use the ordinary `rand` API against the fixed stream.

use rand::RngCore;

/// Seed accepted at the pipeline boundary: either a scenario seed string or
/// a pre-hashed 32-bit value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seed {
    Str(String),
    Hashed(u32),
}

impl Seed {
    fn to_state(&self) -> u32 {
        match self {
            Seed::Str(s) => hash_seed(s),
            Seed::Hashed(h) => *h,
        }
    }
}

impl From<&str> for Seed {
    fn from(s: &str) -> Self {
        Seed::Str(s.to_string())
    }
}

/// Order-sensitive string-to-u32 seed hash.
///
/// Iterates bytes in order through a multiply-rotate mix, so "ab" and "ba"
/// seed different streams. Total for every string including the empty one.
pub fn hash_seed(seed: &str) -> u32 {
    let mut h: u32 = 0x6A09_E667 ^ seed.len() as u32;
    for byte in seed.bytes() {
        h = (h ^ u32::from(byte)).wrapping_mul(0xCC9E_2D51);
        h = h.rotate_left(13).wrapping_add(0xE654_6B64);
    }
    h ^= h >> 16;
    h = h.wrapping_mul(0x85EB_CA6B);
    h ^ (h >> 13)
}

/// Mulberry32 generator: constant odd increment, two xorshift-multiply
/// scramble rounds per output word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRng {
    state: u32,
}

impl TurnRng {
    pub fn new(seed: &Seed) -> Self {
        Self {
            state: seed.to_state(),
        }
    }

    pub fn from_seed_str(seed: &str) -> Self {
        Self::new(&Seed::Str(seed.to_string()))
    }

    fn next_word(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut z = self.state;
        z = (z ^ (z >> 15)).wrapping_mul(z | 1);
        z ^= z.wrapping_add((z ^ (z >> 7)).wrapping_mul(z | 61));
        z ^ (z >> 14)
    }

    /// Uniform draw in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_word()) / 4_294_967_296.0
    }

    /// Single-draw Bernoulli trial against a fixed probability.
    ///
    /// Always consumes exactly one draw, even for p <= 0 or p >= 1, so the
    /// stream position stays predictable for audit replay.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Picks one element by a single uniform draw. Returns None on empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            // Stream position unchanged: empty pick is a caller bug, not a draw.
            return None;
        }
        let idx = (self.next_f64() * items.len() as f64) as usize;
        items.get(idx.min(items.len() - 1))
    }
}

impl RngCore for TurnRng {
    fn next_u32(&mut self) -> u32 {
        self.next_word()
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.next_word());
        let lo = u64::from(self.next_word());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.next_word().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = TurnRng::from_seed_str("seed-x");
        let mut b = TurnRng::from_seed_str("seed-x");
        for _ in 0..1000 {
            assert_eq!(a.next_word(), b.next_word());
        }
    }

    #[test]
    fn test_draws_in_unit_interval() {
        let mut rng = TurnRng::from_seed_str("range-check");
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "draw out of range: {v}");
        }
    }

    #[test]
    fn test_seed_hash_is_order_sensitive() {
        assert_ne!(hash_seed("ab"), hash_seed("ba"));
        assert_ne!(hash_seed("drina"), hash_seed("drinb"));
    }

    #[test]
    fn test_hashed_seed_matches_string_seed() {
        let h = hash_seed("1992");
        let mut from_str = TurnRng::from_seed_str("1992");
        let mut from_hash = TurnRng::new(&Seed::Hashed(h));
        assert_eq!(from_str.next_word(), from_hash.next_word());
    }

    #[test]
    fn test_chance_consumes_one_draw() {
        let mut a = TurnRng::from_seed_str("draws");
        let mut b = TurnRng::from_seed_str("draws");
        let _ = a.chance(0.0);
        let _ = b.next_f64();
        assert_eq!(a.next_word(), b.next_word());
    }

    #[test]
    fn test_pick_stays_in_bounds() {
        let mut rng = TurnRng::from_seed_str("pick");
        let items = ["a", "b", "c"];
        for _ in 0..100 {
            assert!(items.contains(rng.pick(&items).unwrap()));
        }
        let empty: [&str; 0] = [];
        assert!(rng.pick(&empty).is_none());
    }
}
