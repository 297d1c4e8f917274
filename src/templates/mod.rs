//! Template text generation: advisor briefs and outbound messages.
//!
//! Both generators compose text from fixed pools of interchangeable
//! sentences. Selection goes through [`Picker`], so callers decide whether
//! output is reproducible (seeded) or varies per call (OS-seeded).

pub mod outreach;
pub mod summary;

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, IteratorRandom};
use rand::SeedableRng;

pub use outreach::{compose_outbound, OutboundMessage, OutreachInput};
pub use summary::{build_summary, Summary, SummaryInput};

/// Uniform random choice among equivalent candidates.
pub struct Picker {
    rng: StdRng,
}

impl Picker {
    /// Seeded from OS entropy; every instance picks differently.
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random::<u64>())
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick one element. `None` only for an empty pool.
    pub fn pick<'a, T>(&mut self, pool: &'a [T]) -> Option<&'a T> {
        pool.choose(&mut self.rng)
    }

    /// Pick an owned string from a pool, or an empty string for an empty pool.
    pub fn pick_string(&mut self, pool: &[String]) -> String {
        self.pick(pool).cloned().unwrap_or_default()
    }

    /// Uniform integer in `min..=max`.
    pub fn between(&mut self, min: usize, max: usize) -> usize {
        (min..=max).choose(&mut self.rng).unwrap_or(min)
    }

    pub fn coin(&mut self) -> bool {
        self.between(0, 1) == 1
    }

    /// Up to `n` distinct elements, in pick order.
    pub fn pick_distinct<T: Clone>(&mut self, pool: &[T], n: usize) -> Vec<T> {
        let mut remaining: Vec<T> = pool.to_vec();
        let mut picked = Vec::with_capacity(n.min(pool.len()));
        while picked.len() < n && !remaining.is_empty() {
            let i = self.between(0, remaining.len() - 1);
            picked.push(remaining.swap_remove(i));
        }
        picked
    }
}

impl Default for Picker {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// First whitespace-delimited token of a full name, or `fallback`.
pub fn first_name<'a>(name: Option<&'a str>, fallback: &'a str) -> &'a str {
    name.and_then(|n| n.split_whitespace().next())
        .unwrap_or(fallback)
}

/// Append a period unless the clause already ends with one.
pub fn ensure_period(clause: &str) -> String {
    if clause.ends_with('.') {
        clause.to_string()
    } else {
        format!("{}.", clause)
    }
}

/// True when text ends in sentence-final punctuation.
pub fn ends_sentence(text: &str) -> bool {
    text.trim_end().ends_with(['.', '?', '!'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_name() {
        assert_eq!(first_name(Some("Amara Okafor"), "there"), "Amara");
        assert_eq!(first_name(Some("  Li  Wei"), "there"), "Li");
        assert_eq!(first_name(Some("   "), "there"), "there");
        assert_eq!(first_name(None, "The student"), "The student");
    }

    #[test]
    fn test_ensure_period() {
        assert_eq!(ensure_period("Hello"), "Hello.");
        assert_eq!(ensure_period("Hello."), "Hello.");
    }

    #[test]
    fn test_seeded_picker_is_reproducible() {
        let pool: Vec<u32> = (0..50).collect();
        let mut a = Picker::seeded(7);
        let mut b = Picker::seeded(7);
        let xs: Vec<u32> = (0..20).filter_map(|_| a.pick(&pool).copied()).collect();
        let ys: Vec<u32> = (0..20).filter_map(|_| b.pick(&pool).copied()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_picker_bounds() {
        let mut p = Picker::seeded(1);
        let empty: [u8; 0] = [];
        assert!(p.pick(&empty).is_none());
        for _ in 0..100 {
            let n = p.between(2, 4);
            assert!((2..=4).contains(&n));
        }
    }

    #[test]
    fn test_pick_distinct() {
        let pool = ["SAT", "TOEFL", "Essay"];
        let mut p = Picker::seeded(8);
        let picked = p.pick_distinct(&pool, 5);
        assert_eq!(picked.len(), 3);
        let unique: std::collections::HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 3);
        assert!(p.pick_distinct(&pool, 0).is_empty());
    }

    #[test]
    fn test_picker_covers_pool() {
        let pool = ["a", "b", "c"];
        let mut p = Picker::seeded(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            if let Some(x) = p.pick(&pool) {
                seen.insert(*x);
            }
        }
        assert_eq!(seen.len(), 3);
    }
}
