use oorandom::Rand32;

/// The maximum height any node in this crate's skiplist may have.
pub(crate) const MAX_HEIGHT: usize = 12;

/// Draws a height in `1..=MAX_HEIGHT` with a geometric distribution: start at
/// 1, and flip a fair coin (`P(advance) = 0.5`) to decide whether to
/// increment, stopping at `MAX_HEIGHT` regardless of further flips.
///
/// `seed` should be distinct per call (the caller draws it from a shared
/// atomic counter) since each call seeds its own short-lived PRNG rather than
/// sharing mutable RNG state across concurrent inserters.
pub(crate) fn random_height(seed: u64) -> usize {
    let mut rng = Rand32::new(seed);
    let mut height = 1;
    while height < MAX_HEIGHT && rng.rand_u32() % 2 == 0 {
        height += 1;
    }
    height
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_is_always_in_bounds() {
        for seed in 0..2000 {
            let height = random_height(seed);
            assert!((1..=MAX_HEIGHT).contains(&height));
        }
    }

    #[test]
    fn distribution_skews_toward_low_heights() {
        let max_count = (0..5000).filter(|&s| random_height(s) == MAX_HEIGHT).count();
        let min_count = (0..5000).filter(|&s| random_height(s) == 1).count();
        assert!(min_count > max_count);
    }
}
