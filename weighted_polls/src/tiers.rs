use crate::config::Tier;

// Upper bounds (inclusive) of the first three tiers.
const TIER_ONE_MAX: u64 = 20_000;
const TIER_TWO_MAX: u64 = 100_000;
const TIER_THREE_MAX: u64 = 1_000_000;

/// Buckets a population count into its tier.
///
/// A municipality exactly on a boundary belongs to the lower tier.
pub fn classify(population: u64) -> Tier {
    if population <= TIER_ONE_MAX {
        Tier::One
    } else if population <= TIER_TWO_MAX {
        Tier::Two
    } else if population <= TIER_THREE_MAX {
        Tier::Three
    } else {
        Tier::Four
    }
}

/// Like [`classify`], for a population that may be unknown.
///
/// An unknown population is not below any bound and lands in the last tier.
pub fn classify_population(population: Option<u64>) -> Tier {
    match population {
        Some(p) => classify(p),
        None => Tier::Four,
    }
}

/// The default weight of a tier: its number.
///
/// See [`crate::TierWeights`] for other weighting tables.
pub fn weight(tier: Tier) -> u32 {
    tier.number() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierWeights;

    #[test]
    fn boundaries_belong_to_lower_tier() {
        assert_eq!(classify(0), Tier::One);
        assert_eq!(classify(20_000), Tier::One);
        assert_eq!(classify(20_001), Tier::Two);
        assert_eq!(classify(100_000), Tier::Two);
        assert_eq!(classify(100_001), Tier::Three);
        assert_eq!(classify(1_000_000), Tier::Three);
        assert_eq!(classify(1_000_001), Tier::Four);
        assert_eq!(classify(u64::MAX), Tier::Four);
    }

    #[test]
    fn classification_is_monotonic() {
        let samples = [1, 19_999, 20_000, 20_001, 99_999, 100_001, 999_999, 1_000_001, 12_000_000];
        for w in samples.windows(2) {
            assert!(classify(w[0]) <= classify(w[1]), "{:?}", w);
        }
    }

    #[test]
    fn weight_is_tier_number() {
        assert_eq!(weight(Tier::One), 1);
        assert_eq!(weight(Tier::Two), 2);
        assert_eq!(weight(Tier::Three), 3);
        assert_eq!(weight(Tier::Four), 4);
        for t in Tier::ALL {
            assert_eq!(TierWeights::LINEAR.weight(t), weight(t));
        }
    }

    #[test]
    fn unknown_population_is_last_tier() {
        assert_eq!(classify_population(None), Tier::Four);
        assert_eq!(classify_population(Some(15_000)), Tier::One);
        assert_eq!(weight(classify_population(None)), 4);
    }

    #[test]
    fn custom_weight_table() {
        let w = TierWeights([1, 4, 9, 16]);
        assert_eq!(w.weight(classify(500_000)), 9);
    }
}
