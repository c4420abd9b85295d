// ********* Input data structures ***********

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::Display;

/// One municipality of the population estimates.
///
/// The pair `(state, name)` identifies a municipality, but the estimates may
/// contain duplicates. Lookups keep the first occurrence.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize, Deserialize)]
pub struct MunicipalityRecord {
    pub state: String,
    pub name: String,
    /// The estimated population, or `None` if the source cell was not numeric.
    /// Such records are weighted as the largest municipalities.
    pub population: Option<u64>,
}

/// All the municipalities captured by one extraction run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MunicipalitySnapshot {
    pub generated_at: DateTime<Utc>,
    pub records: Vec<MunicipalityRecord>,
}

impl MunicipalitySnapshot {
    pub fn new(records: Vec<MunicipalityRecord>) -> MunicipalitySnapshot {
        MunicipalitySnapshot {
            generated_at: Utc::now(),
            records,
        }
    }
}

/// The voting intention recorded in a poll row.
///
/// Only two options are supported. Anything else is kept verbatim and treated
/// as unresolved by the aggregation.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Vote {
    A,
    B,
    Other(String),
}

impl Vote {
    pub fn parse(s: &str) -> Vote {
        match s {
            "A" => Vote::A,
            "B" => Vote::B,
            x => Vote::Other(x.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Vote::A => "A",
            Vote::B => "B",
            Vote::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for Vote {
    fn from(s: String) -> Vote {
        Vote::parse(&s)
    }
}

impl From<Vote> for String {
    fn from(v: Vote) -> String {
        v.as_str().to_string()
    }
}

/// One row of an uploaded poll file, after validation.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollRecord {
    #[serde(rename = "searchId")]
    pub search_id: String,
    /// The date as written in the upload. It is not normalized.
    pub date: String,
    pub municipality: String,
    pub state: String,
    pub vote: Vote,
}

// ******** Tiers *********

/// Population bucket of a municipality. Larger municipalities have a larger tier.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Tier {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::One, Tier::Two, Tier::Three, Tier::Four];

    /// The ordinal of the tier, between 1 and 4.
    pub fn number(self) -> u8 {
        self as u8
    }
}

/// Weight given to each tier, indexed by tier number - 1.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct TierWeights(pub [u32; 4]);

impl TierWeights {
    /// Weight equal to the tier number.
    pub const LINEAR: TierWeights = TierWeights([1, 2, 3, 4]);

    pub fn weight(&self, tier: Tier) -> u32 {
        self.0[(tier.number() - 1) as usize]
    }
}

// ******** Output data structures *********

/// A weighted percentage, kept in hundredths of a percent.
///
/// `None` stands for a date where no record could be resolved: the
/// percentage is undefined and renders as `NaN`.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct WeightedShare {
    hundredths: Option<u64>,
}

impl WeightedShare {
    pub const NAN: WeightedShare = WeightedShare { hundredths: None };

    /// The share `100 * part / total`, rounded to two decimals.
    ///
    /// The rounding is computed on integers and sends ties away from zero,
    /// so that `1 / 800` gives `0.13`.
    pub fn from_weights(part: u64, total: u64) -> WeightedShare {
        if total == 0 {
            return WeightedShare::NAN;
        }
        let num = 2 * 10_000 * (part as u128) + (total as u128);
        let den = 2 * (total as u128);
        WeightedShare {
            hundredths: Some((num / den) as u64),
        }
    }

    pub fn is_nan(&self) -> bool {
        self.hundredths.is_none()
    }

    pub fn hundredths(&self) -> Option<u64> {
        self.hundredths
    }

    pub fn as_f64(&self) -> f64 {
        match self.hundredths {
            Some(h) => (h as f64) / 100.0,
            None => f64::NAN,
        }
    }
}

impl Display for WeightedShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.hundredths {
            Some(h) => write!(f, "{}.{:02}", h / 100, h % 100),
            None => write!(f, "NaN"),
        }
    }
}

// Serialized as the decimal string, the way it is displayed.
impl Serialize for WeightedShare {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Weighted vote shares for one date of one batch.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct DailyAggregate {
    pub date: String,
    #[serde(rename = "percentA")]
    pub percent_a: WeightedShare,
    #[serde(rename = "percentB")]
    pub percent_b: WeightedShare,
}

/// The running series shown to the user. Batches are appended to it in the
/// order they are processed.
pub type AggregatedSeries = Vec<DailyAggregate>;

// ********* Configuration **********

/// How the poll records of a batch are grouped by date.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DateGrouping {
    /// Each distinct date string is its own group, even if two strings
    /// denote the same day (`01/02/2024` and `1/2/2024`).
    RawString,
    /// Dates are grouped by calendar day. Strings that cannot be parsed fall
    /// back to their raw value.
    Canonical,
}

/// Interpretation of ambiguous numeric dates such as `01/02/2024`.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DateOrder {
    DayFirst,
    MonthFirst,
}

/// What to do with a date for which no record could be resolved.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum EmptyGroupPolicy {
    /// Emit the date with `NaN` shares.
    EmitNaN,
    /// Do not emit the date.
    Omit,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AggregationRules {
    pub date_grouping: DateGrouping,
    pub date_order: DateOrder,
    pub empty_groups: EmptyGroupPolicy,
    pub weights: TierWeights,
}

impl AggregationRules {
    pub const DEFAULT_RULES: AggregationRules = AggregationRules {
        date_grouping: DateGrouping::Canonical,
        date_order: DateOrder::DayFirst,
        empty_groups: EmptyGroupPolicy::EmitNaN,
        weights: TierWeights::LINEAR,
    };

    /// Groups by raw date string, like the first version of the dashboard did.
    pub const COMPATIBILITY_RULES: AggregationRules = AggregationRules {
        date_grouping: DateGrouping::RawString,
        date_order: DateOrder::MonthFirst,
        empty_groups: EmptyGroupPolicy::EmitNaN,
        weights: TierWeights::LINEAR,
    };
}

impl Default for AggregationRules {
    fn default() -> AggregationRules {
        AggregationRules::DEFAULT_RULES
    }
}
