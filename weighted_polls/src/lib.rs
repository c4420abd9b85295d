mod config;
mod dates;
mod tiers;

pub mod builder;
pub mod manual;

use chrono::NaiveDate;
use log::{debug, info, warn};

use std::collections::HashMap;

pub use crate::config::*;
pub use crate::dates::parse_calendar_date;
pub use crate::tiers::{classify, classify_population, weight};

// **** Private structures ****

// Municipalities by state, then by name. The first occurrence wins.
struct MunicipalityIndex<'a> {
    by_state: HashMap<&'a str, HashMap<&'a str, &'a MunicipalityRecord>>,
}

impl<'a> MunicipalityIndex<'a> {
    fn new(records: &'a [MunicipalityRecord]) -> MunicipalityIndex<'a> {
        let mut by_state: HashMap<&'a str, HashMap<&'a str, &'a MunicipalityRecord>> =
            HashMap::new();
        for m in records.iter() {
            by_state
                .entry(m.state.as_str())
                .or_default()
                .entry(m.name.as_str())
                .or_insert(m);
        }
        MunicipalityIndex { by_state }
    }

    fn get(&self, state: &str, name: &str) -> Option<&'a MunicipalityRecord> {
        self.by_state.get(state)?.get(name).copied()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
enum GroupKey {
    Raw(String),
    Day(NaiveDate),
}

// The records of one date, in the order they appear in the batch.
struct DateGroup<'a> {
    // The first date string seen for this group. This is what is displayed.
    date: String,
    day: Option<NaiveDate>,
    records: Vec<&'a PollRecord>,
}

// Running weights of one group. The total only counts the resolved records.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
struct WeightTally {
    a: u64,
    b: u64,
    total: u64,
    resolved: usize,
    unknown_municipality: usize,
    unknown_population: usize,
    other_vote: usize,
}

fn group_by_date<'a>(polls: &'a [PollRecord], rules: &AggregationRules) -> Vec<DateGroup<'a>> {
    let mut groups: Vec<DateGroup<'a>> = Vec::new();
    let mut positions: HashMap<GroupKey, usize> = HashMap::new();
    for p in polls.iter() {
        let day = parse_calendar_date(&p.date, rules.date_order);
        let key = match (rules.date_grouping, day) {
            (DateGrouping::Canonical, Some(d)) => GroupKey::Day(d),
            _ => GroupKey::Raw(p.date.clone()),
        };
        let idx = *positions.entry(key).or_insert_with(|| {
            groups.push(DateGroup {
                date: p.date.clone(),
                day,
                records: Vec::new(),
            });
            groups.len() - 1
        });
        groups[idx].records.push(p);
    }
    groups
}

fn tally_group(group: &DateGroup, index: &MunicipalityIndex, weights: &TierWeights) -> WeightTally {
    let mut tally = WeightTally::default();
    for r in group.records.iter() {
        let municipality = match index.get(&r.state, &r.municipality) {
            Some(m) => m,
            None => {
                debug!(
                    "tally_group: {}: unresolved municipality {:?}/{:?} (search {:?})",
                    group.date, r.state, r.municipality, r.search_id
                );
                tally.unknown_municipality += 1;
                continue;
            }
        };
        if municipality.population.is_none() {
            tally.unknown_population += 1;
        }
        let w = weights.weight(classify_population(municipality.population)) as u64;
        match r.vote {
            Vote::A => tally.a += w,
            Vote::B => tally.b += w,
            Vote::Other(ref s) => {
                debug!(
                    "tally_group: {}: skipping vote {:?} (search {:?})",
                    group.date, s, r.search_id
                );
                tally.other_vote += 1;
                continue;
            }
        }
        tally.total += w;
        tally.resolved += 1;
    }
    tally
}

/// Computes the weighted shares of one batch of poll records, one entry per
/// date present in the batch.
///
/// Arguments:
/// * `polls` the records of one upload
/// * `municipalities` the current snapshot. It may be empty, in which case no
///   record resolves.
/// * `rules` grouping, ordering and weighting rules
///
/// A record contributes to its date only if its `(municipality, state)` is in
/// the snapshot and its vote is `A` or `B`. Other records are left out of
/// both shares and of the total weight. A municipality whose population is
/// unknown counts in the last tier.
///
/// The entries are sorted by calendar date. The sort is stable and dates that
/// cannot be parsed come last, in the order they appeared.
pub fn aggregate_batch(
    polls: &[PollRecord],
    municipalities: &[MunicipalityRecord],
    rules: &AggregationRules,
) -> Vec<DailyAggregate> {
    info!(
        "aggregate_batch: processing {:?} poll records against {:?} municipalities",
        polls.len(),
        municipalities.len()
    );
    let index = MunicipalityIndex::new(municipalities);
    let groups = group_by_date(polls, rules);
    debug!("aggregate_batch: {:?} date groups", groups.len());

    let mut res: Vec<(Option<NaiveDate>, DailyAggregate)> = Vec::new();
    for g in groups.iter() {
        let tally = tally_group(g, &index, &rules.weights);
        debug!("aggregate_batch: {}: {:?}", g.date, tally);
        if tally.unknown_population > 0 {
            warn!(
                "aggregate_batch: {}: {} record(s) matched a municipality without population, counted in tier 4",
                g.date, tally.unknown_population
            );
        }
        if tally.total == 0 && rules.empty_groups == EmptyGroupPolicy::Omit {
            info!("aggregate_batch: {}: no resolved record, omitting", g.date);
            continue;
        }
        res.push((
            g.day,
            DailyAggregate {
                date: g.date.clone(),
                percent_a: WeightedShare::from_weights(tally.a, tally.total),
                percent_b: WeightedShare::from_weights(tally.b, tally.total),
            },
        ));
    }

    res.sort_by_key(|(day, _)| (day.is_none(), *day));
    res.into_iter().map(|(_, agg)| agg).collect()
}

/// Appends a batch at the end of the series.
///
/// The combined series is neither sorted nor de-duplicated: a date that was
/// already in `prior` appears twice, and a batch with older dates still comes
/// after the previous ones.
pub fn append_batch(prior: AggregatedSeries, batch: Vec<DailyAggregate>) -> AggregatedSeries {
    let mut res = prior;
    res.extend(batch);
    res
}

/// The series after processing one more upload.
pub fn reduce(
    prior: AggregatedSeries,
    polls: &[PollRecord],
    municipalities: &[MunicipalityRecord],
    rules: &AggregationRules,
) -> AggregatedSeries {
    append_batch(prior, aggregate_batch(polls, municipalities, rules))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn muni(state: &str, name: &str, population: Option<u64>) -> MunicipalityRecord {
        MunicipalityRecord {
            state: state.to_string(),
            name: name.to_string(),
            population,
        }
    }

    fn poll(date: &str, municipality: &str, state: &str, vote: &str) -> PollRecord {
        PollRecord {
            search_id: format!("{}-{}", date, municipality),
            date: date.to_string(),
            municipality: municipality.to_string(),
            state: state.to_string(),
            vote: Vote::parse(vote),
        }
    }

    fn shares(agg: &DailyAggregate) -> (String, String, String) {
        (
            agg.date.clone(),
            agg.percent_a.to_string(),
            agg.percent_b.to_string(),
        )
    }

    fn sp_snapshot() -> Vec<MunicipalityRecord> {
        vec![
            muni("SP", "City1", Some(15_000)),
            muni("SP", "City2", Some(500_000)),
        ]
    }

    #[test]
    fn weighted_scenario() {
        init();
        let polls = vec![
            poll("2024-03-01", "City1", "SP", "A"),
            poll("2024-03-01", "City2", "SP", "B"),
        ];
        let res = aggregate_batch(&polls, &sp_snapshot(), &AggregationRules::DEFAULT_RULES);
        assert_eq!(
            res.iter().map(shares).collect::<Vec<_>>(),
            vec![("2024-03-01".to_string(), "25.00".to_string(), "75.00".to_string())]
        );
    }

    #[test]
    fn all_a_gives_exact_hundred() {
        init();
        let polls = vec![
            poll("2024-03-01", "City1", "SP", "A"),
            poll("2024-03-01", "City2", "SP", "A"),
        ];
        let res = aggregate_batch(&polls, &sp_snapshot(), &AggregationRules::DEFAULT_RULES);
        assert_eq!(res[0].percent_a.to_string(), "100.00");
        assert_eq!(res[0].percent_b.to_string(), "0.00");
    }

    #[test]
    fn unresolved_group_is_nan() {
        init();
        let polls = vec![
            poll("2024-03-01", "Nowhere", "SP", "A"),
            poll("2024-03-01", "City1", "RJ", "B"),
        ];
        let res = aggregate_batch(&polls, &sp_snapshot(), &AggregationRules::DEFAULT_RULES);
        assert_eq!(res.len(), 1);
        assert!(res[0].percent_a.is_nan());
        assert!(res[0].percent_b.is_nan());
        assert!(res[0].percent_a.as_f64().is_nan());
        assert_eq!(res[0].percent_a.to_string(), "NaN");
    }

    #[test]
    fn empty_snapshot_gives_nan() {
        init();
        let polls = vec![poll("2024-03-01", "City1", "SP", "A")];
        let res = aggregate_batch(&polls, &[], &AggregationRules::DEFAULT_RULES);
        assert!(res[0].percent_a.is_nan());
    }

    #[test]
    fn unresolved_records_do_not_dilute() {
        init();
        let polls = vec![
            poll("2024-03-01", "City1", "SP", "A"),
            poll("2024-03-01", "Nowhere", "SP", "B"),
            poll("2024-03-01", "City2", "SP", "Nulo"),
        ];
        let res = aggregate_batch(&polls, &sp_snapshot(), &AggregationRules::DEFAULT_RULES);
        assert_eq!(shares(&res[0]).1, "100.00");
        assert_eq!(shares(&res[0]).2, "0.00");
    }

    #[test]
    fn unknown_population_counts_as_last_tier() {
        init();
        let munis = vec![muni("RJ", "City3", None), muni("SP", "City2", Some(500_000))];
        let polls = vec![
            poll("2024-03-01", "City3", "RJ", "A"),
            poll("2024-03-01", "City2", "SP", "B"),
        ];
        let res = aggregate_batch(&polls, &munis, &AggregationRules::DEFAULT_RULES);
        // 4 against 3
        assert_eq!(shares(&res[0]).1, "57.14");
        assert_eq!(shares(&res[0]).2, "42.86");
    }

    #[test]
    fn duplicate_municipality_first_wins() {
        init();
        let munis = vec![
            muni("SP", "City1", Some(15_000)),
            muni("SP", "City1", Some(5_000_000)),
            muni("SP", "City2", Some(500_000)),
        ];
        let polls = vec![
            poll("2024-03-01", "City1", "SP", "A"),
            poll("2024-03-01", "City2", "SP", "B"),
        ];
        let res = aggregate_batch(&polls, &munis, &AggregationRules::DEFAULT_RULES);
        assert_eq!(shares(&res[0]).1, "25.00");
    }

    #[test]
    fn batch_sorted_by_calendar_date() {
        init();
        let polls = vec![
            poll("15/03/2024", "City1", "SP", "A"),
            poll("02/03/2024", "City1", "SP", "B"),
            poll("sem data", "City1", "SP", "A"),
            poll("01/03/2024", "City2", "SP", "A"),
        ];
        let res = aggregate_batch(&polls, &sp_snapshot(), &AggregationRules::DEFAULT_RULES);
        let dates: Vec<String> = res.iter().map(|a| a.date.clone()).collect();
        assert_eq!(dates, vec!["01/03/2024", "02/03/2024", "15/03/2024", "sem data"]);
    }

    #[test]
    fn canonical_grouping_merges_spellings() {
        init();
        let polls = vec![
            poll("01/02/2024", "City1", "SP", "A"),
            poll("1/2/2024", "City2", "SP", "B"),
        ];
        let res = aggregate_batch(&polls, &sp_snapshot(), &AggregationRules::DEFAULT_RULES);
        assert_eq!(
            res.iter().map(shares).collect::<Vec<_>>(),
            vec![("01/02/2024".to_string(), "25.00".to_string(), "75.00".to_string())]
        );
    }

    #[test]
    fn raw_grouping_keeps_spellings_apart() {
        init();
        let polls = vec![
            poll("01/02/2024", "City1", "SP", "A"),
            poll("1/2/2024", "City2", "SP", "B"),
        ];
        let res = aggregate_batch(&polls, &sp_snapshot(), &AggregationRules::COMPATIBILITY_RULES);
        assert_eq!(
            res.iter().map(shares).collect::<Vec<_>>(),
            vec![
                ("01/02/2024".to_string(), "100.00".to_string(), "0.00".to_string()),
                ("1/2/2024".to_string(), "0.00".to_string(), "100.00".to_string()),
            ]
        );
    }

    #[test]
    fn omit_policy_drops_empty_dates() {
        init();
        let rules = AggregationRules {
            empty_groups: EmptyGroupPolicy::Omit,
            ..AggregationRules::DEFAULT_RULES
        };
        let polls = vec![
            poll("2024-03-01", "Nowhere", "SP", "A"),
            poll("2024-03-02", "City1", "SP", "A"),
        ];
        let res = aggregate_batch(&polls, &sp_snapshot(), &rules);
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].date, "2024-03-02");
    }

    #[test]
    fn custom_weights() {
        init();
        let rules = AggregationRules {
            weights: TierWeights([1, 1, 1, 1]),
            ..AggregationRules::DEFAULT_RULES
        };
        let polls = vec![
            poll("2024-03-01", "City1", "SP", "A"),
            poll("2024-03-01", "City2", "SP", "B"),
        ];
        let res = aggregate_batch(&polls, &sp_snapshot(), &rules);
        assert_eq!(shares(&res[0]).1, "50.00");
    }

    #[test]
    fn appending_keeps_batch_order() {
        init();
        let rules = AggregationRules::DEFAULT_RULES;
        let s1 = reduce(
            Vec::new(),
            &[poll("2024-01-02", "City1", "SP", "A")],
            &sp_snapshot(),
            &rules,
        );
        let s2 = reduce(
            s1,
            &[poll("2024-01-01", "City1", "SP", "B")],
            &sp_snapshot(),
            &rules,
        );
        let dates: Vec<&str> = s2.iter().map(|a| a.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-01"]);
    }

    #[test]
    fn appending_same_date_twice_keeps_both() {
        init();
        let rules = AggregationRules::DEFAULT_RULES;
        let batch = [poll("2024-01-02", "City1", "SP", "A")];
        let s1 = reduce(Vec::new(), &batch, &sp_snapshot(), &rules);
        let s2 = reduce(s1, &batch, &sp_snapshot(), &rules);
        assert_eq!(s2.len(), 2);
        assert_eq!(s2[0], s2[1]);
    }

    #[test]
    fn share_rounding() {
        assert_eq!(WeightedShare::from_weights(1, 3).to_string(), "33.33");
        assert_eq!(WeightedShare::from_weights(2, 3).to_string(), "66.67");
        assert_eq!(WeightedShare::from_weights(1, 800).to_string(), "0.13");
        assert_eq!(WeightedShare::from_weights(0, 0).to_string(), "NaN");
        assert_eq!(WeightedShare::from_weights(3, 4).hundredths(), Some(7500));
    }

    #[test]
    fn serializes_for_presentation() {
        let agg = DailyAggregate {
            date: "2024-03-01".to_string(),
            percent_a: WeightedShare::from_weights(1, 4),
            percent_b: WeightedShare::NAN,
        };
        let js = serde_json::to_value(&agg).unwrap();
        assert_eq!(
            js,
            serde_json::json!({"date": "2024-03-01", "percentA": "25.00", "percentB": "NaN"})
        );
        let p = poll("2024-03-01", "City1", "SP", "Branco");
        let js = serde_json::to_value(&p).unwrap();
        assert_eq!(js["vote"], "Branco");
        assert_eq!(js["searchId"], "2024-03-01-City1");
    }
}
