pub use crate::config::*;

use log::info;

/// The state of one analysis session: the current municipality snapshot and
/// the series accumulated so far.
///
/// Uploads that arrive before any snapshot are held back and aggregated as
/// soon as a snapshot is provided.
///
/// ```
/// use weighted_polls::builder::Session;
/// use weighted_polls::{AggregationRules, MunicipalityRecord, PollRecord, Vote};
///
/// let mut session = Session::new(&AggregationRules::DEFAULT_RULES).snapshot(&[MunicipalityRecord {
///     state: "SP".to_string(),
///     name: "Campinas".to_string(),
///     population: Some(1_139_047),
/// }]);
///
/// session.add_batch(&[PollRecord {
///     search_id: "1".to_string(),
///     date: "2024-03-01".to_string(),
///     municipality: "Campinas".to_string(),
///     state: "SP".to_string(),
///     vote: Vote::A,
/// }]);
///
/// assert_eq!(session.series()[0].percent_a.to_string(), "100.00");
/// ```
pub struct Session {
    pub(crate) _rules: AggregationRules,
    pub(crate) _municipalities: Option<Vec<MunicipalityRecord>>,
    pub(crate) _pending: Vec<PollRecord>,
    pub(crate) _series: AggregatedSeries,
}

impl Session {
    pub fn new(rules: &AggregationRules) -> Session {
        Session {
            _rules: rules.clone(),
            _municipalities: None,
            _pending: Vec::new(),
            _series: Vec::new(),
        }
    }

    /// Starts the session with the given municipalities.
    pub fn snapshot(mut self, municipalities: &[MunicipalityRecord]) -> Session {
        self.replace_snapshot(municipalities);
        self
    }

    /// Replaces the municipalities wholesale. The series computed so far is kept as is.
    ///
    /// Returns the entries computed for a held-back upload, if there was one.
    /// That upload is consumed: later snapshots do not aggregate it again.
    pub fn replace_snapshot(&mut self, municipalities: &[MunicipalityRecord]) -> &[DailyAggregate] {
        self._municipalities = Some(municipalities.to_vec());
        if self._pending.is_empty() {
            return &[];
        }
        let pending = std::mem::take(&mut self._pending);
        info!(
            "replace_snapshot: processing {} held-back poll record(s)",
            pending.len()
        );
        self.add_batch(&pending)
    }

    /// Aggregates one upload and appends it to the series.
    ///
    /// Returns the newly appended entries. Without a snapshot, nothing is
    /// appended and the upload replaces any held-back one.
    pub fn add_batch(&mut self, polls: &[PollRecord]) -> &[DailyAggregate] {
        let municipalities = match self._municipalities.as_deref() {
            Some(m) => m,
            None => {
                info!(
                    "add_batch: no municipality data yet, holding {} poll record(s)",
                    polls.len()
                );
                self._pending = polls.to_vec();
                return &[];
            }
        };
        let batch = crate::aggregate_batch(polls, municipalities, &self._rules);
        let start = self._series.len();
        let series = std::mem::take(&mut self._series);
        self._series = crate::append_batch(series, batch);
        &self._series[start..]
    }

    pub fn series(&self) -> &[DailyAggregate] {
        &self._series
    }

    pub fn into_series(self) -> AggregatedSeries {
        self._series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city(name: &str, population: u64) -> MunicipalityRecord {
        MunicipalityRecord {
            state: "MG".to_string(),
            name: name.to_string(),
            population: Some(population),
        }
    }

    fn vote(date: &str, name: &str, v: Vote) -> PollRecord {
        PollRecord {
            search_id: "P-1".to_string(),
            date: date.to_string(),
            municipality: name.to_string(),
            state: "MG".to_string(),
            vote: v,
        }
    }

    #[test]
    fn batches_accumulate() {
        let mut session = Session::new(&AggregationRules::DEFAULT_RULES)
            .snapshot(&[city("Uberaba", 340_000), city("Araxá", 111_000)]);
        let added = session.add_batch(&[vote("2024-05-02", "Uberaba", Vote::B)]).len();
        assert_eq!(added, 1);
        session.add_batch(&[
            vote("2024-05-01", "Araxá", Vote::A),
            vote("2024-05-01", "Uberaba", Vote::A),
        ]);
        let dates: Vec<&str> = session.series().iter().map(|a| a.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-05-02", "2024-05-01"]);
        assert_eq!(session.series()[1].percent_a.to_string(), "100.00");
    }

    #[test]
    fn upload_before_snapshot_is_held() {
        let mut session = Session::new(&AggregationRules::DEFAULT_RULES);
        assert!(session.add_batch(&[vote("2024-05-02", "Uberaba", Vote::A)]).is_empty());
        assert!(session.series().is_empty());

        let added = session
            .replace_snapshot(&[city("Uberaba", 340_000)])
            .to_vec();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].percent_a.to_string(), "100.00");

        // Processed once only.
        assert!(session.replace_snapshot(&[city("Uberaba", 340_000)]).is_empty());
        assert_eq!(session.into_series().len(), 1);
    }

    #[test]
    fn new_snapshot_keeps_series() {
        let mut session =
            Session::new(&AggregationRules::DEFAULT_RULES).snapshot(&[city("Uberaba", 340_000)]);
        session.add_batch(&[vote("2024-05-02", "Uberaba", Vote::A)]);
        session.replace_snapshot(&[]);
        session.add_batch(&[vote("2024-05-03", "Uberaba", Vote::A)]);
        assert_eq!(session.series().len(), 2);
        assert!(session.series()[1].percent_a.is_nan());
    }
}
