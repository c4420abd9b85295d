use csv::StringRecord;

use crate::pollw::*;

/// The positions of the poll fields in the header row.
#[derive(Debug, Clone)]
struct FieldPositions {
    search_id: Option<usize>,
    date: Option<usize>,
    municipality: Option<usize>,
    state: Option<usize>,
    vote: Option<usize>,
}

impl FieldPositions {
    fn new(header: &StringRecord, columns: &PollColumns) -> FieldPositions {
        // With duplicated names, the last column wins.
        let find = |name: &str| {
            header
                .iter()
                .enumerate()
                .filter(|(_, h)| *h == name)
                .map(|(i, _)| i)
                .last()
        };
        FieldPositions {
            search_id: find(&columns.search_id),
            date: find(&columns.date),
            municipality: find(&columns.municipality),
            state: find(&columns.state),
            vote: find(&columns.vote),
        }
    }
}

fn field(record: &StringRecord, pos: Option<usize>) -> Option<String> {
    match pos.and_then(|p| record.get(p)) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => None,
    }
}

/// The single place where a delimited row is mapped to a poll record.
///
/// Returns `None` if one of the values is the not-available label or if a
/// field is missing.
fn poll_from_row(
    record: &StringRecord,
    pos: &FieldPositions,
    not_available: &str,
) -> Option<PollRecord> {
    if record.iter().any(|v| v == not_available) {
        return None;
    }
    Some(PollRecord {
        search_id: field(record, pos.search_id)?,
        date: field(record, pos.date)?,
        municipality: field(record, pos.municipality)?,
        state: field(record, pos.state)?,
        vote: Vote::parse(&field(record, pos.vote)?),
    })
}

/// Reads the poll records of a comma-separated text with a header row.
pub fn read_poll_csv(
    text: &str,
    columns: &PollColumns,
    not_available: &str,
) -> Result<Vec<PollRecord>, ExtractionError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let header = rdr
        .headers()
        .context(DelimitedSnafu {})
        .context(MalformedInputSnafu {})?
        .clone();
    debug!("read_poll_csv: header: {:?}", header);
    let pos = FieldPositions::new(&header, columns);
    debug!("read_poll_csv: positions: {:?}", pos);

    let mut res = Vec::new();
    for (idx, record_r) in rdr.records().enumerate() {
        let record = record_r
            .context(DelimitedSnafu {})
            .context(MalformedInputSnafu {})?;
        match poll_from_row(&record, &pos, not_available) {
            Some(poll) => res.push(poll),
            None => debug!("read_poll_csv: dropping row {}: {:?}", idx + 1, record),
        }
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ID_PESQUISA,DATA_PESQUISA,MUNICÍPIO,ESTADO,INTENÇÃO DE VOTO\n";

    fn read(body: &str) -> Result<Vec<PollRecord>, ExtractionError> {
        let text = format!("{}{}", HEADER, body);
        read_poll_csv(&text, &PollColumns::default(), "#N/D")
    }

    #[test]
    fn reads_rows_in_order() {
        let polls = read("P1,2024-03-01,City1,SP,A\nP2,2024-03-01,City2,SP,B\n").unwrap();
        assert_eq!(
            polls,
            vec![
                PollRecord {
                    search_id: "P1".to_string(),
                    date: "2024-03-01".to_string(),
                    municipality: "City1".to_string(),
                    state: "SP".to_string(),
                    vote: Vote::A,
                },
                PollRecord {
                    search_id: "P2".to_string(),
                    date: "2024-03-01".to_string(),
                    municipality: "City2".to_string(),
                    state: "SP".to_string(),
                    vote: Vote::B,
                },
            ]
        );
    }

    #[test]
    fn sentinel_in_any_field_drops_the_row() {
        let polls = read(
            "#N/D,2024-03-01,City1,SP,A\n\
             P2,#N/D,City1,SP,A\n\
             P3,2024-03-01,#N/D,SP,A\n\
             P4,2024-03-01,City1,SP,#N/D\n\
             P5,2024-03-01,City1,SP,B\n",
        )
        .unwrap();
        let ids: Vec<&str> = polls.iter().map(|p| p.search_id.as_str()).collect();
        assert_eq!(ids, vec!["P5"]);
    }

    #[test]
    fn sentinel_must_match_exactly() {
        let polls = read("P1,2024-03-01,City1,SP,#N/D?\n").unwrap();
        assert_eq!(polls[0].vote, Vote::Other("#N/D?".to_string()));
    }

    #[test]
    fn empty_fields_and_lines() {
        let polls = read("P1,,City1,SP,A\n\nP2,2024-03-01,City1,SP,A\n").unwrap();
        assert_eq!(polls.len(), 1);
        assert_eq!(polls[0].search_id, "P2");
    }

    #[test]
    fn missing_column_drops_everything() {
        let text = "ID_PESQUISA,DATA_PESQUISA,MUNICIPIO,ESTADO,INTENÇÃO DE VOTO\nP1,2024-03-01,City1,SP,A\n";
        let polls = read_poll_csv(text, &PollColumns::default(), "#N/D").unwrap();
        assert!(polls.is_empty());
    }

    #[test]
    fn custom_columns() {
        let columns = PollColumns {
            search_id: "id".to_string(),
            date: "dia".to_string(),
            municipality: "cidade".to_string(),
            state: "uf".to_string(),
            vote: "voto".to_string(),
        };
        let text = "voto,uf,cidade,dia,id,extra\nB,MG,Uberaba,2024-05-01,7,x\n";
        let polls = read_poll_csv(text, &columns, "N/A").unwrap();
        assert_eq!(polls[0].municipality, "Uberaba");
        assert_eq!(polls[0].vote, Vote::B);
    }

    #[test]
    fn duplicated_header_takes_last_column() {
        let text = "ID_PESQUISA,DATA_PESQUISA,MUNICÍPIO,ESTADO,INTENÇÃO DE VOTO,ESTADO\n\
                    P1,2024-03-01,City1,XX,A,SP\n";
        let polls = read_poll_csv(text, &PollColumns::default(), "#N/D").unwrap();
        assert_eq!(polls[0].state, "SP");
    }

    #[test]
    fn inconsistent_rows_are_malformed() {
        let res = read("P1,2024-03-01,City1,SP,A,extra\n");
        assert!(matches!(
            res,
            Err(ExtractionError::MalformedInput {
                source: DecodeError::Delimited { .. }
            })
        ));
    }
}
