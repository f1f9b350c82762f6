//! Delimited-text ingestion and the canonical CSV writer.

use crate::error::IngestError;
use circulca_schemas::{
    field::Field,
    row::{Cell, RowSet},
};
use csv::{QuoteStyle, ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::{fs, path::Path};
use tracing::{debug, warn};

const COMMENT_MARKER: u8 = b'#';

/// Parses comma-delimited text into a row set.
///
/// The first record that is neither blank nor a `#` comment is the header, and
/// its column count is enforced on every data record. Comments are only
/// recognized where a record starts, so quoted values may hold blank lines or
/// `#`. Ingestion stops at the first disagreeing record. Row ids are 1-based
/// positions of the data records.
pub fn ingest(text: &str) -> Result<RowSet, IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(COMMENT_MARKER))
        .trim(Trim::All)
        .from_reader(text.as_bytes());
    let mut records = reader.records().filter(|record| match record {
        Ok(record) => !is_blank(record),
        Err(_) => true,
    });

    let header = match records.next() {
        Some(record) => record?,
        None => return Err(IngestError::EmptyInput),
    };
    let expected = header.len();

    let mut columns: Vec<Option<Field>> = Vec::with_capacity(expected);
    for title in header.iter() {
        let field = Field::from_header(title);
        match field {
            Some(f) if columns.contains(&Some(f)) => {
                return Err(IngestError::DuplicateColumn(title.to_string()))
            }
            Some(f) => debug!(column = title, field = %f, "mapped column"),
            None => warn!(column = title, "ignoring column with no matching field"),
        }
        columns.push(field);
    }

    let mut rows = RowSet::new();
    for record in records {
        let record = record?;
        if record.len() != expected {
            let line = record
                .position()
                .map_or(0, |p| record_line(text, p.byte()));
            return Err(IngestError::SchemaMismatch {
                line,
                expected,
                observed: record.len(),
            });
        }

        let mut cells: [Cell; Field::COUNT] = Default::default();
        for (value, field) in record.iter().zip(&columns) {
            if let Some(field) = field {
                cells[field.index()] = Cell::new(value);
            }
        }
        rows.push(cells);
    }

    if rows.is_empty() {
        return Err(IngestError::EmptyInput);
    }
    debug!(rows = rows.len(), columns = expected, "ingested table");
    Ok(rows)
}

/// A whitespace-only line reads as one empty field.
fn is_blank(record: &StringRecord) -> bool {
    record.len() == 1 && record.get(0).map_or(true, str::is_empty)
}

/// 1-based source line of the record the reader started at `byte`.
///
/// The reader stamps a record with the offset where it began reading, which
/// can sit before empty lines and comments it skipped on the way.
fn record_line(text: &str, byte: u64) -> u64 {
    let mut offset = usize::try_from(byte).unwrap_or(usize::MAX).min(text.len());
    while let Some(rest) = text.get(offset..) {
        let len = rest.find('\n').map_or(rest.len(), |i| i + 1);
        let line = rest[..len].trim_end_matches(['\n', '\r']);
        let skipped = len > 0 && (line.is_empty() || line.as_bytes().first() == Some(&COMMENT_MARKER));
        if !skipped {
            break;
        }
        offset += len;
    }
    text.get(..offset).map_or(0, |head| head.matches('\n').count()) as u64 + 1
}

/// Reads and ingests a CSV file.
pub fn ingest_path(path: impl AsRef<Path>) -> Result<RowSet, IngestError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| IngestError::FileIO(path.display().to_string(), e))?;
    ingest(&text)
}

/// Writes a row set as canonical CSV: every schema column under its canonical
/// title, absent cells as empty quoted fields. [`ingest`] reads it back to the
/// same row set, except that it trims whitespace around values.
pub fn to_csv(rows: &RowSet) -> Result<String, IngestError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(Vec::new());

    writer.write_record(Field::ALL.iter().map(|f| f.label()))?;
    for row in rows {
        writer.write_record(row.cells().map(|(_, cell)| cell.as_str().unwrap_or("")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| IngestError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use circulca_schemas::row::RowId;

    const SAMPLE: &str = "\
# inventory for one aluminium can
Weight (kg),Recycled Content (%),Energy Manufacturing (MJ),Transport Mode,Material Cost ($)

0.015,70,,truck,0.12
0.002,\"\",1.4,\"\",0
";

    #[test]
    fn parses_rows_with_positional_ids() {
        let rows = ingest(SAMPLE).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.ids(), vec![RowId(1), RowId(2)]);

        let first = rows.get(RowId(1)).unwrap();
        assert_eq!(first.get(Field::Weight).as_str(), Some("0.015"));
        assert_eq!(first.get(Field::TransportMode).as_str(), Some("truck"));
        assert!(first.get(Field::EnergyManufacturing).is_absent());
        assert!(first.get(Field::Co2Extraction).is_absent());
    }

    #[test]
    fn quoted_and_bare_empty_are_both_absent() {
        let rows = ingest(SAMPLE).unwrap();
        let second = rows.get(RowId(2)).unwrap();
        assert!(second.get(Field::RecycledContent).is_absent());
        assert!(second.get(Field::TransportMode).is_absent());
        assert_eq!(second.get(Field::MaterialCost).as_str(), Some("0"));
    }

    #[test]
    fn values_are_not_coerced() {
        let rows = ingest("weight,transport mode\nabout 3,Rail \n").unwrap();
        let row = rows.get(RowId(1)).unwrap();
        assert_eq!(row.get(Field::Weight).as_str(), Some("about 3"));
        assert_eq!(row.get(Field::TransportMode).as_str(), Some("Rail"));
    }

    #[test]
    fn column_count_mismatch_reports_source_line() {
        match ingest("a,b\n1,2,3") {
            Err(IngestError::SchemaMismatch {
                line,
                expected,
                observed,
            }) => {
                assert_eq!((line, expected, observed), (2, 2, 3));
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn mismatch_line_counts_comments_and_blanks() {
        let text = "# header next\nweight,transport mode\n\n1,road\n   \n2\n3,sea\n";
        match ingest(text) {
            Err(IngestError::SchemaMismatch { line, observed, .. }) => {
                assert_eq!(line, 6);
                assert_eq!(observed, 1);
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn header_without_data_is_empty_input() {
        assert!(matches!(ingest(""), Err(IngestError::EmptyInput)));
        assert!(matches!(ingest("# only a comment\n\n"), Err(IngestError::EmptyInput)));
        assert!(matches!(ingest("weight,transport mode\n"), Err(IngestError::EmptyInput)));
    }

    #[test]
    fn duplicate_field_columns_are_rejected() {
        let result = ingest("Weight (kg),weight_kg\n1,2\n");
        assert!(matches!(result, Err(IngestError::DuplicateColumn(ref c)) if c == "weight_kg"));
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let rows = ingest("supplier,weight\nacme,4\n").unwrap();
        let row = rows.get(RowId(1)).unwrap();
        assert_eq!(row.get(Field::Weight).as_str(), Some("4"));
        assert_eq!(row.cells().filter(|(_, c)| !c.is_absent()).count(), 1);
    }

    #[test]
    fn canonical_output_reingests_to_the_same_rows() {
        let rows = ingest(SAMPLE).unwrap();
        let text = to_csv(&rows).unwrap();
        assert!(text.starts_with("\"Weight (kg)\""));
        assert_eq!(ingest(&text).unwrap(), rows);
        assert_eq!(to_csv(&ingest(&text).unwrap()).unwrap(), text);
    }

    #[test]
    fn canonical_output_quotes_text_with_commas() {
        let mut rows = RowSet::new();
        let id = rows.push_blank();
        rows.set(id, Field::EndOfLifeMethod, "recycle, then landfill");
        rows.set(id, Field::Weight, "1.5");

        let reread = ingest(&to_csv(&rows).unwrap()).unwrap();
        assert_eq!(reread, rows);
    }

    #[test]
    fn quoted_values_keep_blank_lines_and_hashes() {
        let mut rows = RowSet::new();
        let a = rows.push_blank();
        rows.set(a, Field::EndOfLifeMethod, "recycle\n\nlandfill");
        let b = rows.push_blank();
        rows.set(b, Field::EndOfLifeMethod, "recycle\n# then landfill");
        rows.set(b, Field::TransportMode, "#1 barge");

        let reread = ingest(&to_csv(&rows).unwrap()).unwrap();
        assert_eq!(reread, rows);
    }

    #[test]
    fn mismatch_after_multiline_value_reports_its_own_line() {
        let text = "weight,end of life\n1,\"recycle\n\nlandfill\"\n# note\n\n2\n";
        match ingest(text) {
            Err(IngestError::SchemaMismatch { line, .. }) => assert_eq!(line, 7),
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn reads_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.csv");
        fs::write(&path, SAMPLE).unwrap();
        assert_eq!(ingest_path(&path).unwrap().len(), 2);

        let missing = dir.path().join("missing.csv");
        assert!(matches!(ingest_path(&missing), Err(IngestError::FileIO(..))));
    }
}
