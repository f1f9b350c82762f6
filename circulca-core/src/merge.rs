//! Folds machine-imputed values into user data without touching anything the
//! user entered.

use crate::{error::MergeError, missingness};
use circulca_schemas::{
    field::Field,
    row::{Cell, Row, RowSet},
    wire::{MaterialRecord, WireValue},
};
use std::collections::BTreeMap;
use tracing::debug;

/// Decimal places used when an imputed number is written into a cell.
pub const IMPUTED_DECIMALS: usize = 3;

/// A merged row set together with what was filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub rows: RowSet,
    pub filled_by_field: BTreeMap<Field, usize>,
}

impl MergeOutcome {
    pub fn filled(&self) -> usize {
        self.filled_by_field.values().sum()
    }
}

/// Merges imputed rows into `original`, pairing rows by position.
pub fn merge(original: &RowSet, imputed: &[MaterialRecord]) -> Result<RowSet, MergeError> {
    merge_with_report(original, imputed).map(|outcome| outcome.rows)
}

/// Like [`merge`], also reporting how many cells were filled per field.
///
/// A cell takes the imputed value only when it is absent in `original` and the
/// imputed value is present. `original` is never modified; on error the caller
/// still holds it unchanged.
pub fn merge_with_report(
    original: &RowSet,
    imputed: &[MaterialRecord],
) -> Result<MergeOutcome, MergeError> {
    if original.len() != imputed.len() {
        return Err(MergeError::Alignment {
            original: original.len(),
            imputed: imputed.len(),
        });
    }

    let mut filled_by_field = BTreeMap::new();
    let rows: Vec<Row> = original
        .iter()
        .zip(imputed)
        .map(|(row, record)| {
            let mut merged = row.clone();
            for field in Field::ALL {
                if !missingness::is_absent(row, field) {
                    continue;
                }
                let cell = render(record.value(field));
                if !cell.is_absent() {
                    merged.set(field, cell);
                    *filled_by_field.entry(field).or_insert(0) += 1;
                }
            }
            merged
        })
        .collect();

    let outcome = MergeOutcome {
        rows: original.with_rows(rows),
        filled_by_field,
    };
    debug!(filled = outcome.filled(), rows = original.len(), "merged imputed values");
    Ok(outcome)
}

fn render(value: Option<WireValue<'_>>) -> Cell {
    match value {
        Some(WireValue::Number(n)) => Cell::number(n, IMPUTED_DECIMALS),
        Some(WireValue::Text(text)) => Cell::verbatim(text),
        None => Cell::Absent,
    }
}
