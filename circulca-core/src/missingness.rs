//! The single absence predicate for row cells, plus summaries built on it.

use circulca_schemas::{
    field::Field,
    row::{Row, RowSet},
};
use std::collections::BTreeMap;

/// True when `field` holds no value in `row`. A present `0` is never absent.
pub fn is_absent(row: &Row, field: Field) -> bool {
    row.get(field).is_absent()
}

/// Fields of `row` that hold no value, in canonical order.
pub fn missing_fields(row: &Row) -> Vec<Field> {
    Field::ALL
        .iter()
        .copied()
        .filter(|f| is_absent(row, *f))
        .collect()
}

/// Per-column count of absent cells across a row set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissingnessReport {
    pub rows: usize,
    pub by_field: BTreeMap<Field, usize>,
}

impl MissingnessReport {
    pub fn from_rows(rows: &RowSet) -> Self {
        let mut by_field = BTreeMap::new();
        for row in rows {
            for field in missing_fields(row) {
                *by_field.entry(field).or_insert(0) += 1;
            }
        }
        Self {
            rows: rows.len(),
            by_field,
        }
    }

    pub fn total_missing(&self) -> usize {
        self.by_field.values().sum()
    }

    pub fn columns_with_missing(&self) -> usize {
        self.by_field.len()
    }

    pub fn is_complete(&self) -> bool {
        self.by_field.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circulca_schemas::row::Cell;

    fn sample() -> RowSet {
        let mut rows = RowSet::new();
        let a = rows.push_blank();
        rows.set(a, Field::Weight, "0");
        rows.set(a, Field::TransportMode, "rail");
        let b = rows.push_blank();
        rows.set(b, Field::Weight, "2.5");
        rows
    }

    #[test]
    fn zero_is_not_absent() {
        let rows = sample();
        let first = rows.iter().next().unwrap();
        assert!(!is_absent(first, Field::Weight));
        assert!(is_absent(first, Field::MaterialCost));
    }

    #[test]
    fn missing_fields_follow_canonical_order() {
        let mut rows = RowSet::new();
        let id = rows.push(std::array::from_fn(|i| {
            if i % 2 == 0 {
                Cell::new("1")
            } else {
                Cell::Absent
            }
        }));
        let missing = missing_fields(rows.get(id).unwrap());
        assert_eq!(missing.len(), Field::COUNT / 2);
        assert_eq!(missing[0], Field::RecycledContent);
        assert!(missing.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn report_counts_absent_cells_per_column() {
        let report = MissingnessReport::from_rows(&sample());
        assert_eq!(report.rows, 2);
        assert_eq!(report.by_field.get(&Field::Weight), None);
        assert_eq!(report.by_field.get(&Field::TransportMode), Some(&1));
        assert_eq!(report.by_field.get(&Field::MaterialCost), Some(&2));
        assert_eq!(report.total_missing(), 10 + 11);
        assert_eq!(report.columns_with_missing(), Field::COUNT - 1);
        assert!(!report.is_complete());
    }
}
