use crate::field::Field;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt};

/// A single table value. `Absent` is the one and only representation of a
/// missing entry; empty text never survives as `Present`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Absent,
    Present(String),
}

impl Cell {
    /// Builds a cell from raw text. Whitespace is trimmed and an empty result is absent.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            Cell::Absent
        } else {
            Cell::Present(trimmed.to_string())
        }
    }

    /// Keeps text exactly as given. Whitespace-only text is still absent.
    pub fn verbatim(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            Cell::Absent
        } else {
            Cell::Present(text)
        }
    }

    /// Renders a number with a fixed number of decimals. Non-finite numbers are absent.
    pub fn number(value: f64, decimals: usize) -> Self {
        if value.is_finite() {
            Cell::Present(format!("{:.*}", decimals, value))
        } else {
            Cell::Absent
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Absent => None,
            Cell::Present(text) => Some(text),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::new(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::new(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            Cell::Present(value.to_string())
        } else {
            Cell::Absent
        }
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Absent, Into::into)
    }
}

/// Identity of a row within its row set. Never reused once handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One material or process line of the inventory. Every schema field is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    cells: [Cell; Field::COUNT],
}

impl Row {
    pub fn blank(id: RowId) -> Self {
        Self {
            id,
            cells: Default::default(),
        }
    }

    pub fn with_cells(id: RowId, cells: [Cell; Field::COUNT]) -> Self {
        Self { id, cells }
    }

    pub fn get(&self, field: Field) -> &Cell {
        &self.cells[field.index()]
    }

    pub fn set(&mut self, field: Field, value: impl Into<Cell>) {
        self.cells[field.index()] = value.into();
    }

    /// Cells in canonical field order.
    pub fn cells(&self) -> impl Iterator<Item = (Field, &Cell)> {
        Field::ALL.iter().copied().zip(self.cells.iter())
    }
}

/// An ordered collection of rows. Order is significant: imputation and
/// simulation responses are aligned with it by position.
///
/// Deserialization rejects sets whose allocator could hand out an id that is
/// already taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RowSetParts")]
pub struct RowSet {
    rows: Vec<Row>,
    next_id: u64,
}

#[derive(Deserialize)]
struct RowSetParts {
    rows: Vec<Row>,
    next_id: u64,
}

impl TryFrom<RowSetParts> for RowSet {
    type Error = String;

    fn try_from(parts: RowSetParts) -> Result<Self, Self::Error> {
        let RowSetParts { rows, next_id } = parts;
        if next_id == 0 {
            return Err("next_id must be at least 1".to_string());
        }
        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            if row.id.0 >= next_id {
                return Err(format!("row id {} is not below next_id {}", row.id, next_id));
            }
            if !seen.insert(row.id) {
                return Err(format!("row id {} appears more than once", row.id));
            }
        }
        Ok(Self { rows, next_id })
    }
}

impl Default for RowSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RowSet {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> RowId {
        let id = RowId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Appends a row with every field absent.
    pub fn push_blank(&mut self) -> RowId {
        let id = self.allocate_id();
        self.rows.push(Row::blank(id));
        id
    }

    pub fn push(&mut self, cells: [Cell; Field::COUNT]) -> RowId {
        let id = self.allocate_id();
        self.rows.push(Row::with_cells(id, cells));
        id
    }

    pub fn remove(&mut self, id: RowId) -> Option<Row> {
        let position = self.rows.iter().position(|r| r.id == id)?;
        Some(self.rows.remove(position))
    }

    pub fn get(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: RowId) -> Option<&mut Row> {
        self.rows.iter_mut().find(|r| r.id == id)
    }

    /// Sets one cell. Returns `false` when the row does not exist.
    pub fn set(&mut self, id: RowId, field: Field, value: impl Into<Cell>) -> bool {
        match self.get_mut(id) {
            Some(row) => {
                row.set(field, value);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn ids(&self) -> Vec<RowId> {
        self.rows.iter().map(|r| r.id).collect()
    }

    /// Rebuilds the set around new row contents while keeping ids and the allocator.
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self {
            rows,
            next_id: self.next_id,
        }
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
