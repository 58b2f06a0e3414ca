use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::json;

use crate::ids::{ColumnID, Index, RowID};
use crate::value::{CellType, CellValue};

/// The shared table model. `columns` preserves insertion order (it is the
/// serialization order); `row_order` is the authoritative row sequence;
/// `cells` holds only the cells that have actually been assigned.
///
/// Invariants (checked by construction, not re-verified on every read):
/// 1. every key of `cells` is in `row_order` and vice versa, with no duplicates;
/// 2. every stored value under column `c` is `CellType[c].coerce`-stable;
/// 3. a cell under column `c` implies `c` is in `columns`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: IndexMap<ColumnID, CellType>,
    row_order: Vec<RowID>,
    cells: HashMap<RowID, HashMap<ColumnID, CellValue>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_row(&self, id: &RowID) -> bool {
        self.cells.contains_key(id)
    }

    pub fn has_column(&self, id: &ColumnID) -> bool {
        self.columns.contains_key(id)
    }

    pub fn row_index(&self, id: &RowID) -> Option<Index> {
        self.row_order.iter().position(|r| r == id)
    }

    pub fn row_order(&self) -> &[RowID] {
        &self.row_order
    }

    pub fn columns(&self) -> &IndexMap<ColumnID, CellType> {
        &self.columns
    }

    pub fn column_type(&self, id: &ColumnID) -> Option<CellType> {
        self.columns.get(id).copied()
    }

    pub fn get_cell(&self, row: &RowID, col: &ColumnID) -> Option<&CellValue> {
        self.cells.get(row)?.get(col)
    }

    /// Assigns a pre-coerced value. Callers (the update variants) are
    /// responsible for calling `CellType::coerce` first — this method only
    /// stores, it does not validate.
    pub fn set_cell(&mut self, row: &RowID, col: &ColumnID, value: CellValue) {
        self.cells.entry(row.clone()).or_default().insert(col.clone(), value);
    }

    pub fn create_row(&mut self, id: &RowID) -> bool {
        if self.has_row(id) {
            return false;
        }
        self.row_order.push(id.clone());
        self.cells.insert(id.clone(), HashMap::new());
        true
    }

    /// Removes the row and returns the index it occupied, or `None` if it
    /// wasn't present.
    pub fn destroy_row(&mut self, id: &RowID) -> Option<Index> {
        let pos = self.row_index(id)?;
        self.row_order.remove(pos);
        self.cells.remove(id);
        Some(pos)
    }

    /// Moves `id` to `target` in the post-removal sequence. `target` must be
    /// a valid existing index of the array *after* the row has been removed
    /// (i.e. in `[0, len - 1)` where `len` is the row count before the move);
    /// out-of-range targets fail without mutating anything.
    pub fn move_row(&mut self, id: &RowID, target: Index) -> Option<(Index, Index)> {
        let start = self.row_index(id)?;
        let post_removal_len = self.row_order.len() - 1;
        if target >= post_removal_len {
            return None;
        }
        self.row_order.remove(start);
        self.row_order.insert(target, id.clone());
        Some((start, target))
    }

    pub fn create_column(&mut self, id: &ColumnID, ty: CellType) -> bool {
        if self.has_column(id) {
            return false;
        }
        self.columns.insert(id.clone(), ty);
        true
    }

    pub fn destroy_column(&mut self, id: &ColumnID) -> bool {
        if self.columns.shift_remove(id).is_none() {
            return false;
        }
        for row_cells in self.cells.values_mut() {
            row_cells.remove(id);
        }
        true
    }

    pub fn set_column_type(&mut self, id: &ColumnID, ty: CellType) {
        if let Some(slot) = self.columns.get_mut(id) {
            *slot = ty;
        }
    }

    /// An owned deep copy, handed to newly-connecting clients and stashed in
    /// history-adjacent shift-context computations.
    pub fn snapshot(&self) -> Table {
        self.clone()
    }

    /// The contractual wire shape from §6: `{ columns: [...], rows: [...] }`.
    pub fn to_json(&self) -> serde_json::Value {
        let columns: Vec<_> = self
            .columns
            .iter()
            .map(|(id, ty)| {
                json!({
                    "id": id,
                    "type": ty,
                })
            })
            .collect();

        let rows: Vec<_> = self
            .row_order
            .iter()
            .map(|id| {
                let cell_values = self.cells.get(id);
                let cell_values_json = match cell_values {
                    Some(values) => {
                        let mut map = serde_json::Map::new();
                        for (col, value) in values {
                            map.insert(col.as_str().to_string(), serde_json::to_value(value).unwrap());
                        }
                        serde_json::Value::Object(map)
                    }
                    None => serde_json::Value::Object(serde_json::Map::new()),
                };
                json!({
                    "id": id,
                    "cellValuesByColumnId": cell_values_json,
                })
            })
            .collect();

        json!({ "columns": columns, "rows": rows })
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_destroy_row_round_trip() {
        let mut t = Table::new();
        let row = RowID::new("r1");
        assert!(t.create_row(&row));
        assert!(!t.create_row(&row));
        assert_eq!(t.row_index(&row), Some(0));
        assert_eq!(t.destroy_row(&row), Some(0));
        assert!(!t.has_row(&row));
    }

    #[test]
    fn move_row_rejects_out_of_range_target() {
        let mut t = Table::new();
        let (a, b) = (RowID::new("a"), RowID::new("b"));
        t.create_row(&a);
        t.create_row(&b);
        // post-removal length is 1, only target 0 is valid
        assert!(t.move_row(&a, 1).is_none());
        assert_eq!(t.move_row(&a, 0), Some((0, 0)));
    }

    #[test]
    fn destroy_column_clears_cells() {
        let mut t = Table::new();
        let row = RowID::new("r1");
        let col = ColumnID::new("c1");
        t.create_row(&row);
        t.create_column(&col, CellType::Text);
        t.set_cell(&row, &col, CellValue::Text("hi".into()));
        assert!(t.destroy_column(&col));
        assert_eq!(t.get_cell(&row, &col), None);
        assert!(!t.has_column(&col));
    }

    #[test]
    fn to_json_matches_wire_shape() {
        let mut t = Table::new();
        let row = RowID::new("ABC");
        let col = ColumnID::new("123");
        t.create_row(&row);
        t.create_column(&col, CellType::Text);
        t.set_cell(&row, &col, CellValue::Text("foo".into()));
        let expected = json!({
            "columns": [{"id": "123", "type": "text"}],
            "rows": [{"id": "ABC", "cellValuesByColumnId": {"123": "foo"}}],
        });
        assert_eq!(t.to_json(), expected);
    }
}
