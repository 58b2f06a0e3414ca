use serde::{Deserialize, Serialize};

use crate::ids::{ColumnID, Index, RowID};
use crate::shift::ShiftContext;
use crate::table::Table;
use crate::value::{CellType, CellValue};

/// The eight mutation operations a client can issue. Carried fields are the
/// update's own authored intent; any index resolved only at apply time (a
/// row's current position, a move's source/destination) is *not* stored here
/// — it's returned from `apply` as [`Bookkeeping`] instead, so there's no
/// mutable state hanging off the variant that a caller could read before it
/// exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Update {
    CreateRow { row_id: RowID },
    DestroyRow { row_id: RowID },
    MoveRow { row_id: RowID, target_index: Index },
    CreateColumn { column_id: ColumnID, cell_type: CellType },
    DestroyColumn { column_id: ColumnID },
    UpdateColumnType { column_id: ColumnID, cell_type: CellType },
    UpdateTextCellValue { row_id: RowID, column_id: ColumnID, value: String },
    UpdateNumberCellValue { row_id: RowID, column_id: ColumnID, value: f64 },
}

/// What a successful `apply` resolved, needed later by `shift`. Produced
/// only by `apply`, consumed only by `shift` — there is no way to call
/// `shift` without first having one of these in hand.
#[derive(Debug, Clone, Copy)]
pub enum Bookkeeping {
    None,
    RowIndex(Index),
    Move { start: Index, end: Index },
}

impl Update {
    /// True only for updates whose carried indices mean something different
    /// depending on the baseline table they were authored against.
    pub fn needs_transform(&self) -> bool {
        matches!(self, Update::MoveRow { .. })
    }

    /// Rewrites carried indices through `ctx`. Returns `false` if the index
    /// was tombstoned (its referent was removed by an intervening update) —
    /// the update must then fail as a merge conflict rather than apply.
    pub fn transform(&mut self, ctx: &ShiftContext) -> bool {
        match self {
            Update::MoveRow { target_index, .. } => match ctx.transform(*target_index).into_index() {
                Some(i) => {
                    *target_index = i;
                    true
                }
                None => false,
            },
            _ => true,
        }
    }

    /// Mutates `table`, returning the bookkeeping on success. On `None` the
    /// table is left exactly as it was (every branch below only mutates
    /// after its preconditions have all been checked).
    pub fn apply(&self, table: &mut Table) -> Option<Bookkeeping> {
        match self {
            Update::CreateRow { row_id } => table.create_row(row_id).then_some(Bookkeeping::None),

            Update::DestroyRow { row_id } => table.destroy_row(row_id).map(Bookkeeping::RowIndex),

            Update::MoveRow { row_id, target_index } => table
                .move_row(row_id, *target_index)
                .map(|(start, end)| Bookkeeping::Move { start, end }),

            Update::CreateColumn { column_id, cell_type } => {
                table.create_column(column_id, *cell_type).then_some(Bookkeeping::None)
            }

            Update::DestroyColumn { column_id } => {
                table.destroy_column(column_id).then_some(Bookkeeping::None)
            }

            Update::UpdateColumnType { column_id, cell_type } => {
                apply_update_column_type(table, column_id, *cell_type)
            }

            Update::UpdateTextCellValue { row_id, column_id, value } => {
                if table.column_type(column_id) != Some(CellType::Text) || !table.has_row(row_id) {
                    return None;
                }
                table.set_cell(row_id, column_id, CellValue::Text(value.clone()));
                Some(Bookkeeping::None)
            }

            Update::UpdateNumberCellValue { row_id, column_id, value } => {
                if table.column_type(column_id) != Some(CellType::Number) || !table.has_row(row_id) {
                    return None;
                }
                let coerced = CellType::Number.coerce(&CellValue::Number(*value))?;
                table.set_cell(row_id, column_id, coerced);
                Some(Bookkeeping::None)
            }
        }
    }

    /// Appends this update's contribution to a downstream shift context.
    /// Only `DestroyRow` and `MoveRow` contribute anything.
    pub fn shift(&self, bookkeeping: Bookkeeping, ctx: &mut ShiftContext) {
        match (self, bookkeeping) {
            (Update::DestroyRow { .. }, Bookkeeping::RowIndex(i)) => ctx.delete_at(i),
            (Update::MoveRow { .. }, Bookkeeping::Move { start, end }) => ctx.move_row(start, end),
            _ => {}
        }
    }
}

/// `UpdateColumnType` coerces only the rows that actually have a value under
/// this column; it must either coerce every one of them or change nothing.
fn apply_update_column_type(table: &mut Table, column_id: &ColumnID, cell_type: CellType) -> Option<Bookkeeping> {
    if !table.has_column(column_id) {
        return None;
    }

    let mut coerced = Vec::new();
    for row_id in table.row_order() {
        if let Some(value) = table.get_cell(row_id, column_id) {
            let new_value = cell_type.coerce(value)?;
            coerced.push((row_id.clone(), new_value));
        }
    }

    table.set_column_type(column_id, cell_type);
    for (row_id, new_value) in coerced {
        table.set_cell(&row_id, column_id, new_value);
    }
    Some(Bookkeeping::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_col(table: &mut Table, id: &str) -> ColumnID {
        let col = ColumnID::new(id);
        table.create_column(&col, CellType::Text);
        col
    }

    #[test]
    fn create_row_fails_on_duplicate() {
        let mut table = Table::new();
        let row = RowID::new("r1");
        let update = Update::CreateRow { row_id: row.clone() };
        assert!(update.apply(&mut table).is_some());
        assert!(update.apply(&mut table).is_none());
    }

    #[test]
    fn destroy_row_records_its_index() {
        let mut table = Table::new();
        let row = RowID::new("r1");
        Update::CreateRow { row_id: row.clone() }.apply(&mut table);
        let update = Update::DestroyRow { row_id: row };
        let bk = update.apply(&mut table).unwrap();
        assert!(matches!(bk, Bookkeeping::RowIndex(0)));
    }

    #[test]
    fn move_row_fails_out_of_range_and_leaves_table_untouched() {
        let mut table = Table::new();
        let a = RowID::new("a");
        Update::CreateRow { row_id: a.clone() }.apply(&mut table);
        let before = table.clone();
        let update = Update::MoveRow { row_id: a, target_index: 5 };
        assert!(update.apply(&mut table).is_none());
        assert_eq!(table, before);
    }

    #[test]
    fn update_column_type_coerces_existing_values() {
        let mut table = Table::new();
        let row = RowID::new("r1");
        let col = ColumnID::new("c1");
        table.create_row(&row);
        table.create_column(&col, CellType::Number);
        table.set_cell(&row, &col, CellValue::Number(2.0));

        let update = Update::UpdateColumnType { column_id: col.clone(), cell_type: CellType::Text };
        assert!(update.apply(&mut table).is_some());
        assert_eq!(table.get_cell(&row, &col), Some(&CellValue::Text("2".into())));
    }

    #[test]
    fn update_column_type_rejects_uncoercible_value_without_mutating() {
        let mut table = Table::new();
        let row = RowID::new("r1");
        let col = text_col(&mut table, "c1");
        table.create_row(&row);
        table.set_cell(&row, &col, CellValue::Text("foo".into()));
        let before = table.clone();

        let update = Update::UpdateColumnType { column_id: col, cell_type: CellType::Number };
        assert!(update.apply(&mut table).is_none());
        assert_eq!(table, before);
    }

    #[test]
    fn cell_update_requires_matching_column_type() {
        let mut table = Table::new();
        let row = RowID::new("r1");
        let col = text_col(&mut table, "c1");
        table.create_row(&row);

        let wrong_type = Update::UpdateNumberCellValue {
            row_id: row.clone(),
            column_id: col.clone(),
            value: 1.0,
        };
        assert!(wrong_type.apply(&mut table).is_none());

        let right_type = Update::UpdateTextCellValue { row_id: row, column_id: col, value: "hi".into() };
        assert!(right_type.apply(&mut table).is_some());
    }

    #[test]
    fn number_cell_update_rejects_non_finite_values() {
        let mut table = Table::new();
        let row = RowID::new("r1");
        let col = ColumnID::new("c1");
        table.create_row(&row);
        table.create_column(&col, CellType::Number);

        let update = Update::UpdateNumberCellValue { row_id: row, column_id: col, value: f64::NAN };
        assert!(update.apply(&mut table).is_none());
    }
}
