use serde::{Deserialize, Serialize};

/// The closed set of column types. `coerce` is the only operation a caller
/// needs: it either canonicalizes a value into this type or reports that the
/// value has no valid representation under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Text,
    Number,
}

/// A cell's value. The variant must always match the owning column's
/// `CellType` — `apply` is the single place that enforces this by calling
/// `coerce` before a value is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellType {
    /// Canonicalize `value` into this type, or `None` if it has no valid
    /// representation. `Text` always succeeds. `Number` succeeds only when
    /// the textual form parses into a finite float.
    pub fn coerce(self, value: &CellValue) -> Option<CellValue> {
        match self {
            CellType::Text => Some(CellValue::Text(match value {
                CellValue::Text(s) => s.clone(),
                CellValue::Number(n) => stringify_number(*n),
            })),
            CellType::Number => match value {
                CellValue::Number(n) => n.is_finite().then_some(CellValue::Number(*n)),
                CellValue::Text(s) => {
                    let parsed: f64 = s.trim().parse().ok()?;
                    parsed.is_finite().then_some(CellValue::Number(parsed))
                }
            },
        }
    }
}

/// Renders a finite f64 the way `JSON.stringify` would for a plain JS number:
/// whole values lose their trailing `.0` (`2.0` -> `"2"`), fractional values
/// keep a minimal decimal form. The reference test fixtures depend on this.
fn stringify_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
