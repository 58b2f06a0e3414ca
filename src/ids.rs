use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }
    };
}

opaque_id!(RowID);
opaque_id!(ColumnID);
opaque_id!(GroupID);
opaque_id!(MessageID);
opaque_id!(ClientID);

impl GroupID {
    /// Rolls a fresh group id, used whenever the dependency group a client is
    /// accumulating edits against has to start over (new sync baseline, or an
    /// edit just got materialized).
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl MessageID {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl ClientID {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// A server-assigned version. Version 0 is the empty initial state;
/// `history[1]` is the first accepted update.
pub type Version = u64;

/// A row position within `Table::row_order`.
pub type Index = usize;
