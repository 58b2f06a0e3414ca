pub mod client;
pub mod coordinator;
pub mod error;
pub mod ids;
pub mod message;
pub mod shift;
pub mod table;
pub mod update;
pub mod value;

pub use client::{Client, ClientCallbacks};
pub use coordinator::{Coordinator, ProcessingMode};
pub use error::EngineError;
pub use ids::{ClientID, ColumnID, GroupID, Index, MessageID, RowID, Version};
pub use message::Message;
pub use shift::{ShiftContext, Transformed};
pub use table::Table;
pub use update::{Bookkeeping, Update};
pub use value::{CellType, CellValue};
