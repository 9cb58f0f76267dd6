//! Rows and the forward-only cursor the executor reads them from.

mod cursor;
mod row;

pub use cursor::ResultCursor;
pub use row::{ColumnIndex, Row};
