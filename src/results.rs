mod rows;
mod value_set;

pub use rows::{BufferedRows, RowReader, Rows};
pub use value_set::{ValueSet, ValuesView};
pub(crate) use value_set::index_columns;
