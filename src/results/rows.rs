use std::collections::VecDeque;
use std::fmt;

use crate::error::SqlSessionError;
use crate::results::ValueSet;

/// A forward-only reader over the rows of one query, as produced by a driver.
pub trait RowReader: Send {
    /// Fetch the next row, or `None` once the result is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the driver's error if fetching or decoding the row fails.
    fn next_row(&mut self) -> Result<Option<ValueSet>, SqlSessionError>;
}

/// Rows that were fully read before being handed out.
#[derive(Debug, Default)]
pub struct BufferedRows {
    rows: VecDeque<ValueSet>,
}

impl BufferedRows {
    #[must_use]
    pub fn new(rows: Vec<ValueSet>) -> Self {
        Self { rows: rows.into() }
    }
}

impl RowReader for BufferedRows {
    fn next_row(&mut self) -> Result<Option<ValueSet>, SqlSessionError> {
        Ok(self.rows.pop_front())
    }
}

/// Lazy sequence of [`ValueSet`]s returned by `select`.
///
/// Rows are pulled from the reader as the iterator advances. The reader is released as soon
/// as the sequence is exhausted, yields an error, or is dropped. The sequence cannot be
/// restarted; each `select` issues a fresh query.
pub struct Rows {
    reader: Option<Box<dyn RowReader>>,
}

impl Rows {
    #[must_use]
    pub fn new(reader: Box<dyn RowReader>) -> Self {
        Self {
            reader: Some(reader),
        }
    }

    /// An already-read result.
    #[must_use]
    pub fn from_rows(rows: Vec<ValueSet>) -> Self {
        Self::new(Box::new(BufferedRows::new(rows)))
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { reader: None }
    }

    /// Whether the underlying reader has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.reader.is_none()
    }
}

impl Iterator for Rows {
    type Item = Result<ValueSet, SqlSessionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        match reader.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.reader = None;
                None
            }
            Err(err) => {
                self.reader = None;
                Some(Err(err))
            }
        }
    }
}

impl fmt::Debug for Rows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows")
            .field("released", &self.is_released())
            .finish()
    }
}
