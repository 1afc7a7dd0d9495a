// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Cannot find table file {0}")]
    NotFound(PathBuf),

    #[error("Column {0} does not exist in the table")]
    NoSuchColumn(String),

    #[error("Row index {row} is out of bounds for a table with {num_rows} rows")]
    RowOutOfBounds { row: usize, num_rows: usize },

    #[error("Array shape {got:?} does not match the table's row/channel/polarisation shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        got: (usize, usize, usize),
    },

    #[error("The {col} column has {got} rows; expected {expected}")]
    MismatchedRows {
        col: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("IO error when accessing table snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Couldn't (de)serialise table snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}
