// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The storage boundary for visibility tables.
//!
//! The smoothing engine only ever talks to a [VisTable]; the trait mirrors
//! the handful of Measurement-Set-style operations the engine needs (column
//! get/put over row sets, column creation cloning an existing column's
//! layout, baseline-keyed row grouping, and a little per-table metadata).
//! [MemTable] is the in-memory implementation, which round-trips through an
//! on-disk JSON snapshot.

mod error;
#[cfg(test)]
mod tests;

pub use error::TableError;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use vec1::Vec1;

use crate::c32;

/// The column usually smoothed.
pub const DATA: &str = "DATA";
/// The column the smoothed data usually land in.
pub const SMOOTHED_DATA: &str = "SMOOTHED_DATA";
/// The live per-sample weights.
pub const WEIGHT_SPECTRUM: &str = "WEIGHT_SPECTRUM";
/// Where the live weights get backed up before being overwritten.
pub const WEIGHT_SPECTRUM_ORIG: &str = "WEIGHT_SPECTRUM_ORIG";

/// A baseline separation vector \[metres\].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UVW {
    pub u: f64,
    pub v: f64,
    pub w: f64,
}

impl UVW {
    /// The physical baseline length \[metres\].
    pub fn length(self) -> f64 {
        (self.u * self.u + self.v * self.v + self.w * self.w).sqrt()
    }
}

/// Read-write access to a visibility table.
///
/// Data arrays are rectangular with shape (row, channel, polarisation); the
/// weight and flag arrays share that shape. Rows are identified by index in
/// table order, and operations taking a row set accept the indices in any
/// order (the returned arrays match the given order).
pub trait VisTable {
    fn num_rows(&self) -> usize;
    fn num_channels(&self) -> usize;
    fn num_pols(&self) -> usize;

    /// The scalar sampling interval, uniform over the whole table
    /// \[seconds\].
    fn time_res(&self) -> f64;

    /// The spectral window's reference frequency per channel \[Hz\].
    fn ref_freqs_hz(&self) -> &Vec1<f64>;

    /// Per-row time centroids \[seconds\], in table order.
    fn times(&self) -> &[f64];

    /// Row indices grouped by (antenna1, antenna2). Keys appear in
    /// first-seen order and each group's indices preserve table order.
    fn baseline_groups(&self) -> IndexMap<(u32, u32), Vec<usize>>;

    fn has_data_column(&self, col: &str) -> bool;
    fn has_weight_column(&self, col: &str) -> bool;

    /// Create data column `dest` with the same storage layout as the
    /// existing `src`. A no-op if `dest` already exists.
    fn add_data_column_like(&mut self, src: &str, dest: &str) -> Result<(), TableError>;

    /// As [VisTable::add_data_column_like], for weight columns.
    fn add_weight_column_like(&mut self, src: &str, dest: &str) -> Result<(), TableError>;

    /// Whole-table bulk copy of `src`'s values over `dest`'s.
    fn copy_data_column(&mut self, src: &str, dest: &str) -> Result<(), TableError>;

    /// As [VisTable::copy_data_column], for weight columns.
    fn copy_weight_column(&mut self, src: &str, dest: &str) -> Result<(), TableError>;

    fn get_data(&self, col: &str, rows: &[usize]) -> Result<Array3<c32>, TableError>;
    fn put_data(&mut self, col: &str, rows: &[usize], data: ArrayView3<c32>)
        -> Result<(), TableError>;
    fn get_weights(&self, col: &str, rows: &[usize]) -> Result<Array3<f32>, TableError>;
    fn put_weights(
        &mut self,
        col: &str,
        rows: &[usize],
        weights: ArrayView3<f32>,
    ) -> Result<(), TableError>;
    fn get_flags(&self, rows: &[usize]) -> Result<Array3<bool>, TableError>;
    fn get_uvws(&self, rows: &[usize]) -> Result<Vec<UVW>, TableError>;
}

/// An in-memory visibility table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemTable {
    times: Vec<f64>,
    antenna1: Vec<u32>,
    antenna2: Vec<u32>,
    uvws: Vec<UVW>,
    time_res: f64,
    ref_freqs_hz: Vec1<f64>,
    data: IndexMap<String, Array3<c32>>,
    weights: IndexMap<String, Array3<f32>>,
    flags: Array3<bool>,
}

impl MemTable {
    /// Create a table from its per-row columns. `data` becomes the
    /// [DATA]-equivalent column and `weights` the live weights. All per-row
    /// collections must agree on the number of rows, and the data, weight
    /// and flag arrays must share one (row, channel, polarisation) shape.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        times: Vec<f64>,
        antenna1: Vec<u32>,
        antenna2: Vec<u32>,
        uvws: Vec<UVW>,
        time_res: f64,
        ref_freqs_hz: Vec1<f64>,
        data: Array3<c32>,
        weights: Array3<f32>,
        flags: Array3<bool>,
    ) -> Result<MemTable, TableError> {
        let num_rows = times.len();
        for (col, got) in [
            ("ANTENNA1", antenna1.len()),
            ("ANTENNA2", antenna2.len()),
            ("UVW", uvws.len()),
            (DATA, data.len_of(Axis(0))),
        ] {
            if got != num_rows {
                return Err(TableError::MismatchedRows {
                    col,
                    expected: num_rows,
                    got,
                });
            }
        }
        for (shape, name) in [(weights.dim(), "weight"), (flags.dim(), "flag")] {
            if shape != data.dim() {
                debug!("{name} array shape {shape:?} vs data {:?}", data.dim());
                return Err(TableError::ShapeMismatch {
                    expected: data.dim(),
                    got: shape,
                });
            }
        }

        let mut data_cols = IndexMap::new();
        data_cols.insert(DATA.to_string(), data);
        let mut weight_cols = IndexMap::new();
        weight_cols.insert(WEIGHT_SPECTRUM.to_string(), weights);
        Ok(MemTable {
            times,
            antenna1,
            antenna2,
            uvws,
            time_res,
            ref_freqs_hz,
            data: data_cols,
            weights: weight_cols,
            flags,
        })
    }

    /// Read a table snapshot from disk. A missing path is an error; nothing
    /// is created implicitly.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<MemTable, TableError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TableError::NotFound(path.to_path_buf()));
        }
        debug!("Reading table snapshot {}", path.display());
        let file = BufReader::new(File::open(path)?);
        let table = serde_json::from_reader(file)?;
        Ok(table)
    }

    /// Write the table snapshot to disk, replacing whatever is there.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let path = path.as_ref();
        debug!("Writing table snapshot {}", path.display());
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer(file, self)?;
        Ok(())
    }

    fn check_rows(&self, rows: &[usize]) -> Result<(), TableError> {
        let num_rows = self.times.len();
        match rows.iter().find(|&&row| row >= num_rows) {
            Some(&row) => Err(TableError::RowOutOfBounds { row, num_rows }),
            None => Ok(()),
        }
    }

    fn check_shape(&self, got: (usize, usize, usize), num_rows: usize) -> Result<(), TableError> {
        let expected = (num_rows, self.num_channels(), self.num_pols());
        if got == expected {
            Ok(())
        } else {
            Err(TableError::ShapeMismatch { expected, got })
        }
    }
}

/// Gather `rows` of a (row, channel, polarisation) column into a new array.
fn gather<E: Copy>(col: &Array3<E>, rows: &[usize]) -> Array3<E> {
    col.select(Axis(0), rows)
}

/// Scatter `values` back into `rows` of a column.
fn scatter<E: Copy>(col: &mut Array3<E>, rows: &[usize], values: ArrayView3<E>) {
    for (value_row, &row) in values.outer_iter().zip(rows) {
        col.index_axis_mut(Axis(0), row).assign(&value_row);
    }
}

impl VisTable for MemTable {
    fn num_rows(&self) -> usize {
        self.times.len()
    }

    fn num_channels(&self) -> usize {
        self.flags.len_of(Axis(1))
    }

    fn num_pols(&self) -> usize {
        self.flags.len_of(Axis(2))
    }

    fn time_res(&self) -> f64 {
        self.time_res
    }

    fn ref_freqs_hz(&self) -> &Vec1<f64> {
        &self.ref_freqs_hz
    }

    fn times(&self) -> &[f64] {
        &self.times
    }

    fn baseline_groups(&self) -> IndexMap<(u32, u32), Vec<usize>> {
        let mut groups: IndexMap<(u32, u32), Vec<usize>> = IndexMap::new();
        for (row, (&ant1, &ant2)) in self.antenna1.iter().zip(self.antenna2.iter()).enumerate() {
            groups.entry((ant1, ant2)).or_default().push(row);
        }
        groups
    }

    fn has_data_column(&self, col: &str) -> bool {
        self.data.contains_key(col)
    }

    fn has_weight_column(&self, col: &str) -> bool {
        self.weights.contains_key(col)
    }

    fn add_data_column_like(&mut self, src: &str, dest: &str) -> Result<(), TableError> {
        if self.data.contains_key(dest) {
            return Ok(());
        }
        let src_col = self
            .data
            .get(src)
            .ok_or_else(|| TableError::NoSuchColumn(src.to_string()))?;
        // Cloning the source's storage layout means a same-shaped column; the
        // values don't matter until a bulk copy fills them in.
        let new_col = Array3::zeros(src_col.raw_dim());
        self.data.insert(dest.to_string(), new_col);
        Ok(())
    }

    fn add_weight_column_like(&mut self, src: &str, dest: &str) -> Result<(), TableError> {
        if self.weights.contains_key(dest) {
            return Ok(());
        }
        let src_col = self
            .weights
            .get(src)
            .ok_or_else(|| TableError::NoSuchColumn(src.to_string()))?;
        let new_col = Array3::zeros(src_col.raw_dim());
        self.weights.insert(dest.to_string(), new_col);
        Ok(())
    }

    fn copy_data_column(&mut self, src: &str, dest: &str) -> Result<(), TableError> {
        let src_col = self
            .data
            .get(src)
            .ok_or_else(|| TableError::NoSuchColumn(src.to_string()))?
            .clone();
        match self.data.get_mut(dest) {
            Some(dest_col) => {
                *dest_col = src_col;
                Ok(())
            }
            None => Err(TableError::NoSuchColumn(dest.to_string())),
        }
    }

    fn copy_weight_column(&mut self, src: &str, dest: &str) -> Result<(), TableError> {
        let src_col = self
            .weights
            .get(src)
            .ok_or_else(|| TableError::NoSuchColumn(src.to_string()))?
            .clone();
        match self.weights.get_mut(dest) {
            Some(dest_col) => {
                *dest_col = src_col;
                Ok(())
            }
            None => Err(TableError::NoSuchColumn(dest.to_string())),
        }
    }

    fn get_data(&self, col: &str, rows: &[usize]) -> Result<Array3<c32>, TableError> {
        self.check_rows(rows)?;
        let col = self
            .data
            .get(col)
            .ok_or_else(|| TableError::NoSuchColumn(col.to_string()))?;
        Ok(gather(col, rows))
    }

    fn put_data(
        &mut self,
        col: &str,
        rows: &[usize],
        data: ArrayView3<c32>,
    ) -> Result<(), TableError> {
        self.check_rows(rows)?;
        self.check_shape(data.dim(), rows.len())?;
        let col = self
            .data
            .get_mut(col)
            .ok_or_else(|| TableError::NoSuchColumn(col.to_string()))?;
        scatter(col, rows, data);
        Ok(())
    }

    fn get_weights(&self, col: &str, rows: &[usize]) -> Result<Array3<f32>, TableError> {
        self.check_rows(rows)?;
        let col = self
            .weights
            .get(col)
            .ok_or_else(|| TableError::NoSuchColumn(col.to_string()))?;
        Ok(gather(col, rows))
    }

    fn put_weights(
        &mut self,
        col: &str,
        rows: &[usize],
        weights: ArrayView3<f32>,
    ) -> Result<(), TableError> {
        self.check_rows(rows)?;
        self.check_shape(weights.dim(), rows.len())?;
        let col = self
            .weights
            .get_mut(col)
            .ok_or_else(|| TableError::NoSuchColumn(col.to_string()))?;
        scatter(col, rows, weights);
        Ok(())
    }

    fn get_flags(&self, rows: &[usize]) -> Result<Array3<bool>, TableError> {
        self.check_rows(rows)?;
        Ok(gather(&self.flags, rows))
    }

    fn get_uvws(&self, rows: &[usize]) -> Result<Vec<UVW>, TableError> {
        self.check_rows(rows)?;
        Ok(rows.iter().map(|&row| self.uvws[row]).collect())
    }
}
