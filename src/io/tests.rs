// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use ndarray::prelude::*;
use vec1::vec1;

use super::*;

/// Two baselines interleaved over three timesteps.
fn small_table() -> MemTable {
    let shape = (6, 2, 4);
    let data = Array3::from_shape_fn(shape, |(row, ch, pol)| {
        c32::new(row as f32 + ch as f32, pol as f32)
    });
    let weights = Array3::from_shape_fn(shape, |(row, _, _)| row as f32);
    let flags = Array3::from_shape_fn(shape, |(row, _, _)| row == 5);
    MemTable::new(
        vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0],
        vec![0, 0, 0, 0, 0, 0],
        vec![1, 2, 1, 2, 1, 2],
        vec![
            UVW {
                u: 3.0,
                v: 4.0,
                w: 0.0,
            };
            6
        ],
        2.0,
        vec1![120e6, 150e6],
        data,
        weights,
        flags,
    )
    .unwrap()
}

#[test]
fn uvw_length() {
    let uvw = UVW {
        u: 3.0,
        v: 4.0,
        w: 12.0,
    };
    assert_eq!(uvw.length(), 13.0);
}

#[test]
fn shapes_and_metadata() {
    let table = small_table();
    assert_eq!(table.num_rows(), 6);
    assert_eq!(table.num_channels(), 2);
    assert_eq!(table.num_pols(), 4);
    assert_eq!(table.time_res(), 2.0);
    assert_eq!(table.ref_freqs_hz().len(), 2);
}

#[test]
fn inconsistent_construction_is_rejected() {
    let shape = (2, 1, 1);
    let result = MemTable::new(
        vec![0.0, 1.0],
        vec![0],
        vec![1, 1],
        vec![UVW { u: 0.0, v: 0.0, w: 0.0 }; 2],
        1.0,
        vec1![60e6],
        Array3::from_elem(shape, c32::new(0.0, 0.0)),
        Array3::from_elem(shape, 1.0),
        Array3::from_elem(shape, false),
    );
    assert!(matches!(
        result,
        Err(TableError::MismatchedRows {
            col: "ANTENNA1",
            expected: 2,
            got: 1
        })
    ));
}

#[test]
fn baseline_groups_preserve_order() {
    let groups = small_table().baseline_groups();
    let keys: Vec<(u32, u32)> = groups.keys().copied().collect();
    assert_eq!(keys, vec![(0, 1), (0, 2)]);
    assert_eq!(groups[&(0, 1)], vec![0, 2, 4]);
    assert_eq!(groups[&(0, 2)], vec![1, 3, 5]);
}

#[test]
fn gather_and_scatter_rows() {
    let mut table = small_table();
    let rows = [1, 3, 5];
    let data = table.get_data(DATA, &rows).unwrap();
    assert_eq!(data.dim(), (3, 2, 4));
    assert_eq!(data[(0, 0, 0)], c32::new(1.0, 0.0));
    assert_eq!(data[(2, 1, 3)], c32::new(6.0, 3.0));

    let new_data = Array3::from_elem((3, 2, 4), c32::new(-1.0, 0.5));
    table.put_data(DATA, &rows, new_data.view()).unwrap();
    let all: Vec<usize> = (0..6).collect();
    let data = table.get_data(DATA, &all).unwrap();
    // Written rows hold the new value; the others are untouched.
    assert_eq!(data[(1, 0, 0)], c32::new(-1.0, 0.5));
    assert_eq!(data[(0, 0, 0)], c32::new(0.0, 0.0));

    let flags = table.get_flags(&rows).unwrap();
    assert!(!flags[(0, 0, 0)]);
    assert!(flags[(2, 0, 0)]);

    let uvws = table.get_uvws(&rows).unwrap();
    assert_eq!(uvws.len(), 3);
    assert_eq!(uvws[0].length(), 5.0);
}

#[test]
fn row_bounds_are_checked() {
    let table = small_table();
    let result = table.get_data(DATA, &[0, 6]);
    assert!(matches!(
        result,
        Err(TableError::RowOutOfBounds { row: 6, num_rows: 6 })
    ));
}

#[test]
fn put_shape_is_checked() {
    let mut table = small_table();
    let bad = Array3::from_elem((1, 2, 4), 0.0_f32);
    let result = table.put_weights(WEIGHT_SPECTRUM, &[0, 1], bad.view());
    assert!(matches!(result, Err(TableError::ShapeMismatch { .. })));
}

#[test]
fn missing_columns_are_errors() {
    let mut table = small_table();
    assert!(matches!(
        table.get_data(SMOOTHED_DATA, &[0]),
        Err(TableError::NoSuchColumn(_))
    ));
    assert!(matches!(
        table.copy_data_column(DATA, SMOOTHED_DATA),
        Err(TableError::NoSuchColumn(_))
    ));
}

#[test]
fn add_column_like_clones_the_layout() {
    let mut table = small_table();
    assert!(!table.has_data_column(SMOOTHED_DATA));
    table.add_data_column_like(DATA, SMOOTHED_DATA).unwrap();
    assert!(table.has_data_column(SMOOTHED_DATA));
    let col = table.get_data(SMOOTHED_DATA, &[0, 1]).unwrap();
    assert_eq!(col.dim(), (2, 2, 4));

    // Adding again is a no-op, not an error.
    table.add_data_column_like(DATA, SMOOTHED_DATA).unwrap();

    table.copy_data_column(DATA, SMOOTHED_DATA).unwrap();
    let all: Vec<usize> = (0..6).collect();
    assert_eq!(
        table.get_data(DATA, &all).unwrap(),
        table.get_data(SMOOTHED_DATA, &all).unwrap()
    );
}

#[test]
fn snapshot_round_trip() {
    let table = small_table();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vis.blsm");
    table.save(&path).unwrap();

    let loaded = MemTable::open(&path).unwrap();
    let all: Vec<usize> = (0..6).collect();
    assert_eq!(loaded.num_rows(), table.num_rows());
    assert_eq!(loaded.time_res(), table.time_res());
    assert_eq!(loaded.times(), table.times());
    assert_eq!(
        loaded.get_data(DATA, &all).unwrap(),
        table.get_data(DATA, &all).unwrap()
    );
    assert_eq!(
        loaded.get_weights(WEIGHT_SPECTRUM, &all).unwrap(),
        table.get_weights(WEIGHT_SPECTRUM, &all).unwrap()
    );
}

#[test]
fn opening_a_missing_snapshot_fails() {
    let result = MemTable::open("/definitely/not/here.blsm");
    assert!(matches!(result, Err(TableError::NotFound(_))));
}
