// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::io::TableError;

#[derive(Error, Debug)]
pub enum SmoothError {
    #[error("Column {0} does not exist in the table")]
    NoSuchColumn(String),

    #[error("The table is not time-ordered (row {row} goes backwards in time); cannot proceed")]
    NotTimeOrdered { row: usize },

    #[error("The spectral window has {num_freqs} reference frequencies, but the data have {num_channels} channels; such tables are not supported")]
    ChannelCountMismatch {
        num_freqs: usize,
        num_channels: usize,
    },

    #[error("Cannot restore the backed-up weights and also save newly-smoothed ones in the same run")]
    ConflictingWeightOptions,

    #[error("The table's sampling interval is {0}; it must be positive and finite")]
    InvalidSamplingInterval(f64),

    #[error(transparent)]
    Table(#[from] TableError),
}
