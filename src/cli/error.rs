// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all blsmooth-related errors.

use thiserror::Error;

use crate::{io::TableError, smooth::SmoothError};

#[derive(Error, Debug)]
pub enum BlsmoothError {
    #[error("{0}")]
    Table(#[from] TableError),

    #[error("{0}")]
    Smooth(#[from] SmoothError),

    #[error("{0}")]
    IO(#[from] std::io::Error),
}
