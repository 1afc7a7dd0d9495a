// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Baseline-length-dependent smoothing of radio interferometric visibilities.

Short baselines see propagation noise (principally the ionosphere) vary
slowly, so their visibilities can be smoothed hard in time without
decorrelating; long baselines get little or no smoothing. The `smooth`
function applies this adaptive smoothing to any [VisTable], and
[WorkerPool] is a small bounded thread pool for fanning out independent
jobs around it.
 */

pub mod cli;
pub mod io;
pub mod pool;
pub mod smooth;

// Re-exports.
pub use cli::BlsmoothError;
pub use io::{MemTable, VisTable, UVW};
pub use pool::WorkerPool;
pub use smooth::{smooth, SmoothParams, SmoothSummary};

/// A shorthand for a complex number with `f32` components, the precision
/// visibilities are stored in.
#[allow(non_camel_case_types)]
pub type c32 = num_complex::Complex<f32>;
