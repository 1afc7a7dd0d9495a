// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Adaptive, baseline-length-dependent smoothing of visibilities.
//!
//! Each baseline group gets a per-channel Gaussian kernel whose width in
//! time scales with the ionosphere factor and inversely with the baseline
//! length. Samples are weighted by `WEIGHT_SPECTRUM` (zero for flagged or
//! NaN data), both the weighted data and the weights are convolved with the
//! kernel, and the ratio of the two is written back: a running weighted
//! average with a Gaussian window.

mod error;
mod kernel;

pub use error::SmoothError;

use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use log::{debug, info};
use ndarray::{azip, parallel::prelude::*, prelude::*};
use num_traits::Zero;
use strum_macros::Display;

use self::kernel::{filter_time, gaussian_kernel};
use crate::{
    c32,
    io::{VisTable, DATA, SMOOTHED_DATA, WEIGHT_SPECTRUM, WEIGHT_SPECTRUM_ORIG},
};

/// The baseline length the bandwidth scaling law is anchored to \[km\].
const REF_DIST_KM: f64 = 25_000.0;
/// The frequency the bandwidth scaling law is anchored to \[Hz\].
const REF_FREQ_HZ: f64 = 60e6;
/// Kernels narrower than this \[samples\] are treated as a no-op; the cost
/// of convolving isn't worth a sub-sample bandwidth.
const MIN_SIGMA_SAMPLES: f64 = 0.5;

/// Immutable parameters for one smoothing run.
#[derive(Debug, Clone)]
pub struct SmoothParams {
    /// How strong the ionosphere is; directly scales the smoothing
    /// bandwidth.
    pub ionfactor: f64,

    /// How the smoothing bandwidth varies with baseline length.
    pub bscalefactor: f64,

    /// The column to smooth.
    pub incol: String,

    /// The column the smoothed data are written to.
    pub outcol: String,

    /// Write the smoothed weights over the live weights. This permanently
    /// alters the stored weights.
    pub save_weights: bool,

    /// Restore the live weights from their backup column (if present)
    /// before smoothing.
    pub restore_weights: bool,

    /// Don't back the live weights up before overwriting them.
    pub no_weight_backup: bool,

    /// Smooth amplitudes only, keeping each sample's original phase.
    pub amp_only: bool,
}

impl Default for SmoothParams {
    fn default() -> SmoothParams {
        SmoothParams {
            ionfactor: 0.2,
            bscalefactor: 0.5,
            incol: DATA.to_string(),
            outcol: SMOOTHED_DATA.to_string(),
            save_weights: false,
            restore_weights: false,
            no_weight_backup: false,
            amp_only: false,
        }
    }
}

impl SmoothParams {
    fn validate(&self) -> Result<(), SmoothError> {
        // Restoring old weights and saving new ones in the same run would
        // have the restore silently win; refuse the combination instead.
        if self.restore_weights && self.save_weights {
            return Err(SmoothError::ConflictingWeightOptions);
        }
        Ok(())
    }
}

/// Why a baseline group was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SkipReason {
    /// The mean baseline length was NaN (missing antenna) or zero
    /// (autocorrelation).
    #[strum(serialize = "degenerate baseline")]
    DegenerateBaseline,

    /// Every channel's bandwidth came out as zero samples.
    #[strum(serialize = "zero bandwidth")]
    ZeroBandwidth,

    /// Every channel's bandwidth was under half a sample.
    #[strum(serialize = "negligible bandwidth")]
    NegligibleBandwidth,
}

/// What happened to one baseline group.
#[derive(Debug, Clone, PartialEq)]
pub enum BaselineResult {
    Smoothed {
        /// The group's mean baseline length \[km\].
        dist_km: f64,
        /// The widest per-channel kernel sigma \[samples\].
        max_sigma: f64,
    },
    Skipped(SkipReason),
}

/// One baseline group's outcome.
#[derive(Debug, Clone)]
pub struct BaselineOutcome {
    pub antenna1: u32,
    pub antenna2: u32,
    pub num_rows: usize,
    pub result: BaselineResult,
}

/// A run report: one outcome per baseline group, in iteration order.
#[derive(Debug, Clone, Default)]
pub struct SmoothSummary {
    pub outcomes: Vec<BaselineOutcome>,
}

impl SmoothSummary {
    pub fn num_smoothed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, BaselineResult::Smoothed { .. }))
            .count()
    }

    pub fn num_skipped(&self) -> usize {
        self.outcomes.len() - self.num_smoothed()
    }
}

/// Smooth `params.incol` into `params.outcol`, in place on the table.
///
/// The table must be time-ordered across *all* rows, not just within each
/// baseline; anything else is an error before any column is touched.
/// Degenerate baseline groups (autocorrelations, missing antennas,
/// negligible bandwidths) are skipped and tagged in the returned
/// [SmoothSummary]; the rest of the table is still processed.
pub fn smooth<T: VisTable>(table: &mut T, params: &SmoothParams) -> Result<SmoothSummary, SmoothError> {
    params.validate()?;

    if !table.has_data_column(&params.incol) {
        return Err(SmoothError::NoSuchColumn(params.incol.clone()));
    }

    let freqs_hz: Vec<f64> = table.ref_freqs_hz().clone().into_vec();
    if freqs_hz.len() != table.num_channels() {
        return Err(SmoothError::ChannelCountMismatch {
            num_freqs: freqs_hz.len(),
            num_channels: table.num_channels(),
        });
    }

    let time_res = table.time_res();
    if !time_res.is_finite() || time_res <= 0.0 {
        return Err(SmoothError::InvalidSamplingInterval(time_res));
    }

    // A NaN timestamp can't be placed in the ordering; reject it too.
    if let Some(i) = table
        .times()
        .iter()
        .tuple_windows()
        .position(|(t0, t1)| t1 < t0 || !t0.is_finite() || !t1.is_finite())
    {
        return Err(SmoothError::NotTimeOrdered { row: i + 1 });
    }

    // Column and weight preparation must complete before any per-group
    // work; schema mutation can't overlap with group reads.
    prepare_columns(table, params)?;

    let groups = table.baseline_groups();
    let progress = ProgressBar::new(groups.len() as _)
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:10}: [{wide_bar:.blue}] {pos:4}/{len:4} baselines")
                .unwrap()
                .progress_chars("=> "),
        )
        .with_message("Smoothing");

    let mut summary = SmoothSummary::default();
    for ((ant1, ant2), rows) in groups {
        let result = smooth_group(table, params, &freqs_hz, time_res, &rows)?;
        match &result {
            BaselineResult::Smoothed { dist_km, max_sigma } => {
                debug!("{ant1} - {ant2}: dist = {dist_km:.1} km: sigma = {max_sigma:.2} samples");
            }
            BaselineResult::Skipped(reason) => {
                debug!("{ant1} - {ant2}: skipped ({reason})");
            }
        }
        summary.outcomes.push(BaselineOutcome {
            antenna1: ant1,
            antenna2: ant2,
            num_rows: rows.len(),
            result,
        });
        progress.inc(1);
    }
    progress.finish_and_clear();

    info!(
        "Smoothed {} baseline group(s), skipped {}",
        summary.num_smoothed(),
        summary.num_skipped()
    );
    Ok(summary)
}

/// Ensure the output column exists (cloning the input column's layout) and
/// holds the input column's current values, then sort out the weight
/// backup/restore bookkeeping. Repeated runs redo the same copies.
fn prepare_columns<T: VisTable>(table: &mut T, params: &SmoothParams) -> Result<(), SmoothError> {
    if !table.has_data_column(&params.outcol) {
        info!("Adding column {}", params.outcol);
        table.add_data_column_like(&params.incol, &params.outcol)?;
    }
    if params.outcol != params.incol {
        info!("Setting {} = {}", params.outcol, params.incol);
        table.copy_data_column(&params.incol, &params.outcol)?;
    }

    if params.restore_weights && table.has_weight_column(WEIGHT_SPECTRUM_ORIG) {
        info!("Restoring {WEIGHT_SPECTRUM} from {WEIGHT_SPECTRUM_ORIG}");
        table.copy_weight_column(WEIGHT_SPECTRUM_ORIG, WEIGHT_SPECTRUM)?;
    } else if params.save_weights && !params.no_weight_backup {
        info!("Backing up {WEIGHT_SPECTRUM} into {WEIGHT_SPECTRUM_ORIG}");
        table.add_weight_column_like(WEIGHT_SPECTRUM, WEIGHT_SPECTRUM_ORIG)?;
        table.copy_weight_column(WEIGHT_SPECTRUM, WEIGHT_SPECTRUM_ORIG)?;
    }
    Ok(())
}

/// The per-channel kernel sigma \[samples\] for a baseline of the given mean
/// length.
fn sigma_samples(params: &SmoothParams, freqs_hz: &[f64], dist_km: f64, time_res: f64) -> Vec<f64> {
    freqs_hz
        .iter()
        .map(|freq| {
            let sigma_seconds = params.ionfactor
                * (REF_DIST_KM / dist_km).powf(params.bscalefactor)
                * (freq / REF_FREQ_HZ);
            sigma_seconds / time_res
        })
        .collect()
}

fn smooth_group<T: VisTable>(
    table: &mut T,
    params: &SmoothParams,
    freqs_hz: &[f64],
    time_res: f64,
    rows: &[usize],
) -> Result<BaselineResult, SmoothError> {
    let uvws = table.get_uvws(rows)?;
    let dist_km = uvws.iter().map(|uvw| uvw.length()).sum::<f64>() / uvws.len() as f64 / 1e3;
    if dist_km.is_nan() || dist_km == 0.0 {
        return Ok(BaselineResult::Skipped(SkipReason::DegenerateBaseline));
    }

    let sigma = sigma_samples(params, freqs_hz, dist_km, time_res);
    if sigma.iter().all(|&s| s == 0.0) {
        return Ok(BaselineResult::Skipped(SkipReason::ZeroBandwidth));
    }
    if sigma.iter().all(|&s| s < MIN_SIGMA_SAMPLES) {
        return Ok(BaselineResult::Skipped(SkipReason::NegligibleBandwidth));
    }

    let mut data = table.get_data(&params.outcol, rows)?;
    let mut weights = table.get_weights(WEIGHT_SPECTRUM, rows)?;
    let flags = table.get_flags(rows)?;
    // The flag zeroing below is working state; a save must not leak it into
    // channels that end up passed through.
    let stored_weights = params.save_weights.then(|| weights.clone());

    // NaN data is as good as flagged, and flagged data carries no weight.
    azip!((w in &mut weights, &d in &data, &f in &flags) {
        if f || d.re.is_nan() || d.im.is_nan() {
            *w = 0.0;
        }
    });

    // Channels are independent; fan the per-channel convolutions out. A
    // channel under the sigma threshold is passed through untouched.
    data.axis_iter_mut(Axis(1))
        .into_par_iter()
        .zip(weights.axis_iter_mut(Axis(1)).into_par_iter())
        .zip(sigma.par_iter())
        .for_each(|((data_tp, weights_tp), &sigma)| {
            if sigma >= MIN_SIGMA_SAMPLES {
                smooth_channel(data_tp, weights_tp, sigma, params.amp_only);
            }
        });

    table.put_data(&params.outcol, rows, data.view())?;
    if let Some(stored) = stored_weights {
        // Pass-through channels keep their stored weights.
        for (ch, _) in sigma
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s < MIN_SIGMA_SAMPLES)
        {
            weights
                .index_axis_mut(Axis(1), ch)
                .assign(&stored.index_axis(Axis(1), ch));
        }
        table.put_weights(WEIGHT_SPECTRUM, rows, weights.view())?;
    }

    let max_sigma = sigma.iter().copied().fold(0.0, f64::max);
    Ok(BaselineResult::Smoothed { dist_km, max_sigma })
}

/// Smooth one channel's (time, polarisation) plane in place, overwriting
/// `weights` with their smoothed counterpart.
fn smooth_channel(
    mut data: ArrayViewMut2<c32>,
    mut weights: ArrayViewMut2<f32>,
    sigma: f64,
    amp_only: bool,
) {
    let kernel = gaussian_kernel(sigma);

    // Weighted data, with 0*inf artefacts neutralised so they can't leak
    // into the convolution.
    let mut wdata = Array2::<c32>::zeros(data.raw_dim());
    azip!((wd in &mut wdata, &d in &data, &w in &weights) {
        let v = d * w;
        *wd = if v.re.is_finite() && v.im.is_finite() {
            v
        } else {
            c32::zero()
        };
    });

    let smoothed_weights = filter_time(weights.view(), &kernel);

    let smoothed_wdata = if amp_only {
        // Smoothed magnitude, phase taken from the unsmoothed samples.
        let amp = filter_time(wdata.mapv(|v| v.norm()).view(), &kernel);
        let mut out = Array2::<c32>::zeros(data.raw_dim());
        azip!((o in &mut out, &a in &amp, &v in &wdata) {
            let phase = v.im.atan2(v.re);
            *o = c32::new(a * phase.cos(), a * phase.sin());
        });
        out
    } else {
        let re = filter_time(wdata.mapv(|v| v.re).view(), &kernel);
        let im = filter_time(wdata.mapv(|v| v.im).view(), &kernel);
        let mut out = Array2::<c32>::zeros(data.raw_dim());
        azip!((o in &mut out, &r in &re, &i in &im) {
            *o = c32::new(r, i);
        });
        out
    };

    // Nadaraya-Watson: normalise by the smoothed weight where it's
    // non-zero; where it is zero the numerator stands (defined, not NaN).
    azip!((d in &mut data, &n in &smoothed_wdata, &sw in &smoothed_weights) {
        *d = if sw != 0.0 { n / sw } else { n };
    });
    weights.assign(&smoothed_weights);
}
