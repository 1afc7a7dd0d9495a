// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. Only two things should be public here:
//! [Blsmooth] and [BlsmoothError].

mod error;

pub use error::BlsmoothError;

use std::path::PathBuf;

use clap::Parser;
use log::info;

use crate::{
    io::{MemTable, DATA, SMOOTHED_DATA},
    smooth::{smooth, SmoothParams},
};

#[derive(Debug, Parser)]
#[clap(
    version,
    about = "Smooth visibilities according to baseline length: shorter baselines are smoothed more."
)]
#[clap(infer_long_args = true)]
pub struct Blsmooth {
    /// Path to the visibility table to smooth.
    #[clap(name = "TABLE", parse(from_os_str))]
    table: PathBuf,

    /// An indication of how strong the ionosphere is; scales the smoothing
    /// bandwidth.
    #[clap(short = 'f', long, default_value = "0.2")]
    ionfactor: f64,

    /// An indication of how the smoothing varies with baseline length.
    #[clap(short = 's', long, default_value = "0.5")]
    bscalefactor: f64,

    /// Column name to smooth.
    #[clap(short, long, default_value = DATA)]
    incol: String,

    /// Output column.
    #[clap(short, long, default_value = SMOOTHED_DATA)]
    outcol: String,

    /// Save the newly computed weights; this permanently modifies the
    /// table.
    #[clap(short = 'w', long)]
    save_weights: bool,

    /// If a weight backup column exists, restore it before smoothing.
    #[clap(short, long)]
    restore: bool,

    /// Don't back the old weights up before overwriting them.
    #[clap(short = 'b', long)]
    no_backup: bool,

    /// Smooth only amplitudes, keeping the original phases.
    #[clap(short = 'a', long)]
    only_amp: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,
}

impl Blsmooth {
    pub fn run(self) -> Result<(), BlsmoothError> {
        setup_logging(self.verbosity);
        info!("blsmooth {}", env!("CARGO_PKG_VERSION"));

        let mut table = MemTable::open(&self.table)?;
        let params = SmoothParams {
            ionfactor: self.ionfactor,
            bscalefactor: self.bscalefactor,
            incol: self.incol,
            outcol: self.outcol,
            save_weights: self.save_weights,
            restore_weights: self.restore,
            no_weight_backup: self.no_backup,
            amp_only: self.only_amp,
        };
        smooth(&mut table, &params)?;
        table.save(&self.table)?;
        info!("Done.");
        Ok(())
    }
}

/// Activate the logger. Use colours if we're on a tty and source code lines
/// when the verbosity warrants it.
fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    // Tests and library callers may have installed a logger already; that's
    // fine.
    let _ = builder.try_init();
}
