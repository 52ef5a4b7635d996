#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Diffusion MRI streamline manipulation.
//!
//! A streamline is an ordered sequence of 3D points tracing a reconstructed
//! fiber pathway. The [`geom`] module holds the point-sequence kernel
//! (length, resampling, compression, smoothing, reorientation, distance,
//! content hashing, affine transforms). [`streamline`] wraps it in the
//! [`Streamline`] and [`Streamlines`] types, and [`io`] persists collections
//! to TrackVis `.trk` files.
//!
//! ```ignore
//! use streamlines::{Streamlines, io::{self, Space}};
//!
//! let mut bundle = io::load("bundle.trk", Space::Physical)?;
//! bundle.filter(Some(20.0)).smooth(Default::default());
//! io::save(&bundle, "bundle_smooth.trk")?;
//! ```

pub mod cli;
pub mod geom;
pub mod io;
pub mod streamline;

pub use streamline::{Streamline, StreamlineData, StreamlineError, Streamlines};

/// Installs a stderr log subscriber for command line use.
///
/// Library code only talks to the `log` facade; the `tracing-subscriber`
/// fmt layer picks those records up through its `tracing-log` bridge.
/// Calling this twice is harmless, the second call is ignored.
pub fn init_logger(verbose: bool) {
    use tracing_subscriber::filter::LevelFilter;

    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
