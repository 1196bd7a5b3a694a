//! # actogram-core
//!
//! Core algorithms for circadian actogram analysis in Rust.
//!
//! This crate provides pure Rust implementations of:
//! - Activity signals with calibrated sampling (smoothing, downsampling, summing, normalization)
//! - Periodograms (Fourier, Enright chi-square, Lomb-Scargle) with significance thresholds
//! - Peak ranking of periodogram responses
//! - Clipped-sine fitting on a multi-resolution pyramid with a bounded Powell optimizer
//! - Activity onset/offset detection via a box-profile dynamic program
//! - Acrophase and average-activity profiles
//! - Phase-drift regression of markers on wrapped (circular) data
//!
//! ## Data Layout
//!
//! A [`Signal`] is a flat vector of samples plus its sampling interval, the
//! nominal period in samples and a display unit. Analyses take a signal and
//! a half-open sample range `from..to`; positions they return are absolute
//! indices into the signal.

#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]

pub mod parallel;

pub mod acrophase;
pub mod average_activity;
pub mod batch;
pub mod config;
pub mod distributions;
pub mod error;
pub mod helpers;
pub mod markers;
pub mod onoffset;
pub mod optimize;
pub mod peaks;
pub mod periodic_line;
pub mod periodogram;
pub mod signal;
pub mod simulation;
pub mod sine_fit;
pub mod smoothing;
pub mod time;

// Re-export commonly used items
pub use error::{AnalysisError, Result};
pub use signal::Signal;
pub use time::{TimeInterval, TimeUnit};

// Re-export analysis entry points
pub use acrophase::{acrophases, acrophases_nominal};
pub use average_activity::{average_activity, average_activity_with, ActivityProfile};
pub use batch::{onset_offset_batch, periodogram_batch, run_batch, Selection};
pub use markers::MarkerSeries;
pub use onoffset::{
    detect_onsets_offsets, detect_onsets_offsets_with, OnsetOffsetSeries, ThresholdMethod,
};
pub use peaks::find_peaks;
pub use periodic_line::{fit_wrapped_line, RegressionLine, WrappedLine};
pub use periodogram::{
    compute_periodogram, periodogram, Periodogram, PeriodogramMethod, PeriodogramPeak,
    PeriodogramResult,
};
pub use sine_fit::{fit_sine, FitParameters, SineFitResult};
pub use smoothing::{gaussian_kernel, make_kernel, uniform_kernel, KernelType};

// Re-export configuration types
pub use config::{
    AnalysisConfig, AverageActivityConfig, OnsetOffsetConfig, PeriodogramConfig, SineFitConfig,
};
