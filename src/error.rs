//! Error type shared by the statistics kernels, the plotting adapters and the renderer.

use thiserror::Error;

/// Convenience alias for results carrying a [`PlotError`].
pub type PlotResult<T> = Result<T, PlotError>;

/// Everything that can abort a plot.
///
/// No variant is recovered from inside the crate: a failing statistic or a bad option
/// aborts the current plot and is handed back to the caller unchanged.
#[derive(Error, Debug)]
pub enum PlotError {
    /// A statistic was requested on a sample without any (finite) values.
    #[error("Expected a non-empty sample for `{0}`.")]
    EmptySample(String),

    /// An adapter was called without anything to draw.
    #[error("Expected at least one variable to plot.")]
    NothingToPlot,

    /// A statistic could not be computed because the data is degenerate.
    ///
    /// This is raised for constant chains (zero variance) and for samples
    /// that are too small to estimate a density or an interval.
    #[error("Degenerate data: {0}")]
    Degenerate(String),

    /// The credible interval is outside of `(0, 1]`.
    #[error("Credible interval must lie in (0, 1], got {0}.")]
    InvalidCredibleInterval(f64),

    /// The requested point estimate is not one of `mean`, `median` or `mode`.
    #[error("Unknown point estimate `{0}`, expected one of mean, median, mode.")]
    UnknownPointEstimate(String),

    /// An option key is not known to the rcParams.
    #[error("Unknown option `{0}`.")]
    UnknownOption(String),

    /// An option has the wrong type or is out of range.
    #[error("Invalid value for option `{key}`: {reason}")]
    InvalidOption { key: String, reason: String },

    /// The requested grid cannot hold every plot.
    #[error("A {rows}x{cols} grid cannot hold {needed} plots.")]
    GridTooSmall {
        rows: usize,
        cols: usize,
        needed: usize,
    },

    /// More plots were requested than `plot.max_subplots` allows.
    #[error("Refusing to plot {requested} variables, `plot.max_subplots` is {max}.")]
    TooManySubplots { requested: usize, max: usize },

    /// A label produced by the data has no surface in the grid.
    #[error("No axis available for `{0}`.")]
    MissingAxis(String),

    /// A variable requested by name does not exist.
    #[error("Unknown variable `{0}`.")]
    UnknownVariable(String),

    /// A sample file does not have the `chain,sample,dim_*` layout.
    #[error("Malformed sample file at record {record}: {reason}")]
    MalformedRecord { record: usize, reason: String },

    #[error("Min/max error: {0}")]
    MinMax(#[from] ndarray_stats::errors::MinMaxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse rc file: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
