//! Error types for configuration and per-item processing.

use std::path::PathBuf;

/// Invalid configuration. Fatal at startup: every item would fail identically.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A parameter that must be strictly positive (and finite) is not.
    #[error("{field} must be positive and finite, got {value}")]
    NonPositive {
        /// Dotted path of the offending field, e.g. `vesselness.gamma`.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
    /// The sigma range contains no scale.
    #[error("empty scale range: sigma_min {sigma_min} > sigma_max {sigma_max}")]
    EmptyScaleRange {
        /// Lower end of the range.
        sigma_min: f64,
        /// Upper end of the range.
        sigma_max: f64,
    },
    /// Otsu needs at least two histogram bins.
    #[error("threshold histogram needs at least 2 bins, got {bins}")]
    TooFewBins {
        /// Requested bin count.
        bins: usize,
    },
    /// A configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    Parse(String),
    /// A configuration file could not be read.
    #[error("cannot read configuration file {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while processing one batch item.
///
/// Everything except [`SegmentError::Config`] is local to a single item: the
/// batch driver records it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    /// A required raster does not exist.
    #[error("missing input: {}", path.display())]
    MissingInput {
        /// Expected location of the raster.
        path: PathBuf,
    },
    /// A raster exists but could not be decoded.
    #[error("cannot decode {}: {source}", path.display())]
    ImageDecode {
        /// Raster path.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: image::ImageError,
    },
    /// The segmentation could not be written.
    #[error("cannot write {}: {source}", path.display())]
    Write {
        /// Output path.
        path: PathBuf,
        /// Encoder / filesystem error.
        #[source]
        source: image::ImageError,
    },
    /// The output directory could not be created.
    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        /// Directory path.
        path: PathBuf,
        /// Filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// Rasters used together disagree in size.
    #[error("dimension mismatch for {what}: expected {}x{}, found {}x{}", expected[0], expected[1], found[0], found[1])]
    DimensionMismatch {
        /// Which raster disagreed.
        what: &'static str,
        /// Reference size `[width, height]`.
        expected: [u32; 2],
        /// Actual size `[width, height]`.
        found: [u32; 2],
    },
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Check that `found` matches `expected`, naming the raster on failure.
pub(crate) fn ensure_same_size(
    what: &'static str,
    expected: (u32, u32),
    found: (u32, u32),
) -> Result<(), SegmentError> {
    if expected == found {
        Ok(())
    } else {
        Err(SegmentError::DimensionMismatch {
            what,
            expected: [expected.0, expected.1],
            found: [found.0, found.1],
        })
    }
}
