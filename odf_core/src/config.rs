//! Sweep configuration management via TOML files.
//!
//! Every key is optional; missing keys fall back to the documented defaults.
//! Parsed configurations are validated eagerly so that no sweep ever starts
//! with an invalid parameter set.

use std::fs;
use std::path::Path;

use odf_peaks_shared::DirectionAngle;
use serde::{Deserialize, Serialize};

use crate::error::{PeakError, PeakResult};

/// Parameters of the per-voxel peak search.
///
/// # Examples
///
/// ```
/// use odf_peaks_core::PeakConfig;
///
/// let config = PeakConfig {
///     max_peaks: 3,
///     ..PeakConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakConfig {
    /// Maximum number of retained peaks per voxel (K)
    pub max_peaks: usize,
    /// Relative threshold τ in (0, 1], applied against the best candidate
    pub relative_threshold: f64,
    /// Minimum angular separation between retained peaks, in degrees
    pub min_separation_deg: f64,
    /// Voxels whose GFA is below this value are not searched
    pub gfa_threshold: f64,
    /// Rescale each voxel so that its top peak has value 1
    pub normalize: bool,
    /// Treat antipodal directions as the same fibre when deduplicating
    pub symmetric: bool,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            max_peaks: 5,
            relative_threshold: 0.5,
            min_separation_deg: 25.0,
            gfa_threshold: 0.0,
            normalize: false,
            symmetric: true,
        }
    }
}

impl PeakConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> PeakResult<()> {
        if self.max_peaks < 1 {
            return Err(PeakError::invalid_config(
                "max_peaks",
                self.max_peaks,
                "must be >= 1",
            ));
        }
        if !(self.relative_threshold > 0.0 && self.relative_threshold <= 1.0) {
            return Err(PeakError::invalid_config(
                "relative_threshold",
                self.relative_threshold,
                "must be in (0, 1]",
            ));
        }
        if !self.min_separation_deg.is_finite() || self.min_separation_deg < 0.0 {
            return Err(PeakError::invalid_config(
                "min_separation_deg",
                self.min_separation_deg,
                "must be a finite angle >= 0",
            ));
        }
        if self.gfa_threshold.is_nan() {
            return Err(PeakError::invalid_config(
                "gfa_threshold",
                self.gfa_threshold,
                "must be a number",
            ));
        }
        Ok(())
    }

    /// Angle measure used for deduplication.
    pub fn angle_measure(&self) -> DirectionAngle {
        if self.symmetric {
            DirectionAngle::Axial
        } else {
            DirectionAngle::GreatCircle
        }
    }
}

/// Direction catalog settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SphereConfig {
    /// Icosahedron subdivision depth of the standard catalog
    pub subdivisions: u32,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            subdivisions: crate::sphere::STANDARD_SUBDIVISIONS,
        }
    }
}

impl SphereConfig {
    fn validate(&self) -> PeakResult<()> {
        if self.subdivisions > crate::sphere::MAX_SUBDIVISIONS {
            return Err(PeakError::invalid_config(
                "sphere.subdivisions",
                self.subdivisions,
                format!("must be <= {}", crate::sphere::MAX_SUBDIVISIONS),
            ));
        }
        Ok(())
    }
}

/// Full sweep configuration loaded from a TOML file.
///
/// ```toml
/// [peaks]
/// max_peaks = 5
/// relative_threshold = 0.5
/// min_separation_deg = 25.0
/// gfa_threshold = 0.0
/// normalize = false
///
/// [sphere]
/// subdivisions = 3
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SweepConfig {
    pub peaks: PeakConfig,
    pub sphere: SphereConfig,
}

impl SweepConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    /// Parse and validate a configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let raw: RawSweepConfig =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;

        let config = Self {
            peaks: raw.peaks.into(),
            sphere: SphereConfig {
                subdivisions: raw.sphere.subdivisions,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PeakResult<()> {
        self.peaks.validate()?;
        self.sphere.validate()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSweepConfig {
    #[serde(default)]
    peaks: RawPeaks,
    #[serde(default)]
    sphere: RawSphere,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPeaks {
    #[serde(default = "default_max_peaks")]
    max_peaks: usize,
    #[serde(default = "default_relative_threshold")]
    relative_threshold: f64,
    #[serde(default = "default_min_separation_deg")]
    min_separation_deg: f64,
    #[serde(default)]
    gfa_threshold: f64,
    #[serde(default)]
    normalize: bool,
    #[serde(default = "default_symmetric")]
    symmetric: bool,
}

impl Default for RawPeaks {
    fn default() -> Self {
        Self {
            max_peaks: default_max_peaks(),
            relative_threshold: default_relative_threshold(),
            min_separation_deg: default_min_separation_deg(),
            gfa_threshold: 0.0,
            normalize: false,
            symmetric: default_symmetric(),
        }
    }
}

impl From<RawPeaks> for PeakConfig {
    fn from(raw: RawPeaks) -> Self {
        Self {
            max_peaks: raw.max_peaks,
            relative_threshold: raw.relative_threshold,
            min_separation_deg: raw.min_separation_deg,
            gfa_threshold: raw.gfa_threshold,
            normalize: raw.normalize,
            symmetric: raw.symmetric,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSphere {
    #[serde(default = "default_subdivisions")]
    subdivisions: u32,
}

impl Default for RawSphere {
    fn default() -> Self {
        Self {
            subdivisions: default_subdivisions(),
        }
    }
}

fn default_max_peaks() -> usize {
    5
}

fn default_relative_threshold() -> f64 {
    0.5
}

fn default_min_separation_deg() -> f64 {
    25.0
}

fn default_symmetric() -> bool {
    true
}

fn default_subdivisions() -> u32 {
    crate::sphere::STANDARD_SUBDIVISIONS
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Invalid(#[from] PeakError),
}
