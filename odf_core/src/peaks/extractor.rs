//! Per-voxel peak search.
//!
//! A voxel's sampled function goes through these stages, in order:
//!
//! 1. GFA gate: a voxel below `gfa_threshold` is not searched. Its raw
//!    maximum still feeds the global maximum.
//! 2. Local maxima with respect to the catalog's neighbor relation.
//! 3. Sort by descending value. Ties go to the lower direction index.
//! 4. Relative threshold against the best candidate.
//! 5. Greedy angular deduplication, walking the candidates in sorted order.
//! 6. Truncation to `max_peaks`.
//! 7. Optional rescaling so that the top peak becomes 1.
//!
//! Deduplication only compares against already accepted peaks, so the result
//! depends on candidate order: a candidate close to a rejected one survives.

use ndarray::ArrayView1;
use odf_peaks_shared::DirectionAngle;

use super::record::{Peak, PeakRecord};
use crate::config::PeakConfig;
use crate::error::{PeakError, PeakResult};
use crate::metrics::gfa;
use crate::sphere::SphericalDirectionSet;

/// Result of searching one voxel.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelOutcome {
    pub record: PeakRecord,
    /// Un-normalized values of the retained peaks, aligned with the record
    pub raw_values: Vec<f64>,
    /// Value this voxel offers to the global maximum, if any
    pub contribution: Option<f64>,
    /// The GFA gate skipped the search
    pub gated: bool,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    value: f64,
}

/// Extracts peaks from sampled functions over a fixed direction set.
#[derive(Debug, Clone)]
pub struct PeakExtractor {
    config: PeakConfig,
    sphere: SphericalDirectionSet,
    measure: DirectionAngle,
}

impl PeakExtractor {
    /// Validates `config` up front; extraction itself never fails on it.
    pub fn new(config: PeakConfig, sphere: SphericalDirectionSet) -> PeakResult<Self> {
        config.validate()?;
        if sphere.is_empty() {
            return Err(PeakError::invalid_direction_set("no directions to sample"));
        }
        let measure = config.angle_measure();
        Ok(Self {
            config,
            sphere,
            measure,
        })
    }

    pub fn config(&self) -> &PeakConfig {
        &self.config
    }

    pub fn sphere(&self) -> &SphericalDirectionSet {
        &self.sphere
    }

    /// Search one sampled function, computing its GFA for the gate.
    pub fn extract(&self, sampled: ArrayView1<f64>) -> PeakResult<VoxelOutcome> {
        if sampled.len() != self.sphere.len() {
            return Err(PeakError::shape_mismatch(
                self.sphere.len(),
                sampled.len(),
                "sampled function length",
            ));
        }
        Ok(self.evaluate(sampled, gfa(sampled)))
    }

    /// Search one sampled function of catalog length with a precomputed GFA.
    pub(crate) fn evaluate(&self, sampled: ArrayView1<f64>, gfa: f64) -> VoxelOutcome {
        let capacity = self.config.max_peaks;

        if gfa < self.config.gfa_threshold {
            let raw_max = sampled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            return VoxelOutcome {
                record: PeakRecord::empty(capacity),
                raw_values: Vec::new(),
                contribution: raw_max.is_finite().then_some(raw_max),
                gated: true,
            };
        }

        let accepted = self.search(sampled);
        let raw_values: Vec<f64> = accepted.iter().map(|c| c.value).collect();
        let contribution = raw_values.first().copied();

        let top = contribution.unwrap_or(1.0);
        let peaks = accepted.iter().map(|c| {
            let direction = self.sphere.vertex(c.index);
            if self.config.normalize {
                let value = c.value / top;
                Peak {
                    direction: direction * value,
                    value,
                    index: c.index,
                }
            } else {
                Peak {
                    direction,
                    value: c.value,
                    index: c.index,
                }
            }
        });

        VoxelOutcome {
            record: PeakRecord::from_peaks(capacity, peaks),
            raw_values,
            contribution,
            gated: false,
        }
    }

    fn search(&self, sampled: ArrayView1<f64>) -> Vec<Candidate> {
        let (lo, hi) = sampled
            .iter()
            .filter(|v| !v.is_nan())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        // Flat or all-NaN functions have no peaks.
        if !(hi > lo) {
            return Vec::new();
        }

        let mut candidates = self.local_maxima(sampled);
        candidates.sort_by(|a, b| {
            b.value
                .total_cmp(&a.value)
                .then_with(|| a.index.cmp(&b.index))
        });

        let Some(best) = candidates.first().map(|c| c.value) else {
            return candidates;
        };
        let floor = self.config.relative_threshold * best;
        candidates.retain(|c| c.value >= floor);

        let mut accepted: Vec<Candidate> = Vec::with_capacity(self.config.max_peaks);
        for candidate in candidates {
            if accepted.len() == self.config.max_peaks {
                break;
            }
            let separated = accepted.iter().all(|kept| {
                self.sphere.angle_deg(candidate.index, kept.index, self.measure)
                    >= self.config.min_separation_deg
            });
            if separated {
                accepted.push(candidate);
            }
        }
        accepted
    }

    fn local_maxima(&self, sampled: ArrayView1<f64>) -> Vec<Candidate> {
        sampled
            .iter()
            .enumerate()
            .filter(|&(i, &value)| {
                value > 0.0
                    && value.is_finite()
                    && self
                        .sphere
                        .neighbors(i)
                        .iter()
                        .all(|&j| !(sampled[j] > value))
            })
            .map(|(index, &value)| Candidate { index, value })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use ndarray::arr1;

    fn ring() -> SphericalDirectionSet {
        SphericalDirectionSet::from_vertices(vec![
            DVec3::X,
            DVec3::Y,
            DVec3::NEG_X,
            DVec3::NEG_Y,
        ])
        .unwrap()
    }

    fn extractor(config: PeakConfig) -> PeakExtractor {
        PeakExtractor::new(config, ring()).unwrap()
    }

    fn scenario_config(symmetric: bool) -> PeakConfig {
        PeakConfig {
            max_peaks: 2,
            relative_threshold: 0.5,
            min_separation_deg: 30.0,
            symmetric,
            ..PeakConfig::default()
        }
    }

    #[test]
    fn antipodal_peak_is_suppressed_when_symmetric() {
        let outcome = extractor(scenario_config(true))
            .extract(arr1(&[1.0, 0.2, 0.9, 0.1]).view())
            .unwrap();
        assert_eq!(outcome.record.len(), 1);
        assert_eq!(outcome.record.index(0), 0);
        assert_eq!(outcome.record.value(0), 1.0);
        assert_eq!(outcome.contribution, Some(1.0));
    }

    #[test]
    fn antipodal_peak_is_kept_on_great_circle_measure() {
        let outcome = extractor(scenario_config(false))
            .extract(arr1(&[1.0, 0.2, 0.9, 0.1]).view())
            .unwrap();
        let found: Vec<(i64, f64)> = (0..2)
            .map(|k| (outcome.record.index(k), outcome.record.value(k)))
            .collect();
        assert_eq!(found, vec![(0, 1.0), (2, 0.9)]);
        assert_eq!(outcome.record.direction(1), DVec3::NEG_X);
    }

    #[test]
    fn flat_and_zero_functions_have_no_peaks() {
        let extractor = extractor(PeakConfig::default());
        for values in [[0.0; 4], [0.6; 4]] {
            let outcome = extractor.extract(arr1(&values).view()).unwrap();
            assert!(outcome.record.is_empty());
            assert_eq!(outcome.contribution, None);
            assert!(!outcome.gated);
        }
    }

    #[test]
    fn ties_prefer_lower_index() {
        let config = PeakConfig {
            min_separation_deg: 0.0,
            max_peaks: 1,
            symmetric: false,
            ..PeakConfig::default()
        };
        let outcome = extractor(config)
            .extract(arr1(&[0.7, 0.1, 0.7, 0.1]).view())
            .unwrap();
        assert_eq!(outcome.record.index(0), 0);
    }

    #[test]
    fn threshold_keeps_equal_values() {
        let config = PeakConfig {
            relative_threshold: 0.5,
            symmetric: false,
            ..PeakConfig::default()
        };
        let outcome = extractor(config)
            .extract(arr1(&[1.0, 0.1, 0.5, 0.1]).view())
            .unwrap();
        assert_eq!(outcome.record.len(), 2);
        assert_eq!(outcome.record.value(1), 0.5);
    }

    #[test]
    fn normalization_rescales_values_and_directions() {
        let config = PeakConfig {
            normalize: true,
            symmetric: false,
            ..PeakConfig::default()
        };
        let outcome = extractor(config)
            .extract(arr1(&[2.0, 0.1, 1.5, 0.1]).view())
            .unwrap();
        assert_eq!(outcome.record.value(0), 1.0);
        assert_eq!(outcome.record.value(1), 0.75);
        assert!((outcome.record.direction(1) - DVec3::NEG_X * 0.75).length() < 1e-12);
        assert_eq!(outcome.raw_values, vec![2.0, 1.5]);
        assert_eq!(outcome.contribution, Some(2.0));
    }

    #[test]
    fn gated_voxel_contributes_raw_maximum() {
        let config = PeakConfig {
            gfa_threshold: 2.0,
            ..PeakConfig::default()
        };
        let outcome = extractor(config)
            .extract(arr1(&[0.3, 0.8, 0.1, 0.2]).view())
            .unwrap();
        assert!(outcome.gated);
        assert!(outcome.record.is_empty());
        assert_eq!(outcome.contribution, Some(0.8));
    }

    #[test]
    fn nan_samples_are_never_peaks() {
        let config = PeakConfig {
            symmetric: false,
            ..PeakConfig::default()
        };
        let outcome = extractor(config)
            .extract(arr1(&[f64::NAN, 0.1, 0.9, 0.1]).view())
            .unwrap();
        assert_eq!(outcome.record.len(), 1);
        assert_eq!(outcome.record.index(0), 2);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = extractor(PeakConfig::default())
            .extract(arr1(&[1.0, 0.0]).view())
            .unwrap_err();
        assert!(matches!(err, PeakError::ShapeMismatch { .. }));
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = PeakConfig {
            max_peaks: 0,
            ..PeakConfig::default()
        };
        assert!(PeakExtractor::new(config, ring()).is_err());
    }
}
