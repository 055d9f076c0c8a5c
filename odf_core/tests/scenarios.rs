use glam::DVec3;
use ndarray::{arr1, Array, Array2, ArrayD, IxDyn};
use odf_peaks_core::field::{flatten, unflatten, VoxelMask};
use odf_peaks_core::{
    gfa, GlobalMaxTracker, PeakConfig, PeakError, PeakExtractor, PeakSweep,
    SphericalBasisProjector, SphericalDirectionSet,
};

/// Four directions on the equator at 0°, 90°, 180° and 270°.
fn equator() -> SphericalDirectionSet {
    SphericalDirectionSet::from_vertices(vec![DVec3::X, DVec3::Y, DVec3::NEG_X, DVec3::NEG_Y])
        .expect("distinct directions")
}

fn ring_config(symmetric: bool) -> PeakConfig {
    PeakConfig {
        max_peaks: 2,
        relative_threshold: 0.5,
        min_separation_deg: 30.0,
        symmetric,
        ..PeakConfig::default()
    }
}

#[test]
fn great_circle_ring_keeps_both_maxima() {
    let extractor = PeakExtractor::new(ring_config(false), equator()).unwrap();
    let outcome = extractor.extract(arr1(&[1.0, 0.2, 0.9, 0.1]).view()).unwrap();

    let record = outcome.record;
    assert_eq!(record.len(), 2);
    assert_eq!((record.index(0), record.value(0)), (0, 1.0));
    assert_eq!((record.index(1), record.value(1)), (2, 0.9));
    assert_eq!(record.direction(0), DVec3::X);
    assert_eq!(record.direction(1), DVec3::NEG_X);
}

#[test]
fn axial_ring_merges_antipodes() {
    let extractor = PeakExtractor::new(ring_config(true), equator()).unwrap();
    let outcome = extractor.extract(arr1(&[1.0, 0.2, 0.9, 0.1]).view()).unwrap();

    assert_eq!(outcome.record.len(), 1);
    assert_eq!((outcome.record.index(0), outcome.record.value(0)), (0, 1.0));
    assert_eq!(outcome.record.index(1), -1);
}

#[test]
fn all_zero_function_is_not_an_error() {
    let sphere = SphericalDirectionSet::icosphere(2);
    let zeros = Array::zeros(sphere.len());
    let extractor = PeakExtractor::new(PeakConfig::default(), sphere).unwrap();

    let outcome = extractor.extract(zeros.view()).unwrap();
    assert!(outcome.record.is_empty());
    assert_eq!(gfa(zeros.view()), 0.0);
}

#[test]
fn ten_voxel_mask_round_trips() {
    let mask = VoxelMask::full(&[2, 5]);
    let compact = Array::from_iter(0..10).mapv(|v| v as f64).into_dyn();

    let dense = unflatten(compact.view(), &mask).unwrap();
    assert_eq!(dense.shape(), &[2, 5]);
    assert_eq!(dense[[1, 3]], 8.0);
    assert_eq!(flatten(dense.view(), &mask).unwrap(), compact);
}

#[test]
fn coefficient_count_determines_order() {
    let sphere = SphericalDirectionSet::icosphere(1);
    assert_eq!(SphericalBasisProjector::new(15, &sphere).unwrap().order(), 4);
    assert!(matches!(
        SphericalBasisProjector::new(14, &sphere),
        Err(PeakError::InvalidCoefficientCount { ncoef: 14 })
    ));
}

#[test]
fn gated_voxel_feeds_global_maximum_without_peaks() {
    let config = PeakConfig {
        gfa_threshold: 0.5,
        ..PeakConfig::default()
    };
    let extractor = PeakExtractor::new(config, equator()).unwrap();
    let voxels = [
        arr1(&[0.4, 0.1, 0.1, 0.1]),
        arr1(&[0.3, 0.3, 0.3, 0.31]),
        arr1(&[0.9, 0.1, 0.1, 0.1]),
    ];
    let outcomes: Vec<_> = voxels
        .iter()
        .map(|v| extractor.extract(v.view()).unwrap())
        .collect();

    assert!(!outcomes[0].gated);
    assert!(outcomes[1].gated);
    assert!(outcomes[1].record.is_empty());
    assert!(!outcomes[2].gated);

    let tracker: GlobalMaxTracker = outcomes.iter().map(|o| o.contribution).collect();
    let global_max = tracker.finalize().unwrap();
    assert_eq!(global_max.value(), 0.9);
    assert_eq!(global_max.qa(outcomes[0].raw_values[0]), 0.4 / 0.9);
}

#[test]
fn sweep_qa_is_relative_to_strongest_voxel() {
    let sweep = PeakSweep::new(PeakConfig::default(), SphericalDirectionSet::icosphere(2)).unwrap();
    let mut coefficients = Array2::<f64>::zeros((2, 6));
    coefficients.row_mut(0).assign(&arr1(&[1.0, 0.0, 0.0, 0.8, 0.0, 0.0]));
    coefficients.row_mut(1).assign(&arr1(&[2.0, 0.0, 0.0, 1.6, 0.0, 0.0]));

    let output = sweep
        .run_compact(coefficients.view(), VoxelMask::full(&[2]))
        .unwrap();
    let qa = output.peaks.arrays().qa();
    assert_eq!(qa[[0, 0]], 0.5);
    assert_eq!(qa[[1, 0]], 1.0);
    assert_eq!(output.summary.global_max, output.peaks.arrays().values()[[1, 0]]);
}

#[test]
fn dense_sweep_result_expands_to_mask_shape() {
    let sweep = PeakSweep::new(PeakConfig::default(), SphericalDirectionSet::icosphere(2)).unwrap();
    let mask = VoxelMask::new(ndarray::array![[true, false, true], [false, true, false]]);
    let mut coefficients = ArrayD::<f64>::zeros(IxDyn(&[2, 3, 6]));
    for (i, j) in [(0, 0), (0, 2), (1, 1)] {
        coefficients[[i, j, 0]] = 1.0;
        coefficients[[i, j, 3]] = 0.6;
    }

    let output = sweep.run(coefficients.view(), mask).unwrap();
    assert_eq!(output.summary.total_voxels, 3);
    assert_eq!(output.summary.voxels_with_peaks, 3);

    let dense = output.peaks.into_dense();
    let arrays = dense.arrays();
    assert_eq!(arrays.values().shape(), &[2, 3, 5]);
    assert_eq!(arrays.indices()[[0, 1, 0]], -1);
    assert_eq!(arrays.gfa()[[1, 0]], 0.0);
    assert!(arrays.values()[[1, 1, 0]] > 0.0);
}
