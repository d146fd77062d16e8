//! Integration tests for the pipeline.
//!
//! These tests run the real demo artifacts under `models/` through the
//! loader and the pipeline, the way the server does.

use artifact_loader::{ArtifactCache, ArtifactLoadError, ArtifactPaths};
use pipeline::{
    recommend, Field, ImageCatalog, ImagePreview, RecommendError, Recommender, SoilWeatherSample,
    FEATURE_COUNT,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn model_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models")
}

fn demo_paths() -> ArtifactPaths {
    ArtifactPaths::in_dir(&model_dir()).with_expected_features(FEATURE_COUNT)
}

fn create_recommender() -> Recommender {
    let bundle = artifact_loader::load(&demo_paths()).expect("demo artifacts should load");
    Recommender::new(Arc::new(bundle))
}

fn rice_paddy() -> SoilWeatherSample {
    SoilWeatherSample {
        nitrogen: 90.0,
        phosphorus: 42.0,
        potassium: 43.0,
        ph: 6.5,
        temperature: 20.9,
        humidity: 82.0,
        rainfall: 202.9,
    }
}

#[test]
fn test_known_sample_recommends_rice() {
    let recommender = create_recommender();

    let result = recommender.recommend(rice_paddy()).unwrap();

    assert!(!result.crop.is_empty());
    assert!(recommender.labels().contains(&result.crop));
    assert_eq!(result.crop, "rice");
}

#[test]
fn test_recommendation_is_deterministic() {
    let recommender = create_recommender();

    let first = recommender.recommend(rice_paddy()).unwrap();
    let second = recommender.recommend(rice_paddy()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_in_bounds_samples_always_decode() {
    let recommender = create_recommender();
    let encoder = recommender.artifacts().encoder();

    // min, default and max of every field, in every combination
    let levels = |field: Field| {
        let b = field.bounds();
        [b.min, b.default, b.max]
    };
    let mut checked = 0;
    for n in levels(Field::Nitrogen) {
        for p in levels(Field::Phosphorus) {
            for k in levels(Field::Potassium) {
                for ph in levels(Field::Ph) {
                    for t in levels(Field::Temperature) {
                        for h in levels(Field::Humidity) {
                            for r in levels(Field::Rainfall) {
                                let sample = SoilWeatherSample {
                                    nitrogen: n,
                                    phosphorus: p,
                                    potassium: k,
                                    ph,
                                    temperature: t,
                                    humidity: h,
                                    rainfall: r,
                                };
                                let result = recommender.recommend(sample).unwrap();
                                assert!(encoder.contains(&result.crop));
                                checked += 1;
                            }
                        }
                    }
                }
            }
        }
    }
    assert_eq!(checked, 3usize.pow(7));
}

#[test]
fn test_out_of_range_ph_is_rejected() {
    let recommender = create_recommender();

    let err = recommender
        .recommend(rice_paddy().with(Field::Ph, 15.0))
        .unwrap_err();

    match err {
        RecommendError::Validation(v) => {
            assert_eq!(v.violations.len(), 1);
            assert!(v.mentions(Field::Ph));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_free_function_matches_recommender() {
    let recommender = create_recommender();
    let bundle = recommender.artifacts();

    let direct = recommend(rice_paddy(), bundle.classifier(), bundle.encoder()).unwrap();
    assert_eq!(direct, recommender.recommend(rice_paddy()).unwrap());
}

#[test]
fn test_missing_artifacts_fail_before_serving() {
    let empty = TempDir::new().unwrap();
    let cache = ArtifactCache::new(ArtifactPaths::in_dir(empty.path()));

    let err = cache.get_or_load().unwrap_err();
    assert!(matches!(err, ArtifactLoadError::FileNotFound { .. }));
}

#[test]
fn test_rice_without_image_gets_informational_preview() {
    let recommender = create_recommender();
    let images = TempDir::new().unwrap();
    let catalog = ImageCatalog::new(images.path());

    let result = recommender.recommend(rice_paddy()).unwrap();
    let preview = catalog.lookup(&result.crop);

    assert_eq!(
        preview,
        ImagePreview::Unavailable {
            message: "No preview available for rice".to_string()
        }
    );
}

#[test]
fn test_shared_model_across_threads() {
    let cache = Arc::new(ArtifactCache::new(demo_paths()));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let recommender = Recommender::new(cache.get_or_load().unwrap());
                let sample = rice_paddy().with(Field::Temperature, 20.0 + i as f64 * 0.1);
                recommender.recommend(sample).unwrap().crop
            })
        })
        .collect();

    for handle in handles {
        let crop = handle.join().unwrap();
        assert!(!crop.is_empty());
    }
    assert_eq!(cache.load_count(), 1);
}
