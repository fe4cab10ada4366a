use std::convert::TryFrom;

use linrank::feature::{FeatureVectorFactory, SimpleFeatureVector};
use linrank::train::{PaType, Trainer};
use linrank::{Attribute, TrainingData, Vector, WeightAggregate};

/// Two orthogonal instances: `a` scaled by `value` is positive, `b` negative
fn orthogonal(value: f64) -> TrainingData<SimpleFeatureVector> {
    let factory = FeatureVectorFactory::default();
    TrainingData::new(vec![
        (factory.make(&[Attribute::new("a", value)]), 1),
        (factory.make(&[Attribute::new("b", 1.0)]), 0),
    ])
    .unwrap()
}

fn single_pass(pa_type: PaType, c: f64) -> Vec<f64> {
    let trainer = Trainer::passive_aggressive()
        .with_pa_type(pa_type)
        .with_aggressiveness(c)
        .unwrap()
        .with_max_iterations(1)
        .unwrap();
    let classifier = trainer.train_binary(&orthogonal(2.0)).unwrap();
    classifier.weights().apply(0).as_slice().to_vec()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-12, "expected {:?}, got {:?}", expected, actual);
    }
}

#[test]
fn test_pa_steps_to_the_margin() {
    // tau = loss / ||x||^2: 1/4 for a, 1 for b
    let weights = single_pass(PaType::Pa, 1.0);
    assert_close(&weights, &[0.5, -1.0]);

    // both instances now sit exactly on the margin, so nothing moves again
    let trainer = Trainer::passive_aggressive().with_pa_type(PaType::Pa);
    let classifier = trainer.train_binary(&orthogonal(2.0)).unwrap();
    assert_close(classifier.weights().apply(0).as_slice(), &[0.5, -1.0]);
}

#[test]
fn test_pa1_step_is_capped() {
    let weights = single_pass(PaType::PaI, 0.1);
    // tau = min(C, loss / ||x||^2) = 0.1 for both instances
    assert_close(&weights, &[0.2, -0.1]);

    // a large C leaves the uncapped step
    assert_close(&single_pass(PaType::PaI, 10.0), &[0.5, -1.0]);
}

#[test]
fn test_pa2_step_is_smaller() {
    let weights = single_pass(PaType::PaII, 1.0);
    // tau = loss / (||x||^2 + 1/(2C))
    assert_close(&weights, &[2.0 * 2.0 / 9.0, -2.0 / 3.0]);

    let pa = single_pass(PaType::Pa, 1.0);
    assert!(weights[0] < pa[0]);
    assert!(weights[1].abs() < pa[1].abs());
}

#[test]
fn test_identical_candidates_do_not_update() {
    let factory = FeatureVectorFactory::default();
    let same = vec![Attribute::new("a", 1.0)];
    let fv = factory.make_aggregate(&[same.clone(), same]).unwrap();
    let data = TrainingData::new(vec![(fv, 0)]).unwrap();

    for pa_type in [PaType::Pa, PaType::PaI, PaType::PaII] {
        let trainer = Trainer::passive_aggressive().with_pa_type(pa_type);
        let classifier = trainer.train_multi_label(&data).unwrap();
        assert_eq!(
            classifier.weights(),
            &WeightAggregate::Single(Vector::from_vec(vec![0.0]))
        );
    }
}

#[test]
fn test_multi_label_pa_learns_ranking() {
    let factory = FeatureVectorFactory::default();
    let candidate = |d: f64, p: f64| {
        vec![
            Attribute::new("distance", d),
            Attribute::new("population", p),
        ]
    };
    // the closest candidate is correct even when it is less populated
    let instances = vec![
        (
            factory
                .make_aggregate(&[candidate(0.1, 1.0), candidate(2.0, 3.0)])
                .unwrap(),
            0,
        ),
        (
            factory
                .make_aggregate(&[candidate(3.0, 1.0), candidate(0.2, 2.0)])
                .unwrap(),
            1,
        ),
        (
            factory
                .make_aggregate(&[candidate(1.5, 2.0), candidate(0.5, 1.0)])
                .unwrap(),
            1,
        ),
    ];
    let data = TrainingData::new(instances).unwrap();

    let mut trainer = Trainer::passive_aggressive()
        .with_aggressiveness(1.0)
        .unwrap();
    trainer.verbose(true);
    let classifier = trainer.train_multi_label(&data).unwrap();
    for (fv, label) in data.iter() {
        assert_eq!(classifier.classify(fv), *label);
    }
}

#[test]
fn test_variant_conversion() {
    assert_eq!(PaType::try_from(0u8).unwrap(), PaType::Pa);
    assert_eq!(PaType::try_from(2u8).unwrap(), PaType::PaII);
    assert_eq!(u8::from(PaType::PaI), 1);
    let err = PaType::try_from(3u8).unwrap_err();
    assert_eq!(err.to_string(), "variant must be 0, 1 or 2");

    let err = Trainer::passive_aggressive()
        .with_aggressiveness(0.0)
        .unwrap_err();
    assert_eq!(err.to_string(), "aggressiveness must be positive");
}
