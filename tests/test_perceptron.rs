use linrank::feature::{
    AggregateFeatureVector, FeatureVectorFactory, SimpleFeatureVector, VectorKind,
};
use linrank::train::Trainer;
use linrank::{Attribute, TrainingData, Vector, WeightAggregate};

fn point(factory: &FeatureVectorFactory, x: f64, y: f64) -> SimpleFeatureVector {
    factory.make(&[Attribute::new("x", x), Attribute::new("y", y)])
}

/// Four points whose label is the sign of the second coordinate
fn quadrants(kind: VectorKind) -> (FeatureVectorFactory, TrainingData<SimpleFeatureVector>) {
    let factory = FeatureVectorFactory::new(kind);
    let instances = vec![
        (point(&factory, 1.0, 1.0), 0),
        (point(&factory, 1.0, -1.0), 1),
        (point(&factory, -1.0, 1.0), 0),
        (point(&factory, -1.0, -1.0), 1),
    ];
    (factory, TrainingData::new(instances).unwrap())
}

#[test]
fn test_binary_perceptron_separates_quadrants() {
    for kind in [VectorKind::Dense, VectorKind::Sparse] {
        let (_, data) = quadrants(kind);
        let trainer = Trainer::perceptron().with_max_iterations(100).unwrap();
        let classifier = trainer.train_binary(&data).unwrap();

        // two mistakes in the first pass, none in the second
        assert_eq!(
            classifier.weights(),
            &WeightAggregate::Single(Vector::from_vec(vec![0.0, -2.0]))
        );
        for (fv, label) in data.iter() {
            assert_eq!(classifier.classify(fv), *label);
        }
    }
}

#[test]
fn test_converged_weights_do_not_move() {
    let (_, data) = quadrants(VectorKind::Sparse);
    let short = Trainer::perceptron()
        .with_max_iterations(2)
        .unwrap()
        .train_binary(&data)
        .unwrap();
    let long = Trainer::perceptron()
        .with_max_iterations(100)
        .unwrap()
        .train_binary(&data)
        .unwrap();
    assert_eq!(short, long);
}

#[test]
fn test_two_point_dataset() {
    let factory = FeatureVectorFactory::new(VectorKind::Dense);
    let data = TrainingData::new(vec![
        (factory.make(&[Attribute::new("bias", 1.0), Attribute::new("v", 2.0)]), 1),
        (factory.make(&[Attribute::new("bias", 1.0), Attribute::new("v", -3.0)]), 0),
    ])
    .unwrap();
    let classifier = Trainer::perceptron()
        .with_alpha(0.5)
        .unwrap()
        .train_binary(&data)
        .unwrap();
    assert_eq!(classifier.classify(&data.instances()[0].0), 1);
    assert_eq!(classifier.classify(&data.instances()[1].0), 0);
    assert!(classifier.binary_score(&data.instances()[0].0) > 0.0);
}

#[test]
fn test_multi_label_perceptron_over_candidates() {
    let factory = FeatureVectorFactory::default();
    let mut instances = Vec::new();
    // the candidate with the larger "size" is always correct
    for &(a, b, c) in &[(3.0, 1.0, 2.0), (1.0, 4.0, 2.0), (0.5, 1.0, 5.0), (2.0, 1.5, 0.5)] {
        let sizes = [a, b, c];
        let candidates: Vec<Vec<Attribute>> = sizes
            .iter()
            .map(|&s| vec![Attribute::new("size", s)])
            .collect();
        let correct = (0..3)
            .max_by(|&i, &j| sizes[i].partial_cmp(&sizes[j]).unwrap())
            .unwrap();
        instances.push((factory.make_aggregate(&candidates).unwrap(), correct));
    }
    let data = TrainingData::new(instances).unwrap();

    let classifier = Trainer::perceptron().train_multi_label(&data).unwrap();
    assert!(classifier.weights().is_single());
    for (fv, label) in data.iter() {
        assert_eq!(classifier.classify(fv), *label);
        let sorted = classifier.sorted_labels(fv);
        assert_eq!(sorted[0].0, *label);
        assert!(sorted.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}

#[test]
fn test_averaged_perceptron_multi_weight() {
    let factory = FeatureVectorFactory::default();
    let make = |name: &str| factory.make(&[Attribute::binary(name), Attribute::binary("bias")]);
    let data = TrainingData::new(vec![
        (make("red"), 0),
        (make("green"), 1),
        (make("blue"), 2),
        (make("red"), 0),
        (make("blue"), 2),
    ])
    .unwrap();

    let trainer = Trainer::averaged_perceptron();
    assert!(trainer.averaged());
    let classifier = trainer.train_multi_weight(&data, 3).unwrap();
    assert_eq!(classifier.weights().num_vectors(), 3);
    for (fv, label) in data.iter() {
        assert_eq!(classifier.classify(fv), *label);
    }
}

#[test]
fn test_binary_requires_two_labels() {
    let factory = FeatureVectorFactory::default();
    let data = TrainingData::new(vec![
        (factory.make(&[Attribute::binary("a")]), 1),
        (factory.make(&[Attribute::binary("b")]), 1),
    ])
    .unwrap();
    let err = Trainer::perceptron().train_binary(&data).unwrap_err();
    assert_eq!(err.to_string(), "training requires at least 2 labels, found 1");

    let data = TrainingData::new(vec![(factory.make(&[Attribute::binary("a")]), 2)]).unwrap();
    let err = Trainer::perceptron().train_binary(&data).unwrap_err();
    assert_eq!(err.to_string(), "label 2 out of range for 2 labels");
}

#[test]
fn test_multi_weight_depth_must_match_labels() {
    let factory = FeatureVectorFactory::default();
    let pair = |a: f64, b: f64| {
        factory
            .make_aggregate(&[
                vec![Attribute::new("size", a)],
                vec![Attribute::new("size", b)],
            ])
            .unwrap()
    };
    let data = TrainingData::new(vec![(pair(2.0, 1.0), 0), (pair(1.0, 3.0), 1)]).unwrap();

    let err = Trainer::perceptron()
        .train_multi_weight(&data, 3)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "feature vector depth mismatch: expected 3, got 2"
    );
    let unit_cost = |_: &AggregateFeatureVector, _: usize, _: usize| 1.0;
    let err = Trainer::cost_sensitive()
        .train_cost_sensitive_multi_weight(&data, 3, &unit_cost)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "feature vector depth mismatch: expected 3, got 2"
    );

    // one component per label is fine
    let classifier = Trainer::perceptron().train_multi_weight(&data, 2).unwrap();
    assert_eq!(classifier.weights().num_vectors(), 2);
}
