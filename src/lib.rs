//! Label-aware linear classifiers and a pointwise reranker
//!
//! This library trains linear classifiers over sparse or dense feature
//! vectors with online update rules (perceptron, averaged perceptron,
//! Passive Aggressive and cost-sensitive Passive Aggressive) or a
//! conditional-logit solver, and uses them to rerank the output of an
//! initial candidate ranker.
//!
//! # Examples
//!
//! ## Training
//!
//! ```no_run
//! use linrank::feature::FeatureVectorFactory;
//! use linrank::train::Trainer;
//! use linrank::{Attribute, TrainingData};
//!
//! let factory = FeatureVectorFactory::default();
//! let near = factory.make_aggregate(&[
//!     vec![Attribute::new("distance", 0.1), Attribute::new("population", 2.0)],
//!     vec![Attribute::new("distance", 3.0), Attribute::new("population", 9.0)],
//! ])?;
//! let data = TrainingData::new(vec![(near, 0)])?;
//!
//! let trainer = Trainer::passive_aggressive().with_aggressiveness(0.5)?;
//! let classifier = trainer.train_multi_label(&data)?;
//! # Ok::<(), linrank::Error>(())
//! ```
//!
//! ## Saving and loading
//!
//! ```no_run
//! use linrank::train::ModelWriter;
//! use linrank::{LinearClassifier, Model, Vector};
//! use linrank::feature::FeatureMapper;
//!
//! let mapper = FeatureMapper::from_names(["walk", "shop"]);
//! let classifier = LinearClassifier::binary(Vector::from_vec(vec![0.5, -0.5]));
//! ModelWriter::write("model.lin".as_ref(), &classifier, &mapper)?;
//!
//! let buf = std::fs::read("model.lin")?;
//! let model = Model::new(&buf)?;
//! let classifier = model.classifier()?;
//! # Ok::<(), linrank::Error>(())
//! ```

mod attribute;
mod classifier;
mod dataset;
mod error;
mod model;
mod vector;
mod weights;

/// Feature vectors and the factory that builds them
pub mod feature;
/// Flat training-instance files
pub mod instances;
/// Rankers and the reranker
pub mod rank;
/// Training module containing the update rules and their configuration
pub mod train;

// Re-export main types
pub use self::attribute::Attribute;
pub use self::classifier::{ClassifierKind, LinearClassifier};
pub use self::dataset::TrainingData;
pub use self::error::{Error, Result};
pub use self::model::Model;
pub use self::vector::Vector;
pub use self::weights::WeightAggregate;

// Re-export training types for convenience
pub use self::train::{ClassifierConfig, Trainer};
