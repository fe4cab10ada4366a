//! Training module for linear classifiers
//!
//! This module contains the online update rules (perceptron, Passive
//! Aggressive, cost-sensitive), the conditional-logit solver backend and the
//! string-keyed configuration that selects between them.

mod config;
mod model_writer;
mod trainer;

// Re-export public types
pub use self::config::{ClassifierConfig, ConfiguredTrainer, Method};
pub use self::model_writer::ModelWriter;
pub use self::trainer::{
    ConditionalLogitParams, ConditionalLogitTrainer, CostFunction, CostSelection, CostSensitive,
    CostSensitiveParams, CostTable, LongRow, LongTable, LossInputs, PaType, PassiveAggressive,
    PassiveAggressiveParams, Perceptron, PerceptronParams, Trainer, TrainingAlgorithm,
};
