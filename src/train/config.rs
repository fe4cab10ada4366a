//! String-keyed classifier configuration, as exposed on a command line.

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use super::trainer::{
    ConditionalLogitTrainer, CostFunction, CostSelection, CostSensitive, PaType,
    PassiveAggressive, Perceptron, Trainer,
};
use crate::classifier::LinearClassifier;
use crate::dataset::TrainingData;
use crate::error::{Error, Result};
use crate::feature::FeatureVector;

/// Training method selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Perceptron,
    AveragedPerceptron,
    PassiveAggressive,
    CostSensitive,
    /// Conditional logit fitted by an L-BFGS solver
    ExternalSolver,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Perceptron => "perceptron",
            Method::AveragedPerceptron => "avg-perceptron",
            Method::PassiveAggressive => "pa-perceptron",
            Method::CostSensitive => "cost-sensitive",
            Method::ExternalSolver => "external-solver",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "perceptron" => Ok(Method::Perceptron),
            "avg-perceptron" => Ok(Method::AveragedPerceptron),
            "pa-perceptron" => Ok(Method::PassiveAggressive),
            "cost-sensitive" => Ok(Method::CostSensitive),
            "external-solver" => Ok(Method::ExternalSolver),
            _ => Err(Error::invalid(format!("unknown training method: {}", s))),
        }
    }
}

impl FromStr for CostSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "prediction" => Ok(CostSelection::PredictionBased),
            "max-loss" => Ok(CostSelection::MaxLoss),
            _ => Err(Error::invalid(format!("unknown cost selection: {}", s))),
        }
    }
}

fn cost_selection_str(selection: CostSelection) -> &'static str {
    match selection {
        CostSelection::PredictionBased => "prediction",
        CostSelection::MaxLoss => "max-loss",
    }
}

/// Classifier training options.
///
/// Values are validated when set; `build` only assembles the trainer.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    method: Method,
    iterations: usize,
    error_threshold: f64,
    alpha: f64,
    aggressiveness: f64,
    variant: PaType,
    cost_selection: CostSelection,
    lambda: f64,
    gaussian: f64,
    lasso: f64,
    verbose: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            method: Method::default(),
            iterations: 100,
            error_threshold: 1e-10,
            alpha: 1.0,
            aggressiveness: 1.0,
            variant: PaType::PaI,
            cost_selection: CostSelection::default(),
            lambda: 0.0,
            gaussian: 0.0,
            lasso: 0.0,
            verbose: false,
        }
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::invalid(format!("invalid value for {}: {}", name, value)))
}

impl ClassifierConfig {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Set a training option by name
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "method" => self.method = value.parse()?,
            "iterations" => {
                let iterations: usize = parse_value(name, value)?;
                if iterations < 1 {
                    return Err(Error::invalid("iterations must be at least 1"));
                }
                self.iterations = iterations;
            }
            "error-threshold" => {
                let threshold: f64 = parse_value(name, value)?;
                if threshold.is_nan() || threshold < 0.0 {
                    return Err(Error::invalid("error-threshold must be non-negative"));
                }
                self.error_threshold = threshold;
            }
            "alpha" => {
                let alpha: f64 = parse_value(name, value)?;
                if !(alpha > 0.0) {
                    return Err(Error::invalid("alpha must be positive"));
                }
                self.alpha = alpha;
            }
            "aggressiveness" => {
                let c: f64 = parse_value(name, value)?;
                if !(c > 0.0) {
                    return Err(Error::invalid("aggressiveness must be positive"));
                }
                self.aggressiveness = c;
            }
            "variant" => {
                let variant: u8 = parse_value(name, value)?;
                self.variant = PaType::try_from(variant)?;
            }
            "cost-selection" => self.cost_selection = value.parse()?,
            "lambda" | "gaussian" | "lasso" => {
                let v: f64 = parse_value(name, value)?;
                if v.is_nan() || v < 0.0 {
                    return Err(Error::invalid(format!("{} must be non-negative", name)));
                }
                match name {
                    "lambda" => self.lambda = v,
                    "gaussian" => self.gaussian = v,
                    _ => self.lasso = v,
                }
            }
            _ => return Err(Error::UnknownParameter(name.to_string())),
        }
        Ok(())
    }

    /// Get a training option by name
    pub fn get(&self, name: &str) -> Result<String> {
        let value = match name {
            "method" => self.method.to_string(),
            "iterations" => self.iterations.to_string(),
            "error-threshold" => self.error_threshold.to_string(),
            "alpha" => self.alpha.to_string(),
            "aggressiveness" => self.aggressiveness.to_string(),
            "variant" => u8::from(self.variant).to_string(),
            "cost-selection" => cost_selection_str(self.cost_selection).to_string(),
            "lambda" => self.lambda.to_string(),
            "gaussian" => self.gaussian.to_string(),
            "lasso" => self.lasso.to_string(),
            _ => return Err(Error::UnknownParameter(name.to_string())),
        };
        Ok(value)
    }

    /// Assemble the trainer this configuration selects
    pub fn build(&self) -> Result<ConfiguredTrainer> {
        let trainer = match self.method {
            Method::Perceptron | Method::AveragedPerceptron => {
                let mut t = Trainer::perceptron()
                    .with_max_iterations(self.iterations)?
                    .with_error_threshold(self.error_threshold)?
                    .with_averaging(self.method == Method::AveragedPerceptron)
                    .with_alpha(self.alpha)?;
                t.verbose(self.verbose);
                ConfiguredTrainer::Perceptron(t)
            }
            Method::PassiveAggressive => {
                let mut t = Trainer::passive_aggressive()
                    .with_max_iterations(self.iterations)?
                    .with_error_threshold(self.error_threshold)?
                    .with_pa_type(self.variant)
                    .with_aggressiveness(self.aggressiveness)?;
                t.verbose(self.verbose);
                ConfiguredTrainer::PassiveAggressive(t)
            }
            Method::CostSensitive => {
                let mut t = Trainer::cost_sensitive()
                    .with_max_iterations(self.iterations)?
                    .with_error_threshold(self.error_threshold)?
                    .with_pa_type(self.variant)
                    .with_selection(self.cost_selection)
                    .with_aggressiveness(self.aggressiveness)?;
                t.verbose(self.verbose);
                ConfiguredTrainer::CostSensitive(t)
            }
            Method::ExternalSolver => {
                let mut t = ConditionalLogitTrainer::new()
                    .with_lambda(self.lambda)?
                    .with_gaussian(self.gaussian)?
                    .with_lasso(self.lasso)?;
                t.params_mut().set_max_iterations(self.iterations)?;
                t.verbose(self.verbose);
                ConfiguredTrainer::ConditionalLogit(t)
            }
        };
        Ok(trainer)
    }
}

/// A trainer selected at runtime from a [`ClassifierConfig`].
#[derive(Debug, Clone)]
pub enum ConfiguredTrainer {
    Perceptron(Trainer<Perceptron>),
    PassiveAggressive(Trainer<PassiveAggressive>),
    CostSensitive(Trainer<CostSensitive>),
    ConditionalLogit(ConditionalLogitTrainer),
}

/// Every wrong label costs the same
fn unit_cost<F>(_: &F, _: usize, _: usize) -> f64 {
    1.0
}

impl ConfiguredTrainer {
    fn name(&self) -> &'static str {
        match self {
            ConfiguredTrainer::Perceptron(_) => "perceptron",
            ConfiguredTrainer::PassiveAggressive(_) => "pa-perceptron",
            ConfiguredTrainer::CostSensitive(_) => "cost-sensitive",
            ConfiguredTrainer::ConditionalLogit(_) => "external-solver",
        }
    }

    /// Train a binary classifier.
    ///
    /// Only the perceptron and Passive Aggressive trainers support this.
    pub fn train_binary<F: FeatureVector>(
        &self,
        data: &TrainingData<F>,
    ) -> Result<LinearClassifier> {
        match self {
            ConfiguredTrainer::Perceptron(t) => t.train_binary(data),
            ConfiguredTrainer::PassiveAggressive(t) => t.train_binary(data),
            _ => Err(Error::invalid(format!(
                "{} does not support binary training",
                self.name()
            ))),
        }
    }

    /// Train a shared-weight multi-label classifier; cost-sensitive training
    /// charges every wrong label the same.
    pub fn train_multi_label<F: FeatureVector>(
        &self,
        data: &TrainingData<F>,
    ) -> Result<LinearClassifier> {
        self.train_multi_label_with_cost(data, &unit_cost::<F>)
    }

    /// Train a shared-weight multi-label classifier, passing `cost` to the
    /// cost-sensitive trainer; other trainers ignore it.
    pub fn train_multi_label_with_cost<F, C>(
        &self,
        data: &TrainingData<F>,
        cost: &C,
    ) -> Result<LinearClassifier>
    where
        F: FeatureVector,
        C: CostFunction<F> + ?Sized,
    {
        match self {
            ConfiguredTrainer::Perceptron(t) => t.train_multi_label(data),
            ConfiguredTrainer::PassiveAggressive(t) => t.train_multi_label(data),
            ConfiguredTrainer::CostSensitive(t) => t.train_cost_sensitive(data, cost),
            ConfiguredTrainer::ConditionalLogit(t) => t.train_multi_label(data),
        }
    }

    /// Train a per-label-weight classifier over label-independent vectors.
    pub fn train_multi_weight<F: FeatureVector>(
        &self,
        data: &TrainingData<F>,
        num_labels: usize,
    ) -> Result<LinearClassifier> {
        match self {
            ConfiguredTrainer::Perceptron(t) => t.train_multi_weight(data, num_labels),
            ConfiguredTrainer::PassiveAggressive(t) => t.train_multi_weight(data, num_labels),
            ConfiguredTrainer::CostSensitive(t) => {
                t.train_cost_sensitive_multi_weight(data, num_labels, &unit_cost::<F>)
            }
            ConfiguredTrainer::ConditionalLogit(_) => Err(Error::invalid(format!(
                "{} does not support per-label weights",
                self.name()
            ))),
        }
    }
}
