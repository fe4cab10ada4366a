use super::passive_aggressive::pa_step;
use super::{
    check_depth, check_multi_weight, margin_labels, num_labels_of, update_sqmag, CostSensitive,
    LossInputs, PaType, Trainer, TrainingAlgorithm, Update,
};
use crate::classifier::{label_scores, LinearClassifier};
use crate::dataset::TrainingData;
use crate::error::{Error, Result};
use crate::feature::FeatureVector;
use crate::weights::WeightAggregate;

/// Externally supplied misclassification cost.
///
/// `cost(index, instance, correct, predicted)` must be non-negative, where
/// `index` is the position of `instance` in the training data. The trainer
/// never asks for the cost of the correct label against itself, which is 0.
///
/// Closures taking `(instance, correct, predicted)` implement this trait and
/// ignore the index.
pub trait CostFunction<F> {
    fn cost(&self, index: usize, instance: &F, correct: usize, predicted: usize) -> f64;
}

impl<F, T> CostFunction<F> for T
where
    T: Fn(&F, usize, usize) -> f64,
{
    fn cost(&self, _index: usize, instance: &F, correct: usize, predicted: usize) -> f64 {
        self(instance, correct, predicted)
    }
}

/// Precomputed costs, one square `labels x labels` matrix per instance.
///
/// `costs[index][correct][predicted]` is the cost of predicting `predicted`
/// for instance `index`; entries outside the table cost nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostTable {
    costs: Vec<Vec<Vec<f64>>>,
}

impl CostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the matrix of the next instance
    pub fn push(&mut self, matrix: Vec<Vec<f64>>) {
        self.costs.push(matrix);
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

impl<F> CostFunction<F> for CostTable {
    fn cost(&self, index: usize, _instance: &F, correct: usize, predicted: usize) -> f64 {
        self.costs
            .get(index)
            .and_then(|m| m.get(correct))
            .and_then(|row| row.get(predicted))
            .copied()
            .unwrap_or(0.0)
    }
}

/// How the competing label of a cost-sensitive update is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostSelection {
    /// The label the current weights predict, ties going to the rival
    #[default]
    PredictionBased,
    /// The label maximizing `score(label) - score(correct) + sqrt(cost)`
    MaxLoss,
}

/// Cost-sensitive Passive Aggressive parameters.
#[derive(Debug, Clone)]
pub struct CostSensitiveParams {
    pa_type: PaType,
    aggressiveness: f64,
    selection: CostSelection,
}

impl Default for CostSensitiveParams {
    fn default() -> Self {
        Self {
            pa_type: PaType::PaI,
            aggressiveness: 1.0,
            selection: CostSelection::PredictionBased,
        }
    }
}

impl CostSensitiveParams {
    pub fn pa_type(&self) -> PaType {
        self.pa_type
    }

    pub fn set_pa_type(&mut self, pa_type: PaType) {
        self.pa_type = pa_type;
    }

    pub fn aggressiveness(&self) -> f64 {
        self.aggressiveness
    }

    pub fn set_aggressiveness(&mut self, aggressiveness: f64) -> Result<()> {
        if !(aggressiveness > 0.0) {
            return Err(Error::invalid("aggressiveness must be positive"));
        }
        self.aggressiveness = aggressiveness;
        Ok(())
    }

    pub fn selection(&self) -> CostSelection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: CostSelection) {
        self.selection = selection;
    }
}

impl TrainingAlgorithm for CostSensitive {
    type Params = CostSensitiveParams;

    const NAME: &'static str = "cost-sensitive";

    fn scale_factor(params: &CostSensitiveParams, inputs: &LossInputs) -> f64 {
        pa_step(
            params.pa_type,
            params.aggressiveness,
            inputs.loss(),
            inputs.sqmag,
        )
    }
}

fn checked_cost<F, C>(
    cost: &C,
    index: usize,
    fv: &F,
    correct: usize,
    predicted: usize,
) -> Result<f64>
where
    C: CostFunction<F> + ?Sized,
{
    let value = cost.cost(index, fv, correct, predicted);
    if value.is_nan() || value < 0.0 {
        return Err(Error::NegativeCost {
            correct,
            predicted,
            cost: value,
        });
    }
    Ok(value)
}

impl Trainer<CostSensitive> {
    /// Create a new cost-sensitive trainer
    pub fn cost_sensitive() -> Self {
        Self::new()
    }

    pub fn with_pa_type(mut self, pa_type: PaType) -> Self {
        self.params.set_pa_type(pa_type);
        self
    }

    pub fn with_aggressiveness(mut self, aggressiveness: f64) -> Result<Self> {
        self.params.set_aggressiveness(aggressiveness)?;
        Ok(self)
    }

    pub fn with_selection(mut self, selection: CostSelection) -> Self {
        self.params.set_selection(selection);
        self
    }

    /// Train a shared-weight multi-label classifier over aggregate vectors,
    /// sizing each update by the cost of the competing label.
    pub fn train_cost_sensitive<F, C>(
        &self,
        data: &TrainingData<F>,
        cost: &C,
    ) -> Result<LinearClassifier>
    where
        F: FeatureVector,
        C: CostFunction<F> + ?Sized,
    {
        check_depth(data)?;
        let weights = WeightAggregate::single(data.length());
        let weights = self.run(data, weights, |index, fv, label, weights| {
            self.cost_sensitive_step(index, fv, label, weights, cost)
        })?;
        Ok(LinearClassifier::multi_label(weights))
    }

    /// Train a per-label-weight classifier over label-independent vectors.
    pub fn train_cost_sensitive_multi_weight<F, C>(
        &self,
        data: &TrainingData<F>,
        num_labels: usize,
        cost: &C,
    ) -> Result<LinearClassifier>
    where
        F: FeatureVector,
        C: CostFunction<F> + ?Sized,
    {
        check_multi_weight(data, num_labels)?;
        let weights = WeightAggregate::multi(num_labels, data.length());
        let weights = self.run(data, weights, |index, fv, label, weights| {
            self.cost_sensitive_step(index, fv, label, weights, cost)
        })?;
        Ok(LinearClassifier::multi_label(weights))
    }

    fn cost_sensitive_step<F, C>(
        &self,
        index: usize,
        fv: &F,
        correct: usize,
        weights: &WeightAggregate,
        cost: &C,
    ) -> Result<Option<Update>>
    where
        F: FeatureVector,
        C: CostFunction<F> + ?Sized,
    {
        let scores = label_scores(weights, fv, num_labels_of(weights, fv));
        let (competing, competing_cost) = match self.params.selection {
            CostSelection::PredictionBased => {
                // ties between the correct label and a rival count as mistakes
                let predicted = match margin_labels(&scores, &[correct]) {
                    Some((_, rival)) if scores[rival] >= scores[correct] => rival,
                    _ => return Ok(None),
                };
                (predicted, checked_cost(cost, index, fv, correct, predicted)?)
            }
            CostSelection::MaxLoss => {
                let mut best = (correct, 0.0, 0.0);
                for (label, &score) in scores.iter().enumerate() {
                    if label == correct {
                        continue;
                    }
                    let c = checked_cost(cost, index, fv, correct, label)?;
                    let augmented = score - scores[correct] + c.sqrt();
                    if augmented > best.1 {
                        best = (label, augmented, c);
                    }
                }
                if best.0 == correct {
                    return Ok(None);
                }
                (best.0, best.2)
            }
        };

        let inputs = LossInputs {
            margin: scores[correct] - scores[competing],
            required_margin: competing_cost.sqrt(),
            sqmag: update_sqmag(weights, fv, correct, competing),
            binary: false,
        };
        Ok(Some(Update {
            promote: correct,
            demote: Some(competing),
            scale: CostSensitive::scale_factor(&self.params, &inputs),
        }))
    }
}
