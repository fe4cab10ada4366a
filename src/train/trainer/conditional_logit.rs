use std::borrow::Cow;
use std::io::Write;

use tracing::{debug, info};

use super::check_depth;
use crate::classifier::LinearClassifier;
use crate::dataset::TrainingData;
use crate::error::{Error, Result};
use crate::feature::FeatureVector;
use crate::vector::Vector;
use crate::weights::WeightAggregate;

/// One row of a long-format choice table: one candidate of one individual.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    /// 1-based instance number
    pub individual: usize,
    /// 1-based candidate number within the instance
    pub label: usize,
    /// Whether this candidate is the correct one
    pub choice: bool,
    /// Values of the kept columns
    pub features: Vec<f64>,
}

/// Training data flattened into `(individual, label, choice, feature...)`
/// rows, with removed (non-discriminative) columns left out.
#[derive(Debug, Clone)]
pub struct LongTable {
    /// Original feature index of each kept column
    columns: Vec<usize>,
    /// Names of the kept columns
    names: Vec<String>,
    length: usize,
    rows: Vec<LongRow>,
}

impl LongTable {
    pub fn new<F: FeatureVector>(data: &TrainingData<F>) -> Self {
        let length = data.length();
        let removed = data.removed_features();
        let columns: Vec<usize> = (0..length).filter(|i| !removed.contains(i)).collect();
        let names = columns
            .iter()
            .map(|&i| {
                data.mapper()
                    .and_then(|m| m.name_of(i))
                    .unwrap_or_else(|| format!("f{}", i))
            })
            .collect();

        // original index -> column position
        let mut position = vec![None; length];
        for (col, &index) in columns.iter().enumerate() {
            position[index] = Some(col);
        }

        let mut rows = Vec::new();
        for (individual, (fv, correct)) in data.iter().enumerate() {
            for label in 0..fv.depth() {
                let mut features = vec![0.0; columns.len()];
                for (index, value) in fv.nonzeros(label) {
                    if let Some(Some(col)) = position.get(index) {
                        features[*col] = value;
                    }
                }
                rows.push(LongRow {
                    individual: individual + 1,
                    label: label + 1,
                    choice: label == *correct,
                    features,
                });
            }
        }

        Self {
            columns,
            names,
            length,
            rows,
        }
    }

    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn rows(&self) -> &[LongRow] {
        &self.rows
    }

    /// Rows grouped by individual, in order
    pub fn groups(&self) -> impl Iterator<Item = &[LongRow]> + '_ {
        self.rows
            .chunk_by(|a, b| a.individual == b.individual)
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv<W: Write>(&self, mut out: W) -> Result<()> {
        write!(out, "individual,label,choice")?;
        for name in &self.names {
            write!(out, ",{}", csv_field(name))?;
        }
        writeln!(out)?;
        for row in &self.rows {
            write!(
                out,
                "{},{},{}",
                row.individual,
                row.label,
                if row.choice { "TRUE" } else { "FALSE" }
            )?;
            for value in &row.features {
                write!(out, ",{}", value)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Map per-column solver weights back to a full-length weight vector,
    /// leaving removed features at zero.
    pub fn expand_weights(&self, solved: &[f64]) -> Result<Vector> {
        if solved.len() != self.columns.len() {
            return Err(Error::LengthMismatch {
                expected: self.columns.len(),
                actual: solved.len(),
            });
        }
        let mut weights = Vector::zeros(self.length);
        for (&index, &w) in self.columns.iter().zip(solved) {
            weights[index] = w;
        }
        Ok(weights)
    }
}

/// Quote a CSV field containing a separator, quote or line break,
/// doubling embedded quotes (RFC 4180).
fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Conditional-logit solver parameters.
#[derive(Debug, Clone)]
pub struct ConditionalLogitParams {
    /// L2 coefficient
    lambda: f64,
    /// Variance of a Gaussian prior on the weights, 0 for none
    gaussian: f64,
    /// L1 coefficient, solved with OWL-QN when positive
    lasso: f64,
    max_iterations: usize,
    epsilon: f64,
    period: usize,
    delta: f64,
}

impl Default for ConditionalLogitParams {
    fn default() -> Self {
        Self {
            lambda: 0.0,
            gaussian: 0.0,
            lasso: 0.0,
            max_iterations: 1000,
            epsilon: 1e-5,
            period: 10,
            delta: 1e-6,
        }
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_nan() || value < 0.0 {
        return Err(Error::invalid(format!("{} must be non-negative", name)));
    }
    Ok(())
}

impl ConditionalLogitParams {
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn set_lambda(&mut self, lambda: f64) -> Result<()> {
        non_negative("lambda", lambda)?;
        self.lambda = lambda;
        Ok(())
    }

    pub fn gaussian(&self) -> f64 {
        self.gaussian
    }

    pub fn set_gaussian(&mut self, gaussian: f64) -> Result<()> {
        non_negative("gaussian", gaussian)?;
        self.gaussian = gaussian;
        Ok(())
    }

    pub fn lasso(&self) -> f64 {
        self.lasso
    }

    pub fn set_lasso(&mut self, lasso: f64) -> Result<()> {
        non_negative("lasso", lasso)?;
        self.lasso = lasso;
        Ok(())
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        if max_iterations < 1 {
            return Err(Error::invalid("max_iterations must be at least 1"));
        }
        self.max_iterations = max_iterations;
        Ok(())
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<()> {
        non_negative("epsilon", epsilon)?;
        self.epsilon = epsilon;
        Ok(())
    }

    /// Setting period to 0 disables the delta-based convergence test.
    pub fn set_period(&mut self, period: usize) {
        self.period = period;
    }

    pub fn set_delta(&mut self, delta: f64) -> Result<()> {
        non_negative("delta", delta)?;
        self.delta = delta;
        Ok(())
    }

    /// Coefficient of `||x||^2` combining `lambda` and the Gaussian prior
    fn l2(&self) -> f64 {
        let prior = if self.gaussian > 0.0 {
            1.0 / (2.0 * self.gaussian)
        } else {
            0.0
        };
        self.lambda + prior
    }
}

/// Multi-label trainer that fits a conditional-logit model over candidate
/// sets instead of running an online update rule.
#[derive(Debug, Clone, Default)]
pub struct ConditionalLogitTrainer {
    params: ConditionalLogitParams,
    verbose: bool,
}

impl ConditionalLogitTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable verbose output
    pub fn verbose(&mut self, enabled: bool) -> &mut Self {
        self.verbose = enabled;
        self
    }

    pub fn params(&self) -> &ConditionalLogitParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ConditionalLogitParams {
        &mut self.params
    }

    pub fn with_lambda(mut self, lambda: f64) -> Result<Self> {
        self.params.set_lambda(lambda)?;
        Ok(self)
    }

    pub fn with_gaussian(mut self, gaussian: f64) -> Result<Self> {
        self.params.set_gaussian(gaussian)?;
        Ok(self)
    }

    pub fn with_lasso(mut self, lasso: f64) -> Result<Self> {
        self.params.set_lasso(lasso)?;
        Ok(self)
    }

    /// Fit a shared weight vector over aggregate vectors.
    ///
    /// Removed features are left out of the solve and come back as zero
    /// weights.
    pub fn train_multi_label<F: FeatureVector>(
        &self,
        data: &TrainingData<F>,
    ) -> Result<LinearClassifier> {
        check_depth(data)?;
        let table = LongTable::new(data);
        let solved = self.solve(&table)?;
        let weights = table.expand_weights(&solved)?;
        Ok(LinearClassifier::multi_label(WeightAggregate::Single(weights)))
    }

    /// Minimize the regularized negative log-likelihood of the chosen rows.
    pub fn solve(&self, table: &LongTable) -> Result<Vec<f64>> {
        let num_columns = table.columns().len();
        let mut x = vec![0.0; num_columns];
        if num_columns == 0 {
            return Ok(x);
        }

        let groups: Vec<&[LongRow]> = table.groups().collect();
        let l2 = self.params.l2();
        let lasso = self.params.lasso;
        let verbose = self.verbose;

        if verbose {
            info!(
                individuals = groups.len(),
                columns = num_columns,
                l2,
                lasso,
                "conditional logit started"
            );
        }

        let mut scores = Vec::new();
        let evaluate = |x: &[f64], gx: &mut [f64]| -> std::result::Result<f64, anyhow::Error> {
            gx.fill(0.0);
            let mut loss = 0.0;

            for rows in &groups {
                scores.clear();
                scores.extend(
                    rows.iter()
                        .map(|row| row.features.iter().zip(x).map(|(f, w)| f * w).sum::<f64>()),
                );
                let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let z: f64 = scores.iter().map(|s| (s - max).exp()).sum();
                let log_z = max + z.ln();

                for (row, score) in rows.iter().zip(scores.iter()) {
                    let p = (score - log_z).exp();
                    let observed = if row.choice { 1.0 } else { 0.0 };
                    if row.choice {
                        loss -= score - log_z;
                    }
                    for (g, f) in gx.iter_mut().zip(&row.features) {
                        *g += (p - observed) * f;
                    }
                }
            }

            if l2 > 0.0 {
                for (g, w) in gx.iter_mut().zip(x) {
                    *g += 2.0 * l2 * w;
                    loss += l2 * w * w;
                }
            }

            Ok(loss)
        };

        let progress = |prgr: &liblbfgs::Progress| -> bool {
            if verbose {
                info!(
                    iteration = prgr.niter,
                    loss = prgr.fx,
                    xnorm = prgr.xnorm,
                    gnorm = prgr.gnorm,
                    "conditional logit iteration"
                );
            } else {
                debug!(iteration = prgr.niter, loss = prgr.fx, "conditional logit iteration");
            }
            false
        };

        let mut lbfgs = liblbfgs::lbfgs()
            .with_max_iterations(self.params.max_iterations)
            .with_epsilon(self.params.epsilon)
            .with_fx_delta(self.params.delta, self.params.period);
        // OWL-QN only supports backtracking line search
        if lasso > 0.0 {
            lbfgs = lbfgs
                .with_linesearch_algorithm("BacktrackingStrongWolfe")
                .with_orthantwise(lasso, 0, num_columns);
        }

        let report = lbfgs
            .minimize(&mut x, evaluate, progress)
            .map_err(|e| Error::Solver(e.to_string()))?;

        if verbose {
            info!(loss = report.fx, "conditional logit finished");
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::feature::{AggregateFeatureVector, FeatureVectorFactory};
    use crate::Attribute;

    fn data() -> TrainingData<AggregateFeatureVector> {
        let factory = FeatureVectorFactory::default();
        let mut instances = Vec::new();
        for &(a, b) in &[(3.0, 1.0), (1.0, 2.0), (4.0, 0.5)] {
            let fv = factory
                .make_aggregate(&[
                    vec![Attribute::new("bias", 1.0), Attribute::new("size", a)],
                    vec![Attribute::new("bias", 1.0), Attribute::new("size", b)],
                ])
                .unwrap();
            let correct = if a > b { 0 } else { 1 };
            instances.push((fv, correct));
        }
        TrainingData::new(instances).unwrap()
    }

    #[test]
    fn test_long_table_drops_removed_columns() {
        let mut data = data();
        assert_eq!(data.remove_non_discriminative(), 1);
        let table = LongTable::new(&data);
        assert_eq!(table.column_names(), &["size".to_string()]);
        assert_eq!(table.rows().len(), 6);
        assert_eq!(table.groups().count(), 3);
        assert_eq!(
            table.rows()[0],
            LongRow {
                individual: 1,
                label: 1,
                choice: true,
                features: vec![3.0],
            }
        );

        let mut csv = Vec::new();
        table.write_csv(&mut csv).unwrap();
        let csv = String::from_utf8(csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("individual,label,choice,size"));
        assert_eq!(lines.next(), Some("1,1,TRUE,3"));
        assert_eq!(lines.next(), Some("1,2,FALSE,1"));
    }

    #[test]
    fn test_csv_quotes_awkward_names() {
        let factory = FeatureVectorFactory::default();
        let fv = factory
            .make_aggregate(&[
                vec![Attribute::new("near=Paris,France", 1.0)],
                vec![Attribute::new("say \"hi\"", 2.0)],
            ])
            .unwrap();
        let data = TrainingData::new(vec![(fv, 0)]).unwrap();

        let mut csv = Vec::new();
        LongTable::new(&data).write_csv(&mut csv).unwrap();
        let csv = String::from_utf8(csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "individual,label,choice,\"near=Paris,France\",\"say \"\"hi\"\"\""
        );
        assert_eq!(lines[1], "1,1,TRUE,1,0");
        assert_eq!(lines[2], "1,2,FALSE,0,2");
        assert_eq!(csv_field("plain"), "plain");
    }

    #[test]
    fn test_expand_weights_pads_removed() {
        let data = data().with_removed_features(BTreeSet::from([0]));
        let table = LongTable::new(&data);
        let weights = table.expand_weights(&[2.5]).unwrap();
        assert_eq!(weights.as_slice(), &[0.0, 2.5]);
        assert!(table.expand_weights(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_params_validation() {
        let mut params = ConditionalLogitParams::default();
        assert!(params.set_lambda(-1.0).is_err());
        assert!(params.set_gaussian(f64::NAN).is_err());
        assert!(params.set_lasso(0.5).is_ok());
        assert!(params.set_max_iterations(0).is_err());
    }
}
