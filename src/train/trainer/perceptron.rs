use super::{LossInputs, Perceptron, Trainer, TrainingAlgorithm};
use crate::error::{Error, Result};

/// Basic perceptron training parameters.
#[derive(Debug, Clone)]
pub struct PerceptronParams {
    alpha: f64,
}

impl Default for PerceptronParams {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

impl PerceptronParams {
    /// Learning rate
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        if !(alpha > 0.0) {
            return Err(Error::invalid("alpha must be positive"));
        }
        self.alpha = alpha;
        Ok(())
    }
}

/// `-1`, `0` or `+1`, with zero mapped to zero
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl TrainingAlgorithm for Perceptron {
    type Params = PerceptronParams;

    const NAME: &'static str = "perceptron";

    fn scale_factor(params: &PerceptronParams, inputs: &LossInputs) -> f64 {
        if inputs.binary {
            // alpha * (y - sign(score)), with the sign of y folded out by the caller
            params.alpha * (1.0 - sign(inputs.margin))
        } else if inputs.margin <= 0.0 {
            params.alpha
        } else {
            0.0
        }
    }
}

impl Trainer<Perceptron> {
    /// Create a new basic perceptron trainer
    pub fn perceptron() -> Self {
        Self::new()
    }

    /// Create a new perceptron trainer that returns averaged weights
    pub fn averaged_perceptron() -> Self {
        Self::new().with_averaging(true)
    }

    /// Set learning rate (builder pattern)
    pub fn with_alpha(mut self, alpha: f64) -> Result<Self> {
        self.params.set_alpha(alpha)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(margin: f64, binary: bool) -> LossInputs {
        LossInputs {
            margin,
            required_margin: 1.0,
            sqmag: 1.0,
            binary,
        }
    }

    #[test]
    fn test_binary_scale() {
        let params = PerceptronParams::default();
        assert_eq!(Perceptron::scale_factor(&params, &inputs(0.5, true)), 0.0);
        assert_eq!(Perceptron::scale_factor(&params, &inputs(0.0, true)), 1.0);
        assert_eq!(Perceptron::scale_factor(&params, &inputs(-0.5, true)), 2.0);
    }

    #[test]
    fn test_multi_label_scale() {
        let mut params = PerceptronParams::default();
        params.set_alpha(0.5).unwrap();
        assert_eq!(Perceptron::scale_factor(&params, &inputs(0.1, false)), 0.0);
        assert_eq!(Perceptron::scale_factor(&params, &inputs(0.0, false)), 0.5);
        assert_eq!(Perceptron::scale_factor(&params, &inputs(-3.0, false)), 0.5);
    }

    #[test]
    fn test_alpha_validation() {
        let mut params = PerceptronParams::default();
        assert!(params.set_alpha(0.0).is_err());
        assert!(params.set_alpha(-1.0).is_err());
        assert!(params.set_alpha(f64::NAN).is_err());
        assert_eq!(params.alpha(), 1.0);
    }
}
