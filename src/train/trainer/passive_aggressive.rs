use std::convert::TryFrom;

use super::{LossInputs, PassiveAggressive, Trainer, TrainingAlgorithm};
use crate::error::{Error, Result};

/// PA variants for Passive Aggressive training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaType {
    /// PA (no slack)
    Pa,
    /// PA-I (soft margin)
    PaI,
    /// PA-II (squared slack)
    PaII,
}

impl TryFrom<u8> for PaType {
    type Error = Error;

    fn try_from(variant: u8) -> Result<Self> {
        match variant {
            0 => Ok(PaType::Pa),
            1 => Ok(PaType::PaI),
            2 => Ok(PaType::PaII),
            _ => Err(Error::invalid("variant must be 0, 1 or 2")),
        }
    }
}

impl From<PaType> for u8 {
    fn from(pa_type: PaType) -> u8 {
        match pa_type {
            PaType::Pa => 0,
            PaType::PaI => 1,
            PaType::PaII => 2,
        }
    }
}

/// Passive Aggressive training parameters.
#[derive(Debug, Clone)]
pub struct PassiveAggressiveParams {
    pa_type: PaType,
    aggressiveness: f64,
}

impl Default for PassiveAggressiveParams {
    fn default() -> Self {
        Self {
            pa_type: PaType::PaI,
            aggressiveness: 1.0,
        }
    }
}

impl PassiveAggressiveParams {
    pub fn pa_type(&self) -> PaType {
        self.pa_type
    }

    pub fn set_pa_type(&mut self, pa_type: PaType) {
        self.pa_type = pa_type;
    }

    /// Aggressiveness parameter C
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
}

/// Step size `tau` of a PA update.
///
/// Zero squared magnitude means the compared feature vectors are identical;
/// no update can change the margin, so the step is zero.
pub(super) fn pa_step(pa_type: PaType, aggressiveness: f64, loss: f64, sqmag: f64) -> f64 {
    if sqmag == 0.0 {
        return 0.0;
    }
    match pa_type {
        // PA (no slack): tau = loss / ||diff||^2
        PaType::Pa => loss / sqmag,
        // PA-I (soft margin): tau = min(C, loss / ||diff||^2)
        PaType::PaI => (loss / sqmag).min(aggressiveness),
        // PA-II (squared slack): tau = loss / (||diff||^2 + 1/(2*C))
        PaType::PaII => loss / (sqmag + 1.0 / (2.0 * aggressiveness)),
    }
}

impl TrainingAlgorithm for PassiveAggressive {
    type Params = PassiveAggressiveParams;

    const NAME: &'static str = "passive-aggressive";

    fn scale_factor(params: &PassiveAggressiveParams, inputs: &LossInputs) -> f64 {
        pa_step(
            params.pa_type,
            params.aggressiveness,
            inputs.loss(),
            inputs.sqmag,
        )
    }
}

impl Trainer<PassiveAggressive> {
    /// Create a new Passive Aggressive trainer
    pub fn passive_aggressive() -> Self {
        Self::new()
    }

    /// Set PA type (builder pattern)
    pub fn with_pa_type(mut self, pa_type: PaType) -> Self {
        self.params.set_pa_type(pa_type);
        self
    }

    /// Set aggressiveness parameter C (builder pattern)
    pub fn with_aggressiveness(mut self, aggressiveness: f64) -> Result<Self> {
        self.params.set_aggressiveness(aggressiveness)?;
        Ok(self)
    }
}
