//! Outcome policy for X-basis measurements.

use std::fmt;

use rand::Rng;
use rand::rngs::StdRng;
use revel_core::Qubit;

/// Picks the X-basis outcome of each qubit erased by a measurement-based
/// uncomputation.
#[derive(Default)]
pub enum OutcomeChooser {
    /// Fair coin flips from the simulator's random source.
    #[default]
    Random,
    /// The same outcome for every qubit.
    Fixed(bool),
    /// Caller supplied policy.
    Custom(Box<dyn FnMut(&Qubit) -> bool>),
}

impl OutcomeChooser {
    /// Wrap a closure.
    pub fn custom(choose: impl FnMut(&Qubit) -> bool + 'static) -> Self {
        OutcomeChooser::Custom(Box::new(choose))
    }

    pub(crate) fn choose(&mut self, qubit: &Qubit, rng: &mut StdRng) -> bool {
        match self {
            OutcomeChooser::Random => rng.gen_bool(0.5),
            OutcomeChooser::Fixed(outcome) => *outcome,
            OutcomeChooser::Custom(choose) => choose(qubit),
        }
    }
}

impl From<Option<bool>> for OutcomeChooser {
    fn from(bias: Option<bool>) -> Self {
        bias.map_or(OutcomeChooser::Random, OutcomeChooser::Fixed)
    }
}

impl fmt::Debug for OutcomeChooser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeChooser::Random => write!(f, "Random"),
            OutcomeChooser::Fixed(outcome) => write!(f, "Fixed({outcome})"),
            OutcomeChooser::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
