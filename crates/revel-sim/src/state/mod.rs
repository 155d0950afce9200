//! Concrete simulation state.

pub mod outcome;
pub mod sim;

pub use outcome::OutcomeChooser;
pub use sim::{ClassicalSim, SimSnapshot};
