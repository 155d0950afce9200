//! Single-step helpers over the primitive operations.

use crate::context::emit;
use crate::error::CoreResult;
use crate::guard::QubitIntersection;
use crate::operation::Operation;
use crate::quint::Quint;
use crate::qubit::{Qubit, Qureg};

pub(crate) fn toggle_bit(target: &Qubit, controls: QubitIntersection) -> CoreResult<()> {
    emit(Operation::Toggle(Qureg::from(target.clone())).controlled_by(controls))
}

/// Toggle every qubit of `targets`.
pub fn toggle(targets: &Qureg) -> CoreResult<()> {
    emit(Operation::Toggle(targets.clone()))
}

/// `target ^= control`
pub fn cnot(control: &Qubit, target: &Qubit) -> CoreResult<()> {
    toggle_bit(target, control.into())
}

/// Negate the amplitude where `condition` holds.
pub fn phase_flip(condition: impl Into<QubitIntersection>) -> CoreResult<()> {
    emit(Operation::PhaseFlip.controlled_by(condition))
}

/// Exchange two registers bit by bit where `control` holds. Only the middle
/// XOR of each triple needs the guard.
pub fn swap(a: &Quint, b: &Quint, control: impl Into<QubitIntersection>) -> CoreResult<()> {
    let control = control.into();
    for (x, y) in a.iter().zip(b.iter()) {
        toggle_bit(x, y.into())?;
        toggle_bit(y, control.and(x))?;
        toggle_bit(x, y.into())?;
    }
    Ok(())
}
