//! The boundary between emitted operations and whatever consumes them.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::guard::QubitIntersection;
use crate::operation::Operation;
use crate::qubit::{Qubit, Qureg};
use crate::util::little_endian_int;

/// Outcomes reported by the sink when a measurement-based uncomputation
/// starts: one X-basis result per measured qubit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MbuStart {
    outcomes: Vec<bool>,
}

impl MbuStart {
    /// Wrap raw outcomes.
    pub fn new(outcomes: Vec<bool>) -> Self {
        Self { outcomes }
    }

    /// Per-qubit outcomes, least significant first.
    pub fn outcomes(&self) -> &[bool] {
        &self.outcomes
    }

    /// Outcomes packed into an integer.
    pub fn mask(&self) -> u64 {
        little_endian_int(&self.outcomes)
    }

    /// Parity of `value` restricted to the measured-one positions. This is
    /// the sign picked up by the branch where the register held `value`.
    pub fn phase_parity(&self, value: u64) -> bool {
        (self.mask() & value).count_ones() % 2 == 1
    }
}

/// A consumer of the operation stream.
///
/// Only primitives reach the notification methods. Composite operations are
/// offered to [`Sink::intercept`] first and decomposed by the core when the
/// sink declines.
pub trait Sink {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// Offer an operation before decomposition. Return `true` to consume it.
    fn intercept(&mut self, _op: &Operation, _controls: &QubitIntersection) -> CoreResult<bool> {
        Ok(false)
    }

    /// Allocate a fresh register and return its handle.
    fn allocate(&mut self, name: &str, len: usize) -> CoreResult<Qureg> {
        let qureg = Qureg::named(name, len);
        self.did_allocate(&qureg)?;
        Ok(qureg)
    }

    /// A register handle has come into existence (fresh or replayed).
    fn did_allocate(&mut self, qureg: &Qureg) -> CoreResult<()>;

    /// A register is going out of existence.
    fn release(&mut self, qureg: &Qureg, dirty: bool) -> CoreResult<()>;

    /// Negate the amplitude of the branches where `controls` holds.
    fn phase_flip(&mut self, controls: &QubitIntersection) -> CoreResult<()>;

    /// Rotate the phase of the branches where `controls` holds. Sinks that
    /// only know phase flips accept multiples of 180 degrees.
    fn global_phase(&mut self, degrees: f64, controls: &QubitIntersection) -> CoreResult<()> {
        match degrees.rem_euclid(360.0) {
            d if d == 0.0 => Ok(()),
            d if d == 180.0 => self.phase_flip(controls),
            _ => Err(self.not_implemented("global_phase")),
        }
    }

    /// Toggle every target qubit in the branches where `controls` holds.
    fn toggle(&mut self, targets: &Qureg, controls: &QubitIntersection) -> CoreResult<()>;

    /// Measure a register in the computational basis.
    fn measure(&mut self, _qureg: &Qureg, _reset: bool) -> CoreResult<u64> {
        Err(self.not_implemented("measure"))
    }

    /// Measure a register in the X basis, zeroing it.
    fn start_mbu(&mut self, _qureg: &Qureg) -> CoreResult<MbuStart> {
        Err(self.not_implemented("start_mbu"))
    }

    /// Close a measurement-based uncomputation once its fixups ran.
    fn end_mbu(&mut self, _qureg: &Qureg, _start: &MbuStart) -> CoreResult<()> {
        Err(self.not_implemented("end_mbu"))
    }

    /// Drop an open measurement-based uncomputation whose fixup failed.
    fn abort_mbu(&mut self, _qureg: &Qureg) -> CoreResult<()> {
        Ok(())
    }

    /// Error for an operation this sink cannot perform.
    fn not_implemented(&self, operation: &'static str) -> CoreError {
        CoreError::NotImplemented {
            sink: self.name().to_string(),
            operation,
        }
    }
}

/// Concrete bit values, the only place where values actually change.
///
/// Registers are read as little-endian `u64`s; bits at positions 64 and above
/// must be zero to be readable.
pub trait ClassicalSimState {
    /// Current value of a bit.
    fn read_bit(&self, qubit: &Qubit) -> CoreResult<bool>;

    /// Overwrite a bit.
    fn write_bit(&mut self, qubit: &Qubit, value: bool) -> CoreResult<()>;

    /// Bring a register into existence at zero.
    fn alloc_register(&mut self, qureg: &Qureg) -> CoreResult<()>;

    /// Remove a register, checking it is zero unless `dirty`.
    fn release_register(&mut self, qureg: &Qureg, dirty: bool) -> CoreResult<()>;

    /// Negate the global phase.
    fn flip_phase(&mut self);

    /// Rotate the global phase by `degrees`.
    fn rotate_phase(&mut self, degrees: f64);

    /// Current value of a register.
    fn read_quint(&self, qureg: &Qureg) -> CoreResult<u64> {
        let mut value = 0u64;
        for (i, q) in qureg.iter().enumerate() {
            if self.read_bit(q)? {
                if i >= 64 {
                    return Err(CoreError::ValueTooWide {
                        register: qureg.to_string(),
                        len: qureg.len(),
                    });
                }
                value |= 1 << i;
            }
        }
        Ok(value)
    }

    /// Overwrite a register. Bits above the register width are dropped.
    fn write_quint(&mut self, qureg: &Qureg, value: u64) -> CoreResult<()> {
        for (i, q) in qureg.iter().enumerate() {
            self.write_bit(q, i < 64 && (value >> i) & 1 == 1)?;
        }
        Ok(())
    }

    /// XOR a value into a register.
    fn xor_quint(&mut self, qureg: &Qureg, value: u64) -> CoreResult<()> {
        for (i, q) in qureg.iter().enumerate().take(64) {
            if (value >> i) & 1 == 1 {
                let bit = self.read_bit(q)?;
                self.write_bit(q, !bit)?;
            }
        }
        Ok(())
    }

    /// Whether every qubit of the guard is on.
    fn resolve_controls(&self, controls: &QubitIntersection) -> CoreResult<bool> {
        if controls.is_never() {
            return Ok(false);
        }
        for q in controls.qubits() {
            if !self.read_bit(q)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
