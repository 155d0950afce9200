//! A classical simulator of the operation stream.
//!
//! Every live qubit holds a concrete boolean. Phase flips and global phase
//! rotations accumulate into a single global phase, kept in degrees.
//! Superposition is never represented, so the simulator is an
//! exact oracle only for reversible (permutation) programs, plus the
//! measurement-based uncomputation protocol whose phase fixups it checks.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use revel_core::{
    ClassicalSimState, CoreError, CoreResult, MbuStart, Operation, QubitIntersection, Quint, Qubit,
    Qureg, RValue, Sink,
};

use super::outcome::OutcomeChooser;
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};

struct PendingMbu {
    qureg: Qureg,
    phase_degrees: f64,
}

/// The unit complex number at `degrees`, exact on multiples of 90.
fn unit_phase(degrees: f64) -> Complex64 {
    match degrees.rem_euclid(360.0) {
        d if d == 0.0 => Complex64::new(1.0, 0.0),
        d if d == 90.0 => Complex64::new(0.0, 1.0),
        d if d == 180.0 => Complex64::new(-1.0, 0.0),
        d if d == 270.0 => Complex64::new(0.0, -1.0),
        d => Complex64::from_polar(1.0, d.to_radians()),
    }
}

/// A full copy of the simulator's observable state.
#[derive(Debug, Clone, PartialEq)]
pub struct SimSnapshot {
    bits: FxHashMap<Qubit, bool>,
    phase_degrees: f64,
}

impl SimSnapshot {
    /// Number of live qubits.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether no qubit is live.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The captured global phase.
    pub fn phase(&self) -> Complex64 {
        unit_phase(self.phase_degrees)
    }
}

/// Classical simulation backend.
pub struct ClassicalSim {
    config: SimConfig,
    bits: FxHashMap<Qubit, bool>,
    phase_degrees: f64,
    rng: StdRng,
    chooser: OutcomeChooser,
    pending_mbu: Vec<PendingMbu>,
}

impl ClassicalSim {
    /// A simulator with default settings.
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    /// A simulator with explicit settings.
    pub fn with_config(config: SimConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let chooser = OutcomeChooser::from(config.mbu_bias);
        Self {
            config,
            bits: FxHashMap::default(),
            phase_degrees: 0.0,
            rng,
            chooser,
            pending_mbu: Vec::new(),
        }
    }

    /// Replace the X-basis outcome policy.
    pub fn with_outcome_chooser(mut self, chooser: OutcomeChooser) -> Self {
        self.chooser = chooser;
        self
    }

    /// Replace the X-basis outcome policy in place.
    pub fn set_outcome_chooser(&mut self, chooser: OutcomeChooser) {
        self.chooser = chooser;
    }

    /// Wrap for use with [`revel_core::enter_sink`].
    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    /// The active settings.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The accumulated global phase.
    pub fn phase(&self) -> Complex64 {
        unit_phase(self.phase_degrees)
    }

    /// The accumulated global phase in degrees, in `[0, 360)`.
    pub fn phase_degrees(&self) -> f64 {
        self.phase_degrees
    }

    /// Number of live qubits.
    pub fn live_qubits(&self) -> usize {
        self.bits.len()
    }

    /// Current value of an integer register.
    pub fn resolve_quint(&self, quint: &Quint) -> CoreResult<u64> {
        self.read_quint(quint.qureg())
    }

    /// Current value of an expression.
    pub fn resolve_rvalue(&self, rvalue: &RValue) -> CoreResult<u64> {
        rvalue.resolve(self)
    }

    /// Fill a register with random bits.
    pub fn randomize(&mut self, qureg: &Qureg) -> CoreResult<()> {
        for q in qureg {
            let bit = self.rng.gen_bool(0.5);
            self.write_bit(q, bit)?;
        }
        Ok(())
    }

    /// Copy the current state.
    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            bits: self.bits.clone(),
            phase_degrees: self.phase_degrees,
        }
    }

    /// Apply an operation's classical effect directly, forward or undone,
    /// without decomposing it.
    pub fn apply(&mut self, op: &Operation, forward: bool) -> CoreResult<()> {
        op.mutate_state(self, forward, &QubitIntersection::ALWAYS)
    }

    /// Apply `op` and then undo it, checking the state is restored.
    pub fn check_round_trip(&mut self, op: &Operation) -> SimResult<()> {
        let before = self.snapshot();
        self.apply(op, true)?;
        self.apply(op, false)?;
        if self.snapshot() != before {
            return Err(SimError::RoundTripMismatch(op.to_string()));
        }
        Ok(())
    }

    fn bit_mut(&mut self, qubit: &Qubit) -> CoreResult<&mut bool> {
        self.bits
            .get_mut(qubit)
            .ok_or_else(|| CoreError::UnknownLocation(qubit.to_string()))
    }
}

impl Default for ClassicalSim {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClassicalSim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassicalSim")
            .field("config", &self.config)
            .field("live_qubits", &self.bits.len())
            .field("phase_degrees", &self.phase_degrees)
            .field("chooser", &self.chooser)
            .field("pending_mbu", &self.pending_mbu.len())
            .finish()
    }
}

impl ClassicalSimState for ClassicalSim {
    fn read_bit(&self, qubit: &Qubit) -> CoreResult<bool> {
        self.bits
            .get(qubit)
            .copied()
            .ok_or_else(|| CoreError::UnknownLocation(qubit.to_string()))
    }

    fn write_bit(&mut self, qubit: &Qubit, value: bool) -> CoreResult<()> {
        *self.bit_mut(qubit)? = value;
        Ok(())
    }

    fn alloc_register(&mut self, qureg: &Qureg) -> CoreResult<()> {
        if let Some(q) = qureg.iter().find(|q| self.bits.contains_key(*q)) {
            return Err(CoreError::DoubleAllocation(q.to_string()));
        }
        for q in qureg {
            self.bits.insert(q.clone(), false);
        }
        trace!(%qureg, "allocated");
        Ok(())
    }

    fn release_register(&mut self, qureg: &Qureg, dirty: bool) -> CoreResult<()> {
        let mut value = 0u64;
        let mut nonzero = false;
        for (i, q) in qureg.iter().enumerate() {
            if self.read_bit(q)? {
                nonzero = true;
                if i < 64 {
                    value |= 1 << i;
                }
            }
        }
        // The register is retired even when the release is rejected.
        for q in qureg {
            self.bits.remove(q);
        }
        if nonzero {
            if !dirty && self.config.enforce_release_at_zero {
                return Err(CoreError::ReleasedNonZero {
                    register: qureg.to_string(),
                    value,
                });
            }
            warn!(%qureg, value, dirty, "discarding non-zero bits on release");
        }
        trace!(%qureg, dirty, "released");
        Ok(())
    }

    fn flip_phase(&mut self) {
        self.rotate_phase(180.0);
    }

    fn rotate_phase(&mut self, degrees: f64) {
        self.phase_degrees = (self.phase_degrees + degrees).rem_euclid(360.0);
    }
}

impl Sink for ClassicalSim {
    fn name(&self) -> &str {
        "classical_sim"
    }

    fn did_allocate(&mut self, qureg: &Qureg) -> CoreResult<()> {
        self.alloc_register(qureg)
    }

    fn release(&mut self, qureg: &Qureg, dirty: bool) -> CoreResult<()> {
        self.release_register(qureg, dirty)
    }

    fn phase_flip(&mut self, controls: &QubitIntersection) -> CoreResult<()> {
        if self.resolve_controls(controls)? {
            trace!(%controls, "phase flip");
            self.flip_phase();
        }
        Ok(())
    }

    fn global_phase(&mut self, degrees: f64, controls: &QubitIntersection) -> CoreResult<()> {
        if self.resolve_controls(controls)? {
            trace!(degrees, %controls, "global phase");
            self.rotate_phase(degrees);
        }
        Ok(())
    }

    fn toggle(&mut self, targets: &Qureg, controls: &QubitIntersection) -> CoreResult<()> {
        if !self.resolve_controls(controls)? {
            return Ok(());
        }
        trace!(%targets, %controls, "toggle");
        for q in targets {
            let bit = self.bit_mut(q)?;
            *bit = !*bit;
        }
        Ok(())
    }

    fn measure(&mut self, qureg: &Qureg, reset: bool) -> CoreResult<u64> {
        let value = self.read_quint(qureg)?;
        if reset {
            self.write_quint(qureg, 0)?;
        }
        debug!(%qureg, value, reset, "measured");
        Ok(value)
    }

    fn start_mbu(&mut self, qureg: &Qureg) -> CoreResult<MbuStart> {
        let phase_degrees = self.phase_degrees;
        let mut outcomes = Vec::with_capacity(qureg.len());
        let mut kickback = false;
        for q in qureg {
            let outcome = self.chooser.choose(q, &mut self.rng);
            let bit = self.read_bit(q)?;
            kickback ^= outcome && bit;
            outcomes.push(outcome);
            self.write_bit(q, false)?;
        }
        if kickback {
            self.flip_phase();
        }
        self.pending_mbu.push(PendingMbu {
            qureg: qureg.clone(),
            phase_degrees,
        });
        debug!(%qureg, kickback, "X-basis measurement for uncomputation");
        Ok(MbuStart::new(outcomes))
    }

    fn end_mbu(&mut self, qureg: &Qureg, _start: &MbuStart) -> CoreResult<()> {
        let pending = match self.pending_mbu.pop() {
            Some(pending) if pending.qureg == *qureg => pending,
            Some(other) => {
                self.pending_mbu.push(other);
                return Err(CoreError::NoPendingMbu(qureg.to_string()));
            }
            None => return Err(CoreError::NoPendingMbu(qureg.to_string())),
        };
        if pending.phase_degrees != self.phase_degrees {
            return Err(CoreError::PhaseFixupMismatch(qureg.to_string()));
        }
        Ok(())
    }

    fn abort_mbu(&mut self, qureg: &Qureg) -> CoreResult<()> {
        let index = self
            .pending_mbu
            .iter()
            .rposition(|pending| pending.qureg == *qureg)
            .ok_or_else(|| CoreError::NoPendingMbu(qureg.to_string()))?;
        self.pending_mbu.remove(index);
        warn!(%qureg, "measurement-based uncomputation aborted");
        Ok(())
    }
}
