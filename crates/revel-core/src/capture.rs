//! Sinks that record or tally the operation stream instead of executing it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::context::enter_sink;
use crate::error::CoreResult;
use crate::guard::QubitIntersection;
use crate::operation::Operation;
use crate::qubit::Qureg;
use crate::sink::Sink;

/// Records every operation, undecomposed, with its effective guard folded in.
#[derive(Debug, Default)]
pub struct Capture {
    ops: Vec<Operation>,
}

impl Capture {
    /// An empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded operations.
    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    /// Consume the capture.
    pub fn into_ops(self) -> Vec<Operation> {
        self.ops
    }

    fn record(&mut self, op: Operation, controls: &QubitIntersection) {
        if op.is_guarded() {
            self.ops.push(op.controlled_by(controls.clone()));
        } else {
            self.ops.push(op);
        }
    }
}

impl Sink for Capture {
    fn name(&self) -> &str {
        "capture"
    }

    fn intercept(&mut self, op: &Operation, controls: &QubitIntersection) -> CoreResult<bool> {
        if op.is_measurement() {
            return Ok(false);
        }
        self.record(op.clone(), controls);
        Ok(true)
    }

    fn did_allocate(&mut self, qureg: &Qureg) -> CoreResult<()> {
        self.ops.push(Operation::Alloc(qureg.clone()));
        Ok(())
    }

    fn release(&mut self, qureg: &Qureg, dirty: bool) -> CoreResult<()> {
        self.ops.push(Operation::Release {
            qureg: qureg.clone(),
            dirty,
        });
        Ok(())
    }

    fn phase_flip(&mut self, controls: &QubitIntersection) -> CoreResult<()> {
        self.record(Operation::PhaseFlip, controls);
        Ok(())
    }

    fn toggle(&mut self, targets: &Qureg, controls: &QubitIntersection) -> CoreResult<()> {
        self.record(Operation::Toggle(targets.clone()), controls);
        Ok(())
    }
}

/// Run `body` against a fresh [`Capture`] and return what it emitted.
pub fn capture<R>(body: impl FnOnce() -> CoreResult<R>) -> CoreResult<(R, Vec<Operation>)> {
    let sink = Rc::new(RefCell::new(Capture::new()));
    let result = {
        let _scope = enter_sink(&sink);
        body()?
    };
    let ops = sink.take().into_ops();
    Ok((result, ops))
}

/// Tallies primitive gates after full decomposition.
///
/// Toggles are counted per target, keyed by the number of controlling
/// qubits (0 = NOT, 1 = CNOT, 2 = Toffoli, ...).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GateCounts {
    /// Toggle count keyed by control count.
    pub toggles: BTreeMap<usize, usize>,
    /// Phase flips keyed by control count.
    pub phase_flips: BTreeMap<usize, usize>,
    /// Other phase rotations keyed by control count.
    pub phase_rotations: BTreeMap<usize, usize>,
    /// Qubits currently allocated.
    pub live_qubits: usize,
    /// Peak of `live_qubits`.
    pub peak_qubits: usize,
    /// Number of allocations.
    pub allocations: usize,
}

impl GateCounts {
    /// An empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total toggles with at least `min_controls` controls.
    pub fn toggles_with_at_least(&self, min_controls: usize) -> usize {
        self.toggles.range(min_controls..).map(|(_, n)| n).sum()
    }

    /// Total toggles.
    pub fn total_toggles(&self) -> usize {
        self.toggles_with_at_least(0)
    }
}

impl Sink for GateCounts {
    fn name(&self) -> &str {
        "gate_counts"
    }

    fn did_allocate(&mut self, qureg: &Qureg) -> CoreResult<()> {
        self.allocations += 1;
        self.live_qubits += qureg.len();
        self.peak_qubits = self.peak_qubits.max(self.live_qubits);
        Ok(())
    }

    fn release(&mut self, qureg: &Qureg, _dirty: bool) -> CoreResult<()> {
        self.live_qubits = self.live_qubits.saturating_sub(qureg.len());
        Ok(())
    }

    fn phase_flip(&mut self, controls: &QubitIntersection) -> CoreResult<()> {
        *self.phase_flips.entry(controls.len()).or_default() += 1;
        Ok(())
    }

    fn global_phase(&mut self, degrees: f64, controls: &QubitIntersection) -> CoreResult<()> {
        match degrees.rem_euclid(360.0) {
            d if d == 0.0 => {}
            d if d == 180.0 => return self.phase_flip(controls),
            _ => *self.phase_rotations.entry(controls.len()).or_default() += 1,
        }
        Ok(())
    }

    fn toggle(&mut self, targets: &Qureg, controls: &QubitIntersection) -> CoreResult<()> {
        *self.toggles.entry(controls.len()).or_default() += targets.len();
        Ok(())
    }
}
