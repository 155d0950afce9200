//! Ambient emission context.
//!
//! Two thread-local stacks drive emission: the sink stack (who receives
//! operations) and the guard stack (which controls apply to them). Both are
//! pushed and popped through RAII scopes. Each sink frame also tracks its
//! live allocations so releases can be checked for LIFO order.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::error::{CoreError, CoreResult};
use crate::guard::QubitIntersection;
use crate::operation::Operation;
use crate::qubit::Qureg;
use crate::sink::Sink;

/// A sink shared between the context stack and its owner.
pub type SharedSink = Rc<RefCell<dyn Sink>>;

struct SinkFrame {
    sink: SharedSink,
    live: Vec<Qureg>,
}

thread_local! {
    static SINKS: RefCell<Vec<SinkFrame>> = const { RefCell::new(Vec::new()) };
    static CONTROLS: RefCell<Vec<QubitIntersection>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a sink on top of the stack until dropped.
#[must_use = "the sink is popped as soon as the scope is dropped"]
pub struct SinkScope {
    depth: usize,
    _not_send: PhantomData<Rc<()>>,
}

/// Route emission to `sink` until the returned scope is dropped.
pub fn enter_sink<S: Sink + 'static>(sink: &Rc<RefCell<S>>) -> SinkScope {
    let shared: SharedSink = sink.clone();
    let depth = SINKS.with_borrow_mut(|frames| {
        frames.push(SinkFrame {
            sink: shared,
            live: Vec::new(),
        });
        frames.len()
    });
    debug!(depth, "entered sink scope");
    SinkScope {
        depth,
        _not_send: PhantomData,
    }
}

impl Drop for SinkScope {
    fn drop(&mut self) {
        SINKS.with_borrow_mut(|frames| {
            debug_assert_eq!(frames.len(), self.depth, "sink scopes dropped out of order");
            frames.truncate(self.depth);
            if let Some(frame) = frames.pop() {
                if !frame.live.is_empty() {
                    warn!(live = frame.live.len(), "sink scope closed with live registers");
                }
            }
        });
        debug!(depth = self.depth, "left sink scope");
    }
}

/// Run `body` with emission routed to `sink`.
pub fn with_sink<S: Sink + 'static, R>(sink: &Rc<RefCell<S>>, body: impl FnOnce() -> R) -> R {
    let _scope = enter_sink(sink);
    body()
}

pub(crate) fn with_top_sink<R>(f: impl FnOnce(&mut dyn Sink) -> CoreResult<R>) -> CoreResult<R> {
    let sink = SINKS
        .with_borrow(|frames| frames.last().map(|frame| frame.sink.clone()))
        .ok_or(CoreError::NoActiveSink)?;
    let mut guard = sink.try_borrow_mut().map_err(|_| CoreError::SinkBusy)?;
    f(&mut *guard)
}

pub(crate) fn track_alloc(qureg: &Qureg) -> CoreResult<()> {
    SINKS.with_borrow_mut(|frames| {
        let frame = frames.last_mut().ok_or(CoreError::NoActiveSink)?;
        frame.live.push(qureg.clone());
        Ok(())
    })
}

pub(crate) fn track_release(qureg: &Qureg) -> CoreResult<()> {
    SINKS.with_borrow_mut(|frames| {
        let frame = frames.last_mut().ok_or(CoreError::NoActiveSink)?;
        match frame.live.last() {
            Some(top) if top == qureg => {
                frame.live.pop();
                Ok(())
            }
            top => Err(CoreError::ReleaseOrder {
                expected: top.map_or_else(|| "<none>".to_string(), ToString::to_string),
                got: qureg.to_string(),
            }),
        }
    })
}

/// Keeps a guard on top of the control stack until dropped.
#[must_use = "the guard is popped as soon as the scope is dropped"]
pub struct ControlScope {
    depth: usize,
    _not_send: PhantomData<Rc<()>>,
}

impl Drop for ControlScope {
    fn drop(&mut self) {
        CONTROLS.with_borrow_mut(|stack| {
            debug_assert_eq!(stack.len(), self.depth, "control scopes dropped out of order");
            stack.truncate(self.depth.saturating_sub(1));
        });
    }
}

fn push_controls(controls: QubitIntersection) -> ControlScope {
    let depth = CONTROLS.with_borrow_mut(|stack| {
        stack.push(controls);
        stack.len()
    });
    ControlScope {
        depth,
        _not_send: PhantomData,
    }
}

/// The guard currently applied to emitted operations.
pub fn current_controls() -> QubitIntersection {
    CONTROLS.with_borrow(|stack| stack.last().cloned().unwrap_or(QubitIntersection::ALWAYS))
}

/// Narrow the ambient guard by `controls` until the scope is dropped.
pub fn controlled_by(controls: impl Into<QubitIntersection>) -> ControlScope {
    push_controls(current_controls().intersect(&controls.into()))
}

/// Run `body` with the ambient guard narrowed by `controls`.
pub fn with_controls<R>(controls: impl Into<QubitIntersection>, body: impl FnOnce() -> R) -> R {
    let _scope = controlled_by(controls);
    body()
}

/// Replace the ambient guard outright. Used while decomposing, where the
/// effective guard is passed explicitly.
pub(crate) fn replace_controls(controls: QubitIntersection) -> ControlScope {
    push_controls(controls)
}

/// Emit an operation under the ambient guard.
pub fn emit(op: Operation) -> CoreResult<()> {
    emit_under(&op, &current_controls())
}

/// Emit an operation under an explicit guard, ignoring the ambient one.
pub fn emit_under(op: &Operation, controls: &QubitIntersection) -> CoreResult<()> {
    if let Operation::Controlled { op: inner, controls: extra } = op {
        return emit_under(inner, &controls.intersect(extra));
    }
    if op.is_guarded() && controls.is_never() {
        trace!(op = op.name(), "skipped under never");
        return Ok(());
    }
    if op.is_measurement() && !controls.is_always() {
        return Err(CoreError::ControlledMeasurement(op.to_string()));
    }
    if with_top_sink(|sink| sink.intercept(op, controls))? {
        return Ok(());
    }
    trace!(op = op.name(), %controls, "emit");
    match op {
        Operation::Alloc(qureg) => with_top_sink(|sink| sink.did_allocate(qureg)),
        Operation::Release { qureg, dirty } => with_top_sink(|sink| sink.release(qureg, *dirty)),
        Operation::PhaseFlip => with_top_sink(|sink| sink.phase_flip(controls)),
        Operation::GlobalPhase { degrees } => {
            with_top_sink(|sink| sink.global_phase(*degrees, controls))
        }
        Operation::Toggle(targets) => with_top_sink(|sink| sink.toggle(targets, controls)),
        Operation::Measure { qureg, reset } => {
            with_top_sink(|sink| sink.measure(qureg, *reset)).map(|_| ())
        }
        Operation::StartMbu(qureg) => with_top_sink(|sink| sink.start_mbu(qureg)).map(|_| ()),
        Operation::EndMbu { qureg, start } => with_top_sink(|sink| sink.end_mbu(qureg, start)),
        composite => {
            let _scope = replace_controls(QubitIntersection::ALWAYS);
            composite.emit_ops(controls)
        }
    }
}
