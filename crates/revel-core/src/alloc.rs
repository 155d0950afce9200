//! Scoped register allocation.
//!
//! Registers are allocated from the active sink and must be released in LIFO
//! order within that sink's scope. The closure forms release on every exit
//! path; when the body fails the register is released dirty and the body's
//! error is returned.

use tracing::{debug, trace};

use crate::context::{emit, track_alloc, track_release, with_top_sink};
use crate::error::{CoreError, CoreResult};
use crate::operation::Operation;
use crate::quint::Quint;
use crate::qubit::{Qubit, Qureg};
use crate::rvalue::RValue;

/// Allocate a zeroed register of `len` qubits.
pub fn qalloc(len: usize, name: &str) -> CoreResult<Qureg> {
    let qureg = with_top_sink(|sink| sink.allocate(name, len))?;
    track_alloc(&qureg)?;
    trace!(%qureg, "allocated");
    Ok(qureg)
}

/// Allocate a zeroed integer register.
pub fn qalloc_int(len: usize, name: &str) -> CoreResult<Quint> {
    qalloc(len, name).map(Quint::new)
}

/// Allocate a single zeroed qubit.
pub fn qalloc_qubit(name: &str) -> CoreResult<Qubit> {
    let qureg = qalloc(1, name)?;
    first_qubit(&qureg)
}

fn first_qubit(qureg: &Qureg) -> CoreResult<Qubit> {
    qureg
        .get(0)
        .cloned()
        .ok_or_else(|| CoreError::InvalidArgument(format!("sink returned empty register {qureg}")))
}

/// Release a register. It must be the most recently allocated live one.
pub fn qfree(qureg: &Qureg, dirty: bool) -> CoreResult<()> {
    track_release(qureg)?;
    trace!(%qureg, dirty, "releasing");
    emit(Operation::Release {
        qureg: qureg.clone(),
        dirty,
    })
}

fn release_after<R>(qureg: &Qureg, result: CoreResult<R>) -> CoreResult<R> {
    match result {
        Ok(value) => {
            qfree(qureg, false)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(cleanup) = qfree(qureg, true) {
                debug!(%qureg, %cleanup, "release after failure also failed");
            }
            Err(err)
        }
    }
}

/// Run `body` with a fresh zeroed integer register, released afterwards.
pub fn with_qalloc<R>(
    len: usize,
    name: &str,
    body: impl FnOnce(&Quint) -> CoreResult<R>,
) -> CoreResult<R> {
    let quint = qalloc_int(len, name)?;
    let result = body(&quint);
    release_after(quint.qureg(), result)
}

/// Run `body` with a fresh zeroed qubit, released afterwards.
pub fn with_qubit<R>(name: &str, body: impl FnOnce(&Qubit) -> CoreResult<R>) -> CoreResult<R> {
    let qureg = qalloc(1, name)?;
    let result = first_qubit(&qureg).and_then(|qubit| body(&qubit));
    release_after(&qureg, result)
}

/// Hold the value of `rvalue` in a temporary register while `body` runs.
pub fn hold<R>(
    rvalue: impl Into<RValue>,
    name: &str,
    body: impl FnOnce(&Quint) -> CoreResult<R>,
) -> CoreResult<R> {
    let rvalue = rvalue.into();
    with_qalloc(rvalue.bit_len_hint(), name, |tmp| {
        tmp.init(rvalue.clone())?;
        let result = body(tmp)?;
        tmp.clear(rvalue)?;
        Ok(result)
    })
}

/// Run `body` with `base` zero-extended to at least `min_len` bits.
pub fn pad<R>(
    base: &Quint,
    min_len: usize,
    body: impl FnOnce(&Quint) -> CoreResult<R>,
) -> CoreResult<R> {
    if base.len() >= min_len {
        return body(base);
    }
    let name = format!("{}_pad", base.name());
    with_qalloc(min_len - base.len(), &name, |extra| body(&base.concat(extra)))
}
