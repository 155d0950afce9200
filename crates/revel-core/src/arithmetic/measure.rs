//! Measurement and measurement-based uncomputation.

use tracing::debug;

use crate::context::{current_controls, with_top_sink};
use crate::error::{CoreError, CoreResult};
use crate::quint::Quint;
use crate::qubit::{Qubit, Qureg};
use crate::sink::MbuStart;

fn ensure_unguarded(qureg: &Qureg) -> CoreResult<()> {
    if current_controls().is_always() {
        Ok(())
    } else {
        Err(CoreError::ControlledMeasurement(qureg.to_string()))
    }
}

/// Measure a register, optionally resetting it to zero.
pub fn measure(quint: &Quint, reset: bool) -> CoreResult<u64> {
    ensure_unguarded(quint.qureg())?;
    with_top_sink(|sink| sink.measure(quint.qureg(), reset))
}

/// Measure a single qubit.
pub fn measure_bit(qubit: &Qubit, reset: bool) -> CoreResult<bool> {
    measure(&Quint::from(qubit.clone()), reset).map(|v| v != 0)
}

/// Erase `qureg` by X-basis measurement.
///
/// The sink zeroes the register and reports per-qubit outcomes. A branch
/// where the register held `v` picked up the sign `(-1)^popcount(m & v)`;
/// `fixup` must emit phase flips that cancel it. The sink may verify the
/// cancellation when the protocol closes.
pub fn measurement_based_uncomputation<R>(
    qureg: &Qureg,
    fixup: impl FnOnce(&MbuStart) -> CoreResult<R>,
) -> CoreResult<R> {
    ensure_unguarded(qureg)?;
    let start = with_top_sink(|sink| sink.start_mbu(qureg))?;
    debug!(%qureg, outcomes = start.mask(), "measurement-based uncomputation started");
    let result = match fixup(&start) {
        Ok(result) => result,
        Err(err) => {
            if let Err(cleanup) = with_top_sink(|sink| sink.abort_mbu(qureg)) {
                debug!(%qureg, %cleanup, "closing a failed uncomputation also failed");
            }
            return Err(err);
        }
    };
    with_top_sink(|sink| sink.end_mbu(qureg, &start))?;
    Ok(result)
}
