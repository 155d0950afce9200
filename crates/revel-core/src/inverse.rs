//! Operation inversion.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::capture::Capture;
use crate::context::{emit, enter_sink};
use crate::error::CoreResult;
use crate::operation::Operation;

/// Run `body`, then emit the inverse of everything it emitted in reverse
/// order. The net effect is the inverse of `body`.
pub fn inverted<R>(body: impl FnOnce() -> CoreResult<R>) -> CoreResult<R> {
    let capture = Rc::new(RefCell::new(Capture::new()));
    let result = {
        let _scope = enter_sink(&capture);
        body()?
    };
    let ops = capture.take().into_ops();
    trace!(count = ops.len(), "replaying inverse");
    for op in ops.iter().rev() {
        emit(op.inverse()?)?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::capture;
    use crate::qubit::Qureg;

    #[test]
    fn test_inverted_replays_in_reverse() {
        let a = Qureg::named("a", 1);
        let b = Qureg::named("b", 1);
        let ((), ops) = capture(|| {
            inverted(|| {
                emit(Operation::Toggle(a.clone()))?;
                emit(Operation::GlobalPhase { degrees: 30.0 })?;
                emit(Operation::Toggle(b.clone()))
            })
        })
        .unwrap();
        assert_eq!(
            ops,
            vec![
                Operation::Toggle(b),
                Operation::GlobalPhase { degrees: -30.0 },
                Operation::Toggle(a),
            ]
        );
    }
}
