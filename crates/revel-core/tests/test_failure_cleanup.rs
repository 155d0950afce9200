//! Resources acquired before a failure are still released in order.

use revel_core::arithmetic::{do_addition, measurement_based_uncomputation};
use revel_core::{Arg, CoreError, CoreResult, qalloc_int, with_sink};
use revel_sim::{ClassicalSim, SimConfig};

#[test]
fn failed_temporary_erase_still_releases_every_temporary() {
    let sim = ClassicalSim::new().shared();
    let err = with_sink(&sim, || -> CoreResult<()> {
        let x = qalloc_int(3, "x")?;
        x.init(3u64)?;
        // The addition changes the control expression, so the control
        // temporary cannot be erased.
        let result = do_addition(&x, 1u64, false, Arg::RValue(x.lt(4u64)));
        assert_eq!(sim.borrow().live_qubits(), 3);
        assert_eq!(sim.borrow().resolve_quint(&x)?, 4);
        result
    })
    .unwrap_err();
    assert!(matches!(err, CoreError::ReleasedNonZero { .. }));
}

#[test]
fn failed_fixup_closes_its_uncomputation() {
    let config = SimConfig::default().with_mbu_bias(Some(false));
    let sim = ClassicalSim::with_config(config).shared();
    with_sink(&sim, || -> CoreResult<()> {
        let outer = qalloc_int(1, "outer")?;
        let inner = qalloc_int(1, "inner")?;
        measurement_based_uncomputation(outer.qureg(), |_| {
            let failed = measurement_based_uncomputation(inner.qureg(), |_| -> CoreResult<()> {
                Err(CoreError::InvalidArgument("fixup failed".to_string()))
            });
            assert!(matches!(failed, Err(CoreError::InvalidArgument(_))));
            Ok(())
        })
    })
    .unwrap();
}
