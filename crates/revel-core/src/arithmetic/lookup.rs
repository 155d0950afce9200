//! Table lookup by unary iteration.
//!
//! The address bits are walked from the top. Each level splits the parent
//! guard into `guard & !bit` and `guard & bit` on one ancilla, so a table of
//! `L` rows costs `O(L)` Toffolis and one ancilla per address bit, instead
//! of a separate `k`-controlled guard per row.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::ensure_disjoint;
use super::gates::toggle_bit;
use super::measure::measurement_based_uncomputation;
use crate::alloc::with_qubit;
use crate::context::emit;
use crate::error::{CoreError, CoreResult};
use crate::guard::QubitIntersection;
use crate::operation::Operation;
use crate::quint::Quint;
use crate::qubit::Qubit;
use crate::rvalue::{Lookup, RValue};
use crate::semi_quantum::{Arg, Bindings, ClassicalBindings, ParamKind, SemiQuantum};
use crate::sink::ClassicalSimState;
use crate::util::{bit_len, low_mask};

/// A constant table of unsigned rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupTable {
    values: Vec<u64>,
    output_len: usize,
}

impl LookupTable {
    /// A table whose output width fits its widest row.
    pub fn new(values: impl IntoIterator<Item = u64>) -> Self {
        let values: Vec<u64> = values.into_iter().collect();
        let output_len = values.iter().map(|&v| bit_len(v)).max().unwrap_or(0);
        Self { values, output_len }
    }

    /// A table with an explicit output width. Rows are truncated to it.
    pub fn with_output_len(values: Vec<u64>, output_len: usize) -> Self {
        let mask = low_mask(output_len);
        Self {
            values: values.into_iter().map(|v| v & mask).collect(),
            output_len,
        }
    }

    /// The rows.
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bits needed to hold any row.
    pub fn output_len(&self) -> usize {
        self.output_len
    }

    /// Row at `index`, `None` past the end.
    pub fn get(&self, index: u64) -> Option<u64> {
        usize::try_from(index).ok().and_then(|i| self.values.get(i).copied())
    }

    /// `self[address]` as an expression. Out of range addresses read 0.
    pub fn lookup(&self, address: impl Into<RValue>) -> RValue {
        RValue::Lookup(Box::new(Lookup {
            table: self.clone(),
            address: address.into(),
        }))
    }
}

/// Visit every index in `base..limit` reachable under `address`, handing
/// `leaf` a qubit that is on exactly when the address equals that index and
/// `guard` is on.
fn unary_iterate(
    address: &Quint,
    level: usize,
    guard: &Qubit,
    base: usize,
    limit: usize,
    leaf: &mut dyn FnMut(usize, &Qubit) -> CoreResult<()>,
) -> CoreResult<()> {
    if base >= limit {
        return Ok(());
    }
    if level == 0 {
        return leaf(base, guard);
    }
    let bit = address.get(level - 1).ok_or_else(|| {
        CoreError::InvalidArgument(format!("address bit {} missing from {address}", level - 1))
    })?;
    let high = u32::try_from(level - 1)
        .ok()
        .and_then(|shift| 1usize.checked_shl(shift))
        .and_then(|half| base.checked_add(half))
        .filter(|&start| start < limit);
    let selected = QubitIntersection::new([guard.clone(), bit.clone()]);
    with_qubit("_unary", |child| {
        toggle_bit(child, selected.clone())?;
        toggle_bit(child, guard.into())?;
        unary_iterate(address, level - 1, child, base, limit, &mut *leaf)?;
        toggle_bit(child, guard.into())?;
        if let Some(start) = high {
            unary_iterate(address, level - 1, child, start, limit, &mut *leaf)?;
        }
        toggle_bit(child, selected)
    })
}

fn iterate_table(
    table: &LookupTable,
    address: &Quint,
    control: &QubitIntersection,
    leaf: &mut dyn FnMut(usize, &Qubit) -> CoreResult<()>,
) -> CoreResult<()> {
    if table.is_empty() || control.is_never() {
        return Ok(());
    }
    with_qubit("_lookup_root", |root| {
        toggle_bit(root, control.clone())?;
        unary_iterate(address, address.len(), root, 0, table.len(), &mut *leaf)?;
        toggle_bit(root, control.clone())
    })
}

fn xor_lookup_body(args: &Bindings) -> CoreResult<()> {
    let lvalue = args.quint("lvalue")?;
    let table = args.table("table")?;
    let address = args.quint("address")?;
    let control = args.controls("control")?;
    ensure_disjoint("do_xor_lookup", lvalue.qureg(), address.qureg())?;
    let mask = low_mask(lvalue.len());
    iterate_table(table, address, control, &mut |index, guard| {
        let row = table.values()[index] & mask;
        if row == 0 {
            return Ok(());
        }
        emit(Operation::Toggle(lvalue.qureg().masked(row)).controlled_by(guard.clone()))
    })
}

fn xor_lookup_reference(
    args: &mut ClassicalBindings,
    _: &mut dyn ClassicalSimState,
) -> CoreResult<()> {
    let address = args.int("address")?;
    let row = args.table("table")?.get(address).unwrap_or(0);
    if args.bool("control")? {
        args.buf_mut("lvalue")?.xor_assign(row);
    }
    Ok(())
}

/// `lvalue ^= table[address]` where `control` holds.
pub static DO_XOR_LOOKUP: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("do_xor_lookup", xor_lookup_body)
        .alloc_prefix("_lookup_")
        .param("lvalue", ParamKind::Quint)
        .param("table", ParamKind::Classical)
        .param("address", ParamKind::BorrowedQuint)
        .param_with_default("control", ParamKind::Control, Arg::Absent)
        .classical(xor_lookup_reference)
});

/// `lvalue ^= table[address]`
pub fn do_xor_lookup(
    lvalue: &Quint,
    table: &LookupTable,
    address: impl Into<Arg>,
    control: impl Into<Arg>,
) -> CoreResult<()> {
    DO_XOR_LOOKUP.call([
        ("lvalue", lvalue.into()),
        ("table", Arg::Table(table.clone())),
        ("address", address.into()),
        ("control", control.into()),
    ])
}

fn phase_flip_lookup_body(args: &Bindings) -> CoreResult<()> {
    let table = args.table("table")?;
    let address = args.quint("address")?;
    let control = args.controls("control")?;
    iterate_table(table, address, control, &mut |index, guard| {
        if table.values()[index] & 1 == 0 {
            return Ok(());
        }
        emit(Operation::PhaseFlip.controlled_by(guard.clone()))
    })
}

fn phase_flip_lookup_reference(
    args: &mut ClassicalBindings,
    state: &mut dyn ClassicalSimState,
) -> CoreResult<()> {
    let address = args.int("address")?;
    let row = args.table("table")?.get(address).unwrap_or(0);
    if args.bool("control")? && row & 1 == 1 {
        state.flip_phase();
    }
    Ok(())
}

/// Negate the phase where `table[address]` is odd and `control` holds.
pub static DO_PHASE_FLIP_LOOKUP: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("do_phase_flip_lookup", phase_flip_lookup_body)
        .alloc_prefix("_lookup_")
        .param("table", ParamKind::Classical)
        .param("address", ParamKind::BorrowedQuint)
        .param_with_default("control", ParamKind::Control, Arg::Absent)
        .classical(phase_flip_lookup_reference)
});

/// Negate the phase where the low bit of `table[address]` is set.
pub fn do_phase_flip_lookup(
    table: &LookupTable,
    address: impl Into<Arg>,
    control: impl Into<Arg>,
) -> CoreResult<()> {
    DO_PHASE_FLIP_LOOKUP.call([
        ("table", Arg::Table(table.clone())),
        ("address", address.into()),
        ("control", control.into()),
    ])
}

fn del_xor_lookup_body(args: &Bindings) -> CoreResult<()> {
    let lvalue = args.quint("lvalue")?;
    let table = args.table("table")?;
    let address = args.quint("address")?;
    let control = args.controls("control")?;
    ensure_disjoint("del_xor_lookup", lvalue.qureg(), address.qureg())?;
    measurement_based_uncomputation(lvalue.qureg(), |start| {
        let parities = table
            .values()
            .iter()
            .map(|&row| u64::from(start.phase_parity(row)))
            .collect();
        do_phase_flip_lookup(
            &LookupTable::with_output_len(parities, 1),
            address,
            control,
        )
    })
}

/// Erase `lvalue == table[address]` by X-basis measurement and a phase
/// lookup, instead of repeating the XOR sweep.
pub static DEL_XOR_LOOKUP: LazyLock<SemiQuantum> = LazyLock::new(|| {
    SemiQuantum::new("del_xor_lookup", del_xor_lookup_body)
        .alloc_prefix("_lookup_")
        .param("lvalue", ParamKind::Quint)
        .param("table", ParamKind::Classical)
        .param("address", ParamKind::BorrowedQuint)
        .param_with_default("control", ParamKind::Control, Arg::Absent)
        .classical(xor_lookup_reference)
});

/// Clear `lvalue`, which must hold `table[address]` where `control` holds.
pub fn del_xor_lookup(
    lvalue: &Quint,
    table: &LookupTable,
    address: impl Into<Arg>,
    control: impl Into<Arg>,
) -> CoreResult<()> {
    DEL_XOR_LOOKUP.call([
        ("lvalue", lvalue.into()),
        ("table", Arg::Table(table.clone())),
        ("address", address.into()),
        ("control", control.into()),
    ])
}
