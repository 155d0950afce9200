//! Dual-mode calling convention.
//!
//! A [`SemiQuantum`] routine declares its parameters by category and pairs a
//! symbolic body (which emits operations) with an optional classical
//! reference (which computes on plain integers). `call` binds arguments,
//! materializing constants and expressions into temporaries where a
//! register is needed, and runs the symbolic body. `sim` runs the classical
//! reference against a concrete state instead.

use tracing::{debug, instrument};

use crate::alloc::{qalloc_int, qfree};
use crate::arithmetic::lookup::LookupTable;
use crate::context::emit;
use crate::error::{CoreError, CoreResult};
use crate::guard::QubitIntersection;
use crate::int_buf::IntBuf;
use crate::operation::Operation;
use crate::quint::Quint;
use crate::qubit::{Qubit, Qureg};
use crate::rvalue::RValue;
use crate::sink::ClassicalSimState;

/// An argument passed to a [`SemiQuantum`] routine.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// No value. Accepted by control parameters as "always".
    Absent,
    /// A boolean constant.
    Bool(bool),
    /// An integer constant.
    Int(u64),
    /// A qubit.
    Qubit(Qubit),
    /// An integer register.
    Quint(Quint),
    /// A guard set.
    Controls(QubitIntersection),
    /// An arbitrary expression.
    RValue(RValue),
    /// An operation, for effect parameters.
    Operation(Operation),
    /// A constant table.
    Table(LookupTable),
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<u64> for Arg {
    fn from(value: u64) -> Self {
        Arg::Int(value)
    }
}

impl From<Qubit> for Arg {
    fn from(qubit: Qubit) -> Self {
        Arg::Qubit(qubit)
    }
}

impl From<&Qubit> for Arg {
    fn from(qubit: &Qubit) -> Self {
        Arg::Qubit(qubit.clone())
    }
}

impl From<Quint> for Arg {
    fn from(quint: Quint) -> Self {
        Arg::Quint(quint)
    }
}

impl From<&Quint> for Arg {
    fn from(quint: &Quint) -> Self {
        Arg::Quint(quint.clone())
    }
}

impl From<QubitIntersection> for Arg {
    fn from(controls: QubitIntersection) -> Self {
        Arg::Controls(controls)
    }
}

impl From<&QubitIntersection> for Arg {
    fn from(controls: &QubitIntersection) -> Self {
        Arg::Controls(controls.clone())
    }
}

impl From<RValue> for Arg {
    fn from(rvalue: RValue) -> Self {
        Arg::RValue(rvalue)
    }
}

impl From<Operation> for Arg {
    fn from(op: Operation) -> Self {
        Arg::Operation(op)
    }
}

impl From<LookupTable> for Arg {
    fn from(table: LookupTable) -> Self {
        Arg::Table(table)
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Absent, Into::into)
    }
}

/// Parameter categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// An existing integer register, mutated in place.
    Quint,
    /// An integer register or any integer expression, read only.
    BorrowedQuint,
    /// An existing qubit, mutated in place.
    Qubit,
    /// A qubit or any boolean expression, read only.
    BorrowedQubit,
    /// A guard.
    Control,
    /// A classical value passed through untouched.
    Classical,
}

impl ParamKind {
    /// Human readable category, used in type errors.
    pub fn expected(self) -> &'static str {
        match self {
            ParamKind::Quint => "a Quint register",
            ParamKind::BorrowedQuint => "a quantum integer expression",
            ParamKind::Qubit => "a Qubit",
            ParamKind::BorrowedQubit => "a quantum boolean expression",
            ParamKind::Control => "a quantum control expression",
            ParamKind::Classical => "a classical value",
        }
    }
}

/// A declared parameter.
#[derive(Debug, Clone)]
pub struct Param {
    /// Parameter name.
    pub name: &'static str,
    /// Category.
    pub kind: ParamKind,
    /// Value used when the caller omits the argument.
    pub default: Option<Arg>,
}

/// A bound symbolic argument.
#[derive(Debug, Clone)]
pub enum Bound {
    /// A register (possibly a temporary).
    Quint(Quint),
    /// A qubit (possibly a temporary).
    Qubit(Qubit),
    /// A normalized guard.
    Controls(QubitIntersection),
    /// A classical pass-through value.
    Value(Arg),
}

/// Arguments as seen by a symbolic body.
#[derive(Debug)]
pub struct Bindings {
    routine: &'static str,
    entries: Vec<(&'static str, Bound)>,
}

impl Bindings {
    fn get(&self, name: &str) -> CoreResult<&Bound> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, b)| b)
            .ok_or_else(|| CoreError::MissingArgument {
                routine: self.routine.to_string(),
                param: name.to_string(),
            })
    }

    fn mismatch(&self, name: &str, expected: &'static str, got: &Bound) -> CoreError {
        CoreError::TypeMismatch {
            routine: self.routine.to_string(),
            param: name.to_string(),
            expected,
            got: format!("{got:?}"),
        }
    }

    /// A register argument.
    pub fn quint(&self, name: &str) -> CoreResult<&Quint> {
        match self.get(name)? {
            Bound::Quint(q) => Ok(q),
            other => Err(self.mismatch(name, ParamKind::Quint.expected(), other)),
        }
    }

    /// A qubit argument.
    pub fn qubit(&self, name: &str) -> CoreResult<&Qubit> {
        match self.get(name)? {
            Bound::Qubit(q) => Ok(q),
            other => Err(self.mismatch(name, ParamKind::Qubit.expected(), other)),
        }
    }

    /// A guard argument.
    pub fn controls(&self, name: &str) -> CoreResult<&QubitIntersection> {
        match self.get(name)? {
            Bound::Controls(c) => Ok(c),
            other => Err(self.mismatch(name, ParamKind::Control.expected(), other)),
        }
    }

    /// A classical integer argument.
    pub fn int(&self, name: &str) -> CoreResult<u64> {
        match self.get(name)? {
            Bound::Value(Arg::Int(v)) => Ok(*v),
            Bound::Value(Arg::Bool(b)) => Ok(u64::from(*b)),
            other => Err(self.mismatch(name, "an integer", other)),
        }
    }

    /// An operation argument.
    pub fn operation(&self, name: &str) -> CoreResult<&Operation> {
        match self.get(name)? {
            Bound::Value(Arg::Operation(op)) => Ok(op),
            other => Err(self.mismatch(name, "an operation", other)),
        }
    }

    /// A table argument.
    pub fn table(&self, name: &str) -> CoreResult<&LookupTable> {
        match self.get(name)? {
            Bound::Value(Arg::Table(t)) => Ok(t),
            other => Err(self.mismatch(name, "a lookup table", other)),
        }
    }
}

/// A classical argument.
#[derive(Debug, Clone)]
pub enum ClassicalValue {
    /// An owned register, written back after the reference runs.
    Buf(IntBuf),
    /// A borrowed integer.
    Int(u64),
    /// A borrowed boolean or resolved guard.
    Bool(bool),
    /// A pass-through value.
    Value(Arg),
}

/// Arguments as seen by a classical reference.
#[derive(Debug)]
pub struct ClassicalBindings {
    routine: &'static str,
    entries: Vec<(&'static str, ClassicalValue)>,
}

impl ClassicalBindings {
    fn position(&self, name: &str) -> CoreResult<usize> {
        self.entries
            .iter()
            .position(|(n, _)| *n == name)
            .ok_or_else(|| CoreError::MissingArgument {
                routine: self.routine.to_string(),
                param: name.to_string(),
            })
    }

    fn mismatch(&self, name: &str, expected: &'static str, got: &ClassicalValue) -> CoreError {
        CoreError::TypeMismatch {
            routine: self.routine.to_string(),
            param: name.to_string(),
            expected,
            got: format!("{got:?}"),
        }
    }

    /// An owned register, mutable.
    pub fn buf_mut(&mut self, name: &str) -> CoreResult<&mut IntBuf> {
        let i = self.position(name)?;
        let routine = self.routine;
        match &mut self.entries[i].1 {
            ClassicalValue::Buf(buf) => Ok(buf),
            other => Err(CoreError::TypeMismatch {
                routine: routine.to_string(),
                param: name.to_string(),
                expected: ParamKind::Quint.expected(),
                got: format!("{other:?}"),
            }),
        }
    }

    /// Any integer-valued argument.
    pub fn int(&self, name: &str) -> CoreResult<u64> {
        let i = self.position(name)?;
        match &self.entries[i].1 {
            ClassicalValue::Buf(buf) => Ok(buf.get()),
            ClassicalValue::Int(v) | ClassicalValue::Value(Arg::Int(v)) => Ok(*v),
            ClassicalValue::Bool(b) | ClassicalValue::Value(Arg::Bool(b)) => Ok(u64::from(*b)),
            other => Err(self.mismatch(name, "an integer", other)),
        }
    }

    /// Any boolean-valued argument.
    pub fn bool(&self, name: &str) -> CoreResult<bool> {
        self.int(name).map(|v| v != 0)
    }

    /// An operation argument.
    pub fn operation(&self, name: &str) -> CoreResult<&Operation> {
        let i = self.position(name)?;
        match &self.entries[i].1 {
            ClassicalValue::Value(Arg::Operation(op)) => Ok(op),
            other => Err(self.mismatch(name, "an operation", other)),
        }
    }

    /// A table argument.
    pub fn table(&self, name: &str) -> CoreResult<&LookupTable> {
        let i = self.position(name)?;
        match &self.entries[i].1 {
            ClassicalValue::Value(Arg::Table(t)) => Ok(t),
            other => Err(self.mismatch(name, "a lookup table", other)),
        }
    }
}

/// Symbolic body: emits operations.
pub type SymbolicBody = fn(&Bindings) -> CoreResult<()>;

/// Classical reference: mutates buffers, may touch the state (phase).
pub type ClassicalBody = fn(&mut ClassicalBindings, &mut dyn ClassicalSimState) -> CoreResult<()>;

struct Temp {
    target: Quint,
    rvalue: RValue,
}

/// A routine usable both symbolically and as a classical reference.
pub struct SemiQuantum {
    name: &'static str,
    alloc_prefix: Option<&'static str>,
    params: Vec<Param>,
    symbolic: SymbolicBody,
    classical: Option<ClassicalBody>,
}

impl std::fmt::Debug for SemiQuantum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemiQuantum")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("classical", &self.classical.is_some())
            .finish()
    }
}

impl SemiQuantum {
    /// A routine with no parameters yet.
    pub fn new(name: &'static str, symbolic: SymbolicBody) -> Self {
        Self {
            name,
            alloc_prefix: None,
            params: Vec::new(),
            symbolic,
            classical: None,
        }
    }

    /// Declare a required parameter.
    #[must_use]
    pub fn param(mut self, name: &'static str, kind: ParamKind) -> Self {
        self.params.push(Param {
            name,
            kind,
            default: None,
        });
        self
    }

    /// Declare a parameter with a default value.
    #[must_use]
    pub fn param_with_default(
        mut self,
        name: &'static str,
        kind: ParamKind,
        default: impl Into<Arg>,
    ) -> Self {
        self.params.push(Param {
            name,
            kind,
            default: Some(default.into()),
        });
        self
    }

    /// Prefix for temporaries (default `_<name>_`).
    #[must_use]
    pub fn alloc_prefix(mut self, prefix: &'static str) -> Self {
        self.alloc_prefix = Some(prefix);
        self
    }

    /// Register the classical reference.
    #[must_use]
    pub fn classical(mut self, body: ClassicalBody) -> Self {
        self.classical = Some(body);
        self
    }

    /// Routine name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared parameters.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Whether a classical reference is registered.
    pub fn has_classical(&self) -> bool {
        self.classical.is_some()
    }

    fn collect_args<'a>(
        &self,
        args: impl IntoIterator<Item = (&'a str, Arg)>,
    ) -> CoreResult<Vec<(&Param, Arg)>> {
        let mut supplied: Vec<(&'a str, Arg)> = args.into_iter().collect();
        let mut out = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let arg = match supplied.iter().position(|(n, _)| *n == param.name) {
                Some(i) => supplied.swap_remove(i).1,
                None => param
                    .default
                    .clone()
                    .ok_or_else(|| CoreError::MissingArgument {
                        routine: self.name.to_string(),
                        param: param.name.to_string(),
                    })?,
            };
            out.push((param, arg));
        }
        if let Some((name, _)) = supplied.first() {
            return Err(CoreError::UnexpectedArgument {
                routine: self.name.to_string(),
                param: (*name).to_string(),
            });
        }
        Ok(out)
    }

    fn mismatch(&self, param: &Param, arg: &Arg) -> CoreError {
        CoreError::TypeMismatch {
            routine: self.name.to_string(),
            param: param.name.to_string(),
            expected: param.kind.expected(),
            got: format!("{arg:?}"),
        }
    }

    /// Run the symbolic body, emitting to the ambient sink.
    #[instrument(level = "trace", skip_all, fields(routine = self.name))]
    pub fn call<'a>(&self, args: impl IntoIterator<Item = (&'a str, Arg)>) -> CoreResult<()> {
        let args = self.collect_args(args)?;
        let mut temps = Vec::new();
        let result = self
            .bind_all(args, &mut temps)
            .and_then(|bindings| (self.symbolic)(&bindings));
        match result {
            Ok(()) => self.erase_temps(&temps),
            Err(err) => {
                for temp in temps.iter().rev() {
                    self.release_dirty(temp);
                }
                Err(err)
            }
        }
    }

    /// Erase and release temporaries in reverse order. Once one fails, the
    /// rest are released dirty and the first error is returned.
    fn erase_temps(&self, temps: &[Temp]) -> CoreResult<()> {
        let mut failure = None;
        for temp in temps.iter().rev() {
            if failure.is_some() {
                self.release_dirty(temp);
                continue;
            }
            let erased = emit(Operation::DelRValue {
                rvalue: temp.rvalue.clone(),
                target: temp.target.clone(),
            });
            if let Err(err) = erased {
                self.release_dirty(temp);
                failure = Some(err);
            } else if let Err(err) = qfree(temp.target.qureg(), false) {
                failure = Some(err);
            }
        }
        failure.map_or(Ok(()), Err)
    }

    fn release_dirty(&self, temp: &Temp) {
        if let Err(cleanup) = qfree(temp.target.qureg(), true) {
            debug!(routine = self.name, %cleanup, "temporary release failed");
        }
    }

    fn bind_all(&self, args: Vec<(&Param, Arg)>, temps: &mut Vec<Temp>) -> CoreResult<Bindings> {
        let mut entries = Vec::with_capacity(args.len());
        for (param, arg) in args {
            let bound = self.bind(param, arg, temps)?;
            entries.push((param.name, bound));
        }
        Ok(Bindings {
            routine: self.name,
            entries,
        })
    }

    fn bind(&self, param: &Param, arg: Arg, temps: &mut Vec<Temp>) -> CoreResult<Bound> {
        match (param.kind, arg) {
            (
                ParamKind::Quint | ParamKind::BorrowedQuint,
                Arg::Quint(q) | Arg::RValue(RValue::Quint(q)),
            ) => Ok(Bound::Quint(q)),
            (ParamKind::BorrowedQuint, Arg::Qubit(q) | Arg::RValue(RValue::Qubit(q))) => {
                Ok(Bound::Quint(Quint::from(q)))
            }
            (ParamKind::BorrowedQuint, Arg::Int(v)) => {
                self.temp(param, RValue::Int(v), temps).map(Bound::Quint)
            }
            (ParamKind::BorrowedQuint, Arg::Bool(b)) => {
                self.temp(param, RValue::Int(u64::from(b)), temps).map(Bound::Quint)
            }
            (ParamKind::BorrowedQuint, Arg::RValue(r)) => {
                self.temp(param, r, temps).map(Bound::Quint)
            }
            (
                ParamKind::Qubit | ParamKind::BorrowedQubit,
                Arg::Qubit(q) | Arg::RValue(RValue::Qubit(q)),
            ) => Ok(Bound::Qubit(q)),
            (ParamKind::BorrowedQubit, Arg::Bool(b)) => {
                self.temp_qubit(param, RValue::Bool(b), temps)
            }
            (ParamKind::BorrowedQubit, Arg::Int(v @ (0 | 1))) => {
                self.temp_qubit(param, RValue::Bool(v == 1), temps)
            }
            (ParamKind::BorrowedQubit, Arg::Controls(c)) => match c.single() {
                Some(q) => Ok(Bound::Qubit(q.clone())),
                None => self.temp_qubit(param, RValue::Intersection(c), temps),
            },
            (ParamKind::BorrowedQubit, Arg::RValue(r)) if r.is_boolean() => {
                self.temp_qubit(param, r, temps)
            }
            (ParamKind::Control, Arg::Absent) => Ok(Bound::Controls(QubitIntersection::ALWAYS)),
            (ParamKind::Control, Arg::Bool(b) | Arg::RValue(RValue::Bool(b))) => {
                Ok(Bound::Controls(QubitIntersection::constant(b)))
            }
            (ParamKind::Control, Arg::Qubit(q) | Arg::RValue(RValue::Qubit(q))) => {
                Ok(Bound::Controls(q.into()))
            }
            (ParamKind::Control, Arg::Controls(c) | Arg::RValue(RValue::Intersection(c))) => {
                if c.len() <= 1 {
                    return Ok(Bound::Controls(c));
                }
                self.temp_control(param, RValue::Intersection(c), temps)
            }
            (ParamKind::Control, Arg::RValue(r)) if r.is_boolean() => {
                self.temp_control(param, r, temps)
            }
            (ParamKind::Classical, arg) => Ok(Bound::Value(arg)),
            (_, arg) => Err(self.mismatch(param, &arg)),
        }
    }

    fn temp(&self, param: &Param, rvalue: RValue, temps: &mut Vec<Temp>) -> CoreResult<Quint> {
        let name = match self.alloc_prefix {
            Some(prefix) => format!("{prefix}{}", param.name),
            None => format!("_{}_{}", self.name, param.name),
        };
        let target = qalloc_int(rvalue.bit_len_hint(), &name)?;
        temps.push(Temp {
            target: target.clone(),
            rvalue: rvalue.clone(),
        });
        debug!(routine = self.name, %target, %rvalue, "materializing temporary");
        emit(Operation::LetRValue {
            rvalue,
            target: target.clone(),
        })?;
        Ok(target)
    }

    fn temp_bit(&self, param: &Param, rvalue: RValue, temps: &mut Vec<Temp>) -> CoreResult<Qubit> {
        let target = self.temp(param, rvalue, temps)?;
        target
            .get(0)
            .cloned()
            .ok_or_else(|| CoreError::InvalidArgument(format!("empty temporary {target}")))
    }

    fn temp_qubit(
        &self,
        param: &Param,
        rvalue: RValue,
        temps: &mut Vec<Temp>,
    ) -> CoreResult<Bound> {
        self.temp_bit(param, rvalue, temps).map(Bound::Qubit)
    }

    fn temp_control(
        &self,
        param: &Param,
        rvalue: RValue,
        temps: &mut Vec<Temp>,
    ) -> CoreResult<Bound> {
        self.temp_bit(param, rvalue, temps).map(|q| Bound::Controls(q.into()))
    }

    /// Run the classical reference against `state`. Owned registers are read
    /// into buffers and written back afterwards.
    #[instrument(level = "trace", skip_all, fields(routine = self.name))]
    pub fn sim<'a>(
        &self,
        state: &mut dyn ClassicalSimState,
        args: impl IntoIterator<Item = (&'a str, Arg)>,
    ) -> CoreResult<()> {
        let classical = self
            .classical
            .ok_or_else(|| CoreError::NoClassicalReference(self.name.to_string()))?;
        let args = self.collect_args(args)?;
        let mut entries = Vec::with_capacity(args.len());
        let mut write_back: Vec<(usize, Qureg)> = Vec::new();
        for (param, arg) in args {
            let (value, owned) = self.resolve_classical(param, arg, &*state)?;
            if let Some(qureg) = owned {
                write_back.push((entries.len(), qureg));
            }
            entries.push((param.name, value));
        }
        let mut bindings = ClassicalBindings {
            routine: self.name,
            entries,
        };
        classical(&mut bindings, state)?;
        for (i, qureg) in write_back {
            if let ClassicalValue::Buf(buf) = &bindings.entries[i].1 {
                state.write_quint(&qureg, buf.get())?;
            }
        }
        Ok(())
    }

    fn resolve_classical(
        &self,
        param: &Param,
        arg: Arg,
        state: &dyn ClassicalSimState,
    ) -> CoreResult<(ClassicalValue, Option<Qureg>)> {
        let borrowed_bool = |b: bool| Ok((ClassicalValue::Bool(b), None));
        match (param.kind, arg) {
            (ParamKind::Quint, Arg::Quint(q) | Arg::RValue(RValue::Quint(q))) => {
                let value = state.read_quint(q.qureg())?;
                Ok((ClassicalValue::Buf(IntBuf::new(value, q.len())), Some(q.qureg().clone())))
            }
            (ParamKind::Qubit, Arg::Qubit(q) | Arg::RValue(RValue::Qubit(q))) => {
                let value = u64::from(state.read_bit(&q)?);
                Ok((ClassicalValue::Buf(IntBuf::new(value, 1)), Some(Qureg::from(q))))
            }
            (ParamKind::BorrowedQuint, Arg::Quint(q)) => {
                Ok((ClassicalValue::Int(state.read_quint(q.qureg())?), None))
            }
            (ParamKind::BorrowedQuint, Arg::Qubit(q)) => {
                Ok((ClassicalValue::Int(u64::from(state.read_bit(&q)?)), None))
            }
            (ParamKind::BorrowedQuint, Arg::Int(v)) => Ok((ClassicalValue::Int(v), None)),
            (ParamKind::BorrowedQuint, Arg::Bool(b)) => {
                Ok((ClassicalValue::Int(u64::from(b)), None))
            }
            (ParamKind::BorrowedQuint, Arg::RValue(r)) => {
                Ok((ClassicalValue::Int(r.resolve(state)?), None))
            }
            (ParamKind::BorrowedQubit | ParamKind::Control, Arg::Qubit(q)) => {
                borrowed_bool(state.read_bit(&q)?)
            }
            (ParamKind::BorrowedQubit | ParamKind::Control, Arg::Bool(b)) => borrowed_bool(b),
            (ParamKind::BorrowedQubit | ParamKind::Control, Arg::Controls(c)) => {
                borrowed_bool(state.resolve_controls(&c)?)
            }
            (ParamKind::BorrowedQubit, Arg::Int(v @ (0 | 1))) => borrowed_bool(v == 1),
            (ParamKind::BorrowedQubit | ParamKind::Control, Arg::RValue(r)) if r.is_boolean() => {
                borrowed_bool(r.resolve(state)? != 0)
            }
            (ParamKind::Control, Arg::Absent) => borrowed_bool(true),
            (ParamKind::Classical, arg) => Ok((ClassicalValue::Value(arg), None)),
            (_, arg) => Err(self.mismatch(param, &arg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{qalloc_int, qalloc_qubit};
    use crate::capture::capture;
    use std::sync::LazyLock;

    fn toggle_body(args: &Bindings) -> CoreResult<()> {
        let x = args.quint("x")?;
        let y = args.quint("y")?;
        let control = args.controls("control")?;
        for (t, s) in x.iter().zip(y.iter()) {
            emit(Operation::Toggle(Qureg::from(t.clone())).controlled_by(control.and(s)))?;
        }
        Ok(())
    }

    fn toggle_reference(
        args: &mut ClassicalBindings,
        _: &mut dyn ClassicalSimState,
    ) -> CoreResult<()> {
        let y = args.int("y")?;
        if args.bool("control")? {
            args.buf_mut("x")?.xor_assign(y);
        }
        Ok(())
    }

    static XOR_INTO: LazyLock<SemiQuantum> = LazyLock::new(|| {
        SemiQuantum::new("f", toggle_body)
            .param("x", ParamKind::Quint)
            .param("y", ParamKind::BorrowedQuint)
            .param_with_default("control", ParamKind::Control, Arg::Absent)
            .classical(toggle_reference)
    });

    fn flag_body(args: &Bindings) -> CoreResult<()> {
        args.qubit("q").map(|_| ())
    }

    static TAKES_QUBIT: LazyLock<SemiQuantum> = LazyLock::new(|| {
        SemiQuantum::new("g", flag_body).param("q", ParamKind::BorrowedQubit)
    });

    fn control_body(args: &Bindings) -> CoreResult<()> {
        let c = args.controls("c")?;
        emit(Operation::PhaseFlip.controlled_by(c.clone()))
    }

    static TAKES_CONTROL: LazyLock<SemiQuantum> = LazyLock::new(|| {
        SemiQuantum::new("h", control_body)
            .alloc_prefix("_custom_")
            .param("c", ParamKind::Control)
    });

    #[test]
    fn test_borrowed_constant_is_materialized() {
        let (_, ops) = capture(|| {
            let x = qalloc_int(3, "x")?;
            XOR_INTO.call([("x", Arg::from(&x)), ("y", Arg::Int(5))])
        })
        .unwrap();
        let kinds: Vec<&str> = ops.iter().map(Operation::name).collect();
        assert_eq!(
            kinds,
            vec![
                "alloc",
                "alloc",
                "let",
                "controlled",
                "controlled",
                "controlled",
                "del",
                "release"
            ]
        );
        match &ops[1] {
            Operation::Alloc(q) => assert_eq!(q.qubits()[0].name, "_f_y"),
            other => panic!("expected alloc, got {other}"),
        }
    }

    #[test]
    fn test_register_argument_passes_through() {
        let (_, ops) = capture(|| {
            let x = qalloc_int(2, "x")?;
            let y = qalloc_int(2, "y")?;
            XOR_INTO.call([("x", Arg::from(&x)), ("y", Arg::from(&y))])
        })
        .unwrap();
        assert_eq!(ops.len(), 4);
    }

    #[test]
    fn test_type_errors_name_category() {
        let err = capture(|| XOR_INTO.call([("x", Arg::Int(2)), ("y", Arg::Int(1))])).unwrap_err();
        assert!(err.to_string().contains("a Quint register"), "{err}");

        let err = capture(|| {
            let x = qalloc_int(2, "x")?;
            XOR_INTO.call([("x", Arg::from(&x)), ("y", Arg::Operation(Operation::PhaseFlip))])
        })
        .unwrap_err();
        assert!(err.to_string().contains("quantum integer expression"), "{err}");

        let err = capture(|| TAKES_QUBIT.call([("q", Arg::Int(7))])).unwrap_err();
        assert!(err.to_string().contains("quantum boolean expression"), "{err}");

        let err = capture(|| {
            let x = qalloc_int(2, "x")?;
            TAKES_CONTROL.call([("c", Arg::from(&x))])
        })
        .unwrap_err();
        assert!(err.to_string().contains("quantum control expression"), "{err}");
    }

    #[test]
    fn test_missing_and_unexpected_arguments() {
        let err = capture(|| TAKES_QUBIT.call(Vec::<(&str, Arg)>::new())).unwrap_err();
        assert!(matches!(err, CoreError::MissingArgument { .. }));
        let err =
            capture(|| TAKES_QUBIT.call([("q", Arg::Bool(true)), ("z", Arg::Absent)])).unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedArgument { .. }));
    }

    #[test]
    fn test_control_normalization() {
        let (_, ops) = capture(|| {
            TAKES_CONTROL.call([("c", Arg::Bool(false))])?;
            TAKES_CONTROL.call([("c", Arg::Absent)])?;
            TAKES_CONTROL.call([("c", Arg::Bool(true))])
        })
        .unwrap();
        assert_eq!(ops, vec![Operation::PhaseFlip, Operation::PhaseFlip]);

        let (q, ops) = capture(|| qalloc_qubit("q").and_then(|q| {
            TAKES_CONTROL.call([("c", Arg::from(&q))])?;
            Ok(q)
        }))
        .unwrap();
        assert_eq!(ops[1], Operation::PhaseFlip.controlled_by(q));
    }

    #[test]
    fn test_multi_qubit_control_uses_temporary() {
        let (_, ops) = capture(|| {
            let a = qalloc_qubit("a")?;
            let b = qalloc_qubit("b")?;
            TAKES_CONTROL.call([("c", Arg::Controls(QubitIntersection::new([a, b])))])
        })
        .unwrap();
        let kinds: Vec<&str> = ops.iter().map(Operation::name).collect();
        assert_eq!(kinds, vec!["alloc", "alloc", "alloc", "let", "controlled", "del", "release"]);
        match &ops[2] {
            Operation::Alloc(q) => assert_eq!(q.qubits()[0].name, "_custom_c"),
            other => panic!("expected alloc, got {other}"),
        }
    }
}
