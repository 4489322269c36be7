//! A backend that records emitted instructions as data.

use std::fmt;
use std::fmt::Write as _;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use shadel_types::TypeSpec;

use super::{Backend, BlockId, FunctionAbi, FunctionId, ValueId};

/// One recorded instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instr {
    Param { dst: ValueId, index: u32 },
    Global { dst: ValueId, symbol: String },
    Alloca { dst: ValueId, ty: String, name: String },
    SelectorSlot { dst: ValueId },
    ErrorSlot { dst: ValueId },
    Load { dst: ValueId, ty: String, address: ValueId },
    Store { value: ValueId, address: ValueId },
    StoreSelector { slot: ValueId, target: u8 },
    ElementPtr { dst: ValueId, base: ValueId, index: ValueId },
    FieldPtr { dst: ValueId, base: ValueId, field: u32 },
    ConstInt { dst: ValueId, value: i64 },
    ConstFloat { dst: ValueId, value: OrderedFloat<f64> },
    ConstBool { dst: ValueId, value: bool },
    ConstString { dst: ValueId, value: String },
    Default { dst: ValueId, ty: String },
    Op { dst: ValueId, name: &'static str, operands: Vec<ValueId> },
    Cast { dst: ValueId, value: ValueId, from: String, to: String },
    Aggregate { dst: ValueId, ty: String, elements: Vec<ValueId> },
    Extract { dst: ValueId, value: ValueId, index: u32 },
    Call { dst: ValueId, callee: String, args: Vec<ValueId> },
    Invoke {
        dst: ValueId,
        callee: String,
        args: Vec<ValueId>,
        normal: BlockId,
        unwind: BlockId,
    },
    LandingPad { dst: ValueId },
    Branch { target: BlockId },
    CondBranch { condition: ValueId, then_block: BlockId, else_block: BlockId },
    Switch { slot: ValueId, cases: Vec<(u8, BlockId)>, default: BlockId },
    Ret { value: Option<ValueId> },
    Raise { slot: ValueId },
    Unreachable,
}

impl Instr {
    /// Whether this instruction ends a block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instr::Invoke { .. }
                | Instr::Branch { .. }
                | Instr::CondBranch { .. }
                | Instr::Switch { .. }
                | Instr::Ret { .. }
                | Instr::Raise { .. }
                | Instr::Unreachable
        )
    }

    /// The callee, for calls and invokes.
    pub fn callee(&self) -> Option<&str> {
        match self {
            Instr::Call { callee, .. } | Instr::Invoke { callee, .. } => Some(callee),
            _ => None,
        }
    }
}

fn list(values: &[ValueId]) -> String {
    values
        .iter()
        .map(ValueId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Param { dst, index } => write!(f, "{dst} = param {index}"),
            Instr::Global { dst, symbol } => write!(f, "{dst} = global @{symbol}"),
            Instr::Alloca { dst, ty, name } => write!(f, "{dst} = alloca {ty} ; {name}"),
            Instr::SelectorSlot { dst } => write!(f, "{dst} = alloca selector"),
            Instr::ErrorSlot { dst } => write!(f, "{dst} = alloca error"),
            Instr::Load { dst, ty, address } => write!(f, "{dst} = load {ty}, {address}"),
            Instr::Store { value, address } => write!(f, "store {value}, {address}"),
            Instr::StoreSelector { slot, target } => write!(f, "store selector {target}, {slot}"),
            Instr::ElementPtr { dst, base, index } => {
                write!(f, "{dst} = element_ptr {base}, {index}")
            }
            Instr::FieldPtr { dst, base, field } => write!(f, "{dst} = field_ptr {base}, {field}"),
            Instr::ConstInt { dst, value } => write!(f, "{dst} = const.i {value}"),
            Instr::ConstFloat { dst, value } => write!(f, "{dst} = const.f {value}"),
            Instr::ConstBool { dst, value } => write!(f, "{dst} = const.b {value}"),
            Instr::ConstString { dst, value } => write!(f, "{dst} = const.s {value:?}"),
            Instr::Default { dst, ty } => write!(f, "{dst} = default {ty}"),
            Instr::Op {
                dst,
                name,
                operands,
            } => write!(f, "{dst} = {name} {}", list(operands)),
            Instr::Cast {
                dst,
                value,
                from,
                to,
            } => write!(f, "{dst} = cast {value} {from} -> {to}"),
            Instr::Aggregate { dst, ty, elements } => {
                write!(f, "{dst} = aggregate {ty} {{{}}}", list(elements))
            }
            Instr::Extract { dst, value, index } => write!(f, "{dst} = extract {value}, {index}"),
            Instr::Call { dst, callee, args } => write!(f, "{dst} = call @{callee}({})", list(args)),
            Instr::Invoke {
                dst,
                callee,
                args,
                normal,
                unwind,
            } => write!(
                f,
                "{dst} = invoke @{callee}({}) to {normal} unwind {unwind}",
                list(args)
            ),
            Instr::LandingPad { dst } => write!(f, "{dst} = landing_pad"),
            Instr::Branch { target } => write!(f, "br {target}"),
            Instr::CondBranch {
                condition,
                then_block,
                else_block,
            } => write!(f, "br {condition}, {then_block}, {else_block}"),
            Instr::Switch {
                slot,
                cases,
                default,
            } => {
                write!(f, "switch {slot} [")?;
                for (i, (value, block)) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value} -> {block}")?;
                }
                write!(f, "] default {default}")
            }
            Instr::Ret { value: Some(v) } => write!(f, "ret {v}"),
            Instr::Ret { value: None } => write!(f, "ret void"),
            Instr::Raise { slot } => write!(f, "raise {slot}"),
            Instr::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// A recorded basic block.
#[derive(Debug, Clone)]
pub struct RecordedBlock {
    pub label: String,
    pub function: Option<FunctionId>,
    pub instrs: Vec<Instr>,
}

impl RecordedBlock {
    pub fn is_terminated(&self) -> bool {
        self.instrs.last().is_some_and(Instr::is_terminator)
    }
}

/// A declared function and, once defined, its blocks.
#[derive(Debug, Clone)]
pub struct RecordedFunction {
    pub symbol: String,
    /// Parameter type names, with `&` for by-reference parameters.
    pub params: Vec<String>,
    pub ret: String,
    pub blocks: Vec<BlockId>,
    pub defined: bool,
}

/// Records everything it is asked to emit.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    functions: Vec<RecordedFunction>,
    by_symbol: FxHashMap<String, FunctionId>,
    globals: Vec<(String, String)>,
    blocks: Vec<RecordedBlock>,
    open: Vec<FunctionId>,
    current: Option<BlockId>,
    next_value: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    fn current_function(&self) -> Option<FunctionId> {
        self.open.last().copied().or_else(|| {
            self.current
                .and_then(|b| self.blocks.get(b.0 as usize))
                .and_then(|b| b.function)
        })
    }

    fn emit(&mut self, instr: Instr) {
        let block = match self.current {
            Some(block) => block,
            None => {
                let detached = self.create_block("detached");
                self.current = Some(detached);
                detached
            }
        };
        if let Some(b) = self.blocks.get_mut(block.0 as usize) {
            if b.is_terminated() {
                tracing::warn!(block = %block, instr = %instr, "emitting past a terminator");
            }
            b.instrs.push(instr);
        }
    }

    fn value(&mut self, make: impl FnOnce(ValueId) -> Instr) -> ValueId {
        let dst = self.fresh();
        self.emit(make(dst));
        dst
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn function(&self, symbol: &str) -> Option<&RecordedFunction> {
        self.by_symbol
            .get(symbol)
            .and_then(|id| self.functions.get(id.0 as usize))
    }

    pub fn functions(&self) -> impl Iterator<Item = &RecordedFunction> {
        self.functions.iter()
    }

    pub fn block(&self, id: BlockId) -> Option<&RecordedBlock> {
        self.blocks.get(id.0 as usize)
    }

    /// Declared globals as `(symbol, type)` pairs, in declaration order.
    pub fn globals(&self) -> &[(String, String)] {
        &self.globals
    }

    /// Every instruction of a function's body, block by block.
    pub fn instructions(&self, symbol: &str) -> Vec<&Instr> {
        let Some(function) = self.function(symbol) else {
            return Vec::new();
        };
        function
            .blocks
            .iter()
            .filter_map(|b| self.block(*b))
            .flat_map(|b| b.instrs.iter())
            .collect()
    }

    /// How many calls or invokes inside `symbol` target `callee`.
    pub fn calls_in(&self, symbol: &str, callee: &str) -> usize {
        self.instructions(symbol)
            .into_iter()
            .filter(|i| i.callee() == Some(callee))
            .count()
    }

    /// How many calls or invokes anywhere target `callee`.
    pub fn calls_to(&self, callee: &str) -> usize {
        self.blocks
            .iter()
            .flat_map(|b| b.instrs.iter())
            .filter(|i| i.callee() == Some(callee))
            .count()
    }

    /// Check that every block of every defined function ends in exactly
    /// one terminator.
    pub fn verify(&self) -> Result<(), String> {
        for function in self.functions.iter().filter(|f| f.defined) {
            for id in &function.blocks {
                let Some(block) = self.block(*id) else {
                    return Err(format!("{}: missing block {id}", function.symbol));
                };
                if !block.is_terminated() {
                    return Err(format!(
                        "{}: block {id} ({}) is not terminated",
                        function.symbol, block.label
                    ));
                }
                let terminators = block.instrs.iter().filter(|i| i.is_terminator()).count();
                if terminators != 1 {
                    return Err(format!(
                        "{}: block {id} ({}) has {terminators} terminators",
                        function.symbol, block.label
                    ));
                }
            }
        }
        Ok(())
    }

    /// A textual listing of everything recorded.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (symbol, ty) in &self.globals {
            let _ = writeln!(out, "global @{symbol}: {ty}");
        }
        for function in &self.functions {
            let keyword = if function.defined { "define" } else { "declare" };
            let _ = writeln!(
                out,
                "{keyword} {} @{}({})",
                function.ret,
                function.symbol,
                function.params.join(", ")
            );
            for id in &function.blocks {
                if let Some(block) = self.block(*id) {
                    let _ = writeln!(out, "  {id}: ; {}", block.label);
                    for instr in &block.instrs {
                        let _ = writeln!(out, "    {instr}");
                    }
                }
            }
        }
        out
    }
}

impl Backend for RecordingBackend {
    fn declare_function(&mut self, symbol: &str, abi: &FunctionAbi) -> FunctionId {
        if let Some(id) = self.by_symbol.get(symbol) {
            return *id;
        }
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(RecordedFunction {
            symbol: symbol.to_string(),
            params: abi
                .params
                .iter()
                .map(|p| {
                    if p.by_ref {
                        format!("&{}", p.ty.name())
                    } else {
                        p.ty.name().to_string()
                    }
                })
                .collect(),
            ret: abi.ret.name().to_string(),
            blocks: Vec::new(),
            defined: false,
        });
        self.by_symbol.insert(symbol.to_string(), id);
        id
    }

    fn has_body(&self, function: FunctionId) -> bool {
        self.functions
            .get(function.0 as usize)
            .is_some_and(|f| f.defined)
    }

    fn begin_function(&mut self, function: FunctionId) -> BlockId {
        if let Some(f) = self.functions.get_mut(function.0 as usize) {
            f.defined = true;
        }
        self.open.push(function);
        let entry = self.create_block("entry");
        self.current = Some(entry);
        entry
    }

    fn end_function(&mut self) {
        self.open.pop();
        self.current = None;
    }

    fn param(&mut self, index: u32) -> ValueId {
        self.value(|dst| Instr::Param { dst, index })
    }

    fn global(&mut self, symbol: &str, ty: &TypeSpec) -> ValueId {
        if !self.globals.iter().any(|(s, _)| s == symbol) {
            self.globals
                .push((symbol.to_string(), ty.name().to_string()));
        }
        let symbol = symbol.to_string();
        self.value(|dst| Instr::Global { dst, symbol })
    }

    fn create_block(&mut self, label: &str) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        let function = self.current_function();
        self.blocks.push(RecordedBlock {
            label: label.to_string(),
            function,
            instrs: Vec::new(),
        });
        if let Some(f) = function.and_then(|f| self.functions.get_mut(f.0 as usize)) {
            f.blocks.push(id);
        }
        id
    }

    fn switch_to(&mut self, block: BlockId) {
        self.current = Some(block);
    }

    fn current_block(&self) -> BlockId {
        self.current.unwrap_or(BlockId(u32::MAX))
    }

    fn is_terminated(&self) -> bool {
        self.current
            .and_then(|b| self.blocks.get(b.0 as usize))
            .is_some_and(RecordedBlock::is_terminated)
    }

    fn alloca(&mut self, ty: &TypeSpec, name: &str) -> ValueId {
        let (ty, name) = (ty.name().to_string(), name.to_string());
        self.value(|dst| Instr::Alloca { dst, ty, name })
    }

    fn selector_slot(&mut self) -> ValueId {
        self.value(|dst| Instr::SelectorSlot { dst })
    }

    fn error_slot(&mut self) -> ValueId {
        self.value(|dst| Instr::ErrorSlot { dst })
    }

    fn load(&mut self, ty: &TypeSpec, address: ValueId) -> ValueId {
        let ty = ty.name().to_string();
        self.value(|dst| Instr::Load { dst, ty, address })
    }

    fn store(&mut self, value: ValueId, address: ValueId) {
        self.emit(Instr::Store { value, address });
    }

    fn store_selector(&mut self, slot: ValueId, target: u8) {
        self.emit(Instr::StoreSelector { slot, target });
    }

    fn element_ptr(&mut self, base: ValueId, index: ValueId) -> ValueId {
        self.value(|dst| Instr::ElementPtr { dst, base, index })
    }

    fn field_ptr(&mut self, base: ValueId, field: u32) -> ValueId {
        self.value(|dst| Instr::FieldPtr { dst, base, field })
    }

    fn const_int(&mut self, value: i64) -> ValueId {
        self.value(|dst| Instr::ConstInt { dst, value })
    }

    fn const_float(&mut self, value: f64) -> ValueId {
        self.value(|dst| Instr::ConstFloat {
            dst,
            value: OrderedFloat(value),
        })
    }

    fn const_bool(&mut self, value: bool) -> ValueId {
        self.value(|dst| Instr::ConstBool { dst, value })
    }

    fn const_string(&mut self, value: &str) -> ValueId {
        let value = value.to_string();
        self.value(|dst| Instr::ConstString { dst, value })
    }

    fn default_value(&mut self, ty: &TypeSpec) -> ValueId {
        let ty = ty.name().to_string();
        self.value(|dst| Instr::Default { dst, ty })
    }

    fn instruction(&mut self, name: &'static str, operands: &[ValueId]) -> ValueId {
        let operands = operands.to_vec();
        self.value(|dst| Instr::Op {
            dst,
            name,
            operands,
        })
    }

    fn cast(&mut self, value: ValueId, from: &TypeSpec, to: &TypeSpec) -> ValueId {
        let (from, to) = (from.name().to_string(), to.name().to_string());
        self.value(|dst| Instr::Cast {
            dst,
            value,
            from,
            to,
        })
    }

    fn aggregate(&mut self, ty: &TypeSpec, elements: &[ValueId]) -> ValueId {
        let (ty, elements) = (ty.name().to_string(), elements.to_vec());
        self.value(|dst| Instr::Aggregate { dst, ty, elements })
    }

    fn extract(&mut self, value: ValueId, index: u32) -> ValueId {
        self.value(|dst| Instr::Extract { dst, value, index })
    }

    fn call(&mut self, callee: &str, args: &[ValueId]) -> ValueId {
        let (callee, args) = (callee.to_string(), args.to_vec());
        self.value(|dst| Instr::Call { dst, callee, args })
    }

    fn invoke(
        &mut self,
        callee: &str,
        args: &[ValueId],
        normal: BlockId,
        unwind: BlockId,
    ) -> ValueId {
        let (callee, args) = (callee.to_string(), args.to_vec());
        self.value(|dst| Instr::Invoke {
            dst,
            callee,
            args,
            normal,
            unwind,
        })
    }

    fn landing_pad(&mut self) -> ValueId {
        self.value(|dst| Instr::LandingPad { dst })
    }

    fn branch(&mut self, target: BlockId) {
        self.emit(Instr::Branch { target });
    }

    fn cond_branch(&mut self, condition: ValueId, then_block: BlockId, else_block: BlockId) {
        self.emit(Instr::CondBranch {
            condition,
            then_block,
            else_block,
        });
    }

    fn switch_selector(&mut self, slot: ValueId, cases: &[(u8, BlockId)], default: BlockId) {
        self.emit(Instr::Switch {
            slot,
            cases: cases.to_vec(),
            default,
        });
    }

    fn ret(&mut self, value: Option<ValueId>) {
        self.emit(Instr::Ret { value });
    }

    fn raise(&mut self, slot: ValueId) {
        self.emit(Instr::Raise { slot });
    }

    fn unreachable(&mut self) {
        self.emit(Instr::Unreachable);
    }
}
