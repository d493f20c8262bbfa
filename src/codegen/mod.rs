//! The code generator: a tree walk that emits AT&T assembly while keeping
//! a bidirectional binding between expression nodes and machine registers.
//! A register holds at most one node and a node sits in at most one
//! register; evicting a node spills it to a freshly allocated frame slot.

#[cfg(test)]
mod codegen_tests;
pub mod stack;

use crate::ast::{Ast, BinaryOp, ExprId, ExprKind, Function, Stmt, StmtId, UnaryOp};
use crate::checker::{SymbolId, SymbolTable};
use crate::machine::*;

use std::fmt;
use std::io::{self, Write};

/// A unique code label, printed with the platform prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{LABEL_PREFIX}{}", self.0)
    }
}

/// Monotonic label source; never reset, so every emission is unique.
#[derive(Debug, Default)]
pub struct LabelCounter {
    next: u32,
}

impl LabelCounter {
    fn next(&mut self) -> Label {
        let label = Label(self.next);
        self.next += 1;
        label
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterId(usize);

/// A machine register: its three sized names and the node it currently
/// holds, if any. The node's `reg` field always points back here.
#[derive(Debug)]
pub struct Register {
    quad: &'static str,
    long: &'static str,
    byte: &'static str,
    node: Option<ExprId>,
}

impl Register {
    const fn new(quad: &'static str, long: &'static str, byte: &'static str) -> Self {
        Self {
            quad,
            long,
            byte,
            node: None,
        }
    }

    pub fn name(&self, size: u64) -> &'static str {
        match size {
            1 => self.byte,
            4 => self.long,
            _ => self.quad,
        }
    }
}

pub const RAX: RegisterId = RegisterId(0);
const RDX: RegisterId = RegisterId(3);
const RCX: RegisterId = RegisterId(4);

/// Registers used for the first arguments, in calling-convention order.
pub const PARAMETERS: [RegisterId; NUM_PARAM_REGS] = [
    RegisterId(1),
    RegisterId(2),
    RegisterId(3),
    RegisterId(4),
    RegisterId(5),
    RegisterId(6),
];

/// The pool of registers available for temporaries.
#[derive(Debug)]
pub struct RegisterFile {
    registers: [Register; 9],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            registers: [
                Register::new("%rax", "%eax", "%al"),
                Register::new("%rdi", "%edi", "%dil"),
                Register::new("%rsi", "%esi", "%sil"),
                Register::new("%rdx", "%edx", "%dl"),
                Register::new("%rcx", "%ecx", "%cl"),
                Register::new("%r8", "%r8d", "%r8b"),
                Register::new("%r9", "%r9d", "%r9b"),
                Register::new("%r10", "%r10d", "%r10b"),
                Register::new("%r11", "%r11d", "%r11b"),
            ],
        }
    }
}

impl RegisterFile {
    fn ids(&self) -> impl Iterator<Item = RegisterId> {
        (0..self.registers.len()).map(RegisterId)
    }

    fn find_free(&self) -> Option<RegisterId> {
        self.ids().find(|id| self[*id].node.is_none())
    }

    fn all_free(&self) -> bool {
        self.registers.iter().all(|reg| reg.node.is_none())
    }
}

impl std::ops::Index<RegisterId> for RegisterFile {
    type Output = Register;
    fn index(&self, id: RegisterId) -> &Register {
        &self.registers[id.0]
    }
}

impl std::ops::IndexMut<RegisterId> for RegisterFile {
    fn index_mut(&mut self, id: RegisterId) -> &mut Register {
        &mut self.registers[id.0]
    }
}

/// String literals, deduplicated by content and emitted as a read-only
/// section at the end of the unit.
#[derive(Debug, Default)]
pub struct StringTable {
    entries: Vec<(Vec<u8>, Label)>,
}

impl StringTable {
    fn label(&mut self, bytes: &[u8], labels: &mut LabelCounter) -> Label {
        if let Some((_, label)) = self.entries.iter().find(|(b, _)| b.as_slice() == bytes) {
            return *label;
        }

        let label = labels.next();
        self.entries.push((bytes.to_vec(), label));
        label
    }
}

/// Opcode suffix for an operand size.
fn suffix(size: u64) -> &'static str {
    match size {
        1 => "b",
        4 => "l",
        _ => "q",
    }
}

/// The number of bytes necessary to align the given offset on the stack.
fn align(offset: i64) -> i64 {
    if offset % STACK_ALIGNMENT == 0 {
        0
    } else {
        STACK_ALIGNMENT - offset.abs() % STACK_ALIGNMENT
    }
}

/// Render string bytes for a `.string` directive.
fn escape(bytes: &[u8]) -> String {
    let mut out = String::new();

    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }

    out
}

/// The per-compilation emitter. Labels, string literals and register state
/// persist across functions; everything else is per-function.
#[derive(Debug)]
pub struct Generator<W> {
    out: W,
    labels: LabelCounter,
    strings: StringTable,
    registers: RegisterFile,
}

impl<W: Write> Generator<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            labels: LabelCounter::default(),
            strings: StringTable::default(),
            registers: RegisterFile::default(),
        }
    }

    /// Allocate storage for and emit one function.
    pub fn generate_function(
        &mut self,
        ast: &mut Ast,
        table: &mut SymbolTable,
        function: &Function,
    ) -> io::Result<()> {
        let funcname = table[function.id].name.clone();
        let mut gen = FunctionGen {
            ast,
            table,
            out: &mut self.out,
            labels: &mut self.labels,
            strings: &mut self.strings,
            registers: &mut self.registers,
            offset: 0,
            funcname,
        };
        gen.function(function)
    }

    /// Emit `.comm` definitions for global variables, then the string
    /// table, and flush the output.
    pub fn generate_globals(&mut self, table: &SymbolTable) -> io::Result<()> {
        for &symbol in table.scope_symbols(table.global_scope()) {
            let symbol = &table[symbol];
            if !symbol.ty.is_function() {
                writeln!(
                    self.out,
                    "\t.comm\t{GLOBAL_PREFIX}{}{GLOBAL_SUFFIX}, {}",
                    symbol.name,
                    symbol.ty.size()
                )?;
            }
        }

        if !self.strings.entries.is_empty() {
            writeln!(self.out, "\t.section\t.rodata")?;
            for (bytes, label) in &self.strings.entries {
                writeln!(self.out, "{label}:")?;
                writeln!(self.out, "\t.string\t\"{}\"", escape(bytes))?;
            }
        }

        self.out.flush()
    }
}

struct FunctionGen<'a, W> {
    ast: &'a mut Ast,
    table: &'a mut SymbolTable,
    out: &'a mut W,
    labels: &'a mut LabelCounter,
    strings: &'a mut StringTable,
    registers: &'a mut RegisterFile,
    offset: i64,
    funcname: String,
}

impl<W: Write> FunctionGen<'_, W> {
    /*
     * The register binding protocol. `assign` and `load` are the only
     * functions that touch the node/register back-pointers, so the two
     * sides can never disagree.
     */

    /// Bind an expression and a register to each other, breaking any
    /// binding either of them had. Passing `None` on one side detaches the
    /// other.
    fn assign(&mut self, expr: Option<ExprId>, reg: Option<RegisterId>) {
        if let Some(expr) = expr {
            if let Some(old) = self.ast[expr].reg {
                self.registers[old].node = None;
            }
            self.ast[expr].reg = reg;
        }

        if let Some(reg) = reg {
            if let Some(old) = self.registers[reg].node {
                self.ast[old].reg = None;
            }
            self.registers[reg].node = expr;
        }
    }

    /// Bring an expression into a particular register, first spilling
    /// whatever the register held to a fresh frame slot. With no
    /// expression, this just vacates the register.
    fn load(&mut self, expr: Option<ExprId>, reg: RegisterId) -> io::Result<()> {
        if self.registers[reg].node == expr {
            return Ok(());
        }

        if let Some(node) = self.registers[reg].node {
            let size = self.ast[node].ty.size();
            self.offset -= size as i64;
            self.ast[node].offset = self.offset;
            writeln!(
                self.out,
                "\tmov{}\t{}, {}(%rbp)",
                suffix(size),
                self.registers[reg].name(size),
                self.offset
            )?;
        }

        if let Some(expr) = expr {
            let size = self.ast[expr].ty.size();
            let operand = self.operand(expr);
            writeln!(
                self.out,
                "\tmov{}\t{}, {}",
                suffix(size),
                operand,
                self.registers[reg].name(size)
            )?;
        }

        self.assign(expr, Some(reg));
        Ok(())
    }

    /// Any free register, spilling the first in the pool if none is.
    fn getreg(&mut self) -> io::Result<RegisterId> {
        if let Some(reg) = self.registers.find_free() {
            return Ok(reg);
        }

        self.load(None, RAX)?;
        Ok(RAX)
    }

    /// The expression's register if it has one, otherwise load it into a
    /// fresh one.
    fn load_if_unbound(&mut self, expr: ExprId) -> io::Result<RegisterId> {
        if let Some(reg) = self.ast[expr].reg {
            return Ok(reg);
        }

        let reg = self.getreg()?;
        self.load(Some(expr), reg)?;
        Ok(reg)
    }

    /// Render an expression as an instruction operand: its register if it
    /// has one, otherwise its home location.
    fn operand(&mut self, id: ExprId) -> String {
        let expr = &self.ast[id];

        if let Some(reg) = expr.reg {
            return self.registers[reg].name(expr.ty.size()).to_owned();
        }

        match &expr.kind {
            ExprKind::Identifier(symbol) => {
                let symbol = &self.table[*symbol];
                if symbol.offset == 0 {
                    format!("{GLOBAL_PREFIX}{}{GLOBAL_SUFFIX}", symbol.name)
                } else {
                    format!("{}(%rbp)", symbol.offset)
                }
            }
            ExprKind::Number(value) => format!("${value}"),
            ExprKind::String(bytes) => {
                let label = self.strings.label(bytes, self.labels);
                format!("{label}(%rip)")
            }
            _ => {
                debug_assert!(expr.offset != 0, "expression was never given a home");
                format!("{}(%rbp)", expr.offset)
            }
        }
    }

    /*
     * Expressions.
     */

    fn expression(&mut self, id: ExprId) -> io::Result<()> {
        let kind = self.ast[id].kind.clone();

        match kind {
            ExprKind::Number(_) | ExprKind::String(_) | ExprKind::Identifier(_) => Ok(()),
            ExprKind::Call { id: callee, args } => self.call(id, callee, &args),
            ExprKind::Binary(op, left, right) if op.is_arithmetic() => {
                self.arithmetic(id, op, left, right)
            }
            ExprKind::Binary(op, left, right) if op.is_division() => {
                self.division(id, op, left, right)
            }
            ExprKind::Binary(op, left, right) if op.is_comparison() => {
                self.comparison(id, op, left, right)
            }
            ExprKind::Binary(op, left, right) => self.logical(id, op, left, right),
            ExprKind::Unary(UnaryOp::Not, expr) => self.not(id, expr),
            ExprKind::Unary(UnaryOp::Negate, expr) => self.negate(id, expr),
            ExprKind::Address(expr) => self.address(id, expr),
            ExprKind::Dereference(expr) => self.dereference(id, expr),
            ExprKind::Cast(expr) => self.cast(id, expr),
        }
    }

    /// Add, subtract and multiply share one shape: the left operand ends
    /// up in a register, the right stays wherever it is, and the result
    /// takes over the left's register.
    fn arithmetic(&mut self, id: ExprId, op: BinaryOp, left: ExprId, right: ExprId) -> io::Result<()> {
        let mnemonic = match op {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "sub",
            BinaryOp::Multiply => "imul",
            _ => unreachable!(),
        };

        self.expression(left)?;
        self.expression(right)?;
        self.load_if_unbound(left)?;

        let size = self.ast[left].ty.size();
        let right_operand = self.operand(right);
        let left_operand = self.operand(left);
        writeln!(
            self.out,
            "\t{mnemonic}{}\t{right_operand}, {left_operand}",
            suffix(size)
        )?;

        self.assign(Some(right), None);
        let reg = self.ast[left].reg;
        self.assign(Some(id), reg);
        Ok(())
    }

    /// Division and remainder go through the fixed rax/rdx pair: dividend
    /// in rax, sign-extended into rdx, divisor forced into rcx.
    fn division(&mut self, id: ExprId, op: BinaryOp, left: ExprId, right: ExprId) -> io::Result<()> {
        self.expression(left)?;
        self.expression(right)?;

        self.load(Some(left), RAX)?;
        self.load(None, RDX)?;
        self.load(Some(right), RCX)?;

        if self.ast[left].ty.size() == 8 {
            writeln!(self.out, "\tcqto")?;
        } else {
            writeln!(self.out, "\tcltd")?;
        }

        let size = self.ast[right].ty.size();
        let right_operand = self.operand(right);
        writeln!(self.out, "\tidiv{}\t{right_operand}", suffix(size))?;

        self.assign(Some(right), None);
        self.assign(Some(left), None);

        let result = if op == BinaryOp::Divide { RAX } else { RDX };
        self.assign(Some(id), Some(result));
        Ok(())
    }

    /// Comparisons materialize their condition code into the low byte of a
    /// scratch register and zero-extend it to the int result.
    fn comparison(&mut self, id: ExprId, op: BinaryOp, left: ExprId, right: ExprId) -> io::Result<()> {
        let condition = match op {
            BinaryOp::LessThan => "l",
            BinaryOp::GreaterThan => "g",
            BinaryOp::LessOrEqual => "le",
            BinaryOp::GreaterOrEqual => "ge",
            BinaryOp::Equal => "e",
            BinaryOp::NotEqual => "ne",
            _ => unreachable!(),
        };

        self.expression(left)?;
        self.expression(right)?;
        self.load_if_unbound(left)?;

        let size = self.ast[left].ty.size();
        let right_operand = self.operand(right);
        let left_operand = self.operand(left);
        writeln!(
            self.out,
            "\tcmp{}\t{right_operand}, {left_operand}",
            suffix(size)
        )?;

        self.assign(Some(right), None);
        self.assign(Some(left), None);

        let reg = self.getreg()?;
        self.assign(Some(id), Some(reg));
        writeln!(self.out, "\tset{condition}\t{}", self.registers[reg].name(1))?;
        writeln!(
            self.out,
            "\tmovzbl\t{}, {}",
            self.registers[reg].name(1),
            self.registers[reg].name(4)
        )?;
        Ok(())
    }

    /// Logical and/or short-circuit through labels and produce 0 or 1.
    fn logical(&mut self, id: ExprId, op: BinaryOp, left: ExprId, right: ExprId) -> io::Result<()> {
        let short = self.labels.next();
        let done = self.labels.next();
        let if_true = op == BinaryOp::LogicalOr;

        self.test(left, short, if_true)?;
        self.test(right, short, if_true)?;

        let (fall, taken) = if if_true { (0, 1) } else { (1, 0) };
        let reg = self.getreg()?;
        self.assign(Some(id), Some(reg));
        let name = self.registers[reg].name(4);
        writeln!(self.out, "\tmovl\t${fall}, {name}")?;
        writeln!(self.out, "\tjmp\t{done}")?;
        writeln!(self.out, "{short}:")?;
        writeln!(self.out, "\tmovl\t${taken}, {name}")?;
        writeln!(self.out, "{done}:")?;
        Ok(())
    }

    fn not(&mut self, id: ExprId, expr: ExprId) -> io::Result<()> {
        self.expression(expr)?;
        let reg = self.load_if_unbound(expr)?;

        let size = self.ast[expr].ty.size();
        let operand = self.operand(expr);
        writeln!(self.out, "\tcmp{}\t$0, {operand}", suffix(size))?;
        writeln!(self.out, "\tsete\t{}", self.registers[reg].name(1))?;
        writeln!(
            self.out,
            "\tmovzbl\t{}, {}",
            self.registers[reg].name(1),
            self.registers[reg].name(4)
        )?;

        self.assign(Some(id), Some(reg));
        Ok(())
    }

    fn negate(&mut self, id: ExprId, expr: ExprId) -> io::Result<()> {
        self.expression(expr)?;
        let reg = self.load_if_unbound(expr)?;

        let size = self.ast[expr].ty.size();
        let operand = self.operand(expr);
        writeln!(self.out, "\tneg{}\t{operand}", suffix(size))?;

        self.assign(Some(id), Some(reg));
        Ok(())
    }

    /// Taking the address of a dereference is the identity; anything else
    /// is a `leaq` from the operand's home.
    fn address(&mut self, id: ExprId, expr: ExprId) -> io::Result<()> {
        if let ExprKind::Dereference(pointer) = self.ast[expr].kind {
            self.expression(pointer)?;
            let reg = self.load_if_unbound(pointer)?;
            self.assign(Some(id), Some(reg));
            return Ok(());
        }

        let reg = self.getreg()?;
        self.assign(Some(id), Some(reg));
        let operand = self.operand(expr);
        writeln!(self.out, "\tleaq\t{operand}, {}", self.registers[reg].name(8))
    }

    fn dereference(&mut self, id: ExprId, expr: ExprId) -> io::Result<()> {
        self.expression(expr)?;
        let reg = self.load_if_unbound(expr)?;

        let size = self.ast[id].ty.size();
        writeln!(
            self.out,
            "\tmov{}\t({}), {}",
            suffix(size),
            self.registers[reg].name(8),
            self.registers[reg].name(size)
        )?;

        self.assign(Some(id), Some(reg));
        Ok(())
    }

    /// A widening cast sign-extends within the operand's register; a
    /// narrowing or same-size cast just renames the low part.
    fn cast(&mut self, id: ExprId, expr: ExprId) -> io::Result<()> {
        self.expression(expr)?;
        let reg = self.load_if_unbound(expr)?;

        let from = self.ast[expr].ty.size();
        let to = self.ast[id].ty.size();

        if to > from {
            let mnemonic = match (from, to) {
                (1, 4) => "movsbl",
                (1, 8) => "movsbq",
                _ => "movslq",
            };
            writeln!(
                self.out,
                "\t{mnemonic}\t{}, {}",
                self.registers[reg].name(from),
                self.registers[reg].name(to)
            )?;
        }

        self.assign(Some(id), Some(reg));
        Ok(())
    }

    fn sign_extend_byte_arg(&mut self, arg: ExprId) -> io::Result<()> {
        if self.ast[arg].ty.size() == 1 {
            if let Some(reg) = self.ast[arg].reg {
                writeln!(
                    self.out,
                    "\tmovsbl\t{}, {}",
                    self.registers[reg].name(1),
                    self.registers[reg].name(4)
                )?;
            }
        }
        Ok(())
    }

    /// A call: arguments are evaluated right to left, stack-passed ones
    /// pushed (with the stack pre-aligned), register-passed ones loaded
    /// into their conventional registers. The whole pool is spilled before
    /// the call since the callee may clobber any of it.
    fn call(&mut self, id: ExprId, callee: SymbolId, args: &[ExprId]) -> io::Result<()> {
        let mut num_bytes = 0;

        for &arg in args.iter().rev() {
            self.expression(arg)?;
        }

        if args.len() > NUM_PARAM_REGS {
            num_bytes = align((args.len() - NUM_PARAM_REGS) as i64 * PARAM_ALIGNMENT);
            if num_bytes > 0 {
                writeln!(self.out, "\tsubq\t${num_bytes}, %rsp")?;
            }
        }

        for i in (0..args.len()).rev() {
            let arg = args[i];

            if i >= NUM_PARAM_REGS {
                num_bytes += PARAM_ALIGNMENT;
                self.load(Some(arg), RAX)?;
                self.sign_extend_byte_arg(arg)?;
                writeln!(self.out, "\tpushq\t%rax")?;
            } else {
                self.load(Some(arg), PARAMETERS[i])?;
                self.sign_extend_byte_arg(arg)?;
            }

            self.assign(Some(arg), None);
        }

        for reg in self.registers.ids().collect::<Vec<_>>() {
            self.load(None, reg)?;
        }

        // A variadic callee expects the number of vector-register
        // arguments in %eax; we never pass any.
        if self.table[callee].ty.parameters().variadic {
            writeln!(self.out, "\tmovl\t$0, %eax")?;
        }

        writeln!(self.out, "\tcall\t{GLOBAL_PREFIX}{}", self.table[callee].name)?;

        if num_bytes > 0 {
            writeln!(self.out, "\taddq\t${num_bytes}, %rsp")?;
        }

        self.assign(Some(id), Some(RAX));
        Ok(())
    }

    /// Generate a condition: compare against zero and branch to the label
    /// when the outcome matches `if_true`.
    fn test(&mut self, expr: ExprId, label: Label, if_true: bool) -> io::Result<()> {
        self.expression(expr)?;
        self.load_if_unbound(expr)?;

        let size = self.ast[expr].ty.size();
        let operand = self.operand(expr);
        writeln!(self.out, "\tcmp{}\t$0, {operand}", suffix(size))?;
        writeln!(self.out, "\t{}\t{label}", if if_true { "jne" } else { "je" })?;

        self.assign(Some(expr), None);
        Ok(())
    }

    /*
     * Statements. `exit` is the enclosing loop's exit label, the target
     * of any break statement.
     */

    fn statement(&mut self, id: StmtId, exit: Option<Label>) -> io::Result<()> {
        let stmt = self.ast[id].clone();

        match stmt {
            Stmt::Simple(expr) => {
                self.expression(expr)?;
                self.assign(Some(expr), None);
                Ok(())
            }
            Stmt::Assignment { left, right } => self.assignment(left, right),
            Stmt::Return(expr) => {
                self.expression(expr)?;
                self.load(Some(expr), RAX)?;
                writeln!(self.out, "\tjmp\t{GLOBAL_PREFIX}{}.exit", self.funcname)?;
                self.assign(Some(expr), None);
                Ok(())
            }
            Stmt::Break => {
                if let Some(exit) = exit {
                    writeln!(self.out, "\tjmp\t{exit}")?;
                }
                Ok(())
            }
            Stmt::While { test, body } => {
                let repeat = self.labels.next();
                let done = self.labels.next();

                writeln!(self.out, "{repeat}:")?;
                self.test(test, done, false)?;
                self.statement(body, Some(done))?;
                writeln!(self.out, "\tjmp\t{repeat}")?;
                writeln!(self.out, "{done}:")
            }
            Stmt::For {
                init,
                test,
                incr,
                body,
            } => {
                self.statement(init, exit)?;

                let repeat = self.labels.next();
                let done = self.labels.next();

                writeln!(self.out, "{repeat}:")?;
                self.test(test, done, false)?;
                self.statement(body, Some(done))?;
                self.statement(incr, Some(done))?;
                writeln!(self.out, "\tjmp\t{repeat}")?;
                writeln!(self.out, "{done}:")
            }
            Stmt::If {
                test,
                then,
                otherwise,
            } => match otherwise {
                None => {
                    let done = self.labels.next();
                    self.test(test, done, false)?;
                    self.statement(then, exit)?;
                    writeln!(self.out, "{done}:")
                }
                Some(otherwise) => {
                    let other = self.labels.next();
                    let done = self.labels.next();
                    self.test(test, other, false)?;
                    self.statement(then, exit)?;
                    writeln!(self.out, "\tjmp\t{done}")?;
                    writeln!(self.out, "{other}:")?;
                    self.statement(otherwise, exit)?;
                    writeln!(self.out, "{done}:")
                }
            },
            Stmt::Block { stmts, .. } => {
                for stmt in stmts {
                    self.statement(stmt, exit)?;
                    debug_assert!(
                        self.registers.all_free(),
                        "a register survived a statement"
                    );
                }
                Ok(())
            }
        }
    }

    fn assignment(&mut self, left: ExprId, right: ExprId) -> io::Result<()> {
        self.expression(right)?;

        let size = self.ast[right].ty.size();

        if let ExprKind::Dereference(pointer) = self.ast[left].kind {
            self.expression(pointer)?;
            let preg = self.load_if_unbound(pointer)?;
            self.load_if_unbound(right)?;

            let right_operand = self.operand(right);
            writeln!(
                self.out,
                "\tmov{}\t{right_operand}, ({})",
                suffix(size),
                self.registers[preg].name(8)
            )?;

            self.assign(Some(right), None);
            self.assign(Some(pointer), None);
        } else {
            self.load_if_unbound(right)?;

            let right_operand = self.operand(right);
            let left_operand = self.operand(left);
            writeln!(
                self.out,
                "\tmov{}\t{right_operand}, {left_operand}",
                suffix(size)
            )?;

            self.assign(Some(right), None);
        }

        Ok(())
    }

    /// Emit one function: allocate the frame, spill register parameters
    /// into it, generate the body, and close with the shared exit label.
    /// The frame size is published afterwards as a symbolic constant,
    /// since spills during the body can still grow it.
    fn function(&mut self, function: &Function) -> io::Result<()> {
        let param_offset = 2 * SIZEOF_REG as i64;
        self.offset = param_offset;
        stack::allocate_function(self.ast, self.table, function, &mut self.offset);

        writeln!(self.out, "{GLOBAL_PREFIX}{}:", self.funcname)?;
        writeln!(self.out, "\tpushq\t%rbp")?;
        writeln!(self.out, "\tmovq\t%rsp, %rbp")?;
        writeln!(self.out, "\tmovl\t${}.size, %eax", self.funcname)?;
        writeln!(self.out, "\tsubq\t%rax, %rsp")?;

        let ptypes_len = self.table[function.id].ty.parameters().types.len();
        let Stmt::Block { scope, .. } = &self.ast[function.body] else {
            unreachable!("function body is a block");
        };
        let symbols = self.table.scope_symbols(*scope).to_vec();

        for i in 0..ptypes_len.min(NUM_PARAM_REGS) {
            let symbol = &self.table[symbols[i]];
            let size = symbol.ty.size();
            writeln!(
                self.out,
                "\tmov{}\t{}, {}(%rbp)",
                suffix(size),
                self.registers[PARAMETERS[i]].name(size),
                symbol.offset
            )?;
        }

        self.statement(function.body, None)?;

        writeln!(self.out)?;
        writeln!(self.out, "{GLOBAL_PREFIX}{}.exit:", self.funcname)?;
        writeln!(self.out, "\tmovq\t%rbp, %rsp")?;
        writeln!(self.out, "\tpopq\t%rbp")?;
        writeln!(self.out, "\tret")?;
        writeln!(self.out)?;

        self.offset -= align(self.offset - param_offset);
        writeln!(self.out, "\t.set\t{}.size, {}", self.funcname, -self.offset)?;
        writeln!(self.out, "\t.globl\t{GLOBAL_PREFIX}{}", self.funcname)?;
        writeln!(self.out)
    }
}
