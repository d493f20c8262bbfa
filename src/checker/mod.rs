//! The semantic checker. The parser feeds every declaration and expression
//! through the entry points here; each `check_*` performs the usual
//! conversions on its already-checked operands, reports any violation, and
//! returns a freshly built node whose type is the checked result type.
//! A malformed construct yields the error type, and any operand of error
//! type suppresses further diagnostics, so each fault is reported once.

mod scope;

pub use scope::{Scope, ScopeId, Symbol, SymbolId, SymbolTable};

use crate::ast::{Ast, BinaryOp, ExprId, ExprKind, Stmt, StmtId, UnaryOp};
use crate::diagnostics::{Diagnostic, Reporter};
use crate::types::Type;

use std::collections::HashSet;
use std::io::Write;

/// The compiler context shared by the parser, the checker entry points and
/// (through its `ast` and `table` fields) the code generator.
#[derive(Debug)]
pub struct Checker<E> {
    pub ast: Ast,
    pub table: SymbolTable,
    pub reporter: Reporter<E>,
    defined: HashSet<String>,
}

impl<E: Write> Checker<E> {
    pub fn new(reporter: Reporter<E>) -> Self {
        Self {
            ast: Ast::new(),
            table: SymbolTable::new(),
            reporter,
            defined: HashSet::new(),
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        self.reporter.report(&diagnostic);
    }

    /*
     * Declarations.
     */

    /// Declare a variable in the current scope. A redeclaration is
    /// discarded and the original binding kept.
    pub fn declare_variable(&mut self, name: &str, ty: Type) -> SymbolId {
        let current = self.table.current_scope();

        if let Some(id) = self.table.find(current, name) {
            if current != self.table.global_scope() {
                self.report(Diagnostic::Redeclaration(name.to_owned()));
            } else if self.table[id].ty != ty {
                self.report(Diagnostic::ConflictingTypes(name.to_owned()));
            }
            return id;
        }

        self.table.insert(current, Symbol::new(name, ty))
    }

    /// Declare a function. Functions always live in the global scope, no
    /// matter where the declaration appears; a redeclaration must agree on
    /// the type and is otherwise discarded.
    pub fn declare_function(&mut self, name: &str, ty: Type) -> SymbolId {
        let global = self.table.global_scope();

        if let Some(id) = self.table.find(global, name) {
            if self.table[id].ty != ty {
                self.report(Diagnostic::ConflictingTypes(name.to_owned()));
            }
            return id;
        }

        self.table.insert(global, Symbol::new(name, ty))
    }

    /// Define a function: declare it, and reject a second definition of the
    /// same name.
    pub fn define_function(&mut self, name: &str, ty: Type) -> SymbolId {
        if self.defined.contains(name) {
            self.report(Diagnostic::Redefinition(name.to_owned()));
        }

        self.defined.insert(name.to_owned());
        self.declare_function(name, ty)
    }

    /// Look up a name along the scope chain. An undeclared name is reported
    /// and then declared with the error type so later uses stay quiet.
    pub fn check_identifier(&mut self, name: &str) -> SymbolId {
        if let Some(id) = self.table.lookup(name) {
            return id;
        }

        self.report(Diagnostic::Undeclared(name.to_owned()));
        let current = self.table.current_scope();
        self.table.insert(current, Symbol::new(name, Type::Error))
    }

    /*
     * Conversion primitives. Each one may replace the expression slot it
     * is handed, wrapping the old node or folding a literal.
     */

    /// Convert to the given type, inserting a cast if necessary. An int
    /// literal converts to a long literal without a cast.
    fn cast(&mut self, expr: &mut ExprId, ty: &Type) {
        if let ExprKind::Number(_) = self.ast[*expr].kind {
            if self.ast[*expr].ty == Type::INT && *ty == Type::LONG {
                self.ast[*expr].ty = Type::LONG;
            }
        }

        if self.ast[*expr].ty != *ty {
            *expr = self.ast.add_expr(ExprKind::Cast(*expr), ty.clone());
        }
    }

    /// Arithmetic promotion: a char becomes an int.
    fn promote(&mut self, expr: &mut ExprId) {
        let promoted = self.ast[*expr].ty.promote();
        self.cast(expr, &promoted);
    }

    /// Type decay: an array becomes a pointer to its first element by
    /// taking its address. Returns the resulting type.
    fn decay(&mut self, expr: &mut ExprId) -> Type {
        if self.ast[*expr].ty.is_array() {
            let decayed = self.ast[*expr].ty.decay();
            *expr = self.ast.add_expr(ExprKind::Address(*expr), decayed);
        }

        self.ast[*expr].ty.clone()
    }

    /// Convert to the given type, but only by sign-extending; at minimum,
    /// perform arithmetic promotion.
    fn extend(&mut self, expr: &mut ExprId, ty: &Type) {
        let t = &self.ast[*expr].ty;

        if (*t == Type::CHAR || *t == Type::INT) && *ty == Type::LONG {
            self.cast(expr, &Type::LONG);
        } else {
            self.promote(expr);
        }
    }

    /// Scale the numeric operand of pointer arithmetic by the element
    /// size. A literal is folded; anything else is extended to long and
    /// multiplied.
    fn scale(&mut self, expr: ExprId, size: u64) -> ExprId {
        let mut expr = expr;

        if size == 1 {
            self.extend(&mut expr, &Type::LONG);
            return expr;
        }

        if let ExprKind::Number(value) = self.ast[expr].kind {
            self.ast[expr].kind = ExprKind::Number(value * size as i64);
            self.ast[expr].ty = Type::LONG;
            return expr;
        }

        self.extend(&mut expr, &Type::LONG);
        let count = self.ast.add_expr(ExprKind::Number(size as i64), Type::LONG);
        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::Multiply, expr, count), Type::LONG)
    }

    /*
     * Expressions.
     */

    /// Check a call: the identifier must have a function type and the
    /// arguments must match the parameters. Named arguments decay and must
    /// be compatible with their parameter; variadic extras promote, decay
    /// and must be scalar.
    pub fn check_call(&mut self, id: SymbolId, mut args: Vec<ExprId>) -> ExprId {
        let t = self.table[id].ty.clone();
        let mut result = Type::Error;

        if !t.is_error() {
            if !t.is_function() {
                self.report(Diagnostic::NotAFunction);
                return self.ast.add_expr(ExprKind::Call { id, args }, Type::Error);
            }

            let params = t.parameters().clone();

            if args.len() < params.types.len()
                || (!params.variadic && args.len() > params.types.len())
            {
                self.report(Diagnostic::InvalidArguments);
                return self.ast.add_expr(ExprKind::Call { id, args }, Type::Error);
            }

            for (i, ptype) in params.types.iter().enumerate() {
                if self.ast[args[i]].ty.is_error() {
                    continue;
                }
                let t = self.decay(&mut args[i]);
                if !ptype.is_compatible_with(&t) {
                    self.report(Diagnostic::InvalidArguments);
                    return self.ast.add_expr(ExprKind::Call { id, args }, Type::Error);
                }
                self.cast(&mut args[i], ptype);
            }

            for i in params.types.len()..args.len() {
                if self.ast[args[i]].ty.is_error() {
                    continue;
                }
                self.promote(&mut args[i]);
                if !self.decay(&mut args[i]).is_scalar() {
                    self.report(Diagnostic::InvalidArguments);
                    return self.ast.add_expr(ExprKind::Call { id, args }, Type::Error);
                }
            }

            result = Type::scalar(t.specifier(), t.indirection());
        }

        self.ast.add_expr(ExprKind::Call { id, args }, result)
    }

    /// Check an index expression L[R]: after the usual conversions L must
    /// be a pointer and R numeric; R is scaled by the element size and the
    /// result is *(L + R).
    pub fn check_array(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        self.promote(&mut left);
        let t1 = self.decay(&mut left);
        self.extend(&mut right, &Type::LONG);
        let t2 = self.decay(&mut right);
        let mut result = Type::Error;

        if !t1.is_error() && !t2.is_error() {
            if t1.is_pointer() && t2.is_numeric() {
                right = self.scale(right, t1.dereference().size());
                result = t1.dereference();
            } else {
                self.report(Diagnostic::InvalidBinaryOperands("[]"));
            }
        }

        let sum = self
            .ast
            .add_expr(ExprKind::Binary(BinaryOp::Add, left, right), t1);
        self.ast.add_expr(ExprKind::Dereference(sum), result)
    }

    /// Check !EXPR: the operand must be scalar; the result is int.
    pub fn check_not(&mut self, mut expr: ExprId) -> ExprId {
        self.promote(&mut expr);
        let t = self.decay(&mut expr);
        let mut result = Type::Error;

        if !t.is_error() {
            if t.is_scalar() {
                result = Type::INT;
            } else {
                self.report(Diagnostic::InvalidUnaryOperand("!"));
            }
        }

        self.ast.add_expr(ExprKind::Unary(UnaryOp::Not, expr), result)
    }

    /// Check -EXPR: the operand must be numeric; the result keeps its type.
    pub fn check_negate(&mut self, mut expr: ExprId) -> ExprId {
        self.promote(&mut expr);
        let t = self.decay(&mut expr);
        let mut result = Type::Error;

        if !t.is_error() {
            if t.is_numeric() {
                result = t;
            } else {
                self.report(Diagnostic::InvalidUnaryOperand("-"));
            }
        }

        self.ast
            .add_expr(ExprKind::Unary(UnaryOp::Negate, expr), result)
    }

    /// Check *EXPR: after decay the operand must be a pointer to T; the
    /// result has type T and is an lvalue.
    pub fn check_dereference(&mut self, mut expr: ExprId) -> ExprId {
        let t = self.decay(&mut expr);
        let mut result = Type::Error;

        if !t.is_error() {
            if t.is_pointer() {
                result = t.dereference();
            } else {
                self.report(Diagnostic::InvalidUnaryOperand("*"));
            }
        }

        self.ast.add_expr(ExprKind::Dereference(expr), result)
    }

    /// Check &EXPR: the operand must be an lvalue; the result is a pointer
    /// to the operand's type.
    pub fn check_address(&mut self, expr: ExprId) -> ExprId {
        let t = self.ast[expr].ty.clone();
        let mut result = Type::Error;

        if !t.is_error() {
            if self.ast[expr].is_lvalue() {
                result = Type::scalar(t.specifier(), t.indirection() + 1);
            } else {
                self.report(Diagnostic::LvalueRequired);
            }
        }

        self.ast.add_expr(ExprKind::Address(expr), result)
    }

    /// Check sizeof EXPR: the operand must not have a function type; the
    /// result is a long literal.
    pub fn check_sizeof(&mut self, expr: ExprId) -> ExprId {
        let t = self.ast[expr].ty.clone();
        let mut size = 0;

        if !t.is_error() {
            if t.is_function() {
                self.report(Diagnostic::InvalidSizeof);
            } else {
                size = t.size();
            }
        }

        self.ast
            .add_expr(ExprKind::Number(size as i64), Type::LONG)
    }

    /// Check (TYPE) EXPR: both types must be numeric, both pointers, or
    /// one a pointer and the other long.
    pub fn check_cast(&mut self, ty: &Type, mut expr: ExprId) -> ExprId {
        let t = self.decay(&mut expr);
        let mut result = Type::Error;

        if !t.is_error() {
            if (ty.is_numeric() && t.is_numeric())
                || (ty.is_pointer() && t.is_pointer())
                || (ty.is_pointer() && t == Type::LONG)
                || (*ty == Type::LONG && t.is_pointer())
            {
                result = ty.clone();
            } else {
                self.report(Diagnostic::InvalidCast);
            }
        }

        self.cast(&mut expr, &result);
        expr
    }

    /// The shared multiplicative rule: both operands extend toward each
    /// other, decay, and must be numeric; the result takes the left type.
    fn check_multiplicative(
        &mut self,
        left: &mut ExprId,
        right: &mut ExprId,
        op: &'static str,
    ) -> Type {
        let rt = self.ast[*right].ty.clone();
        self.extend(left, &rt);
        let t1 = self.decay(left);
        let lt = self.ast[*left].ty.clone();
        self.extend(right, &lt);
        let t2 = self.decay(right);

        if t1.is_error() || t2.is_error() {
            return Type::Error;
        }

        if t1.is_numeric() && t2.is_numeric() {
            t1
        } else {
            self.report(Diagnostic::InvalidBinaryOperands(op));
            Type::Error
        }
    }

    pub fn check_multiply(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let t = self.check_multiplicative(&mut left, &mut right, "*");
        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::Multiply, left, right), t)
    }

    pub fn check_divide(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let t = self.check_multiplicative(&mut left, &mut right, "/");
        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::Divide, left, right), t)
    }

    pub fn check_remainder(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let t = self.check_multiplicative(&mut left, &mut right, "%");
        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::Remainder, left, right), t)
    }

    /// Check L + R: numeric + numeric keeps the wider type; pointer +
    /// numeric scales the numeric side by the element size.
    pub fn check_add(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let rt = self.ast[right].ty.clone();
        self.extend(&mut left, &rt);
        let t1 = self.decay(&mut left);
        let lt = self.ast[left].ty.clone();
        self.extend(&mut right, &lt);
        let t2 = self.decay(&mut right);
        let mut result = Type::Error;

        if !t1.is_error() && !t2.is_error() {
            if t1.is_numeric() && t2.is_numeric() {
                result = t1;
            } else if t1.is_pointer() && t2.is_numeric() {
                right = self.scale(right, t1.dereference().size());
                result = t1;
            } else if t1.is_numeric() && t2.is_pointer() {
                left = self.scale(left, t2.dereference().size());
                result = t2;
            } else {
                self.report(Diagnostic::InvalidBinaryOperands("+"));
            }
        }

        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::Add, left, right), result)
    }

    /// Check L - R: as addition, except that subtracting two identical
    /// pointer types yields a long, divided through by the element size.
    pub fn check_subtract(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let rt = self.ast[right].ty.clone();
        self.extend(&mut left, &rt);
        let t1 = self.decay(&mut left);
        let lt = self.ast[left].ty.clone();
        self.extend(&mut right, &lt);
        let t2 = self.decay(&mut right);
        let mut result = Type::Error;

        if !t1.is_error() && !t2.is_error() {
            if t1.is_numeric() && t2.is_numeric() {
                result = t1.clone();
            } else if t1.is_pointer() && t1 == t2 {
                result = Type::LONG;
            } else if t1.is_pointer() && t2.is_numeric() {
                right = self.scale(right, t1.dereference().size());
                result = t1.clone();
            } else {
                self.report(Diagnostic::InvalidBinaryOperands("-"));
            }
        }

        let mut expr = self
            .ast
            .add_expr(ExprKind::Binary(BinaryOp::Subtract, left, right), result);

        if t1.is_pointer() && t1 == t2 {
            let size = self
                .ast
                .add_expr(ExprKind::Number(t1.dereference().size() as i64), Type::LONG);
            expr = self
                .ast
                .add_expr(ExprKind::Binary(BinaryOp::Divide, expr, size), Type::LONG);
        }

        expr
    }

    /// The shared relational/equality rule: the converted types must be
    /// compatible; the result is int.
    fn check_comparative(
        &mut self,
        left: &mut ExprId,
        right: &mut ExprId,
        op: &'static str,
    ) -> Type {
        let rt = self.ast[*right].ty.clone();
        self.extend(left, &rt);
        let t1 = self.decay(left);
        let lt = self.ast[*left].ty.clone();
        self.extend(right, &lt);
        let t2 = self.decay(right);

        if t1.is_error() || t2.is_error() {
            return Type::Error;
        }

        if t1.is_compatible_with(&t2) {
            Type::INT
        } else {
            self.report(Diagnostic::InvalidBinaryOperands(op));
            Type::Error
        }
    }

    pub fn check_less_than(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let t = self.check_comparative(&mut left, &mut right, "<");
        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::LessThan, left, right), t)
    }

    pub fn check_greater_than(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let t = self.check_comparative(&mut left, &mut right, ">");
        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::GreaterThan, left, right), t)
    }

    pub fn check_less_or_equal(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let t = self.check_comparative(&mut left, &mut right, "<=");
        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::LessOrEqual, left, right), t)
    }

    pub fn check_greater_or_equal(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let t = self.check_comparative(&mut left, &mut right, ">=");
        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::GreaterOrEqual, left, right), t)
    }

    pub fn check_equal(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let t = self.check_comparative(&mut left, &mut right, "==");
        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::Equal, left, right), t)
    }

    pub fn check_not_equal(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let t = self.check_comparative(&mut left, &mut right, "!=");
        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::NotEqual, left, right), t)
    }

    /// The shared logical rule: both operands must be scalar after the
    /// usual conversions; the result is int.
    fn check_logical(&mut self, left: &mut ExprId, right: &mut ExprId, op: &'static str) -> Type {
        self.promote(left);
        let t1 = self.decay(left);
        self.promote(right);
        let t2 = self.decay(right);

        if t1.is_error() || t2.is_error() {
            return Type::Error;
        }

        if t1.is_scalar() && t2.is_scalar() {
            Type::INT
        } else {
            self.report(Diagnostic::InvalidBinaryOperands(op));
            Type::Error
        }
    }

    pub fn check_logical_and(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let t = self.check_logical(&mut left, &mut right, "&&");
        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::LogicalAnd, left, right), t)
    }

    pub fn check_logical_or(&mut self, mut left: ExprId, mut right: ExprId) -> ExprId {
        let t = self.check_logical(&mut left, &mut right, "||");
        self.ast
            .add_expr(ExprKind::Binary(BinaryOp::LogicalOr, left, right), t)
    }

    /// Check the controlling expression of a while, for or if statement:
    /// it must have scalar type after the usual conversions.
    pub fn check_test(&mut self, mut expr: ExprId) -> ExprId {
        self.promote(&mut expr);
        let t = self.decay(&mut expr);

        if !t.is_error() && !t.is_scalar() {
            self.report(Diagnostic::ScalarRequired);
        }

        expr
    }

    /*
     * Statements.
     */

    /// Check L = R: the left side must be an lvalue and the types must be
    /// compatible; the right side is cast to the left type.
    pub fn check_assignment(&mut self, left: ExprId, mut right: ExprId) -> StmtId {
        let t1 = self.ast[left].ty.clone();
        let t2 = self.decay(&mut right);

        if !t1.is_error() && !t2.is_error() {
            if !self.ast[left].is_lvalue() {
                self.report(Diagnostic::LvalueRequired);
            } else if !t1.is_compatible_with(&t2) {
                self.report(Diagnostic::InvalidBinaryOperands("="));
            } else {
                self.cast(&mut right, &t1);
            }
        }

        self.ast.add_stmt(Stmt::Assignment { left, right })
    }

    /// Check return EXPR against the enclosing function's return type.
    pub fn check_return(&mut self, mut expr: ExprId, return_type: &Type) -> StmtId {
        let t = self.decay(&mut expr);

        if !t.is_error() {
            if t.is_compatible_with(return_type) {
                self.cast(&mut expr, return_type);
            } else {
                self.report(Diagnostic::InvalidReturnType);
            }
        }

        self.ast.add_stmt(Stmt::Return(expr))
    }

    /// Check that a break statement appears inside a loop.
    pub fn check_break(&mut self, loop_depth: u32) -> StmtId {
        if loop_depth == 0 {
            self.report(Diagnostic::BreakNotWithinLoop);
        }

        self.ast.add_stmt(Stmt::Break)
    }
}
