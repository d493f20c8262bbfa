//! The abstract syntax tree. Nodes live in per-kind arenas owned by [Ast]
//! and refer to each other through [ExprId]/[StmtId] handles, so that the
//! checker can rewrite a subexpression slot in place and the generator can
//! attach register bindings and spill offsets without fighting ownership.

use crate::checker::{ScopeId, SymbolId};
use crate::codegen::RegisterId;
use crate::types::Type;

use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExprId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StmtId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    Equal,
    NotEqual,
    LogicalAnd,
    LogicalOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl BinaryOp {
    #[inline]
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Add | Self::Subtract | Self::Multiply)
    }

    #[inline]
    pub fn is_division(&self) -> bool {
        matches!(self, Self::Divide | Self::Remainder)
    }

    #[inline]
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::LessThan
                | Self::GreaterThan
                | Self::LessOrEqual
                | Self::GreaterOrEqual
                | Self::Equal
                | Self::NotEqual
        )
    }

    #[inline]
    pub fn is_logical(&self) -> bool {
        matches!(self, Self::LogicalAnd | Self::LogicalOr)
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Number(i64),
    String(Vec<u8>),
    Identifier(SymbolId),
    Call { id: SymbolId, args: Vec<ExprId> },
    Binary(BinaryOp, ExprId, ExprId),
    Unary(UnaryOp, ExprId),
    Address(ExprId),
    Dereference(ExprId),
    Cast(ExprId),
}

/// An expression node. `reg` is the back-reference half of the register
/// binding maintained by the generator; `offset` is the spill slot, zero
/// until one is assigned.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub reg: Option<RegisterId>,
    pub offset: i64,
}

impl Expr {
    /// Only identifiers of non-array type and dereferences designate
    /// storage locations.
    pub fn is_lvalue(&self) -> bool {
        match self.kind {
            ExprKind::Identifier(_) => !self.ty.is_array(),
            ExprKind::Dereference(_) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Simple(ExprId),
    Assignment {
        left: ExprId,
        right: ExprId,
    },
    Return(ExprId),
    Break,
    While {
        test: ExprId,
        body: StmtId,
    },
    For {
        init: StmtId,
        test: ExprId,
        incr: StmtId,
        body: StmtId,
    },
    If {
        test: ExprId,
        then: StmtId,
        otherwise: Option<StmtId>,
    },
    Block {
        scope: ScopeId,
        stmts: Vec<StmtId>,
    },
}

/// A function definition: its symbol and its body block.
#[derive(Debug, Clone, Copy)]
pub struct Function {
    pub id: SymbolId,
    pub body: StmtId,
}

#[derive(Debug, Default)]
pub struct Ast {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_expr(&mut self, kind: ExprKind, ty: Type) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr {
            kind,
            ty,
            reg: None,
            offset: 0,
        });
        id
    }

    pub fn add_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(stmt);
        id
    }
}

impl Index<ExprId> for Ast {
    type Output = Expr;
    fn index(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }
}

impl IndexMut<ExprId> for Ast {
    fn index_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.0 as usize]
    }
}

impl Index<StmtId> for Ast {
    type Output = Stmt;
    fn index(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0 as usize]
    }
}

impl IndexMut<StmtId> for Ast {
    fn index_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.0 as usize]
    }
}
