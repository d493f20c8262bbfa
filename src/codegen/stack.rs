//! Storage allocation: walks a function and assigns every parameter and
//! local a frame offset. Offsets grow downward from the base pointer;
//! sibling statements restart from the same offset so their locals share
//! stack space, and the enclosing walk keeps the minimum.

use crate::ast::{Ast, Function, Stmt, StmtId};
use crate::checker::SymbolTable;
use crate::machine::{NUM_PARAM_REGS, PARAM_ALIGNMENT};

/// Assign offsets for a function. On entry `offset` is the offset of the
/// first stack-passed parameter (the two saved registers); stack-passed
/// parameters get increasing positive offsets, register-passed parameters
/// and locals get decreasing negative ones.
pub fn allocate_function(ast: &Ast, table: &mut SymbolTable, function: &Function, offset: &mut i64) {
    let ptypes = table[function.id].ty.parameters().types.clone();
    let Stmt::Block { scope, .. } = &ast[function.body] else {
        unreachable!("function body is a block");
    };
    let symbols = table.scope_symbols(*scope).to_vec();

    for i in NUM_PARAM_REGS..ptypes.len() {
        table[symbols[i]].offset = *offset;
        *offset += ptypes[i].size() as i64;

        while *offset % PARAM_ALIGNMENT != 0 {
            *offset += 1;
        }
    }

    *offset = 0;

    for i in 0..ptypes.len().min(NUM_PARAM_REGS) {
        *offset -= ptypes[i].size() as i64;
        table[symbols[i]].offset = *offset;
    }

    allocate_statement(ast, table, function.body, offset);
}

/// Allocate storage within one statement. Only symbols that have not
/// already been assigned an offset get one, since parameters are handled
/// by the function walk above.
fn allocate_statement(ast: &Ast, table: &mut SymbolTable, id: StmtId, offset: &mut i64) {
    match &ast[id] {
        Stmt::Block { scope, stmts } => {
            for &symbol in &table.scope_symbols(*scope).to_vec() {
                if table[symbol].offset == 0 {
                    *offset -= table[symbol].ty.size() as i64;
                    table[symbol].offset = *offset;
                }
            }

            let saved = *offset;

            for &stmt in stmts {
                let mut temp = saved;
                allocate_statement(ast, table, stmt, &mut temp);
                *offset = (*offset).min(temp);
            }
        }
        Stmt::While { body, .. } | Stmt::For { body, .. } => {
            allocate_statement(ast, table, *body, offset);
        }
        Stmt::If {
            then, otherwise, ..
        } => {
            let saved = *offset;
            allocate_statement(ast, table, *then, offset);

            if let Some(otherwise) = otherwise {
                let mut temp = saved;
                allocate_statement(ast, table, *otherwise, &mut temp);
                *offset = (*offset).min(temp);
            }
        }
        _ => (),
    }
}
