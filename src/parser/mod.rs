//! The recursive-descent parser, and with it the heart of the single-pass
//! pipeline: declarations and expressions flow through the checker entry
//! points as they are recognized, so the tree handed onward already carries
//! every implicit conversion, and each function body is generated as soon
//! as its closing brace is matched (provided no error has been reported).

mod cursor;
mod parse_error;
#[cfg(test)]
mod parser_tests;

use crate::ast::{ExprId, ExprKind, Function, Stmt, StmtId};
use crate::checker::Checker;
use crate::codegen::Generator;
use crate::diagnostics::Reporter;
use crate::lexer::{LinedToken, Token};
use crate::types::{Parameters, Specifier, Type};

use cursor::Cursor;
pub use parse_error::{InnerParseError, ParseError, Result};

use std::io::Write;

/// Parse a translation unit, writing assembly to `output` and diagnostics
/// to `diagnostics`. Returns on the first syntax error; semantic errors
/// merely suppress code generation.
pub fn parse<W: Write, E: Write>(tokens: &[LinedToken], output: W, diagnostics: E) -> Result<()> {
    let mut parser = Parser {
        cursor: Cursor::new(tokens),
        checker: Checker::new(Reporter::new(diagnostics)),
        gen: Generator::new(output),
        return_type: Type::INT,
        loop_depth: 0,
    };

    parser.translation_unit()
}

struct Parser<'a, W, E> {
    cursor: Cursor<'a>,
    checker: Checker<E>,
    gen: Generator<W>,
    return_type: Type,
    loop_depth: u32,
}

impl<W: Write, E: Write> Parser<'_, W, E> {
    fn translation_unit(&mut self) -> Result<()> {
        self.checker.table.open_scope();

        while !self.cursor.at_end() {
            self.function_or_global()?;
        }

        self.checker.table.close_scope();

        if self.checker.reporter.error_count() == 0 {
            self.gen.generate_globals(&self.checker.table)?;
        }

        Ok(())
    }

    /*
     * Declarations.
     */

    fn specifier(&mut self) -> Result<Specifier> {
        let line = self.cursor.get_line();
        let next = self.cursor.next_or_error()?;
        match next {
            Token::Char => Ok(Specifier::Char),
            Token::Int => Ok(Specifier::Int),
            Token::Long => Ok(Specifier::Long),
            _ => Err(InnerParseError::ExpectedSpecifierButGot(next.clone()).set_line(line)),
        }
    }

    fn pointers(&mut self) -> u32 {
        let mut count = 0;
        while self.cursor.bump_if(&Token::Star) {
            count += 1;
        }
        count
    }

    fn identifier(&mut self) -> Result<String> {
        let line = self.cursor.get_line();
        let next = self.cursor.next_or_error()?;
        if let Token::Identifier(name) = next {
            Ok(name.clone())
        } else {
            Err(InnerParseError::ExpectedIdentifierButGot(next.clone()).set_line(line))
        }
    }

    fn number(&mut self) -> Result<i64> {
        let line = self.cursor.get_line();
        let next = self.cursor.next_or_error()?;
        if let Token::Number(value) = next {
            Ok(*value)
        } else {
            Err(InnerParseError::ExpectedNumberButGot(next.clone()).set_line(line))
        }
    }

    /// declarator: pointers identifier [ "[" num "]" ]
    fn declarator(&mut self, specifier: Specifier) -> Result<()> {
        let indirection = self.pointers();
        let name = self.identifier()?;

        if self.cursor.bump_if(&Token::LeftBracket) {
            let length = self.number()?;
            self.checker
                .declare_variable(&name, Type::array(specifier, indirection, length as u64));
            self.cursor.expect(&Token::RightBracket)?;
        } else {
            self.checker
                .declare_variable(&name, Type::scalar(specifier, indirection));
        }

        Ok(())
    }

    /// declaration: specifier declarator { "," declarator } ";"
    fn declaration(&mut self) -> Result<()> {
        let specifier = self.specifier()?;
        self.declarator(specifier)?;

        while self.cursor.bump_if(&Token::Comma) {
            self.declarator(specifier)?;
        }

        self.cursor.expect(&Token::Semicolon)
    }

    fn declarations(&mut self) -> Result<()> {
        while self.cursor.peek().map_or(false, Token::is_specifier) {
            self.declaration()?;
        }
        Ok(())
    }

    /*
     * Expressions, one level per precedence tier since each tier has its
     * own checker entry point.
     */

    fn primary_expression(&mut self) -> Result<ExprId> {
        let line = self.cursor.get_line();
        let next = self.cursor.next_or_error()?;

        match next {
            Token::LeftParen => {
                let expr = self.expression()?;
                self.cursor.expect(&Token::RightParen)?;
                Ok(expr)
            }
            Token::StringLiteral(text) => {
                let bytes = unescape(text);
                let length = bytes.len() as u64 + 1;
                Ok(self.checker.ast.add_expr(
                    ExprKind::String(bytes),
                    Type::array(Specifier::Char, 0, length),
                ))
            }
            Token::CharacterLiteral(text) => {
                let value = unescape(text).first().copied().unwrap_or(0);
                Ok(self
                    .checker
                    .ast
                    .add_expr(ExprKind::Number(i64::from(value)), Type::INT))
            }
            Token::Number(value) => Ok(self
                .checker
                .ast
                .add_expr(ExprKind::Number(*value), Type::INT)),
            Token::Identifier(name) => {
                let symbol = self.checker.check_identifier(name);

                if self.cursor.bump_if(&Token::LeftParen) {
                    let mut args = Vec::new();

                    if self.cursor.peek() != Some(&Token::RightParen) {
                        args.push(self.expression()?);
                        while self.cursor.bump_if(&Token::Comma) {
                            args.push(self.expression()?);
                        }
                    }

                    let expr = self.checker.check_call(symbol, args);
                    self.cursor.expect(&Token::RightParen)?;
                    Ok(expr)
                } else {
                    let ty = self.checker.table[symbol].ty.clone();
                    Ok(self.checker.ast.add_expr(ExprKind::Identifier(symbol), ty))
                }
            }
            t => Err(InnerParseError::BadFactor(t.clone()).set_line(line)),
        }
    }

    fn postfix_expression(&mut self) -> Result<ExprId> {
        let mut left = self.primary_expression()?;

        while self.cursor.bump_if(&Token::LeftBracket) {
            let right = self.expression()?;
            left = self.checker.check_array(left, right);
            self.cursor.expect(&Token::RightBracket)?;
        }

        Ok(left)
    }

    /// The `sizeof (type) * n` ambiguity is resolved by always consuming a
    /// parenthesized type as part of the sizeof expression.
    fn prefix_expression(&mut self) -> Result<ExprId> {
        match self.cursor.peek() {
            Some(Token::Not) => {
                self.cursor.bump();
                let expr = self.prefix_expression()?;
                Ok(self.checker.check_not(expr))
            }
            Some(Token::Minus) => {
                self.cursor.bump();
                let expr = self.prefix_expression()?;
                Ok(self.checker.check_negate(expr))
            }
            Some(Token::Star) => {
                self.cursor.bump();
                let expr = self.prefix_expression()?;
                Ok(self.checker.check_dereference(expr))
            }
            Some(Token::Ampersand) => {
                self.cursor.bump();
                let expr = self.prefix_expression()?;
                Ok(self.checker.check_address(expr))
            }
            Some(Token::Sizeof) => {
                self.cursor.bump();

                if self.cursor.peek() == Some(&Token::LeftParen)
                    && self.cursor.peek_2nd().map_or(false, Token::is_specifier)
                {
                    self.cursor.bump();
                    let specifier = self.specifier()?;
                    let indirection = self.pointers();
                    self.cursor.expect(&Token::RightParen)?;
                    let size = Type::scalar(specifier, indirection).size();
                    Ok(self
                        .checker
                        .ast
                        .add_expr(ExprKind::Number(size as i64), Type::LONG))
                } else {
                    let expr = self.prefix_expression()?;
                    Ok(self.checker.check_sizeof(expr))
                }
            }
            Some(Token::LeftParen)
                if self.cursor.peek_2nd().map_or(false, Token::is_specifier) =>
            {
                self.cursor.bump();
                let specifier = self.specifier()?;
                let indirection = self.pointers();
                self.cursor.expect(&Token::RightParen)?;
                let expr = self.prefix_expression()?;
                Ok(self
                    .checker
                    .check_cast(&Type::scalar(specifier, indirection), expr))
            }
            _ => self.postfix_expression(),
        }
    }

    fn multiplicative_expression(&mut self) -> Result<ExprId> {
        let mut left = self.prefix_expression()?;

        loop {
            if self.cursor.bump_if(&Token::Star) {
                let right = self.prefix_expression()?;
                left = self.checker.check_multiply(left, right);
            } else if self.cursor.bump_if(&Token::Slash) {
                let right = self.prefix_expression()?;
                left = self.checker.check_divide(left, right);
            } else if self.cursor.bump_if(&Token::Percent) {
                let right = self.prefix_expression()?;
                left = self.checker.check_remainder(left, right);
            } else {
                break;
            }
        }

        Ok(left)
    }

    fn additive_expression(&mut self) -> Result<ExprId> {
        let mut left = self.multiplicative_expression()?;

        loop {
            if self.cursor.bump_if(&Token::Plus) {
                let right = self.multiplicative_expression()?;
                left = self.checker.check_add(left, right);
            } else if self.cursor.bump_if(&Token::Minus) {
                let right = self.multiplicative_expression()?;
                left = self.checker.check_subtract(left, right);
            } else {
                break;
            }
        }

        Ok(left)
    }

    fn relational_expression(&mut self) -> Result<ExprId> {
        let mut left = self.additive_expression()?;

        loop {
            if self.cursor.bump_if(&Token::Less) {
                let right = self.additive_expression()?;
                left = self.checker.check_less_than(left, right);
            } else if self.cursor.bump_if(&Token::Greater) {
                let right = self.additive_expression()?;
                left = self.checker.check_greater_than(left, right);
            } else if self.cursor.bump_if(&Token::LessEqual) {
                let right = self.additive_expression()?;
                left = self.checker.check_less_or_equal(left, right);
            } else if self.cursor.bump_if(&Token::GreaterEqual) {
                let right = self.additive_expression()?;
                left = self.checker.check_greater_or_equal(left, right);
            } else {
                break;
            }
        }

        Ok(left)
    }

    fn equality_expression(&mut self) -> Result<ExprId> {
        let mut left = self.relational_expression()?;

        loop {
            if self.cursor.bump_if(&Token::Equal) {
                let right = self.relational_expression()?;
                left = self.checker.check_equal(left, right);
            } else if self.cursor.bump_if(&Token::NotEqual) {
                let right = self.relational_expression()?;
                left = self.checker.check_not_equal(left, right);
            } else {
                break;
            }
        }

        Ok(left)
    }

    fn logical_and_expression(&mut self) -> Result<ExprId> {
        let mut left = self.equality_expression()?;

        while self.cursor.bump_if(&Token::And) {
            let right = self.equality_expression()?;
            left = self.checker.check_logical_and(left, right);
        }

        Ok(left)
    }

    /// expression: the top tier is logical-or, since Simple C has neither
    /// comma nor assignment expressions.
    fn expression(&mut self) -> Result<ExprId> {
        let mut left = self.logical_and_expression()?;

        while self.cursor.bump_if(&Token::Or) {
            let right = self.logical_and_expression()?;
            left = self.checker.check_logical_or(left, right);
        }

        Ok(left)
    }

    /*
     * Statements.
     */

    fn statements(&mut self) -> Result<Vec<StmtId>> {
        let mut stmts = Vec::new();

        while self.cursor.peek() != Some(&Token::RightBrace) {
            stmts.push(self.statement()?);
        }

        Ok(stmts)
    }

    /// assignment: expression [ "=" expression ]. Assignment is a
    /// statement form, not an expression operator.
    fn assignment(&mut self) -> Result<StmtId> {
        let expr = self.expression()?;

        if self.cursor.bump_if(&Token::Assign) {
            let right = self.expression()?;
            return Ok(self.checker.check_assignment(expr, right));
        }

        Ok(self.checker.ast.add_stmt(Stmt::Simple(expr)))
    }

    fn statement(&mut self) -> Result<StmtId> {
        match self.cursor.peek() {
            Some(Token::LeftBrace) => {
                self.cursor.bump();
                self.checker.table.open_scope();
                self.declarations()?;
                let stmts = self.statements()?;
                let scope = self.checker.table.close_scope();
                self.cursor.expect(&Token::RightBrace)?;
                Ok(self.checker.ast.add_stmt(Stmt::Block { scope, stmts }))
            }
            Some(Token::Break) => {
                self.cursor.bump();
                let stmt = self.checker.check_break(self.loop_depth);
                self.cursor.expect(&Token::Semicolon)?;
                Ok(stmt)
            }
            Some(Token::Return) => {
                self.cursor.bump();
                let expr = self.expression()?;
                let return_type = self.return_type.clone();
                let stmt = self.checker.check_return(expr, &return_type);
                self.cursor.expect(&Token::Semicolon)?;
                Ok(stmt)
            }
            Some(Token::While) => {
                self.cursor.bump();
                self.cursor.expect(&Token::LeftParen)?;
                let test = self.expression()?;
                let test = self.checker.check_test(test);
                self.cursor.expect(&Token::RightParen)?;

                self.loop_depth += 1;
                let body = self.statement()?;
                self.loop_depth -= 1;

                Ok(self.checker.ast.add_stmt(Stmt::While { test, body }))
            }
            Some(Token::For) => {
                self.cursor.bump();
                self.cursor.expect(&Token::LeftParen)?;
                let init = self.assignment()?;
                self.cursor.expect(&Token::Semicolon)?;
                let test = self.expression()?;
                let test = self.checker.check_test(test);
                self.cursor.expect(&Token::Semicolon)?;
                let incr = self.assignment()?;
                self.cursor.expect(&Token::RightParen)?;

                self.loop_depth += 1;
                let body = self.statement()?;
                self.loop_depth -= 1;

                Ok(self.checker.ast.add_stmt(Stmt::For {
                    init,
                    test,
                    incr,
                    body,
                }))
            }
            Some(Token::If) => {
                self.cursor.bump();
                self.cursor.expect(&Token::LeftParen)?;
                let test = self.expression()?;
                let test = self.checker.check_test(test);
                self.cursor.expect(&Token::RightParen)?;

                let then = self.statement()?;
                let otherwise = if self.cursor.bump_if(&Token::Else) {
                    Some(self.statement()?)
                } else {
                    None
                };

                Ok(self.checker.ast.add_stmt(Stmt::If {
                    test,
                    then,
                    otherwise,
                }))
            }
            _ => {
                let stmt = self.assignment()?;
                self.cursor.expect(&Token::Semicolon)?;
                Ok(stmt)
            }
        }
    }

    /*
     * Functions and globals.
     */

    /// parameter: specifier pointers identifier. Parameters are always
    /// scalar.
    fn parameter(&mut self) -> Result<Type> {
        let specifier = self.specifier()?;
        let indirection = self.pointers();
        let name = self.identifier()?;

        let ty = Type::scalar(specifier, indirection);
        self.checker.declare_variable(&name, ty.clone());
        Ok(ty)
    }

    /// parameters: "void" | parameter-list [ "," "..." ]
    fn parameters(&mut self) -> Result<Parameters> {
        let mut params = Parameters {
            variadic: false,
            types: Vec::new(),
        };

        if self.cursor.bump_if(&Token::Void) {
            return Ok(params);
        }

        params.types.push(self.parameter()?);

        while self.cursor.bump_if(&Token::Comma) {
            if self.cursor.bump_if(&Token::Ellipsis) {
                params.variadic = true;
                break;
            }
            params.types.push(self.parameter()?);
        }

        Ok(params)
    }

    fn global_declarator(&mut self, specifier: Specifier) -> Result<()> {
        let indirection = self.pointers();
        let name = self.identifier()?;

        if self.cursor.bump_if(&Token::LeftParen) {
            self.checker.table.open_scope();
            let params = self.parameters()?;
            self.checker
                .declare_function(&name, Type::function(specifier, indirection, params));
            self.checker.table.close_scope();
            self.cursor.expect(&Token::RightParen)?;
        } else if self.cursor.bump_if(&Token::LeftBracket) {
            let length = self.number()?;
            self.checker
                .declare_variable(&name, Type::array(specifier, indirection, length as u64));
            self.cursor.expect(&Token::RightBracket)?;
        } else {
            self.checker
                .declare_variable(&name, Type::scalar(specifier, indirection));
        }

        Ok(())
    }

    /// A definition's parameter scope stays open and becomes the body's
    /// block scope, so parameters precede locals in declaration order.
    fn function_or_global(&mut self) -> Result<()> {
        let specifier = self.specifier()?;
        let indirection = self.pointers();
        let name = self.identifier()?;

        if self.cursor.bump_if(&Token::LeftParen) {
            self.checker.table.open_scope();
            let params = self.parameters()?;
            self.cursor.expect(&Token::RightParen)?;

            if self.cursor.bump_if(&Token::LeftBrace) {
                self.return_type = Type::scalar(specifier, indirection);
                let symbol = self
                    .checker
                    .define_function(&name, Type::function(specifier, indirection, params));

                self.declarations()?;
                let stmts = self.statements()?;
                let scope = self.checker.table.close_scope();
                let body = self.checker.ast.add_stmt(Stmt::Block { scope, stmts });
                let function = Function { id: symbol, body };
                self.cursor.expect(&Token::RightBrace)?;

                if self.checker.reporter.error_count() == 0 {
                    self.gen.generate_function(
                        &mut self.checker.ast,
                        &mut self.checker.table,
                        &function,
                    )?;
                }

                return Ok(());
            }

            self.checker
                .declare_function(&name, Type::function(specifier, indirection, params));
            self.checker.table.close_scope();
        } else if self.cursor.bump_if(&Token::LeftBracket) {
            let length = self.number()?;
            self.checker
                .declare_variable(&name, Type::array(specifier, indirection, length as u64));
            self.cursor.expect(&Token::RightBracket)?;
        } else {
            self.checker
                .declare_variable(&name, Type::scalar(specifier, indirection));
        }

        while self.cursor.bump_if(&Token::Comma) {
            self.global_declarator(specifier)?;
        }

        self.cursor.expect(&Token::Semicolon)
    }
}

/// Process C escape sequences in a string or character literal into the
/// byte sequence it denotes.
fn unescape(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        match chars.next() {
            None => bytes.push(b'\\'),
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('r') => bytes.push(b'\r'),
            Some('a') => bytes.push(0x07),
            Some('b') => bytes.push(0x08),
            Some('f') => bytes.push(0x0c),
            Some('v') => bytes.push(0x0b),
            Some(c @ '0'..='7') => {
                let mut value = c.to_digit(8).expect("is an octal digit");
                for _ in 0..2 {
                    let Some(digit) = chars.peek().and_then(|c| c.to_digit(8)) else {
                        break;
                    };
                    value = value * 8 + digit;
                    chars.next();
                }
                bytes.push(value as u8);
            }
            // \\, \' and \" stand for themselves, as does anything else.
            Some(c) => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }

    bytes
}
