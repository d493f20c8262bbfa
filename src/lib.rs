/*!
A single-pass compiler for Simple C, a small C-like language with three
integer types, pointers, single-dimension arrays and basic control flow,
targeting x86-64 System V assembly in AT&T syntax.

The pipeline reads a translation unit from standard input and writes
assembly text to standard output:

1. **Lexing** - [lex](lexer::lex) turns the source into a vector of
   line-tagged tokens, failing on the first malformed one.
2. **Parsing and checking** - [parse](parser::parse) recognizes the grammar
   and drives the [checker] as it goes: every declaration and expression
   passes through a `declare_*`/`check_*` entry point which performs the
   usual conversions (decay, promotion, sign extension, pointer scaling) by
   rewriting the tree, so implicit conversions are explicit nodes by the
   time code is generated. Semantic errors go to the diagnostics sink and
   suppress code generation without stopping the parse; syntax errors are
   fatal.
3. **Allocation and generation** - at the end of each error-free function
   body the [codegen] module assigns frame offsets to parameters and locals
   ([codegen::stack]) and walks the tree emitting assembly, allocating
   registers through a bidirectional node/register binding that spills on
   eviction. Global variables and the string table are emitted once the
   whole unit has been read.
*/

#![warn(clippy::pedantic)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod ast;
pub mod checker;
pub mod codegen;
pub mod diagnostics;
pub mod lexer;
pub mod machine;
pub mod parser;
pub mod types;
