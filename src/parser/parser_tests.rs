use super::*;
use crate::lexer;

fn compile(source: &str) -> (String, String) {
    let tokens = lexer::lex(source).expect("should lex");
    let mut asm = Vec::new();
    let mut diagnostics = Vec::new();
    parse(&tokens, &mut asm, &mut diagnostics).expect("should parse");
    (
        String::from_utf8(asm).expect("assembly is ASCII"),
        String::from_utf8(diagnostics).expect("diagnostics are ASCII"),
    )
}

fn compile_err(source: &str) -> ParseError {
    let tokens = lexer::lex(source).expect("should lex");
    let mut asm = Vec::new();
    let mut diagnostics = Vec::new();
    parse(&tokens, &mut asm, &mut diagnostics).expect_err("should fail")
}

#[test]
fn test_clean_program_has_no_diagnostics() {
    let (asm, diagnostics) = compile("int main(void) { return 0; }");
    assert!(diagnostics.is_empty());
    assert!(asm.contains("main:"));
}

#[test]
fn test_undeclared_suppresses_generation() {
    let (asm, diagnostics) = compile("int main(void) { return x; }");
    assert_eq!("'x' undeclared\n", diagnostics);
    assert!(asm.is_empty());
}

#[test]
fn test_break_outside_loop() {
    let (asm, diagnostics) = compile("int main(void) { break; return 0; }");
    assert_eq!("break statement not within loop\n", diagnostics);
    assert!(asm.is_empty());
}

#[test]
fn test_conflicting_global_types() {
    let (asm, diagnostics) = compile("int x;\nlong x;\nint main(void) { return 0; }");
    assert_eq!("conflicting types for 'x'\n", diagnostics);
    assert!(asm.is_empty());
}

#[test]
fn test_redefinition_keeps_first_function() {
    let (asm, diagnostics) =
        compile("int main(void) { return 0; }\nint main(void) { return 1; }");
    assert_eq!("redefinition of 'main'\n", diagnostics);
    // The first definition was emitted before the error appeared.
    assert_eq!(1, asm.matches("main:").count());
    assert!(asm.contains("\tmovl\t$0, %eax\n"));
    assert!(!asm.contains("\tmovl\t$1, %eax\n"));
}

#[test]
fn test_invalid_operands_reported_once() {
    let (asm, diagnostics) = compile("int main(void) { int *p; int *q; return p + q; }");
    assert_eq!("invalid operands to binary +\n", diagnostics);
    assert!(asm.is_empty());
}

#[test]
fn test_lvalue_required() {
    let (_, diagnostics) = compile("int main(void) { 1 = 2; return 0; }");
    assert_eq!("lvalue required in expression\n", diagnostics);
}

#[test]
fn test_scalar_required_in_test() {
    let (_, diagnostics) = compile("int f(void);\nint main(void) { if (f) return 1; return 0; }");
    assert_eq!("scalar type required in statement\n", diagnostics);
}

#[test]
fn test_invalid_return_type() {
    let (_, diagnostics) = compile("int *f(void) { return 1; }");
    assert_eq!("invalid return type\n", diagnostics);
}

#[test]
fn test_called_object_not_a_function() {
    let (_, diagnostics) = compile("int x;\nint main(void) { return x(); }");
    assert_eq!("called object is not a function\n", diagnostics);
}

#[test]
fn test_wrong_argument_count() {
    let (_, diagnostics) = compile("int f(int a);\nint main(void) { return f(); }");
    assert_eq!("invalid arguments to called function\n", diagnostics);
}

#[test]
fn test_redeclared_local() {
    let (_, diagnostics) = compile("int main(void) { int a; int a; return 0; }");
    assert_eq!("redeclaration of 'a'\n", diagnostics);
}

#[test]
fn test_syntax_error_is_fatal() {
    let err = compile_err("int main(void { return 0; }");
    let ParseError::Syntax { ln, .. } = err else {
        panic!("expected a syntax error");
    };
    assert_eq!(1, ln);
}

#[test]
fn test_unexpected_eof() {
    let err = compile_err("int main(void)");
    assert!(matches!(err, ParseError::Syntax { .. }));
}

#[test]
fn test_prototype_then_definition() {
    let (asm, diagnostics) = compile(
        "int f(int a);\n\
         int f(int a) { return a; }\n\
         int main(void) { return f(1); }",
    );
    assert!(diagnostics.is_empty());
    assert_eq!(1, asm.matches("f:").count());
}

#[test]
fn test_prototype_type_mismatch() {
    let (_, diagnostics) = compile("int f(int a);\nlong f(int a) { return 0; }");
    assert_eq!("conflicting types for 'f'\n", diagnostics);
}

#[test]
fn test_declarator_list() {
    let (asm, diagnostics) = compile(
        "long a, *b, c[3];\n\
         int main(void) { b = &a; c[0] = 1; return 0; }",
    );
    assert!(diagnostics.is_empty());
    assert!(asm.contains("\t.comm\ta, 8\n"));
    assert!(asm.contains("\t.comm\tb, 8\n"));
    assert!(asm.contains("\t.comm\tc, 24\n"));
}

#[test]
fn test_sizeof_forms() {
    let (asm, diagnostics) =
        compile("long main(void) { int x; return sizeof x + sizeof(int) + sizeof(long *); }");
    assert!(diagnostics.is_empty());
    // All three are folded to long literals.
    assert!(asm.contains("\tmovq\t$4, %rax\n"));
    assert!(asm.contains("\taddq\t$8, %rax\n"));
}

#[test]
fn test_cast_chain() {
    let (asm, diagnostics) = compile("long main(void) { long l; l = 100; return (long)(int)l; }");
    assert!(diagnostics.is_empty());
    assert!(asm.contains("\tmovslq\t%eax, %rax\n"));
}

#[test]
fn test_variadic_prototype() {
    let (asm, diagnostics) = compile(
        "int printf(char *fmt, ...);\n\
         int main(void) { return printf(\"ok\"); }",
    );
    assert!(diagnostics.is_empty());
    assert!(asm.contains("\tcall\tprintf\n"));
}

#[test]
fn test_character_literal_is_its_code() {
    let (asm, diagnostics) = compile("int main(void) { return 'A'; }");
    assert!(diagnostics.is_empty());
    assert!(asm.contains("\tmovl\t$65, %eax\n"));
}

#[test]
fn test_unescape() {
    assert_eq!(b"a\nb".to_vec(), unescape("a\\nb"));
    assert_eq!(b"\t".to_vec(), unescape("\\t"));
    assert_eq!(vec![65u8], unescape("\\101"));
    assert_eq!(vec![0u8], unescape("\\0"));
    assert_eq!(b"\\".to_vec(), unescape("\\\\"));
    assert_eq!(b"\"".to_vec(), unescape("\\\""));
    assert_eq!(b"'".to_vec(), unescape("\\'"));
    assert_eq!(vec![7u8, 8, 11, 12, 13], unescape("\\a\\b\\v\\f\\r"));
}
