use crate::lexer;
use crate::parser;

fn compile(source: &str) -> String {
    let tokens = lexer::lex(source).expect("should lex");
    let mut asm = Vec::new();
    let mut diagnostics = Vec::new();
    parser::parse(&tokens, &mut asm, &mut diagnostics).expect("should parse");
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics: {}",
        String::from_utf8_lossy(&diagnostics)
    );
    String::from_utf8(asm).expect("assembly is ASCII")
}

#[test]
fn test_empty_function() {
    let asm = compile("long main(void) { return 0; }");

    assert!(asm.contains("main:\n"));
    assert!(asm.contains("\tpushq\t%rbp\n"));
    assert!(asm.contains("\tmovq\t%rsp, %rbp\n"));
    assert!(asm.contains("\tmovl\t$main.size, %eax\n"));
    assert!(asm.contains("\tsubq\t%rax, %rsp\n"));
    // The zero literal was widened to the long return type.
    assert!(asm.contains("\tmovq\t$0, %rax\n"));
    assert!(asm.contains("\tjmp\tmain.exit\n"));
    assert!(asm.contains("main.exit:\n"));
    assert!(asm.contains("\tret\n"));
    assert!(asm.contains("\t.set\tmain.size, 0\n"));
    assert!(asm.contains("\t.globl\tmain\n"));
}

#[test]
fn test_global_array_indexing() {
    let asm = compile("int a[10];\nint main(void) { return a[3]; }");

    assert!(asm.contains("\t.comm\ta, 40\n"));
    // Address of the array, constant-scaled index, sized load.
    assert!(asm.contains("\tleaq\ta, %rax\n"));
    assert!(asm.contains("\taddq\t$12, %rax\n"));
    assert!(asm.contains("\tmovl\t(%rax), %eax\n"));
}

#[test]
fn test_parameter_offsets() {
    let asm = compile(
        "int f(int x, int y, int z, int w, int u, int v, int k) { return k; }\n\
         int main(void) { return f(1, 2, 3, 4, 5, 6, 7); }",
    );

    // The first six parameters spill to descending negative slots.
    assert!(asm.contains("\tmovl\t%edi, -4(%rbp)\n"));
    assert!(asm.contains("\tmovl\t%esi, -8(%rbp)\n"));
    assert!(asm.contains("\tmovl\t%edx, -12(%rbp)\n"));
    assert!(asm.contains("\tmovl\t%ecx, -16(%rbp)\n"));
    assert!(asm.contains("\tmovl\t%r8d, -20(%rbp)\n"));
    assert!(asm.contains("\tmovl\t%r9d, -24(%rbp)\n"));
    // The seventh lives above the saved registers.
    assert!(asm.contains("\tmovl\t16(%rbp), %eax\n"));
    assert!(asm.contains("\t.set\tf.size, 32\n"));
}

#[test]
fn test_store_through_pointer() {
    let asm = compile("int main(void) { long *p; long x; *p = x; return 0; }");

    assert!(asm.contains("\tmovq\t-8(%rbp), %rax\n"));
    assert!(asm.contains("\tmovq\t-16(%rbp), %rdi\n"));
    assert!(asm.contains("\tmovq\t%rdi, (%rax)\n"));
}

#[test]
fn test_call_with_stack_arguments() {
    let asm = compile(
        "long g(long a, long b, long c, long d, long e, long f, long h) { return h; }\n\
         long main(void) { return g(1, 2, 3, 4, 5, 6, 7); }",
    );

    // One stack argument: eight bytes of padding keep the call aligned,
    // and the full sixteen are reclaimed afterwards.
    assert!(asm.contains("\tsubq\t$8, %rsp\n"));
    assert!(asm.contains("\tmovq\t$7, %rax\n"));
    assert!(asm.contains("\tpushq\t%rax\n"));
    assert!(asm.contains("\tmovq\t$1, %rdi\n"));
    assert!(asm.contains("\tmovq\t$6, %r9\n"));
    assert!(asm.contains("\tcall\tg\n"));
    assert!(asm.contains("\taddq\t$16, %rsp\n"));
}

#[test]
fn test_sibling_blocks_share_storage() {
    let asm = compile(
        "int f(void) { int a; { int b; b = 1; } { int c; c = 2; } a = 3; return a; }\n\
         int main(void) { return f(); }",
    );

    // b and c occupy the same slot; a sits above both.
    assert!(asm.contains("\tmovl\t$1, %eax\n\tmovl\t%eax, -8(%rbp)\n"));
    assert!(asm.contains("\tmovl\t$2, %eax\n\tmovl\t%eax, -8(%rbp)\n"));
    assert!(asm.contains("\tmovl\t$3, %eax\n\tmovl\t%eax, -4(%rbp)\n"));
    assert!(asm.contains("\t.set\tf.size, 16\n"));
}

#[test]
fn test_frame_size_is_stack_aligned() {
    let asm = compile("int main(void) { int a; int b; int c; a = 1; b = 2; c = 3; return a; }");

    // Twelve bytes of locals round up to sixteen.
    assert!(asm.contains("\t.set\tmain.size, 16\n"));
}

#[test]
fn test_spill_on_eviction() {
    let asm = compile("int main(void) { int a; int b; a = 2; b = 3; return a / b + a / b; }");

    // The second division forces the first quotient out of its register
    // into a fresh slot below the locals, and it is reloaded for the add.
    assert!(asm.contains("\tmovl\t%eax, -12(%rbp)\n"));
    assert!(asm.contains("\tmovl\t-12(%rbp), %edi\n"));
    assert!(asm.contains("\t.set\tmain.size, 16\n"));
}

#[test]
fn test_division_register_protocol() {
    let asm = compile("int main(void) { int a; int b; a = 7; b = 2; return a % b; }");

    assert!(asm.contains("\tmovl\t-4(%rbp), %eax\n"));
    assert!(asm.contains("\tmovl\t-8(%rbp), %ecx\n"));
    assert!(asm.contains("\tcltd\n"));
    assert!(asm.contains("\tidivl\t%ecx\n"));
    // The remainder comes back in %edx.
    assert!(asm.contains("\tmovl\t%edx, %eax\n"));
}

#[test]
fn test_long_division_sign_extends_with_cqto() {
    let asm = compile("long main(void) { long a; long b; a = 7; b = 2; return a / b; }");

    assert!(asm.contains("\tcqto\n"));
    assert!(asm.contains("\tidivq\t%rcx\n"));
}

#[test]
fn test_comparison_materializes_condition() {
    let asm = compile("int main(void) { int a; a = 1; return a < 2; }");

    assert!(asm.contains("\tcmpl\t$2, %eax\n"));
    assert!(asm.contains("\tsetl\t%al\n"));
    assert!(asm.contains("\tmovzbl\t%al, %eax\n"));
}

#[test]
fn test_signed_multiply() {
    let asm = compile("int main(void) { return 2 + 3 * 4; }");

    assert!(asm.contains("\timull\t$4, %eax\n"));
    assert!(asm.contains("\taddl\t%eax, %edi\n"));
    // Multiplication binds tighter than addition.
    let mul = asm.find("imull").expect("multiply emitted");
    let add = asm.find("addl").expect("add emitted");
    assert!(mul < add);
}

#[test]
fn test_while_loop_shape() {
    let asm = compile("int main(void) { int n; n = 3; while (n > 0) { n = n - 1; } return n; }");

    assert!(asm.contains(".L0:\n"));
    assert!(asm.contains("\tsetg\t%al\n"));
    assert!(asm.contains("\tcmpl\t$0, %eax\n"));
    assert!(asm.contains("\tje\t.L1\n"));
    assert!(asm.contains("\tjmp\t.L0\n"));
    assert!(asm.contains(".L1:\n"));
}

#[test]
fn test_break_jumps_to_loop_exit() {
    let asm = compile("int main(void) { while (1) { break; } return 0; }");

    // The loop exit label is the break target.
    assert!(asm.contains("\tje\t.L1\n"));
    assert!(asm.contains("\tjmp\t.L1\n"));
}

#[test]
fn test_for_loop_unrolls_into_test_body_increment() {
    let asm = compile(
        "int main(void) { int i; int n; n = 0; for (i = 0; i < 4; i = i + 1) n = n + i; return n; }",
    );

    // init precedes the loop label; the increment feeds the back edge.
    let init = asm.find("movl\t%eax, -4(%rbp)").expect("init emitted");
    let label = asm.find(".L0:").expect("loop label emitted");
    assert!(init < label);
    assert!(asm.contains("\tje\t.L1\n"));
    assert!(asm.contains("\tjmp\t.L0\n"));
    assert!(asm.contains("\taddl\t$1, %eax\n"));
}

#[test]
fn test_if_else_branches() {
    let asm = compile("int main(void) { int x; x = 1; if (x) return 1; else return 2; return 0; }");

    assert!(asm.contains("\tje\t.L0\n"));
    assert!(asm.contains("\tmovl\t$1, %eax\n\tjmp\tmain.exit\n"));
    assert!(asm.contains("\tjmp\t.L1\n"));
    assert!(asm.contains(".L0:\n"));
    assert!(asm.contains("\tmovl\t$2, %eax\n\tjmp\tmain.exit\n"));
}

#[test]
fn test_logical_and_short_circuits() {
    let asm = compile("int main(void) { int a; int b; a = 1; b = 0; return a && b; }");

    // Both operands branch to the zero arm; fallthrough produces one.
    assert!(asm.contains("\tje\t.L0\n"));
    assert!(asm.contains("\tmovl\t$1, %eax\n\tjmp\t.L1\n"));
    assert!(asm.contains(".L0:\n\tmovl\t$0, %eax\n"));
    assert!(asm.contains(".L1:\n"));
}

#[test]
fn test_logical_or_short_circuits() {
    let asm = compile("int main(void) { int a; a = 1; return a || a; }");

    assert!(asm.contains("\tjne\t.L0\n"));
    assert!(asm.contains("\tmovl\t$0, %eax\n\tjmp\t.L1\n"));
    assert!(asm.contains(".L0:\n\tmovl\t$1, %eax\n"));
}

#[test]
fn test_not_and_negate() {
    let asm = compile("int main(void) { int a; a = 5; return !a + -a; }");

    assert!(asm.contains("\tsete\t%al\n"));
    assert!(asm.contains("\tmovzbl\t%al, %eax\n"));
    assert!(asm.contains("\tnegl\t"));
}

#[test]
fn test_address_of_dereference_is_identity() {
    let asm = compile("int main(void) { int *p; int *q; q = &*p; return 0; }");

    // No leaq: the address of a dereference is just the pointer value.
    assert!(!asm.contains("leaq"));
    assert!(asm.contains("\tmovq\t-8(%rbp), %rax\n"));
    assert!(asm.contains("\tmovq\t%rax, -16(%rbp)\n"));
}

#[test]
fn test_address_of_local() {
    let asm = compile("int main(void) { int x; int *p; p = &x; x = 0; return *p; }");

    assert!(asm.contains("\tleaq\t-4(%rbp), %rax\n"));
    assert!(asm.contains("\tmovq\t%rax, -12(%rbp)\n"));
}

#[test]
fn test_char_narrowing_and_widening() {
    let asm = compile("int main(void) { char c; long l; c = 'A'; l = c; return 0; }");

    // The literal is stored through the byte register, and the char is
    // sign-extended on the way back up to long.
    assert!(asm.contains("\tmovl\t$65, %eax\n"));
    assert!(asm.contains("\tmovb\t%al, -1(%rbp)\n"));
    assert!(asm.contains("\tmovb\t-1(%rbp), %al\n"));
    assert!(asm.contains("\tmovsbq\t%al, %rax\n"));
    assert!(asm.contains("\tmovq\t%rax, -9(%rbp)\n"));
}

#[test]
fn test_int_to_long_widening() {
    let asm = compile("int main(void) { int i; long l; i = 3; l = i; return 0; }");

    assert!(asm.contains("\tmovslq\t%eax, %rax\n"));
}

#[test]
fn test_byte_argument_sign_extension() {
    let asm = compile(
        "int f(char c) { return c; }\n\
         int main(void) { char c; c = 'x'; return f(c); }",
    );

    // The byte argument travels through %dil and is widened in place.
    assert!(asm.contains("\tmovb\t-1(%rbp), %dil\n"));
    assert!(asm.contains("\tmovsbl\t%dil, %edi\n"));
}

#[test]
fn test_string_literals_deduplicated() {
    let asm = compile(
        "int puts(char *s);\n\
         int main(void) { puts(\"hi\"); puts(\"hi\"); puts(\"there\"); return 0; }",
    );

    assert!(asm.contains("\tleaq\t.L0(%rip), %rax\n"));
    assert!(asm.contains("\t.section\t.rodata\n"));
    assert!(asm.contains(".L0:\n\t.string\t\"hi\"\n"));
    assert!(asm.contains("\t.string\t\"there\"\n"));
    // Two distinct literals, three uses.
    assert_eq!(2, asm.matches("\t.string\t").count());
}

#[test]
fn test_string_escapes_in_rodata() {
    let asm = compile(
        "int puts(char *s);\n\
         int main(void) { puts(\"a\\tb\\n\"); return 0; }",
    );

    assert!(asm.contains("\t.string\t\"a\\tb\\n\"\n"));
}

#[test]
fn test_variadic_call_clears_eax() {
    let asm = compile(
        "int printf(char *f, ...);\n\
         int main(void) { printf(\"%d\", 42); return 0; }",
    );

    assert!(asm.contains("\tmovl\t$42, %esi\n"));
    let clear = asm.find("movl\t$0, %eax").expect("eax cleared");
    let call = asm.find("call\tprintf").expect("call emitted");
    assert!(clear < call);
}

#[test]
fn test_globals_emitted_after_functions() {
    let asm = compile("long x;\nchar buf[100];\nint main(void) { return 0; }");

    assert!(asm.contains("\t.comm\tx, 8\n"));
    assert!(asm.contains("\t.comm\tbuf, 100\n"));
    let main = asm.find("main:").expect("function emitted");
    let comm = asm.find(".comm").expect("globals emitted");
    assert!(main < comm);
}

#[test]
fn test_pointer_difference_divides_by_element_size() {
    let asm = compile("long main(void) { long a[4]; return &a[3] - &a[0]; }");

    assert!(asm.contains("\tidivq\t%rcx\n"));
    assert!(asm.contains("\tmovq\t$8, %rcx\n"));
}
