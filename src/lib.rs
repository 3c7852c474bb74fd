use std::io::{Read, Write};
use thiserror::Error;

pub mod codegen;
pub mod parser;
pub mod symbols;
pub mod tokenizer;
pub mod vm;

use codegen::{CompileContext, Context};
use parser::{Class, Parse};
use tokenizer::Tokenizer;
use vm::VmWriter;

/// Any failure is fatal for the translation unit being compiled; the
/// driver decides whether to skip the file or abort the whole run.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("line {line}: unexpected character {found:?}")]
    UnexpectedChar { line: usize, found: char },
    #[error("line {line}: unterminated string constant")]
    UnterminatedString { line: usize },
    #[error("line {line}: unterminated block comment")]
    UnterminatedComment { line: usize },
    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },
    #[error("line {line}: integer constant {literal} is out of range (0-32767)")]
    IntegerOutOfRange { line: usize, literal: String },
    #[error("`{name}` is already defined in this scope")]
    DuplicateDefinition { name: String },
    #[error("unresolved identifier `{name}`")]
    UnresolvedIdentifier { name: String },
    #[error("unsupported construct: {reason}")]
    UnsupportedConstruct { reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl CompileError {
    pub(crate) fn unexpected(
        line: usize,
        expected: impl Into<String>,
        found: impl std::fmt::Display,
    ) -> CompileError {
        CompileError::UnexpectedToken {
            line,
            expected: expected.into(),
            found: found.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Accept the unary `^` (shift left) and `#` (shift right) extension
    /// operators. Off by default; they are then a lexical error.
    pub shift_ops: bool,
}

/// Compiles one translation unit (a single class) into VM instructions.
///
/// Output written to `sink` before a failure is not rolled back; buffer
/// it if atomicity matters.
pub fn compile_class<R: Read, W: Write>(source: R, sink: W) -> Result<(), CompileError> {
    compile_class_with(source, sink, CompileOptions::default())
}

pub fn compile_class_with<R: Read, W: Write>(
    source: R,
    sink: W,
    options: CompileOptions,
) -> Result<(), CompileError> {
    let mut tokens = Tokenizer::with_options(source, options);
    let class = Class::parse(&mut tokens)?;
    let mut vm = VmWriter::new(sink);
    let mut ctx = CompileContext::new();
    class.generate(&mut vm, &mut ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> String {
        let mut out = Vec::new();
        compile_class(source.as_bytes(), &mut out).expect("compilation failed");
        String::from_utf8(out).unwrap()
    }

    fn compile_err(source: &str) -> CompileError {
        let mut out = Vec::new();
        compile_class(source.as_bytes(), &mut out).expect_err("compilation should fail")
    }

    #[test]
    fn constructor_allocates_and_returns_this() {
        let out = compile(
            "class Point {
                field int x, y;
                constructor Point new(int ax, int ay) {
                    let x = ax;
                    let y = ay;
                    return this;
                }
            }",
        );
        assert!(out.starts_with(
            "function Point.new 0\n\
             push constant 2\n\
             call Memory.alloc 1\n\
             pop pointer 0\n"
        ));
        assert!(out.ends_with("push pointer 0\nreturn\n"));
    }

    #[test]
    fn constructor_bare_return_still_yields_pointer() {
        let out = compile(
            "class Single {
                field int value;
                constructor Single new() {
                    let value = 0;
                    return;
                }
            }",
        );
        assert!(out.ends_with("push pointer 0\nreturn\n"));
    }

    #[test]
    fn void_return_pushes_dummy_value() {
        let out = compile(
            "class Main {
                function void main() {
                    return;
                }
            }",
        );
        assert_eq!(out, "function Main.main 0\npush constant 0\nreturn\n");
    }

    #[test]
    fn if_without_else_emits_single_label() {
        let out = compile(
            "class Main {
                function void main() {
                    var int x;
                    if (x) { let x = 1; }
                    return;
                }
            }",
        );
        assert!(out.contains("not\nif-goto IF_FALSE_0\n"));
        assert!(out.contains("label IF_FALSE_0\n"));
        assert!(!out.contains("IF_END"));
    }

    #[test]
    fn sequential_ifs_use_distinct_labels() {
        let out = compile(
            "class Main {
                function void main() {
                    var int x;
                    if (x) { let x = 1; } else { let x = 2; }
                    if (x) { let x = 3; } else { let x = 4; }
                    return;
                }
            }",
        );
        for label in &["IF_FALSE_0", "IF_END_0", "IF_FALSE_1", "IF_END_1"] {
            assert!(out.contains(&format!("label {}\n", label)), "missing {}", label);
        }
    }

    #[test]
    fn while_loop_shape() {
        let out = compile(
            "class Main {
                function void main() {
                    var int x;
                    while (x) { let x = 1; }
                    return;
                }
            }",
        );
        assert!(out.contains(
            "label WHILE_EXP_0\n\
             push local 0\n\
             not\n\
             if-goto WHILE_END_0\n\
             push constant 1\n\
             pop local 0\n\
             goto WHILE_EXP_0\n\
             label WHILE_END_0\n"
        ));
    }

    #[test]
    fn qualified_call_through_variable_pushes_receiver() {
        let out = compile(
            "class Main {
                function void main() {
                    var Foo foo;
                    do foo.bar(1);
                    return;
                }
            }",
        );
        assert!(out.contains(
            "push local 0\n\
             push constant 1\n\
             call Foo.bar 2\n\
             pop temp 0\n"
        ));
    }

    #[test]
    fn qualified_call_through_class_name_has_no_receiver() {
        let out = compile(
            "class Main {
                function void main() {
                    do Foo.bar(1);
                    return;
                }
            }",
        );
        assert!(out.contains("push constant 1\ncall Foo.bar 1\npop temp 0\n"));
    }

    #[test]
    fn method_prologue_and_parameter_indices() {
        let out = compile(
            "class Point {
                field int x;
                method int shifted(int dx) {
                    return x + dx;
                }
            }",
        );
        assert!(out.starts_with(
            "function Point.shifted 0\n\
             push argument 0\n\
             pop pointer 0\n"
        ));
        // `x` is field 0, `dx` sits after the implicit receiver
        assert!(out.contains("push this 0\npush argument 1\nadd\n"));
    }

    #[test]
    fn bare_call_in_method_pushes_this() {
        let out = compile(
            "class Point {
                method void touch() {
                    do refresh(1);
                    return;
                }
            }",
        );
        assert!(out.contains(
            "push pointer 0\n\
             push constant 1\n\
             call Point.refresh 2\n"
        ));
    }

    #[test]
    fn bare_call_in_function_is_rejected() {
        let err = compile_err(
            "class Main {
                function void main() {
                    do helper();
                    return;
                }
            }",
        );
        assert!(matches!(err, CompileError::UnsupportedConstruct { .. }));
    }

    #[test]
    fn array_assignment_sequence() {
        let out = compile(
            "class Main {
                function void main() {
                    var Array a;
                    let a[1] = 2;
                    return;
                }
            }",
        );
        assert!(out.contains(
            "push constant 2\n\
             push local 0\n\
             push constant 1\n\
             add\n\
             pop pointer 1\n\
             pop that 0\n"
        ));
    }

    #[test]
    fn array_read_sequence() {
        let out = compile(
            "class Main {
                function int first(Array a) {
                    return a[0];
                }
            }",
        );
        assert!(out.contains(
            "push argument 0\n\
             push constant 0\n\
             add\n\
             pop pointer 1\n\
             push that 0\n"
        ));
    }

    #[test]
    fn string_constant_builds_string_object() {
        let out = compile(
            "class Main {
                function void main() {
                    do Output.printString(\"Hi\");
                    return;
                }
            }",
        );
        assert!(out.contains(
            "push constant 2\n\
             call String.new 1\n\
             push constant 72\n\
             call String.appendChar 2\n\
             push constant 105\n\
             call String.appendChar 2\n"
        ));
    }

    #[test]
    fn keyword_constants_and_operators() {
        let out = compile(
            "class Main {
                function boolean flags() {
                    return (true & false) | (1 < 2);
                }
            }",
        );
        assert!(out.contains("push constant 0\nnot\n"));
        assert!(out.contains("and\n"));
        assert!(out.contains("push constant 1\npush constant 2\nlt\nor\n"));
    }

    #[test]
    fn multiplication_lowers_to_library_call() {
        let out = compile(
            "class Main {
                function int area(int w, int h) {
                    return w * h;
                }
            }",
        );
        assert!(out.contains("push argument 0\npush argument 1\ncall Math.multiply 2\n"));
    }

    #[test]
    fn integer_literal_range_is_enforced() {
        let err = compile_err(
            "class Main {
                function int big() {
                    return 32768;
                }
            }",
        );
        assert!(matches!(err, CompileError::IntegerOutOfRange { line: 3, .. }));

        let out = compile(
            "class Main {
                function int big() {
                    return 32767;
                }
            }",
        );
        assert!(out.contains("push constant 32767\n"));
    }

    #[test]
    fn duplicate_local_is_rejected() {
        let err = compile_err(
            "class Main {
                function void main() {
                    var int x;
                    var int x;
                    return;
                }
            }",
        );
        match err {
            CompileError::DuplicateDefinition { name } => assert_eq!(name, "x"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn unresolved_identifier_is_rejected() {
        let err = compile_err(
            "class Main {
                function void main() {
                    let y = 1;
                    return;
                }
            }",
        );
        match err {
            CompileError::UnresolvedIdentifier { name } => assert_eq!(name, "y"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn local_shadows_field_of_same_name() {
        let out = compile(
            "class Main {
                field int x;
                method void set() {
                    var int x;
                    let x = 5;
                    return;
                }
            }",
        );
        assert!(out.contains("push constant 5\npop local 0\n"));
    }

    #[test]
    fn syntax_error_reports_line_and_tokens() {
        let err = compile_err(
            "class Main {
                function void main() {
                    let = 1;
                    return;
                }
            }",
        );
        match err {
            CompileError::UnexpectedToken { line, expected, found } => {
                assert_eq!(line, 3);
                assert_eq!(expected, "an identifier");
                assert_eq!(found, "symbol `=`");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn shift_operators_require_opt_in() {
        let source = "class Main {
            function int twice(int x) {
                return ^x;
            }
        }";
        let err = compile_err(source);
        assert!(matches!(err, CompileError::UnexpectedChar { found: '^', .. }));

        let mut out = Vec::new();
        let options = CompileOptions { shift_ops: true };
        compile_class_with(source.as_bytes(), &mut out, options).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("push argument 0\nshiftleft\n"));
    }
}
