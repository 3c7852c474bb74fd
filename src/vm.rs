//! The code sink: serializes the ordered instruction stream the compiler
//! decides on. Append-only; nothing is ever read back.

use std::fmt;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Segment {
    Constant,
    Static,
    Local,
    Argument,
    This,
    That,
    Pointer,
    Temp,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Segment::Constant => "constant",
            Segment::Static => "static",
            Segment::Local => "local",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ArithmeticCommand {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    ShiftLeft,
    ShiftRight,
}

impl fmt::Display for ArithmeticCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArithmeticCommand::Add => "add",
            ArithmeticCommand::Sub => "sub",
            ArithmeticCommand::Neg => "neg",
            ArithmeticCommand::Eq => "eq",
            ArithmeticCommand::Gt => "gt",
            ArithmeticCommand::Lt => "lt",
            ArithmeticCommand::And => "and",
            ArithmeticCommand::Or => "or",
            ArithmeticCommand::Not => "not",
            ArithmeticCommand::ShiftLeft => "shiftleft",
            ArithmeticCommand::ShiftRight => "shiftright",
        })
    }
}

pub struct VmWriter<W: Write> {
    out: W,
}

impl<W: Write> VmWriter<W> {
    pub fn new(out: W) -> Self {
        VmWriter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn push(&mut self, segment: Segment, index: u16) -> io::Result<()> {
        writeln!(self.out, "push {} {}", segment, index)
    }

    pub fn pop(&mut self, segment: Segment, index: u16) -> io::Result<()> {
        writeln!(self.out, "pop {} {}", segment, index)
    }

    pub fn arithmetic(&mut self, command: ArithmeticCommand) -> io::Result<()> {
        writeln!(self.out, "{}", command)
    }

    pub fn label(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.out, "label {}", label)
    }

    pub fn goto(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.out, "goto {}", label)
    }

    pub fn if_goto(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.out, "if-goto {}", label)
    }

    pub fn call(&mut self, class: &str, subroutine: &str, n_args: u16) -> io::Result<()> {
        writeln!(self.out, "call {}.{} {}", class, subroutine, n_args)
    }

    pub fn function(&mut self, class: &str, subroutine: &str, n_locals: u16) -> io::Result<()> {
        writeln!(self.out, "function {}.{} {}", class, subroutine, n_locals)
    }

    pub fn ret(&mut self) -> io::Result<()> {
        writeln!(self.out, "return")
    }
}

#[test]
fn test_instruction_text() {
    let mut vm = VmWriter::new(Vec::new());
    vm.push(Segment::Constant, 7).unwrap();
    vm.pop(Segment::That, 0).unwrap();
    vm.arithmetic(ArithmeticCommand::Add).unwrap();
    vm.label("WHILE_EXP_0").unwrap();
    vm.if_goto("WHILE_END_0").unwrap();
    vm.goto("WHILE_EXP_0").unwrap();
    vm.call("Math", "multiply", 2).unwrap();
    vm.function("Main", "main", 3).unwrap();
    vm.ret().unwrap();

    let text = String::from_utf8(vm.into_inner()).unwrap();
    assert_eq!(
        text,
        "push constant 7\n\
         pop that 0\n\
         add\n\
         label WHILE_EXP_0\n\
         if-goto WHILE_END_0\n\
         goto WHILE_EXP_0\n\
         call Math.multiply 2\n\
         function Main.main 3\n\
         return\n"
    );
}
