use crate::codegen::{Codegen, CompileContext};
use crate::parser::class::{SubroutineKind, Type};
use crate::parser::Parse;
use crate::tokenizer::{KeywordKind, Token, TokenKind, Tokenizer};
use crate::vm::{ArithmeticCommand, Segment, VmWriter};
use crate::CompileError;
use std::io::{Read, Write};

/// Flat operator chain, evaluated strictly left to right.
#[derive(Debug)]
pub(crate) struct Expression {
    first: Term,
    rest: Vec<(BinaryOp, Term)>,
}

impl Parse for Expression {
    fn parse<T: Read>(tokens: &mut Tokenizer<T>) -> Result<Expression, CompileError> {
        let first = Term::parse(tokens)?;
        let mut rest = vec![];
        loop {
            let token = tokens.advance()?;
            let op = match &token.kind {
                TokenKind::Symbol(b) => BinaryOp::from_symbol(*b),
                _ => None,
            };
            match op {
                Some(op) => rest.push((op, Term::parse(tokens)?)),
                None => {
                    tokens.unread_token(token);
                    return Ok(Expression { first, rest });
                }
            }
        }
    }
}

/// A parenthesized, comma-separated argument list.
impl Parse for Vec<Expression> {
    fn parse<T: Read>(tokens: &mut Tokenizer<T>) -> Result<Vec<Expression>, CompileError> {
        tokens.advance()?.expect_spec_symbol(b'(')?;
        let mut args = vec![];

        let token = tokens.advance()?;
        if token.kind == TokenKind::Symbol(b')') {
            return Ok(args);
        }
        tokens.unread_token(token);

        loop {
            args.push(Expression::parse(tokens)?);
            let (symbol, line) = tokens.advance()?.expect_symbol()?;
            match symbol {
                b')' => return Ok(args),
                b',' => continue,
                other => {
                    return Err(CompileError::unexpected(
                        line,
                        "`,` or `)`",
                        TokenKind::Symbol(other),
                    ))
                }
            }
        }
    }
}

impl Codegen for Expression {
    fn generate(
        &self,
        vm: &mut VmWriter<impl Write>,
        ctx: &CompileContext,
    ) -> Result<(), CompileError> {
        self.first.generate(vm, ctx)?;
        for (op, term) in &self.rest {
            term.generate(vm, ctx)?;
            match op {
                BinaryOp::Add => vm.arithmetic(ArithmeticCommand::Add)?,
                BinaryOp::Sub => vm.arithmetic(ArithmeticCommand::Sub)?,
                BinaryOp::Mul => vm.call("Math", "multiply", 2)?,
                BinaryOp::Div => vm.call("Math", "divide", 2)?,
                BinaryOp::And => vm.arithmetic(ArithmeticCommand::And)?,
                BinaryOp::Or => vm.arithmetic(ArithmeticCommand::Or)?,
                BinaryOp::Lt => vm.arithmetic(ArithmeticCommand::Lt)?,
                BinaryOp::Gt => vm.arithmetic(ArithmeticCommand::Gt)?,
                BinaryOp::Eq => vm.arithmetic(ArithmeticCommand::Eq)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Lt,
    Gt,
    Eq,
}

impl BinaryOp {
    fn from_symbol(b: u8) -> Option<BinaryOp> {
        match b {
            b'+' => Some(BinaryOp::Add),
            b'-' => Some(BinaryOp::Sub),
            b'*' => Some(BinaryOp::Mul),
            b'/' => Some(BinaryOp::Div),
            b'&' => Some(BinaryOp::And),
            b'|' => Some(BinaryOp::Or),
            b'<' => Some(BinaryOp::Lt),
            b'>' => Some(BinaryOp::Gt),
            b'=' => Some(BinaryOp::Eq),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum UnaryOp {
    Neg,
    Not,
    /// `^`, extension; only reachable when the tokenizer accepts it.
    ShiftLeft,
    /// `#`, extension.
    ShiftRight,
}

impl UnaryOp {
    fn from_symbol(b: u8) -> Option<UnaryOp> {
        match b {
            b'-' => Some(UnaryOp::Neg),
            b'~' => Some(UnaryOp::Not),
            b'^' => Some(UnaryOp::ShiftLeft),
            b'#' => Some(UnaryOp::ShiftRight),
            _ => None,
        }
    }

    fn command(self) -> ArithmeticCommand {
        match self {
            UnaryOp::Neg => ArithmeticCommand::Neg,
            UnaryOp::Not => ArithmeticCommand::Not,
            UnaryOp::ShiftLeft => ArithmeticCommand::ShiftLeft,
            UnaryOp::ShiftRight => ArithmeticCommand::ShiftRight,
        }
    }
}

#[derive(Debug)]
enum Term {
    IntConst(u16),
    StrConst(String),
    KeywordConst(KeywordConst),
    Var(String),
    Indexed(String, Box<Expression>),
    Call(SubroutineCall),
    Parenthesized(Box<Expression>),
    Unary(UnaryOp, Box<Term>),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum KeywordConst {
    True,
    False,
    Null,
    This,
}

impl Parse for Term {
    fn parse<T: Read>(tokens: &mut Tokenizer<T>) -> Result<Term, CompileError> {
        let Token { kind, line } = tokens.advance()?;
        match kind {
            TokenKind::IntConst(digits) => match digits.parse::<u16>() {
                Ok(value) if value <= 32767 => Ok(Term::IntConst(value)),
                _ => Err(CompileError::IntegerOutOfRange {
                    line,
                    literal: digits,
                }),
            },
            TokenKind::StrConst(text) => Ok(Term::StrConst(text)),
            TokenKind::Keyword(KeywordKind::True) => Ok(Term::KeywordConst(KeywordConst::True)),
            TokenKind::Keyword(KeywordKind::False) => Ok(Term::KeywordConst(KeywordConst::False)),
            TokenKind::Keyword(KeywordKind::Null) => Ok(Term::KeywordConst(KeywordConst::Null)),
            TokenKind::Keyword(KeywordKind::This) => Ok(Term::KeywordConst(KeywordConst::This)),
            TokenKind::Identifier(name) => {
                // one token of lookahead settles variable vs. array
                // access vs. call
                let next = tokens.advance()?;
                match next.kind {
                    TokenKind::Symbol(b'[') => {
                        let index = Box::new(Expression::parse(tokens)?);
                        tokens.advance()?.expect_spec_symbol(b']')?;
                        Ok(Term::Indexed(name, index))
                    }
                    TokenKind::Symbol(b'(') | TokenKind::Symbol(b'.') => {
                        tokens.unread_token(next);
                        Ok(Term::Call(SubroutineCall::parse_with_receiver(
                            name, tokens,
                        )?))
                    }
                    _ => {
                        tokens.unread_token(next);
                        Ok(Term::Var(name))
                    }
                }
            }
            TokenKind::Symbol(b'(') => {
                let inner = Expression::parse(tokens)?;
                tokens.advance()?.expect_spec_symbol(b')')?;
                Ok(Term::Parenthesized(Box::new(inner)))
            }
            TokenKind::Symbol(b) => match UnaryOp::from_symbol(b) {
                Some(op) => Ok(Term::Unary(op, Box::new(Term::parse(tokens)?))),
                None => Err(CompileError::unexpected(
                    line,
                    "a term",
                    TokenKind::Symbol(b),
                )),
            },
            kind => Err(CompileError::unexpected(line, "a term", kind)),
        }
    }
}

impl Codegen for Term {
    fn generate(
        &self,
        vm: &mut VmWriter<impl Write>,
        ctx: &CompileContext,
    ) -> Result<(), CompileError> {
        match self {
            Term::IntConst(value) => vm.push(Segment::Constant, *value)?,
            Term::StrConst(text) => {
                let bytes = text.as_bytes();
                vm.push(Segment::Constant, bytes.len() as u16)?;
                vm.call("String", "new", 1)?;
                for &byte in bytes {
                    vm.push(Segment::Constant, byte as u16)?;
                    vm.call("String", "appendChar", 2)?;
                }
            }
            Term::KeywordConst(KeywordConst::True) => {
                vm.push(Segment::Constant, 0)?;
                vm.arithmetic(ArithmeticCommand::Not)?;
            }
            Term::KeywordConst(KeywordConst::False) | Term::KeywordConst(KeywordConst::Null) => {
                vm.push(Segment::Constant, 0)?;
            }
            Term::KeywordConst(KeywordConst::This) => vm.push(Segment::Pointer, 0)?,
            Term::Var(name) => {
                let entry = ctx.symbols.resolve(name)?;
                vm.push(entry.kind.segment(), entry.index)?;
            }
            Term::Indexed(name, offset) => {
                let entry = ctx.symbols.resolve(name)?;
                vm.push(entry.kind.segment(), entry.index)?;
                offset.generate(vm, ctx)?;
                vm.arithmetic(ArithmeticCommand::Add)?;
                vm.pop(Segment::Pointer, 1)?;
                vm.push(Segment::That, 0)?;
            }
            Term::Call(call) => call.generate(vm, ctx)?,
            Term::Parenthesized(inner) => inner.generate(vm, ctx)?,
            Term::Unary(op, term) => {
                term.generate(vm, ctx)?;
                vm.arithmetic(op.command())?;
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct SubroutineCall {
    /// `None` for a bare call, dispatched on the current object.
    receiver: Option<String>,
    name: String,
    args: Vec<Expression>,
}

impl SubroutineCall {
    /// The leading identifier is already consumed by the caller; the
    /// next token decides between `name(...)` and `receiver.name(...)`.
    pub(crate) fn parse_with_receiver(
        first: String,
        tokens: &mut Tokenizer<impl Read>,
    ) -> Result<SubroutineCall, CompileError> {
        let token = tokens.advance()?;
        match token.kind {
            TokenKind::Symbol(b'(') => {
                tokens.unread_token(token);
                let args = Vec::<Expression>::parse(tokens)?;
                Ok(SubroutineCall {
                    receiver: None,
                    name: first,
                    args,
                })
            }
            TokenKind::Symbol(b'.') => {
                let name = tokens.advance()?.expect_identifier()?;
                let args = Vec::<Expression>::parse(tokens)?;
                Ok(SubroutineCall {
                    receiver: Some(first),
                    name,
                    args,
                })
            }
            kind => Err(CompileError::unexpected(token.line, "`(` or `.`", kind)),
        }
    }
}

impl Codegen for SubroutineCall {
    fn generate(
        &self,
        vm: &mut VmWriter<impl Write>,
        ctx: &CompileContext,
    ) -> Result<(), CompileError> {
        let (class_name, n_args): (&str, u16) = match &self.receiver {
            None => {
                // method call on the current object; a function has no
                // object to dispatch on
                if ctx.subroutine == SubroutineKind::Function {
                    return Err(CompileError::UnsupportedConstruct {
                        reason: format!(
                            "`{}` is called without a receiver inside a function",
                            self.name
                        ),
                    });
                }
                vm.push(Segment::Pointer, 0)?;
                (ctx.class_name.as_str(), self.args.len() as u16 + 1)
            }
            Some(receiver) => match ctx.symbols.get(receiver) {
                Some(entry) => match &entry.var_type {
                    Type::Class(class_name) => {
                        vm.push(entry.kind.segment(), entry.index)?;
                        (class_name.as_str(), self.args.len() as u16 + 1)
                    }
                    primitive => {
                        return Err(CompileError::UnsupportedConstruct {
                            reason: format!(
                                "cannot call a method through `{}` of type {}",
                                receiver, primitive
                            ),
                        })
                    }
                },
                // not a variable: a class name, dispatched statically
                None => (receiver.as_str(), self.args.len() as u16),
            },
        };

        for arg in &self.args {
            arg.generate(vm, ctx)?;
        }
        vm.call(class_name, &self.name, n_args)?;
        Ok(())
    }
}
