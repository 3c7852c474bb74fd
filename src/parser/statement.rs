use crate::codegen::{Codegen, CompileContext, Context};
use crate::parser::class::SubroutineKind;
use crate::parser::expression::{Expression, SubroutineCall};
use crate::parser::Parse;
use crate::tokenizer::{KeywordKind, TokenKind, Tokenizer};
use crate::vm::{ArithmeticCommand, Segment, VmWriter};
use crate::CompileError;
use std::io::{Read, Write};

#[derive(Debug)]
pub(crate) enum Statement {
    Let {
        name: String,
        index: Option<Expression>,
        value: Expression,
    },
    If {
        condition: Expression,
        then_branch: Vec<Statement>,
        else_branch: Option<Vec<Statement>>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    Do {
        call: SubroutineCall,
    },
    Return {
        value: Option<Expression>,
    },
}

impl Parse for Statement {
    fn parse<T: Read>(tokens: &mut Tokenizer<T>) -> Result<Statement, CompileError> {
        let token = tokens.advance()?;
        let keyword = match token.kind {
            TokenKind::Keyword(keyword) => keyword,
            kind => return Err(CompileError::unexpected(token.line, "a statement", kind)),
        };
        match keyword {
            KeywordKind::Let => {
                let name = tokens.advance()?.expect_identifier()?;
                let (symbol, line) = tokens.advance()?.expect_symbol()?;
                let index = match symbol {
                    b'[' => {
                        let index = Expression::parse(tokens)?;
                        tokens.advance()?.expect_spec_symbol(b']')?;
                        tokens.advance()?.expect_spec_symbol(b'=')?;
                        Some(index)
                    }
                    b'=' => None,
                    other => {
                        return Err(CompileError::unexpected(
                            line,
                            "`[` or `=`",
                            TokenKind::Symbol(other),
                        ))
                    }
                };
                let value = Expression::parse(tokens)?;
                tokens.advance()?.expect_spec_symbol(b';')?;
                Ok(Statement::Let { name, index, value })
            }
            KeywordKind::If => {
                tokens.advance()?.expect_spec_symbol(b'(')?;
                let condition = Expression::parse(tokens)?;
                tokens.advance()?.expect_spec_symbol(b')')?;
                tokens.advance()?.expect_spec_symbol(b'{')?;
                let then_branch = Vec::<Statement>::parse(tokens)?;
                tokens.advance()?.expect_spec_symbol(b'}')?;

                let token = tokens.advance()?;
                let else_branch = if token.kind == TokenKind::Keyword(KeywordKind::Else) {
                    tokens.advance()?.expect_spec_symbol(b'{')?;
                    let body = Vec::<Statement>::parse(tokens)?;
                    tokens.advance()?.expect_spec_symbol(b'}')?;
                    Some(body)
                } else {
                    tokens.unread_token(token);
                    None
                };

                Ok(Statement::If {
                    condition,
                    then_branch,
                    else_branch,
                })
            }
            KeywordKind::While => {
                tokens.advance()?.expect_spec_symbol(b'(')?;
                let condition = Expression::parse(tokens)?;
                tokens.advance()?.expect_spec_symbol(b')')?;
                tokens.advance()?.expect_spec_symbol(b'{')?;
                let body = Vec::<Statement>::parse(tokens)?;
                tokens.advance()?.expect_spec_symbol(b'}')?;
                Ok(Statement::While { condition, body })
            }
            KeywordKind::Do => {
                let first = tokens.advance()?.expect_identifier()?;
                let call = SubroutineCall::parse_with_receiver(first, tokens)?;
                tokens.advance()?.expect_spec_symbol(b';')?;
                Ok(Statement::Do { call })
            }
            KeywordKind::Return => {
                let token = tokens.advance()?;
                if token.kind == TokenKind::Symbol(b';') {
                    Ok(Statement::Return { value: None })
                } else {
                    tokens.unread_token(token);
                    let value = Expression::parse(tokens)?;
                    tokens.advance()?.expect_spec_symbol(b';')?;
                    Ok(Statement::Return { value: Some(value) })
                }
            }
            other => Err(CompileError::unexpected(
                token.line,
                "a statement",
                TokenKind::Keyword(other),
            )),
        }
    }
}

/// Statements up to, not including, the closing `}`.
impl Parse for Vec<Statement> {
    fn parse<T: Read>(tokens: &mut Tokenizer<T>) -> Result<Vec<Statement>, CompileError> {
        let mut statements = vec![];
        loop {
            let token = tokens.advance()?;
            if token.kind == TokenKind::Symbol(b'}') {
                tokens.unread_token(token);
                return Ok(statements);
            }
            tokens.unread_token(token);
            statements.push(Statement::parse(tokens)?);
        }
    }
}

impl Context for Statement {
    fn generate(
        &self,
        vm: &mut VmWriter<impl Write>,
        ctx: &mut CompileContext,
    ) -> Result<(), CompileError> {
        match self {
            Statement::Let { name, index, value } => {
                value.generate(vm, ctx)?;
                let entry = ctx.symbols.resolve(name)?;
                let (segment, slot) = (entry.kind.segment(), entry.index);
                match index {
                    Some(offset) => {
                        vm.push(segment, slot)?;
                        offset.generate(vm, ctx)?;
                        vm.arithmetic(ArithmeticCommand::Add)?;
                        vm.pop(Segment::Pointer, 1)?;
                        vm.pop(Segment::That, 0)?;
                    }
                    None => vm.pop(segment, slot)?,
                }
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let n = ctx.next_flow_index();
                let false_label = format!("IF_FALSE_{}", n);
                condition.generate(vm, ctx)?;
                vm.arithmetic(ArithmeticCommand::Not)?;
                vm.if_goto(&false_label)?;
                for statement in then_branch {
                    statement.generate(vm, ctx)?;
                }
                match else_branch {
                    Some(else_statements) => {
                        let end_label = format!("IF_END_{}", n);
                        vm.goto(&end_label)?;
                        vm.label(&false_label)?;
                        for statement in else_statements {
                            statement.generate(vm, ctx)?;
                        }
                        vm.label(&end_label)?;
                    }
                    None => vm.label(&false_label)?,
                }
            }
            Statement::While { condition, body } => {
                let n = ctx.next_flow_index();
                let exp_label = format!("WHILE_EXP_{}", n);
                let end_label = format!("WHILE_END_{}", n);
                vm.label(&exp_label)?;
                condition.generate(vm, ctx)?;
                vm.arithmetic(ArithmeticCommand::Not)?;
                vm.if_goto(&end_label)?;
                for statement in body {
                    statement.generate(vm, ctx)?;
                }
                vm.goto(&exp_label)?;
                vm.label(&end_label)?;
            }
            Statement::Do { call } => {
                call.generate(vm, ctx)?;
                // the call site must consume the callee's value
                vm.pop(Segment::Temp, 0)?;
            }
            Statement::Return { value } => {
                match value {
                    Some(expression) => expression.generate(vm, ctx)?,
                    None => {
                        if ctx.subroutine == SubroutineKind::Constructor {
                            vm.push(Segment::Pointer, 0)?;
                        } else {
                            vm.push(Segment::Constant, 0)?;
                        }
                    }
                }
                vm.ret()?;
            }
        }
        Ok(())
    }
}
