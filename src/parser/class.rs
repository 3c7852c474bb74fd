use crate::codegen::{CompileContext, Context};
use crate::parser::statement::Statement;
use crate::parser::Parse;
use crate::symbols::VarKind;
use crate::tokenizer::{KeywordKind, TokenKind, Tokenizer};
use crate::vm::{Segment, VmWriter};
use crate::CompileError;
use std::fmt;
use std::io::{Read, Write};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Type {
    Int,
    Char,
    Boolean,
    Void,
    Class(String),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Char => f.write_str("char"),
            Type::Boolean => f.write_str("boolean"),
            Type::Void => f.write_str("void"),
            Type::Class(name) => f.write_str(name),
        }
    }
}

impl Parse for Type {
    fn parse<T: Read>(tokens: &mut Tokenizer<T>) -> Result<Type, CompileError> {
        let token = tokens.advance()?;
        match token.kind {
            TokenKind::Keyword(KeywordKind::Int) => Ok(Type::Int),
            TokenKind::Keyword(KeywordKind::Char) => Ok(Type::Char),
            TokenKind::Keyword(KeywordKind::Boolean) => Ok(Type::Boolean),
            TokenKind::Keyword(KeywordKind::Void) => Ok(Type::Void),
            TokenKind::Identifier(name) => Ok(Type::Class(name)),
            kind => Err(CompileError::unexpected(token.line, "a type", kind)),
        }
    }
}

/// A variable type: like `Type` but `void` is not allowed.
fn parse_var_type<T: Read>(tokens: &mut Tokenizer<T>) -> Result<Type, CompileError> {
    let token = tokens.advance()?;
    match token.kind {
        TokenKind::Keyword(KeywordKind::Int) => Ok(Type::Int),
        TokenKind::Keyword(KeywordKind::Char) => Ok(Type::Char),
        TokenKind::Keyword(KeywordKind::Boolean) => Ok(Type::Boolean),
        TokenKind::Identifier(name) => Ok(Type::Class(name)),
        kind => Err(CompileError::unexpected(token.line, "a variable type", kind)),
    }
}

/// One translation unit.
#[derive(Debug)]
pub struct Class {
    name: String,
    vars: Vec<ClassVar>,
    subroutines: Vec<Subroutine>,
}

impl Parse for Class {
    fn parse<T: Read>(tokens: &mut Tokenizer<T>) -> Result<Class, CompileError> {
        tokens.advance()?.expect_spec_keyword(KeywordKind::Class)?;
        let name = tokens.advance()?.expect_identifier()?;
        tokens.advance()?.expect_spec_symbol(b'{')?;

        let mut vars = vec![];
        loop {
            let group = Vec::<ClassVar>::parse(tokens)?;
            if group.is_empty() {
                break;
            }
            vars.extend(group);
        }

        let mut subroutines = vec![];
        while let Some(subroutine) = Option::<Subroutine>::parse(tokens)? {
            subroutines.push(subroutine);
        }

        tokens.advance()?.expect_spec_symbol(b'}')?;
        let token = tokens.advance()?;
        match token.kind {
            TokenKind::EndOfFile => Ok(Class {
                name,
                vars,
                subroutines,
            }),
            kind => Err(CompileError::unexpected(token.line, "end of input", kind)),
        }
    }
}

impl Context for Class {
    fn generate(
        &self,
        vm: &mut VmWriter<impl Write>,
        ctx: &mut CompileContext,
    ) -> Result<(), CompileError> {
        ctx.class_name = self.name.clone();
        for var in &self.vars {
            ctx.symbols.define(&var.name, var.var_type.clone(), var.kind)?;
        }
        for subroutine in &self.subroutines {
            subroutine.generate(vm, ctx)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ClassVar {
    kind: VarKind,
    var_type: Type,
    name: String,
}

/// One `static`/`field` declaration line, flattened to one entry per
/// name. Empty result means the next token opens something else.
impl Parse for Vec<ClassVar> {
    fn parse<T: Read>(tokens: &mut Tokenizer<T>) -> Result<Vec<ClassVar>, CompileError> {
        let token = tokens.advance()?;
        let kind = match token.kind {
            TokenKind::Keyword(KeywordKind::Static) => VarKind::Static,
            TokenKind::Keyword(KeywordKind::Field) => VarKind::Field,
            _ => {
                tokens.unread_token(token);
                return Ok(vec![]);
            }
        };

        let var_type = parse_var_type(tokens)?;
        let mut names = vec![tokens.advance()?.expect_identifier()?];
        loop {
            let (symbol, line) = tokens.advance()?.expect_symbol()?;
            match symbol {
                b';' => break,
                b',' => names.push(tokens.advance()?.expect_identifier()?),
                other => {
                    return Err(CompileError::unexpected(
                        line,
                        "`,` or `;`",
                        TokenKind::Symbol(other),
                    ))
                }
            }
        }

        Ok(names
            .into_iter()
            .map(|name| ClassVar {
                kind,
                var_type: var_type.clone(),
                name,
            })
            .collect())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

#[derive(Debug)]
struct Subroutine {
    kind: SubroutineKind,
    name: String,
    parameters: Vec<Parameter>,
    locals: Vec<LocalVar>,
    statements: Vec<Statement>,
}

impl Parse for Option<Subroutine> {
    fn parse<T: Read>(tokens: &mut Tokenizer<T>) -> Result<Option<Subroutine>, CompileError> {
        let token = tokens.advance()?;
        let kind = match token.kind {
            TokenKind::Keyword(KeywordKind::Constructor) => SubroutineKind::Constructor,
            TokenKind::Keyword(KeywordKind::Function) => SubroutineKind::Function,
            TokenKind::Keyword(KeywordKind::Method) => SubroutineKind::Method,
            _ => {
                tokens.unread_token(token);
                return Ok(None);
            }
        };

        // the declared return type only matters syntactically; `return`
        // lowering keys off the subroutine kind and the returned value
        let _return_type = Type::parse(tokens)?;
        let name = tokens.advance()?.expect_identifier()?;
        let parameters = Vec::<Parameter>::parse(tokens)?;

        tokens.advance()?.expect_spec_symbol(b'{')?;
        let mut locals = vec![];
        loop {
            let group = Vec::<LocalVar>::parse(tokens)?;
            if group.is_empty() {
                break;
            }
            locals.extend(group);
        }
        let statements = Vec::<Statement>::parse(tokens)?;
        tokens.advance()?.expect_spec_symbol(b'}')?;

        Ok(Some(Subroutine {
            kind,
            name,
            parameters,
            locals,
            statements,
        }))
    }
}

impl Context for Subroutine {
    fn generate(
        &self,
        vm: &mut VmWriter<impl Write>,
        ctx: &mut CompileContext,
    ) -> Result<(), CompileError> {
        ctx.symbols.start_subroutine();
        ctx.subroutine = self.kind;

        if self.kind == SubroutineKind::Method {
            // the receiver occupies argument 0; user parameters follow
            ctx.symbols.define(
                "this",
                Type::Class(ctx.class_name.clone()),
                VarKind::Argument,
            )?;
        }
        for parameter in &self.parameters {
            ctx.symbols
                .define(&parameter.name, parameter.var_type.clone(), VarKind::Argument)?;
        }
        for local in &self.locals {
            ctx.symbols
                .define(&local.name, local.var_type.clone(), VarKind::Local)?;
        }

        // every varDec is registered, so the local count is final
        vm.function(
            &ctx.class_name,
            &self.name,
            ctx.symbols.var_count(VarKind::Local),
        )?;

        match self.kind {
            SubroutineKind::Constructor => {
                vm.push(Segment::Constant, ctx.symbols.var_count(VarKind::Field))?;
                vm.call("Memory", "alloc", 1)?;
                vm.pop(Segment::Pointer, 0)?;
            }
            SubroutineKind::Method => {
                vm.push(Segment::Argument, 0)?;
                vm.pop(Segment::Pointer, 0)?;
            }
            SubroutineKind::Function => {}
        }

        for statement in &self.statements {
            statement.generate(vm, ctx)?;
        }

        Ok(())
    }
}

#[derive(Debug)]
struct Parameter {
    var_type: Type,
    name: String,
}

impl Parse for Vec<Parameter> {
    fn parse<T: Read>(tokens: &mut Tokenizer<T>) -> Result<Vec<Parameter>, CompileError> {
        tokens.advance()?.expect_spec_symbol(b'(')?;
        let mut parameters = vec![];

        let token = tokens.advance()?;
        if token.kind == TokenKind::Symbol(b')') {
            return Ok(parameters);
        }
        tokens.unread_token(token);

        loop {
            let var_type = parse_var_type(tokens)?;
            let name = tokens.advance()?.expect_identifier()?;
            parameters.push(Parameter { var_type, name });

            let (symbol, line) = tokens.advance()?.expect_symbol()?;
            match symbol {
                b')' => return Ok(parameters),
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

#[derive(Debug)]
struct LocalVar {
    var_type: Type,
    name: String,
}

impl Parse for Vec<LocalVar> {
    fn parse<T: Read>(tokens: &mut Tokenizer<T>) -> Result<Vec<LocalVar>, CompileError> {
        let token = tokens.advance()?;
        match token.kind {
            TokenKind::Keyword(KeywordKind::Var) => {}
            _ => {
                tokens.unread_token(token);
                return Ok(vec![]);
            }
        }

        let var_type = parse_var_type(tokens)?;
        let mut names = vec![tokens.advance()?.expect_identifier()?];
        loop {
            let (symbol, line) = tokens.advance()?.expect_symbol()?;
            match symbol {
                b';' => break,
                b',' => names.push(tokens.advance()?.expect_identifier()?),
                other => {
                    return Err(CompileError::unexpected(
                        line,
                        "`,` or `;`",
                        TokenKind::Symbol(other),
                    ))
                }
            }
        }

        Ok(names
            .into_iter()
            .map(|name| LocalVar {
                var_type: var_type.clone(),
                name,
            })
            .collect())
    }
}
