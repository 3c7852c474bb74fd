use crate::tokenizer::Tokenizer;
use crate::CompileError;

pub(crate) mod class;
pub(crate) mod expression;
pub(crate) mod statement;

/// One nonterminal of the grammar; parsing consumes exactly the tokens
/// belonging to the construct, pushing back at most one token.
pub trait Parse
where
    Self: Sized,
{
    fn parse<T: std::io::Read>(tokens: &mut Tokenizer<T>) -> Result<Self, CompileError>;
}

pub use class::Class;
pub use class::Type;
