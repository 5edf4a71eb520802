//! Rule synthesis, rule parsing and demo compilation.

pub mod compiler;
pub mod graph;
pub mod parser;
pub mod spec;
pub mod text;

pub use compiler::DemoCompiler;
pub use parser::{FallbackRuleParser, RuleParser};
pub use spec::RuleSpec;
pub use text::TextualRuleParser;
