//! Deterministic halves of the search pipeline: compiling classified criteria
//! into tool parameters and rendering tool results for the conversation.

pub mod compiler;
pub mod format;

pub use compiler::{
    compile, compile_with_report, Compilation, DeterministicFilterCompiler, FilterCompiler,
};
pub use format::{format_price, format_results, try_format_results};
