/// Lightweight SQL front end
///
/// Architecture:
/// - Lexer: Tokenizes SQL strings
/// - Parser: Builds AST from tokens
/// - Evaluator: Boolean predicates over rows
/// - Executor: Dispatches statements against the table registry

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod executor;
pub mod evaluator;

pub use token::{Token, TokenType};
pub use lexer::Lexer;
pub use ast::{Expr, SelectStmt, Statement};
pub use parser::Parser;
pub use executor::{QueryExecutor, QueryResult};

use crate::cancel::Cancellation;
use crate::database::Engine;
use crate::error::Result;

/// Tokenize and parse one statement
pub fn parse(sql: &str) -> Result<Statement> {
    let tokens = Lexer::new(sql).tokenize();
    Parser::new(tokens).parse()
}

/// Parse and execute a SQL statement with a signal that never fires
pub fn execute_sql(engine: &Engine, sql: &str) -> Result<QueryResult> {
    engine.execute(sql, &Cancellation::new())
}
