/// SQL Parser - converts tokens into AST
use super::ast::*;
use super::token::{Token, TokenType};
use crate::error::{DbError, Result};
use crate::types::{ColumnDef, ColumnType, Value};

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// `tokens` must end with `Eof`, as produced by `Lexer::tokenize`
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens = tokens;
        if !matches!(tokens.last().map(|t| &t.token_type), Some(TokenType::Eof)) {
            let (line, column) = tokens.last().map(|t| (t.line, t.column)).unwrap_or((1, 1));
            tokens.push(Token::new(TokenType::Eof, line, column));
        }
        Self { tokens, position: 0 }
    }

    /// Parse exactly one statement; only end of input may follow it
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = match &self.current().token_type {
            TokenType::Select => Statement::Select(self.parse_select()?),
            TokenType::Insert => Statement::Insert(self.parse_insert()?),
            TokenType::Update => Statement::Update(self.parse_update()?),
            TokenType::Delete => Statement::Delete(self.parse_delete()?),
            TokenType::Create => Statement::CreateTable(self.parse_create_table()?),
            _ => return Err(self.error("Expected SELECT, INSERT, UPDATE, DELETE or CREATE")),
        };

        if !matches!(self.current().token_type, TokenType::Eof) {
            return Err(self.error("Expected end of input"));
        }

        Ok(stmt)
    }

    /// Parse SELECT statement
    fn parse_select(&mut self) -> Result<SelectStmt> {
        self.expect(TokenType::Select)?;

        let columns = if self.match_token(TokenType::Star) {
            SelectColumns::All
        } else {
            SelectColumns::Named(self.parse_identifier_list()?)
        };

        self.expect(TokenType::From)?;
        let from = self.parse_identifier()?;

        // JOIN clause (optional)
        let join = if self.match_token(TokenType::Join) {
            let table = self.parse_identifier()?;
            self.expect(TokenType::On)?;
            let left_column = self.parse_identifier()?;
            self.expect(TokenType::Eq)?;
            let right_column = self.parse_identifier()?;
            Some(JoinClause {
                table,
                left_column,
                right_column,
            })
        } else {
            None
        };

        // WHERE clause (optional)
        let where_clause = if self.match_token(TokenType::Where) {
            Some(self.parse_expr(0)?)
        } else {
            None
        };

        // LIMIT clause (optional)
        let limit = if self.match_token(TokenType::Limit) {
            Some(self.parse_usize()?)
        } else {
            None
        };

        Ok(SelectStmt {
            columns,
            from,
            join,
            where_clause,
            limit,
        })
    }

    /// Parse INSERT statement
    fn parse_insert(&mut self) -> Result<InsertStmt> {
        self.expect(TokenType::Insert)?;
        self.expect(TokenType::Into)?;

        let table = self.parse_identifier()?;

        self.expect(TokenType::Values)?;
        self.expect(TokenType::LParen)?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_value()?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RParen)?;

        Ok(InsertStmt { table, values })
    }

    /// Parse UPDATE statement
    fn parse_update(&mut self) -> Result<UpdateStmt> {
        self.expect(TokenType::Update)?;
        let table = self.parse_identifier()?;
        self.expect(TokenType::Set)?;

        let mut assignments: Vec<(String, Value)> = Vec::new();
        loop {
            let column = self.parse_identifier()?;
            if assignments.iter().any(|(c, _)| *c == column) {
                return Err(self.error(&format!("Column {} assigned more than once", column)));
            }
            self.expect(TokenType::Eq)?;
            let value = self.parse_value()?;
            assignments.push((column, value));

            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        self.expect(TokenType::Where)?;
        let where_clause = self.parse_expr(0)?;

        Ok(UpdateStmt {
            table,
            assignments,
            where_clause,
        })
    }

    /// Parse DELETE statement
    fn parse_delete(&mut self) -> Result<DeleteStmt> {
        self.expect(TokenType::Delete)?;
        self.expect(TokenType::From)?;
        let table = self.parse_identifier()?;

        self.expect(TokenType::Where)?;
        let where_clause = self.parse_expr(0)?;

        Ok(DeleteStmt { table, where_clause })
    }

    fn parse_create_table(&mut self) -> Result<CreateTableStmt> {
        self.expect(TokenType::Create)?;
        self.expect(TokenType::Table)?;

        let if_not_exists = if self.match_token(TokenType::If) {
            self.expect(TokenType::Not)?;
            self.expect(TokenType::Exists)?;
            true
        } else {
            false
        };

        let table = self.parse_identifier()?;

        self.expect(TokenType::LParen)?;
        let columns = self.parse_column_defs()?;
        self.expect(TokenType::RParen)?;

        Ok(CreateTableStmt {
            table,
            columns,
            if_not_exists,
        })
    }

    fn parse_column_defs(&mut self) -> Result<Vec<ColumnDef>> {
        let mut columns = Vec::new();

        loop {
            let name = self.parse_identifier()?;
            let col_type = self.parse_data_type()?;
            let mut column = ColumnDef::new(name, col_type);

            // PRIMARY KEY | UNIQUE
            if self.match_token(TokenType::Primary) {
                self.expect(TokenType::Key)?;
                column = column.primary_key();
            } else if self.match_token(TokenType::Unique) {
                column = column.unique();
            }

            columns.push(column);

            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        Ok(columns)
    }

    fn parse_data_type(&mut self) -> Result<ColumnType> {
        let col_type = match &self.current().token_type {
            TokenType::Int => ColumnType::Integer,
            TokenType::Text => ColumnType::Text,
            _ => return Err(self.error("Expected data type INT or TEXT")),
        };
        self.advance();
        Ok(col_type)
    }

    /// Precedence climbing over AND/OR; both left-associative
    fn parse_expr(&mut self, min_precedence: u8) -> Result<Expr> {
        let mut left = self.parse_comparison()?;

        while let Some(op) = self.try_parse_logical_op() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }

            self.advance(); // consume operator
            let right = self.parse_expr(precedence + 1)?;

            left = Expr::Infix {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let column = self.parse_identifier()?;
        self.expect(TokenType::Eq)?;
        let value = self.parse_value()?;
        Ok(Expr::Comparison {
            column,
            op: ComparisonOp::Eq,
            value,
        })
    }

    fn try_parse_logical_op(&self) -> Option<LogicalOp> {
        match self.current().token_type {
            TokenType::And => Some(LogicalOp::And),
            TokenType::Or => Some(LogicalOp::Or),
            _ => None,
        }
    }

    // Helper methods

    fn parse_value(&mut self) -> Result<Value> {
        let value = match &self.current().token_type {
            TokenType::Number(n) => n
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| self.error(&format!("Integer literal {} out of range", n)))?,
            TokenType::String(s) => Value::Text(s.clone()),
            _ => return Err(self.error("Expected number or string literal")),
        };
        self.advance();
        Ok(value)
    }

    fn parse_identifier(&mut self) -> Result<String> {
        if let TokenType::Identifier(name) = &self.current().token_type {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error("Expected identifier"))
        }
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut list = Vec::new();
        loop {
            list.push(self.parse_identifier()?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        Ok(list)
    }

    fn parse_usize(&mut self) -> Result<usize> {
        if let TokenType::Number(n) = &self.current().token_type {
            let n = n
                .parse::<usize>()
                .map_err(|_| self.error(&format!("LIMIT {} out of range", n)))?;
            self.advance();
            Ok(n)
        } else {
            Err(self.error("Expected number"))
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if std::mem::discriminant(&self.current().token_type) == std::mem::discriminant(&token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token_type: TokenType) -> Result<()> {
        if std::mem::discriminant(&self.current().token_type) == std::mem::discriminant(&token_type) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("Expected {}", token_type.describe())))
        }
    }

    fn error(&self, msg: &str) -> DbError {
        let token = self.current();
        DbError::ParseError(format!(
            "{}, found {} at line {} column {}",
            msg,
            token.token_type.describe(),
            token.line,
            token.column
        ))
    }
}
