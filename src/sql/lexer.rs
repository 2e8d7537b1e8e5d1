/// SQL Lexer - converts SQL string into tokens
///
/// Never fails: characters outside the grammar become `Illegal` tokens and the
/// parser reports them with their position.
use super::token::{Token, TokenType};

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// All tokens up to and including `Eof`
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = matches!(token.token_type, TokenType::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let line = self.line;
        let column = self.column;

        if self.is_eof() {
            return Token::new(TokenType::Eof, line, column);
        }

        let ch = self.current_char();

        let token_type = match ch {
            '\'' => self.read_string(),
            '0'..='9' => self.read_number(),
            c if is_identifier_start(c) => self.read_identifier(),
            '=' => self.single(TokenType::Eq),
            '*' => self.single(TokenType::Star),
            ',' => self.single(TokenType::Comma),
            '(' => self.single(TokenType::LParen),
            ')' => self.single(TokenType::RParen),
            other => self.single(TokenType::Illegal(other)),
        };

        Token::new(token_type, line, column)
    }

    fn single(&mut self, token_type: TokenType) -> TokenType {
        self.advance();
        token_type
    }

    fn current_char(&self) -> char {
        if self.is_eof() {
            '\0'
        } else {
            self.input[self.position]
        }
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            if self.input[self.position] == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    /// No escapes; an unterminated literal runs to end of input
    fn read_string(&mut self) -> TokenType {
        self.advance(); // skip opening quote
        let mut value = String::new();

        while !self.is_eof() && self.current_char() != '\'' {
            value.push(self.current_char());
            self.advance();
        }

        self.advance(); // skip closing quote (no-op at eof)
        TokenType::String(value)
    }

    fn read_number(&mut self) -> TokenType {
        let mut value = String::new();

        while !self.is_eof() && self.current_char().is_ascii_digit() {
            value.push(self.current_char());
            self.advance();
        }

        TokenType::Number(value)
    }

    fn read_identifier(&mut self) -> TokenType {
        let mut value = String::new();

        while !self.is_eof() {
            let ch = self.current_char();
            if is_identifier_start(ch) || ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        TokenType::from_keyword(&value).unwrap_or(TokenType::Identifier(value))
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '.'
}
