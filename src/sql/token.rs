/// Token types for the SQL lexer
use phf::phf_map;

// Perfect hash map for O(1) keyword lookup
static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "select" => TokenType::Select,
    "from" => TokenType::From,
    "where" => TokenType::Where,
    "insert" => TokenType::Insert,
    "into" => TokenType::Into,
    "values" => TokenType::Values,
    "update" => TokenType::Update,
    "set" => TokenType::Set,
    "delete" => TokenType::Delete,
    "create" => TokenType::Create,
    "table" => TokenType::Table,
    "primary" => TokenType::Primary,
    "key" => TokenType::Key,
    "unique" => TokenType::Unique,
    "join" => TokenType::Join,
    "on" => TokenType::On,
    "int" => TokenType::Int,
    "text" => TokenType::Text,
    "and" => TokenType::And,
    "or" => TokenType::Or,
    "limit" => TokenType::Limit,
    "if" => TokenType::If,
    "not" => TokenType::Not,
    "exists" => TokenType::Exists,
};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Keywords
    Select,
    From,
    Where,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    Create,
    Table,
    Primary,
    Key,
    Unique,
    Join,
    On,
    And,
    Or,
    Limit,
    If,
    Not,
    Exists,

    // Data types
    Int,
    Text,

    // Operators and delimiters
    Eq,     // =
    Star,   // *
    Comma,  // ,
    LParen, // (
    RParen, // )

    // Literals
    /// Digits only; the parser converts to i64
    Number(String),
    /// Single-quoted, taken verbatim
    String(String),
    /// May contain dots (`users.id` is one identifier)
    Identifier(String),

    // Special
    Illegal(char),
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(token_type: TokenType, line: usize, column: usize) -> Self {
        Self { token_type, line, column }
    }
}

impl TokenType {
    /// Case-insensitive keyword lookup
    pub fn from_keyword(s: &str) -> Option<Self> {
        let lowercase = s.to_ascii_lowercase();
        KEYWORDS.get(lowercase.as_str()).cloned()
    }

    /// Short human-readable form used in parse errors
    pub fn describe(&self) -> String {
        match self {
            TokenType::Number(n) => format!("number {}", n),
            TokenType::String(s) => format!("string '{}'", s),
            TokenType::Identifier(s) => format!("identifier {}", s),
            TokenType::Illegal(c) => format!("illegal character '{}'", c),
            TokenType::Eof => "end of input".to_string(),
            TokenType::Eq => "'='".to_string(),
            TokenType::Star => "'*'".to_string(),
            TokenType::Comma => "','".to_string(),
            TokenType::LParen => "'('".to_string(),
            TokenType::RParen => "')'".to_string(),
            keyword => format!("{:?}", keyword).to_uppercase(),
        }
    }
}
