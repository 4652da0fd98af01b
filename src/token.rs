use std::fmt;

/// A scanned token plus the 1-based source line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize) -> Self {
        Self { kind, line }
    }
}

/// The exact token vocabulary. The parser matches on kind identity, so this
/// enum is a compatibility surface: punctuation kinds display as their
/// source text, structural kinds by their conventional names.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),

    // Keywords
    And,
    As,
    Assert,
    Break,
    Class,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    Except,
    Finally,
    For,
    From,
    Global,
    If,
    Import,
    In,
    Is,
    Lambda,
    Nonlocal,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    Try,
    While,
    With,
    Yield,
    None,
    True,
    False,

    // Operators
    Assign,         // =
    Eq,             // ==
    NotEq,          // !=
    Less,           // <
    LessEq,         // <=
    Greater,        // >
    GreaterEq,      // >=
    Plus,           // +
    PlusAssign,     // +=
    Minus,          // -
    MinusAssign,    // -=
    Star,           // *
    StarAssign,     // *=
    Power,          // **
    PowerAssign,    // **=
    Slash,          // /
    SlashAssign,    // /=
    FloorDiv,       // //
    FloorDivAssign, // //=
    Percent,        // %
    PercentAssign,  // %=
    Amp,            // &
    AmpAssign,      // &=
    Pipe,           // |
    PipeAssign,     // |=
    Caret,          // ^
    CaretAssign,    // ^=
    Tilde,          // ~
    Shl,            // <<
    ShlAssign,      // <<=
    Shr,            // >>
    ShrAssign,      // >>=

    // Delimiters
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LBrace,    // {
    RBrace,    // }
    Colon,     // :
    Semicolon, // ;
    Comma,     // ,
    Dot,       // .
    Arrow,     // ->
    At,        // @
    Ellipsis,  // ...

    // Structural
    Newline,
    Indent,
    Dedent,
    End,
}

impl TokenKind {
    /// The keyword kind for `ident`, if it is one.
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        let kind = match ident {
            "and" => TokenKind::And,
            "as" => TokenKind::As,
            "assert" => TokenKind::Assert,
            "break" => TokenKind::Break,
            "class" => TokenKind::Class,
            "continue" => TokenKind::Continue,
            "def" => TokenKind::Def,
            "del" => TokenKind::Del,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "except" => TokenKind::Except,
            "finally" => TokenKind::Finally,
            "for" => TokenKind::For,
            "from" => TokenKind::From,
            "global" => TokenKind::Global,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "in" => TokenKind::In,
            "is" => TokenKind::Is,
            "lambda" => TokenKind::Lambda,
            "nonlocal" => TokenKind::Nonlocal,
            "not" => TokenKind::Not,
            "or" => TokenKind::Or,
            "pass" => TokenKind::Pass,
            "raise" => TokenKind::Raise,
            "return" => TokenKind::Return,
            "try" => TokenKind::Try,
            "while" => TokenKind::While,
            "with" => TokenKind::With,
            "yield" => TokenKind::Yield,
            "None" => TokenKind::None,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            _ => return Option::None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Name(name) => return write!(f, "NAME '{name}'"),
            TokenKind::Int(value) => return write!(f, "INT {value}"),
            TokenKind::Float(value) => return write!(f, "FLOAT {value:?}"),
            TokenKind::Str(_) => "STR",
            TokenKind::And => "and",
            TokenKind::As => "as",
            TokenKind::Assert => "assert",
            TokenKind::Break => "break",
            TokenKind::Class => "class",
            TokenKind::Continue => "continue",
            TokenKind::Def => "def",
            TokenKind::Del => "del",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::Except => "except",
            TokenKind::Finally => "finally",
            TokenKind::For => "for",
            TokenKind::From => "from",
            TokenKind::Global => "global",
            TokenKind::If => "if",
            TokenKind::Import => "import",
            TokenKind::In => "in",
            TokenKind::Is => "is",
            TokenKind::Lambda => "lambda",
            TokenKind::Nonlocal => "nonlocal",
            TokenKind::Not => "not",
            TokenKind::Or => "or",
            TokenKind::Pass => "pass",
            TokenKind::Raise => "raise",
            TokenKind::Return => "return",
            TokenKind::Try => "try",
            TokenKind::While => "while",
            TokenKind::With => "with",
            TokenKind::Yield => "yield",
            TokenKind::None => "None",
            TokenKind::True => "True",
            TokenKind::False => "False",
            TokenKind::Assign => "=",
            TokenKind::Eq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEq => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEq => ">=",
            TokenKind::Plus => "+",
            TokenKind::PlusAssign => "+=",
            TokenKind::Minus => "-",
            TokenKind::MinusAssign => "-=",
            TokenKind::Star => "*",
            TokenKind::StarAssign => "*=",
            TokenKind::Power => "**",
            TokenKind::PowerAssign => "**=",
            TokenKind::Slash => "/",
            TokenKind::SlashAssign => "/=",
            TokenKind::FloorDiv => "//",
            TokenKind::FloorDivAssign => "//=",
            TokenKind::Percent => "%",
            TokenKind::PercentAssign => "%=",
            TokenKind::Amp => "&",
            TokenKind::AmpAssign => "&=",
            TokenKind::Pipe => "|",
            TokenKind::PipeAssign => "|=",
            TokenKind::Caret => "^",
            TokenKind::CaretAssign => "^=",
            TokenKind::Tilde => "~",
            TokenKind::Shl => "<<",
            TokenKind::ShlAssign => "<<=",
            TokenKind::Shr => ">>",
            TokenKind::ShrAssign => ">>=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Arrow => "->",
            TokenKind::At => "@",
            TokenKind::Ellipsis => "...",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Indent => "INDENT",
            TokenKind::Dedent => "DEDENT",
            TokenKind::End => "END",
        };
        f.write_str(text)
    }
}
