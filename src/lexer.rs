use crate::token::{Token, TokenKind};

mod error;

pub use error::{LexError, LexResult};

/// Pull lexer over the full source text. Tracks an indentation stack and a
/// bracket-nesting counter so that `Indent`/`Dedent`/`Newline` tokens are
/// only produced where the grammar is line-structured.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    indents: Vec<usize>,
    pending_dedents: usize,
    nesting: usize,
    at_line_start: bool,
    line_had_content: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            indents: vec![0],
            pending_dedents: 0,
            nesting: 0,
            at_line_start: true,
            line_had_content: false,
        }
    }

    /// Returns the next token. After the source is exhausted, drains one
    /// `Dedent` per still-open indentation level and then returns `End` on
    /// every subsequent call.
    pub fn next_token(&mut self) -> LexResult<Token> {
        if self.pending_dedents > 0 {
            self.pending_dedents -= 1;
            return Ok(self.token(TokenKind::Dedent));
        }

        loop {
            if self.at_line_start && self.nesting == 0 {
                if let Some(token) = self.handle_line_start()? {
                    return Ok(token);
                }
            }

            self.skip_inline_whitespace();

            let Some(ch) = self.peek() else {
                return Ok(self.end_of_source());
            };

            match ch {
                '#' => {
                    self.skip_comment();
                }
                '\n' => {
                    self.bump();
                    if self.nesting == 0 {
                        self.at_line_start = true;
                        if self.line_had_content {
                            self.line_had_content = false;
                            return Ok(Token::new(TokenKind::Newline, self.line - 1));
                        }
                    }
                }
                _ => {
                    self.line_had_content = true;
                    return self.scan_token(ch);
                }
            }
        }
    }

    /// At the logical start of a line (nesting 0): skips blank and
    /// comment-only lines entirely, then compares the line's indentation
    /// against the stack. Returns an `Indent` or the first of a run of
    /// `Dedent`s when the width changed, `None` when it did not.
    fn handle_line_start(&mut self) -> LexResult<Option<Token>> {
        let indent = loop {
            let mut width = 0;
            loop {
                match self.peek() {
                    Some(' ') => {
                        self.bump();
                        width += 1;
                    }
                    Some('\r') => {
                        self.bump();
                    }
                    Some('\t') => {
                        return Err(LexError::TabIndentation { line: self.line });
                    }
                    _ => break,
                }
            }
            match self.peek() {
                Some('\n') => {
                    self.bump();
                }
                Some('#') => {
                    self.skip_comment();
                }
                Some(_) => break width,
                None => {
                    self.at_line_start = false;
                    return Ok(None);
                }
            }
        };

        self.at_line_start = false;
        let current = *self.indents.last().unwrap_or(&0);
        if indent > current {
            self.indents.push(indent);
            return Ok(Some(self.token(TokenKind::Indent)));
        }
        if indent < current {
            let mut count = 0;
            while self.indents.last().is_some_and(|&top| top > indent) {
                self.indents.pop();
                count += 1;
            }
            if *self.indents.last().unwrap_or(&0) != indent {
                return Err(LexError::InconsistentDedent {
                    indent,
                    line: self.line,
                });
            }
            self.pending_dedents = count - 1;
            return Ok(Some(self.token(TokenKind::Dedent)));
        }
        Ok(None)
    }

    fn end_of_source(&mut self) -> Token {
        if self.indents.len() > 1 {
            let open = self.indents.len() - 1;
            self.indents.truncate(1);
            self.pending_dedents = open - 1;
            return self.token(TokenKind::Dedent);
        }
        self.token(TokenKind::End)
    }

    fn scan_token(&mut self, ch: char) -> LexResult<Token> {
        let line = self.line;
        if ch.is_ascii_digit() {
            return self.scan_number();
        }
        if ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            return self.scan_number();
        }
        if ch.is_alphabetic() || ch == '_' {
            return Ok(self.scan_identifier());
        }
        if ch == '\'' || ch == '"' {
            return self.scan_string(ch);
        }

        self.bump();
        let kind = match ch {
            '(' => {
                self.nesting += 1;
                TokenKind::LParen
            }
            ')' => {
                self.nesting = self.nesting.saturating_sub(1);
                TokenKind::RParen
            }
            '[' => {
                self.nesting += 1;
                TokenKind::LBracket
            }
            ']' => {
                self.nesting = self.nesting.saturating_sub(1);
                TokenKind::RBracket
            }
            '{' => {
                self.nesting += 1;
                TokenKind::LBrace
            }
            '}' => {
                self.nesting = self.nesting.saturating_sub(1);
                TokenKind::RBrace
            }
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '@' => TokenKind::At,
            '~' => TokenKind::Tilde,
            '.' => {
                if self.eat('.') {
                    if self.eat('.') {
                        TokenKind::Ellipsis
                    } else {
                        return Err(LexError::UnexpectedCharacter {
                            character: '.',
                            line,
                        });
                    }
                } else {
                    TokenKind::Dot
                }
            }
            '=' => {
                if self.eat('=') {
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEq
                } else {
                    return Err(LexError::UnexpectedCharacter {
                        character: '!',
                        line,
                    });
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::LessEq
                } else if self.eat('<') {
                    if self.eat('=') {
                        TokenKind::ShlAssign
                    } else {
                        TokenKind::Shl
                    }
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::GreaterEq
                } else if self.eat('>') {
                    if self.eat('=') {
                        TokenKind::ShrAssign
                    } else {
                        TokenKind::Shr
                    }
                } else {
                    TokenKind::Greater
                }
            }
            '+' => {
                if self.eat('=') {
                    TokenKind::PlusAssign
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('=') {
                    TokenKind::MinusAssign
                } else if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.eat('*') {
                    if self.eat('=') {
                        TokenKind::PowerAssign
                    } else {
                        TokenKind::Power
                    }
                } else if self.eat('=') {
                    TokenKind::StarAssign
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.eat('/') {
                    if self.eat('=') {
                        TokenKind::FloorDivAssign
                    } else {
                        TokenKind::FloorDiv
                    }
                } else if self.eat('=') {
                    TokenKind::SlashAssign
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    TokenKind::PercentAssign
                } else {
                    TokenKind::Percent
                }
            }
            '&' => {
                if self.eat('=') {
                    TokenKind::AmpAssign
                } else {
                    TokenKind::Amp
                }
            }
            '|' => {
                if self.eat('=') {
                    TokenKind::PipeAssign
                } else {
                    TokenKind::Pipe
                }
            }
            '^' => {
                if self.eat('=') {
                    TokenKind::CaretAssign
                } else {
                    TokenKind::Caret
                }
            }
            other => {
                return Err(LexError::UnexpectedCharacter {
                    character: other,
                    line,
                });
            }
        };
        Ok(Token::new(kind, line))
    }

    fn scan_identifier(&mut self) -> Token {
        let line = self.line;
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.bump();
        }
        let ident: String = self.chars[start..self.pos].iter().collect();
        let kind = TokenKind::keyword(&ident).unwrap_or(TokenKind::Name(ident));
        Token::new(kind, line)
    }

    fn scan_number(&mut self) -> LexResult<Token> {
        let line = self.line;
        let start = self.pos;

        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('b' | 'B') => Some(2),
                Some('o' | 'O') => Some(8),
                Some('x' | 'X') => Some(16),
                _ => None,
            };
            if let Some(radix) = radix {
                self.bump();
                self.bump();
                let digits_start = self.pos;
                while self.peek().is_some_and(|c| c.is_digit(radix)) {
                    self.bump();
                }
                let digits: String = self.chars[digits_start..self.pos].iter().collect();
                let value = i64::from_str_radix(&digits, radix).map_err(|_| {
                    LexError::InvalidNumber {
                        literal: self.chars[start..self.pos].iter().collect(),
                        line,
                    }
                })?;
                return Ok(Token::new(TokenKind::Int(value), line));
            }
        }

        let mut is_float = false;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_at(1) != Some('.') {
            is_float = true;
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(1), Some('+' | '-')) {
                lookahead = 2;
            }
            if self.peek_at(lookahead).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..=lookahead {
                    self.bump();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }

        let literal: String = self.chars[start..self.pos].iter().collect();
        let kind = if is_float {
            let value = literal.parse::<f64>().map_err(|_| LexError::InvalidNumber {
                literal: literal.clone(),
                line,
            })?;
            TokenKind::Float(value)
        } else {
            let value = literal.parse::<i64>().map_err(|_| LexError::InvalidNumber {
                literal: literal.clone(),
                line,
            })?;
            TokenKind::Int(value)
        };
        Ok(Token::new(kind, line))
    }

    fn scan_string(&mut self, quote: char) -> LexResult<Token> {
        let line = self.line;
        self.bump();
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        let mut text = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(LexError::UnterminatedString { line });
            };
            if ch == quote {
                if !triple {
                    self.bump();
                    break;
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.bump();
                    self.bump();
                    self.bump();
                    break;
                }
                self.bump();
                text.push(ch);
                continue;
            }
            if ch == '\n' {
                if !triple {
                    return Err(LexError::UnterminatedString { line });
                }
                self.bump();
                text.push('\n');
                continue;
            }
            if ch == '\\' {
                self.bump();
                if let Some(decoded) = self.scan_escape()? {
                    text.push(decoded);
                }
                continue;
            }
            self.bump();
            text.push(ch);
        }
        Ok(Token::new(TokenKind::Str(text), line))
    }

    /// Decodes one escape sequence after the backslash was consumed.
    /// Returns `None` for a consumed line continuation.
    fn scan_escape(&mut self) -> LexResult<Option<char>> {
        let line = self.line;
        let Some(ch) = self.peek() else {
            return Err(LexError::UnterminatedString { line });
        };
        self.bump();
        let decoded = match ch {
            '\n' => return Ok(None),
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            '0'..='7' => {
                let mut value = ch as u32 - '0' as u32;
                for _ in 0..2 {
                    match self.peek() {
                        Some(digit @ '0'..='7') => {
                            self.bump();
                            value = value * 8 + (digit as u32 - '0' as u32);
                        }
                        _ => break,
                    }
                }
                char::from_u32(value)
                    .ok_or(LexError::InvalidEscape { escape: ch, line })?
            }
            'x' => self.scan_hex_escape(2, 'x')?,
            'u' => self.scan_hex_escape(4, 'u')?,
            other => return Err(LexError::InvalidEscape { escape: other, line }),
        };
        Ok(Some(decoded))
    }

    fn scan_hex_escape(&mut self, digits: usize, escape: char) -> LexResult<char> {
        let line = self.line;
        let mut value = 0;
        for _ in 0..digits {
            let digit = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or(LexError::InvalidEscape { escape, line })?;
            self.bump();
            value = value * 16 + digit;
        }
        char::from_u32(value).ok_or(LexError::InvalidEscape { escape, line })
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
            self.bump();
        }
    }

    fn token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.line)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        if let Some(&ch) = self.chars.get(self.pos) {
            self.pos += 1;
            if ch == '\n' {
                self.line += 1;
            }
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            return true;
        }
        false
    }
}

/// Collects all tokens through the terminal `End`.
pub fn tokenize(source: &str) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_end = matches!(token.kind, TokenKind::End);
        tokens.push(token);
        if is_end {
            break;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn scans_simple_program() {
        let input = indoc! {"
            def f():
                n = 4 + 4
                print(n)
            f()
        "};
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Def,
                TokenKind::Name("f".to_string()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Name("n".to_string()),
                TokenKind::Assign,
                TokenKind::Int(4),
                TokenKind::Plus,
                TokenKind::Int(4),
                TokenKind::Newline,
                TokenKind::Name("print".to_string()),
                TokenKind::LParen,
                TokenKind::Name("n".to_string()),
                TokenKind::RParen,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Name("f".to_string()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Newline,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn blank_and_comment_lines_do_not_break_blocks() {
        let input = indoc! {"
            if a:
                b = 1

                # a comment

                c = 2
            d = 3
        "};
        let structural: Vec<TokenKind> = kinds(input)
            .into_iter()
            .filter(|kind| {
                matches!(
                    kind,
                    TokenKind::Indent | TokenKind::Dedent | TokenKind::Newline
                )
            })
            .collect();
        assert_eq!(
            structural,
            vec![
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Newline,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn nested_blocks_close_with_one_dedent_each() {
        let input = "class C:\n def m():\n  pass\n def n():\n  pass\n";
        let dedents = kinds(input)
            .iter()
            .filter(|kind| matches!(kind, TokenKind::Dedent))
            .count();
        assert_eq!(dedents, 3);
    }

    #[test]
    fn brackets_suppress_newlines() {
        assert_eq!(
            kinds("(\n1,\n2)\n"),
            vec![
                TokenKind::LParen,
                TokenKind::Int(1),
                TokenKind::Comma,
                TokenKind::Int(2),
                TokenKind::RParen,
                TokenKind::Newline,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn dedents_drain_at_end_of_source() {
        assert_eq!(
            kinds("if a:\n if b:\n  pass"),
            vec![
                TokenKind::If,
                TokenKind::Name("a".to_string()),
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::If,
                TokenKind::Name("b".to_string()),
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Pass,
                TokenKind::Dedent,
                TokenKind::Dedent,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn scans_operator_vocabulary() {
        let rendered: Vec<String> = kinds("=,+=,-=,*=,/=,%=,&=,|=,^=,<<=,>>=,**=,//=")
            .iter()
            .take_while(|kind| !matches!(kind, TokenKind::End))
            .map(|kind| kind.to_string())
            .collect();
        assert_eq!(
            rendered.join(" "),
            "= , += , -= , *= , /= , %= , &= , |= , ^= , <<= , >>= , **= , //="
        );
    }

    #[test]
    fn scans_number_forms() {
        assert_eq!(
            kinds("10 0b101 0o17 0xff 1.5 .5 2e3 1.5e-2"),
            vec![
                TokenKind::Int(10),
                TokenKind::Int(5),
                TokenKind::Int(15),
                TokenKind::Int(255),
                TokenKind::Float(1.5),
                TokenKind::Float(0.5),
                TokenKind::Float(2000.0),
                TokenKind::Float(0.015),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn scans_string_escapes() {
        assert_eq!(
            kinds(r#"'a\nb' "x\x41\u0042\101" 'one\
two'"#),
            vec![
                TokenKind::Str("a\nb".to_string()),
                TokenKind::Str("xABA".to_string()),
                TokenKind::Str("onetwo".to_string()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn scans_triple_quoted_strings() {
        assert_eq!(
            kinds("'''line one\nit's \"quoted\"\n'''"),
            vec![
                TokenKind::Str("line one\nit's \"quoted\"\n".to_string()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn errors_on_unterminated_string() {
        let err = tokenize("x = 'oops\n").expect_err("expected scan failure");
        assert_eq!(err, LexError::UnterminatedString { line: 1 });
    }

    #[test]
    fn errors_on_invalid_character_with_line() {
        let err = tokenize("a = 1\nb = ?\n").expect_err("expected scan failure");
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                character: '?',
                line: 2
            }
        );
    }

    #[test]
    fn errors_on_inconsistent_dedent() {
        let err = tokenize("if a:\n    pass\n  pass\n").expect_err("expected dedent failure");
        assert!(matches!(err, LexError::InconsistentDedent { .. }));
    }

    #[test]
    fn errors_on_integer_overflow() {
        let err = tokenize("99999999999999999999999999\n").expect_err("expected overflow");
        assert!(matches!(err, LexError::InvalidNumber { .. }));
    }
}
