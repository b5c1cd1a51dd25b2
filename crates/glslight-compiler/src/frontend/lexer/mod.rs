//! # レキサー（字句解析器）
//!
//! GLSL ESのソースコードを字句解析し、トークン列に変換するモジュールです。
//! マクロプリプロセッサは持たず、`#version`・`#extension`・`#pragma` 以外の
//! ディレクティブは構文エラーとして扱います。

use std::iter::Peekable;
use std::str::Chars;

use crate::frontend::error::{Result, SourceLocation, SyntaxError};
use token::{is_reserved_word, lookup_keyword, Token, TokenKind};

pub mod token;

/// レキサー
pub struct Lexer<'a> {
    /// 文字イテレータ
    chars: Peekable<Chars<'a>>,
    /// 現在のバイト位置
    position: usize,
    /// 現在の行番号（1から始まる）
    line: usize,
    /// 現在の列番号（1から始まる）
    column: usize,
    /// 現在のトークンの開始位置
    start: SourceLocation,
    /// 現在の行でまだトークンが出現していないか
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    /// 新しいレキサーを作成
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            position: 0,
            line: 1,
            column: 1,
            start: SourceLocation::new(1, 1, 0),
            at_line_start: true,
        }
    }

    /// 次のトークンを取得
    pub fn next_token(&mut self) -> Result<Token> {
        loop {
            self.skip_trivia()?;
            self.start = self.current_location();

            let c = match self.chars.peek() {
                Some(&c) => c,
                None => return Ok(self.make_token(TokenKind::Eof)),
            };

            if c == '#' {
                if !self.at_line_start {
                    return Err(self.error("'#' は行頭でのみ使用できます"));
                }
                self.advance();
                match self.directive()? {
                    Some(kind) => return Ok(self.make_token(kind)),
                    None => continue,
                }
            }

            self.at_line_start = false;
            self.advance();

            if is_alpha(c) {
                return self.identifier(c);
            }
            if c.is_ascii_digit() || (c == '.' && self.peek_is(|n| n.is_ascii_digit())) {
                return self.number(c);
            }
            return self.operator(c);
        }
    }

    /// 記号・演算子の解析
    fn operator(&mut self, c: char) -> Result<Token> {
        let kind = match c {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            '~' => TokenKind::Tilde,
            '+' => {
                if self.match_char('+') {
                    TokenKind::PlusPlus
                } else if self.match_char('=') {
                    TokenKind::PlusEqual
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.match_char('-') {
                    TokenKind::MinusMinus
                } else if self.match_char('=') {
                    TokenKind::MinusEqual
                } else {
                    TokenKind::Minus
                }
            }
            '*' => self.with_equal(TokenKind::StarEqual, TokenKind::Star),
            '/' => self.with_equal(TokenKind::SlashEqual, TokenKind::Slash),
            '%' => self.with_equal(TokenKind::PercentEqual, TokenKind::Percent),
            '=' => self.with_equal(TokenKind::EqualEqual, TokenKind::Equal),
            '!' => self.with_equal(TokenKind::BangEqual, TokenKind::Bang),
            '<' => {
                if self.match_char('=') {
                    TokenKind::LessEqual
                } else if self.match_char('<') {
                    self.with_equal(TokenKind::LeftShiftEqual, TokenKind::LeftShift)
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.match_char('=') {
                    TokenKind::GreaterEqual
                } else if self.match_char('>') {
                    self.with_equal(TokenKind::RightShiftEqual, TokenKind::RightShift)
                } else {
                    TokenKind::Greater
                }
            }
            '&' => {
                if self.match_char('&') {
                    TokenKind::AmpersandAmpersand
                } else {
                    self.with_equal(TokenKind::AmpersandEqual, TokenKind::Ampersand)
                }
            }
            '|' => {
                if self.match_char('|') {
                    TokenKind::PipePipe
                } else {
                    self.with_equal(TokenKind::PipeEqual, TokenKind::Pipe)
                }
            }
            '^' => {
                if self.match_char('^') {
                    TokenKind::CaretCaret
                } else {
                    self.with_equal(TokenKind::CaretEqual, TokenKind::Caret)
                }
            }
            _ => return Err(self.error(format!("不明な文字です: '{}'", c))),
        };
        Ok(self.make_token(kind))
    }

    fn with_equal(&mut self, if_equal: TokenKind, otherwise: TokenKind) -> TokenKind {
        if self.match_char('=') {
            if_equal
        } else {
            otherwise
        }
    }

    /// 識別子またはキーワードの解析
    fn identifier(&mut self, first: char) -> Result<Token> {
        let mut ident = first.to_string();
        while let Some(&c) = self.chars.peek() {
            if is_alpha(c) || c.is_ascii_digit() {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if is_reserved_word(&ident) {
            return Err(self.error(format!("予約語 '{}' は使用できません", ident)));
        }
        if ident.contains("__") {
            return Err(self.error(format!("'__' を含む識別子は予約されています: '{}'", ident)));
        }
        Ok(self.make_token(lookup_keyword(&ident)))
    }

    /// 数値リテラルの解析
    fn number(&mut self, first: char) -> Result<Token> {
        let mut text = first.to_string();
        let mut is_float = first == '.';

        // 16進数
        if first == '0' && self.peek_is(|c| c == 'x' || c == 'X') {
            self.advance();
            let mut digits = String::new();
            while let Some(&c) = self.chars.peek() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            if digits.is_empty() {
                return Err(self.error("16進数リテラルに数字がありません"));
            }
            let value = u32::from_str_radix(&digits, 16)
                .map_err(|_| self.error(format!("整数リテラルが大きすぎます: 0x{}", digits)))?;
            return self.integer_suffix(value);
        }

        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else if c == '.' && !is_float {
                is_float = true;
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // 指数部分 (1e10, 1.5e-3 など)
        if self.peek_is(|c| c == 'e' || c == 'E') {
            is_float = true;
            text.push('e');
            self.advance();
            if let Some(&sign) = self.chars.peek() {
                if sign == '+' || sign == '-' {
                    text.push(sign);
                    self.advance();
                }
            }
            let mut has_digit = false;
            while let Some(&c) = self.chars.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                    has_digit = true;
                } else {
                    break;
                }
            }
            if !has_digit {
                return Err(self.error("指数部分に数字がありません"));
            }
        }

        if is_float {
            let value: f32 = text
                .parse()
                .map_err(|_| self.error(format!("不正な浮動小数点リテラルです: {}", text)))?;
            if self.peek_is(is_alpha) {
                return Err(self.error(format!("浮動小数点リテラルの後に不正な文字があります: {}", text)));
            }
            return Ok(self.make_token(TokenKind::FloatLiteral(value)));
        }

        // 先頭が0の整数は8進数
        let value = if text.len() > 1 && text.starts_with('0') {
            u32::from_str_radix(&text[1..], 8)
                .map_err(|_| self.error(format!("不正な8進数リテラルです: {}", text)))?
        } else {
            text.parse::<u32>()
                .map_err(|_| self.error(format!("整数リテラルが大きすぎます: {}", text)))?
        };
        self.integer_suffix(value)
    }

    fn integer_suffix(&mut self, value: u32) -> Result<Token> {
        if self.match_char('u') || self.match_char('U') {
            return Ok(self.make_token(TokenKind::UIntLiteral(value)));
        }
        if self.peek_is(is_alpha) {
            return Err(self.error("整数リテラルの後に不正な文字があります"));
        }
        Ok(self.make_token(TokenKind::IntLiteral(value)))
    }

    /// ディレクティブの解析（`#` の直後から行末まで）
    ///
    /// `#pragma` と空ディレクティブは読み捨てて `None` を返します。
    fn directive(&mut self) -> Result<Option<TokenKind>> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.advance();
        }
        let text = strip_line_comment(&text);
        let mut words = text.split_whitespace();

        match words.next() {
            None => Ok(None),
            Some("pragma") => Ok(None),
            Some("version") => {
                let number = words
                    .next()
                    .and_then(|word| word.parse::<u32>().ok())
                    .ok_or_else(|| self.error("#version にはバージョン番号が必要です"))?;
                let profile = words.next().map(str::to_string);
                if words.next().is_some() {
                    return Err(self.error("#version の後に余分なトークンがあります"));
                }
                Ok(Some(TokenKind::VersionDirective { number, profile }))
            }
            Some("extension") => {
                let rest: String = words.collect::<Vec<_>>().join(" ");
                let (name, behavior) = rest
                    .split_once(':')
                    .map(|(name, behavior)| (name.trim(), behavior.trim()))
                    .filter(|(name, behavior)| !name.is_empty() && !behavior.is_empty())
                    .ok_or_else(|| self.error("#extension の書式は `#extension name : behavior` です"))?;
                Ok(Some(TokenKind::ExtensionDirective {
                    name: name.to_string(),
                    behavior: behavior.to_string(),
                }))
            }
            Some(other) => Err(self.error(format!(
                "サポートされていないプリプロセッサ指令です: #{}",
                other
            ))),
        }
    }

    /// 空白とコメントを読み飛ばす
    fn skip_trivia(&mut self) -> Result<()> {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.advance();
            } else if c == '/' {
                let mut lookahead = self.chars.clone();
                lookahead.next();
                match lookahead.peek() {
                    Some('/') => {
                        while let Some(&c) = self.chars.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        let start = self.current_location();
                        self.advance();
                        self.advance();
                        let mut closed = false;
                        while let Some(c) = self.chars.peek().copied() {
                            self.advance();
                            if c == '*' && self.match_char('/') {
                                closed = true;
                                break;
                            }
                        }
                        if !closed {
                            return Err(SyntaxError::new("ブロックコメントが閉じられていません", start));
                        }
                    }
                    _ => break,
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    /// 次の文字が期待した文字なら消費
    fn match_char(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek_is(&mut self, predicate: impl Fn(char) -> bool) -> bool {
        self.chars.peek().map_or(false, |&c| predicate(c))
    }

    /// 1文字進める
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.position)
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.start)
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.start)
    }
}

/// ソース全体をトークン列に変換（末尾は常に `Eof`）
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = token.kind == TokenKind::Eof;
        tokens.push(token);
        if is_eof {
            return Ok(tokens);
        }
    }
}

fn strip_line_comment(text: &str) -> &str {
    match text.find("//") {
        Some(index) => &text[..index],
        None => text,
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::types::{BasicType, Type};

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_declaration() {
        assert_eq!(
            kinds("uniform vec4 vA;"),
            vec![
                TokenKind::Uniform,
                TokenKind::TypeName(Type::vector(BasicType::Float, 4)),
                TokenKind::Identifier("vA".to_string()),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            kinds("0. .5 1e3 1.5e-2 0x1F 017 3u"),
            vec![
                TokenKind::FloatLiteral(0.0),
                TokenKind::FloatLiteral(0.5),
                TokenKind::FloatLiteral(1000.0),
                TokenKind::FloatLiteral(0.015),
                TokenKind::IntLiteral(31),
                TokenKind::IntLiteral(15),
                TokenKind::UIntLiteral(3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("- -x<<=^^"),
            vec![
                TokenKind::Minus,
                TokenKind::Minus,
                TokenKind::Identifier("x".to_string()),
                TokenKind::LeftShiftEqual,
                TokenKind::CaretCaret,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_directives() {
        let tokens = kinds("#version 300 es\n#extension GL_OVR_multiview : require\n#pragma optimize(off)\nfloat");
        assert_eq!(
            tokens[0],
            TokenKind::VersionDirective {
                number: 300,
                profile: Some("es".to_string())
            }
        );
        assert_eq!(
            tokens[1],
            TokenKind::ExtensionDirective {
                name: "GL_OVR_multiview".to_string(),
                behavior: "require".to_string()
            }
        );
        assert_eq!(tokens[2], TokenKind::TypeName(Type::float()));
    }

    #[test]
    fn test_preprocessor_macros_rejected() {
        let error = tokenize("#define X 1\n").unwrap_err();
        assert!(error.message.contains("#define"));
    }

    #[test]
    fn test_reserved_words_rejected() {
        assert!(tokenize("double x;").is_err());
        assert!(tokenize("int a__b;").is_err());
    }

    #[test]
    fn test_comments_and_locations() {
        let tokens = tokenize("// line\n/* block\n */ x").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier("x".to_string()));
        assert_eq!(tokens[0].location.line, 3);
        assert_eq!(tokens[0].location.column, 5);
        assert!(tokenize("/* open").is_err());
    }
}
