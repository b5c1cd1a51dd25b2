//! # トークン定義
//!
//! GLSL ESのレキサーが生成するトークンの定義を提供します。
//! 型キーワードは解決済みの [`Type`] を、ディレクティブは解析済みの内容を保持します。

use std::fmt;

use crate::frontend::error::SourceLocation;
use crate::frontend::types::{Precision, Type};

/// トークンの種類
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // 識別子とリテラル
    /// 識別子
    Identifier(String),
    /// 型キーワード（float, vec4, sampler2D など）
    TypeName(Type),
    /// 符号付き整数リテラル（32ビットのビットパターン）
    IntLiteral(u32),
    /// 符号なし整数リテラル（`u` サフィックス付き）
    UIntLiteral(u32),
    /// 浮動小数点リテラル
    FloatLiteral(f32),
    /// true
    TrueLiteral,
    /// false
    FalseLiteral,

    // ディレクティブ
    /// `#version`
    VersionDirective {
        /// バージョン番号
        number: u32,
        /// プロファイル（`es` など）
        profile: Option<String>,
    },
    /// `#extension name : behavior`
    ExtensionDirective {
        /// 拡張機能名
        name: String,
        /// 動作指定
        behavior: String,
    },

    // 区切り記号
    /// 左括弧 (
    LeftParen,
    /// 右括弧 )
    RightParen,
    /// 左波括弧 {
    LeftBrace,
    /// 右波括弧 }
    RightBrace,
    /// 左角括弧 [
    LeftBracket,
    /// 右角括弧 ]
    RightBracket,
    /// コンマ ,
    Comma,
    /// ドット .
    Dot,
    /// セミコロン ;
    Semicolon,
    /// コロン :
    Colon,
    /// 疑問符 ?
    Question,

    // 演算子
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// ^
    Caret,
    /// &
    Ampersand,
    /// |
    Pipe,
    /// ~
    Tilde,
    /// !
    Bang,
    /// =
    Equal,
    /// <
    Less,
    /// >
    Greater,
    /// +=
    PlusEqual,
    /// -=
    MinusEqual,
    /// *=
    StarEqual,
    /// /=
    SlashEqual,
    /// %=
    PercentEqual,
    /// ^=
    CaretEqual,
    /// &=
    AmpersandEqual,
    /// |=
    PipeEqual,
    /// <<=
    LeftShiftEqual,
    /// >>=
    RightShiftEqual,
    /// !=
    BangEqual,
    /// ==
    EqualEqual,
    /// <=
    LessEqual,
    /// >=
    GreaterEqual,
    /// &&
    AmpersandAmpersand,
    /// ||
    PipePipe,
    /// ^^
    CaretCaret,
    /// ++
    PlusPlus,
    /// --
    MinusMinus,
    /// <<
    LeftShift,
    /// >>
    RightShift,

    // キーワード
    /// const
    Const,
    /// uniform
    Uniform,
    /// buffer
    Buffer,
    /// shared
    Shared,
    /// attribute
    Attribute,
    /// varying
    Varying,
    /// in
    In,
    /// out
    Out,
    /// inout
    InOut,
    /// centroid
    Centroid,
    /// flat
    Flat,
    /// smooth
    Smooth,
    /// invariant
    Invariant,
    /// layout
    Layout,
    /// lowp / mediump / highp
    PrecisionQualifier(Precision),
    /// precision
    PrecisionKeyword,
    /// struct
    Struct,
    /// if
    If,
    /// else
    Else,
    /// for
    For,
    /// while
    While,
    /// do
    Do,
    /// switch
    Switch,
    /// case
    Case,
    /// default
    Default,
    /// break
    Break,
    /// continue
    Continue,
    /// return
    Return,
    /// discard
    Discard,

    /// ファイル終端
    Eof,
}

impl TokenKind {
    /// 型修飾子の開始になりうるかどうか
    pub fn is_qualifier(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Const
                | Uniform
                | Buffer
                | Shared
                | Attribute
                | Varying
                | In
                | Out
                | InOut
                | Centroid
                | Flat
                | Smooth
                | Invariant
                | Layout
                | PrecisionQualifier(_)
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        match self {
            Identifier(name) => write!(f, "識別子 '{}'", name),
            TypeName(ty) => write!(f, "型 '{}'", ty),
            IntLiteral(value) => write!(f, "整数リテラル {}", value),
            UIntLiteral(value) => write!(f, "整数リテラル {}u", value),
            FloatLiteral(value) => write!(f, "浮動小数点リテラル {}", value),
            TrueLiteral => write!(f, "true"),
            FalseLiteral => write!(f, "false"),
            VersionDirective { number, .. } => write!(f, "#version {}", number),
            ExtensionDirective { name, .. } => write!(f, "#extension {}", name),

            LeftParen => write!(f, "("),
            RightParen => write!(f, ")"),
            LeftBrace => write!(f, "{{"),
            RightBrace => write!(f, "}}"),
            LeftBracket => write!(f, "["),
            RightBracket => write!(f, "]"),
            Comma => write!(f, ","),
            Dot => write!(f, "."),
            Semicolon => write!(f, ";"),
            Colon => write!(f, ":"),
            Question => write!(f, "?"),

            Plus => write!(f, "+"),
            Minus => write!(f, "-"),
            Star => write!(f, "*"),
            Slash => write!(f, "/"),
            Percent => write!(f, "%"),
            Caret => write!(f, "^"),
            Ampersand => write!(f, "&"),
            Pipe => write!(f, "|"),
            Tilde => write!(f, "~"),
            Bang => write!(f, "!"),
            Equal => write!(f, "="),
            Less => write!(f, "<"),
            Greater => write!(f, ">"),
            PlusEqual => write!(f, "+="),
            MinusEqual => write!(f, "-="),
            StarEqual => write!(f, "*="),
            SlashEqual => write!(f, "/="),
            PercentEqual => write!(f, "%="),
            CaretEqual => write!(f, "^="),
            AmpersandEqual => write!(f, "&="),
            PipeEqual => write!(f, "|="),
            LeftShiftEqual => write!(f, "<<="),
            RightShiftEqual => write!(f, ">>="),
            BangEqual => write!(f, "!="),
            EqualEqual => write!(f, "=="),
            LessEqual => write!(f, "<="),
            GreaterEqual => write!(f, ">="),
            AmpersandAmpersand => write!(f, "&&"),
            PipePipe => write!(f, "||"),
            CaretCaret => write!(f, "^^"),
            PlusPlus => write!(f, "++"),
            MinusMinus => write!(f, "--"),
            LeftShift => write!(f, "<<"),
            RightShift => write!(f, ">>"),

            Const => write!(f, "const"),
            Uniform => write!(f, "uniform"),
            Buffer => write!(f, "buffer"),
            Shared => write!(f, "shared"),
            Attribute => write!(f, "attribute"),
            Varying => write!(f, "varying"),
            In => write!(f, "in"),
            Out => write!(f, "out"),
            InOut => write!(f, "inout"),
            Centroid => write!(f, "centroid"),
            Flat => write!(f, "flat"),
            Smooth => write!(f, "smooth"),
            Invariant => write!(f, "invariant"),
            Layout => write!(f, "layout"),
            PrecisionQualifier(precision) => write!(f, "{}", precision.as_str()),
            PrecisionKeyword => write!(f, "precision"),
            Struct => write!(f, "struct"),
            If => write!(f, "if"),
            Else => write!(f, "else"),
            For => write!(f, "for"),
            While => write!(f, "while"),
            Do => write!(f, "do"),
            Switch => write!(f, "switch"),
            Case => write!(f, "case"),
            Default => write!(f, "default"),
            Break => write!(f, "break"),
            Continue => write!(f, "continue"),
            Return => write!(f, "return"),
            Discard => write!(f, "discard"),

            Eof => write!(f, "EOF"),
        }
    }
}

/// トークン
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// トークンの種類
    pub kind: TokenKind,
    /// ソース上の位置
    pub location: SourceLocation,
}

impl Token {
    /// 新しいトークンを作成
    pub fn new(kind: TokenKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }

    /// トークンが指定した種類かどうかを判定
    pub fn is(&self, kind: &TokenKind) -> bool {
        &self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.location)
    }
}

/// 予約語（使用するとエラー）
const RESERVED_WORDS: &[&str] = &[
    "asm", "class", "union", "enum", "typedef", "template", "this", "resource", "goto", "inline",
    "noinline", "public", "static", "extern", "external", "interface", "long", "short", "double",
    "half", "fixed", "unsigned", "superp", "input", "output", "hvec2", "hvec3", "hvec4", "dvec2",
    "dvec3", "dvec4", "fvec2", "fvec3", "fvec4", "sampler3DRect", "filter", "sizeof", "cast",
    "namespace", "using", "volatile", "patch", "sample", "subroutine", "common", "partition",
    "active", "noperspective", "atomic_uint", "coherent", "restrict", "readonly", "writeonly",
    "precise", "image2D", "iimage2D", "uimage2D", "image3D", "iimage3D", "uimage3D", "imageCube",
    "iimageCube", "uimageCube", "image2DArray", "iimage2DArray", "uimage2DArray",
];

/// 予約語かどうか
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

/// キーワードの文字列からTokenKindへの変換
pub fn lookup_keyword(identifier: &str) -> TokenKind {
    match identifier {
        "const" => TokenKind::Const,
        "uniform" => TokenKind::Uniform,
        "buffer" => TokenKind::Buffer,
        "shared" => TokenKind::Shared,
        "attribute" => TokenKind::Attribute,
        "varying" => TokenKind::Varying,
        "in" => TokenKind::In,
        "out" => TokenKind::Out,
        "inout" => TokenKind::InOut,
        "centroid" => TokenKind::Centroid,
        "flat" => TokenKind::Flat,
        "smooth" => TokenKind::Smooth,
        "invariant" => TokenKind::Invariant,
        "layout" => TokenKind::Layout,
        "precision" => TokenKind::PrecisionKeyword,
        "struct" => TokenKind::Struct,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "do" => TokenKind::Do,
        "switch" => TokenKind::Switch,
        "case" => TokenKind::Case,
        "default" => TokenKind::Default,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "return" => TokenKind::Return,
        "discard" => TokenKind::Discard,
        "true" => TokenKind::TrueLiteral,
        "false" => TokenKind::FalseLiteral,
        _ => {
            if let Some(precision) = Precision::from_keyword(identifier) {
                TokenKind::PrecisionQualifier(precision)
            } else if let Some(ty) = Type::from_keyword(identifier) {
                TokenKind::TypeName(ty)
            } else {
                TokenKind::Identifier(identifier.to_string())
            }
        }
    }
}
