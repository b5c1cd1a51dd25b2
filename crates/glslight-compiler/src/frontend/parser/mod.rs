//! # 構文解析器
//!
//! 字句解析器からのトークン列を受け取り、GLSL ESの文法に基づいて
//! 抽象構文木（AST）を構築する再帰下降パーサーです。
//! 構文エラーは最初の1件で解析を打ち切ります。

use std::collections::HashSet;

use crate::frontend::ast::{
    ExtensionBehavior, ExtensionDirective, ExternalDeclaration, FunctionDefinition, LanguageVersion,
    LayoutDeclaration, PrecisionDeclaration, TranslationUnit,
};
use crate::frontend::error::{Result, SourceLocation, SyntaxError};
use crate::frontend::lexer::token::{Token, TokenKind};

pub mod expression;
pub mod statement;
pub mod types;

/// パーサー
pub struct Parser {
    /// トークン列（ディレクティブを除く、末尾は `Eof`）
    tokens: Vec<Token>,
    /// 現在のトークンインデックス
    current: usize,
    /// これまでに定義された構造体名
    struct_names: HashSet<String>,
}

impl Parser {
    /// 新しいパーサーを作成
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            struct_names: HashSet::new(),
        }
    }

    /// 翻訳単位全体を解析
    pub fn parse_translation_unit(mut self) -> Result<TranslationUnit> {
        let (version, explicit_version) = self.take_version()?;
        let extensions = self.take_extensions()?;

        let mut declarations = Vec::new();
        while !self.is_at_end() {
            declarations.push(self.parse_external_declaration()?);
        }

        Ok(TranslationUnit {
            version,
            explicit_version,
            extensions,
            declarations,
        })
    }

    /// 先頭の `#version` を取り出す
    fn take_version(&mut self) -> Result<(LanguageVersion, bool)> {
        let mut result = (LanguageVersion::Es100, false);
        if let Some(first) = self.tokens.first() {
            if let TokenKind::VersionDirective { number, profile } = &first.kind {
                let version = LanguageVersion::from_directive(*number, profile.as_deref()).ok_or_else(|| {
                    SyntaxError::new(format!("サポートされていないバージョンです: {}", number), first.location)
                })?;
                result = (version, true);
                self.tokens.remove(0);
            }
        }
        if let Some(token) = self
            .tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::VersionDirective { .. }))
        {
            return Err(SyntaxError::new("#version はソースの先頭に記述する必要があります", token.location));
        }
        Ok(result)
    }

    /// `#extension` ディレクティブをすべて取り出す
    fn take_extensions(&mut self) -> Result<Vec<ExtensionDirective>> {
        let mut extensions = Vec::new();
        let mut remaining = Vec::with_capacity(self.tokens.len());
        for token in std::mem::take(&mut self.tokens) {
            match token.kind {
                TokenKind::ExtensionDirective { name, behavior } => {
                    let behavior = ExtensionBehavior::from_keyword(&behavior).ok_or_else(|| {
                        SyntaxError::new(format!("不正な拡張機能の動作指定です: {}", behavior), token.location)
                    })?;
                    extensions.push(ExtensionDirective {
                        name,
                        behavior,
                        location: token.location,
                    });
                }
                _ => remaining.push(token),
            }
        }
        self.tokens = remaining;
        Ok(extensions)
    }

    /// 外部宣言を解析
    fn parse_external_declaration(&mut self) -> Result<ExternalDeclaration> {
        let location = self.peek().location;

        if self.match_token(&TokenKind::PrecisionKeyword) {
            return self.parse_precision_declaration(location).map(ExternalDeclaration::Precision);
        }

        let qualifiers = self.parse_type_qualifiers()?;

        // 修飾子のみの宣言 (`layout(local_size_x=8) in;`)
        if self.match_token(&TokenKind::Semicolon) {
            return Ok(ExternalDeclaration::Layout(LayoutDeclaration { qualifiers, location }));
        }

        // インターフェースブロック
        if let TokenKind::Identifier(name) = &self.peek().kind {
            if !self.struct_names.contains(name) && self.peek_next_is(&TokenKind::LeftBrace) {
                return self
                    .parse_interface_block(qualifiers, location)
                    .map(ExternalDeclaration::InterfaceBlock);
            }
        }

        let specifier = self.parse_type_specifier()?;

        // 構造体定義のみ
        if specifier.struct_definition.is_some() && self.check(&TokenKind::Semicolon) && qualifiers == Default::default() {
            self.advance();
            return specifier
                .struct_definition
                .map(ExternalDeclaration::Struct)
                .ok_or_else(|| SyntaxError::new("構造体定義が必要です", location));
        }

        // 関数プロトタイプ・関数定義
        if matches!(self.peek().kind, TokenKind::Identifier(_)) && self.peek_next_is(&TokenKind::LeftParen) {
            let prototype = self.parse_function_prototype(qualifiers, specifier, location)?;
            if self.match_token(&TokenKind::Semicolon) {
                return Ok(ExternalDeclaration::Prototype(prototype));
            }
            let body = self.parse_block()?;
            return Ok(ExternalDeclaration::Function(FunctionDefinition { prototype, body }));
        }

        let declaration = self.parse_declarators(qualifiers, specifier, location)?;
        Ok(ExternalDeclaration::Variables(declaration))
    }

    /// 既定精度宣言を解析（`precision` の後から）
    fn parse_precision_declaration(&mut self, location: SourceLocation) -> Result<PrecisionDeclaration> {
        let precision = match self.advance().kind {
            TokenKind::PrecisionQualifier(precision) => precision,
            ref other => return Err(self.error_at_previous(format!("精度修飾子が必要です（{}）", other))),
        };
        let ty = match self.advance().kind {
            TokenKind::TypeName(ref ty) => ty.clone(),
            ref other => return Err(self.error_at_previous(format!("型が必要です（{}）", other))),
        };
        self.consume(&TokenKind::Semicolon, "精度宣言の後に ';' が必要です")?;
        Ok(PrecisionDeclaration { precision, ty, location })
    }

    // ---- トークン操作 ----

    /// 現在のトークン
    fn peek(&self) -> &Token {
        let index = self.current.min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    /// n個先のトークンの種類
    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|t| &t.kind)
    }

    /// 次のトークンが指定した種類か
    fn peek_next_is(&self, kind: &TokenKind) -> bool {
        self.peek_kind_at(1) == Some(kind)
    }

    /// 直前のトークン
    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// トークンを1つ進めて返す
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    /// 終端に達したか
    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// 現在のトークンが指定した種類か
    fn check(&self, kind: &TokenKind) -> bool {
        self.peek().is(kind)
    }

    /// 指定した種類なら消費
    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// 指定した種類を要求して消費
    fn consume(&mut self, kind: &TokenKind, message: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("{}（{} が見つかりました）", message, self.peek().kind)))
        }
    }

    /// 識別子を要求して消費
    fn consume_identifier(&mut self, message: &str) -> Result<String> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("{}（{} が見つかりました）", message, other))),
        }
    }

    /// 現在位置の構文エラー
    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.peek().location)
    }

    /// 直前のトークン位置の構文エラー
    fn error_at_previous(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.previous().location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{ExprKind, StmtKind};
    use crate::frontend::lexer::tokenize;

    fn parse(source: &str) -> Result<TranslationUnit> {
        Parser::new(tokenize(source)?).parse_translation_unit()
    }

    #[test]
    fn test_parse_prefix_declarations() {
        let unit = parse(
            "#version 300 es\nprecision mediump float;uniform vec4 vA,vB;layout(location=1)out vec4 V;void main(){V=vA;}",
        )
        .unwrap();
        assert_eq!(unit.version, LanguageVersion::Es300);
        assert_eq!(unit.declarations.len(), 4);
        match &unit.declarations[1] {
            ExternalDeclaration::Variables(decl) => assert_eq!(decl.declarators.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        match &unit.declarations[2] {
            ExternalDeclaration::Variables(decl) => assert_eq!(decl.qualifiers.layout_value("location"), Some(1)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_body() {
        let unit = parse("void main(){float x=1.;x+=2.;}").unwrap();
        let function = unit.functions().next().unwrap();
        assert_eq!(function.body.statements.len(), 2);
        match &function.body.statements[1].kind {
            StmtKind::Expr(expr) => assert!(matches!(expr.kind, ExprKind::Assign { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_extension_directives_collected() {
        let unit = parse("#extension GL_OES_standard_derivatives : enable\nvoid main(){}").unwrap();
        assert_eq!(unit.extensions.len(), 1);
        assert_eq!(unit.extensions[0].behavior, ExtensionBehavior::Enable);
        assert!(!unit.explicit_version);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("void main(){x=;}").is_err());
        assert!(parse("void main(){").is_err());
        assert!(parse("void main(){}\n#version 300 es\n").is_err());
        assert!(parse("#extension GL_X : sometimes\n").is_err());
    }
}
