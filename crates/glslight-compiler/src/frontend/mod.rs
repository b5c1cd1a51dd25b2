//! # GLSL ES フロントエンド
//!
//! シェーダソースから型付きの抽象構文木（AST）を生成します。
//!
//! ## 解析フェーズ
//! 1. 字句解析（[`lexer`]）
//! 2. 構文解析（[`parser`]）
//! 3. 名前解決と型付け（[`semantic`]）
//!
//! オーケストレータは [`SourceParser`] トレイトを通してのみフロントエンドを使用するため、
//! 別の構文解析器に差し替えることができます。

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::limits::ResourceLimits;

pub mod ast;
pub mod builtins;
pub mod error;
pub mod extensions;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod types;

use self::ast::{LanguageVersion, TranslationUnit};
use self::lexer::token::TokenKind;

/// シェーダステージ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    /// 頂点シェーダ
    Vertex,
    /// フラグメントシェーダ
    #[default]
    Fragment,
    /// コンピュートシェーダ
    Compute,
}

impl ShaderStage {
    /// ファイル拡張子（`.vert` / `.frag` / `.comp`）からステージを推定
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "vert" => Some(ShaderStage::Vertex),
            "frag" => Some(ShaderStage::Fragment),
            "comp" => Some(ShaderStage::Compute),
            _ => None,
        }
    }

    /// 文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShaderStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vertex" | "vert" => Ok(ShaderStage::Vertex),
            "fragment" | "frag" => Ok(ShaderStage::Fragment),
            "compute" | "comp" => Ok(ShaderStage::Compute),
            _ => Err(format!("不明なシェーダステージです: {}", s)),
        }
    }
}

/// 構文解析の結果
#[derive(Debug, Clone)]
pub struct ParseOutput {
    /// 型付きのAST
    pub unit: TranslationUnit,
    /// 名前解決で見つかった致命的でない診断情報
    pub diagnostics: Vec<Diagnostic>,
}

/// 構文解析器のインターフェース
///
/// 解析に失敗した場合は、ASTの代わりに診断情報の列を返します。
pub trait SourceParser: Send + Sync {
    /// ソースを解析して型付きのASTを生成
    fn parse(&self, source: &str, stage: ShaderStage, limits: &ResourceLimits) -> Result<ParseOutput, Vec<Diagnostic>>;
}

/// 組み込みのGLSL ES構文解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct GlslParser;

impl GlslParser {
    /// 新しい構文解析器を作成
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for GlslParser {
    fn parse(&self, source: &str, stage: ShaderStage, limits: &ResourceLimits) -> Result<ParseOutput, Vec<Diagnostic>> {
        let tokens = lexer::tokenize(source).map_err(|e| vec![Diagnostic::from(e)])?;

        if let Some(first) = tokens.first() {
            if let TokenKind::VersionDirective { number, profile } = &first.kind {
                if LanguageVersion::from_directive(*number, profile.as_deref()).is_none() {
                    return Err(vec![Diagnostic::error(
                        DiagnosticCode::UnsupportedVersion,
                        format!("サポートされていないバージョンです: {}", number),
                        first.location,
                    )]);
                }
            }
        }

        let mut unit = parser::Parser::new(tokens)
            .parse_translation_unit()
            .map_err(|e| vec![Diagnostic::from(e)])?;
        let diagnostics = semantic::resolve(&mut unit, limits);
        debug!(
            "{} シェーダを解析しました ({}, {} 件の診断)",
            stage,
            unit.version,
            diagnostics.len()
        );
        Ok(ParseOutput { unit, diagnostics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_from_path() {
        assert_eq!(ShaderStage::from_path(Path::new("a/b.vert")), Some(ShaderStage::Vertex));
        assert_eq!(ShaderStage::from_path(Path::new("x.comp")), Some(ShaderStage::Compute));
        assert_eq!(ShaderStage::from_path(Path::new("x.glsl")), None);
        assert_eq!("frag".parse::<ShaderStage>(), Ok(ShaderStage::Fragment));
    }

    #[test]
    fn test_unsupported_version() {
        let errors = GlslParser::new()
            .parse("#version 450\nvoid main(){}", ShaderStage::Fragment, &ResourceLimits::default())
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, DiagnosticCode::UnsupportedVersion);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let errors = GlslParser::new()
            .parse("void main(){ float x = ; }", ShaderStage::Fragment, &ResourceLimits::default())
            .unwrap_err();
        assert_eq!(errors[0].code, DiagnosticCode::SyntaxError);
    }
}
