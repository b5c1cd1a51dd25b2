//! # フロントエンドのエラー定義
//!
//! ソース位置情報と、字句解析・構文解析で発生する致命的な構文エラーを定義します。
//! 構文エラーは解析を打ち切りますが、オーケストレータでは
//! [`Diagnostic`](crate::diagnostics::Diagnostic) に変換されて報告されます。

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, DiagnosticCode};

/// ソースコード内の位置情報
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SourceLocation {
    /// 行番号（1から始まる）
    pub line: usize,
    /// 列番号（1から始まる）
    pub column: usize,
    /// 位置のバイトオフセット
    pub offset: usize,
}

impl SourceLocation {
    /// 新しい位置情報を作成
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl PartialOrd for SourceLocation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceLocation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.offset, self.line, self.column).cmp(&(other.offset, other.line, other.column))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// 構文エラー
///
/// 字句解析器・構文解析器はこのエラーを最初の1件で返して解析を終了します。
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{location}: {message}")]
pub struct SyntaxError {
    /// エラーメッセージ
    pub message: String,
    /// 発生位置
    pub location: SourceLocation,
}

impl SyntaxError {
    /// 新しい構文エラーを作成
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl From<SyntaxError> for Diagnostic {
    fn from(error: SyntaxError) -> Self {
        Diagnostic::error(DiagnosticCode::SyntaxError, error.message, error.location)
    }
}

/// フロントエンドの結果型
pub type Result<T> = std::result::Result<T, SyntaxError>;
