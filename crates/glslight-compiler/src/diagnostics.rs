//! 診断情報モジュール
//!
//! コンパイラの診断情報（エラー・警告）を表現し、整形して出力するための
//! ユーティリティを提供します。診断情報は常にソース位置順に並べられます。

use std::fmt;

use serde::Serialize;

use crate::frontend::error::SourceLocation;

/// 診断情報の重大度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// エラー
    Error,
    /// 警告
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// 診断コード
///
/// 利用者がメッセージ文言に依存せず診断を判別できるよう、安定した識別子を提供します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    /// 構文エラー
    SyntaxError,
    /// 未宣言の識別子
    UndeclaredIdentifier,
    /// 同一スコープでの再定義
    Redefinition,
    /// サポートされない言語バージョン
    UnsupportedVersion,
    /// このバージョンでは利用できない構文・組み込み
    UnsupportedInVersion,
    /// このシェーダステージでは利用できない構文・組み込み
    UnsupportedInStage,
    /// 型の不一致
    TypeMismatch,
    /// 一致するオーバーロードがない
    NoMatchingOverload,
    /// 不正なコンストラクタ呼び出し
    InvalidConstructor,
    /// 不正なスウィズル
    InvalidSwizzle,
    /// 定数インデックスが範囲外
    IndexOutOfRange,
    /// 代入先が左辺値ではない
    NotAnLValue,
    /// 定数式が必要
    ConstantExpressionRequired,
    /// 不正な修飾子
    InvalidQualifier,
    /// 非定数インデックスが許可されていない
    NonConstantIndexNotSupported,
    /// 非帰納的forループが許可されていない
    NonInductiveForLoopNotSupported,
    /// whileループが許可されていない
    WhileLoopNotSupported,
    /// do-whileループが許可されていない
    DoWhileLoopNotSupported,
    /// リソース制限の超過
    LimitExceeded,
    /// 拡張機能が必要
    ExtensionRequired,
    /// 拡張機能がサポートされていない
    ExtensionNotSupported,
    /// `warn` 指定の拡張機能を使用した
    ExtensionUsed,
    /// 再帰呼び出し
    RecursionNotAllowed,
    /// main関数がない
    MissingMain,
    /// 既定精度が指定されていない
    NoPrecisionSpecified,
    /// サポートされない精度修飾子
    UnsupportedPrecision,
}

impl DiagnosticCode {
    /// コードの文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::SyntaxError => "SyntaxError",
            DiagnosticCode::UndeclaredIdentifier => "UndeclaredIdentifier",
            DiagnosticCode::Redefinition => "Redefinition",
            DiagnosticCode::UnsupportedVersion => "UnsupportedVersion",
            DiagnosticCode::UnsupportedInVersion => "UnsupportedInVersion",
            DiagnosticCode::UnsupportedInStage => "UnsupportedInStage",
            DiagnosticCode::TypeMismatch => "TypeMismatch",
            DiagnosticCode::NoMatchingOverload => "NoMatchingOverload",
            DiagnosticCode::InvalidConstructor => "InvalidConstructor",
            DiagnosticCode::InvalidSwizzle => "InvalidSwizzle",
            DiagnosticCode::IndexOutOfRange => "IndexOutOfRange",
            DiagnosticCode::NotAnLValue => "NotAnLValue",
            DiagnosticCode::ConstantExpressionRequired => "ConstantExpressionRequired",
            DiagnosticCode::InvalidQualifier => "InvalidQualifier",
            DiagnosticCode::NonConstantIndexNotSupported => "NonConstantIndexNotSupported",
            DiagnosticCode::NonInductiveForLoopNotSupported => "NonInductiveForLoopNotSupported",
            DiagnosticCode::WhileLoopNotSupported => "WhileLoopNotSupported",
            DiagnosticCode::DoWhileLoopNotSupported => "DoWhileLoopNotSupported",
            DiagnosticCode::LimitExceeded => "LimitExceeded",
            DiagnosticCode::ExtensionRequired => "ExtensionRequired",
            DiagnosticCode::ExtensionNotSupported => "ExtensionNotSupported",
            DiagnosticCode::ExtensionUsed => "ExtensionUsed",
            DiagnosticCode::RecursionNotAllowed => "RecursionNotAllowed",
            DiagnosticCode::MissingMain => "MissingMain",
            DiagnosticCode::NoPrecisionSpecified => "NoPrecisionSpecified",
            DiagnosticCode::UnsupportedPrecision => "UnsupportedPrecision",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 診断情報
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// 重大度
    pub severity: Severity,
    /// コード
    pub code: DiagnosticCode,
    /// メッセージ
    pub message: String,
    /// ソース位置
    pub location: SourceLocation,
}

impl Diagnostic {
    /// 新しい診断情報を作成
    pub fn new(
        severity: Severity,
        code: DiagnosticCode,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location,
        }
    }

    /// エラーを作成
    pub fn error(code: DiagnosticCode, message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(Severity::Error, code, message, location)
    }

    /// 警告を作成
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(Severity::Warning, code, message, location)
    }

    /// エラーかどうか
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: [{}] {}",
            self.severity, self.location, self.code, self.message
        )
    }
}

/// 診断情報の集約器
///
/// 各フェーズで発見された診断情報を集め、ソース位置順に整列して返します。
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    /// 空の集約器を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 診断情報を追加
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// エラーを追加
    pub fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, location: SourceLocation) {
        self.push(Diagnostic::error(code, message, location));
    }

    /// 警告を追加
    pub fn warning(&mut self, code: DiagnosticCode, message: impl Into<String>, location: SourceLocation) {
        self.push(Diagnostic::warning(code, message, location));
    }

    /// 複数の診断情報を追加
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// エラーが存在するかどうか
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// 件数
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// ソース位置順に安定ソートして取り出す
    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        sort_diagnostics(&mut self.diagnostics);
        self.diagnostics
    }
}

/// 診断情報をソース位置順に安定ソート
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|d| d.location);
}

/// 診断情報をANGLE互換のinfo log形式で整形
pub fn render_info_log(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        out.push_str(&diagnostic.to_string());
        out.push('\n');
    }
    out
}
