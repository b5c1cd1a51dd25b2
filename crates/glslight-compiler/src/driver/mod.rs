//! # コンパイラドライバー
//!
//! コンパイル要求を受け取り、次の段階を順に実行します。
//!
//! `Parsed -> Validated -> (Optimized)? -> Emitted -> (RevalidatedFromText)?`
//!
//! - 検証モード: 解析と検証のみ。出力はありません
//! - 最適化モード: 検証エラーがなければ不動点まで最適化して出力します。
//!   エラーがある場合は、部分出力が許可されているときだけ未最適化のASTを出力します
//! - 出力テキストの再検証は自動では行いません。呼び出し側が
//!   [`Compiler::revalidate`] で明示的に実行します

pub mod compiler;
pub mod options;

pub use self::compiler::{CompileResult, Compiler};
pub use self::options::{CompileMode, CompileRequest, CompileStage};

use std::sync::Arc;

use crate::limits::ResourceLimits;

/// 既定の構文解析器とエミッタで1つのソースをコンパイル
///
/// ```
/// use std::sync::Arc;
/// use glslight_compiler::driver::{compile, CompileRequest};
/// use glslight_compiler::limits::ResourceLimits;
///
/// let source = "#version 300 es\nprecision mediump float;uniform vec4 vA;out vec4 P;void main(){P=vA*1.;}";
/// let result = compile(&CompileRequest::new(source), Arc::new(ResourceLimits::default()));
/// assert!(result.output.unwrap().ends_with("void main(){P=vA;}"));
/// ```
pub fn compile(request: &CompileRequest, limits: Arc<ResourceLimits>) -> CompileResult {
    Compiler::new(limits).compile(request)
}
