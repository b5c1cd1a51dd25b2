// glslight Compiler Library
// GLSL ESシェーダの検証・最適化ライブラリ

//! # glslight Compiler
//!
//! GLSL ES（`100`、`300 es`、`310 es`）シェーダのコンパイラフロントエンドです。
//! ソースを解析し、プラットフォームのリソース制限テーブルに照らして検証し、
//! 意味を変えない局所的な書き換えでASTを最適化してから、ソーステキストとして再出力します。
//!
//! ```
//! use std::sync::Arc;
//! use glslight_compiler::{CompileRequest, Compiler, ResourceLimits};
//!
//! let compiler = Compiler::new(Arc::new(ResourceLimits::default()));
//! let source = "#version 300 es\nprecision mediump float;uniform vec4 vA;out vec4 P;void main(){P.x=vA.x+0.;}";
//! let result = compiler.compile(&CompileRequest::new(source));
//! assert!(!result.has_errors());
//! assert!(result.output.unwrap().ends_with("void main(){P.x=vA.x;}"));
//! ```

// 内部モジュールの宣言
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod emitter;
pub mod error;
pub mod frontend;
pub mod limits;
pub mod optimizer;
pub mod validator;

// 再エクスポート
pub use self::config::CompilerConfig;
pub use self::diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use self::driver::{CompileMode, CompileRequest, CompileResult, CompileStage, Compiler};
pub use self::emitter::{EmitOptions, GlslEmitter, SourceEmitter};
pub use self::error::{ConfigError, Result};
pub use self::frontend::{ast, GlslParser, ShaderStage, SourceParser};
pub use self::limits::{LimitKey, LimitOverrides, LimitValue, ResourceLimits};
pub use self::optimizer::{OptimizationReport, Optimizer, OptimizerOptions, RelationalNegation, RewriteRule};
pub use self::validator::Validator;

/// バージョン情報
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
