//! # コンパイラ
//!
//! 構文解析器・バリデータ・オプティマイザ・エミッタを順に呼び出し、
//! 診断情報と出力テキストを1つの [`CompileResult`] にまとめます。
//!
//! リソース制限テーブルは構築時に受け取った `Arc` を共有するだけで、
//! コンパイル中に変更される状態は持ちません。そのため1つの [`Compiler`] を
//! 複数スレッドから同時に使用できます。

use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::diagnostics::{render_info_log, sort_diagnostics, Diagnostic};
use crate::emitter::{GlslEmitter, SourceEmitter};
use crate::frontend::{GlslParser, SourceParser};
use crate::limits::ResourceLimits;
use crate::optimizer::{OptimizationReport, Optimizer};
use crate::validator::Validator;

use super::options::{CompileMode, CompileRequest, CompileStage};

/// コンパイル結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileResult {
    /// ソース位置順の診断情報
    pub diagnostics: Vec<Diagnostic>,
    /// 出力テキスト（検証モードやエラー時は `None`）
    pub output: Option<String>,
    /// 到達した段階
    pub stage: CompileStage,
    /// 最適化の統計
    pub optimization: Option<OptimizationReport>,
}

impl CompileResult {
    fn rejected(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            diagnostics,
            output: None,
            stage: CompileStage::Rejected,
            optimization: None,
        }
    }

    /// エラーが含まれるか
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// エラーのみ
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// 警告のみ
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// 診断情報をinfo log形式の文字列にする
    pub fn info_log(&self) -> String {
        render_info_log(&self.diagnostics)
    }
}

/// コンパイラ
pub struct Compiler {
    parser: Box<dyn SourceParser>,
    emitter: Box<dyn SourceEmitter>,
    limits: Arc<ResourceLimits>,
}

impl Compiler {
    /// 組み込みの構文解析器とエミッタでコンパイラを作成
    pub fn new(limits: Arc<ResourceLimits>) -> Self {
        Self::with_collaborators(Box::new(GlslParser::new()), Box::new(GlslEmitter::new()), limits)
    }

    /// 構文解析器とエミッタを指定してコンパイラを作成
    pub fn with_collaborators(
        parser: Box<dyn SourceParser>,
        emitter: Box<dyn SourceEmitter>,
        limits: Arc<ResourceLimits>,
    ) -> Self {
        Self { parser, emitter, limits }
    }

    /// リソース制限テーブル
    pub fn limits(&self) -> &Arc<ResourceLimits> {
        &self.limits
    }

    /// 1つの要求をコンパイル
    pub fn compile(&self, request: &CompileRequest) -> CompileResult {
        let name = request.display_name();
        info!("{}: {} シェーダを解析しています", name, request.stage);

        let parsed = match self.parser.parse(&request.source, request.stage, &self.limits) {
            Ok(parsed) => parsed,
            Err(mut diagnostics) => {
                sort_diagnostics(&mut diagnostics);
                info!("{}: 構文解析に失敗しました ({} 件の診断)", name, diagnostics.len());
                return CompileResult::rejected(diagnostics);
            }
        };
        let mut unit = parsed.unit;
        let mut diagnostics = parsed.diagnostics;

        diagnostics.extend(Validator::new(&self.limits, request.stage).validate(&unit));
        sort_diagnostics(&mut diagnostics);
        let has_errors = diagnostics.iter().any(Diagnostic::is_error);
        info!(
            "{}: 検証しました (エラー {} 件, 警告 {} 件)",
            name,
            diagnostics.iter().filter(|d| d.is_error()).count(),
            diagnostics.iter().filter(|d| !d.is_error()).count()
        );

        let mut result = CompileResult {
            diagnostics,
            output: None,
            stage: CompileStage::Validated,
            optimization: None,
        };
        if request.mode == CompileMode::Validate {
            return result;
        }

        if has_errors {
            if !request.allow_partial_output {
                info!("{}: 検証エラーのため出力を保留します", name);
                return result;
            }
            warn!("{}: 検証エラーがありますが、最適化せずに出力します", name);
        } else {
            let report = Optimizer::new(request.optimizer.clone()).optimize(&mut unit);
            info!(
                "{}: 最適化しました ({} パス, {} 件の書き換え)",
                name, report.passes, report.rewrites
            );
            result.optimization = Some(report);
            result.stage = CompileStage::Optimized;
        }

        let text = self.emitter.emit(&unit, &request.emit);
        info!("{}: {} バイトを出力しました", name, text.len());
        result.output = Some(text);
        result.stage = CompileStage::Emitted;
        result
    }

    /// 出力テキストを同じ制限テーブルで再解析・再検証する
    ///
    /// 出力がない結果に対しては `None` を返します。
    pub fn revalidate(&self, result: &CompileResult, request: &CompileRequest) -> Option<CompileResult> {
        let text = result.output.as_ref()?;
        let name = request.display_name();
        info!("{}: 出力テキストを再検証しています", name);

        let diagnostics = match self.parser.parse(text, request.stage, &self.limits) {
            Ok(parsed) => {
                let mut diagnostics = parsed.diagnostics;
                diagnostics.extend(Validator::new(&self.limits, request.stage).validate(&parsed.unit));
                diagnostics
            }
            Err(diagnostics) => diagnostics,
        };
        let mut diagnostics = diagnostics;
        sort_diagnostics(&mut diagnostics);
        if diagnostics.iter().any(Diagnostic::is_error) {
            warn!("{}: 出力テキストの再検証でエラーが見つかりました", name);
        }

        Some(CompileResult {
            diagnostics,
            output: Some(text.clone()),
            stage: CompileStage::RevalidatedFromText,
            optimization: result.optimization.clone(),
        })
    }

    /// 独立した複数の要求を並列にコンパイル（結果は要求と同じ順序）
    pub fn compile_batch(&self, requests: &[CompileRequest]) -> Vec<CompileResult> {
        debug!("{} 件の要求をバッチでコンパイルします", requests.len());
        requests.par_iter().map(|request| self.compile(request)).collect()
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(Arc::new(ResourceLimits::default()))
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCode;
    use crate::emitter::EmitOptions;
    use crate::frontend::ShaderStage;

    const HEADER: &str = "#version 300 es\nprecision mediump float;uniform vec4 vA,vB;out vec4 P;";

    fn request(body: &str) -> CompileRequest {
        CompileRequest::new(format!("{}{}", HEADER, body))
    }

    #[test]
    fn test_optimize_mode_emits_optimized_text() {
        let compiler = Compiler::default();
        let result = compiler.compile(&request("void main(){P.x=+P.y;}"));
        assert!(!result.has_errors(), "{}", result.info_log());
        assert_eq!(result.stage, CompileStage::Emitted);
        assert_eq!(result.output.as_deref(), Some(format!("{}void main(){{P.x=P.y;}}", HEADER).as_str()));
        let report = result.optimization.unwrap();
        assert!(report.reached_fixpoint);
        assert_eq!(report.rewrites, 1);
    }

    #[test]
    fn test_validate_mode_has_no_output() {
        let compiler = Compiler::default();
        let result = compiler.compile(&request("void main(){P=vA;}").with_mode(CompileMode::Validate));
        assert_eq!(result.stage, CompileStage::Validated);
        assert!(result.output.is_none());
        assert!(result.optimization.is_none());
    }

    #[test]
    fn test_syntax_error_rejects() {
        let compiler = Compiler::default();
        let result = compiler.compile(&request("void main(){P=;}"));
        assert_eq!(result.stage, CompileStage::Rejected);
        assert!(result.has_errors());
        assert_eq!(result.errors().next().map(|d| d.code), Some(DiagnosticCode::SyntaxError));
    }

    #[test]
    fn test_partial_output_skips_optimizer() {
        let compiler = Compiler::default();
        let body = "void main(){P.x=+P.y;P=undeclared;}";
        let withheld = compiler.compile(&request(body));
        assert!(withheld.has_errors());
        assert!(withheld.output.is_none());
        assert_eq!(withheld.stage, CompileStage::Validated);

        let partial = compiler.compile(&request(body).with_partial_output(true));
        assert_eq!(partial.stage, CompileStage::Emitted);
        assert!(partial.optimization.is_none());
        assert!(partial.output.unwrap().contains("P.x=+P.y;"));
    }

    #[test]
    fn test_revalidate_round_trip() {
        let compiler = Compiler::default();
        let request = request("void main(){float t=vA.x*1.;if(!(t>vB.x)){P=vA;}else{P=vB;}}").with_emit(EmitOptions {
            mangle: true,
            minify: true,
            beautify: false,
        });
        let result = compiler.compile(&request);
        assert!(!result.has_errors(), "{}", result.info_log());
        let second = compiler.revalidate(&result, &request).unwrap();
        assert_eq!(second.stage, CompileStage::RevalidatedFromText);
        assert!(!second.has_errors(), "{}\n{:?}", second.info_log(), second.output);

        let validated = compiler.compile(&request.clone().with_mode(CompileMode::Validate));
        assert!(compiler.revalidate(&validated, &request).is_none());
    }

    #[test]
    fn test_batch_preserves_order() {
        let compiler = Compiler::default();
        let requests = vec![
            request("void main(){P=vA;}"),
            request("void main(){P=missing;}"),
            CompileRequest::new("#version 300 es\nin vec4 a;void main(){gl_Position=a;}").with_stage(ShaderStage::Vertex),
        ];
        let results = compiler.compile_batch(&requests);
        assert_eq!(results.len(), 3);
        assert!(!results[0].has_errors());
        assert!(results[1].has_errors());
        assert!(!results[2].has_errors(), "{}", results[2].info_log());
    }
}
