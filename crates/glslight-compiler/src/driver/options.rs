//! # コンパイルオプション
//!
//! 1回のコンパイル要求と、その処理段階を表す型を提供します。

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::emitter::EmitOptions;
use crate::frontend::ShaderStage;
use crate::optimizer::OptimizerOptions;

/// コンパイルモード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileMode {
    /// 検証・最適化・出力まで行う
    #[default]
    Optimize,
    /// 検証のみ（出力なし）
    Validate,
}

impl CompileMode {
    /// 文字列表現
    pub fn as_str(&self) -> &'static str {
        match self {
            CompileMode::Optimize => "optimize",
            CompileMode::Validate => "validate",
        }
    }
}

impl fmt::Display for CompileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "optimize" => Ok(CompileMode::Optimize),
            "validate" => Ok(CompileMode::Validate),
            _ => Err(format!("不明なコンパイルモードです: {}", s)),
        }
    }
}

/// パイプラインの到達段階
///
/// `Parsed -> Validated -> (Optimized)? -> Emitted -> (RevalidatedFromText)?`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompileStage {
    /// 構文解析に失敗した
    Rejected,
    /// 構文解析済み
    Parsed,
    /// 検証済み
    Validated,
    /// 最適化済み
    Optimized,
    /// テキストを出力済み
    Emitted,
    /// 出力テキストを再解析・再検証済み
    RevalidatedFromText,
}

impl fmt::Display for CompileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompileStage::Rejected => "rejected",
            CompileStage::Parsed => "parsed",
            CompileStage::Validated => "validated",
            CompileStage::Optimized => "optimized",
            CompileStage::Emitted => "emitted",
            CompileStage::RevalidatedFromText => "revalidated-from-text",
        };
        f.write_str(name)
    }
}

/// コンパイル要求
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompileRequest {
    /// シェーダソース
    pub source: String,
    /// 診断・ログ用のファイル名
    pub file_name: Option<String>,
    /// コンパイルモード
    pub mode: CompileMode,
    /// シェーダステージ
    pub stage: ShaderStage,
    /// 出力形式
    pub emit: EmitOptions,
    /// 検証エラーがあっても未最適化のASTを出力する
    pub allow_partial_output: bool,
    /// オプティマイザの設定
    pub optimizer: OptimizerOptions,
}

impl CompileRequest {
    /// 既定の設定（最適化モード、フラグメントシェーダ）で要求を作成
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// ファイル名を設定し、拡張子からステージを推定
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        if let Some(stage) = ShaderStage::from_path(Path::new(&file_name)) {
            self.stage = stage;
        }
        self.file_name = Some(file_name);
        self
    }

    /// モードを設定
    pub fn with_mode(mut self, mode: CompileMode) -> Self {
        self.mode = mode;
        self
    }

    /// ステージを設定
    pub fn with_stage(mut self, stage: ShaderStage) -> Self {
        self.stage = stage;
        self
    }

    /// 出力形式を設定
    pub fn with_emit(mut self, emit: EmitOptions) -> Self {
        self.emit = emit;
        self
    }

    /// 部分出力を許可するか設定
    pub fn with_partial_output(mut self, allow: bool) -> Self {
        self.allow_partial_output = allow;
        self
    }

    /// オプティマイザの設定を指定
    pub fn with_optimizer(mut self, optimizer: OptimizerOptions) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// ログ用の表示名
    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("<source>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_infers_stage_from_file_name() {
        let request = CompileRequest::new("void main(){}").with_file_name("shaders/sky.vert");
        assert_eq!(request.stage, ShaderStage::Vertex);
        assert_eq!(request.display_name(), "shaders/sky.vert");

        let request = CompileRequest::new("").with_stage(ShaderStage::Compute).with_file_name("x.glsl");
        assert_eq!(request.stage, ShaderStage::Compute);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Validate".parse::<CompileMode>(), Ok(CompileMode::Validate));
        assert!("link".parse::<CompileMode>().is_err());
        assert!(CompileStage::Parsed < CompileStage::Emitted);
    }
}
