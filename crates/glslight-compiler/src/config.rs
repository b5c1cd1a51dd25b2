//! コンパイラ設定モジュール
//!
//! TOML形式の設定ファイルからコンパイル要求の既定値とリソース制限の上書きを読み込みます。
//!
//! ```toml
//! [compile]
//! mode = "optimize"
//! stage = "fragment"
//! allow_partial_output = false
//!
//! [emit]
//! minify = true
//!
//! [optimizer]
//! max_passes = 16
//! relational_negation = "total-order-only"
//!
//! [limits]
//! maxDrawBuffers = 8
//! limits_generalVariableIndexing = 0
//! ```
//!
//! どの階層でも未知のキーは [`ConfigError`] になります。

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::driver::{CompileMode, CompileRequest};
use crate::emitter::EmitOptions;
use crate::error::{ConfigError, Result};
use crate::frontend::ShaderStage;
use crate::limits::{LimitOverrides, ResourceLimits};
use crate::optimizer::OptimizerOptions;

/// `[compile]` セクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileSection {
    /// コンパイルモード
    pub mode: CompileMode,
    /// 拡張子から推定できない場合のシェーダステージ
    pub stage: ShaderStage,
    /// 検証エラーがあっても出力する
    pub allow_partial_output: bool,
}

/// コンパイラの設定
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// コンパイル要求の既定値
    pub compile: CompileSection,
    /// 出力形式
    pub emit: EmitOptions,
    /// オプティマイザ
    pub optimizer: OptimizerOptions,
    /// リソース制限の上書き
    pub limits: LimitOverrides,
}

impl CompilerConfig {
    /// 設定ファイルを読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// 既定プロファイルに `[limits]` を適用したリソース制限テーブル
    pub fn resource_limits(&self) -> Result<ResourceLimits> {
        ResourceLimits::from_overrides(&self.limits)
    }

    /// 設定を既定値とするコンパイル要求を作成
    pub fn request(&self, source: impl Into<String>) -> CompileRequest {
        CompileRequest::new(source)
            .with_mode(self.compile.mode)
            .with_stage(self.compile.stage)
            .with_partial_output(self.compile.allow_partial_output)
            .with_emit(self.emit)
            .with_optimizer(self.optimizer.clone())
    }

    /// TOML文字列に変換
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ConfigError::Malformed(e.to_string()))
    }
}

impl FromStr for CompilerConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config: CompilerConfig = toml::from_str(s)?;
        // 制限名と値の種類はここで検査する
        config.resource_limits()?;
        Ok(config)
    }
}
