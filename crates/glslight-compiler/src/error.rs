//! # 設定エラー
//!
//! コンパイル開始前に検出される致命的な設定エラーを定義します。
//! 検証エラーはこのモジュールではなく診断情報として報告されます。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 設定エラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 存在しないリソース制限名
    #[error("未知のリソース制限です: `{0}`")]
    UnknownLimit(String),

    /// リソース制限の値の種類が一致しない
    #[error("リソース制限 `{name}` には{expected}が必要です（指定値: {found}）")]
    InvalidLimitValue {
        /// 制限名
        name: String,
        /// 期待される種類
        expected: &'static str,
        /// 指定された値
        found: String,
    },

    /// 設定の書式が不正
    #[error("設定の書式が不正です: {0}")]
    Malformed(String),

    /// 設定ファイルの読み込みに失敗
    #[error("設定ファイル `{path}` を読み込めませんでした: {source}")]
    Io {
        /// ファイルパス
        path: PathBuf,
        /// 元のエラー
        #[source]
        source: io::Error,
    },
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        ConfigError::Malformed(format!("JSON解析エラー: {}", error))
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(error: toml::de::Error) -> Self {
        ConfigError::Malformed(format!("TOML解析エラー: {}", error))
    }
}

/// 設定処理の結果型
pub type Result<T> = std::result::Result<T, ConfigError>;
