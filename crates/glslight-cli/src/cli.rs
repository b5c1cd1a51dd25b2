/*
 * glslight CLI - コマンドライン引数処理モジュール
 *
 * コマンドライン引数をコンパイル要求に変換し、コンパイラライブラリを呼び出します。
 */

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use glslight_compiler::{
    CompileMode, CompileRequest, Compiler, CompilerConfig, LimitOverrides, ResourceLimits, ShaderStage, VERSION,
};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::diagnostics;

/// ディレクトリを走査するときに対象とする拡張子
const SHADER_EXTENSIONS: &[&str] = &["vert", "frag", "comp", "glsl"];

/// GLSL ESシェーダの検証・最適化ツール
#[derive(Parser)]
#[command(name = "glslight")]
#[command(version = VERSION)]
#[command(about = "GLSL ESシェーダの検証・最適化コンパイラ", long_about = None)]
pub struct Cli {
    /// ログを詳しくする（-v: info, -vv: debug, -vvv: trace）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// エラー以外のログを抑制する
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// 設定ファイル（TOML）へのパス
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// サブコマンド
    #[command(subcommand)]
    pub command: Commands,
}

/// サブコマンド
#[derive(Subcommand)]
pub enum Commands {
    /// シェーダを検証・最適化して出力
    Optimize(OptimizeArgs),

    /// シェーダを検証のみ行う
    Validate(ValidateArgs),

    /// 有効なリソース制限テーブルを表示
    Limits(LimitsArgs),
}

/// optimizeサブコマンドの引数
#[derive(Args)]
pub struct OptimizeArgs {
    /// 入力ファイル（`-` で標準入力）
    #[arg(required = true)]
    pub input: PathBuf,

    /// 出力ファイル（省略時は標準出力）
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// 局所変数と関数の名前を短縮する
    #[arg(long)]
    pub mangle: bool,

    /// 文をまとめて出力を短くする
    #[arg(long)]
    pub minify: bool,

    /// 整形して出力する
    #[arg(long)]
    pub beautify: bool,

    /// シェーダステージ（省略時は拡張子から推定）
    #[arg(long, value_enum)]
    pub stage: Option<StageArg>,

    /// リソース制限の上書き（.json または .toml）
    #[arg(long, value_name = "FILE")]
    pub limits: Option<PathBuf>,

    /// 検証エラーがあっても未最適化の結果を出力する
    #[arg(long)]
    pub allow_partial: bool,

    /// 出力テキストを再解析・再検証する
    #[arg(long)]
    pub verify: bool,
}

/// validateサブコマンドの引数
#[derive(Args)]
pub struct ValidateArgs {
    /// 入力ファイルまたはディレクトリ
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// 拡張子から推定できない場合のシェーダステージ
    #[arg(long, value_enum)]
    pub stage: Option<StageArg>,

    /// リソース制限の上書き（.json または .toml）
    #[arg(long, value_name = "FILE")]
    pub limits: Option<PathBuf>,

    /// 結果をJSONで標準出力に書き出す
    #[arg(long)]
    pub json: bool,
}

/// limitsサブコマンドの引数
#[derive(Args)]
pub struct LimitsArgs {
    /// 出力形式
    #[arg(long, value_enum, default_value = "json")]
    pub format: LimitsFormat,

    /// リソース制限の上書き（.json または .toml）
    #[arg(long, value_name = "FILE")]
    pub limits: Option<PathBuf>,
}

/// シェーダステージ
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StageArg {
    /// 頂点シェーダ
    Vertex,
    /// フラグメントシェーダ
    Fragment,
    /// コンピュートシェーダ
    Compute,
}

impl From<StageArg> for ShaderStage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Vertex => ShaderStage::Vertex,
            StageArg::Fragment => ShaderStage::Fragment,
            StageArg::Compute => ShaderStage::Compute,
        }
    }
}

/// 制限テーブルの出力形式
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LimitsFormat {
    /// JSON
    Json,
    /// TOML
    Toml,
}

/// コマンドの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// エラーなし
    Clean,
    /// 診断情報にエラーがある
    Failed,
}

/// ログ設定を初期化（`RUST_LOG` が設定されていればそちらを優先）
pub fn setup_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_module_path(verbose > 1)
        .init();
}

/// CLIからコマンドを実行
pub fn run(cli: &Cli) -> Result<Outcome> {
    let config = load_config(cli.config.as_deref())?;
    match &cli.command {
        Commands::Optimize(args) => optimize(args, &config),
        Commands::Validate(args) => validate(args, &config),
        Commands::Limits(args) => limits(args, &config),
    }
}

fn load_config(path: Option<&Path>) -> Result<CompilerConfig> {
    match path {
        Some(path) => {
            let config = CompilerConfig::from_file(path)
                .with_context(|| format!("設定ファイル {} を読み込めませんでした", path.display()))?;
            info!("設定ファイル {} を読み込みました", path.display());
            Ok(config)
        }
        None => Ok(CompilerConfig::default()),
    }
}

/// 設定ファイルの `[limits]` に上書きファイルを重ねたテーブル
fn load_limits(config: &CompilerConfig, path: Option<&Path>) -> Result<Arc<ResourceLimits>> {
    let base = config.resource_limits().context("設定ファイルの [limits] が不正です")?;
    let limits = match path {
        Some(path) => {
            let content =
                fs::read_to_string(path).with_context(|| format!("{} を読み込めませんでした", path.display()))?;
            let overrides: LimitOverrides = if path.extension().is_some_and(|ext| ext == "json") {
                serde_json::from_str(&content).with_context(|| format!("{} はJSONとして不正です", path.display()))?
            } else {
                toml::from_str(&content).with_context(|| format!("{} はTOMLとして不正です", path.display()))?
            };
            debug!("{} 件のリソース制限を上書きします", overrides.len());
            ResourceLimits::with_overrides(&base, &overrides)
                .with_context(|| format!("{} のリソース制限が不正です", path.display()))?
        }
        None => base,
    };
    Ok(Arc::new(limits))
}

fn use_color() -> bool {
    io::stderr().is_terminal()
}

fn optimize(args: &OptimizeArgs, config: &CompilerConfig) -> Result<Outcome> {
    let limits = load_limits(config, args.limits.as_deref())?;
    let (source, name) = if args.input.as_os_str() == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source).context("標準入力を読み込めませんでした")?;
        (source, "<stdin>".to_string())
    } else {
        let source = fs::read_to_string(&args.input)
            .with_context(|| format!("{} を読み込めませんでした", args.input.display()))?;
        (source, args.input.display().to_string())
    };

    let mut request = config.request(source).with_mode(CompileMode::Optimize).with_file_name(name.clone());
    if let Some(stage) = args.stage {
        request = request.with_stage(stage.into());
    }
    request.emit.mangle |= args.mangle;
    request.emit.minify |= args.minify;
    request.emit.beautify |= args.beautify;
    request.allow_partial_output |= args.allow_partial;

    let compiler = Compiler::new(limits);
    let result = compiler.compile(&request);
    let color = use_color();
    diagnostics::report(&name, &result, color);

    let mut outcome = if result.has_errors() { Outcome::Failed } else { Outcome::Clean };
    if args.verify {
        if let Some(second) = compiler.revalidate(&result, &request) {
            if second.has_errors() {
                warn!("{}: 出力テキストの再検証に失敗しました", name);
                diagnostics::report(&format!("{} (出力)", name), &second, color);
                outcome = Outcome::Failed;
            } else {
                info!("{}: 出力テキストの再検証に成功しました", name);
            }
        }
    }

    if let Some(report) = &result.optimization {
        info!(
            "{}: {} パス, {} 件の書き換え{}",
            name,
            report.passes,
            report.rewrites,
            if report.reached_fixpoint { "" } else { "（不動点に未到達）" }
        );
    }

    match (&result.output, &args.output) {
        (Some(text), Some(path)) => {
            fs::write(path, text).with_context(|| format!("{} に書き込めませんでした", path.display()))?;
            info!("{} → {}", name.cyan(), path.display().to_string().green());
        }
        (Some(text), None) => {
            if text.ends_with('\n') {
                print!("{}", text);
            } else {
                println!("{}", text);
            }
        }
        (None, _) => {}
    }
    Ok(outcome)
}

/// 入力パスを展開（ディレクトリは対象拡張子のファイルを再帰的に列挙）
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry = entry.with_context(|| format!("{} を走査できませんでした", input.display()))?;
                let is_shader = entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| SHADER_EXTENSIONS.contains(&ext));
                if entry.file_type().is_file() && is_shader {
                    files.push(entry.into_path());
                }
            }
        } else if input.exists() {
            files.push(input.clone());
        } else {
            bail!("{} が見つかりません", input.display());
        }
    }
    Ok(files)
}

fn validate(args: &ValidateArgs, config: &CompilerConfig) -> Result<Outcome> {
    let limits = load_limits(config, args.limits.as_deref())?;
    let files = collect_inputs(&args.inputs)?;
    if files.is_empty() {
        warn!("検証するシェーダが見つかりませんでした");
    }

    let mut requests = Vec::with_capacity(files.len());
    for file in &files {
        let source =
            fs::read_to_string(file).with_context(|| format!("{} を読み込めませんでした", file.display()))?;
        let mut request = config.request(source);
        if let Some(stage) = args.stage {
            request = request.with_stage(stage.into());
        }
        requests.push(
            request
                .with_file_name(file.display().to_string())
                .with_mode(CompileMode::Validate),
        );
    }

    let results = Compiler::new(limits).compile_batch(&requests);

    if args.json {
        let report: Vec<_> = requests
            .iter()
            .zip(&results)
            .map(|(request, result)| {
                serde_json::json!({
                    "file": request.display_name(),
                    "stage": request.stage,
                    "diagnostics": result.diagnostics,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let color = use_color();
    let (mut errors, mut warnings) = (0, 0);
    for (request, result) in requests.iter().zip(&results) {
        if !args.json {
            diagnostics::report(request.display_name(), result, color);
        }
        errors += result.errors().count();
        warnings += result.warnings().count();
    }
    eprintln!("{}", diagnostics::summary(files.len(), errors, warnings, color));

    Ok(if errors > 0 { Outcome::Failed } else { Outcome::Clean })
}

fn limits(args: &LimitsArgs, config: &CompilerConfig) -> Result<Outcome> {
    let limits = load_limits(config, args.limits.as_deref())?;
    let table = limits.to_map();
    let text = match args.format {
        LimitsFormat::Json => serde_json::to_string_pretty(&table)?,
        LimitsFormat::Toml => toml::to_string(&table)?,
    };
    println!("{}", text.trim_end());
    Ok(Outcome::Clean)
}
