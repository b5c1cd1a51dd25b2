/*
 * glslight CLI - メインエントリーポイント
 *
 * GLSL ESシェーダの検証・最適化ツールのエントリーポイントです。
 * コマンドライン引数を解析し、処理ロジックを呼び出します。
 */

use std::process;

use clap::Parser;

mod cli;
mod diagnostics;

fn main() {
    let cli = cli::Cli::parse();
    cli::setup_logging(cli.verbose, cli.quiet);

    match cli::run(&cli) {
        Ok(cli::Outcome::Clean) => {}
        Ok(cli::Outcome::Failed) => process::exit(1),
        Err(e) => {
            eprintln!("エラー: {:#}", e);
            process::exit(1);
        }
    }
}
