/*
 * glslight CLI - 診断情報の表示
 */

use colored::Colorize;
use glslight_compiler::{CompileResult, Diagnostic, Severity};

/// 1件の診断情報を色付きで整形
pub fn format_diagnostic(file: &str, diagnostic: &Diagnostic, color: bool) -> String {
    let severity = match (diagnostic.severity, color) {
        (Severity::Error, true) => "error".red().bold().to_string(),
        (Severity::Warning, true) => "warning".yellow().bold().to_string(),
        (Severity::Error, false) => "error".to_string(),
        (Severity::Warning, false) => "warning".to_string(),
    };
    let position = format!("{}:{}", file, diagnostic.location);
    let position = if color { position.bold().to_string() } else { position };
    format!("{}: {}: [{}] {}", position, severity, diagnostic.code, diagnostic.message)
}

/// コンパイル結果の診断情報を標準エラー出力に表示
pub fn report(file: &str, result: &CompileResult, color: bool) {
    for diagnostic in &result.diagnostics {
        eprintln!("{}", format_diagnostic(file, diagnostic, color));
    }
}

/// 集計行
pub fn summary(files: usize, errors: usize, warnings: usize, color: bool) -> String {
    let text = format!("{} ファイル: エラー {} 件, 警告 {} 件", files, errors, warnings);
    match (color, errors > 0) {
        (false, _) => text,
        (true, true) => text.red().to_string(),
        (true, false) => text.green().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glslight_compiler::frontend::error::SourceLocation;
    use glslight_compiler::DiagnosticCode;

    #[test]
    fn test_plain_format() {
        let diagnostic = Diagnostic::error(
            DiagnosticCode::LimitExceeded,
            "maxDrawBuffers を超えています",
            SourceLocation::new(3, 7, 40),
        );
        assert_eq!(
            format_diagnostic("a.frag", &diagnostic, false),
            format!("a.frag:3:7: error: [{}] maxDrawBuffers を超えています", DiagnosticCode::LimitExceeded)
        );
        assert_eq!(summary(2, 0, 1, false), "2 ファイル: エラー 0 件, 警告 1 件");
    }
}
