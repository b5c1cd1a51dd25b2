#![allow(dead_code)]

use std::sync::Arc;

use glslight_compiler::{CompileMode, CompileRequest, CompileResult, Compiler, ResourceLimits};

pub mod eval;

/// 演算子テストで使う大域宣言
pub const SHADER_PREFIX: &str = "#version 300 es\nprecision mediump float;uniform int iN;uniform bool iB;uniform lowp sampler2D s;uniform vec4 vA,vB;layout(location=1)out vec4 V;layout(location=2)out vec4 P;layout(location=3)out int N;layout(location=4)out uint uN;";

pub fn compiler() -> Compiler {
    let _ = env_logger::builder().is_test(true).try_init();
    Compiler::new(Arc::new(ResourceLimits::default()))
}

/// 最適化モードでコンパイルし、エラーがないことと出力の再検証を確認
pub fn compile(source: &str) -> CompileResult {
    let compiler = compiler();
    let request = CompileRequest::new(source).with_mode(CompileMode::Optimize);
    let result = compiler.compile(&request);
    assert!(!result.has_errors(), "src: {}\n{}", source, result.info_log());
    let second = compiler
        .revalidate(&result, &request)
        .unwrap_or_else(|| panic!("出力がありません: {}", source));
    assert!(
        !second.has_errors(),
        "src: {}\nout: {:?}\n{}",
        source,
        result.output,
        second.info_log()
    );
    result
}

/// `void main(){...}` の本体だけをコンパイルし、出力の本体を返す
pub fn compile_main(code: &str) -> String {
    let source = format!("{}void main(){{{}}}", SHADER_PREFIX, code);
    let output = compile(&source).output.unwrap_or_default();
    let body = output.replace(SHADER_PREFIX, "").replace("void main(){", "");
    body.strip_suffix('}').map(str::to_string).unwrap_or(body)
}
