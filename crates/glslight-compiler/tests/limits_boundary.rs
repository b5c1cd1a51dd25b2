use std::sync::Arc;

use glslight_compiler::{
    CompileMode, CompileRequest, CompileResult, Compiler, DiagnosticCode, LimitOverrides, LimitValue, ResourceLimits,
    ShaderStage,
};

fn validate(source: &str, stage: ShaderStage, name: &str, value: i64) -> CompileResult {
    let mut overrides = LimitOverrides::new();
    overrides.insert(name.to_string(), LimitValue::Int(value));
    let limits = ResourceLimits::from_overrides(&overrides).unwrap();
    let request = CompileRequest::new(source)
        .with_stage(stage)
        .with_mode(CompileMode::Validate);
    Compiler::new(Arc::new(limits)).compile(&request)
}

/// 制限ちょうどは通り、1つ超えると制限名を含む LimitExceeded がちょうど1つ出る
fn assert_boundary(name: &str, value: i64, at_limit: &str, over_limit: &str) {
    assert_boundary_in(ShaderStage::Fragment, name, value, at_limit, over_limit);
}

fn assert_boundary_in(stage: ShaderStage, name: &str, value: i64, at_limit: &str, over_limit: &str) {
    let result = validate(at_limit, stage, name, value);
    assert!(result.diagnostics.is_empty(), "{}: {}", name, result.info_log());

    let result = validate(over_limit, stage, name, value);
    assert_eq!(result.diagnostics.len(), 1, "{}: {}", name, result.info_log());
    assert_eq!(result.diagnostics[0].code, DiagnosticCode::LimitExceeded);
    assert!(result.diagnostics[0].message.contains(name), "{}", result.diagnostics[0].message);
    assert_eq!(result.output, None);
}

fn fragment(location: u32) -> String {
    format!(
        "#version 300 es\nprecision mediump float;\nlayout(location={}) out vec4 c;\nvoid main(){{ c = vec4(0.0); }}",
        location
    )
}

fn parameters(count: usize) -> String {
    let names: Vec<String> = (0..count).map(|i| format!("float p{}", i)).collect();
    format!(
        "precision mediump float;\nfloat f({}){{ return 1.0; }}\nvoid main(){{ gl_FragColor = vec4(0.0); }}",
        names.join(", ")
    )
}

/// 最初の `count` 個の宣言を並べた vertex シェーダ
fn vertex(declarations: &[&str], count: usize, body: &str) -> String {
    format!("{}\nvoid main(){{ {} }}", declarations[..count].join("\n"), body)
}

/// `1.0 + 1.0 + ...` を `gl_Position = vec4(...)` に代入する（深さは項数 + 2）
fn expression(terms: usize) -> String {
    format!("void main(){{ gl_Position = vec4({}); }}", vec!["1.0"; terms].join(" + "))
}

/// main を含めて `depth` 段の呼び出し
fn call_chain(depth: usize) -> String {
    let mut source = String::from("float f1(){ return 1.0; }\n");
    for level in 2..depth {
        source.push_str(&format!("float f{}(){{ return f{}(); }}\n", level, level - 1));
    }
    source.push_str(&format!("void main(){{ gl_Position = vec4(f{}()); }}", depth - 1));
    source
}

#[test]
fn test_vertex_attribs() {
    let attributes = ["attribute vec4 a0;", "attribute vec4 a1;", "attribute vec2 a2;"];
    let body = "gl_Position = a0;";
    assert_boundary_in(
        ShaderStage::Vertex,
        "maxVertexAttribs",
        2,
        &vertex(&attributes, 2, body),
        &vertex(&attributes, 3, body),
    );
}

#[test]
fn test_varying_vectors() {
    let varyings = ["varying vec4 v0;", "varying mat2 v1;", "varying float v2;"];
    let body = "gl_Position = vec4(0.0); v0 = vec4(1.0);";
    assert_boundary_in(
        ShaderStage::Vertex,
        "maxVaryingVectors",
        3,
        &vertex(&varyings, 2, body),
        &vertex(&varyings, 3, body),
    );
}

#[test]
fn test_vertex_output_vectors() {
    let outputs = ["#version 300 es", "out vec4 o0;", "out vec4 o1[2];", "out vec2 o2;"];
    let body = "gl_Position = vec4(0.0); o0 = vec4(1.0);";
    assert_boundary_in(
        ShaderStage::Vertex,
        "maxVertexOutputVectors",
        3,
        &vertex(&outputs, 3, body),
        &vertex(&outputs, 4, body),
    );
}

#[test]
fn test_uniform_block_size() {
    // std140 では vec4[4] が 64 バイト、続く float で 80 バイトに切り上がる
    assert_boundary_in(
        ShaderStage::Vertex,
        "maxUniformBlockSize",
        64,
        "#version 300 es\nuniform B { vec4 a[4]; };\nvoid main(){ gl_Position = a[0]; }",
        "#version 300 es\nuniform B { vec4 a[4]; float b; };\nvoid main(){ gl_Position = a[0] * b; }",
    );
}

#[test]
fn test_compute_work_group_size_x() {
    let source = |size: u32| format!("#version 310 es\nlayout(local_size_x = {}) in;\nvoid main(){{}}", size);
    assert_boundary_in(
        ShaderStage::Compute,
        "maxComputeWorkGroupSizeX",
        64,
        &source(64),
        &source(65),
    );
}

#[test]
fn test_texture_image_units() {
    let source = |samplers: usize| {
        let declarations: Vec<String> = (0..samplers).map(|i| format!("uniform sampler2D s{};", i)).collect();
        format!(
            "precision mediump float;\n{}\nvoid main(){{ gl_FragColor = texture2D(s0, vec2(0.0)); }}",
            declarations.join("\n")
        )
    };
    assert_boundary("maxTextureImageUnits", 2, &source(2), &source(3));
}

#[test]
fn test_program_texel_offset() {
    let source = |offset: i32| {
        format!(
            "#version 300 es\nprecision mediump float;\nuniform sampler2D s;\nout vec4 c;\nvoid main(){{ c = textureOffset(s, vec2(0.0), ivec2(0, {})); }}",
            offset
        )
    };
    assert_boundary("maxProgramTexelOffset", 5, &source(5), &source(6));
}

#[test]
fn test_views_ovr() {
    let source = |views: u32| {
        format!(
            "#version 300 es\n#extension GL_OVR_multiview : require\nlayout(num_views = {}) in;\nvoid main(){{ gl_Position = vec4(0.0); }}",
            views
        )
    };
    assert_boundary_in(ShaderStage::Vertex, "maxViewsOVR", 4, &source(4), &source(5));
}

#[test]
fn test_call_stack_depth() {
    assert_boundary_in(ShaderStage::Vertex, "maxCallStackDepth", 4, &call_chain(4), &call_chain(5));
}

#[test]
fn test_expression_complexity() {
    assert_boundary_in(
        ShaderStage::Vertex,
        "maxExpressionComplexity",
        6,
        &expression(4),
        &expression(5),
    );
}

#[test]
fn test_draw_buffers() {
    assert_boundary("maxDrawBuffers", 2, &fragment(1), &fragment(2));
}

#[test]
fn test_function_parameters() {
    assert_boundary("maxFunctionParameters", 3, &parameters(3), &parameters(4));
}

#[test]
fn test_fragment_uniform_vectors() {
    assert_boundary(
        "maxFragmentUniformVectors",
        4,
        "precision mediump float;\nuniform vec4 u[4];\nvoid main(){ gl_FragColor = u[0]; }",
        "precision mediump float;\nuniform vec4 u[4];\nuniform float x;\nvoid main(){ gl_FragColor = u[0] * x; }",
    );
}

#[test]
fn test_limit_reported_once() {
    let source = "precision mediump float;\nuniform vec4 a[4];\nuniform vec4 b;\nuniform vec4 c;\nvoid main(){ gl_FragColor = a[0] + b + c; }";
    let result = validate(source, ShaderStage::Fragment, "maxFragmentUniformVectors", 4);
    let exceeded: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::LimitExceeded)
        .collect();
    assert_eq!(exceeded.len(), 1, "{}", result.info_log());
}
