mod common;

use std::sync::Arc;

use glslight_compiler::{
    CompileRequest, CompileStage, Compiler, DiagnosticCode, LimitOverrides, LimitValue, OptimizerOptions,
    RelationalNegation, ResourceLimits,
};

use common::{compile, compile_main, compiler, SHADER_PREFIX};

fn source(body: &str) -> String {
    format!("{}void main(){{{}}}", SHADER_PREFIX, body)
}

#[test]
fn test_positive_operator_is_dropped() {
    assert_eq!(compile_main("P.x=+P.y;"), "P.x=P.y;");
}

#[test]
fn test_negated_comparison_is_flipped() {
    assert_eq!(compile_main("N=int(!(vA.x>vB.x));"), "N=int(vA.x<=vB.x);");
}

#[test]
fn test_zero_terms_are_removed() {
    assert_eq!(compile_main("P.x=vA.x+0.;"), "P.x=vA.x;");
    assert_eq!(compile_main("P.x=0.-vA.x;"), "P.x=-vA.x;");
}

#[test]
fn test_matrix_built_from_matrix_is_not_an_identity() {
    assert_eq!(compile_main("P=vA*vec4(mat2(1.));"), "P=vA*vec4(mat2(1.));");
    let widened = "P.xyz=(mat3(vA.xyz,vB.xyz,vA.xyz)+mat3(mat2(0.)))*vB.xyz;";
    assert_eq!(compile_main(widened), widened);
    assert_eq!(
        compile_main("P.xyz=(mat3(vA.xyz,vB.xyz,vA.xyz)+mat3(0.))*vB.xyz;"),
        "P.xyz=mat3(vA.xyz,vB.xyz,vA.xyz)*vB.xyz;"
    );
}

#[test]
fn test_compound_assignment_with_zero_disappears() {
    assert_eq!(compile_main("P.x+=0.;"), "");
    assert_eq!(compile_main("P=vA;P.x+=0.;P.y-=0.;"), "P=vA;");
}

#[test]
fn test_texture_call_is_untouched() {
    assert_eq!(compile_main("P=texture(s,vA.xy);"), "P=texture(s,vA.xy);");
}

#[test]
fn test_dynamic_index_rejected_without_general_indexing() {
    let mut overrides = LimitOverrides::new();
    overrides.insert("limits_generalVariableIndexing".to_string(), LimitValue::Int(0));
    let compiler = Compiler::new(Arc::new(ResourceLimits::from_overrides(&overrides).unwrap()));

    let request = CompileRequest::new(source("float a[4];a[iN]=1.;P=vec4(a[0]);"));
    let result = compiler.compile(&request);

    let errors: Vec<_> = result.errors().collect();
    assert_eq!(errors.len(), 1, "{}", result.info_log());
    assert_eq!(errors[0].code, DiagnosticCode::NonConstantIndexNotSupported);
    assert!(errors[0].message.contains("limits_generalVariableIndexing"));
    assert_eq!(result.output, None);
    assert_eq!(result.stage, CompileStage::Validated);

    // 既定の制限なら同じシェーダは通る
    let result = common::compiler().compile(&request);
    assert!(!result.has_errors(), "{}", result.info_log());
}

#[test]
fn test_optimizing_output_again_is_stable() {
    let bodies = [
        "P.x=+P.y;",
        "N=int(!(vA.x>vB.x));",
        "P=vA*1.+0.;P.x+=0.;",
        "P.x=!iB?- -vA.z:vA.w*1.;",
        "N=~~iN+0;uN=uint(iN)*1u;",
        "P=texture(s,vA.xy)*1.;",
    ];
    for body in bodies {
        let first = compile(&source(body)).output.unwrap();
        let second = compile(&first).output.unwrap();
        assert_eq!(first, second, "body: {}", body);
    }
}

#[test]
fn test_vertex_output_revalidates() {
    let vertex = "#version 300 es\nin vec4 a;uniform mat4 m;void main(){gl_Position=m*(a*1.)+vec4(0);}";
    let result = compiler().compile(&CompileRequest::new(vertex).with_file_name("shader.vert"));
    assert!(!result.has_errors(), "{}", result.info_log());
    let output = result.output.clone().unwrap();
    assert!(output.ends_with("void main(){gl_Position=m*a;}"), "{}", output);

    let request = CompileRequest::new(vertex).with_file_name("shader.vert");
    let second = compiler().revalidate(&result, &request).unwrap();
    assert_eq!(second.stage, CompileStage::RevalidatedFromText);
    assert!(!second.has_errors(), "{}", second.info_log());
}

#[test]
fn test_total_order_only_keeps_float_comparisons() {
    let options = OptimizerOptions {
        relational_negation: RelationalNegation::TotalOrderOnly,
        ..OptimizerOptions::default()
    };
    let request = CompileRequest::new(source("N=int(!(vA.x>vB.x));N=int(!(iN>0));")).with_optimizer(options);
    let result = compiler().compile(&request);
    assert!(!result.has_errors(), "{}", result.info_log());
    let output = result.output.unwrap();
    assert!(output.ends_with("void main(){N=int(!(vA.x>vB.x));N=int(iN<=0);}"), "{}", output);
}
