mod common;

use common::compile_main;

#[test]
fn test_removes_positive_operator() {
    assert_eq!(compile_main("P.x=+P.y;"), "P.x=P.y;");
    assert_eq!(compile_main("P.x=+ + +P.y;"), "P.x=P.y;");
}

#[test]
fn test_removes_double_negations() {
    assert_eq!(compile_main("P.x=-P.y;"), "P.x=-P.y;");
    assert_eq!(compile_main("P.x=- -P.y;"), "P.x=P.y;");
    assert_eq!(compile_main("P.x=- - -P.y;"), "P.x=-P.y;");
    assert_eq!(compile_main("P.x=- - - -P.y;"), "P.x=P.y;");
}

#[test]
fn test_removes_double_bitwise_not() {
    assert_eq!(compile_main("N=~iN;"), "N=~iN;");
    assert_eq!(compile_main("N=~~iN;"), "N=iN;");
    assert_eq!(compile_main("N=~~~iN;"), "N=~iN;");
    assert_eq!(compile_main("N=~~~~iN;"), "N=iN;");
}

#[test]
fn test_removes_double_logical_not() {
    assert_eq!(compile_main("N=int(!iB);"), "N=int(!iB);");
    assert_eq!(compile_main("N=int(!!iB);"), "N=int(iB);");
    assert_eq!(compile_main("N=int(!!!iB);"), "N=int(!iB);");
    assert_eq!(compile_main("N=int(!!!!iB);"), "N=int(iB);");
}

#[test]
fn test_boolean_negations() {
    assert_eq!(compile_main("N=int(!(vA==vB));"), "N=int(vA!=vB);");
    assert_eq!(compile_main("N=int(!(vA!=vB));"), "N=int(vA==vB);");
    assert_eq!(compile_main("N=int(!(vA.x>vB.x));"), "N=int(vA.x<=vB.x);");
    assert_eq!(compile_main("N=int(!(vA.x<vB.x));"), "N=int(vA.x>=vB.x);");
    assert_eq!(compile_main("N=int(!(vA.x>=vB.x));"), "N=int(vA.x<vB.x);");
    assert_eq!(compile_main("N=int(!(vA.x<=vB.x));"), "N=int(vA.x>vB.x);");
}

#[test]
fn test_ternary_negation() {
    // 条件の `!(a>b)` は子として先に `a<=b` へ書き換わるため、分岐は入れ替わらない
    assert_eq!(compile_main("P.x=!(vA.x>vB.x)?vA.z:vA.w;"), "P.x=vA.x<=vB.x?vA.z:vA.w;");
    assert_eq!(compile_main("P.x=!iB?vA.z:vA.w;"), "P.x=iB?vA.w:vA.z;");
    assert_eq!(compile_main("P.x=!!iB?vA.z:vA.w;"), "P.x=iB?vA.z:vA.w;");
}

#[test]
fn test_addition_and_subtraction_with_zero() {
    assert_eq!(compile_main("P.x=vA.x+0.;"), "P.x=vA.x;");
    assert_eq!(compile_main("P.x=0.+vA.x;"), "P.x=vA.x;");

    assert_eq!(compile_main("P=vA+0.;"), "P=vA;");
    assert_eq!(compile_main("P=0.+vA;"), "P=vA;");
    assert_eq!(compile_main("P=vA+vec4(0);"), "P=vA;");
    assert_eq!(compile_main("P=vec4(0)+vA;"), "P=vA;");

    assert_eq!(compile_main("P.x=vA.x-0.;"), "P.x=vA.x;");
    assert_eq!(compile_main("P.x=0.-vA.x;"), "P.x=-vA.x;");

    assert_eq!(compile_main("P.x+=0.;"), "");
    assert_eq!(compile_main("P.x-=0.;"), "");
}

#[test]
fn test_multiplication_with_one() {
    assert_eq!(compile_main("P.x=vA.x*1.;"), "P.x=vA.x;");
    assert_eq!(compile_main("P.x=1.*vA.x;"), "P.x=vA.x;");

    assert_eq!(compile_main("P=vA*1.;"), "P=vA;");
    assert_eq!(compile_main("P=1.*vA;"), "P=vA;");
    assert_eq!(compile_main("P=vA*vec4(1);"), "P=vA;");
    assert_eq!(compile_main("P=vec4(1)*vA;"), "P=vA;");

    assert_eq!(compile_main("P.x*=1.;"), "");
    assert_eq!(compile_main("P.x/=1.;"), "");
}

#[test]
fn test_division_by_one() {
    assert_eq!(compile_main("P.x=vA.x/1.;"), "P.x=vA.x;");
    assert_eq!(compile_main("P=vA/1.;"), "P=vA;");
    assert_eq!(compile_main("P=vA/vec4(1);"), "P=vA;");
    assert_eq!(compile_main("P.x/=1.;"), "");
}

#[test]
fn test_matrix_left_identity_is_kept() {
    let code = "P.xyz=mat3(1.)*vA.xyz;";
    assert_eq!(compile_main(code), code);
}

#[test]
fn test_intrinsic_calls_are_unchanged() {
    let tests = [
        // 三角関数
        "P.x=sin(vA.x);",
        "P.x=cos(vA.x);",
        "P.x=tan(vA.x);",
        "P.x=asin(vA.x);",
        "P.x=acos(vA.x);",
        "P.x=atan(vA.x);",
        "P.x=atan(vA.x,vB.x);",
        // 指数関数
        "P.x=pow(vA.x,vB.x);",
        "P.x=exp(vA.x);",
        "P.x=log(vA.x);",
        "P.x=exp2(vA.x);",
        "P.x=log2(vA.x);",
        "P.x=sqrt(vA.x);",
        "P.x=inversesqrt(vA.x);",
        // 共通関数
        "P.x=abs(vA.x);",
        "P.x=sign(vA.x);",
        "P.x=floor(vA.x);",
        "P.x=ceil(vA.x);",
        "P.x=fract(vA.x);",
        "P.x=mod(vA.x,vB.x);",
        "P.x=min(vA.x,vB.x);",
        "P.x=max(vA.x,vB.x);",
        "P.x=clamp(vA.x,0.,1.);",
        "P.x=mix(vA.x,vB.x,.5);",
        "P.x=step(.5,vA.x);",
        "P.x=smoothstep(0.,1.,vA.x);",
        // 幾何関数
        "P.x=length(vA);",
        "P.x=distance(vA,vB);",
        "P.x=dot(vA,vB);",
        "P=normalize(vA);",
        "P=vec4(cross(vA.xyz,vB.xyz),1.);",
        "P=faceforward(vA,vB,vA);",
        "P=reflect(vA,vB);",
        "P=refract(vA,vB,.5);",
        // 行列
        "P.xyz=vA.xyz*transpose(mat3(vA.zyx,vB.xyz,vA.xzy));",
        "P.x=determinant(mat3(vA.zyx,vB.xyz,vA.xzy));",
        "P.xyz=vA.xyz*inverse(mat3(vA.zyx,vB.xyz,vA.xzy));",
        // 角度
        "P.x=radians(vA.x);",
        "P.x=degrees(vA.x);",
        // 微分
        "P.x=dFdx(vA.x);",
        "P.x=dFdy(vA.x);",
        "P.x=fwidth(vA.x);",
        // パック
        "uN=packUnorm2x16(vA.xy);",
        "uN=packSnorm2x16(vA.xy);",
        "uN=packHalf2x16(vA.xy);",
        // テクスチャ
        "P=texture(s,vA.xy);",
        "P=textureProj(s,vA);",
        "P=textureLod(s,vA.xy,0.);",
        "P=textureProjLod(s,vA,0.);",
        "P=textureGrad(s,vA.xy,vA.xy,vB.xy);",
        "P=textureProjGrad(s,vA,vA.xy,vB.xy);",
        "N=textureSize(s,0).x;",
    ];

    for code in tests {
        assert_eq!(compile_main(code), code, "src: {}", code);
    }
}

#[test]
fn test_builtin_arguments_are_not_rewritten() {
    let code = "P.x=max(vA.x*1.,vB.x+0.);";
    assert_eq!(compile_main(code), code);
}
