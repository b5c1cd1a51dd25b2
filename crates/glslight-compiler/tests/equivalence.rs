mod common;

use common::eval::{eval, matches_type, Env, Value};
use glslight_compiler::ast::{Expr, ExternalDeclaration, StmtKind};
use glslight_compiler::{
    GlslParser, Optimizer, OptimizerOptions, RelationalNegation, ResourceLimits, ShaderStage, SourceParser, Validator,
};
use proptest::prelude::*;

const HEADER: &str = "#version 300 es\nprecision mediump float;\
uniform float f0,f1;uniform vec2 a0,a1;uniform vec3 b0,b1;uniform vec4 c0,c1;\
uniform mat2 n0,n1;uniform mat3 m0,m1;\
uniform int i0,i1;uniform uint u0,u1;uniform bool q0,q1;uniform bvec3 w0,w1;out vec4 P;";

/// 生成する式の型
#[derive(Debug, Clone, Copy)]
enum Kind {
    /// float（1成分）・vec2〜vec4
    Float(u8),
    /// mat2・mat3
    Matrix(u8),
    Int,
    UInt,
    Bool,
}

impl Kind {
    fn type_name(self) -> &'static str {
        match self {
            Kind::Float(1) => "float",
            Kind::Float(2) => "vec2",
            Kind::Float(3) => "vec3",
            Kind::Float(_) => "vec4",
            Kind::Matrix(2) => "mat2",
            Kind::Matrix(_) => "mat3",
            Kind::Int => "int",
            Kind::UInt => "uint",
            Kind::Bool => "bool",
        }
    }

    fn variables(self) -> [&'static str; 2] {
        match self {
            Kind::Float(1) => ["f0", "f1"],
            Kind::Float(2) => ["a0", "a1"],
            Kind::Float(3) => ["b0", "b1"],
            Kind::Float(_) => ["c0", "c1"],
            Kind::Matrix(2) => ["n0", "n1"],
            Kind::Matrix(_) => ["m0", "m1"],
            Kind::Int => ["i0", "i1"],
            Kind::UInt => ["u0", "u1"],
            Kind::Bool => ["q0", "q1"],
        }
    }

    fn zero(self) -> String {
        match self {
            Kind::Float(1) => "0.".to_string(),
            Kind::Float(n) => format!("vec{}(0)", n),
            Kind::Matrix(n) => format!("mat{}(0.)", n),
            Kind::Int => "0".to_string(),
            Kind::UInt => "0u".to_string(),
            Kind::Bool => "false".to_string(),
        }
    }

    fn one(self) -> String {
        match self {
            Kind::Float(1) => "1.".to_string(),
            Kind::Float(n) => format!("vec{}(1)", n),
            Kind::Matrix(n) => format!("mat{}(1.)", n),
            Kind::Int => "1".to_string(),
            Kind::UInt => "1u".to_string(),
            Kind::Bool => "true".to_string(),
        }
    }
}

fn leaf(kind: Kind) -> BoxedStrategy<String> {
    let [first, second] = kind.variables();
    let literal = match kind {
        Kind::Float(1) => prop_oneof![Just("0.".to_string()), Just("1.".to_string()), Just("2.5".to_string())].boxed(),
        Kind::Float(n) => prop_oneof![Just(format!("vec{}(0)", n)), Just(format!("vec{}(1)", n)), Just(format!("vec{}(.5)", n))].boxed(),
        Kind::Matrix(n) => prop_oneof![Just(format!("mat{}(0.)", n)), Just(format!("mat{}(1.)", n)), Just(format!("mat{}(.5)", n))].boxed(),
        Kind::Int => prop_oneof![Just("0".to_string()), Just("1".to_string()), Just("3".to_string())].boxed(),
        Kind::UInt => prop_oneof![Just("0u".to_string()), Just("1u".to_string()), Just("7u".to_string())].boxed(),
        Kind::Bool => prop_oneof![Just("true".to_string()), Just("false".to_string())].boxed(),
    };
    prop_oneof![
        3 => Just(first.to_string()),
        3 => Just(second.to_string()),
        2 => literal,
    ]
    .boxed()
}

fn unary(prefix: &'static str, operand: BoxedStrategy<String>) -> BoxedStrategy<String> {
    operand.prop_map(move |e| format!("({}{})", prefix, e)).boxed()
}

fn binary(left: BoxedStrategy<String>, op: &'static str, right: BoxedStrategy<String>) -> BoxedStrategy<String> {
    (left, right).prop_map(move |(l, r)| format!("({}{}{})", l, op, r)).boxed()
}

fn with_identity(operand: BoxedStrategy<String>, kind: Kind) -> BoxedStrategy<String> {
    let (zero, one) = (kind.zero(), kind.one());
    let scalar_one = match kind {
        Kind::Float(_) => "1.".to_string(),
        _ => one.clone(),
    };
    operand
        .prop_flat_map(move |e| {
            prop_oneof![
                Just(format!("({}+{})", e, zero)),
                Just(format!("({}+{})", zero, e)),
                Just(format!("({}-{})", e, zero)),
                Just(format!("({}*{})", e, one)),
                Just(format!("({}*{})", one, e)),
                Just(format!("({}*{})", e, scalar_one)),
                Just(format!("({}/{})", e, one)),
            ]
        })
        .boxed()
}

fn float_expr(n: u8, depth: u32) -> BoxedStrategy<String> {
    let kind = Kind::Float(n);
    if depth == 0 {
        return leaf(kind);
    }
    let sub = || float_expr(n, depth - 1);
    let base = prop_oneof![
        3 => leaf(kind),
        1 => unary("+", sub()),
        2 => unary("-", sub()),
        1 => binary(sub(), "+", sub()),
        1 => binary(sub(), "-", sub()),
        1 => binary(sub(), "*", sub()),
        1 => sub().prop_map(|e| format!("({}/2.)", e)),
        1 => binary(float_expr(1, depth - 1), "*", sub()),
        2 => with_identity(sub(), kind),
        1 => sub().prop_map(|e| format!("(0.-{})", e)),
        1 => (bool_expr(depth - 1), sub(), sub()).prop_map(|(c, a, b)| format!("({}?{}:{})", c, a, b)),
    ]
    .boxed();
    if n != 4 {
        return base;
    }
    // vec4(mat2(1.)) は (1,0,0,1) であり恒等元ではない
    prop_oneof![
        10 => base,
        1 => matrix_expr(2, depth - 1).prop_map(|m| format!("vec4({})", m)),
        1 => sub().prop_flat_map(|e| {
            prop_oneof![
                Just(format!("({}*vec4(mat2(1.)))", e)),
                Just(format!("(vec4(mat2(1.))*{})", e)),
                Just(format!("({}+vec4(mat2(0.)))", e)),
                Just(format!("({}*vec4(mat2(mat3(1.))))", e)),
            ]
        }),
    ]
    .boxed()
}

/// 正方行列の式（行列同士の積は生成しない）
fn matrix_expr(n: u8, depth: u32) -> BoxedStrategy<String> {
    let kind = Kind::Matrix(n);
    if depth == 0 {
        return leaf(kind);
    }
    let sub = || matrix_expr(n, depth - 1);
    let other = if n == 2 { 3 } else { 2 };
    let zero = kind.zero();
    prop_oneof![
        3 => leaf(kind),
        1 => unary("+", sub()),
        1 => unary("-", sub()),
        1 => binary(sub(), "+", sub()),
        1 => binary(sub(), "-", sub()),
        1 => binary(float_expr(1, depth - 1), "*", sub()),
        1 => binary(sub(), "*", float_expr(1, depth - 1)),
        2 => sub().prop_flat_map(move |e| {
            prop_oneof![
                Just(format!("({}+{})", e, zero)),
                Just(format!("({}-{})", zero, e)),
                Just(format!("({}*1.)", e)),
                Just(format!("(1.*{})", e)),
                Just(format!("({}/1.)", e)),
            ]
        }),
        // mat3(mat2(0.)) の [2][2] は 1
        2 => sub().prop_flat_map(move |e| {
            prop_oneof![
                Just(format!("({}+mat{}(mat{}(0.)))", e, n, other)),
                Just(format!("(mat{}(mat{}(0.))+{})", n, other, e)),
                Just(format!("({}-mat{}(mat{}(1.)))", e, n, other)),
            ]
        }),
        2 => matrix_expr(other, depth - 1).prop_map(move |m| format!("mat{}({})", n, m)),
        1 => (bool_expr(depth - 1), sub(), sub()).prop_map(|(c, a, b)| format!("({}?{}:{})", c, a, b)),
    ]
    .boxed()
}

fn int_expr(depth: u32) -> BoxedStrategy<String> {
    if depth == 0 {
        return leaf(Kind::Int);
    }
    let sub = || int_expr(depth - 1);
    prop_oneof![
        3 => leaf(Kind::Int),
        1 => unary("+", sub()),
        2 => unary("-", sub()),
        2 => unary("~", sub()),
        1 => binary(sub(), "+", sub()),
        1 => binary(sub(), "-", sub()),
        1 => binary(sub(), "*", sub()),
        2 => with_identity(sub(), Kind::Int),
        1 => sub().prop_map(|e| format!("(0-{})", e)),
    ]
    .boxed()
}

fn uint_expr(depth: u32) -> BoxedStrategy<String> {
    if depth == 0 {
        return leaf(Kind::UInt);
    }
    let sub = || uint_expr(depth - 1);
    prop_oneof![
        3 => leaf(Kind::UInt),
        2 => unary("~", sub()),
        1 => binary(sub(), "+", sub()),
        1 => binary(sub(), "*", sub()),
        2 => with_identity(sub(), Kind::UInt),
    ]
    .boxed()
}

fn comparison(operands: BoxedStrategy<(String, String)>) -> BoxedStrategy<String> {
    (operands, prop::sample::select(vec!["<", ">", "<=", ">=", "==", "!="]))
        .prop_map(|((l, r), op)| format!("({}{}{})", l, op, r))
        .boxed()
}

fn bool_expr(depth: u32) -> BoxedStrategy<String> {
    if depth == 0 {
        return leaf(Kind::Bool);
    }
    let sub = || bool_expr(depth - 1);
    prop_oneof![
        3 => leaf(Kind::Bool),
        3 => unary("!", sub()),
        2 => comparison((float_expr(1, depth - 1), float_expr(1, depth - 1)).boxed()).prop_map(|c| format!("(!{})", c)),
        1 => comparison((int_expr(depth - 1), int_expr(depth - 1)).boxed()),
        1 => (float_expr(4, depth - 1), float_expr(4, depth - 1), prop::sample::select(vec!["==", "!="]))
            .prop_map(|(l, r, op)| format!("(!({}{}{}))", l, op, r)),
        1 => (prop::sample::select(vec!["w0==w1", "w0!=w1", "w1==w1"])).prop_map(|c| format!("(!({}))", c)),
        1 => binary(sub(), "&&", sub()),
        1 => binary(sub(), "||", sub()),
        1 => binary(sub(), "^^", sub()),
        1 => (sub(), sub(), sub()).prop_map(|(c, a, b)| format!("(!{}?{}:{})", c, a, b)),
    ]
    .boxed()
}

fn expr_of(kind: Kind) -> BoxedStrategy<String> {
    const DEPTH: u32 = 3;
    match kind {
        Kind::Float(n) => float_expr(n, DEPTH),
        Kind::Matrix(n) => matrix_expr(n, DEPTH),
        Kind::Int => int_expr(DEPTH),
        Kind::UInt => uint_expr(DEPTH),
        Kind::Bool => bool_expr(DEPTH),
    }
}

fn any_case() -> BoxedStrategy<(Kind, String)> {
    let case = |kind: Kind| (Just(kind), expr_of(kind));
    prop_oneof![
        case(Kind::Float(1)),
        case(Kind::Float(2)),
        case(Kind::Float(3)),
        case(Kind::Float(4)),
        case(Kind::Matrix(2)),
        case(Kind::Matrix(3)),
        case(Kind::Int),
        case(Kind::UInt),
        case(Kind::Bool),
    ]
    .boxed()
}

fn float_input() -> BoxedStrategy<f32> {
    prop_oneof![
        1 => Just(0.0f32),
        1 => Just(-0.0f32),
        1 => Just(1.0f32),
        6 => -100.0f32..100.0f32,
    ]
    .boxed()
}

fn env() -> BoxedStrategy<Env> {
    (
        prop::collection::vec(float_input(), 46),
        prop::collection::vec(any::<i32>(), 4),
        prop::collection::vec(any::<u32>(), 4),
        prop::collection::vec(any::<bool>(), 8),
    )
        .prop_map(|(floats, ints, uints, bools)| {
            let mut env = Env::new();
            let mut floats = floats.into_iter();
            for (names, width) in [(["f0", "f1"], 1), (["a0", "a1"], 2), (["b0", "b1"], 3), (["c0", "c1"], 4), (["n0", "n1"], 4), (["m0", "m1"], 9)] {
                for name in names {
                    env.insert(name.to_string(), Value::Float(floats.by_ref().take(width).collect()));
                }
            }
            env.insert("i0".to_string(), Value::Int(vec![ints[0]]));
            env.insert("i1".to_string(), Value::Int(vec![ints[1]]));
            env.insert("u0".to_string(), Value::UInt(vec![uints[0]]));
            env.insert("u1".to_string(), Value::UInt(vec![uints[1]]));
            env.insert("q0".to_string(), Value::Bool(vec![bools[0]]));
            env.insert("q1".to_string(), Value::Bool(vec![bools[1]]));
            env.insert("w0".to_string(), Value::Bool(bools[2..5].to_vec()));
            env.insert("w1".to_string(), Value::Bool(bools[5..8].to_vec()));
            env
        })
        .boxed()
}

/// `TYPE r=EXPR;` を解析・検証し、初期化子の式を取り出す
fn parse_initializer(kind: Kind, text: &str) -> Expr {
    let source = format!("{}void main(){{{} r={};P=vec4(0.);}}", HEADER, kind.type_name(), text);
    let limits = ResourceLimits::default();
    let parsed = GlslParser::new()
        .parse(&source, ShaderStage::Fragment, &limits)
        .unwrap_or_else(|errors| panic!("{}\n{:?}", source, errors));
    let mut diagnostics = parsed.diagnostics;
    diagnostics.extend(Validator::new(&limits, ShaderStage::Fragment).validate(&parsed.unit));
    assert!(diagnostics.iter().all(|d| !d.is_error()), "{}\n{:?}", source, diagnostics);

    let function = parsed
        .unit
        .declarations
        .into_iter()
        .find_map(|declaration| match declaration {
            ExternalDeclaration::Function(function) => Some(function),
            _ => None,
        })
        .unwrap();
    match function.body.statements.into_iter().next().map(|stmt| stmt.kind) {
        Some(StmtKind::Declaration(mut decl)) => decl.declarators.remove(0).initializer.unwrap(),
        other => panic!("宣言文ではありません: {:?}", other),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn optimized_expression_evaluates_identically((kind, text) in any_case(), env in env()) {
        let original = parse_initializer(kind, &text);
        let mut optimized = original.clone();
        let report = Optimizer::default().optimize_expression(&mut optimized);

        prop_assert!(report.reached_fixpoint, "{}", text);
        prop_assert_eq!(&optimized.ty, &original.ty);
        let before = eval(&original, &env);
        let after = eval(&optimized, &env);
        prop_assert!(matches_type(&before, &original.ty));
        prop_assert_eq!(before, after, "{}", text);
    }

    #[test]
    fn second_optimization_is_a_no_op((kind, text) in any_case()) {
        let mut expr = parse_initializer(kind, &text);
        let optimizer = Optimizer::default();
        optimizer.optimize_expression(&mut expr);
        let once = expr.clone();
        let report = optimizer.optimize_expression(&mut expr);
        prop_assert_eq!(report.rewrites, 0);
        prop_assert_eq!(expr, once);
    }

    #[test]
    fn total_order_only_keeps_float_comparisons(text in bool_expr(2), env in env()) {
        let original = parse_initializer(Kind::Bool, &text);
        let mut optimized = original.clone();
        let options = OptimizerOptions {
            relational_negation: RelationalNegation::TotalOrderOnly,
            ..OptimizerOptions::default()
        };
        Optimizer::new(options).optimize_expression(&mut optimized);
        prop_assert_eq!(eval(&original, &env), eval(&optimized, &env), "{}", text);
    }
}
