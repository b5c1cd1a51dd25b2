//! 最適化前後の式を比較するための小さな評価器
//!
//! リテラル・変数・単項/二項演算子・三項演算子・構築子・スウィズルだけを扱います。
//! 行列は列優先の `Value::Float` で表し、成分ごとの演算だけを評価します。

use std::collections::HashMap;

use glslight_compiler::ast::{BinaryOp, Callee, Constant, Expr, ExprKind, UnaryOp};
use glslight_compiler::frontend::types::{BasicType, Shape, Type};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(Vec<f32>),
    Int(Vec<i32>),
    UInt(Vec<u32>),
    Bool(Vec<bool>),
}

pub type Env = HashMap<String, Value>;

impl Value {
    fn len(&self) -> usize {
        match self {
            Value::Float(v) => v.len(),
            Value::Int(v) => v.len(),
            Value::UInt(v) => v.len(),
            Value::Bool(v) => v.len(),
        }
    }

    fn as_bool(&self) -> bool {
        match self {
            Value::Bool(v) if v.len() == 1 => v[0],
            other => panic!("bool スカラーではありません: {:?}", other),
        }
    }

    fn as_f32s(&self) -> Vec<f32> {
        match self {
            Value::Float(v) => v.clone(),
            Value::Int(v) => v.iter().map(|&x| x as f32).collect(),
            Value::UInt(v) => v.iter().map(|&x| x as f32).collect(),
            Value::Bool(v) => v.iter().map(|&x| if x { 1.0 } else { 0.0 }).collect(),
        }
    }

    fn select(&self, components: &[u8]) -> Value {
        fn pick<T: Copy>(v: &[T], components: &[u8]) -> Vec<T> {
            components.iter().map(|&i| v[i as usize]).collect()
        }
        match self {
            Value::Float(v) => Value::Float(pick(v, components)),
            Value::Int(v) => Value::Int(pick(v, components)),
            Value::UInt(v) => Value::UInt(pick(v, components)),
            Value::Bool(v) => Value::Bool(pick(v, components)),
        }
    }
}

fn broadcast<T: Copy, R>(a: &[T], b: &[T], f: impl Fn(T, T) -> R) -> Vec<R> {
    let n = a.len().max(b.len());
    (0..n)
        .map(|i| f(a[if a.len() == 1 { 0 } else { i }], b[if b.len() == 1 { 0 } else { i }]))
        .collect()
}

fn unary(op: UnaryOp, value: Value) -> Value {
    match (op, value) {
        (UnaryOp::Plus, value) => value,
        (UnaryOp::Minus, Value::Float(v)) => Value::Float(v.into_iter().map(|x| -x).collect()),
        (UnaryOp::Minus, Value::Int(v)) => Value::Int(v.into_iter().map(i32::wrapping_neg).collect()),
        (UnaryOp::Minus, Value::UInt(v)) => Value::UInt(v.into_iter().map(u32::wrapping_neg).collect()),
        (UnaryOp::Not, Value::Bool(v)) => Value::Bool(v.into_iter().map(|x| !x).collect()),
        (UnaryOp::BitNot, Value::Int(v)) => Value::Int(v.into_iter().map(|x| !x).collect()),
        (UnaryOp::BitNot, Value::UInt(v)) => Value::UInt(v.into_iter().map(|x| !x).collect()),
        (op, value) => panic!("評価できない単項演算です: {:?} {:?}", op, value),
    }
}

fn compare<T: PartialOrd + Copy>(op: BinaryOp, a: T, b: T) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Gt => a > b,
        BinaryOp::Le => a <= b,
        BinaryOp::Ge => a >= b,
        _ => unreachable!(),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Value {
    use Value::*;
    match op {
        BinaryOp::Eq => return Bool(vec![left == right]),
        BinaryOp::Ne => return Bool(vec![left != right]),
        _ => {}
    }
    match (op, &left, &right) {
        (BinaryOp::Add, Float(a), Float(b)) => Float(broadcast(a, b, |x, y| x + y)),
        (BinaryOp::Sub, Float(a), Float(b)) => Float(broadcast(a, b, |x, y| x - y)),
        (BinaryOp::Mul, Float(a), Float(b)) => Float(broadcast(a, b, |x, y| x * y)),
        (BinaryOp::Div, Float(a), Float(b)) => Float(broadcast(a, b, |x, y| x / y)),
        (BinaryOp::Add, Int(a), Int(b)) => Int(broadcast(a, b, i32::wrapping_add)),
        (BinaryOp::Sub, Int(a), Int(b)) => Int(broadcast(a, b, i32::wrapping_sub)),
        (BinaryOp::Mul, Int(a), Int(b)) => Int(broadcast(a, b, i32::wrapping_mul)),
        (BinaryOp::Div, Int(a), Int(b)) => Int(broadcast(a, b, |x, y| if y == 0 { 0 } else { x.wrapping_div(y) })),
        (BinaryOp::Add, UInt(a), UInt(b)) => UInt(broadcast(a, b, u32::wrapping_add)),
        (BinaryOp::Sub, UInt(a), UInt(b)) => UInt(broadcast(a, b, u32::wrapping_sub)),
        (BinaryOp::Mul, UInt(a), UInt(b)) => UInt(broadcast(a, b, u32::wrapping_mul)),
        (BinaryOp::Div, UInt(a), UInt(b)) => UInt(broadcast(a, b, |x, y| if y == 0 { 0 } else { x / y })),
        (BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge, Float(a), Float(b)) => {
            Bool(vec![compare(op, a[0], b[0])])
        }
        (BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge, Int(a), Int(b)) => Bool(vec![compare(op, a[0], b[0])]),
        (BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge, UInt(a), UInt(b)) => {
            Bool(vec![compare(op, a[0], b[0])])
        }
        (BinaryOp::And, Bool(a), Bool(b)) => Bool(vec![a[0] && b[0]]),
        (BinaryOp::Or, Bool(a), Bool(b)) => Bool(vec![a[0] || b[0]]),
        (BinaryOp::Xor, Bool(a), Bool(b)) => Bool(vec![a[0] != b[0]]),
        _ => panic!("評価できない二項演算です: {:?} {:?} {:?}", op, left, right),
    }
}

/// 単一のスカラーまたは行列から行列を作る
///
/// スカラーは対角に置き、行列は重なる部分を写して残りを単位行列で埋める。
fn matrix_from(cols: u8, rows: u8, arg: &Type, value: &Value) -> Vec<f32> {
    let source = value.as_f32s();
    let identity = |c: usize, r: usize| if c == r { 1.0 } else { 0.0 };
    let mut components = Vec::with_capacity(cols as usize * rows as usize);
    for c in 0..cols as usize {
        for r in 0..rows as usize {
            components.push(match arg.shape {
                Shape::Scalar if c == r => source[0],
                Shape::Scalar => 0.0,
                Shape::Matrix {
                    cols: source_cols,
                    rows: source_rows,
                } if c < source_cols as usize && r < source_rows as usize => source[c * source_rows as usize + r],
                _ => identity(c, r),
            });
        }
    }
    components
}

fn construct(ty: &Type, args: &[Expr], env: &Env) -> Value {
    let values: Vec<Value> = args.iter().map(|arg| eval(arg, env)).collect();
    if let (Shape::Matrix { cols, rows }, [arg], [value]) = (ty.shape, args, values.as_slice()) {
        if !arg.ty.is_vector() {
            return Value::Float(matrix_from(cols, rows, &arg.ty, value));
        }
    }

    let size = ty.component_count() as usize;
    let mut components: Vec<f32> = values.iter().flat_map(Value::as_f32s).collect();
    if components.len() == 1 && size > 1 {
        components = vec![components[0]; size];
    }
    components.truncate(size);
    match ty.basic {
        BasicType::Float => Value::Float(components),
        BasicType::Int => Value::Int(components.into_iter().map(|x| x as i32).collect()),
        BasicType::UInt => Value::UInt(components.into_iter().map(|x| x as u32).collect()),
        BasicType::Bool => Value::Bool(components.into_iter().map(|x| x != 0.0).collect()),
        _ => panic!("評価できない構築子です: {}", ty),
    }
}

/// 式を評価
pub fn eval(expr: &Expr, env: &Env) -> Value {
    match &expr.kind {
        ExprKind::Literal(constant) => match constant {
            Constant::Float(x) => Value::Float(vec![*x]),
            Constant::Int(x) => Value::Int(vec![*x]),
            Constant::UInt(x) => Value::UInt(vec![*x]),
            Constant::Bool(x) => Value::Bool(vec![*x]),
        },
        ExprKind::Variable(name) => env
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("未定義の変数です: {}", name)),
        ExprKind::Unary { op, operand } => unary(*op, eval(operand, env)),
        ExprKind::Binary { op, left, right } => binary(*op, eval(left, env), eval(right, env)),
        ExprKind::Ternary {
            condition,
            then_expr,
            else_expr,
        } => {
            if eval(condition, env).as_bool() {
                eval(then_expr, env)
            } else {
                eval(else_expr, env)
            }
        }
        ExprKind::Call {
            callee: Callee::Constructor(ty),
            args,
        } => construct(ty, args, env),
        ExprKind::Swizzle { base, components, .. } => eval(base, env).select(components),
        other => panic!("評価できない式です: {:?}", other),
    }
}

/// 評価結果の成分数が型と一致するか
pub fn matches_type(value: &Value, ty: &Type) -> bool {
    value.len() == ty.component_count() as usize
}
