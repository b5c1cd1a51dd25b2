//! # 定数式の評価
//!
//! 配列サイズ、定数インデックス、テクセルオフセットなどの定数式を評価します。
//! 値は成分の列として扱い、スカラーは1成分の列です。
//! 評価できない式（行列積、組み込み関数、ゼロ除算など）は `None` になります。

use std::collections::HashMap;

use crate::frontend::ast::{BinaryOp, Callee, Constant, Expr, ExprKind, UnaryOp};
use crate::frontend::types::{BasicType, Type};

/// 定数式を成分の列として評価
///
/// `lookup` は定数変数の値を返します。
pub fn evaluate(expr: &Expr, lookup: &dyn Fn(&str) -> Option<Vec<Constant>>) -> Option<Vec<Constant>> {
    match &expr.kind {
        ExprKind::Literal(value) => Some(vec![*value]),
        ExprKind::Variable(name) => lookup(name),
        ExprKind::Unary { op, operand } => {
            let values = evaluate(operand, lookup)?;
            values.into_iter().map(|value| unary(*op, value)).collect()
        }
        ExprKind::Binary { op, left, right } => {
            if *op == BinaryOp::Mul && (left.ty.is_matrix() || right.ty.is_matrix()) {
                return None;
            }
            let left = evaluate(left, lookup)?;
            let right = evaluate(right, lookup)?;
            binary(*op, &left, &right)
        }
        ExprKind::Ternary {
            condition,
            then_expr,
            else_expr,
        } => match evaluate(condition, lookup)?.as_slice() {
            [Constant::Bool(true)] => evaluate(then_expr, lookup),
            [Constant::Bool(false)] => evaluate(else_expr, lookup),
            _ => None,
        },
        ExprKind::Call {
            callee: Callee::Constructor(ty),
            args,
        } => {
            let mut components = Vec::new();
            for arg in args {
                components.extend(evaluate(arg, lookup)?);
            }
            construct(ty, components, args.len())
        }
        ExprKind::Swizzle { base, components, .. } => {
            let values = evaluate(base, lookup)?;
            components.iter().map(|&c| values.get(c as usize).copied()).collect()
        }
        ExprKind::Index { base, index } if base.ty.is_vector() => {
            let values = evaluate(base, lookup)?;
            let index = evaluate_int(index, lookup)?;
            usize::try_from(index).ok().and_then(|i| values.get(i)).map(|value| vec![*value])
        }
        ExprKind::Sequence(exprs) => exprs.last().and_then(|last| evaluate(last, lookup)),
        _ => None,
    }
}

/// 整数スカラーの定数式を評価
pub fn evaluate_int(expr: &Expr, lookup: &dyn Fn(&str) -> Option<Vec<Constant>>) -> Option<i64> {
    match evaluate(expr, lookup)?.as_slice() {
        [Constant::Int(value)] => Some(*value as i64),
        [Constant::UInt(value)] => Some(*value as i64),
        _ => None,
    }
}

/// 基本型への変換（GLSLの構築子の規則）
pub fn convert(value: Constant, basic: &BasicType) -> Option<Constant> {
    let converted = match (value, basic) {
        (Constant::Float(v), BasicType::Float) => Constant::Float(v),
        (Constant::Float(v), BasicType::Int) => Constant::Int(v as i32),
        (Constant::Float(v), BasicType::UInt) => Constant::UInt(v as u32),
        (Constant::Float(v), BasicType::Bool) => Constant::Bool(v != 0.0),
        (Constant::Int(v), BasicType::Float) => Constant::Float(v as f32),
        (Constant::Int(v), BasicType::Int) => Constant::Int(v),
        (Constant::Int(v), BasicType::UInt) => Constant::UInt(v as u32),
        (Constant::Int(v), BasicType::Bool) => Constant::Bool(v != 0),
        (Constant::UInt(v), BasicType::Float) => Constant::Float(v as f32),
        (Constant::UInt(v), BasicType::Int) => Constant::Int(v as i32),
        (Constant::UInt(v), BasicType::UInt) => Constant::UInt(v),
        (Constant::UInt(v), BasicType::Bool) => Constant::Bool(v != 0),
        (Constant::Bool(v), BasicType::Float) => Constant::Float(if v { 1.0 } else { 0.0 }),
        (Constant::Bool(v), BasicType::Int) => Constant::Int(v as i32),
        (Constant::Bool(v), BasicType::UInt) => Constant::UInt(v as u32),
        (Constant::Bool(v), BasicType::Bool) => Constant::Bool(v),
        _ => return None,
    };
    Some(converted)
}

fn construct(ty: &Type, components: Vec<Constant>, arg_count: usize) -> Option<Vec<Constant>> {
    if ty.is_array() || ty.is_matrix() || ty.is_struct() {
        return None;
    }
    let size = ty.component_count() as usize;
    let first = *components.first()?;
    let values: Vec<Constant> = if arg_count == 1 && components.len() == 1 {
        vec![first; size]
    } else if components.len() >= size {
        components.into_iter().take(size).collect()
    } else {
        return None;
    };
    values.into_iter().map(|value| convert(value, &ty.basic)).collect()
}

fn unary(op: UnaryOp, value: Constant) -> Option<Constant> {
    let result = match (op, value) {
        (UnaryOp::Plus, v) => v,
        (UnaryOp::Minus, Constant::Float(v)) => Constant::Float(-v),
        (UnaryOp::Minus, Constant::Int(v)) => Constant::Int(v.wrapping_neg()),
        (UnaryOp::Minus, Constant::UInt(v)) => Constant::UInt(v.wrapping_neg()),
        (UnaryOp::Not, Constant::Bool(v)) => Constant::Bool(!v),
        (UnaryOp::BitNot, Constant::Int(v)) => Constant::Int(!v),
        (UnaryOp::BitNot, Constant::UInt(v)) => Constant::UInt(!v),
        _ => return None,
    };
    Some(result)
}

fn binary(op: BinaryOp, left: &[Constant], right: &[Constant]) -> Option<Vec<Constant>> {
    if op.is_equality() {
        if left.len() != right.len() {
            return None;
        }
        let equal = left.iter().zip(right).all(|(l, r)| l == r);
        return Some(vec![Constant::Bool(equal == (op == BinaryOp::Eq))]);
    }
    let len = left.len().max(right.len());
    if (left.len() != len && left.len() != 1) || (right.len() != len && right.len() != 1) {
        return None;
    }
    (0..len)
        .map(|i| {
            let l = left[if left.len() == 1 { 0 } else { i }];
            let r = right[if right.len() == 1 { 0 } else { i }];
            scalar_binary(op, l, r)
        })
        .collect()
}

fn scalar_binary(op: BinaryOp, left: Constant, right: Constant) -> Option<Constant> {
    use Constant::{Bool, Float, Int, UInt};
    let result = match (left, right) {
        (Float(l), Float(r)) => match op {
            BinaryOp::Add => Float(l + r),
            BinaryOp::Sub => Float(l - r),
            BinaryOp::Mul => Float(l * r),
            BinaryOp::Div if r != 0.0 => Float(l / r),
            BinaryOp::Lt => Bool(l < r),
            BinaryOp::Gt => Bool(l > r),
            BinaryOp::Le => Bool(l <= r),
            BinaryOp::Ge => Bool(l >= r),
            _ => return None,
        },
        (Int(l), Int(r)) => match op {
            BinaryOp::Add => Int(l.wrapping_add(r)),
            BinaryOp::Sub => Int(l.wrapping_sub(r)),
            BinaryOp::Mul => Int(l.wrapping_mul(r)),
            BinaryOp::Div => Int(l.checked_div(r)?),
            BinaryOp::Mod => Int(l.checked_rem(r)?),
            BinaryOp::BitAnd => Int(l & r),
            BinaryOp::BitOr => Int(l | r),
            BinaryOp::BitXor => Int(l ^ r),
            BinaryOp::Lt => Bool(l < r),
            BinaryOp::Gt => Bool(l > r),
            BinaryOp::Le => Bool(l <= r),
            BinaryOp::Ge => Bool(l >= r),
            BinaryOp::Shl => Int(l.checked_shl(shift_amount(right)?)?),
            BinaryOp::Shr => Int(l.checked_shr(shift_amount(right)?)?),
            _ => return None,
        },
        (UInt(l), UInt(r)) => match op {
            BinaryOp::Add => UInt(l.wrapping_add(r)),
            BinaryOp::Sub => UInt(l.wrapping_sub(r)),
            BinaryOp::Mul => UInt(l.wrapping_mul(r)),
            BinaryOp::Div => UInt(l.checked_div(r)?),
            BinaryOp::Mod => UInt(l.checked_rem(r)?),
            BinaryOp::BitAnd => UInt(l & r),
            BinaryOp::BitOr => UInt(l | r),
            BinaryOp::BitXor => UInt(l ^ r),
            BinaryOp::Lt => Bool(l < r),
            BinaryOp::Gt => Bool(l > r),
            BinaryOp::Le => Bool(l <= r),
            BinaryOp::Ge => Bool(l >= r),
            BinaryOp::Shl => UInt(l.checked_shl(shift_amount(right)?)?),
            BinaryOp::Shr => UInt(l.checked_shr(shift_amount(right)?)?),
            _ => return None,
        },
        (Int(l), UInt(_)) if matches!(op, BinaryOp::Shl | BinaryOp::Shr) => {
            let amount = shift_amount(right)?;
            if op == BinaryOp::Shl {
                Int(l.checked_shl(amount)?)
            } else {
                Int(l.checked_shr(amount)?)
            }
        }
        (UInt(l), Int(_)) if matches!(op, BinaryOp::Shl | BinaryOp::Shr) => {
            let amount = shift_amount(right)?;
            if op == BinaryOp::Shl {
                UInt(l.checked_shl(amount)?)
            } else {
                UInt(l.checked_shr(amount)?)
            }
        }
        (Bool(l), Bool(r)) => match op {
            BinaryOp::And => Bool(l && r),
            BinaryOp::Or => Bool(l || r),
            BinaryOp::Xor => Bool(l != r),
            _ => return None,
        },
        _ => return None,
    };
    Some(result)
}

fn shift_amount(value: Constant) -> Option<u32> {
    match value {
        Constant::Int(v) => u32::try_from(v).ok(),
        Constant::UInt(v) => Some(v),
        _ => None,
    }
}

/// 定数値のスコープ（バリデータ用の軽量な記録）
#[derive(Debug, Default)]
pub struct ConstantScopes {
    scopes: Vec<HashMap<String, Option<Vec<Constant>>>>,
}

impl ConstantScopes {
    /// グローバルスコープだけを持つ記録を作成
    pub fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    /// スコープに入る
    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// スコープから抜ける
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// 名前を宣言（定数でなければ `None` で遮蔽する）
    pub fn declare(&mut self, name: &str, value: Option<Vec<Constant>>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    /// 値を検索
    pub fn lookup(&self, name: &str) -> Option<Vec<Constant>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::error::SourceLocation;

    fn lit(value: Constant) -> Expr {
        Expr::literal(value, SourceLocation::default())
    }

    fn binary_expr(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            SourceLocation::default(),
        )
    }

    #[test]
    fn test_integer_arithmetic() {
        let expr = binary_expr(
            BinaryOp::Add,
            lit(Constant::Int(2)),
            binary_expr(BinaryOp::Mul, lit(Constant::Int(3)), Expr::new(ExprKind::Variable("N".into()), SourceLocation::default())),
        );
        let lookup = |name: &str| (name == "N").then(|| vec![Constant::Int(4)]);
        assert_eq!(evaluate_int(&expr, &lookup), Some(14));
    }

    #[test]
    fn test_division_by_zero_declines() {
        let expr = binary_expr(BinaryOp::Div, lit(Constant::Int(1)), lit(Constant::Int(0)));
        assert_eq!(evaluate(&expr, &|_| None), None);
    }

    #[test]
    fn test_vector_constructor() {
        let ctor = Expr::new(
            ExprKind::Call {
                callee: Callee::Constructor(Type::vector(BasicType::Int, 2)),
                args: vec![lit(Constant::Float(-1.5))],
            },
            SourceLocation::default(),
        );
        assert_eq!(evaluate(&ctor, &|_| None), Some(vec![Constant::Int(-1), Constant::Int(-1)]));
    }

    #[test]
    fn test_constant_scopes() {
        let mut scopes = ConstantScopes::new();
        scopes.declare("N", Some(vec![Constant::Int(3)]));
        scopes.push();
        scopes.declare("N", None);
        assert_eq!(scopes.lookup("N"), None);
        scopes.pop();
        assert_eq!(scopes.lookup("N"), Some(vec![Constant::Int(3)]));
    }
}
