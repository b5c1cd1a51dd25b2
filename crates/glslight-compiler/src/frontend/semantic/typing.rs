//! # 演算子と構築子の型規則
//!
//! GLSL ESには暗黙の型変換がないため、演算の結果型は被演算子の型から一意に決まります。
//! 名前解決は結果型の付与に、バリデータは型不一致の検出に同じ規則を使用します。

use crate::frontend::ast::{BinaryOp, UnaryOp};
use crate::frontend::types::{BasicType, Shape, Type};

/// 単項演算の結果型（不正なら `None`）
pub fn unary_result(op: UnaryOp, operand: &Type) -> Option<Type> {
    match op {
        UnaryOp::Plus
        | UnaryOp::Minus
        | UnaryOp::PreIncrement
        | UnaryOp::PreDecrement
        | UnaryOp::PostIncrement
        | UnaryOp::PostDecrement => operand.is_arithmetic().then(|| operand.clone()),
        UnaryOp::Not => (*operand == Type::bool()).then(Type::bool),
        UnaryOp::BitNot => (operand.is_integer() && !operand.is_array() && !operand.is_matrix()).then(|| operand.clone()),
    }
}

/// 二項演算の結果型（不正なら `None`）
pub fn binary_result(op: BinaryOp, left: &Type, right: &Type) -> Option<Type> {
    if left.is_error() || right.is_error() {
        return None;
    }
    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            (left == right && !left.is_sampler() && !left.is_void()).then(Type::bool)
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            (left == right && left.is_scalar() && left.is_numeric()).then(Type::bool)
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
            (*left == Type::bool() && *right == Type::bool()).then(Type::bool)
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Div => arithmetic_result(left, right, false),
        BinaryOp::Mul => arithmetic_result(left, right, true),
        BinaryOp::Mod | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
            if !left.is_integer() || left.basic != right.basic || left.is_matrix() || right.is_matrix() {
                return None;
            }
            broadcast(left, right)
        }
        BinaryOp::Shl | BinaryOp::Shr => {
            if !left.is_integer() || !right.is_integer() || left.is_array() || right.is_array() {
                return None;
            }
            match (left.shape, right.shape) {
                (Shape::Scalar, Shape::Scalar) => Some(left.clone()),
                (Shape::Vector(_), Shape::Scalar) => Some(left.clone()),
                (Shape::Vector(a), Shape::Vector(b)) if a == b => Some(left.clone()),
                _ => None,
            }
        }
    }
}

/// 算術演算（+ - * /）の結果型
fn arithmetic_result(left: &Type, right: &Type, multiply: bool) -> Option<Type> {
    if !left.is_arithmetic() || !right.is_arithmetic() || left.basic != right.basic {
        return None;
    }
    if multiply && left.basic == BasicType::Float {
        match (left.shape, right.shape) {
            (Shape::Vector(n), Shape::Matrix { cols, rows }) => {
                return (rows == n).then(|| Type::vector(BasicType::Float, cols));
            }
            (Shape::Matrix { cols, rows }, Shape::Vector(n)) => {
                return (cols == n).then(|| Type::vector(BasicType::Float, rows));
            }
            (Shape::Matrix { cols: lc, rows: lr }, Shape::Matrix { cols: rc, rows: rr }) => {
                return (lc == rr).then(|| Type::matrix(rc, lr));
            }
            _ => {}
        }
    }
    broadcast(left, right)
}

/// 同形状、またはスカラーと他方の組み合わせ
fn broadcast(left: &Type, right: &Type) -> Option<Type> {
    match (left.shape, right.shape) {
        (a, b) if a == b => Some(left.clone()),
        (Shape::Scalar, _) => Some(right.clone()),
        (_, Shape::Scalar) => Some(left.clone()),
        _ => None,
    }
}

/// 複合代入 `target op= value` が型として正しいか
pub fn compound_assignment_valid(op: BinaryOp, target: &Type, value: &Type) -> bool {
    binary_result(op, target, value).map_or(false, |result| result == *target)
}

/// 構築子の引数を検査し、不正ならその理由を返す
///
/// `fields` には構造体構築子の場合のメンバ型を渡します。
pub fn check_constructor(target: &Type, args: &[Type], fields: Option<&[Type]>) -> Result<(), String> {
    if args.iter().any(Type::is_error) {
        return Ok(());
    }
    if args.is_empty() {
        return Err(format!("{} の構築子には引数が必要です", target));
    }
    if let Some(size) = target.array {
        let element = target.element_type();
        if args.len() as u32 != size {
            return Err(format!("{} の構築子には {} 個の引数が必要です", target, size));
        }
        return match args.iter().find(|arg| **arg != element) {
            Some(arg) => Err(format!("配列構築子の引数 {} は {} ではありません", arg, element)),
            None => Ok(()),
        };
    }
    if let BasicType::Struct(name) = &target.basic {
        let fields = fields.unwrap_or(&[]);
        if args.len() != fields.len() {
            return Err(format!("構造体 {} の構築子には {} 個の引数が必要です", name, fields.len()));
        }
        return match args.iter().zip(fields).find(|(arg, field)| arg != field) {
            Some((arg, field)) => Err(format!("構造体 {} のメンバ {} に {} は渡せません", name, field, arg)),
            None => Ok(()),
        };
    }
    if !constructible(target) {
        return Err(format!("{} は構築できません", target));
    }
    if let Some(arg) = args.iter().find(|arg| arg.is_array() || !constructible(arg)) {
        return Err(format!("{} は構築子の引数にできません", arg));
    }

    if target.is_scalar() {
        return if args.len() == 1 {
            Ok(())
        } else {
            Err(format!("{} の構築子には引数が1つだけ必要です", target))
        };
    }
    if args.len() == 1 && (args[0].is_scalar() || (target.is_matrix() && args[0].is_matrix())) {
        return Ok(());
    }
    if target.is_matrix() && args.iter().any(Type::is_matrix) {
        return Err("行列から行列を構築する場合は引数を1つにする必要があります".to_string());
    }

    let needed = target.component_count();
    let mut supplied = 0;
    for (index, arg) in args.iter().enumerate() {
        if supplied >= needed {
            return Err(format!("{} の構築子の引数 {} は使用されません", target, index + 1));
        }
        supplied += arg.component_count();
    }
    if supplied < needed {
        return Err(format!("{} の構築子の引数が足りません（{} / {} 成分）", target, supplied, needed));
    }
    Ok(())
}

/// スカラー・ベクトル・行列の基本型（float / int / uint / bool）か
fn constructible(ty: &Type) -> bool {
    ty.basic.scalar_kind().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec(n: u8) -> Type {
        Type::vector(BasicType::Float, n)
    }

    #[test]
    fn test_matrix_products() {
        assert_eq!(binary_result(BinaryOp::Mul, &Type::matrix(3, 3), &vec(3)), Some(vec(3)));
        assert_eq!(binary_result(BinaryOp::Mul, &vec(2), &Type::matrix(3, 2)), Some(vec(3)));
        assert_eq!(binary_result(BinaryOp::Mul, &Type::matrix(2, 3), &Type::matrix(4, 2)), Some(Type::matrix(4, 3)));
        assert_eq!(binary_result(BinaryOp::Mul, &Type::matrix(2, 3), &vec(3)), None);
        assert_eq!(binary_result(BinaryOp::Add, &Type::matrix(2, 2), &Type::float()), Some(Type::matrix(2, 2)));
    }

    #[test]
    fn test_no_implicit_conversion() {
        assert_eq!(binary_result(BinaryOp::Add, &Type::float(), &Type::int()), None);
        assert_eq!(binary_result(BinaryOp::Add, &vec(3), &vec(4)), None);
        assert_eq!(binary_result(BinaryOp::Mul, &Type::float(), &vec(4)), Some(vec(4)));
        assert_eq!(binary_result(BinaryOp::Lt, &vec(2), &vec(2)), None);
        assert_eq!(binary_result(BinaryOp::Eq, &vec(2), &vec(2)), Some(Type::bool()));
        assert_eq!(binary_result(BinaryOp::Mod, &Type::float(), &Type::float()), None);
        assert_eq!(binary_result(BinaryOp::Shl, &Type::vector(BasicType::Int, 3), &Type::uint()), Some(Type::vector(BasicType::Int, 3)));
    }

    #[test]
    fn test_unary_rules() {
        assert_eq!(unary_result(UnaryOp::Not, &Type::bool()), Some(Type::bool()));
        assert_eq!(unary_result(UnaryOp::Not, &Type::vector(BasicType::Bool, 2)), None);
        assert_eq!(unary_result(UnaryOp::BitNot, &Type::float()), None);
        assert_eq!(unary_result(UnaryOp::Minus, &Type::matrix(2, 2)), Some(Type::matrix(2, 2)));
    }

    #[test]
    fn test_constructors() {
        assert!(check_constructor(&vec(4), &[Type::float()], None).is_ok());
        assert!(check_constructor(&vec(4), &[vec(2), vec(2)], None).is_ok());
        assert!(check_constructor(&vec(4), &[vec(3)], None).is_err());
        assert!(check_constructor(&vec(2), &[vec(2), Type::float()], None).is_err());
        assert!(check_constructor(&vec(3), &[vec(4)], None).is_ok());
        assert!(check_constructor(&Type::matrix(3, 3), &[Type::matrix(4, 4)], None).is_ok());
        assert!(check_constructor(&Type::float(), &[Type::int(), Type::int()], None).is_err());
        let array = Type::float().with_array(Some(2));
        assert!(check_constructor(&array, &[Type::float(), Type::float()], None).is_ok());
        assert!(check_constructor(&array, &[Type::float()], None).is_err());
    }
}
