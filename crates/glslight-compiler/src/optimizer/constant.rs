//! # 恒等元の判定
//!
//! リテラルとリテラルだけから成る構築子を成分の列に展開し、
//! 加法・乗法の恒等元として安全に扱えるかを判定します。
//! 定数変数や組み込み関数の畳み込みは行いません。

use crate::frontend::ast::{Callee, Constant, Expr, ExprKind};

/// リテラル（またはリテラルの構築子）の成分を返す
///
/// 行列を引数に取る構築子と、スカラー1つ以外から作る行列は展開しません。
/// どちらも対角や欠けた成分が引数にない値で埋まるためです。
pub fn literal_components(expr: &Expr) -> Option<Vec<Constant>> {
    match &expr.kind {
        ExprKind::Literal(value) => Some(vec![*value]),
        ExprKind::Call {
            callee: Callee::Constructor(ty),
            args,
        } if !ty.is_array() && !ty.is_struct() => {
            if args.iter().any(|arg| arg.ty.is_matrix()) {
                return None;
            }
            if ty.is_matrix() && !matches!(args.as_slice(), [arg] if arg.ty.is_scalar()) {
                return None;
            }
            let mut components = Vec::new();
            for arg in args {
                components.extend(literal_components(arg)?);
            }
            Some(components)
        }
        _ => None,
    }
}

/// すべての成分が正のゼロか（`-0.0` は含まない）
///
/// 行列の構築子 `mat2(0.)` もゼロ行列として扱います。
pub fn is_zero(expr: &Expr) -> bool {
    expr.ty.is_numeric() && all_components(expr, Constant::is_positive_zero)
}

/// すべての成分が1のスカラー・ベクトルか
///
/// `mat2(1.)` は単位行列でありすべての成分が1ではないため、行列は対象外です。
pub fn is_one(expr: &Expr) -> bool {
    expr.ty.is_numeric() && !expr.ty.is_matrix() && all_components(expr, Constant::is_one)
}

fn all_components(expr: &Expr, predicate: fn(&Constant) -> bool) -> bool {
    literal_components(expr).map_or(false, |components| {
        !components.is_empty() && components.iter().all(predicate)
    })
}
