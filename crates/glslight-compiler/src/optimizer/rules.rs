//! # 書き換え規則
//!
//! 各規則はノードを読み取り、置き換え後のノードを返すか `None` で辞退する純粋関数です。
//! 等価性を静的に示せない場合（結果の型が変わる、代入先に副作用がある、
//! 定数が厳密なゼロ・1でない）は必ず辞退します。
//!
//! 組み込み関数・制御構造・テクスチャ操作を対象とする規則はありません。

use crate::frontend::ast::{AssignOp, BinaryOp, Expr, ExprKind, Stmt, StmtKind, UnaryOp};

use super::constant::{is_one, is_zero};
use super::{OptimizerOptions, RelationalNegation, RewriteRule};

/// 既定の規則列（適用順）
pub fn default_rules(options: &OptimizerOptions) -> Vec<Box<dyn RewriteRule>> {
    vec![
        Box::new(UnaryIdentity),
        Box::new(ComparisonNegation {
            strictness: options.relational_negation,
        }),
        Box::new(TernaryNegation),
        Box::new(AdditiveIdentity),
        Box::new(MultiplicativeIdentity),
    ]
}

/// `+X`、`-(-X)`、`~~X`、`!!X` を畳む
#[derive(Debug, Clone, Copy, Default)]
pub struct UnaryIdentity;

impl RewriteRule for UnaryIdentity {
    fn name(&self) -> &'static str {
        "unary-identity"
    }

    fn rewrite_expr(&self, expr: &Expr) -> Option<Expr> {
        let (op, operand) = match &expr.kind {
            ExprKind::Unary { op, operand } => (*op, operand),
            _ => return None,
        };
        match op {
            UnaryOp::Plus => Some(operand.as_ref().clone()),
            UnaryOp::Minus | UnaryOp::BitNot | UnaryOp::Not => match &operand.kind {
                ExprKind::Unary {
                    op: inner,
                    operand: innermost,
                } if *inner == op && innermost.ty == expr.ty => Some(innermost.as_ref().clone()),
                _ => None,
            },
            _ => None,
        }
    }
}

/// `!(A op B)` を逆の比較に置き換える
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparisonNegation {
    /// 浮動小数点の大小比較を対象にするか
    pub strictness: RelationalNegation,
}

impl RewriteRule for ComparisonNegation {
    fn name(&self) -> &'static str {
        "relational-negation"
    }

    fn rewrite_expr(&self, expr: &Expr) -> Option<Expr> {
        let operand = match &expr.kind {
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => operand,
            _ => return None,
        };
        let (op, left, right) = match &operand.kind {
            ExprKind::Binary { op, left, right } => (*op, left, right),
            _ => return None,
        };
        let negated = op.negated_comparison()?;
        // NaN があると < と >= は補集合にならない
        if self.strictness == RelationalNegation::TotalOrderOnly && op.is_relational() && left.ty.is_float() {
            return None;
        }
        Some(Expr {
            kind: ExprKind::Binary {
                op: negated,
                left: left.clone(),
                right: right.clone(),
            },
            ty: expr.ty.clone(),
            qualifiers: operand.qualifiers,
            location: expr.location,
        })
    }
}

/// `!C ? A : B` を `C ? B : A` に置き換える
#[derive(Debug, Clone, Copy, Default)]
pub struct TernaryNegation;

impl RewriteRule for TernaryNegation {
    fn name(&self) -> &'static str {
        "ternary-negation"
    }

    fn rewrite_expr(&self, expr: &Expr) -> Option<Expr> {
        let (condition, then_expr, else_expr) = match &expr.kind {
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => (condition, then_expr, else_expr),
            _ => return None,
        };
        let inner = match &condition.kind {
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => operand,
            _ => return None,
        };
        Some(Expr {
            kind: ExprKind::Ternary {
                condition: inner.clone(),
                then_expr: else_expr.clone(),
                else_expr: then_expr.clone(),
            },
            ty: expr.ty.clone(),
            qualifiers: expr.qualifiers,
            location: expr.location,
        })
    }
}

/// `X+0`、`0+X`、`X-0`、`0-X`、文としての `X+=0` / `X-=0`
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditiveIdentity;

impl RewriteRule for AdditiveIdentity {
    fn name(&self) -> &'static str {
        "additive-identity"
    }

    fn rewrite_expr(&self, expr: &Expr) -> Option<Expr> {
        let (op, left, right) = match &expr.kind {
            ExprKind::Binary { op, left, right } => (*op, left, right),
            _ => return None,
        };
        match op {
            BinaryOp::Add | BinaryOp::Sub if is_zero(right) && left.ty == expr.ty => Some(left.as_ref().clone()),
            BinaryOp::Add if is_zero(left) && right.ty == expr.ty => Some(right.as_ref().clone()),
            BinaryOp::Sub if is_zero(left) && right.ty == expr.ty => {
                let mut negated = Expr::unary(UnaryOp::Minus, right.as_ref().clone(), expr.location);
                negated.qualifiers = expr.qualifiers;
                Some(negated)
            }
            _ => None,
        }
    }

    fn rewrite_stmt(&self, stmt: &Stmt) -> Option<Stmt> {
        match compound_assignment(stmt)? {
            (BinaryOp::Add | BinaryOp::Sub, target, value) if is_zero(value) && no_op_operand(target, value) => {
                Some(Stmt::empty(stmt.location))
            }
            _ => None,
        }
    }
}

/// `X*1`、`X/1`、`1*X`（左がスカラー、またはベクトル同士）、文としての `X*=1` / `X/=1`
///
/// 行列に対する左からの恒等元は畳みません。
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplicativeIdentity;

impl RewriteRule for MultiplicativeIdentity {
    fn name(&self) -> &'static str {
        "multiplicative-identity"
    }

    fn rewrite_expr(&self, expr: &Expr) -> Option<Expr> {
        let (op, left, right) = match &expr.kind {
            ExprKind::Binary { op, left, right } => (*op, left, right),
            _ => return None,
        };
        match op {
            BinaryOp::Mul | BinaryOp::Div
                if is_one(right) && left.ty == expr.ty && (right.ty.is_scalar() || right.ty == left.ty) =>
            {
                Some(left.as_ref().clone())
            }
            BinaryOp::Mul
                if is_one(left)
                    && right.ty == expr.ty
                    && !right.ty.is_matrix()
                    && (left.ty.is_scalar() || left.ty == right.ty) =>
            {
                Some(right.as_ref().clone())
            }
            _ => None,
        }
    }

    fn rewrite_stmt(&self, stmt: &Stmt) -> Option<Stmt> {
        match compound_assignment(stmt)? {
            (BinaryOp::Mul | BinaryOp::Div, target, value) if is_one(value) && no_op_operand(target, value) => {
                Some(Stmt::empty(stmt.location))
            }
            _ => None,
        }
    }
}

/// 式文の複合代入を分解
fn compound_assignment(stmt: &Stmt) -> Option<(BinaryOp, &Expr, &Expr)> {
    match &stmt.kind {
        StmtKind::Expr(Expr {
            kind:
                ExprKind::Assign {
                    op: AssignOp::Compound(op),
                    target,
                    value,
                },
            ..
        }) => Some((*op, target, value)),
        _ => None,
    }
}

/// 代入先を評価しても副作用がなく、値がスカラーか代入先と同じ型
fn no_op_operand(target: &Expr, value: &Expr) -> bool {
    !target.has_side_effects() && !target.ty.is_error() && (value.ty.is_scalar() || value.ty == target.ty)
}
