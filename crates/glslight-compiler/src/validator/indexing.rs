//! # インデックス検査
//!
//! 添字の定数性と範囲を検査します。非定数の添字が許されるかどうかは
//! 添字対象の記憶域によって `limits_general*Indexing` フラグで決まります。

use crate::diagnostics::DiagnosticCode;
use crate::frontend::ast::{Callee, Expr, ExprKind, QualifierSet};
use crate::frontend::error::SourceLocation;
use crate::frontend::ShaderStage;
use crate::limits::LimitKey;

use super::Checker;

/// 添字対象の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCategory {
    /// サンプラー配列
    Sampler,
    /// uniform 変数
    Uniform,
    /// 頂点属性（attribute / 頂点シェーダの in）
    Attribute,
    /// ステージ間変数・フラグメント出力
    Varying,
    /// const のベクトル・行列
    ConstantMatrixVector,
    /// その他の変数
    Variable,
}

impl IndexCategory {
    /// 添字対象の根の記憶域から分類する
    pub fn classify(base: &Expr, stage: ShaderStage) -> Self {
        if base.ty.is_sampler() && base.ty.is_array() {
            return IndexCategory::Sampler;
        }
        let qualifiers = base.qualifiers;
        if qualifiers.contains(QualifierSet::UNIFORM) {
            IndexCategory::Uniform
        } else if qualifiers.contains(QualifierSet::ATTRIBUTE)
            || (qualifiers.contains(QualifierSet::INPUT) && stage == ShaderStage::Vertex)
        {
            IndexCategory::Attribute
        } else if qualifiers.contains(QualifierSet::VARYING)
            || qualifiers.contains(QualifierSet::INPUT)
            || qualifiers.contains(QualifierSet::OUTPUT)
        {
            IndexCategory::Varying
        } else if qualifiers.contains(QualifierSet::CONST) && !base.ty.is_array() {
            IndexCategory::ConstantMatrixVector
        } else {
            IndexCategory::Variable
        }
    }

    /// 非定数インデックスを許可するフラグ
    pub fn flag(&self) -> LimitKey {
        match self {
            IndexCategory::Sampler => LimitKey::GeneralSamplerIndexing,
            IndexCategory::Uniform => LimitKey::GeneralUniformIndexing,
            IndexCategory::Attribute => LimitKey::GeneralAttributeMatrixVectorIndexing,
            IndexCategory::Varying => LimitKey::GeneralVaryingIndexing,
            IndexCategory::ConstantMatrixVector => LimitKey::GeneralConstantMatrixVectorIndexing,
            IndexCategory::Variable => LimitKey::GeneralVariableIndexing,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            IndexCategory::Sampler => "サンプラー配列",
            IndexCategory::Uniform => "uniform 変数",
            IndexCategory::Attribute => "頂点属性",
            IndexCategory::Varying => "ステージ間変数",
            IndexCategory::ConstantMatrixVector => "const のベクトル・行列",
            IndexCategory::Variable => "変数",
        }
    }
}

/// 定数インデックス式（定数とループカウンタだけから成る式）か
pub fn is_constant_index_expression(expr: &Expr, loop_indices: &[String]) -> bool {
    if expr.qualifiers.contains(QualifierSet::CONST) {
        return true;
    }
    match &expr.kind {
        ExprKind::Literal(_) => true,
        ExprKind::Variable(name) => loop_indices.iter().any(|index| index == name),
        ExprKind::Unary { op, operand } => !op.is_increment() && is_constant_index_expression(operand, loop_indices),
        ExprKind::Binary { left, right, .. } => {
            is_constant_index_expression(left, loop_indices) && is_constant_index_expression(right, loop_indices)
        }
        ExprKind::Ternary {
            condition,
            then_expr,
            else_expr,
        } => [condition, then_expr, else_expr]
            .iter()
            .all(|e| is_constant_index_expression(e, loop_indices)),
        ExprKind::Call {
            callee: Callee::Builtin(_) | Callee::Constructor(_),
            args,
        } => args.iter().all(|arg| is_constant_index_expression(arg, loop_indices)),
        ExprKind::Swizzle { base, .. } | ExprKind::Field { base, .. } => is_constant_index_expression(base, loop_indices),
        ExprKind::Index { base, index } => {
            is_constant_index_expression(base, loop_indices) && is_constant_index_expression(index, loop_indices)
        }
        ExprKind::Call { .. } | ExprKind::Assign { .. } | ExprKind::Sequence(_) => false,
    }
}

impl Checker<'_> {
    /// 添字アクセスを検査
    pub(crate) fn check_index(&mut self, base: &Expr, index: &Expr, location: SourceLocation) {
        if base.ty.is_error() || index.ty.is_error() {
            return;
        }
        let bound = match base.ty.index_bound() {
            Some(bound) => bound,
            None => {
                self.sink.error(
                    DiagnosticCode::TypeMismatch,
                    format!("{} には添字を使用できません", base.ty),
                    location,
                );
                return;
            }
        };
        if !(index.ty.is_integer() && index.ty.is_scalar()) {
            self.sink.error(
                DiagnosticCode::TypeMismatch,
                format!("添字は整数スカラーである必要があります（{}）", index.ty),
                index.location,
            );
            return;
        }

        if let Some(value) = self.evaluate_int(index) {
            if value < 0 || value >= i64::from(bound) {
                self.sink.error(
                    DiagnosticCode::IndexOutOfRange,
                    format!("添字 {} は {} の範囲 [0, {}) の外です", value, base.ty, bound),
                    index.location,
                );
            }
            return;
        }
        if is_constant_index_expression(index, &self.loop_indices) {
            return;
        }

        let category = IndexCategory::classify(base, self.stage);
        let flag = category.flag();
        if !self.limits.flag(flag) {
            self.sink.error(
                DiagnosticCode::NonConstantIndexNotSupported,
                format!(
                    "{}への非定数インデックスはサポートされていません（{} = 0）",
                    category.describe(),
                    flag.as_str()
                ),
                index.location,
            );
        }
    }
}
