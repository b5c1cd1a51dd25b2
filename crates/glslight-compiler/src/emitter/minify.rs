//! # 縮小
//!
//! 出力を短くするための木の変形です。エミッタがASTの複製に対してのみ適用します。
//!
//! - 連続する式文をコンマ演算子でまとめる（`a;b;` → `a,b;`）
//! - 直後の `return` や `if` の条件式にまとめた式を取り込む
//! - `if(c){a;}else{b;}` を `c?a:b;` に、`if(c){a;}`（`a` が bool）を `c&&a;` にする
//! - `c?x=a:x=b;` を `x=c?a:b;` にする
//! - if・ループの本体が宣言以外の1文だけのブロックなら波括弧を外す
//!
//! 変化がなくなるまで繰り返します。

use crate::frontend::ast::{BinaryOp, Block, Expr, ExprKind, ExternalDeclaration, QualifierSet, Stmt, StmtKind, TranslationUnit};
use crate::frontend::types::Type;

use super::writer::write_expr;

/// 変化がなくなるまで繰り返す回数の上限
const MAX_ROUNDS: usize = 32;

/// 翻訳単位を縮小し、変形した箇所の数を返す
pub fn minify(unit: &mut TranslationUnit) -> usize {
    let mut total = 0;
    for _ in 0..MAX_ROUNDS {
        let mut changes = 0;
        for declaration in &mut unit.declarations {
            if let ExternalDeclaration::Function(function) = declaration {
                changes += minify_block(&mut function.body);
            }
        }
        if changes == 0 {
            break;
        }
        total += changes;
    }
    total
}

/// コンマ演算子の被演算子にできる式の型（void・配列・構造体は不可）
fn comma_operand_type(ty: &Type) -> bool {
    !ty.is_void() && !ty.is_array() && !ty.is_struct() && !ty.is_error()
}

/// コンマ演算子にまとめられる式文の式
fn comma_operand(stmt: &Stmt) -> Option<&Expr> {
    match &stmt.kind {
        StmtKind::Expr(expr) if comma_operand_type(&expr.ty) => Some(expr),
        _ => None,
    }
}

/// 式文1つだけの本体（波括弧の有無を問わない）
fn single_expression(stmt: &Stmt) -> Option<&Expr> {
    match &stmt.kind {
        StmtKind::Block(block) => match block.statements.as_slice() {
            [only] => comma_operand(only),
            _ => None,
        },
        _ => comma_operand(stmt),
    }
}

fn sequence(mut items: Vec<Expr>) -> Expr {
    if items.len() == 1 {
        return items.remove(0);
    }
    let mut flattened = Vec::with_capacity(items.len());
    for item in items {
        match item.kind {
            ExprKind::Sequence(inner) => flattened.extend(inner),
            _ => flattened.push(item),
        }
    }
    let (ty, location) = match (flattened.first(), flattened.last()) {
        (Some(first), Some(last)) => (last.ty.clone(), first.location),
        _ => (Type::void(), Default::default()),
    };
    Expr {
        kind: ExprKind::Sequence(flattened),
        ty,
        qualifiers: QualifierSet::EMPTY,
        location,
    }
}

fn minify_block(block: &mut Block) -> usize {
    let mut changes = 0;
    for statement in &mut block.statements {
        changes += minify_children(statement);
    }

    let statements = std::mem::take(&mut block.statements);
    let original_len = statements.len();
    let mut result = Vec::with_capacity(original_len);
    let mut pending: Vec<Expr> = Vec::new();

    for statement in statements {
        let statement = match fold_if(&statement) {
            Some(folded) => {
                changes += 1;
                folded
            }
            None => statement,
        };
        let statement = match hoist_ternary_assignment(&statement) {
            Some(hoisted) => {
                changes += 1;
                hoisted
            }
            None => statement,
        };

        if let Some(expr) = comma_operand(&statement) {
            pending.push(expr.clone());
            continue;
        }
        if pending.is_empty() {
            result.push(statement);
            continue;
        }

        let merged = std::mem::take(&mut pending);
        let mut statement = statement;
        match &mut statement.kind {
            StmtKind::Return(Some(value)) if comma_operand_type(&value.ty) => {
                let mut items = merged;
                items.push(value.clone());
                *value = sequence(items);
                changes += 1;
            }
            StmtKind::If { condition, .. } => {
                let mut items = merged;
                items.push(condition.clone());
                *condition = sequence(items);
                changes += 1;
            }
            _ => {
                result.push(flush(merged, &mut changes));
            }
        }
        result.push(statement);
    }
    if !pending.is_empty() {
        result.push(flush(pending, &mut changes));
    }

    block.statements = result;
    changes
}

fn flush(items: Vec<Expr>, changes: &mut usize) -> Stmt {
    if items.len() > 1 {
        *changes += 1;
    }
    let merged = sequence(items);
    let location = merged.location;
    Stmt::new(StmtKind::Expr(merged), location)
}

/// 子の文を縮小し、if・ループの本体の波括弧を外す
fn minify_children(stmt: &mut Stmt) -> usize {
    let mut changes = 0;
    match &mut stmt.kind {
        StmtKind::Block(block) => changes += minify_block(block),
        StmtKind::Switch { body, .. } => changes += minify_block(body),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            changes += minify_body(then_branch);
            if let Some(else_branch) = else_branch {
                changes += minify_body(else_branch);
            }
        }
        StmtKind::Loop(lp) => changes += minify_body(&mut lp.body),
        _ => {}
    }
    changes
}

fn minify_body(body: &mut Stmt) -> usize {
    let mut changes = minify_children(body);
    let unwrapped = match &mut body.kind {
        StmtKind::Block(block) => match block.statements.as_mut_slice() {
            [only] if !matches!(only.kind, StmtKind::Declaration(_) | StmtKind::Case(_)) => {
                Some(std::mem::replace(only, Stmt::empty(only.location)))
            }
            _ => None,
        },
        _ => None,
    };
    if let Some(inner) = unwrapped {
        *body = inner;
        changes += 1;
    }
    changes
}

/// `if(c){a;}else{b;}` → `c?a:b;`、`if(c){a;}` → `c&&a;`
fn fold_if(stmt: &Stmt) -> Option<Stmt> {
    let (condition, then_branch, else_branch) = match &stmt.kind {
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => (condition, then_branch, else_branch),
        _ => return None,
    };
    let then_expr = single_expression(then_branch)?;
    let folded = match else_branch {
        Some(else_branch) => {
            let else_expr = single_expression(else_branch)?;
            if then_expr.ty != else_expr.ty {
                return None;
            }
            Expr::typed(
                ExprKind::Ternary {
                    condition: Box::new(condition.clone()),
                    then_expr: Box::new(then_expr.clone()),
                    else_expr: Box::new(else_expr.clone()),
                },
                then_expr.ty.clone(),
                stmt.location,
            )
        }
        None if then_expr.ty == Type::bool() => Expr::typed(
            ExprKind::Binary {
                op: BinaryOp::And,
                left: Box::new(condition.clone()),
                right: Box::new(then_expr.clone()),
            },
            Type::bool(),
            stmt.location,
        ),
        None => return None,
    };
    Some(Stmt::new(StmtKind::Expr(folded), stmt.location))
}

/// `c?x=a:x=b;` → `x=c?a:b;`
fn hoist_ternary_assignment(stmt: &Stmt) -> Option<Stmt> {
    let ternary = match &stmt.kind {
        StmtKind::Expr(expr) => expr,
        _ => return None,
    };
    let (condition, then_expr, else_expr) = match &ternary.kind {
        ExprKind::Ternary {
            condition,
            then_expr,
            else_expr,
        } => (condition, then_expr, else_expr),
        _ => return None,
    };
    let (then_op, then_target, then_value) = match &then_expr.kind {
        ExprKind::Assign { op, target, value } => (op, target, value),
        _ => return None,
    };
    let (else_op, else_target, else_value) = match &else_expr.kind {
        ExprKind::Assign { op, target, value } => (op, target, value),
        _ => return None,
    };
    if then_op != else_op
        || then_value.ty != else_value.ty
        || then_target.has_side_effects()
        || write_expr(then_target) != write_expr(else_target)
    {
        return None;
    }
    let selected = Expr::typed(
        ExprKind::Ternary {
            condition: condition.clone(),
            then_expr: then_value.clone(),
            else_expr: else_value.clone(),
        },
        then_value.ty.clone(),
        ternary.location,
    );
    let assignment = Expr {
        kind: ExprKind::Assign {
            op: *then_op,
            target: then_target.clone(),
            value: Box::new(selected),
        },
        ty: then_expr.ty.clone(),
        qualifiers: then_expr.qualifiers,
        location: ternary.location,
    };
    Some(Stmt::new(StmtKind::Expr(assignment), stmt.location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::writer::write_unit;
    use crate::frontend::{GlslParser, ShaderStage, SourceParser};
    use crate::limits::ResourceLimits;

    const HEADER: &str = "#version 300 es\nprecision mediump float;uniform vec4 vA;uniform bool iB;out vec4 P;";

    fn minified(body: &str) -> String {
        let source = format!("{}{}", HEADER, body);
        let mut unit = GlslParser::new()
            .parse(&source, ShaderStage::Fragment, &ResourceLimits::default())
            .unwrap()
            .unit;
        minify(&mut unit);
        let text = write_unit(&unit, false);
        text.strip_prefix(HEADER).unwrap_or(&text).to_string()
    }

    #[test]
    fn test_comma_merge() {
        assert_eq!(minified("void main(){P=vA;P.x=1.;P.y=2.;}"), "void main(){P=vA,P.x=1.,P.y=2.;}");
    }

    #[test]
    fn test_merge_into_return() {
        assert_eq!(
            minified("float f(){P=vA;return vA.x;}void main(){P.x=f();}"),
            "float f(){return P=vA,vA.x;}void main(){P.x=f();}"
        );
    }

    #[test]
    fn test_if_else_to_ternary_and_hoist() {
        assert_eq!(
            minified("void main(){if(iB){P=vA;}else{P=-vA;}}"),
            "void main(){P=iB?vA:-vA;}"
        );
    }

    #[test]
    fn test_if_without_else_and_unwrap() {
        assert_eq!(
            minified("void main(){for(int i=0;i<2;i++){P.x+=1.;}}"),
            "void main(){for(int i=0;i<2;i++)P.x+=1.;}"
        );
        assert_eq!(minified("void main(){bool b;if(iB){b=true;}}"), "void main(){bool b;iB&&(b=true);}");
    }

    #[test]
    fn test_declarations_stay_in_blocks() {
        let body = "void main(){if(iB){float x=1.;}}";
        assert_eq!(minified(body), body);
    }
}
