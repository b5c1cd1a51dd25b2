//! # ループ形状の検査
//!
//! 帰納的forループ（定数で初期化された1つのカウンタを、定数との比較で終了し、
//! 定数刻みで更新するループ）かどうかを判定し、`limits_*Loops` フラグで
//! 許可されていない形のループを報告します。

use std::collections::HashMap;

use crate::diagnostics::DiagnosticCode;
use crate::frontend::ast::{
    AssignOp, BinaryOp, Callee, Expr, ExprKind, FunctionPrototype, Loop, LoopKind, ParameterDirection, Stmt, StmtKind,
};
use crate::frontend::error::SourceLocation;
use crate::frontend::types::Type;

use super::typecheck::is_const;
use super::Checker;

/// 帰納的forループの解析結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InductiveLoop {
    /// ループカウンタの名前
    pub counter: String,
}

/// 名前ごとのユーザー定義関数の多重定義
pub type FunctionTable<'a> = HashMap<&'a str, Vec<&'a FunctionPrototype>>;

/// for ループが帰納的か解析する
///
/// `functions` はカウンタを out / inout 引数に渡す呼び出しの判定に使います。
/// 帰納的でない場合はその理由を返します。
pub fn analyze_for(lp: &Loop, functions: &FunctionTable<'_>) -> Result<InductiveLoop, String> {
    let init = lp.init.as_deref().ok_or("初期化文がありません")?;
    let decl = match &init.kind {
        StmtKind::Declaration(decl) => decl,
        _ => return Err("初期化文がループカウンタの宣言ではありません".to_string()),
    };
    let declarator = match decl.declarators.as_slice() {
        [declarator] => declarator,
        _ => return Err("ループカウンタは1つだけ宣言する必要があります".to_string()),
    };
    if declarator.ty != Type::int() && declarator.ty != Type::uint() {
        return Err(format!("ループカウンタ '{}' は int または uint である必要があります", declarator.name));
    }
    match &declarator.initializer {
        Some(initializer) if is_const(initializer) => {}
        _ => return Err(format!("ループカウンタ '{}' は定数で初期化する必要があります", declarator.name)),
    }
    let counter = declarator.name.as_str();

    let condition = lp.condition.as_ref().ok_or("条件式がありません")?;
    let condition_ok = match &condition.kind {
        ExprKind::Binary { op, left, right } if op.is_comparison() => {
            (is_counter(left, counter) && is_const(right)) || (is_const(left) && is_counter(right, counter))
        }
        _ => false,
    };
    if !condition_ok {
        return Err(format!("条件式はループカウンタ '{}' と定数の比較である必要があります", counter));
    }

    let step = lp.step.as_ref().ok_or("更新式がありません")?;
    let step_ok = match &step.kind {
        ExprKind::Unary { op, operand } => op.is_increment() && is_counter(operand, counter),
        ExprKind::Assign {
            op: AssignOp::Compound(BinaryOp::Add | BinaryOp::Sub),
            target,
            value,
        } => is_counter(target, counter) && is_const(value),
        _ => false,
    };
    if !step_ok {
        return Err(format!(
            "更新式はループカウンタ '{}' の ++、-- または定数の +=、-= である必要があります",
            counter
        ));
    }

    if modifies(&lp.body, counter, functions) {
        return Err(format!("ループ本体でループカウンタ '{}' が変更されています", counter));
    }
    Ok(InductiveLoop {
        counter: counter.to_string(),
    })
}

fn is_counter(expr: &Expr, counter: &str) -> bool {
    matches!(&expr.kind, ExprKind::Variable(name) if name == counter)
}

fn writes(target: &Expr, counter: &str) -> bool {
    target.root_variable() == Some(counter)
}

/// 文の中でカウンタに代入・増減しているか（out / inout 引数への受け渡しを含む）
fn modifies(body: &Stmt, counter: &str, functions: &FunctionTable<'_>) -> bool {
    let mut found = false;
    body.walk_exprs(&mut |expr| {
        found |= match &expr.kind {
            ExprKind::Assign { target, .. } => writes(target, counter),
            ExprKind::Unary { op, operand } if op.is_increment() => writes(operand, counter),
            ExprKind::Call {
                callee: Callee::User(name),
                args,
            } => output_arguments(functions, name, args).any(|arg| writes(arg, counter)),
            _ => false,
        };
    });
    found
}

/// 呼び出しのうち out / inout パラメータに渡される引数
///
/// 一致する多重定義がなければ何も返しません（呼び出しの検査で報告されます）。
fn output_arguments<'e>(functions: &FunctionTable<'_>, name: &str, args: &'e [Expr]) -> impl Iterator<Item = &'e Expr> {
    let arg_types: Vec<Type> = args.iter().map(|arg| arg.ty.clone()).collect();
    let directions: Vec<ParameterDirection> = functions
        .get(name)
        .and_then(|overloads| overloads.iter().find(|prototype| prototype.parameter_types() == arg_types))
        .map(|prototype| prototype.parameters.iter().map(|parameter| parameter.direction).collect())
        .unwrap_or_default();
    args.iter()
        .zip(directions)
        .filter(|(_, direction)| *direction != ParameterDirection::In)
        .map(|(arg, _)| arg)
}

impl Checker<'_> {
    /// ループ文を検査
    pub(crate) fn check_loop(&mut self, lp: &Loop, location: SourceLocation) {
        self.constants.push();
        let mut counter = None;
        match lp.kind {
            LoopKind::For => {
                if let Some(init) = &lp.init {
                    self.check_stmt(init);
                }
                if let Some(condition) = &lp.condition {
                    self.check_full_expr(condition);
                    self.check_condition(condition, "for");
                }
                if let Some(step) = &lp.step {
                    self.check_full_expr(step);
                }
                match analyze_for(lp, &self.functions) {
                    Ok(inductive) => counter = Some(inductive.counter),
                    Err(reason) => {
                        if !self.limits.non_inductive_for_loops() {
                            self.sink.error(
                                DiagnosticCode::NonInductiveForLoopNotSupported,
                                format!("非帰納的な for ループはサポートされていません: {}", reason),
                                location,
                            );
                        }
                    }
                }
            }
            LoopKind::While | LoopKind::DoWhile => {
                if let Some(condition) = &lp.condition {
                    self.check_full_expr(condition);
                    let what = if lp.kind == LoopKind::While { "while" } else { "do-while" };
                    self.check_condition(condition, what);
                }
                if lp.kind == LoopKind::While && !self.limits.while_loops() {
                    self.sink.error(
                        DiagnosticCode::WhileLoopNotSupported,
                        "while ループはサポートされていません",
                        location,
                    );
                }
                if lp.kind == LoopKind::DoWhile && !self.limits.do_while_loops() {
                    self.sink.error(
                        DiagnosticCode::DoWhileLoopNotSupported,
                        "do-while ループはサポートされていません",
                        location,
                    );
                }
            }
        }

        let inductive = counter.is_some();
        if let Some(counter) = counter {
            self.loop_indices.push(counter);
        }
        match &lp.body.kind {
            StmtKind::Block(block) => self.check_block(block, lp.kind != LoopKind::For),
            _ => self.check_stmt(&lp.body),
        }
        if inductive {
            self.loop_indices.pop();
        }
        self.constants.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::ExternalDeclaration;
    use crate::frontend::{GlslParser, ShaderStage, SourceParser};
    use crate::limits::{LimitOverrides, LimitValue, ResourceLimits};
    use crate::validator::validate;

    fn first_loop(source: &str) -> Loop {
        let output = GlslParser::new()
            .parse(source, ShaderStage::Vertex, &ResourceLimits::default())
            .unwrap();
        for declaration in output.unit.declarations {
            if let ExternalDeclaration::Function(function) = declaration {
                for statement in function.body.statements {
                    if let StmtKind::Loop(lp) = statement.kind {
                        return lp;
                    }
                }
            }
        }
        panic!("ループが見つかりません");
    }

    #[test]
    fn test_inductive_loop() {
        let lp = first_loop("void main(){ for (int i = 0; i < 10; i += 2) {} }");
        assert_eq!(analyze_for(&lp, &FunctionTable::new()).unwrap().counter, "i");
        let lp = first_loop("void main(){ for (int i = 10; 0 < i; --i) {} }");
        assert!(analyze_for(&lp, &FunctionTable::new()).is_ok());
    }

    #[test]
    fn test_non_inductive_loops() {
        let cases = [
            "void main(){ float x = 0.0; for (; x < 1.0; x += 0.1) {} }",
            "uniform int n;\nvoid main(){ for (int i = 0; i < n; i++) {} }",
            "void main(){ for (int i = 0; i < 4; i++) { i = 2; } }",
            "void main(){ for (float f = 0.0; f < 1.0; f += 0.5) {} }",
            "void main(){ for (int i = 0; i < 4; i *= 2) {} }",
        ];
        for source in cases {
            let lp = first_loop(source);
            assert!(analyze_for(&lp, &FunctionTable::new()).is_err(), "{}", source);
        }
    }

    fn loop_diagnostics(source: &str, flag: &str) -> Vec<DiagnosticCode> {
        let mut overrides = LimitOverrides::new();
        overrides.insert(flag.to_string(), LimitValue::Bool(false));
        let limits = ResourceLimits::from_overrides(&overrides).unwrap();
        let output = GlslParser::new().parse(source, ShaderStage::Vertex, &limits).unwrap();
        validate(&output.unit, ShaderStage::Vertex, &limits)
            .into_iter()
            .map(|d| d.code)
            .collect()
    }

    #[test]
    fn test_loop_flags() {
        assert_eq!(
            loop_diagnostics("void main(){ bool b = true; while (b) { b = false; } }", "limits_whileLoops"),
            vec![DiagnosticCode::WhileLoopNotSupported]
        );
        assert_eq!(
            loop_diagnostics("void main(){ int i = 0; do { i++; } while (i < 3); }", "limits_doWhileLoops"),
            vec![DiagnosticCode::DoWhileLoopNotSupported]
        );
        assert_eq!(
            loop_diagnostics(
                "uniform int n;\nvoid main(){ for (int i = 0; i < n; i++) {} }",
                "limits_nonInductiveForLoops"
            ),
            vec![DiagnosticCode::NonInductiveForLoopNotSupported]
        );
        assert!(loop_diagnostics("void main(){ for (int i = 0; i < 3; i++) {} }", "limits_nonInductiveForLoops").is_empty());
    }

    #[test]
    fn test_counter_passed_to_output_parameter() {
        let flag = "limits_nonInductiveForLoops";
        let through_out = "void set(out int v){ v = 0; }\nvoid main(){ for (int i = 0; i < 4; i++) { set(i); } }";
        assert_eq!(
            loop_diagnostics(through_out, flag),
            vec![DiagnosticCode::NonInductiveForLoopNotSupported]
        );
        let through_inout = "void bump(inout int v){ v++; }\nvoid main(){ for (int i = 0; i < 4; i++) { bump(i); } }";
        assert_eq!(
            loop_diagnostics(through_inout, flag),
            vec![DiagnosticCode::NonInductiveForLoopNotSupported]
        );
        let read_only = "int twice(int v){ return v * 2; }\nvoid main(){ for (int i = 0; i < 4; i++) { twice(i); } }";
        assert!(loop_diagnostics(read_only, flag).is_empty());
    }

    #[test]
    fn test_loop_condition_must_be_bool() {
        let codes = loop_diagnostics("void main(){ int i = 1; while (i) { i--; } }", "limits_doWhileLoops");
        assert_eq!(codes, vec![DiagnosticCode::TypeMismatch]);
    }
}
