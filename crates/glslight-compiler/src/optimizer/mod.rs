//! # オプティマイザ
//!
//! 検証済みのASTに対して、意味を変えない局所的な書き換え規則（[`RewriteRule`]）を
//! 不動点に達するまで繰り返し適用します。
//!
//! ## 走査の順序
//! 1. 子を先に最適化する（ボトムアップ）
//! 2. ノードに対して、どの規則も適用されなくなるまで規則を順に試す
//! 3. 1パスで書き換えが1件もなければ不動点とする
//!
//! パス数には上限があり（既定ではツリーの深さから決定）、上限に達した場合は
//! [`OptimizationReport::reached_fixpoint`] が `false` になりエラーログを出力します。
//!
//! 組み込み関数の呼び出しの内部には立ち入りません。

use std::collections::BTreeMap;

use log::{debug, error, trace};
use serde::{Deserialize, Serialize};

use crate::frontend::ast::{
    Block, Callee, Declaration, Expr, ExprKind, ExternalDeclaration, Stmt, StmtKind, TranslationUnit,
};

pub mod constant;
pub mod rules;

/// 1ノードで連続して適用できる書き換えの上限
const MAX_REWRITES_PER_NODE: usize = 64;

/// パス数上限の最小値
const MIN_PASSES: usize = 4;

/// ツリーの深さ1あたりのパス数
const PASSES_PER_DEPTH: usize = 2;

/// ブロックから空文を取り除いた件数の集計名
const EMPTY_STATEMENT: &str = "empty-statement";

/// 書き換え規則
///
/// 規則は純粋関数です。置き換え後のノードを返すか、`None` で辞退します。
/// 置き換え後のノードは元のノードの型・修飾子・位置情報を引き継ぐ必要があります。
pub trait RewriteRule: Send + Sync {
    /// 規則名（統計とログに使用）
    fn name(&self) -> &'static str;

    /// 式を書き換える
    fn rewrite_expr(&self, _expr: &Expr) -> Option<Expr> {
        None
    }

    /// 文を書き換える
    fn rewrite_stmt(&self, _stmt: &Stmt) -> Option<Stmt> {
        None
    }
}

/// `!(A op B)` の書き換えの厳しさ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationalNegation {
    /// すべての比較演算子を反転する
    #[default]
    Always,
    /// 浮動小数点の `< > <= >=` は反転しない（NaN で結果が変わるため）
    TotalOrderOnly,
}

/// オプティマイザの設定
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerOptions {
    /// パス数の上限（`None` ならツリーの深さから決定）
    pub max_passes: Option<usize>,
    /// 比較の否定の扱い
    pub relational_negation: RelationalNegation,
}

/// 最適化の結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptimizationReport {
    /// 実行したパス数
    pub passes: usize,
    /// 書き換えの総数
    pub rewrites: usize,
    /// 不動点に達したか
    pub reached_fixpoint: bool,
    /// 規則ごとの書き換え数
    pub per_rule: BTreeMap<&'static str, usize>,
}

impl OptimizationReport {
    fn absorb(&mut self, pass: Pass<'_>) {
        self.rewrites += pass.rewrites;
        for (name, count) in pass.per_rule {
            *self.per_rule.entry(name).or_insert(0) += count;
        }
    }
}

/// オプティマイザ
pub struct Optimizer {
    rules: Vec<Box<dyn RewriteRule>>,
    options: OptimizerOptions,
}

impl Optimizer {
    /// 既定の規則列でオプティマイザを作成
    pub fn new(options: OptimizerOptions) -> Self {
        let rules = rules::default_rules(&options);
        Self { rules, options }
    }

    /// 任意の規則列でオプティマイザを作成
    pub fn with_rules(rules: Vec<Box<dyn RewriteRule>>, options: OptimizerOptions) -> Self {
        Self { rules, options }
    }

    /// 設定
    pub fn options(&self) -> &OptimizerOptions {
        &self.options
    }

    /// 適用順の規則名
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// 深さ `depth` のツリーに対するパス数の上限
    pub fn pass_limit(&self, depth: usize) -> usize {
        self.options
            .max_passes
            .unwrap_or_else(|| (depth * PASSES_PER_DEPTH).max(MIN_PASSES))
            .max(1)
    }

    /// 翻訳単位全体（関数本体と大域変数の初期化子）を最適化
    pub fn optimize(&self, unit: &mut TranslationUnit) -> OptimizationReport {
        let limit = self.pass_limit(unit.depth());
        self.run_to_fixpoint(limit, |pass| {
            for declaration in &mut unit.declarations {
                match declaration {
                    ExternalDeclaration::Function(function) => pass.block(&mut function.body, false),
                    ExternalDeclaration::Variables(decl) => pass.declaration(decl),
                    _ => {}
                }
            }
        })
    }

    /// 単独の式を最適化
    pub fn optimize_expression(&self, expr: &mut Expr) -> OptimizationReport {
        let limit = self.pass_limit(expr.depth());
        self.run_to_fixpoint(limit, |pass| pass.expr(expr))
    }

    fn run_to_fixpoint(&self, limit: usize, mut run_pass: impl FnMut(&mut Pass<'_>)) -> OptimizationReport {
        let mut report = OptimizationReport::default();
        while report.passes < limit {
            let mut pass = Pass::new(&self.rules);
            run_pass(&mut pass);
            report.passes += 1;
            debug!("最適化パス {}: {} 件の書き換え", report.passes, pass.rewrites);
            if pass.rewrites == 0 {
                report.reached_fixpoint = true;
                break;
            }
            report.absorb(pass);
        }
        if !report.reached_fixpoint {
            error!(
                "最適化がパス数の上限 {} に達しました（不動点に到達していません, 書き換え {} 件）",
                limit, report.rewrites
            );
        }
        report
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(OptimizerOptions::default())
    }
}

impl std::fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("rules", &self.rule_names())
            .field("options", &self.options)
            .finish()
    }
}

/// 1パス分の走査状態
struct Pass<'r> {
    rules: &'r [Box<dyn RewriteRule>],
    rewrites: usize,
    per_rule: BTreeMap<&'static str, usize>,
}

impl<'r> Pass<'r> {
    fn new(rules: &'r [Box<dyn RewriteRule>]) -> Self {
        Self {
            rules,
            rewrites: 0,
            per_rule: BTreeMap::new(),
        }
    }

    fn record(&mut self, name: &'static str, count: usize) {
        self.rewrites += count;
        *self.per_rule.entry(name).or_insert(0) += count;
    }

    /// `in_switch` のブロックでは空文を残す（caseラベル直後の空文は意味を持つ）
    fn block(&mut self, block: &mut Block, in_switch: bool) {
        for statement in &mut block.statements {
            self.stmt(statement);
        }
        if !in_switch {
            let before = block.statements.len();
            block.statements.retain(|statement| !statement.is_empty());
            let removed = before - block.statements.len();
            if removed > 0 {
                trace!("{}: {} 件の空文を削除", EMPTY_STATEMENT, removed);
                self.record(EMPTY_STATEMENT, removed);
            }
        }
    }

    fn declaration(&mut self, decl: &mut Declaration) {
        for declarator in &mut decl.declarators {
            if let Some(initializer) = &mut declarator.initializer {
                self.expr(initializer);
            }
        }
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Expr(expr) => self.expr(expr),
            StmtKind::Declaration(decl) => self.declaration(decl),
            StmtKind::Block(block) => self.block(block, false),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition);
                self.stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch);
                }
            }
            StmtKind::Loop(lp) => {
                if let Some(init) = &mut lp.init {
                    self.stmt(init);
                }
                if let Some(condition) = &mut lp.condition {
                    self.expr(condition);
                }
                if let Some(step) = &mut lp.step {
                    self.expr(step);
                }
                self.stmt(&mut lp.body);
            }
            StmtKind::Switch { selector, body } => {
                self.expr(selector);
                self.block(body, true);
            }
            StmtKind::Return(Some(value)) => self.expr(value),
            StmtKind::Case(_)
            | StmtKind::Return(None)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Discard
            | StmtKind::Empty => {}
        }

        for _ in 0..MAX_REWRITES_PER_NODE {
            let rewritten = self
                .rules
                .iter()
                .find_map(|rule| rule.rewrite_stmt(stmt).map(|replacement| (rule.name(), replacement)));
            match rewritten {
                Some((name, replacement)) => {
                    trace!("{}: 文を書き換えました ({})", name, stmt.location);
                    *stmt = replacement;
                    self.record(name, 1);
                }
                None => break,
            }
        }
    }

    fn expr(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Literal(_) | ExprKind::Variable(_) => {}
            ExprKind::Call {
                callee: Callee::Builtin(_),
                ..
            } => return,
            ExprKind::Call { args, .. } | ExprKind::Sequence(args) => {
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::Assign { target, value, .. } => {
                self.expr(target);
                self.expr(value);
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expr(condition);
                self.expr(then_expr);
                self.expr(else_expr);
            }
            ExprKind::Swizzle { base, .. } | ExprKind::Field { base, .. } => self.expr(base),
            ExprKind::Index { base, index } => {
                self.expr(base);
                self.expr(index);
            }
        }

        for _ in 0..MAX_REWRITES_PER_NODE {
            let rewritten = self
                .rules
                .iter()
                .find_map(|rule| rule.rewrite_expr(expr).map(|replacement| (rule.name(), replacement)));
            match rewritten {
                Some((name, replacement)) => {
                    trace!("{}: 式を書き換えました ({})", name, expr.location);
                    *expr = replacement;
                    self.record(name, 1);
                }
                None => break,
            }
        }
    }
}
