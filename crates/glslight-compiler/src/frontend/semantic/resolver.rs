//! # 名前解決
//!
//! 構文解析直後のASTに対して名前と型を解決します。
//!
//! - すべての式に静的型と記憶域の修飾子集合を付与する
//! - ベクトルに対するフィールド選択をスウィズルに書き換える
//! - 組み込み関数の呼び出しを `Callee::Builtin` に書き換える
//! - 配列サイズの定数式を評価し、宣言子・メンバ・パラメータの型に反映する
//!
//! ここで報告するのは未宣言の識別子と再定義のみで、
//! それ以外の意味的な誤りは型を `Error` にしてバリデータに委ねます。

use std::collections::HashMap;

use log::debug;

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use crate::frontend::ast::{
    ArraySpec, Block, Callee, Declaration, Expr, ExprKind, ExternalDeclaration, FunctionPrototype,
    InterfaceBlock, LanguageVersion, QualifierSet, StmtKind, Stmt, StorageQualifier, StructDefinition,
    StructField, SwizzleSet, TranslationUnit,
};
use crate::frontend::builtins;
use crate::frontend::error::SourceLocation;
use crate::frontend::types::{BasicType, Type};
use crate::limits::ResourceLimits;

use super::const_eval;
use super::scope::{ScopeKind, ScopeStack, Symbol, SymbolKind};
use super::typing;

/// ユーザー定義関数の多重定義1つ
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSymbol {
    /// パラメータの型
    pub parameters: Vec<Type>,
    /// 戻り値の型
    pub return_type: Type,
    /// 本体が定義済みか
    pub defined: bool,
    /// 最初の宣言位置
    pub location: SourceLocation,
}

/// 名前解決器
pub struct Resolver<'a> {
    scopes: ScopeStack,
    functions: HashMap<String, Vec<FunctionSymbol>>,
    structs: HashMap<String, Vec<(String, Type)>>,
    version: LanguageVersion,
    limits: &'a ResourceLimits,
    diagnostics: DiagnosticSink,
}

impl<'a> Resolver<'a> {
    /// 新しい名前解決器を作成
    pub fn new(version: LanguageVersion, limits: &'a ResourceLimits) -> Self {
        let mut scopes = ScopeStack::new();
        for variable in builtins::variables(limits) {
            if !variable.available_in(version) {
                continue;
            }
            let symbol = Symbol::new(
                variable.name,
                SymbolKind::Builtin,
                variable.ty,
                variable.qualifiers,
                SourceLocation::default(),
            )
            .with_value(variable.value.map(|value| vec![value]));
            scopes.declare_builtin(symbol);
        }
        Self {
            scopes,
            functions: HashMap::new(),
            structs: HashMap::new(),
            version,
            limits,
            diagnostics: DiagnosticSink::new(),
        }
    }

    /// 翻訳単位全体を解決し、診断情報を返す
    pub fn resolve(mut self, unit: &mut TranslationUnit) -> Vec<Diagnostic> {
        debug!(
            "名前解決開始: {} 個の外部宣言 ({}, maxDrawBuffers={})",
            unit.declarations.len(),
            self.version,
            self.limits.max_draw_buffers()
        );
        for declaration in &mut unit.declarations {
            match declaration {
                ExternalDeclaration::Precision(_) | ExternalDeclaration::Layout(_) => {}
                ExternalDeclaration::Variables(decl) => self.declaration(decl),
                ExternalDeclaration::Struct(definition) => self.struct_definition(definition),
                ExternalDeclaration::InterfaceBlock(block) => self.interface_block(block),
                ExternalDeclaration::Prototype(prototype) => self.function_prototype(prototype, false),
                ExternalDeclaration::Function(function) => {
                    self.function_prototype(&mut function.prototype, true);
                    self.scopes.enter(ScopeKind::Function);
                    for parameter in &function.prototype.parameters {
                        if let Some(name) = &parameter.name {
                            self.declare(Symbol::new(
                                name.clone(),
                                SymbolKind::Parameter,
                                parameter.ty.clone(),
                                QualifierSet::EMPTY,
                                parameter.location,
                            ));
                        }
                    }
                    // パラメータと本体の最上位は同じスコープ
                    self.block(&mut function.body, false);
                    self.scopes.exit();
                }
            }
        }
        self.diagnostics.into_sorted()
    }

    /// 変数宣言を解決
    fn declaration(&mut self, decl: &mut Declaration) {
        if let Some(definition) = &mut decl.struct_definition {
            self.struct_definition(definition);
        }
        let qualifiers = decl.qualifiers.to_set();
        let constant = decl.qualifiers.is(StorageQualifier::Const);
        for declarator in &mut decl.declarators {
            if let Some(initializer) = &mut declarator.initializer {
                self.expr(initializer);
            }
            let initializer_type = declarator.initializer.as_ref().map(|init| init.ty.clone());
            declarator.ty = match &mut declarator.array {
                None => decl.ty.clone(),
                Some(spec) => match self.array_size(spec, initializer_type.as_ref()) {
                    Some(size) => decl.ty.clone().with_array(Some(size)),
                    None => Type::error(),
                },
            };
            let value = if constant {
                let scopes = &self.scopes;
                declarator
                    .initializer
                    .as_ref()
                    .and_then(|init| const_eval::evaluate(init, &|name| scopes.constant(name)))
            } else {
                None
            };
            let symbol = Symbol::new(
                declarator.name.clone(),
                SymbolKind::Variable,
                declarator.ty.clone(),
                qualifiers,
                declarator.location,
            )
            .with_value(value);
            self.declare(symbol);
        }
    }

    /// 配列サイズを評価（`[]` は初期化子の配列長から決まる）
    fn array_size(&mut self, spec: &mut ArraySpec, initializer: Option<&Type>) -> Option<u32> {
        match spec {
            ArraySpec::Sized(size) => {
                self.expr(size);
                let scopes = &self.scopes;
                const_eval::evaluate_int(size, &|name| scopes.constant(name))
                    .filter(|&n| n > 0)
                    .and_then(|n| u32::try_from(n).ok())
            }
            ArraySpec::Unsized => initializer.and_then(|ty| ty.array),
        }
    }

    fn fields(&mut self, fields: &mut [StructField]) -> Vec<(String, Type)> {
        let mut members = Vec::new();
        for field in fields.iter_mut() {
            if let Some(spec) = &mut field.array {
                field.ty = match self.array_size(spec, None) {
                    Some(size) => field.ty.element_type().with_array(Some(size)),
                    None => Type::error(),
                };
            }
            members.push((field.name.clone(), field.ty.clone()));
        }
        members
    }

    /// 構造体定義を登録
    fn struct_definition(&mut self, definition: &mut StructDefinition) {
        let members = self.fields(&mut definition.fields);
        if self.structs.insert(definition.name.clone(), members).is_some() {
            self.diagnostics.error(
                DiagnosticCode::Redefinition,
                format!("構造体 '{}' は既に定義されています", definition.name),
                definition.location,
            );
        }
    }

    /// インターフェースブロックを登録
    fn interface_block(&mut self, block: &mut InterfaceBlock) {
        let members = self.fields(&mut block.fields);
        let qualifiers = block.qualifiers.to_set();
        self.structs.insert(block.name.clone(), members.clone());
        match &block.instance {
            Some(instance) => {
                let base = Type::scalar(BasicType::Struct(block.name.clone()));
                let ty = match &mut block.instance_array {
                    Some(spec) => match self.array_size(spec, None) {
                        Some(size) => base.with_array(Some(size)),
                        None => Type::error(),
                    },
                    None => base,
                };
                self.declare(Symbol::new(instance.clone(), SymbolKind::Variable, ty, qualifiers, block.location));
            }
            None => {
                for ((name, ty), field) in members.into_iter().zip(&block.fields) {
                    self.declare(Symbol::new(name, SymbolKind::Variable, ty, qualifiers, field.location));
                }
            }
        }
    }

    /// 関数プロトタイプを登録
    fn function_prototype(&mut self, prototype: &mut FunctionPrototype, defining: bool) {
        for parameter in &mut prototype.parameters {
            if let Some(spec) = &mut parameter.array {
                parameter.ty = match self.array_size(spec, None) {
                    Some(size) => parameter.ty.element_type().with_array(Some(size)),
                    None => Type::error(),
                };
            }
        }
        let name = prototype.name.clone();
        let location = prototype.location;
        if name.starts_with("gl_") {
            self.diagnostics.error(
                DiagnosticCode::Redefinition,
                format!("'{}': gl_ で始まる名前は予約されています", name),
                location,
            );
            return;
        }
        if self.scopes.lookup_global(&name).is_some() {
            self.diagnostics.error(
                DiagnosticCode::Redefinition,
                format!("'{}' は既に変数として宣言されています", name),
                location,
            );
            return;
        }
        if self.version.is_es3() && builtins::is_builtin_function(&name) {
            self.diagnostics.error(
                DiagnosticCode::Redefinition,
                format!("組み込み関数 '{}' は再定義できません", name),
                location,
            );
            return;
        }

        let parameters = prototype.parameter_types();
        let overloads = self.functions.entry(name.clone()).or_default();
        let problem = match overloads.iter_mut().find(|f| f.parameters == parameters) {
            Some(existing) if existing.return_type != prototype.return_type => {
                Some(format!("関数 '{}' は戻り値の型だけが異なる多重定義です", name))
            }
            Some(existing) if defining && existing.defined => Some(format!("関数 '{}' は既に定義されています", name)),
            Some(existing) => {
                existing.defined |= defining;
                None
            }
            None => {
                overloads.push(FunctionSymbol {
                    parameters,
                    return_type: prototype.return_type.clone(),
                    defined: defining,
                    location,
                });
                None
            }
        };
        if let Some(message) = problem {
            self.diagnostics.error(DiagnosticCode::Redefinition, message, location);
        }
    }

    /// 現在のスコープにシンボルを宣言
    fn declare(&mut self, symbol: Symbol) {
        let name = symbol.name.clone();
        let location = symbol.location;
        if name.starts_with("gl_") {
            self.diagnostics.error(
                DiagnosticCode::Redefinition,
                format!("'{}': gl_ で始まる名前は予約されています", name),
                location,
            );
            return;
        }
        if self.scopes.is_global() && self.functions.contains_key(&name) {
            self.diagnostics.error(
                DiagnosticCode::Redefinition,
                format!("'{}' は既に関数として宣言されています", name),
                location,
            );
            return;
        }
        if let Err(existing) = self.scopes.declare(symbol) {
            self.diagnostics.error(
                DiagnosticCode::Redefinition,
                format!("'{}' は既に{}として {} で宣言されています", name, existing.kind, existing.location),
                location,
            );
        }
    }

    fn block(&mut self, block: &mut Block, new_scope: bool) {
        if new_scope {
            self.scopes.enter(ScopeKind::Block);
        }
        for statement in &mut block.statements {
            self.statement(statement);
        }
        if new_scope {
            self.scopes.exit();
        }
    }

    /// 入れ子の文（if / ループ本体）を解決
    fn sub_statement(&mut self, statement: &mut Stmt, new_scope: bool) {
        match &mut statement.kind {
            StmtKind::Block(block) => self.block(block, new_scope),
            _ => {
                self.scopes.enter(ScopeKind::Block);
                self.statement(statement);
                self.scopes.exit();
            }
        }
    }

    fn statement(&mut self, statement: &mut Stmt) {
        match &mut statement.kind {
            StmtKind::Expr(expr) => self.expr(expr),
            StmtKind::Declaration(decl) => self.declaration(decl),
            StmtKind::Block(block) => self.block(block, true),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition);
                self.sub_statement(then_branch, true);
                if let Some(else_branch) = else_branch {
                    self.sub_statement(else_branch, true);
                }
            }
            StmtKind::Loop(lp) => {
                self.scopes.enter(ScopeKind::Loop);
                if let Some(init) = &mut lp.init {
                    self.statement(init);
                }
                if let Some(condition) = &mut lp.condition {
                    self.expr(condition);
                }
                if let Some(step) = &mut lp.step {
                    self.expr(step);
                }
                // 本体の複合文は新しいスコープを作らない
                self.sub_statement(&mut lp.body, false);
                self.scopes.exit();
            }
            StmtKind::Switch { selector, body } => {
                self.expr(selector);
                self.block(body, true);
            }
            StmtKind::Case(Some(expr)) | StmtKind::Return(Some(expr)) => self.expr(expr),
            StmtKind::Case(None)
            | StmtKind::Return(None)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Discard
            | StmtKind::Empty => {}
        }
    }

    /// 式を子から順に解決し、型と修飾子を付与
    fn expr(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Literal(_) | ExprKind::Variable(_) => {}
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
            ExprKind::Call { args, .. } | ExprKind::Sequence(args) => {
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::Swizzle { base, .. } | ExprKind::Field { base, .. } => self.expr(base),
            ExprKind::Index { base, index } => {
                self.expr(base);
                self.expr(index);
            }
        }

        // ベクトルのフィールド選択はスウィズル
        if let ExprKind::Field { base, name } = &mut expr.kind {
            if base.ty.is_vector() {
                if let Some((set, components)) = SwizzleSet::parse(name) {
                    let placeholder = Box::new(Expr::new(ExprKind::Sequence(Vec::new()), base.location));
                    let base = std::mem::replace(base, placeholder);
                    expr.kind = ExprKind::Swizzle { base, components, set };
                }
            }
        }

        let (ty, qualifiers) = self.annotate(expr);
        expr.ty = ty;
        expr.qualifiers = qualifiers;
    }

    /// 子が解決済みの式の型と修飾子
    fn annotate(&mut self, expr: &mut Expr) -> (Type, QualifierSet) {
        let location = expr.location;
        match &mut expr.kind {
            ExprKind::Literal(value) => (value.ty(), QualifierSet::CONST),
            ExprKind::Variable(name) => match self.scopes.lookup(name) {
                Some(symbol) => (symbol.ty.clone(), symbol.qualifiers),
                None => {
                    self.diagnostics.error(
                        DiagnosticCode::UndeclaredIdentifier,
                        format!("'{}' は宣言されていません", name),
                        location,
                    );
                    (Type::error(), QualifierSet::EMPTY)
                }
            },
            ExprKind::Unary { op, operand } => {
                let ty = typing::unary_result(*op, &operand.ty).unwrap_or_else(Type::error);
                let qualifiers = if op.is_increment() {
                    QualifierSet::EMPTY
                } else {
                    const_if(is_const(operand))
                };
                (ty, qualifiers)
            }
            ExprKind::Binary { op, left, right } => {
                let ty = typing::binary_result(*op, &left.ty, &right.ty).unwrap_or_else(Type::error);
                (ty, const_if(is_const(left) && is_const(right)))
            }
            ExprKind::Assign { target, .. } => (target.ty.clone(), QualifierSet::EMPTY),
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                let ty = if then_expr.ty == else_expr.ty {
                    then_expr.ty.clone()
                } else {
                    Type::error()
                };
                (ty, const_if(is_const(condition) && is_const(then_expr) && is_const(else_expr)))
            }
            ExprKind::Call { callee, args } => {
                let arg_types: Vec<Type> = args.iter().map(|arg| arg.ty.clone()).collect();
                let all_const = !args.is_empty() && args.iter().all(is_const);
                self.call(callee, &arg_types, all_const, location)
            }
            ExprKind::Swizzle { base, components, .. } => {
                let size = base.ty.vector_size();
                let ty = if base.ty.is_vector() && components.iter().all(|&c| c < size) {
                    Type::vector(base.ty.basic.clone(), components.len() as u8)
                } else {
                    Type::error()
                };
                (ty, base.qualifiers)
            }
            ExprKind::Field { base, name } => {
                let ty = match (&base.ty.basic, base.ty.array) {
                    (BasicType::Struct(struct_name), None) => self
                        .structs
                        .get(struct_name)
                        .and_then(|members| members.iter().find(|(member, _)| member == name))
                        .map(|(_, ty)| ty.clone())
                        .unwrap_or_else(Type::error),
                    _ => Type::error(),
                };
                (ty, base.qualifiers)
            }
            ExprKind::Index { base, index } => {
                let ty = base.ty.index_result().unwrap_or_else(Type::error);
                let qualifiers = if index.qualifiers.contains(QualifierSet::CONST) {
                    base.qualifiers
                } else {
                    base.qualifiers.without(QualifierSet::CONST)
                };
                (ty, qualifiers)
            }
            ExprKind::Sequence(exprs) => {
                let ty = exprs.last().map_or_else(Type::error, |last| last.ty.clone());
                (ty, QualifierSet::EMPTY)
            }
        }
    }

    /// 呼び出し式の型を解決
    fn call(&mut self, callee: &mut Callee, args: &[Type], all_const: bool, location: SourceLocation) -> (Type, QualifierSet) {
        match callee {
            Callee::Constructor(ty) => {
                if ty.array == Some(0) {
                    *ty = ty.element_type().with_array(Some(args.len() as u32));
                }
                (ty.clone(), const_if(all_const))
            }
            Callee::Builtin(name) => self.builtin_call(name, args, all_const),
            Callee::User(name) => {
                if let Some(overloads) = self.functions.get(name.as_str()) {
                    let ty = overloads
                        .iter()
                        .find(|function| function.parameters == args)
                        .map_or_else(Type::error, |function| function.return_type.clone());
                    return (ty, QualifierSet::EMPTY);
                }
                if builtins::is_builtin_function(name) {
                    let name = name.clone();
                    let resolved = self.builtin_call(&name, args, all_const);
                    *callee = Callee::Builtin(name);
                    return resolved;
                }
                self.diagnostics.error(
                    DiagnosticCode::UndeclaredIdentifier,
                    format!("関数 '{}' は宣言されていません", name),
                    location,
                );
                (Type::error(), QualifierSet::EMPTY)
            }
        }
    }

    fn builtin_call(&self, name: &str, args: &[Type], all_const: bool) -> (Type, QualifierSet) {
        let found = builtins::matching(name, args);
        let chosen = found
            .iter()
            .find(|function| function.available_in(self.version))
            .or_else(|| found.first());
        match chosen {
            Some(function) => {
                let foldable = all_const
                    && !function.is_texture_function()
                    && !function.parameters.iter().any(|p| p.output)
                    && !function.return_type.is_void();
                (function.return_type.clone(), const_if(foldable))
            }
            None => (Type::error(), QualifierSet::EMPTY),
        }
    }
}

fn is_const(expr: &Expr) -> bool {
    expr.qualifiers.contains(QualifierSet::CONST)
}

fn const_if(yes: bool) -> QualifierSet {
    if yes {
        QualifierSet::CONST
    } else {
        QualifierSet::EMPTY
    }
}

/// 翻訳単位を解決する
pub fn resolve(unit: &mut TranslationUnit, limits: &ResourceLimits) -> Vec<Diagnostic> {
    Resolver::new(unit.version, limits).resolve(unit)
}
