//! # バリデータ
//!
//! 名前解決済みのASTを読み取り専用で走査し、言語バージョン・シェーダステージ・
//! リソース制限テーブルに照らして診断情報を生成します。
//!
//! 検査は次のファイルに分かれています。
//! - [`typecheck`]: 演算子・呼び出し・構築子・代入の型規則とバージョン/ステージ制約
//! - [`indexing`]: 非定数インデックスと範囲外の定数インデックス
//! - [`loops`]: ループの形状（帰納的forループ、while、do-while）
//! - [`capacity`]: `max*` 制限に対する宣言サイズ・個数
//! - [`extensions`]: `#extension` ディレクティブと拡張機能で有効になる構文
//!
//! ASTを変更することはなく、同じ入力に対しては常に同じ順序の診断を返します。

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use crate::frontend::ast::{
    Block, Constant, Declaration, Expr, ExternalDeclaration, FunctionDefinition, FunctionPrototype, InterfaceBlock, LanguageVersion,
    Locatable, Stmt, StmtKind, StorageQualifier, StructField, TranslationUnit,
};
use crate::frontend::builtins::{self, BuiltinVariable};
use crate::frontend::error::SourceLocation;
use crate::frontend::semantic::const_eval::{self, ConstantScopes};
use crate::frontend::types::{BasicType, Precision, Type};
use crate::frontend::ShaderStage;
use crate::limits::{LimitKey, ResourceLimits};

pub mod capacity;
pub mod extensions;
pub mod indexing;
pub mod loops;
pub mod typecheck;

/// バリデータ
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    limits: &'a ResourceLimits,
    stage: ShaderStage,
}

impl<'a> Validator<'a> {
    /// 新しいバリデータを作成
    pub fn new(limits: &'a ResourceLimits, stage: ShaderStage) -> Self {
        Self { limits, stage }
    }

    /// 翻訳単位を検査し、ソース位置順の診断情報を返す
    pub fn validate(&self, unit: &TranslationUnit) -> Vec<Diagnostic> {
        let mut checker = Checker::new(unit, self.stage, self.limits);
        checker.run();
        let diagnostics = checker.sink.into_sorted();
        debug!(
            "検証完了: {} シェーダ, {}, エラー {} 件, 警告 {} 件",
            self.stage,
            unit.version,
            diagnostics.iter().filter(|d| d.is_error()).count(),
            diagnostics.iter().filter(|d| !d.is_error()).count()
        );
        diagnostics
    }
}

/// 翻訳単位を検査する
pub fn validate(unit: &TranslationUnit, stage: ShaderStage, limits: &ResourceLimits) -> Vec<Diagnostic> {
    Validator::new(limits, stage).validate(unit)
}

/// 検査中の状態
pub(crate) struct Checker<'a> {
    pub(crate) unit: &'a TranslationUnit,
    pub(crate) stage: ShaderStage,
    pub(crate) version: LanguageVersion,
    pub(crate) limits: &'a ResourceLimits,
    pub(crate) sink: DiagnosticSink,
    /// const変数の値
    pub(crate) constants: ConstantScopes,
    /// 有効な帰納的ループのカウンタ
    pub(crate) loop_indices: Vec<String>,
    /// ユーザー定義関数の多重定義
    pub(crate) functions: HashMap<&'a str, Vec<&'a FunctionPrototype>>,
    /// 構造体・インターフェースブロックのメンバ型
    pub(crate) structs: HashMap<&'a str, Vec<Type>>,
    /// 組み込み変数
    pub(crate) builtin_variables: HashMap<&'static str, BuiltinVariable>,
    /// 検査中の関数の戻り値の型
    pub(crate) return_type: Option<Type>,
    /// 既定のfloat精度が宣言済みか
    pub(crate) float_precision: bool,
    /// 報告済みの制限（同じ制限は1回だけ報告する）
    pub(crate) exceeded: HashSet<LimitKey>,
    /// `warn` 指定の使用を報告済みの拡張機能
    pub(crate) warned_extensions: HashSet<String>,
}

impl<'a> Checker<'a> {
    fn new(unit: &'a TranslationUnit, stage: ShaderStage, limits: &'a ResourceLimits) -> Self {
        let builtin_variables = builtins::variables(limits)
            .into_iter()
            .filter(|variable| variable.available_in(unit.version))
            .map(|variable| (variable.name, variable))
            .collect();
        Self {
            unit,
            stage,
            version: unit.version,
            limits,
            sink: DiagnosticSink::new(),
            constants: ConstantScopes::new(),
            loop_indices: Vec::new(),
            functions: HashMap::new(),
            structs: HashMap::new(),
            builtin_variables,
            return_type: None,
            float_precision: false,
            exceeded: HashSet::new(),
            warned_extensions: HashSet::new(),
        }
    }

    fn run(&mut self) {
        self.check_directives();
        self.collect_signatures();

        let unit = self.unit;
        for declaration in &unit.declarations {
            match declaration {
                ExternalDeclaration::Precision(precision) => {
                    self.check_precision(Some(precision.precision), precision.location);
                    if precision.ty == Type::float() {
                        self.float_precision = true;
                    }
                }
                ExternalDeclaration::Variables(decl) => self.check_declaration(decl, true),
                ExternalDeclaration::Struct(definition) => self.check_fields(&definition.fields),
                ExternalDeclaration::InterfaceBlock(block) => self.check_interface_block(block),
                ExternalDeclaration::Layout(layout) => self.check_layout_declaration(&layout.qualifiers, layout.location),
                ExternalDeclaration::Prototype(prototype) => self.check_prototype(prototype),
                ExternalDeclaration::Function(function) => self.check_function(function),
            }
        }

        self.check_main();
        self.check_resources();
        self.check_call_graph();
    }

    /// 関数と構造体のシグネチャを集める
    fn collect_signatures(&mut self) {
        let unit = self.unit;
        for declaration in &unit.declarations {
            match declaration {
                ExternalDeclaration::Prototype(prototype) => {
                    self.functions.entry(prototype.name.as_str()).or_default().push(prototype);
                }
                ExternalDeclaration::Function(function) => {
                    self.functions
                        .entry(function.prototype.name.as_str())
                        .or_default()
                        .push(&function.prototype);
                }
                ExternalDeclaration::Struct(definition) => {
                    self.structs.insert(&definition.name, field_types(&definition.fields));
                }
                ExternalDeclaration::Variables(decl) => {
                    if let Some(definition) = &decl.struct_definition {
                        self.structs.insert(&definition.name, field_types(&definition.fields));
                    }
                }
                ExternalDeclaration::InterfaceBlock(block) => {
                    self.structs.insert(&block.name, field_types(&block.fields));
                }
                ExternalDeclaration::Precision(_) | ExternalDeclaration::Layout(_) => {}
            }
        }
    }

    /// 精度修飾子がこのステージで使えるか
    fn check_precision(&mut self, precision: Option<Precision>, location: SourceLocation) {
        if precision == Some(Precision::High)
            && self.stage == ShaderStage::Fragment
            && !self.limits.fragment_precision_high()
        {
            self.sink.error(
                DiagnosticCode::UnsupportedPrecision,
                "このプラットフォームのフラグメントシェーダでは highp を使用できません",
                location,
            );
        }
    }

    /// float型の宣言に精度が決まっているか
    pub(crate) fn check_float_precision(&mut self, ty: &Type, precision: Option<Precision>, location: SourceLocation) {
        self.check_precision(precision, location);
        if self.stage == ShaderStage::Fragment
            && ty.basic == BasicType::Float
            && precision.is_none()
            && !self.float_precision
        {
            self.sink.error(
                DiagnosticCode::NoPrecisionSpecified,
                "float の既定精度が宣言されていません",
                location,
            );
        }
    }

    /// 変数宣言を検査
    pub(crate) fn check_declaration(&mut self, decl: &Declaration, global: bool) {
        if let Some(definition) = &decl.struct_definition {
            self.check_fields(&definition.fields);
        }
        self.check_storage(decl, global);
        self.check_type_available(&decl.ty, decl.location);
        self.check_float_precision(&decl.ty, decl.qualifiers.precision, decl.location);
        let constant = decl.qualifiers.is(StorageQualifier::Const);

        for declarator in &decl.declarators {
            if declarator.ty.is_error() && declarator.array.is_some() {
                self.sink.error(
                    DiagnosticCode::ConstantExpressionRequired,
                    format!("配列 '{}' のサイズは正の整数定数式である必要があります", declarator.name),
                    declarator.location,
                );
            }
            if declarator.ty.is_array() && !self.version.is_es3() && declarator.initializer.is_some() {
                self.sink.error(
                    DiagnosticCode::UnsupportedInVersion,
                    format!("{} では配列を初期化できません", self.version),
                    declarator.location,
                );
            }

            match &declarator.initializer {
                Some(initializer) => {
                    self.check_full_expr(initializer);
                    if !initializer.ty.is_error() && !declarator.ty.is_error() && initializer.ty != declarator.ty {
                        self.sink.error(
                            DiagnosticCode::TypeMismatch,
                            format!(
                                "'{}' は {} ですが、初期化子は {} です",
                                declarator.name, declarator.ty, initializer.ty
                            ),
                            initializer.location,
                        );
                    }
                    let is_const = typecheck::is_const(initializer);
                    if constant && !is_const && !initializer.ty.is_error() {
                        self.sink.error(
                            DiagnosticCode::ConstantExpressionRequired,
                            format!("const 変数 '{}' の初期化子は定数式である必要があります", declarator.name),
                            initializer.location,
                        );
                    }
                    if global
                        && !constant
                        && !is_const
                        && decl.qualifiers.storage.is_none()
                        && !self.extension_enabled("GL_EXT_shader_non_constant_global_initializers")
                    {
                        self.sink.error(
                            DiagnosticCode::ConstantExpressionRequired,
                            format!("グローバル変数 '{}' の初期化子は定数式である必要があります", declarator.name),
                            initializer.location,
                        );
                    }
                    if let Some(storage) = decl.qualifiers.storage.filter(|s| *s != StorageQualifier::Const) {
                        self.sink.error(
                            DiagnosticCode::InvalidQualifier,
                            format!("{} 変数 '{}' は初期化できません", storage.as_str(), declarator.name),
                            initializer.location,
                        );
                    }
                }
                None if constant => {
                    self.sink.error(
                        DiagnosticCode::ConstantExpressionRequired,
                        format!("const 変数 '{}' には初期化子が必要です", declarator.name),
                        declarator.location,
                    );
                }
                None => {}
            }

            let value = if constant {
                declarator.initializer.as_ref().and_then(|init| self.evaluate(init))
            } else {
                None
            };
            self.constants.declare(&declarator.name, value);
        }
    }

    /// 構造体メンバを検査
    fn check_fields(&mut self, fields: &[StructField]) {
        for field in fields {
            if field.ty.is_error() && field.array.is_some() {
                self.sink.error(
                    DiagnosticCode::ConstantExpressionRequired,
                    format!("メンバ '{}' の配列サイズは正の整数定数式である必要があります", field.name),
                    field.location,
                );
            }
            self.check_type_available(&field.ty, field.location);
            if field.ty.is_sampler() {
                self.sink.error(
                    DiagnosticCode::InvalidQualifier,
                    format!("サンプラー型のメンバ '{}' は宣言できません", field.name),
                    field.location,
                );
            }
        }
    }

    /// インターフェースブロックを検査
    fn check_interface_block(&mut self, block: &InterfaceBlock) {
        if !self.version.is_es3() {
            self.sink.error(
                DiagnosticCode::UnsupportedInVersion,
                format!("{} ではインターフェースブロックを使用できません", self.version),
                block.location,
            );
            return;
        }
        match block.qualifiers.storage {
            Some(StorageQualifier::Uniform) => {}
            Some(StorageQualifier::Buffer) if self.version >= LanguageVersion::Es310 => {}
            Some(StorageQualifier::Buffer) => self.sink.error(
                DiagnosticCode::UnsupportedInVersion,
                format!("{} ではバッファブロックを使用できません", self.version),
                block.location,
            ),
            _ => self.sink.error(
                DiagnosticCode::InvalidQualifier,
                format!("ブロック '{}' には uniform または buffer 修飾子が必要です", block.name),
                block.location,
            ),
        }
        self.check_fields(&block.fields);
    }

    /// プロトタイプを検査
    fn check_prototype(&mut self, prototype: &FunctionPrototype) {
        self.check_type_available(&prototype.return_type, prototype.location);
        if !prototype.return_type.is_void() {
            self.check_float_precision(&prototype.return_type, prototype.return_precision, prototype.location);
        }
        let max = self.limits.max_function_parameters();
        if prototype.parameters.len() as i64 > max {
            self.limit_exceeded(
                LimitKey::MaxFunctionParameters,
                format!("関数 '{}' のパラメータ数 {}", prototype.name, prototype.parameters.len()),
                prototype.location,
            );
        }
        for parameter in &prototype.parameters {
            if parameter.ty.is_error() && parameter.array.is_some() {
                self.sink.error(
                    DiagnosticCode::ConstantExpressionRequired,
                    "パラメータの配列サイズは正の整数定数式である必要があります",
                    parameter.location,
                );
            }
            self.check_type_available(&parameter.ty, parameter.location);
            self.check_float_precision(&parameter.ty, parameter.precision, parameter.location);
        }
    }

    /// 関数定義を検査
    fn check_function(&mut self, function: &FunctionDefinition) {
        self.check_prototype(&function.prototype);
        self.return_type = Some(function.prototype.return_type.clone());
        self.constants.push();
        for parameter in &function.prototype.parameters {
            if let Some(name) = &parameter.name {
                self.constants.declare(name, None);
            }
        }
        self.check_block(&function.body, false);
        self.constants.pop();
        self.return_type = None;
    }

    /// `main` 関数があるか
    fn check_main(&mut self) {
        let has_main = self.unit.functions().any(|function| {
            function.prototype.name == "main"
                && function.prototype.parameters.is_empty()
                && function.prototype.return_type.is_void()
        });
        if !has_main {
            let location = self
                .unit
                .declarations
                .last()
                .map_or_else(SourceLocation::default, Locatable::location);
            self.sink.error(DiagnosticCode::MissingMain, "'void main()' が定義されていません", location);
        }
    }

    pub(crate) fn check_block(&mut self, block: &Block, new_scope: bool) {
        if new_scope {
            self.constants.push();
        }
        for statement in &block.statements {
            self.check_stmt(statement);
        }
        if new_scope {
            self.constants.pop();
        }
    }

    pub(crate) fn check_stmt(&mut self, statement: &Stmt) {
        match &statement.kind {
            StmtKind::Expr(expr) => self.check_full_expr(expr),
            StmtKind::Declaration(decl) => self.check_declaration(decl, false),
            StmtKind::Block(block) => self.check_block(block, true),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_full_expr(condition);
                self.check_condition(condition, "if");
                self.check_sub_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_sub_statement(else_branch);
                }
            }
            StmtKind::Loop(lp) => self.check_loop(lp, statement.location),
            StmtKind::Switch { selector, body } => {
                if !self.version.is_es3() {
                    self.sink.error(
                        DiagnosticCode::UnsupportedInVersion,
                        format!("{} では switch 文を使用できません", self.version),
                        statement.location,
                    );
                }
                self.check_full_expr(selector);
                if !selector.ty.is_error() && !(selector.ty.is_integer() && selector.ty.is_scalar()) {
                    self.sink.error(
                        DiagnosticCode::TypeMismatch,
                        format!("switch の選択式は整数スカラーである必要があります（{}）", selector.ty),
                        selector.location,
                    );
                }
                self.check_block(body, true);
            }
            StmtKind::Case(Some(label)) => {
                self.check_full_expr(label);
                if !typecheck::is_const(label) && !label.ty.is_error() {
                    self.sink.error(
                        DiagnosticCode::ConstantExpressionRequired,
                        "case ラベルは定数式である必要があります",
                        label.location,
                    );
                }
            }
            StmtKind::Return(value) => self.check_return(value.as_ref(), statement.location),
            StmtKind::Discard => {
                if self.stage != ShaderStage::Fragment {
                    self.sink.error(
                        DiagnosticCode::UnsupportedInStage,
                        format!("discard は {} シェーダでは使用できません", self.stage),
                        statement.location,
                    );
                }
            }
            StmtKind::Case(None) | StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
        }
    }

    pub(crate) fn check_sub_statement(&mut self, statement: &Stmt) {
        self.constants.push();
        match &statement.kind {
            StmtKind::Block(block) => self.check_block(block, false),
            _ => self.check_stmt(statement),
        }
        self.constants.pop();
    }

    fn check_return(&mut self, value: Option<&Expr>, location: SourceLocation) {
        let expected = match &self.return_type {
            Some(ty) => ty.clone(),
            None => return,
        };
        match value {
            Some(value) => {
                self.check_full_expr(value);
                if !value.ty.is_error() && !expected.is_error() && value.ty != expected {
                    self.sink.error(
                        DiagnosticCode::TypeMismatch,
                        format!("戻り値の型は {} ですが、{} が返されています", expected, value.ty),
                        value.location,
                    );
                }
            }
            None if !expected.is_void() => {
                self.sink.error(
                    DiagnosticCode::TypeMismatch,
                    format!("{} の値を返す必要があります", expected),
                    location,
                );
            }
            None => {}
        }
    }

    /// 定数式を評価（const変数と `gl_Max*` 定数を参照する）
    pub(crate) fn evaluate(&self, expr: &Expr) -> Option<Vec<Constant>> {
        const_eval::evaluate(expr, &|name| self.constant_value(name))
    }

    /// 整数の定数式を評価
    pub(crate) fn evaluate_int(&self, expr: &Expr) -> Option<i64> {
        const_eval::evaluate_int(expr, &|name| self.constant_value(name))
    }

    fn constant_value(&self, name: &str) -> Option<Vec<Constant>> {
        self.constants.lookup(name).or_else(|| {
            self.builtin_variables
                .get(name)
                .and_then(|variable| variable.value)
                .map(|value| vec![value])
        })
    }

    /// リソース制限の超過を報告（制限ごとに1回）
    pub(crate) fn limit_exceeded(&mut self, key: LimitKey, what: String, location: SourceLocation) {
        if !self.exceeded.insert(key) {
            return;
        }
        self.sink.error(
            DiagnosticCode::LimitExceeded,
            format!("{} が制限 {} ({}) を超えています", what, key.as_str(), self.limits.value(key)),
            location,
        );
    }
}

fn field_types(fields: &[StructField]) -> Vec<Type> {
    fields.iter().map(|field| field.ty.clone()).collect()
}
