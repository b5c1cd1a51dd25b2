//! # 式と宣言の型検査
//!
//! 名前解決で `Type::error()` になった式を診断に変換し、
//! 言語バージョン・シェーダステージに依存する制約を検査します。
//!
//! 子がすべて正しく型付けされているのに自身がエラー型になっている式だけを
//! 報告するため、1つの誤りから連鎖的に診断が出ることはありません。

use crate::diagnostics::DiagnosticCode;
use crate::frontend::ast::{
    AssignOp, BinaryOp, Callee, Constant, Declaration, Expr, ExprKind, Interpolation, LanguageVersion, ParameterDirection,
    QualifierSet, StorageQualifier, UnaryOp,
};
use crate::frontend::builtins;
use crate::frontend::error::SourceLocation;
use crate::frontend::semantic::typing;
use crate::frontend::types::{BasicType, SamplerDim, ScalarKind, Shape, Type};
use crate::frontend::ShaderStage;
use crate::limits::LimitKey;

use super::Checker;

/// 式が定数式として型付けされているか
pub fn is_const(expr: &Expr) -> bool {
    expr.qualifiers.contains(QualifierSet::CONST)
}

/// 引数型の一覧を表示用に整形
fn describe_arguments(args: &[Expr]) -> String {
    args.iter().map(|arg| arg.ty.to_string()).collect::<Vec<_>>().join(", ")
}

impl Checker<'_> {
    /// 完全式（文の直下の式）を検査
    pub(crate) fn check_full_expr(&mut self, expr: &Expr) {
        self.check_expr(expr);
        let depth = expr.depth();
        if depth as i64 > self.limits.max_expression_complexity() {
            self.limit_exceeded(LimitKey::MaxExpressionComplexity, format!("式の深さ {}", depth), expr.location);
        }
    }

    /// 条件式が bool か検査
    pub(crate) fn check_condition(&mut self, condition: &Expr, what: &str) {
        if !condition.ty.is_error() && condition.ty != Type::bool() {
            self.sink.error(
                DiagnosticCode::TypeMismatch,
                format!("{} の条件は bool である必要があります（{}）", what, condition.ty),
                condition.location,
            );
        }
    }

    fn check_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(value) => {
                if matches!(value, Constant::UInt(_)) {
                    self.require_es3("uint リテラル", expr.location);
                }
            }
            ExprKind::Variable(name) => {
                if name.starts_with("gl_") {
                    self.check_builtin_variable(name, expr.location);
                }
            }
            ExprKind::Unary { op, operand } => {
                self.check_expr(operand);
                if *op == UnaryOp::BitNot {
                    self.require_es3("演算子 '~'", expr.location);
                }
                if op.is_increment() {
                    self.check_lvalue(operand);
                }
                if expr.ty.is_error() && !operand.ty.is_error() {
                    self.sink.error(
                        DiagnosticCode::TypeMismatch,
                        format!("単項演算子 '{}' は {} に適用できません", op.as_str(), operand.ty),
                        expr.location,
                    );
                }
            }
            ExprKind::Binary { op, left, right } => {
                self.check_expr(left);
                self.check_expr(right);
                self.check_operator_version(*op, expr.location);
                if expr.ty.is_error() && !left.ty.is_error() && !right.ty.is_error() {
                    self.sink.error(
                        DiagnosticCode::TypeMismatch,
                        format!("二項演算子 '{}' は {} と {} に適用できません", op.as_str(), left.ty, right.ty),
                        expr.location,
                    );
                }
            }
            ExprKind::Assign { op, target, value } => {
                self.check_expr(target);
                self.check_expr(value);
                self.check_lvalue(target);
                if target.ty.is_error() || value.ty.is_error() {
                    return;
                }
                match op {
                    AssignOp::Assign => {
                        if target.ty != value.ty {
                            self.sink.error(
                                DiagnosticCode::TypeMismatch,
                                format!("{} に {} は代入できません", target.ty, value.ty),
                                expr.location,
                            );
                        }
                    }
                    AssignOp::Compound(binary) => {
                        self.check_operator_version(*binary, expr.location);
                        if !typing::compound_assignment_valid(*binary, &target.ty, &value.ty) {
                            self.sink.error(
                                DiagnosticCode::TypeMismatch,
                                format!("'{}' は {} と {} に適用できません", op.as_str(), target.ty, value.ty),
                                expr.location,
                            );
                        }
                    }
                }
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.check_expr(condition);
                self.check_expr(then_expr);
                self.check_expr(else_expr);
                self.check_condition(condition, "三項演算子");
                if expr.ty.is_error() && !then_expr.ty.is_error() && !else_expr.ty.is_error() {
                    self.sink.error(
                        DiagnosticCode::TypeMismatch,
                        format!("三項演算子の分岐の型が一致しません（{} と {}）", then_expr.ty, else_expr.ty),
                        expr.location,
                    );
                }
            }
            ExprKind::Call { callee, args } => {
                for arg in args {
                    self.check_expr(arg);
                }
                self.check_call(expr, callee, args);
            }
            ExprKind::Swizzle { base, .. } => {
                self.check_expr(base);
                if expr.ty.is_error() && !base.ty.is_error() {
                    self.sink.error(
                        DiagnosticCode::InvalidSwizzle,
                        format!("{} の範囲外の成分を参照しています", base.ty),
                        expr.location,
                    );
                }
            }
            ExprKind::Field { base, name } => {
                self.check_expr(base);
                if expr.ty.is_error() && !base.ty.is_error() {
                    if base.ty.is_struct() {
                        self.sink.error(
                            DiagnosticCode::UndeclaredIdentifier,
                            format!("{} にメンバ '{}' はありません", base.ty, name),
                            expr.location,
                        );
                    } else {
                        self.sink.error(
                            DiagnosticCode::InvalidSwizzle,
                            format!("{} に対する不正なスウィズル '{}' です", base.ty, name),
                            expr.location,
                        );
                    }
                }
            }
            ExprKind::Index { base, index } => {
                self.check_expr(base);
                self.check_expr(index);
                self.check_index(base, index, expr.location);
            }
            ExprKind::Sequence(exprs) => {
                for item in exprs {
                    self.check_expr(item);
                }
            }
        }
    }

    /// ES 1.00 で使えない演算子
    fn check_operator_version(&mut self, op: BinaryOp, location: SourceLocation) {
        if op.is_bitwise() || op == BinaryOp::Mod {
            self.require_es3(&format!("演算子 '{}'", op.as_str()), location);
        }
    }

    fn require_es3(&mut self, what: &str, location: SourceLocation) {
        if !self.version.is_es3() {
            self.sink.error(
                DiagnosticCode::UnsupportedInVersion,
                format!("{} は {} では使用できません", what, self.version),
                location,
            );
        }
    }

    fn check_call(&mut self, expr: &Expr, callee: &Callee, args: &[Expr]) {
        if args.iter().any(|arg| arg.ty.is_error()) {
            return;
        }
        match callee {
            Callee::Constructor(ty) => self.check_constructor(ty, args, expr.location),
            Callee::Builtin(name) => self.check_builtin_call(name, args, expr.location),
            Callee::User(name) => {
                // 未宣言の関数は名前解決で報告済み
                let overloads = match self.functions.get(name.as_str()) {
                    Some(overloads) => overloads.clone(),
                    None => return,
                };
                let arg_types: Vec<Type> = args.iter().map(|arg| arg.ty.clone()).collect();
                match overloads.iter().find(|prototype| prototype.parameter_types() == arg_types) {
                    Some(prototype) => {
                        for (parameter, arg) in prototype.parameters.iter().zip(args) {
                            if parameter.direction != ParameterDirection::In {
                                self.check_lvalue(arg);
                            }
                        }
                    }
                    None => self.sink.error(
                        DiagnosticCode::NoMatchingOverload,
                        format!("関数 '{}' に引数 ({}) の多重定義がありません", name, describe_arguments(args)),
                        expr.location,
                    ),
                }
            }
        }
    }

    fn check_constructor(&mut self, ty: &Type, args: &[Expr], location: SourceLocation) {
        self.check_type_available(ty, location);
        if ty.is_array() && !self.version.is_es3() {
            self.sink.error(
                DiagnosticCode::UnsupportedInVersion,
                format!("{} では配列の構築子を使用できません", self.version),
                location,
            );
            return;
        }
        let fields = match &ty.basic {
            BasicType::Struct(name) if !ty.is_array() => self.structs.get(name.as_str()).cloned(),
            _ => None,
        };
        let arg_types: Vec<Type> = args.iter().map(|arg| arg.ty.clone()).collect();
        if let Err(message) = typing::check_constructor(ty, &arg_types, fields.as_deref()) {
            self.sink.error(DiagnosticCode::InvalidConstructor, message, location);
        }
    }

    fn check_builtin_call(&mut self, name: &str, args: &[Expr], location: SourceLocation) {
        let arg_types: Vec<Type> = args.iter().map(|arg| arg.ty.clone()).collect();
        let candidates = builtins::matching(name, &arg_types);
        if candidates.is_empty() {
            self.sink.error(
                DiagnosticCode::NoMatchingOverload,
                format!("組み込み関数 '{}' に引数 ({}) の多重定義がありません", name, describe_arguments(args)),
                location,
            );
            return;
        }

        let available: Vec<_> = candidates.into_iter().filter(|f| f.available_in(self.version)).collect();
        let function = match available
            .iter()
            .find(|f| f.stage.map_or(true, |stage| stage == self.stage))
            .or_else(|| available.first())
        {
            Some(function) => *function,
            None => {
                self.sink.error(
                    DiagnosticCode::UnsupportedInVersion,
                    format!("組み込み関数 '{}' は {} では使用できません", name, self.version),
                    location,
                );
                return;
            }
        };

        if let Some(stage) = function.stage.filter(|stage| *stage != self.stage) {
            self.sink.error(
                DiagnosticCode::UnsupportedInStage,
                format!("組み込み関数 '{}' は {} シェーダでのみ使用できます", name, stage),
                location,
            );
        }
        if let Some(extension) = function.extension {
            self.require_extension(extension, location);
        }
        for (parameter, arg) in function.parameters.iter().zip(args) {
            if parameter.output {
                self.check_lvalue(arg);
            }
        }
        if let Some((index, kind)) = function.offset {
            if let Some(offset) = args.get(index) {
                self.check_offset(offset, kind);
            }
        }
    }

    fn check_builtin_variable(&mut self, name: &str, location: SourceLocation) {
        let (stage, extension) = match self.builtin_variables.get(name) {
            Some(variable) => (variable.stage, variable.extension),
            None => return,
        };
        if let Some(stage) = stage.filter(|stage| *stage != self.stage) {
            self.sink.error(
                DiagnosticCode::UnsupportedInStage,
                format!("{} は {} シェーダでのみ使用できます", name, stage),
                location,
            );
        }
        if let Some(extension) = extension {
            self.require_extension(extension, location);
        }
    }

    /// 代入先として使える式か検査
    pub(crate) fn check_lvalue(&mut self, expr: &Expr) {
        if expr.ty.is_error() {
            return;
        }
        if let Some(reason) = self.lvalue_problem(expr) {
            self.sink.error(DiagnosticCode::NotAnLValue, format!("{}には代入できません", reason), expr.location);
        }
    }

    fn lvalue_problem(&self, expr: &Expr) -> Option<String> {
        match &expr.kind {
            ExprKind::Variable(name) => {
                if let Some(variable) = self.builtin_variables.get(name.as_str()) {
                    return (!variable.writable).then(|| format!("組み込み変数 '{}' ", name));
                }
                let qualifiers = expr.qualifiers;
                if qualifiers.contains(QualifierSet::CONST) {
                    Some(format!("const 変数 '{}' ", name))
                } else if qualifiers.contains(QualifierSet::UNIFORM) {
                    Some(format!("uniform 変数 '{}' ", name))
                } else if qualifiers.contains(QualifierSet::INPUT) {
                    Some(format!("入力変数 '{}' ", name))
                } else if qualifiers.contains(QualifierSet::VARYING) && self.stage == ShaderStage::Fragment {
                    Some(format!("varying 変数 '{}' ", name))
                } else {
                    None
                }
            }
            ExprKind::Swizzle { base, components, .. } => {
                let duplicated = components.iter().enumerate().any(|(i, c)| components[..i].contains(c));
                if duplicated {
                    Some("重複する成分を持つスウィズル".to_string())
                } else {
                    self.lvalue_problem(base)
                }
            }
            ExprKind::Field { base, .. } | ExprKind::Index { base, .. } => self.lvalue_problem(base),
            _ => Some("左辺値でない式".to_string()),
        }
    }

    /// 型がこのバージョンで使えるか検査
    pub(crate) fn check_type_available(&mut self, ty: &Type, location: SourceLocation) {
        if !self.version.is_es3() {
            let unsupported = match &ty.basic {
                BasicType::UInt => true,
                BasicType::Sampler(sampler) => {
                    sampler.component != ScalarKind::Float
                        || matches!(
                            sampler.dim,
                            SamplerDim::D3
                                | SamplerDim::D2Array
                                | SamplerDim::D2Shadow
                                | SamplerDim::CubeShadow
                                | SamplerDim::D2ArrayShadow
                                | SamplerDim::D2Ms
                        )
                }
                _ => false,
            } || matches!(ty.shape, Shape::Matrix { cols, rows } if cols != rows);
            if unsupported {
                self.sink.error(
                    DiagnosticCode::UnsupportedInVersion,
                    format!("{} は {} では使用できません", ty.base_name(), self.version),
                    location,
                );
                return;
            }
        }
        if let Some((extension, core)) = builtins::sampler_extension(ty) {
            if core.map_or(true, |core| self.version < core) {
                let extension = if extension == "GL_OES_EGL_image_external" && self.version.is_es3() {
                    "GL_OES_EGL_image_external_essl3"
                } else {
                    extension
                };
                self.require_extension(extension, location);
            }
        }
    }

    /// 記憶域修飾子を検査
    pub(crate) fn check_storage(&mut self, decl: &Declaration, global: bool) {
        let location = decl.location;
        if !decl.qualifiers.layout.is_empty() {
            if !self.version.is_es3() {
                self.sink.error(
                    DiagnosticCode::UnsupportedInVersion,
                    format!("{} では layout 修飾子を使用できません", self.version),
                    location,
                );
            }
            self.check_layout_declaration(&decl.qualifiers, location);
        }

        let storage = decl.qualifiers.storage;
        if decl.ty.is_sampler() && storage != Some(StorageQualifier::Uniform) && !decl.ty.is_error() {
            self.sink.error(
                DiagnosticCode::InvalidQualifier,
                "サンプラーは uniform として宣言する必要があります",
                location,
            );
        }
        let storage = match storage {
            Some(storage) => storage,
            None => return,
        };
        if !global && storage != StorageQualifier::Const {
            self.sink.error(
                DiagnosticCode::InvalidQualifier,
                format!("{} 修飾子はグローバルスコープでのみ使用できます", storage.as_str()),
                location,
            );
            return;
        }

        match storage {
            StorageQualifier::Attribute | StorageQualifier::Varying => {
                if self.version.is_es3() {
                    self.sink.error(
                        DiagnosticCode::UnsupportedInVersion,
                        format!("{} は {} では使用できません", storage.as_str(), self.version),
                        location,
                    );
                } else if (storage == StorageQualifier::Attribute && self.stage != ShaderStage::Vertex)
                    || self.stage == ShaderStage::Compute
                {
                    self.sink.error(
                        DiagnosticCode::UnsupportedInStage,
                        format!("{} は {} シェーダでは使用できません", storage.as_str(), self.stage),
                        location,
                    );
                }
            }
            StorageQualifier::In | StorageQualifier::Out => {
                if !self.version.is_es3() {
                    self.sink.error(
                        DiagnosticCode::UnsupportedInVersion,
                        format!("{} ではグローバルな {} 変数を使用できません", self.version, storage.as_str()),
                        location,
                    );
                } else if self.stage == ShaderStage::Compute {
                    self.sink.error(
                        DiagnosticCode::UnsupportedInStage,
                        format!("compute シェーダでは {} 変数を宣言できません", storage.as_str()),
                        location,
                    );
                }
            }
            StorageQualifier::InOut => {
                if self.stage == ShaderStage::Fragment && self.version.is_es3() {
                    self.require_extension("GL_EXT_shader_framebuffer_fetch", location);
                } else {
                    self.sink.error(
                        DiagnosticCode::InvalidQualifier,
                        "inout は変数宣言に使用できません",
                        location,
                    );
                }
            }
            StorageQualifier::Buffer | StorageQualifier::Shared => {
                if self.version < LanguageVersion::Es310 {
                    self.sink.error(
                        DiagnosticCode::UnsupportedInVersion,
                        format!("{} は {} では使用できません", storage.as_str(), self.version),
                        location,
                    );
                } else if storage == StorageQualifier::Shared && self.stage != ShaderStage::Compute {
                    self.sink.error(
                        DiagnosticCode::UnsupportedInStage,
                        "shared は compute シェーダでのみ使用できます",
                        location,
                    );
                } else if storage == StorageQualifier::Buffer {
                    self.sink.error(
                        DiagnosticCode::InvalidQualifier,
                        "buffer 変数はブロック内で宣言する必要があります",
                        location,
                    );
                }
            }
            StorageQualifier::Const | StorageQualifier::Uniform => {}
        }

        self.check_interface_type(decl, storage);
    }

    /// ステージ間の入出力に使える型か検査
    fn check_interface_type(&mut self, decl: &Declaration, storage: StorageQualifier) {
        let is_interface = matches!(
            storage,
            StorageQualifier::Attribute | StorageQualifier::Varying | StorageQualifier::In | StorageQualifier::Out
        );
        if !is_interface || decl.ty.is_error() {
            return;
        }
        let ty = &decl.ty;
        let vertex_input = storage == StorageQualifier::Attribute
            || (storage == StorageQualifier::In && self.stage == ShaderStage::Vertex);
        let fragment_output = storage == StorageQualifier::Out && self.stage == ShaderStage::Fragment;

        let invalid = ty.is_bool()
            || ty.is_sampler()
            || (ty.is_struct() && (vertex_input || fragment_output || !self.version.is_es3()))
            || (fragment_output && ty.is_matrix())
            || (vertex_input && decl.declarators.iter().any(|d| d.ty.is_array()));
        if invalid {
            self.sink.error(
                DiagnosticCode::InvalidQualifier,
                format!("{} 変数に {} 型は使用できません", storage.as_str(), ty.base_name()),
                decl.location,
            );
            return;
        }

        // 整数のステージ間変数は flat が必要
        let varying = (storage == StorageQualifier::Out && self.stage == ShaderStage::Vertex)
            || (storage == StorageQualifier::In && self.stage == ShaderStage::Fragment);
        if varying && ty.is_integer() && decl.qualifiers.interpolation != Some(Interpolation::Flat) {
            self.sink.error(
                DiagnosticCode::InvalidQualifier,
                format!("整数型の {} 変数には flat 修飾子が必要です", storage.as_str()),
                decl.location,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::frontend::{GlslParser, SourceParser};
    use crate::limits::ResourceLimits;
    use crate::validator::validate;

    fn check(source: &str, stage: ShaderStage) -> Vec<Diagnostic> {
        let limits = ResourceLimits::default();
        let output = GlslParser::new().parse(source, stage, &limits).unwrap();
        let mut diagnostics = output.diagnostics;
        diagnostics.extend(validate(&output.unit, stage, &limits));
        diagnostics
    }

    fn codes(source: &str, stage: ShaderStage) -> Vec<DiagnosticCode> {
        check(source, stage).into_iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_valid_fragment_shader() {
        let source = "#version 300 es\nprecision mediump float;\nuniform vec4 c;\nout vec4 color;\nvoid main(){ color = c * 2.0; }";
        assert!(check(source, ShaderStage::Fragment).is_empty());
    }

    #[test]
    fn test_binary_type_mismatch_reported_once() {
        let source = "precision mediump float;\nvoid main(){ vec2 a = vec2(1.0); vec3 b = vec3(1.0); float x = (a + b).x; }";
        assert_eq!(codes(source, ShaderStage::Fragment), vec![DiagnosticCode::TypeMismatch]);
    }

    #[test]
    fn test_assign_to_uniform() {
        let source = "precision mediump float;\nuniform float u;\nvoid main(){ u = 1.0; }";
        assert_eq!(codes(source, ShaderStage::Fragment), vec![DiagnosticCode::NotAnLValue]);
    }

    #[test]
    fn test_duplicate_swizzle_is_not_lvalue() {
        let source = "precision mediump float;\nvoid main(){ vec4 v = vec4(0.0); v.xx = vec2(1.0); }";
        assert_eq!(codes(source, ShaderStage::Fragment), vec![DiagnosticCode::NotAnLValue]);
    }

    #[test]
    fn test_bitwise_requires_es3() {
        let source = "void main(){ int a = 1; int b = a & 2; }";
        assert_eq!(codes(source, ShaderStage::Vertex), vec![DiagnosticCode::UnsupportedInVersion]);
    }

    #[test]
    fn test_es1_texture_function_in_es3() {
        let source = "#version 300 es\nprecision mediump float;\nuniform sampler2D s;\nout vec4 c;\nvoid main(){ c = texture2D(s, vec2(0.0)); }";
        assert_eq!(codes(source, ShaderStage::Fragment), vec![DiagnosticCode::UnsupportedInVersion]);
    }

    #[test]
    fn test_missing_float_precision() {
        let source = "void main(){ float x = 1.0; }";
        assert_eq!(codes(source, ShaderStage::Fragment), vec![DiagnosticCode::NoPrecisionSpecified]);
        assert!(codes(source, ShaderStage::Vertex).is_empty());
    }

    #[test]
    fn test_attribute_in_fragment_stage() {
        let source = "precision mediump float;\nattribute vec4 a;\nvoid main(){}";
        assert_eq!(codes(source, ShaderStage::Fragment), vec![DiagnosticCode::UnsupportedInStage]);
    }

    #[test]
    fn test_integer_varying_requires_flat() {
        let source = "#version 300 es\nout int v;\nvoid main(){ v = 1; gl_Position = vec4(0.0); }";
        assert_eq!(codes(source, ShaderStage::Vertex), vec![DiagnosticCode::InvalidQualifier]);
        let fixed = "#version 300 es\nflat out int v;\nvoid main(){ v = 1; gl_Position = vec4(0.0); }";
        assert!(codes(fixed, ShaderStage::Vertex).is_empty());
    }

    #[test]
    fn test_invalid_constructor() {
        let source = "void main(){ vec3 v = vec3(1.0, 2.0, 3.0, 4.0); }";
        assert_eq!(codes(source, ShaderStage::Vertex), vec![DiagnosticCode::InvalidConstructor]);
    }

    #[test]
    fn test_user_function_overload_mismatch() {
        let source = "float f(float x){ return x; }\nvoid main(){ float y = f(1); }";
        assert!(codes(source, ShaderStage::Vertex).contains(&DiagnosticCode::NoMatchingOverload));
    }

    #[test]
    fn test_discard_outside_fragment() {
        let source = "void main(){ discard; }";
        assert_eq!(codes(source, ShaderStage::Vertex), vec![DiagnosticCode::UnsupportedInStage]);
    }

    #[test]
    fn test_uint_requires_es3() {
        let source = "void main(){ uint x; }";
        assert_eq!(codes(source, ShaderStage::Vertex), vec![DiagnosticCode::UnsupportedInVersion]);
    }
}
