//! # テキスト書き出し
//!
//! ASTの各ノードをトークン列として書き出します。コンパクト形式では
//! トークンの間に空白を入れず、つながると別のトークンになってしまう組
//! （識別子同士、`-` と `-` など）にだけ空白を入れます。

use crate::frontend::ast::{
    ArraySpec, Block, Callee, Constant, Declaration, ExprKind, Expr, ExternalDeclaration, FunctionPrototype,
    InterfaceBlock, Interpolation, LayoutQualifier, LoopKind, Parameter, ParameterDirection, Stmt, StmtKind,
    StructDefinition, StructField, TranslationUnit, TypeQualifiers,
};

/// コンマ演算子
const SEQUENCE: u8 = 0;
/// 代入
const ASSIGN: u8 = 1;
/// 三項演算子
const TERNARY: u8 = 2;
/// 前置単項演算子
const UNARY: u8 = 14;
/// 後置演算子・呼び出し・メンバアクセス
const POSTFIX: u8 = 15;
/// 変数・リテラル
const PRIMARY: u8 = 16;

/// 翻訳単位をテキストに変換
pub fn write_unit(unit: &TranslationUnit, beautify: bool) -> String {
    let mut writer = Writer::new(beautify);
    writer.unit(unit);
    writer.finish()
}

/// 式をコンパクト形式のテキストに変換
pub fn write_expr(expr: &Expr) -> String {
    let mut writer = Writer::new(false);
    writer.expr(expr, SEQUENCE);
    writer.finish()
}

/// 文をコンパクト形式のテキストに変換
pub fn write_stmt(stmt: &Stmt) -> String {
    let mut writer = Writer::new(false);
    writer.statement(stmt);
    writer.finish()
}

/// 浮動小数点数の最短表記（`0.`、`.5`、`1e5`）
pub fn format_float(value: f32) -> String {
    if value.is_nan() {
        return "(0./0.)".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "(1./0.)" } else { "(-1./0.)" }.to_string();
    }
    let magnitude = value.abs();

    let mut plain = format!("{}", magnitude);
    if !plain.contains('.') {
        plain.push('.');
    }
    if plain.starts_with("0.") && plain.len() > 2 {
        plain.remove(0);
    }
    let exponent = format!("{:e}", magnitude);
    let shortest = if exponent.len() < plain.len() { exponent } else { plain };

    if value.is_sign_negative() {
        format!("-{}", shortest)
    } else {
        shortest
    }
}

fn literal_text(value: &Constant) -> String {
    match *value {
        Constant::Float(value) => format_float(value),
        Constant::Int(value) if value < 0 => format!("-{}", value.unsigned_abs()),
        Constant::Int(value) => value.to_string(),
        Constant::UInt(value) => format!("{}u", value),
        Constant::Bool(value) => value.to_string(),
    }
}

fn precedence(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Literal(value) => {
            let negative = match *value {
                Constant::Float(value) => value.is_sign_negative() && !value.is_nan(),
                Constant::Int(value) => value < 0,
                _ => false,
            };
            if negative {
                UNARY
            } else {
                PRIMARY
            }
        }
        ExprKind::Variable(_) => PRIMARY,
        ExprKind::Unary { op, .. } if op.is_postfix() => POSTFIX,
        ExprKind::Unary { .. } => UNARY,
        ExprKind::Binary { op, .. } => op.precedence(),
        ExprKind::Assign { .. } => ASSIGN,
        ExprKind::Ternary { .. } => TERNARY,
        ExprKind::Call { .. } | ExprKind::Swizzle { .. } | ExprKind::Field { .. } | ExprKind::Index { .. } => POSTFIX,
        ExprKind::Sequence(_) => SEQUENCE,
    }
}

/// 隣り合うと1つのトークンとして読まれてしまう文字の組
fn glues(last: char, next: char) -> bool {
    let word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    (word(last) && (word(next) || next == '.'))
        || (last == next && matches!(last, '+' | '-' | '&' | '|' | '/' | '<' | '>' | '='))
        || (last == '/' && next == '*')
}

/// 末尾が else のない if で終わる文（後ろに else を置くと結び付きが変わる）
fn ends_with_open_if(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::If { else_branch: None, .. } => true,
        StmtKind::If {
            else_branch: Some(else_branch),
            ..
        } => ends_with_open_if(else_branch),
        StmtKind::Loop(lp) if lp.kind != LoopKind::DoWhile => ends_with_open_if(&lp.body),
        _ => false,
    }
}

struct Writer {
    out: String,
    beautify: bool,
    indent: usize,
}

impl Writer {
    fn new(beautify: bool) -> Self {
        Self {
            out: String::new(),
            beautify,
            indent: 0,
        }
    }

    fn finish(mut self) -> String {
        if self.beautify && !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.out
    }

    // ---- トークン ----

    fn token(&mut self, text: &str) {
        if let (Some(last), Some(next)) = (self.out.chars().last(), text.chars().next()) {
            if glues(last, next) {
                self.out.push(' ');
            }
        }
        self.out.push_str(text);
    }

    /// 空白の判定をせずに続けて書く
    fn attach(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn space(&mut self) {
        if self.beautify && !self.out.ends_with(' ') && !self.out.ends_with('\n') {
            self.out.push(' ');
        }
    }

    fn operator(&mut self, op: &str) {
        if self.beautify {
            self.space();
            self.out.push_str(op);
            self.out.push(' ');
        } else {
            self.token(op);
        }
    }

    fn comma(&mut self) {
        self.attach(",");
        self.space();
    }

    fn begin_line(&mut self) {
        if !self.beautify {
            return;
        }
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn open_brace(&mut self) {
        self.space();
        self.attach("{");
        self.indent += 1;
    }

    fn close_brace(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.begin_line();
        self.attach("}");
    }

    // ---- 外部宣言 ----

    fn unit(&mut self, unit: &TranslationUnit) {
        if unit.explicit_version {
            self.attach(unit.version.directive());
            self.attach("\n");
        }
        for directive in &unit.extensions {
            self.attach(&format!("#extension {} : {}\n", directive.name, directive.behavior.as_str()));
        }
        for declaration in &unit.declarations {
            self.begin_line();
            self.external(declaration);
        }
    }

    fn external(&mut self, declaration: &ExternalDeclaration) {
        match declaration {
            ExternalDeclaration::Precision(decl) => {
                self.token("precision");
                self.token(decl.precision.as_str());
                self.token(&decl.ty.base_name());
                self.attach(";");
            }
            ExternalDeclaration::Variables(decl) => {
                self.declaration(decl);
                self.attach(";");
            }
            ExternalDeclaration::Struct(definition) => {
                self.struct_definition(definition);
                self.attach(";");
            }
            ExternalDeclaration::InterfaceBlock(block) => self.interface_block(block),
            ExternalDeclaration::Layout(decl) => {
                self.qualifiers(&decl.qualifiers);
                self.attach(";");
            }
            ExternalDeclaration::Prototype(prototype) => {
                self.prototype(prototype);
                self.attach(";");
            }
            ExternalDeclaration::Function(function) => {
                self.prototype(&function.prototype);
                self.block(&function.body);
            }
        }
    }

    fn qualifiers(&mut self, qualifiers: &TypeQualifiers) {
        if !qualifiers.layout.is_empty() {
            self.layout(&qualifiers.layout);
        }
        if qualifiers.invariant {
            self.token("invariant");
        }
        match qualifiers.interpolation {
            Some(Interpolation::Smooth) => self.token("smooth"),
            Some(Interpolation::Flat) => self.token("flat"),
            None => {}
        }
        if qualifiers.centroid {
            self.token("centroid");
        }
        if let Some(storage) = qualifiers.storage {
            self.token(storage.as_str());
        }
        if let Some(precision) = qualifiers.precision {
            self.token(precision.as_str());
        }
    }

    fn layout(&mut self, layout: &[LayoutQualifier]) {
        self.token("layout");
        self.attach("(");
        for (i, qualifier) in layout.iter().enumerate() {
            if i > 0 {
                self.comma();
            }
            self.attach(&qualifier.name);
            if let Some(value) = qualifier.value {
                self.attach(&format!("={}", value));
            }
        }
        self.attach(")");
        self.space();
    }

    fn declaration(&mut self, decl: &Declaration) {
        self.qualifiers(&decl.qualifiers);
        match &decl.struct_definition {
            Some(definition) => self.struct_definition(definition),
            None => self.token(&decl.ty.base_name()),
        }
        for (i, declarator) in decl.declarators.iter().enumerate() {
            if i > 0 {
                self.comma();
            } else if decl.struct_definition.is_some() {
                self.space();
            }
            self.token(&declarator.name);
            if let Some(array) = &declarator.array {
                self.array_spec(array);
            }
            if let Some(initializer) = &declarator.initializer {
                self.operator("=");
                self.expr(initializer, ASSIGN);
            }
        }
    }

    fn array_spec(&mut self, array: &ArraySpec) {
        match array {
            ArraySpec::Sized(size) => {
                self.attach("[");
                self.expr(size, SEQUENCE);
                self.attach("]");
            }
            ArraySpec::Unsized => self.attach("[]"),
        }
    }

    fn struct_definition(&mut self, definition: &StructDefinition) {
        self.token("struct");
        self.token(&definition.name);
        self.fields(&definition.fields);
    }

    fn fields(&mut self, fields: &[StructField]) {
        self.open_brace();
        for field in fields {
            self.begin_line();
            if !field.layout.is_empty() {
                self.layout(&field.layout);
            }
            if let Some(precision) = field.precision {
                self.token(precision.as_str());
            }
            self.token(&field.ty.base_name());
            self.token(&field.name);
            if let Some(array) = &field.array {
                self.array_spec(array);
            }
            self.attach(";");
        }
        self.close_brace();
    }

    fn interface_block(&mut self, block: &InterfaceBlock) {
        self.qualifiers(&block.qualifiers);
        self.token(&block.name);
        self.fields(&block.fields);
        if let Some(instance) = &block.instance {
            self.space();
            self.token(instance);
            if let Some(array) = &block.instance_array {
                self.array_spec(array);
            }
        }
        self.attach(";");
    }

    fn prototype(&mut self, prototype: &FunctionPrototype) {
        if let Some(precision) = prototype.return_precision {
            self.token(precision.as_str());
        }
        self.token(&prototype.return_type.base_name());
        self.token(&prototype.name);
        self.attach("(");
        for (i, parameter) in prototype.parameters.iter().enumerate() {
            if i > 0 {
                self.comma();
            }
            self.parameter(parameter);
        }
        self.attach(")");
    }

    fn parameter(&mut self, parameter: &Parameter) {
        if parameter.is_const {
            self.token("const");
        }
        match parameter.direction {
            ParameterDirection::In => {}
            ParameterDirection::Out => self.token("out"),
            ParameterDirection::InOut => self.token("inout"),
        }
        if let Some(precision) = parameter.precision {
            self.token(precision.as_str());
        }
        self.token(&parameter.ty.base_name());
        if let Some(name) = &parameter.name {
            self.token(name);
        }
        if let Some(array) = &parameter.array {
            self.array_spec(array);
        }
    }

    // ---- 文 ----

    fn block(&mut self, block: &Block) {
        self.open_brace();
        for statement in &block.statements {
            self.statement(statement);
        }
        self.close_brace();
    }

    fn statement(&mut self, stmt: &Stmt) {
        self.begin_line();
        self.statement_body(stmt);
    }

    /// if・ループの本体
    fn sub_statement(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.block(block),
            _ => {
                self.indent += 1;
                self.statement(stmt);
                self.indent -= 1;
            }
        }
    }

    fn statement_body(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.expr(expr, SEQUENCE);
                self.attach(";");
            }
            StmtKind::Declaration(decl) => {
                self.declaration(decl);
                self.attach(";");
            }
            StmtKind::Block(block) => self.block(block),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.if_statement(condition, then_branch, else_branch.as_deref()),
            StmtKind::Loop(lp) => match lp.kind {
                LoopKind::For => {
                    self.token("for");
                    self.space();
                    self.attach("(");
                    match lp.init.as_deref().map(|init| &init.kind) {
                        Some(StmtKind::Declaration(decl)) => self.declaration(decl),
                        Some(StmtKind::Expr(expr)) => self.expr(expr, SEQUENCE),
                        _ => {}
                    }
                    self.attach(";");
                    if let Some(condition) = &lp.condition {
                        self.space();
                        self.expr(condition, SEQUENCE);
                    }
                    self.attach(";");
                    if let Some(step) = &lp.step {
                        self.space();
                        self.expr(step, SEQUENCE);
                    }
                    self.attach(")");
                    self.sub_statement(&lp.body);
                }
                LoopKind::While => {
                    self.token("while");
                    self.space();
                    self.attach("(");
                    if let Some(condition) = &lp.condition {
                        self.expr(condition, SEQUENCE);
                    }
                    self.attach(")");
                    self.sub_statement(&lp.body);
                }
                LoopKind::DoWhile => {
                    self.token("do");
                    self.sub_statement(&lp.body);
                    if matches!(lp.body.kind, StmtKind::Block(_)) {
                        self.space();
                    } else {
                        self.begin_line();
                    }
                    self.token("while");
                    self.space();
                    self.attach("(");
                    if let Some(condition) = &lp.condition {
                        self.expr(condition, SEQUENCE);
                    }
                    self.attach(");");
                }
            },
            StmtKind::Switch { selector, body } => {
                self.token("switch");
                self.space();
                self.attach("(");
                self.expr(selector, SEQUENCE);
                self.attach(")");
                self.block(body);
            }
            StmtKind::Case(Some(label)) => {
                self.token("case");
                self.space();
                self.expr(label, SEQUENCE);
                self.attach(":");
            }
            StmtKind::Case(None) => {
                self.token("default");
                self.attach(":");
            }
            StmtKind::Return(value) => {
                self.token("return");
                if let Some(value) = value {
                    self.space();
                    self.expr(value, SEQUENCE);
                }
                self.attach(";");
            }
            StmtKind::Break => {
                self.token("break");
                self.attach(";");
            }
            StmtKind::Continue => {
                self.token("continue");
                self.attach(";");
            }
            StmtKind::Discard => {
                self.token("discard");
                self.attach(";");
            }
            StmtKind::Empty => self.attach(";"),
        }
    }

    fn if_statement(&mut self, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) {
        self.token("if");
        self.space();
        self.attach("(");
        self.expr(condition, SEQUENCE);
        self.attach(")");

        let else_branch = match else_branch {
            Some(else_branch) => else_branch,
            None => {
                self.sub_statement(then_branch);
                return;
            }
        };
        let then_is_block = if ends_with_open_if(then_branch) {
            self.open_brace();
            self.statement(then_branch);
            self.close_brace();
            true
        } else {
            self.sub_statement(then_branch);
            matches!(then_branch.kind, StmtKind::Block(_))
        };
        if then_is_block {
            self.space();
        } else {
            self.begin_line();
        }
        self.token("else");
        match &else_branch.kind {
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.space();
                self.if_statement(condition, then_branch, else_branch.as_deref());
            }
            _ => self.sub_statement(else_branch),
        }
    }

    // ---- 式 ----

    fn expr(&mut self, expr: &Expr, min: u8) {
        let parenthesize = precedence(expr) < min;
        if parenthesize {
            self.token("(");
        }
        match &expr.kind {
            ExprKind::Literal(value) => self.token(&literal_text(value)),
            ExprKind::Variable(name) => self.token(name),
            ExprKind::Unary { op, operand } if op.is_postfix() => {
                self.expr(operand, POSTFIX);
                self.token(op.as_str());
            }
            ExprKind::Unary { op, operand } => {
                self.token(op.as_str());
                self.expr(operand, UNARY);
            }
            ExprKind::Binary { op, left, right } => {
                let precedence = op.precedence();
                self.expr(left, precedence);
                self.operator(op.as_str());
                self.expr(right, precedence + 1);
            }
            ExprKind::Assign { op, target, value } => {
                self.expr(target, UNARY);
                self.operator(op.as_str());
                self.expr(value, ASSIGN);
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expr(condition, TERNARY + 1);
                self.operator("?");
                self.expr(then_expr, ASSIGN);
                self.operator(":");
                self.expr(else_expr, TERNARY);
            }
            ExprKind::Call { callee, args } => {
                match callee {
                    Callee::Constructor(ty) => self.token(&ty.to_string()),
                    Callee::Builtin(name) | Callee::User(name) => self.token(name),
                }
                self.attach("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.comma();
                    }
                    self.expr(arg, ASSIGN);
                }
                self.attach(")");
            }
            ExprKind::Swizzle { base, components, set } => {
                self.member_base(base);
                let letters = set.letters();
                let text: String = components
                    .iter()
                    .map(|&component| letters[usize::from(component)])
                    .collect();
                self.attach(".");
                self.attach(&text);
            }
            ExprKind::Field { base, name } => {
                self.member_base(base);
                self.attach(".");
                self.attach(name);
            }
            ExprKind::Index { base, index } => {
                self.member_base(base);
                self.attach("[");
                self.expr(index, SEQUENCE);
                self.attach("]");
            }
            ExprKind::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.comma();
                    }
                    self.expr(item, ASSIGN);
                }
            }
        }
        if parenthesize {
            self.attach(")");
        }
    }

    /// `.` や `[` の前に置く式（数値リテラルは括弧で囲む）
    fn member_base(&mut self, base: &Expr) {
        let min = if matches!(base.kind, ExprKind::Literal(_)) {
            PRIMARY + 1
        } else {
            POSTFIX
        };
        self.expr(base, min);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::error::SourceLocation;
    use crate::frontend::types::Type;
    use crate::frontend::ast::{BinaryOp, UnaryOp};

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(0.0), "0.");
        assert_eq!(format_float(1.0), "1.");
        assert_eq!(format_float(0.5), ".5");
        assert_eq!(format_float(2.25), "2.25");
        assert_eq!(format_float(100000.0), "1e5");
        assert_eq!(format_float(1e-10), "1e-10");
        assert_eq!(format_float(-0.0), "-0.");
        assert_eq!(format_float(-1.5), "-1.5");
        assert_eq!(format_float(f32::INFINITY), "(1./0.)");
    }

    fn variable(name: &str) -> Expr {
        Expr::typed(ExprKind::Variable(name.to_string()), Type::float(), SourceLocation::default())
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::typed(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            Type::float(),
            SourceLocation::default(),
        )
    }

    #[test]
    fn test_minimal_parentheses() {
        let sum = binary(BinaryOp::Add, variable("a"), variable("b"));
        let product = binary(BinaryOp::Mul, sum.clone(), variable("c"));
        assert_eq!(write_expr(&product), "(a+b)*c");

        let left_nested = binary(BinaryOp::Sub, sum.clone(), variable("c"));
        assert_eq!(write_expr(&left_nested), "a+b-c");
        let right_nested = binary(BinaryOp::Sub, variable("c"), sum);
        assert_eq!(write_expr(&right_nested), "c-(a+b)");
    }

    #[test]
    fn test_tokens_do_not_glue() {
        let location = SourceLocation::default();
        let negated = Expr::unary(UnaryOp::Minus, variable("x"), location);
        let twice = Expr::unary(UnaryOp::Minus, negated, location);
        assert_eq!(write_expr(&twice), "- -x");

        let literal = Expr::literal(Constant::Float(-2.0), location);
        assert_eq!(write_expr(&binary(BinaryOp::Sub, variable("x"), literal)), "x- -2.");

        let stmt = Stmt::new(StmtKind::Return(Some(Expr::literal(Constant::Float(0.5), location))), location);
        assert_eq!(write_stmt(&stmt), "return .5;");
    }
}
