//! # 名前の短縮
//!
//! 関数パラメータ・局所変数・`main` 以外のユーザー関数を短い名前に置き換えます。
//!
//! 1. 走査してスコープごとのシンボルと出現回数、置き換えてはいけない名前
//!    （大域変数・構造体・組み込み関数・解決できない識別子）を集める
//! 2. 出現回数の多いシンボルから順に短い名前を割り当てる
//! 3. 同じ順序でもう一度走査して名前を書き換える
//!
//! 局所シンボルの名前は関数ごとに割り当てるため、別の関数の局所変数とは同じ名前になり得ます。

use std::collections::{HashMap, HashSet};

use crate::frontend::ast::{
    ArraySpec, Block, Callee, Declaration, Expr, ExprKind, ExternalDeclaration, FunctionDefinition, Stmt, StmtKind,
    TranslationUnit,
};
use crate::frontend::types::{BasicType, Type};

/// 名前として使えないキーワードと予約語
const KEYWORDS: &[&str] = &[
    "active", "asm", "atomic_uint", "attribute", "bool", "break", "buffer", "bvec2", "bvec3", "bvec4", "case", "cast",
    "centroid", "class", "coherent", "common", "const", "continue", "default", "discard", "do", "double", "dvec2",
    "dvec3", "dvec4", "else", "enum", "extern", "external", "false", "filter", "fixed", "flat", "float", "for", "fvec2",
    "fvec3", "fvec4", "goto", "half", "highp", "hvec2", "hvec3", "hvec4", "if", "in", "inline", "inout", "input", "int",
    "interface", "invariant", "isampler2D", "isampler2DArray", "isampler3D", "isamplerCube", "ivec2", "ivec3", "ivec4",
    "layout", "long", "lowp", "main", "mat2", "mat2x2", "mat2x3", "mat2x4", "mat3", "mat3x2", "mat3x3", "mat3x4", "mat4",
    "mat4x2", "mat4x3", "mat4x4", "mediump", "namespace", "noinline", "noperspective", "out", "output", "packed",
    "partition", "patch", "precise", "precision", "public", "readonly", "resource", "restrict", "return", "sample",
    "sampler1D", "sampler1DShadow", "sampler2D", "sampler2DArray", "sampler2DArrayShadow", "sampler2DRect",
    "sampler2DRectShadow", "sampler2DShadow", "sampler3D", "sampler3DRect", "samplerCube", "samplerCubeShadow",
    "samplerExternalOES", "shared", "short", "sizeof", "smooth", "static", "struct", "subroutine", "superp", "switch",
    "template", "this", "true", "typedef", "uint", "uniform", "union", "unsigned", "usampler2D", "usampler2DArray",
    "usampler3D", "usamplerCube", "using", "uvec2", "uvec3", "uvec4", "varying", "vec2", "vec3", "vec4", "void",
    "volatile", "while", "writeonly",
];

const FIRST_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NEXT_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";

/// `index` 番目の候補名（`a`〜`Z`、`aa`、`ab`…）
fn candidate(mut index: usize) -> String {
    let mut name = vec![FIRST_CHARS[index % FIRST_CHARS.len()]];
    index /= FIRST_CHARS.len();
    while index > 0 {
        index -= 1;
        name.push(NEXT_CHARS[index % NEXT_CHARS.len()]);
        index /= NEXT_CHARS.len();
    }
    name.into_iter().map(char::from).collect()
}

/// 識別子として使える候補名か
fn usable(name: &str, reserved: &HashSet<String>) -> bool {
    !name.starts_with("gl_") && !name.contains("__") && !KEYWORDS.contains(&name) && !reserved.contains(name)
}

/// 予約されていない短い名前を順に返す
struct NameSource<'r> {
    next: usize,
    reserved: &'r HashSet<String>,
}

impl<'r> NameSource<'r> {
    fn new(reserved: &'r HashSet<String>) -> Self {
        Self { next: 0, reserved }
    }

    fn next_name(&mut self) -> String {
        loop {
            let name = candidate(self.next);
            self.next += 1;
            if usable(&name, self.reserved) {
                return name;
            }
        }
    }
}

/// 出現回数の多い順（同数なら先に現れた順）の添字
fn by_frequency(uses: &[usize]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..uses.len()).collect();
    order.sort_by(|&a, &b| uses[b].cmp(&uses[a]).then(a.cmp(&b)));
    order
}

/// 名前を短縮し、置き換えたシンボルの数を返す
pub fn mangle(unit: &mut TranslationUnit) -> usize {
    let mut functions: Vec<String> = Vec::new();
    let mut reserved = HashSet::new();
    reserved.insert("main".to_string());
    for declaration in &unit.declarations {
        collect_global_names(declaration, &mut functions, &mut reserved);
    }
    let function_set: HashSet<String> = functions.iter().cloned().collect();

    // 1. 走査
    let mut scan = Walker::new(Mode::Scan, &function_set);
    let mut function_locals = Vec::new();
    for declaration in &mut unit.declarations {
        match declaration {
            ExternalDeclaration::Function(function) => {
                scan.function(function);
                function_locals.push(std::mem::take(&mut scan.uses));
            }
            ExternalDeclaration::Variables(decl) => scan.global_declaration(decl),
            _ => {}
        }
    }
    reserved.extend(scan.reserved.drain());

    // 2. 割り当て
    let mut function_names = HashMap::new();
    let function_uses: Vec<usize> = functions
        .iter()
        .map(|name| scan.calls.get(name).copied().unwrap_or(0))
        .collect();
    let mut source = NameSource::new(&reserved);
    for index in by_frequency(&function_uses) {
        function_names.insert(functions[index].clone(), source.next_name());
    }
    let mut local_reserved = reserved.clone();
    local_reserved.extend(function_names.values().cloned());
    let local_names: Vec<Vec<String>> = function_locals
        .iter()
        .map(|uses| {
            let mut source = NameSource::new(&local_reserved);
            let mut names = vec![String::new(); uses.len()];
            for index in by_frequency(uses) {
                names[index] = source.next_name();
            }
            names
        })
        .collect();

    // 3. 書き換え
    let mut function_index = 0;
    for declaration in &mut unit.declarations {
        match declaration {
            ExternalDeclaration::Function(function) => {
                let locals = local_names.get(function_index).map(Vec::as_slice).unwrap_or(&[]);
                function_index += 1;
                if let Some(name) = function_names.get(&function.prototype.name) {
                    function.prototype.name = name.clone();
                }
                let mut rename = Walker::new(
                    Mode::Rename {
                        locals,
                        functions: &function_names,
                    },
                    &function_set,
                );
                rename.function(function);
            }
            ExternalDeclaration::Prototype(prototype) => {
                if let Some(name) = function_names.get(&prototype.name) {
                    prototype.name = name.clone();
                }
            }
            ExternalDeclaration::Variables(decl) => {
                let mut rename = Walker::new(
                    Mode::Rename {
                        locals: &[],
                        functions: &function_names,
                    },
                    &function_set,
                );
                rename.global_declaration(decl);
            }
            _ => {}
        }
    }

    function_names.len() + local_names.iter().map(Vec::len).sum::<usize>()
}

fn collect_global_names(declaration: &ExternalDeclaration, functions: &mut Vec<String>, reserved: &mut HashSet<String>) {
    match declaration {
        ExternalDeclaration::Variables(decl) => {
            if let Some(definition) = &decl.struct_definition {
                reserved.insert(definition.name.clone());
            }
            for declarator in &decl.declarators {
                reserved.insert(declarator.name.clone());
            }
        }
        ExternalDeclaration::Struct(definition) => {
            reserved.insert(definition.name.clone());
        }
        ExternalDeclaration::InterfaceBlock(block) => {
            reserved.insert(block.name.clone());
            if let Some(instance) = &block.instance {
                reserved.insert(instance.clone());
            }
            for field in &block.fields {
                reserved.insert(field.name.clone());
            }
        }
        ExternalDeclaration::Prototype(prototype) if prototype.name != "main" => {
            if !functions.contains(&prototype.name) {
                functions.push(prototype.name.clone());
            }
        }
        ExternalDeclaration::Function(function) if function.prototype.name != "main" => {
            if !functions.contains(&function.prototype.name) {
                functions.push(function.prototype.name.clone());
            }
        }
        _ => {}
    }
}

enum Mode<'m> {
    /// 出現回数と予約名を集める
    Scan,
    /// 割り当てた名前に書き換える
    Rename {
        locals: &'m [String],
        functions: &'m HashMap<String, String>,
    },
}

struct Walker<'m> {
    mode: Mode<'m>,
    user_functions: &'m HashSet<String>,
    scopes: Vec<HashMap<String, usize>>,
    next_id: usize,
    uses: Vec<usize>,
    calls: HashMap<String, usize>,
    reserved: HashSet<String>,
}

impl<'m> Walker<'m> {
    fn new(mode: Mode<'m>, user_functions: &'m HashSet<String>) -> Self {
        Self {
            mode,
            user_functions,
            scopes: Vec::new(),
            next_id: 0,
            uses: Vec::new(),
            calls: HashMap::new(),
            reserved: HashSet::new(),
        }
    }

    fn function(&mut self, function: &mut FunctionDefinition) {
        self.scopes = vec![HashMap::new()];
        self.next_id = 0;
        for parameter in &mut function.prototype.parameters {
            self.reserve_type(&parameter.ty);
            if let Some(ArraySpec::Sized(size)) = &mut parameter.array {
                self.expr(size);
            }
            if let Some(name) = &mut parameter.name {
                self.declare(name);
            }
        }
        // パラメータと本体の最上位は同じスコープ
        for statement in &mut function.body.statements {
            self.stmt(statement);
        }
        self.scopes.clear();
    }

    fn global_declaration(&mut self, decl: &mut Declaration) {
        self.scopes.clear();
        for declarator in &mut decl.declarators {
            if let Some(ArraySpec::Sized(size)) = &mut declarator.array {
                self.expr(size);
            }
            if let Some(initializer) = &mut declarator.initializer {
                self.expr(initializer);
            }
        }
    }

    fn reserve(&mut self, name: &str) {
        if matches!(self.mode, Mode::Scan) {
            self.reserved.insert(name.to_string());
        }
    }

    fn reserve_type(&mut self, ty: &Type) {
        if let BasicType::Struct(name) = &ty.basic {
            self.reserve(name);
        }
    }

    fn declare(&mut self, name: &mut String) {
        let id = self.next_id;
        self.next_id += 1;
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.clone(), id);
        }
        match &self.mode {
            Mode::Scan => self.uses.push(1),
            Mode::Rename { locals, .. } => {
                if let Some(new_name) = locals.get(id) {
                    *name = new_name.clone();
                }
            }
        }
    }

    fn reference(&mut self, name: &mut String) {
        let id = self.scopes.iter().rev().find_map(|scope| scope.get(name.as_str()).copied());
        match (&self.mode, id) {
            (Mode::Scan, Some(id)) => {
                if let Some(count) = self.uses.get_mut(id) {
                    *count += 1;
                }
            }
            (Mode::Scan, None) => {
                self.reserved.insert(name.clone());
            }
            (Mode::Rename { locals, .. }, Some(id)) => {
                if let Some(new_name) = locals.get(id) {
                    *name = new_name.clone();
                }
            }
            (Mode::Rename { .. }, None) => {}
        }
    }

    fn call(&mut self, name: &mut String) {
        if !self.user_functions.contains(name.as_str()) {
            self.reserve(name);
            return;
        }
        match &self.mode {
            Mode::Scan => *self.calls.entry(name.clone()).or_insert(0) += 1,
            Mode::Rename { functions, .. } => {
                if let Some(new_name) = functions.get(name.as_str()) {
                    *name = new_name.clone();
                }
            }
        }
    }

    fn scoped(&mut self, visit: impl FnOnce(&mut Self)) {
        self.scopes.push(HashMap::new());
        visit(self);
        self.scopes.pop();
    }

    fn block(&mut self, block: &mut Block) {
        self.scoped(|walker| {
            for statement in &mut block.statements {
                walker.stmt(statement);
            }
        });
    }

    fn declaration(&mut self, decl: &mut Declaration) {
        if let Some(definition) = &decl.struct_definition {
            let name = definition.name.clone();
            self.reserve(&name);
        }
        self.reserve_type(&decl.ty);
        for declarator in &mut decl.declarators {
            if let Some(ArraySpec::Sized(size)) = &mut declarator.array {
                self.expr(size);
            }
            if let Some(initializer) = &mut declarator.initializer {
                self.expr(initializer);
            }
            self.declare(&mut declarator.name);
        }
    }

    fn stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Expr(expr) => self.expr(expr),
            StmtKind::Declaration(decl) => self.declaration(decl),
            StmtKind::Block(block) => self.block(block),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition);
                self.scoped(|walker| walker.stmt(then_branch));
                if let Some(else_branch) = else_branch {
                    self.scoped(|walker| walker.stmt(else_branch));
                }
            }
            StmtKind::Loop(lp) => self.scoped(|walker| {
                if let Some(init) = &mut lp.init {
                    walker.stmt(init);
                }
                if let Some(condition) = &mut lp.condition {
                    walker.expr(condition);
                }
                if let Some(step) = &mut lp.step {
                    walker.expr(step);
                }
                walker.stmt(&mut lp.body);
            }),
            StmtKind::Switch { selector, body } => {
                self.expr(selector);
                self.block(body);
            }
            StmtKind::Case(Some(value)) | StmtKind::Return(Some(value)) => self.expr(value),
            StmtKind::Case(None)
            | StmtKind::Return(None)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Discard
            | StmtKind::Empty => {}
        }
    }

    fn expr(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Variable(name) => self.reference(name),
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
            ExprKind::Call { callee, args } => {
                match callee {
                    Callee::User(name) => self.call(name),
                    Callee::Builtin(name) => self.reserve(name),
                    Callee::Constructor(ty) => {
                        let ty = ty.clone();
                        self.reserve_type(&ty);
                    }
                }
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::Swizzle { base, .. } | ExprKind::Field { base, .. } => self.expr(base),
            ExprKind::Index { base, index } => {
                self.expr(base);
                self.expr(index);
            }
            ExprKind::Sequence(items) => {
                for item in items {
                    self.expr(item);
                }
            }
        }
    }
}
