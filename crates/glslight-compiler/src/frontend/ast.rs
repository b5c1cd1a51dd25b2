//! # 抽象構文木（AST）
//!
//! GLSL ESシェーダを表現する抽象構文木の定義です。
//! パーサーが生成し、名前解決で型と修飾子が付与された後、
//! バリデータ（読み取りのみ）とオプティマイザ（ノード置換）が使用します。
//! 子ノードはすべて親が排他的に所有し、走査順は常に左から右です。

use std::fmt;

use crate::frontend::error::SourceLocation;
use crate::frontend::types::{Precision, Type};

/// 位置情報を持つトレイト
pub trait Locatable {
    /// ソースコード内の位置情報を取得
    fn location(&self) -> SourceLocation;
}

/// 言語バージョン
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LanguageVersion {
    /// GLSL ES 1.00
    Es100,
    /// GLSL ES 3.00
    Es300,
    /// GLSL ES 3.10
    Es310,
}

impl LanguageVersion {
    /// `#version` の番号とプロファイルから変換
    pub fn from_directive(number: u32, profile: Option<&str>) -> Option<Self> {
        match (number, profile) {
            (100, None) | (100, Some("es")) => Some(LanguageVersion::Es100),
            (300, Some("es")) => Some(LanguageVersion::Es300),
            (310, Some("es")) => Some(LanguageVersion::Es310),
            _ => None,
        }
    }

    /// バージョン番号
    pub fn number(&self) -> u32 {
        match self {
            LanguageVersion::Es100 => 100,
            LanguageVersion::Es300 => 300,
            LanguageVersion::Es310 => 310,
        }
    }

    /// ES 3.x 系かどうか
    pub fn is_es3(&self) -> bool {
        *self >= LanguageVersion::Es300
    }

    /// `#version` ディレクティブの表記
    pub fn directive(&self) -> &'static str {
        match self {
            LanguageVersion::Es100 => "#version 100",
            LanguageVersion::Es300 => "#version 300 es",
            LanguageVersion::Es310 => "#version 310 es",
        }
    }
}

impl fmt::Display for LanguageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageVersion::Es100 => write!(f, "GLSL ES 1.00"),
            LanguageVersion::Es300 => write!(f, "GLSL ES 3.00"),
            LanguageVersion::Es310 => write!(f, "GLSL ES 3.10"),
        }
    }
}

/// 翻訳単位（シェーダ1つ分）
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    /// 言語バージョン
    pub version: LanguageVersion,
    /// `#version` ディレクティブが明示されていたか
    pub explicit_version: bool,
    /// `#extension` ディレクティブ
    pub extensions: Vec<ExtensionDirective>,
    /// 外部宣言
    pub declarations: Vec<ExternalDeclaration>,
}

impl TranslationUnit {
    /// 関数定義を列挙
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.declarations.iter().filter_map(|decl| match decl {
            ExternalDeclaration::Function(function) => Some(function),
            _ => None,
        })
    }

    /// 拡張機能ディレクティブを名前で検索（最後の指定が有効）
    pub fn extension(&self, name: &str) -> Option<&ExtensionDirective> {
        self.extensions.iter().rev().find(|ext| ext.name == name || ext.name == "all")
    }

    /// ツリーの最大深さ
    pub fn depth(&self) -> usize {
        self.functions()
            .flat_map(|function| function.body.statements.iter())
            .map(Stmt::depth)
            .max()
            .unwrap_or(0)
    }
}

/// 拡張機能の動作指定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionBehavior {
    /// require
    Require,
    /// enable
    Enable,
    /// warn
    Warn,
    /// disable
    Disable,
}

impl ExtensionBehavior {
    /// キーワードから変換
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "require" => Some(ExtensionBehavior::Require),
            "enable" => Some(ExtensionBehavior::Enable),
            "warn" => Some(ExtensionBehavior::Warn),
            "disable" => Some(ExtensionBehavior::Disable),
            _ => None,
        }
    }

    /// キーワード表記
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionBehavior::Require => "require",
            ExtensionBehavior::Enable => "enable",
            ExtensionBehavior::Warn => "warn",
            ExtensionBehavior::Disable => "disable",
        }
    }

    /// 拡張機能を有効化する指定かどうか
    pub fn enables(&self) -> bool {
        !matches!(self, ExtensionBehavior::Disable)
    }
}

/// `#extension` ディレクティブ
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionDirective {
    /// 拡張機能名（`GL_` 接頭辞付き）
    pub name: String,
    /// 動作指定
    pub behavior: ExtensionBehavior,
    /// 位置情報
    pub location: SourceLocation,
}

/// 外部宣言（トップレベル）
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalDeclaration {
    /// 既定精度宣言 (`precision mediump float;`)
    Precision(PrecisionDeclaration),
    /// 変数宣言（複数の宣言子を持つ）
    Variables(Declaration),
    /// 宣言子のない構造体定義
    Struct(StructDefinition),
    /// インターフェースブロック
    InterfaceBlock(InterfaceBlock),
    /// 修飾子のみの宣言 (`layout(local_size_x=8) in;`)
    Layout(LayoutDeclaration),
    /// 関数プロトタイプ
    Prototype(FunctionPrototype),
    /// 関数定義
    Function(FunctionDefinition),
}

impl Locatable for ExternalDeclaration {
    fn location(&self) -> SourceLocation {
        match self {
            ExternalDeclaration::Precision(decl) => decl.location,
            ExternalDeclaration::Variables(decl) => decl.location,
            ExternalDeclaration::Struct(decl) => decl.location,
            ExternalDeclaration::InterfaceBlock(decl) => decl.location,
            ExternalDeclaration::Layout(decl) => decl.location,
            ExternalDeclaration::Prototype(decl) => decl.location,
            ExternalDeclaration::Function(decl) => decl.prototype.location,
        }
    }
}

/// 既定精度宣言
#[derive(Debug, Clone, PartialEq)]
pub struct PrecisionDeclaration {
    /// 精度
    pub precision: Precision,
    /// 対象の型
    pub ty: Type,
    /// 位置情報
    pub location: SourceLocation,
}

/// ストレージ修飾子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageQualifier {
    /// const
    Const,
    /// uniform
    Uniform,
    /// in
    In,
    /// out
    Out,
    /// inout（関数パラメータのみ）
    InOut,
    /// attribute
    Attribute,
    /// varying
    Varying,
    /// buffer
    Buffer,
    /// shared
    Shared,
}

impl StorageQualifier {
    /// キーワード表記
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageQualifier::Const => "const",
            StorageQualifier::Uniform => "uniform",
            StorageQualifier::In => "in",
            StorageQualifier::Out => "out",
            StorageQualifier::InOut => "inout",
            StorageQualifier::Attribute => "attribute",
            StorageQualifier::Varying => "varying",
            StorageQualifier::Buffer => "buffer",
            StorageQualifier::Shared => "shared",
        }
    }
}

/// 補間修飾子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// smooth
    Smooth,
    /// flat
    Flat,
}

/// `layout(...)` の個々の指定
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutQualifier {
    /// 名前（location, std140, local_size_x など）
    pub name: String,
    /// 値（`name=value` の形式の場合）
    pub value: Option<i64>,
    /// 位置情報
    pub location: SourceLocation,
}

/// 型修飾子の組
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeQualifiers {
    /// layout修飾子
    pub layout: Vec<LayoutQualifier>,
    /// invariant
    pub invariant: bool,
    /// 補間修飾子
    pub interpolation: Option<Interpolation>,
    /// centroid
    pub centroid: bool,
    /// ストレージ修飾子
    pub storage: Option<StorageQualifier>,
    /// 精度修飾子
    pub precision: Option<Precision>,
}

impl TypeQualifiers {
    /// layout指定の値を取得
    pub fn layout_value(&self, name: &str) -> Option<i64> {
        self.layout.iter().find(|q| q.name == name).and_then(|q| q.value)
    }

    /// 指定したストレージ修飾子かどうか
    pub fn is(&self, storage: StorageQualifier) -> bool {
        self.storage == Some(storage)
    }

    /// 式に伝播する修飾子の集合
    pub fn to_set(&self) -> QualifierSet {
        match self.storage {
            Some(StorageQualifier::Const) => QualifierSet::CONST,
            Some(StorageQualifier::Uniform) => QualifierSet::UNIFORM,
            Some(StorageQualifier::In) => QualifierSet::INPUT,
            Some(StorageQualifier::Out) => QualifierSet::OUTPUT,
            Some(StorageQualifier::Attribute) => QualifierSet::ATTRIBUTE.union(QualifierSet::INPUT),
            Some(StorageQualifier::Varying) => QualifierSet::VARYING,
            Some(StorageQualifier::Buffer) => QualifierSet::BUFFER,
            Some(StorageQualifier::Shared) => QualifierSet::SHARED,
            Some(StorageQualifier::InOut) | None => QualifierSet::EMPTY,
        }
    }
}

/// 式が参照する記憶域の修飾子集合（ビット集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QualifierSet(u16);

impl QualifierSet {
    /// 空集合
    pub const EMPTY: QualifierSet = QualifierSet(0);
    /// const
    pub const CONST: QualifierSet = QualifierSet(1 << 0);
    /// uniform
    pub const UNIFORM: QualifierSet = QualifierSet(1 << 1);
    /// シェーダ入力
    pub const INPUT: QualifierSet = QualifierSet(1 << 2);
    /// シェーダ出力
    pub const OUTPUT: QualifierSet = QualifierSet(1 << 3);
    /// attribute（頂点入力）
    pub const ATTRIBUTE: QualifierSet = QualifierSet(1 << 4);
    /// varying
    pub const VARYING: QualifierSet = QualifierSet(1 << 5);
    /// buffer
    pub const BUFFER: QualifierSet = QualifierSet(1 << 6);
    /// shared
    pub const SHARED: QualifierSet = QualifierSet(1 << 7);

    /// すべての要素を含むか
    pub fn contains(&self, other: QualifierSet) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// 和集合
    pub const fn union(self, other: QualifierSet) -> QualifierSet {
        QualifierSet(self.0 | other.0)
    }

    /// 差集合
    pub const fn without(self, other: QualifierSet) -> QualifierSet {
        QualifierSet(self.0 & !other.0)
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// 変数宣言（1つの型に複数の宣言子）
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// 修飾子
    pub qualifiers: TypeQualifiers,
    /// 基本の型（配列指定は宣言子側）
    pub ty: Type,
    /// 型指定子に埋め込まれた構造体定義
    pub struct_definition: Option<StructDefinition>,
    /// 型指定子側の配列指定 (`float[3] a;`)
    pub array: Option<ArraySpec>,
    /// 宣言子
    pub declarators: Vec<Declarator>,
    /// 位置情報
    pub location: SourceLocation,
}

/// 配列サイズ指定
#[derive(Debug, Clone, PartialEq)]
pub enum ArraySpec {
    /// サイズ式付き
    Sized(Box<Expr>),
    /// サイズ省略（初期化子から決定）
    Unsized,
}

/// 宣言子
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    /// 名前
    pub name: String,
    /// 配列指定
    pub array: Option<ArraySpec>,
    /// 名前解決後の完全な型
    pub ty: Type,
    /// 初期化子
    pub initializer: Option<Expr>,
    /// 位置情報
    pub location: SourceLocation,
}

/// 構造体定義
#[derive(Debug, Clone, PartialEq)]
pub struct StructDefinition {
    /// 名前
    pub name: String,
    /// フィールド
    pub fields: Vec<StructField>,
    /// 位置情報
    pub location: SourceLocation,
}

/// 構造体・ブロックのフィールド
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    /// 精度修飾子
    pub precision: Option<Precision>,
    /// layout修飾子（ブロックメンバのみ）
    pub layout: Vec<LayoutQualifier>,
    /// 名前
    pub name: String,
    /// 配列指定
    pub array: Option<ArraySpec>,
    /// 名前解決後の完全な型
    pub ty: Type,
    /// 位置情報
    pub location: SourceLocation,
}

/// インターフェースブロック (`uniform Block { ... } instance;`)
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceBlock {
    /// 修飾子
    pub qualifiers: TypeQualifiers,
    /// ブロック名
    pub name: String,
    /// メンバ
    pub fields: Vec<StructField>,
    /// インスタンス名
    pub instance: Option<String>,
    /// インスタンスの配列指定
    pub instance_array: Option<ArraySpec>,
    /// 位置情報
    pub location: SourceLocation,
}

/// 修飾子のみの宣言
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDeclaration {
    /// 修飾子
    pub qualifiers: TypeQualifiers,
    /// 位置情報
    pub location: SourceLocation,
}

/// 関数パラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// const修飾
    pub is_const: bool,
    /// in / out / inout
    pub direction: ParameterDirection,
    /// 精度修飾子
    pub precision: Option<Precision>,
    /// 型（配列を含む）
    pub ty: Type,
    /// 配列指定
    pub array: Option<ArraySpec>,
    /// 名前（プロトタイプでは省略可）
    pub name: Option<String>,
    /// 位置情報
    pub location: SourceLocation,
}

/// パラメータの方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParameterDirection {
    /// in（既定）
    #[default]
    In,
    /// out
    Out,
    /// inout
    InOut,
}

/// 関数プロトタイプ
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionPrototype {
    /// 戻り値の精度
    pub return_precision: Option<Precision>,
    /// 戻り値の型
    pub return_type: Type,
    /// 関数名
    pub name: String,
    /// パラメータ
    pub parameters: Vec<Parameter>,
    /// 位置情報
    pub location: SourceLocation,
}

impl FunctionPrototype {
    /// パラメータの型の列
    pub fn parameter_types(&self) -> Vec<Type> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }
}

/// 関数定義
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    /// プロトタイプ
    pub prototype: FunctionPrototype,
    /// 本体
    pub body: Block,
}

/// ブロック
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// 文の列
    pub statements: Vec<Stmt>,
    /// 位置情報
    pub location: SourceLocation,
}

/// 文
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// 文の種類
    pub kind: StmtKind,
    /// 位置情報
    pub location: SourceLocation,
}

impl Stmt {
    /// 新しい文を作成
    pub fn new(kind: StmtKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }

    /// 空文を作成
    pub fn empty(location: SourceLocation) -> Self {
        Self::new(StmtKind::Empty, location)
    }

    /// 空文かどうか
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, StmtKind::Empty)
    }

    /// 文の最大深さ（式を含む）
    pub fn depth(&self) -> usize {
        let inner = match &self.kind {
            StmtKind::Expr(expr) => expr.depth(),
            StmtKind::Declaration(decl) => decl
                .declarators
                .iter()
                .filter_map(|d| d.initializer.as_ref())
                .map(Expr::depth)
                .max()
                .unwrap_or(0),
            StmtKind::Block(block) => block_depth(block),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => condition
                .depth()
                .max(then_branch.depth())
                .max(else_branch.as_ref().map_or(0, |s| s.depth())),
            StmtKind::Loop(lp) => {
                let header = lp
                    .init
                    .as_ref()
                    .map_or(0, |s| s.depth())
                    .max(lp.condition.as_ref().map_or(0, Expr::depth))
                    .max(lp.step.as_ref().map_or(0, Expr::depth));
                header.max(lp.body.depth())
            }
            StmtKind::Switch { selector, body } => selector.depth().max(block_depth(body)),
            StmtKind::Case(Some(expr)) | StmtKind::Return(Some(expr)) => expr.depth(),
            StmtKind::Case(None)
            | StmtKind::Return(None)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Discard
            | StmtKind::Empty => 0,
        };
        inner + 1
    }

    /// 文に含まれるすべての式を前順に訪問
    pub fn walk_exprs(&self, visit: &mut dyn FnMut(&Expr)) {
        match &self.kind {
            StmtKind::Expr(expr) => expr.walk(visit),
            StmtKind::Declaration(decl) => {
                for initializer in decl.declarators.iter().filter_map(|d| d.initializer.as_ref()) {
                    initializer.walk(visit);
                }
            }
            StmtKind::Block(block) => {
                for statement in &block.statements {
                    statement.walk_exprs(visit);
                }
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.walk(visit);
                then_branch.walk_exprs(visit);
                if let Some(else_branch) = else_branch {
                    else_branch.walk_exprs(visit);
                }
            }
            StmtKind::Loop(lp) => {
                if let Some(init) = &lp.init {
                    init.walk_exprs(visit);
                }
                if let Some(condition) = &lp.condition {
                    condition.walk(visit);
                }
                if let Some(step) = &lp.step {
                    step.walk(visit);
                }
                lp.body.walk_exprs(visit);
            }
            StmtKind::Switch { selector, body } => {
                selector.walk(visit);
                for statement in &body.statements {
                    statement.walk_exprs(visit);
                }
            }
            StmtKind::Case(Some(expr)) | StmtKind::Return(Some(expr)) => expr.walk(visit),
            StmtKind::Case(None)
            | StmtKind::Return(None)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Discard
            | StmtKind::Empty => {}
        }
    }
}

fn block_depth(block: &Block) -> usize {
    block.statements.iter().map(Stmt::depth).max().unwrap_or(0)
}

impl Locatable for Stmt {
    fn location(&self) -> SourceLocation {
        self.location
    }
}

/// 文の種類
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// 式文
    Expr(Expr),
    /// 局所変数宣言
    Declaration(Declaration),
    /// ブロック
    Block(Block),
    /// 条件分岐
    If {
        /// 条件
        condition: Expr,
        /// then節
        then_branch: Box<Stmt>,
        /// else節
        else_branch: Option<Box<Stmt>>,
    },
    /// ループ
    Loop(Loop),
    /// switch文
    Switch {
        /// 選択式
        selector: Expr,
        /// 本体
        body: Block,
    },
    /// caseラベル（`None` は default）
    Case(Option<Expr>),
    /// return文
    Return(Option<Expr>),
    /// break文
    Break,
    /// continue文
    Continue,
    /// discard文
    Discard,
    /// 空文
    Empty,
}

/// ループの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    /// for
    For,
    /// while
    While,
    /// do-while
    DoWhile,
}

/// ループ
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    /// 種類
    pub kind: LoopKind,
    /// 初期化文（forのみ）
    pub init: Option<Box<Stmt>>,
    /// 条件式
    pub condition: Option<Expr>,
    /// 更新式（forのみ）
    pub step: Option<Expr>,
    /// 本体
    pub body: Box<Stmt>,
}

/// 定数値
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    /// float
    Float(f32),
    /// int
    Int(i32),
    /// uint
    UInt(u32),
    /// bool
    Bool(bool),
}

impl Constant {
    /// 定数の型
    pub fn ty(&self) -> Type {
        match self {
            Constant::Float(_) => Type::float(),
            Constant::Int(_) => Type::int(),
            Constant::UInt(_) => Type::uint(),
            Constant::Bool(_) => Type::bool(),
        }
    }

    /// 正のゼロかどうか（`-0.0` は含まない）
    pub fn is_positive_zero(&self) -> bool {
        match *self {
            Constant::Float(value) => value == 0.0 && value.is_sign_positive(),
            Constant::Int(value) => value == 0,
            Constant::UInt(value) => value == 0,
            Constant::Bool(_) => false,
        }
    }

    /// 厳密に1かどうか
    pub fn is_one(&self) -> bool {
        match *self {
            Constant::Float(value) => value == 1.0,
            Constant::Int(value) => value == 1,
            Constant::UInt(value) => value == 1,
            Constant::Bool(_) => false,
        }
    }
}

/// 単項演算子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// +
    Plus,
    /// -
    Minus,
    /// !
    Not,
    /// ~
    BitNot,
    /// 前置 ++
    PreIncrement,
    /// 前置 --
    PreDecrement,
    /// 後置 ++
    PostIncrement,
    /// 後置 --
    PostDecrement,
}

impl UnaryOp {
    /// 演算子の表記
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => "++",
            UnaryOp::PreDecrement | UnaryOp::PostDecrement => "--",
        }
    }

    /// 増減演算子かどうか
    pub fn is_increment(&self) -> bool {
        matches!(
            self,
            UnaryOp::PreIncrement | UnaryOp::PreDecrement | UnaryOp::PostIncrement | UnaryOp::PostDecrement
        )
    }

    /// 後置演算子かどうか
    pub fn is_postfix(&self) -> bool {
        matches!(self, UnaryOp::PostIncrement | UnaryOp::PostDecrement)
    }
}

/// 二項演算子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// +
    Add,
    /// -
    Sub,
    /// *
    Mul,
    /// /
    Div,
    /// %
    Mod,
    /// <<
    Shl,
    /// >>
    Shr,
    /// &
    BitAnd,
    /// |
    BitOr,
    /// ^
    BitXor,
    /// &&
    And,
    /// ||
    Or,
    /// ^^
    Xor,
    /// ==
    Eq,
    /// !=
    Ne,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Le,
    /// >=
    Ge,
}

impl BinaryOp {
    /// 演算子の表記
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Xor => "^^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
        }
    }

    /// 優先順位（大きいほど強く結合）
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 3,
            BinaryOp::Xor => 4,
            BinaryOp::And => 5,
            BinaryOp::BitOr => 6,
            BinaryOp::BitXor => 7,
            BinaryOp::BitAnd => 8,
            BinaryOp::Eq | BinaryOp::Ne => 9,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 10,
            BinaryOp::Shl | BinaryOp::Shr => 11,
            BinaryOp::Add | BinaryOp::Sub => 12,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 13,
        }
    }

    /// 比較演算子（== != < > <= >=）かどうか
    pub fn is_comparison(&self) -> bool {
        self.is_equality() || self.is_relational()
    }

    /// 等値演算子（== !=）かどうか
    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    /// 大小比較（< > <= >=）かどうか
    pub fn is_relational(&self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge)
    }

    /// ビット演算・シフト演算かどうか
    pub fn is_bitwise(&self) -> bool {
        matches!(
            self,
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr
        )
    }

    /// 比較の否定
    pub fn negated_comparison(&self) -> Option<BinaryOp> {
        match self {
            BinaryOp::Eq => Some(BinaryOp::Ne),
            BinaryOp::Ne => Some(BinaryOp::Eq),
            BinaryOp::Lt => Some(BinaryOp::Ge),
            BinaryOp::Gt => Some(BinaryOp::Le),
            BinaryOp::Le => Some(BinaryOp::Gt),
            BinaryOp::Ge => Some(BinaryOp::Lt),
            _ => None,
        }
    }
}

/// 代入演算子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    /// =
    Assign,
    /// 複合代入 (`+=` など)
    Compound(BinaryOp),
}

impl AssignOp {
    /// 演算子の表記
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Compound(BinaryOp::Add) => "+=",
            AssignOp::Compound(BinaryOp::Sub) => "-=",
            AssignOp::Compound(BinaryOp::Mul) => "*=",
            AssignOp::Compound(BinaryOp::Div) => "/=",
            AssignOp::Compound(BinaryOp::Mod) => "%=",
            AssignOp::Compound(BinaryOp::Shl) => "<<=",
            AssignOp::Compound(BinaryOp::Shr) => ">>=",
            AssignOp::Compound(BinaryOp::BitAnd) => "&=",
            AssignOp::Compound(BinaryOp::BitOr) => "|=",
            AssignOp::Compound(BinaryOp::BitXor) => "^=",
            AssignOp::Compound(_) => "?=",
        }
    }
}

/// 呼び出し先
#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    /// 組み込み関数
    Builtin(String),
    /// 型コンストラクタ
    Constructor(Type),
    /// ユーザー定義関数
    User(String),
}

impl Callee {
    /// 呼び出し先の表記名
    pub fn name(&self) -> String {
        match self {
            Callee::Builtin(name) | Callee::User(name) => name.clone(),
            Callee::Constructor(ty) => ty.to_string(),
        }
    }
}

/// スウィズルの文字集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwizzleSet {
    /// xyzw
    Xyzw,
    /// rgba
    Rgba,
    /// stpq
    Stpq,
}

impl SwizzleSet {
    /// 成分の文字
    pub fn letters(&self) -> [char; 4] {
        match self {
            SwizzleSet::Xyzw => ['x', 'y', 'z', 'w'],
            SwizzleSet::Rgba => ['r', 'g', 'b', 'a'],
            SwizzleSet::Stpq => ['s', 't', 'p', 'q'],
        }
    }

    /// フィールド名をスウィズルとして解釈
    pub fn parse(name: &str) -> Option<(SwizzleSet, Vec<u8>)> {
        let first = name.chars().next()?;
        let set = [SwizzleSet::Xyzw, SwizzleSet::Rgba, SwizzleSet::Stpq]
            .into_iter()
            .find(|set| set.letters().contains(&first))?;
        let letters = set.letters();
        let components = name
            .chars()
            .map(|c| letters.iter().position(|&l| l == c).map(|i| i as u8))
            .collect::<Option<Vec<u8>>>()?;
        if components.is_empty() || components.len() > 4 {
            return None;
        }
        Some((set, components))
    }
}

/// 式
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// 式の種類
    pub kind: ExprKind,
    /// 名前解決後の静的型
    pub ty: Type,
    /// 参照している記憶域の修飾子
    pub qualifiers: QualifierSet,
    /// 位置情報
    pub location: SourceLocation,
}

impl Expr {
    /// 未解決の式を作成
    pub fn new(kind: ExprKind, location: SourceLocation) -> Self {
        Self {
            kind,
            ty: Type::error(),
            qualifiers: QualifierSet::EMPTY,
            location,
        }
    }

    /// 型付きの式を作成
    pub fn typed(kind: ExprKind, ty: Type, location: SourceLocation) -> Self {
        Self {
            kind,
            ty,
            qualifiers: QualifierSet::EMPTY,
            location,
        }
    }

    /// リテラル式を作成
    pub fn literal(value: Constant, location: SourceLocation) -> Self {
        let mut expr = Self::typed(ExprKind::Literal(value), value.ty(), location);
        expr.qualifiers = QualifierSet::CONST;
        expr
    }

    /// 単項演算式を作成（型は被演算子から引き継ぐ）
    pub fn unary(op: UnaryOp, operand: Expr, location: SourceLocation) -> Self {
        let ty = operand.ty.clone();
        let qualifiers = operand.qualifiers;
        Self {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            qualifiers,
            location,
        }
    }

    /// 副作用を持つかどうか（代入・増減・ユーザー関数呼び出し）
    pub fn has_side_effects(&self) -> bool {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Variable(_) => false,
            ExprKind::Assign { .. } => true,
            ExprKind::Unary { op, operand } => op.is_increment() || operand.has_side_effects(),
            ExprKind::Binary { left, right, .. } => left.has_side_effects() || right.has_side_effects(),
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => condition.has_side_effects() || then_expr.has_side_effects() || else_expr.has_side_effects(),
            ExprKind::Call { callee, args } => {
                matches!(callee, Callee::User(_)) || args.iter().any(Expr::has_side_effects)
            }
            ExprKind::Swizzle { base, .. } | ExprKind::Field { base, .. } => base.has_side_effects(),
            ExprKind::Index { base, index } => base.has_side_effects() || index.has_side_effects(),
            ExprKind::Sequence(exprs) => exprs.iter().any(Expr::has_side_effects),
        }
    }

    /// 式の深さ
    pub fn depth(&self) -> usize {
        let children = match &self.kind {
            ExprKind::Literal(_) | ExprKind::Variable(_) => 0,
            ExprKind::Unary { operand, .. } => operand.depth(),
            ExprKind::Binary { left, right, .. } => left.depth().max(right.depth()),
            ExprKind::Assign { target, value, .. } => target.depth().max(value.depth()),
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => condition.depth().max(then_expr.depth()).max(else_expr.depth()),
            ExprKind::Call { args, .. } | ExprKind::Sequence(args) => {
                args.iter().map(Expr::depth).max().unwrap_or(0)
            }
            ExprKind::Swizzle { base, .. } | ExprKind::Field { base, .. } => base.depth(),
            ExprKind::Index { base, index } => base.depth().max(index.depth()),
        };
        children + 1
    }

    /// 前順に自身と子孫を訪問
    pub fn walk(&self, visit: &mut dyn FnMut(&Expr)) {
        visit(self);
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Variable(_) => {}
            ExprKind::Unary { operand, .. } => operand.walk(visit),
            ExprKind::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            ExprKind::Assign { target, value, .. } => {
                target.walk(visit);
                value.walk(visit);
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                condition.walk(visit);
                then_expr.walk(visit);
                else_expr.walk(visit);
            }
            ExprKind::Call { args, .. } | ExprKind::Sequence(args) => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            ExprKind::Swizzle { base, .. } | ExprKind::Field { base, .. } => base.walk(visit),
            ExprKind::Index { base, index } => {
                base.walk(visit);
                index.walk(visit);
            }
        }
    }

    /// 左辺値の根にある変数名
    pub fn root_variable(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Variable(name) => Some(name),
            ExprKind::Swizzle { base, .. } | ExprKind::Field { base, .. } | ExprKind::Index { base, .. } => {
                base.root_variable()
            }
            _ => None,
        }
    }
}

impl Locatable for Expr {
    fn location(&self) -> SourceLocation {
        self.location
    }
}

/// 式の種類
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// リテラル
    Literal(Constant),
    /// 変数参照
    Variable(String),
    /// 単項演算
    Unary {
        /// 演算子
        op: UnaryOp,
        /// 被演算子
        operand: Box<Expr>,
    },
    /// 二項演算
    Binary {
        /// 演算子
        op: BinaryOp,
        /// 左辺
        left: Box<Expr>,
        /// 右辺
        right: Box<Expr>,
    },
    /// 代入（単純・複合）
    Assign {
        /// 演算子
        op: AssignOp,
        /// 代入先
        target: Box<Expr>,
        /// 値
        value: Box<Expr>,
    },
    /// 三項演算
    Ternary {
        /// 条件
        condition: Box<Expr>,
        /// 真の場合
        then_expr: Box<Expr>,
        /// 偽の場合
        else_expr: Box<Expr>,
    },
    /// 関数呼び出し・コンストラクタ
    Call {
        /// 呼び出し先
        callee: Callee,
        /// 引数
        args: Vec<Expr>,
    },
    /// スウィズル
    Swizzle {
        /// 対象
        base: Box<Expr>,
        /// 成分インデックス
        components: Vec<u8>,
        /// 文字集合
        set: SwizzleSet,
    },
    /// フィールドアクセス
    Field {
        /// 対象
        base: Box<Expr>,
        /// フィールド名
        name: String,
    },
    /// 添字アクセス
    Index {
        /// 対象
        base: Box<Expr>,
        /// 添字
        index: Box<Expr>,
    },
    /// コンマ演算子
    Sequence(Vec<Expr>),
}
