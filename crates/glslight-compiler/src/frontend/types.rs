//! # GLSL型の表現
//!
//! 基本型（スカラー種別・サンプラー・構造体）と形状（スカラー／ベクトル／行列）、
//! 配列長の組み合わせとして静的型を表現します。
//! GLSL ESには暗黙の型変換がないため、型の比較は構造的な等価性で行います。

use std::fmt;

/// サンプラーの次元
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerDim {
    /// 2D
    D2,
    /// 3D
    D3,
    /// キューブマップ
    Cube,
    /// 2D配列
    D2Array,
    /// キューブマップ配列
    CubeArray,
    /// 2Dマルチサンプル
    D2Ms,
    /// 2Dシャドウ
    D2Shadow,
    /// キューブシャドウ
    CubeShadow,
    /// 2D配列シャドウ
    D2ArrayShadow,
    /// 外部画像（OES_EGL_image_external）
    External,
    /// 矩形テクスチャ（ARB_texture_rectangle）
    Rect,
}

impl SamplerDim {
    /// シャドウサンプラーかどうか
    pub fn is_shadow(&self) -> bool {
        matches!(self, SamplerDim::D2Shadow | SamplerDim::CubeShadow | SamplerDim::D2ArrayShadow)
    }

    fn suffix(&self) -> &'static str {
        match self {
            SamplerDim::D2 => "2D",
            SamplerDim::D3 => "3D",
            SamplerDim::Cube => "Cube",
            SamplerDim::D2Array => "2DArray",
            SamplerDim::CubeArray => "CubeArray",
            SamplerDim::D2Ms => "2DMS",
            SamplerDim::D2Shadow => "2DShadow",
            SamplerDim::CubeShadow => "CubeShadow",
            SamplerDim::D2ArrayShadow => "2DArrayShadow",
            SamplerDim::External => "ExternalOES",
            SamplerDim::Rect => "2DRect",
        }
    }

    const ALL: [SamplerDim; 11] = [
        SamplerDim::D2,
        SamplerDim::D3,
        SamplerDim::Cube,
        SamplerDim::D2Array,
        SamplerDim::CubeArray,
        SamplerDim::D2Ms,
        SamplerDim::D2Shadow,
        SamplerDim::CubeShadow,
        SamplerDim::D2ArrayShadow,
        SamplerDim::External,
        SamplerDim::Rect,
    ];
}

/// スカラーの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// float
    Float,
    /// int
    Int,
    /// uint
    UInt,
    /// bool
    Bool,
}

/// サンプラー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerType {
    /// 次元
    pub dim: SamplerDim,
    /// 返却成分の種別（float / int / uint）
    pub component: ScalarKind,
}

impl SamplerType {
    /// GLSLでの型名
    pub fn name(&self) -> String {
        let prefix = match self.component {
            ScalarKind::Int => "i",
            ScalarKind::UInt => "u",
            _ => "",
        };
        format!("{}sampler{}", prefix, self.dim.suffix())
    }
}

/// 基本型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BasicType {
    /// void
    Void,
    /// float
    Float,
    /// int
    Int,
    /// uint
    UInt,
    /// bool
    Bool,
    /// サンプラー
    Sampler(SamplerType),
    /// 構造体（名前で参照）
    Struct(String),
    /// 解決できなかった型（診断済みまたは診断対象）
    Error,
}

impl BasicType {
    /// スカラー種別に変換
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            BasicType::Float => Some(ScalarKind::Float),
            BasicType::Int => Some(ScalarKind::Int),
            BasicType::UInt => Some(ScalarKind::UInt),
            BasicType::Bool => Some(ScalarKind::Bool),
            _ => None,
        }
    }

    /// スカラー種別から作成
    pub fn from_scalar(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Float => BasicType::Float,
            ScalarKind::Int => BasicType::Int,
            ScalarKind::UInt => BasicType::UInt,
            ScalarKind::Bool => BasicType::Bool,
        }
    }
}

/// 形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// スカラー
    Scalar,
    /// ベクトル（2〜4成分）
    Vector(u8),
    /// 行列（列数 × 行数）
    Matrix {
        /// 列数
        cols: u8,
        /// 行数
        rows: u8,
    },
}

/// 静的型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    /// 基本型
    pub basic: BasicType,
    /// 形状
    pub shape: Shape,
    /// 配列長（配列でなければ `None`）
    pub array: Option<u32>,
}

impl Type {
    /// スカラー型を作成
    pub fn scalar(basic: BasicType) -> Self {
        Self {
            basic,
            shape: Shape::Scalar,
            array: None,
        }
    }

    /// ベクトル型を作成（1成分ならスカラー）
    pub fn vector(basic: BasicType, size: u8) -> Self {
        let shape = if size <= 1 { Shape::Scalar } else { Shape::Vector(size) };
        Self {
            basic,
            shape,
            array: None,
        }
    }

    /// float行列型を作成
    pub fn matrix(cols: u8, rows: u8) -> Self {
        Self {
            basic: BasicType::Float,
            shape: Shape::Matrix { cols, rows },
            array: None,
        }
    }

    /// void
    pub fn void() -> Self {
        Self::scalar(BasicType::Void)
    }

    /// float
    pub fn float() -> Self {
        Self::scalar(BasicType::Float)
    }

    /// int
    pub fn int() -> Self {
        Self::scalar(BasicType::Int)
    }

    /// uint
    pub fn uint() -> Self {
        Self::scalar(BasicType::UInt)
    }

    /// bool
    pub fn bool() -> Self {
        Self::scalar(BasicType::Bool)
    }

    /// 解決失敗を表す型
    pub fn error() -> Self {
        Self::scalar(BasicType::Error)
    }

    /// サンプラー型
    pub fn sampler(dim: SamplerDim, component: ScalarKind) -> Self {
        Self::scalar(BasicType::Sampler(SamplerType { dim, component }))
    }

    /// 配列長を付けた型
    pub fn with_array(mut self, size: Option<u32>) -> Self {
        self.array = size;
        self
    }

    /// 解決失敗の型かどうか
    pub fn is_error(&self) -> bool {
        self.basic == BasicType::Error
    }

    /// voidかどうか
    pub fn is_void(&self) -> bool {
        self.basic == BasicType::Void
    }

    /// 配列かどうか
    pub fn is_array(&self) -> bool {
        self.array.is_some()
    }

    /// 非配列のスカラーかどうか
    pub fn is_scalar(&self) -> bool {
        !self.is_array() && self.shape == Shape::Scalar
    }

    /// 非配列のベクトルかどうか
    pub fn is_vector(&self) -> bool {
        !self.is_array() && matches!(self.shape, Shape::Vector(_))
    }

    /// 非配列の行列かどうか
    pub fn is_matrix(&self) -> bool {
        !self.is_array() && matches!(self.shape, Shape::Matrix { .. })
    }

    /// float系かどうか
    pub fn is_float(&self) -> bool {
        self.basic == BasicType::Float
    }

    /// 整数系（int / uint）かどうか
    pub fn is_integer(&self) -> bool {
        matches!(self.basic, BasicType::Int | BasicType::UInt)
    }

    /// 数値型（float / int / uint）かどうか
    pub fn is_numeric(&self) -> bool {
        matches!(self.basic, BasicType::Float | BasicType::Int | BasicType::UInt)
    }

    /// bool系かどうか
    pub fn is_bool(&self) -> bool {
        self.basic == BasicType::Bool
    }

    /// サンプラーかどうか（配列を含む）
    pub fn is_sampler(&self) -> bool {
        matches!(self.basic, BasicType::Sampler(_))
    }

    /// 構造体かどうか
    pub fn is_struct(&self) -> bool {
        matches!(self.basic, BasicType::Struct(_))
    }

    /// 算術演算の対象になるスカラー・ベクトル・行列か
    pub fn is_arithmetic(&self) -> bool {
        !self.is_array() && self.is_numeric()
    }

    /// 非配列での成分数（スカラー1、ベクトルn、行列は列×行）
    pub fn component_count(&self) -> u32 {
        match self.shape {
            Shape::Scalar => 1,
            Shape::Vector(n) => n as u32,
            Shape::Matrix { cols, rows } => cols as u32 * rows as u32,
        }
    }

    /// ベクトルの成分数（スカラーは1）
    pub fn vector_size(&self) -> u8 {
        match self.shape {
            Shape::Scalar => 1,
            Shape::Vector(n) => n,
            Shape::Matrix { rows, .. } => rows,
        }
    }

    /// 配列要素の型
    pub fn element_type(&self) -> Type {
        Self {
            basic: self.basic.clone(),
            shape: self.shape,
            array: None,
        }
    }

    /// 添字アクセスの結果型
    ///
    /// 配列 → 要素、ベクトル → スカラー、行列 → 列ベクトル。
    pub fn index_result(&self) -> Option<Type> {
        if self.is_array() {
            return Some(self.element_type());
        }
        match self.shape {
            Shape::Scalar => None,
            Shape::Vector(_) => Some(Type::scalar(self.basic.clone())),
            Shape::Matrix { rows, .. } => Some(Type::vector(self.basic.clone(), rows)),
        }
    }

    /// 添字アクセスできる要素数
    pub fn index_bound(&self) -> Option<u32> {
        if let Some(size) = self.array {
            return Some(size);
        }
        match self.shape {
            Shape::Scalar => None,
            Shape::Vector(n) => Some(n as u32),
            Shape::Matrix { cols, .. } => Some(cols as u32),
        }
    }

    /// vec4スロット数（uniform・varying・attributeの容量計算用、構造体は0）
    pub fn vector_slots(&self) -> u64 {
        let per_element = match self.shape {
            Shape::Scalar | Shape::Vector(_) => 1,
            Shape::Matrix { cols, .. } => u64::from(cols),
        };
        per_element.saturating_mul(u64::from(self.array.unwrap_or(1)))
    }

    /// 型キーワードから型を取得
    pub fn from_keyword(word: &str) -> Option<Type> {
        let ty = match word {
            "void" => Type::void(),
            "float" => Type::float(),
            "int" => Type::int(),
            "uint" => Type::uint(),
            "bool" => Type::bool(),
            "vec2" => Type::vector(BasicType::Float, 2),
            "vec3" => Type::vector(BasicType::Float, 3),
            "vec4" => Type::vector(BasicType::Float, 4),
            "ivec2" => Type::vector(BasicType::Int, 2),
            "ivec3" => Type::vector(BasicType::Int, 3),
            "ivec4" => Type::vector(BasicType::Int, 4),
            "uvec2" => Type::vector(BasicType::UInt, 2),
            "uvec3" => Type::vector(BasicType::UInt, 3),
            "uvec4" => Type::vector(BasicType::UInt, 4),
            "bvec2" => Type::vector(BasicType::Bool, 2),
            "bvec3" => Type::vector(BasicType::Bool, 3),
            "bvec4" => Type::vector(BasicType::Bool, 4),
            "mat2" | "mat2x2" => Type::matrix(2, 2),
            "mat3" | "mat3x3" => Type::matrix(3, 3),
            "mat4" | "mat4x4" => Type::matrix(4, 4),
            "mat2x3" => Type::matrix(2, 3),
            "mat2x4" => Type::matrix(2, 4),
            "mat3x2" => Type::matrix(3, 2),
            "mat3x4" => Type::matrix(3, 4),
            "mat4x2" => Type::matrix(4, 2),
            "mat4x3" => Type::matrix(4, 3),
            _ => return Self::sampler_from_keyword(word),
        };
        Some(ty)
    }

    fn sampler_from_keyword(word: &str) -> Option<Type> {
        let (component, rest) = if let Some(rest) = word.strip_prefix("isampler") {
            (ScalarKind::Int, rest)
        } else if let Some(rest) = word.strip_prefix("usampler") {
            (ScalarKind::UInt, rest)
        } else if let Some(rest) = word.strip_prefix("sampler") {
            (ScalarKind::Float, rest)
        } else {
            return None;
        };
        let dim = SamplerDim::ALL.iter().copied().find(|dim| dim.suffix() == rest)?;
        // 整数サンプラーにはシャドウ・外部・矩形の形式がない
        if component != ScalarKind::Float
            && (dim.is_shadow() || matches!(dim, SamplerDim::External | SamplerDim::Rect))
        {
            return None;
        }
        Some(Type::sampler(dim, component))
    }

    /// 配列を除いたGLSLでの型名
    pub fn base_name(&self) -> String {
        let prefix = match self.basic {
            BasicType::Int => "i",
            BasicType::UInt => "u",
            BasicType::Bool => "b",
            _ => "",
        };
        match (&self.basic, self.shape) {
            (BasicType::Void, _) => "void".to_string(),
            (BasicType::Error, _) => "<error>".to_string(),
            (BasicType::Sampler(sampler), _) => sampler.name(),
            (BasicType::Struct(name), _) => name.clone(),
            (BasicType::Float, Shape::Scalar) => "float".to_string(),
            (BasicType::Int, Shape::Scalar) => "int".to_string(),
            (BasicType::UInt, Shape::Scalar) => "uint".to_string(),
            (BasicType::Bool, Shape::Scalar) => "bool".to_string(),
            (_, Shape::Vector(n)) => format!("{}vec{}", prefix, n),
            (_, Shape::Matrix { cols, rows }) if cols == rows => format!("mat{}", cols),
            (_, Shape::Matrix { cols, rows }) => format!("mat{}x{}", cols, rows),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.array {
            Some(size) => write!(f, "{}[{}]", self.base_name(), size),
            None => f.write_str(&self.base_name()),
        }
    }
}

/// 精度修飾子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Precision {
    /// lowp
    Low,
    /// mediump
    Medium,
    /// highp
    High,
}

impl Precision {
    /// キーワードから変換
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "lowp" => Some(Precision::Low),
            "mediump" => Some(Precision::Medium),
            "highp" => Some(Precision::High),
            _ => None,
        }
    }

    /// キーワード表記
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Low => "lowp",
            Precision::Medium => "mediump",
            Precision::High => "highp",
        }
    }
}
