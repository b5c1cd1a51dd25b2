//! # 組み込み関数・組み込み変数カタログ
//!
//! 組み込み関数は `"genType clamp(genType, float, float)"` のような汎用シグネチャで
//! 記述し、初回参照時に具体的な型の多重定義へ展開します。
//! 各多重定義は利用可能なバージョン範囲、シェーダステージ、必要な拡張機能、
//! テクセルオフセット引数の位置を保持します。
//!
//! 汎用型:
//! - `genType` / `genIType` / `genUType` / `genBType`: スカラーと2〜4成分ベクトル
//! - `vec` / `ivec` / `uvec` / `bvec`: 2〜4成分ベクトル
//! - `mat`: 正方行列（mat2〜mat4）
//! - `gvec4` / `gsampler*`: float・int・uint 系のサンプラーと戻り値

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::frontend::ast::{Constant, LanguageVersion, QualifierSet};
use crate::frontend::types::{BasicType, SamplerDim, ScalarKind, Type};
use crate::frontend::ShaderStage;
use crate::limits::{LimitKey, ResourceLimits};

use LanguageVersion::{Es100, Es300, Es310};

/// オフセット引数の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetKind {
    /// テクセルオフセット（`min/maxProgramTexelOffset`）
    Texel,
    /// ギャザーオフセット（`min/maxProgramTextureGatherOffset`）
    Gather,
}

/// 組み込み関数のパラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinParameter {
    /// 型
    pub ty: Type,
    /// `out` / `inout` パラメータか
    pub output: bool,
}

/// 組み込み関数の多重定義1つ
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinFunction {
    /// 関数名
    pub name: &'static str,
    /// 戻り値の型
    pub return_type: Type,
    /// パラメータ
    pub parameters: Vec<BuiltinParameter>,
    /// 利用可能になるバージョン
    pub since: LanguageVersion,
    /// 利用可能な最後のバージョン
    pub until: Option<LanguageVersion>,
    /// 利用可能なシェーダステージ
    pub stage: Option<ShaderStage>,
    /// 必要な拡張機能
    pub extension: Option<&'static str>,
    /// オフセット引数（位置と種類）
    pub offset: Option<(usize, OffsetKind)>,
}

impl BuiltinFunction {
    /// 指定バージョンで利用可能か
    pub fn available_in(&self, version: LanguageVersion) -> bool {
        version >= self.since && self.until.map_or(true, |until| version <= until)
    }

    /// 引数の型が完全に一致するか（暗黙の型変換なし）
    pub fn accepts(&self, args: &[Type]) -> bool {
        self.parameters.len() == args.len() && self.parameters.iter().zip(args).all(|(p, a)| p.ty == *a)
    }

    /// テクスチャ関数かどうか
    pub fn is_texture_function(&self) -> bool {
        self.parameters.first().map_or(false, |p| p.ty.is_sampler())
    }

    /// シグネチャの表記
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.parameters.iter().map(|p| p.ty.to_string()).collect();
        format!("{} {}({})", self.return_type, self.name, params.join(", "))
    }
}

/// シグネチャのグループ（共通の利用条件を持つ）
struct Group {
    since: LanguageVersion,
    until: Option<LanguageVersion>,
    stage: Option<ShaderStage>,
    extension: Option<&'static str>,
    offset: Option<OffsetKind>,
    signatures: &'static [&'static str],
}

impl Group {
    const fn since(since: LanguageVersion, signatures: &'static [&'static str]) -> Self {
        Self {
            since,
            until: None,
            stage: None,
            extension: None,
            offset: None,
            signatures,
        }
    }

    const fn until(mut self, until: LanguageVersion) -> Self {
        self.until = Some(until);
        self
    }

    const fn stage(mut self, stage: ShaderStage) -> Self {
        self.stage = Some(stage);
        self
    }

    const fn extension(mut self, extension: &'static str) -> Self {
        self.extension = Some(extension);
        self
    }

    const fn offset(mut self, offset: OffsetKind) -> Self {
        self.offset = Some(offset);
        self
    }
}

const GROUPS: &[Group] = &[
    // 角度・三角関数
    Group::since(Es100, &[
        "genType radians(genType)", "genType degrees(genType)", "genType sin(genType)",
        "genType cos(genType)", "genType tan(genType)", "genType asin(genType)",
        "genType acos(genType)", "genType atan(genType, genType)", "genType atan(genType)",
    ]),
    Group::since(Es300, &[
        "genType sinh(genType)", "genType cosh(genType)", "genType tanh(genType)",
        "genType asinh(genType)", "genType acosh(genType)", "genType atanh(genType)",
    ]),
    // 指数関数
    Group::since(Es100, &[
        "genType pow(genType, genType)", "genType exp(genType)", "genType log(genType)",
        "genType exp2(genType)", "genType log2(genType)", "genType sqrt(genType)",
        "genType inversesqrt(genType)",
    ]),
    // 共通関数
    Group::since(Es100, &[
        "genType abs(genType)", "genType sign(genType)", "genType floor(genType)",
        "genType ceil(genType)", "genType fract(genType)", "genType mod(genType, float)",
        "genType mod(genType, genType)", "genType min(genType, genType)", "genType min(genType, float)",
        "genType max(genType, genType)", "genType max(genType, float)",
        "genType clamp(genType, genType, genType)", "genType clamp(genType, float, float)",
        "genType mix(genType, genType, genType)", "genType mix(genType, genType, float)",
        "genType step(genType, genType)", "genType step(float, genType)",
        "genType smoothstep(genType, genType, genType)", "genType smoothstep(float, float, genType)",
    ]),
    Group::since(Es300, &[
        "genIType abs(genIType)", "genIType sign(genIType)", "genType trunc(genType)",
        "genType round(genType)", "genType roundEven(genType)", "genType modf(genType, out genType)",
        "genIType min(genIType, genIType)", "genIType min(genIType, int)",
        "genUType min(genUType, genUType)", "genUType min(genUType, uint)",
        "genIType max(genIType, genIType)", "genIType max(genIType, int)",
        "genUType max(genUType, genUType)", "genUType max(genUType, uint)",
        "genIType clamp(genIType, genIType, genIType)", "genIType clamp(genIType, int, int)",
        "genUType clamp(genUType, genUType, genUType)", "genUType clamp(genUType, uint, uint)",
        "genType mix(genType, genType, genBType)", "genBType isnan(genType)", "genBType isinf(genType)",
        "genIType floatBitsToInt(genType)", "genUType floatBitsToUint(genType)",
        "genType intBitsToFloat(genIType)", "genType uintBitsToFloat(genUType)",
    ]),
    Group::since(Es310, &[
        "genType frexp(genType, out genIType)", "genType ldexp(genType, genIType)",
        "genIType bitCount(genIType)", "genIType bitCount(genUType)",
        "genIType findLSB(genIType)", "genIType findLSB(genUType)",
        "genIType findMSB(genIType)", "genIType findMSB(genUType)",
        "genIType bitfieldReverse(genIType)", "genUType bitfieldReverse(genUType)",
    ]),
    // パッキング
    Group::since(Es300, &[
        "uint packSnorm2x16(vec2)", "vec2 unpackSnorm2x16(uint)", "uint packUnorm2x16(vec2)",
        "vec2 unpackUnorm2x16(uint)", "uint packHalf2x16(vec2)", "vec2 unpackHalf2x16(uint)",
    ]),
    Group::since(Es310, &[
        "uint packUnorm4x8(vec4)", "uint packSnorm4x8(vec4)", "vec4 unpackUnorm4x8(uint)",
        "vec4 unpackSnorm4x8(uint)",
    ]),
    // 幾何関数
    Group::since(Es100, &[
        "float length(genType)", "float distance(genType, genType)", "float dot(genType, genType)",
        "vec3 cross(vec3, vec3)", "genType normalize(genType)",
        "genType faceforward(genType, genType, genType)", "genType reflect(genType, genType)",
        "genType refract(genType, genType, float)",
    ]),
    // 行列関数
    Group::since(Es100, &["mat matrixCompMult(mat, mat)"]),
    Group::since(Es300, &[
        "mat2x3 matrixCompMult(mat2x3, mat2x3)", "mat3x2 matrixCompMult(mat3x2, mat3x2)",
        "mat2x4 matrixCompMult(mat2x4, mat2x4)", "mat4x2 matrixCompMult(mat4x2, mat4x2)",
        "mat3x4 matrixCompMult(mat3x4, mat3x4)", "mat4x3 matrixCompMult(mat4x3, mat4x3)",
        "mat2 outerProduct(vec2, vec2)", "mat3 outerProduct(vec3, vec3)", "mat4 outerProduct(vec4, vec4)",
        "mat2x3 outerProduct(vec3, vec2)", "mat3x2 outerProduct(vec2, vec3)",
        "mat2x4 outerProduct(vec4, vec2)", "mat4x2 outerProduct(vec2, vec4)",
        "mat3x4 outerProduct(vec4, vec3)", "mat4x3 outerProduct(vec3, vec4)",
        "mat transpose(mat)", "mat2x3 transpose(mat3x2)", "mat3x2 transpose(mat2x3)",
        "mat2x4 transpose(mat4x2)", "mat4x2 transpose(mat2x4)", "mat3x4 transpose(mat4x3)",
        "mat4x3 transpose(mat3x4)", "float determinant(mat)", "mat inverse(mat)",
    ]),
    // ベクトル比較関数
    Group::since(Es100, &[
        "bvec lessThan(vec, vec)", "bvec lessThan(ivec, ivec)",
        "bvec lessThanEqual(vec, vec)", "bvec lessThanEqual(ivec, ivec)",
        "bvec greaterThan(vec, vec)", "bvec greaterThan(ivec, ivec)",
        "bvec greaterThanEqual(vec, vec)", "bvec greaterThanEqual(ivec, ivec)",
        "bvec equal(vec, vec)", "bvec equal(ivec, ivec)", "bvec equal(bvec, bvec)",
        "bvec notEqual(vec, vec)", "bvec notEqual(ivec, ivec)", "bvec notEqual(bvec, bvec)",
        "bool any(bvec)", "bool all(bvec)", "bvec not(bvec)",
    ]),
    Group::since(Es300, &[
        "bvec lessThan(uvec, uvec)", "bvec lessThanEqual(uvec, uvec)", "bvec greaterThan(uvec, uvec)",
        "bvec greaterThanEqual(uvec, uvec)", "bvec equal(uvec, uvec)", "bvec notEqual(uvec, uvec)",
    ]),
    // 微分関数
    Group::since(Es100, &["genType dFdx(genType)", "genType dFdy(genType)", "genType fwidth(genType)"])
        .until(Es100)
        .stage(ShaderStage::Fragment)
        .extension("GL_OES_standard_derivatives"),
    Group::since(Es300, &["genType dFdx(genType)", "genType dFdy(genType)", "genType fwidth(genType)"])
        .stage(ShaderStage::Fragment),
    // ES 1.00 テクスチャ関数
    Group::since(Es100, &[
        "vec4 texture2D(sampler2D, vec2)", "vec4 texture2DProj(sampler2D, vec3)",
        "vec4 texture2DProj(sampler2D, vec4)", "vec4 textureCube(samplerCube, vec3)",
    ])
    .until(Es100),
    Group::since(Es100, &[
        "vec4 texture2D(sampler2D, vec2, float)", "vec4 texture2DProj(sampler2D, vec3, float)",
        "vec4 texture2DProj(sampler2D, vec4, float)", "vec4 textureCube(samplerCube, vec3, float)",
    ])
    .until(Es100)
    .stage(ShaderStage::Fragment),
    Group::since(Es100, &[
        "vec4 texture2DLod(sampler2D, vec2, float)", "vec4 texture2DProjLod(sampler2D, vec3, float)",
        "vec4 texture2DProjLod(sampler2D, vec4, float)", "vec4 textureCubeLod(samplerCube, vec3, float)",
    ])
    .until(Es100)
    .stage(ShaderStage::Vertex),
    Group::since(Es100, &[
        "vec4 texture2DLodEXT(sampler2D, vec2, float)", "vec4 texture2DProjLodEXT(sampler2D, vec3, float)",
        "vec4 texture2DProjLodEXT(sampler2D, vec4, float)", "vec4 textureCubeLodEXT(samplerCube, vec3, float)",
        "vec4 texture2DGradEXT(sampler2D, vec2, vec2, vec2)",
        "vec4 texture2DProjGradEXT(sampler2D, vec3, vec2, vec2)",
        "vec4 texture2DProjGradEXT(sampler2D, vec4, vec2, vec2)",
        "vec4 textureCubeGradEXT(samplerCube, vec3, vec3, vec3)",
    ])
    .until(Es100)
    .stage(ShaderStage::Fragment)
    .extension("GL_EXT_shader_texture_lod"),
    Group::since(Es100, &[
        "vec4 texture2D(samplerExternalOES, vec2)", "vec4 texture2DProj(samplerExternalOES, vec3)",
        "vec4 texture2DProj(samplerExternalOES, vec4)",
    ])
    .until(Es100)
    .extension("GL_OES_EGL_image_external"),
    Group::since(Es100, &[
        "vec4 texture2DRect(sampler2DRect, vec2)", "vec4 texture2DRectProj(sampler2DRect, vec3)",
        "vec4 texture2DRectProj(sampler2DRect, vec4)",
    ])
    .until(Es100)
    .extension("GL_ARB_texture_rectangle"),
    // ES 3.00 テクスチャ関数
    Group::since(Es300, &[
        "ivec2 textureSize(gsampler2D, int)", "ivec3 textureSize(gsampler3D, int)",
        "ivec2 textureSize(gsamplerCube, int)", "ivec2 textureSize(sampler2DShadow, int)",
        "ivec2 textureSize(samplerCubeShadow, int)", "ivec3 textureSize(gsampler2DArray, int)",
        "ivec3 textureSize(sampler2DArrayShadow, int)",
        "gvec4 texture(gsampler2D, vec2)", "gvec4 texture(gsampler3D, vec3)",
        "gvec4 texture(gsamplerCube, vec3)", "float texture(sampler2DShadow, vec3)",
        "float texture(samplerCubeShadow, vec4)", "gvec4 texture(gsampler2DArray, vec3)",
        "float texture(sampler2DArrayShadow, vec4)",
        "gvec4 textureProj(gsampler2D, vec3)", "gvec4 textureProj(gsampler2D, vec4)",
        "gvec4 textureProj(gsampler3D, vec4)", "float textureProj(sampler2DShadow, vec4)",
        "gvec4 textureLod(gsampler2D, vec2, float)", "gvec4 textureLod(gsampler3D, vec3, float)",
        "gvec4 textureLod(gsamplerCube, vec3, float)", "float textureLod(sampler2DShadow, vec3, float)",
        "gvec4 textureLod(gsampler2DArray, vec3, float)",
        "gvec4 textureProjLod(gsampler2D, vec3, float)", "gvec4 textureProjLod(gsampler2D, vec4, float)",
        "gvec4 textureProjLod(gsampler3D, vec4, float)", "float textureProjLod(sampler2DShadow, vec4, float)",
        "gvec4 texelFetch(gsampler2D, ivec2, int)", "gvec4 texelFetch(gsampler3D, ivec3, int)",
        "gvec4 texelFetch(gsampler2DArray, ivec3, int)",
        "gvec4 textureGrad(gsampler2D, vec2, vec2, vec2)", "gvec4 textureGrad(gsampler3D, vec3, vec3, vec3)",
        "gvec4 textureGrad(gsamplerCube, vec3, vec3, vec3)",
        "float textureGrad(sampler2DShadow, vec3, vec2, vec2)",
        "float textureGrad(samplerCubeShadow, vec4, vec3, vec3)",
        "gvec4 textureGrad(gsampler2DArray, vec3, vec2, vec2)",
        "float textureGrad(sampler2DArrayShadow, vec4, vec2, vec2)",
        "gvec4 textureProjGrad(gsampler2D, vec3, vec2, vec2)",
        "gvec4 textureProjGrad(gsampler2D, vec4, vec2, vec2)",
        "gvec4 textureProjGrad(gsampler3D, vec4, vec3, vec3)",
        "float textureProjGrad(sampler2DShadow, vec4, vec2, vec2)",
    ]),
    Group::since(Es300, &[
        "gvec4 texture(gsampler2D, vec2, float)", "gvec4 texture(gsampler3D, vec3, float)",
        "gvec4 texture(gsamplerCube, vec3, float)", "float texture(sampler2DShadow, vec3, float)",
        "float texture(samplerCubeShadow, vec4, float)", "gvec4 texture(gsampler2DArray, vec3, float)",
        "gvec4 textureProj(gsampler2D, vec3, float)", "gvec4 textureProj(gsampler2D, vec4, float)",
        "gvec4 textureProj(gsampler3D, vec4, float)", "float textureProj(sampler2DShadow, vec4, float)",
    ])
    .stage(ShaderStage::Fragment),
    Group::since(Es300, &[
        "gvec4 textureOffset(gsampler2D, vec2, ivec2)", "gvec4 textureOffset(gsampler3D, vec3, ivec3)",
        "float textureOffset(sampler2DShadow, vec3, ivec2)",
        "gvec4 textureOffset(gsampler2DArray, vec3, ivec2)",
        "gvec4 texelFetchOffset(gsampler2D, ivec2, int, ivec2)",
        "gvec4 texelFetchOffset(gsampler3D, ivec3, int, ivec3)",
        "gvec4 texelFetchOffset(gsampler2DArray, ivec3, int, ivec2)",
        "gvec4 textureProjOffset(gsampler2D, vec3, ivec2)", "gvec4 textureProjOffset(gsampler2D, vec4, ivec2)",
        "gvec4 textureProjOffset(gsampler3D, vec4, ivec3)",
        "float textureProjOffset(sampler2DShadow, vec4, ivec2)",
        "gvec4 textureLodOffset(gsampler2D, vec2, float, ivec2)",
        "gvec4 textureLodOffset(gsampler3D, vec3, float, ivec3)",
        "float textureLodOffset(sampler2DShadow, vec3, float, ivec2)",
        "gvec4 textureLodOffset(gsampler2DArray, vec3, float, ivec2)",
        "gvec4 textureProjLodOffset(gsampler2D, vec3, float, ivec2)",
        "gvec4 textureProjLodOffset(gsampler2D, vec4, float, ivec2)",
        "gvec4 textureProjLodOffset(gsampler3D, vec4, float, ivec3)",
        "float textureProjLodOffset(sampler2DShadow, vec4, float, ivec2)",
        "gvec4 textureGradOffset(gsampler2D, vec2, vec2, vec2, ivec2)",
        "gvec4 textureGradOffset(gsampler3D, vec3, vec3, vec3, ivec3)",
        "float textureGradOffset(sampler2DShadow, vec3, vec2, vec2, ivec2)",
        "gvec4 textureGradOffset(gsampler2DArray, vec3, vec2, vec2, ivec2)",
        "float textureGradOffset(sampler2DArrayShadow, vec4, vec2, vec2, ivec2)",
        "gvec4 textureProjGradOffset(gsampler2D, vec3, vec2, vec2, ivec2)",
        "gvec4 textureProjGradOffset(gsampler2D, vec4, vec2, vec2, ivec2)",
        "gvec4 textureProjGradOffset(gsampler3D, vec4, vec3, vec3, ivec3)",
        "float textureProjGradOffset(sampler2DShadow, vec4, vec2, vec2, ivec2)",
    ])
    .offset(OffsetKind::Texel),
    Group::since(Es300, &[
        "gvec4 textureOffset(gsampler2D, vec2, ivec2, float)",
        "gvec4 textureOffset(gsampler3D, vec3, ivec3, float)",
        "float textureOffset(sampler2DShadow, vec3, ivec2, float)",
        "gvec4 textureOffset(gsampler2DArray, vec3, ivec2, float)",
        "gvec4 textureProjOffset(gsampler2D, vec3, ivec2, float)",
        "gvec4 textureProjOffset(gsampler2D, vec4, ivec2, float)",
        "gvec4 textureProjOffset(gsampler3D, vec4, ivec3, float)",
        "float textureProjOffset(sampler2DShadow, vec4, ivec2, float)",
    ])
    .stage(ShaderStage::Fragment)
    .offset(OffsetKind::Texel),
    Group::since(Es300, &[
        "vec4 texture(samplerExternalOES, vec2)", "vec4 textureProj(samplerExternalOES, vec3)",
        "vec4 textureProj(samplerExternalOES, vec4)", "ivec2 textureSize(samplerExternalOES, int)",
        "vec4 texelFetch(samplerExternalOES, ivec2, int)",
    ])
    .extension("GL_OES_EGL_image_external_essl3"),
    // ES 3.10 テクスチャ関数
    Group::since(Es310, &[
        "ivec2 textureSize(gsampler2DMS)", "gvec4 texelFetch(gsampler2DMS, ivec2, int)",
        "gvec4 textureGather(gsampler2D, vec2)", "gvec4 textureGather(gsampler2D, vec2, int)",
        "gvec4 textureGather(gsampler2DArray, vec3)", "gvec4 textureGather(gsampler2DArray, vec3, int)",
        "gvec4 textureGather(gsamplerCube, vec3)", "gvec4 textureGather(gsamplerCube, vec3, int)",
        "vec4 textureGather(sampler2DShadow, vec2, float)",
        "vec4 textureGather(sampler2DArrayShadow, vec3, float)",
        "vec4 textureGather(samplerCubeShadow, vec3, float)",
    ]),
    Group::since(Es310, &[
        "gvec4 textureGatherOffset(gsampler2D, vec2, ivec2)",
        "gvec4 textureGatherOffset(gsampler2D, vec2, ivec2, int)",
        "gvec4 textureGatherOffset(gsampler2DArray, vec3, ivec2)",
        "gvec4 textureGatherOffset(gsampler2DArray, vec3, ivec2, int)",
        "vec4 textureGatherOffset(sampler2DShadow, vec2, float, ivec2)",
        "vec4 textureGatherOffset(sampler2DArrayShadow, vec3, float, ivec2)",
    ])
    .offset(OffsetKind::Gather),
    // 同期・アトミック
    Group::since(Es310, &["void barrier()"]).stage(ShaderStage::Compute),
    Group::since(Es310, &[
        "void memoryBarrier()", "void memoryBarrierShared()", "void memoryBarrierBuffer()",
        "void groupMemoryBarrier()",
        "uint atomicAdd(inout uint, uint)", "int atomicAdd(inout int, int)",
        "uint atomicMin(inout uint, uint)", "int atomicMin(inout int, int)",
        "uint atomicMax(inout uint, uint)", "int atomicMax(inout int, int)",
        "uint atomicAnd(inout uint, uint)", "int atomicAnd(inout int, int)",
        "uint atomicOr(inout uint, uint)", "int atomicOr(inout int, int)",
        "uint atomicXor(inout uint, uint)", "int atomicXor(inout int, int)",
        "uint atomicExchange(inout uint, uint)", "int atomicExchange(inout int, int)",
        "uint atomicCompSwap(inout uint, uint, uint)", "int atomicCompSwap(inout int, int, int)",
    ]),
];

/// 汎用型の展開インデックス
#[derive(Clone, Copy)]
struct Instance {
    gen: usize,
    vec: usize,
    mat: usize,
    sampler: usize,
}

const SAMPLER_KINDS: [ScalarKind; 3] = [ScalarKind::Float, ScalarKind::Int, ScalarKind::UInt];

/// 汎用型名を具体的な型へ置き換える
fn instantiate(word: &str, at: Instance) -> Option<Type> {
    let ty = match word {
        "genType" => Type::vector(BasicType::Float, at.gen as u8 + 1),
        "genIType" => Type::vector(BasicType::Int, at.gen as u8 + 1),
        "genUType" => Type::vector(BasicType::UInt, at.gen as u8 + 1),
        "genBType" => Type::vector(BasicType::Bool, at.gen as u8 + 1),
        "vec" => Type::vector(BasicType::Float, at.vec as u8 + 2),
        "ivec" => Type::vector(BasicType::Int, at.vec as u8 + 2),
        "uvec" => Type::vector(BasicType::UInt, at.vec as u8 + 2),
        "bvec" => Type::vector(BasicType::Bool, at.vec as u8 + 2),
        "mat" => Type::matrix(at.mat as u8 + 2, at.mat as u8 + 2),
        "gvec4" => Type::vector(BasicType::from_scalar(SAMPLER_KINDS[at.sampler]), 4),
        _ => {
            if let Some(rest) = word.strip_prefix("gsampler") {
                let sampler = Type::from_keyword(&format!("sampler{}", rest))?;
                let dim = match sampler.basic {
                    BasicType::Sampler(s) => s.dim,
                    _ => return None,
                };
                Type::sampler(dim, SAMPLER_KINDS[at.sampler])
            } else {
                Type::from_keyword(word)?
            }
        }
    };
    Some(ty)
}

/// シグネチャ文字列を多重定義の列に展開
fn expand(signature: &'static str, group: &Group) -> Vec<BuiltinFunction> {
    let (head, params) = match signature.split_once('(') {
        Some((head, rest)) => (head.trim(), rest.trim_end_matches(')').trim()),
        None => return Vec::new(),
    };
    let (ret, name) = match head.split_once(' ') {
        Some((ret, name)) => (ret, name.trim()),
        None => return Vec::new(),
    };
    let params: Vec<(bool, &str)> = if params.is_empty() {
        Vec::new()
    } else {
        params
            .split(',')
            .map(|p| {
                let p = p.trim();
                match p.strip_prefix("inout ").or_else(|| p.strip_prefix("out ")) {
                    Some(ty) => (true, ty.trim()),
                    None => (false, p),
                }
            })
            .collect()
    };

    let words: Vec<&str> = std::iter::once(ret).chain(params.iter().map(|(_, ty)| *ty)).collect();
    let has = |pred: &dyn Fn(&str) -> bool| words.iter().any(|w| pred(w));
    let gen_count = if has(&|w| w.starts_with("gen")) { 4 } else { 1 };
    let vec_count = if has(&|w| matches!(w, "vec" | "ivec" | "uvec" | "bvec")) { 3 } else { 1 };
    let mat_count = if has(&|w| w == "mat") { 3 } else { 1 };
    let sampler_count = if has(&|w| w == "gvec4" || w.starts_with("gsampler")) { 3 } else { 1 };

    let mut functions = Vec::new();
    for gen in 0..gen_count {
        for vec in 0..vec_count {
            for mat in 0..mat_count {
                for sampler in 0..sampler_count {
                    let at = Instance { gen, vec, mat, sampler };
                    let return_type = match instantiate(ret, at) {
                        Some(ty) => ty,
                        None => continue,
                    };
                    let parameters: Option<Vec<BuiltinParameter>> = params
                        .iter()
                        .map(|(output, word)| {
                            instantiate(word, at).map(|ty| BuiltinParameter { ty, output: *output })
                        })
                        .collect();
                    let parameters = match parameters {
                        Some(parameters) => parameters,
                        None => continue,
                    };
                    let offset = group.offset.and_then(|kind| {
                        parameters
                            .iter()
                            .rposition(|p| p.ty.is_integer() && p.ty.is_vector())
                            .filter(|&index| index >= 2)
                            .map(|index| (index, kind))
                    });
                    functions.push(BuiltinFunction {
                        name,
                        return_type,
                        parameters,
                        since: group.since,
                        until: group.until,
                        stage: group.stage,
                        extension: group.extension,
                        offset,
                    });
                }
            }
        }
    }
    functions
}

/// 展開済みのカタログ（関数名 → 多重定義）
fn catalogue() -> &'static HashMap<&'static str, Vec<BuiltinFunction>> {
    static CATALOGUE: OnceLock<HashMap<&'static str, Vec<BuiltinFunction>>> = OnceLock::new();
    CATALOGUE.get_or_init(|| {
        let mut map: HashMap<&'static str, Vec<BuiltinFunction>> = HashMap::new();
        for group in GROUPS {
            for signature in group.signatures {
                for function in expand(signature, group) {
                    map.entry(function.name).or_default().push(function);
                }
            }
        }
        map
    })
}

/// 組み込み関数名かどうか
pub fn is_builtin_function(name: &str) -> bool {
    catalogue().contains_key(name)
}

/// 関数名の全多重定義
pub fn overloads(name: &str) -> &'static [BuiltinFunction] {
    catalogue().get(name).map(Vec::as_slice).unwrap_or(&[])
}

/// 引数の型が完全一致する多重定義（バージョン・ステージを問わない）
pub fn matching(name: &str, args: &[Type]) -> Vec<&'static BuiltinFunction> {
    overloads(name).iter().filter(|f| f.accepts(args)).collect()
}

/// 組み込み変数
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinVariable {
    /// 名前
    pub name: &'static str,
    /// 型
    pub ty: Type,
    /// 記憶域の修飾子
    pub qualifiers: QualifierSet,
    /// 書き込み可能か
    pub writable: bool,
    /// 利用可能なシェーダステージ
    pub stage: Option<ShaderStage>,
    /// 利用可能になるバージョン
    pub since: LanguageVersion,
    /// 利用可能な最後のバージョン
    pub until: Option<LanguageVersion>,
    /// 必要な拡張機能
    pub extension: Option<&'static str>,
    /// 定数値（`gl_Max*`）
    pub value: Option<Constant>,
}

impl BuiltinVariable {
    fn new(name: &'static str, ty: Type, qualifiers: QualifierSet, writable: bool) -> Self {
        Self {
            name,
            ty,
            qualifiers,
            writable,
            stage: None,
            since: Es100,
            until: None,
            extension: None,
            value: None,
        }
    }

    fn input(name: &'static str, ty: Type, stage: ShaderStage) -> Self {
        Self::new(name, ty, QualifierSet::INPUT, false).in_stage(stage)
    }

    fn output(name: &'static str, ty: Type, stage: ShaderStage) -> Self {
        Self::new(name, ty, QualifierSet::OUTPUT, true).in_stage(stage)
    }

    fn in_stage(mut self, stage: ShaderStage) -> Self {
        self.stage = Some(stage);
        self
    }

    fn versions(mut self, since: LanguageVersion, until: Option<LanguageVersion>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    fn requires(mut self, extension: &'static str) -> Self {
        self.extension = Some(extension);
        self
    }

    /// 指定バージョンで利用可能か
    pub fn available_in(&self, version: LanguageVersion) -> bool {
        version >= self.since && self.until.map_or(true, |until| version <= until)
    }
}

/// `gl_Max*` 定数と対応するリソース制限
const LIMIT_CONSTANTS: &[(&str, LimitKey, LanguageVersion)] = &[
    ("gl_MaxVertexAttribs", LimitKey::MaxVertexAttribs, Es100),
    ("gl_MaxVertexUniformVectors", LimitKey::MaxVertexUniformVectors, Es100),
    ("gl_MaxVaryingVectors", LimitKey::MaxVaryingVectors, Es100),
    ("gl_MaxVertexTextureImageUnits", LimitKey::MaxVertexTextureImageUnits, Es100),
    ("gl_MaxCombinedTextureImageUnits", LimitKey::MaxCombinedTextureImageUnits, Es100),
    ("gl_MaxTextureImageUnits", LimitKey::MaxTextureImageUnits, Es100),
    ("gl_MaxFragmentUniformVectors", LimitKey::MaxFragmentUniformVectors, Es100),
    ("gl_MaxDrawBuffers", LimitKey::MaxDrawBuffers, Es100),
    ("gl_MaxVertexOutputVectors", LimitKey::MaxVertexOutputVectors, Es300),
    ("gl_MaxFragmentInputVectors", LimitKey::MaxFragmentInputVectors, Es300),
    ("gl_MinProgramTexelOffset", LimitKey::MinProgramTexelOffset, Es300),
    ("gl_MaxProgramTexelOffset", LimitKey::MaxProgramTexelOffset, Es300),
    ("gl_MaxComputeUniformComponents", LimitKey::MaxComputeUniformComponents, Es310),
    ("gl_MaxComputeTextureImageUnits", LimitKey::MaxComputeTextureImageUnits, Es310),
    ("gl_MaxComputeImageUniforms", LimitKey::MaxComputeImageUniforms, Es310),
    ("gl_MaxComputeAtomicCounters", LimitKey::MaxComputeAtomicCounters, Es310),
    ("gl_MaxComputeAtomicCounterBuffers", LimitKey::MaxComputeAtomicCounterBuffers, Es310),
    ("gl_MaxImageUnits", LimitKey::MaxImageUnits, Es310),
    ("gl_MaxVertexImageUniforms", LimitKey::MaxVertexImageUniforms, Es310),
    ("gl_MaxFragmentImageUniforms", LimitKey::MaxFragmentImageUniforms, Es310),
    ("gl_MaxCombinedImageUniforms", LimitKey::MaxCombinedImageUniforms, Es310),
    ("gl_MaxCombinedShaderOutputResources", LimitKey::MaxCombinedShaderOutputResources, Es310),
    ("gl_MaxVertexAtomicCounters", LimitKey::MaxVertexAtomicCounters, Es310),
    ("gl_MaxFragmentAtomicCounters", LimitKey::MaxFragmentAtomicCounters, Es310),
    ("gl_MaxCombinedAtomicCounters", LimitKey::MaxCombinedAtomicCounters, Es310),
    ("gl_MaxAtomicCounterBindings", LimitKey::MaxAtomicCounterBindings, Es310),
    ("gl_MaxVertexAtomicCounterBuffers", LimitKey::MaxVertexAtomicCounterBuffers, Es310),
    ("gl_MaxFragmentAtomicCounterBuffers", LimitKey::MaxFragmentAtomicCounterBuffers, Es310),
    ("gl_MaxCombinedAtomicCounterBuffers", LimitKey::MaxCombinedAtomicCounterBuffers, Es310),
    ("gl_MaxAtomicCounterBufferSize", LimitKey::MaxAtomicCounterBufferSize, Es310),
];

/// 組み込み変数の一覧（配列サイズと定数値はリソース制限から決まる）
pub fn variables(limits: &ResourceLimits) -> Vec<BuiltinVariable> {
    use ShaderStage::{Compute, Fragment, Vertex};

    let float = Type::float;
    let vec = |n| Type::vector(BasicType::Float, n);
    let uvec3 = Type::vector(BasicType::UInt, 3);
    let draw_buffers = limits.max_draw_buffers().max(1) as u32;

    let mut vars = vec![
        BuiltinVariable::output("gl_Position", vec(4), Vertex),
        BuiltinVariable::output("gl_PointSize", float(), Vertex),
        BuiltinVariable::input("gl_VertexID", Type::int(), Vertex).versions(Es300, None),
        BuiltinVariable::input("gl_InstanceID", Type::int(), Vertex).versions(Es300, None),
        BuiltinVariable::input("gl_FragCoord", vec(4), Fragment),
        BuiltinVariable::input("gl_FrontFacing", Type::bool(), Fragment),
        BuiltinVariable::input("gl_PointCoord", vec(2), Fragment),
        BuiltinVariable::output("gl_FragColor", vec(4), Fragment).versions(Es100, Some(Es100)),
        BuiltinVariable::output("gl_FragData", vec(4).with_array(Some(draw_buffers)), Fragment)
            .versions(Es100, Some(Es100)),
        BuiltinVariable::output("gl_FragDepthEXT", float(), Fragment)
            .versions(Es100, Some(Es100))
            .requires("GL_EXT_frag_depth"),
        BuiltinVariable::output("gl_FragDepth", float(), Fragment).versions(Es300, None),
        BuiltinVariable::output("gl_SecondaryFragColorEXT", vec(4), Fragment)
            .versions(Es100, Some(Es100))
            .requires("GL_EXT_blend_func_extended"),
        BuiltinVariable::input("gl_LastFragData", vec(4).with_array(Some(draw_buffers)), Fragment)
            .versions(Es100, Some(Es100))
            .requires("GL_EXT_shader_framebuffer_fetch"),
        BuiltinVariable::new("gl_ViewID_OVR", Type::uint(), QualifierSet::INPUT, false)
            .versions(Es300, None)
            .requires("GL_OVR_multiview"),
        BuiltinVariable::input("gl_NumWorkGroups", uvec3.clone(), Compute).versions(Es310, None),
        BuiltinVariable::new("gl_WorkGroupSize", uvec3.clone(), QualifierSet::CONST, false)
            .in_stage(Compute)
            .versions(Es310, None),
        BuiltinVariable::input("gl_WorkGroupID", uvec3.clone(), Compute).versions(Es310, None),
        BuiltinVariable::input("gl_LocalInvocationID", uvec3.clone(), Compute).versions(Es310, None),
        BuiltinVariable::input("gl_GlobalInvocationID", uvec3, Compute).versions(Es310, None),
        BuiltinVariable::input("gl_LocalInvocationIndex", Type::uint(), Compute).versions(Es310, None),
    ];

    for (name, key, since) in LIMIT_CONSTANTS {
        let mut constant = BuiltinVariable::new(name, Type::int(), QualifierSet::CONST, false).versions(*since, None);
        constant.value = Some(Constant::Int(limits.int(*key) as i32));
        vars.push(constant);
    }
    let mut dual_source = BuiltinVariable::new("gl_MaxDualSourceDrawBuffersEXT", Type::int(), QualifierSet::CONST, false)
        .requires("GL_EXT_blend_func_extended");
    dual_source.value = Some(Constant::Int(limits.max_dual_source_draw_buffers() as i32));
    vars.push(dual_source);

    vars
}

/// サンプラー型が拡張機能を必要とする場合、その名前とコアになるバージョン
pub fn sampler_extension(ty: &Type) -> Option<(&'static str, Option<LanguageVersion>)> {
    match ty.basic {
        BasicType::Sampler(sampler) => match sampler.dim {
            SamplerDim::External => Some(("GL_OES_EGL_image_external", None)),
            SamplerDim::Rect => Some(("GL_ARB_texture_rectangle", None)),
            SamplerDim::D2Ms => Some(("GL_ANGLE_texture_multisample", Some(Es310))),
            SamplerDim::CubeArray => Some(("GL_OES_texture_cube_map_array", None)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_expansion() {
        let clamp = overloads("clamp");
        assert!(clamp.iter().any(|f| f.accepts(&[Type::vector(BasicType::Float, 3), Type::float(), Type::float()])));
        assert!(clamp.iter().any(|f| f.accepts(&[Type::int(), Type::int(), Type::int()])));
        assert!(!clamp.iter().any(|f| f.accepts(&[Type::float(), Type::int(), Type::int()])));
    }

    #[test]
    fn test_sampler_families() {
        let isampler = Type::sampler(SamplerDim::D2, ScalarKind::Int);
        let found = matching("texture", &[isampler, Type::vector(BasicType::Float, 2)]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].return_type, Type::vector(BasicType::Int, 4));
    }

    #[test]
    fn test_version_and_stage_metadata() {
        let derivative = overloads("dFdx");
        assert!(derivative.iter().all(|f| f.stage == Some(ShaderStage::Fragment)));
        assert!(derivative.iter().any(|f| f.extension == Some("GL_OES_standard_derivatives")));
        let texture2d = matching("texture2D", &[Type::sampler(SamplerDim::D2, ScalarKind::Float), Type::vector(BasicType::Float, 2)]);
        assert!(texture2d[0].available_in(Es100));
        assert!(!texture2d[0].available_in(Es300));
    }

    #[test]
    fn test_offset_argument_position() {
        let offset = overloads("texelFetchOffset");
        assert!(offset.iter().all(|f| f.offset.map(|(index, _)| index) == Some(3)));
        let gather = overloads("textureGatherOffset");
        assert!(gather.iter().all(|f| matches!(f.offset, Some((_, OffsetKind::Gather)))));
        assert!(overloads("texture").iter().all(|f| f.offset.is_none()));
    }

    #[test]
    fn test_transpose_non_square() {
        let found = matching("transpose", &[Type::matrix(2, 3)]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].return_type, Type::matrix(3, 2));
    }

    #[test]
    fn test_limit_constants() {
        let limits = ResourceLimits::default();
        let vars = variables(&limits);
        let draw = vars.iter().find(|v| v.name == "gl_MaxDrawBuffers").unwrap();
        assert_eq!(draw.value, Some(Constant::Int(limits.max_draw_buffers() as i32)));
        let frag_data = vars.iter().find(|v| v.name == "gl_FragData").unwrap();
        assert_eq!(frag_data.ty.array, Some(limits.max_draw_buffers() as u32));
    }
}
