//! # リソース制限テーブル
//!
//! ターゲットプラットフォームが課す数値上限と真偽フラグ（拡張機能のサポート有無や
//! ループ・インデックスの許可）を、名前付きの不変レコードとして表現します。
//!
//! テーブルは [`resource_limits!`] マクロで一元定義され、各制限ごとに
//! 型付きフィールド、[`LimitKey`] のバリアント、外部表現の名前が生成されます。
//! 構築後は変更できず、並行するコンパイル間で `Arc` 越しに共有されます。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// リソース制限の値（外部表現）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LimitValue {
    /// 真偽フラグ
    Bool(bool),
    /// 整数値
    Int(i64),
    /// 浮動小数点値
    Float(f64),
}

impl fmt::Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitValue::Bool(value) => write!(f, "{}", value),
            LimitValue::Int(value) => write!(f, "{}", value),
            LimitValue::Float(value) => write!(f, "{}", value),
        }
    }
}

/// 部分的な上書き指定（制限名 → 値）
pub type LimitOverrides = BTreeMap<String, LimitValue>;

/// テーブルのフィールドとして格納できる値の種類
pub trait LimitField: Copy {
    /// エラーメッセージ用の種類名
    const KIND: &'static str;

    /// 外部表現へ変換
    fn to_value(self) -> LimitValue;

    /// 外部表現から変換（種類が合わなければ `None`）
    fn from_value(value: &LimitValue) -> Option<Self>;
}

impl LimitField for i64 {
    const KIND: &'static str = "整数";

    fn to_value(self) -> LimitValue {
        LimitValue::Int(self)
    }

    fn from_value(value: &LimitValue) -> Option<Self> {
        match value {
            LimitValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl LimitField for f64 {
    const KIND: &'static str = "数値";

    fn to_value(self) -> LimitValue {
        LimitValue::Float(self)
    }

    fn from_value(value: &LimitValue) -> Option<Self> {
        match value {
            LimitValue::Float(v) => Some(*v),
            LimitValue::Int(v) => Some(*v as f64),
            LimitValue::Bool(_) => None,
        }
    }
}

impl LimitField for bool {
    const KIND: &'static str = "真偽値または0/1";

    fn to_value(self) -> LimitValue {
        LimitValue::Bool(self)
    }

    fn from_value(value: &LimitValue) -> Option<Self> {
        match value {
            LimitValue::Bool(v) => Some(*v),
            LimitValue::Int(0) => Some(false),
            LimitValue::Int(1) => Some(true),
            _ => None,
        }
    }
}

macro_rules! resource_limits {
    ($( $key:ident / $field:ident : $ty:ty = $default:expr, $name:literal; )*) => {
        /// リソース制限のキー
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum LimitKey {
            $( #[doc = $name] $key, )*
        }

        impl LimitKey {
            /// 宣言順の全キー
            pub const ALL: &'static [LimitKey] = &[ $( LimitKey::$key, )* ];

            /// 外部表現での名前
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( LimitKey::$key => $name, )*
                }
            }

            /// 名前からキーを引く
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $name => Some(LimitKey::$key), )*
                    _ => None,
                }
            }
        }

        /// リソース制限テーブル
        ///
        /// フィールドは非公開で、構築後に変更する手段はありません。
        #[derive(Debug, Clone, PartialEq)]
        pub struct ResourceLimits {
            $( $field: $ty, )*
        }

        impl Default for ResourceLimits {
            /// 対応する全言語バージョンを網羅する既定プロファイル
            fn default() -> Self {
                Self {
                    $( $field: $default, )*
                }
            }
        }

        impl ResourceLimits {
            $(
                #[doc = concat!("`", $name, "` の値")]
                pub fn $field(&self) -> $ty {
                    self.$field
                }
            )*

            /// キーに対応する値を取得
            pub fn value(&self, key: LimitKey) -> LimitValue {
                match key {
                    $( LimitKey::$key => LimitField::to_value(self.$field), )*
                }
            }

            fn assign(&mut self, key: LimitKey, value: &LimitValue) -> Result<()> {
                match key {
                    $(
                        LimitKey::$key => {
                            self.$field = <$ty as LimitField>::from_value(value).ok_or_else(|| {
                                ConfigError::InvalidLimitValue {
                                    name: $name.to_string(),
                                    expected: <$ty as LimitField>::KIND,
                                    found: value.to_string(),
                                }
                            })?;
                        }
                    )*
                }
                Ok(())
            }
        }
    };
}

resource_limits! {
    MaxLights / max_lights: i64 = 32, "maxLights";
    MaxClipPlanes / max_clip_planes: i64 = 6, "maxClipPlanes";
    MaxTextureUnits / max_texture_units: i64 = 32, "maxTextureUnits";
    MaxTextureCoords / max_texture_coords: i64 = 32, "maxTextureCoords";
    MaxVertexAttribs / max_vertex_attribs: i64 = 64, "maxVertexAttribs";
    MaxVertexUniformComponents / max_vertex_uniform_components: i64 = 4096, "maxVertexUniformComponents";
    MaxVaryingFloats / max_varying_floats: i64 = 64, "maxVaryingFloats";
    MaxVertexTextureImageUnits / max_vertex_texture_image_units: i64 = 32, "maxVertexTextureImageUnits";
    MaxCombinedTextureImageUnits / max_combined_texture_image_units: i64 = 80, "maxCombinedTextureImageUnits";
    MaxTextureImageUnits / max_texture_image_units: i64 = 32, "maxTextureImageUnits";
    MaxFragmentUniformComponents / max_fragment_uniform_components: i64 = 4096, "maxFragmentUniformComponents";
    MaxDrawBuffers / max_draw_buffers: i64 = 64, "maxDrawBuffers";
    MaxVertexUniformVectors / max_vertex_uniform_vectors: i64 = 1024, "maxVertexUniformVectors";
    MaxVaryingVectors / max_varying_vectors: i64 = 8, "maxVaryingVectors";
    MaxFragmentUniformVectors / max_fragment_uniform_vectors: i64 = 1024, "maxFragmentUniformVectors";
    MaxVertexOutputVectors / max_vertex_output_vectors: i64 = 64, "maxVertexOutputVectors";
    MaxFragmentInputVectors / max_fragment_input_vectors: i64 = 64, "maxFragmentInputVectors";
    MinProgramTexelOffset / min_program_texel_offset: i64 = -8, "minProgramTexelOffset";
    MaxProgramTexelOffset / max_program_texel_offset: i64 = 7, "maxProgramTexelOffset";
    MaxClipDistances / max_clip_distances: i64 = 8, "maxClipDistances";
    MaxComputeWorkGroupCountX / max_compute_work_group_count_x: i64 = 65535, "maxComputeWorkGroupCountX";
    MaxComputeWorkGroupCountY / max_compute_work_group_count_y: i64 = 65535, "maxComputeWorkGroupCountY";
    MaxComputeWorkGroupCountZ / max_compute_work_group_count_z: i64 = 65535, "maxComputeWorkGroupCountZ";
    MaxComputeWorkGroupSizeX / max_compute_work_group_size_x: i64 = 1024, "maxComputeWorkGroupSizeX";
    MaxComputeWorkGroupSizeY / max_compute_work_group_size_y: i64 = 1024, "maxComputeWorkGroupSizeY";
    MaxComputeWorkGroupSizeZ / max_compute_work_group_size_z: i64 = 64, "maxComputeWorkGroupSizeZ";
    MaxComputeUniformComponents / max_compute_uniform_components: i64 = 1024, "maxComputeUniformComponents";
    MaxComputeTextureImageUnits / max_compute_texture_image_units: i64 = 16, "maxComputeTextureImageUnits";
    MaxComputeImageUniforms / max_compute_image_uniforms: i64 = 8, "maxComputeImageUniforms";
    MaxComputeAtomicCounters / max_compute_atomic_counters: i64 = 8, "maxComputeAtomicCounters";
    MaxComputeAtomicCounterBuffers / max_compute_atomic_counter_buffers: i64 = 1, "maxComputeAtomicCounterBuffers";
    MaxVaryingComponents / max_varying_components: i64 = 60, "maxVaryingComponents";
    MaxVertexOutputComponents / max_vertex_output_components: i64 = 64, "maxVertexOutputComponents";
    MaxGeometryInputComponents / max_geometry_input_components: i64 = 64, "maxGeometryInputComponents";
    MaxGeometryOutputComponents / max_geometry_output_components: i64 = 128, "maxGeometryOutputComponents";
    MaxFragmentInputComponents / max_fragment_input_components: i64 = 128, "maxFragmentInputComponents";
    MaxImageUnits / max_image_units: i64 = 8, "maxImageUnits";
    MaxCombinedImageUnitsAndFragmentOutputs / max_combined_image_units_and_fragment_outputs: i64 = 8, "maxCombinedImageUnitsAndFragmentOutputs";
    MaxCombinedShaderOutputResources / max_combined_shader_output_resources: i64 = 8, "maxCombinedShaderOutputResources";
    MaxImageSamples / max_image_samples: i64 = 0, "maxImageSamples";
    MaxVertexImageUniforms / max_vertex_image_uniforms: i64 = 0, "maxVertexImageUniforms";
    MaxTessControlImageUniforms / max_tess_control_image_uniforms: i64 = 0, "maxTessControlImageUniforms";
    MaxTessEvaluationImageUniforms / max_tess_evaluation_image_uniforms: i64 = 0, "maxTessEvaluationImageUniforms";
    MaxGeometryImageUniforms / max_geometry_image_uniforms: i64 = 0, "maxGeometryImageUniforms";
    MaxFragmentImageUniforms / max_fragment_image_uniforms: i64 = 8, "maxFragmentImageUniforms";
    MaxCombinedImageUniforms / max_combined_image_uniforms: i64 = 8, "maxCombinedImageUniforms";
    MaxGeometryTextureImageUnits / max_geometry_texture_image_units: i64 = 16, "maxGeometryTextureImageUnits";
    MaxGeometryOutputVertices / max_geometry_output_vertices: i64 = 256, "maxGeometryOutputVertices";
    MaxGeometryTotalOutputComponents / max_geometry_total_output_components: i64 = 1024, "maxGeometryTotalOutputComponents";
    MaxGeometryUniformComponents / max_geometry_uniform_components: i64 = 1024, "maxGeometryUniformComponents";
    MaxGeometryVaryingComponents / max_geometry_varying_components: i64 = 64, "maxGeometryVaryingComponents";
    MaxTessControlInputComponents / max_tess_control_input_components: i64 = 128, "maxTessControlInputComponents";
    MaxTessControlOutputComponents / max_tess_control_output_components: i64 = 128, "maxTessControlOutputComponents";
    MaxTessControlTextureImageUnits / max_tess_control_texture_image_units: i64 = 16, "maxTessControlTextureImageUnits";
    MaxTessControlUniformComponents / max_tess_control_uniform_components: i64 = 1024, "maxTessControlUniformComponents";
    MaxTessControlTotalOutputComponents / max_tess_control_total_output_components: i64 = 4096, "maxTessControlTotalOutputComponents";
    MaxTessEvaluationInputComponents / max_tess_evaluation_input_components: i64 = 128, "maxTessEvaluationInputComponents";
    MaxTessEvaluationOutputComponents / max_tess_evaluation_output_components: i64 = 128, "maxTessEvaluationOutputComponents";
    MaxTessEvaluationTextureImageUnits / max_tess_evaluation_texture_image_units: i64 = 16, "maxTessEvaluationTextureImageUnits";
    MaxTessEvaluationUniformComponents / max_tess_evaluation_uniform_components: i64 = 1024, "maxTessEvaluationUniformComponents";
    MaxTessPatchComponents / max_tess_patch_components: i64 = 120, "maxTessPatchComponents";
    MaxPatchVertices / max_patch_vertices: i64 = 32, "maxPatchVertices";
    MaxTessGenLevel / max_tess_gen_level: i64 = 64, "maxTessGenLevel";
    MaxViewports / max_viewports: i64 = 16, "maxViewports";
    MaxVertexAtomicCounters / max_vertex_atomic_counters: i64 = 0, "maxVertexAtomicCounters";
    MaxTessControlAtomicCounters / max_tess_control_atomic_counters: i64 = 0, "maxTessControlAtomicCounters";
    MaxTessEvaluationAtomicCounters / max_tess_evaluation_atomic_counters: i64 = 0, "maxTessEvaluationAtomicCounters";
    MaxGeometryAtomicCounters / max_geometry_atomic_counters: i64 = 0, "maxGeometryAtomicCounters";
    MaxFragmentAtomicCounters / max_fragment_atomic_counters: i64 = 8, "maxFragmentAtomicCounters";
    MaxCombinedAtomicCounters / max_combined_atomic_counters: i64 = 8, "maxCombinedAtomicCounters";
    MaxAtomicCounterBindings / max_atomic_counter_bindings: i64 = 128, "maxAtomicCounterBindings";
    MaxVertexAtomicCounterBuffers / max_vertex_atomic_counter_buffers: i64 = 128, "maxVertexAtomicCounterBuffers";
    MaxTessControlAtomicCounterBuffers / max_tess_control_atomic_counter_buffers: i64 = 0, "maxTessControlAtomicCounterBuffers";
    MaxTessEvaluationAtomicCounterBuffers / max_tess_evaluation_atomic_counter_buffers: i64 = 0, "maxTessEvaluationAtomicCounterBuffers";
    MaxGeometryAtomicCounterBuffers / max_geometry_atomic_counter_buffers: i64 = 0, "maxGeometryAtomicCounterBuffers";
    MaxFragmentAtomicCounterBuffers / max_fragment_atomic_counter_buffers: i64 = 1, "maxFragmentAtomicCounterBuffers";
    MaxCombinedAtomicCounterBuffers / max_combined_atomic_counter_buffers: i64 = 1, "maxCombinedAtomicCounterBuffers";
    MaxAtomicCounterBufferSize / max_atomic_counter_buffer_size: i64 = 16384, "maxAtomicCounterBufferSize";
    MaxTransformFeedbackBuffers / max_transform_feedback_buffers: i64 = 4, "maxTransformFeedbackBuffers";
    MaxTransformFeedbackInterleavedComponents / max_transform_feedback_interleaved_components: i64 = 64, "maxTransformFeedbackInterleavedComponents";
    MaxCullDistances / max_cull_distances: i64 = 8, "maxCullDistances";
    MaxCombinedClipAndCullDistances / max_combined_clip_and_cull_distances: i64 = 8, "maxCombinedClipAndCullDistances";
    MaxSamples / max_samples: i64 = 4, "maxSamples";
    MaxMeshOutputVerticesNv / max_mesh_output_vertices_nv: i64 = 256, "maxMeshOutputVerticesNV";
    MaxMeshOutputPrimitivesNv / max_mesh_output_primitives_nv: i64 = 512, "maxMeshOutputPrimitivesNV";
    MaxMeshWorkGroupSizeXNv / max_mesh_work_group_size_x_nv: i64 = 32, "maxMeshWorkGroupSizeX_NV";
    MaxMeshWorkGroupSizeYNv / max_mesh_work_group_size_y_nv: i64 = 1, "maxMeshWorkGroupSizeY_NV";
    MaxMeshWorkGroupSizeZNv / max_mesh_work_group_size_z_nv: i64 = 1, "maxMeshWorkGroupSizeZ_NV";
    MaxTaskWorkGroupSizeXNv / max_task_work_group_size_x_nv: i64 = 32, "maxTaskWorkGroupSizeX_NV";
    MaxTaskWorkGroupSizeYNv / max_task_work_group_size_y_nv: i64 = 1, "maxTaskWorkGroupSizeY_NV";
    MaxTaskWorkGroupSizeZNv / max_task_work_group_size_z_nv: i64 = 1, "maxTaskWorkGroupSizeZ_NV";
    MaxMeshViewCountNv / max_mesh_view_count_nv: i64 = 4, "maxMeshViewCountNV";

    // ループとインデックスの制限（0/1でも指定可能）
    NonInductiveForLoops / non_inductive_for_loops: bool = true, "limits_nonInductiveForLoops";
    WhileLoops / while_loops: bool = true, "limits_whileLoops";
    DoWhileLoops / do_while_loops: bool = true, "limits_doWhileLoops";
    GeneralUniformIndexing / general_uniform_indexing: bool = true, "limits_generalUniformIndexing";
    GeneralAttributeMatrixVectorIndexing / general_attribute_matrix_vector_indexing: bool = true, "limits_generalAttributeMatrixVectorIndexing";
    GeneralVaryingIndexing / general_varying_indexing: bool = true, "limits_generalVaryingIndexing";
    GeneralSamplerIndexing / general_sampler_indexing: bool = true, "limits_generalSamplerIndexing";
    GeneralVariableIndexing / general_variable_indexing: bool = true, "limits_generalVariableIndexing";
    GeneralConstantMatrixVectorIndexing / general_constant_matrix_vector_indexing: bool = true, "limits_generalConstantMatrixVectorIndexing";

    // ANGLE固有の制限
    MaxDualSourceDrawBuffers / max_dual_source_draw_buffers: i64 = 8, "maxDualSourceDrawBuffers";
    MaxViewsOvr / max_views_ovr: i64 = 8, "maxViewsOVR";
    MinProgramTextureGatherOffset / min_program_texture_gather_offset: i64 = -16, "minProgramTextureGatherOffset";
    MaxProgramTextureGatherOffset / max_program_texture_gather_offset: i64 = 15, "maxProgramTextureGatherOffset";
    MaxUniformLocations / max_uniform_locations: i64 = 16384, "maxUniformLocations";
    MaxUniformBufferBindings / max_uniform_buffer_bindings: i64 = 128, "maxUniformBufferBindings";
    MaxShaderStorageBufferBindings / max_shader_storage_buffer_bindings: i64 = 32, "maxShaderStorageBufferBindings";
    MaxGeometryUniformBlocks / max_geometry_uniform_blocks: i64 = 64, "maxGeometryUniformBlocks";
    MaxGeometryShaderStorageBlocks / max_geometry_shader_storage_blocks: i64 = 32, "maxGeometryShaderStorageBlocks";
    MaxGeometryShaderInvocations / max_geometry_shader_invocations: i64 = 256, "maxGeometryShaderInvocations";
    SubPixelBits / sub_pixel_bits: i64 = 8, "subPixelBits";
    MaxPointSize / max_point_size: f64 = 4999.5, "maxPointSize";

    // フロントエンド固有の制限
    FragmentPrecisionHigh / fragment_precision_high: bool = true, "fragmentPrecisionHigh";
    MaxExpressionComplexity / max_expression_complexity: i64 = 256, "maxExpressionComplexity";
    MaxCallStackDepth / max_call_stack_depth: i64 = 256, "maxCallStackDepth";
    MaxFunctionParameters / max_function_parameters: i64 = 1024, "maxFunctionParameters";
    MaxVertexUniformBlocks / max_vertex_uniform_blocks: i64 = 12, "maxVertexUniformBlocks";
    MaxFragmentUniformBlocks / max_fragment_uniform_blocks: i64 = 12, "maxFragmentUniformBlocks";
    MaxComputeUniformBlocks / max_compute_uniform_blocks: i64 = 12, "maxComputeUniformBlocks";
    MaxUniformBlockSize / max_uniform_block_size: i64 = 16384, "maxUniformBlockSize";

    // 拡張機能（trueで有効）
    ExtOesStandardDerivatives / extension_oes_standard_derivatives: bool = true, "extension_OES_standard_derivatives";
    ExtOesEglImageExternal / extension_oes_egl_image_external: bool = true, "extension_OES_EGL_image_external";
    ExtOesEglImageExternalEssl3 / extension_oes_egl_image_external_essl3: bool = true, "extension_OES_EGL_image_external_essl3";
    ExtNvEglStreamConsumerExternal / extension_nv_egl_stream_consumer_external: bool = true, "extension_NV_EGL_stream_consumer_external";
    ExtArbTextureRectangle / extension_arb_texture_rectangle: bool = true, "extension_ARB_texture_rectangle";
    ExtExtBlendFuncExtended / extension_ext_blend_func_extended: bool = true, "extension_EXT_blend_func_extended";
    ExtExtDrawBuffers / extension_ext_draw_buffers: bool = true, "extension_EXT_draw_buffers";
    ExtExtFragDepth / extension_ext_frag_depth: bool = true, "extension_EXT_frag_depth";
    ExtExtShaderTextureLod / extension_ext_shader_texture_lod: bool = true, "extension_EXT_shader_texture_lod";
    ExtExtShaderFramebufferFetch / extension_ext_shader_framebuffer_fetch: bool = true, "extension_EXT_shader_framebuffer_fetch";
    ExtNvShaderFramebufferFetch / extension_nv_shader_framebuffer_fetch: bool = true, "extension_NV_shader_framebuffer_fetch";
    ExtNvShaderNoperspectiveInterpolation / extension_nv_shader_noperspective_interpolation: bool = true, "extension_NV_shader_noperspective_interpolation";
    ExtArmShaderFramebufferFetch / extension_arm_shader_framebuffer_fetch: bool = true, "extension_ARM_shader_framebuffer_fetch";
    ExtOvrMultiview / extension_ovr_multiview: bool = true, "extension_OVR_multiview";
    ExtOvrMultiview2 / extension_ovr_multiview2: bool = true, "extension_OVR_multiview2";
    ExtExtMultisampledRenderToTexture / extension_ext_multisampled_render_to_texture: bool = true, "extension_EXT_multisampled_render_to_texture";
    ExtExtYuvTarget / extension_ext_yuv_target: bool = true, "extension_EXT_YUV_target";
    ExtExtGeometryShader / extension_ext_geometry_shader: bool = true, "extension_EXT_geometry_shader";
    ExtExtGpuShader5 / extension_ext_gpu_shader5: bool = true, "extension_EXT_gpu_shader5";
    ExtExtShaderNonConstantGlobalInitializers / extension_ext_shader_non_constant_global_initializers: bool = true, "extension_EXT_shader_non_constant_global_initializers";
    ExtOesTextureStorageMultisample2dArray / extension_oes_texture_storage_multisample_2d_array: bool = true, "extension_OES_texture_storage_multisample_2d_array";
    ExtOesTexture3d / extension_oes_texture_3d: bool = true, "extension_OES_texture_3D";
    ExtAngleTextureMultisample / extension_angle_texture_multisample: bool = true, "extension_ANGLE_texture_multisample";
    ExtAngleMultiDraw / extension_angle_multi_draw: bool = true, "extension_ANGLE_multi_draw";
    ExtAngleBaseVertexBaseInstance / extension_angle_base_vertex_base_instance: bool = true, "extension_ANGLE_base_vertex_base_instance";
    ExtWebglVideoTexture / extension_webgl_video_texture: bool = true, "extension_WEBGL_video_texture";
    ExtAppleClipDistance / extension_apple_clip_distance: bool = true, "extension_APPLE_clip_distance";
    ExtOesTextureCubeMapArray / extension_oes_texture_cube_map_array: bool = true, "extension_OES_texture_cube_map_array";
    ExtExtTextureCubeMapArray / extension_ext_texture_cube_map_array: bool = true, "extension_EXT_texture_cube_map_array";
}

impl ResourceLimits {
    /// 基本テーブルに部分的な上書きを適用した新しいテーブルを作成
    ///
    /// 未知のキーは入力ミスを黙って無視しないよう [`ConfigError::UnknownLimit`] になります。
    pub fn with_overrides(base: &ResourceLimits, overrides: &LimitOverrides) -> Result<Self> {
        let mut limits = base.clone();
        for (name, value) in overrides {
            let key = LimitKey::from_name(name).ok_or_else(|| ConfigError::UnknownLimit(name.clone()))?;
            limits.assign(key, value)?;
        }
        Ok(limits)
    }

    /// 既定プロファイルに上書きを適用
    pub fn from_overrides(overrides: &LimitOverrides) -> Result<Self> {
        Self::with_overrides(&ResourceLimits::default(), overrides)
    }

    /// JSONオブジェクト形式の上書き指定から作成
    pub fn from_json_str(source: &str) -> Result<Self> {
        let overrides: LimitOverrides = serde_json::from_str(source)?;
        Self::from_overrides(&overrides)
    }

    /// TOMLテーブル形式の上書き指定から作成
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let overrides: LimitOverrides = toml::from_str(source)?;
        Self::from_overrides(&overrides)
    }

    /// 名前で値を取得
    pub fn get(&self, name: &str) -> Result<LimitValue> {
        LimitKey::from_name(name)
            .map(|key| self.value(key))
            .ok_or_else(|| ConfigError::UnknownLimit(name.to_string()))
    }

    /// フラグとして取得（整数は0以外を真とみなす）
    pub fn flag(&self, key: LimitKey) -> bool {
        match self.value(key) {
            LimitValue::Bool(value) => value,
            LimitValue::Int(value) => value != 0,
            LimitValue::Float(value) => value != 0.0,
        }
    }

    /// 整数として取得
    pub fn int(&self, key: LimitKey) -> i64 {
        match self.value(key) {
            LimitValue::Bool(value) => value as i64,
            LimitValue::Int(value) => value,
            LimitValue::Float(value) => value as i64,
        }
    }

    /// 宣言順に全エントリを列挙
    pub fn iter(&self) -> impl Iterator<Item = (LimitKey, LimitValue)> + '_ {
        LimitKey::ALL.iter().map(move |key| (*key, self.value(*key)))
    }

    /// 外部表現（名前 → 値）に変換
    pub fn to_map(&self) -> LimitOverrides {
        self.iter()
            .map(|(key, value)| (key.as_str().to_string(), value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_covers_every_key() {
        let limits = ResourceLimits::default();
        assert_eq!(limits.iter().count(), LimitKey::ALL.len());
        assert!(LimitKey::ALL.len() >= 140);
        for key in LimitKey::ALL {
            assert_eq!(LimitKey::from_name(key.as_str()), Some(*key));
            assert!(limits.get(key.as_str()).is_ok());
        }
    }

    #[test]
    fn test_get_unknown_limit() {
        let limits = ResourceLimits::default();
        match limits.get("maxDrawBufers") {
            Err(ConfigError::UnknownLimit(name)) => assert_eq!(name, "maxDrawBufers"),
            other => panic!("UnknownLimitが期待されます: {:?}", other),
        }
    }

    #[test]
    fn test_override_merges_key_by_key() {
        let mut overrides = LimitOverrides::new();
        overrides.insert("maxDrawBuffers".to_string(), LimitValue::Int(4));
        overrides.insert("limits_generalVariableIndexing".to_string(), LimitValue::Int(0));
        overrides.insert("maxPointSize".to_string(), LimitValue::Int(64));

        let limits = ResourceLimits::from_overrides(&overrides).unwrap();
        assert_eq!(limits.max_draw_buffers(), 4);
        assert!(!limits.general_variable_indexing());
        assert_eq!(limits.max_point_size(), 64.0);
        // 上書きされていないキーは既定値のまま
        assert_eq!(limits.max_vertex_attribs(), 64);
        assert!(limits.general_uniform_indexing());
    }

    #[test]
    fn test_override_rejects_unknown_key() {
        let result = ResourceLimits::from_json_str(r#"{ "maxDrawBufer": 4 }"#);
        assert!(matches!(result, Err(ConfigError::UnknownLimit(name)) if name == "maxDrawBufer"));
    }

    #[test]
    fn test_override_rejects_wrong_kind() {
        let result = ResourceLimits::from_json_str(r#"{ "maxDrawBuffers": true }"#);
        assert!(matches!(result, Err(ConfigError::InvalidLimitValue { .. })));

        let result = ResourceLimits::from_json_str(r#"{ "limits_whileLoops": 2 }"#);
        assert!(matches!(result, Err(ConfigError::InvalidLimitValue { .. })));
    }

    #[test]
    fn test_override_from_toml() {
        let limits = ResourceLimits::from_toml_str("maxVaryingVectors = 16\nextension_OVR_multiview = false\n").unwrap();
        assert_eq!(limits.max_varying_vectors(), 16);
        assert!(!limits.extension_ovr_multiview());
    }

    #[test]
    fn test_malformed_override() {
        let result = ResourceLimits::from_json_str("[1, 2, 3]");
        assert!(matches!(result, Err(ConfigError::Malformed(_))));
    }

    #[test]
    fn test_to_map_round_trips() {
        let limits = ResourceLimits::default();
        let rebuilt = ResourceLimits::from_overrides(&limits.to_map()).unwrap();
        assert_eq!(rebuilt, limits);
    }
}
