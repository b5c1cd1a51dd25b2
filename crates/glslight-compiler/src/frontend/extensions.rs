//! # 拡張機能レジストリ
//!
//! `#extension` で指定される `GL_*` 名と、リソース制限テーブルの
//! `extension_*` フラグとの対応を提供します。

use crate::limits::LimitKey;

/// 拡張機能の情報
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionInfo {
    /// 拡張機能名（`GL_` 接頭辞付き）
    pub name: &'static str,
    /// サポート有無を表すフラグ
    pub flag: LimitKey,
    /// 同じ機能を有効化できる別名
    pub aliases: &'static [&'static str],
}

const REGISTRY: &[ExtensionInfo] = &[
    ExtensionInfo { name: "GL_OES_standard_derivatives", flag: LimitKey::ExtOesStandardDerivatives, aliases: &[] },
    ExtensionInfo { name: "GL_OES_EGL_image_external", flag: LimitKey::ExtOesEglImageExternal, aliases: &["GL_NV_EGL_stream_consumer_external"] },
    ExtensionInfo { name: "GL_OES_EGL_image_external_essl3", flag: LimitKey::ExtOesEglImageExternalEssl3, aliases: &[] },
    ExtensionInfo { name: "GL_NV_EGL_stream_consumer_external", flag: LimitKey::ExtNvEglStreamConsumerExternal, aliases: &[] },
    ExtensionInfo { name: "GL_ARB_texture_rectangle", flag: LimitKey::ExtArbTextureRectangle, aliases: &[] },
    ExtensionInfo { name: "GL_EXT_blend_func_extended", flag: LimitKey::ExtExtBlendFuncExtended, aliases: &[] },
    ExtensionInfo { name: "GL_EXT_draw_buffers", flag: LimitKey::ExtExtDrawBuffers, aliases: &[] },
    ExtensionInfo { name: "GL_EXT_frag_depth", flag: LimitKey::ExtExtFragDepth, aliases: &[] },
    ExtensionInfo { name: "GL_EXT_shader_texture_lod", flag: LimitKey::ExtExtShaderTextureLod, aliases: &[] },
    ExtensionInfo { name: "GL_EXT_shader_framebuffer_fetch", flag: LimitKey::ExtExtShaderFramebufferFetch, aliases: &[] },
    ExtensionInfo { name: "GL_NV_shader_framebuffer_fetch", flag: LimitKey::ExtNvShaderFramebufferFetch, aliases: &[] },
    ExtensionInfo { name: "GL_NV_shader_noperspective_interpolation", flag: LimitKey::ExtNvShaderNoperspectiveInterpolation, aliases: &[] },
    ExtensionInfo { name: "GL_ARM_shader_framebuffer_fetch", flag: LimitKey::ExtArmShaderFramebufferFetch, aliases: &[] },
    ExtensionInfo { name: "GL_OVR_multiview", flag: LimitKey::ExtOvrMultiview, aliases: &["GL_OVR_multiview2"] },
    ExtensionInfo { name: "GL_OVR_multiview2", flag: LimitKey::ExtOvrMultiview2, aliases: &[] },
    ExtensionInfo { name: "GL_EXT_multisampled_render_to_texture", flag: LimitKey::ExtExtMultisampledRenderToTexture, aliases: &[] },
    ExtensionInfo { name: "GL_EXT_YUV_target", flag: LimitKey::ExtExtYuvTarget, aliases: &[] },
    ExtensionInfo { name: "GL_EXT_geometry_shader", flag: LimitKey::ExtExtGeometryShader, aliases: &[] },
    ExtensionInfo { name: "GL_EXT_gpu_shader5", flag: LimitKey::ExtExtGpuShader5, aliases: &[] },
    ExtensionInfo { name: "GL_EXT_shader_non_constant_global_initializers", flag: LimitKey::ExtExtShaderNonConstantGlobalInitializers, aliases: &[] },
    ExtensionInfo { name: "GL_OES_texture_storage_multisample_2d_array", flag: LimitKey::ExtOesTextureStorageMultisample2dArray, aliases: &[] },
    ExtensionInfo { name: "GL_OES_texture_3D", flag: LimitKey::ExtOesTexture3d, aliases: &[] },
    ExtensionInfo { name: "GL_ANGLE_texture_multisample", flag: LimitKey::ExtAngleTextureMultisample, aliases: &[] },
    ExtensionInfo { name: "GL_ANGLE_multi_draw", flag: LimitKey::ExtAngleMultiDraw, aliases: &[] },
    ExtensionInfo { name: "GL_ANGLE_base_vertex_base_instance", flag: LimitKey::ExtAngleBaseVertexBaseInstance, aliases: &[] },
    ExtensionInfo { name: "GL_WEBGL_video_texture", flag: LimitKey::ExtWebglVideoTexture, aliases: &[] },
    ExtensionInfo { name: "GL_APPLE_clip_distance", flag: LimitKey::ExtAppleClipDistance, aliases: &[] },
    ExtensionInfo { name: "GL_OES_texture_cube_map_array", flag: LimitKey::ExtOesTextureCubeMapArray, aliases: &[] },
    ExtensionInfo { name: "GL_EXT_texture_cube_map_array", flag: LimitKey::ExtExtTextureCubeMapArray, aliases: &[] },
];

/// 拡張機能名から情報を引く
pub fn lookup(name: &str) -> Option<&'static ExtensionInfo> {
    REGISTRY.iter().find(|info| info.name == name)
}

/// 登録済みの全拡張機能
pub fn all() -> &'static [ExtensionInfo] {
    REGISTRY
}

/// `directive` の指定で `required` の機能が有効になるか
pub fn satisfies(directive: &str, required: &str) -> bool {
    directive == required
        || directive == "all"
        || lookup(required).map_or(false, |info| info.aliases.contains(&directive))
}
