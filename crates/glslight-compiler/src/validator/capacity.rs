//! # 容量検査
//!
//! 宣言の合計サイズ・個数を `max*` 制限と比較します。
//!
//! 合計は宣言順に積み上げ、初めて上限を超えた宣言の位置で1回だけ報告します。
//! uniform・varying・attribute の容量は vec4 スロット数で数えます
//! （行列は列ごとに1スロット、構造体はメンバの合計）。

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::diagnostics::DiagnosticCode;
use crate::frontend::ast::{
    ArraySpec, Callee, Constant, Expr, ExprKind, ExternalDeclaration, LanguageVersion, StorageQualifier, TypeQualifiers,
};
use crate::frontend::builtins::OffsetKind;
use crate::frontend::error::SourceLocation;
use crate::frontend::types::{BasicType, Shape, Type};
use crate::frontend::ShaderStage;
use crate::limits::LimitKey;

use super::Checker;

/// 宣言順に積み上げる合計値
#[derive(Debug, Default)]
struct Totals {
    uniform_vectors: u64,
    samplers: u64,
    uniform_locations: u64,
    uniform_blocks: u64,
    vertex_inputs: u64,
    varyings: u64,
    vertex_outputs: u64,
    fragment_inputs: u64,
}

/// `alignment` の倍数に切り上げ
fn round_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment).saturating_mul(alignment)
}

impl Checker<'_> {
    /// 宣言全体の容量を検査
    pub(crate) fn check_resources(&mut self) {
        if self.stage == ShaderStage::Compute && self.version < LanguageVersion::Es310 {
            self.sink.error(
                DiagnosticCode::UnsupportedInVersion,
                format!("{} では compute シェーダを使用できません", self.version),
                SourceLocation::default(),
            );
        }

        let unit = self.unit;
        let mut totals = Totals::default();
        for declaration in &unit.declarations {
            match declaration {
                ExternalDeclaration::Variables(decl) => {
                    for declarator in &decl.declarators {
                        if declarator.ty.is_error() {
                            continue;
                        }
                        self.count_variable(
                            &mut totals,
                            &decl.qualifiers,
                            &declarator.name,
                            &declarator.ty,
                            declarator.location,
                        );
                    }
                }
                ExternalDeclaration::InterfaceBlock(block) if block.qualifiers.is(StorageQualifier::Uniform) => {
                    let count = match &block.instance_array {
                        Some(ArraySpec::Sized(size)) => self.evaluate_int(size).map_or(1, |count| count.max(1).unsigned_abs()),
                        _ => 1,
                    };
                    totals.uniform_blocks = totals.uniform_blocks.saturating_add(count);
                    let key = match self.stage {
                        ShaderStage::Vertex => LimitKey::MaxVertexUniformBlocks,
                        ShaderStage::Fragment => LimitKey::MaxFragmentUniformBlocks,
                        ShaderStage::Compute => LimitKey::MaxComputeUniformBlocks,
                    };
                    self.check_total(key, totals.uniform_blocks, "uniform ブロック数", block.location);

                    let size = block
                        .fields
                        .iter()
                        .fold(0, |offset, field| {
                            let (alignment, size) = self.std140(&field.ty);
                            round_up(offset, alignment).saturating_add(size)
                        });
                    let size = round_up(size, 16);
                    self.check_total(
                        LimitKey::MaxUniformBlockSize,
                        size,
                        &format!("uniform ブロック '{}' のサイズ", block.name),
                        block.location,
                    );
                }
                _ => {}
            }
        }
    }

    fn count_variable(
        &mut self,
        totals: &mut Totals,
        qualifiers: &TypeQualifiers,
        name: &str,
        ty: &Type,
        location: SourceLocation,
    ) {
        let storage = match qualifiers.storage {
            Some(storage) => storage,
            None => return,
        };
        match (storage, self.stage) {
            (StorageQualifier::Uniform, stage) => {
                let samplers = sampler_count(ty);
                if samplers > 0 {
                    totals.samplers = totals.samplers.saturating_add(samplers);
                    let key = match stage {
                        ShaderStage::Vertex => LimitKey::MaxVertexTextureImageUnits,
                        ShaderStage::Fragment => LimitKey::MaxTextureImageUnits,
                        ShaderStage::Compute => LimitKey::MaxComputeTextureImageUnits,
                    };
                    self.check_total(key, totals.samplers, "サンプラー数", location);
                } else {
                    totals.uniform_vectors = totals.uniform_vectors.saturating_add(self.slots(ty));
                    let (key, total) = match stage {
                        ShaderStage::Vertex => (LimitKey::MaxVertexUniformVectors, totals.uniform_vectors),
                        ShaderStage::Fragment => (LimitKey::MaxFragmentUniformVectors, totals.uniform_vectors),
                        ShaderStage::Compute => (LimitKey::MaxComputeUniformComponents, totals.uniform_vectors.saturating_mul(4)),
                    };
                    self.check_total(key, total, "uniform の容量", location);
                }
                totals.uniform_locations = totals.uniform_locations.saturating_add(self.locations(ty));
                self.check_total(LimitKey::MaxUniformLocations, totals.uniform_locations, "uniform の位置数", location);
            }
            (StorageQualifier::Attribute, _) | (StorageQualifier::In, ShaderStage::Vertex) => {
                totals.vertex_inputs = totals.vertex_inputs.saturating_add(self.slots(ty));
                self.check_total(LimitKey::MaxVertexAttribs, totals.vertex_inputs, "頂点属性の数", location);
            }
            (StorageQualifier::Varying, _) => {
                totals.varyings = totals.varyings.saturating_add(self.slots(ty));
                self.check_total(LimitKey::MaxVaryingVectors, totals.varyings, "varying の容量", location);
            }
            (StorageQualifier::Out, ShaderStage::Vertex) => {
                totals.vertex_outputs = totals.vertex_outputs.saturating_add(self.slots(ty));
                self.check_total(LimitKey::MaxVertexOutputVectors, totals.vertex_outputs, "頂点出力の容量", location);
            }
            (StorageQualifier::In, ShaderStage::Fragment) => {
                totals.fragment_inputs = totals.fragment_inputs.saturating_add(self.slots(ty));
                self.check_total(
                    LimitKey::MaxFragmentInputVectors,
                    totals.fragment_inputs,
                    "フラグメント入力の容量",
                    location,
                );
            }
            (StorageQualifier::Out, ShaderStage::Fragment) => {
                let first = qualifiers.layout_value("location").unwrap_or(0).max(0).unsigned_abs();
                let end = first.saturating_add(u64::from(ty.array.unwrap_or(1)));
                self.check_total(
                    LimitKey::MaxDrawBuffers,
                    end,
                    &format!("出力 '{}' の位置 {} までの数", name, end.saturating_sub(1)),
                    location,
                );
            }
            _ => {}
        }
    }

    /// 合計が制限を超えていれば報告
    fn check_total(&mut self, key: LimitKey, total: u64, what: &str, location: SourceLocation) {
        if i64::try_from(total).map_or(true, |total| total > self.limits.int(key)) {
            self.limit_exceeded(key, format!("{} {}", what, total), location);
        }
    }

    /// vec4 スロット数
    fn slots(&self, ty: &Type) -> u64 {
        match &ty.basic {
            BasicType::Struct(name) => {
                let per_element = self.structs.get(name.as_str()).map_or(0, |fields| {
                    fields.iter().map(|field| self.slots(field)).fold(0, u64::saturating_add)
                });
                per_element.saturating_mul(u64::from(ty.array.unwrap_or(1)))
            }
            _ => ty.vector_slots(),
        }
    }

    /// uniform の位置数（構造体はメンバごと、配列は要素ごと）
    fn locations(&self, ty: &Type) -> u64 {
        let per_element = match &ty.basic {
            BasicType::Struct(name) => self.structs.get(name.as_str()).map_or(0, |fields| {
                fields.iter().map(|field| self.locations(field)).fold(0, u64::saturating_add)
            }),
            _ => 1,
        };
        per_element.saturating_mul(u64::from(ty.array.unwrap_or(1)))
    }

    /// std140 レイアウトでの (アラインメント, サイズ)
    fn std140(&self, ty: &Type) -> (u64, u64) {
        let (alignment, size) = match (&ty.basic, ty.shape) {
            (BasicType::Struct(name), _) => {
                let fields = self.structs.get(name.as_str()).cloned().unwrap_or_default();
                let (alignment, size) = fields.iter().fold((0, 0), |(alignment, offset), field| {
                    let (field_alignment, field_size) = self.std140(field);
                    (
                        alignment.max(field_alignment),
                        round_up(offset, field_alignment).saturating_add(field_size),
                    )
                });
                let alignment = round_up(alignment.max(1), 16);
                (alignment, round_up(size, alignment))
            }
            (_, Shape::Scalar) => (4, 4),
            (_, Shape::Vector(2)) => (8, 8),
            (_, Shape::Vector(3)) => (16, 12),
            (_, Shape::Vector(_)) => (16, 16),
            (_, Shape::Matrix { cols, .. }) => (16, 16 * u64::from(cols)),
        };
        match ty.array {
            Some(count) => {
                let stride = round_up(size, 16);
                (round_up(alignment, 16), stride.saturating_mul(u64::from(count)))
            }
            None => (alignment, size),
        }
    }

    /// `layout(...)` 単独宣言・変数宣言の layout 値を検査
    pub(crate) fn check_layout_declaration(&mut self, qualifiers: &TypeQualifiers, location: SourceLocation) {
        let local_size = qualifiers.layout.iter().any(|q| q.name.starts_with("local_size_"));
        if local_size {
            if self.stage != ShaderStage::Compute {
                self.sink.error(
                    DiagnosticCode::UnsupportedInStage,
                    "local_size は compute シェーダでのみ指定できます",
                    location,
                );
            } else {
                let axes = [
                    ("local_size_x", LimitKey::MaxComputeWorkGroupSizeX),
                    ("local_size_y", LimitKey::MaxComputeWorkGroupSizeY),
                    ("local_size_z", LimitKey::MaxComputeWorkGroupSizeZ),
                ];
                for (name, key) in axes {
                    match qualifiers.layout_value(name) {
                        Some(value) if value < 1 => self.sink.error(
                            DiagnosticCode::InvalidQualifier,
                            format!("{} は1以上である必要があります", name),
                            location,
                        ),
                        Some(value) if value > self.limits.int(key) => {
                            self.limit_exceeded(key, format!("{} = {}", name, value), location)
                        }
                        _ => {}
                    }
                }
            }
        }

        if let Some(views) = qualifiers.layout_value("num_views") {
            self.require_extension("GL_OVR_multiview", location);
            if self.stage != ShaderStage::Vertex {
                self.sink.error(
                    DiagnosticCode::UnsupportedInStage,
                    "num_views は vertex シェーダでのみ指定できます",
                    location,
                );
            } else if views < 1 {
                self.sink.error(DiagnosticCode::InvalidQualifier, "num_views は1以上である必要があります", location);
            } else if views > self.limits.max_views_ovr() {
                self.limit_exceeded(LimitKey::MaxViewsOvr, format!("num_views = {}", views), location);
            }
        }
    }

    /// テクスチャ関数のオフセット引数を検査
    pub(crate) fn check_offset(&mut self, offset: &Expr, kind: OffsetKind) {
        let values = match self.evaluate(offset) {
            Some(values) => values,
            None => {
                self.sink.error(
                    DiagnosticCode::ConstantExpressionRequired,
                    "オフセット引数は定数式である必要があります",
                    offset.location,
                );
                return;
            }
        };
        let (min_key, max_key) = match kind {
            OffsetKind::Texel => (LimitKey::MinProgramTexelOffset, LimitKey::MaxProgramTexelOffset),
            OffsetKind::Gather => (LimitKey::MinProgramTextureGatherOffset, LimitKey::MaxProgramTextureGatherOffset),
        };
        let (min, max) = (self.limits.int(min_key), self.limits.int(max_key));
        for value in values {
            let component = match value {
                Constant::Int(component) => i64::from(component),
                _ => continue,
            };
            if component < min {
                self.limit_exceeded(min_key, format!("オフセット {}", component), offset.location);
            } else if component > max {
                self.limit_exceeded(max_key, format!("オフセット {}", component), offset.location);
            }
        }
    }

    /// 呼び出しグラフを検査（再帰と呼び出しの深さ）
    pub(crate) fn check_call_graph(&mut self) {
        let unit = self.unit;
        let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut locations: HashMap<String, SourceLocation> = HashMap::new();
        for function in unit.functions() {
            let name = function.prototype.name.clone();
            locations.entry(name.clone()).or_insert(function.prototype.location);
            let callees = graph.entry(name).or_default();
            for statement in &function.body.statements {
                statement.walk_exprs(&mut |expr| {
                    if let ExprKind::Call {
                        callee: Callee::User(callee),
                        ..
                    } = &expr.kind
                    {
                        if !callees.contains(callee) {
                            callees.push(callee.clone());
                        }
                    }
                });
            }
        }

        let mut visits = HashMap::new();
        let mut recursive = BTreeSet::new();
        for name in graph.keys() {
            call_depth(name, &graph, &mut visits, &mut recursive);
        }
        for name in &recursive {
            let location = locations.get(*name).copied().unwrap_or_default();
            self.sink.error(
                DiagnosticCode::RecursionNotAllowed,
                format!("関数 '{}' は再帰的に呼び出されています", name),
                location,
            );
        }

        if let Some(Visit::Done(depth)) = visits.get("main") {
            let depth = *depth;
            if depth as i64 > self.limits.max_call_stack_depth() {
                let location = locations.get("main").copied().unwrap_or_default();
                self.limit_exceeded(LimitKey::MaxCallStackDepth, format!("呼び出しの深さ {}", depth), location);
            }
        }
    }
}

/// サンプラーの個数（サンプラー配列は要素数）
fn sampler_count(ty: &Type) -> u64 {
    if ty.is_sampler() {
        u64::from(ty.array.unwrap_or(1))
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy)]
enum Visit {
    Active,
    Done(usize),
}

/// 関数から始まる呼び出し連鎖の最大の深さ（自身を含む）
fn call_depth<'g>(
    name: &'g str,
    graph: &'g BTreeMap<String, Vec<String>>,
    visits: &mut HashMap<&'g str, Visit>,
    recursive: &mut BTreeSet<&'g str>,
) -> usize {
    match visits.get(name) {
        Some(Visit::Done(depth)) => return *depth,
        Some(Visit::Active) => {
            recursive.insert(name);
            return 0;
        }
        None => {}
    }
    visits.insert(name, Visit::Active);
    let deepest = graph.get(name).map_or(0, |callees| {
        callees
            .iter()
            .filter(|callee| graph.contains_key(callee.as_str()))
            .map(|callee| call_depth(callee, graph, visits, recursive))
            .max()
            .unwrap_or(0)
    });
    let depth = deepest + 1;
    visits.insert(name, Visit::Done(depth));
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::frontend::{GlslParser, SourceParser};
    use crate::limits::{LimitOverrides, LimitValue, ResourceLimits};
    use crate::validator::validate;

    fn check_with(source: &str, stage: ShaderStage, overrides: &[(&str, i64)]) -> Vec<Diagnostic> {
        let mut map = LimitOverrides::new();
        for (name, value) in overrides {
            map.insert(name.to_string(), LimitValue::Int(*value));
        }
        let limits = ResourceLimits::from_overrides(&map).unwrap();
        let output = GlslParser::new().parse(source, stage, &limits).unwrap();
        validate(&output.unit, stage, &limits)
    }

    #[test]
    fn test_uniform_vectors_boundary() {
        let at_limit = "uniform vec4 u[8];\nvoid main(){ gl_Position = u[0]; }";
        assert!(check_with(at_limit, ShaderStage::Vertex, &[("maxVertexUniformVectors", 8)]).is_empty());

        let over = "uniform vec4 u[8];\nuniform mat2 m;\nvoid main(){ gl_Position = u[0]; }";
        let diagnostics = check_with(over, ShaderStage::Vertex, &[("maxVertexUniformVectors", 8)]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::LimitExceeded);
        assert!(diagnostics[0].message.contains("maxVertexUniformVectors"));
        assert_eq!(diagnostics[0].location.line, 2);
    }

    #[test]
    fn test_draw_buffers_boundary() {
        let source = |location: i64| {
            format!(
                "#version 300 es\nprecision mediump float;\nlayout(location={}) out vec4 c;\nvoid main(){{ c = vec4(0.0); }}",
                location
            )
        };
        assert!(check_with(&source(3), ShaderStage::Fragment, &[("maxDrawBuffers", 4)]).is_empty());
        let diagnostics = check_with(&source(4), ShaderStage::Fragment, &[("maxDrawBuffers", 4)]);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("maxDrawBuffers"));
    }

    #[test]
    fn test_samplers_boundary() {
        let source = "precision mediump float;\nuniform sampler2D a;\nuniform sampler2D b[2];\nvoid main(){ gl_FragColor = texture2D(a, vec2(0.0)); }";
        assert!(check_with(source, ShaderStage::Fragment, &[("maxTextureImageUnits", 3)]).is_empty());
        let diagnostics = check_with(source, ShaderStage::Fragment, &[("maxTextureImageUnits", 2)]);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_recursion() {
        let source = "float f(float x);\nfloat g(float x){ return f(x); }\nfloat f(float x){ return g(x); }\nvoid main(){ gl_Position = vec4(f(1.0)); }";
        let diagnostics = check_with(source, ShaderStage::Vertex, &[]);
        assert!(!diagnostics.is_empty());
        assert!(diagnostics.iter().all(|d| d.code == DiagnosticCode::RecursionNotAllowed));
    }

    #[test]
    fn test_call_stack_depth() {
        let source = "float a(){ return 1.0; }\nfloat b(){ return a(); }\nvoid main(){ gl_Position = vec4(b()); }";
        assert!(check_with(source, ShaderStage::Vertex, &[("maxCallStackDepth", 3)]).is_empty());
        let diagnostics = check_with(source, ShaderStage::Vertex, &[("maxCallStackDepth", 2)]);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("maxCallStackDepth"));
    }

    #[test]
    fn test_std140_block_size() {
        let source = "#version 300 es\nuniform B { vec3 a; float b; mat3 m; };\nvoid main(){ gl_Position = vec4(b); }";
        assert!(check_with(source, ShaderStage::Vertex, &[("maxUniformBlockSize", 64)]).is_empty());
        let diagnostics = check_with(source, ShaderStage::Vertex, &[("maxUniformBlockSize", 63)]);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_work_group_size() {
        let source = "#version 310 es\nlayout(local_size_x = 64, local_size_y = 2) in;\nvoid main(){}";
        assert!(check_with(source, ShaderStage::Compute, &[("maxComputeWorkGroupSizeX", 64)]).is_empty());
        let diagnostics = check_with(source, ShaderStage::Compute, &[("maxComputeWorkGroupSizeY", 1)]);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("maxComputeWorkGroupSizeY"));
    }

    #[test]
    fn test_texel_offset_range() {
        let source = |offset: i32| {
            format!(
                "#version 300 es\nprecision mediump float;\nuniform sampler2D s;\nout vec4 c;\nvoid main(){{ c = textureOffset(s, vec2(0.0), ivec2({}, 0)); }}",
                offset
            )
        };
        assert!(check_with(&source(7), ShaderStage::Fragment, &[]).is_empty());
        let diagnostics = check_with(&source(8), ShaderStage::Fragment, &[]);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("maxProgramTexelOffset"));
    }

    fn exceeds(diagnostics: &[Diagnostic], name: &str) -> bool {
        diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::LimitExceeded && d.message.contains(name))
    }

    #[test]
    fn test_huge_uniform_arrays_saturate() {
        let source = "uniform vec4 a[2147483647];\nuniform vec4 b[2147483647];\nuniform vec4 c[2147483647];\nvoid main(){}";
        let diagnostics = check_with(source, ShaderStage::Vertex, &[]);
        assert!(exceeds(&diagnostics, "maxVertexUniformVectors"), "{:?}", diagnostics);

        // 列数 × 要素数が 2^32 になる
        let diagnostics = check_with("uniform mat4 m[1073741824];\nvoid main(){}", ShaderStage::Vertex, &[]);
        assert!(exceeds(&diagnostics, "maxVertexUniformVectors"), "{:?}", diagnostics);
    }

    #[test]
    fn test_huge_output_location_saturates() {
        let source = "#version 300 es\nprecision mediump float;\nlayout(location=4294967295) out vec4 c[2];\nvoid main(){ c[0] = vec4(0.0); }";
        let diagnostics = check_with(source, ShaderStage::Fragment, &[]);
        assert!(exceeds(&diagnostics, "maxDrawBuffers"), "{:?}", diagnostics);
    }

    #[test]
    fn test_huge_uniform_block_saturates() {
        let source = "#version 300 es\nuniform B { mat4 m[1073741824]; mat4 n[1073741824]; };\nvoid main(){}";
        let diagnostics = check_with(source, ShaderStage::Vertex, &[]);
        assert!(exceeds(&diagnostics, "maxUniformBlockSize"), "{:?}", diagnostics);

        let source = "#version 300 es\nuniform B { vec4 v; } blocks[2147483647];\nvoid main(){}";
        let diagnostics = check_with(source, ShaderStage::Vertex, &[]);
        assert!(exceeds(&diagnostics, "maxVertexUniformBlocks"), "{:?}", diagnostics);
    }
}
