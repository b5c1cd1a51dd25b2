//! # 拡張機能の検査
//!
//! `#extension` ディレクティブの妥当性と、拡張機能で有効になる構文・組み込みの
//! 使用を検査します。

use crate::diagnostics::DiagnosticCode;
use crate::frontend::ast::{ExtensionBehavior, ExtensionDirective};
use crate::frontend::error::SourceLocation;
use crate::frontend::extensions as registry;

use super::Checker;

impl<'a> Checker<'a> {
    /// `#extension` ディレクティブを検査
    pub(crate) fn check_directives(&mut self) {
        let unit = self.unit;
        for directive in &unit.extensions {
            if directive.name == "all" {
                if matches!(directive.behavior, ExtensionBehavior::Require | ExtensionBehavior::Enable) {
                    self.sink.error(
                        DiagnosticCode::InvalidQualifier,
                        format!("'all' には {} を指定できません", directive.behavior.as_str()),
                        directive.location,
                    );
                }
                continue;
            }
            if self.supported(&directive.name) {
                continue;
            }
            let message = format!("拡張機能 {} はサポートされていません", directive.name);
            match directive.behavior {
                ExtensionBehavior::Require => {
                    self.sink.error(DiagnosticCode::ExtensionNotSupported, message, directive.location)
                }
                ExtensionBehavior::Enable | ExtensionBehavior::Warn => {
                    self.sink.warning(DiagnosticCode::ExtensionNotSupported, message, directive.location)
                }
                ExtensionBehavior::Disable => {}
            }
        }
    }

    /// 拡張機能がプラットフォームでサポートされ、かつ有効化されているか
    pub(crate) fn extension_enabled(&self, name: &str) -> bool {
        self.supported(name)
            && self
                .directive_for(name)
                .map_or(false, |directive| directive.behavior.enables())
    }

    /// 拡張機能を必要とする構文の使用を検査
    pub(crate) fn require_extension(&mut self, name: &str, location: SourceLocation) {
        if !self.supported(name) {
            self.sink.error(
                DiagnosticCode::ExtensionRequired,
                format!("{} が必要ですが、このプラットフォームではサポートされていません", name),
                location,
            );
            return;
        }
        match self.directive_for(name).map(|directive| directive.behavior) {
            Some(behavior) if behavior.enables() => {
                if behavior == ExtensionBehavior::Warn && self.warned_extensions.insert(name.to_string()) {
                    self.sink.warning(
                        DiagnosticCode::ExtensionUsed,
                        format!("拡張機能 {} を使用しています", name),
                        location,
                    );
                }
            }
            _ => self.sink.error(
                DiagnosticCode::ExtensionRequired,
                format!("#extension {} : enable が必要です", name),
                location,
            ),
        }
    }

    fn supported(&self, name: &str) -> bool {
        registry::lookup(name).map_or(false, |info| self.limits.flag(info.flag))
    }

    /// `name` の機能を左右する最後のディレクティブ
    fn directive_for(&self, name: &str) -> Option<&'a ExtensionDirective> {
        self.unit
            .extensions
            .iter()
            .rev()
            .find(|directive| registry::satisfies(&directive.name, name))
    }
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::{Diagnostic, DiagnosticCode, Severity};
    use crate::frontend::{GlslParser, ShaderStage, SourceParser};
    use crate::limits::{LimitOverrides, LimitValue, ResourceLimits};
    use crate::validator::validate;

    fn check_with(source: &str, overrides: &[(&str, bool)]) -> Vec<Diagnostic> {
        let mut map = LimitOverrides::new();
        for (name, value) in overrides {
            map.insert(name.to_string(), LimitValue::Bool(*value));
        }
        let limits = ResourceLimits::from_overrides(&map).unwrap();
        let output = GlslParser::new().parse(source, ShaderStage::Fragment, &limits).unwrap();
        validate(&output.unit, ShaderStage::Fragment, &limits)
    }

    const DERIVATIVES: &str = "precision mediump float;\nvarying vec2 uv;\nvoid main(){ gl_FragColor = vec4(dFdx(uv.x)); }";

    #[test]
    fn test_extension_required() {
        let diagnostics = check_with(DERIVATIVES, &[]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::ExtensionRequired);
    }

    #[test]
    fn test_extension_enabled() {
        let source = format!("#extension GL_OES_standard_derivatives : enable\n{}", DERIVATIVES);
        assert!(check_with(&source, &[]).is_empty());
    }

    #[test]
    fn test_extension_warn_reports_use_once() {
        let source = "#extension GL_OES_standard_derivatives : warn\nprecision mediump float;\nvarying vec2 uv;\nvoid main(){ gl_FragColor = vec4(dFdx(uv.x) + dFdy(uv.y)); }";
        let diagnostics = check_with(source, &[]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::ExtensionUsed);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_unsupported_extension_directive() {
        let require = format!("#extension GL_OES_standard_derivatives : require\n{}", DERIVATIVES);
        let codes: Vec<_> = check_with(&require, &[("extension_OES_standard_derivatives", false)])
            .into_iter()
            .map(|d| (d.code, d.severity))
            .collect();
        assert_eq!(
            codes,
            vec![
                (DiagnosticCode::ExtensionNotSupported, Severity::Error),
                (DiagnosticCode::ExtensionRequired, Severity::Error)
            ]
        );

        let enable = "#extension GL_EXT_unknown_thing : enable\nvoid main(){}";
        let diagnostics = check_with(enable, &[]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_disabled_after_enable() {
        let source = format!(
            "#extension GL_OES_standard_derivatives : enable\n#extension GL_OES_standard_derivatives : disable\n{}",
            DERIVATIVES
        );
        let diagnostics = check_with(&source, &[]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::ExtensionRequired);
    }
}
