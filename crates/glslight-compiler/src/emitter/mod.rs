//! # エミッタ
//!
//! 型付きのASTからGLSL ESのソーステキストを生成します。
//!
//! 既定の出力は1行のコンパクトな正規形です。
//! - 括弧は優先順位から必要な場合だけ付ける
//! - 空白はトークンがつながってしまう場合だけ入れる（`- -x`）
//! - 浮動小数点リテラルは最短表記（`0.`、`.5`、`1e5`）
//!
//! [`EmitOptions`] はテキストにだけ影響し、元のASTは変更しません。
//! 縮小（[`minify`]）と名前の短縮（[`mangle`]）はASTの複製に対して行います。

use log::debug;
use serde::{Deserialize, Serialize};

use crate::frontend::ast::TranslationUnit;

pub mod mangle;
pub mod minify;
pub mod writer;

pub use self::writer::format_float;

/// 出力テキストの形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmitOptions {
    /// 関数パラメータ・局所変数・`main` 以外の関数の名前を短縮する
    pub mangle: bool,
    /// 文をコンマ演算子や三項演算子にまとめる
    pub minify: bool,
    /// インデントと空白を付けて整形する
    pub beautify: bool,
}

/// エミッタのインターフェース
pub trait SourceEmitter: Send + Sync {
    /// 翻訳単位をソーステキストに変換
    fn emit(&self, unit: &TranslationUnit, options: &EmitOptions) -> String;
}

/// 組み込みのGLSL ESエミッタ
#[derive(Debug, Clone, Copy, Default)]
pub struct GlslEmitter;

impl GlslEmitter {
    /// 新しいエミッタを作成
    pub fn new() -> Self {
        Self
    }
}

impl SourceEmitter for GlslEmitter {
    fn emit(&self, unit: &TranslationUnit, options: &EmitOptions) -> String {
        let text = if options.minify || options.mangle {
            let mut copy = unit.clone();
            if options.minify {
                let merged = minify::minify(&mut copy);
                debug!("縮小: {} 件の文をまとめました", merged);
            }
            if options.mangle {
                let renamed = mangle::mangle(&mut copy);
                debug!("名前の短縮: {} 個のシンボル", renamed);
            }
            writer::write_unit(&copy, options.beautify)
        } else {
            writer::write_unit(unit, options.beautify)
        };
        debug!("{} バイトを出力しました", text.len());
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{GlslParser, ShaderStage, SourceParser};
    use crate::limits::ResourceLimits;

    fn emit(source: &str, options: EmitOptions) -> String {
        let unit = GlslParser::new()
            .parse(source, ShaderStage::Fragment, &ResourceLimits::default())
            .unwrap()
            .unit;
        GlslEmitter::new().emit(&unit, &options)
    }

    const PREFIX: &str = "#version 300 es\nprecision mediump float;uniform int iN;uniform bool iB;uniform lowp sampler2D s;uniform vec4 vA,vB;layout(location=1)out vec4 V;layout(location=2)out vec4 P;layout(location=3)out int N;layout(location=4)out uint uN;";

    #[test]
    fn test_canonical_prefix_round_trip() {
        let source = format!("{}void main(){{P=texture(s,vA.xy);}}", PREFIX);
        assert_eq!(emit(&source, EmitOptions::default()), source);
    }

    #[test]
    fn test_compact_form_of_spaced_source() {
        let source = "#version 300 es\nprecision mediump float;\nuniform vec4 vA;\nout vec4 P;\nvoid main() {\n    P = vA * 0.5 + vec4(1.0);\n}\n";
        assert_eq!(
            emit(source, EmitOptions::default()),
            "#version 300 es\nprecision mediump float;uniform vec4 vA;out vec4 P;void main(){P=vA*.5+vec4(1.);}"
        );
    }

    #[test]
    fn test_beautify() {
        let source = "#version 300 es\nprecision mediump float;uniform vec4 vA;out vec4 P;void main(){if(vA.x>0.){P=vA;}else{P=-vA;}}";
        let expected = "#version 300 es\nprecision mediump float;\nuniform vec4 vA;\nout vec4 P;\nvoid main() {\n  if (vA.x > 0.) {\n    P = vA;\n  } else {\n    P = -vA;\n  }\n}\n";
        let options = EmitOptions {
            beautify: true,
            ..EmitOptions::default()
        };
        assert_eq!(emit(source, options), expected);
    }

    #[test]
    fn test_minify_does_not_touch_original() {
        let source = "#version 300 es\nprecision mediump float;uniform vec4 vA;out vec4 P;void main(){P=vA;P.x=1.;}";
        let unit = GlslParser::new()
            .parse(source, ShaderStage::Fragment, &ResourceLimits::default())
            .unwrap()
            .unit;
        let original = unit.clone();
        let options = EmitOptions {
            minify: true,
            mangle: true,
            beautify: false,
        };
        let text = GlslEmitter::new().emit(&unit, &options);
        assert_eq!(unit, original);
        assert!(text.ends_with("void main(){P=vA,P.x=1.;}"), "{}", text);
    }
}
