//! # 型と宣言の構文解析
//!
//! 型修飾子・型指定子・構造体・インターフェースブロック・関数プロトタイプ・
//! 宣言子の構文解析を担当します。配列サイズの評価は名前解決で行います。

use crate::frontend::ast::{
    ArraySpec, Declaration, Declarator, FunctionPrototype, InterfaceBlock, Interpolation, LayoutQualifier,
    Parameter, ParameterDirection, StorageQualifier, StructDefinition, StructField, TypeQualifiers,
};
use crate::frontend::error::{Result, SourceLocation};
use crate::frontend::lexer::token::TokenKind;
use crate::frontend::types::{BasicType, Type};

use super::Parser;

/// 型指定子（解析途中の中間表現）
#[derive(Debug, Clone)]
pub struct TypeSpecifier {
    /// 基本の型
    pub ty: Type,
    /// 埋め込みの構造体定義
    pub struct_definition: Option<StructDefinition>,
    /// 型側の配列指定
    pub array: Option<ArraySpec>,
}

impl Parser {
    /// 型修飾子の並びを解析
    pub(super) fn parse_type_qualifiers(&mut self) -> Result<TypeQualifiers> {
        let mut qualifiers = TypeQualifiers::default();
        loop {
            let storage = match self.peek().kind {
                TokenKind::Const => Some(StorageQualifier::Const),
                TokenKind::Uniform => Some(StorageQualifier::Uniform),
                TokenKind::Buffer => Some(StorageQualifier::Buffer),
                TokenKind::Shared => Some(StorageQualifier::Shared),
                TokenKind::Attribute => Some(StorageQualifier::Attribute),
                TokenKind::Varying => Some(StorageQualifier::Varying),
                TokenKind::In => Some(StorageQualifier::In),
                TokenKind::Out => Some(StorageQualifier::Out),
                TokenKind::InOut => Some(StorageQualifier::InOut),
                _ => None,
            };
            if let Some(storage) = storage {
                if qualifiers.storage.is_some() {
                    return Err(self.error("ストレージ修飾子が重複しています"));
                }
                qualifiers.storage = Some(storage);
                self.advance();
                continue;
            }

            match self.peek().kind {
                TokenKind::Layout => {
                    self.advance();
                    let layout = self.parse_layout_list()?;
                    qualifiers.layout.extend(layout);
                }
                TokenKind::Invariant => {
                    self.advance();
                    qualifiers.invariant = true;
                }
                TokenKind::Centroid => {
                    self.advance();
                    qualifiers.centroid = true;
                }
                TokenKind::Flat => {
                    self.advance();
                    qualifiers.interpolation = Some(Interpolation::Flat);
                }
                TokenKind::Smooth => {
                    self.advance();
                    qualifiers.interpolation = Some(Interpolation::Smooth);
                }
                TokenKind::PrecisionQualifier(precision) => {
                    self.advance();
                    qualifiers.precision = Some(precision);
                }
                _ => return Ok(qualifiers),
            }
        }
    }

    /// `layout(...)` の括弧内を解析
    fn parse_layout_list(&mut self) -> Result<Vec<LayoutQualifier>> {
        self.consume(&TokenKind::LeftParen, "layout の後に '(' が必要です")?;
        let mut list = Vec::new();
        loop {
            let location = self.peek().location;
            let name = match self.advance().kind {
                TokenKind::Identifier(name) => name,
                TokenKind::Shared => "shared".to_string(),
                ref other => return Err(self.error_at_previous(format!("layout 修飾子名が必要です（{}）", other))),
            };
            let value = if self.match_token(&TokenKind::Equal) {
                match self.advance().kind {
                    TokenKind::IntLiteral(value) | TokenKind::UIntLiteral(value) => Some(value as i64),
                    ref other => {
                        return Err(self.error_at_previous(format!("layout の値には整数が必要です（{}）", other)))
                    }
                }
            } else {
                None
            };
            list.push(LayoutQualifier { name, value, location });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RightParen, "layout 修飾子の後に ')' が必要です")?;
        Ok(list)
    }

    /// 現在位置が型指定子の開始かどうか
    pub(super) fn at_type_specifier(&self) -> bool {
        match &self.peek().kind {
            TokenKind::TypeName(_) | TokenKind::Struct => true,
            TokenKind::Identifier(name) => self.struct_names.contains(name),
            _ => false,
        }
    }

    /// 型指定子を解析
    pub(super) fn parse_type_specifier(&mut self) -> Result<TypeSpecifier> {
        let (ty, struct_definition) = match self.peek().kind.clone() {
            TokenKind::Struct => {
                let definition = self.parse_struct_definition()?;
                let ty = Type::scalar(BasicType::Struct(definition.name.clone()));
                (ty, Some(definition))
            }
            TokenKind::TypeName(ty) => {
                self.advance();
                (ty, None)
            }
            TokenKind::Identifier(name) if self.struct_names.contains(&name) => {
                self.advance();
                (Type::scalar(BasicType::Struct(name)), None)
            }
            other => return Err(self.error(format!("型が必要です（{} が見つかりました）", other))),
        };
        let array = self.parse_optional_array_spec()?;
        Ok(TypeSpecifier {
            ty,
            struct_definition,
            array,
        })
    }

    /// `[size]` または `[]` があれば解析
    pub(super) fn parse_optional_array_spec(&mut self) -> Result<Option<ArraySpec>> {
        if !self.match_token(&TokenKind::LeftBracket) {
            return Ok(None);
        }
        if self.match_token(&TokenKind::RightBracket) {
            return Ok(Some(ArraySpec::Unsized));
        }
        let size = self.parse_conditional()?;
        self.consume(&TokenKind::RightBracket, "配列サイズの後に ']' が必要です")?;
        if self.check(&TokenKind::LeftBracket) {
            return Err(self.error("多次元配列はサポートされていません"));
        }
        Ok(Some(ArraySpec::Sized(Box::new(size))))
    }

    /// 構造体定義を解析（`struct` から `}` まで）
    fn parse_struct_definition(&mut self) -> Result<StructDefinition> {
        let location = self.consume(&TokenKind::Struct, "struct が必要です")?.location;
        let name = self.consume_identifier("構造体には名前が必要です")?;
        self.consume(&TokenKind::LeftBrace, "構造体名の後に '{' が必要です")?;
        let fields = self.parse_struct_fields()?;
        if fields.is_empty() {
            return Err(self.error_at_previous(format!("構造体 '{}' にはメンバが必要です", name)));
        }
        self.struct_names.insert(name.clone());
        Ok(StructDefinition { name, fields, location })
    }

    /// 構造体・ブロックのメンバ並びを `}` まで解析
    fn parse_struct_fields(&mut self) -> Result<Vec<StructField>> {
        let mut fields = Vec::new();
        while !self.match_token(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(self.error("'}' が必要です"));
            }
            let mut layout = Vec::new();
            if self.match_token(&TokenKind::Layout) {
                layout = self.parse_layout_list()?;
            }
            let precision = match self.peek().kind {
                TokenKind::PrecisionQualifier(precision) => {
                    self.advance();
                    Some(precision)
                }
                _ => None,
            };
            if self.check(&TokenKind::Struct) {
                return Err(self.error("構造体の入れ子定義はサポートされていません"));
            }
            let specifier = self.parse_type_specifier()?;
            loop {
                let location = self.peek().location;
                let name = self.consume_identifier("メンバ名が必要です")?;
                let array = self.parse_optional_array_spec()?.or_else(|| specifier.array.clone());
                fields.push(StructField {
                    precision,
                    layout: layout.clone(),
                    name,
                    array,
                    ty: specifier.ty.clone(),
                    location,
                });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.consume(&TokenKind::Semicolon, "メンバ宣言の後に ';' が必要です")?;
        }
        Ok(fields)
    }

    /// インターフェースブロックを解析（ブロック名から `;` まで）
    pub(super) fn parse_interface_block(
        &mut self,
        qualifiers: TypeQualifiers,
        location: SourceLocation,
    ) -> Result<InterfaceBlock> {
        if !matches!(
            qualifiers.storage,
            Some(StorageQualifier::Uniform | StorageQualifier::Buffer | StorageQualifier::In | StorageQualifier::Out)
        ) {
            return Err(self.error("インターフェースブロックには uniform / buffer / in / out が必要です"));
        }
        let name = self.consume_identifier("ブロック名が必要です")?;
        self.consume(&TokenKind::LeftBrace, "ブロック名の後に '{' が必要です")?;
        let fields = self.parse_struct_fields()?;
        let (instance, instance_array) = match &self.peek().kind {
            TokenKind::Identifier(_) => {
                let instance = self.consume_identifier("インスタンス名が必要です")?;
                let array = self.parse_optional_array_spec()?;
                (Some(instance), array)
            }
            _ => (None, None),
        };
        self.consume(&TokenKind::Semicolon, "ブロック宣言の後に ';' が必要です")?;
        Ok(InterfaceBlock {
            qualifiers,
            name,
            fields,
            instance,
            instance_array,
            location,
        })
    }

    /// 関数プロトタイプを解析（関数名から `)` まで）
    pub(super) fn parse_function_prototype(
        &mut self,
        qualifiers: TypeQualifiers,
        specifier: TypeSpecifier,
        location: SourceLocation,
    ) -> Result<FunctionPrototype> {
        if qualifiers.storage.is_some() || !qualifiers.layout.is_empty() || qualifiers.invariant {
            return Err(self.error("関数の戻り値に記憶域修飾子は指定できません"));
        }
        if specifier.array.is_some() {
            return Err(self.error("配列を返す関数はサポートされていません"));
        }
        let name = self.consume_identifier("関数名が必要です")?;
        self.consume(&TokenKind::LeftParen, "関数名の後に '(' が必要です")?;

        let mut parameters = Vec::new();
        let is_void_list = matches!(&self.peek().kind, TokenKind::TypeName(ty) if ty.is_void())
            && self.peek_next_is(&TokenKind::RightParen);
        if is_void_list {
            self.advance();
        } else if !self.check(&TokenKind::RightParen) {
            loop {
                parameters.push(self.parse_parameter()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RightParen, "パラメータの後に ')' が必要です")?;

        Ok(FunctionPrototype {
            return_precision: qualifiers.precision,
            return_type: specifier.ty,
            name,
            parameters,
            location,
        })
    }

    /// 関数パラメータを解析
    fn parse_parameter(&mut self) -> Result<Parameter> {
        let location = self.peek().location;
        let is_const = self.match_token(&TokenKind::Const);
        let direction = match self.peek().kind {
            TokenKind::In => ParameterDirection::In,
            TokenKind::Out => ParameterDirection::Out,
            TokenKind::InOut => ParameterDirection::InOut,
            _ => ParameterDirection::default(),
        };
        if matches!(self.peek().kind, TokenKind::In | TokenKind::Out | TokenKind::InOut) {
            self.advance();
        }
        let precision = match self.peek().kind {
            TokenKind::PrecisionQualifier(precision) => {
                self.advance();
                Some(precision)
            }
            _ => None,
        };
        if self.check(&TokenKind::Struct) {
            return Err(self.error("パラメータ内で構造体は定義できません"));
        }
        let specifier = self.parse_type_specifier()?;
        let name = match &self.peek().kind {
            TokenKind::Identifier(_) => Some(self.consume_identifier("パラメータ名が必要です")?),
            _ => None,
        };
        let array = match name {
            Some(_) => self.parse_optional_array_spec()?.or(specifier.array),
            None => specifier.array,
        };
        Ok(Parameter {
            is_const,
            direction,
            precision,
            ty: specifier.ty,
            array,
            name,
            location,
        })
    }

    /// 宣言子の並びを `;` まで解析
    pub(super) fn parse_declarators(
        &mut self,
        qualifiers: TypeQualifiers,
        specifier: TypeSpecifier,
        location: SourceLocation,
    ) -> Result<Declaration> {
        let mut declarators = Vec::new();
        loop {
            let declarator_location = self.peek().location;
            let name = self.consume_identifier("変数名が必要です")?;
            let array = self.parse_optional_array_spec()?.or_else(|| specifier.array.clone());
            let initializer = if self.match_token(&TokenKind::Equal) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarators.push(Declarator {
                name,
                array,
                ty: specifier.ty.clone(),
                initializer,
                location: declarator_location,
            });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::Semicolon, "宣言の後に ';' が必要です")?;
        Ok(Declaration {
            qualifiers,
            ty: specifier.ty,
            struct_definition: specifier.struct_definition,
            array: specifier.array,
            declarators,
            location,
        })
    }
}
