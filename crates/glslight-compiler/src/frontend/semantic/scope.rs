//! # スコープ管理
//!
//! 名前解決で使用する入れ子のスコープを管理するモジュールです。
//! 最外側は組み込み変数のスコープ、その内側がグローバルスコープになります。

use std::collections::HashMap;
use std::fmt;

use crate::frontend::ast::{Constant, QualifierSet};
use crate::frontend::error::SourceLocation;
use crate::frontend::types::Type;

/// スコープの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// 組み込み変数
    Builtin,
    /// グローバルスコープ
    Global,
    /// 関数スコープ（パラメータと本体の最上位）
    Function,
    /// ブロックスコープ
    Block,
    /// ループスコープ（for の初期化部）
    Loop,
}

/// シンボルの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// 変数
    Variable,
    /// 関数パラメータ
    Parameter,
    /// 組み込み変数
    Builtin,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Variable => write!(f, "変数"),
            SymbolKind::Parameter => write!(f, "パラメータ"),
            SymbolKind::Builtin => write!(f, "組み込み変数"),
        }
    }
}

/// シンボル定義
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// シンボル名
    pub name: String,
    /// シンボルの種類
    pub kind: SymbolKind,
    /// 型
    pub ty: Type,
    /// 記憶域の修飾子
    pub qualifiers: QualifierSet,
    /// 定数の値（成分の列）
    pub value: Option<Vec<Constant>>,
    /// 宣言位置
    pub location: SourceLocation,
}

impl Symbol {
    /// 新しいシンボルを作成
    pub fn new(name: impl Into<String>, kind: SymbolKind, ty: Type, qualifiers: QualifierSet, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            kind,
            ty,
            qualifiers,
            value: None,
            location,
        }
    }

    /// 定数値を付けたシンボル
    pub fn with_value(mut self, value: Option<Vec<Constant>>) -> Self {
        self.value = value;
        self
    }
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    symbols: HashMap<String, Symbol>,
}

/// スコープスタック
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// 組み込みスコープとグローバルスコープを持つスタックを作成
    pub fn new() -> Self {
        Self {
            scopes: vec![
                Scope {
                    kind: ScopeKind::Builtin,
                    symbols: HashMap::new(),
                },
                Scope {
                    kind: ScopeKind::Global,
                    symbols: HashMap::new(),
                },
            ],
        }
    }

    /// 新しいスコープに入る
    pub fn enter(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope {
            kind,
            symbols: HashMap::new(),
        });
    }

    /// 現在のスコープから抜ける（グローバルスコープは残る）
    pub fn exit(&mut self) {
        if self.scopes.len() > 2 {
            self.scopes.pop();
        }
    }

    /// 現在のスコープの種類
    pub fn current_kind(&self) -> ScopeKind {
        self.scopes.last().map_or(ScopeKind::Global, |scope| scope.kind)
    }

    /// グローバルスコープにいるかどうか
    pub fn is_global(&self) -> bool {
        self.current_kind() == ScopeKind::Global
    }

    /// 組み込みシンボルを登録
    pub fn declare_builtin(&mut self, symbol: Symbol) {
        if let Some(scope) = self.scopes.first_mut() {
            scope.symbols.insert(symbol.name.clone(), symbol);
        }
    }

    /// 現在のスコープにシンボルを宣言
    ///
    /// 同じスコープに同名のシンボルがあれば、既存のシンボルをエラーとして返します。
    pub fn declare(&mut self, symbol: Symbol) -> Result<(), Symbol> {
        let scope = match self.scopes.last_mut() {
            Some(scope) => scope,
            None => return Ok(()),
        };
        if let Some(existing) = scope.symbols.get(&symbol.name) {
            return Err(existing.clone());
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// 内側のスコープから順にシンボルを検索
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.symbols.get(name))
    }

    /// グローバルスコープのシンボルを検索
    pub fn lookup_global(&self, name: &str) -> Option<&Symbol> {
        self.scopes.get(1).and_then(|scope| scope.symbols.get(name))
    }

    /// 定数値を検索
    pub fn constant(&self, name: &str) -> Option<Vec<Constant>> {
        self.lookup(name).and_then(|symbol| symbol.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str, ty: Type) -> Symbol {
        Symbol::new(name, SymbolKind::Variable, ty, QualifierSet::EMPTY, SourceLocation::default())
    }

    #[test]
    fn test_shadowing_and_exit() {
        let mut scopes = ScopeStack::new();
        scopes.declare(symbol("x", Type::float())).unwrap();
        scopes.enter(ScopeKind::Block);
        scopes.declare(symbol("x", Type::int())).unwrap();
        assert_eq!(scopes.lookup("x").unwrap().ty, Type::int());
        scopes.exit();
        assert_eq!(scopes.lookup("x").unwrap().ty, Type::float());
    }

    #[test]
    fn test_redefinition_in_same_scope() {
        let mut scopes = ScopeStack::new();
        scopes.declare(symbol("x", Type::float())).unwrap();
        let existing = scopes.declare(symbol("x", Type::int())).unwrap_err();
        assert_eq!(existing.ty, Type::float());
    }

    #[test]
    fn test_builtins_can_be_shadowed() {
        let mut scopes = ScopeStack::new();
        scopes.declare_builtin(symbol("gl_FragCoord", Type::float()));
        assert!(scopes.declare(symbol("gl_FragCoord", Type::int())).is_ok());
        assert!(scopes.is_global());
    }
}
