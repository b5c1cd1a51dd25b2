//! # 意味解析モジュール
//!
//! 構文解析で生成された抽象構文木（AST）に対して名前解決と型付けを行います。
//! 型規則と定数評価はバリデータ・オプティマイザからも使用されます。

pub mod const_eval;
pub mod resolver;
pub mod scope;
pub mod typing;

// 再エクスポート
pub use self::resolver::{resolve, FunctionSymbol, Resolver};
pub use self::scope::{ScopeKind, ScopeStack, Symbol, SymbolKind};
