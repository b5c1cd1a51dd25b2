//! # 文の構文解析
//!
//! ブロック・制御構文・局所宣言・式文の構文解析を担当するモジュールです。

use crate::frontend::ast::{Block, Loop, LoopKind, Stmt, StmtKind};
use crate::frontend::error::Result;
use crate::frontend::lexer::token::TokenKind;

use super::Parser;

impl Parser {
    /// ブロックを解析（`{` から `}` まで）
    pub(super) fn parse_block(&mut self) -> Result<Block> {
        let location = self.consume(&TokenKind::LeftBrace, "'{' が必要です")?.location;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(self.error("ブロックが閉じられていません"));
            }
            statements.push(self.parse_statement()?);
        }
        self.advance();
        Ok(Block { statements, location })
    }

    /// 文を解析
    pub(super) fn parse_statement(&mut self) -> Result<Stmt> {
        let location = self.peek().location;
        let kind = match self.peek().kind {
            TokenKind::LeftBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            TokenKind::If => self.parse_if()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::While => {
                self.advance();
                self.consume(&TokenKind::LeftParen, "while の後に '(' が必要です")?;
                let condition = self.parse_expression()?;
                self.consume(&TokenKind::RightParen, "while 条件の後に ')' が必要です")?;
                let body = self.parse_statement()?;
                StmtKind::Loop(Loop {
                    kind: LoopKind::While,
                    init: None,
                    condition: Some(condition),
                    step: None,
                    body: Box::new(body),
                })
            }
            TokenKind::Do => {
                self.advance();
                let body = self.parse_statement()?;
                self.consume(&TokenKind::While, "do 本体の後に while が必要です")?;
                self.consume(&TokenKind::LeftParen, "while の後に '(' が必要です")?;
                let condition = self.parse_expression()?;
                self.consume(&TokenKind::RightParen, "while 条件の後に ')' が必要です")?;
                self.consume(&TokenKind::Semicolon, "do-while の後に ';' が必要です")?;
                StmtKind::Loop(Loop {
                    kind: LoopKind::DoWhile,
                    init: None,
                    condition: Some(condition),
                    step: None,
                    body: Box::new(body),
                })
            }
            TokenKind::Switch => {
                self.advance();
                self.consume(&TokenKind::LeftParen, "switch の後に '(' が必要です")?;
                let selector = self.parse_expression()?;
                self.consume(&TokenKind::RightParen, "switch 式の後に ')' が必要です")?;
                let body = self.parse_block()?;
                StmtKind::Switch { selector, body }
            }
            TokenKind::Case => {
                self.advance();
                let label = self.parse_expression()?;
                self.consume(&TokenKind::Colon, "case ラベルの後に ':' が必要です")?;
                StmtKind::Case(Some(label))
            }
            TokenKind::Default => {
                self.advance();
                self.consume(&TokenKind::Colon, "default の後に ':' が必要です")?;
                StmtKind::Case(None)
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume(&TokenKind::Semicolon, "return の後に ';' が必要です")?;
                StmtKind::Return(value)
            }
            TokenKind::Break => self.parse_jump(StmtKind::Break)?,
            TokenKind::Continue => self.parse_jump(StmtKind::Continue)?,
            TokenKind::Discard => self.parse_jump(StmtKind::Discard)?,
            TokenKind::PrecisionKeyword => {
                return Err(self.error("関数内の精度宣言はサポートされていません"));
            }
            _ if self.at_declaration() => self.parse_local_declaration()?,
            _ => {
                let expr = self.parse_expression()?;
                self.consume(&TokenKind::Semicolon, "式の後に ';' が必要です")?;
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt::new(kind, location))
    }

    fn parse_jump(&mut self, kind: StmtKind) -> Result<StmtKind> {
        self.advance();
        self.consume(&TokenKind::Semicolon, "';' が必要です")?;
        Ok(kind)
    }

    /// if文を解析
    fn parse_if(&mut self) -> Result<StmtKind> {
        self.advance();
        self.consume(&TokenKind::LeftParen, "if の後に '(' が必要です")?;
        let condition = self.parse_expression()?;
        self.consume(&TokenKind::RightParen, "if 条件の後に ')' が必要です")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    /// for文を解析
    fn parse_for(&mut self) -> Result<StmtKind> {
        self.advance();
        self.consume(&TokenKind::LeftParen, "for の後に '(' が必要です")?;

        let init_location = self.peek().location;
        let init = if self.match_token(&TokenKind::Semicolon) {
            None
        } else if self.at_declaration() {
            Some(Box::new(Stmt::new(self.parse_local_declaration()?, init_location)))
        } else {
            let expr = self.parse_expression()?;
            self.consume(&TokenKind::Semicolon, "for 初期化式の後に ';' が必要です")?;
            Some(Box::new(Stmt::new(StmtKind::Expr(expr), init_location)))
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(&TokenKind::Semicolon, "for 条件式の後に ';' が必要です")?;

        let step = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(&TokenKind::RightParen, "for ヘッダの後に ')' が必要です")?;

        let body = self.parse_statement()?;
        Ok(StmtKind::Loop(Loop {
            kind: LoopKind::For,
            init,
            condition,
            step,
            body: Box::new(body),
        }))
    }

    /// 現在位置が局所宣言の開始かどうか
    ///
    /// 型名の直後が `(` の場合（および `T[n](...)`）はコンストラクタ呼び出しの式文です。
    fn at_declaration(&self) -> bool {
        if self.peek().kind.is_qualifier() || self.check(&TokenKind::Struct) {
            return true;
        }
        if !self.at_type_specifier() {
            return false;
        }
        match self.peek_kind_at(1) {
            Some(TokenKind::Identifier(_)) => true,
            Some(TokenKind::LeftBracket) => {
                let mut offset = 2;
                while let Some(kind) = self.peek_kind_at(offset) {
                    match kind {
                        TokenKind::RightBracket => {
                            return matches!(self.peek_kind_at(offset + 1), Some(TokenKind::Identifier(_)))
                        }
                        TokenKind::Eof | TokenKind::Semicolon => return false,
                        _ => offset += 1,
                    }
                }
                false
            }
            _ => false,
        }
    }

    /// 局所宣言を解析
    fn parse_local_declaration(&mut self) -> Result<StmtKind> {
        let location = self.peek().location;
        let qualifiers = self.parse_type_qualifiers()?;
        let specifier = self.parse_type_specifier()?;
        if specifier.struct_definition.is_some() && self.check(&TokenKind::Semicolon) {
            return Err(self.error("構造体の局所定義には宣言子が必要です"));
        }
        let declaration = self.parse_declarators(qualifiers, specifier, location)?;
        Ok(StmtKind::Declaration(declaration))
    }
}

#[cfg(test)]
mod tests {
    use crate::frontend::ast::{ExternalDeclaration, LoopKind, StmtKind, TranslationUnit};
    use crate::frontend::lexer::tokenize;
    use crate::frontend::parser::Parser;

    fn body(source: &str) -> Vec<StmtKind> {
        let unit: TranslationUnit = Parser::new(tokenize(&format!("void main(){{{}}}", source)).unwrap())
            .parse_translation_unit()
            .unwrap();
        match unit.declarations.into_iter().next() {
            Some(ExternalDeclaration::Function(function)) => {
                function.body.statements.into_iter().map(|s| s.kind).collect()
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_loops() {
        let stmts = body("for(int i=0;i<4;i++){} while(true){} do{}while(false);");
        let kinds: Vec<LoopKind> = stmts
            .iter()
            .map(|s| match s {
                StmtKind::Loop(lp) => lp.kind,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(kinds, vec![LoopKind::For, LoopKind::While, LoopKind::DoWhile]);
    }

    #[test]
    fn test_constructor_statement_is_expression() {
        let stmts = body("vec4(1.);float[2] a;float b[2];");
        assert!(matches!(stmts[0], StmtKind::Expr(_)));
        assert!(matches!(stmts[1], StmtKind::Declaration(_)));
        assert!(matches!(stmts[2], StmtKind::Declaration(_)));
    }

    #[test]
    fn test_switch_and_jumps() {
        let stmts = body("switch(1){case 1:break;default:discard;}return;");
        match &stmts[0] {
            StmtKind::Switch { body, .. } => assert_eq!(body.statements.len(), 4),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(stmts[1], StmtKind::Return(None)));
    }
}
