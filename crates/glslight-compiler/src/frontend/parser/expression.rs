//! # 式の構文解析
//!
//! GLSLの式（リテラル、演算子、関数呼び出し、コンストラクタ、添字、
//! フィールド選択など）の構文解析を担当するモジュールです。
//! 二項演算子は [`BinaryOp::precedence`] に基づく優先順位法で解析します。

use crate::frontend::ast::{AssignOp, BinaryOp, Callee, Constant, Expr, ExprKind, UnaryOp};
use crate::frontend::error::Result;
use crate::frontend::lexer::token::TokenKind;
use crate::frontend::types::{BasicType, Type};

use super::Parser;

impl Parser {
    /// 式を解析（コンマ演算子を含む）
    pub(super) fn parse_expression(&mut self) -> Result<Expr> {
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let location = first.location;
        let mut exprs = vec![first];
        while self.match_token(&TokenKind::Comma) {
            exprs.push(self.parse_assignment()?);
        }
        Ok(Expr::new(ExprKind::Sequence(exprs), location))
    }

    /// 代入式を解析（右結合）
    pub(super) fn parse_assignment(&mut self) -> Result<Expr> {
        let target = self.parse_conditional()?;
        let op = match self.peek().kind {
            TokenKind::Equal => AssignOp::Assign,
            TokenKind::PlusEqual => AssignOp::Compound(BinaryOp::Add),
            TokenKind::MinusEqual => AssignOp::Compound(BinaryOp::Sub),
            TokenKind::StarEqual => AssignOp::Compound(BinaryOp::Mul),
            TokenKind::SlashEqual => AssignOp::Compound(BinaryOp::Div),
            TokenKind::PercentEqual => AssignOp::Compound(BinaryOp::Mod),
            TokenKind::LeftShiftEqual => AssignOp::Compound(BinaryOp::Shl),
            TokenKind::RightShiftEqual => AssignOp::Compound(BinaryOp::Shr),
            TokenKind::AmpersandEqual => AssignOp::Compound(BinaryOp::BitAnd),
            TokenKind::PipeEqual => AssignOp::Compound(BinaryOp::BitOr),
            TokenKind::CaretEqual => AssignOp::Compound(BinaryOp::BitXor),
            _ => return Ok(target),
        };
        self.advance();
        let value = self.parse_assignment()?;
        let location = target.location;
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            location,
        ))
    }

    /// 条件式（三項演算子）を解析
    pub(super) fn parse_conditional(&mut self) -> Result<Expr> {
        let condition = self.parse_binary(0)?;
        if !self.match_token(&TokenKind::Question) {
            return Ok(condition);
        }
        let then_expr = self.parse_expression()?;
        self.consume(&TokenKind::Colon, "条件式の ':' が必要です")?;
        let else_expr = self.parse_assignment()?;
        let location = condition.location;
        Ok(Expr::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            location,
        ))
    }

    /// 二項演算子を優先順位法で解析（左結合）
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        while let Some(op) = binary_operator(&self.peek().kind) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence + 1)?;
            let location = left.location;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                location,
            );
        }
        Ok(left)
    }

    /// 前置単項演算子を解析
    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::PlusPlus => UnaryOp::PreIncrement,
            TokenKind::MinusMinus => UnaryOp::PreDecrement,
            _ => return self.parse_postfix(),
        };
        let location = self.advance().location;
        let operand = self.parse_unary()?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            location,
        ))
    }

    /// 後置演算子（添字、フィールド選択、後置増減）を解析
    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let location = expr.location;
            match self.peek().kind {
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.consume(&TokenKind::RightBracket, "添字の後に ']' が必要です")?;
                    expr = Expr::new(
                        ExprKind::Index {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                        location,
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.consume_identifier("'.' の後にフィールド名が必要です")?;
                    if self.check(&TokenKind::LeftParen) {
                        return Err(self.error("メソッド呼び出しはサポートされていません"));
                    }
                    expr = Expr::new(
                        ExprKind::Field {
                            base: Box::new(expr),
                            name,
                        },
                        location,
                    );
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if self.advance().kind == TokenKind::PlusPlus {
                        UnaryOp::PostIncrement
                    } else {
                        UnaryOp::PostDecrement
                    };
                    expr = Expr::new(
                        ExprKind::Unary {
                            op,
                            operand: Box::new(expr),
                        },
                        location,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    /// 一次式を解析
    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.advance();
        let location = token.location;
        let expr = match token.kind {
            TokenKind::IntLiteral(value) => Expr::new(ExprKind::Literal(Constant::Int(value as i32)), location),
            TokenKind::UIntLiteral(value) => Expr::new(ExprKind::Literal(Constant::UInt(value)), location),
            TokenKind::FloatLiteral(value) => Expr::new(ExprKind::Literal(Constant::Float(value)), location),
            TokenKind::TrueLiteral => Expr::new(ExprKind::Literal(Constant::Bool(true)), location),
            TokenKind::FalseLiteral => Expr::new(ExprKind::Literal(Constant::Bool(false)), location),
            TokenKind::LeftParen => {
                let inner = self.parse_expression()?;
                self.consume(&TokenKind::RightParen, "')' が必要です")?;
                inner
            }
            TokenKind::TypeName(ty) => {
                let ty = self.parse_constructor_array(ty)?;
                let args = self.parse_arguments()?;
                Expr::new(
                    ExprKind::Call {
                        callee: Callee::Constructor(ty),
                        args,
                    },
                    location,
                )
            }
            TokenKind::Identifier(name) => {
                if self.struct_names.contains(&name) {
                    let ty = self.parse_constructor_array(Type::scalar(BasicType::Struct(name)))?;
                    let args = self.parse_arguments()?;
                    Expr::new(
                        ExprKind::Call {
                            callee: Callee::Constructor(ty),
                            args,
                        },
                        location,
                    )
                } else if self.check(&TokenKind::LeftParen) {
                    let args = self.parse_arguments()?;
                    Expr::new(
                        ExprKind::Call {
                            callee: Callee::User(name),
                            args,
                        },
                        location,
                    )
                } else {
                    Expr::new(ExprKind::Variable(name), location)
                }
            }
            other => {
                return Err(self.error_at_previous(format!("式が必要です（{} が見つかりました）", other)));
            }
        };
        Ok(expr)
    }

    /// 配列コンストラクタの `[n]` / `[]` を解析
    fn parse_constructor_array(&mut self, ty: Type) -> Result<Type> {
        if !self.match_token(&TokenKind::LeftBracket) {
            return Ok(ty);
        }
        if self.match_token(&TokenKind::RightBracket) {
            // サイズは引数の数から名前解決で決定する
            return Ok(ty.with_array(Some(0)));
        }
        let size = match self.advance().kind {
            TokenKind::IntLiteral(size) | TokenKind::UIntLiteral(size) => size,
            ref other => {
                return Err(self.error_at_previous(format!("配列コンストラクタのサイズには整数リテラルが必要です（{}）", other)))
            }
        };
        self.consume(&TokenKind::RightBracket, "']' が必要です")?;
        Ok(ty.with_array(Some(size)))
    }

    /// 呼び出しの引数列を解析（`(` から `)` まで）
    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        self.consume(&TokenKind::LeftParen, "'(' が必要です")?;
        let mut args = Vec::new();
        let is_void_list = matches!(&self.peek().kind, TokenKind::TypeName(ty) if ty.is_void())
            && self.peek_next_is(&TokenKind::RightParen);
        if is_void_list {
            self.advance();
        } else if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_assignment()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RightParen, "引数の後に ')' が必要です")?;
        Ok(args)
    }
}

/// トークンを二項演算子に変換
fn binary_operator(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::PipePipe => BinaryOp::Or,
        TokenKind::CaretCaret => BinaryOp::Xor,
        TokenKind::AmpersandAmpersand => BinaryOp::And,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Ampersand => BinaryOp::BitAnd,
        TokenKind::EqualEqual => BinaryOp::Eq,
        TokenKind::BangEqual => BinaryOp::Ne,
        TokenKind::Less => BinaryOp::Lt,
        TokenKind::Greater => BinaryOp::Gt,
        TokenKind::LessEqual => BinaryOp::Le,
        TokenKind::GreaterEqual => BinaryOp::Ge,
        TokenKind::LeftShift => BinaryOp::Shl,
        TokenKind::RightShift => BinaryOp::Shr,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        _ => return None,
    };
    Some(op)
}
