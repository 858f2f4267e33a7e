//! Pratt expression parser.
//!
//! Implements operator-precedence parsing over the full operator table:
//!
//! | BP (L,R) | Operators |
//! |----------|-----------|
//! | (1,2)    | `||` |
//! | (3,4)    | `&&` |
//! | (5,6)    | `|` |
//! | (7,8)    | `^` `~^` `^~` |
//! | (9,10)   | `&` |
//! | (11,12)  | `==` `!=` `===` `!==` `==?` `!=?` |
//! | (13,14)  | `<` `<=` `>` `>=` `inside` |
//! | (15,16)  | `<<` `>>` `<<<` `>>>` |
//! | (17,18)  | `+` `-` |
//! | (19,20)  | `*` `/` `%` |
//! | (22,21)  | `**` (right-assoc) |
//! | prefix 23 | `+` `-` `!` `~` `&` `~&` `|` `~|` `^` `~^` `++` `--` |
//!
//! Ternary `? :` is handled as a special case at min_bp=0
//! (right-associative). The `<=` token doubles as the nonblocking assignment
//! operator; the statement parser decides which reading applies before
//! calling in here.

use crate::ast::*;
use crate::parser::Parser;
use crate::token::{TokenKind, TokenValue};
use sable_diagnostics::DiagCode;

/// Binding power for binary operators. Returns (left_bp, right_bp).
fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::LogOr => (1, 2),
        BinaryOp::LogAnd => (3, 4),
        BinaryOp::BitOr => (5, 6),
        BinaryOp::BitXor | BinaryOp::BitXnor => (7, 8),
        BinaryOp::BitAnd => (9, 10),
        BinaryOp::Eq
        | BinaryOp::Neq
        | BinaryOp::CaseEq
        | BinaryOp::CaseNeq
        | BinaryOp::WildEq
        | BinaryOp::WildNeq => (11, 12),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => (13, 14),
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::AShl | BinaryOp::AShr => (15, 16),
        BinaryOp::Add | BinaryOp::Sub => (17, 18),
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => (19, 20),
        BinaryOp::Pow => (22, 21), // right-associative
    }
}

impl Parser<'_> {
    /// Parses an expression.
    pub(crate) fn parse_expr(&mut self) -> Expr {
        self.parse_expr_bp(0)
    }

    /// Parses an expression with minimum binding power.
    pub(crate) fn parse_expr_bp(&mut self, min_bp: u8) -> Expr {
        let mut lhs = self.parse_prefix_expr();

        loop {
            if self.at_eof() {
                break;
            }

            // Ternary `? :` binds loosest and is right-associative.
            if self.at(TokenKind::Question) && min_bp == 0 {
                self.advance();
                let then_expr = self.parse_expr_bp(0);
                self.expect(TokenKind::Colon);
                let else_expr = self.parse_expr_bp(0);
                let span = lhs.span().merge(else_expr.span());
                lhs = Expr::Ternary {
                    cond: Box::new(lhs),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                    span,
                };
                continue;
            }

            // Postfix: indexing and part selects.
            if self.at(TokenKind::OpenBracket) {
                lhs = self.parse_postfix_index(lhs);
                continue;
            }

            // Postfix: member access.
            if self.at(TokenKind::Dot) {
                self.advance();
                let name = self.expect_ident();
                let span = lhs.span().merge(self.prev_span());
                lhs = Expr::Member {
                    value: Box::new(lhs),
                    name,
                    span,
                };
                continue;
            }

            // Postfix: call on a name.
            if self.at(TokenKind::OpenParen)
                && matches!(lhs, Expr::Ident { .. } | Expr::Scoped { .. } | Expr::Member { .. })
            {
                self.advance();
                let args = self.parse_call_args();
                self.expect(TokenKind::CloseParen);
                let span = lhs.span().merge(self.prev_span());
                lhs = Expr::Call {
                    callee: Box::new(lhs),
                    args,
                    span,
                };
                continue;
            }

            // Postfix: increment / decrement.
            if self.at(TokenKind::DoublePlus) || self.at(TokenKind::DoubleMinus) {
                let increment = self.at(TokenKind::DoublePlus);
                self.advance();
                let span = lhs.span().merge(self.prev_span());
                lhs = Expr::IncDec {
                    target: Box::new(lhs),
                    increment,
                    prefix: false,
                    span,
                };
                continue;
            }

            // Postfix: cast `target'(expr)`.
            if self.at(TokenKind::Apostrophe) && self.peek_kind(1) == TokenKind::OpenParen {
                self.advance();
                self.advance();
                let operand = self.parse_expr();
                self.expect(TokenKind::CloseParen);
                let span = lhs.span().merge(self.prev_span());
                lhs = Expr::Cast {
                    target: Box::new(lhs),
                    operand: Box::new(operand),
                    span,
                };
                continue;
            }

            // `inside` at relational precedence.
            if self.at(TokenKind::Inside) && 13 >= min_bp {
                self.advance();
                self.expect(TokenKind::OpenBrace);
                let mut ranges = Vec::new();
                if !self.at(TokenKind::CloseBrace) {
                    ranges.push(self.parse_inside_range());
                    while self.eat(TokenKind::Comma) {
                        ranges.push(self.parse_inside_range());
                    }
                }
                self.expect(TokenKind::CloseBrace);
                let span = lhs.span().merge(self.prev_span());
                lhs = Expr::Inside {
                    expr: Box::new(lhs),
                    ranges,
                    span,
                };
                continue;
            }

            let op = match self.current_as_binary_op() {
                Some(op) => op,
                None => break,
            };

            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }

            self.advance();
            let rhs = self.parse_expr_bp(r_bp);
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary {
                left: Box::new(lhs),
                op,
                right: Box::new(rhs),
                span,
            };
        }

        lhs
    }

    /// Maps the current token to a binary operator, if it is one.
    pub(crate) fn current_as_binary_op(&self) -> Option<BinaryOp> {
        let op = match self.current() {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::DoubleStar => BinaryOp::Pow,
            TokenKind::DoubleEquals => BinaryOp::Eq,
            TokenKind::ExclamationEquals => BinaryOp::Neq,
            TokenKind::TripleEquals => BinaryOp::CaseEq,
            TokenKind::ExclamationDoubleEquals => BinaryOp::CaseNeq,
            TokenKind::DoubleEqualsQuestion => BinaryOp::WildEq,
            TokenKind::ExclamationEqualsQuestion => BinaryOp::WildNeq,
            TokenKind::LessThan => BinaryOp::Lt,
            TokenKind::LessThanEquals => BinaryOp::Le,
            TokenKind::GreaterThan => BinaryOp::Gt,
            TokenKind::GreaterThanEquals => BinaryOp::Ge,
            TokenKind::DoubleAmpersand => BinaryOp::LogAnd,
            TokenKind::DoublePipe => BinaryOp::LogOr,
            TokenKind::Ampersand => BinaryOp::BitAnd,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::TildeCaret => BinaryOp::BitXnor,
            TokenKind::LeftShift => BinaryOp::Shl,
            TokenKind::RightShift => BinaryOp::Shr,
            TokenKind::TripleLeftShift => BinaryOp::AShl,
            TokenKind::TripleRightShift => BinaryOp::AShr,
            _ => return None,
        };
        Some(op)
    }

    /// Parses one element of an `inside` set, which may be a `[l:r]` range.
    fn parse_inside_range(&mut self) -> Expr {
        if self.at(TokenKind::OpenBracket) {
            let start = self.current_span();
            self.advance();
            let left = self.parse_expr();
            self.expect(TokenKind::Colon);
            let right = self.parse_expr();
            self.expect(TokenKind::CloseBracket);
            let span = start.merge(self.prev_span());
            return Expr::RangeSelect {
                value: Box::new(Expr::Error(span)),
                kind: RangeSelectKind::Simple,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        self.parse_expr()
    }

    /// Parses a postfix `[...]` select on `lhs`.
    fn parse_postfix_index(&mut self, lhs: Expr) -> Expr {
        self.expect(TokenKind::OpenBracket);
        let first = self.parse_expr();

        let kind = if self.eat(TokenKind::Colon) {
            Some(RangeSelectKind::Simple)
        } else if self.eat(TokenKind::PlusColon) {
            Some(RangeSelectKind::IndexedUp)
        } else if self.eat(TokenKind::MinusColon) {
            Some(RangeSelectKind::IndexedDown)
        } else {
            None
        };

        match kind {
            Some(kind) => {
                let right = self.parse_expr();
                self.expect(TokenKind::CloseBracket);
                let span = lhs.span().merge(self.prev_span());
                Expr::RangeSelect {
                    value: Box::new(lhs),
                    kind,
                    left: Box::new(first),
                    right: Box::new(right),
                    span,
                }
            }
            None => {
                self.expect(TokenKind::CloseBracket);
                let span = lhs.span().merge(self.prev_span());
                Expr::Index {
                    value: Box::new(lhs),
                    index: Box::new(first),
                    span,
                }
            }
        }
    }

    fn parse_call_args(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        if self.at(TokenKind::CloseParen) {
            return args;
        }
        loop {
            args.push(self.parse_expr());
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        args
    }

    /// Parses a prefix expression: literals, names, parens, concatenations,
    /// unary operators, casts, and assignment patterns.
    fn parse_prefix_expr(&mut self) -> Expr {
        let start = self.current_span();
        match self.current() {
            TokenKind::IntegerLiteral => self.parse_number(),
            TokenKind::IntegerBase => self.parse_vector_literal(None, start),
            TokenKind::UnbasedUnsizedLiteral => {
                let bit = match self.current_token().value {
                    Some(TokenValue::UnsizedBit(bit)) => bit,
                    _ => sable_common::Logic::X,
                };
                self.advance();
                Expr::Literal(LiteralExpr::UnbasedUnsized { bit, span: start })
            }
            TokenKind::RealLiteral => {
                let value = self.current_token().real_value().unwrap_or(0.0);
                self.advance();
                Expr::Literal(LiteralExpr::Real { value, span: start })
            }
            TokenKind::TimeLiteral => {
                let token = self.current_token();
                let value = token.real_value().unwrap_or(0.0);
                let unit = token
                    .flags
                    .time_unit
                    .unwrap_or(crate::token::TimeUnit::Seconds);
                self.advance();
                Expr::Literal(LiteralExpr::Time {
                    value,
                    unit,
                    span: start,
                })
            }
            TokenKind::StringLiteral => {
                let value = self
                    .current_token()
                    .string_value()
                    .unwrap_or("")
                    .to_string();
                self.advance();
                Expr::Literal(LiteralExpr::Str { value, span: start })
            }
            TokenKind::Null => {
                self.advance();
                Expr::Literal(LiteralExpr::Null { span: start })
            }
            kind if kind.is_identifier() => {
                let name = self.expect_ident();
                if self.at(TokenKind::DoubleColon) {
                    self.advance();
                    let member = self.expect_ident();
                    Expr::Scoped {
                        package: name,
                        name: member,
                        span: start.merge(self.prev_span()),
                    }
                } else {
                    Expr::Ident { name, span: start }
                }
            }
            TokenKind::SystemIdentifier => {
                let name = self
                    .interner
                    .get_or_intern(&self.current_text()[1..]);
                self.advance();
                let mut args = Vec::new();
                if self.eat(TokenKind::OpenParen) {
                    args = self.parse_call_args();
                    self.expect(TokenKind::CloseParen);
                }
                Expr::SystemCall {
                    name,
                    args,
                    span: start.merge(self.prev_span()),
                }
            }
            TokenKind::OpenParen => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(TokenKind::CloseParen);
                inner
            }
            TokenKind::OpenBrace => self.parse_concat(),
            TokenKind::Apostrophe if self.peek_kind(1) == TokenKind::OpenBrace => {
                self.advance();
                self.advance();
                let mut parts = Vec::new();
                if !self.at(TokenKind::CloseBrace) {
                    loop {
                        parts.push(self.parse_expr());
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::CloseBrace);
                Expr::AssignmentPattern {
                    parts,
                    span: start.merge(self.prev_span()),
                }
            }
            kind if kind.is_data_type() => {
                // A built-in type keyword appearing in expression position is
                // a cast target: `int'(x)`.
                let ty = match kind {
                    TokenKind::Logic => DataTypeKind::Logic,
                    TokenKind::Bit => DataTypeKind::Bit,
                    TokenKind::Reg => DataTypeKind::Reg,
                    TokenKind::Byte => DataTypeKind::Byte,
                    TokenKind::Shortint => DataTypeKind::Shortint,
                    TokenKind::Int => DataTypeKind::Int,
                    TokenKind::Longint => DataTypeKind::Longint,
                    TokenKind::Integer => DataTypeKind::Integer,
                    TokenKind::Time => DataTypeKind::Time,
                    TokenKind::Real => DataTypeKind::Real,
                    TokenKind::Shortreal => DataTypeKind::Shortreal,
                    TokenKind::Realtime => DataTypeKind::Realtime,
                    TokenKind::StringKeyword => DataTypeKind::StringType,
                    _ => DataTypeKind::Void,
                };
                self.advance();
                Expr::TypeRef { ty, span: start }
            }
            TokenKind::Plus => self.parse_unary(UnaryOp::Plus),
            TokenKind::Minus => self.parse_unary(UnaryOp::Minus),
            TokenKind::Exclamation => self.parse_unary(UnaryOp::LogicalNot),
            TokenKind::Tilde => self.parse_unary(UnaryOp::BitwiseNot),
            TokenKind::Ampersand => self.parse_unary(UnaryOp::ReductionAnd),
            TokenKind::TildeAmpersand => self.parse_unary(UnaryOp::ReductionNand),
            TokenKind::Pipe => self.parse_unary(UnaryOp::ReductionOr),
            TokenKind::TildePipe => self.parse_unary(UnaryOp::ReductionNor),
            TokenKind::Caret => self.parse_unary(UnaryOp::ReductionXor),
            TokenKind::TildeCaret => self.parse_unary(UnaryOp::ReductionXnor),
            TokenKind::DoublePlus | TokenKind::DoubleMinus => {
                let increment = self.at(TokenKind::DoublePlus);
                self.advance();
                let target = self.parse_expr_bp(23);
                let span = start.merge(target.span());
                Expr::IncDec {
                    target: Box::new(target),
                    increment,
                    prefix: true,
                    span,
                }
            }
            _ => {
                self.error(DiagCode::ExpectedExpression, "expected an expression");
                let span = self.current_span();
                // Do not consume; the caller's recovery decides what to skip.
                Expr::Error(span)
            }
        }
    }

    fn parse_unary(&mut self, op: UnaryOp) -> Expr {
        let start = self.current_span();
        self.advance();
        let operand = self.parse_expr_bp(23);
        let span = start.merge(operand.span());
        Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        }
    }

    /// Parses an integer token, which may begin a sized vector literal.
    fn parse_number(&mut self) -> Expr {
        let start = self.current_span();
        let value = self.current_token().integer_value();

        if self.peek_kind(1) == TokenKind::IntegerBase {
            let size = value.and_then(|v| u32::try_from(v).ok());
            self.advance();
            return self.parse_vector_literal(size, start);
        }

        self.advance();
        Expr::Literal(LiteralExpr::Integer { value, span: start })
    }

    /// Parses the base and digits of a vector literal. `size` is the already
    /// consumed size prefix, if any.
    fn parse_vector_literal(&mut self, size: Option<u32>, start: sable_source::Span) -> Expr {
        let base_token = self.current_token();
        let signed = base_token.flags.signed;
        let base = base_token.flags.base.unwrap_or(crate::token::Base::Decimal);
        self.advance();

        if !self.at(TokenKind::IntegerLiteral) {
            self.error(DiagCode::ExpectedExpression, "expected digits after base");
            let span = start.merge(self.prev_span());
            return Expr::Error(span);
        }
        let digits_span = self.current_span();
        self.advance();

        Expr::Literal(LiteralExpr::Vector {
            size,
            signed,
            base,
            digits_span,
            span: start.merge(self.prev_span()),
        })
    }

    /// Parses `{...}`: a concatenation or a replication.
    fn parse_concat(&mut self) -> Expr {
        let start = self.current_span();
        self.expect(TokenKind::OpenBrace);

        if self.at(TokenKind::CloseBrace) {
            self.advance();
            return Expr::Concat {
                parts: Vec::new(),
                span: start.merge(self.prev_span()),
            };
        }

        let first = self.parse_expr();

        // `{n{...}}` replication.
        if self.at(TokenKind::OpenBrace) {
            let inner = self.parse_concat();
            self.expect(TokenKind::CloseBrace);
            let span = start.merge(self.prev_span());
            return Expr::Replication {
                count: Box::new(first),
                inner: Box::new(inner),
                span,
            };
        }

        let mut parts = vec![first];
        while self.eat(TokenKind::Comma) {
            parts.push(self.parse_expr());
        }
        self.expect(TokenKind::CloseBrace);
        Expr::Concat {
            parts,
            span: start.merge(self.prev_span()),
        }
    }
}
