//! Procedural statement parsing rules.
//!
//! Covers blocks, conditionals, case statements, loops, blocking and
//! nonblocking assignments (including compound operators), event and delay
//! controls, jumps, and local variable declarations inside blocks.

use crate::ast::*;
use crate::parser::Parser;
use crate::token::TokenKind;

/// Recovery set for statements.
const STMT_RECOVERY: &[TokenKind] = &[
    TokenKind::Semicolon,
    TokenKind::End,
    TokenKind::Endcase,
    TokenKind::Endfunction,
    TokenKind::Endmodule,
];

impl Parser<'_> {
    /// Parses one statement.
    pub(crate) fn parse_statement(&mut self) -> Statement {
        let start = self.current_span();
        match self.current() {
            TokenKind::Begin => self.parse_block(),
            TokenKind::If => self.parse_if(None),
            TokenKind::Unique | TokenKind::Priority => {
                let qualifier = if self.at(TokenKind::Unique) {
                    CaseQualifier::Unique
                } else {
                    CaseQualifier::Priority
                };
                self.advance();
                match self.current() {
                    TokenKind::If => self.parse_if(Some(qualifier)),
                    TokenKind::Case | TokenKind::Casex | TokenKind::Casez => {
                        self.parse_case(Some(qualifier))
                    }
                    _ => {
                        self.error(
                            sable_diagnostics::DiagCode::ExpectedToken,
                            "expected 'if' or 'case' after qualifier",
                        );
                        self.parse_statement()
                    }
                }
            }
            TokenKind::Case | TokenKind::Casex | TokenKind::Casez => self.parse_case(None),
            TokenKind::For => self.parse_for(),
            TokenKind::While => {
                self.advance();
                self.expect(TokenKind::OpenParen);
                let cond = self.parse_expr();
                self.expect(TokenKind::CloseParen);
                let body = self.parse_statement();
                let span = start.merge(self.prev_span());
                Statement::While {
                    cond,
                    body: Box::new(body),
                    span,
                }
            }
            TokenKind::Do => {
                self.advance();
                let body = self.parse_statement();
                self.expect(TokenKind::While);
                self.expect(TokenKind::OpenParen);
                let cond = self.parse_expr();
                self.expect(TokenKind::CloseParen);
                self.expect(TokenKind::Semicolon);
                let span = start.merge(self.prev_span());
                Statement::DoWhile {
                    body: Box::new(body),
                    cond,
                    span,
                }
            }
            TokenKind::Repeat => {
                self.advance();
                self.expect(TokenKind::OpenParen);
                let count = self.parse_expr();
                self.expect(TokenKind::CloseParen);
                let body = self.parse_statement();
                let span = start.merge(self.prev_span());
                Statement::Repeat {
                    count,
                    body: Box::new(body),
                    span,
                }
            }
            TokenKind::Forever => {
                self.advance();
                let body = self.parse_statement();
                let span = start.merge(self.prev_span());
                Statement::Forever {
                    body: Box::new(body),
                    span,
                }
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr())
                };
                self.expect(TokenKind::Semicolon);
                Statement::Return {
                    value,
                    span: start.merge(self.prev_span()),
                }
            }
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon);
                Statement::Break(start.merge(self.prev_span()))
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon);
                Statement::Continue(start.merge(self.prev_span()))
            }
            TokenKind::Semicolon => {
                self.advance();
                Statement::Null(start)
            }
            TokenKind::At => {
                self.advance();
                let sensitivity = self.parse_sensitivity();
                let body = self.parse_statement();
                let span = start.merge(self.prev_span());
                Statement::Timed {
                    sensitivity,
                    body: Box::new(body),
                    span,
                }
            }
            TokenKind::Hash => {
                self.advance();
                let delay = self.parse_delay_value();
                let body = self.parse_statement();
                let span = start.merge(self.prev_span());
                Statement::Delayed {
                    delay,
                    body: Box::new(body),
                    span,
                }
            }
            kind if kind.is_data_type()
                || kind == TokenKind::Var
                || matches!(kind, TokenKind::Enum | TokenKind::Struct | TokenKind::Union) =>
            {
                self.parse_local_var_decl()
            }
            kind if kind.is_identifier() && self.looks_like_decl() => self.parse_local_var_decl(),
            _ => self.parse_expression_statement(),
        }
    }

    /// Lookahead: `name name` or `pkg::name name` begins a declaration.
    fn looks_like_decl(&self) -> bool {
        let mut ahead = 1;
        if self.peek_kind(1) == TokenKind::DoubleColon {
            ahead = 3;
        }
        self.peek_kind(ahead).is_identifier()
    }

    fn parse_block(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(TokenKind::Begin);
        let label = if self.eat(TokenKind::Colon) {
            Some(self.expect_ident())
        } else {
            None
        };

        let mut body = Vec::new();
        while !self.at(TokenKind::End) && !self.at_eof() {
            // Bail out of obviously runaway bodies at definition ends.
            if matches!(
                self.current(),
                TokenKind::Endmodule | TokenKind::Endfunction | TokenKind::Endcase
            ) {
                break;
            }
            let before = self.pos;
            body.push(self.parse_statement());
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::End);
        self.parse_end_label();

        Statement::Block {
            label,
            body,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_if(&mut self, qualifier: Option<CaseQualifier>) -> Statement {
        let start = self.current_span();
        self.expect(TokenKind::If);
        self.expect(TokenKind::OpenParen);
        let cond = self.parse_expr();
        self.expect(TokenKind::CloseParen);
        let then_stmt = self.parse_statement();
        let else_stmt = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_statement()))
        } else {
            None
        };
        let span = start.merge(self.prev_span());
        Statement::If {
            qualifier,
            cond,
            then_stmt: Box::new(then_stmt),
            else_stmt,
            span,
        }
    }

    fn parse_case(&mut self, qualifier: Option<CaseQualifier>) -> Statement {
        let start = self.current_span();
        let keyword = match self.current() {
            TokenKind::Casex => CaseKeyword::Casex,
            TokenKind::Casez => CaseKeyword::Casez,
            _ => CaseKeyword::Case,
        };
        self.advance();
        self.expect(TokenKind::OpenParen);
        let expr = self.parse_expr();
        self.expect(TokenKind::CloseParen);

        let mut items = Vec::new();
        while !self.at(TokenKind::Endcase) && !self.at_eof() {
            if matches!(
                self.current(),
                TokenKind::Endmodule | TokenKind::Endfunction | TokenKind::End
            ) {
                break;
            }
            let before = self.pos;
            let item_start = self.current_span();
            let mut exprs = Vec::new();
            if self.eat(TokenKind::Default) {
                self.eat(TokenKind::Colon);
            } else {
                loop {
                    exprs.push(self.parse_expr());
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::Colon);
            }
            let body = self.parse_statement();
            items.push(CaseItem {
                exprs,
                body,
                span: item_start.merge(self.prev_span()),
            });
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::Endcase);

        Statement::Case {
            qualifier,
            keyword,
            expr,
            items,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_for(&mut self) -> Statement {
        let start = self.current_span();
        self.expect(TokenKind::For);
        self.expect(TokenKind::OpenParen);

        let init = if self.at(TokenKind::Semicolon) {
            self.advance();
            Statement::Null(self.prev_span())
        } else if self.current().is_data_type() || self.looks_like_decl() {
            self.parse_local_var_decl()
        } else {
            let stmt = self.parse_assignment_or_expr_statement(false);
            self.expect(TokenKind::Semicolon);
            stmt
        };

        let cond = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr())
        };
        self.expect(TokenKind::Semicolon);

        let step = if self.at(TokenKind::CloseParen) {
            None
        } else {
            Some(Box::new(self.parse_assignment_or_expr_statement(false)))
        };
        self.expect(TokenKind::CloseParen);

        let body = self.parse_statement();
        let span = start.merge(self.prev_span());
        Statement::For {
            init: Box::new(init),
            cond,
            step,
            body: Box::new(body),
            span,
        }
    }

    /// Parses a local variable declaration and its terminating semicolon.
    fn parse_local_var_decl(&mut self) -> Statement {
        let start = self.current_span();
        self.eat(TokenKind::Var);
        let ty = self.parse_optional_data_type_or_implicit();
        let mut declarators = vec![self.parse_declarator()];
        while self.eat(TokenKind::Comma) {
            declarators.push(self.parse_declarator());
        }
        self.expect(TokenKind::Semicolon);
        Statement::VarDecl(DataDecl {
            net: None,
            ty,
            declarators,
            span: start.merge(self.prev_span()),
        })
    }

    /// Parses a statement that begins with an expression: an assignment
    /// (blocking, nonblocking, or compound) or a bare expression.
    fn parse_expression_statement(&mut self) -> Statement {
        let stmt = self.parse_assignment_or_expr_statement(true);
        if matches!(stmt, Statement::Error(_)) {
            return stmt;
        }
        self.expect(TokenKind::Semicolon);
        stmt
    }

    /// Parses `lhs = rhs`, `lhs <= rhs`, `lhs op= rhs`, or a bare
    /// expression; does not consume the trailing semicolon.
    fn parse_assignment_or_expr_statement(&mut self, recover: bool) -> Statement {
        let start = self.current_span();
        // Parse the target above relational precedence so that `a <= b` reads
        // as a nonblocking assignment rather than a comparison.
        let target = self.parse_expr_bp(14);

        if matches!(target, Expr::Error(_)) && recover {
            let span = self.skip_to(STMT_RECOVERY);
            self.eat(TokenKind::Semicolon);
            return Statement::Error(start.merge(span));
        }

        if self.eat(TokenKind::Equals) {
            let value = self.parse_expr();
            let span = start.merge(self.prev_span());
            return Statement::Assign {
                target,
                value,
                nonblocking: false,
                op: None,
                span,
            };
        }

        if self.eat(TokenKind::LessThanEquals) {
            let value = self.parse_expr();
            let span = start.merge(self.prev_span());
            return Statement::Assign {
                target,
                value,
                nonblocking: true,
                op: None,
                span,
            };
        }

        if let Some(op) = self.current_as_compound_op() {
            self.advance();
            let value = self.parse_expr();
            let span = start.merge(self.prev_span());
            return Statement::Assign {
                target,
                value,
                nonblocking: false,
                op: Some(op),
                span,
            };
        }

        let span = start.merge(self.prev_span());
        Statement::ExprStmt { expr: target, span }
    }

    /// Maps a compound assignment token to its underlying binary operator.
    fn current_as_compound_op(&self) -> Option<BinaryOp> {
        let op = match self.current() {
            TokenKind::PlusEquals => BinaryOp::Add,
            TokenKind::MinusEquals => BinaryOp::Sub,
            TokenKind::StarEquals => BinaryOp::Mul,
            TokenKind::SlashEquals => BinaryOp::Div,
            TokenKind::PercentEquals => BinaryOp::Mod,
            TokenKind::AmpersandEquals => BinaryOp::BitAnd,
            TokenKind::PipeEquals => BinaryOp::BitOr,
            TokenKind::CaretEquals => BinaryOp::BitXor,
            TokenKind::LeftShiftEquals => BinaryOp::Shl,
            TokenKind::RightShiftEquals => BinaryOp::Shr,
            TokenKind::TripleLeftShiftEquals => BinaryOp::AShl,
            TokenKind::TripleRightShiftEquals => BinaryOp::AShr,
            _ => return None,
        };
        Some(op)
    }

    /// Parses the sensitivity after `@`.
    fn parse_sensitivity(&mut self) -> Sensitivity {
        if self.eat(TokenKind::Star) {
            return Sensitivity::Star;
        }
        self.expect(TokenKind::OpenParen);
        if self.eat(TokenKind::Star) {
            self.expect(TokenKind::CloseParen);
            return Sensitivity::Star;
        }

        let mut items = Vec::new();
        loop {
            let start = self.current_span();
            let edge = match self.current() {
                TokenKind::Posedge => {
                    self.advance();
                    Some(EdgeKind::Posedge)
                }
                TokenKind::Negedge => {
                    self.advance();
                    Some(EdgeKind::Negedge)
                }
                TokenKind::Edge => {
                    self.advance();
                    Some(EdgeKind::Edge)
                }
                _ => None,
            };
            let expr = self.parse_expr();
            items.push(EventItem {
                edge,
                expr,
                span: start.merge(self.prev_span()),
            });
            if !self.eat(TokenKind::Or) && !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen);
        Sensitivity::List(items)
    }

    /// Parses the delay value after `#`.
    fn parse_delay_value(&mut self) -> Expr {
        if self.at(TokenKind::OpenParen) {
            self.advance();
            let expr = self.parse_expr();
            self.expect(TokenKind::CloseParen);
            expr
        } else {
            // A bare delay is a primary, not a full expression.
            self.parse_expr_bp(23)
        }
    }
}
