//! Core parser infrastructure and top-level parsing rules.
//!
//! The `Parser` struct provides primitive operations (advance, expect, eat)
//! and panic-mode error recovery over skip sets, while top-level methods
//! parse source files, definitions (modules, interfaces, programs),
//! packages, port lists, and parameter port lists. Declaration, statement,
//! and expression rules live in the sibling modules.
//!
//! The parser never alters the token stream it was given; recovery discards
//! positions, not tokens, so the stream held by the
//! [`SyntaxTree`](crate::SyntaxTree) still reproduces the source.

use crate::ast::*;
use crate::token::{Token, TokenKind};
use sable_common::{Ident, Interner};
use sable_diagnostics::{DiagCode, Diagnostic, DiagnosticSink};
use sable_source::{SourceDb, Span};

/// Tokens that recovery stops at inside a definition body.
pub(crate) const ITEM_RECOVERY: &[TokenKind] = &[
    TokenKind::Semicolon,
    TokenKind::Endmodule,
    TokenKind::Endinterface,
    TokenKind::Endprogram,
    TokenKind::Endpackage,
    TokenKind::End,
    TokenKind::Endcase,
    TokenKind::Endfunction,
    TokenKind::Endgenerate,
    TokenKind::Comma,
    TokenKind::CloseParen,
];

/// A recursive descent parser with panic-mode recovery.
///
/// Consumes a preprocessed token stream and builds a [`SourceUnit`] AST.
/// Errors are reported to the diagnostic sink and represented as `Error`
/// poison nodes so a tree always comes back, covering every input token.
pub struct Parser<'a> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) source_db: &'a SourceDb,
    pub(crate) interner: &'a Interner,
    pub(crate) sink: &'a DiagnosticSink,
}

impl<'a> Parser<'a> {
    /// Creates a parser over a preprocessed token stream.
    pub fn new(
        tokens: Vec<Token>,
        source_db: &'a SourceDb,
        interner: &'a Interner,
        sink: &'a DiagnosticSink,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            source_db,
            interner,
            sink,
        }
    }

    /// Consumes the parser, returning the token stream back.
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    // ========================================================================
    // Primitive operations
    // ========================================================================

    pub(crate) fn current(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    pub(crate) fn current_token(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    pub(crate) fn current_text(&self) -> &'a str {
        self.source_db.snippet(self.current_span())
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.current() == TokenKind::Eof
    }

    pub(crate) fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    pub(crate) fn advance(&mut self) {
        if !self.at_eof() {
            self.pos += 1;
        }
    }

    /// Consumes the current token if it matches. Returns `true` if consumed.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Requires the current token to match, diagnosing `ExpectedToken` and
    /// continuing without consuming anything if it does not.
    pub(crate) fn expect(&mut self, kind: TokenKind) {
        if !self.eat(kind) {
            self.sink.emit(Diagnostic::new(
                DiagCode::ExpectedToken,
                format!("expected {kind:?}, found {:?}", self.current()),
                self.current_span(),
            ));
        }
    }

    /// Requires an identifier, returning a placeholder name if absent.
    pub(crate) fn expect_ident(&mut self) -> Ident {
        if self.current().is_identifier() {
            let token = self.current_token();
            let ident = self
                .interner
                .get_or_intern(token.identifier_text(self.current_text()));
            self.advance();
            ident
        } else {
            self.sink.emit(Diagnostic::new(
                DiagCode::ExpectedIdentifier,
                format!("expected an identifier, found {:?}", self.current()),
                self.current_span(),
            ));
            self.interner.get_or_intern("<missing>")
        }
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> TokenKind {
        let idx = self.pos + offset;
        if idx < self.tokens.len() {
            self.tokens[idx].kind
        } else {
            TokenKind::Eof
        }
    }

    // ========================================================================
    // Error handling and recovery
    // ========================================================================

    pub(crate) fn error(&self, code: DiagCode, msg: impl Into<String>) {
        self.sink
            .emit(Diagnostic::new(code, msg, self.current_span()));
    }

    /// Discards tokens until one in the skip set (or EOF), diagnosing a
    /// single `UnexpectedToken` for the whole skipped region.
    pub(crate) fn skip_to(&mut self, skip: &[TokenKind]) -> Span {
        let start = self.current_span();
        let mut end = start;
        let mut skipped = false;
        while !self.at_eof() && !skip.contains(&self.current()) {
            end = self.current_span();
            self.advance();
            skipped = true;
        }
        let span = start.merge(end);
        if skipped {
            self.sink.emit(Diagnostic::new(
                DiagCode::UnexpectedToken,
                "unexpected tokens skipped",
                span,
            ));
        }
        span
    }

    // ========================================================================
    // Top-level parsing
    // ========================================================================

    /// Parses a complete source file.
    pub fn parse_source_unit(&mut self) -> SourceUnit {
        let start = self.current_span();
        let mut items = Vec::new();

        while !self.at_eof() {
            match self.current() {
                TokenKind::Module => {
                    items.push(Item::Definition(self.parse_definition(
                        DefinitionKind::Module,
                        TokenKind::Module,
                        TokenKind::Endmodule,
                    )));
                }
                TokenKind::Interface => {
                    items.push(Item::Definition(self.parse_definition(
                        DefinitionKind::Interface,
                        TokenKind::Interface,
                        TokenKind::Endinterface,
                    )));
                }
                TokenKind::Program => {
                    items.push(Item::Definition(self.parse_definition(
                        DefinitionKind::Program,
                        TokenKind::Program,
                        TokenKind::Endprogram,
                    )));
                }
                TokenKind::Package => {
                    items.push(Item::Package(self.parse_package()));
                }
                _ => {
                    let span = self.current_span();
                    self.error(
                        DiagCode::UnexpectedToken,
                        "expected 'module', 'interface', 'program', or 'package'",
                    );
                    self.advance();
                    items.push(Item::Error(span));
                }
            }
        }

        let span = if items.is_empty() {
            start
        } else {
            start.merge(self.prev_span())
        };
        SourceUnit { items, span }
    }

    /// Parses a module, interface, or program definition.
    fn parse_definition(
        &mut self,
        kind: DefinitionKind,
        intro: TokenKind,
        outro: TokenKind,
    ) -> DefinitionDecl {
        let start = self.current_span();
        self.expect(intro);
        let name = self.expect_ident();

        // Header imports: `module m import p::*; #(...) (...);`
        let mut imports = Vec::new();
        while self.at(TokenKind::Import) {
            imports.push(self.parse_import_decl());
        }

        let params = if self.at(TokenKind::Hash) {
            self.parse_parameter_port_list()
        } else {
            Vec::new()
        };

        let (port_style, ports, port_names) = if self.at(TokenKind::OpenParen) {
            self.parse_port_list()
        } else {
            (PortStyle::Empty, Vec::new(), Vec::new())
        };

        self.expect(TokenKind::Semicolon);

        let items = self.parse_module_items(outro);

        self.expect(outro);
        let end_label = self.parse_end_label();
        let span = start.merge(self.prev_span());

        DefinitionDecl {
            kind,
            name,
            imports,
            params,
            port_style,
            ports,
            port_names,
            items,
            end_label,
            span,
        }
    }

    /// Parses a package declaration.
    fn parse_package(&mut self) -> PackageDecl {
        let start = self.current_span();
        self.expect(TokenKind::Package);
        let name = self.expect_ident();
        self.expect(TokenKind::Semicolon);

        let items = self.parse_module_items(TokenKind::Endpackage);

        self.expect(TokenKind::Endpackage);
        let end_label = self.parse_end_label();
        let span = start.merge(self.prev_span());

        PackageDecl {
            name,
            items,
            end_label,
            span,
        }
    }

    /// Parses an optional end label (`: name` after `endmodule`).
    pub(crate) fn parse_end_label(&mut self) -> Option<Ident> {
        if self.eat(TokenKind::Colon) {
            Some(self.expect_ident())
        } else {
            None
        }
    }

    // ========================================================================
    // Parameter port lists
    // ========================================================================

    /// Parses `#( parameter ... , localparam ... )`.
    fn parse_parameter_port_list(&mut self) -> Vec<ParamDecl> {
        self.expect(TokenKind::Hash);
        self.expect(TokenKind::OpenParen);
        let mut params = Vec::new();

        if self.at(TokenKind::CloseParen) {
            self.advance();
            return params;
        }

        // The parameter/localparam keyword may be omitted after the first
        // entry; the previous keyword is inherited.
        let mut last_local = false;
        loop {
            let start = self.current_span();
            if self.eat(TokenKind::Parameter) {
                last_local = false;
            } else if self.eat(TokenKind::Localparam) {
                last_local = true;
            }

            let kind = self.parse_param_kind(true);
            let span = start.merge(self.prev_span());
            params.push(ParamDecl {
                local: last_local,
                is_port: true,
                kind,
                span,
            });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen);
        params
    }

    /// Parses the part of a parameter declaration after the keyword.
    ///
    /// In a parameter port list (`in_port_list`), a comma separates whole
    /// parameter entries, so each entry holds a single declarator; in a body
    /// declaration a comma continues the declarator list.
    pub(crate) fn parse_param_kind(&mut self, in_port_list: bool) -> ParamKind {
        if self.eat(TokenKind::Type) {
            let mut decls = Vec::new();
            loop {
                let start = self.current_span();
                let name = self.expect_ident();
                let default = if self.eat(TokenKind::Equals) {
                    Some(self.parse_data_type())
                } else {
                    None
                };
                decls.push(TypeParamDecl {
                    name,
                    default,
                    span: start.merge(self.prev_span()),
                });
                if in_port_list || !self.at(TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
            return ParamKind::Type { decls };
        }

        let ty = self.parse_optional_data_type();
        let mut decls = Vec::new();
        loop {
            decls.push(self.parse_declarator());
            if in_port_list || !self.at(TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        ParamKind::Value { ty, decls }
    }

    // ========================================================================
    // Port lists
    // ========================================================================

    /// Parses the parenthesized port list, deciding ANSI vs non-ANSI style.
    fn parse_port_list(&mut self) -> (PortStyle, Vec<PortDecl>, Vec<Ident>) {
        self.expect(TokenKind::OpenParen);

        if self.eat(TokenKind::CloseParen) {
            return (PortStyle::Empty, Vec::new(), Vec::new());
        }

        // Non-ANSI style lists bare names: `module m(a, b, c);`
        if self.current().is_identifier()
            && matches!(
                self.peek_kind(1),
                TokenKind::Comma | TokenKind::CloseParen
            )
        {
            let mut names = vec![self.expect_ident()];
            while self.eat(TokenKind::Comma) {
                names.push(self.expect_ident());
            }
            self.expect(TokenKind::CloseParen);
            return (PortStyle::NonAnsi, Vec::new(), names);
        }

        let mut ports = Vec::new();
        loop {
            ports.push(self.parse_ansi_port());
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen);
        (PortStyle::Ansi, ports, Vec::new())
    }

    /// Parses one ANSI port declaration.
    fn parse_ansi_port(&mut self) -> PortDecl {
        let start = self.current_span();

        let direction = match self.current() {
            TokenKind::Input => {
                self.advance();
                Some(Direction::Input)
            }
            TokenKind::Output => {
                self.advance();
                Some(Direction::Output)
            }
            TokenKind::Inout => {
                self.advance();
                Some(Direction::Inout)
            }
            _ => None,
        };

        // Interface port: `bus_if.modport name` or `bus_if name`.
        if direction.is_none()
            && self.current().is_identifier()
            && matches!(self.peek_kind(1), TokenKind::Dot)
            && self.peek_kind(3).is_identifier()
        {
            let interface = self.expect_ident();
            self.expect(TokenKind::Dot);
            let modport = Some(self.expect_ident());
            let declarator = self.parse_declarator();
            let span = start.merge(self.prev_span());
            return PortDecl {
                direction: None,
                kind: PortKind::Interface { interface, modport },
                data_type: DataType::implicit(span),
                declarators: vec![declarator],
                span,
            };
        }
        if direction.is_none()
            && self.current().is_identifier()
            && self.peek_kind(1).is_identifier()
        {
            let interface = self.expect_ident();
            let declarator = self.parse_declarator();
            let span = start.merge(self.prev_span());
            return PortDecl {
                direction: None,
                kind: PortKind::Interface {
                    interface,
                    modport: None,
                },
                data_type: DataType::implicit(span),
                declarators: vec![declarator],
                span,
            };
        }

        let kind = if let Some(net) = self.eat_net_type() {
            PortKind::Net(net)
        } else if self.eat(TokenKind::Var) {
            PortKind::Variable
        } else if self.current().is_data_type() {
            PortKind::Variable
        } else {
            PortKind::Implicit
        };

        let data_type = self.parse_optional_data_type_or_implicit();
        let declarator = self.parse_declarator();
        let span = start.merge(self.prev_span());

        PortDecl {
            direction,
            kind,
            data_type,
            declarators: vec![declarator],
            span,
        }
    }

    /// Consumes a net type keyword if present.
    pub(crate) fn eat_net_type(&mut self) -> Option<NetTypeKeyword> {
        let net = match self.current() {
            TokenKind::Wire => NetTypeKeyword::Wire,
            TokenKind::Tri => NetTypeKeyword::Tri,
            TokenKind::Tri0 => NetTypeKeyword::Tri0,
            TokenKind::Tri1 => NetTypeKeyword::Tri1,
            TokenKind::Wand => NetTypeKeyword::Wand,
            TokenKind::Wor => NetTypeKeyword::Wor,
            TokenKind::Trireg => NetTypeKeyword::Trireg,
            TokenKind::Uwire => NetTypeKeyword::Uwire,
            TokenKind::Supply0 => NetTypeKeyword::Supply0,
            TokenKind::Supply1 => NetTypeKeyword::Supply1,
            _ => return None,
        };
        self.advance();
        Some(net)
    }

    /// Parses an import declaration: `import p::*, q::name;`
    pub(crate) fn parse_import_decl(&mut self) -> ImportDecl {
        let start = self.current_span();
        self.expect(TokenKind::Import);
        let mut items = Vec::new();
        loop {
            let item_start = self.current_span();
            let package = self.expect_ident();
            self.expect(TokenKind::DoubleColon);
            let name = if self.eat(TokenKind::Star) {
                None
            } else {
                Some(self.expect_ident())
            };
            items.push(ImportItem {
                package,
                name,
                span: item_start.merge(self.prev_span()),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semicolon);
        ImportDecl {
            items,
            span: start.merge(self.prev_span()),
        }
    }
}
