//! Declaration and module-item parsing rules.
//!
//! Covers data types (built-in, enum, struct/union, named), declarators with
//! packed/unpacked dimensions, typedefs (including forward declarations),
//! parameters, variable and net declarations, hierarchy instantiations with
//! parameter and port connection lists, functions, generate constructs, and
//! modports.

use crate::ast::*;
use crate::parser::{Parser, ITEM_RECOVERY};
use crate::token::TokenKind;
use sable_diagnostics::DiagCode;

impl Parser<'_> {
    // ========================================================================
    // Data types
    // ========================================================================

    /// Parses a data type when one must be present.
    pub(crate) fn parse_data_type(&mut self) -> DataType {
        let start = self.current_span();
        let kind = match self.current() {
            TokenKind::Logic => {
                self.advance();
                DataTypeKind::Logic
            }
            TokenKind::Bit => {
                self.advance();
                DataTypeKind::Bit
            }
            TokenKind::Reg => {
                self.advance();
                DataTypeKind::Reg
            }
            TokenKind::Byte => {
                self.advance();
                DataTypeKind::Byte
            }
            TokenKind::Shortint => {
                self.advance();
                DataTypeKind::Shortint
            }
            TokenKind::Int => {
                self.advance();
                DataTypeKind::Int
            }
            TokenKind::Longint => {
                self.advance();
                DataTypeKind::Longint
            }
            TokenKind::Integer => {
                self.advance();
                DataTypeKind::Integer
            }
            TokenKind::Time => {
                self.advance();
                DataTypeKind::Time
            }
            TokenKind::Real => {
                self.advance();
                DataTypeKind::Real
            }
            TokenKind::Shortreal => {
                self.advance();
                DataTypeKind::Shortreal
            }
            TokenKind::Realtime => {
                self.advance();
                DataTypeKind::Realtime
            }
            TokenKind::StringKeyword => {
                self.advance();
                DataTypeKind::StringType
            }
            TokenKind::Void => {
                self.advance();
                DataTypeKind::Void
            }
            TokenKind::Enum => DataTypeKind::Enum(self.parse_enum_type()),
            TokenKind::Struct => DataTypeKind::Struct(self.parse_struct_type()),
            TokenKind::Union => DataTypeKind::Union(self.parse_struct_type()),
            kind if kind.is_identifier() => {
                let first = self.expect_ident();
                if self.eat(TokenKind::DoubleColon) {
                    let name = self.expect_ident();
                    DataTypeKind::Named(TypeName::Scoped {
                        package: first,
                        name,
                    })
                } else {
                    DataTypeKind::Named(TypeName::Simple(first))
                }
            }
            _ => {
                self.error(DiagCode::ExpectedToken, "expected a data type");
                DataTypeKind::Implicit
            }
        };

        let signing = self.parse_signing();
        let packed_dims = self.parse_packed_dims();
        DataType {
            kind,
            signing,
            packed_dims,
            span: start.merge(self.prev_span()),
        }
    }

    /// Parses a data type if one begins here (for parameters, where the type
    /// may be omitted entirely).
    pub(crate) fn parse_optional_data_type(&mut self) -> Option<DataType> {
        if self.current().is_data_type()
            || matches!(
                self.current(),
                TokenKind::Enum | TokenKind::Struct | TokenKind::Union
            )
        {
            return Some(self.parse_data_type());
        }
        // A named type only if an identifier follows it.
        if self.current().is_identifier() {
            let mut ahead = 1;
            if self.peek_kind(1) == TokenKind::DoubleColon {
                ahead = 3;
            }
            while self.peek_kind(ahead) == TokenKind::OpenBracket {
                ahead = self.skip_brackets_from(ahead);
            }
            if self.peek_kind(ahead).is_identifier() {
                return Some(self.parse_data_type());
            }
        }
        // Implicit type with signing or dimensions: `parameter signed [3:0] P`.
        if matches!(self.current(), TokenKind::Signed | TokenKind::Unsigned)
            || self.at(TokenKind::OpenBracket)
        {
            let start = self.current_span();
            let signing = self.parse_signing();
            let packed_dims = self.parse_packed_dims();
            return Some(DataType {
                kind: DataTypeKind::Implicit,
                signing,
                packed_dims,
                span: start.merge(self.prev_span()),
            });
        }
        None
    }

    /// Parses an optional data type for port declarations, producing an
    /// implicit type when only signing/dimensions (or nothing) is present.
    pub(crate) fn parse_optional_data_type_or_implicit(&mut self) -> DataType {
        let start = self.current_span();
        match self.parse_optional_data_type() {
            Some(ty) => ty,
            None => DataType::implicit(start),
        }
    }

    fn parse_signing(&mut self) -> Option<Signing> {
        if self.eat(TokenKind::Signed) {
            Some(Signing::Signed)
        } else if self.eat(TokenKind::Unsigned) {
            Some(Signing::Unsigned)
        } else {
            None
        }
    }

    /// Parses zero or more packed `[l:r]` dimensions.
    pub(crate) fn parse_packed_dims(&mut self) -> Vec<Range> {
        let mut dims = Vec::new();
        while self.at(TokenKind::OpenBracket) {
            let start = self.current_span();
            self.advance();
            let left = self.parse_expr();
            self.expect(TokenKind::Colon);
            let right = self.parse_expr();
            self.expect(TokenKind::CloseBracket);
            dims.push(Range {
                left,
                right,
                span: start.merge(self.prev_span()),
            });
        }
        dims
    }

    /// Returns the lookahead offset just past a balanced bracket group
    /// starting at `ahead`.
    fn skip_brackets_from(&self, mut ahead: usize) -> usize {
        let mut depth = 0usize;
        loop {
            match self.peek_kind(ahead) {
                TokenKind::OpenBracket => depth += 1,
                TokenKind::CloseBracket => {
                    depth -= 1;
                    if depth == 0 {
                        return ahead + 1;
                    }
                }
                TokenKind::Eof => return ahead,
                _ => {}
            }
            ahead += 1;
        }
    }

    fn parse_enum_type(&mut self) -> EnumType {
        let start = self.current_span();
        self.expect(TokenKind::Enum);

        let base = if !self.at(TokenKind::OpenBrace) {
            Some(Box::new(self.parse_data_type()))
        } else {
            None
        };

        self.expect(TokenKind::OpenBrace);
        let mut members = Vec::new();
        while !self.at(TokenKind::CloseBrace) && !self.at_eof() {
            let member_start = self.current_span();
            let name = self.expect_ident();
            let value = if self.eat(TokenKind::Equals) {
                Some(self.parse_expr())
            } else {
                None
            };
            members.push(EnumMemberDecl {
                name,
                value,
                span: member_start.merge(self.prev_span()),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseBrace);

        EnumType {
            base,
            members,
            span: start.merge(self.prev_span()),
        }
    }

    fn parse_struct_type(&mut self) -> StructType {
        let start = self.current_span();
        // Either `struct` or `union` brought us here.
        self.advance();
        let packed = self.eat(TokenKind::Packed);
        let signed = self.eat(TokenKind::Signed);

        self.expect(TokenKind::OpenBrace);
        let mut members = Vec::new();
        while !self.at(TokenKind::CloseBrace) && !self.at_eof() {
            let before = self.pos;
            let member_start = self.current_span();
            let ty = self.parse_data_type();
            let mut declarators = vec![self.parse_declarator()];
            while self.eat(TokenKind::Comma) {
                declarators.push(self.parse_declarator());
            }
            self.expect(TokenKind::Semicolon);
            members.push(StructMemberDecl {
                ty,
                declarators,
                span: member_start.merge(self.prev_span()),
            });
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::CloseBrace);

        StructType {
            packed,
            signed,
            members,
            span: start.merge(self.prev_span()),
        }
    }

    /// Parses a declarator: name, unpacked dimensions, optional initializer.
    pub(crate) fn parse_declarator(&mut self) -> Declarator {
        let start = self.current_span();
        let name = self.expect_ident();
        let dims = self.parse_unpacked_dims();
        let init = if self.eat(TokenKind::Equals) {
            Some(self.parse_expr())
        } else {
            None
        };
        Declarator {
            name,
            dims,
            init,
            span: start.merge(self.prev_span()),
        }
    }

    /// Parses zero or more unpacked dimensions after a name.
    pub(crate) fn parse_unpacked_dims(&mut self) -> Vec<Dimension> {
        let mut dims = Vec::new();
        while self.at(TokenKind::OpenBracket) {
            let start = self.current_span();
            self.advance();
            if self.eat(TokenKind::CloseBracket) {
                dims.push(Dimension::Unsized(start.merge(self.prev_span())));
                continue;
            }
            let first = self.parse_expr();
            if self.eat(TokenKind::Colon) {
                let right = self.parse_expr();
                self.expect(TokenKind::CloseBracket);
                dims.push(Dimension::Range(Range {
                    left: first,
                    right,
                    span: start.merge(self.prev_span()),
                }));
            } else {
                self.expect(TokenKind::CloseBracket);
                dims.push(Dimension::Size(first));
            }
        }
        dims
    }

    // ========================================================================
    // Module items
    // ========================================================================

    /// Parses body items until the given end keyword.
    pub(crate) fn parse_module_items(&mut self, outro: TokenKind) -> Vec<ModuleItem> {
        let mut items = Vec::new();
        while !self.at(outro) && !self.at_eof() {
            // Also stop at any of the other end keywords so a missing
            // `endmodule` cannot swallow the rest of the file.
            if matches!(
                self.current(),
                TokenKind::Endmodule
                    | TokenKind::Endinterface
                    | TokenKind::Endprogram
                    | TokenKind::Endpackage
            ) {
                break;
            }
            let before = self.pos;
            items.push(self.parse_module_item());
            if self.pos == before {
                // Recovery stopped on a token no production wants; skip it
                // so the loop always makes progress.
                self.advance();
            }
        }
        items
    }

    /// Parses one item of a definition or package body.
    pub(crate) fn parse_module_item(&mut self) -> ModuleItem {
        match self.current() {
            TokenKind::Import => ModuleItem::Import(self.parse_import_decl()),
            TokenKind::Parameter | TokenKind::Localparam => {
                let start = self.current_span();
                let local = self.at(TokenKind::Localparam);
                self.advance();
                let kind = self.parse_param_kind(false);
                self.expect(TokenKind::Semicolon);
                ModuleItem::Param(ParamDecl {
                    local,
                    is_port: false,
                    kind,
                    span: start.merge(self.prev_span()),
                })
            }
            TokenKind::Typedef => self.parse_typedef(),
            TokenKind::Genvar => {
                let start = self.current_span();
                self.advance();
                let mut names = vec![self.expect_ident()];
                while self.eat(TokenKind::Comma) {
                    names.push(self.expect_ident());
                }
                self.expect(TokenKind::Semicolon);
                ModuleItem::Genvar(GenvarDecl {
                    names,
                    span: start.merge(self.prev_span()),
                })
            }
            TokenKind::Generate => {
                let start = self.current_span();
                self.advance();
                let items = self.parse_module_items(TokenKind::Endgenerate);
                self.expect(TokenKind::Endgenerate);
                ModuleItem::Generate(GenerateRegion {
                    items,
                    span: start.merge(self.prev_span()),
                })
            }
            TokenKind::For => self.parse_generate_for(),
            TokenKind::If => self.parse_generate_if(),
            TokenKind::Modport => self.parse_modport(),
            TokenKind::Assign => self.parse_continuous_assign(),
            TokenKind::Initial => self.parse_procedural(ProceduralKind::Initial),
            TokenKind::Always => self.parse_procedural(ProceduralKind::Always),
            TokenKind::AlwaysComb => self.parse_procedural(ProceduralKind::AlwaysComb),
            TokenKind::AlwaysFf => self.parse_procedural(ProceduralKind::AlwaysFf),
            TokenKind::AlwaysLatch => self.parse_procedural(ProceduralKind::AlwaysLatch),
            TokenKind::Function => self.parse_function(),
            TokenKind::Input | TokenKind::Output | TokenKind::Inout => self.parse_body_port(),
            TokenKind::Var => {
                let start = self.current_span();
                self.advance();
                self.parse_data_decl(start, None)
            }
            kind if kind.is_net_type() => {
                let start = self.current_span();
                let net = self.eat_net_type();
                self.parse_data_decl(start, net)
            }
            kind if kind.is_data_type()
                || matches!(
                    kind,
                    TokenKind::Enum | TokenKind::Struct | TokenKind::Union
                ) =>
            {
                let start = self.current_span();
                self.parse_data_decl(start, None)
            }
            kind if kind.is_identifier() => self.parse_ident_item(),
            _ => {
                let span = self.skip_to(ITEM_RECOVERY);
                self.eat(TokenKind::Semicolon);
                ModuleItem::Error(span)
            }
        }
    }

    /// Parses a variable or net declaration whose type starts here.
    fn parse_data_decl(
        &mut self,
        start: sable_source::Span,
        net: Option<NetTypeKeyword>,
    ) -> ModuleItem {
        let ty = self.parse_optional_data_type_or_implicit();
        let mut declarators = vec![self.parse_declarator()];
        while self.eat(TokenKind::Comma) {
            declarators.push(self.parse_declarator());
        }
        self.expect(TokenKind::Semicolon);
        ModuleItem::Data(DataDecl {
            net,
            ty,
            declarators,
            span: start.merge(self.prev_span()),
        })
    }

    /// Parses an item that begins with an identifier: either a declaration
    /// using a named type, or a hierarchy instantiation.
    ///
    /// `name #(` is always an instantiation. Otherwise the shape
    /// `name name (` (with optional dimensions between) is an instantiation,
    /// and anything else is a declaration.
    fn parse_ident_item(&mut self) -> ModuleItem {
        if self.peek_kind(1) == TokenKind::Hash {
            return self.parse_instantiation();
        }

        let mut ahead = 1;
        if self.peek_kind(1) == TokenKind::DoubleColon {
            ahead = 3;
        }
        while self.peek_kind(ahead) == TokenKind::OpenBracket {
            ahead = self.skip_brackets_from(ahead);
        }
        if self.peek_kind(ahead).is_identifier() {
            let mut after = ahead + 1;
            while self.peek_kind(after) == TokenKind::OpenBracket {
                after = self.skip_brackets_from(after);
            }
            if self.peek_kind(after) == TokenKind::OpenParen {
                return self.parse_instantiation();
            }
            let start = self.current_span();
            return self.parse_data_decl(start, None);
        }

        let span = self.skip_to(ITEM_RECOVERY);
        self.eat(TokenKind::Semicolon);
        ModuleItem::Error(span)
    }

    /// Parses `typedef`, deciding between a full alias and a forward
    /// declaration.
    fn parse_typedef(&mut self) -> ModuleItem {
        let start = self.current_span();
        self.expect(TokenKind::Typedef);

        // Forward forms: `typedef name;`, `typedef enum name;`,
        // `typedef struct name;`, `typedef union name;`,
        // `typedef class name;`, `typedef interface class name;`
        let forward = match self.current() {
            TokenKind::Enum if self.peek_kind(1).is_identifier()
                && self.peek_kind(2) == TokenKind::Semicolon =>
            {
                Some(ForwardCategory::Enum)
            }
            TokenKind::Struct if self.peek_kind(1).is_identifier()
                && self.peek_kind(2) == TokenKind::Semicolon =>
            {
                Some(ForwardCategory::Struct)
            }
            TokenKind::Union if self.peek_kind(1).is_identifier()
                && self.peek_kind(2) == TokenKind::Semicolon =>
            {
                Some(ForwardCategory::Union)
            }
            TokenKind::Class => Some(ForwardCategory::Class),
            TokenKind::Interface if self.peek_kind(1) == TokenKind::Class => {
                Some(ForwardCategory::InterfaceClass)
            }
            kind if kind.is_identifier() && self.peek_kind(1) == TokenKind::Semicolon => {
                Some(ForwardCategory::None)
            }
            _ => None,
        };

        if let Some(category) = forward {
            match category {
                ForwardCategory::Enum | ForwardCategory::Struct | ForwardCategory::Union
                | ForwardCategory::Class => self.advance(),
                ForwardCategory::InterfaceClass => {
                    self.advance();
                    self.advance();
                }
                ForwardCategory::None => {}
            }
            let name = self.expect_ident();
            self.expect(TokenKind::Semicolon);
            return ModuleItem::ForwardTypedef(ForwardTypedefDecl {
                category,
                name,
                span: start.merge(self.prev_span()),
            });
        }

        let ty = self.parse_data_type();
        let name = self.expect_ident();
        let dims = self.parse_unpacked_dims();
        self.expect(TokenKind::Semicolon);
        ModuleItem::Typedef(TypedefDecl {
            ty,
            name,
            dims,
            span: start.merge(self.prev_span()),
        })
    }

    /// Parses a non-ANSI port declaration in the body.
    fn parse_body_port(&mut self) -> ModuleItem {
        let start = self.current_span();
        let direction = match self.current() {
            TokenKind::Input => Direction::Input,
            TokenKind::Output => Direction::Output,
            _ => Direction::Inout,
        };
        self.advance();

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
        let mut declarators = vec![self.parse_declarator()];
        while self.eat(TokenKind::Comma) {
            declarators.push(self.parse_declarator());
        }
        self.expect(TokenKind::Semicolon);

        ModuleItem::Port(PortDecl {
            direction: Some(direction),
            kind,
            data_type,
            declarators,
            span: start.merge(self.prev_span()),
        })
    }

    // ========================================================================
    // Instantiation
    // ========================================================================

    /// Parses `name #(params) inst1 (...), inst2 (...);`.
    fn parse_instantiation(&mut self) -> ModuleItem {
        let start = self.current_span();
        let definition_span = self.current_span();
        let definition = self.expect_ident();

        let params = if self.at(TokenKind::Hash) {
            self.advance();
            self.parse_param_assignments()
        } else {
            Vec::new()
        };

        let mut instances = Vec::new();
        loop {
            let inst_start = self.current_span();
            let name = self.expect_ident();
            let dims = self.parse_unpacked_dims();
            self.expect(TokenKind::OpenParen);
            let connections = self.parse_port_connections();
            self.expect(TokenKind::CloseParen);
            instances.push(HierarchicalInstance {
                name,
                dims,
                connections,
                span: inst_start.merge(self.prev_span()),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semicolon);

        ModuleItem::Instantiation(HierarchyInstantiation {
            definition,
            definition_span,
            params,
            instances,
            span: start.merge(self.prev_span()),
        })
    }

    /// Parses the `#( ... )` parameter value assignments.
    fn parse_param_assignments(&mut self) -> Vec<ParamAssignment> {
        self.expect(TokenKind::OpenParen);
        let mut assignments = Vec::new();
        if self.eat(TokenKind::CloseParen) {
            return assignments;
        }
        loop {
            let start = self.current_span();
            if self.at(TokenKind::Dot) {
                self.advance();
                let name = self.expect_ident();
                self.expect(TokenKind::OpenParen);
                let value = if self.at(TokenKind::CloseParen) {
                    None
                } else {
                    Some(self.parse_expr())
                };
                self.expect(TokenKind::CloseParen);
                assignments.push(ParamAssignment::Named {
                    name,
                    value,
                    span: start.merge(self.prev_span()),
                });
            } else {
                let value = self.parse_expr();
                assignments.push(ParamAssignment::Ordered {
                    value,
                    span: start.merge(self.prev_span()),
                });
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParen);
        assignments
    }

    /// Parses the port connection list of one instance.
    fn parse_port_connections(&mut self) -> Vec<PortConnection> {
        let mut connections = Vec::new();
        if self.at(TokenKind::CloseParen) {
            return connections;
        }
        loop {
            let start = self.current_span();
            if self.eat(TokenKind::DotStar) {
                connections.push(PortConnection::Wildcard(start));
            } else if self.at(TokenKind::Dot) {
                self.advance();
                let name = self.expect_ident();
                let expr = if self.eat(TokenKind::OpenParen) {
                    let expr = if self.at(TokenKind::CloseParen) {
                        None
                    } else {
                        Some(self.parse_expr())
                    };
                    self.expect(TokenKind::CloseParen);
                    expr
                } else {
                    // `.name` shorthand connects the like-named signal.
                    Some(Expr::Ident {
                        name,
                        span: start.merge(self.prev_span()),
                    })
                };
                connections.push(PortConnection::Named {
                    name,
                    expr,
                    span: start.merge(self.prev_span()),
                });
            } else if self.at(TokenKind::Comma) || self.at(TokenKind::CloseParen) {
                connections.push(PortConnection::Ordered {
                    expr: None,
                    span: start,
                });
            } else {
                let expr = self.parse_expr();
                connections.push(PortConnection::Ordered {
                    expr: Some(expr),
                    span: start.merge(self.prev_span()),
                });
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        connections
    }

    // ========================================================================
    // Behavioral items
    // ========================================================================

    fn parse_continuous_assign(&mut self) -> ModuleItem {
        let start = self.current_span();
        self.expect(TokenKind::Assign);
        let mut assignments = Vec::new();
        loop {
            let target = self.parse_expr();
            self.expect(TokenKind::Equals);
            let value = self.parse_expr();
            assignments.push((target, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Semicolon);
        ModuleItem::ContinuousAssign(AssignDecl {
            assignments,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_procedural(&mut self, kind: ProceduralKind) -> ModuleItem {
        let start = self.current_span();
        self.advance();
        let body = self.parse_statement();
        ModuleItem::Procedural(ProceduralBlock {
            kind,
            body,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_function(&mut self) -> ModuleItem {
        let start = self.current_span();
        self.expect(TokenKind::Function);
        let automatic = self.eat(TokenKind::Automatic);

        // Return type, or void when the name follows directly.
        let return_type = if self.current().is_identifier()
            && matches!(
                self.peek_kind(1),
                TokenKind::OpenParen | TokenKind::Semicolon
            ) {
            DataType {
                kind: DataTypeKind::Void,
                signing: None,
                packed_dims: Vec::new(),
                span: self.current_span(),
            }
        } else {
            self.parse_data_type()
        };
        let name = self.expect_ident();

        let mut args = Vec::new();
        if self.eat(TokenKind::OpenParen) {
            if !self.at(TokenKind::CloseParen) {
                let mut last_dir = Direction::Input;
                loop {
                    let arg_start = self.current_span();
                    let direction = match self.current() {
                        TokenKind::Input => {
                            self.advance();
                            Direction::Input
                        }
                        TokenKind::Output => {
                            self.advance();
                            Direction::Output
                        }
                        TokenKind::Inout => {
                            self.advance();
                            Direction::Inout
                        }
                        _ => last_dir,
                    };
                    last_dir = direction;
                    let ty = self.parse_optional_data_type_or_implicit();
                    let arg_name = self.expect_ident();
                    let default = if self.eat(TokenKind::Equals) {
                        Some(self.parse_expr())
                    } else {
                        None
                    };
                    args.push(FunctionArg {
                        direction,
                        ty,
                        name: arg_name,
                        default,
                        span: arg_start.merge(self.prev_span()),
                    });
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::CloseParen);
        }
        self.expect(TokenKind::Semicolon);

        let mut body = Vec::new();
        while !self.at(TokenKind::Endfunction) && !self.at_eof() {
            if matches!(
                self.current(),
                TokenKind::Endmodule | TokenKind::Endinterface | TokenKind::Endpackage
            ) {
                break;
            }
            let before = self.pos;
            body.push(self.parse_statement());
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(TokenKind::Endfunction);
        let end_label = self.parse_end_label();

        ModuleItem::Function(FunctionDecl {
            automatic,
            return_type,
            name,
            args,
            body,
            end_label,
            span: start.merge(self.prev_span()),
        })
    }

    // ========================================================================
    // Generate constructs
    // ========================================================================

    fn parse_generate_for(&mut self) -> ModuleItem {
        let start = self.current_span();
        self.expect(TokenKind::For);
        self.expect(TokenKind::OpenParen);
        // `genvar` may be declared inline.
        self.eat(TokenKind::Genvar);
        let genvar = self.expect_ident();
        self.expect(TokenKind::Equals);
        let init = self.parse_expr();
        self.expect(TokenKind::Semicolon);
        let cond = self.parse_expr();
        self.expect(TokenKind::Semicolon);
        // The step is `i = expr`, `i++`, or `++i`; the loop variable is
        // already known, so only the updating expression is kept.
        let step = if self.current().is_identifier() && self.peek_kind(1) == TokenKind::Equals {
            self.expect_ident();
            self.expect(TokenKind::Equals);
            self.parse_expr()
        } else {
            self.parse_expr()
        };
        self.expect(TokenKind::CloseParen);

        let mut label = None;
        let mut items = Vec::new();
        if self.eat(TokenKind::Begin) {
            if self.eat(TokenKind::Colon) {
                label = Some(self.expect_ident());
            }
            while !self.at(TokenKind::End) && !self.at_eof() {
                let before = self.pos;
                items.push(self.parse_module_item());
                if self.pos == before {
                    self.advance();
                }
            }
            self.expect(TokenKind::End);
            self.parse_end_label();
        } else {
            items.push(self.parse_module_item());
        }

        ModuleItem::GenerateFor(GenerateFor {
            genvar,
            init,
            cond,
            step,
            label,
            items,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_generate_if(&mut self) -> ModuleItem {
        let start = self.current_span();
        self.expect(TokenKind::If);
        self.expect(TokenKind::OpenParen);
        let cond = self.parse_expr();
        self.expect(TokenKind::CloseParen);

        let then_items = self.parse_generate_branch();
        let else_items = if self.eat(TokenKind::Else) {
            self.parse_generate_branch()
        } else {
            Vec::new()
        };

        ModuleItem::GenerateIf(GenerateIf {
            cond,
            then_items,
            else_items,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_generate_branch(&mut self) -> Vec<ModuleItem> {
        let mut items = Vec::new();
        if self.eat(TokenKind::Begin) {
            if self.eat(TokenKind::Colon) {
                self.expect_ident();
            }
            while !self.at(TokenKind::End) && !self.at_eof() {
                let before = self.pos;
                items.push(self.parse_module_item());
                if self.pos == before {
                    self.advance();
                }
            }
            self.expect(TokenKind::End);
            self.parse_end_label();
        } else {
            items.push(self.parse_module_item());
        }
        items
    }

    fn parse_modport(&mut self) -> ModuleItem {
        let start = self.current_span();
        self.expect(TokenKind::Modport);
        let name = self.expect_ident();
        self.expect(TokenKind::OpenParen);

        let mut ports = Vec::new();
        let mut dir = Direction::Input;
        if !self.at(TokenKind::CloseParen) {
            loop {
                match self.current() {
                    TokenKind::Input => {
                        self.advance();
                        dir = Direction::Input;
                    }
                    TokenKind::Output => {
                        self.advance();
                        dir = Direction::Output;
                    }
                    TokenKind::Inout => {
                        self.advance();
                        dir = Direction::Inout;
                    }
                    _ => {}
                }
                let port = self.expect_ident();
                ports.push((dir, port));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::CloseParen);
        self.expect(TokenKind::Semicolon);

        ModuleItem::Modport(ModportDecl {
            name,
            ports,
            span: start.merge(self.prev_span()),
        })
    }
}
