//! The compilation root: arenas, definitions, scopes, lookup, and lazy
//! resolution.
//!
//! A `Compilation` owns every symbol, scope, type, and bound expression of
//! one elaboration session. Syntax trees are fed in one at a time and must
//! outlive the compilation; elaboration is triggered by requesting
//! [`Compilation::root_instances`]. All lazy work (scope member
//! realization, declared-type resolution, parameter evaluation) runs on
//! demand behind `{NotStarted, InProgress, Resolved}` state machines with
//! cycle detection.

use crate::arena::Arena;
use crate::expr::{ExprId, Expression};
use crate::symbol::{
    DeclaredType, LookupLocation, ParameterData, ResolveState, Scope, ScopeId, ScopeState, Symbol,
    SymbolId, SymbolKind, TypeAliasData, TypeParameterData,
};
use crate::types::{FloatKind, IntegerKind, ScalarKind, Type, TypeDb, TypeId};
use crate::value::{ConstantRange, ConstantValue};
use sable_common::{Ident, Interner};
use sable_diagnostics::{DiagCode, Diagnostic, DiagnosticSink};
use sable_source::{SourceDb, Span};
use sable_syntax::ast::{
    self, DataType, DataTypeKind, Dimension, ForwardCategory, ModuleItem, ParamKind, Signing,
    TypeName,
};
use sable_syntax::SyntaxTree;
use std::collections::{HashMap, HashSet};

/// Configuration of a compilation.
#[derive(Clone, Debug)]
pub struct CompilationOptions {
    /// The maximum depth of the instance hierarchy; exceeding it refuses
    /// further instantiation instead of overflowing the stack.
    pub max_instance_depth: u32,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            max_instance_depth: 128,
        }
    }
}

/// Flags steering expression binding.
#[derive(Clone, Copy, Default, Debug)]
pub struct BindFlags {
    /// The expression must be constant; it is folded and cached.
    pub constant: bool,
    /// Hierarchical names are rejected even outside constant contexts.
    pub no_hierarchical: bool,
    /// The expression is an assignment target.
    pub assignment_allowed: bool,
    /// The expression appears in a procedural statement.
    pub procedural: bool,
}

/// Everything the binder needs to know about where an expression appears.
#[derive(Clone, Copy, Debug)]
pub struct BindContext {
    /// The scope the expression appears in.
    pub scope: ScopeId,
    /// The lookup location bounding visible declarations.
    pub location: LookupLocation,
    /// Binding flags.
    pub flags: BindFlags,
}

impl BindContext {
    /// A context at the end of the given scope.
    pub fn new(scope: ScopeId) -> Self {
        Self {
            scope,
            location: LookupLocation::after(scope),
            flags: BindFlags::default(),
        }
    }

    /// The same context with the constant flag set.
    pub fn constant(mut self) -> Self {
        self.flags.constant = true;
        self
    }
}

/// The root of an elaboration session.
pub struct Compilation<'a> {
    /// The shared string interner.
    pub interner: &'a Interner,
    /// The source database (read-only during elaboration).
    pub source_db: &'a SourceDb,
    /// The diagnostics sink.
    pub sink: &'a DiagnosticSink,
    /// The interned type table.
    pub types: TypeDb,
    pub(crate) symbols: Arena<SymbolId, Symbol<'a>>,
    pub(crate) scopes: Arena<ScopeId, Scope<'a>>,
    pub(crate) exprs: Arena<ExprId, Expression>,
    definitions: HashMap<Ident, SymbolId>,
    packages: HashMap<Ident, SymbolId>,
    root_scope: ScopeId,
    hierarchy_scope: ScopeId,
    pub(crate) options: CompilationOptions,
    /// Definition names that appear in some instantiation, for root
    /// detection.
    instantiated: HashSet<Ident>,
    /// Suppresses diagnostics during speculative constant probes.
    quiet: bool,
}

impl<'a> Compilation<'a> {
    /// Creates an empty compilation.
    pub fn new(
        interner: &'a Interner,
        source_db: &'a SourceDb,
        sink: &'a DiagnosticSink,
        options: CompilationOptions,
    ) -> Self {
        let mut scopes = Arena::new();
        let root_scope = scopes.alloc(Scope::new(None, None));
        let hierarchy_scope = scopes.alloc(Scope::new(None, Some(root_scope)));
        Self {
            interner,
            source_db,
            sink,
            types: TypeDb::new(),
            symbols: Arena::new(),
            scopes,
            exprs: Arena::new(),
            definitions: HashMap::new(),
            packages: HashMap::new(),
            root_scope,
            hierarchy_scope,
            options,
            instantiated: HashSet::new(),
            quiet: false,
        }
    }

    /// The compilation-unit (`$root`) scope holding definitions and
    /// packages.
    pub fn root_scope(&self) -> ScopeId {
        self.root_scope
    }

    /// The scope holding the instantiated hierarchy roots.
    pub fn hierarchy_scope(&self) -> ScopeId {
        self.hierarchy_scope
    }

    /// Emits a diagnostic at the code's default severity.
    pub(crate) fn diag(&self, code: DiagCode, msg: impl Into<String>, span: Span) {
        if self.quiet {
            return;
        }
        self.sink.emit(Diagnostic::new(code, msg, span));
    }

    /// Evaluates an expression without emitting diagnostics, for
    /// speculative probes (e.g. checking a possibly-constant index).
    pub(crate) fn try_eval_quiet(&mut self, expr: ExprId) -> Option<ConstantValue> {
        let saved = self.quiet;
        self.quiet = true;
        let value = self.eval_expr(expr);
        self.quiet = saved;
        value
    }

    /// Returns a symbol by ID.
    pub fn symbol(&self, id: SymbolId) -> &Symbol<'a> {
        &self.symbols[id]
    }

    /// Returns a scope by ID.
    pub fn scope(&self, id: ScopeId) -> &Scope<'a> {
        &self.scopes[id]
    }

    /// Enumerates the top-level definitions added so far.
    pub fn definitions(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.definitions.values().copied()
    }

    /// Looks up a definition by name.
    pub fn definition(&self, name: Ident) -> Option<SymbolId> {
        self.definitions.get(&name).copied()
    }

    /// The set of definition names instantiated by some other definition.
    pub(crate) fn instantiated_names(&self) -> &HashSet<Ident> {
        &self.instantiated
    }

    /// Visits every symbol created so far, in creation order.
    pub fn visit_symbols(&self, mut f: impl FnMut(SymbolId, &Symbol<'a>)) {
        for (id, symbol) in self.symbols.iter() {
            f(id, symbol);
        }
    }

    /// Visits every bound expression created so far, in creation order.
    pub fn visit_expressions(&self, mut f: impl FnMut(ExprId, &Expression)) {
        for (id, expr) in self.exprs.iter() {
            f(id, expr);
        }
    }

    // ========================================================================
    // Adding syntax
    // ========================================================================

    /// Adds a parsed syntax tree to the compilation.
    ///
    /// Definitions and packages become root symbols; their bodies remain
    /// deferred until first lookup.
    pub fn add_tree(&mut self, tree: &'a SyntaxTree) {
        for item in &tree.root.items {
            match item {
                ast::Item::Definition(def) => {
                    if let Some(&existing) = self.definitions.get(&def.name) {
                        let prev = self.symbols[existing].span;
                        self.diag(
                            DiagCode::DuplicateDefinition,
                            format!(
                                "duplicate definition `{}`",
                                self.interner.resolve(def.name)
                            ),
                            def.span,
                        );
                        let _ = prev;
                        continue;
                    }
                    let symbol = self.symbols.alloc(Symbol {
                        name: def.name,
                        span: def.span,
                        parent: self.root_scope,
                        decl_index: 0,
                        kind: SymbolKind::Definition(crate::symbol::DefinitionData {
                            def_kind: def.kind,
                            syntax: def,
                            default_nettype: tree.default_nettype,
                        }),
                    });
                    self.definitions.insert(def.name, symbol);
                    self.scopes[self.root_scope].members.push(symbol);
                    self.scopes[self.root_scope].index.insert(def.name, symbol);
                    // Self-instantiation does not disqualify a module from
                    // being a hierarchy root; the depth limit bounds it.
                    collect_instantiated(&def.items, Some(def.name), &mut self.instantiated);
                }
                ast::Item::Package(pkg) => {
                    if self.packages.contains_key(&pkg.name) {
                        self.diag(
                            DiagCode::DuplicateDefinition,
                            format!("duplicate package `{}`", self.interner.resolve(pkg.name)),
                            pkg.span,
                        );
                        continue;
                    }
                    let scope = self.scopes.alloc(Scope::new(None, Some(self.root_scope)));
                    for item in &pkg.items {
                        self.scopes[scope].deferred.push(item);
                    }
                    let symbol = self.symbols.alloc(Symbol {
                        name: pkg.name,
                        span: pkg.span,
                        parent: self.root_scope,
                        decl_index: 0,
                        kind: SymbolKind::Package { scope },
                    });
                    self.scopes[scope].owner = Some(symbol);
                    self.packages.insert(pkg.name, symbol);
                    self.scopes[self.root_scope].members.push(symbol);
                    self.scopes[self.root_scope].index.insert(pkg.name, symbol);
                }
                ast::Item::Error(_) => {}
            }
        }
    }

    /// The member scope of a package, realized.
    pub(crate) fn package_scope(&mut self, name: Ident) -> Option<ScopeId> {
        let symbol = self.packages.get(&name).copied()?;
        let scope = self.symbols[symbol].owned_scope()?;
        self.ensure_scope(scope);
        Some(scope)
    }

    // ========================================================================
    // Scope realization
    // ========================================================================

    /// Realizes a scope's deferred members, fixing its member order and
    /// completing the name index.
    pub(crate) fn ensure_scope(&mut self, scope: ScopeId) {
        match self.scopes[scope].state {
            ScopeState::Elaborated | ScopeState::InProgress => return,
            ScopeState::NotStarted => {}
        }
        self.scopes[scope].state = ScopeState::InProgress;

        // Instantiations are realized after all other members so that
        // implicit-net scanning of port connections sees the complete name
        // index, regardless of declaration order.
        let deferred = std::mem::take(&mut self.scopes[scope].deferred);
        for item in &deferred {
            if !matches!(item, ModuleItem::Instantiation(_)) {
                self.realize_item(scope, item);
            }
        }
        for item in &deferred {
            if matches!(item, ModuleItem::Instantiation(_)) {
                self.realize_item(scope, item);
            }
        }
        self.finalize_forward_typedefs(scope);
        self.scopes[scope].state = ScopeState::Elaborated;
    }

    /// Realizes one import declaration: wildcard imports contribute the
    /// package scope to the import candidate set; named imports alias the
    /// member directly into the index.
    pub(crate) fn realize_import_decl(&mut self, scope: ScopeId, import: &'a ast::ImportDecl) {
        for spec in &import.items {
            match spec.name {
                None => {
                    if let Some(pkg) = self.package_scope(spec.package) {
                        self.scopes[scope].wildcard_imports.push(pkg);
                    } else {
                        self.diag(
                            DiagCode::UndeclaredIdentifier,
                            format!(
                                "package `{}` is not declared",
                                self.interner.resolve(spec.package)
                            ),
                            spec.span,
                        );
                    }
                }
                Some(name) => {
                    let member = self
                        .package_scope(spec.package)
                        .and_then(|pkg| self.lookup_member(pkg, name));
                    match member {
                        Some(member) => {
                            self.scopes[scope].index.insert(name, member);
                        }
                        None => self.diag(
                            DiagCode::UnknownMember,
                            format!(
                                "`{}` is not a member of package `{}`",
                                self.interner.resolve(name),
                                self.interner.resolve(spec.package)
                            ),
                            spec.span,
                        ),
                    }
                }
            }
        }
    }

    /// Creates the symbols for one deferred body item.
    fn realize_item(&mut self, scope: ScopeId, item: &'a ModuleItem) {
        match item {
            ModuleItem::Import(import) => self.realize_import_decl(scope, import),
            ModuleItem::Param(decl) => self.realize_param(scope, decl, None),
            ModuleItem::Typedef(decl) => {
                let symbol = Symbol {
                    name: decl.name,
                    span: decl.span,
                    parent: scope,
                    decl_index: 0,
                    kind: SymbolKind::TypeAlias(TypeAliasData {
                        target: &decl.ty,
                        state: ResolveState::NotStarted,
                        resolved: None,
                        first_forward: None,
                    }),
                };
                self.add_member(scope, symbol);
            }
            ModuleItem::ForwardTypedef(decl) => {
                let symbol = Symbol {
                    name: decl.name,
                    span: decl.span,
                    parent: scope,
                    decl_index: 0,
                    kind: SymbolKind::ForwardingTypedef {
                        category: decl.category,
                        next: None,
                    },
                };
                self.add_member(scope, symbol);
            }
            ModuleItem::Data(decl) => {
                for declarator in &decl.declarators {
                    let declared = DeclaredType::new(
                        Some(&decl.ty),
                        &declarator.dims,
                        declarator.init.as_ref(),
                    );
                    let kind = match decl.net {
                        Some(net) => SymbolKind::Net { net, declared },
                        None => SymbolKind::Variable { declared },
                    };
                    let symbol = Symbol {
                        name: declarator.name,
                        span: declarator.span,
                        parent: scope,
                        decl_index: 0,
                        kind,
                    };
                    self.add_member(scope, symbol);
                }
            }
            ModuleItem::Port(decl) => {
                for declarator in &decl.declarators {
                    let declared = DeclaredType::new(
                        Some(&decl.data_type),
                        &declarator.dims,
                        declarator.init.as_ref(),
                    );
                    let symbol = Symbol {
                        name: declarator.name,
                        span: declarator.span,
                        parent: scope,
                        decl_index: 0,
                        kind: SymbolKind::Port {
                            direction: decl.direction.unwrap_or(ast::Direction::Inout),
                            declared,
                        },
                    };
                    self.add_member(scope, symbol);
                }
            }
            ModuleItem::Instantiation(inst) => {
                self.create_instances(scope, inst);
            }
            ModuleItem::Function(decl) => {
                let body_scope = self.scopes.alloc(Scope::new(None, Some(scope)));
                let symbol = Symbol {
                    name: decl.name,
                    span: decl.span,
                    parent: scope,
                    decl_index: 0,
                    kind: SymbolKind::Subroutine {
                        syntax: decl,
                        scope: body_scope,
                    },
                };
                let id = self.add_member(scope, symbol);
                self.scopes[body_scope].owner = Some(id);
                for arg in &decl.args {
                    let declared = DeclaredType::new(Some(&arg.ty), &[], arg.default.as_ref());
                    let arg_symbol = Symbol {
                        name: arg.name,
                        span: arg.span,
                        parent: body_scope,
                        decl_index: 0,
                        kind: SymbolKind::Variable { declared },
                    };
                    self.add_member(body_scope, arg_symbol);
                }
            }
            ModuleItem::Genvar(decl) => {
                for name in &decl.names {
                    let symbol = Symbol {
                        name: *name,
                        span: decl.span,
                        parent: scope,
                        decl_index: 0,
                        kind: SymbolKind::Genvar,
                    };
                    self.add_member(scope, symbol);
                }
            }
            ModuleItem::Generate(region) => {
                for item in &region.items {
                    self.realize_item(scope, item);
                }
            }
            // Generate loops and conditionals are accepted syntactically;
            // their expansion is not part of this front-end's core.
            ModuleItem::GenerateFor(_) | ModuleItem::GenerateIf(_) => {}
            ModuleItem::Modport(decl) => {
                let symbol = Symbol {
                    name: decl.name,
                    span: decl.span,
                    parent: scope,
                    decl_index: 0,
                    kind: SymbolKind::Modport { syntax: decl },
                };
                self.add_member(scope, symbol);
            }
            // Non-declarative items are bound when the scope's owner is
            // fully elaborated.
            ModuleItem::ContinuousAssign(_) | ModuleItem::Procedural(_) => {}
            ModuleItem::Error(_) => {}
        }
    }

    /// Creates parameter symbols for a declaration, applying instantiation
    /// overrides from `overrides` when given.
    pub(crate) fn realize_param(
        &mut self,
        scope: ScopeId,
        decl: &'a ast::ParamDecl,
        overrides: Option<&HashMap<Ident, &'a ast::Expr>>,
    ) {
        match &decl.kind {
            ParamKind::Value { ty, decls } => {
                for declarator in decls {
                    let declared = DeclaredType::new(
                        ty.as_ref(),
                        &declarator.dims,
                        declarator.init.as_ref(),
                    );
                    let override_init = overrides
                        .and_then(|overrides| overrides.get(&declarator.name))
                        .copied();
                    let symbol = Symbol {
                        name: declarator.name,
                        span: declarator.span,
                        parent: scope,
                        decl_index: 0,
                        kind: SymbolKind::Parameter(ParameterData {
                            declared,
                            local: decl.local,
                            is_port: decl.is_port,
                            override_init,
                            state: ResolveState::NotStarted,
                            value: None,
                        }),
                    };
                    self.add_member(scope, symbol);
                }
            }
            ParamKind::Type { decls } => {
                for declarator in decls {
                    let override_expr = overrides
                        .and_then(|overrides| overrides.get(&declarator.name))
                        .copied();
                    let symbol = Symbol {
                        name: declarator.name,
                        span: declarator.span,
                        parent: scope,
                        decl_index: 0,
                        kind: SymbolKind::TypeParameter(TypeParameterData {
                            default: declarator.default.as_ref(),
                            override_expr,
                            local: decl.local,
                            is_port: decl.is_port,
                            state: ResolveState::NotStarted,
                            resolved: None,
                        }),
                    };
                    self.add_member(scope, symbol);
                }
            }
        }
    }

    /// Inserts a symbol into a scope, assigning its declaration index and
    /// handling name collisions (forward typedefs chain; anything else is a
    /// duplicate).
    pub(crate) fn add_member(&mut self, scope: ScopeId, mut symbol: Symbol<'a>) -> SymbolId {
        symbol.decl_index = self.scopes[scope].members.len() as u32;
        let name = symbol.name;
        let is_forward = matches!(symbol.kind, SymbolKind::ForwardingTypedef { .. });
        let is_alias = matches!(symbol.kind, SymbolKind::TypeAlias(_));
        let span = symbol.span;

        let id = self.symbols.alloc(symbol);
        self.scopes[scope].members.push(id);

        match self.scopes[scope].index.get(&name).copied() {
            None => {
                self.scopes[scope].index.insert(name, id);
            }
            Some(existing) => {
                let existing_is_forward =
                    matches!(self.symbols[existing].kind, SymbolKind::ForwardingTypedef { .. });
                if is_alias && existing_is_forward {
                    // The real definition takes over the name.
                    self.scopes[scope].index.insert(name, id);
                } else if is_forward {
                    // Forward declarations may repeat freely.
                } else {
                    self.diag(
                        DiagCode::DuplicateDefinition,
                        format!("`{}` is already declared", self.interner.resolve(name)),
                        span,
                    );
                }
            }
        }
        id
    }

    /// Inserts a symbol as a member without indexing its name; instance
    /// array elements are reachable through the array, not by name.
    pub(crate) fn add_member_unindexed(&mut self, scope: ScopeId, mut symbol: Symbol<'a>) -> SymbolId {
        symbol.decl_index = self.scopes[scope].members.len() as u32;
        let id = self.symbols.alloc(symbol);
        self.scopes[scope].members.push(id);
        id
    }

    /// Chains forwarding typedefs onto their aliases and checks that each
    /// forward's declared category matches the resolved type.
    fn finalize_forward_typedefs(&mut self, scope: ScopeId) {
        let members = self.scopes[scope].members.clone();

        // Build per-name forward lists in declaration order.
        let mut forwards: HashMap<Ident, Vec<SymbolId>> = HashMap::new();
        for &member in &members {
            if matches!(self.symbols[member].kind, SymbolKind::ForwardingTypedef { .. }) {
                forwards.entry(self.symbols[member].name).or_default().push(member);
            }
        }
        if forwards.is_empty() {
            return;
        }

        // Link each list and attach its head to the alias.
        for (name, list) in &forwards {
            for pair in list.windows(2) {
                if let SymbolKind::ForwardingTypedef { next, .. } =
                    &mut self.symbols[pair[0]].kind
                {
                    *next = Some(pair[1]);
                }
            }
            let alias = members.iter().copied().find(|&m| {
                self.symbols[m].name == *name
                    && matches!(self.symbols[m].kind, SymbolKind::TypeAlias(_))
            });
            if let Some(alias) = alias {
                if let SymbolKind::TypeAlias(data) = &mut self.symbols[alias].kind {
                    data.first_forward = list.first().copied();
                }
                let resolved = self.symbol_type(alias);
                let canonical = self.types.canonical(resolved);
                let actual = match self.types.get(canonical) {
                    Type::Enum { .. } => ForwardCategory::Enum,
                    Type::PackedStruct { .. } | Type::UnpackedStruct { .. } => {
                        ForwardCategory::Struct
                    }
                    Type::PackedUnion { .. } | Type::UnpackedUnion { .. } => {
                        ForwardCategory::Union
                    }
                    _ => ForwardCategory::None,
                };
                for &forward in list {
                    let (category, span) = match &self.symbols[forward].kind {
                        SymbolKind::ForwardingTypedef { category, .. } => {
                            (*category, self.symbols[forward].span)
                        }
                        _ => continue,
                    };
                    if category != ForwardCategory::None && category != actual {
                        self.diag(
                            DiagCode::ForwardTypedefDoesNotMatch,
                            format!(
                                "forward typedef of `{}` does not match its definition",
                                self.interner.resolve(*name)
                            ),
                            span,
                        );
                    }
                }
            }
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Lexical lookup: the context scope, its wildcard imports, then parent
    /// scopes up to the compilation unit.
    ///
    /// In the location's own scope, constant contexts only see declarations
    /// that precede the location; a later declaration diagnoses
    /// `UsedBeforeDeclared`.
    pub(crate) fn lookup_name(&mut self, name: Ident, ctx: &BindContext) -> Option<SymbolId> {
        let mut current = Some(ctx.scope);
        while let Some(scope) = current {
            self.ensure_scope(scope);

            if let Some(&found) = self.scopes[scope].index.get(&name) {
                // Constant contexts only see constant-valued declarations
                // that textually precede the reference in its own scope.
                let positional = scope == ctx.location.scope
                    && ctx.flags.constant
                    && ctx.location.index != u32::MAX
                    && self.symbols[found].decl_index >= ctx.location.index
                    && (self.symbols[found].is_constant_value()
                        || matches!(self.symbols[found].kind, SymbolKind::TypeAlias(_)));
                if positional {
                    self.diag(
                        DiagCode::UsedBeforeDeclared,
                        format!(
                            "`{}` is used before it is declared",
                            self.interner.resolve(name)
                        ),
                        self.symbols[found].span,
                    );
                    return None;
                }
                return Some(found);
            }

            // Wildcard imports are searched after the scope's own members.
            let imports = self.scopes[scope].wildcard_imports.clone();
            for import in imports {
                self.ensure_scope(import);
                if let Some(&found) = self.scopes[import].index.get(&name) {
                    return Some(found);
                }
            }

            current = self.scopes[scope].parent;
        }
        None
    }

    /// Member lookup on an already-known scope.
    pub(crate) fn lookup_member(&mut self, scope: ScopeId, name: Ident) -> Option<SymbolId> {
        self.ensure_scope(scope);
        self.scopes[scope].index.get(&name).copied()
    }

    /// Hierarchical lookup of a dot-separated path from `$root`.
    ///
    /// The first segment names a root instance (or any member of the
    /// compilation unit); subsequent segments descend through scopes.
    /// Hierarchical lookups bypass positional restrictions.
    pub fn lookup_hierarchical(&mut self, path: &[Ident]) -> Option<SymbolId> {
        let (first, rest) = path.split_first()?;
        let mut symbol = self
            .lookup_member(self.hierarchy_scope, *first)
            .or_else(|| self.lookup_member(self.root_scope, *first))?;
        for segment in rest {
            let scope = self.symbols[symbol].owned_scope()?;
            symbol = self.lookup_member(scope, *segment)?;
        }
        Some(symbol)
    }

    // ========================================================================
    // Declared-type and parameter resolution
    // ========================================================================

    /// The type of a symbol, resolving lazily and memoizing.
    pub(crate) fn symbol_type(&mut self, id: SymbolId) -> TypeId {
        // Fast path: already resolved.
        if let Some(resolved) = self.resolved_type_of(id) {
            return resolved;
        }

        // Cycle detection.
        if self.mark_in_progress(id) {
            let name = self.symbols[id].name;
            self.diag(
                DiagCode::RecursiveResolution,
                format!(
                    "resolution of `{}` depends on itself",
                    self.interner.resolve(name)
                ),
                self.symbols[id].span,
            );
            let err = self.types.error();
            self.store_resolved_type(id, err);
            return err;
        }

        let parent = self.symbols[id].parent;
        let location = LookupLocation {
            scope: parent,
            index: self.symbols[id].decl_index,
        };

        // Copy the syntax handles out of the symbol so resolution below can
        // take `&mut self` freely.
        enum Shape<'b> {
            Declared(Option<&'b DataType>, &'b [Dimension]),
            Param(Option<&'b DataType>),
            TypeParam(Option<&'b ast::Expr>, Option<&'b DataType>),
            Alias(&'b DataType),
            Enum(TypeId),
            Subroutine(&'b DataType),
            Int,
            Other,
        }
        let shape = match &self.symbols[id].kind {
            SymbolKind::Variable { declared }
            | SymbolKind::Net { declared, .. }
            | SymbolKind::Port { declared, .. } => Shape::Declared(declared.ty, declared.dims),
            SymbolKind::Parameter(data) => Shape::Param(data.declared.ty),
            SymbolKind::TypeParameter(data) => {
                Shape::TypeParam(data.override_expr, data.default)
            }
            SymbolKind::TypeAlias(data) => Shape::Alias(data.target),
            SymbolKind::EnumValue { ty, .. } => Shape::Enum(*ty),
            SymbolKind::Subroutine { syntax, .. } => {
                let syntax: &'a ast::FunctionDecl = *syntax;
                Shape::Subroutine(&syntax.return_type)
            }
            SymbolKind::Genvar => Shape::Int,
            _ => Shape::Other,
        };

        let ty = match shape {
            Shape::Declared(syntax, dims) => {
                let base = match syntax {
                    Some(ty) => self.resolve_data_type(ty, parent, location),
                    None => self.types.logic(),
                };
                self.apply_unpacked_dims(base, dims, parent, location)
            }
            Shape::Param(syntax) => match syntax {
                Some(ty) if !matches!(ty.kind, DataTypeKind::Implicit) => {
                    self.resolve_data_type(ty, parent, location)
                }
                // An implicit parameter type follows its value.
                _ => match self.parameter_value(id) {
                    Some(ConstantValue::Vector(v)) => {
                        self.make_vector_type(v.width(), v.signed, true)
                    }
                    Some(ConstantValue::Real(_)) => {
                        self.types.intern(Type::Floating(FloatKind::Real))
                    }
                    Some(ConstantValue::Str(_)) => self.types.intern(Type::Str),
                    _ => self.types.int(),
                },
            },
            Shape::TypeParam(override_expr, default) => {
                let target = match (override_expr, default) {
                    (Some(expr), _) => self.resolve_type_expr(expr, parent, location),
                    (None, Some(ty)) => self.resolve_data_type(ty, parent, location),
                    (None, None) => self.types.error(),
                };
                self.types.intern(Type::Alias { symbol: id, target })
            }
            Shape::Alias(target_syntax) => {
                let target = self.resolve_data_type(target_syntax, parent, location);
                self.types.intern(Type::Alias { symbol: id, target })
            }
            Shape::Enum(ty) => ty,
            Shape::Subroutine(ret) => self.resolve_data_type(ret, parent, location),
            Shape::Int => self.types.int(),
            Shape::Other => self.types.error(),
        };

        self.store_resolved_type(id, ty);
        ty
    }

    /// Returns the memoized type of a symbol, if resolution finished.
    fn resolved_type_of(&self, id: SymbolId) -> Option<TypeId> {
        match &self.symbols[id].kind {
            SymbolKind::Variable { declared }
            | SymbolKind::Net { declared, .. }
            | SymbolKind::Port { declared, .. } => declared.resolved,
            SymbolKind::Parameter(data) => data.declared.resolved,
            SymbolKind::TypeParameter(data) => data.resolved,
            SymbolKind::TypeAlias(data) => data.resolved,
            SymbolKind::EnumValue { ty, .. } => Some(*ty),
            _ => None,
        }
    }

    /// Marks a symbol's type resolution in progress; returns `true` if it
    /// already was (a cycle).
    fn mark_in_progress(&mut self, id: SymbolId) -> bool {
        let state = match &mut self.symbols[id].kind {
            SymbolKind::Variable { declared }
            | SymbolKind::Net { declared, .. }
            | SymbolKind::Port { declared, .. } => &mut declared.state,
            SymbolKind::Parameter(data) => &mut data.declared.state,
            SymbolKind::TypeParameter(data) => &mut data.state,
            SymbolKind::TypeAlias(data) => &mut data.state,
            _ => return false,
        };
        if *state == ResolveState::InProgress {
            return true;
        }
        *state = ResolveState::InProgress;
        false
    }

    fn store_resolved_type(&mut self, id: SymbolId, ty: TypeId) {
        match &mut self.symbols[id].kind {
            SymbolKind::Variable { declared }
            | SymbolKind::Net { declared, .. }
            | SymbolKind::Port { declared, .. } => {
                declared.state = ResolveState::Resolved;
                declared.resolved = Some(ty);
            }
            SymbolKind::Parameter(data) => {
                data.declared.state = ResolveState::Resolved;
                data.declared.resolved = Some(ty);
            }
            SymbolKind::TypeParameter(data) => {
                data.state = ResolveState::Resolved;
                data.resolved = Some(ty);
            }
            SymbolKind::TypeAlias(data) => {
                data.state = ResolveState::Resolved;
                data.resolved = Some(ty);
            }
            _ => {}
        }
    }

    /// Evaluates a value parameter, memoizing the result.
    ///
    /// Overridden parameters are pre-resolved at instantiation time (their
    /// expressions bind at the instantiation site); only the declared
    /// default evaluates here, in the parameter's own scope. Cycles produce
    /// `RecursiveResolution` and a `None` value.
    pub(crate) fn parameter_value(&mut self, id: SymbolId) -> Option<ConstantValue> {
        let (state, default_init) = match &self.symbols[id].kind {
            SymbolKind::Parameter(data) => (data.state, data.declared.init),
            _ => return None,
        };
        match state {
            ResolveState::Resolved => {
                return match &self.symbols[id].kind {
                    SymbolKind::Parameter(data) => data.value.clone(),
                    _ => None,
                };
            }
            ResolveState::InProgress => {
                let name = self.symbols[id].name;
                self.diag(
                    DiagCode::RecursiveResolution,
                    format!(
                        "the value of parameter `{}` depends on itself",
                        self.interner.resolve(name)
                    ),
                    self.symbols[id].span,
                );
                if let SymbolKind::Parameter(data) = &mut self.symbols[id].kind {
                    data.state = ResolveState::Resolved;
                    data.value = None;
                }
                return None;
            }
            ResolveState::NotStarted => {}
        }
        if let SymbolKind::Parameter(data) = &mut self.symbols[id].kind {
            data.state = ResolveState::InProgress;
        }

        let parent = self.symbols[id].parent;
        let location = LookupLocation {
            scope: parent,
            index: self.symbols[id].decl_index,
        };

        let value = default_init.and_then(|init| {
            let ctx = BindContext {
                scope: parent,
                location,
                flags: BindFlags {
                    constant: true,
                    ..Default::default()
                },
            };
            let bound = self.bind_expr(init, ctx);
            // Convert to the declared type when one was written.
            let declared_ty = match &self.symbols[id].kind {
                SymbolKind::Parameter(data) => data.declared.ty,
                _ => None,
            };
            let value = self.exprs[bound].constant.clone();
            match (value, declared_ty) {
                (Some(value), Some(ty)) if !matches!(ty.kind, DataTypeKind::Implicit) => {
                    let target = self.resolve_data_type(ty, parent, location);
                    self.convert_constant(value, target)
                }
                (value, _) => value,
            }
        });

        if let SymbolKind::Parameter(data) = &mut self.symbols[id].kind {
            data.state = ResolveState::Resolved;
            data.value = value.clone();
        }
        value
    }

    /// Converts a constant to a resolved type, used for typed parameters.
    pub(crate) fn convert_constant(
        &mut self,
        value: ConstantValue,
        target: TypeId,
    ) -> Option<ConstantValue> {
        // Reuse the conversion logic from constant evaluation by building a
        // transient literal expression.
        let expr = self.alloc_expr(Expression {
            kind: crate::expr::ExprKind::Literal,
            ty: target,
            constant: Some(value),
            span: Span::DUMMY,
        });
        let converted = self.alloc_expr(Expression {
            kind: crate::expr::ExprKind::Conversion { operand: expr },
            ty: target,
            constant: None,
            span: Span::DUMMY,
        });
        self.eval_expr(converted)
    }

    // ========================================================================
    // Type resolution from syntax
    // ========================================================================

    /// Resolves a built-in keyword type (no user names, no dimensions).
    pub(crate) fn resolve_builtin_type(
        &mut self,
        kind: &DataTypeKind,
        signing: Option<Signing>,
        span: Span,
    ) -> TypeId {
        let signed_override = signing.map(|s| s == Signing::Signed);
        match kind {
            DataTypeKind::Logic => self.types.intern(Type::Scalar {
                kind: ScalarKind::Logic,
                signed: signed_override.unwrap_or(false),
            }),
            DataTypeKind::Bit => self.types.intern(Type::Scalar {
                kind: ScalarKind::Bit,
                signed: signed_override.unwrap_or(false),
            }),
            DataTypeKind::Reg => self.types.intern(Type::Scalar {
                kind: ScalarKind::Reg,
                signed: signed_override.unwrap_or(false),
            }),
            DataTypeKind::Byte => self.predefined(IntegerKind::Byte, signed_override),
            DataTypeKind::Shortint => self.predefined(IntegerKind::ShortInt, signed_override),
            DataTypeKind::Int => self.predefined(IntegerKind::Int, signed_override),
            DataTypeKind::Longint => self.predefined(IntegerKind::LongInt, signed_override),
            DataTypeKind::Integer => self.predefined(IntegerKind::Integer, signed_override),
            DataTypeKind::Time => self.predefined(IntegerKind::Time, signed_override),
            DataTypeKind::Real => self.types.intern(Type::Floating(FloatKind::Real)),
            DataTypeKind::Shortreal => self.types.intern(Type::Floating(FloatKind::ShortReal)),
            DataTypeKind::Realtime => self.types.intern(Type::Floating(FloatKind::RealTime)),
            DataTypeKind::StringType => self.types.intern(Type::Str),
            DataTypeKind::Void => self.types.intern(Type::Void),
            DataTypeKind::Implicit => self.types.intern(Type::Scalar {
                kind: ScalarKind::Logic,
                signed: signed_override.unwrap_or(false),
            }),
            _ => {
                self.diag(
                    DiagCode::ExpectedToken,
                    "a structured type is not valid here",
                    span,
                );
                self.types.error()
            }
        }
    }

    fn predefined(&mut self, kind: IntegerKind, signed_override: Option<bool>) -> TypeId {
        self.types.intern(Type::Predefined {
            kind,
            signed: signed_override.unwrap_or_else(|| kind.default_signed()),
        })
    }

    /// Resolves a data type syntax node in a scope.
    pub(crate) fn resolve_data_type(
        &mut self,
        syntax: &'a DataType,
        scope: ScopeId,
        location: LookupLocation,
    ) -> TypeId {
        let base = match &syntax.kind {
            DataTypeKind::Enum(decl) => self.resolve_enum_type(decl, scope, location),
            DataTypeKind::Struct(decl) => self.resolve_struct_type(decl, false, scope, location),
            DataTypeKind::Union(decl) => self.resolve_struct_type(decl, true, scope, location),
            DataTypeKind::Named(name) => {
                return self.resolve_named_type(name, syntax.span, scope, location);
            }
            other => self.resolve_builtin_type(other, syntax.signing, syntax.span),
        };

        self.apply_packed_dims(base, &syntax.packed_dims, syntax.signing, scope, location)
    }

    /// Re-interprets an expression assigned to a type parameter as a type.
    ///
    /// The parser binds `#(.T(my_type))` as an expression; a simple or
    /// scoped name resolves as a named type, a builtin keyword resolves
    /// directly, and anything else is `BadTypeParamExpr`.
    pub(crate) fn resolve_type_expr(
        &mut self,
        expr: &'a ast::Expr,
        scope: ScopeId,
        location: LookupLocation,
    ) -> TypeId {
        match expr {
            ast::Expr::Ident { name, span } => {
                self.resolve_named_type(&TypeName::Simple(*name), *span, scope, location)
            }
            ast::Expr::Scoped {
                package,
                name,
                span,
            } => self.resolve_named_type(
                &TypeName::Scoped {
                    package: *package,
                    name: *name,
                },
                *span,
                scope,
                location,
            ),
            ast::Expr::TypeRef { ty, span } => self.resolve_builtin_type(ty, None, *span),
            other => {
                self.diag(
                    DiagCode::BadTypeParamExpr,
                    "expected a type for this type parameter",
                    other.span(),
                );
                self.types.error()
            }
        }
    }

    /// Resolves a reference to a named type.
    fn resolve_named_type(
        &mut self,
        name: &TypeName,
        span: Span,
        scope: ScopeId,
        location: LookupLocation,
    ) -> TypeId {
        let symbol = match name {
            TypeName::Simple(ident) => {
                let ctx = BindContext {
                    scope,
                    location,
                    flags: BindFlags::default(),
                };
                self.lookup_name(*ident, &ctx)
            }
            TypeName::Scoped { package, name } => self
                .package_scope(*package)
                .and_then(|pkg| self.lookup_member(pkg, *name)),
        };

        let Some(symbol) = symbol else {
            let shown = match name {
                TypeName::Simple(ident) => self.interner.resolve(*ident).to_string(),
                TypeName::Scoped { package, name } => format!(
                    "{}::{}",
                    self.interner.resolve(*package),
                    self.interner.resolve(*name)
                ),
            };
            self.diag(
                DiagCode::UndeclaredIdentifier,
                format!("type `{shown}` is not declared"),
                span,
            );
            return self.types.error();
        };

        match &self.symbols[symbol].kind {
            SymbolKind::TypeAlias(_) | SymbolKind::TypeParameter(_) => self.symbol_type(symbol),
            SymbolKind::ForwardingTypedef { .. } => {
                // Only forward declarations exist; there is no real type.
                let shown = self.interner.resolve(self.symbols[symbol].name).to_string();
                self.diag(
                    DiagCode::UndeclaredIdentifier,
                    format!("type `{shown}` has only forward declarations"),
                    span,
                );
                self.types.error()
            }
            _ => {
                let shown = self.interner.resolve(self.symbols[symbol].name).to_string();
                self.diag(
                    DiagCode::UndeclaredIdentifier,
                    format!("`{shown}` is not a type"),
                    span,
                );
                self.types.error()
            }
        }
    }

    /// Resolves an enum declaration, creating its value symbols in the
    /// declaring scope.
    fn resolve_enum_type(
        &mut self,
        decl: &'a ast::EnumType,
        scope: ScopeId,
        location: LookupLocation,
    ) -> TypeId {
        let base = match &decl.base {
            Some(base) => self.resolve_data_type(base, scope, location),
            None => self.types.int(),
        };
        let width = self.types.bit_width(base).unwrap_or(32);
        let signed = self.types.is_signed(base);

        let mut values = Vec::new();
        let mut seen: HashMap<i64, Ident> = HashMap::new();
        let mut next = 0i64;
        for member in &decl.members {
            let value = match &member.value {
                Some(expr) => {
                    let ctx = BindContext {
                        scope,
                        location,
                        flags: BindFlags {
                            constant: true,
                            ..Default::default()
                        },
                    };
                    let bound = self.bind_expr(expr, ctx);
                    self.exprs[bound]
                        .constant
                        .as_ref()
                        .and_then(|v| v.to_i64())
                        .unwrap_or(next)
                }
                None => next,
            };
            next = value + 1;

            if let Some(prev) = seen.insert(value, member.name) {
                self.diag(
                    DiagCode::DuplicateEnumValue,
                    format!(
                        "enum value {value} is shared by `{}` and `{}`",
                        self.interner.resolve(prev),
                        self.interner.resolve(member.name)
                    ),
                    member.span,
                );
            }

            let constant = ConstantValue::Vector(crate::value::SvInt {
                value: sable_common::LogicVec::from_u64(value as u64, width.min(64))
                    .resize(width, value < 0),
                signed,
            });
            let symbol = Symbol {
                name: member.name,
                span: member.span,
                parent: scope,
                decl_index: 0,
                kind: SymbolKind::EnumValue {
                    ty: self.types.error(), // patched below
                    value: Some(constant),
                },
            };
            let id = self.add_member(scope, symbol);
            values.push(id);
        }

        let ty = self.types.intern(Type::Enum { base, values: values.clone() });
        for id in values {
            if let SymbolKind::EnumValue { ty: slot, .. } = &mut self.symbols[id].kind {
                *slot = ty;
            }
        }
        ty
    }

    /// Resolves a struct or union declaration.
    fn resolve_struct_type(
        &mut self,
        decl: &'a ast::StructType,
        is_union: bool,
        scope: ScopeId,
        location: LookupLocation,
    ) -> TypeId {
        let mut fields = Vec::new();
        for member in &decl.members {
            let ty = self.resolve_data_type(&member.ty, scope, location);
            for declarator in &member.declarators {
                let field_ty = self.apply_unpacked_dims(ty, &declarator.dims, scope, location);
                fields.push((declarator.name, field_ty));
            }
        }
        let ty = match (decl.packed, is_union) {
            (true, false) => Type::PackedStruct {
                fields,
                signed: decl.signed,
            },
            (false, false) => Type::UnpackedStruct { fields },
            (true, true) => Type::PackedUnion {
                fields,
                signed: decl.signed,
            },
            (false, true) => Type::UnpackedUnion { fields },
        };
        self.types.intern(ty)
    }

    /// Wraps a base type in packed dimensions, outermost first.
    fn apply_packed_dims(
        &mut self,
        base: TypeId,
        dims: &'a [ast::Range],
        signing: Option<Signing>,
        scope: ScopeId,
        location: LookupLocation,
    ) -> TypeId {
        let mut ty = base;
        let signed = signing == Some(Signing::Signed) || self.types.is_signed(base);
        for range in dims.iter().rev() {
            let Some(range) = self.eval_range(range, scope, location) else {
                return self.types.error();
            };
            ty = self.types.intern(Type::PackedArray {
                element: ty,
                range,
                signed,
            });
        }
        ty
    }

    /// Wraps a base type in unpacked dimensions.
    pub(crate) fn apply_unpacked_dims(
        &mut self,
        base: TypeId,
        dims: &'a [Dimension],
        scope: ScopeId,
        location: LookupLocation,
    ) -> TypeId {
        let mut ty = base;
        for dim in dims.iter().rev() {
            let range = match self.eval_dimension(dim, scope, location) {
                Some(range) => range,
                None => return self.types.error(),
            };
            ty = self.types.intern(Type::UnpackedArray { element: ty, range });
        }
        ty
    }

    /// Evaluates a `[l:r]` range to constant bounds.
    pub(crate) fn eval_range(
        &mut self,
        range: &'a ast::Range,
        scope: ScopeId,
        location: LookupLocation,
    ) -> Option<ConstantRange> {
        let ctx = BindContext {
            scope,
            location,
            flags: BindFlags {
                constant: true,
                ..Default::default()
            },
        };
        let left = self.bind_expr(&range.left, ctx);
        let right = self.bind_expr(&range.right, ctx);
        let lv = self.exprs[left].constant.as_ref().and_then(|v| v.to_i64())?;
        let rv = self.exprs[right].constant.as_ref().and_then(|v| v.to_i64())?;
        Some(ConstantRange::new(
            i32::try_from(lv).ok()?,
            i32::try_from(rv).ok()?,
        ))
    }

    /// Evaluates one dimension: a range, a size (`[N]` means `[0:N-1]`), or
    /// nothing for an unsized dimension.
    pub(crate) fn eval_dimension(
        &mut self,
        dim: &'a Dimension,
        scope: ScopeId,
        location: LookupLocation,
    ) -> Option<ConstantRange> {
        match dim {
            Dimension::Range(range) => self.eval_range(range, scope, location),
            Dimension::Size(expr) => {
                let ctx = BindContext {
                    scope,
                    location,
                    flags: BindFlags {
                        constant: true,
                        ..Default::default()
                    },
                };
                let bound = self.bind_expr(expr, ctx);
                let size = self.exprs[bound].constant.as_ref().and_then(|v| v.to_i64())?;
                if size <= 0 {
                    return None;
                }
                Some(ConstantRange::new(0, i32::try_from(size).ok()? - 1))
            }
            Dimension::Unsized(_) => None,
        }
    }
}

/// Collects the names of all definitions instantiated anywhere below the
/// given items, skipping `exclude` (the enclosing definition's own name).
fn collect_instantiated(items: &[ModuleItem], exclude: Option<Ident>, out: &mut HashSet<Ident>) {
    for item in items {
        match item {
            ModuleItem::Instantiation(inst) => {
                if Some(inst.definition) != exclude {
                    out.insert(inst.definition);
                }
            }
            ModuleItem::Generate(region) => collect_instantiated(&region.items, exclude, out),
            ModuleItem::GenerateFor(gen) => collect_instantiated(&gen.items, exclude, out),
            ModuleItem::GenerateIf(gen) => {
                collect_instantiated(&gen.then_items, exclude, out);
                collect_instantiated(&gen.else_items, exclude, out);
            }
            _ => {}
        }
    }
}
