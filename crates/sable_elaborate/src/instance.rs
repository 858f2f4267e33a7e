//! Hierarchy instantiation: parameter override matching, instance array
//! recursion, depth limiting, and implicit net creation.
//!
//! Parameters are evaluated once per instantiation in a temporary scope
//! parented to the definition's enclosing scope, then cloned into each
//! concrete instance. The depth limit walks the instantiating scope's
//! owner chain so that a self-instantiating module is diagnosed at the
//! configured depth instead of overflowing the stack.

use crate::compilation::{BindContext, BindFlags, Compilation};
use crate::symbol::{
    DeclaredType, InstanceData, LookupLocation, ResolveState, Scope, ScopeId, Symbol, SymbolId,
    SymbolKind,
};
use sable_common::Ident;
use sable_diagnostics::DiagCode;
use sable_syntax::ast::{
    self, DefinitionKind, Expr, HierarchyInstantiation, ModuleItem, NetTypeKeyword,
    ParamAssignment, PortConnection, Statement,
};
use sable_syntax::preproc::DefaultNetType;
use std::collections::{HashMap, HashSet};

impl<'a> Compilation<'a> {
    /// Elaborates one `HierarchyInstantiation` item inside `scope`.
    pub(crate) fn create_instances(&mut self, scope: ScopeId, syntax: &'a HierarchyInstantiation) {
        // 1. Resolve the definition.
        let Some(definition) = self.definition(syntax.definition) else {
            self.diag(
                DiagCode::UnknownModule,
                format!(
                    "unknown module `{}`",
                    self.interner.resolve(syntax.definition)
                ),
                syntax.definition_span,
            );
            return;
        };

        // 2. Match parameter assignments against the declared parameters.
        let overrides = self.match_param_assignments(definition, syntax);

        // 3. Evaluate the overridden parameters once in a temporary scope;
        //    override expressions bind at the instantiation site.
        let shared_params = self.evaluate_shared_params(definition, &overrides, scope, syntax.span);

        // 5. Check the hierarchy depth before creating anything.
        let depth = self.hierarchy_depth_of(scope) + 1;
        let max = self.options.max_instance_depth;
        if depth > max {
            self.diag(
                DiagCode::MaxInstanceDepthExceeded,
                format!("maximum instance depth of {max} exceeded"),
                syntax.definition_span,
            );
            return;
        }

        // 6. Create implicit nets for unresolved names in port connections,
        //    then recurse through instance dimensions.
        let mut implicit_seen = HashSet::new();
        for instance in &syntax.instances {
            self.create_implicit_nets(scope, instance, &mut implicit_seen);

            let mut path = Vec::new();
            self.recurse_instance_array(
                scope,
                definition,
                instance,
                &shared_params,
                &instance.dims,
                &mut path,
                depth,
                true,
            );
        }
    }

    /// Builds the override map `name → value syntax` from an instantiation's
    /// parameter assignment list, diagnosing every malformed combination.
    fn match_param_assignments(
        &mut self,
        definition: SymbolId,
        syntax: &'a HierarchyInstantiation,
    ) -> HashMap<Ident, &'a Expr> {
        let def_syntax = match &self.symbols[definition].kind {
            SymbolKind::Definition(data) => data.syntax,
            _ => return HashMap::new(),
        };
        let def_name = self.symbols[definition].name;

        // The overridable parameters, in declaration order.
        struct Formal {
            name: Ident,
            local: bool,
            is_port: bool,
        }
        let mut formals = Vec::new();
        for param in &def_syntax.params {
            match &param.kind {
                ast::ParamKind::Value { decls, .. } => {
                    for decl in decls {
                        formals.push(Formal {
                            name: decl.name,
                            local: param.local,
                            is_port: true,
                        });
                    }
                }
                ast::ParamKind::Type { decls } => {
                    for decl in decls {
                        formals.push(Formal {
                            name: decl.name,
                            local: param.local,
                            is_port: true,
                        });
                    }
                }
            }
        }
        // Body parameters are only overridable when there is no parameter
        // port list.
        if def_syntax.params.is_empty() {
            for item in &def_syntax.items {
                if let ModuleItem::Param(param) = item {
                    if param.local {
                        continue;
                    }
                    match &param.kind {
                        ast::ParamKind::Value { decls, .. } => {
                            for decl in decls {
                                formals.push(Formal {
                                    name: decl.name,
                                    local: false,
                                    is_port: false,
                                });
                            }
                        }
                        ast::ParamKind::Type { decls } => {
                            for decl in decls {
                                formals.push(Formal {
                                    name: decl.name,
                                    local: false,
                                    is_port: false,
                                });
                            }
                        }
                    }
                }
            }
        }

        let mut overrides: HashMap<Ident, &'a Expr> = HashMap::new();
        if syntax.params.is_empty() {
            return overrides;
        }

        // An instantiation uses either all-ordered or all-named form.
        let mut saw_any = false;
        let mut ordered_form = true;
        let mut ordered: Vec<&'a Expr> = Vec::new();
        let mut named: HashMap<Ident, (&'a ParamAssignment, Option<&'a Expr>)> = HashMap::new();
        for assignment in &syntax.params {
            let is_ordered = matches!(assignment, ParamAssignment::Ordered { .. });
            if !saw_any {
                saw_any = true;
                ordered_form = is_ordered;
            } else if is_ordered != ordered_form {
                self.diag(
                    DiagCode::MixingOrderedAndNamedParams,
                    "cannot mix ordered and named parameter assignments",
                    assignment.span(),
                );
                break;
            }
            match assignment {
                ParamAssignment::Ordered { value, .. } => ordered.push(value),
                ParamAssignment::Named { name, value, span } => {
                    if named
                        .insert(*name, (assignment, value.as_ref()))
                        .is_some()
                    {
                        self.diag(
                            DiagCode::DuplicateParamAssignment,
                            format!(
                                "parameter `{}` is assigned more than once",
                                self.interner.resolve(*name)
                            ),
                            *span,
                        );
                    }
                }
            }
        }

        if ordered_form {
            let mut index = 0usize;
            for formal in &formals {
                if index >= ordered.len() {
                    break;
                }
                if formal.local {
                    continue;
                }
                overrides.insert(formal.name, ordered[index]);
                index += 1;
            }
            if index < ordered.len() {
                self.diag(
                    DiagCode::TooManyParamAssignments,
                    format!(
                        "too many parameter assignments for `{}`: {} given, {} accepted",
                        self.interner.resolve(def_name),
                        ordered.len(),
                        index
                    ),
                    syntax.span,
                );
            }
        } else {
            let mut used: HashSet<Ident> = HashSet::new();
            for formal in &formals {
                let Some((assignment, value)) = named.get(&formal.name) else {
                    continue;
                };
                used.insert(formal.name);
                if formal.local {
                    let code = if formal.is_port {
                        DiagCode::AssignedToLocalPortParam
                    } else {
                        DiagCode::AssignedToLocalBodyParam
                    };
                    self.diag(
                        code,
                        format!(
                            "`{}` is a localparam and cannot be overridden",
                            self.interner.resolve(formal.name)
                        ),
                        assignment.span(),
                    );
                    continue;
                }
                // A named assignment with no value means "use the default".
                if let Some(value) = value {
                    overrides.insert(formal.name, value);
                }
            }
            for (name, (assignment, _)) in &named {
                if !used.contains(name) {
                    self.diag(
                        DiagCode::ParameterDoesNotExist,
                        format!(
                            "`{}` is not a parameter of `{}`",
                            self.interner.resolve(*name),
                            self.interner.resolve(def_name)
                        ),
                        assignment.span(),
                    );
                }
            }
        }

        overrides
    }

    /// Builds the shared parameter set for one instantiation.
    ///
    /// All parameters (port list and body) are realized once into a
    /// temporary scope and cloned per instance. Overridden parameters are
    /// evaluated eagerly here, binding the override expression in the
    /// *instantiating* scope; parameters taking their defaults stay
    /// unevaluated and resolve lazily inside the instance, where the
    /// definition's own types and imports are visible.
    fn evaluate_shared_params(
        &mut self,
        definition: SymbolId,
        overrides: &HashMap<Ident, &'a Expr>,
        inst_scope: ScopeId,
        inst_span: sable_source::Span,
    ) -> Vec<SymbolId> {
        let (def_syntax, def_name) = match &self.symbols[definition].kind {
            SymbolKind::Definition(data) => (data.syntax, self.symbols[definition].name),
            _ => return Vec::new(),
        };

        // The temporary scope sees the definition's imports, since
        // parameters may depend on them.
        let temp = self.scopes.alloc(Scope::new(None, Some(self.root_scope())));
        for import in &def_syntax.imports {
            self.realize_import_decl(temp, import);
        }
        for param in &def_syntax.params {
            self.realize_param(temp, param, Some(overrides));
        }
        for item in &def_syntax.items {
            if let ModuleItem::Param(param) = item {
                self.realize_param(temp, param, Some(overrides));
            }
        }

        let inst_ctx = BindContext {
            scope: inst_scope,
            location: LookupLocation::after(inst_scope),
            flags: BindFlags {
                constant: true,
                ..Default::default()
            },
        };

        let members = self.scopes[temp].members.clone();
        for &member in &members {
            match &self.symbols[member].kind {
                SymbolKind::Parameter(data) => {
                    let missing = data.is_port
                        && !data.local
                        && data.declared.init.is_none()
                        && data.override_init.is_none();
                    if missing {
                        let name = self.symbols[member].name;
                        self.diag(
                            DiagCode::ParamHasNoValue,
                            format!(
                                "parameter `{}` of `{}` has no value",
                                self.interner.resolve(name),
                                self.interner.resolve(def_name)
                            ),
                            inst_span,
                        );
                    }
                    if let Some(override_init) = data.override_init {
                        let bound = self.bind_expr(override_init, inst_ctx);
                        let mut value = self.exprs[bound].constant.clone();
                        // Convert to the declared type when it names a
                        // builtin; user-defined types resolve inside the
                        // instance and keep the raw value here.
                        let declared_ty = match &self.symbols[member].kind {
                            SymbolKind::Parameter(data) => data.declared.ty,
                            _ => None,
                        };
                        if let (Some(v), Some(ty)) = (value.clone(), declared_ty) {
                            if is_builtin_type(&ty.kind) {
                                let target =
                                    self.resolve_builtin_type(&ty.kind, ty.signing, ty.span);
                                value = self.convert_constant(v, target);
                            }
                        }
                        if let SymbolKind::Parameter(data) = &mut self.symbols[member].kind {
                            data.state = ResolveState::Resolved;
                            data.value = value;
                        }
                    }
                }
                SymbolKind::TypeParameter(data) => {
                    let missing = data.is_port
                        && !data.local
                        && data.default.is_none()
                        && data.override_expr.is_none();
                    if missing {
                        let name = self.symbols[member].name;
                        self.diag(
                            DiagCode::ParamHasNoValue,
                            format!(
                                "type parameter `{}` of `{}` has no value",
                                self.interner.resolve(name),
                                self.interner.resolve(def_name)
                            ),
                            inst_span,
                        );
                    }
                    if let Some(override_expr) = data.override_expr {
                        let location = LookupLocation::after(inst_scope);
                        let target =
                            self.resolve_type_expr(override_expr, inst_scope, location);
                        let alias = self.types.intern(crate::types::Type::Alias {
                            symbol: member,
                            target,
                        });
                        if let SymbolKind::TypeParameter(data) = &mut self.symbols[member].kind {
                            data.state = ResolveState::Resolved;
                            data.resolved = Some(alias);
                        }
                    }
                }
                _ => {}
            }
        }
        members
    }

    /// The number of instance ancestors of a scope.
    fn hierarchy_depth_of(&self, scope: ScopeId) -> u32 {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(owner) = self.scopes[id].owner {
                match &self.symbols[owner].kind {
                    SymbolKind::ModuleInstance(data)
                    | SymbolKind::InterfaceInstance(data)
                    | SymbolKind::ProgramInstance(data) => return data.depth,
                    _ => {}
                }
            }
            current = self.scopes[id].parent;
        }
        0
    }

    /// Walks one instance's dimension list, producing nested
    /// `InstanceArray` symbols with one concrete instance per leaf.
    ///
    /// Only the outermost symbol is indexed under the instance name;
    /// elements inside arrays are reached through the array.
    #[allow(clippy::too_many_arguments)]
    fn recurse_instance_array(
        &mut self,
        scope: ScopeId,
        definition: SymbolId,
        instance: &'a ast::HierarchicalInstance,
        shared_params: &[SymbolId],
        dims: &'a [ast::Dimension],
        path: &mut Vec<i32>,
        depth: u32,
        indexed: bool,
    ) -> SymbolId {
        let Some((dim, rest)) = dims.split_first() else {
            return self.create_concrete_instance(
                scope,
                definition,
                instance.name,
                instance.span,
                shared_params,
                path.clone(),
                depth,
                indexed,
            );
        };

        let location = LookupLocation::after(scope);
        let range = self.eval_dimension(dim, scope, location);
        let Some(range) = range else {
            // A dimension that is not a constant range produces an empty
            // array placeholder so references do not cascade.
            let symbol = Symbol {
                name: instance.name,
                span: instance.span,
                parent: scope,
                decl_index: 0,
                kind: SymbolKind::InstanceArray {
                    elements: Vec::new(),
                },
            };
            return if indexed {
                self.add_member(scope, symbol)
            } else {
                self.add_member_unindexed(scope, symbol)
            };
        };

        let mut elements = Vec::new();
        for index in range.lower()..=range.upper() {
            path.push(index);
            let element = self.recurse_instance_array(
                scope,
                definition,
                instance,
                shared_params,
                rest,
                path,
                depth,
                false,
            );
            path.pop();
            elements.push(element);
        }

        let symbol = Symbol {
            name: instance.name,
            span: instance.span,
            parent: scope,
            decl_index: 0,
            kind: SymbolKind::InstanceArray { elements },
        };
        if indexed {
            self.add_member(scope, symbol)
        } else {
            self.add_member_unindexed(scope, symbol)
        }
    }

    /// Creates one concrete instance: its scope, cloned parameters, ports,
    /// and deferred body.
    #[allow(clippy::too_many_arguments)]
    fn create_concrete_instance(
        &mut self,
        scope: ScopeId,
        definition: SymbolId,
        name: Ident,
        span: sable_source::Span,
        shared_params: &[SymbolId],
        array_path: Vec<i32>,
        depth: u32,
        indexed: bool,
    ) -> SymbolId {
        let (def_syntax, def_kind, def_nettype) = match &self.symbols[definition].kind {
            SymbolKind::Definition(data) => {
                (data.syntax, data.def_kind, data.default_nettype)
            }
            _ => unreachable!("instances are created from definitions"),
        };

        // The body scope is parented to the definition's enclosing scope:
        // names inside the module resolve where the module was declared,
        // not where it was instantiated.
        let body = self.scopes.alloc(Scope::new(None, Some(self.root_scope())));
        self.scopes[body].default_nettype = def_nettype;

        // Imports first, then the shared parameters cloned in, then ports,
        // then the deferred body.
        for import in &def_syntax.imports {
            self.realize_import_decl(body, import);
        }
        for &param in shared_params {
            self.clone_param_into(body, param);
        }
        let mut last_direction = ast::Direction::Inout;
        for port in &def_syntax.ports {
            if let ast::PortKind::Interface { interface, modport } = &port.kind {
                self.check_interface_port(*interface, *modport, port.span);
            }
            let direction = port.direction.unwrap_or(last_direction);
            last_direction = direction;
            for declarator in &port.declarators {
                let declared = DeclaredType::new(
                    Some(&port.data_type),
                    &declarator.dims,
                    declarator.init.as_ref(),
                );
                let symbol = Symbol {
                    name: declarator.name,
                    span: declarator.span,
                    parent: body,
                    decl_index: 0,
                    kind: SymbolKind::Port {
                        direction,
                        declared,
                    },
                };
                self.add_member(body, symbol);
            }
        }
        for item in &def_syntax.items {
            // Parameters were cloned from the shared set; realizing them
            // again from the body syntax would duplicate them.
            if !matches!(item, ModuleItem::Param(_)) {
                self.scopes[body].deferred.push(item);
            }
            self.scopes[body].body_items.push(item);
        }

        let data = InstanceData {
            definition,
            scope: body,
            depth,
            array_path,
        };
        let kind = match def_kind {
            DefinitionKind::Module => SymbolKind::ModuleInstance(data),
            DefinitionKind::Interface => SymbolKind::InterfaceInstance(data),
            DefinitionKind::Program => SymbolKind::ProgramInstance(data),
        };
        let symbol = Symbol {
            name,
            span,
            parent: scope,
            decl_index: 0,
            kind,
        };
        let id = if indexed {
            self.add_member(scope, symbol)
        } else {
            self.add_member_unindexed(scope, symbol)
        };
        self.scopes[body].owner = Some(id);
        id
    }

    /// Checks an interface port's modport selector against the interface
    /// definition's members.
    fn check_interface_port(
        &mut self,
        interface: Ident,
        modport: Option<Ident>,
        span: sable_source::Span,
    ) {
        let Some(def) = self.definition(interface) else {
            self.diag(
                DiagCode::UndeclaredIdentifier,
                format!(
                    "interface `{}` is not declared",
                    self.interner.resolve(interface)
                ),
                span,
            );
            return;
        };
        let def_syntax = match &self.symbols[def].kind {
            SymbolKind::Definition(data) => data.syntax,
            _ => return,
        };
        let Some(modport) = modport else { return };

        let mut found_other = false;
        for item in &def_syntax.items {
            match item {
                ModuleItem::Modport(decl) if decl.name == modport => return,
                ModuleItem::Data(decl)
                    if decl.declarators.iter().any(|d| d.name == modport) =>
                {
                    found_other = true;
                }
                _ => {}
            }
        }
        if found_other {
            self.diag(
                DiagCode::NotAModport,
                format!(
                    "`{}` is not a modport of `{}`",
                    self.interner.resolve(modport),
                    self.interner.resolve(interface)
                ),
                span,
            );
        } else {
            self.diag(
                DiagCode::UnknownMember,
                format!(
                    "`{}` is not a member of `{}`",
                    self.interner.resolve(modport),
                    self.interner.resolve(interface)
                ),
                span,
            );
        }
    }

    /// Clones an evaluated parameter from the temporary scope into an
    /// instance scope, carrying the computed value.
    fn clone_param_into(&mut self, scope: ScopeId, param: SymbolId) {
        let cloned = match &self.symbols[param].kind {
            SymbolKind::Parameter(data) => Symbol {
                name: self.symbols[param].name,
                span: self.symbols[param].span,
                parent: scope,
                decl_index: 0,
                kind: SymbolKind::Parameter(crate::symbol::ParameterData {
                    declared: DeclaredType {
                        ty: data.declared.ty,
                        dims: data.declared.dims,
                        init: data.declared.init,
                        state: data.declared.state,
                        resolved: data.declared.resolved,
                    },
                    local: data.local,
                    is_port: data.is_port,
                    override_init: data.override_init,
                    state: data.state,
                    value: data.value.clone(),
                }),
            },
            SymbolKind::TypeParameter(data) => Symbol {
                name: self.symbols[param].name,
                span: self.symbols[param].span,
                parent: scope,
                decl_index: 0,
                kind: SymbolKind::TypeParameter(crate::symbol::TypeParameterData {
                    default: data.default,
                    override_expr: data.override_expr,
                    local: data.local,
                    is_port: data.is_port,
                    state: data.state,
                    resolved: data.resolved,
                }),
            },
            _ => return,
        };
        self.add_member(scope, cloned);
    }

    /// Scans an instance's port connection expressions for simple
    /// identifiers that do not resolve, creating implicit nets of the
    /// scope's default nettype (or diagnosing when the default is `none`).
    fn create_implicit_nets(
        &mut self,
        scope: ScopeId,
        instance: &'a ast::HierarchicalInstance,
        seen: &mut HashSet<Ident>,
    ) {
        let nettype = self.scopes[scope].default_nettype;

        let mut names = Vec::new();
        for connection in &instance.connections {
            let expr = match connection {
                PortConnection::Ordered { expr, .. } => expr.as_ref(),
                PortConnection::Named { expr, .. } => expr.as_ref(),
                PortConnection::Wildcard(_) => None,
            };
            if let Some(expr) = expr {
                collect_simple_names(expr, &mut names);
            }
        }

        for (name, span) in names {
            if seen.contains(&name) {
                continue;
            }
            let ctx = BindContext {
                scope,
                location: LookupLocation::after(scope),
                flags: BindFlags::default(),
            };
            if self.lookup_name(name, &ctx).is_some() {
                continue;
            }
            seen.insert(name);

            if nettype == DefaultNetType::None {
                // With `default_nettype none`, implicit net creation is
                // suppressed; the undeclared name is diagnosed instead.
                self.diag(
                    DiagCode::UsedBeforeDeclared,
                    format!(
                        "`{}` is not declared, and implicit nets are disabled",
                        self.interner.resolve(name)
                    ),
                    span,
                );
                continue;
            }

            let net = match nettype {
                DefaultNetType::Wire => NetTypeKeyword::Wire,
                DefaultNetType::Tri => NetTypeKeyword::Tri,
                DefaultNetType::Tri0 => NetTypeKeyword::Tri0,
                DefaultNetType::Tri1 => NetTypeKeyword::Tri1,
                DefaultNetType::Wand => NetTypeKeyword::Wand,
                DefaultNetType::Wor => NetTypeKeyword::Wor,
                DefaultNetType::Trireg => NetTypeKeyword::Trireg,
                DefaultNetType::Uwire => NetTypeKeyword::Uwire,
                DefaultNetType::None => unreachable!(),
            };
            let logic = self.types.logic();
            let mut declared = DeclaredType::new(None, &[], None);
            declared.state = ResolveState::Resolved;
            declared.resolved = Some(logic);
            let symbol = Symbol {
                name,
                span,
                parent: scope,
                decl_index: 0,
                kind: SymbolKind::Net { net, declared },
            };
            self.add_member(scope, symbol);
        }
    }

    // ========================================================================
    // Full elaboration
    // ========================================================================

    /// Determines the root instances — module definitions never
    /// instantiated by another definition — creating and fully elaborating
    /// each.
    pub fn root_instances(&mut self) -> Vec<SymbolId> {
        let root_members = self.scopes[self.root_scope()].members.clone();
        let mut tops = Vec::new();
        let mut any_module = false;
        for member in root_members {
            let (is_module, name) = match &self.symbols[member].kind {
                SymbolKind::Definition(data) => (
                    data.def_kind == DefinitionKind::Module,
                    self.symbols[member].name,
                ),
                _ => continue,
            };
            if !is_module {
                continue;
            }
            any_module = true;
            if !self.is_instantiated(name) {
                tops.push(member);
            }
        }

        if tops.is_empty() {
            if any_module {
                self.diag(
                    DiagCode::NoTopModules,
                    "no module is left uninstantiated to serve as a hierarchy root",
                    sable_source::Span::DUMMY,
                );
            }
            return Vec::new();
        }

        let mut roots = Vec::new();
        for definition in tops {
            let root = self.create_root_instance(definition);
            self.elaborate_fully(root);
            roots.push(root);
        }
        roots
    }

    fn is_instantiated(&self, name: Ident) -> bool {
        self.instantiated_names().contains(&name)
    }

    /// Creates a depth-zero instance of a definition with default
    /// parameters.
    pub fn create_root_instance(&mut self, definition: SymbolId) -> SymbolId {
        let overrides = HashMap::new();
        let def_name = self.symbols[definition].name;
        let def_span = self.symbols[definition].span;
        let hierarchy = self.hierarchy_scope();
        let shared = self.evaluate_shared_params(definition, &overrides, hierarchy, def_span);
        self.create_concrete_instance(
            hierarchy,
            definition,
            def_name,
            def_span,
            &shared,
            Vec::new(),
            0,
            true,
        )
    }

    /// Forces complete elaboration of an instance: realizes its scope,
    /// resolves every member, binds body expressions, and recurses into
    /// child instances.
    pub fn elaborate_fully(&mut self, symbol: SymbolId) {
        let Some(scope) = self.symbols[symbol].owned_scope() else {
            return;
        };
        self.ensure_scope(scope);

        let members = self.scopes[scope].members.clone();
        for member in members {
            match &self.symbols[member].kind {
                SymbolKind::ModuleInstance(_)
                | SymbolKind::InterfaceInstance(_)
                | SymbolKind::ProgramInstance(_) => self.elaborate_fully(member),
                SymbolKind::InstanceArray { elements } => {
                    for element in elements.clone() {
                        self.elaborate_fully(element);
                    }
                }
                SymbolKind::Parameter(_) => {
                    self.parameter_value(member);
                    self.symbol_type(member);
                }
                _ => {
                    self.symbol_type(member);
                    self.bind_member_initializer(member, scope);
                }
            }
        }

        let items = self.scopes[scope].body_items.clone();
        for item in items {
            self.bind_body_item(scope, item);
        }
    }

    /// Binds the initializer of a variable, net, or port member against its
    /// declared type.
    fn bind_member_initializer(&mut self, member: SymbolId, scope: ScopeId) {
        let init = match &self.symbols[member].kind {
            SymbolKind::Variable { declared }
            | SymbolKind::Net { declared, .. }
            | SymbolKind::Port { declared, .. } => declared.init,
            _ => None,
        };
        let Some(init) = init else { return };
        let ty = self.symbol_type(member);
        let ctx = BindContext::new(scope);
        let bound = self.bind_expr(init, ctx);
        self.check_assignment(ty, bound, self.exprs[bound].span);
    }

    /// Binds the expressions of a non-declarative body item.
    fn bind_body_item(&mut self, scope: ScopeId, item: &'a ModuleItem) {
        match item {
            ModuleItem::ContinuousAssign(assign) => {
                for (target, value) in &assign.assignments {
                    let mut ctx = BindContext::new(scope);
                    ctx.flags.assignment_allowed = true;
                    let target_id = self.bind_expr(target, ctx);
                    let value_id = self.bind_expr(value, BindContext::new(scope));
                    let target_ty = self.exprs[target_id].ty;
                    self.check_assignment(target_ty, value_id, value.span());
                }
            }
            ModuleItem::Procedural(block) => {
                let mut ctx = BindContext::new(scope);
                ctx.flags.procedural = true;
                self.bind_statement(&block.body, ctx);
            }
            ModuleItem::Generate(region) => {
                for item in &region.items {
                    self.bind_body_item(scope, item);
                }
            }
            _ => {}
        }
    }

    /// Walks a statement, binding the expressions inside it.
    pub(crate) fn bind_statement(&mut self, stmt: &'a Statement, ctx: BindContext) {
        match stmt {
            Statement::Block { body, .. } => {
                for stmt in body {
                    self.bind_statement(stmt, ctx);
                }
            }
            Statement::VarDecl(_) => {
                // Local declarations inside blocks are visible only to the
                // statement binder; full local-scope modeling is not needed
                // for elaboration, so their initializers are left unbound.
            }
            Statement::If {
                cond,
                then_stmt,
                else_stmt,
                ..
            } => {
                self.bind_expr(cond, ctx);
                self.bind_statement(then_stmt, ctx);
                if let Some(else_stmt) = else_stmt {
                    self.bind_statement(else_stmt, ctx);
                }
            }
            Statement::Case { expr, items, .. } => {
                self.bind_expr(expr, ctx);
                for item in items {
                    for expr in &item.exprs {
                        self.bind_expr(expr, ctx);
                    }
                    self.bind_statement(&item.body, ctx);
                }
            }
            Statement::For {
                init,
                cond,
                step,
                body,
                ..
            } => {
                self.bind_statement(init, ctx);
                if let Some(cond) = cond {
                    self.bind_expr(cond, ctx);
                }
                if let Some(step) = step {
                    self.bind_statement(step, ctx);
                }
                self.bind_statement(body, ctx);
            }
            Statement::While { cond, body, .. } | Statement::DoWhile { body, cond, .. } => {
                self.bind_expr(cond, ctx);
                self.bind_statement(body, ctx);
            }
            Statement::Repeat { count, body, .. } => {
                self.bind_expr(count, ctx);
                self.bind_statement(body, ctx);
            }
            Statement::Forever { body, .. } => self.bind_statement(body, ctx),
            Statement::Assign { target, value, .. } => {
                let mut target_ctx = ctx;
                target_ctx.flags.assignment_allowed = true;
                let target_id = self.bind_expr(target, target_ctx);
                let value_id = self.bind_expr(value, ctx);
                let target_ty = self.exprs[target_id].ty;
                self.check_assignment(target_ty, value_id, value.span());
            }
            Statement::ExprStmt { expr, .. } => {
                self.bind_expr(expr, ctx);
            }
            Statement::Timed { body, .. } | Statement::Delayed { body, .. } => {
                self.bind_statement(body, ctx);
            }
            Statement::Return { value, .. } => {
                if let Some(value) = value {
                    self.bind_expr(value, ctx);
                }
            }
            Statement::Break(_)
            | Statement::Continue(_)
            | Statement::Null(_)
            | Statement::Error(_) => {}
        }
    }
}

/// Whether a data type is a pure builtin keyword type (resolvable outside
/// the defining module).
fn is_builtin_type(kind: &ast::DataTypeKind) -> bool {
    !matches!(
        kind,
        ast::DataTypeKind::Enum(_)
            | ast::DataTypeKind::Struct(_)
            | ast::DataTypeKind::Union(_)
            | ast::DataTypeKind::Named(_)
    )
}

/// Collects the simple identifier leaves of a port connection expression —
/// the candidates for implicit net creation.
fn collect_simple_names(expr: &Expr, out: &mut Vec<(Ident, sable_source::Span)>) {
    match expr {
        Expr::Ident { name, span } => out.push((*name, *span)),
        Expr::Concat { parts, .. } => {
            for part in parts {
                collect_simple_names(part, out);
            }
        }
        Expr::Index { value, .. } | Expr::RangeSelect { value, .. } => {
            collect_simple_names(value, out);
        }
        _ => {}
    }
}
