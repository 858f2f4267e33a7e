//! Symbols, scopes, and lazily resolved declared types.
//!
//! Symbols live in the `Compilation`'s arena and are identified by
//! [`SymbolId`]; arena IDs never move, so **symbol identity is ID
//! identity**. A [`Scope`] holds an ordered member list, a name index, and
//! the deferred member syntax that is realized on first lookup, which is
//! what allows forward references.

use crate::arena::define_arena_id;
use crate::types::TypeId;
use crate::value::ConstantValue;
use sable_common::Ident;
use sable_source::Span;
use sable_syntax::ast::{
    DataType, DefinitionDecl, DefinitionKind, Dimension, Direction, Expr, ForwardCategory,
    FunctionDecl, ModportDecl, ModuleItem, NetTypeKeyword,
};
use sable_syntax::preproc::DefaultNetType;
use std::collections::HashMap;

define_arena_id!(
    /// Stable identity of a [`Symbol`].
    SymbolId
);

define_arena_id!(
    /// Stable identity of a [`Scope`].
    ScopeId
);

/// The three-state progress marker used by every memoized resolution.
///
/// Re-entry while `InProgress` means a dependency cycle; the entity
/// degrades to an error value and a `RecursiveResolution` diagnostic is
/// issued.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResolveState {
    /// Resolution has not been requested yet.
    NotStarted,
    /// Resolution is on the call stack right now.
    InProgress,
    /// Resolution finished (possibly with an error result).
    Resolved,
}

/// A declared type: the syntax of a declaration plus its memoized
/// resolution.
#[derive(Clone, Debug)]
pub struct DeclaredType<'a> {
    /// The declared type syntax; `None` means fully implicit.
    pub ty: Option<&'a DataType>,
    /// Unpacked dimensions attached to the declarator.
    pub dims: &'a [Dimension],
    /// The initializer expression, if any.
    pub init: Option<&'a Expr>,
    /// Resolution progress.
    pub state: ResolveState,
    /// The resolved type, once computed.
    pub resolved: Option<TypeId>,
}

impl<'a> DeclaredType<'a> {
    /// Creates an unresolved declared type.
    pub fn new(ty: Option<&'a DataType>, dims: &'a [Dimension], init: Option<&'a Expr>) -> Self {
        Self {
            ty,
            dims,
            init,
            state: ResolveState::NotStarted,
            resolved: None,
        }
    }
}

/// A (scope, member index) pair bounding what a lookup may see.
///
/// A reference resolves only to declarations whose index precedes the
/// location's index *in the location's own scope*; enclosing scopes are
/// not position-restricted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LookupLocation {
    /// The scope the reference appears in.
    pub scope: ScopeId,
    /// The member index the reference appears at.
    pub index: u32,
}

impl LookupLocation {
    /// A location past every member of the scope.
    pub fn after(scope: ScopeId) -> Self {
        Self {
            scope,
            index: u32::MAX,
        }
    }
}

/// The common header plus variant payload of every symbol.
#[derive(Debug)]
pub struct Symbol<'a> {
    /// The symbol's name.
    pub name: Ident,
    /// Where the symbol was declared.
    pub span: Span,
    /// The scope that owns this symbol.
    pub parent: ScopeId,
    /// Position among the parent's members, for lookup-location checks.
    pub decl_index: u32,
    /// The variant payload.
    pub kind: SymbolKind<'a>,
}

/// Payload of a definition symbol (an uninstantiated module, interface, or
/// program).
#[derive(Debug)]
pub struct DefinitionData<'a> {
    /// Module, interface, or program.
    pub def_kind: DefinitionKind,
    /// The defining syntax.
    pub syntax: &'a DefinitionDecl,
    /// The default nettype in force at the definition site.
    pub default_nettype: DefaultNetType,
}

/// Payload shared by module, interface, and program instances.
#[derive(Debug)]
pub struct InstanceData {
    /// The instantiated definition.
    pub definition: SymbolId,
    /// The instance's body scope.
    pub scope: ScopeId,
    /// Number of instance ancestors above this one.
    pub depth: u32,
    /// Index vector locating this instance within nested instance arrays.
    pub array_path: Vec<i32>,
}

/// Payload of a value parameter.
#[derive(Debug)]
pub struct ParameterData<'a> {
    /// The declared type and default initializer.
    pub declared: DeclaredType<'a>,
    /// Whether this is a `localparam`.
    pub local: bool,
    /// Whether it was declared in the parameter port list.
    pub is_port: bool,
    /// An overriding value from an instantiation, if any.
    pub override_init: Option<&'a Expr>,
    /// Evaluation progress.
    pub state: ResolveState,
    /// The evaluated value, once computed.
    pub value: Option<ConstantValue>,
}

/// Payload of a type parameter.
#[derive(Debug)]
pub struct TypeParameterData<'a> {
    /// The default type, if any.
    pub default: Option<&'a DataType>,
    /// An overriding expression from an instantiation; the parser cannot
    /// know it was meant as a type, so it is re-interpreted here.
    pub override_expr: Option<&'a Expr>,
    /// Whether this is a `localparam type`.
    pub local: bool,
    /// Whether it was declared in the parameter port list.
    pub is_port: bool,
    /// Resolution progress.
    pub state: ResolveState,
    /// The resolved type, once computed.
    pub resolved: Option<TypeId>,
}

/// Payload of a type alias introduced by `typedef`.
#[derive(Debug)]
pub struct TypeAliasData<'a> {
    /// The aliased type syntax.
    pub target: &'a DataType,
    /// Resolution progress.
    pub state: ResolveState,
    /// The resolved alias type, once computed.
    pub resolved: Option<TypeId>,
    /// Head of the singly-linked list of forward declarations observing
    /// this alias; the forwards are owned by the declaring scope.
    pub first_forward: Option<SymbolId>,
}

/// The tagged variant over all symbol kinds.
#[derive(Debug)]
pub enum SymbolKind<'a> {
    /// An uninstantiated module, interface, or program.
    Definition(DefinitionData<'a>),
    /// A package; its members live in `scope`.
    Package {
        /// The package's member scope.
        scope: ScopeId,
    },
    /// An instantiated module.
    ModuleInstance(InstanceData),
    /// An instantiated interface.
    InterfaceInstance(InstanceData),
    /// An instantiated program.
    ProgramInstance(InstanceData),
    /// One dimension of an instance array; elements are instances or
    /// nested arrays.
    InstanceArray {
        /// The element symbols in range order.
        elements: Vec<SymbolId>,
    },
    /// A value parameter.
    Parameter(ParameterData<'a>),
    /// A type parameter.
    TypeParameter(TypeParameterData<'a>),
    /// A variable.
    Variable {
        /// The declared type.
        declared: DeclaredType<'a>,
    },
    /// A net.
    Net {
        /// The net type keyword.
        net: NetTypeKeyword,
        /// The declared data type.
        declared: DeclaredType<'a>,
    },
    /// A port of a definition or instance.
    Port {
        /// The port direction.
        direction: Direction,
        /// The declared type.
        declared: DeclaredType<'a>,
    },
    /// A function (or task) declaration.
    Subroutine {
        /// The defining syntax.
        syntax: &'a FunctionDecl,
        /// The subroutine's body scope (holds the arguments).
        scope: ScopeId,
    },
    /// One member of an enum type.
    EnumValue {
        /// The enum type this value belongs to.
        ty: TypeId,
        /// The member's constant value.
        value: Option<ConstantValue>,
    },
    /// A type alias from a typedef.
    TypeAlias(TypeAliasData<'a>),
    /// A forward typedef declaration; part of a list headed by the alias.
    ForwardingTypedef {
        /// The declared category restriction.
        category: ForwardCategory,
        /// The next forward declaration for the same name.
        next: Option<SymbolId>,
    },
    /// A modport inside an interface.
    Modport {
        /// The defining syntax.
        syntax: &'a ModportDecl,
    },
    /// A genvar.
    Genvar,
}

impl Symbol<'_> {
    /// Whether this symbol is an instance of a definition.
    pub fn is_instance(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::ModuleInstance(_)
                | SymbolKind::InterfaceInstance(_)
                | SymbolKind::ProgramInstance(_)
        )
    }

    /// The scope owned by this symbol, if it has one.
    pub fn owned_scope(&self) -> Option<ScopeId> {
        match &self.kind {
            SymbolKind::Package { scope } => Some(*scope),
            SymbolKind::ModuleInstance(data)
            | SymbolKind::InterfaceInstance(data)
            | SymbolKind::ProgramInstance(data) => Some(data.scope),
            SymbolKind::Subroutine { scope, .. } => Some(*scope),
            _ => None,
        }
    }

    /// Whether this symbol names a compile-time constant value.
    pub fn is_constant_value(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Parameter(_) | SymbolKind::EnumValue { .. }
        )
    }
}

/// Progress of a scope's member realization.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScopeState {
    /// Deferred members have not been realized.
    NotStarted,
    /// Realization is running.
    InProgress,
    /// Member order is fixed and the name index is complete.
    Elaborated,
}

/// A scope: ordered members, a name index, import sets, and deferred
/// member syntax awaiting realization.
#[derive(Debug)]
pub struct Scope<'a> {
    /// The symbol that owns this scope; `None` for the compilation unit.
    pub owner: Option<SymbolId>,
    /// The lexically enclosing scope.
    pub parent: Option<ScopeId>,
    /// Members in declaration order.
    pub members: Vec<SymbolId>,
    /// Name → symbol index over the members.
    pub index: HashMap<Ident, SymbolId>,
    /// Package scopes contributed by wildcard imports, searched after the
    /// scope's own members and before the parent.
    pub wildcard_imports: Vec<ScopeId>,
    /// Body syntax whose symbols have not been created yet.
    pub deferred: Vec<&'a ModuleItem>,
    /// All body items, kept for binding continuous assigns and procedural
    /// blocks once the owner is fully elaborated.
    pub body_items: Vec<&'a ModuleItem>,
    /// Realization progress.
    pub state: ScopeState,
    /// The default nettype governing implicit nets in this scope.
    pub default_nettype: DefaultNetType,
}

impl<'a> Scope<'a> {
    /// Creates an empty scope.
    pub fn new(owner: Option<SymbolId>, parent: Option<ScopeId>) -> Self {
        Self {
            owner,
            parent,
            members: Vec::new(),
            index: HashMap::new(),
            wildcard_imports: Vec::new(),
            deferred: Vec::new(),
            body_items: Vec::new(),
            state: ScopeState::NotStarted,
            default_nettype: DefaultNetType::Wire,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaId;

    #[test]
    fn lookup_location_after() {
        let scope = ScopeId::from_raw(3);
        let loc = LookupLocation::after(scope);
        assert_eq!(loc.scope, scope);
        assert_eq!(loc.index, u32::MAX);
    }

    #[test]
    fn resolve_state_transitions() {
        let mut state = ResolveState::NotStarted;
        assert_ne!(state, ResolveState::Resolved);
        state = ResolveState::InProgress;
        assert_eq!(state, ResolveState::InProgress);
        state = ResolveState::Resolved;
        assert_eq!(state, ResolveState::Resolved);
    }

    #[test]
    fn new_scope_is_unrealized() {
        let scope: Scope<'_> = Scope::new(None, None);
        assert_eq!(scope.state, ScopeState::NotStarted);
        assert!(scope.members.is_empty());
        assert!(scope.index.is_empty());
    }
}
