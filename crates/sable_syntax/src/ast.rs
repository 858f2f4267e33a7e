//! AST node types for the SystemVerilog parser.
//!
//! Every node carries a `Span` for source location tracking. Error recovery
//! is represented by `Error(Span)` poison variants in `Item`, `ModuleItem`,
//! `Statement`, and `Expr`; the token stream held by the
//! [`SyntaxTree`](crate::SyntaxTree) is the round-trip carrier, so the AST
//! itself stores only what downstream elaboration needs.

use crate::token::{Base, TimeUnit};
use sable_common::{Ident, Logic};
use sable_source::Span;
use serde::{Deserialize, Serialize};

// ============================================================================
// Top-level
// ============================================================================

/// A complete source file, containing zero or more top-level items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUnit {
    /// The top-level items (definitions and packages) in this file.
    pub items: Vec<Item>,
    /// The span covering the entire file.
    pub span: Span,
}

/// A top-level item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    /// A module, interface, or program definition.
    Definition(DefinitionDecl),
    /// A package declaration.
    Package(PackageDecl),
    /// An error node produced during recovery.
    Error(Span),
}

/// What kind of design element a definition declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefinitionKind {
    /// `module ... endmodule`
    Module,
    /// `interface ... endinterface`
    Interface,
    /// `program ... endprogram`
    Program,
}

/// A module, interface, or program definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionDecl {
    /// Module, interface, or program.
    pub kind: DefinitionKind,
    /// The definition name.
    pub name: Ident,
    /// Package imports in the header (`module m import p::*; (...)`).
    pub imports: Vec<ImportDecl>,
    /// Parameter port list (`#(...)`).
    pub params: Vec<ParamDecl>,
    /// Port style: ANSI (declarations in the port list) or non-ANSI.
    pub port_style: PortStyle,
    /// ANSI port declarations.
    pub ports: Vec<PortDecl>,
    /// Non-ANSI port names listed in the header.
    pub port_names: Vec<Ident>,
    /// Items in the body.
    pub items: Vec<ModuleItem>,
    /// Optional end label (`endmodule : name`).
    pub end_label: Option<Ident>,
    /// Source span.
    pub span: Span,
}

/// A package declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDecl {
    /// The package name.
    pub name: Ident,
    /// Items in the body.
    pub items: Vec<ModuleItem>,
    /// Optional end label.
    pub end_label: Option<Ident>,
    /// Source span.
    pub span: Span,
}

/// Whether ports are declared ANSI-style (inline) or non-ANSI (separate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortStyle {
    /// `module m(input logic a, output logic b);`
    Ansi,
    /// `module m(a, b);` with declarations in the body.
    NonAnsi,
    /// `module m;` or `module m();`
    Empty,
}

// ============================================================================
// Ports
// ============================================================================

/// Port or signal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// `input`
    Input,
    /// `output`
    Output,
    /// `inout`
    Inout,
}

/// The declared kind of an ANSI port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PortKind {
    /// A net port (`input wire ...`).
    Net(NetTypeKeyword),
    /// A variable port (`output var ...` or any variable data type).
    Variable,
    /// An interface port (`bus_if.master name`).
    Interface {
        /// The interface definition name.
        interface: Ident,
        /// Optional modport selector.
        modport: Option<Ident>,
    },
    /// No explicit net or variable keyword.
    Implicit,
}

/// An ANSI port declaration (or a standalone non-ANSI one in the body).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDecl {
    /// Direction; `None` inherits from the previous port in the list.
    pub direction: Option<Direction>,
    /// Net, variable, or interface port.
    pub kind: PortKind,
    /// The declared data type (implicit types have `DataTypeKind::Implicit`).
    pub data_type: DataType,
    /// The declared names with their unpacked dimensions.
    pub declarators: Vec<Declarator>,
    /// Source span.
    pub span: Span,
}

/// A built-in net type keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetTypeKeyword {
    /// `wire`
    Wire,
    /// `tri`
    Tri,
    /// `tri0`
    Tri0,
    /// `tri1`
    Tri1,
    /// `wand`
    Wand,
    /// `wor`
    Wor,
    /// `trireg`
    Trireg,
    /// `uwire`
    Uwire,
    /// `supply0`
    Supply0,
    /// `supply1`
    Supply1,
}

// ============================================================================
// Types
// ============================================================================

/// A syntactic data type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataType {
    /// The type's shape.
    pub kind: DataTypeKind,
    /// Explicit `signed` / `unsigned` keyword, if any.
    pub signing: Option<Signing>,
    /// Packed dimensions (`[7:0]`), outermost first.
    pub packed_dims: Vec<Range>,
    /// Source span.
    pub span: Span,
}

impl DataType {
    /// An implicit type at the given location.
    pub fn implicit(span: Span) -> Self {
        Self {
            kind: DataTypeKind::Implicit,
            signing: None,
            packed_dims: Vec::new(),
            span,
        }
    }
}

/// Explicit signing keyword on a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signing {
    /// `signed`
    Signed,
    /// `unsigned`
    Unsigned,
}

/// The shape of a data type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DataTypeKind {
    /// `logic`
    Logic,
    /// `bit`
    Bit,
    /// `reg`
    Reg,
    /// `byte`
    Byte,
    /// `shortint`
    Shortint,
    /// `int`
    Int,
    /// `longint`
    Longint,
    /// `integer`
    Integer,
    /// `time`
    Time,
    /// `real`
    Real,
    /// `shortreal`
    Shortreal,
    /// `realtime`
    Realtime,
    /// `string`
    StringType,
    /// `void`
    Void,
    /// An enum type declaration.
    Enum(EnumType),
    /// A struct type declaration.
    Struct(StructType),
    /// A union type declaration.
    Union(StructType),
    /// A reference to a named type.
    Named(TypeName),
    /// No explicit type keyword; only signing and dimensions.
    Implicit,
}

/// A reference to a user-defined type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeName {
    /// `my_type_t`
    Simple(Ident),
    /// `pkg::my_type_t`
    Scoped {
        /// The package name.
        package: Ident,
        /// The type name within the package.
        name: Ident,
    },
}

/// An enum type declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumType {
    /// Optional base type (defaults to `int`).
    pub base: Option<Box<DataType>>,
    /// The enumerated members.
    pub members: Vec<EnumMemberDecl>,
    /// Source span.
    pub span: Span,
}

/// One member of an enum declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumMemberDecl {
    /// The member name.
    pub name: Ident,
    /// Optional explicit value.
    pub value: Option<Expr>,
    /// Source span.
    pub span: Span,
}

/// A struct or union type declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructType {
    /// Whether the type is `packed`.
    pub packed: bool,
    /// Whether a packed type is `signed`.
    pub signed: bool,
    /// The member declarations.
    pub members: Vec<StructMemberDecl>,
    /// Source span.
    pub span: Span,
}

/// One field declaration inside a struct or union.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructMemberDecl {
    /// The field type.
    pub ty: DataType,
    /// The declared field names.
    pub declarators: Vec<Declarator>,
    /// Source span.
    pub span: Span,
}

/// A declared name with its unpacked dimensions and optional initializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declarator {
    /// The declared name.
    pub name: Ident,
    /// Unpacked dimensions following the name.
    pub dims: Vec<Dimension>,
    /// Optional initializer expression.
    pub init: Option<Expr>,
    /// Source span.
    pub span: Span,
}

/// An array dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Dimension {
    /// `[msb:lsb]`
    Range(Range),
    /// `[size]`
    Size(Expr),
    /// `[]`
    Unsized(Span),
}

/// A `[left:right]` range with both bound expressions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Range {
    /// The left (most significant) bound.
    pub left: Expr,
    /// The right (least significant) bound.
    pub right: Expr,
    /// Source span.
    pub span: Span,
}

// ============================================================================
// Module items
// ============================================================================

/// An item inside a module, interface, program, or package body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModuleItem {
    /// A package import declaration.
    Import(ImportDecl),
    /// A `parameter` or `localparam` declaration.
    Param(ParamDecl),
    /// A `typedef` declaration.
    Typedef(TypedefDecl),
    /// A forward `typedef` declaration.
    ForwardTypedef(ForwardTypedefDecl),
    /// A variable or net declaration.
    Data(DataDecl),
    /// A non-ANSI port declaration in the body.
    Port(PortDecl),
    /// A hierarchy instantiation.
    Instantiation(HierarchyInstantiation),
    /// A continuous assignment.
    ContinuousAssign(AssignDecl),
    /// An `initial` or `always*` block.
    Procedural(ProceduralBlock),
    /// A function declaration.
    Function(FunctionDecl),
    /// A `genvar` declaration.
    Genvar(GenvarDecl),
    /// A `generate ... endgenerate` region.
    Generate(GenerateRegion),
    /// A generate `for` loop.
    GenerateFor(GenerateFor),
    /// A generate `if`.
    GenerateIf(GenerateIf),
    /// A `modport` declaration (interfaces only).
    Modport(ModportDecl),
    /// An error node produced during recovery.
    Error(Span),
}

/// A package import declaration (`import p::*, q::name;`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportDecl {
    /// The imported items.
    pub items: Vec<ImportItem>,
    /// Source span.
    pub span: Span,
}

/// One `pkg::item` or `pkg::*` of an import declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportItem {
    /// The package name.
    pub package: Ident,
    /// The imported name, or `None` for a wildcard.
    pub name: Option<Ident>,
    /// Source span.
    pub span: Span,
}

/// A `parameter`, `localparam`, or `parameter type` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    /// `localparam` rather than `parameter`.
    pub local: bool,
    /// Whether this declaration appeared in a parameter port list.
    pub is_port: bool,
    /// Value or type parameter body.
    pub kind: ParamKind,
    /// Source span.
    pub span: Span,
}

/// The body of a parameter declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParamKind {
    /// Value parameters with an optional shared data type.
    Value {
        /// The declared type, if given.
        ty: Option<DataType>,
        /// The declared names and defaults.
        decls: Vec<Declarator>,
    },
    /// Type parameters (`parameter type T = int`).
    Type {
        /// The declared names and default types.
        decls: Vec<TypeParamDecl>,
    },
}

/// One name of a `parameter type` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeParamDecl {
    /// The parameter name.
    pub name: Ident,
    /// The default type, if given.
    pub default: Option<DataType>,
    /// Source span.
    pub span: Span,
}

/// A `typedef` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedefDecl {
    /// The aliased type.
    pub ty: DataType,
    /// The new type name.
    pub name: Ident,
    /// Unpacked dimensions after the name.
    pub dims: Vec<Dimension>,
    /// Source span.
    pub span: Span,
}

/// A forward `typedef` declaration (`typedef enum e_t;`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardTypedefDecl {
    /// The declared category restriction.
    pub category: ForwardCategory,
    /// The forward-declared name.
    pub name: Ident,
    /// Source span.
    pub span: Span,
}

/// The category keyword of a forward typedef.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardCategory {
    /// `typedef name;`
    None,
    /// `typedef enum name;`
    Enum,
    /// `typedef struct name;`
    Struct,
    /// `typedef union name;`
    Union,
    /// `typedef class name;`
    Class,
    /// `typedef interface class name;`
    InterfaceClass,
}

/// A variable or net declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataDecl {
    /// The net type keyword, or `None` for a variable declaration.
    pub net: Option<NetTypeKeyword>,
    /// The declared data type.
    pub ty: DataType,
    /// The declared names.
    pub declarators: Vec<Declarator>,
    /// Source span.
    pub span: Span,
}

/// A hierarchy instantiation: `mod_name #(params) inst1 (...), inst2 (...);`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyInstantiation {
    /// The instantiated definition's name.
    pub definition: Ident,
    /// The span of the definition name token.
    pub definition_span: Span,
    /// Parameter value assignments from `#(...)`.
    pub params: Vec<ParamAssignment>,
    /// The declared instances.
    pub instances: Vec<HierarchicalInstance>,
    /// Source span.
    pub span: Span,
}

/// One parameter value assignment in an instantiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParamAssignment {
    /// A positional assignment.
    Ordered {
        /// The assigned value.
        value: Expr,
        /// Source span.
        span: Span,
    },
    /// A named assignment (`.*name*(value)`); the value may be omitted to
    /// take the default.
    Named {
        /// The parameter name.
        name: Ident,
        /// The assigned value, if given.
        value: Option<Expr>,
        /// Source span.
        span: Span,
    },
}

impl ParamAssignment {
    /// The source span of this assignment.
    pub fn span(&self) -> Span {
        match self {
            ParamAssignment::Ordered { span, .. } | ParamAssignment::Named { span, .. } => *span,
        }
    }
}

/// One instance of a hierarchy instantiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchicalInstance {
    /// The instance name.
    pub name: Ident,
    /// Instance array dimensions.
    pub dims: Vec<Dimension>,
    /// Port connections.
    pub connections: Vec<PortConnection>,
    /// Source span.
    pub span: Span,
}

/// One port connection of an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PortConnection {
    /// A positional connection; empty slots are `None`.
    Ordered {
        /// The connected expression, if present.
        expr: Option<Expr>,
        /// Source span.
        span: Span,
    },
    /// A named connection (`.port(expr)`, `.port()`, or `.port`).
    Named {
        /// The port name.
        name: Ident,
        /// The connected expression, if present.
        expr: Option<Expr>,
        /// Source span.
        span: Span,
    },
    /// The `.*` wildcard connection.
    Wildcard(Span),
}

/// A continuous assignment item (`assign a = b, c = d;`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignDecl {
    /// The (target, value) pairs.
    pub assignments: Vec<(Expr, Expr)>,
    /// Source span.
    pub span: Span,
}

/// A procedural block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProceduralBlock {
    /// Which procedural construct introduced the block.
    pub kind: ProceduralKind,
    /// The body statement.
    pub body: Statement,
    /// Source span.
    pub span: Span,
}

/// The kind of a procedural block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProceduralKind {
    /// `initial`
    Initial,
    /// `always`
    Always,
    /// `always_comb`
    AlwaysComb,
    /// `always_ff`
    AlwaysFf,
    /// `always_latch`
    AlwaysLatch,
}

/// A function declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// Whether the function is `automatic`.
    pub automatic: bool,
    /// The return type (void if omitted).
    pub return_type: DataType,
    /// The function name.
    pub name: Ident,
    /// The formal arguments.
    pub args: Vec<FunctionArg>,
    /// Declarations and statements in the body.
    pub body: Vec<Statement>,
    /// Optional end label.
    pub end_label: Option<Ident>,
    /// Source span.
    pub span: Span,
}

/// One formal argument of a function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionArg {
    /// Argument direction (defaults to input).
    pub direction: Direction,
    /// The argument type.
    pub ty: DataType,
    /// The argument name.
    pub name: Ident,
    /// Optional default value.
    pub default: Option<Expr>,
    /// Source span.
    pub span: Span,
}

/// A `genvar` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenvarDecl {
    /// The declared genvar names.
    pub names: Vec<Ident>,
    /// Source span.
    pub span: Span,
}

/// A `generate ... endgenerate` region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRegion {
    /// Items in the region.
    pub items: Vec<ModuleItem>,
    /// Source span.
    pub span: Span,
}

/// A generate `for` loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateFor {
    /// The loop variable name.
    pub genvar: Ident,
    /// The initializer expression.
    pub init: Expr,
    /// The loop condition.
    pub cond: Expr,
    /// The step assignment.
    pub step: Expr,
    /// Optional block label.
    pub label: Option<Ident>,
    /// The repeated items.
    pub items: Vec<ModuleItem>,
    /// Source span.
    pub span: Span,
}

/// A generate `if`/`else`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateIf {
    /// The condition.
    pub cond: Expr,
    /// Items when the condition holds.
    pub then_items: Vec<ModuleItem>,
    /// Items when it does not.
    pub else_items: Vec<ModuleItem>,
    /// Source span.
    pub span: Span,
}

/// A `modport` declaration inside an interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModportDecl {
    /// The modport name.
    pub name: Ident,
    /// The (direction, signal) pairs.
    pub ports: Vec<(Direction, Ident)>,
    /// Source span.
    pub span: Span,
}

// ============================================================================
// Statements
// ============================================================================

/// A procedural statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    /// A `begin ... end` block with declarations and statements.
    Block {
        /// Optional block label.
        label: Option<Ident>,
        /// The contained statements.
        body: Vec<Statement>,
        /// Source span.
        span: Span,
    },
    /// A local variable declaration inside a block.
    VarDecl(DataDecl),
    /// An `if` statement.
    If {
        /// `unique` / `priority` qualifier.
        qualifier: Option<CaseQualifier>,
        /// The condition.
        cond: Expr,
        /// The then-branch.
        then_stmt: Box<Statement>,
        /// The else-branch.
        else_stmt: Option<Box<Statement>>,
        /// Source span.
        span: Span,
    },
    /// A `case`, `casex`, or `casez` statement.
    Case {
        /// `unique` / `priority` qualifier.
        qualifier: Option<CaseQualifier>,
        /// Which case keyword.
        keyword: CaseKeyword,
        /// The selector expression.
        expr: Expr,
        /// The case arms.
        items: Vec<CaseItem>,
        /// Source span.
        span: Span,
    },
    /// A `for` loop.
    For {
        /// The initializer (declaration or assignment).
        init: Box<Statement>,
        /// The loop condition.
        cond: Option<Expr>,
        /// The step statement.
        step: Option<Box<Statement>>,
        /// The loop body.
        body: Box<Statement>,
        /// Source span.
        span: Span,
    },
    /// A `while` loop.
    While {
        /// The loop condition.
        cond: Expr,
        /// The loop body.
        body: Box<Statement>,
        /// Source span.
        span: Span,
    },
    /// A `do ... while` loop.
    DoWhile {
        /// The loop body.
        body: Box<Statement>,
        /// The loop condition.
        cond: Expr,
        /// Source span.
        span: Span,
    },
    /// A `repeat (n)` loop.
    Repeat {
        /// The repetition count.
        count: Expr,
        /// The loop body.
        body: Box<Statement>,
        /// Source span.
        span: Span,
    },
    /// A `forever` loop.
    Forever {
        /// The loop body.
        body: Box<Statement>,
        /// Source span.
        span: Span,
    },
    /// A blocking or nonblocking assignment.
    Assign {
        /// The assignment target.
        target: Expr,
        /// The assigned value.
        value: Expr,
        /// Nonblocking (`<=`) rather than blocking (`=`).
        nonblocking: bool,
        /// The compound operator, if this was `+=` and friends.
        op: Option<BinaryOp>,
        /// Source span.
        span: Span,
    },
    /// An expression evaluated as a statement (calls, `x++`).
    ExprStmt {
        /// The expression.
        expr: Expr,
        /// Source span.
        span: Span,
    },
    /// A statement guarded by an event control (`@(posedge clk) ...`).
    Timed {
        /// The sensitivity specification.
        sensitivity: Sensitivity,
        /// The guarded statement.
        body: Box<Statement>,
        /// Source span.
        span: Span,
    },
    /// A statement delayed by `#n`.
    Delayed {
        /// The delay expression.
        delay: Expr,
        /// The delayed statement.
        body: Box<Statement>,
        /// Source span.
        span: Span,
    },
    /// A `return` statement.
    Return {
        /// The returned value, if present.
        value: Option<Expr>,
        /// Source span.
        span: Span,
    },
    /// A `break` statement.
    Break(Span),
    /// A `continue` statement.
    Continue(Span),
    /// A lone semicolon.
    Null(Span),
    /// An error node produced during recovery.
    Error(Span),
}

/// The `unique`/`priority` qualifier on case and if statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseQualifier {
    /// `unique`
    Unique,
    /// `priority`
    Priority,
}

/// Which case keyword introduced a case statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseKeyword {
    /// `case`
    Case,
    /// `casex`
    Casex,
    /// `casez`
    Casez,
}

/// One arm of a case statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseItem {
    /// The match expressions; empty for `default`.
    pub exprs: Vec<Expr>,
    /// The arm body.
    pub body: Statement,
    /// Source span.
    pub span: Span,
}

/// The sensitivity of a timed statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Sensitivity {
    /// `@(*)` or `@*`
    Star,
    /// `@(a or posedge b, ...)`
    List(Vec<EventItem>),
}

/// One event of a sensitivity list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventItem {
    /// The edge qualifier, if any.
    pub edge: Option<EdgeKind>,
    /// The watched expression.
    pub expr: Expr,
    /// Source span.
    pub span: Span,
}

/// Edge qualifiers in sensitivity lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// `posedge`
    Posedge,
    /// `negedge`
    Negedge,
    /// `edge`
    Edge,
}

// ============================================================================
// Expressions
// ============================================================================

/// An expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// A literal value.
    Literal(LiteralExpr),
    /// A simple name reference.
    Ident {
        /// The referenced name.
        name: Ident,
        /// Source span.
        span: Span,
    },
    /// A package-scoped name (`pkg::name`).
    Scoped {
        /// The package name.
        package: Ident,
        /// The name within the package.
        name: Ident,
        /// Source span.
        span: Span,
    },
    /// A unary operator application.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
        /// Source span.
        span: Span,
    },
    /// A binary operator application.
    Binary {
        /// The left operand.
        left: Box<Expr>,
        /// The operator.
        op: BinaryOp,
        /// The right operand.
        right: Box<Expr>,
        /// Source span.
        span: Span,
    },
    /// The conditional operator `c ? a : b`.
    Ternary {
        /// The condition.
        cond: Box<Expr>,
        /// The value when true.
        then_expr: Box<Expr>,
        /// The value when false.
        else_expr: Box<Expr>,
        /// Source span.
        span: Span,
    },
    /// A concatenation `{a, b, c}`.
    Concat {
        /// The concatenated parts, most significant first.
        parts: Vec<Expr>,
        /// Source span.
        span: Span,
    },
    /// A replication `{n{expr, ...}}`.
    Replication {
        /// The replication count.
        count: Box<Expr>,
        /// The replicated concatenation.
        inner: Box<Expr>,
        /// Source span.
        span: Span,
    },
    /// A bit or element select `value[index]`.
    Index {
        /// The selected value.
        value: Box<Expr>,
        /// The index expression.
        index: Box<Expr>,
        /// Source span.
        span: Span,
    },
    /// A part select `value[l:r]`, `value[b+:w]`, or `value[b-:w]`.
    RangeSelect {
        /// The selected value.
        value: Box<Expr>,
        /// Which select form.
        kind: RangeSelectKind,
        /// The left / base expression.
        left: Box<Expr>,
        /// The right / width expression.
        right: Box<Expr>,
        /// Source span.
        span: Span,
    },
    /// A member access `value.name`.
    Member {
        /// The accessed value.
        value: Box<Expr>,
        /// The member name.
        name: Ident,
        /// Source span.
        span: Span,
    },
    /// A call of a user-defined subroutine.
    Call {
        /// The called expression (a name).
        callee: Box<Expr>,
        /// The call arguments.
        args: Vec<Expr>,
        /// Source span.
        span: Span,
    },
    /// A call of a system subroutine (`$clog2(x)`).
    SystemCall {
        /// The system name, without the `$`.
        name: Ident,
        /// The call arguments.
        args: Vec<Expr>,
        /// Source span.
        span: Span,
    },
    /// A cast `target'(operand)`.
    Cast {
        /// The cast target (a type name, keyword type, or width).
        target: Box<Expr>,
        /// The value being cast.
        operand: Box<Expr>,
        /// Source span.
        span: Span,
    },
    /// A built-in type keyword used as a cast target.
    TypeRef {
        /// The named type keyword.
        ty: DataTypeKind,
        /// Source span.
        span: Span,
    },
    /// An `inside` set membership test.
    Inside {
        /// The tested expression.
        expr: Box<Expr>,
        /// The member values and ranges.
        ranges: Vec<Expr>,
        /// Source span.
        span: Span,
    },
    /// An assignment pattern `'{...}`.
    AssignmentPattern {
        /// The element expressions.
        parts: Vec<Expr>,
        /// Source span.
        span: Span,
    },
    /// A pre/post increment or decrement.
    IncDec {
        /// The modified target.
        target: Box<Expr>,
        /// True for `++`.
        increment: bool,
        /// True when the operator preceded the operand.
        prefix: bool,
        /// Source span.
        span: Span,
    },
    /// An error node produced during recovery.
    Error(Span),
}

/// A literal expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LiteralExpr {
    /// A plain decimal integer.
    Integer {
        /// The decoded value, if it fits in 64 bits.
        value: Option<u64>,
        /// Source span.
        span: Span,
    },
    /// A vector literal (`[size]'[s]base digits`).
    Vector {
        /// The explicit size, if one was written.
        size: Option<u32>,
        /// Whether the base token carried an `s`.
        signed: bool,
        /// The numeric base.
        base: Base,
        /// The span of the digits token (raw text holds the digits).
        digits_span: Span,
        /// Source span of the whole literal.
        span: Span,
    },
    /// An unbased unsized literal (`'0`, `'1`, `'x`, `'z`).
    UnbasedUnsized {
        /// The replicated bit.
        bit: Logic,
        /// Source span.
        span: Span,
    },
    /// A real literal.
    Real {
        /// The decoded value.
        value: f64,
        /// Source span.
        span: Span,
    },
    /// A time literal.
    Time {
        /// The decoded magnitude.
        value: f64,
        /// The unit suffix.
        unit: TimeUnit,
        /// Source span.
        span: Span,
    },
    /// A string literal.
    Str {
        /// The decoded content.
        value: String,
        /// Source span.
        span: Span,
    },
    /// The `null` literal.
    Null {
        /// Source span.
        span: Span,
    },
}

/// Which part-select form was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeSelectKind {
    /// `[left:right]`
    Simple,
    /// `[base+:width]`
    IndexedUp,
    /// `[base-:width]`
    IndexedDown,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `!`
    LogicalNot,
    /// `~`
    BitwiseNot,
    /// `&`
    ReductionAnd,
    /// `~&`
    ReductionNand,
    /// `|`
    ReductionOr,
    /// `~|`
    ReductionNor,
    /// `^`
    ReductionXor,
    /// `~^`
    ReductionXnor,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `==`
    Eq,
    /// `!=`
    Neq,
    /// `===`
    CaseEq,
    /// `!==`
    CaseNeq,
    /// `==?`
    WildEq,
    /// `!=?`
    WildNeq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    LogAnd,
    /// `||`
    LogOr,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `~^` / `^~`
    BitXnor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `<<<`
    AShl,
    /// `>>>`
    AShr,
}

impl Expr {
    /// The source span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(lit) => lit.span(),
            Expr::Ident { span, .. }
            | Expr::Scoped { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Concat { span, .. }
            | Expr::Replication { span, .. }
            | Expr::Index { span, .. }
            | Expr::RangeSelect { span, .. }
            | Expr::Member { span, .. }
            | Expr::Call { span, .. }
            | Expr::SystemCall { span, .. }
            | Expr::Cast { span, .. }
            | Expr::TypeRef { span, .. }
            | Expr::Inside { span, .. }
            | Expr::AssignmentPattern { span, .. }
            | Expr::IncDec { span, .. } => *span,
            Expr::Error(span) => *span,
        }
    }
}

impl LiteralExpr {
    /// The source span of this literal.
    pub fn span(&self) -> Span {
        match self {
            LiteralExpr::Integer { span, .. }
            | LiteralExpr::Vector { span, .. }
            | LiteralExpr::UnbasedUnsized { span, .. }
            | LiteralExpr::Real { span, .. }
            | LiteralExpr::Time { span, .. }
            | LiteralExpr::Str { span, .. }
            | LiteralExpr::Null { span } => *span,
        }
    }
}

impl Statement {
    /// The source span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Statement::Block { span, .. }
            | Statement::If { span, .. }
            | Statement::Case { span, .. }
            | Statement::For { span, .. }
            | Statement::While { span, .. }
            | Statement::DoWhile { span, .. }
            | Statement::Repeat { span, .. }
            | Statement::Forever { span, .. }
            | Statement::Assign { span, .. }
            | Statement::ExprStmt { span, .. }
            | Statement::Timed { span, .. }
            | Statement::Delayed { span, .. }
            | Statement::Return { span, .. } => *span,
            Statement::VarDecl(decl) => decl.span,
            Statement::Break(span)
            | Statement::Continue(span)
            | Statement::Null(span)
            | Statement::Error(span) => *span,
        }
    }
}
