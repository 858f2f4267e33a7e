//! Bound expressions and the syntax-to-expression binder.
//!
//! `bind_expr` classifies a syntax node, recurses on children, computes the
//! result type under SystemVerilog's context-determined rules (widest
//! operand width; signed only if all operands are signed; four-state if any
//! operand is four-state), inserts implicit conversions, checks legality,
//! and — in constant contexts — folds the expression and caches the value.
//!
//! A failed binding produces a `bad` expression carrying the error type;
//! callers treat it as opaque and do not issue cascading diagnostics.

use crate::arena::define_arena_id;
use crate::compilation::{BindContext, Compilation};
use crate::symbol::{SymbolId, SymbolKind};
use crate::types::{FloatKind, ScalarKind, Type, TypeId};
use crate::value::{ConstantValue, SvInt};
use sable_common::{Ident, LogicVec};
use sable_diagnostics::DiagCode;
use sable_source::Span;
use sable_syntax::ast::{self, BinaryOp, Expr, LiteralExpr, UnaryOp};
use sable_syntax::token::Base;

define_arena_id!(
    /// Stable identity of a bound [`Expression`].
    ExprId
);

/// A bound, typed expression.
#[derive(Debug)]
pub struct Expression {
    /// The expression's shape.
    pub kind: ExprKind,
    /// The expression's type.
    pub ty: TypeId,
    /// The cached constant value, when the expression is constant in
    /// context.
    pub constant: Option<ConstantValue>,
    /// Source span.
    pub span: Span,
}

impl Expression {
    /// Whether this is the error sentinel.
    pub fn bad(&self) -> bool {
        matches!(self.kind, ExprKind::Invalid)
    }
}

/// The tagged variant over bound expression kinds.
#[derive(Debug)]
pub enum ExprKind {
    /// The error sentinel; carries the error type.
    Invalid,
    /// A literal; the value lives in [`Expression::constant`].
    Literal,
    /// A reference to a named symbol.
    NamedValue(SymbolId),
    /// A unary operator.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: ExprId,
    },
    /// A binary operator.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// The left operand.
        left: ExprId,
        /// The right operand.
        right: ExprId,
    },
    /// The conditional operator.
    Conditional {
        /// The condition.
        cond: ExprId,
        /// The value when true.
        left: ExprId,
        /// The value when false.
        right: ExprId,
    },
    /// A concatenation.
    Concat {
        /// The parts, most significant first.
        parts: Vec<ExprId>,
    },
    /// A replication with a constant count.
    Replication {
        /// The evaluated count.
        count: u32,
        /// The replicated operand.
        inner: ExprId,
    },
    /// A bit or element select.
    ElementSelect {
        /// The selected value.
        value: ExprId,
        /// The index.
        index: ExprId,
    },
    /// A part select with evaluated constant bounds.
    RangeSelect {
        /// The selected value.
        value: ExprId,
        /// The evaluated range.
        range: crate::value::ConstantRange,
    },
    /// A member access on a struct or union value.
    MemberAccess {
        /// The accessed value.
        value: ExprId,
        /// The member name.
        member: Ident,
    },
    /// A call of a user-defined subroutine.
    Call {
        /// The called subroutine symbol.
        subroutine: SymbolId,
        /// The bound arguments.
        args: Vec<ExprId>,
    },
    /// A call of a system subroutine.
    SystemCall {
        /// The system name, without the `$`.
        name: Ident,
        /// The bound arguments.
        args: Vec<ExprId>,
    },
    /// An `inside` set membership test.
    Inside {
        /// The tested expression.
        expr: ExprId,
        /// The member values.
        ranges: Vec<ExprId>,
    },
    /// An assignment pattern; element typing follows the assignment target.
    AssignmentPattern {
        /// The bound element expressions.
        parts: Vec<ExprId>,
    },
    /// An implicit or explicit conversion to this expression's type.
    Conversion {
        /// The converted operand.
        operand: ExprId,
    },
}

impl<'a> Compilation<'a> {
    /// Allocates a bound expression.
    pub(crate) fn alloc_expr(&mut self, expr: Expression) -> ExprId {
        self.exprs.alloc(expr)
    }

    /// Returns a bound expression.
    pub fn expression(&self, id: ExprId) -> &Expression {
        &self.exprs[id]
    }

    /// Allocates the error sentinel expression.
    pub(crate) fn bad_expr(&mut self, span: Span) -> ExprId {
        let ty = self.types.error();
        self.alloc_expr(Expression {
            kind: ExprKind::Invalid,
            ty,
            constant: None,
            span,
        })
    }

    /// Builds the canonical type of an anonymous vector value.
    pub(crate) fn make_vector_type(&mut self, width: u32, signed: bool, four_state: bool) -> TypeId {
        let kind = if four_state {
            ScalarKind::Logic
        } else {
            ScalarKind::Bit
        };
        if width == 1 {
            return self.types.intern(Type::Scalar { kind, signed });
        }
        let element = self.types.intern(Type::Scalar {
            kind,
            signed: false,
        });
        self.types.intern(Type::PackedArray {
            element,
            range: crate::value::ConstantRange::new(width as i32 - 1, 0),
            signed,
        })
    }

    /// Binds an expression syntax node in the given context.
    pub fn bind_expr(&mut self, syntax: &'a Expr, ctx: BindContext) -> ExprId {
        let id = self.bind_expr_inner(syntax, ctx);
        if ctx.flags.constant && !self.exprs[id].bad() && self.exprs[id].constant.is_none() {
            let value = self.eval_expr(id);
            self.exprs[id].constant = value;
        }
        id
    }

    fn bind_expr_inner(&mut self, syntax: &'a Expr, ctx: BindContext) -> ExprId {
        match syntax {
            Expr::Literal(lit) => self.bind_literal(lit),
            Expr::Ident { name, span } => self.bind_name(*name, *span, ctx),
            Expr::Scoped {
                package,
                name,
                span,
            } => self.bind_scoped_name(*package, *name, *span, ctx),
            Expr::Member { value, name, span } => self.bind_member(value, *name, *span, ctx),
            Expr::Unary { op, operand, span } => self.bind_unary(*op, operand, *span, ctx),
            Expr::Binary {
                left,
                op,
                right,
                span,
            } => self.bind_binary(*op, left, right, *span, ctx),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
                span,
            } => self.bind_conditional(cond, then_expr, else_expr, *span, ctx),
            Expr::Concat { parts, span } => self.bind_concat(parts, *span, ctx),
            Expr::Replication { count, inner, span } => {
                self.bind_replication(count, inner, *span, ctx)
            }
            Expr::Index { value, index, span } => self.bind_index(value, index, *span, ctx),
            Expr::RangeSelect {
                value,
                kind,
                left,
                right,
                span,
            } => self.bind_range_select(value, *kind, left, right, *span, ctx),
            Expr::Call { callee, args, span } => self.bind_call(callee, args, *span, ctx),
            Expr::SystemCall { name, args, span } => {
                self.bind_system_call(*name, args, *span, ctx)
            }
            Expr::Cast {
                target,
                operand,
                span,
            } => self.bind_cast(target, operand, *span, ctx),
            Expr::Inside { expr, ranges, span } => {
                let inner = self.bind_expr(expr, ctx);
                let mut bound = Vec::with_capacity(ranges.len());
                for range in ranges {
                    bound.push(self.bind_expr(range, ctx));
                }
                let ty = self.make_vector_type(1, false, true);
                self.alloc_expr(Expression {
                    kind: ExprKind::Inside {
                        expr: inner,
                        ranges: bound,
                    },
                    ty,
                    constant: None,
                    span: *span,
                })
            }
            Expr::AssignmentPattern { parts, span } => {
                let mut bound = Vec::with_capacity(parts.len());
                for part in parts {
                    bound.push(self.bind_expr(part, ctx));
                }
                // The pattern's own type comes from its assignment target;
                // standalone it stays opaque.
                let ty = self.types.error();
                self.alloc_expr(Expression {
                    kind: ExprKind::AssignmentPattern { parts: bound },
                    ty,
                    constant: None,
                    span: *span,
                })
            }
            Expr::IncDec { target, span, .. } => {
                if ctx.flags.constant {
                    self.diag(
                        DiagCode::NotConstant,
                        "increment and decrement are not constant expressions",
                        *span,
                    );
                    return self.bad_expr(*span);
                }
                let inner = self.bind_expr(target, ctx);
                let ty = self.exprs[inner].ty;
                self.alloc_expr(Expression {
                    kind: ExprKind::Conversion { operand: inner },
                    ty,
                    constant: None,
                    span: *span,
                })
            }
            Expr::TypeRef { span, .. } => {
                self.diag(
                    DiagCode::ExpectedExpression,
                    "a type is not allowed here",
                    *span,
                );
                self.bad_expr(*span)
            }
            Expr::Error(span) => self.bad_expr(*span),
        }
    }

    // ========================================================================
    // Leaves
    // ========================================================================

    fn bind_literal(&mut self, lit: &LiteralExpr) -> ExprId {
        match lit {
            LiteralExpr::Integer { value, span } => {
                let value = value.unwrap_or(0);
                let ty = self.types.int();
                self.alloc_expr(Expression {
                    kind: ExprKind::Literal,
                    ty,
                    constant: Some(ConstantValue::Vector(SvInt {
                        value: LogicVec::from_u64(value, 32),
                        signed: true,
                    })),
                    span: *span,
                })
            }
            LiteralExpr::Vector {
                size,
                signed,
                base,
                digits_span,
                span,
            } => {
                let digits = self.source_db.snippet(*digits_span).to_string();
                let radix = match base {
                    Base::Decimal => 10,
                    Base::Binary => 2,
                    Base::Octal => 8,
                    Base::Hex => 16,
                };
                let parsed = LogicVec::from_digits(radix, &digits)
                    .unwrap_or_else(|| LogicVec::all_x(size.unwrap_or(32)));
                // Unsized based literals are at least 32 bits wide.
                let width = size.unwrap_or_else(|| parsed.width().max(32));
                let bits = parsed.resize(width, false);
                let ty = self.make_vector_type(width, *signed, true);
                self.alloc_expr(Expression {
                    kind: ExprKind::Literal,
                    ty,
                    constant: Some(ConstantValue::Vector(SvInt {
                        value: bits,
                        signed: *signed,
                    })),
                    span: *span,
                })
            }
            LiteralExpr::UnbasedUnsized { bit, span } => {
                let ty = self.make_vector_type(1, false, true);
                self.alloc_expr(Expression {
                    kind: ExprKind::Literal,
                    ty,
                    constant: Some(ConstantValue::UnboundedBit(*bit)),
                    span: *span,
                })
            }
            LiteralExpr::Real { value, span } => {
                let ty = self.types.intern(Type::Floating(FloatKind::Real));
                self.alloc_expr(Expression {
                    kind: ExprKind::Literal,
                    ty,
                    constant: Some(ConstantValue::Real(*value)),
                    span: *span,
                })
            }
            LiteralExpr::Time { value, unit, span } => {
                // Time literals carry their unit scale into a real value.
                let scale = match unit {
                    sable_syntax::token::TimeUnit::Seconds => 1.0,
                    sable_syntax::token::TimeUnit::Milliseconds => 1e-3,
                    sable_syntax::token::TimeUnit::Microseconds => 1e-6,
                    sable_syntax::token::TimeUnit::Nanoseconds => 1e-9,
                    sable_syntax::token::TimeUnit::Picoseconds => 1e-12,
                    sable_syntax::token::TimeUnit::Femtoseconds => 1e-15,
                };
                let ty = self.types.intern(Type::Floating(FloatKind::RealTime));
                self.alloc_expr(Expression {
                    kind: ExprKind::Literal,
                    ty,
                    constant: Some(ConstantValue::Real(value * scale)),
                    span: *span,
                })
            }
            LiteralExpr::Str { value, span } => {
                let ty = self.types.intern(Type::Str);
                self.alloc_expr(Expression {
                    kind: ExprKind::Literal,
                    ty,
                    constant: Some(ConstantValue::Str(value.clone())),
                    span: *span,
                })
            }
            LiteralExpr::Null { span } => {
                let ty = self.types.intern(Type::Void);
                self.alloc_expr(Expression {
                    kind: ExprKind::Literal,
                    ty,
                    constant: Some(ConstantValue::Null),
                    span: *span,
                })
            }
        }
    }

    fn bind_name(&mut self, name: Ident, span: Span, ctx: BindContext) -> ExprId {
        let Some(symbol) = self.lookup_name(name, &ctx) else {
            self.diag(
                DiagCode::UndeclaredIdentifier,
                format!("`{}` is not declared", self.interner.resolve(name)),
                span,
            );
            return self.bad_expr(span);
        };
        let ty = self.symbol_type(symbol);
        self.alloc_expr(Expression {
            kind: ExprKind::NamedValue(symbol),
            ty,
            constant: None,
            span,
        })
    }

    fn bind_scoped_name(
        &mut self,
        package: Ident,
        name: Ident,
        span: Span,
        _ctx: BindContext,
    ) -> ExprId {
        let Some(pkg_scope) = self.package_scope(package) else {
            self.diag(
                DiagCode::UndeclaredIdentifier,
                format!("package `{}` is not declared", self.interner.resolve(package)),
                span,
            );
            return self.bad_expr(span);
        };
        let Some(symbol) = self.lookup_member(pkg_scope, name) else {
            self.diag(
                DiagCode::UnknownMember,
                format!(
                    "`{}` is not a member of package `{}`",
                    self.interner.resolve(name),
                    self.interner.resolve(package)
                ),
                span,
            );
            return self.bad_expr(span);
        };
        let ty = self.symbol_type(symbol);
        self.alloc_expr(Expression {
            kind: ExprKind::NamedValue(symbol),
            ty,
            constant: None,
            span,
        })
    }

    /// Binds `value.name`: hierarchical access through an instance, or a
    /// struct/union field access.
    fn bind_member(&mut self, value: &'a Expr, name: Ident, span: Span, ctx: BindContext) -> ExprId {
        // The prefix is not folded on its own: whether the whole access is
        // constant is decided at the outer expression, and a hierarchical
        // prefix must be recognized before any constant complaint.
        let mut inner_ctx = ctx;
        inner_ctx.flags.constant = false;
        let inner = self.bind_expr(value, inner_ctx);
        if self.exprs[inner].bad() {
            return inner;
        }

        // A named reference to a scope-bearing symbol makes this a
        // hierarchical lookup.
        let named = match &self.exprs[inner].kind {
            ExprKind::NamedValue(symbol) => Some(*symbol),
            _ => None,
        };
        if let Some(symbol) = named {
            if let Some(scope) = self.symbols[symbol].owned_scope() {
                if ctx.flags.constant || ctx.flags.no_hierarchical {
                    self.diag(
                        DiagCode::HierarchicalReferenceInConstant,
                        "hierarchical names are not allowed in constant expressions",
                        span,
                    );
                    return self.bad_expr(span);
                }
                let Some(member) = self.lookup_member(scope, name) else {
                    let owner = self.symbols[symbol].name;
                    self.diag(
                        DiagCode::UnknownMember,
                        format!(
                            "`{}` is not a member of `{}`",
                            self.interner.resolve(name),
                            self.interner.resolve(owner)
                        ),
                        span,
                    );
                    return self.bad_expr(span);
                };
                let ty = self.symbol_type(member);
                return self.alloc_expr(Expression {
                    kind: ExprKind::NamedValue(member),
                    ty,
                    constant: None,
                    span,
                });
            }
        }

        // Otherwise this must be a field of a struct or union.
        let value_ty = self.exprs[inner].ty;
        match self.types.find_field(value_ty, name) {
            Some(field_ty) => self.alloc_expr(Expression {
                kind: ExprKind::MemberAccess {
                    value: inner,
                    member: name,
                },
                ty: field_ty,
                constant: None,
                span,
            }),
            None => {
                if !self.types.is_error(value_ty) {
                    let desc = self.types.describe(value_ty);
                    self.diag(
                        DiagCode::UnknownMember,
                        format!(
                            "`{}` is not a member of `{desc}`",
                            self.interner.resolve(name)
                        ),
                        span,
                    );
                }
                self.bad_expr(span)
            }
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn bind_unary(&mut self, op: UnaryOp, operand: &'a Expr, span: Span, ctx: BindContext) -> ExprId {
        let inner = self.bind_expr(operand, ctx);
        if self.exprs[inner].bad() {
            return inner;
        }
        let operand_ty = self.exprs[inner].ty;

        let ty = match op {
            UnaryOp::Plus | UnaryOp::Minus | UnaryOp::BitwiseNot => operand_ty,
            UnaryOp::LogicalNot => self.make_vector_type(1, false, true),
            UnaryOp::ReductionAnd
            | UnaryOp::ReductionNand
            | UnaryOp::ReductionOr
            | UnaryOp::ReductionNor
            | UnaryOp::ReductionXor
            | UnaryOp::ReductionXnor => {
                let four_state = self.types.is_four_state(operand_ty);
                self.make_vector_type(1, false, four_state)
            }
        };

        self.alloc_expr(Expression {
            kind: ExprKind::Unary { op, operand: inner },
            ty,
            constant: None,
            span,
        })
    }

    fn bind_binary(
        &mut self,
        op: BinaryOp,
        left: &'a Expr,
        right: &'a Expr,
        span: Span,
        ctx: BindContext,
    ) -> ExprId {
        let lhs = self.bind_expr(left, ctx);
        let rhs = self.bind_expr(right, ctx);
        if self.exprs[lhs].bad() || self.exprs[rhs].bad() {
            return self.bad_expr(span);
        }

        let lt = self.exprs[lhs].ty;
        let rt = self.exprs[rhs].ty;

        use BinaryOp::*;
        let (ty, conv_lhs, conv_rhs) = match op {
            LogAnd | LogOr => {
                let ty = self.make_vector_type(1, false, true);
                (ty, None, None)
            }
            Eq | Neq | CaseEq | CaseNeq | WildEq | WildNeq | Lt | Le | Gt | Ge => {
                // Operands are balanced against each other; the result is a
                // single bit.
                let four_state = self.types.is_four_state(lt)
                    || self.types.is_four_state(rt)
                    || matches!(op, Eq | Neq | WildEq | WildNeq);
                let common = self.common_type(lt, rt);
                let ty = self.make_vector_type(1, false, four_state);
                (ty, common, common)
            }
            Shl | Shr | AShl | AShr => {
                // The right operand is self-determined.
                (lt, None, None)
            }
            Pow => (lt, None, None),
            Add | Sub | Mul | Div | Mod | BitAnd | BitOr | BitXor | BitXnor => {
                let common = self.common_type(lt, rt);
                let ty = common.unwrap_or(lt);
                (ty, common, common)
            }
        };

        let lhs = match conv_lhs {
            Some(target) => self.convert(lhs, target),
            None => lhs,
        };
        let rhs = match conv_rhs {
            Some(target) => self.convert(rhs, target),
            None => rhs,
        };

        self.alloc_expr(Expression {
            kind: ExprKind::Binary {
                op,
                left: lhs,
                right: rhs,
            },
            ty,
            constant: None,
            span,
        })
    }

    /// Computes the context-determined common type of two operand types:
    /// real if either side is real, otherwise the widest width, signed only
    /// if both are signed, four-state if either is.
    fn common_type(&mut self, lt: TypeId, rt: TypeId) -> Option<TypeId> {
        if self.types.is_floating(lt) || self.types.is_floating(rt) {
            return Some(self.types.intern(Type::Floating(FloatKind::Real)));
        }
        let lw = self.types.bit_width(lt)?;
        let rw = self.types.bit_width(rt)?;
        let width = lw.max(rw);
        let signed = self.types.is_signed(lt) && self.types.is_signed(rt);
        let four_state = self.types.is_four_state(lt) || self.types.is_four_state(rt);
        Some(self.make_vector_type(width, signed, four_state))
    }

    /// Inserts a conversion node if `target` differs from the operand type.
    pub(crate) fn convert(&mut self, operand: ExprId, target: TypeId) -> ExprId {
        if self.types.equivalent(self.exprs[operand].ty, target) {
            return operand;
        }
        let span = self.exprs[operand].span;
        self.alloc_expr(Expression {
            kind: ExprKind::Conversion { operand },
            ty: target,
            constant: None,
            span,
        })
    }

    fn bind_conditional(
        &mut self,
        cond: &'a Expr,
        then_expr: &'a Expr,
        else_expr: &'a Expr,
        span: Span,
        ctx: BindContext,
    ) -> ExprId {
        let cond = self.bind_expr(cond, ctx);
        let left = self.bind_expr(then_expr, ctx);
        let right = self.bind_expr(else_expr, ctx);
        if self.exprs[left].bad() || self.exprs[right].bad() || self.exprs[cond].bad() {
            return self.bad_expr(span);
        }
        let lt = self.exprs[left].ty;
        let rt = self.exprs[right].ty;
        let common = self.common_type(lt, rt);
        let ty = common.unwrap_or(lt);
        let left = match common {
            Some(target) => self.convert(left, target),
            None => left,
        };
        let right = match common {
            Some(target) => self.convert(right, target),
            None => right,
        };
        self.alloc_expr(Expression {
            kind: ExprKind::Conditional { cond, left, right },
            ty,
            constant: None,
            span,
        })
    }

    fn bind_concat(&mut self, parts: &'a [Expr], span: Span, ctx: BindContext) -> ExprId {
        let mut bound = Vec::with_capacity(parts.len());
        let mut width = 0u32;
        let mut four_state = false;
        for part in parts {
            let id = self.bind_expr(part, ctx);
            if self.exprs[id].bad() {
                return self.bad_expr(span);
            }
            let ty = self.exprs[id].ty;
            match self.types.bit_width(ty) {
                Some(w) => width += w,
                None => {
                    let desc = self.types.describe(ty);
                    self.diag(
                        DiagCode::BadAssignment,
                        format!("type `{desc}` cannot appear in a concatenation"),
                        self.exprs[id].span,
                    );
                    return self.bad_expr(span);
                }
            }
            four_state |= self.types.is_four_state(ty);
            bound.push(id);
        }
        // Concatenation results are always unsigned.
        let ty = self.make_vector_type(width.max(1), false, four_state);
        self.alloc_expr(Expression {
            kind: ExprKind::Concat { parts: bound },
            ty,
            constant: None,
            span,
        })
    }

    fn bind_replication(
        &mut self,
        count: &'a Expr,
        inner: &'a Expr,
        span: Span,
        ctx: BindContext,
    ) -> ExprId {
        let mut const_ctx = ctx;
        const_ctx.flags.constant = true;
        let count_expr = self.bind_expr(count, const_ctx);
        let count_value = self
            .exprs[count_expr]
            .constant
            .as_ref()
            .and_then(|v| v.to_i64());
        let Some(count_value) = count_value else {
            if !self.exprs[count_expr].bad() {
                self.diag(
                    DiagCode::NotConstant,
                    "replication count must be a constant",
                    count.span(),
                );
            }
            return self.bad_expr(span);
        };
        if count_value < 0 {
            self.diag(
                DiagCode::NotConstant,
                "replication count cannot be negative",
                count.span(),
            );
            return self.bad_expr(span);
        }

        let inner = self.bind_expr(inner, ctx);
        if self.exprs[inner].bad() {
            return inner;
        }
        let inner_ty = self.exprs[inner].ty;
        let Some(inner_width) = self.types.bit_width(inner_ty) else {
            return self.bad_expr(span);
        };
        let four_state = self.types.is_four_state(inner_ty);
        let width = inner_width.saturating_mul(count_value as u32).max(1);
        let ty = self.make_vector_type(width, false, four_state);
        self.alloc_expr(Expression {
            kind: ExprKind::Replication {
                count: count_value as u32,
                inner,
            },
            ty,
            constant: None,
            span,
        })
    }

    // ========================================================================
    // Selects
    // ========================================================================

    fn bind_index(&mut self, value: &'a Expr, index: &'a Expr, span: Span, ctx: BindContext) -> ExprId {
        let value_id = self.bind_expr(value, ctx);
        let index_id = self.bind_expr(index, ctx);
        if self.exprs[value_id].bad() {
            return value_id;
        }
        let value_ty = self.types.canonical(self.exprs[value_id].ty);

        let (elem_ty, range) = match self.types.get(value_ty).clone() {
            Type::PackedArray { element, range, .. } => (element, Some(range)),
            Type::UnpackedArray { element, range } => (element, Some(range)),
            _ if self.types.is_integral(value_ty) => {
                let four_state = self.types.is_four_state(value_ty);
                let width = self.types.bit_width(value_ty).unwrap_or(1);
                let elem = self.make_vector_type(1, false, four_state);
                (
                    elem,
                    Some(crate::value::ConstantRange::new(width as i32 - 1, 0)),
                )
            }
            Type::Error => return self.bad_expr(span),
            _ => {
                let desc = self.types.describe(value_ty);
                self.diag(
                    DiagCode::BadAssignment,
                    format!("type `{desc}` cannot be indexed"),
                    span,
                );
                return self.bad_expr(span);
            }
        };

        // A constant index outside the declared range is diagnosed and
        // evaluates to X. The probe is quiet: a non-constant index is fine.
        let probed = self.try_eval_quiet(index_id).and_then(|v| v.to_i64());
        if let (Some(range), Some(value)) = (range, probed) {
            if i32::try_from(value).map(|v| !range.contains(v)).unwrap_or(true) {
                self.diag(
                    DiagCode::IndexOutOfRange,
                    format!("index {value} is outside the declared range {range}"),
                    span,
                );
            }
        }

        self.alloc_expr(Expression {
            kind: ExprKind::ElementSelect {
                value: value_id,
                index: index_id,
            },
            ty: elem_ty,
            constant: None,
            span,
        })
    }

    fn bind_range_select(
        &mut self,
        value: &'a Expr,
        kind: ast::RangeSelectKind,
        left: &'a Expr,
        right: &'a Expr,
        span: Span,
        ctx: BindContext,
    ) -> ExprId {
        let value_id = self.bind_expr(value, ctx);
        if self.exprs[value_id].bad() {
            return value_id;
        }
        let value_ty = self.exprs[value_id].ty;
        if !self.types.is_integral(value_ty) {
            if !self.types.is_error(value_ty) {
                let desc = self.types.describe(value_ty);
                self.diag(
                    DiagCode::BadAssignment,
                    format!("type `{desc}` does not support part selects"),
                    span,
                );
            }
            return self.bad_expr(span);
        }

        let mut const_ctx = ctx;
        const_ctx.flags.constant = true;

        // Part select bounds (and indexed-select widths) must be constant.
        let left_id = self.bind_expr(left, const_ctx);
        let right_id = self.bind_expr(right, const_ctx);

        let lv = self.exprs[left_id].constant.as_ref().and_then(|v| v.to_i64());
        let rv = self.exprs[right_id].constant.as_ref().and_then(|v| v.to_i64());
        let (Some(lv), Some(rv)) = (lv, rv) else {
            if !self.exprs[left_id].bad() && !self.exprs[right_id].bad() {
                self.diag(
                    DiagCode::NotConstant,
                    "part select bounds must be constant",
                    span,
                );
            }
            return self.bad_expr(span);
        };

        let range = match kind {
            ast::RangeSelectKind::Simple => {
                crate::value::ConstantRange::new(lv as i32, rv as i32)
            }
            ast::RangeSelectKind::IndexedUp => {
                crate::value::ConstantRange::new((lv + rv - 1) as i32, lv as i32)
            }
            ast::RangeSelectKind::IndexedDown => {
                crate::value::ConstantRange::new(lv as i32, (lv - rv + 1) as i32)
            }
        };

        let declared_width = self.types.bit_width(value_ty).unwrap_or(1);
        if range.lower() < 0 || range.upper() >= declared_width as i32 {
            self.diag(
                DiagCode::IndexOutOfRange,
                format!("part select {range} is outside the value's range"),
                span,
            );
        }

        let four_state = self.types.is_four_state(value_ty);
        let ty = self.make_vector_type(range.width(), false, four_state);
        self.alloc_expr(Expression {
            kind: ExprKind::RangeSelect {
                value: value_id,
                range,
            },
            ty,
            constant: None,
            span,
        })
    }

    // ========================================================================
    // Calls and casts
    // ========================================================================

    fn bind_call(
        &mut self,
        callee: &'a Expr,
        args: &'a [Expr],
        span: Span,
        ctx: BindContext,
    ) -> ExprId {
        let Expr::Ident { name, span: name_span } = callee else {
            self.diag(
                DiagCode::ExpectedExpression,
                "only simple subroutine names can be called",
                span,
            );
            return self.bad_expr(span);
        };
        let Some(symbol) = self.lookup_name(*name, &ctx) else {
            self.diag(
                DiagCode::UndeclaredIdentifier,
                format!("`{}` is not declared", self.interner.resolve(*name)),
                *name_span,
            );
            return self.bad_expr(span);
        };
        let syntax = match &self.symbols[symbol].kind {
            SymbolKind::Subroutine { syntax, .. } => *syntax,
            _ => {
                self.diag(
                    DiagCode::ExpectedExpression,
                    format!("`{}` is not a function", self.interner.resolve(*name)),
                    *name_span,
                );
                return self.bad_expr(span);
            }
        };

        let required = syntax
            .args
            .iter()
            .filter(|arg| arg.default.is_none())
            .count();
        if args.len() < required {
            self.diag(
                DiagCode::TooFewArguments,
                format!("expected at least {required} arguments, got {}", args.len()),
                span,
            );
        } else if args.len() > syntax.args.len() {
            self.diag(
                DiagCode::TooManyArguments,
                format!(
                    "expected at most {} arguments, got {}",
                    syntax.args.len(),
                    args.len()
                ),
                span,
            );
        }

        let mut bound = Vec::with_capacity(args.len());
        for arg in args {
            bound.push(self.bind_expr(arg, ctx));
        }

        let return_syntax = &syntax.return_type;
        let ty = self.resolve_data_type(return_syntax, ctx.scope, ctx.location);
        self.alloc_expr(Expression {
            kind: ExprKind::Call {
                subroutine: symbol,
                args: bound,
            },
            ty,
            constant: None,
            span,
        })
    }

    fn bind_cast(
        &mut self,
        target: &'a Expr,
        operand: &'a Expr,
        span: Span,
        ctx: BindContext,
    ) -> ExprId {
        let inner = self.bind_expr(operand, ctx);
        if self.exprs[inner].bad() {
            return inner;
        }

        let target_ty = match target {
            // `int'(x)` and friends.
            Expr::TypeRef { ty, span: ty_span } => self.resolve_builtin_type(ty, None, *ty_span),
            // `mytype_t'(x)`.
            Expr::Ident { name, .. } => match self.lookup_name(*name, &ctx) {
                Some(symbol)
                    if matches!(
                        self.symbols[symbol].kind,
                        SymbolKind::TypeAlias(_) | SymbolKind::TypeParameter(_)
                    ) =>
                {
                    self.symbol_type(symbol)
                }
                _ => {
                    // `16'(x)` style size casts fall through to here when
                    // written with a parameter name; treat unknown names as
                    // errors.
                    self.diag(
                        DiagCode::UndeclaredIdentifier,
                        format!("`{}` is not a type", self.interner.resolve(*name)),
                        target.span(),
                    );
                    return self.bad_expr(span);
                }
            },
            // `16'(x)`: a width cast.
            Expr::Literal(LiteralExpr::Integer { value, .. }) => {
                let width = value.unwrap_or(1).max(1) as u32;
                let operand_ty = self.exprs[inner].ty;
                let signed = self.types.is_signed(operand_ty);
                let four_state = self.types.is_four_state(operand_ty);
                self.make_vector_type(width, signed, four_state)
            }
            _ => {
                self.diag(
                    DiagCode::ExpectedExpression,
                    "invalid cast target",
                    target.span(),
                );
                return self.bad_expr(span);
            }
        };

        self.alloc_expr(Expression {
            kind: ExprKind::Conversion { operand: inner },
            ty: target_ty,
            constant: None,
            span,
        })
    }

    // ========================================================================
    // Assignment checking
    // ========================================================================

    /// Checks that a bound expression can be assigned to `target_ty`,
    /// inserting a conversion when widths differ. Returns the possibly
    /// converted expression.
    pub(crate) fn check_assignment(
        &mut self,
        target_ty: TypeId,
        expr: ExprId,
        span: Span,
    ) -> ExprId {
        if self.exprs[expr].bad()
            || self.types.is_error(target_ty)
            || self.types.is_error(self.exprs[expr].ty)
        {
            return expr;
        }
        let source_ty = self.exprs[expr].ty;

        let target_integral = self.types.is_integral(target_ty);
        let source_integral = self.types.is_integral(source_ty);
        let target_float = self.types.is_floating(target_ty);
        let source_float = self.types.is_floating(source_ty);
        let unbounded =
            matches!(self.exprs[expr].constant, Some(ConstantValue::UnboundedBit(_)));

        let compatible = self.types.equivalent(target_ty, source_ty)
            || (target_integral && (source_integral || source_float || unbounded))
            || (target_float && (source_integral || source_float));

        if !compatible {
            let target_desc = self.types.describe(target_ty);
            let source_desc = self.types.describe(source_ty);
            self.diag(
                DiagCode::BadAssignment,
                format!("cannot assign `{source_desc}` to `{target_desc}`"),
                span,
            );
            return self.bad_expr(span);
        }

        self.convert(expr, target_ty)
    }
}

