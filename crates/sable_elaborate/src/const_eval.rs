//! Constant evaluation over bound expressions.
//!
//! Folds expressions to 4-state vectors, reals, or strings. Propagation
//! follows the LRM: any X/Z operand bit in arithmetic makes the result
//! all-X at the destination width; bitwise operators apply truth tables per
//! bit; division or modulo by zero yields all-X and a non-fatal
//! `DivideByZero`; out-of-range selects yield X bits. Real arithmetic is
//! IEEE-754 double; integer/real conversions round to nearest.

use crate::compilation::Compilation;
use crate::expr::{ExprId, ExprKind};
use crate::symbol::SymbolKind;
use crate::types::TypeId;
use crate::value::{ConstantValue, SvInt};
use sable_common::{Logic, LogicVec};
use sable_diagnostics::DiagCode;
use sable_syntax::ast::{BinaryOp, UnaryOp};

impl<'a> Compilation<'a> {
    /// Evaluates a bound expression to a constant, if it is one.
    ///
    /// Returns `None` (after diagnosing where appropriate) for expressions
    /// that are not constant in this context. Failures never interrupt
    /// elaboration.
    pub fn eval_expr(&mut self, id: ExprId) -> Option<ConstantValue> {
        if let Some(value) = &self.exprs[id].constant {
            return Some(value.clone());
        }
        let span = self.exprs[id].span;
        let ty = self.exprs[id].ty;

        enum Plan {
            Value(Option<ConstantValue>),
            Named(crate::symbol::SymbolId),
            Unary(UnaryOp, ExprId),
            Binary(BinaryOp, ExprId, ExprId),
            Conditional(ExprId, ExprId, ExprId),
            Concat(Vec<ExprId>),
            Replication(u32, ExprId),
            ElementSelect(ExprId, ExprId),
            RangeSelect(ExprId, crate::value::ConstantRange),
            Member(ExprId, sable_common::Ident),
            Inside(ExprId, Vec<ExprId>),
            Conversion(ExprId),
            SystemCall(sable_common::Ident, Vec<ExprId>),
            NotConstant(&'static str),
        }

        let plan = match &self.exprs[id].kind {
            ExprKind::Invalid => Plan::Value(None),
            ExprKind::Literal => Plan::Value(self.exprs[id].constant.clone()),
            ExprKind::NamedValue(symbol) => Plan::Named(*symbol),
            ExprKind::Unary { op, operand } => Plan::Unary(*op, *operand),
            ExprKind::Binary { op, left, right } => Plan::Binary(*op, *left, *right),
            ExprKind::Conditional { cond, left, right } => {
                Plan::Conditional(*cond, *left, *right)
            }
            ExprKind::Concat { parts } => Plan::Concat(parts.clone()),
            ExprKind::Replication { count, inner } => Plan::Replication(*count, *inner),
            ExprKind::ElementSelect { value, index } => Plan::ElementSelect(*value, *index),
            ExprKind::RangeSelect { value, range } => Plan::RangeSelect(*value, *range),
            ExprKind::MemberAccess { value, member } => Plan::Member(*value, *member),
            ExprKind::Inside { expr, ranges } => Plan::Inside(*expr, ranges.clone()),
            ExprKind::Conversion { operand } => Plan::Conversion(*operand),
            ExprKind::SystemCall { name, args } => Plan::SystemCall(*name, args.clone()),
            ExprKind::Call { .. } => Plan::NotConstant("function calls"),
            ExprKind::AssignmentPattern { .. } => Plan::NotConstant("assignment patterns"),
        };

        match plan {
            Plan::Value(value) => value,
            Plan::Named(symbol) => self.constant_value_of(symbol, span),
            Plan::Unary(op, operand) => {
                let value = self.eval_expr(operand)?;
                self.eval_unary(op, value, ty)
            }
            Plan::Binary(op, left, right) => {
                let lv = self.eval_expr(left)?;
                let rv = self.eval_expr(right)?;
                self.eval_binary(op, lv, rv, ty, span)
            }
            Plan::Conditional(cond, left, right) => {
                let cv = self.eval_expr(cond)?;
                match cv.truthiness() {
                    Some(true) => self.eval_expr(left),
                    Some(false) => self.eval_expr(right),
                    None => {
                        // An unknown condition merges the branches: bits
                        // agree or become X.
                        let lv = self.eval_expr(left)?;
                        let rv = self.eval_expr(right)?;
                        match (self.coerce_vector(lv, ty), self.coerce_vector(rv, ty)) {
                            (Some(a), Some(b)) => {
                                let mut out = LogicVec::all_x(a.width());
                                for i in 0..a.width().min(b.width()) {
                                    let (ab, bb) = (a.value.get(i), b.value.get(i));
                                    if ab == bb && !ab.is_unknown() {
                                        out.set(i, ab);
                                    }
                                }
                                Some(ConstantValue::Vector(SvInt {
                                    value: out,
                                    signed: a.signed && b.signed,
                                }))
                            }
                            _ => None,
                        }
                    }
                }
            }
            Plan::Concat(parts) => {
                let mut result: Option<LogicVec> = None;
                for part in parts {
                    let value = self.eval_expr(part)?;
                    let part_ty = self.exprs[part].ty;
                    let vec = self.coerce_vector(value, part_ty)?;
                    result = Some(match result {
                        Some(acc) => acc.concat(&vec.value),
                        None => vec.value,
                    });
                }
                Some(ConstantValue::Vector(SvInt {
                    value: result.unwrap_or_else(|| LogicVec::new(0)),
                    signed: false,
                }))
            }
            Plan::Replication(count, inner) => {
                let value = self.eval_expr(inner)?;
                let inner_ty = self.exprs[inner].ty;
                let vec = self.coerce_vector(value, inner_ty)?;
                let mut result = LogicVec::new(0);
                for _ in 0..count {
                    result = result.concat(&vec.value);
                }
                Some(ConstantValue::Vector(SvInt {
                    value: result,
                    signed: false,
                }))
            }
            Plan::ElementSelect(value, index) => {
                let vec = {
                    let v = self.eval_expr(value)?;
                    let vt = self.exprs[value].ty;
                    self.coerce_vector(v, vt)?
                };
                let index_value = self.eval_expr(index).and_then(|v| v.to_i64());
                let value_ty = self.exprs[value].ty;
                let range = self.declared_range_of(value_ty);
                let elem_width = self.types.bit_width(ty).unwrap_or(1);

                let bits = match (index_value, range) {
                    (Some(index), Some(range))
                        if i32::try_from(index).map(|i| range.contains(i)).unwrap_or(false) =>
                    {
                        let offset = range.offset_of(index as i32) * elem_width;
                        let mut out = LogicVec::new(elem_width);
                        for i in 0..elem_width {
                            if offset + i < vec.width() {
                                out.set(i, vec.value.get(offset + i));
                            }
                        }
                        out
                    }
                    // Out-of-range or unknown index selects X bits.
                    _ => LogicVec::all_x(elem_width),
                };
                Some(ConstantValue::Vector(SvInt {
                    value: bits,
                    signed: false,
                }))
            }
            Plan::RangeSelect(value, select) => {
                let vec = {
                    let v = self.eval_expr(value)?;
                    let vt = self.exprs[value].ty;
                    self.coerce_vector(v, vt)?
                };
                let value_ty = self.exprs[value].ty;
                let declared = self.declared_range_of(value_ty);
                let width = select.width();
                let mut out = LogicVec::all_x(width);
                if let Some(declared) = declared {
                    for i in 0..width {
                        let bit_index = if select.left >= select.right {
                            select.right + i as i32
                        } else {
                            select.right - i as i32
                        };
                        if declared.contains(bit_index) {
                            let offset = declared.offset_of(bit_index);
                            out.set(i, vec.value.get(offset));
                        }
                    }
                }
                Some(ConstantValue::Vector(SvInt {
                    value: out,
                    signed: false,
                }))
            }
            Plan::Member(value, member) => {
                let base = self.eval_expr(value)?;
                let value_ty = self.exprs[value].ty;
                let fields = match self.types.get(self.types.canonical(value_ty)) {
                    crate::types::Type::UnpackedStruct { fields }
                    | crate::types::Type::PackedStruct { fields, .. } => fields.clone(),
                    _ => return None,
                };
                let position = fields.iter().position(|(name, _)| *name == member)?;
                match base {
                    ConstantValue::Aggregate(items) => items.get(position).cloned(),
                    _ => None,
                }
            }
            Plan::Inside(expr, ranges) => {
                let needle = self.eval_expr(expr)?;
                let mut saw_unknown = false;
                for range in ranges {
                    let candidate = self.eval_expr(range)?;
                    match (&needle, &candidate) {
                        (ConstantValue::Vector(a), ConstantValue::Vector(b)) => {
                            let width = a.width().max(b.width());
                            let av = a.value.resize(width, a.signed);
                            let bv = b.value.resize(width, b.signed);
                            match av.logic_eq(&bv) {
                                Logic::One => {
                                    return Some(ConstantValue::int(1, 1, false));
                                }
                                Logic::X | Logic::Z => saw_unknown = true,
                                Logic::Zero => {}
                            }
                        }
                        _ => {
                            if needle == candidate {
                                return Some(ConstantValue::int(1, 1, false));
                            }
                        }
                    }
                }
                if saw_unknown {
                    Some(ConstantValue::Vector(SvInt::all_x(1, false)))
                } else {
                    Some(ConstantValue::int(0, 1, false))
                }
            }
            Plan::Conversion(operand) => {
                let value = self.eval_expr(operand)?;
                self.convert_value(value, ty)
            }
            Plan::SystemCall(name, args) => self.eval_system_call(name, &args, span),
            Plan::NotConstant(what) => {
                self.diag(
                    DiagCode::NotConstant,
                    format!("{what} are not allowed in constant expressions"),
                    span,
                );
                None
            }
        }
    }

    /// The constant value a named symbol contributes, if it names one.
    fn constant_value_of(
        &mut self,
        symbol: crate::symbol::SymbolId,
        span: sable_source::Span,
    ) -> Option<ConstantValue> {
        match &self.symbols[symbol].kind {
            SymbolKind::Parameter(_) => self.parameter_value(symbol),
            SymbolKind::EnumValue { value, .. } => value.clone(),
            _ => {
                let name = self.symbols[symbol].name;
                self.diag(
                    DiagCode::NotConstant,
                    format!(
                        "`{}` is not a constant",
                        self.interner.resolve(name)
                    ),
                    span,
                );
                None
            }
        }
    }

    /// The declared packed range of a type, for select offset math.
    fn declared_range_of(&self, ty: TypeId) -> Option<crate::value::ConstantRange> {
        match self.types.get(self.types.canonical(ty)) {
            crate::types::Type::PackedArray { range, .. }
            | crate::types::Type::UnpackedArray { range, .. } => Some(*range),
            _ => self
                .types
                .bit_width(ty)
                .map(|w| crate::value::ConstantRange::new(w as i32 - 1, 0)),
        }
    }

    /// Coerces a constant to a sized vector using the expression type for
    /// the width of unbounded bits.
    fn coerce_vector(&mut self, value: ConstantValue, ty: TypeId) -> Option<SvInt> {
        match value {
            ConstantValue::Vector(v) => Some(v),
            ConstantValue::UnboundedBit(bit) => {
                let width = self.types.bit_width(ty).unwrap_or(1);
                Some(SvInt {
                    value: LogicVec::filled(width, bit),
                    signed: false,
                })
            }
            _ => None,
        }
    }

    /// Converts a constant value to a target type.
    fn convert_value(&mut self, value: ConstantValue, target: TypeId) -> Option<ConstantValue> {
        if self.types.is_floating(target) {
            return match value {
                ConstantValue::Real(f) => Some(ConstantValue::Real(f)),
                ConstantValue::Vector(v) => {
                    // Unknown bits convert to real as zero.
                    let clean = if v.has_unknown() {
                        0
                    } else {
                        v.to_i64().unwrap_or(0)
                    };
                    Some(ConstantValue::Real(clean as f64))
                }
                ConstantValue::UnboundedBit(Logic::One) => Some(ConstantValue::Real(1.0)),
                ConstantValue::UnboundedBit(_) => Some(ConstantValue::Real(0.0)),
                _ => None,
            };
        }

        let width = self.types.bit_width(target)?;
        let signed = self.types.is_signed(target);
        match value {
            ConstantValue::Vector(v) => Some(ConstantValue::Vector(SvInt {
                value: v.value.resize(width, v.signed),
                signed,
            })),
            ConstantValue::UnboundedBit(bit) => Some(ConstantValue::Vector(SvInt {
                value: LogicVec::filled(width, bit),
                signed,
            })),
            ConstantValue::Real(f) => {
                // Round to nearest, ties away from zero, then wrap.
                let rounded = f.round();
                let as_int = rounded as i64;
                Some(ConstantValue::Vector(SvInt {
                    value: LogicVec::from_u64(as_int as u64, width.min(64))
                        .resize(width, signed),
                    signed,
                }))
            }
            _ => None,
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, value: ConstantValue, ty: TypeId) -> Option<ConstantValue> {
        if let ConstantValue::Real(f) = value {
            return match op {
                UnaryOp::Plus => Some(ConstantValue::Real(f)),
                UnaryOp::Minus => Some(ConstantValue::Real(-f)),
                UnaryOp::LogicalNot => Some(ConstantValue::int((f == 0.0) as u64, 1, false)),
                _ => None,
            };
        }
        let vec = self.coerce_vector(value, ty)?;
        let result = match op {
            UnaryOp::Plus => vec,
            UnaryOp::Minus => {
                if vec.has_unknown() {
                    SvInt::all_x(vec.width(), vec.signed)
                } else {
                    SvInt {
                        value: vec.value.negate(),
                        signed: vec.signed,
                    }
                }
            }
            UnaryOp::BitwiseNot => SvInt {
                value: !&vec.value,
                signed: vec.signed,
            },
            UnaryOp::LogicalNot => {
                return Some(match vec.value.truthiness() {
                    Some(b) => ConstantValue::int(!b as u64, 1, false),
                    None => ConstantValue::Vector(SvInt::all_x(1, false)),
                });
            }
            UnaryOp::ReductionAnd => return Some(bit_value(vec.value.reduce_and())),
            UnaryOp::ReductionNand => return Some(bit_value(!vec.value.reduce_and())),
            UnaryOp::ReductionOr => return Some(bit_value(vec.value.reduce_or())),
            UnaryOp::ReductionNor => return Some(bit_value(!vec.value.reduce_or())),
            UnaryOp::ReductionXor => return Some(bit_value(vec.value.reduce_xor())),
            UnaryOp::ReductionXnor => return Some(bit_value(!vec.value.reduce_xor())),
        };
        Some(ConstantValue::Vector(result))
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: ConstantValue,
        right: ConstantValue,
        ty: TypeId,
        span: sable_source::Span,
    ) -> Option<ConstantValue> {
        use BinaryOp::*;

        // Logical operators work on truthiness with 3-valued logic.
        if matches!(op, LogAnd | LogOr) {
            let lt = left.truthiness();
            let rt = right.truthiness();
            let result = match op {
                LogAnd => match (lt, rt) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                },
                _ => match (lt, rt) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                },
            };
            return Some(match result {
                Some(b) => ConstantValue::int(b as u64, 1, false),
                None => ConstantValue::Vector(SvInt::all_x(1, false)),
            });
        }

        // Real arithmetic and comparisons.
        if let (ConstantValue::Real(a), ConstantValue::Real(b)) = (&left, &right) {
            let (a, b) = (*a, *b);
            return Some(match op {
                Add => ConstantValue::Real(a + b),
                Sub => ConstantValue::Real(a - b),
                Mul => ConstantValue::Real(a * b),
                Div => ConstantValue::Real(a / b),
                Pow => ConstantValue::Real(a.powf(b)),
                Eq => ConstantValue::int((a == b) as u64, 1, false),
                Neq => ConstantValue::int((a != b) as u64, 1, false),
                Lt => ConstantValue::int((a < b) as u64, 1, false),
                Le => ConstantValue::int((a <= b) as u64, 1, false),
                Gt => ConstantValue::int((a > b) as u64, 1, false),
                Ge => ConstantValue::int((a >= b) as u64, 1, false),
                _ => return None,
            });
        }

        let width = self.types.bit_width(ty).unwrap_or(32);
        let signed = self.types.is_signed(ty);
        let (lhs_ty, rhs_ty) = (ty, ty);
        let a = self.coerce_vector(left, lhs_ty)?;
        let b = self.coerce_vector(right, rhs_ty)?;

        // Shift amounts and comparisons use the operands as they are; the
        // arithmetic group works at the result width.
        let result = match op {
            Add | Sub | Mul | Div | Mod | Pow => {
                let av = a.value.resize(width, a.signed);
                let bv = b.value.resize(width, b.signed);
                let bits = match op {
                    Add => av.add_wrap(&bv),
                    Sub => av.sub_wrap(&bv),
                    Mul => av.mul_wrap(&bv),
                    Pow => av.pow(&bv, signed),
                    Div | Mod => {
                        let out = if op == Div {
                            av.div(&bv, signed)
                        } else {
                            av.rem(&bv, signed)
                        };
                        match out {
                            Some(bits) => bits,
                            None => {
                                self.diag(
                                    DiagCode::DivideByZero,
                                    "division by zero in constant expression",
                                    span,
                                );
                                LogicVec::all_x(width)
                            }
                        }
                    }
                    _ => unreachable!(),
                };
                ConstantValue::Vector(SvInt {
                    value: bits,
                    signed,
                })
            }
            BitAnd | BitOr | BitXor | BitXnor => {
                let av = a.value.resize(width, a.signed);
                let bv = b.value.resize(width, b.signed);
                let bits = match op {
                    BitAnd => &av & &bv,
                    BitOr => &av | &bv,
                    BitXor => &av ^ &bv,
                    _ => !&(&av ^ &bv),
                };
                ConstantValue::Vector(SvInt {
                    value: bits,
                    signed,
                })
            }
            Shl | Shr | AShl | AShr => {
                if b.has_unknown() {
                    ConstantValue::Vector(SvInt::all_x(a.width(), a.signed))
                } else {
                    let amount = b.to_i64().unwrap_or(0).clamp(0, u32::MAX as i64) as u32;
                    let bits = match op {
                        Shl | AShl => a.value.shl_bits(amount),
                        AShr if a.signed => a.value.ashr_bits(amount),
                        _ => a.value.lshr_bits(amount),
                    };
                    ConstantValue::Vector(SvInt {
                        value: bits,
                        signed: a.signed,
                    })
                }
            }
            Eq | Neq => {
                let width = a.width().max(b.width());
                let av = a.value.resize(width, a.signed);
                let bv = b.value.resize(width, b.signed);
                let eq = av.logic_eq(&bv);
                bit_value(match op {
                    Eq => eq,
                    _ => !eq,
                })
            }
            CaseEq | CaseNeq => {
                let width = a.width().max(b.width());
                let av = a.value.resize(width, a.signed);
                let bv = b.value.resize(width, b.signed);
                let eq = av.case_eq(&bv);
                ConstantValue::int(
                    (if op == CaseEq { eq } else { !eq }) as u64,
                    1,
                    false,
                )
            }
            WildEq | WildNeq => {
                let width = a.width().max(b.width());
                let av = a.value.resize(width, a.signed);
                let bv = b.value.resize(width, b.signed);
                let mut unknown = false;
                let mut matched = true;
                for i in 0..width {
                    let pattern = bv.get(i);
                    if pattern.is_unknown() {
                        continue;
                    }
                    match av.get(i) {
                        bit if bit.is_unknown() => unknown = true,
                        bit if bit != pattern => matched = false,
                        _ => {}
                    }
                }
                if unknown && matched {
                    ConstantValue::Vector(SvInt::all_x(1, false))
                } else {
                    let hit = matched && !unknown;
                    ConstantValue::int(
                        (if op == WildEq { hit } else { !hit }) as u64,
                        1,
                        false,
                    )
                }
            }
            Lt | Le | Gt | Ge => {
                let width = a.width().max(b.width());
                let both_signed = a.signed && b.signed;
                let av = a.value.resize(width, a.signed);
                let bv = b.value.resize(width, b.signed);
                match av.compare(&bv, both_signed) {
                    None => ConstantValue::Vector(SvInt::all_x(1, false)),
                    Some(ord) => {
                        let hit = match op {
                            Lt => ord.is_lt(),
                            Le => ord.is_le(),
                            Gt => ord.is_gt(),
                            _ => ord.is_ge(),
                        };
                        ConstantValue::int(hit as u64, 1, false)
                    }
                }
            }
            LogAnd | LogOr => unreachable!(),
        };
        Some(result)
    }
}

fn bit_value(bit: Logic) -> ConstantValue {
    match bit {
        Logic::Zero => ConstantValue::int(0, 1, false),
        Logic::One => ConstantValue::int(1, 1, false),
        _ => ConstantValue::Vector(SvInt::all_x(1, false)),
    }
}
