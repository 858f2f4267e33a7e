//! The elaborated type system: interned types with canonical forms.
//!
//! All types are interned into a [`TypeDb`], which assigns each unique type
//! a [`TypeId`]. Canonicalization unwraps [`Type::Alias`] chains; type
//! equivalence is defined on canonical IDs. Integral queries (bit width,
//! signedness, four-statedness) recurse through packed composition.

use crate::arena::define_arena_id;
use crate::symbol::SymbolId;
use crate::value::{ConstantRange, ConstantValue, SvInt};
use sable_common::{Ident, Logic, LogicVec};
use serde::{Deserialize, Serialize};

define_arena_id!(
    /// Stable identity of an interned [`Type`].
    TypeId
);

/// The single-bit scalar kinds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ScalarKind {
    /// `bit` — 2-state.
    Bit,
    /// `logic` — 4-state.
    Logic,
    /// `reg` — 4-state.
    Reg,
}

/// The predefined multi-bit integer kinds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum IntegerKind {
    /// `byte` — 8 bits, 2-state.
    Byte,
    /// `shortint` — 16 bits, 2-state.
    ShortInt,
    /// `int` — 32 bits, 2-state.
    Int,
    /// `longint` — 64 bits, 2-state.
    LongInt,
    /// `integer` — 32 bits, 4-state.
    Integer,
    /// `time` — 64 bits, 4-state.
    Time,
}

impl IntegerKind {
    /// The fixed bit width of this kind.
    pub fn width(self) -> u32 {
        match self {
            IntegerKind::Byte => 8,
            IntegerKind::ShortInt => 16,
            IntegerKind::Int => 32,
            IntegerKind::LongInt => 64,
            IntegerKind::Integer => 32,
            IntegerKind::Time => 64,
        }
    }

    /// Whether this kind is 4-state.
    pub fn is_four_state(self) -> bool {
        matches!(self, IntegerKind::Integer | IntegerKind::Time)
    }

    /// Whether this kind is signed unless declared otherwise.
    pub fn default_signed(self) -> bool {
        !matches!(self, IntegerKind::Time)
    }
}

/// The floating-point kinds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum FloatKind {
    /// `real` — 64-bit.
    Real,
    /// `shortreal` — 32-bit.
    ShortReal,
    /// `realtime` — 64-bit.
    RealTime,
}

/// An elaborated type.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Type {
    /// A placeholder for failed type resolution; opaque to all checks.
    Error,
    /// The void type.
    Void,
    /// The string type.
    Str,
    /// A single-bit scalar.
    Scalar {
        /// Which scalar keyword.
        kind: ScalarKind,
        /// Whether declared `signed`.
        signed: bool,
    },
    /// A predefined integer type.
    Predefined {
        /// Which keyword.
        kind: IntegerKind,
        /// The effective signedness.
        signed: bool,
    },
    /// A floating-point type.
    Floating(FloatKind),
    /// A packed array of an integral element type.
    PackedArray {
        /// The element type.
        element: TypeId,
        /// The declared range.
        range: ConstantRange,
        /// Whether the whole vector participates in signed arithmetic.
        signed: bool,
    },
    /// An unpacked array.
    UnpackedArray {
        /// The element type.
        element: TypeId,
        /// The declared range.
        range: ConstantRange,
    },
    /// An enumerated type; the values are symbols owned by the declaring
    /// scope.
    Enum {
        /// The base integral type.
        base: TypeId,
        /// The value member symbols, in declaration order.
        values: Vec<SymbolId>,
    },
    /// A packed struct.
    PackedStruct {
        /// Field names and types in declaration order.
        fields: Vec<(Ident, TypeId)>,
        /// Whether declared `signed`.
        signed: bool,
    },
    /// An unpacked struct.
    UnpackedStruct {
        /// Field names and types in declaration order.
        fields: Vec<(Ident, TypeId)>,
    },
    /// A packed union.
    PackedUnion {
        /// Field names and types.
        fields: Vec<(Ident, TypeId)>,
        /// Whether declared `signed`.
        signed: bool,
    },
    /// An unpacked union.
    UnpackedUnion {
        /// Field names and types.
        fields: Vec<(Ident, TypeId)>,
    },
    /// A type alias introduced by a typedef or type parameter; the symbol
    /// is the `TypeAlias` that declared it.
    Alias {
        /// The declaring symbol.
        symbol: SymbolId,
        /// The aliased type.
        target: TypeId,
    },
}

/// Central type database: interned types for cheap comparison.
///
/// Each unique [`Type`] is stored once and referenced by [`TypeId`], so
/// equivalence of canonical types is an ID comparison.
#[derive(Debug, Clone, Default)]
pub struct TypeDb {
    types: Vec<Type>,
    lookup: std::collections::HashMap<Type, TypeId>,
}

impl TypeDb {
    /// Creates a new, empty type database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a type, returning its [`TypeId`].
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.lookup.get(&ty) {
            return id;
        }
        let id = crate::arena::ArenaId::from_raw(self.types.len() as u32);
        self.types.push(ty.clone());
        self.lookup.insert(ty, id);
        id
    }

    /// Returns a reference to the type with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[crate::arena::ArenaId::as_raw(id) as usize]
    }

    /// The error type.
    pub fn error(&mut self) -> TypeId {
        self.intern(Type::Error)
    }

    /// The default `logic` type.
    pub fn logic(&mut self) -> TypeId {
        self.intern(Type::Scalar {
            kind: ScalarKind::Logic,
            signed: false,
        })
    }

    /// The `int` type.
    pub fn int(&mut self) -> TypeId {
        self.intern(Type::Predefined {
            kind: IntegerKind::Int,
            signed: true,
        })
    }

    /// Unwraps alias chains to the canonical type.
    ///
    /// Idempotent: `canonical(canonical(t)) == canonical(t)`.
    pub fn canonical(&self, mut id: TypeId) -> TypeId {
        loop {
            match self.get(id) {
                Type::Alias { target, .. } => id = *target,
                _ => return id,
            }
        }
    }

    /// Whether two types are equivalent (equal canonical forms).
    pub fn equivalent(&self, a: TypeId, b: TypeId) -> bool {
        self.canonical(a) == self.canonical(b)
    }

    /// Whether the type is the error type.
    pub fn is_error(&self, id: TypeId) -> bool {
        matches!(self.get(self.canonical(id)), Type::Error)
    }

    /// Whether the canonical type is integral (has bits).
    pub fn is_integral(&self, id: TypeId) -> bool {
        matches!(
            self.get(self.canonical(id)),
            Type::Scalar { .. }
                | Type::Predefined { .. }
                | Type::PackedArray { .. }
                | Type::Enum { .. }
                | Type::PackedStruct { .. }
                | Type::PackedUnion { .. }
        )
    }

    /// The bit width of an integral type; `None` for non-integral types.
    pub fn bit_width(&self, id: TypeId) -> Option<u32> {
        match self.get(self.canonical(id)) {
            Type::Scalar { .. } => Some(1),
            Type::Predefined { kind, .. } => Some(kind.width()),
            Type::PackedArray { element, range, .. } => {
                self.bit_width(*element).map(|w| w * range.width())
            }
            Type::Enum { base, .. } => self.bit_width(*base),
            Type::PackedStruct { fields, .. } => fields
                .iter()
                .map(|(_, ty)| self.bit_width(*ty))
                .sum::<Option<u32>>(),
            Type::PackedUnion { fields, .. } => fields
                .iter()
                .map(|(_, ty)| self.bit_width(*ty))
                .try_fold(0u32, |acc, w| w.map(|w| acc.max(w))),
            _ => None,
        }
    }

    /// Whether the integral type participates in signed arithmetic.
    pub fn is_signed(&self, id: TypeId) -> bool {
        match self.get(self.canonical(id)) {
            Type::Scalar { signed, .. } => *signed,
            Type::Predefined { signed, .. } => *signed,
            Type::PackedArray { signed, .. } => *signed,
            Type::Enum { base, .. } => self.is_signed(*base),
            Type::PackedStruct { signed, .. } | Type::PackedUnion { signed, .. } => *signed,
            _ => false,
        }
    }

    /// Whether the integral type is composed of 4-state bits.
    pub fn is_four_state(&self, id: TypeId) -> bool {
        match self.get(self.canonical(id)) {
            Type::Scalar { kind, .. } => !matches!(kind, ScalarKind::Bit),
            Type::Predefined { kind, .. } => kind.is_four_state(),
            Type::PackedArray { element, .. } => self.is_four_state(*element),
            Type::Enum { base, .. } => self.is_four_state(*base),
            Type::PackedStruct { fields, .. } | Type::PackedUnion { fields, .. } => fields
                .iter()
                .any(|(_, ty)| self.is_four_state(*ty)),
            _ => false,
        }
    }

    /// Whether the canonical type is a floating-point type.
    pub fn is_floating(&self, id: TypeId) -> bool {
        matches!(self.get(self.canonical(id)), Type::Floating(_))
    }

    /// The default (uninitialized) value for a type: all-X for 4-state
    /// integrals, zero for 2-state, 0.0 for reals, empty for strings.
    pub fn default_value(&self, id: TypeId) -> ConstantValue {
        match self.get(self.canonical(id)) {
            Type::Floating(_) => ConstantValue::Real(0.0),
            Type::Str => ConstantValue::Str(String::new()),
            Type::UnpackedArray { element, range } => {
                let elem = self.default_value(*element);
                ConstantValue::Aggregate(vec![elem; range.width() as usize])
            }
            Type::UnpackedStruct { fields } | Type::UnpackedUnion { fields } => {
                ConstantValue::Aggregate(
                    fields.iter().map(|(_, ty)| self.default_value(*ty)).collect(),
                )
            }
            _ => {
                let width = self.bit_width(id).unwrap_or(1);
                let signed = self.is_signed(id);
                if self.is_four_state(id) {
                    ConstantValue::Vector(SvInt::all_x(width, signed))
                } else {
                    ConstantValue::Vector(SvInt {
                        value: LogicVec::new(width),
                        signed,
                    })
                }
            }
        }
    }

    /// A short display name for diagnostics.
    pub fn describe(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Error => "<error>".to_string(),
            Type::Void => "void".to_string(),
            Type::Str => "string".to_string(),
            Type::Scalar { kind, signed } => {
                let name = match kind {
                    ScalarKind::Bit => "bit",
                    ScalarKind::Logic => "logic",
                    ScalarKind::Reg => "reg",
                };
                if *signed {
                    format!("{name} signed")
                } else {
                    name.to_string()
                }
            }
            Type::Predefined { kind, signed } => {
                let name = match kind {
                    IntegerKind::Byte => "byte",
                    IntegerKind::ShortInt => "shortint",
                    IntegerKind::Int => "int",
                    IntegerKind::LongInt => "longint",
                    IntegerKind::Integer => "integer",
                    IntegerKind::Time => "time",
                };
                if *signed == kind.default_signed() {
                    name.to_string()
                } else if *signed {
                    format!("{name} signed")
                } else {
                    format!("{name} unsigned")
                }
            }
            Type::Floating(kind) => match kind {
                FloatKind::Real => "real".to_string(),
                FloatKind::ShortReal => "shortreal".to_string(),
                FloatKind::RealTime => "realtime".to_string(),
            },
            Type::PackedArray { element, range, .. } => {
                format!("{}{range}", self.describe(*element))
            }
            Type::UnpackedArray { element, range } => {
                format!("{}${range}", self.describe(*element))
            }
            Type::Enum { base, .. } => format!("enum {}", self.describe(*base)),
            Type::PackedStruct { .. } => "struct packed".to_string(),
            Type::UnpackedStruct { .. } => "struct".to_string(),
            Type::PackedUnion { .. } => "union packed".to_string(),
            Type::UnpackedUnion { .. } => "union".to_string(),
            Type::Alias { target, .. } => self.describe(*target),
        }
    }

    /// Looks up a field of a struct or union canonical type.
    pub fn find_field(&self, id: TypeId, name: Ident) -> Option<TypeId> {
        match self.get(self.canonical(id)) {
            Type::PackedStruct { fields, .. }
            | Type::UnpackedStruct { fields }
            | Type::PackedUnion { fields, .. }
            | Type::UnpackedUnion { fields } => fields
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, ty)| *ty),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaId;

    fn db() -> TypeDb {
        TypeDb::new()
    }

    #[test]
    fn intern_deduplicates() {
        let mut db = db();
        let a = db.logic();
        let b = db.logic();
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_unwraps_alias_chains() {
        let mut db = db();
        let base = db.int();
        let alias1 = db.intern(Type::Alias {
            symbol: SymbolId::from_raw(0),
            target: base,
        });
        let alias2 = db.intern(Type::Alias {
            symbol: SymbolId::from_raw(1),
            target: alias1,
        });
        assert_eq!(db.canonical(alias2), base);
        // Idempotence.
        assert_eq!(db.canonical(db.canonical(alias2)), db.canonical(alias2));
        assert!(db.equivalent(alias1, alias2));
    }

    #[test]
    fn bit_widths() {
        let mut db = db();
        let logic = db.logic();
        assert_eq!(db.bit_width(logic), Some(1));

        let int = db.int();
        assert_eq!(db.bit_width(int), Some(32));

        let vec8 = db.intern(Type::PackedArray {
            element: logic,
            range: ConstantRange::new(7, 0),
            signed: false,
        });
        assert_eq!(db.bit_width(vec8), Some(8));

        let mat = db.intern(Type::PackedArray {
            element: vec8,
            range: ConstantRange::new(3, 0),
            signed: false,
        });
        assert_eq!(db.bit_width(mat), Some(32));
    }

    #[test]
    fn four_state_propagation() {
        let mut db = db();
        let logic = db.logic();
        let bit = db.intern(Type::Scalar {
            kind: ScalarKind::Bit,
            signed: false,
        });
        assert!(db.is_four_state(logic));
        assert!(!db.is_four_state(bit));

        let vec = db.intern(Type::PackedArray {
            element: bit,
            range: ConstantRange::new(7, 0),
            signed: false,
        });
        assert!(!db.is_four_state(vec));

        let st = db.intern(Type::PackedStruct {
            fields: vec![
                (Ident::from_raw(0), bit),
                (Ident::from_raw(1), logic),
            ],
            signed: false,
        });
        assert!(db.is_four_state(st));
        assert_eq!(db.bit_width(st), Some(2));
    }

    #[test]
    fn union_width_is_max() {
        let mut db = db();
        let logic = db.logic();
        let vec8 = db.intern(Type::PackedArray {
            element: logic,
            range: ConstantRange::new(7, 0),
            signed: false,
        });
        let un = db.intern(Type::PackedUnion {
            fields: vec![
                (Ident::from_raw(0), logic),
                (Ident::from_raw(1), vec8),
            ],
            signed: false,
        });
        assert_eq!(db.bit_width(un), Some(8));
    }

    #[test]
    fn default_values() {
        let mut db = db();
        let logic = db.logic();
        assert!(db.default_value(logic).has_unknown());

        let int = db.int();
        assert_eq!(db.default_value(int).to_i64(), Some(0));

        let real = db.intern(Type::Floating(FloatKind::Real));
        assert_eq!(db.default_value(real), ConstantValue::Real(0.0));
    }

    #[test]
    fn error_is_opaque() {
        let mut db = db();
        let err = db.error();
        assert!(db.is_error(err));
        assert!(!db.is_integral(err));
        assert_eq!(db.bit_width(err), None);
    }

    #[test]
    fn describe_names() {
        let mut db = db();
        let logic = db.logic();
        let vec = db.intern(Type::PackedArray {
            element: logic,
            range: ConstantRange::new(7, 0),
            signed: false,
        });
        assert_eq!(db.describe(vec), "logic[7:0]");
        let int = db.int();
        assert_eq!(db.describe(int), "int");
    }
}
