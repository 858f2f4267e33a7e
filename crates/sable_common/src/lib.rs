//! Shared foundational types for the Sable SystemVerilog front-end.
//!
//! This crate provides interned identifiers, IEEE 1800 4-state logic values,
//! packed logic vectors with arbitrary-width 4-state arithmetic, and the
//! common internal-error type.

#![warn(missing_docs)]

pub mod ident;
pub mod logic;
pub mod logic_vec;
pub mod result;

pub use ident::{Ident, Interner};
pub use logic::Logic;
pub use logic_vec::LogicVec;
pub use result::{InternalError, SableResult};
