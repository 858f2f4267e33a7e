//! Packed vectors of 4-state logic values with arbitrary-width arithmetic.

use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A vector of 4-state [`Logic`] values packed for efficient storage.
///
/// Each logic value occupies 2 bits (encoding 4 states), with 32 values packed
/// per `u64` word. This representation carries constant values through
/// elaboration: any width, per-bit X/Z, and the full set of SystemVerilog
/// arithmetic, shift, comparison, and reduction operations.
///
/// Arithmetic follows the LRM's 4-state propagation rule: if any operand bit
/// is X or Z, the result is all-X at the result width.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVec {
    width: u32,
    /// Packed storage: 2 bits per logic value, 32 values per u64.
    data: Vec<u64>,
}

/// Number of logic values packed per u64 word.
const VALUES_PER_WORD: u32 = 32;

impl LogicVec {
    /// Creates a new `LogicVec` of the given width, initialized to all `Zero`.
    pub fn new(width: u32) -> Self {
        let num_words = word_count(width);
        Self {
            width,
            data: vec![0; num_words],
        }
    }

    /// Creates a `LogicVec` of the given width with every bit set to `value`.
    pub fn filled(width: u32, value: Logic) -> Self {
        let mut v = Self::new(width);
        for i in 0..width {
            v.set(i, value);
        }
        v
    }

    /// Creates a `LogicVec` with all bits set to `X`.
    pub fn all_x(width: u32) -> Self {
        Self::filled(width, Logic::X)
    }

    /// Returns the number of logic values in this vector.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Gets the logic value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Logic {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / VALUES_PER_WORD) as usize;
        let bit_offset = (index % VALUES_PER_WORD) * 2;
        let bits = (self.data[word_idx] >> bit_offset) & 0b11;
        match bits {
            0 => Logic::Zero,
            1 => Logic::One,
            2 => Logic::X,
            3 => Logic::Z,
            _ => unreachable!(),
        }
    }

    /// Sets the logic value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / VALUES_PER_WORD) as usize;
        let bit_offset = (index % VALUES_PER_WORD) * 2;
        let mask = !(0b11u64 << bit_offset);
        self.data[word_idx] = (self.data[word_idx] & mask) | ((value as u64) << bit_offset);
    }

    /// Creates a single-bit `LogicVec` from a boolean value.
    pub fn from_bool(value: bool) -> Self {
        let mut v = Self::new(1);
        if value {
            v.set(0, Logic::One);
        }
        v
    }

    /// Creates a `LogicVec` from a `u64` value with the given width.
    ///
    /// Bits beyond the given width are ignored.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in 0..width.min(64) {
            if (value >> i) & 1 != 0 {
                v.set(i, Logic::One);
            }
        }
        v
    }

    /// Converts the `LogicVec` to a `u64`, if all bits are definite (0 or 1).
    ///
    /// Returns `None` if the vector contains X or Z values, or if the width
    /// exceeds 64 bits and any high bit is set.
    pub fn to_u64(&self) -> Option<u64> {
        let mut result = 0u64;
        for i in 0..self.width {
            match self.get(i) {
                Logic::Zero => {}
                Logic::One => {
                    if i >= 64 {
                        return None;
                    }
                    result |= 1 << i;
                }
                Logic::X | Logic::Z => return None,
            }
        }
        Some(result)
    }

    /// Converts to an `i64` interpreting the vector with the given signedness.
    ///
    /// Returns `None` for unknown bits or values not representable in 64 bits.
    pub fn to_i64(&self, signed: bool) -> Option<i64> {
        if self.has_unknown() {
            return None;
        }
        let negative = signed && self.width > 0 && self.get(self.width - 1) == Logic::One;
        if !negative {
            return self.to_u64().and_then(|v| i64::try_from(v).ok());
        }
        // Sign-extend to 64 bits; all bits above 64 must equal the sign bit.
        let mut result: u64 = u64::MAX;
        for i in 0..self.width {
            if i >= 64 {
                if self.get(i) != Logic::One {
                    return None;
                }
                continue;
            }
            if self.get(i) == Logic::Zero {
                result &= !(1u64 << i);
            }
        }
        Some(result as i64)
    }

    /// Returns `true` if any bit is X or Z.
    pub fn has_unknown(&self) -> bool {
        (0..self.width).any(|i| self.get(i).is_unknown())
    }

    /// Returns true if all bits are `Logic::Zero`.
    pub fn is_all_zero(&self) -> bool {
        (0..self.width).all(|i| self.get(i) == Logic::Zero)
    }

    /// Interprets the vector as a condition: `Some(true)` if any bit is 1,
    /// `Some(false)` if all bits are 0, `None` if the truth is masked by X/Z.
    pub fn truthiness(&self) -> Option<bool> {
        let mut saw_unknown = false;
        for i in 0..self.width {
            match self.get(i) {
                Logic::One => return Some(true),
                Logic::X | Logic::Z => saw_unknown = true,
                Logic::Zero => {}
            }
        }
        if saw_unknown {
            None
        } else {
            Some(false)
        }
    }

    /// Parses a binary string like `"10XZ"` into a `LogicVec`.
    ///
    /// The leftmost character is the most significant bit (highest index).
    /// Returns `None` if the string contains invalid characters.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let width = s.len() as u32;
        let mut v = Self::new(width);
        for (i, c) in s.chars().rev().enumerate() {
            let val = Logic::from_char(c)?;
            v.set(i as u32, val);
        }
        Some(v)
    }

    /// Parses the digit run of a based literal (`1010`, `FF`, `3x7`, `1_0?`)
    /// in the given radix (2, 8, 10, or 16) into a natural-width vector.
    ///
    /// Underscores are skipped. For radix 2/8/16 each digit contributes
    /// 1/3/4 bits and may be `x`, `z`, or `?`. For radix 10 the value is
    /// accumulated arithmetically into a 32-bit minimum width; a decimal
    /// x/z digit makes the whole value unknown. Returns `None` on a digit
    /// invalid for the radix or an empty digit run.
    pub fn from_digits(radix: u32, text: &str) -> Option<Self> {
        let digits: Vec<char> = text.chars().filter(|&c| c != '_').collect();
        if digits.is_empty() {
            return None;
        }

        if radix == 10 {
            if digits
                .iter()
                .any(|c| matches!(c, 'x' | 'X' | 'z' | 'Z' | '?'))
            {
                // A decimal x or z digit means the entire value is unknown
                // and must stand alone.
                if digits.len() != 1 {
                    return None;
                }
                return Some(Self::filled(32, Logic::from_char(digits[0])?));
            }
            let mut value = Self::new(32.max(digits.len() as u32 * 4));
            for c in &digits {
                let d = c.to_digit(10)?;
                value = value.mul_wrap(&Self::from_u64(10, value.width));
                value = value.add_wrap(&Self::from_u64(d as u64, value.width));
            }
            return Some(value);
        }

        let bits_per_digit = match radix {
            2 => 1,
            8 => 3,
            16 => 4,
            _ => return None,
        };
        let width = (digits.len() as u32) * bits_per_digit;
        let mut v = Self::new(width);
        for (pos, c) in digits.iter().rev().enumerate() {
            let base_index = pos as u32 * bits_per_digit;
            if let Some(l) = Logic::from_char(*c) {
                // x/z fills every bit of its digit.
                if l.is_unknown() || radix == 2 {
                    for b in 0..bits_per_digit {
                        v.set(base_index + b, l);
                    }
                    continue;
                }
            }
            let d = c.to_digit(radix)?;
            for b in 0..bits_per_digit {
                if (d >> b) & 1 != 0 {
                    v.set(base_index + b, Logic::One);
                }
            }
        }
        Some(v)
    }

    /// Resizes to `width`, truncating high bits or extending.
    ///
    /// Extension replicates the MSB when `signed` (X/Z sign bits extend as
    /// themselves), otherwise fills with zero.
    pub fn resize(&self, width: u32, signed: bool) -> Self {
        let mut v = Self::new(width);
        let copy = self.width.min(width);
        for i in 0..copy {
            v.set(i, self.get(i));
        }
        if width > self.width && self.width > 0 {
            let fill = if signed {
                self.get(self.width - 1)
            } else {
                Logic::Zero
            };
            if fill != Logic::Zero {
                for i in self.width..width {
                    v.set(i, fill);
                }
            }
        }
        v
    }

    // ========================================================================
    // Arithmetic
    //
    // All arithmetic is modular at the result width. Any X/Z operand bit
    // produces an all-X result, per the LRM propagation rule.
    // ========================================================================

    /// Wrapping addition at `self.width()`.
    pub fn add_wrap(&self, rhs: &Self) -> Self {
        self.binary_arith(rhs, |a, b, w| {
            let mut out = vec![0u64; a.len()];
            let mut carry = 0u64;
            for i in 0..a.len() {
                let (s1, c1) = a[i].overflowing_add(b[i]);
                let (s2, c2) = s1.overflowing_add(carry);
                out[i] = s2;
                carry = (c1 as u64) + (c2 as u64);
            }
            mask_words(&mut out, w);
            out
        })
    }

    /// Wrapping subtraction at `self.width()`.
    pub fn sub_wrap(&self, rhs: &Self) -> Self {
        self.binary_arith(rhs, |a, b, w| {
            let mut out = vec![0u64; a.len()];
            let mut borrow = 0u64;
            for i in 0..a.len() {
                let (d1, b1) = a[i].overflowing_sub(b[i]);
                let (d2, b2) = d1.overflowing_sub(borrow);
                out[i] = d2;
                borrow = (b1 as u64) + (b2 as u64);
            }
            mask_words(&mut out, w);
            out
        })
    }

    /// Two's-complement negation at `self.width()`.
    pub fn negate(&self) -> Self {
        Self::new(self.width).sub_wrap(self)
    }

    /// Wrapping multiplication at `self.width()`.
    pub fn mul_wrap(&self, rhs: &Self) -> Self {
        self.binary_arith(rhs, |a, b, w| {
            let mut out = vec![0u64; a.len()];
            for (i, &aw) in a.iter().enumerate() {
                let mut carry = 0u128;
                for (j, &bw) in b.iter().enumerate() {
                    if i + j >= out.len() {
                        break;
                    }
                    let acc = (aw as u128) * (bw as u128) + (out[i + j] as u128) + carry;
                    out[i + j] = acc as u64;
                    carry = acc >> 64;
                }
            }
            mask_words(&mut out, w);
            out
        })
    }

    /// Division at `self.width()` with the given signedness.
    ///
    /// Returns `None` when the divisor is zero; the caller decides how to
    /// diagnose that. Unknown operand bits produce `Some(all-X)`.
    pub fn div(&self, rhs: &Self, signed: bool) -> Option<Self> {
        self.divmod(rhs, signed).map(|(q, _)| q)
    }

    /// Remainder at `self.width()` with the given signedness.
    ///
    /// The result takes the sign of the dividend, per the LRM. Returns
    /// `None` for a zero divisor.
    pub fn rem(&self, rhs: &Self, signed: bool) -> Option<Self> {
        self.divmod(rhs, signed).map(|(_, r)| r)
    }

    fn divmod(&self, rhs: &Self, signed: bool) -> Option<(Self, Self)> {
        debug_assert_eq!(self.width, rhs.width, "LogicVec width mismatch in div");
        if self.has_unknown() || rhs.has_unknown() {
            return Some((Self::all_x(self.width), Self::all_x(self.width)));
        }
        if rhs.is_all_zero() {
            return None;
        }
        let neg_a = signed && self.msb_set();
        let neg_b = signed && rhs.msb_set();
        let a = if neg_a { self.negate() } else { self.clone() };
        let b = if neg_b { rhs.negate() } else { rhs.clone() };

        // Restoring bit-serial long division, MSB first.
        let w = self.width;
        let mut quot = Self::new(w);
        let mut rem = Self::new(w);
        for i in (0..w).rev() {
            rem = rem.shl_bits(1);
            rem.set(0, a.get(i));
            if compare_known(&rem, &b) != Ordering::Less {
                rem = rem.sub_wrap(&b);
                quot.set(i, Logic::One);
            }
        }
        if neg_a != neg_b {
            quot = quot.negate();
        }
        if neg_a {
            rem = rem.negate();
        }
        Some((quot, rem))
    }

    /// Exponentiation at `self.width()` with the given signedness.
    ///
    /// Follows the LRM table for the signed corner cases (`0**-n` is X,
    /// `1**n` is 1, `(-1)**n` alternates, negative exponents otherwise
    /// truncate to zero).
    pub fn pow(&self, rhs: &Self, signed: bool) -> Self {
        if self.has_unknown() || rhs.has_unknown() {
            return Self::all_x(self.width);
        }
        let exp = match rhs.to_i64(signed) {
            Some(e) => e,
            None => return Self::all_x(self.width),
        };
        if exp < 0 {
            // Only -1, 0, and 1 bases survive a negative exponent.
            return match self.to_i64(signed) {
                Some(1) => Self::from_u64(1, self.width),
                Some(-1) if signed => {
                    if exp % 2 == 0 {
                        Self::from_u64(1, self.width)
                    } else {
                        Self::from_u64(1, self.width).negate()
                    }
                }
                Some(0) => Self::all_x(self.width),
                _ => Self::new(self.width),
            };
        }
        let mut result = Self::from_u64(1, self.width);
        let mut base = self.clone();
        let mut e = exp as u64;
        while e > 0 {
            if e & 1 != 0 {
                result = result.mul_wrap(&base);
            }
            base = base.mul_wrap(&base);
            e >>= 1;
        }
        result
    }

    /// Logical shift left by a known amount; zero-fills, width preserved.
    pub fn shl_bits(&self, amount: u32) -> Self {
        let mut v = Self::new(self.width);
        for i in (amount.min(self.width)..self.width).rev() {
            v.set(i, self.get(i - amount));
        }
        v
    }

    /// Logical shift right by a known amount; zero-fills, width preserved.
    pub fn lshr_bits(&self, amount: u32) -> Self {
        let mut v = Self::new(self.width);
        for i in 0..self.width.saturating_sub(amount) {
            v.set(i, self.get(i + amount));
        }
        v
    }

    /// Arithmetic shift right by a known amount; replicates the MSB.
    pub fn ashr_bits(&self, amount: u32) -> Self {
        if self.width == 0 {
            return self.clone();
        }
        let fill = self.get(self.width - 1);
        let mut v = Self::filled(self.width, fill);
        for i in 0..self.width.saturating_sub(amount) {
            v.set(i, self.get(i + amount));
        }
        v
    }

    /// Three-way comparison with the given signedness.
    ///
    /// Returns `None` if either operand contains unknown bits.
    pub fn compare(&self, rhs: &Self, signed: bool) -> Option<Ordering> {
        debug_assert_eq!(self.width, rhs.width, "LogicVec width mismatch in compare");
        if self.has_unknown() || rhs.has_unknown() {
            return None;
        }
        if signed && self.width > 0 {
            match (self.msb_set(), rhs.msb_set()) {
                (true, false) => return Some(Ordering::Less),
                (false, true) => return Some(Ordering::Greater),
                _ => {}
            }
        }
        Some(compare_known(self, rhs))
    }

    /// Logical equality (`==`): X if either side has unknown bits.
    pub fn logic_eq(&self, rhs: &Self) -> Logic {
        if self.has_unknown() || rhs.has_unknown() {
            return Logic::X;
        }
        if compare_known(self, rhs) == Ordering::Equal {
            Logic::One
        } else {
            Logic::Zero
        }
    }

    /// Case equality (`===`): exact 4-state match, always 0 or 1.
    pub fn case_eq(&self, rhs: &Self) -> bool {
        self.width == rhs.width && (0..self.width).all(|i| self.get(i) == rhs.get(i))
    }

    /// AND-reduction over all bits.
    pub fn reduce_and(&self) -> Logic {
        (0..self.width).fold(Logic::One, |acc, i| acc & self.get(i))
    }

    /// OR-reduction over all bits.
    pub fn reduce_or(&self) -> Logic {
        (0..self.width).fold(Logic::Zero, |acc, i| acc | self.get(i))
    }

    /// XOR-reduction over all bits.
    pub fn reduce_xor(&self) -> Logic {
        (0..self.width).fold(Logic::Zero, |acc, i| acc ^ self.get(i))
    }

    /// Concatenates `self` (as the high part) with `low`.
    pub fn concat(&self, low: &Self) -> Self {
        let mut v = Self::new(self.width + low.width);
        for i in 0..low.width {
            v.set(i, low.get(i));
        }
        for i in 0..self.width {
            v.set(low.width + i, self.get(i));
        }
        v
    }

    fn msb_set(&self) -> bool {
        self.width > 0 && self.get(self.width - 1) == Logic::One
    }

    /// Shared shape of the word-based ops: propagate unknowns, convert both
    /// sides to plain words, run `f`, convert back.
    fn binary_arith(&self, rhs: &Self, f: impl Fn(&[u64], &[u64], u32) -> Vec<u64>) -> Self {
        debug_assert_eq!(self.width, rhs.width, "LogicVec width mismatch");
        if self.has_unknown() || rhs.has_unknown() {
            return Self::all_x(self.width);
        }
        let a = self.to_value_words();
        let b = rhs.to_value_words();
        Self::from_value_words(self.width, &f(&a, &b, self.width))
    }

    /// Unpacks into one value bit per position (no unknowns allowed).
    fn to_value_words(&self) -> Vec<u64> {
        let n = (self.width as usize).div_ceil(64).max(1);
        let mut words = vec![0u64; n];
        for i in 0..self.width {
            if self.get(i) == Logic::One {
                words[(i / 64) as usize] |= 1 << (i % 64);
            }
        }
        words
    }

    fn from_value_words(width: u32, words: &[u64]) -> Self {
        let mut v = Self::new(width);
        for i in 0..width {
            let word = words.get((i / 64) as usize).copied().unwrap_or(0);
            if (word >> (i % 64)) & 1 != 0 {
                v.set(i, Logic::One);
            }
        }
        v
    }
}

/// Unsigned magnitude comparison of two equal-width vectors with no unknowns.
fn compare_known(a: &LogicVec, b: &LogicVec) -> Ordering {
    for i in (0..a.width()).rev() {
        let (ab, bb) = (a.get(i) == Logic::One, b.get(i) == Logic::One);
        if ab != bb {
            return if ab { Ordering::Greater } else { Ordering::Less };
        }
    }
    Ordering::Equal
}

/// Clears bits at and above `width` in a value-word array.
fn mask_words(words: &mut [u64], width: u32) {
    let full = (width / 64) as usize;
    let rem = width % 64;
    for (i, w) in words.iter_mut().enumerate() {
        if i > full || (i == full && rem == 0) {
            *w = 0;
        } else if i == full {
            *w &= (1u64 << rem) - 1;
        }
    }
}

impl fmt::Display for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicVec({self})")
    }
}

impl BitAnd for &LogicVec {
    type Output = LogicVec;

    fn bitand(self, rhs: Self) -> LogicVec {
        assert_eq!(self.width, rhs.width, "LogicVec width mismatch in AND");
        let mut result = LogicVec::new(self.width);
        for i in 0..self.width {
            result.set(i, self.get(i) & rhs.get(i));
        }
        result
    }
}

impl BitOr for &LogicVec {
    type Output = LogicVec;

    fn bitor(self, rhs: Self) -> LogicVec {
        assert_eq!(self.width, rhs.width, "LogicVec width mismatch in OR");
        let mut result = LogicVec::new(self.width);
        for i in 0..self.width {
            result.set(i, self.get(i) | rhs.get(i));
        }
        result
    }
}

impl BitXor for &LogicVec {
    type Output = LogicVec;

    fn bitxor(self, rhs: Self) -> LogicVec {
        assert_eq!(self.width, rhs.width, "LogicVec width mismatch in XOR");
        let mut result = LogicVec::new(self.width);
        for i in 0..self.width {
            result.set(i, self.get(i) ^ rhs.get(i));
        }
        result
    }
}

impl Not for &LogicVec {
    type Output = LogicVec;

    fn not(self) -> LogicVec {
        let mut result = LogicVec::new(self.width);
        for i in 0..self.width {
            result.set(i, !self.get(i));
        }
        result
    }
}

/// Returns the number of u64 words needed to store `width` logic values.
fn word_count(width: u32) -> usize {
    width.div_ceil(VALUES_PER_WORD) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bv(s: &str) -> LogicVec {
        LogicVec::from_binary_str(s).unwrap()
    }

    #[test]
    fn set_get_roundtrip() {
        let mut v = LogicVec::new(4);
        v.set(0, Logic::Zero);
        v.set(1, Logic::One);
        v.set(2, Logic::X);
        v.set(3, Logic::Z);
        assert_eq!(v.get(0), Logic::Zero);
        assert_eq!(v.get(1), Logic::One);
        assert_eq!(v.get(2), Logic::X);
        assert_eq!(v.get(3), Logic::Z);
    }

    #[test]
    fn from_binary_str() {
        let v = bv("10XZ");
        assert_eq!(v.width(), 4);
        assert_eq!(v.get(3), Logic::One); // MSB
        assert_eq!(v.get(2), Logic::Zero);
        assert_eq!(v.get(1), Logic::X);
        assert_eq!(v.get(0), Logic::Z); // LSB
        assert!(LogicVec::from_binary_str("10A1").is_none());
    }

    #[test]
    fn from_digits_hex() {
        let v = LogicVec::from_digits(16, "A5").unwrap();
        assert_eq!(v.width(), 8);
        assert_eq!(format!("{v}"), "10100101");
    }

    #[test]
    fn from_digits_hex_with_z_digit() {
        let v = LogicVec::from_digits(16, "Fz").unwrap();
        assert_eq!(format!("{v}"), "1111ZZZZ");
    }

    #[test]
    fn from_digits_octal() {
        let v = LogicVec::from_digits(8, "17").unwrap();
        assert_eq!(v.width(), 6);
        assert_eq!(v.to_u64(), Some(0o17));
    }

    #[test]
    fn from_digits_decimal() {
        let v = LogicVec::from_digits(10, "1_000_000").unwrap();
        assert_eq!(v.to_u64(), Some(1_000_000));
        assert_eq!(v.width(), 32);
    }

    #[test]
    fn from_digits_decimal_x() {
        let v = LogicVec::from_digits(10, "x").unwrap();
        assert_eq!(v.width(), 32);
        assert!(v.has_unknown());
        assert!(LogicVec::from_digits(10, "1x").is_none());
    }

    #[test]
    fn bitwise_ops() {
        let a = bv("1100");
        let b = bv("1010");
        assert_eq!(format!("{}", &a & &b), "1000");
        assert_eq!(format!("{}", &a | &b), "1110");
        assert_eq!(format!("{}", &a ^ &b), "0110");
        assert_eq!(format!("{}", !&bv("10XZ")), "01XX");
    }

    #[test]
    fn add_wrap() {
        let a = LogicVec::from_u64(200, 8);
        let b = LogicVec::from_u64(100, 8);
        assert_eq!(a.add_wrap(&b).to_u64(), Some(44)); // 300 mod 256
    }

    #[test]
    fn add_propagates_unknown() {
        let a = bv("1X00");
        let b = bv("0001");
        assert_eq!(format!("{}", a.add_wrap(&b)), "XXXX");
    }

    #[test]
    fn sub_wrap_underflow() {
        let a = LogicVec::from_u64(1, 8);
        let b = LogicVec::from_u64(2, 8);
        assert_eq!(a.sub_wrap(&b).to_u64(), Some(255));
    }

    #[test]
    fn negate_two_complement() {
        let a = LogicVec::from_u64(1, 8);
        assert_eq!(a.negate().to_u64(), Some(255));
        assert_eq!(a.negate().to_i64(true), Some(-1));
    }

    #[test]
    fn mul_wrap() {
        let a = LogicVec::from_u64(20, 8);
        let b = LogicVec::from_u64(20, 8);
        assert_eq!(a.mul_wrap(&b).to_u64(), Some(400 % 256));
    }

    #[test]
    fn wide_arithmetic_spans_words() {
        let a = LogicVec::from_u64(u64::MAX, 100);
        let one = LogicVec::from_u64(1, 100);
        let sum = a.add_wrap(&one);
        assert_eq!(sum.get(64), Logic::One);
        assert_eq!(sum.get(0), Logic::Zero);
        assert_eq!(sum.sub_wrap(&one), a);
    }

    #[test]
    fn div_unsigned() {
        let a = LogicVec::from_u64(100, 8);
        let b = LogicVec::from_u64(7, 8);
        assert_eq!(a.div(&b, false).unwrap().to_u64(), Some(14));
        assert_eq!(a.rem(&b, false).unwrap().to_u64(), Some(2));
    }

    #[test]
    fn div_signed() {
        let a = LogicVec::from_u64(100, 8).negate(); // -100
        let b = LogicVec::from_u64(7, 8);
        assert_eq!(a.div(&b, true).unwrap().to_i64(true), Some(-14));
        // Remainder takes the sign of the dividend.
        assert_eq!(a.rem(&b, true).unwrap().to_i64(true), Some(-2));
    }

    #[test]
    fn div_by_zero_is_none() {
        let a = LogicVec::from_u64(5, 8);
        let z = LogicVec::new(8);
        assert!(a.div(&z, false).is_none());
        assert!(a.rem(&z, false).is_none());
    }

    #[test]
    fn div_unknown_is_all_x() {
        let a = bv("1X00");
        let b = bv("0010");
        assert_eq!(format!("{}", a.div(&b, false).unwrap()), "XXXX");
    }

    #[test]
    fn pow_cases() {
        let two = LogicVec::from_u64(2, 8);
        let ten = LogicVec::from_u64(10, 8);
        assert_eq!(two.pow(&ten, false).to_u64(), Some(1024 % 256));
        let zero = LogicVec::new(8);
        let neg1 = LogicVec::from_u64(1, 8).negate();
        assert!(zero.pow(&neg1, true).has_unknown());
        assert_eq!(two.pow(&neg1, true).to_u64(), Some(0));
    }

    #[test]
    fn shifts() {
        let a = bv("0110");
        assert_eq!(format!("{}", a.shl_bits(1)), "1100");
        assert_eq!(format!("{}", a.lshr_bits(1)), "0011");
        let b = bv("1010");
        assert_eq!(format!("{}", b.ashr_bits(2)), "1110");
    }

    #[test]
    fn compare_signed_unsigned() {
        let a = LogicVec::from_u64(0xF0, 8); // -16 signed, 240 unsigned
        let b = LogicVec::from_u64(0x10, 8);
        assert_eq!(a.compare(&b, false), Some(Ordering::Greater));
        assert_eq!(a.compare(&b, true), Some(Ordering::Less));
        assert_eq!(bv("1X").compare(&bv("10"), false), None);
    }

    #[test]
    fn equality_kinds() {
        assert_eq!(bv("1010").logic_eq(&bv("1010")), Logic::One);
        assert_eq!(bv("1010").logic_eq(&bv("1011")), Logic::Zero);
        assert_eq!(bv("10X0").logic_eq(&bv("10X0")), Logic::X);
        assert!(bv("10X0").case_eq(&bv("10X0")));
        assert!(!bv("10X0").case_eq(&bv("10Z0")));
    }

    #[test]
    fn reductions() {
        assert_eq!(bv("1111").reduce_and(), Logic::One);
        assert_eq!(bv("1101").reduce_and(), Logic::Zero);
        assert_eq!(bv("0000").reduce_or(), Logic::Zero);
        assert_eq!(bv("0100").reduce_or(), Logic::One);
        assert_eq!(bv("0110").reduce_xor(), Logic::Zero);
        assert_eq!(bv("0111").reduce_xor(), Logic::One);
        assert_eq!(bv("01X1").reduce_xor(), Logic::X);
    }

    #[test]
    fn resize_extension() {
        let a = bv("1010");
        assert_eq!(format!("{}", a.resize(6, false)), "001010");
        assert_eq!(format!("{}", a.resize(6, true)), "111010");
        assert_eq!(format!("{}", a.resize(2, false)), "10");
        let x = bv("X01");
        assert_eq!(format!("{}", x.resize(5, true)), "XXX01");
    }

    #[test]
    fn concat() {
        let hi = bv("10");
        let lo = bv("XZ");
        assert_eq!(format!("{}", hi.concat(&lo)), "10XZ");
    }

    #[test]
    fn truthiness() {
        assert_eq!(bv("0010").truthiness(), Some(true));
        assert_eq!(bv("0000").truthiness(), Some(false));
        assert_eq!(bv("00X0").truthiness(), None);
        assert_eq!(bv("01X0").truthiness(), Some(true));
    }

    #[test]
    fn to_i64_sign_extension() {
        let v = LogicVec::from_u64(0xFF, 8);
        assert_eq!(v.to_i64(true), Some(-1));
        assert_eq!(v.to_i64(false), Some(255));
    }

    #[test]
    fn serde_roundtrip() {
        let v = bv("10XZ1010");
        let json = serde_json::to_string(&v).unwrap();
        let back: LogicVec = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
