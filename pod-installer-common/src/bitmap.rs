// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed-width bit vectors addressed by check id.
//!
//! Every outcome class (pass, warn, fail, ignore) and every policy vector is
//! a [`TestBitmap`] whose width is the number of registered checks. Mixing
//! bitmaps of different widths is a programming error and panics, as does
//! addressing a bit beyond the width.

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::ops::BitAnd;
use std::ops::BitOr;
use std::ops::BitXor;
use std::ops::Not;
use thiserror::Error;

/// The widest bitmap we can represent.
pub const MAX_WIDTH: u32 = u128::BITS;

/// Identifies one check and the bit it owns in every bitmap.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(transparent)]
pub struct TestId(u16);

impl TestId {
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Position of this check in the result vector.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for TestId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BitmapError {
    #[error("bitmap width {width} exceeds the maximum of {MAX_WIDTH}")]
    TooWide { width: u32 },

    #[error("value {bits:#x} has bits set beyond width {width}")]
    OutOfRange { width: u32, bits: u128 },

    #[error("invalid decimal bitmap value {value:?}")]
    Parse {
        value: String,
        #[source]
        error: std::num::ParseIntError,
    },
}

/// An N-bit vector where bit `i` belongs to the check with [`TestId`] `i`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(into = "SerializedBitmap", try_from = "SerializedBitmap")]
pub struct TestBitmap {
    width: u32,
    bits: u128,
}

impl TestBitmap {
    /// Returns a bitmap of the given width with no bits set.
    ///
    /// # Panics
    ///
    /// Panics if `width` exceeds [`MAX_WIDTH`].
    pub fn empty(width: u32) -> Self {
        assert!(width <= MAX_WIDTH, "bitmap width {width} exceeds {MAX_WIDTH}");
        Self { width, bits: 0 }
    }

    /// Returns a bitmap of the given width with every bit set.
    pub fn full(width: u32) -> Self {
        let mut map = Self::empty(width);
        map.bits = Self::mask(width);
        map
    }

    /// Builds a bitmap from a raw value, rejecting bits beyond `width`.
    pub fn from_bits(width: u32, bits: u128) -> Result<Self, BitmapError> {
        if width > MAX_WIDTH {
            return Err(BitmapError::TooWide { width });
        }
        if bits & !Self::mask(width) != 0 {
            return Err(BitmapError::OutOfRange { width, bits });
        }
        Ok(Self { width, bits })
    }

    /// Builds a bitmap with exactly the given ids set.
    pub fn from_ids<I>(width: u32, ids: I) -> Self
    where
        I: IntoIterator<Item = TestId>,
    {
        let mut map = Self::empty(width);
        for id in ids {
            map.set(id);
        }
        map
    }

    fn mask(width: u32) -> u128 {
        if width == MAX_WIDTH {
            u128::MAX
        } else {
            (1u128 << width) - 1
        }
    }

    fn bit(&self, id: TestId) -> u128 {
        assert!(
            u32::from(id.as_u16()) < self.width,
            "test id {id} is out of range for bitmap width {}",
            self.width,
        );
        1u128 << id.as_u16()
    }

    fn check_width(&self, other: &Self) {
        assert_eq!(
            self.width, other.width,
            "bitmap width mismatch: {} vs {}",
            self.width, other.width,
        );
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn bits(&self) -> u128 {
        self.bits
    }

    pub fn set(&mut self, id: TestId) {
        self.bits |= self.bit(id);
    }

    pub fn clear(&mut self, id: TestId) {
        self.bits &= !self.bit(id);
    }

    pub fn test(&self, id: TestId) -> bool {
        self.bits & self.bit(id) != 0
    }

    pub fn union(&self, other: &Self) -> Self {
        self.check_width(other);
        Self { width: self.width, bits: self.bits | other.bits }
    }

    pub fn intersection(&self, other: &Self) -> Self {
        self.check_width(other);
        Self { width: self.width, bits: self.bits & other.bits }
    }

    pub fn xor(&self, other: &Self) -> Self {
        self.check_width(other);
        Self { width: self.width, bits: self.bits ^ other.bits }
    }

    /// Bits in `self` that are not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        self.check_width(other);
        Self { width: self.width, bits: self.bits & !other.bits }
    }

    /// Flips every bit within the width; bits beyond it stay clear.
    pub fn complement(&self) -> Self {
        Self { width: self.width, bits: !self.bits & Self::mask(self.width) }
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn is_full(&self) -> bool {
        self.bits == Self::mask(self.width)
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.intersection(other).is_empty()
    }

    pub fn count_ones(&self) -> u32 {
        self.bits.count_ones()
    }

    /// Iterates over the ids of set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = TestId> + '_ {
        (0..self.width)
            .filter(move |i| self.bits & (1u128 << i) != 0)
            .map(|i| TestId::new(i as u16))
    }
}

impl fmt::Debug for TestBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TestBitmap({}; {:#x})", self.width, self.bits)
    }
}

impl fmt::Display for TestBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.bits)
    }
}

impl fmt::LowerHex for TestBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.bits, f)
    }
}

impl BitOr for TestBitmap {
    type Output = TestBitmap;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(&rhs)
    }
}

impl BitAnd for TestBitmap {
    type Output = TestBitmap;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersection(&rhs)
    }
}

impl BitXor for TestBitmap {
    type Output = TestBitmap;

    fn bitxor(self, rhs: Self) -> Self::Output {
        self.xor(&rhs)
    }
}

impl Not for TestBitmap {
    type Output = TestBitmap;

    fn not(self) -> Self::Output {
        self.complement()
    }
}

/// On-disk form: the value is a decimal string so that 128-bit values
/// survive JSON readers limited to doubles.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
struct SerializedBitmap {
    width: u32,
    bits: String,
}

impl From<TestBitmap> for SerializedBitmap {
    fn from(map: TestBitmap) -> Self {
        Self { width: map.width, bits: map.bits.to_string() }
    }
}

impl TryFrom<SerializedBitmap> for TestBitmap {
    type Error = BitmapError;

    fn try_from(value: SerializedBitmap) -> Result<Self, Self::Error> {
        let bits = value.bits.parse::<u128>().map_err(|error| {
            BitmapError::Parse { value: value.bits.clone(), error }
        })?;
        TestBitmap::from_bits(value.width, bits)
    }
}

impl JsonSchema for TestBitmap {
    fn schema_name() -> String {
        "TestBitmap".to_string()
    }

    fn json_schema(
        gen: &mut schemars::gen::SchemaGenerator,
    ) -> schemars::schema::Schema {
        SerializedBitmap::json_schema(gen)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    #[test]
    fn test_set_and_test() {
        let mut map = TestBitmap::empty(90);
        assert!(map.is_empty());
        map.set(TestId::new(0));
        map.set(TestId::new(89));
        assert!(map.test(TestId::new(0)));
        assert!(map.test(TestId::new(89)));
        assert!(!map.test(TestId::new(45)));
        assert_eq!(map.count_ones(), 2);
        assert_eq!(
            map.iter().collect::<Vec<_>>(),
            vec![TestId::new(0), TestId::new(89)]
        );

        map.clear(TestId::new(0));
        assert!(!map.test(TestId::new(0)));
    }

    #[test]
    fn test_complement_stays_within_width() {
        let map = TestBitmap::from_bits(90, 0b1011).unwrap();
        let inverted = !map;
        assert_eq!(inverted.count_ones(), 87);
        assert!(inverted.union(&map).is_full());
        assert!(inverted.is_disjoint(&map));
        assert_eq!(TestBitmap::full(90).bits(), (1u128 << 90) - 1);
        assert_eq!(TestBitmap::full(128).bits(), u128::MAX);
    }

    #[test]
    fn test_from_bits_rejects_out_of_range() {
        assert_matches!(
            TestBitmap::from_bits(4, 0b10000),
            Err(BitmapError::OutOfRange { width: 4, bits: 0b10000 })
        );
        assert_matches!(
            TestBitmap::from_bits(129, 0),
            Err(BitmapError::TooWide { width: 129 })
        );
    }

    #[test]
    #[should_panic(expected = "bitmap width mismatch")]
    fn test_width_mismatch_panics() {
        let _ = TestBitmap::empty(90) | TestBitmap::empty(91);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_id_beyond_width_panics() {
        let mut map = TestBitmap::empty(90);
        map.set(TestId::new(90));
    }

    #[test]
    fn test_serialized_form_is_decimal_string() {
        let map = TestBitmap::from_bits(90, (1u128 << 89) | 1).unwrap();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            r#"{"width":90,"bits":"618970019642690137449562113"}"#
        );
        let back: TestBitmap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);

        let err = serde_json::from_str::<TestBitmap>(
            r#"{"width":2,"bits":"8"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("beyond width"), "{err}");
    }

    proptest! {
        #[test]
        fn test_xor_with_full_is_complement(bits in any::<u128>()) {
            let width = 90;
            let map = TestBitmap::from_bits(width, bits & ((1 << width) - 1))
                .unwrap();
            prop_assert_eq!(map ^ TestBitmap::full(width), !map);
            prop_assert!((map & !map).is_empty());
        }
    }
}
