//! Approximate byte-cost estimation for cached payloads.
//!
//! Memory-bounded eviction needs a per-entry cost, but exact heap accounting
//! for arbitrary user values is out of reach; the contract here is weaker
//! and sufficient: estimates are deterministic for identical inputs and grow
//! when a value obviously grows. Scalars cost their native width, textual
//! and byte sequences cost their length, and composites sum their parts with
//! a fixed overhead per part.
//!
//! Custom payload types implement [`ByteSize`] the same way:
//!
//! ```
//! use keystash::weight::{ByteSize, FIELD_OVERHEAD};
//!
//! struct Profile {
//!     name: String,
//!     age: u32,
//! }
//!
//! impl ByteSize for Profile {
//!     fn byte_size(&self) -> usize {
//!         self.name.byte_size() + self.age.byte_size() + 2 * FIELD_OVERHEAD
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

/// Fixed overhead charged per field of a composite value.
pub const FIELD_OVERHEAD: usize = 16;

/// Approximate byte cost of a value, used for memory-bounded eviction.
pub trait ByteSize {
    /// Returns the estimated size of `self` in bytes.
    fn byte_size(&self) -> usize;
}

macro_rules! scalar_byte_size {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ByteSize for $ty {
                fn byte_size(&self) -> usize {
                    std::mem::size_of::<$ty>()
                }
            }
        )*
    };
}

scalar_byte_size!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char,
);

impl ByteSize for bool {
    fn byte_size(&self) -> usize {
        1
    }
}

impl ByteSize for str {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl ByteSize for String {
    fn byte_size(&self) -> usize {
        self.len()
    }
}

impl<T: ByteSize> ByteSize for [T] {
    fn byte_size(&self) -> usize {
        self.iter().map(ByteSize::byte_size).sum()
    }
}

impl<T: ByteSize> ByteSize for Vec<T> {
    fn byte_size(&self) -> usize {
        self.as_slice().byte_size()
    }
}

impl<T: ByteSize> ByteSize for Option<T> {
    fn byte_size(&self) -> usize {
        match self {
            Some(value) => value.byte_size(),
            None => 0,
        }
    }
}

impl<T: ByteSize + ?Sized> ByteSize for &T {
    fn byte_size(&self) -> usize {
        (**self).byte_size()
    }
}

impl<T: ByteSize + ?Sized> ByteSize for Box<T> {
    fn byte_size(&self) -> usize {
        (**self).byte_size()
    }
}

macro_rules! tuple_byte_size {
    ($(($($name:ident),+)),* $(,)?) => {
        $(
            impl<$($name: ByteSize),+> ByteSize for ($($name,)+) {
                fn byte_size(&self) -> usize {
                    #[allow(non_snake_case)]
                    let ($($name,)+) = self;
                    0 $(+ $name.byte_size() + FIELD_OVERHEAD)+
                }
            }
        )*
    };
}

tuple_byte_size!((A), (A, B), (A, B, C), (A, B, C, D));

impl<K: ByteSize, V: ByteSize, S> ByteSize for HashMap<K, V, S> {
    fn byte_size(&self) -> usize {
        self.iter()
            .map(|(key, value)| key.byte_size() + value.byte_size() + FIELD_OVERHEAD)
            .sum()
    }
}

impl<K: ByteSize, V: ByteSize> ByteSize for BTreeMap<K, V> {
    fn byte_size(&self) -> usize {
        self.iter()
            .map(|(key, value)| key.byte_size() + value.byte_size() + FIELD_OVERHEAD)
            .sum()
    }
}
