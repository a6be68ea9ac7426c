//! # Misc utitlities
//!
//! This module contains some utilities that are used but not specific to `postpad`.
use std::marker::PhantomData;

/// A counter that produces IDs of type T
#[derive(Debug)]
pub struct Counter<T>(u64, PhantomData<fn() -> T>);

impl<T> Default for Counter<T> {
    fn default() -> Self {
        Self(0, PhantomData)
    }
}

impl<T: From<u64>> Counter<T> {
    /// Get the next value from this counter
    pub fn next(&mut self) -> T {
        let id = self.0;
        self.0 = id + 1;
        T::from(id)
    }
}

pub(crate) enum LoopState<T> {
    Break(T),
    Continue,
}

/// Declares an opaque integer id that displays as `$key`
macro_rules! make_id {
    (#[$doc:meta] $name:ident, $key:literal) => {
        #[derive(
            Copy,
            Clone,
            Debug,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(into = "u64", from = "u64")]
        #[$doc]
        pub struct $name(u64);

        impl $name {
            /// Integer value
            pub fn int_val(&self) -> u64 {
                self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, $key, self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> $name {
                $name(id)
            }
        }
    };
}

pub(crate) use make_id;

#[cfg(test)]
mod tests {
    use super::Counter;

    make_id!(
        /// An id used only in this test
        TestId,
        "test#{0}"
    );

    #[test]
    fn counter_is_monotonic() {
        let mut counter = Counter::<TestId>::default();
        let a = counter.next();
        let b = counter.next();
        assert!(a < b);
        assert_eq!(b.int_val(), 1);
        assert_eq!(counter.next().int_val(), 2);
        assert_eq!(a.to_string(), "test#0");
    }
}
