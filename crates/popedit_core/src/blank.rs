//! Falsy-value detection used when resolving `reset` and `init` arguments.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Values that can be "blank": present, but treated as absent under the
/// falsy test (empty string, `false`, zero, `NaN`, `None`).
///
/// Structured form values are never blank, so the default implementation
/// returns `false`; `impl Blank for MyForm {}` is enough for such types.
pub trait Blank {
    /// Return `true` when this value counts as absent.
    fn is_blank(&self) -> bool {
        false
    }
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Blank for &str {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Blank for bool {
    fn is_blank(&self) -> bool {
        !*self
    }
}

impl Blank for char {}

impl<T> Blank for Vec<T> {}

impl<T> Blank for Option<T> {
    fn is_blank(&self) -> bool {
        self.is_none()
    }
}

macro_rules! impl_blank_for_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Blank for $ty {
                fn is_blank(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

impl_blank_for_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Blank for f32 {
    fn is_blank(&self) -> bool {
        *self == 0.0 || self.is_nan()
    }
}

impl Blank for f64 {
    fn is_blank(&self) -> bool {
        *self == 0.0 || self.is_nan()
    }
}

/// How an explicit `Some(value)` argument is resolved against the revert
/// snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetPolicy {
    /// Blank values fall back to the revert snapshot, exactly like passing
    /// nothing.
    #[default]
    BlankIsAbsent,
    /// Any explicitly supplied value is honored, blank or not.
    ExplicitOnly,
}

impl ResetPolicy {
    /// Resolve an optional argument into the value that should be applied.
    ///
    /// # Arguments
    /// - `value`: Caller-supplied value, if any.
    ///
    /// # Returns
    /// `Some(value)` when the policy honors it, otherwise `None` so the caller
    /// falls back to its snapshot.
    pub fn resolve<V: Blank>(self, value: Option<V>) -> Option<V> {
        match (self, value) {
            (_, None) => None,
            (Self::BlankIsAbsent, Some(value)) if value.is_blank() => None,
            (_, Some(value)) => Some(value),
        }
    }

    /// Stable kebab-case name, matching the configuration syntax.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BlankIsAbsent => "blank-is-absent",
            Self::ExplicitOnly => "explicit-only",
        }
    }
}

impl fmt::Display for ResetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResetPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "blank-is-absent" | "falsy" => Ok(Self::BlankIsAbsent),
            "explicit-only" | "explicit" | "strict" => Ok(Self::ExplicitOnly),
            other => Err(format!("unknown reset policy '{other}'")),
        }
    }
}
