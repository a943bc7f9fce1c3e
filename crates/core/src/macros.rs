// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros shared by the drover crates.

/// Define a prefixed random identifier over `SmolStr`.
///
/// IDs are `{prefix}{nanoid}`: a 4 character prefix plus 19 random
/// characters, 23 bytes in all, which SmolStr stores inline. They serialize
/// as plain strings, order totally, and look up by `&str` in hashed or
/// ordered maps.
///
/// ```ignore
/// define_id! {
///     pub struct BarrierIdentity("bar-");
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(smol_str::SmolStr);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn new() -> Self {
                Self(smol_str::SmolStr::new(format!("{}{}", Self::PREFIX, nanoid::nanoid!(19))))
            }

            /// Wrap an ID received from elsewhere. The prefix is not checked.
            pub fn from_string(id: impl Into<smol_str::SmolStr>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// The random part, or the whole ID if it lacks the prefix.
            pub fn suffix(&self) -> &str {
                self.0.strip_prefix(Self::PREFIX).unwrap_or(&self.0)
            }

            /// At most `n` leading characters of the suffix, for log lines.
            pub fn short(&self, n: usize) -> &str {
                let suffix = self.suffix();
                match suffix.char_indices().nth(n) {
                    Some((end, _)) => &suffix[..end],
                    None => suffix,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// `Display` for enums whose variants each print as a fixed string.
///
/// ```ignore
/// crate::simple_display! {
///     PumpState {
///         Created => "created",
///         Running => "running",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}

/// Builder-style setters for `Option` fields, inside an `impl` block.
///
/// Each listed field gets `fn field(self, v: impl Into<T>) -> Self` that
/// stores `Some(v.into())`.
///
/// ```ignore
/// impl Connector {
///     drover_core::setters! {
///         option { connect_timeout: Duration }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (option { $( $field:ident : $ty:ty ),* $(,)? }) => {
        $(
            pub fn $field(mut self, v: impl Into<$ty>) -> Self {
                self.$field = Some(v.into());
                self
            }
        )*
    };
}
