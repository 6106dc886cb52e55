//! Display/FromStr boilerplate for enums that travel as fixed strings
//!
//! HTTP methods, share-link modes and library types all have a canonical
//! wire spelling. This macro writes that spelling on `Display` and accepts it
//! back case-insensitively on `FromStr`.
//!
//! # Example
//!
//! ```rust
//! use refsync_domain::impl_wire_name_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Visibility {
//!     Private,
//!     Public,
//! }
//!
//! impl_wire_name_conversions!(Visibility {
//!     Private => "private",
//!     Public => "public",
//! });
//!
//! assert_eq!(Visibility::Public.to_string(), "public");
//! assert_eq!("PRIVATE".parse::<Visibility>().unwrap(), Visibility::Private);
//! ```

/// Implements `Display` and `FromStr` from a variant-to-string table
///
/// # Arguments
///
/// * `$enum_name` - The enum type
/// * `$variant => $str` - Canonical wire spelling of each variant
///
/// Parsing ignores ASCII case, so an upper-case table (`"GET"`) and a
/// lower-case table (`"view"`) both accept any casing.
#[macro_export]
macro_rules! impl_wire_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical wire spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::RefSyncError;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err($crate::RefSyncError::InvalidInput(format!(
                    "Invalid {}: {}",
                    stringify!($enum_name),
                    s
                )))
            }
        }
    };
}
