//! Newtype IDs for type-safe entity references.
//!
//! Catalog data is authored by hand or pushed from the visual editor, so ids
//! arrive either as JSON numbers or as strings. The `define_id!` macro keeps
//! whichever shape was supplied so a cart written to storage reads back
//! byte-for-byte the same.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe catalog ID.
///
/// Creates an untagged enum that is either a number or a string with:
/// - `Serialize`/`Deserialize` preserving the original JSON shape
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `Display`, `FromStr` (numeric text parses to the number form)
/// - `From<i64>`, `From<&str>` and `From<String>`
///
/// `1` and `"1"` are distinct ids.
///
/// # Example
///
/// ```rust
/// # use bizvistar_core::define_id;
/// define_id!(WidgetId);
///
/// let numeric = WidgetId::from(7);
/// let textual = WidgetId::from("w-7");
/// assert_eq!(numeric.to_string(), "7");
/// assert_ne!(WidgetId::from(1), WidgetId::from("1"));
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(untagged)]
        pub enum $name {
            /// Numeric id, as most bundled template catalogs use.
            Number(i64),
            /// String id, as editor-provided catalogs use.
            Text(::std::string::String),
        }

        impl $name {
            /// Returns the numeric value if this is a numeric id.
            #[must_use]
            pub const fn as_number(&self) -> Option<i64> {
                match self {
                    Self::Number(n) => Some(*n),
                    Self::Text(_) => None,
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                match self {
                    Self::Number(n) => write!(f, "{n}"),
                    Self::Text(s) => f.write_str(s),
                }
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::convert::Infallible;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Ok(s.parse::<i64>()
                    .map_or_else(|_| Self::Text(s.to_owned()), Self::Number))
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self::Number(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::Text(id.to_owned())
            }
        }

        impl From<::std::string::String> for $name {
            fn from(id: ::std::string::String) -> Self {
                Self::Text(id)
            }
        }
    };
}

define_id!(ProductId);
define_id!(CategoryId);

/// Errors that can occur when parsing a [`SiteSlug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SiteSlugError {
    /// The slug is empty.
    #[error("site slug cannot be empty")]
    Empty,
    /// The slug is too long.
    #[error("site slug must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The slug contains a character outside `a-z`, `0-9` and `-`.
    #[error("site slug contains invalid character {0:?}")]
    InvalidCharacter(char),
    /// The slug starts or ends with a hyphen.
    #[error("site slug cannot start or end with '-'")]
    EdgeHyphen,
}

/// Identifier of a published storefront (one shop owner's site).
///
/// Slugs are lowercase ASCII letters, digits and hyphens, up to 63 characters,
/// so they are safe to embed in URL paths and storage keys.
///
/// ```
/// use bizvistar_core::SiteSlug;
///
/// assert!(SiteSlug::parse("acme-shoes").is_ok());
/// assert!(SiteSlug::parse("Acme").is_err());
/// assert!(SiteSlug::parse("-acme").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteSlug(String);

impl SiteSlug {
    /// Maximum length of a slug (one DNS label).
    pub const MAX_LENGTH: usize = 63;

    /// Parse a `SiteSlug` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, contains characters
    /// other than `a-z`, `0-9` and `-`, or starts/ends with `-`.
    pub fn parse(s: &str) -> Result<Self, SiteSlugError> {
        if s.is_empty() {
            return Err(SiteSlugError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SiteSlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(SiteSlugError::InvalidCharacter(c));
        }
        if s.starts_with('-') || s.ends_with('-') {
            return Err(SiteSlugError::EdgeHyphen);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SiteSlug {
    type Error = SiteSlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SiteSlug> for String {
    fn from(slug: SiteSlug) -> Self {
        slug.0
    }
}

impl std::str::FromStr for SiteSlug {
    type Err = SiteSlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
