//! Validated names - cheap-to-clone identifiers for pipelines, stages, links and fields
//!
//! All names use `Arc<str>` internally so cloning only bumps a reference count.
//! User-supplied names are checked against the resource-name grammar when parsed;
//! compiler-synthesized names join a base name and a suffix with `:`, which the
//! grammar never accepts, so the two namespaces cannot collide.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use crate::ContractError;

/// Maximum length of a resource name
pub const MAX_NAME_LEN: usize = 63;

/// Separator used by synthesized names
pub const SYNTHESIZED_SEPARATOR: char = ':';

/// Check a pipeline / stage / link name against the resource-name grammar.
///
/// `[A-Za-z][A-Za-z0-9_-]{0,62}`
pub fn validate_resource_name(kind: &'static str, name: &str) -> Result<(), ContractError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(ContractError::invalid_name(kind, name, "name cannot be empty"));
    };
    if name.len() > MAX_NAME_LEN {
        return Err(ContractError::invalid_name(
            kind,
            name,
            format!("name longer than {MAX_NAME_LEN} characters"),
        ));
    }
    if !first.is_ascii_alphabetic() {
        return Err(ContractError::invalid_name(
            kind,
            name,
            "name must start with an ASCII letter",
        ));
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-')) {
        return Err(ContractError::invalid_name(
            kind,
            name,
            format!("invalid character {bad:?}"),
        ));
    }
    Ok(())
}

/// Check a message field name. The empty string means "whole message".
pub fn validate_field_name(name: &str) -> Result<(), ContractError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Ok(());
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(ContractError::invalid_name(
            "field",
            name,
            "field must start with an ASCII letter or '_'",
        ));
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(ContractError::invalid_name(
            "field",
            name,
            format!("invalid character {bad:?}"),
        ));
    }
    Ok(())
}

/// Generates an `Arc<str>` backed name type.
macro_rules! define_name {
    ($(#[$meta:meta])* $name:ident, $validate:expr) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Parse and validate a name.
            pub fn parse(s: &str) -> Result<Self, ContractError> {
                let validate: fn(&str) -> Result<(), ContractError> = $validate;
                validate(s)?;
                Ok(Self(Arc::from(s)))
            }

            /// Get the underlying string slice.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ContractError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ContractError;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl PartialEq<str> for $name {
            #[inline]
            fn eq(&self, other: &str) -> bool {
                self.0.as_ref() == other
            }
        }

        impl PartialEq<&str> for $name {
            #[inline]
            fn eq(&self, other: &&str) -> bool {
                self.0.as_ref() == *other
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Generates the `synthesized` constructor for names the compiler invents.
macro_rules! impl_synthesized {
    ($name:ident) => {
        impl $name {
            /// Build a compiler-owned name `"<base>:<suffix>"`.
            ///
            /// Skips grammar validation; the separator keeps it disjoint from user names.
            pub fn synthesized(base: &str, suffix: &str) -> Self {
                Self(Arc::from(format!("{base}{SYNTHESIZED_SEPARATOR}{suffix}")))
            }

            /// Whether this name was produced by [`Self::synthesized`].
            pub fn is_synthesized(&self) -> bool {
                self.0.contains(SYNTHESIZED_SEPARATOR)
            }
        }
    };
}

define_name!(
    /// Pipeline name
    PipelineName,
    |s| validate_resource_name("pipeline", s)
);

define_name!(
    /// Stage name
    ///
    /// # Examples
    /// ```
    /// use contracts::StageName;
    ///
    /// let name = StageName::parse("transform").unwrap();
    /// assert_eq!(name, "transform");
    /// assert!(StageName::parse("9lives").is_err());
    /// ```
    StageName,
    |s| validate_resource_name("stage", s)
);

define_name!(
    /// Link name
    LinkName,
    |s| validate_resource_name("link", s)
);

define_name!(
    /// Message field name; empty means the whole message
    MessageField,
    validate_field_name
);

impl_synthesized!(StageName);
impl_synthesized!(LinkName);

impl MessageField {
    /// The unspecified field, addressing the whole message
    pub fn whole() -> Self {
        Self(Arc::from(""))
    }

    /// Whether this field addresses the whole message
    #[inline]
    pub fn is_whole(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for MessageField {
    fn default() -> Self {
        Self::whole()
    }
}

/// Opaque method identifier handed to a `MethodLoader`
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(Arc<str>);

impl MethodId {
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MethodId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MethodId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Serialize for MethodId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MethodId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::from)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodId({:?})", self.0)
    }
}
