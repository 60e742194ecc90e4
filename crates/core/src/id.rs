// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed id newtypes for groups, projects, and sessions.
//!
//! Ids are opaque strings. Freshly generated ids are a 4-char prefix plus a
//! 16-char nanoid; ids imported from storage or YAML are accepted verbatim.

use serde::{Deserialize, Serialize};

const ID_LEN: usize = 16;

macro_rules! typed_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random id.
            pub fn generate() -> Self {
                Self(format!("{}{}", $prefix, nanoid::nanoid!(ID_LEN)))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id!(GroupId, "grp_");
typed_id!(ProjectId, "prj_");
typed_id!(SessionId, "ses_");

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
