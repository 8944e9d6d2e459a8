//! Cache key derivation for saved object lookups

use std::fmt;

/// Key identifying a cached saved object request
///
/// The string forms are stable: `<type>-id-<id>` for single fetches and
/// `<type><search>` for searches, so every entry of a type shares the
/// `<type>` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Single object fetched by id
    ById { object_type: String, id: String },
    /// Result page of a search string (empty means match-all)
    Find { object_type: String, search: String },
}

impl CacheKey {
    pub fn by_id(object_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ById {
            object_type: object_type.into(),
            id: id.into(),
        }
    }

    pub fn find(object_type: impl Into<String>, search: impl Into<String>) -> Self {
        Self::Find {
            object_type: object_type.into(),
            search: search.into(),
        }
    }

    /// Pattern matching every key of the given type
    pub fn type_pattern(object_type: &str) -> String {
        format!("{}*", object_type)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::ById { object_type, id } => write!(f, "{}-id-{}", object_type, id),
            CacheKey::Find {
                object_type,
                search,
            } => write!(f, "{}{}", object_type, search),
        }
    }
}
