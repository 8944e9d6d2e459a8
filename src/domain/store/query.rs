//! Search query construction for the document index

use serde::{Deserialize, Serialize};

/// Fields searched by free-text queries, with boosts
pub const SEARCH_FIELDS: [&str; 2] = ["title^3", "description"];

/// Scroll keep-alive used by scans
pub const SCROLL_KEEP_ALIVE: &str = "1m";

/// Boolean operator combining the terms of a text query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum DefaultOperator {
    #[default]
    And,
    Or,
}

/// Query body sent to the document index
///
/// Serializes to the index's query DSL, e.g. `{"match_all":{}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchQuery {
    #[serde(rename = "match_all")]
    MatchAll {},

    #[serde(rename = "simple_query_string")]
    SimpleQueryString {
        query: String,
        fields: Vec<String>,
        default_operator: DefaultOperator,
    },
}

impl SearchQuery {
    /// Builds the query for a user search string
    ///
    /// An empty string matches everything; anything else becomes a
    /// prefix query over title and description requiring every term.
    pub fn for_search_string(search: &str) -> Self {
        if search.is_empty() {
            return Self::MatchAll {};
        }

        Self::SimpleQueryString {
            query: format!("{}*", search),
            fields: SEARCH_FIELDS.iter().map(|f| f.to_string()).collect(),
            default_operator: DefaultOperator::And,
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Self::MatchAll {})
    }
}

/// A search against one index/type
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub index: String,
    pub doc_type: String,
    pub query: SearchQuery,
    pub size: usize,
    /// Scroll keep-alive; opens a cursor when set
    pub scroll: Option<String>,
}

impl SearchRequest {
    pub fn new(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        query: SearchQuery,
        size: usize,
    ) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            query,
            size,
            scroll: None,
        }
    }

    pub fn with_scroll(mut self, keep_alive: impl Into<String>) -> Self {
        self.scroll = Some(keep_alive.into());
        self
    }

    /// JSON request body
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({ "query": self.query })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_search_is_match_all() {
        let query = SearchQuery::for_search_string("");
        assert!(query.is_match_all());
        assert_eq!(serde_json::to_value(&query).unwrap(), json!({"match_all": {}}));
    }

    #[test]
    fn test_search_string_builds_prefix_query() {
        let query = SearchQuery::for_search_string("foo");

        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "simple_query_string": {
                    "query": "foo*",
                    "fields": ["title^3", "description"],
                    "default_operator": "AND"
                }
            })
        );
    }

    #[test]
    fn test_request_body_wraps_query() {
        let request = SearchRequest::new(".kibi", "template", SearchQuery::MatchAll {}, 100)
            .with_scroll(SCROLL_KEEP_ALIVE);

        assert_eq!(request.body(), json!({"query": {"match_all": {}}}));
        assert_eq!(request.scroll.as_deref(), Some("1m"));
    }
}
