//! Wire shapes returned by the document index

use serde::{Deserialize, Deserializer, Serialize};

/// A single document as returned by get or search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: serde_json::Value,
}

impl Hit {
    pub fn new(id: impl Into<String>, source: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

/// Hit section of a search response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchHits {
    #[serde(deserialize_with = "deserialize_total")]
    pub total: u64,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// Search or scroll response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchResponse {
    #[serde(rename = "_scroll_id", default, skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
    pub hits: SearchHits,
}

impl SearchResponse {
    pub fn new(total: u64, hits: Vec<Hit>) -> Self {
        Self {
            scroll_id: None,
            hits: SearchHits { total, hits },
        }
    }

    pub fn with_scroll_id(mut self, scroll_id: impl Into<String>) -> Self {
        self.scroll_id = Some(scroll_id.into());
        self
    }
}

/// Older indices report a bare count, newer ones `{ "value": n }`
fn deserialize_total<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Total {
        Count(u64),
        Object { value: u64 },
    }

    Ok(match Total::deserialize(deserializer)? {
        Total::Count(n) => n,
        Total::Object { value } => value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_legacy_total() {
        let response: SearchResponse = serde_json::from_value(json!({
            "_scroll_id": "c1",
            "hits": {"total": 2, "hits": [{"_id": "a", "_source": {"title": "A"}}]}
        }))
        .unwrap();

        assert_eq!(response.scroll_id.as_deref(), Some("c1"));
        assert_eq!(response.hits.total, 2);
        assert_eq!(response.hits.hits[0].id, "a");
    }

    #[test]
    fn test_parse_object_total() {
        let response: SearchResponse = serde_json::from_value(json!({
            "hits": {"total": {"value": 7, "relation": "eq"}, "hits": []}
        }))
        .unwrap();

        assert_eq!(response.hits.total, 7);
        assert!(response.scroll_id.is_none());
    }

    #[test]
    fn test_hit_without_source_defaults_to_null() {
        let hit: Hit = serde_json::from_value(json!({"_id": "x"})).unwrap();
        assert!(hit.source.is_null());
    }
}
