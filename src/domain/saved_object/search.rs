//! Saved search - stored discover queries

use serde::{Deserialize, Serialize};

use super::{LoaderProperties, SavedObjectType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSourceMeta {
    #[serde(rename = "searchSourceJSON", default = "empty_json_object")]
    pub search_source_json: String,
}

impl Default for SearchSourceMeta {
    fn default() -> Self {
        Self {
            search_source_json: empty_json_object(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub sort: Vec<serde_json::Value>,
    #[serde(default)]
    pub hits: u64,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(rename = "kibanaSavedObjectMeta", default)]
    pub meta: SearchSourceMeta,
}

fn empty_json_object() -> String {
    "{}".to_string()
}

fn default_columns() -> Vec<String> {
    vec!["_source".to_string()]
}

fn default_version() -> u32 {
    1
}

impl Default for SavedSearch {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            columns: default_columns(),
            sort: Vec::new(),
            hits: 0,
            version: default_version(),
            meta: SearchSourceMeta::default(),
        }
    }
}

impl SavedObjectType for SavedSearch {
    const TYPE: &'static str = "search";
    const URL_TEMPLATE: &'static str = "#/discover/{{id}}";

    fn loader_properties() -> LoaderProperties {
        LoaderProperties {
            name: "searches",
            noun: "Saved Search",
            nouns: "saved searches",
        }
    }

    fn title(&self) -> &str {
        &self.title
    }
}
