//! Saved template - reusable result templates

use serde::{Deserialize, Serialize};

use super::{LoaderProperties, SavedObjectType};

pub const DEFAULT_TEMPLATE_ENGINE: &str = "jade";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTemplate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "st_templateSource", default)]
    pub template_source: String,
    #[serde(rename = "st_templateEngine", default = "default_engine")]
    pub template_engine: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_engine() -> String {
    DEFAULT_TEMPLATE_ENGINE.to_string()
}

fn default_version() -> u32 {
    1
}

impl Default for SavedTemplate {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            template_source: String::new(),
            template_engine: default_engine(),
            version: default_version(),
        }
    }
}

impl SavedObjectType for SavedTemplate {
    const TYPE: &'static str = "template";
    const URL_TEMPLATE: &'static str = "#/settings/templates/{{id}}";

    fn loader_properties() -> LoaderProperties {
        LoaderProperties {
            name: "templates",
            noun: "Template",
            nouns: "templates",
        }
    }

    fn title(&self) -> &str {
        &self.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_source_uses_defaults() {
        let template: SavedTemplate = serde_json::from_value(json!({"title": "T"})).unwrap();

        assert_eq!(template.title, "T");
        assert_eq!(template.description, "");
        assert_eq!(template.template_engine, "jade");
        assert_eq!(template.version, 1);
    }

    #[test]
    fn test_stored_field_names() {
        let template = SavedTemplate {
            title: "Table".to_string(),
            template_source: "table\n  tr".to_string(),
            ..Default::default()
        };

        let value = serde_json::to_value(&template).unwrap();
        assert_eq!(value["st_templateSource"], "table\n  tr");
        assert_eq!(value["st_templateEngine"], "jade");
    }
}
