//! Registry of saved object services that generic tooling can list and edit

use serde::Serialize;

use super::{SavedObjectType, SavedSearch, SavedTemplate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    /// Service name, e.g. `savedTemplates`
    pub service: String,
    /// Plural title shown to users, e.g. `templates`
    pub title: String,
    /// Document type in the index
    pub object_type: String,
}

impl RegistryEntry {
    pub fn new(
        service: impl Into<String>,
        title: impl Into<String>,
        object_type: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            title: title.into(),
            object_type: object_type.into(),
        }
    }

    /// Entry for a saved object type using its loader name as title
    pub fn for_type<T: SavedObjectType>(service: impl Into<String>) -> Self {
        Self::new(service, T::loader_properties().name, T::TYPE)
    }
}

/// Ordered collection of registered saved object services
#[derive(Debug, Clone)]
pub struct SavedObjectRegistry {
    entries: Vec<RegistryEntry>,
}

impl SavedObjectRegistry {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers a service, replacing an earlier entry with the same service name
    pub fn register(&mut self, entry: RegistryEntry) {
        match self.entries.iter_mut().find(|e| e.service == entry.service) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Looks up an entry by title or service name, ignoring case
    pub fn find_by_title(&self, title: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| {
            e.title.eq_ignore_ascii_case(title) || e.service.eq_ignore_ascii_case(title)
        })
    }
}

impl Default for SavedObjectRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(RegistryEntry::for_type::<SavedTemplate>("savedTemplates"));
        registry.register(RegistryEntry::for_type::<SavedSearch>("savedSearches"));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_order() {
        let registry = SavedObjectRegistry::default();
        let titles: Vec<&str> = registry.entries().iter().map(|e| e.title.as_str()).collect();

        assert_eq!(titles, vec!["templates", "searches"]);
    }

    #[test]
    fn test_find_by_title_or_service() {
        let registry = SavedObjectRegistry::default();

        assert_eq!(
            registry.find_by_title("Templates").unwrap().object_type,
            "template"
        );
        assert_eq!(
            registry.find_by_title("savedsearches").unwrap().object_type,
            "search"
        );
        assert!(registry.find_by_title("dashboards").is_none());
    }

    #[test]
    fn test_register_replaces_same_service() {
        let mut registry = SavedObjectRegistry::default();
        registry.register(RegistryEntry::new("savedTemplates", "tpl", "template"));

        assert_eq!(registry.entries().len(), 2);
        assert!(registry.find_by_title("tpl").is_some());
    }
}
