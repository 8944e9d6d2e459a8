//! Saved object entity types

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Display names used by generic list and editor screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoaderProperties {
    pub name: &'static str,
    pub noun: &'static str,
    pub nouns: &'static str,
}

/// Capability contract implemented by every kind of saved object
///
/// The implementing type is the persisted attribute payload; the
/// associated constants describe where it lives and how it is routed.
pub trait SavedObjectType:
    Serialize + DeserializeOwned + Default + Clone + Debug + Send + Sync + 'static
{
    /// Document type in the index
    const TYPE: &'static str;

    /// Client-side route, with `{{id}}` standing for the object id
    const URL_TEMPLATE: &'static str;

    fn loader_properties() -> LoaderProperties;

    fn title(&self) -> &str;
}

/// A saved object as handed to callers: the stored source, its typed
/// view, the store-assigned id and the derived route
///
/// The source is kept exactly as persisted, so fields the type does not
/// declare survive a load/save cycle and defaults are never written back
/// for fields the document did not have.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedObjectRecord<T> {
    pub id: String,
    pub url: String,
    source: Map<String, Value>,
    attributes: T,
}

impl<T: SavedObjectType> SavedObjectRecord<T> {
    /// Record for freshly built attributes; every field lands in the source
    pub fn new(id: impl Into<String>, attributes: T) -> Self {
        let id = id.into();

        Self {
            url: url_for::<T>(&id),
            source: to_source(&attributes),
            id,
            attributes,
        }
    }

    /// Record over a stored document source
    ///
    /// Fields that do not decode into `T` are left out of the typed view
    /// (which falls back to their defaults) but stay in the source.
    pub fn from_source(id: impl Into<String>, source: Map<String, Value>) -> Self {
        let id = id.into();
        let attributes = decode_lenient::<T>(&id, &source);

        Self {
            url: url_for::<T>(&id),
            id,
            source,
            attributes,
        }
    }

    pub fn attributes(&self) -> &T {
        &self.attributes
    }

    pub fn source(&self) -> &Map<String, Value> {
        &self.source
    }

    pub fn title(&self) -> &str {
        self.attributes.title()
    }

    /// Replaces the typed attributes, updating their fields in the source
    /// and leaving other source fields untouched
    pub fn set_attributes(&mut self, attributes: T) {
        self.source.extend(to_source(&attributes));
        self.attributes = attributes;
    }
}

impl<T> Serialize for SavedObjectRecord<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self
            .source
            .iter()
            .filter(|(key, _)| key.as_str() != "id" && key.as_str() != "url");

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("url", &self.url)?;
        for (key, value) in fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct FlatRecord {
    id: String,
    #[serde(flatten)]
    source: Map<String, Value>,
}

impl<'de, T: SavedObjectType> Deserialize<'de> for SavedObjectRecord<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let FlatRecord { id, mut source } = FlatRecord::deserialize(deserializer)?;
        source.remove("url");

        Ok(Self::from_source(id, source))
    }
}

fn to_source<T: Serialize>(attributes: &T) -> Map<String, Value> {
    match serde_json::to_value(attributes) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn decode_lenient<T: SavedObjectType>(id: &str, source: &Map<String, Value>) -> T {
    if let Ok(attributes) = serde_json::from_value(Value::Object(source.clone())) {
        return attributes;
    }

    let mut accepted = Map::new();

    for (field, value) in source {
        let mut candidate = accepted.clone();
        candidate.insert(field.clone(), value.clone());

        if serde_json::from_value::<T>(Value::Object(candidate.clone())).is_ok() {
            accepted = candidate;
        } else {
            tracing::warn!(object_type = T::TYPE, id, field = %field, "Ignoring undecodable field");
        }
    }

    serde_json::from_value(Value::Object(accepted)).unwrap_or_default()
}

/// Result of a bounded search or a collected scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: SavedObjectType"))]
pub struct FindResult<T> {
    pub total: u64,
    pub hits: Vec<SavedObjectRecord<T>>,
}

/// Maps an id to the type's client-side route
pub fn url_for<T: SavedObjectType>(id: &str) -> String {
    T::URL_TEMPLATE.replace("{{id}}", &encode_uri_component(id))
}

/// Percent-encodes everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
pub fn encode_uri_component(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());

    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }

    encoded
}
