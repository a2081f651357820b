//! Relations between records.
//!
//! A relation property arrives as
//! `{"sysDatatype": "relation", "sysRelationType": "single" | "array", "sysObjects": [..]}`.
//! Its items are identifiers, or whole objects when the find asked for
//! expansion. A save never sends the items themselves, only what changed
//! since the last save or fetch:
//! `{"sysRelationChanges": {"additions": [..], "removals": [..]}}`.

use crate::error::{CoreError, CoreResult};
use crate::file::FileManager;
use crate::record::{Record, COLLECTION_PROPERTY};
use serde_json::{json, Value};

const DATATYPE: &str = "sysDatatype";
const RELATION_DATATYPE: &str = "relation";
const RELATION_TYPE: &str = "sysRelationType";
const OBJECTS: &str = "sysObjects";
const CHANGES: &str = "sysRelationChanges";

/// Whether a relation holds one record or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// At most one related record.
    Single,
    /// Any number of related records.
    Array,
}

impl RelationKind {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Single => "single",
            RelationKind::Array => "array",
        }
    }
}

/// One item of a relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// A record known only by identifier.
    Id(String),
    /// A record held in full, either expanded by the server or set locally.
    Record(Box<Record>),
}

impl Related {
    /// Creates an item from an identifier.
    pub fn id(id: impl Into<String>) -> Self {
        Related::Id(id.into())
    }

    /// Returns the identifier, if the record has one.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            Related::Id(id) => Some(id),
            Related::Record(record) => record.id(),
        }
    }

    /// Returns the record, if held in full.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Related::Record(record) => Some(record),
            Related::Id(_) => None,
        }
    }

    fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Related::Record(record) => Some(record),
            Related::Id(_) => None,
        }
    }
}

impl From<Record> for Related {
    fn from(record: Record) -> Self {
        Related::Record(Box::new(record))
    }
}

impl From<String> for Related {
    fn from(id: String) -> Self {
        Related::Id(id)
    }
}

impl From<&str> for Related {
    fn from(id: &str) -> Self {
        Related::Id(id.to_string())
    }
}

/// Value of a relation property.
///
/// Besides its items, a relation remembers the identifiers it had after
/// the last save or fetch, so the next save can send additions and
/// removals only.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    kind: RelationKind,
    collection: Option<String>,
    items: Vec<Related>,
    saved: Vec<String>,
}

impl Relation {
    /// Creates an empty relation.
    pub fn empty(kind: RelationKind) -> Self {
        Self {
            kind,
            collection: None,
            items: Vec::new(),
            saved: Vec::new(),
        }
    }

    /// Creates a single relation to `item`.
    pub fn single(item: impl Into<Related>) -> Self {
        let mut relation = Self::empty(RelationKind::Single);
        relation.push(item);
        relation
    }

    /// Creates an array relation to `items`.
    pub fn array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Related>,
    {
        let mut relation = Self::empty(RelationKind::Array);
        for item in items {
            relation.push(item);
        }
        relation
    }

    /// Returns the relation kind.
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Returns the collection of the related records, when known.
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Returns the items in order.
    pub fn items(&self) -> &[Related] {
        &self.items
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the relation has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the identifier of the first item.
    ///
    /// For a single relation this is the related record's identifier.
    pub fn id(&self) -> Option<&str> {
        self.items.first().and_then(Related::record_id)
    }

    /// Returns the identifiers of all items that have one.
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().filter_map(Related::record_id).collect()
    }

    /// Returns the first item held in full.
    pub fn record(&self) -> Option<&Record> {
        self.records().next()
    }

    /// Iterates over the items held in full.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.items.iter().filter_map(Related::as_record)
    }

    /// Adds an item. A single relation replaces its item instead.
    pub fn push(&mut self, item: impl Into<Related>) {
        let item = item.into();
        if self.collection.is_none() {
            self.collection = item.as_record().map(|r| r.collection().to_string());
        }
        if self.kind == RelationKind::Single {
            self.items.clear();
        }
        self.items.push(item);
    }

    /// Removes and returns the item at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Related> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Removes every item with identifier `id` and returns true if any was found.
    pub fn remove_id(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.record_id() != Some(id));
        self.items.len() != before
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Identifiers added since the last save or fetch.
    pub fn additions(&self) -> Vec<&str> {
        let mut added: Vec<&str> = Vec::new();
        for id in self.ids() {
            if !self.saved.iter().any(|s| s == id) && !added.contains(&id) {
                added.push(id);
            }
        }
        added
    }

    /// Identifiers removed since the last save or fetch.
    pub fn removals(&self) -> Vec<&str> {
        let current = self.ids();
        self.saved
            .iter()
            .map(String::as_str)
            .filter(|id| !current.contains(id))
            .collect()
    }

    /// Returns true if an item is a record that was never saved.
    pub fn has_unsaved(&self) -> bool {
        self.items.iter().any(|item| item.record_id().is_none())
    }

    /// Change set sent when saving the owning record.
    pub(crate) fn to_wire(&self) -> Value {
        json!({
            CHANGES: {
                "additions": self.additions(),
                "removals": self.removals(),
            }
        })
    }

    /// Plain JSON view: identifiers, or nested records where expanded.
    pub(crate) fn to_json(&self) -> Value {
        let item = |item: &Related| match item {
            Related::Id(id) => Value::String(id.clone()),
            Related::Record(record) => record.to_json(),
        };
        match self.kind {
            RelationKind::Single => self.items.first().map_or(Value::Null, item),
            RelationKind::Array => Value::Array(self.items.iter().map(item).collect()),
        }
    }

    /// Parses a relation property, or returns `None` if `value` is not one.
    pub(crate) fn from_wire(value: &Value, files: &FileManager) -> CoreResult<Option<Self>> {
        let Some(object) = value.as_object() else {
            return Ok(None);
        };
        if object.get(DATATYPE).and_then(Value::as_str) != Some(RELATION_DATATYPE) {
            return Ok(None);
        }

        let kind = match object.get(RELATION_TYPE).and_then(Value::as_str) {
            Some("single") => RelationKind::Single,
            _ => RelationKind::Array,
        };
        let collection = object
            .get(COLLECTION_PROPERTY)
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut items = Vec::new();
        let objects = object.get(OBJECTS).and_then(Value::as_array);
        for entry in objects.into_iter().flatten() {
            let item = match entry {
                Value::String(id) => Related::Id(id.clone()),
                Value::Object(nested) => {
                    let nested_collection = collection
                        .as_deref()
                        .or_else(|| nested.get(COLLECTION_PROPERTY).and_then(Value::as_str))
                        .ok_or_else(|| {
                            CoreError::unexpected_response("expanded relation without a collection")
                        })?;
                    Related::from(Record::from_server(nested_collection, entry, files)?)
                }
                other => {
                    return Err(CoreError::unexpected_response(format!(
                        "relation item was {}",
                        other
                    )))
                }
            };
            items.push(item);
        }

        let mut relation = Self {
            kind,
            collection,
            items,
            saved: Vec::new(),
        };
        relation.commit();
        Ok(Some(relation))
    }

    /// Takes the last saved state from the value this one replaces.
    pub(crate) fn inherit(&mut self, previous: &Relation) {
        self.saved = previous.saved.clone();
        if self.collection.is_none() {
            self.collection = previous.collection.clone();
        }
    }

    /// Marks the current items as saved.
    pub(crate) fn commit(&mut self) {
        self.saved = self.ids().into_iter().map(str::to_string).collect();
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.items.iter_mut().filter_map(Related::as_record_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_transport::{MemorySession, Transport, TransportConfig};
    use std::sync::Arc;

    fn files() -> FileManager {
        FileManager::new(Transport::new(
            TransportConfig::new("k").with_base_url("http://h/v1"),
            Arc::new(cirrus_testkit::MockBackend::new()),
            Arc::new(MemorySession::new()),
        ))
    }

    fn parse(value: Value) -> Relation {
        Relation::from_wire(&value, &files()).unwrap().unwrap()
    }

    #[test]
    fn unexpanded_items_are_ids() {
        let single = parse(json!({
            "sysDatatype": "relation", "sysRelationType": "single", "sysObjects": ["id1"]
        }));
        assert_eq!(single.kind(), RelationKind::Single);
        assert_eq!(single.id(), Some("id1"));
        assert!(single.record().is_none());

        let array = parse(json!({
            "sysDatatype": "relation", "sysRelationType": "array", "sysObjects": ["id2", "id3"]
        }));
        assert_eq!(array.ids(), ["id2", "id3"]);

        let empty = parse(json!({"sysDatatype": "relation", "sysRelationType": "single"}));
        assert!(empty.is_empty());
        assert_eq!(empty.id(), None);
        assert_eq!(empty.to_json(), Value::Null);
    }

    #[test]
    fn expanded_items_are_records() {
        let relation = parse(json!({
            "sysDatatype": "relation",
            "sysRelationType": "array",
            "sysCollection": "posts",
            "sysObjects": [
                {"sysObjectId": "p1", "title": "Zen"},
                {"sysObjectId": "p2", "title": "Flow"}
            ]
        }));
        let posts: Vec<&Record> = relation.records().collect();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].collection(), "posts");
        assert_eq!(posts[1].get("title").unwrap(), "Flow");
        assert_eq!(relation.ids(), ["p1", "p2"]);
        assert!(relation.additions().is_empty());
    }

    #[test]
    fn expanded_items_need_a_collection() {
        let value = json!({
            "sysDatatype": "relation",
            "sysRelationType": "single",
            "sysObjects": [{"sysObjectId": "c1"}]
        });
        assert!(Relation::from_wire(&value, &files()).is_err());
    }

    #[test]
    fn other_values_are_not_relations() {
        assert!(Relation::from_wire(&json!("c1"), &files()).unwrap().is_none());
        assert!(Relation::from_wire(&json!({"sysDatatype": "file"}), &files())
            .unwrap()
            .is_none());
    }

    #[test]
    fn changes_are_relative_to_last_commit() {
        let mut posts = parse(json!({
            "sysDatatype": "relation", "sysRelationType": "array", "sysObjects": ["p1", "p2"]
        }));
        posts.remove(0);
        posts.push("p3");
        assert_eq!(posts.additions(), ["p3"]);
        assert_eq!(posts.removals(), ["p1"]);
        assert_eq!(
            posts.to_wire(),
            json!({"sysRelationChanges": {"additions": ["p3"], "removals": ["p1"]}})
        );

        posts.commit();
        assert!(posts.remove_id("p3"));
        posts.push("p4");
        assert_eq!(posts.additions(), ["p4"]);
        assert_eq!(posts.removals(), ["p3"]);
    }

    #[test]
    fn single_relation_replaces_its_item() {
        let mut customer = Relation::single("c1");
        customer.commit();
        customer.push("c2");
        assert_eq!(customer.ids(), ["c2"]);
        assert_eq!(customer.additions(), ["c2"]);
        assert_eq!(customer.removals(), ["c1"]);
    }

    #[test]
    fn unsaved_records_are_detected() {
        let mut relation = Relation::array(["p1"]);
        assert!(!relation.has_unsaved());
        relation.push(Record::new("posts"));
        assert!(relation.has_unsaved());
        assert_eq!(relation.collection(), Some("posts"));
        assert_eq!(relation.additions(), ["p1"]);
    }
}
