//! Records: local copies of remote documents.
//!
//! A [`Record`] belongs to one collection, carries a string-keyed property
//! map and tracks which properties changed since the last successful save.
//! Status changes that only the data store may perform (`Saving`, `Saved`,
//! `Deleted`) are crate-private.
//!
//! Once a record is `Deleted`, every operation that changes it or sends it
//! fails with [`CoreError::StaleRecord`]. Reads keep returning the last
//! known values so callers can still inspect what was deleted.

mod status;

pub use status::RecordStatus;

use crate::error::{CoreError, CoreResult};
use crate::file::{FileManager, FileRef, FileStatus};
use crate::permissions::{PermissionChanges, PUBLIC};
use crate::relation::Relation;
use crate::value::PropertyValue;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Property holding the record identifier on the wire.
pub const ID_PROPERTY: &str = "sysObjectId";
/// Property holding the collection name on the wire.
pub const COLLECTION_PROPERTY: &str = "sysCollection";
/// Property holding a user's name.
pub const USERNAME_PROPERTY: &str = "sysUsername";
/// Collection that stores users.
pub const USERS_COLLECTION: &str = "users";

/// Returns true if `property` is managed by the backend for `collection`.
pub fn is_read_only(collection: &str, property: &str) -> bool {
    property == ID_PROPERTY
        || property == COLLECTION_PROPERTY
        || (collection == USERS_COLLECTION && property == USERNAME_PROPERTY)
}

/// A remote document.
///
/// # Example
///
/// ```
/// use cirrus_core::{Record, RecordStatus};
///
/// let mut note = Record::new("notes");
/// note.set("title", "groceries")?;
/// assert_eq!(note.status(), RecordStatus::New);
/// assert_eq!(note.get("title").and_then(|v| v.as_str()), Some("groceries"));
/// assert!(note.set("sysObjectId", "x").is_err());
/// # Ok::<(), cirrus_core::CoreError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    collection: String,
    id: Option<String>,
    properties: BTreeMap<String, PropertyValue>,
    dirty: BTreeSet<String>,
    status: RecordStatus,
    permissions: PermissionChanges,
}

impl Record {
    /// Creates an empty, unsaved record.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: None,
            properties: BTreeMap::new(),
            dirty: BTreeSet::new(),
            status: RecordStatus::New,
            permissions: PermissionChanges::new(),
        }
    }

    /// Creates an unsaved record with initial properties, all marked dirty.
    pub fn with_properties<I, K, V>(collection: impl Into<String>, properties: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        let mut record = Self::new(collection);
        for (key, value) in properties {
            record.set(key, value)?;
        }
        Ok(record)
    }

    /// Returns the collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the identifier assigned by the backend.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the lifecycle status.
    pub fn status(&self) -> RecordStatus {
        self.status
    }

    /// Returns a property value.
    ///
    /// Reads work on deleted records too.
    pub fn get(&self, property: &str) -> Option<&PropertyValue> {
        self.properties.get(property)
    }

    /// Returns a file property.
    pub fn file(&self, property: &str) -> Option<&FileRef> {
        self.get(property).and_then(PropertyValue::as_file)
    }

    /// Returns a relation property.
    pub fn relation(&self, property: &str) -> Option<&Relation> {
        self.get(property).and_then(PropertyValue::as_relation)
    }

    /// Returns a relation property for editing and marks it dirty.
    ///
    /// A `Saved` record becomes `Modified`.
    pub fn relation_mut(&mut self, property: &str) -> CoreResult<&mut Relation> {
        self.ensure_live()?;
        if self.relation(property).is_none() {
            return Err(CoreError::NotARelation {
                property: property.to_string(),
            });
        }
        self.mark_dirty(property.to_string());
        self.properties
            .get_mut(property)
            .and_then(PropertyValue::as_relation_mut)
            .ok_or_else(|| CoreError::NotARelation {
                property: property.to_string(),
            })
    }

    /// Iterates over all properties in name order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns true if the property changed since the last save.
    pub fn is_dirty(&self, property: &str) -> bool {
        self.dirty.contains(property)
    }

    /// Iterates over the properties changed since the last save.
    pub fn dirty_properties(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Sets a property and marks it dirty.
    ///
    /// A `Saved` record becomes `Modified`. Replacing a relation with
    /// another relation, or with `null`, keeps track of what the old one
    /// held, so the next save removes it on the server.
    pub fn set(&mut self, property: impl Into<String>, value: impl Into<PropertyValue>) -> CoreResult<()> {
        self.ensure_live()?;
        let property = property.into();
        if is_read_only(&self.collection, &property) {
            return Err(CoreError::ReadOnlyProperty { property });
        }

        let mut value = value.into();
        if let Some(previous) = self.relation(&property) {
            value = match value {
                PropertyValue::Relation(mut relation) => {
                    relation.inherit(previous);
                    PropertyValue::Relation(relation)
                }
                PropertyValue::Json(Value::Null) => {
                    let mut relation = Relation::empty(previous.kind());
                    relation.inherit(previous);
                    PropertyValue::Relation(relation)
                }
                other => other,
            };
        }

        self.properties.insert(property.clone(), value);
        self.mark_dirty(property);
        Ok(())
    }

    fn mark_dirty(&mut self, property: String) {
        self.dirty.insert(property);
        if self.status == RecordStatus::Saved {
            self.status = RecordStatus::Modified;
        }
    }

    /// Returns the body for the next save.
    ///
    /// Without an identifier this is every property; with one it is only
    /// the dirty properties. Relations are sent as the changes since the
    /// last save, and fail with [`CoreError::UnsavedRelated`] while they
    /// hold records without an identifier.
    pub fn serialize_for_save(&self) -> CoreResult<Map<String, Value>> {
        self.ensure_live()?;
        if let Some(property) = self.unsaved_related() {
            return Err(CoreError::UnsavedRelated {
                property: property.to_string(),
            });
        }
        let body = self
            .outgoing()
            .map(|(key, value)| (key.clone(), value.to_wire()))
            .collect();
        Ok(body)
    }

    /// Properties the next save sends.
    fn outgoing(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.properties
            .iter()
            .filter(move |(key, _)| self.id.is_none() || self.dirty.contains(key.as_str()))
    }

    /// Returns the full record as JSON, including its identifier and file URLs.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(id) = &self.id {
            map.insert(ID_PROPERTY.to_string(), Value::String(id.clone()));
        }
        for (key, value) in &self.properties {
            let value = match value {
                PropertyValue::Json(value) => value.clone(),
                PropertyValue::File(file) => file.to_json(),
                PropertyValue::Relation(relation) => relation.to_json(),
            };
            map.insert(key.clone(), value);
        }
        Value::Object(map)
    }

    /// Queues a grant of `permissions` to `usernames`, sent on the next save.
    pub fn grant<U, P>(&mut self, usernames: U, permissions: P) -> CoreResult<()>
    where
        U: IntoIterator,
        U::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        self.ensure_live()?;
        self.permissions.grant(usernames, permissions);
        Ok(())
    }

    /// Queues a revoke of `permissions` from `usernames`, sent on the next save.
    pub fn revoke<U, P>(&mut self, usernames: U, permissions: P) -> CoreResult<()>
    where
        U: IntoIterator,
        U::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        self.ensure_live()?;
        self.permissions.revoke(usernames, permissions);
        Ok(())
    }

    /// Queues a grant to everyone.
    pub fn grant_public<P>(&mut self, permissions: P) -> CoreResult<()>
    where
        P: IntoIterator,
        P::Item: Into<String>,
    {
        self.grant([PUBLIC], permissions)
    }

    /// Queues a revoke from everyone.
    pub fn revoke_public<P>(&mut self, permissions: P) -> CoreResult<()>
    where
        P: IntoIterator,
        P::Item: Into<String>,
    {
        self.revoke([PUBLIC], permissions)
    }

    /// Returns the pending permission changes.
    pub fn permissions(&self) -> &PermissionChanges {
        &self.permissions
    }

    fn ensure_live(&self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::StaleRecord {
                collection: self.collection.clone(),
            });
        }
        Ok(())
    }

    /// Hydrates a saved record from a server object.
    pub(crate) fn from_server(
        collection: &str,
        value: &Value,
        files: &FileManager,
    ) -> CoreResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            CoreError::unexpected_response(format!("expected a {} object, got {}", collection, value))
        })?;
        let id = object
            .get(ID_PROPERTY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CoreError::unexpected_response(format!("{} object without {}", collection, ID_PROPERTY))
            })?
            .to_string();

        let mut properties = BTreeMap::new();
        for (key, value) in object {
            if key == ID_PROPERTY || key == COLLECTION_PROPERTY {
                continue;
            }
            let value = match FileRef::wire_filename(value) {
                Some(filename) => {
                    let url = files.url_for(collection, &id, key, filename);
                    PropertyValue::File(FileRef::saved(filename, url))
                }
                None => match Relation::from_wire(value, files)? {
                    Some(relation) => PropertyValue::Relation(relation),
                    None => PropertyValue::Json(value.clone()),
                },
            };
            properties.insert(key.clone(), value);
        }

        Ok(Self {
            collection: collection.to_string(),
            id: Some(id),
            properties,
            dirty: BTreeSet::new(),
            status: RecordStatus::Saved,
            permissions: PermissionChanges::new(),
        })
    }

    /// Enters `Saving` and returns the status to restore on failure.
    pub(crate) fn begin_save(&mut self) -> CoreResult<RecordStatus> {
        self.ensure_live()?;
        let previous = match self.status {
            // A save whose future was dropped mid-flight.
            RecordStatus::Saving if self.id.is_some() => RecordStatus::Modified,
            RecordStatus::Saving => RecordStatus::New,
            status => status,
        };
        self.status = RecordStatus::Saving;
        Ok(previous)
    }

    pub(crate) fn revert_save(&mut self, previous: RecordStatus) {
        self.status = previous;
    }

    /// Completes a save: assigns the identifier of a new record, clears the
    /// dirty set and enters `Saved`.
    pub(crate) fn apply_server_response(&mut self, response: &Value) -> CoreResult<()> {
        if self.id.is_none() {
            let id = response
                .get(ID_PROPERTY)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    CoreError::unexpected_response(format!(
                        "create response for {} without {}",
                        self.collection, ID_PROPERTY
                    ))
                })?;
            self.id = Some(id.to_string());
        }
        for relation in self
            .properties
            .values_mut()
            .filter_map(PropertyValue::as_relation_mut)
        {
            relation.commit();
        }
        self.dirty.clear();
        self.status = RecordStatus::Saved;
        Ok(())
    }

    /// Replaces all state with a freshly fetched copy, keeping pending
    /// permission changes.
    pub(crate) fn replace_with(&mut self, fresh: Record) {
        let permissions = std::mem::take(&mut self.permissions);
        *self = Self {
            permissions,
            ..fresh
        };
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.id = None;
        self.dirty.clear();
        self.status = RecordStatus::Deleted;
    }

    /// Names of file properties that still need uploading.
    pub(crate) fn unsaved_files(&self) -> Vec<String> {
        self.properties
            .iter()
            .filter(|(_, value)| {
                value
                    .as_file()
                    .map_or(false, |file| file.status() != FileStatus::Saved)
            })
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// First outgoing relation property holding an unsaved record.
    pub(crate) fn unsaved_related(&self) -> Option<&str> {
        self.outgoing()
            .find(|(_, value)| value.as_relation().map_or(false, Relation::has_unsaved))
            .map(|(key, _)| key.as_str())
    }

    /// Records held in full by this record's relations.
    pub(crate) fn related_records_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.properties
            .values_mut()
            .filter_map(PropertyValue::as_relation_mut)
            .flat_map(|relation| relation.records_mut())
    }

    pub(crate) fn file_mut(&mut self, property: &str) -> Option<&mut FileRef> {
        self.properties
            .get_mut(property)
            .and_then(PropertyValue::as_file_mut)
    }

    pub(crate) fn permissions_mut(&mut self) -> &mut PermissionChanges {
        &mut self.permissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_transport::{MemorySession, Transport, TransportConfig};
    use serde_json::json;
    use std::sync::Arc;

    fn files() -> FileManager {
        let transport = Transport::new(
            TransportConfig::new("k").with_base_url("http://h/v1"),
            Arc::new(cirrus_testkit::MockBackend::new()),
            Arc::new(MemorySession::new()),
        );
        FileManager::new(transport)
    }

    fn saved(value: Value) -> Record {
        Record::from_server("notes", &value, &files()).unwrap()
    }

    #[test]
    fn new_record_serializes_everything() {
        let record =
            Record::with_properties("notes", [("title", json!("a")), ("n", json!(1))]).unwrap();
        assert_eq!(record.status(), RecordStatus::New);
        assert_eq!(record.id(), None);
        assert_eq!(record.dirty_properties().collect::<Vec<_>>(), vec!["n", "title"]);
        assert_eq!(
            Value::Object(record.serialize_for_save().unwrap()),
            json!({"title": "a", "n": 1})
        );
    }

    #[test]
    fn hydrated_record_has_no_diff() {
        let record = saved(json!({"sysObjectId": "n1", "title": "a", "tags": ["x"]}));
        assert_eq!(record.status(), RecordStatus::Saved);
        assert_eq!(record.id(), Some("n1"));
        assert_eq!(record.dirty_properties().count(), 0);
        assert!(record.serialize_for_save().unwrap().is_empty());
        assert!(record.get(ID_PROPERTY).is_none());
    }

    #[test]
    fn set_moves_saved_to_modified_and_serializes_partially() {
        let mut record = saved(json!({"sysObjectId": "n1", "title": "a"}));
        record.set("content", "b").unwrap();
        assert_eq!(record.status(), RecordStatus::Modified);
        assert!(record.is_dirty("content"));
        assert!(!record.is_dirty("title"));
        assert_eq!(
            Value::Object(record.serialize_for_save().unwrap()),
            json!({"content": "b"})
        );
    }

    #[test]
    fn reserved_properties_are_read_only() {
        let mut record = Record::new("notes");
        assert!(matches!(
            record.set(ID_PROPERTY, "x"),
            Err(CoreError::ReadOnlyProperty { .. })
        ));
        assert!(record.set(COLLECTION_PROPERTY, "x").is_err());
        assert!(record.set(USERNAME_PROPERTY, "x").is_ok());

        let mut user = Record::new(USERS_COLLECTION);
        assert!(user.set(USERNAME_PROPERTY, "x").is_err());
        assert!(user.set("email", "x").is_ok());
    }

    #[test]
    fn apply_server_response_assigns_id() {
        let mut record = Record::with_properties("notes", [("title", "a")]).unwrap();
        let previous = record.begin_save().unwrap();
        assert_eq!(previous, RecordStatus::New);
        assert_eq!(record.status(), RecordStatus::Saving);

        record
            .apply_server_response(&json!({"sysObjectId": "n1"}))
            .unwrap();
        assert_eq!(record.id(), Some("n1"));
        assert_eq!(record.status(), RecordStatus::Saved);
        assert_eq!(record.dirty_properties().count(), 0);
    }

    #[test]
    fn create_response_without_id_is_rejected() {
        let mut record = Record::new("notes");
        record.begin_save().unwrap();
        let err = record.apply_server_response(&json!({})).unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedResponse { .. }));
        assert_eq!(record.id(), None);
    }

    #[test]
    fn revert_restores_previous_status() {
        let mut record = saved(json!({"sysObjectId": "n1"}));
        record.set("a", 1i64).unwrap();
        let previous = record.begin_save().unwrap();
        record.revert_save(previous);
        assert_eq!(record.status(), RecordStatus::Modified);
        assert!(record.is_dirty("a"));
    }

    #[test]
    fn interrupted_save_can_be_restarted() {
        let mut record = Record::new("notes");
        record.begin_save().unwrap();
        assert_eq!(record.begin_save().unwrap(), RecordStatus::New);
    }

    #[test]
    fn deleted_records_are_stale() {
        let mut record = saved(json!({"sysObjectId": "n1"}));
        record.mark_deleted();
        assert_eq!(record.status(), RecordStatus::Deleted);
        assert_eq!(record.id(), None);
        assert!(matches!(
            record.set("a", 1i64),
            Err(CoreError::StaleRecord { .. })
        ));
        assert!(record.serialize_for_save().is_err());
        assert!(record.begin_save().is_err());
        assert!(record.grant_public(["read"]).is_err());
    }

    #[test]
    fn deleted_records_stay_readable() {
        let mut record = saved(json!({"sysObjectId": "n1", "title": "a"}));
        record.mark_deleted();
        assert_eq!(record.get("title").unwrap(), "a");
        assert_eq!(record.properties().count(), 1);
        assert!(matches!(
            record.relation_mut("title"),
            Err(CoreError::StaleRecord { .. })
        ));
    }

    #[test]
    fn relation_properties_are_hydrated() {
        let record = saved(json!({
            "sysObjectId": "i1",
            "customer": {"sysDatatype": "relation", "sysRelationType": "single", "sysObjects": ["c1"]}
        }));
        let customer = record.relation("customer").unwrap();
        assert_eq!(customer.id(), Some("c1"));
        assert!(record.get("customer").unwrap().as_json().is_none());
        assert_eq!(record.to_json(), json!({"sysObjectId": "i1", "customer": "c1"}));
        assert!(record.serialize_for_save().unwrap().is_empty());
    }

    #[test]
    fn clearing_a_relation_removes_its_items() {
        let mut record = saved(json!({
            "sysObjectId": "i1",
            "customer": {"sysDatatype": "relation", "sysRelationType": "single", "sysObjects": ["c1"]}
        }));
        record.set("customer", Value::Null).unwrap();
        assert_eq!(record.status(), RecordStatus::Modified);
        assert_eq!(
            Value::Object(record.serialize_for_save().unwrap()),
            json!({"customer": {"sysRelationChanges": {"additions": [], "removals": ["c1"]}}})
        );

        record.set("customer", Relation::single("c2")).unwrap();
        assert_eq!(
            record.serialize_for_save().unwrap()["customer"],
            json!({"sysRelationChanges": {"additions": ["c2"], "removals": ["c1"]}})
        );
    }

    #[test]
    fn relation_edits_mark_the_record_modified() {
        let mut record = saved(json!({
            "sysObjectId": "b1",
            "title": "Zen",
            "posts": {"sysDatatype": "relation", "sysRelationType": "array", "sysObjects": ["p1", "p2"]}
        }));
        record.relation_mut("posts").unwrap().remove(0);
        assert_eq!(record.status(), RecordStatus::Modified);
        assert!(record.is_dirty("posts"));
        assert!(matches!(
            record.relation_mut("title"),
            Err(CoreError::NotARelation { .. })
        ));

        let previous = record.begin_save().unwrap();
        assert_eq!(previous, RecordStatus::Modified);
        record.apply_server_response(&Value::Null).unwrap();
        assert!(record.relation("posts").unwrap().removals().is_empty());
    }

    #[test]
    fn unsaved_related_records_block_serialization() {
        let mut invoice = Record::new("invoices");
        invoice.set("amount", 149i64).unwrap();
        invoice.set("customer", Record::new("customers")).unwrap();
        assert_eq!(invoice.unsaved_related(), Some("customer"));
        assert!(matches!(
            invoice.serialize_for_save(),
            Err(CoreError::UnsavedRelated { property }) if property == "customer"
        ));
        assert_eq!(invoice.related_records_mut().count(), 1);
    }

    #[test]
    fn file_properties_are_hydrated() {
        let record = saved(json!({
            "sysObjectId": "n1",
            "photo": {"sysDatatype": "file", "filename": "cat.png"}
        }));
        let file = record.file("photo").unwrap();
        assert_eq!(file.status(), FileStatus::Saved);
        assert_eq!(file.url(), Some("http://h/v1/files/notes/n1/photo/cat.png"));
        assert!(record.unsaved_files().is_empty());
    }

    #[test]
    fn unsaved_files_are_listed() {
        let mut record = Record::new("notes");
        record
            .set("photo", FileRef::from_bytes("a.png", vec![1u8]))
            .unwrap();
        record.set("title", "x").unwrap();
        assert_eq!(record.unsaved_files(), vec!["photo".to_string()]);
        assert_eq!(
            record.serialize_for_save().unwrap()["photo"],
            json!({"sysDatatype": "file", "filename": "a.png"})
        );
    }

    #[test]
    fn from_server_requires_identifier() {
        let err = Record::from_server("notes", &json!({"title": "a"}), &files()).unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedResponse { .. }));
        let err = Record::from_server("notes", &json!([1]), &files()).unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedResponse { .. }));
    }

    #[test]
    fn replace_keeps_pending_permissions() {
        let mut record = saved(json!({"sysObjectId": "n1", "title": "old"}));
        record.set("title", "local").unwrap();
        record.grant(["bob"], ["read"]).unwrap();

        record.replace_with(saved(json!({"sysObjectId": "n1", "title": "server"})));
        assert_eq!(record.get("title").unwrap(), &json!("server"));
        assert_eq!(record.status(), RecordStatus::Saved);
        assert!(!record.permissions().is_empty());
    }

    #[test]
    fn to_json_includes_identifier() {
        let record = saved(json!({"sysObjectId": "n1", "title": "a"}));
        assert_eq!(record.to_json(), json!({"sysObjectId": "n1", "title": "a"}));
    }
}
