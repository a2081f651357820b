//! Record property values.

use crate::file::FileRef;
use crate::record::Record;
use crate::relation::Relation;
use serde_json::Value;

/// Value of one record property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Any JSON value.
    Json(Value),
    /// A file attachment.
    File(FileRef),
    /// Links to records of another collection.
    Relation(Relation),
}

impl PropertyValue {
    /// Returns the JSON value, if this is not a file.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            PropertyValue::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the string, if this is a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Value::as_str)
    }

    /// Returns the file, if this is a file.
    pub fn as_file(&self) -> Option<&FileRef> {
        match self {
            PropertyValue::File(file) => Some(file),
            _ => None,
        }
    }

    /// Returns the relation, if this is a relation.
    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            PropertyValue::Relation(relation) => Some(relation),
            _ => None,
        }
    }

    pub(crate) fn as_file_mut(&mut self) -> Option<&mut FileRef> {
        match self {
            PropertyValue::File(file) => Some(file),
            _ => None,
        }
    }

    pub(crate) fn as_relation_mut(&mut self) -> Option<&mut Relation> {
        match self {
            PropertyValue::Relation(relation) => Some(relation),
            _ => None,
        }
    }

    /// Wire form sent in record bodies.
    pub(crate) fn to_wire(&self) -> Value {
        match self {
            PropertyValue::Json(value) => value.clone(),
            PropertyValue::File(file) => file.to_wire(),
            PropertyValue::Relation(relation) => relation.to_wire(),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        PropertyValue::Json(value)
    }
}

impl From<FileRef> for PropertyValue {
    fn from(file: FileRef) -> Self {
        PropertyValue::File(file)
    }
}

impl From<Relation> for PropertyValue {
    fn from(relation: Relation) -> Self {
        PropertyValue::Relation(relation)
    }
}

/// A record becomes a single relation to it.
impl From<Record> for PropertyValue {
    fn from(record: Record) -> Self {
        PropertyValue::Relation(Relation::single(record))
    }
}

/// Records become an array relation to them.
impl From<Vec<Record>> for PropertyValue {
    fn from(records: Vec<Record>) -> Self {
        PropertyValue::Relation(Relation::array(records))
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Json(Value::String(value.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Json(Value::String(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Json(Value::Bool(value))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Json(Value::from(value))
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Json(Value::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Json(Value::from(value))
    }
}

impl PartialEq<Value> for PropertyValue {
    fn eq(&self, other: &Value) -> bool {
        self.as_json() == Some(other)
    }
}

impl PartialEq<str> for PropertyValue {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for PropertyValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversions() {
        assert_eq!(PropertyValue::from("a"), json!("a"));
        assert_eq!(PropertyValue::from(3i64), json!(3));
        assert_eq!(PropertyValue::from(true), json!(true));
        assert_eq!(PropertyValue::from(json!({"x": [1]})), json!({"x": [1]}));
        assert_eq!(PropertyValue::from("red"), "red");
    }

    #[test]
    fn file_values() {
        let value = PropertyValue::from(FileRef::from_bytes("a.png", vec![1u8]));
        assert!(value.as_json().is_none());
        assert_eq!(value.as_file().map(FileRef::filename), Some("a.png"));
        assert_eq!(
            value.to_wire(),
            json!({"sysDatatype": "file", "filename": "a.png"})
        );
    }

    #[test]
    fn records_become_relations() {
        let single = PropertyValue::from(Record::new("customers"));
        let relation = single.as_relation().unwrap();
        assert_eq!(relation.kind(), crate::RelationKind::Single);
        assert!(relation.has_unsaved());

        let array = PropertyValue::from(vec![Record::new("posts"), Record::new("posts")]);
        assert_eq!(array.as_relation().map(Relation::len), Some(2));
        assert!(array.as_json().is_none());
    }
}
