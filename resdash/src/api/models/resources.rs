//! API response models for resource records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use utoipa::ToSchema;

/// Column the dashboard uses as a record's display name.
pub const NAME_FIELD: &str = "Name";
pub const RESOURCE_GROUP_FIELD: &str = "Resource_Group";
pub const SUBSCRIPTION_FIELD: &str = "Subscription";
pub const LOCATION_FIELD: &str = "Location";

/// One row of the `resources` table.
///
/// The schema belongs to the database, so a record is carried as an ordered JSON
/// object and serialized transparently. The accessors cover the columns the
/// dashboard renders; any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object, example = json!({"Name": "Alice", "Resource_Group": "rg-alice", "Subscription": "sub-1", "Location": "westeurope"}))]
pub struct Resource(pub Map<String, Value>);

impl Resource {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The record's `Name`, if it is a non-empty string. Search and portal links key on this.
    pub fn name(&self) -> Option<&str> {
        self.0.get(NAME_FIELD).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    pub fn resource_group(&self) -> Option<Cow<'_, str>> {
        self.display(RESOURCE_GROUP_FIELD)
    }

    pub fn subscription(&self) -> Option<Cow<'_, str>> {
        self.display(SUBSCRIPTION_FIELD)
    }

    pub fn location(&self) -> Option<Cow<'_, str>> {
        self.display(LOCATION_FIELD)
    }

    /// A column as text. Numbers and booleans are printed; null, empty strings and
    /// nested values read as missing.
    pub fn display(&self, field: &str) -> Option<Cow<'_, str>> {
        match self.0.get(field)? {
            Value::String(s) if !s.is_empty() => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Resource {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_serializes_as_plain_object() {
        let value = json!({"Name": "Alice", "Location": "westeurope", "id": 7});
        let resource: Resource = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(resource.name(), Some("Alice"));
        assert_eq!(resource.location().as_deref(), Some("westeurope"));
        assert_eq!(resource.subscription(), None);
        assert_eq!(serde_json::to_value(&resource).unwrap(), value);
    }

    #[test]
    fn test_null_and_empty_fields_read_as_missing() {
        let resource: Resource = serde_json::from_value(json!({"Name": null, "Resource_Group": ""})).unwrap();
        assert_eq!(resource.name(), None);
        assert_eq!(resource.resource_group(), None);
    }

    #[test]
    fn test_scalar_fields_display_as_text() {
        let resource: Resource =
            serde_json::from_value(json!({"Name": 42, "Location": 7, "Subscription": true, "Resource_Group": ["a"]})).unwrap();

        assert_eq!(resource.location().as_deref(), Some("7"));
        assert_eq!(resource.subscription().as_deref(), Some("true"));
        assert_eq!(resource.display(NAME_FIELD).as_deref(), Some("42"));
        assert_eq!(resource.resource_group(), None);
        // Only string names take part in search and link lookup
        assert_eq!(resource.name(), None);
    }
}
