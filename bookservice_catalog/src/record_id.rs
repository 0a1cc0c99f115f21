use std::fmt;
use std::str::FromStr;

use bson::oid::ObjectId;
use paperclip::v2::models::DataType;
use paperclip::v2::schema::TypedData;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a book or of a review embedded in a book.
///
/// Hex form of an `ObjectId`: 24 lowercase hex characters.
/// Review ids are generated the same way as book ids, so they are unique in the whole collection
/// and can be looked up without knowing the book they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid record id")]
pub struct RecordIdParseError(String);

impl RecordId {
    pub fn generate() -> Self {
        Self(ObjectId::new().to_hex())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RecordId {
    type Err = RecordIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
            .map(|object_id| Self(object_id.to_hex()))
            .map_err(|_| RecordIdParseError(s.to_string()))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl TypedData for RecordId {
    fn data_type() -> DataType {
        DataType::String
    }
}

#[cfg(test)]
mod record_id_tests {
    use std::collections::HashSet;

    use crate::record_id::{RecordId, RecordIdParseError};

    #[test]
    fn generated_ids_are_unique_and_parse_back() {
        let ids: Vec<RecordId> = (0..1000).map(|_| RecordId::generate()).collect();

        let unique: HashSet<&RecordId> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());

        for id in &ids {
            assert_eq!(id.as_str().len(), 24);
            assert_eq!(id.as_str().parse::<RecordId>().as_ref(), Ok(id));
        }
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for raw in ["", "123", "zzzzzzzzzzzzzzzzzzzzzzzz", "64b7f1c2e4b0a1b2c3d4e5f67"] {
            assert_eq!(
                raw.parse::<RecordId>(),
                Err(RecordIdParseError(raw.to_string()))
            );
        }
    }

    #[test]
    fn uppercase_ids_are_normalised() {
        let id: RecordId = "64B7F1C2E4B0A1B2C3D4E5F6".parse().unwrap();
        assert_eq!(id.to_string(), "64b7f1c2e4b0a1b2c3d4e5f6");
    }

    #[test]
    fn deserialization_validates_format() {
        let id: RecordId = serde_json::from_str("\"64b7f1c2e4b0a1b2c3d4e5f6\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"64b7f1c2e4b0a1b2c3d4e5f6\"");

        assert!(serde_json::from_str::<RecordId>("\"not-an-id\"").is_err());
    }
}
