use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Policy status as written in the store. Values other than the three the
/// desk writes are kept verbatim, blank included.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PolicyStatus {
    #[default]
    Active,
    Renewed,
    Cancelled,
    Other(String),
}

impl PolicyStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "Active",
            Self::Renewed => "Renewed",
            Self::Cancelled => "Cancelled",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for PolicyStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Active" => Self::Active,
            "Renewed" => Self::Renewed,
            "Cancelled" => Self::Cancelled,
            _ => Self::Other(raw),
        }
    }
}

impl From<PolicyStatus> for String {
    fn from(status: PolicyStatus) -> Self {
        match status {
            PolicyStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// One policy entry of the backing store.
///
/// Fields the desk does not model are kept in `extra` so a rewrite of the
/// store never drops them. `null` in a modelled field reads as its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub policy_number: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub postcode: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dob: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: PolicyStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cover_details: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PolicyRecord {
    pub fn new(
        policy_number: impl Into<String>,
        full_name: impl Into<String>,
        postcode: impl Into<String>,
        dob: impl Into<String>,
    ) -> Self {
        Self {
            policy_number: policy_number.into(),
            full_name: full_name.into(),
            postcode: postcode.into(),
            dob: dob.into(),
            status: PolicyStatus::Active,
            cover_details: Map::new(),
            extra: Map::new(),
        }
    }

    pub fn with_cover(mut self, key: impl Into<String>, limit: u64) -> Self {
        self.cover_details.insert(key.into(), Value::from(limit));
        self
    }

    /// Cover keys in file order.
    pub fn cover_keys(&self) -> Vec<String> {
        self.cover_details.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{PolicyRecord, PolicyStatus};
    use serde_json::json;

    #[test]
    fn missing_fields_default_to_blank_and_active() {
        let record: PolicyRecord =
            serde_json::from_value(json!({"policy_number": "H-1"})).expect("decode");
        assert_eq!(record.full_name, "");
        assert_eq!(record.status, PolicyStatus::Active);
        assert!(record.cover_details.is_empty());
    }

    #[test]
    fn unknown_fields_round_trip() {
        let raw = json!({
            "policy_number": "H-1",
            "full_name": "Jane Doe",
            "postcode": "OX1 2JD",
            "dob": "1980-01-01",
            "status": "Renewed",
            "cover_details": {"building_cover": 250000, "excess": 99.5},
            "annual_premium": 312.4,
            "address": {"line1": "1 High St"}
        });
        let record: PolicyRecord = serde_json::from_value(raw.clone()).expect("decode");
        assert_eq!(record.status, PolicyStatus::Renewed);
        assert_eq!(serde_json::to_value(&record).expect("encode"), raw);
    }

    #[test]
    fn unrecognised_status_is_kept_verbatim() {
        let lapsed: PolicyRecord =
            serde_json::from_value(json!({"status": "Lapsed"})).expect("decode");
        assert_eq!(lapsed.status, PolicyStatus::Other("Lapsed".to_string()));
        assert_eq!(lapsed.status.as_str(), "Lapsed");

        let blank: PolicyRecord = serde_json::from_value(json!({"status": ""})).expect("decode");
        assert_eq!(
            serde_json::to_value(&blank).expect("encode")["status"],
            ""
        );
    }

    #[test]
    fn null_fields_read_as_defaults() {
        let record: PolicyRecord = serde_json::from_value(json!({
            "policy_number": "H-1",
            "full_name": null,
            "status": null,
            "cover_details": null
        }))
        .expect("decode");
        assert_eq!(record.full_name, "");
        assert_eq!(record.status, PolicyStatus::Active);
        assert!(record.cover_details.is_empty());
    }

    #[test]
    fn cover_keys_keep_file_order() {
        let record: PolicyRecord = serde_json::from_value(json!({
            "cover_details": {"contents_cover": 1, "building_cover": 2, "accidental": 3}
        }))
        .expect("decode");
        assert_eq!(
            record.cover_keys(),
            vec!["contents_cover", "building_cover", "accidental"]
        );
    }
}
