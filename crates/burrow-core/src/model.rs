use crate::shortcode::ShortCode;
use serde::{Deserialize, Serialize};

/// A stored URL mapping.
///
/// Records are never physically removed; deletion only flips `deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Monotonically increasing id assigned at insertion.
    #[serde(rename = "uuid")]
    pub sequence_id: i64,
    #[serde(rename = "short_url")]
    pub short_code: ShortCode,
    pub original_url: String,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    #[serde(rename = "is_deleted")]
    pub deleted: bool,
}

impl UrlRecord {
    /// Returns `true` if the record can still be used for redirects.
    pub fn is_live(&self) -> bool {
        !self.deleted
    }

    /// Returns `true` if the record belongs to `owner_id`.
    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

/// Parameters for [`Store::add_value`](crate::Store::add_value).
#[derive(Debug, Clone)]
pub struct AddValue {
    /// The URL being shortened. Must not be empty.
    pub original_url: String,
    /// Prefix used to build the returned short URL.
    pub base_url: String,
    /// Freshly generated code for the new record.
    pub short_code: ShortCode,
    /// Opaque identity of the client creating the record.
    pub owner_id: String,
}

/// A URL owned by a client, as listed by
/// [`Store::get_user_urls`](crate::Store::get_user_urls).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUrl {
    pub short_url: String,
    pub original_url: String,
}

/// A client's request to soft-delete some of its short codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    pub owner_id: String,
    pub short_codes: Vec<ShortCode>,
}

impl DeletionRequest {
    pub fn new(owner_id: impl Into<String>, short_codes: Vec<ShortCode>) -> Self {
        Self {
            owner_id: owner_id.into(),
            short_codes,
        }
    }

    /// Iterates over every `(owner_id, short_code)` pair of the request.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &ShortCode)> {
        self.short_codes
            .iter()
            .map(move |code| (self.owner_id.as_str(), code))
    }
}

/// Administrative counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalStats {
    /// Total number of records, soft-deleted ones included.
    pub urls: u64,
    /// Number of distinct owners.
    pub users: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_file_line_field_names() {
        let record = UrlRecord {
            sequence_id: 7,
            short_code: ShortCode::new_unchecked("abc123"),
            original_url: "https://example.com".to_string(),
            owner_id: "u1".to_string(),
            deleted: false,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "uuid": 7,
                "short_url": "abc123",
                "original_url": "https://example.com",
                "user_id": "u1",
                "is_deleted": false,
            })
        );
    }

    #[test]
    fn deletion_request_pairs() {
        let request = DeletionRequest::new(
            "u1",
            vec![ShortCode::new_unchecked("a"), ShortCode::new_unchecked("b")],
        );

        let pairs: Vec<_> = request
            .pairs()
            .map(|(owner, code)| (owner.to_string(), code.to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("u1".to_string(), "a".to_string()),
                ("u1".to_string(), "b".to_string()),
            ]
        );
    }
}
