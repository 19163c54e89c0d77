//! Data types exchanged with the creditdb server

use serde::{Deserialize, Deserializer, Serialize};

/// Payload status the server reports for a successful page listing
pub const STATUS_OK: &str = "OK";

/// A single key/value record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// The key
    pub key: String,
    /// The stored value
    pub value: String,
}

impl Line {
    /// Create a record from anything string-like
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Response from a get-all request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Payload-level status, `"OK"` on success
    #[serde(default)]
    pub status: String,
    /// Page the entries were read from
    #[serde(rename = "pagenumber", default)]
    pub page_number: u64,
    /// Records on the page, in server order
    #[serde(rename = "result", default, deserialize_with = "null_as_empty")]
    pub entries: Vec<Line>,
}

impl Page {
    /// Returns true if the payload status is `"OK"`
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Line>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Line>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of a set request
#[derive(Debug, Serialize)]
pub(crate) struct SetRequest<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub page: u64,
}

/// Body of a get request
#[derive(Debug, Serialize)]
pub(crate) struct GetRequest<'a> {
    pub key: &'a str,
    pub page: u64,
}

/// Body of a delete request
#[derive(Debug, Serialize)]
pub(crate) struct DeleteRequest<'a> {
    pub page: u64,
    pub key: &'a str,
}

/// Body of get-all and flush requests
#[derive(Debug, Serialize)]
pub(crate) struct PageRequest {
    pub page: u64,
}
