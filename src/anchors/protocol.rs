//! Anchor HTTP Protocol
//!
//! Route paths and query-string DTOs for the public anchor API.

use serde::Deserialize;

// --- API Endpoints ---

/// `POST` raw key text to allocate a number.
pub const ENDPOINT_ANCHORS: &str = "/api/anchors";
/// `GET` a key by its anchor number.
pub const ENDPOINT_ANCHOR_BY_NUMBER: &str = "/api/anchors/:anchor_number";
pub const ENDPOINT_LAST: &str = "/api/anchors/last";
pub const ENDPOINT_ALL: &str = "/api/anchors/all";
pub const ENDPOINT_ALL_AS_STRING: &str = "/api/anchors/all_as_string";
pub const ENDPOINT_DELETE_ALL: &str = "/api/anchors/delete_all";
/// `GET` with `?anchorKey=`.
pub const ENDPOINT_DELETE: &str = "/api/anchors/delete";
/// `POST` with `?anchorKey=`.
pub const ENDPOINT_KEY: &str = "/api/anchors/key";
/// `POST` with `?anchorKey=&objectName=`.
pub const ENDPOINT_REGISTERED_KEY: &str = "/api/anchors/registered_key";
pub const ENDPOINT_HEALTH: &str = "/health";

// --- Query Parameters ---

#[derive(Debug, Deserialize)]
pub struct AnchorKeyParams {
    #[serde(rename = "anchorKey", default)]
    pub anchor_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisteredKeyParams {
    #[serde(rename = "anchorKey", default)]
    pub anchor_key: String,
    #[serde(rename = "objectName")]
    pub object_name: Option<String>,
}
