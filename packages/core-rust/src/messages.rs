//! Request and response bodies for the three key-value operations.
//!
//! Bodies are encoded as named `MsgPack` maps (`rmp_serde::to_vec_named()`)
//! with camelCase field names. Keys and values travel as `MsgPack` binary.
//! An absent `error` field means the operation ran without an internal
//! fault; "not found" is reported through `found` / `success`, never here.

use serde::{Deserialize, Serialize};

/// Content type of every request and response body.
pub const CONTENT_TYPE: &str = "application/msgpack";

// ---------------------------------------------------------------------------
// Put
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutRequest {
    #[serde(with = "serde_bytes")]
    pub key: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl PutResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRequest {
    #[serde(with = "serde_bytes")]
    pub key: Vec<u8>,
}

/// Result of a lookup. `value` is empty whenever `found` is false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponse {
    pub found: bool,
    #[serde(with = "serde_bytes", default)]
    pub value: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl GetResponse {
    #[must_use]
    pub fn found(value: Vec<u8>) -> Self {
        Self {
            found: true,
            value,
            error: None,
        }
    }

    #[must_use]
    pub fn missing() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            found: false,
            value: Vec::new(),
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[serde(with = "serde_bytes")]
    pub key: Vec<u8>,
}

/// Result of a removal. `success` is true only if the key was present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl DeleteResponse {
    #[must_use]
    pub fn removed(existed: bool) -> Self {
        Self {
            success: existed,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}
