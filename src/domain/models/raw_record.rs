use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

/// An immutable row of a stream's raw relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    id: i64,
    params: String,
    data: Vec<u8>,
    url: String,
    input: Vec<u8>,
    created_at: i64,
}

impl RawRecord {
    /// Reconstitutes from persisted data (used by adapters).
    pub fn reconstitute(
        id: i64,
        params: String,
        data: Vec<u8>,
        url: String,
        input: Vec<u8>,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            params,
            data,
            url,
            input,
            created_at,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn params(&self) -> &str {
        &self.params
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn input(&self) -> &[u8] {
        &self.input
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Decode the captured payload.
    pub fn payload(&self) -> Result<Value, DomainError> {
        Ok(serde_json::from_slice(&self.data)?)
    }
}

/// A raw row about to be appended; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRawRecord {
    pub params: String,
    pub data: Vec<u8>,
    pub url: String,
    pub input: Vec<u8>,
}

impl NewRawRecord {
    pub fn from_payload(payload: &Value) -> Result<Self, DomainError> {
        Ok(Self {
            params: String::new(),
            data: serde_json::to_vec(payload)?,
            url: String::new(),
            input: Vec::new(),
        })
    }

    pub fn with_params(mut self, params: &Value) -> Self {
        self.params = params.to_string();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_input(mut self, input: Vec<u8>) -> Self {
        self.input = input;
        self
    }
}
