//! Replayable request descriptions and buffered responses.
//!
//! An `ApiRequest` is a plain value: the dispatcher turns it into a fresh
//! `reqwest` request every time it is sent, so a replay after renewal is
//! rebuilt and re-stamped with whatever credential is current by then.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use super::ApiError;

/// Path of the "who am I" endpoint; recovery treats it specially.
pub const CURRENT_SUBJECT_PATH: &str = "/auth/me";

#[derive(Debug, Clone)]
pub enum FormField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        mime: String,
        bytes: Arc<[u8]>,
    },
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormField>),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body. Serialization happens once, here.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode body: {}", e)))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn text_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_fields().push(FormField::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file_field(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        mime: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        self.form_fields().push(FormField::File {
            name: name.into(),
            filename: filename.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        });
        self
    }

    fn form_fields(&mut self) -> &mut Vec<FormField> {
        if !matches!(self.body, RequestBody::Multipart(_)) {
            self.body = RequestBody::Multipart(Vec::new());
        }
        match &mut self.body {
            RequestBody::Multipart(fields) => fields,
            _ => unreachable!("body was just set to multipart"),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Whether this is the fetch-current-subject call.
    pub fn is_current_subject(&self) -> bool {
        self.method == Method::GET && self.path == CURRENT_SUBJECT_PATH
    }
}

/// A fully-read response body with its status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Build a synthetic `200 OK` response carrying `value` as JSON.
    pub fn from_json<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_vec(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode payload: {}", e)))?;
        Ok(Self::new(StatusCode::OK, body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
    }
}
