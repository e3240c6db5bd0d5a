//! Query-string extractor that keeps the first value of a repeated key.
//!
//! `web::Query` rejects `?region=a&region=b` as a duplicate field. Browsers
//! and crawlers do send such URLs, so parameters are collected as pairs and
//! the first occurrence of each key wins.

use std::future::{Ready, ready};
use std::ops::Deref;

use actix_web::error::{InternalError, QueryPayloadError};
use actix_web::{FromRequest, HttpRequest, HttpResponse, dev::Payload, web};
use agri_map_server_models::ApiError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from reading a query string into a parameter struct.
#[derive(Debug, Error)]
pub enum QueryStringError {
    /// The query string is not valid `application/x-www-form-urlencoded`.
    #[error("Malformed query string: {0}")]
    Malformed(#[from] QueryPayloadError),

    /// The decoded pairs do not fit the parameter struct.
    #[error("Invalid query parameters: {0}")]
    Fields(#[from] serde_json::Error),
}

/// Extracts `T` from the query string using the first value of each key.
#[derive(Debug)]
pub struct FirstQuery<T>(pub T);

impl<T: DeserializeOwned> FirstQuery<T> {
    /// Parses `query`, keeping the first value of each repeated key.
    ///
    /// # Errors
    ///
    /// Returns [`QueryStringError`] if the string cannot be decoded or a
    /// value does not fit its field.
    pub fn from_query(query: &str) -> Result<Self, QueryStringError> {
        let pairs = web::Query::<Vec<(String, String)>>::from_query(query)?.into_inner();

        let mut fields = Map::new();
        for (key, value) in pairs {
            fields.entry(key).or_insert(Value::String(value));
        }

        Ok(Self(serde_json::from_value(Value::Object(fields))?))
    }
}

impl<T> Deref for FirstQuery<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: DeserializeOwned> FromRequest for FirstQuery<T> {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_query(req.query_string()).map_err(|err| {
            log::debug!("Rejected query string '{}': {err}", req.query_string());
            InternalError::from_response(
                err,
                HttpResponse::BadRequest().json(ApiError::new("Invalid query string")),
            )
            .into()
        }))
    }
}
