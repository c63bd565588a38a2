//! # Request Field Extraction
//!
//! Reads the live values of the request parts a schema declares and
//! collects them in a [`RequestData`]. Parts the schema does not declare
//! are never read; in particular the body is only buffered when `body` or
//! `files` is declared.
//!
//! | Part      | Source                                                   |
//! |-----------|----------------------------------------------------------|
//! | `params`  | matched route parameters                                 |
//! | `query`   | URL query string; repeated keys become arrays            |
//! | `headers` | header map, lowercase names, repeated values joined `, ` |
//! | `cookies` | `Cookie` headers                                         |
//! | `body`    | JSON, urlencoded form, multipart text fields, `text/*`   |
//! | `files`   | multipart file fields: `{filename, content_type, size}`  |
//!
//! A buffered body is put back on the request unchanged, so downstream
//! extractors still see it. Only a JSON body that decoded cleanly is ever
//! replaced by its parsed value.

use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, FromRequestParts, Multipart, RawPathParams, Request};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum_extra::extract::CookieJar;
use http_body_util::LengthLimitError;
use reqguard_core::{RequestPart, ValidationTarget};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::AppError;

/// The live request values, one named field per request part.
///
/// Inserted into request extensions by the validation middleware. After
/// successful parsing every field except `query` holds the parsed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestData {
    /// Matched route parameters.
    pub params: Value,
    /// Decoded body; `null` when absent.
    pub body: Value,
    /// Decoded query string. Never overwritten by parsing.
    pub query: Value,
    /// Request headers.
    pub headers: Value,
    /// Request cookies.
    pub cookies: Value,
    /// Uploaded file descriptors.
    pub files: Value,
}

impl Default for RequestData {
    fn default() -> Self {
        let empty = || Value::Object(Map::new());
        Self {
            params: empty(),
            body: Value::Null,
            query: empty(),
            headers: empty(),
            cookies: empty(),
            files: empty(),
        }
    }
}

impl RequestData {
    /// Value of one part.
    pub fn get(&self, part: RequestPart) -> &Value {
        match part {
            RequestPart::Params => &self.params,
            RequestPart::Body => &self.body,
            RequestPart::Query => &self.query,
            RequestPart::Headers => &self.headers,
            RequestPart::Cookies => &self.cookies,
            RequestPart::Files => &self.files,
        }
    }

    /// Build the validation bundle for the declared parts.
    pub fn target(&self, declared: &[RequestPart]) -> ValidationTarget {
        declared
            .iter()
            .map(|part| (*part, self.get(*part).clone()))
            .collect()
    }

    /// Overwrite fields with parsed values, field by field. `query` is
    /// read-only and left as extracted. Returns the parts written.
    pub fn apply_parsed(&mut self, parsed: &ValidationTarget) -> Vec<RequestPart> {
        let mut written = Vec::new();
        for (part, value) in parsed.iter() {
            let slot = match part {
                RequestPart::Params => &mut self.params,
                RequestPart::Body => &mut self.body,
                RequestPart::Headers => &mut self.headers,
                RequestPart::Cookies => &mut self.cookies,
                RequestPart::Files => &mut self.files,
                RequestPart::Query => continue,
            };
            *slot = value.clone();
            written.push(part);
        }
        written
    }
}

/// The outcome of [`extract`].
pub(crate) struct Extracted {
    /// The request with its body restored.
    pub request: Request,
    pub data: RequestData,
    /// The body was JSON and decoded without error.
    pub json_body: bool,
}

/// Read the declared parts off `request`.
///
/// # Errors
///
/// [`AppError::PayloadTooLarge`] when the body exceeds `body_limit`;
/// [`AppError::BadRequest`] when the body cannot be read or a multipart
/// body is malformed.
pub(crate) async fn extract(
    request: Request,
    declared: &[RequestPart],
    body_limit: usize,
) -> Result<Extracted, AppError> {
    let (mut head, body) = request.into_parts();
    let mut data = RequestData::default();

    for part in declared {
        match part {
            RequestPart::Params => data.params = read_params(&mut head).await,
            RequestPart::Query => data.query = read_query(head.uri.query()),
            RequestPart::Headers => data.headers = read_headers(&head.headers),
            RequestPart::Cookies => data.cookies = read_cookies(&head.headers),
            RequestPart::Body | RequestPart::Files => {}
        }
    }

    let needs_body = declared
        .iter()
        .any(|p| matches!(p, RequestPart::Body | RequestPart::Files));
    let mut json_body = false;
    let body = if needs_body {
        let bytes = buffer(body, body_limit).await?;
        let decoded = decode_body(&head.headers, bytes.clone()).await?;
        data.body = decoded.body;
        data.files = decoded.files;
        json_body = decoded.json;
        Body::from(bytes)
    } else {
        body
    };

    Ok(Extracted {
        request: Request::from_parts(head, body),
        data,
        json_body,
    })
}

/// Replace the request body with `body` encoded as JSON. Callers only do
/// this for bodies that decoded as JSON in the first place.
pub(crate) fn rewrite_json_body(request: Request, body: &Value) -> Request {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!(%error, "could not re-encode parsed body; keeping original");
            return request;
        }
    };
    let (mut head, _) = request.into_parts();
    head.headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    Request::from_parts(head, Body::from(bytes))
}

async fn read_params(head: &mut Parts) -> Value {
    match RawPathParams::from_request_parts(head, &()).await {
        Ok(params) => Value::Object(
            params
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
        ),
        Err(rejection) => {
            tracing::debug!(%rejection, "no route parameters available");
            Value::Object(Map::new())
        }
    }
}

fn read_query(query: Option<&str>) -> Value {
    let mut map = Map::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            push_value(&mut map, key.into_owned(), Value::String(value.into_owned()));
        }
    }
    Value::Object(map)
}

fn read_headers(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| std::str::from_utf8(v.as_bytes()).ok())
            .collect();
        if !values.is_empty() {
            map.insert(name.as_str().to_string(), Value::String(values.join(", ")));
        }
    }
    Value::Object(map)
}

fn read_cookies(headers: &HeaderMap) -> Value {
    let jar = CookieJar::from_headers(headers);
    Value::Object(
        jar.iter()
            .map(|c| (c.name().to_string(), Value::String(c.value().to_string())))
            .collect(),
    )
}

async fn buffer(body: Body, limit: usize) -> Result<Bytes, AppError> {
    axum::body::to_bytes(body, limit).await.map_err(|err| {
        let inner = err.into_inner();
        if inner.is::<LengthLimitError>() {
            AppError::PayloadTooLarge(limit)
        } else {
            AppError::BadRequest(format!("failed to read request body: {inner}"))
        }
    })
}

fn media_type(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    Some(
        content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase(),
    )
}

fn is_json(headers: &HeaderMap) -> bool {
    media_type(headers).is_some_and(|m| m == "application/json" || m.ends_with("+json"))
}

struct DecodedBody {
    body: Value,
    files: Value,
    json: bool,
}

impl DecodedBody {
    fn plain(body: Value) -> Self {
        Self {
            body,
            files: Value::Object(Map::new()),
            json: false,
        }
    }
}

/// Decode a buffered body into its body and files values.
async fn decode_body(headers: &HeaderMap, bytes: Bytes) -> Result<DecodedBody, AppError> {
    if bytes.is_empty() {
        return Ok(DecodedBody::plain(Value::Null));
    }

    let media = media_type(headers).unwrap_or_default();
    match media.as_str() {
        _ if is_json(headers) => match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(DecodedBody {
                json: true,
                ..DecodedBody::plain(value)
            }),
            Err(error) => {
                tracing::warn!(%error, "request body is not valid JSON");
                Ok(DecodedBody::plain(Value::Null))
            }
        },
        "application/x-www-form-urlencoded" => {
            let mut map = Map::new();
            for (key, value) in url::form_urlencoded::parse(&bytes) {
                push_value(&mut map, key.into_owned(), Value::String(value.into_owned()));
            }
            Ok(DecodedBody::plain(Value::Object(map)))
        }
        "multipart/form-data" => {
            let (body, files) = read_multipart(headers, bytes).await?;
            Ok(DecodedBody {
                body,
                files,
                json: false,
            })
        }
        m if m.starts_with("text/") => Ok(DecodedBody::plain(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))),
        other => {
            tracing::debug!(content_type = %other, "body has an undecodable content type");
            Ok(DecodedBody::plain(Value::Null))
        }
    }
}

async fn read_multipart(headers: &HeaderMap, bytes: Bytes) -> Result<(Value, Value), AppError> {
    let mut builder = axum::http::Request::builder();
    if let Some(content_type) = headers.get(CONTENT_TYPE) {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    let request = builder
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(format!("cannot rebuild multipart request: {e}")))?;

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let mut fields = Map::new();
    let mut files = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                let descriptor = json!({
                    "filename": filename,
                    "content_type": content_type,
                    "size": data.len(),
                });
                push_value(&mut files, name, descriptor);
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                push_value(&mut fields, name, Value::String(text));
            }
        }
    }

    Ok((Value::Object(fields), Value::Object(files)))
}

/// Insert `value` under `key`, turning repeated keys into arrays.
fn push_value(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}
