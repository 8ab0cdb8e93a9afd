//! Object storage pass-through: buckets of path-addressed blobs.

use bytes::Bytes;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::json;

use crate::backend::{Backend, BackendError, check};

#[derive(Debug, Clone, Deserialize)]
pub struct StoredObject {
    /// `{bucket}/{path}`
    #[serde(rename = "Key")]
    pub key: String,
}

fn object_url(backend: &Backend, bucket: &str, path: &str) -> Result<Url, BackendError> {
    let segments = ["storage", "v1", "object", bucket]
        .into_iter()
        .chain(path.split('/').filter(|s| !s.is_empty()));
    backend.endpoint(segments)
}

pub async fn upload(
    backend: &Backend,
    bucket: &str,
    path: &str,
    data: Bytes,
    content_type: &str,
) -> Result<StoredObject, BackendError> {
    let url = object_url(backend, bucket, path)?;
    let resp = backend
        .request(Method::POST, url)
        .header("Content-Type", content_type)
        .body(data)
        .send()
        .await?;
    Ok(check(resp).await?.json().await?)
}

pub async fn download(backend: &Backend, bucket: &str, path: &str) -> Result<Bytes, BackendError> {
    let url = object_url(backend, bucket, path)?;
    let resp = backend.request(Method::GET, url).send().await?;
    let resp = check(resp).await.map_err(|e| match e {
        BackendError::Status { status: 404, .. } | BackendError::Status { status: 400, .. } => {
            BackendError::NotFound(format!("{bucket}/{path}"))
        }
        other => other,
    })?;
    Ok(resp.bytes().await?)
}

pub async fn delete(backend: &Backend, bucket: &str, path: &str) -> Result<(), BackendError> {
    let url = backend.endpoint(["storage", "v1", "object", bucket])?;
    let resp = backend
        .request(Method::DELETE, url)
        .json(&json!({ "prefixes": [path] }))
        .send()
        .await?;
    check(resp).await?;
    Ok(())
}

/// Public URL for an object in a public bucket. No request is made.
pub fn public_url(backend: &Backend, bucket: &str, path: &str) -> Result<String, BackendError> {
    let segments = ["storage", "v1", "object", "public", bucket]
        .into_iter()
        .chain(path.split('/').filter(|s| !s.is_empty()));
    Ok(backend.endpoint(segments)?.to_string())
}
