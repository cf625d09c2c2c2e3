// API client module: a small blocking HTTP client for the dataset service's
// item-upload endpoints, plus the typed request/response bodies it speaks.
//
// Everything above this module talks to the service through `DatasetApi`,
// which keeps the orchestration testable without a network.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::align::Item;
use crate::config::UploadConfig;
use crate::error::{RequestFailure, UploadError};

/// Operations the upload pipeline needs from the remote service.
pub trait DatasetApi {
    /// Register every item in one request and return the upload handles.
    fn register_upload(
        &self,
        dataset_slug: &str,
        items: &[Item],
    ) -> Result<RegisterUploadResponse, RequestFailure>;

    /// Ask for a short-lived URL the file bytes can be written to.
    fn sign_upload(&self, upload_id: &str) -> Result<String, RequestFailure>;

    /// Write the whole file to a signed URL. Returns the response status.
    fn put_file(&self, upload_url: &str, data: Vec<u8>) -> Result<u16, RequestFailure>;

    /// Tell the service the bytes for `upload_id` are in place.
    fn confirm_upload(&self, upload_id: &str, batch_name: &str) -> Result<u16, RequestFailure>;
}

/// Body of `POST /teams/{team}/items/register_upload`.
#[derive(Serialize, Debug)]
pub struct RegisterUploadRequest<'a> {
    pub items: &'a [Item],
    pub dataset_slug: &'a str,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterUploadResponse {
    pub items: Vec<RegisteredItem>,
    /// Items the service refused, e.g. because they already exist.
    #[serde(default)]
    pub blocked_items: Vec<BlockedItem>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisteredItem {
    #[serde(default)]
    pub name: String,
    pub slots: Vec<RegisteredSlot>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisteredSlot {
    pub upload_id: String,
    pub file_name: String,
    #[serde(default)]
    pub slot_name: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlockedItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub slots: Vec<BlockedSlot>,
}

impl BlockedItem {
    /// First reason the service gave, item-level before slot-level.
    pub fn reason(&self) -> &str {
        self.reason
            .as_deref()
            .or_else(|| self.slots.iter().find_map(|s| s.reason.as_deref()))
            .unwrap_or("unknown")
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BlockedSlot {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub slot_name: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct SignResponse {
    upload_url: String,
}

#[derive(Serialize, Debug)]
struct ConfirmRequest<'a> {
    name: &'a str,
}

/// Blocking client for one team on the service.
#[derive(Clone)]
pub struct DarwinClient {
    client: Client,
    base_url: String,
    team_slug: String,
    headers: HeaderMap,
}

impl DarwinClient {
    pub fn new(config: &UploadConfig, api_key: &str, team_slug: &str) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UploadError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(DarwinClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            team_slug: team_slug.to_string(),
            headers: auth_headers(api_key)?,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/teams/{}/{}", self.base_url, self.team_slug, path)
    }
}

/// Headers for every request to the service itself (not the signed URL).
fn auth_headers(api_key: &str) -> Result<HeaderMap, UploadError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let val = HeaderValue::from_str(&format!("ApiKey {}", api_key))
        .map_err(|_| UploadError::Config("API key contains invalid header characters".into()))?;
    headers.insert(AUTHORIZATION, val);
    Ok(headers)
}

/// Turn a non-success response into `RequestFailure::Status` with its body.
fn check_status(res: Response) -> Result<Response, RequestFailure> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().unwrap_or_default();
    Err(RequestFailure::Status {
        status: status.as_u16(),
        body,
    })
}

fn parse_body<T: DeserializeOwned>(what: &str, body: &str) -> Result<T, RequestFailure> {
    serde_json::from_str(body).map_err(|e| RequestFailure::Decode(format!("{}: {}", what, e)))
}

pub(crate) fn parse_register_response(body: &str) -> Result<RegisterUploadResponse, RequestFailure> {
    parse_body("register_upload response", body)
}

pub(crate) fn parse_sign_response(body: &str) -> Result<String, RequestFailure> {
    parse_body::<SignResponse>("sign response", body).map(|r| r.upload_url)
}

impl DatasetApi for DarwinClient {
    fn register_upload(
        &self,
        dataset_slug: &str,
        items: &[Item],
    ) -> Result<RegisterUploadResponse, RequestFailure> {
        let url = self.endpoint("items/register_upload");
        debug!("POST {} ({} items)", url, items.len());
        let res = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .json(&RegisterUploadRequest {
                items,
                dataset_slug,
            })
            .send()?;
        let body = check_status(res)?.text()?;
        parse_register_response(&body)
    }

    fn sign_upload(&self, upload_id: &str) -> Result<String, RequestFailure> {
        let url = self.endpoint(&format!("items/uploads/{}/sign", upload_id));
        debug!("GET {}", url);
        let res = self.client.get(&url).headers(self.headers.clone()).send()?;
        let body = check_status(res)?.text()?;
        parse_sign_response(&body)
    }

    fn put_file(&self, upload_url: &str, data: Vec<u8>) -> Result<u16, RequestFailure> {
        // Signed URLs carry their own credentials; the API key must not leak there.
        debug!("PUT signed URL ({} bytes)", data.len());
        let res = self.client.put(upload_url).body(data).send()?;
        Ok(check_status(res)?.status().as_u16())
    }

    fn confirm_upload(&self, upload_id: &str, batch_name: &str) -> Result<u16, RequestFailure> {
        let url = self.endpoint(&format!("items/uploads/{}/confirm", upload_id));
        debug!("POST {}", url);
        let res = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .json(&ConfirmRequest { name: batch_name })
            .send()?;
        Ok(check_status(res)?.status().as_u16())
    }
}
