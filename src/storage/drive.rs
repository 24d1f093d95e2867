//! Google Drive v3 photo store (plain REST over blocking reqwest).
//!
//! upload      → POST {upload}/files?uploadType=multipart&fields=id,name
//! make_public → GET  {api}/files/{id}?fields=webViewLink
//!               POST {api}/files/{id}/permissions  {type: anyone, role: reader}

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::types::{CredentialProvider, PhotoHandle, PhotoStore};
use super::StoreError;

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

const MULTIPART_BOUNDARY: &str = "fridge_scan_photo_boundary";
const PHOTO_MIME: &str = "image/jpeg";

pub struct DrivePhotoStore {
    client: reqwest::blocking::Client,
    api_base: String,
    upload_base: String,
    folder_id: String,
    credentials: Arc<dyn CredentialProvider>,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct FileMetadata<'a> {
    name: &'a str,
    parents: [&'a str; 1],
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
}

#[derive(Deserialize)]
struct CreatedFile {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct FileLink {
    #[serde(rename = "webViewLink")]
    web_view_link: Option<String>,
}

#[derive(Serialize)]
struct Permission {
    #[serde(rename = "type")]
    kind: &'static str,
    role: &'static str,
}

impl DrivePhotoStore {
    pub fn new(
        folder_id: &str,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        Self::with_endpoints(DRIVE_API_BASE, DRIVE_UPLOAD_BASE, folder_id, credentials, timeout)
    }

    pub fn with_endpoints(
        api_base: &str,
        upload_base: &str,
        folder_id: &str,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
            folder_id: folder_id.to_string(),
            credentials,
            timeout_secs: timeout.as_secs(),
        })
    }

    fn send(
        &self,
        request: reqwest::blocking::RequestBuilder,
        endpoint: &str,
    ) -> Result<reqwest::blocking::Response, StoreError> {
        let credential = self.credentials.valid_credential()?;
        let response = request
            .bearer_auth(credential.access_token())
            .send()
            .map_err(|e| StoreError::from_reqwest(e, endpoint, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// `multipart/related` body: JSON metadata part, then the media part.
fn related_body(metadata: &[u8], media: &[u8], mime: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + media.len() + 256);
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

impl PhotoStore for DrivePhotoStore {
    fn upload(&self, bytes: &[u8], file_name: &str) -> Result<PhotoHandle, StoreError> {
        let metadata = serde_json::to_vec(&FileMetadata {
            name: file_name,
            parents: [self.folder_id.as_str()],
            mime_type: PHOTO_MIME,
        })
        .map_err(|e| StoreError::Http(e.to_string()))?;

        let url = format!("{}/files?uploadType=multipart&fields=id,name", self.upload_base);
        let request = self
            .client
            .post(&url)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(related_body(&metadata, bytes, PHOTO_MIME));

        let created: CreatedFile = self
            .send(request, &self.upload_base)?
            .json()
            .map_err(|e| StoreError::ResponseParsing(e.to_string()))?;

        let file_id = created
            .id
            .filter(|id| !id.is_empty())
            .ok_or(StoreError::MissingField("id"))?;
        info!(file_id = %file_id, name = %file_name, "Photo uploaded to Drive");

        Ok(PhotoHandle {
            file_id,
            name: created.name.unwrap_or_else(|| file_name.to_string()),
        })
    }

    fn make_public(&self, handle: &PhotoHandle) -> Result<String, StoreError> {
        let file_url = format!("{}/files/{}", self.api_base, handle.file_id);

        let link: FileLink = self
            .send(
                self.client.get(&file_url).query(&[("fields", "webViewLink")]),
                &self.api_base,
            )?
            .json()
            .map_err(|e| StoreError::ResponseParsing(e.to_string()))?;
        let url = link
            .web_view_link
            .filter(|u| !u.is_empty())
            .ok_or(StoreError::MissingField("webViewLink"))?;

        self.send(
            self.client
                .post(format!("{file_url}/permissions"))
                .query(&[("fields", "id")])
                .json(&Permission {
                    kind: "anyone",
                    role: "reader",
                }),
            &self.api_base,
        )?;
        debug!(file_id = %handle.file_id, "Photo shared publicly");

        Ok(url)
    }
}
