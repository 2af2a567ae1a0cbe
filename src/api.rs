// API client module: the `MediaService` seam the uploader talks to, and a
// small blocking HTTP client for ImageKit's upload endpoint. Synchronous on
// purpose: one request per run, nothing to overlap.

use crate::config::Settings;
use crate::error::ServiceError;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::{multipart, Client};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// "Store object, return locator". Anything that can take bytes and a
/// destination name and hand back an `UploadResponse` can be uploaded to.
pub trait MediaService {
    fn upload_file(&self, data: Vec<u8>, file_name: &str) -> Result<UploadResponse, ServiceError>;
}

/// Fields of ImageKit's upload response we care about. All optional: the
/// service does not promise any of them, so callers check instead of probing.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadFields {
    pub file_id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    pub size: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Decoded response plus the untouched JSON body for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResponse {
    pub fields: UploadFields,
    pub raw: Value,
}

impl UploadResponse {
    /// Build from a JSON value. Fields with unexpected types are treated as
    /// absent rather than failing the whole upload.
    pub fn from_value(raw: Value) -> Self {
        let fields = serde_json::from_value::<UploadFields>(raw.clone()).unwrap_or_else(|e| {
            log::debug!("response did not match expected shape: {}", e);
            UploadFields {
                file_id: str_field(&raw, "fileId"),
                url: str_field(&raw, "url"),
                ..Default::default()
            }
        });
        UploadResponse { fields, raw }
    }

    pub fn url(&self) -> Option<&str> {
        self.fields.url.as_deref().filter(|u| !u.is_empty())
    }

    pub fn file_id(&self) -> Option<&str> {
        self.fields.file_id.as_deref().filter(|id| !id.is_empty())
    }
}

fn str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Error body ImageKit sends with non-2xx responses.
#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: Option<String>,
    help: Option<String>,
}

/// Blocking ImageKit upload client. Built once and reused.
pub struct ImageKitClient {
    client: Client,
    upload_url: String,
    folder: Option<String>,
}

impl ImageKitClient {
    /// Create a client authenticated with the private key from `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let headers = auth_headers(&settings.credentials.private_key)?;
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ImageKitClient {
            client,
            upload_url: settings.upload_url.clone(),
            folder: settings.folder.clone(),
        })
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }
}

/// HTTP Basic with the private key as user name and an empty password.
fn auth_headers(private_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let token = STANDARD.encode(format!("{}:", private_key));
    let mut val = HeaderValue::from_str(&format!("Basic {}", token))
        .context("Private key cannot be used in an HTTP header")?;
    val.set_sensitive(true);
    headers.insert(AUTHORIZATION, val);
    Ok(headers)
}

impl MediaService for ImageKitClient {
    fn upload_file(&self, data: Vec<u8>, file_name: &str) -> Result<UploadResponse, ServiceError> {
        log::debug!(
            "POST {} ({} bytes as {:?})",
            self.upload_url,
            data.len(),
            file_name
        );

        let part = multipart::Part::bytes(data).file_name(file_name.to_string());
        let mut form = multipart::Form::new()
            .part("file", part)
            .text("fileName", file_name.to_string());
        if let Some(folder) = &self.folder {
            form = form.text("folder", folder.clone());
        }

        let res = self.client.post(&self.upload_url).multipart(form).send()?;
        let status = res.status();
        let txt = res.text()?;
        decode_response(status.as_u16(), status.is_success(), &txt)
    }
}

/// Turn a status line and body into either a response or a typed error.
fn decode_response(status: u16, success: bool, body: &str) -> Result<UploadResponse, ServiceError> {
    if !success {
        let raw = serde_json::from_str::<Value>(body).ok();
        let message = raw
            .as_ref()
            .and_then(|v| serde_json::from_value::<ErrorBody>(v.clone()).ok())
            .map(|e| match (e.message, e.help) {
                (Some(m), Some(h)) if !h.is_empty() => format!("{} ({})", m, h),
                (Some(m), _) => m,
                (None, _) => body.to_string(),
            })
            .unwrap_or_else(|| body.to_string());
        let raw = raw.or_else(|| (!body.is_empty()).then(|| Value::String(body.to_string())));
        return Err(ServiceError::api(status, message, raw));
    }

    let raw: Value =
        serde_json::from_str(body).map_err(|e| ServiceError::decode(e.to_string(), body))?;
    if !raw.is_object() {
        return Err(ServiceError::decode("expected a JSON object", body));
    }
    Ok(UploadResponse::from_value(raw))
}
