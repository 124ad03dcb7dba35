// The ranking service, over HTTP.

use std::time::Duration;

use reqwest::blocking::{multipart::Form, Client, Response};

use crate::portal::io_common::records_from_json;
use crate::portal::*;

pub const COLLEGES_ENDPOINT: &str = "/api/colleges";
pub const PREDICTIONS_ENDPOINT: &str = "/api/predictions";
pub const UPLOAD_ENDPOINT: &str = "/api/admin/upload";

/// Joins the base URL of the service and the path of an endpoint.
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// The human-readable message of an error body, if any.
pub fn error_detail(js: &JSValue) -> Option<String> {
    match js.get("detail")? {
        JSValue::Null => None,
        JSValue::String(s) if s.is_empty() => None,
        JSValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub struct HttpSource {
    base_url: String,
    client: Client,
}

impl HttpSource {
    pub fn new(base_url: &str) -> PortalResult<HttpSource> {
        // Requests are never timed out.
        let client = Client::builder()
            .user_agent(concat!("nirfview/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<Duration>)
            .build()
            .context(HttpSnafu { url: base_url })?;
        Ok(HttpSource {
            base_url: base_url.to_string(),
            client,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        endpoint_url(&self.base_url, path)
    }

    fn get(&self, path: &str) -> PortalResult<Response> {
        let url = self.endpoint(path);
        debug!("HttpSource: GET {}", url);
        let response = self
            .client
            .get(url.as_str())
            .send()
            .context(HttpSnafu { url: url.as_str() })?;
        ensure_success(response, &url)
    }

    fn get_records(&self, path: &str) -> PortalResult<Vec<RawRecord>> {
        let url = self.endpoint(path);
        let js: JSValue = self.get(path)?.json().context(HttpSnafu { url: url.as_str() })?;
        records_from_json(js, &url)
    }
}

// Non-2xx responses become errors, with the detail of the body when there is one.
fn ensure_success(response: Response, url: &str) -> PortalResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response
        .json::<JSValue>()
        .ok()
        .and_then(|js| error_detail(&js));
    warn!("{} answered with status {}: {:?}", url, status, detail);
    HttpStatusSnafu {
        url,
        status: status.as_u16(),
        detail,
    }
    .fail()
}

impl RankingSource for HttpSource {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    fn fetch_colleges(&mut self) -> PortalResult<Vec<RawRecord>> {
        self.get_records(COLLEGES_ENDPOINT)
    }

    fn fetch_predictions(&mut self) -> PortalResult<Vec<RawRecord>> {
        self.get_records(PREDICTIONS_ENDPOINT)
    }

    fn upload(&mut self, path: &Path) -> PortalResult<UploadReceipt> {
        let url = self.endpoint(UPLOAD_ENDPOINT);
        let form = Form::new().file("file", path).context(ReadingUploadSnafu {
            path: path.display().to_string(),
        })?;
        info!("HttpSource: POST {} ({})", url, path.display());
        let response = self
            .client
            .post(url.as_str())
            .multipart(form)
            .send()
            .context(HttpSnafu { url: url.as_str() })?;
        let receipt: UploadReceipt = ensure_success(response, &url)?
            .json()
            .context(HttpSnafu { url: url.as_str() })?;
        debug!("HttpSource: upload receipt: {:?}", receipt);
        Ok(receipt)
    }

    /// The service is up if the entity endpoint answers with a success status.
    fn check_status(&mut self) -> BackendStatus {
        match self.get(COLLEGES_ENDPOINT) {
            Ok(_) => BackendStatus::Connected,
            Err(e) => {
                debug!("check_status: {}", e);
                BackendStatus::Disconnected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints() {
        assert_eq!(
            endpoint_url("http://localhost:8000", COLLEGES_ENDPOINT),
            "http://localhost:8000/api/colleges"
        );
        assert_eq!(
            endpoint_url("http://localhost:8000/", "api/predictions"),
            "http://localhost:8000/api/predictions"
        );
        assert_eq!(endpoint_url("", UPLOAD_ENDPOINT), "/api/admin/upload");
    }

    #[test]
    fn details() {
        assert_eq!(
            error_detail(&json!({"detail": "Missing column Name"})),
            Some("Missing column Name".to_string())
        );
        assert_eq!(error_detail(&json!({"detail": ""})), None);
        assert_eq!(error_detail(&json!({"message": "x"})), None);
        assert_eq!(error_detail(&json!([1, 2])), None);
    }
}
