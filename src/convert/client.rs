//! HTTP client for the conversion service.

use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    multipart::{Form, Part},
};
use serde::Deserialize;
use std::{path::Path, time::Duration};

use super::{
    request::ConvertRequest,
    types::{ConvertResponse, TemplateInfo, TemplateListResp},
};
use crate::error::ConvertError;

/// The remote side of a conversion. Implemented over HTTP in production and
/// mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversionClient: Send + Sync {
    /// Send one request and decode the response. A `status = "error"` body
    /// on a 2xx response is returned as `Ok`; the caller decides.
    async fn submit(&self, request: &ConvertRequest) -> Result<ConvertResponse, ConvertError>;

    /// Names and metadata of the server-side template library.
    async fn list_templates(&self) -> Result<Vec<TemplateInfo>, ConvertError>;
}

/// `ConversionClient` backed by reqwest multipart uploads.
#[derive(Clone, Debug)]
pub struct HttpConversionClient {
    http: Client,
    base_url: String,
}

impl HttpConversionClient {
    /// Build a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConvertError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ConversionClient for HttpConversionClient {
    async fn submit(&self, request: &ConvertRequest) -> Result<ConvertResponse, ConvertError> {
        let (path, form) = match request {
            ConvertRequest::BoxLabels { source } => (
                "/api/generate-labels-from-file",
                Form::new().part("file", file_part(source).await?),
            ),
            ConvertRequest::Convert {
                source,
                mode,
                template_name,
                template_file,
                detail_file,
                week_num,
            } => {
                let mut form = Form::new()
                    .part("file", file_part(source).await?)
                    .text("mode", mode.as_str());
                if let Some(tpl) = template_file {
                    form = form.part("template", file_part(tpl).await?);
                }
                if let Some(name) = template_name {
                    form = form.text("template_name", name.clone());
                }
                if let Some(detail) = detail_file {
                    form = form.part("detail_file", file_part(detail).await?);
                }
                if let Some(week) = week_num {
                    form = form.text("week_num", week.clone());
                }
                ("/api/convert", form)
            }
        };

        tracing::info!("POST {} ({})", path, request.source().display());
        let resp = self
            .http
            .post(self.endpoint(path))
            .multipart(form)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        tracing::debug!("response {}: {} bytes", status, body.len());
        decode_body(status, &body)
    }

    async fn list_templates(&self) -> Result<Vec<TemplateInfo>, ConvertError> {
        let resp = self
            .http
            .get(self.endpoint("/api/templates"))
            .send()
            .await?
            .error_for_status()?
            .json::<TemplateListResp>()
            .await?;
        Ok(resp.templates)
    }
}

/// Read a local file into a named multipart part.
async fn file_part(path: &Path) -> Result<Part, ConvertError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        ConvertError::TransportFailure(format!("cannot read {}: {e}", path.display()))
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.xlsx".into());
    Ok(Part::bytes(bytes).file_name(name))
}

/// Error bodies: `{status, message}` from the converter or `{detail}` from the framework.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Map an HTTP status and body to a response or a classified error.
fn decode_body(status: StatusCode, body: &str) -> Result<ConvertResponse, ConvertError> {
    if status.is_success() {
        return serde_json::from_str(body)
            .map_err(|e| ConvertError::TransportFailure(format!("invalid response body: {e}")));
    }

    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let message = parsed.and_then(|b| {
        b.message.filter(|m| !m.trim().is_empty()).or(match b.detail {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
            None => None,
        })
    });
    match message {
        Some(m) => Err(ConvertError::RemoteRejection(m)),
        None => Err(ConvertError::TransportFailure(format!(
            "HTTP {}: {}",
            status.as_u16(),
            body.trim()
        ))),
    }
}

/// Turn a `download_url` from the service into an absolute URL.
pub fn resolve_download_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_decodes() {
        let r = decode_body(StatusCode::OK, r#"{"status":"success","message":"ok"}"#).unwrap();
        assert!(r.is_success());
    }

    #[test]
    fn error_status_on_2xx_is_returned_as_response() {
        let r = decode_body(StatusCode::OK, r#"{"status":"error","message":"bad sheet"}"#).unwrap();
        assert!(!r.is_success());
        assert_eq!(r.message_text(), Some("bad sheet"));
    }

    #[test]
    fn server_error_with_message_is_remote_rejection() {
        let err = decode_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"status":"error","message":"Sheet 'PT-01' not found"}"#,
        )
        .unwrap_err();
        assert_eq!(err, ConvertError::RemoteRejection("Sheet 'PT-01' not found".into()));
    }

    #[test]
    fn framework_detail_is_remote_rejection() {
        let err = decode_body(StatusCode::BAD_REQUEST, r#"{"detail":"Invalid mode"}"#).unwrap_err();
        assert_eq!(err, ConvertError::RemoteRejection("Invalid mode".into()));
    }

    #[test]
    fn non_json_error_is_transport_failure() {
        let err = decode_body(StatusCode::BAD_GATEWAY, "upstream down\n").unwrap_err();
        assert_eq!(err, ConvertError::TransportFailure("HTTP 502: upstream down".into()));
    }

    #[test]
    fn garbage_success_body_is_transport_failure() {
        let err = decode_body(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, ConvertError::TransportFailure(_)));
    }

    #[test]
    fn download_urls_resolve_against_base() {
        assert_eq!(
            resolve_download_url("http://10.0.0.5:8000/", "/api/download/out.xlsx"),
            "http://10.0.0.5:8000/api/download/out.xlsx"
        );
        assert_eq!(
            resolve_download_url("http://10.0.0.5:8000", "https://cdn.example/out.xlsx"),
            "https://cdn.example/out.xlsx"
        );
    }

    #[tokio::test]
    async fn unreadable_source_fails_before_any_request() {
        let client = HttpConversionClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let req = ConvertRequest::BoxLabels {
            source: "/definitely/not/here.xlsx".into(),
        };
        let err = client.submit(&req).await.unwrap_err();
        let ConvertError::TransportFailure(msg) = err else {
            panic!("expected transport failure");
        };
        assert!(msg.starts_with("cannot read /definitely/not/here.xlsx"));
    }
}
