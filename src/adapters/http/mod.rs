//! HTTP adapter: Blocking client for the screening API.
//!
//! One client implements all three collaborator ports against a single base
//! URL:
//! - `POST /api/predict` (multipart field `image`)
//! - `GET  /api/colorblindness/start-test?count=N`
//! - `GET  /api/colorblindness/image/{filename}`
//! - `POST /api/colorblindness/evaluate`
//!
//! Any JSON body carrying an `error` string is reported as
//! `ServiceError::Rejected`, whatever the HTTP status.

use std::time::Duration;

use reqwest::blocking::{multipart, Client, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::domain::ClassificationResult;
use crate::ports::{
    EvaluationRequest, EvaluationResponse, ImageClassifier, ImagePayload, PlateProvider,
    ProvisionedPlates, ResponseEvaluator, ServiceError,
};
use crate::OculusError;

/// Longest upstream body kept in a `ServiceError::Status`.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Blocking client for the screening API.
#[derive(Debug, Clone)]
pub struct OculusApiClient {
    client: Client,
    base_url: Url,
}

impl OculusApiClient {
    /// Build a client for `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the URL cannot be parsed or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> crate::Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            OculusError::InvalidInput(format!("invalid API URL {base_url:?}: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(OculusError::InvalidInput(format!(
                "API URL {base_url} cannot be used as a base"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OculusError::InvalidInput(format!("cannot build HTTP client: {e}")))?;

        tracing::debug!("API client for {} (timeout {:?})", base_url, timeout);
        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ServiceError::Transport(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn transport(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Transport(format!("request timed out: {e}"))
    } else {
        ServiceError::Transport(e.to_string())
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

/// The `error` message of a JSON error payload, if `body` is one.
fn error_payload(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

/// Map a non-success response (or an error payload) to a `ServiceError`.
fn check_status(status: reqwest::StatusCode, body: &[u8]) -> Result<(), ServiceError> {
    if let Some(message) = error_payload(body) {
        return Err(ServiceError::Rejected(message));
    }
    if !status.is_success() {
        return Err(ServiceError::Status {
            status: status.as_u16(),
            body: truncate(&String::from_utf8_lossy(body)),
        });
    }
    Ok(())
}

fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    let body = response.bytes().map_err(transport)?;
    check_status(status, &body)?;
    serde_json::from_slice(&body).map_err(|e| ServiceError::Decode(e.to_string()))
}

impl ImageClassifier for OculusApiClient {
    fn classify(&self, image: &ImagePayload) -> Result<ClassificationResult, ServiceError> {
        let url = self.endpoint(&["api", "predict"])?;

        let part = multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(transport)?;
        let form = multipart::Form::new().part("image", part);

        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .map_err(transport)?;
        decode_json(response)
    }
}

impl PlateProvider for OculusApiClient {
    fn provision(&self, count: usize) -> Result<ProvisionedPlates, ServiceError> {
        let mut url = self.endpoint(&["api", "colorblindness", "start-test"])?;
        url.query_pairs_mut()
            .append_pair("count", &count.to_string());

        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().map_err(transport)?;
        decode_json(response)
    }

    fn fetch_image(&self, filename: &str) -> Result<Vec<u8>, ServiceError> {
        let url = self.endpoint(&["api", "colorblindness", "image", filename])?;

        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().map_err(transport)?;
        let status = response.status();
        let body = response.bytes().map_err(transport)?;
        if !status.is_success() {
            check_status(status, &body)?;
        }
        Ok(body.to_vec())
    }
}

impl ResponseEvaluator for OculusApiClient {
    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResponse, ServiceError> {
        let url = self.endpoint(&["api", "colorblindness", "evaluate"])?;

        tracing::debug!("POST {} ({} responses)", url, request.responses.len());
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .map_err(transport)?;
        decode_json(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> OculusApiClient {
        OculusApiClient::new(base, Duration::from_secs(1)).expect("Should build client")
    }

    #[test]
    fn test_endpoint_joins_and_encodes() {
        let c = client("http://localhost:5000/");
        let url = c
            .endpoint(&["api", "colorblindness", "image", "theme 1/../x.png"])
            .expect("Should build URL");
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/colorblindness/image/theme%201%2F..%2Fx.png"
        );

        let c = client("http://host/prefix");
        let url = c.endpoint(&["api", "predict"]).expect("Should build URL");
        assert_eq!(url.as_str(), "http://host/prefix/api/predict");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            OculusApiClient::new("not a url", Duration::from_secs(1)),
            Err(OculusError::InvalidInput(_))
        ));
        assert!(matches!(
            OculusApiClient::new("mailto:someone", Duration::from_secs(1)),
            Err(OculusError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_error_payload_wins_over_status() {
        let body = br#"{"error": "No image provided"}"#;
        assert_eq!(
            check_status(reqwest::StatusCode::OK, body),
            Err(ServiceError::Rejected("No image provided".to_string()))
        );
        assert_eq!(
            check_status(reqwest::StatusCode::BAD_REQUEST, body),
            Err(ServiceError::Rejected("No image provided".to_string()))
        );
    }

    #[test]
    fn test_non_success_status() {
        let err = check_status(reqwest::StatusCode::BAD_GATEWAY, b"upstream down")
            .expect_err("Should fail");
        assert_eq!(
            err,
            ServiceError::Status {
                status: 502,
                body: "upstream down".to_string()
            }
        );
        assert!(check_status(reqwest::StatusCode::OK, b"{}").is_ok());
    }

    #[test]
    fn test_long_bodies_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY_CHARS + 10);
        let t = truncate(&body);
        assert_eq!(t.len(), MAX_ERROR_BODY_CHARS + 3);
        assert!(t.ends_with("..."));
    }
}
