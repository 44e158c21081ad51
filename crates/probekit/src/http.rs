//! HTTP endpoint probe
//!
//! Each [`EndpointCase`] issues one request against a running service and
//! checks the status code, the content type and either the first lines of
//! the body or the whole body as JSON.

use crate::config::HarnessConfig;
use crate::runner::{CaseResult, Runner, TestCase};
use probekit_diff::diff;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use serde_json::Value;
use std::net::SocketAddr;
use tracing::debug;

/// Content type expected whenever a JSON body is expected
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// One request and what its response should look like
#[derive(Debug, Clone, Default)]
pub struct EndpointCase {
    /// Case name, the URL when absent
    pub description: Option<String>,
    /// GET without `json_input`, POST with it, when absent
    pub method: Option<Method>,
    /// Path (and query) appended to the server address
    pub url: String,
    /// Extra request headers, replacing any header of the same name
    pub headers: HeaderMap,
    /// Request body, sent as JSON
    pub json_input: Option<Value>,
    /// Expected `Content-Type`; ignored when `json_output` is set
    pub content_type: String,
    /// Expected status code, 200 when absent
    pub status_code: Option<u16>,
    /// Expected first lines of the body
    pub first_lines: Option<Vec<String>>,
    /// Expected body, compared as JSON
    pub json_output: Option<Value>,
}

impl EndpointCase {
    pub fn title(&self) -> String {
        self.description.clone().unwrap_or_else(|| self.url.clone())
    }

    pub fn effective_method(&self) -> Method {
        match (&self.method, &self.json_input) {
            (Some(method), _) => method.clone(),
            (None, None) => Method::GET,
            (None, Some(_)) => Method::POST,
        }
    }

    pub fn expected_status(&self) -> u16 {
        self.status_code.unwrap_or(200)
    }

    /// An empty string unless configured, so a response carrying a content
    /// type does not match a case that sets none
    pub fn expected_content_type(&self) -> &str {
        match self.json_output {
            Some(_) => JSON_CONTENT_TYPE,
            None => &self.content_type,
        }
    }
}

/// Issues endpoint cases against one server
#[derive(Debug, Clone)]
pub struct EndpointProbe {
    client: Client,
    addr: SocketAddr,
}

impl EndpointProbe {
    pub fn new(addr: SocketAddr, config: &HarnessConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .no_proxy()
            .build()?;
        Ok(Self { client, addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run one endpoint case
    pub async fn check(&self, case: &TestCase, tc: &EndpointCase) -> CaseResult {
        if tc.first_lines.is_some() && tc.json_output.is_some() {
            return Err(case.fatal("cannot have both first_lines and json_output"));
        }

        let method = tc.effective_method();
        let url = format!("http://{}{}", self.addr, tc.url);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method.clone(), &url);
        if let Some(input) = &tc.json_input {
            let payload = serde_json::to_vec(input)
                .map_err(|e| case.fatal(format!("encode error:\n{}", e)))?;
            request = request.header(CONTENT_TYPE, "application/json").body(payload);
        }
        if !tc.headers.is_empty() {
            request = request.headers(tc.headers.clone());
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| case.fatal(format!("{} {}:\n{}", method, tc.url, e)))?;

        let status = response.status().as_u16();
        if status != tc.expected_status() {
            case.error(format!(
                "{} {}: got status code {}, not {}",
                method,
                tc.url,
                status,
                tc.expected_status()
            ));
        }

        let got_content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if got_content_type != tc.expected_content_type() {
            case.error(format!(
                "{} {} Content-Type (-got, +want):\n-{}\n+{}",
                method,
                tc.url,
                got_content_type,
                tc.expected_content_type()
            ));
        }

        match &tc.json_output {
            Some(expected) => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| case.fatal(format!("{} {}:\n{}", method, tc.url, e)))?;
                let got: Value = serde_json::from_slice(&body)
                    .map_err(|e| case.fatal(format!("{} {}:\n{}", method, tc.url, e)))?;
                let delta = diff(&got, expected);
                if !delta.is_empty() {
                    return Err(case.fatal(format!(
                        "{} {} (-got, +want):\n{}",
                        method, tc.url, delta
                    )));
                }
            }
            None => {
                let expected = tc.first_lines.as_deref().unwrap_or_default();
                let got = read_first_lines(&mut response, expected.len()).await;
                let delta = diff(&got, expected);
                if !delta.is_empty() {
                    case.error(format!("{} {} (-got, +want):\n{}", method, tc.url, delta));
                }
            }
        }
        Ok(())
    }
}

/// Read up to `count` lines from the body as it arrives
///
/// Both `\n` and `\r\n` end a line and a final unterminated line counts.
/// A read error ends the lines collected so far.
pub async fn read_first_lines(response: &mut Response, count: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending: Vec<u8> = Vec::new();
    while lines.len() < count {
        if let Some(end) = pending.iter().position(|b| *b == b'\n') {
            let rest = pending.split_off(end + 1);
            lines.push(line_text(&pending));
            pending = rest;
            continue;
        }
        match response.chunk().await {
            Ok(Some(chunk)) => pending.extend_from_slice(&chunk),
            Ok(None) => {
                if !pending.is_empty() {
                    lines.push(line_text(&pending));
                }
                break;
            }
            Err(e) => {
                debug!("body read error: {}", e);
                break;
            }
        }
    }
    lines
}

fn line_text(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Run every endpoint case as its own sub-case
pub async fn check_endpoints(runner: &mut Runner, addr: SocketAddr, cases: &[EndpointCase]) {
    let probe = EndpointProbe::new(addr, runner.config());
    let probe = &probe;
    for tc in cases {
        runner
            .run(tc.title(), |case| async move {
                let probe = probe
                    .as_ref()
                    .map_err(|e| case.fatal(format!("cannot build HTTP client:\n{}", e)))?;
                probe.check(&case, tc).await
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_inference() {
        let get = EndpointCase {
            url: "/api/v0/info".to_string(),
            ..Default::default()
        };
        assert_eq!(get.effective_method(), Method::GET);

        let post = EndpointCase {
            json_input: Some(json!({"name": "edge1"})),
            ..get.clone()
        };
        assert_eq!(post.effective_method(), Method::POST);

        let put = EndpointCase {
            method: Some(Method::PUT),
            ..post.clone()
        };
        assert_eq!(put.effective_method(), Method::PUT);
    }

    #[test]
    fn test_defaults() {
        let tc = EndpointCase {
            url: "/metrics".to_string(),
            ..Default::default()
        };
        assert_eq!(tc.title(), "/metrics");
        assert_eq!(tc.expected_status(), 200);
        assert_eq!(tc.expected_content_type(), "");
    }

    #[test]
    fn test_json_output_forces_content_type() {
        let tc = EndpointCase {
            description: Some("info".to_string()),
            content_type: "text/plain".to_string(),
            json_output: Some(json!({"version": "dev"})),
            ..Default::default()
        };
        assert_eq!(tc.title(), "info");
        assert_eq!(tc.expected_content_type(), JSON_CONTENT_TYPE);
    }

    #[test]
    fn test_line_text() {
        assert_eq!(line_text(b"hello\r\n"), "hello");
        assert_eq!(line_text(b"hello\n"), "hello");
        assert_eq!(line_text(b"hello"), "hello");
    }
}
