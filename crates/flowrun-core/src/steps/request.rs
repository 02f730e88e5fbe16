//! HTTP request step handler.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use flowrun_workflow::{
    HttpMethod, Step, StepConfig, StepError, StepRunResult, StepType, ERROR_PORT, SUCCESS_PORT,
};

use super::{config_mismatch, SharedState, StepHandler};
use crate::error::EngineError;
use crate::security::validate_safe_url;

/// Makes HTTP requests to external services.
///
/// Writes `response` (parsed JSON or raw text), `status_code` and
/// `response_headers` to state, then fires `success` for status < 400 and
/// `error` otherwise. Transport failures produce ERROR results with codes
/// `TIMEOUT`, `REQUEST_ERROR` or `INVALID_URL`, all routed along `error`.
pub struct RequestHandler {
    client: reqwest::Client,
    allow_private_hosts: bool,
}

impl RequestHandler {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            allow_private_hosts: false,
        }
    }

    /// Skip the private-address URL checks. For embedders that deliberately
    /// target local services, and for tests against local mock servers.
    pub fn allow_private_hosts(mut self) -> Self {
        self.allow_private_hosts = true;
        self
    }

    fn method(&self, method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl Default for RequestHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn error_result(step: &Step, message: String, code: &str) -> StepRunResult {
    StepRunResult::failure(step.id, message, code)
        .with_fired_ports(vec![ERROR_PORT.to_string()])
}

#[async_trait]
impl StepHandler for RequestHandler {
    fn step_type(&self) -> StepType {
        StepType::Request
    }

    async fn run(
        &self,
        step: &Step,
        state: &SharedState,
        config: &StepConfig,
    ) -> Result<StepRunResult, EngineError> {
        let StepConfig::Request(config) = config else {
            return Err(config_mismatch(StepType::Request));
        };

        let url = config.url.as_value().cloned().unwrap_or_default();

        if !self.allow_private_hosts {
            if let Err(e) = validate_safe_url(&url) {
                return Ok(error_result(step, e.to_string(), StepError::INVALID_URL));
            }
        }

        let timeout = Duration::from_secs(config.timeout_secs.clamp(1, 300));
        let mut request = self
            .client
            .request(self.method(config.method), &url)
            .timeout(timeout);

        let mut has_content_type = false;
        for (name, value) in &config.headers {
            if name.eq_ignore_ascii_case("content-type") {
                has_content_type = true;
            }
            request = request.header(name.as_str(), value.as_value().cloned().unwrap_or_default());
        }

        if let Some(body) = &config.body {
            if config.method.allows_body() {
                if !has_content_type {
                    request = request.header(reqwest::header::CONTENT_TYPE, "application/json");
                }
                request = request.body(body.as_value().cloned().unwrap_or_default());
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(error_result(
                    step,
                    "Request timed out".to_string(),
                    StepError::TIMEOUT,
                ));
            }
            Err(e) => {
                return Ok(error_result(
                    step,
                    format!("Request failed: {e}"),
                    StepError::REQUEST_ERROR,
                ));
            }
        };

        let status_code = response.status().as_u16();
        let mut response_headers = serde_json::Map::new();
        for (name, value) in response.headers() {
            response_headers.insert(
                name.to_string(),
                Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            );
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return Ok(error_result(
                    step,
                    format!("Request failed: {e}"),
                    StepError::REQUEST_ERROR,
                ));
            }
        };
        // JSON where possible, raw text otherwise.
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        {
            let mut state = state.write();
            state.set("response", body.clone())?;
            state.set("status_code", i64::from(status_code))?;
            state.set("response_headers", Value::Object(response_headers.clone()))?;
        }

        let port = if status_code >= 400 { ERROR_PORT } else { SUCCESS_PORT };
        let output: HashMap<String, Value> = HashMap::from([
            ("response".to_string(), body),
            ("status_code".to_string(), Value::from(status_code)),
            ("response_headers".to_string(), Value::Object(response_headers)),
        ]);

        let mut result = StepRunResult::success(step.id).with_fired_ports(vec![port.to_string()]);
        result.output_data = Some(output);
        Ok(result)
    }
}
