//! Tool execution seam and its HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::SynthError;
use crate::tools::{ToolName, ToolOutput};

/// Runs a data tool and returns its raw JSON result.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, tool: ToolName, arguments: &Value) -> Result<Value, SynthError>;
}

/// POSTs `arguments` to `{base}/{tool}` and returns the response body.
pub struct HttpToolExecutor {
    http: Client,
    base: String,
}

impl HttpToolExecutor {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, SynthError> {
        let base = base.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(SynthError::InvalidInput(format!(
                "TOOLS_API_URL must start with http:// or https://, got `{base}`"
            )));
        }
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base: base.to_string(),
        })
    }

    /// `None` when `TOOLS_API_URL` is unset or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, SynthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout = lookup("TOOLS_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(30);
        match lookup("TOOLS_API_URL").filter(|v| !v.trim().is_empty()) {
            Some(url) => Self::new(&url, Duration::from_secs(timeout)).map(Some),
            None => Ok(None),
        }
    }

    pub fn from_env() -> Result<Option<Self>, SynthError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

#[async_trait]
impl ToolExecutor for HttpToolExecutor {
    #[instrument(skip_all, fields(tool = %tool))]
    async fn execute(&self, tool: ToolName, arguments: &Value) -> Result<Value, SynthError> {
        let url = format!("{}/{}", self.base, tool.as_str());
        let resp = self.http.post(&url).json(arguments).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(240).collect();
            return Err(SynthError::Executor(format!("{url} returned {status}: {snippet}")));
        }
        let v: Value = resp.json().await?;
        debug!(target: "viz_synth::executor", %url, "tool result received");
        Ok(v)
    }
}

/// Uses the caller's precomputed `result` when given, otherwise runs the tool.
pub async fn resolve(
    executor: Option<&dyn ToolExecutor>,
    tool: ToolName,
    arguments: &Value,
    result: Option<Value>,
) -> Result<ToolOutput, SynthError> {
    let raw = match (result, executor) {
        (Some(r), _) => r,
        (None, Some(ex)) => ex.execute(tool, arguments).await?,
        (None, None) => {
            return Err(SynthError::InvalidInput(
                "request has no `result` and no tool backend is configured".into(),
            ));
        }
    };
    ToolOutput::decode(tool, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Canned;

    #[async_trait]
    impl ToolExecutor for Canned {
        async fn execute(&self, tool: ToolName, arguments: &Value) -> Result<Value, SynthError> {
            assert_eq!(tool, ToolName::ListLocations);
            Ok(json!({"found": true, "parent": arguments["state"], "locations": []}))
        }
    }

    #[tokio::test]
    async fn precomputed_result_wins() {
        let out = resolve(
            None,
            ToolName::ListLocations,
            &json!({}),
            Some(json!({"found": false})),
        )
        .await
        .unwrap();
        assert!(!out.found());
    }

    #[tokio::test]
    async fn executor_is_used_without_result() {
        let out = resolve(
            Some(&Canned as &dyn ToolExecutor),
            ToolName::ListLocations,
            &json!({"state": "Goa"}),
            None,
        )
        .await
        .unwrap();
        let ToolOutput::ListLocations(r) = out else {
            panic!("wrong variant");
        };
        assert_eq!(r.parent.as_deref(), Some("Goa"));
    }

    #[tokio::test]
    async fn missing_backend_is_invalid_input() {
        let res = resolve(None, ToolName::SearchLocation, &json!({}), None).await;
        assert!(matches!(res, Err(SynthError::InvalidInput(_))));
    }

    #[test]
    fn config_requires_http_url() {
        assert!(HttpToolExecutor::from_lookup(|_| None).unwrap().is_none());
        let res = HttpToolExecutor::from_lookup(|k| (k == "TOOLS_API_URL").then(|| "ftp://x".into()));
        assert!(res.is_err());
        let ok = HttpToolExecutor::from_lookup(|k| (k == "TOOLS_API_URL").then(|| "http://tools:9000/".into()))
            .unwrap()
            .unwrap();
        assert_eq!(ok.base(), "http://tools:9000");
    }
}
