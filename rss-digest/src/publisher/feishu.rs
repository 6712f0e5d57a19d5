//! Feishu (Lark) docx client.

use super::blocks::markdown_to_blocks;
use super::{AccessToken, DocumentPlatform};
use crate::config::Credentials;
use crate::retry::{status_error, RetryPolicy};
use crate::types::{AuthFailureKind, DigestError, PublishStep, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn/open-apis";
const MAX_CHILDREN_PER_REQUEST: usize = 50;

#[derive(Debug, Clone)]
pub struct FeishuConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub folder_token: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl FeishuConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials,
            folder_token: None,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

pub struct FeishuClient {
    client: reqwest::Client,
    config: FeishuConfig,
}

impl FeishuClient {
    pub fn new(config: FeishuConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// POST with retries on transient failures, then check the body's `code`.
    ///
    /// `query` is sent unchanged on every attempt.
    async fn post(
        &self,
        step: PublishStep,
        path: &str,
        token: Option<&AccessToken>,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value> {
        let url = self.endpoint(path);
        let url = url.as_str();
        let client = &self.client;
        let label = format!("Feishu {}", step);

        let value = self
            .config
            .retry
            .run(&label, || async move {
                let mut request = client.post(url).query(query).json(body);
                if let Some(token) = token {
                    request = request.bearer_auth(token.secret());
                }
                let response = request.send().await?;
                if !response.status().is_success() {
                    return Err(status_error(url, response).await);
                }
                let value: Value = response.json().await?;
                Ok(value)
            })
            .await
            .map_err(|e| classify(step, e))?;

        let code = value.get("code").and_then(Value::as_i64).unwrap_or(0);
        if code != 0 {
            let msg = value.get("msg").and_then(Value::as_str).unwrap_or("unknown error");
            return Err(rejected(step, None, format!("Feishu code {}: {}", code, msg)));
        }
        Ok(value)
    }
}

/// Map a failed request onto the error class of the step it belongs to.
fn classify(step: PublishStep, e: DigestError) -> DigestError {
    let status = match &e {
        DigestError::Status { status, .. } => Some(*status),
        _ => None,
    };
    let message = e.to_string();

    match status {
        Some(401) | Some(403) => DigestError::Authentication {
            step,
            kind: AuthFailureKind::Rejected,
            status,
            message,
        },
        _ if step == PublishStep::Authenticate => DigestError::Authentication {
            step,
            kind: if e.is_transient() {
                AuthFailureKind::Transient
            } else {
                AuthFailureKind::Rejected
            },
            status,
            message,
        },
        _ => DigestError::DocumentOperation { step, status, message },
    }
}

/// Permanent failure: credentials refused during auth, otherwise a document error.
fn rejected(step: PublishStep, status: Option<u16>, message: String) -> DigestError {
    if step == PublishStep::Authenticate {
        DigestError::Authentication {
            step,
            kind: AuthFailureKind::Rejected,
            status,
            message,
        }
    } else {
        DigestError::DocumentOperation { step, status, message }
    }
}

#[async_trait]
impl DocumentPlatform for FeishuClient {
    fn platform_name(&self) -> String {
        "Feishu".to_string()
    }

    async fn authenticate(&self) -> Result<AccessToken> {
        let credentials = &self.config.credentials;
        let body = json!({
            "app_id": credentials.app_id,
            "app_secret": credentials.app_secret(),
        });
        let value = self
            .post(
                PublishStep::Authenticate,
                "/auth/v3/tenant_access_token/internal",
                None,
                &[],
                &body,
            )
            .await?;

        let token = value
            .get("tenant_access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| rejected(PublishStep::Authenticate, None, "response carried no tenant_access_token".into()))?;

        if let Some(expire) = value.get("expire").and_then(Value::as_u64) {
            debug!("Tenant access token expires in {}s", expire);
        }
        Ok(AccessToken::new(token))
    }

    async fn create_document(&self, token: &AccessToken, title: &str) -> Result<String> {
        let mut body = json!({ "title": title });
        if let Some(folder) = self.config.folder_token.as_deref().filter(|f| !f.is_empty()) {
            body["folder_token"] = json!(folder);
        }

        let value = self
            .post(PublishStep::CreateDocument, "/docx/v1/documents", Some(token), &[], &body)
            .await?;

        value
            .pointer("/data/document/document_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DigestError::DocumentOperation {
                step: PublishStep::CreateDocument,
                status: None,
                message: "response carried no document_id".into(),
            })
    }

    async fn write_content(&self, token: &AccessToken, document_id: &str, markdown: &str) -> Result<()> {
        let blocks = markdown_to_blocks(markdown);
        let path = format!("/docx/v1/documents/{0}/blocks/{0}/children", document_id);
        let batches = blocks.len().div_ceil(MAX_CHILDREN_PER_REQUEST);

        for (batch, children) in blocks.chunks(MAX_CHILDREN_PER_REQUEST).enumerate() {
            let body = json!({
                "children": children,
                "index": batch * MAX_CHILDREN_PER_REQUEST,
            });
            // One token per batch, shared by all of its retries.
            let client_token = Uuid::new_v4().to_string();
            self.post(
                PublishStep::WriteContent,
                &path,
                Some(token),
                &[("client_token", client_token.as_str())],
                &body,
            )
            .await?;
            debug!("Wrote block batch {}/{} to {}", batch + 1, batches, document_id);
        }

        info!("Wrote {} blocks in {} requests", blocks.len(), batches);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> DigestError {
        DigestError::Status {
            url: "https://open.feishu.cn".into(),
            status: code,
            detail: None,
        }
    }

    #[test]
    fn forbidden_is_an_authentication_failure_on_any_step() {
        let err = classify(PublishStep::CreateDocument, status(403));
        assert!(matches!(
            err,
            DigestError::Authentication {
                step: PublishStep::CreateDocument,
                kind: AuthFailureKind::Rejected,
                status: Some(403),
                ..
            }
        ));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn exhausted_server_errors_during_auth_are_transient() {
        let err = classify(PublishStep::Authenticate, status(503));
        assert!(matches!(
            err,
            DigestError::Authentication {
                kind: AuthFailureKind::Transient,
                ..
            }
        ));
    }

    #[test]
    fn other_client_errors_are_document_failures() {
        let err = classify(PublishStep::WriteContent, status(400));
        assert!(matches!(
            err,
            DigestError::DocumentOperation {
                step: PublishStep::WriteContent,
                status: Some(400),
                ..
            }
        ));
        assert_eq!(err.exit_code(), 5);
    }
}
