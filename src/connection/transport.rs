//! RPC transport to the remote record store
//!
//! The connector only depends on the [`RpcTransport`] shape: one
//! `authenticate` call yielding a user id and a uniform `execute` call taking
//! a model, a method, positional arguments and keyword arguments.
//! [`JsonRpcTransport`] implements it over HTTP JSON-RPC (`/jsonrpc`), which
//! exposes the same `execute_kw` surface as the XML-RPC endpoint.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::trace;

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, RemoteFault, Result};

/// Authenticated identity used for every `execute` call
#[derive(Clone)]
pub struct SessionHandle {
    pub database: String,
    pub uid: i64,
    pub(crate) password: String,
}

impl SessionHandle {
    pub fn new(database: impl Into<String>, uid: i64, password: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            uid,
            password: password.into(),
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("database", &self.database)
            .field("uid", &self.uid)
            .field("password", &"***")
            .finish()
    }
}

/// Request/response procedure-call boundary of the record store
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Authenticate and return the user id, or `None` when credentials are refused
    async fn authenticate(&self, database: &str, login: &str, password: &str)
    -> Result<Option<i64>>;

    /// Invoke `method` on `model` with positional and keyword arguments
    async fn execute(
        &self,
        session: &SessionHandle,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value>;
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RemoteFault>,
}

/// JSON-RPC 2.0 over HTTP
pub struct JsonRpcTransport {
    client: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl JsonRpcTransport {
    /// Create a transport for the store at `config.url`
    ///
    /// # Arguments
    /// * `config` - Connection configuration (URL and request timeout)
    ///
    /// # Returns
    /// * `Result<Self>` - Transport or error if the HTTP client cannot be built
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConnectionError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/jsonrpc", config.url.trim_end_matches('/')),
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint receiving the calls
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, service: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": { "service": service, "method": method, "args": args },
            "id": id,
        });

        trace!("JSON-RPC #{} {}.{}", id, service, method);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| ConnectionError::Transport(format!("Malformed JSON-RPC reply: {e}")))?;

        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope(envelope: RpcResponse) -> Result<Value> {
    match envelope {
        RpcResponse {
            error: Some(fault), ..
        } => Err(ConnectionError::Remote(fault).into()),
        RpcResponse { result, .. } => Ok(result.unwrap_or(Value::Null)),
    }
}

#[async_trait]
impl RpcTransport for JsonRpcTransport {
    async fn authenticate(
        &self,
        database: &str,
        login: &str,
        password: &str,
    ) -> Result<Option<i64>> {
        let result = self
            .call(
                "common",
                "authenticate",
                vec![json!(database), json!(login), json!(password), json!({})],
            )
            .await?;

        match result {
            Value::Number(n) => Ok(n.as_i64()),
            Value::Bool(false) | Value::Null => Ok(None),
            other => Err(ConnectionError::InvalidResponse {
                model: "common".to_string(),
                message: format!("authenticate returned {other}"),
            }
            .into()),
        }
    }

    async fn execute(
        &self,
        session: &SessionHandle,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value> {
        self.call(
            "object",
            "execute_kw",
            vec![
                json!(session.database),
                json!(session.uid),
                json!(session.password),
                json!(model),
                json!(method),
                Value::Array(args),
                Value::Object(kwargs),
            ],
        )
        .await
    }
}
