/// External engine client
///
/// The execution engine and the code generator live behind one HTTP service
/// boundary. The client is a trait so the orchestrator's dispatch step can be
/// exercised with a fake; the real implementation posts JSON via a shared
/// reqwest client with a configured timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

use crate::catalog::types::{Component, IoConnector, IoType};
use crate::compiler::plan::ExecutionPlan;
use crate::config::EngineConfig;
use crate::error::{FlowError, Result};

/// Sentinel error string returned instead of failing a request when the
/// engine is switched off by configuration.
pub const ENGINE_IS_DISABLED: &str = "engine is disabled";

/// Engine response for an execution request. Absence of `error` implies
/// success; the output type map is attached by the orchestrator afterwards
/// (the engine returns values only).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub traceback: Option<String>,
    #[serde(default)]
    pub output_results_by_output_name: BTreeMap<String, Value>,
    #[serde(default)]
    pub output_types_by_output_name: BTreeMap<String, IoType>,
}

impl ExecutionResponse {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn disabled_sentinel() -> Self {
        Self {
            error: Some(ENGINE_IS_DISABLED.to_string()),
            ..Self::default()
        }
    }
}

/// Code-generation request: the component's IO signature plus identity
/// metadata, answered with a regenerated code blob.
#[derive(Debug, Clone, Serialize)]
pub struct CodegenRequest {
    pub code: String,
    pub inputs: Vec<IoConnector>,
    pub outputs: Vec<IoConnector>,
    pub name: String,
    pub description: String,
    pub category: String,
    pub id: Uuid,
    pub group_id: Uuid,
    pub tag: String,
}

impl CodegenRequest {
    pub fn for_component(component: &Component) -> Self {
        Self {
            code: component.code.clone(),
            inputs: component.inputs.clone(),
            outputs: component.outputs.clone(),
            name: component.name.clone(),
            description: component.description.clone(),
            category: component.category.clone(),
            id: component.id,
            group_id: component.group_id,
            tag: component.tag.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CodegenResponse {
    code: String,
}

/// Dispatch seam between the orchestrator and the external engine service.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Execute a compiled plan. Implementations return the disabled sentinel
    /// rather than an error when the engine is switched off.
    async fn execute(&self, plan: &ExecutionPlan) -> Result<ExecutionResponse>;

    /// Generate component code for the given signature. With the engine
    /// disabled the submitted code is returned unchanged.
    async fn generate_code(&self, request: &CodegenRequest) -> Result<String>;
}

/// reqwest-backed engine client.
pub struct HttpEngineClient {
    http: reqwest::Client,
    execution_url: String,
    codegen_url: String,
    enabled: bool,
}

impl HttpEngineClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FlowError::Engine(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            execution_url: config.execution_url.clone(),
            codegen_url: config.codegen_url.clone(),
            enabled: config.enabled,
        })
    }
}

#[async_trait]
impl EngineClient for HttpEngineClient {
    async fn execute(&self, plan: &ExecutionPlan) -> Result<ExecutionResponse> {
        if !self.enabled {
            tracing::debug!("{}", ENGINE_IS_DISABLED);
            return Ok(ExecutionResponse::disabled_sentinel());
        }

        tracing::debug!("dispatching execution plan to engine at {}", self.execution_url);
        let response = self
            .http
            .post(&self.execution_url)
            .json(plan)
            .send()
            .await
            .map_err(|e| FlowError::Engine(format!("engine unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FlowError::Engine(format!("engine returned status {}", status)));
        }

        response
            .json::<ExecutionResponse>()
            .await
            .map_err(|e| FlowError::Engine(format!("malformed engine response: {}", e)))
    }

    async fn generate_code(&self, request: &CodegenRequest) -> Result<String> {
        if !self.enabled {
            tracing::debug!("{}, keeping submitted code", ENGINE_IS_DISABLED);
            return Ok(request.code.clone());
        }

        tracing::debug!("generating code for component {}", request.id);
        let response = self
            .http
            .post(&self.codegen_url)
            .json(request)
            .send()
            .await
            .map_err(|e| FlowError::Engine(format!("code generator unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FlowError::Engine(format!("code generator returned status {}", status)));
        }

        let codegen: CodegenResponse = response
            .json()
            .await
            .map_err(|e| FlowError::Engine(format!("malformed code generator response: {}", e)))?;
        Ok(codegen.code)
    }
}
