/// Execution orchestrator
///
/// Drives one execution request end-to-end: Resolve (fetch the root item and
/// the transitive closure of everything it references), Compile (flatten into
/// an execution plan), Dispatch (hand the plan to the engine client) and
/// MapResult (attach the output type map the engine does not return). Both
/// the synchronous REST path and the async job channel go through here.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::storage::CatalogStorage;
use crate::catalog::types::{Component, ItemKind, ItemState, Wiring, Workflow};
use crate::compiler::plan::{compile, ExecutionPlan};
use crate::compiler::{ItemIndex, ItemRef};
use crate::error::{FlowError, Result};
use crate::runtime::engine::{EngineClient, ExecutionResponse};

/// Caller-supplied configuration override, carried verbatim from the async
/// channel's configuration block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub name: Option<Uuid>,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub run_pure_plot_operators: bool,
}

pub struct Orchestrator {
    storage: CatalogStorage,
    engine: Arc<dyn EngineClient>,
}

impl Orchestrator {
    pub fn new(storage: CatalogStorage, engine: Arc<dyn EngineClient>) -> Self {
        Self { storage, engine }
    }

    /// Execute a workflow with the given wiring.
    ///
    /// `config`, when present, overrides the compiled plan's configuration
    /// block (the async channel supplies one per job).
    pub async fn execute_workflow(
        &self,
        workflow_id: Uuid,
        wiring: &Wiring,
        config: Option<&RunConfig>,
        run_pure_plot_operators: bool,
    ) -> Result<ExecutionResponse> {
        let workflow = self
            .storage
            .get_workflow(workflow_id)
            .await?
            .ok_or(FlowError::WorkflowNotFound(workflow_id))?;

        let (components, workflows) = self.resolve_closure(&workflow).await?;
        tracing::debug!(
            "resolved closure for workflow {}: {} components, {} workflows",
            workflow_id,
            components.len(),
            workflows.len()
        );

        let items = ItemIndex::new(&components, &workflows);
        let mut plan = compile(ItemRef::Workflow(workflow_id), wiring, &items, run_pure_plot_operators)?;
        if let Some(config) = config {
            apply_run_config(&mut plan, config);
        }

        tracing::info!("dispatching workflow {} to engine", workflow_id);
        let mut response = self.engine.execute(&plan).await?;
        attach_output_types(&plan, &mut response);
        Ok(response)
    }

    /// Execute a single component by wrapping it into a synthetic workflow.
    pub async fn execute_component(
        &self,
        component_id: Uuid,
        wiring: &Wiring,
        run_pure_plot_operators: bool,
    ) -> Result<ExecutionResponse> {
        let component = self
            .storage
            .get_component(component_id)
            .await?
            .ok_or(FlowError::ComponentNotFound(component_id))?;

        let mut components = HashMap::new();
        components.insert(component_id, component);
        let workflows = HashMap::new();

        let items = ItemIndex::new(&components, &workflows);
        let plan = compile(ItemRef::Component(component_id), wiring, &items, run_pure_plot_operators)?;

        tracing::info!("dispatching component {} to engine", component_id);
        let mut response = self.engine.execute(&plan).await?;
        attach_output_types(&plan, &mut response);
        Ok(response)
    }

    /// Depth-first walk of the operator references building the closure maps,
    /// memoized by id so shared sub-items are fetched once.
    ///
    /// Draft components get a fresh random id substituted so the engine never
    /// caches draft code under its mutable id; the map stays keyed by the
    /// persisted id so operator references keep resolving.
    async fn resolve_closure(
        &self,
        root: &Workflow,
    ) -> Result<(HashMap<Uuid, Component>, HashMap<Uuid, Workflow>)> {
        let mut workflows: HashMap<Uuid, Workflow> = HashMap::new();
        let mut component_ids: HashSet<Uuid> = HashSet::new();
        let mut queue = vec![root.id];
        workflows.insert(root.id, root.clone());

        while let Some(id) = queue.pop() {
            let operators = workflows[&id].operators.clone();
            for operator in operators {
                match operator.kind {
                    ItemKind::Component => {
                        component_ids.insert(operator.item_id);
                    }
                    ItemKind::Workflow => {
                        if !workflows.contains_key(&operator.item_id) {
                            let nested = self
                                .storage
                                .get_workflow(operator.item_id)
                                .await?
                                .ok_or(FlowError::WorkflowNotFound(operator.item_id))?;
                            workflows.insert(operator.item_id, nested);
                            queue.push(operator.item_id);
                        }
                    }
                }
            }
        }

        let ids: Vec<Uuid> = component_ids.into_iter().collect();
        let mut components = self.storage.get_components_by_ids(&ids).await?;
        for component in components.values_mut() {
            if component.state == ItemState::Draft {
                component.id = Uuid::new_v4();
            }
        }

        Ok((components, workflows))
    }
}

fn apply_run_config(plan: &mut ExecutionPlan, config: &RunConfig) {
    if let Some(name) = config.name {
        plan.configuration.plan_id = name;
    }
    if let Some(engine) = &config.engine {
        plan.configuration.engine = engine.clone();
    }
    plan.configuration.run_pure_plot_operators = config.run_pure_plot_operators;
}

/// MapResult step: the engine returns output values only, so derive the
/// output-name -> type map from the compiled plan's boundary outputs.
fn attach_output_types(plan: &ExecutionPlan, response: &mut ExecutionResponse) {
    if !response.success() {
        return;
    }
    response.output_types_by_output_name = plan
        .node
        .outputs
        .iter()
        .filter_map(|io| io.name.clone().map(|name| (name, io.io_type)))
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{IoConnector, IoType, WorkflowIo, WorkflowLink, WorkflowOperator};
    use crate::config::EngineConfig;
    use crate::runtime::engine::{CodegenRequest, HttpEngineClient, ENGINE_IS_DISABLED};
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Mutex;

    /// Captures dispatched plans and answers with a canned success.
    struct FakeEngine {
        plans: Mutex<Vec<ExecutionPlan>>,
    }

    impl FakeEngine {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                plans: Mutex::new(Vec::new()),
            })
        }

        fn last_plan(&self) -> ExecutionPlan {
            self.plans.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl EngineClient for FakeEngine {
        async fn execute(&self, plan: &ExecutionPlan) -> Result<ExecutionResponse> {
            self.plans.lock().unwrap().push(plan.clone());
            let mut response = ExecutionResponse::default();
            response
                .output_results_by_output_name
                .insert("c_out".to_string(), serde_json::json!(1.5));
            Ok(response)
        }

        async fn generate_code(&self, request: &CodegenRequest) -> Result<String> {
            Ok(request.code.clone())
        }
    }

    fn connector(name: &str) -> IoConnector {
        IoConnector {
            id: Uuid::new_v4(),
            name: name.to_string(),
            io_type: IoType::Float,
            pos_x: 0,
            pos_y: 0,
        }
    }

    fn component(name: &str, state: ItemState, inputs: Vec<IoConnector>, outputs: Vec<IoConnector>) -> Component {
        Component {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            category: "Test".to_string(),
            tag: "1.0.0".to_string(),
            state,
            inputs,
            outputs,
            code: "def main():\n    pass\n".to_string(),
            wirings: vec![],
        }
    }

    fn empty_wiring() -> Wiring {
        Wiring {
            id: Uuid::new_v4(),
            name: "test".to_string(),
            input_wirings: vec![],
            output_wirings: vec![],
        }
    }

    async fn memory_storage() -> CatalogStorage {
        // single connection: each pooled in-memory connection would otherwise
        // get its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let storage = CatalogStorage::new(pool);
        storage.init_schema().await.unwrap();
        storage
    }

    /// Producer -> consumer workflow with one named boundary output on the
    /// producer's second connector.
    async fn seed_workflow(storage: &CatalogStorage, producer_state: ItemState) -> (Uuid, Uuid) {
        let producer = component(
            "producer",
            producer_state,
            vec![],
            vec![connector("c"), connector("extra")],
        );
        let consumer = component("consumer", ItemState::Released, vec![connector("c")], vec![]);

        let producer_op = WorkflowOperator {
            id: Uuid::new_v4(),
            item_id: producer.id,
            kind: ItemKind::Component,
            name: producer.name.clone(),
            pos_x: 0,
            pos_y: 0,
        };
        let consumer_op = WorkflowOperator {
            id: Uuid::new_v4(),
            item_id: consumer.id,
            kind: ItemKind::Component,
            name: consumer.name.clone(),
            pos_x: 0,
            pos_y: 0,
        };

        let workflow = Workflow {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            name: "pipeline".to_string(),
            description: String::new(),
            category: "Test".to_string(),
            tag: "1.0.0".to_string(),
            state: ItemState::Draft,
            links: vec![WorkflowLink {
                id: Uuid::new_v4(),
                from_operator: producer_op.id,
                from_connector: producer.outputs[0].id,
                to_operator: consumer_op.id,
                to_connector: consumer.inputs[0].id,
                path: vec![],
            }],
            inputs: vec![],
            outputs: vec![WorkflowIo {
                id: Uuid::new_v4(),
                name: Some("c_out".to_string()),
                io_type: IoType::Float,
                pos_x: 0,
                pos_y: 0,
                operator: producer_op.id,
                connector: producer.outputs[1].id,
                constant: false,
                constant_value: None,
            }],
            operators: vec![producer_op, consumer_op],
            wirings: vec![],
        };

        let producer_id = producer.id;
        storage.save_component(&producer).await.unwrap();
        storage.save_component(&consumer).await.unwrap();
        storage.save_workflow(&workflow).await.unwrap();
        (workflow.id, producer_id)
    }

    #[tokio::test]
    async fn workflow_execution_attaches_output_types() {
        let storage = memory_storage().await;
        let (workflow_id, _) = seed_workflow(&storage, ItemState::Released).await;
        let engine = FakeEngine::new();
        let orchestrator = Orchestrator::new(storage, engine.clone());

        let response = orchestrator
            .execute_workflow(workflow_id, &empty_wiring(), None, false)
            .await
            .unwrap();

        assert!(response.success());
        assert_eq!(
            response.output_types_by_output_name.get("c_out"),
            Some(&IoType::Float)
        );

        let plan = engine.last_plan();
        assert_eq!(plan.node.sub_nodes.len(), 2);
        assert_eq!(plan.node.connections.len(), 1);
        assert_eq!(plan.configuration.plan_id, workflow_id);
    }

    #[tokio::test]
    async fn draft_components_get_fresh_ids_in_the_plan() {
        let storage = memory_storage().await;
        let (workflow_id, producer_id) = seed_workflow(&storage, ItemState::Draft).await;
        let engine = FakeEngine::new();
        let orchestrator = Orchestrator::new(storage, engine.clone());

        orchestrator
            .execute_workflow(workflow_id, &empty_wiring(), None, false)
            .await
            .unwrap();

        let plan = engine.last_plan();
        // the draft's code module is keyed under a substituted id
        assert!(plan.code_modules.iter().all(|module| module.id != producer_id));
        // component metadata and code modules stay consistent
        for entry in &plan.components {
            assert!(plan.code_modules.iter().any(|module| module.id == entry.code_module_id));
        }
    }

    #[tokio::test]
    async fn run_config_overrides_the_plan_configuration() {
        let storage = memory_storage().await;
        let (workflow_id, _) = seed_workflow(&storage, ItemState::Released).await;
        let engine = FakeEngine::new();
        let orchestrator = Orchestrator::new(storage, engine.clone());

        let job_name = Uuid::new_v4();
        let config = RunConfig {
            name: Some(job_name),
            engine: Some("plain".to_string()),
            run_pure_plot_operators: true,
        };
        orchestrator
            .execute_workflow(workflow_id, &empty_wiring(), Some(&config), false)
            .await
            .unwrap();

        let plan = engine.last_plan();
        assert_eq!(plan.configuration.plan_id, job_name);
        assert!(plan.configuration.run_pure_plot_operators);
    }

    #[tokio::test]
    async fn nested_workflows_are_resolved_through_the_closure() {
        let storage = memory_storage().await;
        let (child_id, _) = seed_workflow(&storage, ItemState::Released).await;
        let child = storage.get_workflow(child_id).await.unwrap().unwrap();

        let parent = Workflow {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            name: "parent".to_string(),
            description: String::new(),
            category: "Test".to_string(),
            tag: "1.0.0".to_string(),
            state: ItemState::Draft,
            operators: vec![WorkflowOperator {
                id: Uuid::new_v4(),
                item_id: child.id,
                kind: ItemKind::Workflow,
                name: child.name.clone(),
                pos_x: 0,
                pos_y: 0,
            }],
            links: vec![],
            inputs: vec![],
            outputs: vec![],
            wirings: vec![],
        };
        storage.save_workflow(&parent).await.unwrap();

        let engine = FakeEngine::new();
        let orchestrator = Orchestrator::new(storage, engine.clone());

        let response = orchestrator
            .execute_workflow(parent.id, &empty_wiring(), None, false)
            .await
            .unwrap();
        assert!(response.success());

        // the nested workflow and its components were fetched transitively
        let plan = engine.last_plan();
        assert_eq!(plan.code_modules.len(), 2);
        match &plan.node.sub_nodes[0] {
            crate::compiler::plan::PlanNode::Workflow(node) => {
                assert_eq!(node.sub_nodes.len(), 2);
            }
            crate::compiler::plan::PlanNode::Component(_) => panic!("expected nested workflow node"),
        }
    }

    #[tokio::test]
    async fn unknown_workflow_is_not_found() {
        let storage = memory_storage().await;
        let orchestrator = Orchestrator::new(storage, FakeEngine::new());

        let err = orchestrator
            .execute_workflow(Uuid::new_v4(), &empty_wiring(), None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::WorkflowNotFound(_)));
    }

    #[tokio::test]
    async fn component_execution_wraps_and_dispatches() {
        let storage = memory_storage().await;
        let comp = component("solo", ItemState::Released, vec![connector("x")], vec![connector("y")]);
        storage.save_component(&comp).await.unwrap();
        let engine = FakeEngine::new();
        let orchestrator = Orchestrator::new(storage, engine.clone());

        let response = orchestrator
            .execute_component(comp.id, &empty_wiring(), false)
            .await
            .unwrap();

        assert!(response.success());
        assert_eq!(response.output_types_by_output_name.get("y"), Some(&IoType::Float));
        let plan = engine.last_plan();
        assert_eq!(plan.node.sub_nodes.len(), 1);
        assert_eq!(plan.code_modules.len(), 1);
    }

    #[tokio::test]
    async fn disabled_engine_returns_the_sentinel() {
        let config = EngineConfig {
            execution_url: "http://localhost:9999/engine".to_string(),
            codegen_url: "http://localhost:9999/codegen".to_string(),
            enabled: false,
            timeout_secs: 5,
        };
        let client = HttpEngineClient::new(&config).unwrap();

        let storage = memory_storage().await;
        let (workflow_id, _) = seed_workflow(&storage, ItemState::Released).await;
        let orchestrator = Orchestrator::new(storage, Arc::new(client));

        let response = orchestrator
            .execute_workflow(workflow_id, &empty_wiring(), None, false)
            .await
            .unwrap();

        assert_eq!(response.error.as_deref(), Some(ENGINE_IS_DISABLED));
        // failure result: no types attached
        assert!(response.output_types_by_output_name.is_empty());
    }
}
