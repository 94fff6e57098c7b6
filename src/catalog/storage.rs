/// SQLite persistence layer for the catalog
///
/// Handles component, workflow and wiring CRUD in SQLite. Items are stored as
/// JSON definition columns for flexibility while keeping indexed lookup
/// fields; the rest of the crate never touches SQL types.

use sqlx::{sqlite::SqlitePool, Row};
use std::collections::HashMap;
use uuid::Uuid;

use crate::catalog::types::{Component, Wiring, Workflow};
use crate::error::Result;

/// SQLite-backed storage for catalog items.
///
/// All three tables share the same shape: primary-key id, indexed name, JSON
/// definition, created/updated timestamps. Safe to initialize repeatedly.
#[derive(Debug, Clone)]
pub struct CatalogStorage {
    pool: SqlitePool,
}

/// Basic item metadata for listing operations.
#[derive(Debug, serde::Serialize)]
pub struct ItemSummary {
    pub id: String,
    pub name: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl CatalogStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes. Uses IF NOT EXISTS, safe to call on every
    /// startup.
    pub async fn init_schema(&self) -> Result<()> {
        for table in ["components", "workflows", "wirings"] {
            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    definition JSON NOT NULL,
                    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                )
                "#
            ))
            .execute(&self.pool)
            .await?;

            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_name ON {table}(name)"
            ))
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Store a new component or update an existing one (upsert).
    pub async fn save_component(&self, component: &Component) -> Result<()> {
        self.upsert("components", component.id, &component.name, serde_json::to_string(component)?)
            .await
    }

    pub async fn get_component(&self, id: Uuid) -> Result<Option<Component>> {
        self.get_definition("components", id).await
    }

    /// Load the given components into an id-keyed map. Missing ids are simply
    /// absent from the result; callers decide whether that is an error.
    pub async fn get_components_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Component>> {
        let mut components = HashMap::new();
        for id in ids {
            if let Some(component) = self.get_component(*id).await? {
                components.insert(*id, component);
            }
        }
        Ok(components)
    }

    pub async fn list_components(&self) -> Result<Vec<ItemSummary>> {
        self.list("components").await
    }

    pub async fn delete_component(&self, id: Uuid) -> Result<bool> {
        self.delete("components", id).await
    }

    pub async fn save_workflow(&self, workflow: &Workflow) -> Result<()> {
        self.upsert("workflows", workflow.id, &workflow.name, serde_json::to_string(workflow)?)
            .await
    }

    pub async fn get_workflow(&self, id: Uuid) -> Result<Option<Workflow>> {
        self.get_definition("workflows", id).await
    }

    pub async fn get_workflows_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Workflow>> {
        let mut workflows = HashMap::new();
        for id in ids {
            if let Some(workflow) = self.get_workflow(*id).await? {
                workflows.insert(*id, workflow);
            }
        }
        Ok(workflows)
    }

    pub async fn list_workflows(&self) -> Result<Vec<ItemSummary>> {
        self.list("workflows").await
    }

    pub async fn delete_workflow(&self, id: Uuid) -> Result<bool> {
        self.delete("workflows", id).await
    }

    pub async fn save_wiring(&self, wiring: &Wiring) -> Result<()> {
        self.upsert("wirings", wiring.id, &wiring.name, serde_json::to_string(wiring)?)
            .await
    }

    pub async fn get_wiring(&self, id: Uuid) -> Result<Option<Wiring>> {
        self.get_definition("wirings", id).await
    }

    pub async fn list_wirings(&self) -> Result<Vec<Wiring>> {
        let rows = sqlx::query("SELECT definition FROM wirings ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        let mut wirings = Vec::new();
        for row in rows {
            let definition_json: String = row.get("definition");
            wirings.push(serde_json::from_str(&definition_json)?);
        }
        Ok(wirings)
    }

    async fn upsert(&self, table: &str, id: Uuid, name: &str, definition_json: String) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO {table} (id, name, definition, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                definition = excluded.definition,
                updated_at = CURRENT_TIMESTAMP
            "#
        ))
        .bind(id.to_string())
        .bind(name)
        .bind(definition_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_definition<T: serde::de::DeserializeOwned>(&self, table: &str, id: Uuid) -> Result<Option<T>> {
        let row = sqlx::query(&format!("SELECT definition FROM {table} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let definition_json: String = row.get("definition");
                Ok(Some(serde_json::from_str(&definition_json)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, table: &str) -> Result<Vec<ItemSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT id, name, created_at, updated_at FROM {table} ORDER BY updated_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(ItemSummary {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            });
        }
        Ok(summaries)
    }

    async fn delete(&self, table: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{IoType, ItemState, IoConnector};

    async fn memory_storage() -> CatalogStorage {
        // single connection: each pooled in-memory connection would otherwise
        // get its own database
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let storage = CatalogStorage::new(pool);
        storage.init_schema().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn component_round_trip() {
        let storage = memory_storage().await;

        let component = Component {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            name: "alerts".to_string(),
            description: "threshold alerts".to_string(),
            category: "Anomaly Detection".to_string(),
            tag: "1.0.0".to_string(),
            state: ItemState::Draft,
            inputs: vec![IoConnector {
                id: Uuid::new_v4(),
                name: "threshold".to_string(),
                io_type: IoType::Float,
                pos_x: 100,
                pos_y: 40,
            }],
            outputs: vec![],
            code: "def main(*, threshold):\n    pass\n".to_string(),
            wirings: vec![],
        };

        storage.save_component(&component).await.unwrap();
        let loaded = storage.get_component(component.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "alerts");
        assert_eq!(loaded.inputs.len(), 1);
        assert_eq!(loaded.state, ItemState::Draft);

        assert!(storage.delete_component(component.id).await.unwrap());
        assert!(storage.get_component(component.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_definition() {
        let storage = memory_storage().await;

        let mut workflow = Workflow {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            name: "pipeline".to_string(),
            description: String::new(),
            category: "Examples".to_string(),
            tag: "1.0.0".to_string(),
            state: ItemState::Draft,
            operators: vec![],
            links: vec![],
            inputs: vec![],
            outputs: vec![],
            wirings: vec![],
        };

        storage.save_workflow(&workflow).await.unwrap();
        workflow.name = "pipeline v2".to_string();
        storage.save_workflow(&workflow).await.unwrap();

        let loaded = storage.get_workflow(workflow.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "pipeline v2");
        assert_eq!(storage.list_workflows().await.unwrap().len(), 1);
    }
}
