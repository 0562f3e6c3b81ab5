use crate::constants::{network as network_constants, persistence as persistence_constants};
use crate::errors::PanelError;
use crate::models::{Panel, ResultRow};
use crate::services::logger::Logger;
use async_trait::async_trait;
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use std::time::Duration;
use tokio_postgres::types::Json;
use tokio_postgres::{Config, NoTls, Row};

#[async_trait]
pub trait PanelSource: Send + Sync {
    async fn load_panels(&self) -> Result<Vec<Panel>, PanelError>;
}

/// Receives finished jobs in the order their attempts completed.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn write_result(&self, row: &ResultRow) -> Result<(), PanelError>;
}

#[derive(Clone)]
pub struct PgStore {
    logger: Logger,
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

impl PgStore {
    pub async fn connect(
        logger: Logger,
        config: Config,
        connect_timeout_ms: Option<u64>,
    ) -> Result<Self, PanelError> {
        let manager = PostgresConnectionManager::new(config, NoTls);
        // One connection: writes are awaited one after another anyway.
        let pool = Pool::builder()
            .max_size(persistence_constants::POOL_MAX_SIZE)
            .connection_timeout(Duration::from_millis(
                connect_timeout_ms.unwrap_or(network_constants::TIMEOUT_CONNECTION_MS),
            ))
            .build(manager)
            .await
            .map_err(map_pool_error)?;
        Ok(Self {
            logger: logger.child("psql"),
            pool,
        })
    }
}

#[async_trait]
impl PanelSource for PgStore {
    async fn load_panels(&self) -> Result<Vec<Panel>, PanelError> {
        let conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = conn
            .query(persistence_constants::PANEL_LIST_SQL, &[])
            .await?;
        let panels = rows.iter().map(row_to_panel).collect::<Result<Vec<_>, _>>()?;
        self.logger.info(
            "loaded panel list",
            Some(&serde_json::json!({ "panels": panels.len() })),
        );
        Ok(panels)
    }
}

#[async_trait]
impl ResultSink for PgStore {
    async fn write_result(&self, row: &ResultRow) -> Result<(), PanelError> {
        let conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.execute(
            persistence_constants::INSERT_RESULT_SQL,
            &[
                &row.storage_id,
                &row.storage_code,
                &row.query_time,
                &row.response_bytes,
                &row.latency_ms,
                &Json(&row.result),
            ],
        )
        .await?;
        Ok(())
    }
}

fn row_to_panel(row: &Row) -> Result<Panel, PanelError> {
    let column = |name: &str, err: tokio_postgres::Error| {
        PanelError::database(format!("Unexpected storage_monitor_list.{}: {}", name, err))
    };
    Ok(Panel {
        storage_name: row
            .try_get::<_, Option<String>>("storage_name")
            .map_err(|err| column("storage_name", err))?
            .unwrap_or_default(),
        storage_id: row
            .try_get::<_, String>("storage_id")
            .map_err(|err| column("storage_id", err))?,
        storage_code: row
            .try_get::<_, Option<String>>("storage_code")
            .map_err(|err| column("storage_code", err))?
            .unwrap_or_default(),
        url: row
            .try_get::<_, String>("url")
            .map_err(|err| column("url", err))?,
        logins: row
            .try_get::<_, Option<Vec<String>>>("logins")
            .map_err(|err| column("logins", err))?
            .unwrap_or_default(),
        panel_id: row
            .try_get::<_, i32>("panel_id")
            .map_err(|err| column("panel_id", err))?,
    })
}

fn map_pool_error<E: std::fmt::Display>(err: E) -> PanelError {
    PanelError::database(format!("PostgreSQL pool error: {}", err))
}
