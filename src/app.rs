use crate::errors::PanelError;
use crate::managers::dispatcher::{Dispatcher, RunSummary};
use crate::services::job::Job;
use crate::services::logger::Logger;
use crate::services::probe::{HttpProber, Prober};
use crate::services::settings::Settings;
use crate::stores::postgres::{PanelSource, PgStore, ResultSink};
use crate::stores::schedule::Schedule;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub panels: Arc<dyn PanelSource>,
    pub dispatcher: Dispatcher,
}

impl App {
    pub fn new(
        logger: Logger,
        panels: Arc<dyn PanelSource>,
        prober: Arc<dyn Prober>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        let dispatcher = Dispatcher::new(logger.clone(), prober, sink);
        Self {
            logger,
            panels,
            dispatcher,
        }
    }

    pub async fn initialize(settings: Settings) -> Result<Self, PanelError> {
        let logger = Logger::new("panelprobe");
        let store = Arc::new(
            PgStore::connect(
                logger.clone(),
                settings.database.clone(),
                Some(settings.db_connect_timeout_ms),
            )
            .await?,
        );
        let prober = Arc::new(HttpProber::new(logger.clone(), settings.probe_timeout_ms)?);
        let mut app = Self::new(logger, store.clone(), prober, store);
        app.dispatcher = app.dispatcher.with_retry_mode(settings.auth_retry_mode);
        Ok(app)
    }

    /// Loads the panel list, probes every panel and writes one row per
    /// finished job. Failing to load the panel list aborts the run.
    pub async fn run(&self) -> Result<RunSummary, PanelError> {
        let panels = self.panels.load_panels().await.map_err(|err| {
            self.logger.error(
                "failed to load panel list",
                Some(&serde_json::to_value(&err).unwrap_or_default()),
            );
            err
        })?;
        let mut schedule = Schedule::new(panels.into_iter().map(Job::new));
        self.logger.info(
            "run started",
            Some(&serde_json::json!({
                "run_id": schedule.run_id(),
                "panels": schedule.initial_count(),
                "started_at": schedule.started_at().to_rfc3339(),
            })),
        );
        let summary = self.dispatcher.run(&mut schedule).await;
        self.logger.info(
            &format!("completed in {:.1}s", summary.elapsed_s),
            Some(&self.logger.stats()),
        );
        Ok(summary)
    }
}

pub async fn run_from_env() -> Result<RunSummary, PanelError> {
    let settings = Settings::from_env()?;
    let app = App::initialize(settings).await?;
    app.run().await
}
