#![allow(dead_code)]

use async_trait::async_trait;
use panelprobe::errors::PanelError;
use panelprobe::models::{ConnectionResult, Credential, Panel, ProbeTarget, ResultRow};
use panelprobe::services::probe::Prober;
use panelprobe::stores::postgres::{PanelSource, ResultSink};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub fn panel(id: &str, host: &str, logins: &[&str]) -> Panel {
    Panel {
        storage_name: format!("storage {}", id),
        storage_id: id.to_string(),
        storage_code: format!("SC-{}", id),
        url: format!("{}:8080", host),
        logins: logins.iter().map(|s| s.to_string()).collect(),
        panel_id: id.parse().unwrap_or(0),
    }
}

/// Replays canned results per host, in order, and records every call.
#[derive(Default)]
pub struct ScriptedProber {
    scripts: Mutex<HashMap<String, VecDeque<ConnectionResult>>>,
    calls: Mutex<Vec<(String, Credential)>>,
}

impl ScriptedProber {
    pub fn script(self, host: &str, results: Vec<ConnectionResult>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(host.to_string(), results.into());
        self
    }

    pub fn calls(&self) -> Vec<(String, Credential)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, host: &str) -> Vec<Credential> {
        self.calls()
            .into_iter()
            .filter(|(h, _)| h == host)
            .map(|(_, c)| c)
            .collect()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, target: &ProbeTarget, credential: &Credential) -> ConnectionResult {
        self.calls
            .lock()
            .unwrap()
            .push((target.host.clone(), credential.clone()));
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&target.host)
            .and_then(|queue| queue.pop_front())
            .expect("no scripted result left for host")
    }
}

#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<Vec<ResultRow>>,
    fail_storage_ids: Vec<i64>,
}

impl MemorySink {
    pub fn failing_for(ids: &[i64]) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_storage_ids: ids.to_vec(),
        }
    }

    pub fn rows(&self) -> Vec<ResultRow> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn write_result(&self, row: &ResultRow) -> Result<(), PanelError> {
        if self.fail_storage_ids.contains(&row.storage_id) {
            return Err(PanelError::database("insert rejected"));
        }
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }
}

pub struct StaticPanels(pub Result<Vec<Panel>, PanelError>);

#[async_trait]
impl PanelSource for StaticPanels {
    async fn load_panels(&self) -> Result<Vec<Panel>, PanelError> {
        self.0.clone()
    }
}
