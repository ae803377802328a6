use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use slk_core::{
    advances, max_last_edited, EntityKind, LocalRecord, LocalStore, Notifier, ReconcilePlan,
    RemoteRecord, StagedWrite, Watermark, WatermarkStore,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// In-memory [`LocalStore`] + [`WatermarkStore`] with the same semantics as
/// the Postgres implementation: atomic per-record writes, watermark upsert
/// that never regresses, empty-batch advance as a no-op.
#[derive(Debug, Default)]
pub struct MemStore {
    records: Mutex<HashMap<EntityKind, Vec<LocalRecord>>>,
    next_id: Mutex<i64>,
    watermarks: Mutex<BTreeMap<String, Watermark>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(1),
            ..Self::default()
        }
    }

    /// Seed one local record, assigning the next id. Returns the id.
    pub fn seed(&self, entity: EntityKind, fields: &[(&str, Value)]) -> i64 {
        let mut next = self.next_id.lock().expect("next_id lock");
        let id = *next;
        *next += 1;
        let mut rec = LocalRecord::new(id);
        for (field, value) in fields {
            rec.fields.insert((*field).to_string(), value.clone());
        }
        self.records
            .lock()
            .expect("records lock")
            .entry(entity)
            .or_default()
            .push(rec);
        id
    }

    /// Seed a watermark directly (for incremental-run scenarios).
    pub fn seed_watermark(&self, job_name: &str, external_key: &str, last_edited: &str) {
        self.watermarks.lock().expect("watermarks lock").insert(
            job_name.to_string(),
            Watermark {
                job_name: job_name.to_string(),
                external_key: external_key.to_string(),
                external_last_edited: last_edited.to_string(),
            },
        );
    }

    /// Snapshot of one collection, for assertions.
    pub fn snapshot(&self, entity: EntityKind) -> Vec<LocalRecord> {
        self.records
            .lock()
            .expect("records lock")
            .get(&entity)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of one watermark, for assertions.
    pub fn watermark(&self, job_name: &str) -> Option<Watermark> {
        self.watermarks
            .lock()
            .expect("watermarks lock")
            .get(job_name)
            .cloned()
    }
}

#[async_trait]
impl LocalStore for MemStore {
    async fn column(&self, entity: EntityKind, field: &str) -> Result<Vec<String>> {
        Ok(self
            .snapshot(entity)
            .iter()
            .map(|r| r.get_str(field).unwrap_or_default())
            .collect())
    }

    async fn load_all(&self, entity: EntityKind) -> Result<Vec<LocalRecord>> {
        Ok(self.snapshot(entity))
    }

    async fn apply(&self, entity: EntityKind, plan: &ReconcilePlan) -> Result<()> {
        let mut records = self.records.lock().expect("records lock");
        let collection = records.entry(entity).or_default();
        for write in &plan.writes {
            match write {
                StagedWrite::Update { id, fields } => {
                    if let Some(rec) = collection.iter_mut().find(|r| r.id == *id) {
                        for (field, value) in fields {
                            rec.fields.insert(field.clone(), value.clone());
                        }
                    }
                }
                StagedWrite::Create { fields } => {
                    let mut next = self.next_id.lock().expect("next_id lock");
                    let mut rec = LocalRecord::new(*next);
                    *next += 1;
                    rec.fields = fields.clone();
                    collection.push(rec);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WatermarkStore for MemStore {
    async fn get(&self, job_name: &str) -> Result<Option<Watermark>> {
        Ok(self.watermark(job_name))
    }

    async fn advance(
        &self,
        job_name: &str,
        external_key: &str,
        records: &[RemoteRecord],
    ) -> Result<()> {
        let Some(candidate) = max_last_edited(records, external_key) else {
            return Ok(());
        };
        let mut watermarks = self.watermarks.lock().expect("watermarks lock");
        let current = watermarks
            .get(job_name)
            .map(|w| w.external_last_edited.clone());
        if !advances(current.as_deref(), &candidate) {
            return Ok(());
        }
        watermarks.insert(
            job_name.to_string(),
            Watermark {
                job_name: job_name.to_string(),
                external_key: external_key.to_string(),
                external_last_edited: candidate,
            },
        );
        Ok(())
    }
}

/// Captures delivered reports instead of sending them. `fail` makes every
/// delivery error, for pinning the non-fatal delivery policy.
#[derive(Debug, Default)]
pub struct MemNotifier {
    pub fail: bool,
    delivered: Mutex<Vec<(String, String)>>,
}

impl MemNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<(String, String)> {
        self.delivered.lock().expect("delivered lock").clone()
    }
}

#[async_trait]
impl Notifier for MemNotifier {
    async fn deliver(&self, subject: &str, body: &str) -> Result<()> {
        if self.fail {
            anyhow::bail!("notification channel unavailable");
        }
        self.delivered
            .lock()
            .expect("delivered lock")
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}
