//! Store-trait implementations over Postgres.
//!
//! Logical field names (the vocabulary the planner works in) are mapped to
//! concrete columns here, with an explicit closed table per entity — an
//! unmapped field is a programming error surfaced as such, never interpolated
//! into SQL.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use slk_core::{
    advances, max_last_edited, EntityKind, LocalRecord, LocalStore, ReconcilePlan, RemoteRecord,
    StagedWrite, Watermark, WatermarkStore,
};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
enum ColKind {
    Text,
    Float,
    BigInt,
}

fn table_for(entity: EntityKind) -> &'static str {
    match entity {
        EntityKind::Product => "products",
        EntityKind::ProductCategory => "product_categories",
        EntityKind::Order => "orders",
    }
}

fn column_for(entity: EntityKind, field: &str) -> Result<(&'static str, ColKind)> {
    let mapped = match entity {
        EntityKind::Product => match field {
            "InternalItemID" => ("internal_item_id", ColKind::Text),
            "Title" => ("title", ColKind::Text),
            "URLSegment" => ("url_segment", ColKind::Text),
            "BasePrice" => ("base_price", ColKind::Float),
            "ParentID" => ("parent_id", ColKind::BigInt),
            _ => bail!("unmapped Product field '{field}'"),
        },
        EntityKind::ProductCategory => match field {
            "Title" => ("title", ColKind::Text),
            "URLSegment" => ("url_segment", ColKind::Text),
            "Guid" => ("guid", ColKind::Text),
            _ => bail!("unmapped ProductCategory field '{field}'"),
        },
        EntityKind::Order => match field {
            "Reference" => ("reference", ColKind::Text),
            "Status" => ("status", ColKind::Text),
            _ => bail!("unmapped Order field '{field}'"),
        },
    };
    Ok(mapped)
}

fn value_as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    kind: ColKind,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match kind {
        ColKind::Text => query.bind(value_as_text(value)),
        ColKind::Float => query.bind(value.as_f64()),
        ColKind::BigInt => query.bind(value.as_i64()),
    }
}

/// Postgres-backed [`LocalStore`] + [`WatermarkStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalStore for PgStore {
    async fn column(&self, entity: EntityKind, field: &str) -> Result<Vec<String>> {
        let (col, _) = column_for(entity, field)?;
        let sql = format!(
            "select coalesce({col}::text, '') from {} order by id",
            table_for(entity)
        );
        let rows = sqlx::query_as::<_, (String,)>(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("column projection failed for {}.{field}", entity.as_str()))?;
        Ok(rows.into_iter().map(|(v,)| v).collect())
    }

    async fn load_all(&self, entity: EntityKind) -> Result<Vec<LocalRecord>> {
        let mut out = Vec::new();
        match entity {
            EntityKind::Product => {
                let rows = sqlx::query(
                    "select id, internal_item_id, title, url_segment, base_price, parent_id \
                     from products order by id",
                )
                .fetch_all(&self.pool)
                .await
                .context("load products failed")?;
                for row in rows {
                    let mut rec = LocalRecord::new(row.try_get::<i64, _>("id")?)
                        .with_field("InternalItemID", row.try_get::<String, _>("internal_item_id")?)
                        .with_field("Title", row.try_get::<String, _>("title")?)
                        .with_field("URLSegment", row.try_get::<String, _>("url_segment")?)
                        .with_field("BasePrice", row.try_get::<f64, _>("base_price")?);
                    if let Some(parent) = row.try_get::<Option<i64>, _>("parent_id")? {
                        rec = rec.with_field("ParentID", parent);
                    }
                    out.push(rec);
                }
            }
            EntityKind::ProductCategory => {
                let rows = sqlx::query(
                    "select id, title, url_segment, guid from product_categories order by id",
                )
                .fetch_all(&self.pool)
                .await
                .context("load product categories failed")?;
                for row in rows {
                    out.push(
                        LocalRecord::new(row.try_get::<i64, _>("id")?)
                            .with_field("Title", row.try_get::<String, _>("title")?)
                            .with_field("URLSegment", row.try_get::<String, _>("url_segment")?)
                            .with_field("Guid", row.try_get::<String, _>("guid")?),
                    );
                }
            }
            EntityKind::Order => {
                let rows = sqlx::query("select id, reference, status from orders order by id")
                    .fetch_all(&self.pool)
                    .await
                    .context("load orders failed")?;
                for row in rows {
                    out.push(
                        LocalRecord::new(row.try_get::<i64, _>("id")?)
                            .with_field("Reference", row.try_get::<String, _>("reference")?)
                            .with_field("Status", row.try_get::<String, _>("status")?),
                    );
                }
            }
        }
        Ok(out)
    }

    async fn apply(&self, entity: EntityKind, plan: &ReconcilePlan) -> Result<()> {
        let table = table_for(entity);
        for write in &plan.writes {
            match write {
                StagedWrite::Update { id, fields } => {
                    if fields.is_empty() {
                        continue;
                    }
                    let mut sets = Vec::with_capacity(fields.len());
                    let mut kinds = Vec::with_capacity(fields.len());
                    for (i, (field, value)) in fields.iter().enumerate() {
                        let (col, kind) = column_for(entity, field)?;
                        sets.push(format!("{col} = ${}", i + 1));
                        kinds.push((kind, value));
                    }
                    let sql = format!(
                        "update {table} set {} where id = ${}",
                        sets.join(", "),
                        fields.len() + 1
                    );
                    let mut query = sqlx::query(&sql);
                    for (kind, value) in kinds {
                        query = bind_value(query, kind, value);
                    }
                    query
                        .bind(id)
                        .execute(&self.pool)
                        .await
                        .with_context(|| format!("staged update failed for {table} id={id}"))?;
                }
                StagedWrite::Create { fields } => {
                    if fields.is_empty() {
                        continue;
                    }
                    let mut cols = Vec::with_capacity(fields.len());
                    let mut params = Vec::with_capacity(fields.len());
                    let mut kinds = Vec::with_capacity(fields.len());
                    for (i, (field, value)) in fields.iter().enumerate() {
                        let (col, kind) = column_for(entity, field)?;
                        cols.push(col);
                        params.push(format!("${}", i + 1));
                        kinds.push((kind, value));
                    }
                    let sql = format!(
                        "insert into {table} ({}) values ({})",
                        cols.join(", "),
                        params.join(", ")
                    );
                    let mut query = sqlx::query(&sql);
                    for (kind, value) in kinds {
                        query = bind_value(query, kind, value);
                    }
                    query
                        .execute(&self.pool)
                        .await
                        .with_context(|| format!("staged create failed for {table}"))?;
                }
            }
        }
        debug!(
            entity = entity.as_str(),
            writes = plan.writes.len(),
            "applied staged writes"
        );
        Ok(())
    }
}

#[async_trait]
impl WatermarkStore for PgStore {
    async fn get(&self, job_name: &str) -> Result<Option<Watermark>> {
        let row = sqlx::query_as::<_, (String, String, String)>(
            "select job_name, external_key, external_last_edited \
             from sync_watermarks where job_name = $1",
        )
        .bind(job_name)
        .fetch_optional(&self.pool)
        .await
        .context("watermark lookup failed")?;
        Ok(row.map(|(job_name, external_key, external_last_edited)| Watermark {
            job_name,
            external_key,
            external_last_edited,
        }))
    }

    async fn advance(
        &self,
        job_name: &str,
        external_key: &str,
        records: &[RemoteRecord],
    ) -> Result<()> {
        let Some(candidate) = max_last_edited(records, external_key) else {
            // Empty batch: the watermark must not move.
            return Ok(());
        };
        let current = WatermarkStore::get(self, job_name).await?;
        if !advances(
            current.as_ref().map(|w| w.external_last_edited.as_str()),
            &candidate,
        ) {
            warn!(
                job_name,
                candidate, "batch maximum is older than the stored watermark; not regressing"
            );
            return Ok(());
        }
        sqlx::query(
            "insert into sync_watermarks (job_name, external_key, external_last_edited) \
             values ($1, $2, $3) \
             on conflict (job_name) do update set \
               external_key = excluded.external_key, \
               external_last_edited = excluded.external_last_edited, \
               updated_at = now()",
        )
        .bind(job_name)
        .bind(external_key)
        .bind(&candidate)
        .execute(&self.pool)
        .await
        .context("watermark upsert failed")?;
        debug!(job_name, candidate, "watermark advanced");
        Ok(())
    }
}
