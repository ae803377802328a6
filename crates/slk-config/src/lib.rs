//! slk-config
//!
//! Layered YAML configuration: later documents override earlier ones, the
//! merged result is canonicalized and hashed so two operators can compare
//! effective configs by a single value, and literal secrets in config files
//! are rejected outright (credentials come in through the environment).
//!
//! The typed [`Settings`] extraction is what the jobs consume: every per-job
//! flag is explicit configuration handed to the job constructor, never a
//! process-wide lookup.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Known secret-like prefixes. A leaf string starting with one of these
/// aborts loading with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // generic API secret
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }
    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    // Merge in order: earlier docs are base, later docs override.
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged, "")?;

    let canonical_json = serde_json::to_string(&merged).context("canonical serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value, path: &str) -> Result<()> {
    match v {
        Value::Object(map) => {
            for (k, vv) in map {
                enforce_no_secret_literals(vv, &format!("{path}/{k}"))?;
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                enforce_no_secret_literals(vv, &format!("{path}/{i}"))?;
            }
        }
        Value::String(s) => {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={path} value=REDACTED");
            }
        }
        _ => {}
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

// ---------------------------------------------------------------------------
// Typed settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    /// Fixed `sourceId` scope for the order fetch, when the shop is one of
    /// several sources feeding the same remote account.
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub notify: NotifySettings,
    #[serde(default)]
    pub jobs: JobsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    /// Env var names holding the credential pair; the values never appear in
    /// config files.
    #[serde(default)]
    pub auth_id_env: Option<String>,
    #[serde(default)]
    pub auth_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifySettings {
    /// When set, the plain-text run report is POSTed here after each
    /// non-preview run that changed anything.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsSettings {
    #[serde(default = "JobSettings::products_default")]
    pub products: JobSettings,
    #[serde(default)]
    pub orders: JobSettings,
    #[serde(default)]
    pub categories: JobSettings,
}

impl Default for JobsSettings {
    fn default() -> Self {
        Self {
            products: JobSettings::products_default(),
            orders: JobSettings::default(),
            categories: JobSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSettings {
    /// IANA zone the watermark is normalized to before it becomes the
    /// `modifiedSince` filter. The remote Products endpoint reads
    /// `modifiedSince` in UTC; the other endpoints take the timestamp as-is.
    #[serde(default)]
    pub filter_timezone: Option<String>,
}

impl JobSettings {
    fn products_default() -> Self {
        Self {
            filter_timezone: Some("UTC".to_string()),
        }
    }
}

impl Settings {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        serde_json::from_value(loaded.config_json.clone())
            .context("config does not match the expected settings shape")
    }
}
