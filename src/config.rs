use crate::errors::{AppError, AppResult};
use crate::store::SheetNames;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

const MAX_CACHE_TTL_SECONDS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub cache_ttl_seconds: u64,
    pub recent_activity_limit: usize,
    pub default_lead_status: String,
    pub default_lead_source: String,
    pub leads_sheet: String,
    pub agents_sheet: String,
    pub meetings_sheet: String,
    pub notifications_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 30,
            recent_activity_limit: 50,
            default_lead_status: "New".to_string(),
            default_lead_source: "QR Code".to_string(),
            leads_sheet: "Leads".to_string(),
            agents_sheet: "Agent Credentials".to_string(),
            meetings_sheet: "Meeting Requests".to_string(),
            notifications_enabled: true,
        }
    }
}

impl EngineSettings {
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.cache_ttl_seconds).unwrap_or(i64::MAX))
    }

    pub fn sheet_names(&self) -> SheetNames {
        SheetNames {
            leads: self.leads_sheet.clone(),
            agents: self.agents_sheet.clone(),
            meetings: self.meetings_sheet.clone(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.cache_ttl_seconds > MAX_CACHE_TTL_SECONDS {
            return Err(AppError::Validation(format!(
                "cacheTtlSeconds must be at most {}",
                MAX_CACHE_TTL_SECONDS
            )));
        }
        if self.recent_activity_limit == 0 {
            return Err(AppError::Validation(
                "recentActivityLimit must be at least 1".to_string(),
            ));
        }
        for (key, value) in [
            ("leadsSheet", &self.leads_sheet),
            ("agentsSheet", &self.agents_sheet),
            ("meetingsSheet", &self.meetings_sheet),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{} cannot be empty", key)));
            }
        }
        Ok(())
    }

    /// Deep-merges a JSON patch over the current values.
    pub fn with_overrides(&self, update: serde_json::Value) -> AppResult<Self> {
        let mut merged = serde_json::to_value(self)?;
        merge_json(&mut merged, update);
        let settings: Self = serde_json::from_value(merged)?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Reads settings from a YAML file. A missing file means defaults.
pub fn load_settings(path: &Path) -> AppResult<EngineSettings> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "settings file not found; using defaults");
        return Ok(EngineSettings::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings file {}", path.display()))?;
    let settings: EngineSettings = if raw.trim().is_empty() {
        EngineSettings::default()
    } else {
        serde_yaml::from_str(&raw)?
    };
    settings.validate()?;
    Ok(settings)
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}
