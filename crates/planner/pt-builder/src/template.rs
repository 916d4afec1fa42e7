//! Named, reusable partition configurations.

use chrono::NaiveDate;
use pt_error::{Result, TemplateError};
use pt_types::{split_qualified, BoundValue, IntervalKind, PartitionSettings, PartitionStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::deferred::HashRequest;
use crate::layout::{LayoutBuilder, PartitionLayout};
use crate::naming::substitute_placeholders;
use crate::sequence::SequenceRequest;

/// A partitioning configuration that can be applied to many tables.
///
/// `prefix`, `schema` and `tablespace` may contain `{table}`, which is
/// replaced by the bare table name on expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionTemplate {
    pub name: String,

    #[serde(default)]
    pub strategy: Option<PartitionStrategy>,

    #[serde(default)]
    pub columns: Option<Vec<String>>,

    /// Interval of RANGE templates
    #[serde(default)]
    pub interval: Option<IntervalKind>,

    /// Number of RANGE partitions created on expansion
    #[serde(default = "default_count")]
    pub count: u32,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub tablespace: Option<String>,

    /// Add a DEFAULT partition (RANGE and LIST only)
    #[serde(default)]
    pub default_partition: bool,

    /// Partitions to keep created ahead of today, 0 to disable
    #[serde(default)]
    pub future_partitions: u32,

    /// Modulus of HASH templates
    #[serde(default)]
    pub hash_modulus: u32,

    #[serde(default)]
    pub prefix: Option<String>,

    /// One LIST partition per value
    #[serde(default)]
    pub list_values: Vec<BoundValue>,
}

fn default_count() -> u32 {
    12
}

/// Fields replaced by [`PartitionTemplate::merge`]. `None` keeps the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateOverrides {
    pub strategy: Option<PartitionStrategy>,
    pub columns: Option<Vec<String>>,
    pub interval: Option<IntervalKind>,
    pub count: Option<u32>,
    pub schema: Option<String>,
    pub tablespace: Option<String>,
    pub default_partition: Option<bool>,
    pub future_partitions: Option<u32>,
    pub hash_modulus: Option<u32>,
    pub prefix: Option<String>,
    pub list_values: Option<Vec<BoundValue>>,
}

/// Create-ahead policy carried by a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub interval: IntervalKind,
    pub future_partitions: u32,
}

impl PartitionTemplate {
    /// Create an empty template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategy: None,
            columns: None,
            interval: None,
            count: default_count(),
            schema: None,
            tablespace: None,
            default_partition: false,
            future_partitions: 0,
            hash_modulus: 0,
            prefix: None,
            list_values: Vec::new(),
        }
    }

    /// Monthly RANGE template on one column.
    pub fn monthly(name: impl Into<String>, column: impl Into<String>, count: u32) -> Self {
        Self {
            strategy: Some(PartitionStrategy::Range),
            columns: Some(vec![column.into()]),
            interval: Some(IntervalKind::Monthly),
            count,
            ..Self::new(name)
        }
    }

    /// Return a copy with the overridden fields replaced. `self` is untouched.
    pub fn merge(&self, overrides: &TemplateOverrides) -> Self {
        let mut merged = self.clone();
        if let Some(strategy) = overrides.strategy {
            merged.strategy = Some(strategy);
        }
        if let Some(columns) = &overrides.columns {
            merged.columns = Some(columns.clone());
        }
        if let Some(interval) = overrides.interval {
            merged.interval = Some(interval);
        }
        if let Some(count) = overrides.count {
            merged.count = count;
        }
        if let Some(schema) = &overrides.schema {
            merged.schema = Some(schema.clone());
        }
        if let Some(tablespace) = &overrides.tablespace {
            merged.tablespace = Some(tablespace.clone());
        }
        if let Some(default_partition) = overrides.default_partition {
            merged.default_partition = default_partition;
        }
        if let Some(future) = overrides.future_partitions {
            merged.future_partitions = future;
        }
        if let Some(modulus) = overrides.hash_modulus {
            merged.hash_modulus = modulus;
        }
        if let Some(prefix) = &overrides.prefix {
            merged.prefix = Some(prefix.clone());
        }
        if let Some(values) = &overrides.list_values {
            merged.list_values = values.clone();
        }
        merged
    }

    /// Create-ahead policy, if a RANGE template asks for future partitions.
    pub fn rotation_policy(&self) -> Option<RotationPolicy> {
        match (self.strategy, self.interval, self.future_partitions) {
            (Some(PartitionStrategy::Range), Some(interval), future) if future > 0 => {
                Some(RotationPolicy {
                    interval,
                    future_partitions: future,
                })
            }
            _ => None,
        }
    }

    /// Expand the template into a layout for `table`.
    pub fn expand(
        &self,
        table: &str,
        settings: &PartitionSettings,
        today: NaiveDate,
    ) -> Result<PartitionLayout> {
        let strategy = self
            .strategy
            .ok_or_else(|| self.incomplete("no partition strategy"))?;
        let columns = self
            .columns
            .as_ref()
            .filter(|cols| !cols.is_empty())
            .ok_or_else(|| self.incomplete("no partition columns"))?;

        let base = split_qualified(table).1;
        let mut builder = LayoutBuilder::new(table, strategy)
            .with_columns(columns.iter().cloned())
            .with_settings(settings.clone())
            .with_today(today);
        if let Some(schema) = &self.schema {
            builder = builder.with_default_schema(substitute_placeholders(schema, base));
        }
        if let Some(tablespace) = &self.tablespace {
            builder = builder.with_default_tablespace(substitute_placeholders(tablespace, base));
        }
        let prefix = self.prefix.as_deref().map(|p| substitute_placeholders(p, base));

        match strategy {
            PartitionStrategy::Range => {
                let interval = self
                    .interval
                    .ok_or_else(|| self.incomplete("RANGE templates need an interval"))?;
                if self.count > 0 {
                    let mut request = SequenceRequest::count(interval, self.count).starting_now();
                    request.prefix = prefix;
                    builder.add_sequence(request)?;
                }
                if self.default_partition {
                    builder.add_default(None)?;
                }
            }
            PartitionStrategy::List => {
                if self.list_values.is_empty() && !self.default_partition {
                    return Err(self.incomplete("LIST templates need values or a default partition"));
                }
                for value in &self.list_values {
                    builder.add_list(None, vec![value.clone()], None)?;
                }
                if self.default_partition {
                    builder.add_default(None)?;
                }
            }
            PartitionStrategy::Hash => {
                if self.hash_modulus == 0 {
                    return Err(self.incomplete("HASH templates need a modulus"));
                }
                let mut request = HashRequest::new(self.hash_modulus);
                request.prefix = prefix;
                builder.add_hash_with(request)?;
            }
        }

        debug!(template = %self.name, table = %table, "Expanded partition template");
        builder.build()
    }

    fn incomplete(&self, reason: &str) -> pt_error::PtError {
        TemplateError::Incomplete {
            template: self.name.clone(),
            reason: reason.to_string(),
        }
        .into()
    }
}

/// Registry of named templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, PartitionTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, returning the one it replaced.
    pub fn register(&mut self, template: PartitionTemplate) -> Option<PartitionTemplate> {
        self.templates.insert(template.name.clone(), template)
    }

    pub fn get(&self, name: &str) -> Option<&PartitionTemplate> {
        self.templates.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<PartitionTemplate> {
        self.templates.remove(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Register every template in a JSON array. Returns the number loaded.
    pub fn load_json(&mut self, json: &str) -> Result<usize> {
        let templates: Vec<PartitionTemplate> =
            serde_json::from_str(json).map_err(|e| TemplateError::Load(e.to_string()))?;
        let count = templates.len();
        for template in templates {
            self.register(template);
        }
        Ok(count)
    }

    /// Register every template in a JSON file holding an array of templates.
    pub fn load_json_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| TemplateError::Load(format!("{}: {}", path.display(), e)))?;
        let count = self.load_json(&json)?;
        info!(path = %path.display(), count, "Loaded partition templates");
        Ok(count)
    }

    /// Expand the named template for `table`, applying `overrides` first.
    pub fn expand(
        &self,
        name: &str,
        table: &str,
        overrides: Option<&TemplateOverrides>,
        settings: &PartitionSettings,
        today: NaiveDate,
    ) -> Result<PartitionLayout> {
        let template = self
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        match overrides {
            Some(overrides) => template.merge(overrides).expand(table, settings, today),
            None => template.expand(table, settings, today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_types::PartitionBoundary;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    #[test]
    fn test_merge_is_pure() {
        let base = PartitionTemplate::monthly("monthly", "created_at", 12);
        let overrides = TemplateOverrides {
            count: Some(24),
            ..Default::default()
        };

        let merged = base.merge(&overrides);

        assert_eq!(base.count, 12);
        assert_eq!(merged.count, 24);
        assert_eq!(PartitionTemplate { count: 12, ..merged }, base);
    }

    #[test]
    fn test_expand_range_with_default() {
        let mut template = PartitionTemplate::monthly("monthly", "created_at", 3);
        template.default_partition = true;
        template.schema = Some("{table}_parts".to_string());

        let layout = template
            .expand("public.events", &PartitionSettings::default(), today())
            .unwrap();

        assert_eq!(
            layout.names(),
            vec!["events_m2024_05", "events_m2024_06", "events_m2024_07", "events_default"]
        );
        assert!(layout
            .definitions
            .iter()
            .all(|d| d.schema.as_deref() == Some("events_parts")));
    }

    #[test]
    fn test_expand_with_prefix() {
        let mut template = PartitionTemplate::monthly("monthly", "created_at", 1);
        template.prefix = Some("{table}_hist_".to_string());

        let layout = template
            .expand("events", &PartitionSettings::default(), today())
            .unwrap();
        assert_eq!(layout.names(), vec!["events_hist_2024_05"]);
    }

    #[test]
    fn test_expand_list_and_hash() {
        let mut list = PartitionTemplate::new("status");
        list.strategy = Some(PartitionStrategy::List);
        list.columns = Some(vec!["status".to_string()]);
        list.list_values = vec![BoundValue::text("open"), BoundValue::text("closed")];
        list.default_partition = true;

        let layout = list.expand("tickets", &PartitionSettings::default(), today()).unwrap();
        assert_eq!(layout.names(), vec!["tickets_open", "tickets_closed", "tickets_default"]);

        let mut hash = PartitionTemplate::new("buckets");
        hash.strategy = Some(PartitionStrategy::Hash);
        hash.columns = Some(vec!["id".to_string()]);
        hash.hash_modulus = 4;

        let layout = hash.expand("users", &PartitionSettings::default(), today()).unwrap();
        assert_eq!(layout.names(), vec!["users_p0", "users_p1", "users_p2", "users_p3"]);
        assert!(matches!(layout.definitions[3].boundary, PartitionBoundary::Hash(_)));
    }

    #[test]
    fn test_expand_incomplete_templates() {
        let mut template = PartitionTemplate::new("broken");
        let err = template
            .expand("t", &PartitionSettings::default(), today())
            .unwrap_err();
        assert!(err.to_string().contains("strategy"));

        template.strategy = Some(PartitionStrategy::Range);
        template.columns = Some(vec!["created_at".to_string()]);
        let err = template
            .expand("t", &PartitionSettings::default(), today())
            .unwrap_err();
        assert!(err.to_string().contains("interval"));

        template.strategy = Some(PartitionStrategy::Hash);
        let err = template
            .expand("t", &PartitionSettings::default(), today())
            .unwrap_err();
        assert!(err.to_string().contains("modulus"));
    }

    #[test]
    fn test_registry_expand_with_overrides() {
        let mut registry = TemplateRegistry::new();
        registry.register(PartitionTemplate::monthly("monthly", "created_at", 12));

        let overrides = TemplateOverrides {
            count: Some(2),
            interval: Some(IntervalKind::Yearly),
            ..Default::default()
        };
        let layout = registry
            .expand("monthly", "t", Some(&overrides), &PartitionSettings::default(), today())
            .unwrap();
        assert_eq!(layout.names(), vec!["t_y2024", "t_y2025"]);

        assert_eq!(registry.get("monthly").unwrap().count, 12);
        let err = registry
            .expand("missing", "t", None, &PartitionSettings::default(), today())
            .unwrap_err();
        assert!(err.to_string().contains("Template not found"));
    }

    #[test]
    fn test_load_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"name": "daily", "strategy": "range", "columns": ["ts"], "interval": "daily", "count": 7, "future_partitions": 3}},
                {{"name": "regions", "strategy": "list", "columns": ["region"], "list_values": ["eu", "us"]}}
            ]"#
        )
        .unwrap();

        let mut registry = TemplateRegistry::new();
        let loaded = registry.load_json_file(file.path()).unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(registry.names(), vec!["daily", "regions"]);

        let daily = registry.get("daily").unwrap();
        assert_eq!(daily.count, 7);
        assert_eq!(
            daily.rotation_policy(),
            Some(RotationPolicy {
                interval: IntervalKind::Daily,
                future_partitions: 3
            })
        );
        assert_eq!(registry.get("regions").unwrap().count, 12);
        assert!(registry.get("regions").unwrap().rotation_policy().is_none());
    }

    #[test]
    fn test_rotation_policy_only_for_range() {
        let mut template = PartitionTemplate::monthly("monthly", "created_at", 6);
        template.future_partitions = 2;
        assert_eq!(
            template.rotation_policy(),
            Some(RotationPolicy {
                interval: IntervalKind::Monthly,
                future_partitions: 2
            })
        );

        let hashed = template.merge(&TemplateOverrides {
            strategy: Some(PartitionStrategy::Hash),
            hash_modulus: Some(4),
            ..Default::default()
        });
        assert!(hashed.rotation_policy().is_none());

        template.strategy = Some(PartitionStrategy::List);
        assert!(template.rotation_policy().is_none());
    }

    #[test]
    fn test_load_invalid_json() {
        let mut registry = TemplateRegistry::new();
        let err = registry.load_json("{not json").unwrap_err();
        assert!(err.to_string().contains("Failed to load templates"));
        assert!(registry.is_empty());
    }
}
