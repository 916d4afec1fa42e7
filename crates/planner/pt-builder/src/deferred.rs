//! Partition accumulation with deferred generation.
//!
//! A [`PartitionSet`] collects the definitions of one partitioning level. Most
//! additions need the level's base name to build partition names. When a set
//! is configured before that name is known (typically a sub-partition layout
//! assembled before its parent partition exists), additions are queued and
//! replayed in their original order the moment the name is bound.

use chrono::NaiveDate;
use pt_error::{PtError, Result};
use pt_types::{
    BoundValue, PartitionBoundary, PartitionDefinition, PartitionSettings, PartitionStrategy,
};
use tracing::{debug, trace, warn};

use crate::naming::{substitute_placeholders, value_key};
use crate::sequence::{
    generate_sequence, hash_partitions, resolve_schema, resolve_tablespace, SequenceContext,
    SequenceRequest,
};

/// A request for a complete HASH batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRequest {
    /// Number of buckets
    pub modulus: u32,
    /// Explicit schema
    pub schema: Option<String>,
    /// Explicit tablespace
    pub tablespace: Option<String>,
    /// Explicit name prefix, may contain `{table}`
    pub prefix: Option<String>,
}

impl HashRequest {
    /// Create a new hash request.
    pub fn new(modulus: u32) -> Self {
        Self {
            modulus,
            schema: None,
            tablespace: None,
            prefix: None,
        }
    }

    /// Set the schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the tablespace.
    pub fn with_tablespace(mut self, tablespace: impl Into<String>) -> Self {
        self.tablespace = Some(tablespace.into());
        self
    }

    /// Set the name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// A queued addition.
#[derive(Debug, Clone, PartialEq)]
enum PendingOp {
    Sequence(SequenceRequest),
    Hash(HashRequest),
    Range {
        name: String,
        from: BoundValue,
        to: BoundValue,
        schema: Option<String>,
    },
    List {
        name: Option<String>,
        values: Vec<BoundValue>,
        schema: Option<String>,
    },
    Default {
        name: Option<String>,
        schema: Option<String>,
    },
}

/// Mutable accumulator for the definitions of one partitioning level.
///
/// Safe for single-threaded configuration only.
#[derive(Debug, Clone)]
pub struct PartitionSet {
    strategy: PartitionStrategy,
    base_name: Option<String>,
    definitions: Vec<PartitionDefinition>,
    pending: Vec<PendingOp>,
    default_schema: Option<String>,
    default_tablespace: Option<String>,
    global_defaults: bool,
    settings: PartitionSettings,
    today: NaiveDate,
}

impl PartitionSet {
    /// Create a set whose base name is not yet known.
    pub fn unbound(strategy: PartitionStrategy, settings: PartitionSettings, today: NaiveDate) -> Self {
        Self {
            strategy,
            base_name: None,
            definitions: Vec::new(),
            pending: Vec::new(),
            default_schema: None,
            default_tablespace: None,
            global_defaults: true,
            settings,
            today,
        }
    }

    /// Create a set with a known base name.
    pub fn bound(
        base_name: impl Into<String>,
        strategy: PartitionStrategy,
        settings: PartitionSettings,
        today: NaiveDate,
    ) -> Self {
        Self {
            base_name: Some(base_name.into()),
            ..Self::unbound(strategy, settings, today)
        }
    }

    /// Set the level's default schema.
    pub fn with_default_schema(mut self, schema: Option<String>) -> Self {
        self.default_schema = schema;
        self
    }

    /// Set the level's default tablespace.
    pub fn with_default_tablespace(mut self, tablespace: Option<String>) -> Self {
        self.default_tablespace = tablespace;
        self
    }

    /// Leave partitions without schema or tablespace instead of falling back
    /// to the settings' defaults, so a nested level inherits from its parent.
    pub fn without_global_defaults(mut self) -> Self {
        self.global_defaults = false;
        self
    }

    /// Replace the settings used for partitions added afterwards.
    pub fn with_settings(mut self, settings: PartitionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the date that "now" resolves to for partitions added afterwards.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Settings used for naming and fallbacks.
    pub fn settings(&self) -> &PartitionSettings {
        &self.settings
    }

    /// Strategy of this level.
    pub fn strategy(&self) -> PartitionStrategy {
        self.strategy
    }

    /// The level's default schema.
    pub fn default_schema(&self) -> Option<&str> {
        self.default_schema.as_deref()
    }

    /// The level's default tablespace.
    pub fn default_tablespace(&self) -> Option<&str> {
        self.default_tablespace.as_deref()
    }

    /// The base name, once bound.
    pub fn base_name(&self) -> Option<&str> {
        self.base_name.as_deref()
    }

    /// Definitions generated so far.
    pub fn definitions(&self) -> &[PartitionDefinition] {
        &self.definitions
    }

    /// Mutable access to the generated definitions.
    pub fn definitions_mut(&mut self) -> &mut [PartitionDefinition] {
        &mut self.definitions
    }

    /// Number of additions waiting for a base name.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Add a run of interval partitions. Requires a RANGE level.
    pub fn add_sequence(&mut self, request: SequenceRequest) -> Result<()> {
        self.expect_strategy(PartitionStrategy::Range, "interval sequence")?;
        self.submit(PendingOp::Sequence(request))
    }

    /// Add a complete HASH batch. Requires a HASH level.
    pub fn add_hash(&mut self, request: HashRequest) -> Result<()> {
        self.expect_strategy(PartitionStrategy::Hash, "hash batch")?;
        if request.modulus == 0 {
            return Err(PtError::Config("Hash modulus must be at least 1".to_string()));
        }
        self.submit(PendingOp::Hash(request))
    }

    /// Add an explicitly named RANGE partition. Requires a RANGE level.
    pub fn add_range(
        &mut self,
        name: impl Into<String>,
        from: impl Into<BoundValue>,
        to: impl Into<BoundValue>,
        schema: Option<String>,
    ) -> Result<()> {
        self.expect_strategy(PartitionStrategy::Range, "range partition")?;
        self.submit(PendingOp::Range {
            name: name.into(),
            from: from.into(),
            to: to.into(),
            schema,
        })
    }

    /// Add a LIST partition. Requires a LIST level.
    ///
    /// Without a name, the partition is named `{base}{separator}{first value}`.
    pub fn add_list(
        &mut self,
        name: Option<String>,
        values: Vec<BoundValue>,
        schema: Option<String>,
    ) -> Result<()> {
        self.expect_strategy(PartitionStrategy::List, "list partition")?;
        if values.is_empty() {
            return Err(PtError::Config("List partition needs at least one value".to_string()));
        }
        self.submit(PendingOp::List {
            name,
            values,
            schema,
        })
    }

    /// Add the DEFAULT partition, named `{base}{separator}default` unless named.
    pub fn add_default(&mut self, name: Option<String>, schema: Option<String>) -> Result<()> {
        if self.strategy == PartitionStrategy::Hash {
            return Err(PtError::Config(
                "HASH partitioned tables cannot have a DEFAULT partition".to_string(),
            ));
        }
        self.submit(PendingOp::Default { name, schema })
    }

    /// Bind the base name and replay queued additions in call order.
    pub fn bind_base_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PtError::Config("Base name must not be empty".to_string()));
        }
        self.base_name = Some(name);

        let mut pending = std::mem::take(&mut self.pending).into_iter();
        if pending.len() > 0 {
            debug!(
                base = ?self.base_name,
                count = pending.len(),
                "Replaying deferred partition additions"
            );
        }
        while let Some(op) = pending.next() {
            if let Err(e) = self.apply(op.clone()) {
                // Keep the failed addition and everything after it queued
                self.pending.push(op);
                self.pending.extend(pending);
                warn!(
                    base = ?self.base_name,
                    pending = self.pending.len(),
                    error = %e,
                    "Deferred partition replay failed"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Consume the set, returning its definitions.
    ///
    /// Fails if additions are still waiting for a base name.
    pub fn into_definitions(self) -> Result<Vec<PartitionDefinition>> {
        if !self.pending.is_empty() {
            let reason = if self.base_name.is_some() {
                "failed to replay"
            } else {
                "are waiting for a base name that was never bound"
            };
            return Err(PtError::Config(format!(
                "{} partition additions {}",
                self.pending.len(),
                reason
            )));
        }
        Ok(self.definitions)
    }

    fn expect_strategy(&self, expected: PartitionStrategy, what: &str) -> Result<()> {
        if self.strategy != expected {
            return Err(PtError::Config(format!(
                "Cannot add {} to a {} partitioned level",
                what, self.strategy
            )));
        }
        Ok(())
    }

    fn submit(&mut self, op: PendingOp) -> Result<()> {
        // Queue behind earlier deferred additions to keep call order
        if self.base_name.is_none() || !self.pending.is_empty() {
            trace!(pending = self.pending.len() + 1, "Deferring partition addition");
            self.pending.push(op);
            return Ok(());
        }
        self.apply(op)
    }

    fn apply(&mut self, op: PendingOp) -> Result<()> {
        let base = self
            .base_name
            .clone()
            .ok_or_else(|| PtError::Config("Base name is not bound".to_string()))?;

        let generated = match op {
            PendingOp::Sequence(request) => {
                let ctx = SequenceContext {
                    base_name: &base,
                    previous: &self.definitions,
                    default_schema: self.default_schema.as_deref(),
                    default_tablespace: self.default_tablespace.as_deref(),
                    settings: &self.settings,
                    global_defaults: self.global_defaults,
                    today: self.today,
                };
                generate_sequence(&request, &ctx)?
            }
            PendingOp::Hash(request) => {
                let schema = self.schema_for(request.schema.as_deref());
                let tablespace = self.tablespace_for(request.tablespace.as_deref());
                hash_partitions(
                    &base,
                    request.modulus,
                    request.prefix.as_deref(),
                    &self.settings.naming,
                )?
                .into_iter()
                .map(|d| d.with_schema(schema.clone()).with_tablespace(tablespace.clone()))
                .collect()
            }
            PendingOp::Range {
                name,
                from,
                to,
                schema,
            } => vec![PartitionDefinition::new(
                substitute_placeholders(&name, &base),
                PartitionStrategy::Range,
                PartitionBoundary::range(from, to),
            )
            .with_explicit_name()
            .with_schema(self.schema_for(schema.as_deref()))
            .with_tablespace(self.tablespace_for(None))],
            PendingOp::List {
                name,
                values,
                schema,
            } => {
                let (name, explicit) = match name {
                    Some(name) => (substitute_placeholders(&name, &base), true),
                    None => (self.derived_name(&base, &value_key(&values[0])), false),
                };
                let mut def = PartitionDefinition::new(
                    name,
                    PartitionStrategy::List,
                    PartitionBoundary::list(values),
                )
                .with_schema(self.schema_for(schema.as_deref()))
                .with_tablespace(self.tablespace_for(None));
                def.explicit_name = explicit;
                vec![def]
            }
            PendingOp::Default { name, schema } => {
                let (name, explicit) = match name {
                    Some(name) => (substitute_placeholders(&name, &base), true),
                    None => (self.derived_name(&base, "default"), false),
                };
                let mut def =
                    PartitionDefinition::new(name, self.strategy, PartitionBoundary::Default)
                        .with_schema(self.schema_for(schema.as_deref()))
                        .with_tablespace(self.tablespace_for(None));
                def.explicit_name = explicit;
                vec![def]
            }
        };

        self.definitions.extend(generated);
        Ok(())
    }

    fn derived_name(&self, base: &str, key: &str) -> String {
        let naming = &self.settings.naming;
        format!(
            "{}{}{}{}{}",
            naming.prefix, base, naming.separator, key, naming.suffix
        )
    }

    fn schema_for(&self, explicit: Option<&str>) -> Option<String> {
        resolve_schema(
            explicit,
            &self.definitions,
            self.default_schema.as_deref(),
            self.settings
                .default_schema
                .as_deref()
                .filter(|_| self.global_defaults),
        )
    }

    fn tablespace_for(&self, explicit: Option<&str>) -> Option<String> {
        resolve_tablespace(
            explicit,
            &self.definitions,
            self.default_tablespace.as_deref(),
            self.settings
                .default_tablespace
                .as_deref()
                .filter(|_| self.global_defaults),
        )
    }
}
