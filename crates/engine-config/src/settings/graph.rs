use super::{
    error::SettingsError,
    validator::{SettingsValidator, Validate},
};
use std::time::Duration;

/// Tenants `ten<first>..=ten<last>`, each with `paths_per_tenant` paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantRange {
    pub first: u64,
    pub last: u64,
    pub paths_per_tenant: u64,
}

impl Default for TenantRange {
    fn default() -> Self {
        Self {
            first: 1,
            last: 3000,
            paths_per_tenant: 10_000,
        }
    }
}

impl TenantRange {
    pub fn tenants(&self) -> u64 {
        (self.last + 1).saturating_sub(self.first)
    }

    fn check(&self, validator: &mut SettingsValidator) {
        validator
            .check(
                self.first <= self.last,
                format!(
                    "tenant range is empty (first {} > last {})",
                    self.first, self.last
                ),
            )
            .positive("paths per tenant", self.paths_per_tenant);
    }
}

/// `create graph`: the disjoint smart graph `G` plus its tenant paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantGraphSettings {
    pub tenants: TenantRange,
    pub parallelism: usize,
    pub drop: bool,
}

impl Default for TenantGraphSettings {
    fn default() -> Self {
        Self {
            tenants: TenantRange::default(),
            parallelism: 4,
            drop: false,
        }
    }
}

impl Validate for TenantGraphSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        let mut validator = SettingsValidator::new();
        self.tenants.check(&mut validator);
        validator
            .positive("parallelism", self.parallelism as u64)
            .finish()
    }
}

/// `test graph`: random 2-hop traversals against the tenant graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphTestSettings {
    pub tenants: TenantRange,
    pub parallelism: usize,
    pub run_time: Duration,
    /// Queries per latency window.
    pub batch: usize,
}

impl Default for GraphTestSettings {
    fn default() -> Self {
        Self {
            tenants: TenantRange::default(),
            parallelism: 4,
            run_time: Duration::from_secs(30),
            batch: 1000,
        }
    }
}

impl Validate for GraphTestSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        let mut validator = SettingsValidator::new();
        self.tenants.check(&mut validator);
        validator
            .positive("parallelism", self.parallelism as u64)
            .positive("batch", self.batch as u64)
            .finish()
    }
}

/// `create smartgraph`: the connected components graph `SmartGraph`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartGraphSettings {
    pub number_of_parts: u64,
    pub vertex_payload: usize,
    pub edge_payload: usize,
    pub log2_vertices: u32,
    pub parallelism: usize,
    pub shards: u32,
    pub drop: bool,
}

impl Default for SmartGraphSettings {
    fn default() -> Self {
        Self {
            number_of_parts: 12,
            vertex_payload: 16,
            edge_payload: 16,
            log2_vertices: 20,
            parallelism: 1,
            shards: 3,
            drop: false,
        }
    }
}

impl SmartGraphSettings {
    pub fn vertices_per_part(&self) -> u64 {
        1u64 << self.log2_vertices
    }
}

impl Validate for SmartGraphSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        SettingsValidator::new()
            .positive("number of parts", self.number_of_parts)
            .positive("parallelism", self.parallelism as u64)
            .positive("shards", self.shards as u64)
            .check(
                self.log2_vertices < 40,
                format!("log2 of vertices {} is too large", self.log2_vertices),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_tenant_range_is_rejected() {
        let settings = TenantGraphSettings {
            tenants: TenantRange {
                first: 10,
                last: 5,
                paths_per_tenant: 1,
            },
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn tenant_count_is_inclusive() {
        let range = TenantRange {
            first: 3,
            last: 5,
            paths_per_tenant: 1,
        };
        assert_eq!(range.tenants(), 3);
    }

    #[test]
    fn smart_graph_defaults() {
        let settings = SmartGraphSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.vertices_per_part(), 1 << 20);
    }
}
