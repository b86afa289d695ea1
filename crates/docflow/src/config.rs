//! Workflow configuration module

use serde::{Deserialize, Serialize};

/// Upper bound for capability validity and assignment deadlines, in days
pub const MAX_DAYS: i64 = 365;

/// Limits and defaults applied by the document workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocflowConfig {
    /// Largest accepted upload, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Validity of minted read capabilities, in days
    #[serde(default = "default_capability_ttl_days")]
    pub capability_ttl_days: i64,

    /// Days between a share and the generated assignment's deadline
    #[serde(default = "default_deadline_days")]
    pub assignment_deadline_days: i64,

    /// Estimated hours recorded on every generated assignment
    #[serde(default = "default_estimated_hours")]
    pub assignment_estimated_hours: u32,

    /// Maximum number of documents returned by a listing
    #[serde(default = "default_list_limit")]
    pub list_limit: i64,
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_capability_ttl_days() -> i64 {
    7
}

fn default_deadline_days() -> i64 {
    7
}

fn default_estimated_hours() -> u32 {
    4
}

fn default_list_limit() -> i64 {
    100
}

impl Default for DocflowConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            capability_ttl_days: default_capability_ttl_days(),
            assignment_deadline_days: default_deadline_days(),
            assignment_estimated_hours: default_estimated_hours(),
            list_limit: default_list_limit(),
        }
    }
}

impl DocflowConfig {
    /// Reject limits that cannot be applied to a timestamp or a listing
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_DAYS).contains(&self.capability_ttl_days) {
            anyhow::bail!(
                "capability_ttl_days must be between 1 and {}, got {}",
                MAX_DAYS,
                self.capability_ttl_days
            );
        }
        if !(1..=MAX_DAYS).contains(&self.assignment_deadline_days) {
            anyhow::bail!(
                "assignment_deadline_days must be between 1 and {}, got {}",
                MAX_DAYS,
                self.assignment_deadline_days
            );
        }
        if self.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be positive");
        }
        if self.list_limit < 1 {
            anyhow::bail!("list_limit must be positive, got {}", self.list_limit);
        }
        Ok(())
    }

    pub fn capability_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.capability_ttl_days)
    }

    pub fn assignment_deadline(&self) -> chrono::Duration {
        chrono::Duration::days(self.assignment_deadline_days)
    }
}
