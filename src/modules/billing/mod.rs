/// Billing / entitlement collaborator seam
///
/// The engine never computes limits itself: the web/billing side owns tier
/// definitions and daily usage accounting. This module only defines the
/// contract the engine consumes.
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Entitlement level of an owner, bounding batch size and storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
    Business,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Free => write!(f, "free"),
            Tier::Premium => write!(f, "premium"),
            Tier::Business => write!(f, "business"),
        }
    }
}

/// Limits resolved for one owner at admission time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierLimits {
    pub tier: Tier,
    pub max_files: u32,
    pub max_file_size_mb: u64,
    pub max_total_size_mb: u64,
    pub storage_quota_mb: u64,
    pub daily_quota_remaining: u32,
    pub bulk_entitled: bool,
}

impl TierLimits {
    pub fn max_file_size_bytes(&self) -> i64 {
        (self.max_file_size_mb * 1024 * 1024) as i64
    }

    pub fn max_total_size_bytes(&self) -> i64 {
        (self.max_total_size_mb * 1024 * 1024) as i64
    }

    pub fn storage_quota_bytes(&self) -> i64 {
        (self.storage_quota_mb * 1024 * 1024) as i64
    }
}

/// Lookup and usage accounting provided by the billing service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Entitlements: Send + Sync {
    /// Resolve the current limits for an owner
    async fn tier_limits(&self, owner_id: &str) -> AppResult<TierLimits>;

    /// Record processed items against the owner's daily quota.
    /// Called once per job on successful completion, never per item.
    async fn increment_usage(&self, owner_id: &str, count: u32) -> AppResult<()>;
}
