//! Subscription tiers, their limit tables, and plan resolution records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription level determining capacity caps and daily quotas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    #[default]
    Basic,
    Premium,
    Pro,
}

/// Per-tier limits. Values are part of the client contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub max_delegates: u64,
    pub max_assets: u64,
    pub max_collections: u64,
    pub max_write_ops_per_day: u64,
    pub max_destructive_ops_per_day: u64,
    pub max_invite_ops_per_day: u64,
    pub max_bulk_ops_per_day: u64,
}

const BASIC: TierLimits = TierLimits {
    max_delegates: 1,
    max_assets: 1_000,
    max_collections: 200,
    max_write_ops_per_day: 2_000,
    max_destructive_ops_per_day: 500,
    max_invite_ops_per_day: 100,
    max_bulk_ops_per_day: 50,
};

const PREMIUM: TierLimits = TierLimits {
    max_delegates: 5,
    max_assets: 10_000,
    max_collections: 1_000,
    max_write_ops_per_day: 10_000,
    max_destructive_ops_per_day: 2_000,
    max_invite_ops_per_day: 500,
    max_bulk_ops_per_day: 250,
};

const PRO: TierLimits = TierLimits {
    max_delegates: 20,
    max_assets: 50_000,
    max_collections: 5_000,
    max_write_ops_per_day: 50_000,
    max_destructive_ops_per_day: 10_000,
    max_invite_ops_per_day: 2_000,
    max_bulk_ops_per_day: 1_000,
};

impl TierLimits {
    /// The owner plus every delegate.
    pub fn max_members(&self) -> u64 {
        self.max_delegates + 1
    }

    /// Daily ceiling for `kind`.
    pub fn daily(&self, kind: QuotaKind) -> u64 {
        match kind {
            QuotaKind::Write => self.max_write_ops_per_day,
            QuotaKind::Destructive => self.max_destructive_ops_per_day,
            QuotaKind::Invite => self.max_invite_ops_per_day,
            QuotaKind::Bulk => self.max_bulk_ops_per_day,
        }
    }

    /// Hard cap for `field`.
    pub fn capacity(&self, field: CapacityField) -> u64 {
        match field {
            CapacityField::Assets => self.max_assets,
            CapacityField::Collections => self.max_collections,
            CapacityField::Delegates => self.max_delegates,
        }
    }
}

impl Tier {
    pub fn limits(self) -> TierLimits {
        match self {
            Self::Basic => BASIC,
            Self::Premium => PREMIUM,
            Self::Pro => PRO,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "BASIC",
            Self::Premium => "PREMIUM",
            Self::Pro => "PRO",
        }
    }

    /// Map a store product identifier such as `app.vault.pro.monthly` to a tier.
    ///
    /// Returns `None` for products that do not name a paid tier.
    pub fn from_product_id(product_id: &str) -> Option<Self> {
        let lowered = product_id.to_ascii_lowercase();
        let mut tokens = lowered.split(|ch: char| matches!(ch, '.' | '_' | '-' | ':'));
        tokens.find_map(|token| match token {
            "pro" => Some(Self::Pro),
            "premium" => Some(Self::Premium),
            _ => None,
        })
    }
}

/// Daily rate quota families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuotaKind {
    Write,
    Destructive,
    Invite,
    Bulk,
}

impl QuotaKind {
    /// Counter field inside the daily quota document.
    pub fn field(self) -> &'static str {
        match self {
            Self::Write => "writeOps",
            Self::Destructive => "destructiveOps",
            Self::Invite => "inviteOps",
            Self::Bulk => "bulkOps",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Destructive => "destructive",
            Self::Invite => "invite",
            Self::Bulk => "bulk",
        }
    }

    /// Limit name reported to clients.
    pub fn limit_name(self) -> &'static str {
        match self {
            Self::Write => "maxWriteOpsPerDay",
            Self::Destructive => "maxDestructiveOpsPerDay",
            Self::Invite => "maxInviteOpsPerDay",
            Self::Bulk => "maxBulkOpsPerDay",
        }
    }
}

/// Capacity caps enforced against the usage counters document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapacityField {
    Assets,
    Collections,
    Delegates,
}

impl CapacityField {
    /// Limit name reported to clients.
    pub fn limit_name(self) -> &'static str {
        match self {
            Self::Assets => "maxAssets",
            Self::Collections => "maxCollections",
            Self::Delegates => "maxDelegates",
        }
    }
}

/// Billing state reported by the store or receipt verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Expired,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// `active`, `trialing` and `past_due` keep paid features on.
    pub fn is_paid(self) -> bool {
        matches!(self, Self::Active | Self::Trialing | Self::PastDue)
    }
}

/// Subscription record stored per user (`subscriptions/{uid}`) or, for
/// legacy vaults, per vault (`vaultSubscriptions/{v}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub tier: Tier,
    pub status: SubscriptionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn is_paid(&self) -> bool {
        self.status.is_paid()
    }
}

/// Where a vault's plan was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanSource {
    OwnerSubscription,
    LegacyVaultSubscription,
    Default,
}

/// Effective plan of a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPlan {
    /// Subscription tier on record, even when unpaid.
    pub subscribed_tier: Tier,
    pub status: Option<SubscriptionStatus>,
    pub paid: bool,
    pub source: PlanSource,
}

impl ResolvedPlan {
    pub fn from_subscription(subscription: &Subscription, source: PlanSource) -> Self {
        Self {
            subscribed_tier: subscription.tier,
            status: Some(subscription.status),
            paid: subscription.is_paid(),
            source,
        }
    }

    /// Unpaid BASIC plan used when no subscription exists.
    pub fn basic() -> Self {
        Self {
            subscribed_tier: Tier::Basic,
            status: None,
            paid: false,
            source: PlanSource::Default,
        }
    }

    /// Tier whose limits apply: the subscribed tier while paid, BASIC otherwise.
    pub fn tier(&self) -> Tier {
        if self.paid {
            self.subscribed_tier
        } else {
            Tier::Basic
        }
    }

    pub fn limits(&self) -> TierLimits {
        self.tier().limits()
    }
}
