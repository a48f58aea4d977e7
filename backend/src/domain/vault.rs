//! Vault, collection and asset records plus the per-vault usage documents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{AssetId, CapacityField, CollectionId, Error, QuotaKind, UserId, VaultId};

/// Maximum length of vault and collection names and asset titles.
pub const NAME_MAX_LEN: usize = 200;
/// Maximum length of collection descriptions.
pub const DESCRIPTION_MAX_LEN: usize = 2_000;
/// Maximum length of asset bodies.
pub const BODY_MAX_LEN: usize = 20_000;
/// Maximum length of asset media URLs.
pub const MEDIA_URL_MAX_LEN: usize = 2_048;

/// Tenant container stored at `vaults/{v}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: VaultId,
    pub owner_id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Provenance recorded on resources relocated by the move engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedFrom {
    pub vault_id: VaultId,
    pub collection_id: CollectionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
    pub moved_at: DateTime<Utc>,
    pub moved_by: UserId,
}

/// Collection stored at `vaults/{v}/collections/{c}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_from: Option<MovedFrom>,
}

/// Asset stored at `vaults/{v}/assets/{a}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: AssetId,
    pub collection_id: CollectionId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_from: Option<MovedFrom>,
}

/// Cached aggregates stored at `vaults/{v}/usage/counters`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageCounters {
    pub assets_count: u64,
    pub collections_count: u64,
    pub delegates_count: u64,
}

impl UsageCounters {
    pub fn get(&self, field: CapacityField) -> u64 {
        match field {
            CapacityField::Assets => self.assets_count,
            CapacityField::Collections => self.collections_count,
            CapacityField::Delegates => self.delegates_count,
        }
    }

    /// Add `delta`, clamping at zero when it is negative.
    pub fn adjust(&mut self, field: CapacityField, delta: i64) {
        let slot = match field {
            CapacityField::Assets => &mut self.assets_count,
            CapacityField::Collections => &mut self.collections_count,
            CapacityField::Delegates => &mut self.delegates_count,
        };
        *slot = if delta.is_negative() {
            slot.saturating_sub(delta.unsigned_abs())
        } else {
            slot.saturating_add(delta.unsigned_abs())
        };
    }

    /// Copy with `field` adjusted by `delta`.
    pub fn adjusted(mut self, field: CapacityField, delta: i64) -> Self {
        self.adjust(field, delta);
        self
    }
}

/// Per-UTC-day counters stored at `vaults/{v}/dailyQuota/{YYYY-MM-DD}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyQuotaRecord {
    pub write_ops: u64,
    pub destructive_ops: u64,
    pub bulk_ops: u64,
    pub invite_ops: u64,
}

impl DailyQuotaRecord {
    pub fn get(&self, kind: QuotaKind) -> u64 {
        match kind {
            QuotaKind::Write => self.write_ops,
            QuotaKind::Destructive => self.destructive_ops,
            QuotaKind::Bulk => self.bulk_ops,
            QuotaKind::Invite => self.invite_ops,
        }
    }
}

/// Document id of the quota record for `date`.
pub fn quota_day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn bounded(field: &str, value: &str, max: usize) -> Result<(), Error> {
    if value.chars().count() > max {
        return Err(
            Error::invalid_request(format!("{field} must be at most {max} characters"))
                .with_details(json!({ "field": field, "max": max })),
        );
    }
    Ok(())
}

/// Trimmed, non-empty, length-bounded text.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_request(format!("{field} is required"))
            .with_details(json!({ "field": field, "reason": "missing_field" })));
    }
    bounded(field, trimmed, max)?;
    Ok(trimmed.to_owned())
}

/// Optional length-bounded text; blank values become `None`.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, Error> {
    match value.map(str::trim).filter(|text| !text.is_empty()) {
        Some(text) => {
            bounded(field, text, max)?;
            Ok(Some(text.to_owned()))
        }
        None => Ok(None),
    }
}

/// Optional absolute `http`/`https` URL.
pub fn optional_media_url(value: Option<&str>) -> Result<Option<String>, Error> {
    let Some(raw) = optional_text("mediaUrl", value, MEDIA_URL_MAX_LEN)? else {
        return Ok(None);
    };
    let parsed = url::Url::parse(&raw).map_err(|_| {
        Error::invalid_request("mediaUrl must be an absolute URL")
            .with_details(json!({ "field": "mediaUrl", "reason": "invalid_url" }))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::invalid_request("mediaUrl must use http or https")
            .with_details(json!({ "field": "mediaUrl", "reason": "invalid_url" })));
    }
    Ok(Some(parsed.to_string()))
}
