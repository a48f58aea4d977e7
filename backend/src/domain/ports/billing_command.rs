//! Driving port for subscription billing.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{Caller, Error, Subscription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceiptRequest {
    pub caller: Caller,
    pub receipt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceiptResponse {
    pub subscription: Subscription,
    /// A paid plan lapsed and downgrade cleanup ran.
    pub downgraded: bool,
    pub vaults_cleaned: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BillingCommand: Send + Sync {
    async fn submit_receipt(&self, request: SubmitReceiptRequest)
    -> Result<SubmitReceiptResponse, Error>;

    async fn subscription(&self, caller: Caller) -> Result<Option<Subscription>, Error>;
}
