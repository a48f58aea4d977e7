//! Subscription billing HTTP handlers.
//!
//! ```text
//! POST /api/v1/billing/receipts {"receipt":"<store receipt>"}
//! GET /api/v1/billing/subscription
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::ports::SubmitReceiptRequest;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Authenticated;
use crate::inbound::http::rate_limit::RateClass;
use crate::inbound::http::response::ok;
use crate::inbound::http::schemas::{ErrorSchema, SubscriptionSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error};

/// Request payload carrying an app-store receipt.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceiptBody {
    pub receipt: Option<String>,
}

/// Verify a purchase receipt and record the resulting subscription.
#[utoipa::path(
    post,
    path = "/api/v1/billing/receipts",
    request_body = SubmitReceiptBody,
    responses(
        (status = 200, description = "Subscription recorded", body = SubscriptionSchema),
        (status = 400, description = "Receipt rejected", body = ErrorSchema),
        (status = 503, description = "Receipt verification unavailable", body = ErrorSchema)
    ),
    tags = ["billing"],
    operation_id = "submitReceipt",
    security(("BearerToken" = []))
)]
#[post("/billing/receipts")]
pub async fn submit_receipt(
    state: web::Data<HttpState>,
    auth: Authenticated,
    payload: web::Json<SubmitReceiptBody>,
) -> ApiResult<HttpResponse> {
    auth.limit(&state, RateClass::Write)?;
    let receipt = payload
        .into_inner()
        .receipt
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| missing_field_error(FieldName::new("receipt")))?;
    let recorded = state
        .billing
        .submit_receipt(SubmitReceiptRequest {
            caller: auth.into_caller(),
            receipt,
        })
        .await?;
    ok(&recorded)
}

/// Current subscription of the caller, or `null` when they never subscribed.
#[utoipa::path(
    get,
    path = "/api/v1/billing/subscription",
    responses(
        (status = 200, description = "Current subscription", body = SubscriptionSchema),
        (status = 401, description = "Unauthenticated", body = ErrorSchema)
    ),
    tags = ["billing"],
    operation_id = "getSubscription",
    security(("BearerToken" = []))
)]
#[get("/billing/subscription")]
pub async fn subscription(
    state: web::Data<HttpState>,
    auth: Authenticated,
) -> ApiResult<HttpResponse> {
    let subscription = state.billing.subscription(auth.into_caller()).await?;
    ok(&json!({ "subscription": subscription }))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    use crate::domain::ports::SubmitReceiptResponse;
    use crate::domain::{Subscription, SubscriptionStatus, Tier};
    use crate::inbound::http::test_utils::{MockPorts, authorized, send};

    use super::*;

    fn premium() -> Subscription {
        Subscription {
            tier: Tier::Premium,
            status: SubscriptionStatus::Active,
            product_id: Some("vault.premium.monthly".to_owned()),
            expires_at: None,
            transaction_id: None,
            updated_at: None,
        }
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({ "receipt": "   " }))]
    #[actix_web::test]
    async fn receipts_must_not_be_blank(#[case] payload: serde_json::Value) {
        let ports = MockPorts::new().authenticated_as("alice");
        let (status, body) = send(
            ports,
            authorized(TestRequest::post().uri("/api/v1/billing/receipts")).set_json(payload),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "receipt");
    }

    #[rstest]
    #[actix_web::test]
    async fn submitted_receipts_return_the_subscription() {
        let mut ports = MockPorts::new().authenticated_as("alice");
        ports
            .billing
            .expect_submit_receipt()
            .withf(|request| request.receipt == "r-123")
            .returning(|_| {
                Ok(SubmitReceiptResponse {
                    subscription: premium(),
                    downgraded: false,
                    vaults_cleaned: 0,
                })
            });

        let (status, body) = send(
            ports,
            authorized(TestRequest::post().uri("/api/v1/billing/receipts"))
                .set_json(json!({ "receipt": "r-123" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subscription"]["tier"], "PREMIUM");
        assert_eq!(body["downgraded"], false);
    }

    #[rstest]
    #[actix_web::test]
    async fn missing_subscription_is_null() {
        let mut ports = MockPorts::new().authenticated_as("alice");
        ports.billing.expect_subscription().returning(|_| Ok(None));

        let (status, body) = send(
            ports,
            authorized(TestRequest::get().uri("/api/v1/billing/subscription")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["subscription"].is_null());
        assert_eq!(body["ok"], true);
    }
}
