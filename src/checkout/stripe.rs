//! Stripe Checkout over its form-encoded REST API.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error};

use crate::checkout::gateway::{GatewayError, PaymentGateway};
use crate::checkout::signature;
use crate::checkout::{
    CheckoutSession, CompletedSession, EventBody, GatewayEvent, SessionRequest, SessionStatus,
    CHECKOUT_COMPLETED,
};
use crate::config::AppConfig;

/// Countries a shipping address may be collected for
const SHIPPING_COUNTRIES: [&str; 7] = ["US", "CA", "GB", "AU", "AE", "SA", "EG"];

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub api_base: String,
    pub secret_key: String,
    pub webhook_secret: String,
    pub timeout: Duration,
    pub tolerance: Duration,
}

impl StripeConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_base: config.stripe_api_base.trim_end_matches('/').to_string(),
            secret_key: config.stripe_secret_key.clone(),
            webhook_secret: config.stripe_webhook_secret.clone(),
            timeout: config.gateway_timeout,
            tolerance: config.webhook_tolerance,
        }
    }
}

/// [`PaymentGateway`] backed by Stripe Checkout
#[derive(Debug, Clone)]
pub struct StripeGateway {
    config: StripeConfig,
    http: Client,
}

impl StripeGateway {
    /// Every call made through this client is bounded by `config.timeout`
    pub fn new(config: StripeConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;
        Ok(Self { config, http })
    }

    fn session_form(request: &SessionRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("billing_address_collection".to_string(), "auto".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];
        for (i, country) in SHIPPING_COUNTRIES.iter().enumerate() {
            form.push((
                format!("shipping_address_collection[allowed_countries][{i}]"),
                country.to_string(),
            ));
        }
        for (i, item) in request.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
            form.push((format!("{prefix}[price_data][currency]"), request.currency.clone()));
            form.push((format!("{prefix}[price_data][unit_amount]"), item.unit_amount.to_string()));
            form.push((format!("{prefix}[price_data][product_data][name]"), item.name.clone()));
            if let Some(image) = &item.image {
                form.push((format!("{prefix}[price_data][product_data][images][0]"), image.clone()));
            }
            if let Some(description) = item.description.as_deref().filter(|d| !d.trim().is_empty()) {
                form.push((
                    format!("{prefix}[price_data][product_data][description]"),
                    description.to_string(),
                ));
            }
        }
        for (key, value) in request.metadata.pairs() {
            form.push((format!("metadata[{key}]"), value.to_string()));
        }
        form
    }

    fn transport_error(err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Upstream(err.to_string())
        }
    }

    async fn upstream_failure(response: reqwest::Response, action: &str) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!(status = %status, "Stripe {} failed: {}", action, body.chars().take(200).collect::<String>());
        GatewayError::Upstream(format!("{action} failed with status {status}"))
    }
}

#[derive(Debug, Deserialize)]
struct SessionCreated {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    payment_status: String,
    #[serde(default)]
    customer_details: Option<serde_json::Value>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

/// Event type recorded when an unreadable body names none
const UNKNOWN_EVENT_TYPE: &str = "unknown";

/// Decode an already authenticated event body
///
/// Never fails: a body the gateway signed but that cannot be decoded comes
/// back as [`EventBody::Unreadable`] so it can still be logged and acknowledged.
pub(crate) fn decode_event(raw_body: &[u8]) -> GatewayEvent {
    let payload: serde_json::Value = match serde_json::from_slice(raw_body) {
        Ok(payload) => payload,
        Err(err) => {
            let text = serde_json::Value::String(String::from_utf8_lossy(raw_body).into_owned());
            return unreadable_event(raw_body, text, err.to_string());
        }
    };
    let raw: RawEvent = match serde_json::from_value(payload.clone()) {
        Ok(raw) => raw,
        Err(err) => return unreadable_event(raw_body, payload, err.to_string()),
    };

    let body = if raw.event_type == CHECKOUT_COMPLETED {
        match serde_json::from_value::<CompletedSession>(raw.data.object) {
            Ok(session) => EventBody::CompletedSession(session),
            Err(err) => EventBody::Unreadable(err.to_string()),
        }
    } else {
        EventBody::Other
    };

    GatewayEvent {
        id: raw.id,
        event_type: raw.event_type,
        body,
        payload,
    }
}

/// Keeps whatever id and type the body names; otherwise the id is derived
/// from the body hash so redeliveries land on the same log row
fn unreadable_event(raw_body: &[u8], payload: serde_json::Value, reason: String) -> GatewayEvent {
    let named = |key: &str| payload.get(key).and_then(serde_json::Value::as_str).map(str::to_string);
    let id = named("id").unwrap_or_else(|| format!("unreadable_{}", hex::encode(Sha256::digest(raw_body))));
    let event_type = named("type").unwrap_or_else(|| UNKNOWN_EVENT_TYPE.to_string());
    GatewayEvent {
        id,
        event_type,
        body: EventBody::Unreadable(reason),
        payload,
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_session(&self, request: &SessionRequest) -> Result<CheckoutSession, GatewayError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .form(&Self::session_form(request))
            .send()
            .await
            .map_err(Self::transport_error)?;

        if !response.status().is_success() {
            return Err(Self::upstream_failure(response, "session creation").await);
        }

        let created: SessionCreated = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        let url = created
            .url
            .ok_or_else(|| GatewayError::Malformed(format!("session {} has no url", created.id)))?;
        debug!("Opened checkout session {}", created.id);
        Ok(CheckoutSession {
            session_id: created.id,
            url,
        })
    }

    fn verify_event(&self, raw_body: &[u8], signature: &str) -> Result<GatewayEvent, GatewayError> {
        signature::verify(
            raw_body,
            signature,
            &self.config.webhook_secret,
            self.config.tolerance,
            Utc::now().timestamp(),
        )?;
        Ok(decode_event(raw_body))
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionStatus, GatewayError> {
        let url = format!("{}/v1/checkout/sessions/{}", self.config.api_base, session_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::SessionNotFound(session_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::upstream_failure(response, "session lookup").await);
        }

        let session: SessionObject = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        Ok(SessionStatus {
            status: session.payment_status,
            buyer: session
                .customer_details
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            metadata: session.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{CheckoutMetadata, GatewayLineItem};

    fn request() -> SessionRequest {
        SessionRequest {
            line_items: vec![GatewayLineItem {
                name: "Tee".into(),
                unit_amount: 4500,
                quantity: 2,
                image: Some("https://img/tee.png".into()),
                description: Some("  ".into()),
            }],
            metadata: CheckoutMetadata {
                user_id: Some("u-1".into()),
                total_amount: Some("90.00".into()),
                ..Default::default()
            },
            currency: "usd".into(),
            success_url: "https://shop/en/checkout/success?session_id={CHECKOUT_SESSION_ID}".into(),
            cancel_url: "https://shop/en/checkout/cancel".into(),
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_session_form_encodes_line_items_and_metadata() {
        let form = StripeGateway::session_form(&request());
        assert_eq!(value(&form, "line_items[0][price_data][unit_amount]"), Some("4500"));
        assert_eq!(value(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            value(&form, "line_items[0][price_data][product_data][images][0]"),
            Some("https://img/tee.png")
        );
        assert_eq!(value(&form, "line_items[0][price_data][product_data][description]"), None);
        assert_eq!(value(&form, "metadata[userId]"), Some("u-1"));
        assert_eq!(value(&form, "metadata[totalAmount]"), Some("90.00"));
        assert_eq!(value(&form, "metadata[couponCode]"), None);
    }

    #[test]
    fn test_decode_completed_event() {
        let body = br#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_1", "payment_intent": "pi_1", "metadata": {"userId": "abc"}}}
        }"#;
        let event = decode_event(body);
        let EventBody::CompletedSession(session) = event.body else {
            panic!("expected a completed session, got {:?}", event.body);
        };
        assert_eq!(session.payment_reference(), "pi_1");
        assert_eq!(session.metadata.user_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_decode_other_event_has_no_session() {
        let body = br#"{"id": "evt_2", "type": "payment_intent.created", "data": {"object": {"id": "pi_2"}}}"#;
        let event = decode_event(body);
        assert_eq!(event.event_type, "payment_intent.created");
        assert_eq!(event.body, EventBody::Other);
    }

    #[test]
    fn test_decode_garbage_is_unreadable_with_stable_id() {
        let event = decode_event(b"not json");
        assert!(matches!(event.body, EventBody::Unreadable(_)));
        assert!(event.id.starts_with("unreadable_"));
        assert_eq!(event.event_type, "unknown");
        assert_eq!(event.payload, serde_json::Value::String("not json".into()));
        assert_eq!(decode_event(b"not json").id, event.id);
    }

    #[test]
    fn test_decode_keeps_id_of_unreadable_session() {
        let body = br#"{"id": "evt_9", "type": "checkout.session.completed", "data": {"object": {"metadata": 7}}}"#;
        let event = decode_event(body);
        assert_eq!(event.id, "evt_9");
        assert_eq!(event.event_type, "checkout.session.completed");
        assert!(matches!(event.body, EventBody::Unreadable(_)));
    }

    #[test]
    fn test_verify_event_rejects_bad_signature() {
        let gateway = StripeGateway::new(StripeConfig {
            api_base: "http://localhost".into(),
            secret_key: "sk_test".into(),
            webhook_secret: "whsec_test".into(),
            timeout: Duration::from_secs(1),
            tolerance: Duration::from_secs(300),
        })
        .unwrap();
        let body = br#"{"id":"evt_1","type":"x","data":{"object":{}}}"#;
        let header = signature::sign(body, "whsec_wrong", Utc::now().timestamp());
        assert!(matches!(
            gateway.verify_event(body, &header),
            Err(GatewayError::InvalidSignature(_))
        ));

        let header = signature::sign(body, "whsec_test", Utc::now().timestamp());
        assert!(gateway.verify_event(body, &header).is_ok());
    }
}
