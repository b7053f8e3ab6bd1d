//! Microsoft Graph change notifications
//!
//! Handles the subscription validation handshake and notification batches.
//! Items are logged and, when enabled, forwarded over the bridge one at a
//! time in array order.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use emit_common::ChangeNotification;
use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;
use tracing::{debug, error, info, warn};

use crate::api::AppState;
use crate::error::RelayError;
use crate::util::{truncate_for_log, LOG_BODY_LIMIT};

use super::types::{Inbound, RawWebhook};
use super::WebhookProvider;

/// Query parameter carrying the subscription validation token.
pub const VALIDATION_TOKEN_PARAM: &str = "validationToken";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Microsoft Graph subscription notification endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphProvider;

/// A decoded notification together with its JSON as received.
#[derive(Debug)]
pub struct NotificationItem {
    pub notification: ChangeNotification,
    pub raw: Box<RawValue>,
}

#[derive(Deserialize)]
struct RawBatch {
    #[serde(default, deserialize_with = "null_as_empty")]
    value: Vec<Box<RawValue>>,
}

/// A missing or `null` batch is an empty one.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

fn plain_text(status: StatusCode, body: String) -> Response {
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

/// Echo the validation token back as required by the subscription protocol.
pub fn handshake_response(token: &str) -> Response {
    plain_text(StatusCode::OK, token.to_owned())
}

fn decode_batch(body: &[u8]) -> Result<Vec<NotificationItem>, serde_json::Error> {
    let batch: Option<RawBatch> = serde_json::from_slice(body)?;
    batch
        .map(|b| b.value)
        .unwrap_or_default()
        .into_iter()
        .map(|raw| {
            let notification = serde_json::from_str(raw.get())?;
            Ok(NotificationItem { notification, raw })
        })
        .collect()
}

impl WebhookProvider for GraphProvider {
    type Event = Vec<NotificationItem>;

    const NAME: &'static str = "officegraph";

    fn parse(&self, raw: &RawWebhook) -> Result<Inbound<Self::Event>, RelayError> {
        if let Some(token) = raw.query.get(VALIDATION_TOKEN_PARAM).filter(|t| !t.is_empty()) {
            info!("Graph subscription validation handshake");
            return Ok(Inbound::Reply(handshake_response(token)));
        }

        decode_batch(&raw.body).map(Inbound::Event).map_err(|e| {
            error!(
                error = %e,
                body = %truncate_for_log(&String::from_utf8_lossy(&raw.body), LOG_BODY_LIMIT),
                "Failed to decode Graph notification"
            );
            RelayError::Validation(e.to_string())
        })
    }

    async fn respond(&self, state: &AppState, items: Self::Event) -> Response {
        let count = items.len();
        let mut failed = 0usize;

        for item in items {
            let n = &item.notification;
            info!(
                subscription_id = %n.subscription_id,
                change_type = %n.change_type,
                resource = %n.resource,
                tenant_id = n.tenant_id.as_deref().unwrap_or(""),
                expires = ?n.subscription_expiration_date_time,
                resource_id = n.resource_data.as_ref().and_then(|r| r.id.as_deref()).unwrap_or(""),
                "Graph change notification"
            );

            if !state.config.graph_forward_notifications {
                continue;
            }

            match state.forwarder.forward(Self::NAME, item.raw.get()).await {
                Ok(reply) => debug!(subscription_id = %n.subscription_id, reply_bytes = reply.len(), "Notification forwarded"),
                Err(e) => {
                    failed += 1;
                    warn!(subscription_id = %n.subscription_id, error = %e, "Failed to forward notification, continuing");
                }
            }
        }

        info!(count, failed, "Graph notifications processed");
        plain_text(StatusCode::OK, "received".to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;

    use super::*;

    fn raw(query: &[(&str, &str)], body: &'static [u8]) -> RawWebhook {
        RawWebhook::new(
            query.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect::<HashMap<_, _>>(),
            Bytes::from_static(body),
        )
    }

    #[test]
    fn validation_token_short_circuits() {
        let parsed = GraphProvider
            .parse(&raw(&[("validationToken", "abc123")], b"not even json"))
            .unwrap();
        let Inbound::Reply(response) = parsed else {
            panic!("expected handshake reply");
        };
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], TEXT_PLAIN);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    }

    #[test]
    fn decodes_items_in_order_and_keeps_raw_json() {
        let parsed = GraphProvider
            .parse(&raw(
                &[],
                br#"{"value":[{"subscriptionId":"a","extra":1},{"subscriptionId":"b"}]}"#,
            ))
            .unwrap();
        let Inbound::Event(items) = parsed else {
            panic!("expected notifications");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].notification.subscription_id, "a");
        assert_eq!(items[1].notification.subscription_id, "b");
        assert_eq!(items[0].raw.get(), r#"{"subscriptionId":"a","extra":1}"#);
    }

    #[test]
    fn missing_or_null_value_is_an_empty_batch() {
        let bodies: [&'static [u8]; 3] = [b"{}", br#"{"value":null}"#, b"null"];
        for body in bodies {
            let Inbound::Event(items) = GraphProvider.parse(&raw(&[], body)).unwrap() else {
                panic!("expected notifications");
            };
            assert!(items.is_empty());
        }
    }

    #[test]
    fn empty_validation_token_decodes_the_body() {
        let parsed = GraphProvider
            .parse(&raw(&[("validationToken", "")], br#"{"value":[]}"#))
            .unwrap();
        assert!(matches!(parsed, Inbound::Event(items) if items.is_empty()));
    }

    #[test]
    fn invalid_body_is_validation_error() {
        let err = GraphProvider.parse(&raw(&[], b"{bad")).err().unwrap();
        assert!(matches!(err, RelayError::Validation(_)));
    }

    #[test]
    fn wrongly_typed_item_is_validation_error() {
        let err = GraphProvider
            .parse(&raw(&[], br#"{"value":[{"subscriptionId":42}]}"#))
            .err()
            .unwrap();
        assert!(matches!(err, RelayError::Validation(_)));
    }
}
