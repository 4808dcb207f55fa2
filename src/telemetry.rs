use hyper::client::HttpConnector;
use hyper::{Body, Client, Request};
use tracing::{error, trace};

/// HTTP client for the telemetry sink. Delivery is fire-and-forget: the
/// upload runs on its own task, failures are logged and never retried.
#[derive(Clone)]
pub struct TelemetrySink {
    client: Client<HttpConnector>,
    uri: String,
}

impl TelemetrySink {
    pub fn new(uri: String) -> Self {
        Self {
            client: Client::new(),
            uri,
        }
    }

    /// Upload one encoded slot mapping under the given routing credential.
    pub fn deliver(&self, slots: Vec<(String, String)>, api_key: String) {
        let client = self.client.clone();
        let uri = self.uri.clone();
        tokio::spawn(async move {
            let payload = encode_form(&slots);

            let request = match Request::post(&uri)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .header("X-THINGSPEAKAPIKEY", api_key)
                .body(Body::from(payload))
            {
                Ok(request) => request,
                Err(e) => {
                    error!("failed to build telemetry request: {}", e);
                    return;
                }
            };

            match client.request(request).await {
                Ok(response) if response.status().is_success() => {
                    trace!("telemetry upload accepted");
                }
                Ok(response) => {
                    error!("telemetry sink returned HTTP {}", response.status());
                }
                Err(e) => {
                    error!("telemetry delivery failed: {}", e);
                }
            }
        });
    }
}

/// The sink speaks `application/x-www-form-urlencoded`; slot payloads are
/// JSON strings, so they need escaping on the way out.
fn encode_form(slots: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (slot, payload) in slots {
        serializer.append_pair(slot, payload);
    }
    serializer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_body_keeps_slot_order_and_escapes_payloads() {
        let slots = vec![
            ("field1".to_string(), r#"{"id":"00"}"#.to_string()),
            ("field2".to_string(), "10.0.0.3".to_string()),
        ];
        let body = encode_form(&slots);
        assert_eq!(body, "field1=%7B%22id%22%3A%2200%22%7D&field2=10.0.0.3");
    }

    #[test]
    fn form_body_round_trips_through_a_form_parser() {
        let slots = vec![
            ("field1".to_string(), r#"[{"id":"03","meshAddress":"13"}]"#.to_string()),
            ("lat".to_string(), "52.069629".to_string()),
        ];
        let body = encode_form(&slots);
        let decoded: Vec<(String, String)> = form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect();
        assert_eq!(decoded, slots);
    }
}
