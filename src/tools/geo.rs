use serde_json::Value;
use tracing::debug;

use crate::config::NetdashConfig;
use crate::error::{NetdashError, Result};

/// Look up `ip` against the configured geolocation provider and pass the
/// provider payload through untouched.
pub async fn lookup(client: &reqwest::Client, ip: &str, config: &NetdashConfig) -> Result<Value> {
    let url = format!("{}/{}", config.geo_provider_url.trim_end_matches('/'), ip);
    debug!("geolocation lookup via {url}");

    let response = client
        .get(&url)
        .timeout(config.geo_timeout())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| NetdashError::Provider(e.to_string()))?;

    let payload: Value = response
        .json()
        .await
        .map_err(|e| NetdashError::Provider(e.to_string()))?;
    classify(payload)
}

/// ip-api.com reports lookup failures inside a 200 payload with
/// `status: "fail"`; those become not-found errors rather than provider
/// outages.
pub fn classify(payload: Value) -> Result<Value> {
    if payload.get("status").and_then(Value::as_str) == Some("fail") {
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Failed to geolocate IP.")
            .to_string();
        return Err(NetdashError::GeoLookup(message));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn successful_payloads_pass_through_unchanged() {
        let payload = json!({
            "status": "success",
            "country": "Canada",
            "city": "Montreal",
            "query": "24.48.0.1",
        });
        assert_eq!(classify(payload.clone()).unwrap(), payload);
    }

    #[test]
    fn provider_fail_status_becomes_a_lookup_error() {
        let payload = json!({"status": "fail", "message": "private range", "query": "10.0.0.1"});
        let err = classify(payload).unwrap_err();
        assert!(matches!(err, NetdashError::GeoLookup(_)));
        assert_eq!(err.to_string(), "private range");
    }

    #[test]
    fn fail_status_without_message_gets_a_generic_one() {
        let err = classify(json!({"status": "fail"})).unwrap_err();
        assert_eq!(err.to_string(), "Failed to geolocate IP.");
    }
}
