use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use chrono::Utc;
use serde::Serialize;

/// Every endpoint answers with this envelope so clients and the external
/// workflow engine can handle responses uniformly.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    pub success: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

pub fn success_body<T: Serialize>(
    data: T,
    message: &str,
    status: StatusCode,
    endpoint: &str,
) -> ApiEnvelope<T> {
    ApiEnvelope {
        success: true,
        status_code: status.as_u16(),
        message: Some(message.to_string()),
        error: None,
        data: Some(data),
        details: None,
        timestamp: Utc::now().to_rfc3339(),
        endpoint: some_endpoint(endpoint),
    }
}

pub fn success<T: Serialize>(
    data: T,
    message: &str,
    status: StatusCode,
    endpoint: &str,
) -> HttpResponse {
    HttpResponse::build(status).json(success_body(data, message, status, endpoint))
}

pub fn error(
    message: &str,
    status: StatusCode,
    details: Option<serde_json::Value>,
    endpoint: &str,
) -> HttpResponse {
    let body: ApiEnvelope<serde_json::Value> = ApiEnvelope {
        success: false,
        status_code: status.as_u16(),
        message: None,
        error: Some(message.to_string()),
        data: None,
        details,
        timestamp: Utc::now().to_rfc3339(),
        endpoint: some_endpoint(endpoint),
    };
    HttpResponse::build(status).json(body)
}

fn some_endpoint(endpoint: &str) -> Option<String> {
    if endpoint.is_empty() {
        None
    } else {
        Some(endpoint.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_has_expected_fields() {
        let body = success_body(json!({"id": 1}), "Created", StatusCode::CREATED, "POST /api/todos");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["statusCode"], json!(201));
        assert_eq!(value["message"], json!("Created"));
        assert_eq!(value["data"]["id"], json!(1));
        assert_eq!(value["endpoint"], json!("POST /api/todos"));
        assert!(value.get("error").is_none());
        assert!(value["timestamp"].as_str().is_some());
    }

    #[test]
    fn empty_endpoint_is_omitted() {
        let body = success_body(json!(null), "ok", StatusCode::OK, "");
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("endpoint").is_none());
    }
}
