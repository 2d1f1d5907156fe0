use serde::Serialize;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    required_permissions: Option<Vec<String>>,
}

impl ErrorResponse {
    pub(super) fn new(code: &str, message: String) -> Self {
        Self {
            code: code.to_owned(),
            message,
            required_permissions: None,
        }
    }

    pub(super) fn forbidden(missing: Vec<String>) -> Self {
        Self {
            code: "FORBIDDEN".to_owned(),
            message: format!("missing required permissions: {}", missing.join(", ")),
            required_permissions: Some(missing),
        }
    }
}
