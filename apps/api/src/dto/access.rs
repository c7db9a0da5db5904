use gatewarden_domain::{Decision, GrantSource};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for a capability check.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/access-check-request.ts"
)]
pub struct AccessCheckRequest {
    pub resource: String,
    pub action: String,
}

/// Evaluator decision exposed for conditional UI rendering.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../../packages/api-types/src/generated/access-check-response.ts"
)]
pub struct AccessCheckResponse {
    pub granted: bool,
    pub wildcard: bool,
    pub source_role: Option<String>,
}

impl From<Decision> for AccessCheckResponse {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Granted {
                source: GrantSource::Wildcard { role },
            } => Self {
                granted: true,
                wildcard: true,
                source_role: Some(role),
            },
            Decision::Granted {
                source: GrantSource::RoleGrant { role },
            } => Self {
                granted: true,
                wildcard: false,
                source_role: Some(role),
            },
            Decision::Denied { .. } => Self {
                granted: false,
                wildcard: false,
                source_role: None,
            },
        }
    }
}
