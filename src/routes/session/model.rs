use serde::{Deserialize, Serialize};

use crate::session::Payload;

#[derive(Debug, Default, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub passphrase: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    pub passphrase_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionDataRequest {
    pub data: Payload,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionDataResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
