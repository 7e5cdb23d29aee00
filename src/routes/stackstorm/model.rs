use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::stackstorm::CustomConnection;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub id: String,
    pub alias: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionRequest {
    /// Preconfigured connection id, or `"custom"`
    pub current: String,
    #[serde(default)]
    pub custom_connection: Option<CustomConnection>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionResponse {
    pub connections: Vec<ConnectionInfo>,
    pub default: Option<String>,
    pub current: Option<String>,
    pub custom_connection: Option<CustomConnection>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionUpdateResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionTestResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionsListResponse {
    pub executions: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub execution_data: Value,
    pub message: String,
}
