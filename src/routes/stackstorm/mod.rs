mod handler;
mod model;

pub use handler::{get_connection, get_execution, list_executions, set_connection, test_connection};
pub use model::{
    ConnectionInfo, ConnectionRequest, ConnectionResponse, ConnectionTestResponse,
    ConnectionUpdateResponse, ExecutionResponse, ExecutionsListResponse,
};
