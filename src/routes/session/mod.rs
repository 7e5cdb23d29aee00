mod handler;
mod model;

pub use handler::{authenticate, count, get_data, logout, status, store_data};
pub use model::{
    AuthRequest, AuthResponse, AuthStatusResponse, SessionDataRequest, SessionDataResponse,
};
