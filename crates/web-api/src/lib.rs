//! Web API 层。
//!
//! 提供 Axum 路由，把 HTTP / SSE 请求委托给应用层的聊天室服务。

mod auth;
mod error;
mod routes;
mod server;
mod state;
mod stream;

pub use auth::{Claims, LoginResponse, SessionTokens};
pub use error::ApiError;
pub use routes::router;
pub use server::serve;
pub use state::AppState;
