//! Client side of the session lifecycle.
//!
//! A [`SessionContext`] and an [`ApiClient`] share one [`DurableStore`]: the
//! context writes `user`/`token` on login and removes them on logout, the client
//! reads `token` before every request.

pub mod auth;
pub mod http;
pub mod session;
pub mod storage;

pub use auth::AuthClient;
pub use http::{ApiClient, ClientConfig, ClientError};
pub use session::{Session, SessionContext, SessionProvider};
pub use storage::{DurableStore, FileStore, MemoryStore, TOKEN_KEY, USER_KEY};
