pub mod session;
pub mod storage;

pub use session::{AuthUser, Session};
pub use storage::SessionStorage;
