//! Bearer token handling: claim decoding, session state, refresh and persistence.

pub mod claims;
pub mod lifecycle;
pub mod session;
pub mod store;

pub use claims::{parse_claims, Claims};
pub use session::{is_expired, Credentials, Session};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
