//! Authentication: password hashing, access tokens, the request principal
//! extractor and the register/login workflow.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod service;
pub mod token;

pub use middleware::{AuthenticatedPrincipal, ACCESS_TOKEN_COOKIE};
pub use password::PasswordHasher;
pub use service::AuthService;
pub use token::{Claims, Clock, SystemClock, TokenService};
