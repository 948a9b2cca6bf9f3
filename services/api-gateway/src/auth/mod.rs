//! Authentication and authorization: bearer-token verification and the role
//! gate.

pub mod claims;
pub mod rbac;
pub mod verifier;

pub use claims::Claims;
pub use rbac::{authorize, Role};
pub use verifier::{TokenIssuer, TokenVerifier};
