//! Authentication boundary: bearer token to typed company context.

mod context;
mod permission;

pub use context::{Claims, CompanyContext, TokenVerifier};
pub use permission::{Access, Permission, Role};
