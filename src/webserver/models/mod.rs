/// Data types shared by the route handlers
pub mod responses;
pub mod users;

pub use responses::{HealthResponse, NotFoundResponse};
pub use users::{User, UserPatch, UserStore};
