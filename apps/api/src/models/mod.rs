pub mod resume;
pub mod role;
pub mod user;

pub use resume::{BaseResume, BaseRole, ResumeLine, TailoredResume};
pub use role::{Company, Impact, NewRole, RoleEntry, StructuredRole};
pub use user::UserRecord;
