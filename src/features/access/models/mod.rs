mod account;
mod resource;

pub use account::{EventAccess, Organization, ProjectAccess, Role, UserAccount};
pub use resource::{Permission, ResourceKind, ResourceRef};
