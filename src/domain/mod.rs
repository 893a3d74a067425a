/// Domain types shared by the store, cache and session layers.

mod user;

pub use user::{NewUser, Pagination, PublicUser, Role, User, UserChanges, UserFilter};

#[cfg(test)]
pub(crate) use user::sample_user;
