//! Credential store
//!
//! [`UserRepository`] is the single source of truth for identities. The
//! Postgres implementation backs the running service; the in-memory one
//! backs tests and local experiments.

use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{NewUser, Role, UpdateUser, User, UserQuery, UserStatus};

pub mod memory;
pub mod user;

pub use memory::MemoryUserRepository;
pub use user::PgUserRepository;

/// Storage operations on user records
///
/// Emails passed in are expected to be normalized already.
pub trait UserRepository: Clone + Send + Sync + 'static {
    /// Insert a record; a taken email yields `DatabaseError::UniqueViolation`
    fn create(&self, new_user: NewUser) -> impl Future<Output = DatabaseResult<User>> + Send;

    fn find_by_id(&self, id: Uuid) -> impl Future<Output = DatabaseResult<Option<User>>> + Send;

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = DatabaseResult<Option<User>>> + Send;

    fn find_by_contact_number(
        &self,
        contact_number: &str,
    ) -> impl Future<Output = DatabaseResult<Option<User>>> + Send;

    /// Apply changes and return the updated record, `None` if absent
    fn update(
        &self,
        id: Uuid,
        changes: UpdateUser,
    ) -> impl Future<Output = DatabaseResult<Option<User>>> + Send;

    /// Set status and/or role on every listed record in one statement and
    /// return how many records actually changed. Not transactional.
    fn bulk_update(
        &self,
        ids: &[Uuid],
        status: Option<UserStatus>,
        role: Option<Role>,
    ) -> impl Future<Output = DatabaseResult<u64>> + Send;

    /// Hard delete; `false` if nothing was removed
    fn delete(&self, id: Uuid) -> impl Future<Output = DatabaseResult<bool>> + Send;

    /// One page of matching records plus the total match count
    fn list(
        &self,
        query: &UserQuery,
    ) -> impl Future<Output = DatabaseResult<(Vec<User>, u64)>> + Send;

    fn health_check(&self) -> impl Future<Output = DatabaseResult<bool>> + Send;
}
