//! In-memory user repository

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::UserRepository;
use crate::models::{NewUser, Role, SortField, SortOrder, UpdateUser, User, UserQuery, UserStatus};

/// Process-local user store with the same uniqueness rules as the database
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(user: &User, query: &UserQuery) -> bool {
    if let Some(role) = query.role {
        if user.role != role {
            return false;
        }
    }
    if let Some(status) = query.status {
        if user.status != status {
            return false;
        }
    }
    match &query.search {
        Some(term) => {
            let term = term.to_lowercase();
            user.name.to_lowercase().contains(&term)
                || user.email.to_lowercase().contains(&term)
                || user
                    .contact_number
                    .as_deref()
                    .is_some_and(|c| c.contains(&term))
        }
        None => true,
    }
}

fn compare(a: &User, b: &User, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::LastLogin => match (a.last_login, b.last_login) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortField::Name => a.name.cmp(&b.name),
        SortField::Email => a.email.cmp(&b.email),
        SortField::Role => a.role.as_str().cmp(b.role.as_str()),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}

impl UserRepository for MemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> DatabaseResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == new_user.email) {
            return Err(DatabaseError::UniqueViolation("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            contact_number: new_user.contact_number,
            profile_image: None,
            role: new_user.role,
            status: new_user.status,
            is_temporary_password: new_user.is_temporary_password,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_contact_number(&self, contact_number: &str) -> DatabaseResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.contact_number.as_deref() == Some(contact_number))
            .cloned())
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> DatabaseResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            changes.apply(user);
            user.clone()
        }))
    }

    async fn bulk_update(
        &self,
        ids: &[Uuid],
        status: Option<UserStatus>,
        role: Option<Role>,
    ) -> DatabaseResult<u64> {
        let mut users = self.users.write().await;
        let mut modified = 0;

        for id in ids {
            let Some(user) = users.get_mut(id) else {
                continue;
            };
            let status_changes = status.is_some_and(|s| s != user.status);
            let role_changes = role.is_some_and(|r| r != user.role);
            if !status_changes && !role_changes {
                continue;
            }

            UpdateUser {
                status,
                role,
                ..Default::default()
            }
            .apply(user);
            modified += 1;
        }

        Ok(modified)
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn list(&self, query: &UserQuery) -> DatabaseResult<(Vec<User>, u64)> {
        let users = self.users.read().await;

        let mut matched: Vec<&User> = users.values().filter(|u| matches(u, query)).collect();
        matched.sort_by(|a, b| {
            let ordering = compare(a, b, query.sort_by);
            let ordering = match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });

        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(true)
    }
}
