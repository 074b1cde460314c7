//! User repository for PostgreSQL

use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::UserRepository;
use crate::models::{NewUser, Role, UpdateUser, User, UserQuery, UserStatus};

const USER_COLUMNS: &str = "id, name, email, password_hash, contact_number, profile_image, \
     role, status, is_temporary_password, last_login, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

fn user_from_row(row: &PgRow) -> DatabaseResult<User> {
    let decode = |e: sqlx::Error| DatabaseError::Decode(e.to_string());

    let role: String = row.try_get("role").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;

    Ok(User {
        id: row.try_get("id").map_err(decode)?,
        name: row.try_get("name").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        contact_number: row.try_get("contact_number").map_err(decode)?,
        profile_image: row.try_get("profile_image").map_err(decode)?,
        role: role.parse().map_err(DatabaseError::Decode)?,
        status: status.parse().map_err(DatabaseError::Decode)?,
        is_temporary_password: row.try_get("is_temporary_password").map_err(decode)?,
        last_login: row.try_get("last_login").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

/// Escape LIKE wildcards so a search term matches literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &UserQuery) {
    builder.push(" WHERE TRUE");

    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR COALESCE(contact_number, '') ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(role) = query.role {
        builder.push(" AND role = ").push_bind(role.as_str());
    }

    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &'static str, value: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(user_from_row).transpose()
    }
}

impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: NewUser) -> DatabaseResult<User> {
        info!("Creating new {} account: {}", new_user.role, new_user.email);

        let sql = format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, contact_number, role, status, is_temporary_password)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.name)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.contact_number)
            .bind(new_user.role.as_str())
            .bind(new_user.status.as_str())
            .bind(new_user.is_temporary_password)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        user_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_contact_number(&self, contact_number: &str) -> DatabaseResult<Option<User>> {
        self.find_one("contact_number", contact_number).await
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> DatabaseResult<Option<User>> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");

        if let Some(name) = changes.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(contact_number) = changes.contact_number {
            builder.push(", contact_number = ").push_bind(contact_number);
        }
        if let Some(profile_image) = changes.profile_image {
            builder.push(", profile_image = ").push_bind(profile_image);
        }
        if let Some(password_hash) = changes.password_hash {
            builder.push(", password_hash = ").push_bind(password_hash);
        }
        if let Some(flag) = changes.is_temporary_password {
            builder.push(", is_temporary_password = ").push_bind(flag);
        }
        if let Some(role) = changes.role {
            builder.push(", role = ").push_bind(role.as_str());
        }
        if let Some(status) = changes.status {
            builder.push(", status = ").push_bind(status.as_str());
        }
        if let Some(last_login) = changes.last_login {
            builder.push(", last_login = ").push_bind(last_login);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(USER_COLUMNS);

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn bulk_update(
        &self,
        ids: &[Uuid],
        status: Option<UserStatus>,
        role: Option<Role>,
    ) -> DatabaseResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET status = COALESCE($2, status),
                role = COALESCE($3, role),
                updated_at = NOW()
            WHERE id = ANY($1)
              AND (status IS DISTINCT FROM COALESCE($2, status)
                   OR role IS DISTINCT FROM COALESCE($3, role))
            "#,
        )
        .bind(ids.to_vec())
        .bind(status.map(|s| s.as_str()))
        .bind(role.map(|r| r.as_str()))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &UserQuery) -> DatabaseResult<(Vec<User>, u64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT ");
        select.push(USER_COLUMNS).push(" FROM users");
        push_filters(&mut select, query);
        select
            .push(" ORDER BY ")
            .push(query.sort_by.column())
            .push(" ")
            .push(query.sort_order.as_sql())
            .push(" NULLS LAST, id ASC LIMIT ")
            .push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        let users = rows
            .iter()
            .map(user_from_row)
            .collect::<DatabaseResult<Vec<_>>>()?;

        Ok((users, total.max(0) as u64))
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        common::database::health_check(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ali"), "%ali%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn filters_only_bind_present_criteria() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filters(
            &mut builder,
            &UserQuery {
                search: Some("ali".into()),
                role: Some(Role::Staff),
                ..Default::default()
            },
        );

        let sql = builder.sql();
        assert!(sql.contains("name ILIKE $1"));
        assert!(sql.contains("COALESCE(contact_number, '') ILIKE $3"));
        assert!(sql.contains("role = $4"));
        assert!(!sql.contains("status ="));
    }
}
