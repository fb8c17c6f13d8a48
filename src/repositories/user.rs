//! UserRepository - user rows and identity-provider linkage

use super::{Create, Read};
use crate::entities::User;
use sqlx::{Error, MySqlPool};

const USER_COLUMNS: &str = "user_id, username, email, auth_provider, auth_id, avatar_url, \
                            refresh_token, created_at, updated_at";

/// Fields for creating a user on first external-identity login.
pub struct CreateUserData {
    pub username: String,
    pub email: String,
    pub auth_provider: Option<String>,
    pub auth_id: Option<String>,
    pub avatar_url: Option<String>,
}

pub struct UserRepository {
    connection_pool: MySqlPool,
}

impl UserRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.connection_pool)
        .await
    }

    pub async fn find_by_auth_id(&self, auth_id: &str) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE auth_id = ?",
            USER_COLUMNS
        ))
        .bind(auth_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Case-insensitive substring search over username and/or email.
    pub async fn search(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Vec<User>, Error> {
        let mut builder = sqlx::QueryBuilder::new(format!(
            "SELECT {} FROM users WHERE 1 = 1",
            USER_COLUMNS
        ));
        if let Some(username) = username {
            builder.push(" AND LOWER(username) LIKE ");
            builder.push_bind(format!("%{}%", username.to_lowercase()));
        }
        if let Some(email) = email {
            builder.push(" AND LOWER(email) LIKE ");
            builder.push_bind(format!("%{}%", email.to_lowercase()));
        }
        builder
            .build_query_as::<User>()
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Fails with a unique violation when the username is taken.
    pub async fn update_username(&self, user_id: &i32, username: &str) -> Result<(), Error> {
        sqlx::query("UPDATE users SET username = ? WHERE user_id = ?")
            .bind(username)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(())
    }

    pub async fn update_refresh_token(
        &self,
        user_id: &i32,
        refresh_token: &str,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE users SET refresh_token = ? WHERE user_id = ?")
            .bind(refresh_token)
            .bind(user_id)
            .execute(&self.connection_pool)
            .await?;
        Ok(())
    }
}

impl Create<User, CreateUserData> for UserRepository {
    async fn create(&self, data: &CreateUserData) -> Result<User, Error> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, auth_provider, auth_id, avatar_url) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.auth_provider)
        .bind(&data.auth_id)
        .bind(&data.avatar_url)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_id() as i32;
        // Read back for the database-generated timestamps.
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE user_id = ?",
            USER_COLUMNS
        ))
        .bind(new_id)
        .fetch_one(&self.connection_pool)
        .await
    }
}

impl Read<User, i32> for UserRepository {
    async fn read(&self, id: &i32) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE user_id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}
