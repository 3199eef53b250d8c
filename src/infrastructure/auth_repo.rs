use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::AuthRepository;
use crate::domain::token::IssuedToken;
use crate::domain::user::{Avatar, NewUser, User, UserChanges, UserCredentials};
use crate::schema::{avatars, tokens, users};

use super::models::{AvatarRow, NewTokenRow, UserRow};

pub struct DieselAuthRepository {
    pool: DbPool,
}

impl DieselAuthRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn with_avatar(conn: &mut PgConnection, row: UserRow) -> Result<UserCredentials, DomainError> {
    let avatar = AvatarRow::belonging_to(&row)
        .select(AvatarRow::as_select())
        .first(conn)
        .optional()?;
    let password_hash = row.password_hash.clone();
    Ok(UserCredentials {
        user: row.into_user(avatar)?,
        password_hash,
    })
}

fn replace_avatar(
    conn: &mut PgConnection,
    user_id: Uuid,
    avatar: &Avatar,
) -> Result<(), DomainError> {
    diesel::delete(avatars::table.filter(avatars::user_id.eq(user_id))).execute(conn)?;
    diesel::insert_into(avatars::table)
        .values(&AvatarRow {
            public_id: avatar.public_id.clone(),
            url: avatar.url.clone(),
            user_id,
            created_at: Utc::now(),
        })
        .execute(conn)?;
    Ok(())
}

fn user_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<UserCredentials>, DomainError> {
    let row = users::table
        .find(id)
        .select(UserRow::as_select())
        .first(conn)
        .optional()?;
    row.map(|r| with_avatar(conn, r)).transpose()
}

impl AuthRepository for DieselAuthRepository {
    fn create_user(&self, user: &NewUser) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(users::table)
                .values(&UserRow {
                    id: user.id,
                    name: user.name.clone(),
                    email: user.email.clone(),
                    password_hash: user.password_hash.clone(),
                    role: user.role.as_str().to_string(),
                    created_at: user.created_at,
                })
                .execute(conn)?;
            replace_avatar(conn, user.id, &user.avatar)?;

            user_by_id(conn, user.id)?
                .map(|c| c.user)
                .ok_or_else(|| DomainError::not_found("user"))
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(user_by_id(&mut conn, id)?.map(|c| c.user))
    }

    fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(|r| with_avatar(&mut conn, r)).transpose()
    }

    fn find_credentials_by_id(&self, id: Uuid) -> Result<Option<UserCredentials>, DomainError> {
        let mut conn = self.pool.get()?;
        user_by_id(&mut conn, id)
    }

    fn list_users(&self) -> Result<Vec<User>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let rows = users::table
                .select(UserRow::as_select())
                .order((users::created_at.asc(), users::id.asc()))
                .load(conn)?;
            let avatars = AvatarRow::belonging_to(&rows)
                .select(AvatarRow::as_select())
                .load(conn)?
                .grouped_by(&rows);

            rows.into_iter()
                .zip(avatars)
                .map(|(row, avatar)| row.into_user(avatar.into_iter().next()))
                .collect()
        })
    }

    fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        avatar: Option<Avatar>,
    ) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(users::table.find(id))
                .set((users::name.eq(name), users::email.eq(email)))
                .execute(conn)?;
            if updated == 0 {
                return Err(DomainError::not_found("user"));
            }
            if let Some(avatar) = &avatar {
                replace_avatar(conn, id, avatar)?;
            }

            user_by_id(conn, id)?
                .map(|c| c.user)
                .ok_or_else(|| DomainError::not_found("user"))
        })
    }

    fn update_user(&self, id: Uuid, changes: &UserChanges) -> Result<User, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(users::table.find(id))
                .set((
                    users::name.eq(&changes.name),
                    users::email.eq(&changes.email),
                    users::role.eq(changes.role.as_str()),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(DomainError::not_found("user"));
            }

            user_by_id(conn, id)?
                .map(|c| c.user)
                .ok_or_else(|| DomainError::not_found("user"))
        })
    }

    fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(users::table.find(id))
            .set(users::password_hash.eq(password_hash))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::not_found("user"));
        }
        Ok(())
    }

    fn delete_user(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(users::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn replace_token(&self, token: &IssuedToken) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::delete(tokens::table.filter(tokens::user_id.eq(token.user_id)))
                .execute(conn)?;
            diesel::insert_into(tokens::table)
                .values(&NewTokenRow {
                    id: Uuid::new_v4(),
                    user_id: token.user_id,
                    token_hash: &token.hash,
                    expiry: token.expiry,
                    scope: &token.scope,
                })
                .execute(conn)?;
            Ok(())
        })
    }

    fn find_user_by_token(
        &self,
        hash: &[u8],
        scope: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = tokens::table
            .inner_join(users::table)
            .filter(tokens::token_hash.eq(hash))
            .filter(tokens::scope.eq(scope))
            .filter(tokens::expiry.gt(now))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row
            .map(|r| with_avatar(&mut conn, r))
            .transpose()?
            .map(|c| c.user))
    }

    fn revoke_tokens(&self, hash: &[u8]) -> Result<u64, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let owner: Option<Uuid> = tokens::table
                .filter(tokens::token_hash.eq(hash))
                .select(tokens::user_id)
                .first(conn)
                .optional()?;

            let Some(user_id) = owner else {
                return Ok(0);
            };
            let deleted =
                diesel::delete(tokens::table.filter(tokens::user_id.eq(user_id))).execute(conn)?;
            Ok(deleted as u64)
        })
    }

    fn delete_tokens_for_user(&self, user_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::delete(tokens::table.filter(tokens::user_id.eq(user_id))).execute(&mut conn)?;
        Ok(())
    }
}
