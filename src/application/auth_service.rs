use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::domain::errors::DomainError;
use crate::domain::ports::{
    AuthRepository, ImageStore, MailMessage, Mailer, PasswordHasher, PASSWORD_RESET_TEMPLATE,
};
use crate::domain::token::{self, SCOPE_AUTHENTICATION, SCOPE_PASSWORD_RESET};
use crate::domain::user::{
    Avatar, NewUser, Principal, ProfileChanges, Registration, Role, User, UserChanges,
    AVATAR_FOLDER, MIN_PASSWORD_LEN,
};
use crate::domain::validation::Validator;

/// A user together with the plaintext of a freshly issued session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

fn invalid_credentials() -> DomainError {
    DomainError::Unauthorized("invalid email or password".to_string())
}

fn check_new_password(password: &str) -> Result<(), DomainError> {
    let mut v = Validator::new();
    v.check(
        password.len() >= MIN_PASSWORD_LEN,
        "password",
        "password must be at least 8 characters",
    );
    v.finish()
}

pub struct AuthService<R, H, S, M> {
    repo: R,
    hasher: H,
    images: S,
    mailer: M,
    config: AuthConfig,
}

impl<R, H, S, M> AuthService<R, H, S, M>
where
    R: AuthRepository,
    H: PasswordHasher,
    S: ImageStore,
    M: Mailer,
{
    pub fn new(repo: R, hasher: H, images: S, mailer: M, config: AuthConfig) -> Self {
        Self {
            repo,
            hasher,
            images,
            mailer,
            config,
        }
    }

    fn discard_avatar(&self, avatar: &Avatar) {
        if let Err(e) = self.images.destroy(&avatar.public_id) {
            log::warn!("failed to destroy avatar {}: {}", avatar.public_id, e);
        }
    }

    /// Issue a session token, replacing any token the user already holds.
    fn start_session(&self, user: User) -> Result<Session, DomainError> {
        let issued = token::generate(
            user.id,
            self.config.token_ttl,
            SCOPE_AUTHENTICATION,
            Utc::now(),
        );
        self.repo.replace_token(&issued)?;
        Ok(Session {
            user,
            token: issued.plaintext,
        })
    }

    pub fn register(&self, registration: Registration) -> Result<Session, DomainError> {
        registration.validate()?;
        if self
            .repo
            .find_credentials_by_email(&registration.email)?
            .is_some()
        {
            return Err(DomainError::Conflict("email is already registered".to_string()));
        }

        let password_hash = self.hasher.hash(&registration.password)?;
        let avatar = Avatar::from(self.images.upload(AVATAR_FOLDER, &registration.avatar)?);

        let new = NewUser {
            id: Uuid::new_v4(),
            name: registration.name,
            email: registration.email,
            password_hash,
            role: Role::User,
            avatar,
            created_at: Utc::now(),
        };
        let user = match self.repo.create_user(&new) {
            Ok(user) => user,
            Err(e) => {
                self.discard_avatar(&new.avatar);
                return Err(e);
            }
        };
        log::info!("user registered: id={}", user.id);
        self.start_session(user)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session, DomainError> {
        let mut v = Validator::new();
        v.require(email, "email", "email must be provided");
        v.require(password, "password", "password must be provided");
        v.finish()?;

        let credentials = self
            .repo
            .find_credentials_by_email(email)?
            .ok_or_else(invalid_credentials)?;
        if !self.hasher.verify(password, &credentials.password_hash)? {
            return Err(invalid_credentials());
        }
        self.start_session(credentials.user)
    }

    /// Resolve a bearer token to the caller's identity.
    pub fn authenticate(&self, plaintext: &str) -> Result<Principal, DomainError> {
        let rejected = || DomainError::Unauthorized("invalid or expired authentication token".to_string());
        if !token::is_well_formed(plaintext) {
            return Err(rejected());
        }
        let user = self
            .repo
            .find_user_by_token(&token::hash_token(plaintext), SCOPE_AUTHENTICATION, Utc::now())?
            .ok_or_else(rejected)?;
        Ok(Principal::from(&user))
    }

    pub fn logout(&self, plaintext: &str) -> Result<(), DomainError> {
        if !token::is_well_formed(plaintext) {
            return Err(DomainError::Unauthorized("invalid token".to_string()));
        }
        let revoked = self.repo.revoke_tokens(&token::hash_token(plaintext))?;
        log::debug!("logout revoked {} token(s)", revoked);
        Ok(())
    }

    /// Mail a password reset link. The reset token replaces the user's
    /// session.
    pub fn forgot_password(&self, email: &str) -> Result<(), DomainError> {
        let credentials = self
            .repo
            .find_credentials_by_email(email)?
            .ok_or_else(|| DomainError::not_found("user"))?;
        let user = credentials.user;

        let ttl = self.config.reset_token_ttl;
        let issued = token::generate(user.id, ttl, SCOPE_PASSWORD_RESET, Utc::now());
        self.repo.replace_token(&issued)?;

        let link = format!(
            "{}/password/reset/{}",
            self.config.frontend_url.trim_end_matches('/'),
            issued.plaintext
        );
        let message = MailMessage {
            from: self.config.mail_from.clone(),
            to: user.email.clone(),
            subject: "Password recovery".to_string(),
            template: PASSWORD_RESET_TEMPLATE.to_string(),
            data: BTreeMap::from([
                ("link".to_string(), link),
                ("expiresInMinutes".to_string(), ttl.num_minutes().to_string()),
            ]),
        };

        if let Err(e) = self.mailer.send(&message) {
            if let Err(cleanup) = self.repo.delete_tokens_for_user(user.id) {
                log::warn!("failed to drop reset token of {}: {}", user.id, cleanup);
            }
            return Err(e);
        }
        log::info!("password reset requested: user={}", user.id);
        Ok(())
    }

    pub fn reset_password(
        &self,
        plaintext: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Session, DomainError> {
        let mut v = Validator::new();
        v.require(password, "password", "password must be provided");
        v.require(confirm_password, "confirmPassword", "confirm password must be provided");
        v.finish()?;
        if password != confirm_password {
            return Err(DomainError::InvalidInput("passwords do not match".to_string()));
        }
        check_new_password(password)?;

        let rejected =
            || DomainError::Unauthorized("password reset token is invalid or has expired".to_string());
        if !token::is_well_formed(plaintext) {
            return Err(rejected());
        }
        let user = self
            .repo
            .find_user_by_token(&token::hash_token(plaintext), SCOPE_PASSWORD_RESET, Utc::now())?
            .ok_or_else(rejected)?;

        let password_hash = self.hasher.hash(password)?;
        self.repo.update_password(user.id, &password_hash)?;
        log::info!("password reset: user={}", user.id);
        self.start_session(user)
    }

    pub fn me(&self, principal: &Principal) -> Result<User, DomainError> {
        self.get_user(principal.id)
    }

    pub fn update_password(
        &self,
        principal: &Principal,
        old_password: &str,
        new_password: &str,
    ) -> Result<Session, DomainError> {
        check_new_password(new_password)?;
        let credentials = self
            .repo
            .find_credentials_by_id(principal.id)?
            .ok_or_else(|| DomainError::not_found("user"))?;
        if !self.hasher.verify(old_password, &credentials.password_hash)? {
            return Err(DomainError::Unauthorized("old password is incorrect".to_string()));
        }

        let password_hash = self.hasher.hash(new_password)?;
        self.repo.update_password(principal.id, &password_hash)?;
        self.start_session(credentials.user)
    }

    /// Change name and email; a supplied avatar replaces the stored one.
    pub fn update_profile(
        &self,
        principal: &Principal,
        changes: ProfileChanges,
    ) -> Result<User, DomainError> {
        changes.validate()?;
        let current = self.get_user(principal.id)?;

        let avatar = match changes.avatar.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            Some(source) => Some(Avatar::from(self.images.upload(AVATAR_FOLDER, source)?)),
            None => None,
        };

        match self
            .repo
            .update_profile(principal.id, &changes.name, &changes.email, avatar.clone())
        {
            Ok(user) => {
                if let (Some(_), Some(old)) = (&avatar, &current.avatar) {
                    self.discard_avatar(old);
                }
                Ok(user)
            }
            Err(e) => {
                if let Some(new) = &avatar {
                    self.discard_avatar(new);
                }
                Err(e)
            }
        }
    }

    pub fn list_users(&self) -> Result<Vec<User>, DomainError> {
        self.repo.list_users()
    }

    pub fn get_user(&self, id: Uuid) -> Result<User, DomainError> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("user"))
    }

    pub fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<User, DomainError> {
        let mut v = Validator::new();
        v.require(&changes.name, "name", "name must be provided");
        v.email(&changes.email, "email", "email must be valid");
        v.finish()?;

        let user = self.repo.update_user(id, &changes)?;
        log::info!("user updated: id={} role={}", id, user.role);
        Ok(user)
    }

    pub fn delete_user(&self, id: Uuid) -> Result<(), DomainError> {
        let user = self.get_user(id)?;
        if !self.repo.delete_user(id)? {
            return Err(DomainError::not_found("user"));
        }
        if let Some(avatar) = &user.avatar {
            self.discard_avatar(avatar);
        }
        log::info!("user deleted: id={}", id);
        Ok(())
    }
}
