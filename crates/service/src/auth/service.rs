use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use rand::rngs::OsRng;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use common::messages;
use models::user::NewUser;

use super::domain::{AuthUser, Claims, ConfirmationStatus, LoginInput, LoginResult, RegisterInput, TokenKind};
use super::errors::AuthError;
use super::repository::AuthRepository;
use crate::mail::Mailer;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub password_algorithm: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub confirmation_ttl_secs: i64,
    /// Sessions holding this many active tokens are rotated at login.
    pub max_active_tokens: u64,
    pub bootstrap_admin_email: Option<String>,
    /// Public base URL; confirmation links point at `{base}/user-email-confirm/{id}`.
    pub public_url: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            password_algorithm: "argon2".into(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(30),
            confirmation_ttl_secs: 1800,
            max_active_tokens: 5,
            bootstrap_admin_email: None,
            public_url: "http://127.0.0.1:8080".into(),
        }
    }
}

/// Login rotates the existing session when the client moved to another IP
/// or the session already holds `max_tokens` active refresh tokens.
pub fn should_rotate(session_ip: &str, request_ip: &str, active_tokens: u64, max_tokens: u64) -> bool {
    session_ip != request_ip || active_tokens >= max_tokens
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    mailer: Arc<dyn Mailer>,
    cfg: AuthConfig,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, mailer: Arc<dyn Mailer>, cfg: AuthConfig) -> Self { Self { repo, mailer, cfg } }

    pub fn config(&self) -> &AuthConfig { &self.cfg }

    /// Register a new user, store the hashed password and mail a confirmation link.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AuthService, AuthConfig, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use service::mail::LogMailer;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, Arc::new(LogMailer::new("shop@example.com", false)), AuthConfig::new("secret"));
    /// let input = RegisterInput {
    ///     email: "user@example.com".into(), first_name: "Test".into(), last_name: "User".into(),
    ///     phone_no: "9876543210".into(), dob: None, gender: None, password: "Secret123".into(),
    /// };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.email, "user@example.com");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        input.validate().map_err(|e| AuthError::Validation(e.to_string()))?;
        if let Some(existing) = self.repo.find_user_by_email(&input.email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let user = self
            .repo
            .create_user(NewUser {
                email: input.email.clone(),
                first_name: input.first_name.clone(),
                last_name: input.last_name.clone(),
                phone_no: input.phone_no.clone(),
                dob: input.dob,
                gender: input.gender.unwrap_or_default(),
            })
            .await?;

        // 注册后续任一步骤失败都要回滚用户记录
        if let Err(e) = self.finish_registration(&user, &input.password).await {
            warn!(user_id = %user.id, error = %e, "registration rolled back");
            self.repo.delete_user(user.id).await?;
            return Err(e);
        }
        info!(user_id = %user.id, email = %user.email, "user_registered");
        Ok(user)
    }

    async fn finish_registration(&self, user: &AuthUser, password: &str) -> Result<(), AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();
        self.repo.upsert_password(user.id, hash, self.cfg.password_algorithm.clone()).await?;

        let bootstrap = self
            .cfg
            .bootstrap_admin_email
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(&user.email));
        if bootstrap {
            self.repo.assign_role(user.id, models::user_role::ADMIN).await?;
            info!(user_id = %user.id, "bootstrap admin assigned");
        }

        self.send_confirmation(user).await
    }

    async fn send_confirmation(&self, user: &AuthUser) -> Result<(), AuthError> {
        let confirmation = self.repo.create_confirmation(user.id, self.cfg.confirmation_ttl_secs).await?;
        let link = format!("{}/user-email-confirm/{}", self.cfg.public_url, confirmation.id);
        self.mailer
            .send_confirmation(&user.email, &link)
            .await
            .map_err(|e| AuthError::Mail(format!("{} {e}", messages::text("mail_send_failed"))))
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let user = self.repo.find_user_by_email(email).await?.ok_or(AuthError::UnknownEmail)?;
        let cred = self.repo.get_credentials(user.id).await?.ok_or(AuthError::Unauthorized)?;
        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(password.as_bytes(), &parsed).is_err() {
            return Err(AuthError::Unauthorized);
        }
        Ok(user)
    }

    /// Authenticate, rotate the session when needed and issue a token pair.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AuthService, AuthConfig, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use service::mail::LogMailer;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo.clone(), Arc::new(LogMailer::new("shop@example.com", false)), AuthConfig::new("secret"));
    /// let user = tokio_test::block_on(svc.register(RegisterInput {
    ///     email: "u@e.com".into(), first_name: "N".into(), last_name: "M".into(),
    ///     phone_no: "9876543210".into(), dob: None, gender: None, password: "Passw0rd".into(),
    /// })).unwrap();
    /// repo.confirm_all(user.id);
    /// let res = tokio_test::block_on(svc.login(
    ///     LoginInput { email: "u@e.com".into(), password: "Passw0rd".into(), session_type: None },
    ///     "127.0.0.1",
    /// )).unwrap();
    /// assert!(!res.access_token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email, ip = %ip))]
    pub async fn login(&self, input: LoginInput, ip: &str) -> Result<LoginResult, AuthError> {
        input.validate().map_err(|e| AuthError::Validation(e.to_string()))?;
        let user = self.authenticate(&input.email, &input.password).await?;

        let confirmed = self.repo.latest_confirmation(user.id).await?.is_some_and(|c| c.confirmed);
        if !confirmed {
            return Err(AuthError::NotConfirmed);
        }

        let access_token = self.issue_token(user.id, TokenKind::Access, true)?;
        let refresh_token = self.issue_token(user.id, TokenKind::Refresh, false)?;

        let session_type = input.session_type.unwrap_or_default();
        let mut note = None;
        let session = match self.repo.active_session(user.id, session_type).await? {
            Some(existing) => {
                let active = self.repo.count_active_tokens(existing.id).await?;
                if should_rotate(&existing.ip, ip, active, self.cfg.max_active_tokens) {
                    self.repo.deactivate_session(existing.id).await?;
                    note = Some(messages::text("user_max_sessions").to_string());
                    info!(user_id = %user.id, old_session = %existing.id, active, "session rotated");
                    self.repo.create_session(user.id, ip, session_type).await?
                } else {
                    existing
                }
            }
            None => self.repo.create_session(user.id, ip, session_type).await?,
        };

        self.repo.add_token(session.id, &refresh_token).await?;
        let active = self.repo.count_active_tokens(session.id).await?;
        let total = messages::format("user_active_sessions", active);
        let note = match note {
            Some(n) => format!("{n} {total}"),
            None => total,
        };

        info!(user_id = %user.id, session_id = %session.id, "user_logged_in");
        Ok(LoginResult { access_token, refresh_token, note })
    }

    /// Re-check credentials and return a fresh access token only.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn fresh_login(&self, input: LoginInput) -> Result<String, AuthError> {
        input.validate().map_err(|e| AuthError::Validation(e.to_string()))?;
        let user = self.authenticate(&input.email, &input.password).await?;
        self.issue_token(user.id, TokenKind::Access, true)
    }

    /// Non-fresh access token for a refresh token that is still registered.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, user_id: Uuid, refresh_token: &str) -> Result<String, AuthError> {
        if !self.repo.token_is_active(user_id, refresh_token).await? {
            return Err(AuthError::SessionExpired);
        }
        self.issue_token(user_id, TokenKind::Access, false)
    }

    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AuthError> {
        let hit = self.repo.deactivate_token(user_id, refresh_token).await?;
        info!(user_id = %user_id, revoked = hit, "user_logged_out");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn confirm_email(&self, confirmation_id: &str) -> Result<(), AuthError> {
        let confirmation = self
            .repo
            .find_confirmation(confirmation_id)
            .await?
            .ok_or(AuthError::ConfirmationNotFound)?;
        if Utc::now().timestamp() > confirmation.expire_at {
            return Err(AuthError::ConfirmationExpired);
        }
        if confirmation.confirmed {
            return Err(AuthError::AlreadyConfirmed);
        }
        self.repo.mark_confirmed(confirmation_id).await?;
        info!(user_id = %confirmation.user_id, "email_confirmed");
        Ok(())
    }

    /// Every confirmation of a user, oldest expiry first, with the server clock.
    pub async fn confirmation_status(&self, user_id: Uuid) -> Result<ConfirmationStatus, AuthError> {
        self.repo.find_user(user_id).await?.ok_or(AuthError::NotFound)?;
        let confirmation = self.repo.list_confirmations(user_id).await?;
        Ok(ConfirmationStatus { current_time: Utc::now().timestamp(), confirmation })
    }

    #[instrument(skip(self))]
    pub async fn resend_confirmation(&self, user_id: Uuid) -> Result<(), AuthError> {
        let user = self.repo.find_user(user_id).await?.ok_or(AuthError::NotFound)?;
        if self.repo.latest_confirmation(user_id).await?.is_some_and(|c| c.confirmed) {
            return Err(AuthError::AlreadyConfirmed);
        }
        self.send_confirmation(&user).await
    }

    pub fn issue_token(&self, user_id: Uuid, kind: TokenKind, fresh: bool) -> Result<String, AuthError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.cfg.access_token_ttl,
            TokenKind::Refresh => self.cfg.refresh_token_ttl,
        };
        let claims = Claims {
            sub: user_id,
            fresh,
            kind,
            jti: Uuid::new_v4(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &JwtHeader::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// Decode and check signature, expiry and token kind.
    pub fn verify_token(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.cfg.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| AuthError::TokenError(e.to_string()))?;
        if data.claims.kind != kind {
            return Err(AuthError::TokenError("wrong token kind".into()));
        }
        Ok(data.claims)
    }
}
