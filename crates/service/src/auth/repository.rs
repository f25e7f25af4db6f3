use async_trait::async_trait;
use uuid::Uuid;

use models::user::NewUser;
use models::user_session::SessionType;

use super::domain::{AuthUser, Confirmation, Credentials, Session};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user(&self, user_id: Uuid) -> Result<Option<AuthUser>, AuthError>;
    async fn create_user(&self, new: NewUser) -> Result<AuthUser, AuthError>;
    /// Remove a half-registered user together with its credentials and confirmations.
    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError>;
    async fn assign_role(&self, user_id: Uuid, role: &str) -> Result<(), AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError>;

    async fn create_confirmation(&self, user_id: Uuid, ttl_secs: i64) -> Result<Confirmation, AuthError>;
    async fn latest_confirmation(&self, user_id: Uuid) -> Result<Option<Confirmation>, AuthError>;
    async fn find_confirmation(&self, id: &str) -> Result<Option<Confirmation>, AuthError>;
    async fn mark_confirmed(&self, id: &str) -> Result<(), AuthError>;
    /// Oldest expiry first.
    async fn list_confirmations(&self, user_id: Uuid) -> Result<Vec<Confirmation>, AuthError>;

    async fn active_session(&self, user_id: Uuid, session_type: SessionType) -> Result<Option<Session>, AuthError>;
    async fn create_session(&self, user_id: Uuid, ip: &str, session_type: SessionType) -> Result<Session, AuthError>;
    async fn count_active_tokens(&self, session_id: Uuid) -> Result<u64, AuthError>;
    /// Deactivate the session and every token it holds.
    async fn deactivate_session(&self, session_id: Uuid) -> Result<(), AuthError>;
    async fn add_token(&self, session_id: Uuid, refresh_token: &str) -> Result<(), AuthError>;
    /// True when an active session of `user_id` holds `refresh_token` as an active token.
    async fn token_is_active(&self, user_id: Uuid, refresh_token: &str) -> Result<bool, AuthError>;
    async fn deactivate_token(&self, user_id: Uuid, refresh_token: &str) -> Result<bool, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    #[derive(Clone)]
    struct TokenRow {
        session_id: Uuid,
        refresh_token: String,
        active: bool,
    }

    #[derive(Clone)]
    struct SessionRow {
        session: Session,
        active: bool,
        seq: u64,
    }

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<String, AuthUser>>,               // key: email
        creds: Mutex<HashMap<Uuid, Credentials>>,              // key: user_id
        roles: Mutex<Vec<(Uuid, String)>>,
        confirmations: Mutex<Vec<Confirmation>>,
        sessions: Mutex<Vec<SessionRow>>,
        tokens: Mutex<Vec<TokenRow>>,
    }

    fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
        m.lock().unwrap_or_else(|e| e.into_inner())
    }

    impl MockAuthRepository {
        pub fn roles_of(&self, user_id: Uuid) -> Vec<String> {
            lock(&self.roles).iter().filter(|(u, _)| *u == user_id).map(|(_, r)| r.clone()).collect()
        }

        pub fn confirm_all(&self, user_id: Uuid) {
            for c in lock(&self.confirmations).iter_mut().filter(|c| c.user_id == user_id) {
                c.confirmed = true;
            }
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
            Ok(lock(&self.users).get(&email.trim().to_lowercase()).cloned())
        }

        async fn find_user(&self, user_id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            Ok(lock(&self.users).values().find(|u| u.id == user_id).cloned())
        }

        async fn create_user(&self, new: NewUser) -> Result<AuthUser, AuthError> {
            models::user::validate_phone(&new.phone_no).map_err(|e| AuthError::Validation(e.to_string()))?;
            let mut users = lock(&self.users);
            let email = new.email.trim().to_lowercase();
            if users.contains_key(&email) {
                return Err(AuthError::Conflict);
            }
            let user = AuthUser {
                id: Uuid::new_v4(),
                email: email.clone(),
                first_name: new.first_name,
                last_name: new.last_name,
                phone_no: new.phone_no,
            };
            users.insert(email, user.clone());
            Ok(user)
        }

        async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
            lock(&self.users).retain(|_, u| u.id != user_id);
            lock(&self.creds).remove(&user_id);
            lock(&self.confirmations).retain(|c| c.user_id != user_id);
            Ok(())
        }

        async fn assign_role(&self, user_id: Uuid, role: &str) -> Result<(), AuthError> {
            let mut roles = lock(&self.roles);
            if !roles.iter().any(|(u, r)| *u == user_id && r == role) {
                roles.push((user_id, role.to_string()));
            }
            Ok(())
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            Ok(lock(&self.creds).get(&user_id).cloned())
        }

        async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
            let c = Credentials { user_id, password_hash, password_algorithm };
            lock(&self.creds).insert(user_id, c.clone());
            Ok(c)
        }

        async fn create_confirmation(&self, user_id: Uuid, ttl_secs: i64) -> Result<Confirmation, AuthError> {
            let c = Confirmation {
                id: Uuid::new_v4().simple().to_string(),
                user_id,
                expire_at: chrono::Utc::now().timestamp() + ttl_secs,
                confirmed: false,
            };
            lock(&self.confirmations).push(c.clone());
            Ok(c)
        }

        async fn latest_confirmation(&self, user_id: Uuid) -> Result<Option<Confirmation>, AuthError> {
            Ok(lock(&self.confirmations)
                .iter()
                .filter(|c| c.user_id == user_id)
                .max_by_key(|c| c.expire_at)
                .cloned())
        }

        async fn find_confirmation(&self, id: &str) -> Result<Option<Confirmation>, AuthError> {
            Ok(lock(&self.confirmations).iter().find(|c| c.id == id).cloned())
        }

        async fn mark_confirmed(&self, id: &str) -> Result<(), AuthError> {
            if let Some(c) = lock(&self.confirmations).iter_mut().find(|c| c.id == id) {
                c.confirmed = true;
            }
            Ok(())
        }

        async fn list_confirmations(&self, user_id: Uuid) -> Result<Vec<Confirmation>, AuthError> {
            let mut list: Vec<_> = lock(&self.confirmations).iter().filter(|c| c.user_id == user_id).cloned().collect();
            list.sort_by_key(|c| c.expire_at);
            Ok(list)
        }

        async fn active_session(&self, user_id: Uuid, session_type: SessionType) -> Result<Option<Session>, AuthError> {
            Ok(lock(&self.sessions)
                .iter()
                .filter(|s| s.active && s.session.user_id == Some(user_id) && s.session.session_type == session_type)
                .max_by_key(|s| s.seq)
                .map(|s| s.session.clone()))
        }

        async fn create_session(&self, user_id: Uuid, ip: &str, session_type: SessionType) -> Result<Session, AuthError> {
            let mut sessions = lock(&self.sessions);
            let session = Session { id: Uuid::new_v4(), user_id: Some(user_id), ip: ip.to_string(), session_type };
            let seq = sessions.len() as u64;
            sessions.push(SessionRow { session: session.clone(), active: true, seq });
            Ok(session)
        }

        async fn count_active_tokens(&self, session_id: Uuid) -> Result<u64, AuthError> {
            Ok(lock(&self.tokens).iter().filter(|t| t.active && t.session_id == session_id).count() as u64)
        }

        async fn deactivate_session(&self, session_id: Uuid) -> Result<(), AuthError> {
            for t in lock(&self.tokens).iter_mut().filter(|t| t.session_id == session_id) {
                t.active = false;
            }
            for s in lock(&self.sessions).iter_mut().filter(|s| s.session.id == session_id) {
                s.active = false;
            }
            Ok(())
        }

        async fn add_token(&self, session_id: Uuid, refresh_token: &str) -> Result<(), AuthError> {
            lock(&self.tokens).push(TokenRow { session_id, refresh_token: refresh_token.to_string(), active: true });
            Ok(())
        }

        async fn token_is_active(&self, user_id: Uuid, refresh_token: &str) -> Result<bool, AuthError> {
            let live: Vec<Uuid> = lock(&self.sessions)
                .iter()
                .filter(|s| s.active && s.session.user_id == Some(user_id))
                .map(|s| s.session.id)
                .collect();
            Ok(lock(&self.tokens)
                .iter()
                .any(|t| t.active && t.refresh_token == refresh_token && live.contains(&t.session_id)))
        }

        async fn deactivate_token(&self, user_id: Uuid, refresh_token: &str) -> Result<bool, AuthError> {
            let owned: Vec<Uuid> = lock(&self.sessions)
                .iter()
                .filter(|s| s.session.user_id == Some(user_id))
                .map(|s| s.session.id)
                .collect();
            let mut hit = false;
            for t in lock(&self.tokens)
                .iter_mut()
                .filter(|t| t.active && t.refresh_token == refresh_token && owned.contains(&t.session_id))
            {
                t.active = false;
                hit = true;
            }
            Ok(hit)
        }
    }
}
