use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use models::user::NewUser;
use models::user_session::SessionType;
use models::{user, user_confirmation, user_credentials, user_role, user_role_assignment, user_session, user_session_token};

use crate::auth::domain::{AuthUser, Confirmation, Credentials, Session};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

fn repo_err(e: impl std::fmt::Display) -> AuthError {
    AuthError::Repository(e.to_string())
}

impl SeaOrmAuthRepository {
    /// Active token rows equal to `refresh_token` inside active sessions of `user_id`.
    async fn live_tokens(&self, user_id: Uuid, refresh_token: &str) -> Result<Vec<user_session_token::Model>, AuthError> {
        let session_ids: Vec<Uuid> = user_session::Entity::find()
            .filter(user_session::Column::UserId.eq(user_id))
            .filter(user_session::Column::Active.eq(true))
            .all(&self.db)
            .await
            .map_err(repo_err)?
            .into_iter()
            .map(|s| s.id)
            .collect();
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }
        user_session_token::Entity::find()
            .filter(user_session_token::Column::SessionId.is_in(session_ids))
            .filter(user_session_token::Column::RefreshToken.eq(refresh_token))
            .filter(user_session_token::Column::Active.eq(true))
            .all(&self.db)
            .await
            .map_err(repo_err)
    }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let found = user::find_by_email(&self.db, email).await.map_err(repo_err)?;
        Ok(found.filter(|u| u.active).map(AuthUser::from))
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let found = user::Entity::find_by_id(user_id).one(&self.db).await.map_err(repo_err)?;
        Ok(found.filter(|u| u.active).map(AuthUser::from))
    }

    async fn create_user(&self, new: NewUser) -> Result<AuthUser, AuthError> {
        let created = user::create(&self.db, new).await.map_err(|e| match e {
            models::errors::ModelError::Validation(m) => AuthError::Validation(m),
            models::errors::ModelError::Db(m) => AuthError::Repository(m),
        })?;
        Ok(created.into())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        user_credentials::Entity::delete_many()
            .filter(user_credentials::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;
        user_confirmation::Entity::delete_many()
            .filter(user_confirmation::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;
        user_role_assignment::Entity::delete_many()
            .filter(user_role_assignment::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;
        user::Entity::delete_by_id(user_id).exec(&self.db).await.map_err(repo_err)?;
        Ok(())
    }

    async fn assign_role(&self, user_id: Uuid, role: &str) -> Result<(), AuthError> {
        let role = match user_role::find_by_name(&self.db, role).await.map_err(repo_err)? {
            Some(r) => r,
            None => user_role::create(&self.db, role).await.map_err(repo_err)?,
        };
        let existing = user_role_assignment::Entity::find_by_id((user_id, role.id))
            .one(&self.db)
            .await
            .map_err(repo_err)?;
        if existing.is_none() {
            user_role_assignment::ActiveModel {
                user_id: Set(user_id),
                role_id: Set(role.id),
                created_at: Set(Utc::now().into()),
            }
            .insert(&self.db)
            .await
            .map_err(repo_err)?;
        }
        Ok(())
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let res = user_credentials::find_by_user(&self.db, user_id).await.map_err(repo_err)?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }

    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
        let c = user_credentials::upsert_password(&self.db, user_id, password_hash, &password_algorithm)
            .await
            .map_err(repo_err)?;
        Ok(Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm })
    }

    async fn create_confirmation(&self, user_id: Uuid, ttl_secs: i64) -> Result<Confirmation, AuthError> {
        let c = user_confirmation::create(&self.db, user_id, ttl_secs).await.map_err(repo_err)?;
        Ok(c.into())
    }

    async fn latest_confirmation(&self, user_id: Uuid) -> Result<Option<Confirmation>, AuthError> {
        let c = user_confirmation::most_recent(&self.db, user_id).await.map_err(repo_err)?;
        Ok(c.map(Confirmation::from))
    }

    async fn find_confirmation(&self, id: &str) -> Result<Option<Confirmation>, AuthError> {
        let c = user_confirmation::Entity::find_by_id(id.to_string()).one(&self.db).await.map_err(repo_err)?;
        Ok(c.map(Confirmation::from))
    }

    async fn mark_confirmed(&self, id: &str) -> Result<(), AuthError> {
        user_confirmation::Entity::update_many()
            .col_expr(user_confirmation::Column::Confirmed, Expr::value(true))
            .filter(user_confirmation::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(())
    }

    async fn list_confirmations(&self, user_id: Uuid) -> Result<Vec<Confirmation>, AuthError> {
        let list = user_confirmation::Entity::find()
            .filter(user_confirmation::Column::UserId.eq(user_id))
            .order_by_asc(user_confirmation::Column::ExpireAt)
            .all(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(list.into_iter().map(Confirmation::from).collect())
    }

    async fn active_session(&self, user_id: Uuid, session_type: SessionType) -> Result<Option<Session>, AuthError> {
        let s = user_session::find_active(&self.db, user_id, session_type).await.map_err(repo_err)?;
        Ok(s.map(Session::from))
    }

    async fn create_session(&self, user_id: Uuid, ip: &str, session_type: SessionType) -> Result<Session, AuthError> {
        let s = user_session::create(&self.db, Some(user_id), ip, session_type).await.map_err(repo_err)?;
        Ok(s.into())
    }

    async fn count_active_tokens(&self, session_id: Uuid) -> Result<u64, AuthError> {
        user_session_token::count_active(&self.db, session_id).await.map_err(repo_err)
    }

    async fn deactivate_session(&self, session_id: Uuid) -> Result<(), AuthError> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        user_session_token::Entity::update_many()
            .col_expr(user_session_token::Column::Active, Expr::value(false))
            .col_expr(user_session_token::Column::UpdatedAt, Expr::value(now))
            .filter(user_session_token::Column::SessionId.eq(session_id))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;
        user_session::Entity::update_many()
            .col_expr(user_session::Column::Active, Expr::value(false))
            .col_expr(user_session::Column::UpdatedAt, Expr::value(now))
            .filter(user_session::Column::Id.eq(session_id))
            .exec(&self.db)
            .await
            .map_err(repo_err)?;
        Ok(())
    }

    async fn add_token(&self, session_id: Uuid, refresh_token: &str) -> Result<(), AuthError> {
        user_session_token::create(&self.db, session_id, refresh_token).await.map_err(repo_err)?;
        Ok(())
    }

    async fn token_is_active(&self, user_id: Uuid, refresh_token: &str) -> Result<bool, AuthError> {
        Ok(!self.live_tokens(user_id, refresh_token).await?.is_empty())
    }

    async fn deactivate_token(&self, user_id: Uuid, refresh_token: &str) -> Result<bool, AuthError> {
        let tokens = self.live_tokens(user_id, refresh_token).await?;
        let hit = !tokens.is_empty();
        for t in tokens {
            let mut am: user_session_token::ActiveModel = t.into();
            am.active = Set(false);
            am.updated_at = Set(Utc::now().into());
            am.update(&self.db).await.map_err(repo_err)?;
        }
        Ok(hit)
    }
}
