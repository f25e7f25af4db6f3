use crate::{coupon, coupon_product, product, user, user_confirmation, user_credentials, user_role, user_session, user_session_token};
use crate::errors::ModelError;
use anyhow::Result;
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

fn new_user(email: &str) -> user::NewUser {
    user::NewUser {
        email: email.into(),
        first_name: "Jane".into(),
        last_name: "Doe".into(),
        phone_no: "9876543210".into(),
        ..Default::default()
    }
}

/// Test user create, lookup by email and validation failures
#[tokio::test]
async fn test_user_crud() -> Result<()> {
    let db = super::memory_db().await?;

    let created = user::create(&db, new_user("Jane@Shop.Example")).await?;
    assert_eq!(created.email, "jane@shop.example");
    assert!(created.active);

    let found = user::find_by_email(&db, "JANE@shop.example").await?;
    assert_eq!(found.map(|u| u.id), Some(created.id));

    let mut bad = new_user("bad@shop.example");
    bad.phone_no = "0123456789".into();
    assert!(matches!(user::create(&db, bad).await, Err(ModelError::Validation(_))));

    // duplicate email is rejected by the unique key
    assert!(matches!(user::create(&db, new_user("jane@shop.example")).await, Err(ModelError::Db(_))));
    Ok(())
}

/// Credentials are upserted, one row per user
#[tokio::test]
async fn test_credentials_upsert() -> Result<()> {
    let db = super::memory_db().await?;
    let u = user::create(&db, new_user("creds@shop.example")).await?;

    let first = user_credentials::upsert_password(&db, u.id, "hash-1".into(), "argon2").await?;
    let second = user_credentials::upsert_password(&db, u.id, "hash-2".into(), "argon2").await?;
    assert_eq!(first.id, second.id);

    let stored = user_credentials::find_by_user(&db, u.id).await?.expect("credentials");
    assert_eq!(stored.password_hash, "hash-2");
    Ok(())
}

/// Latest confirmation wins; sessions and tokens are counted per session
#[tokio::test]
async fn test_confirmation_and_session_tokens() -> Result<()> {
    let db = super::memory_db().await?;
    let u = user::create(&db, new_user("session@shop.example")).await?;

    let _old = user_confirmation::create(&db, u.id, 10).await?;
    let newer = user_confirmation::create(&db, u.id, 1800).await?;
    assert_eq!(newer.id.len(), 32);
    let latest = user_confirmation::most_recent(&db, u.id).await?.expect("confirmation");
    assert_eq!(latest.id, newer.id);

    let session = user_session::create(&db, Some(u.id), "10.0.0.1", user_session::SessionType::Web).await?;
    user_session_token::create(&db, session.id, "r1").await?;
    user_session_token::create(&db, session.id, "r2").await?;
    assert_eq!(user_session_token::count_active(&db, session.id).await?, 2);

    let found = user_session::find_active(&db, u.id, user_session::SessionType::Web).await?;
    assert_eq!(found.map(|s| s.id), Some(session.id));
    assert!(user_session::find_active(&db, u.id, user_session::SessionType::Mobile).await?.is_none());
    Ok(())
}

/// Roles are unique by name
#[tokio::test]
async fn test_roles() -> Result<()> {
    let db = super::memory_db().await?;
    let admin = user_role::create(&db, user_role::ADMIN).await?;
    assert_eq!(user_role::find_by_name(&db, "admin").await?.map(|r| r.id), Some(admin.id));
    assert!(user_role::create(&db, user_role::ADMIN).await.is_err());
    assert!(user_role::create(&db, " ").await.is_err());
    Ok(())
}

/// Coupon to product mapping persists through the join table
#[tokio::test]
async fn test_coupon_product_mapping() -> Result<()> {
    let db = super::memory_db().await?;
    let now = Utc::now();
    let p = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Mug".into()),
        description: Set(None),
        slug: Set("mug".into()),
        price: Set(1500),
        category_id: Set(None),
        active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&db)
    .await?;
    let c = coupon::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set("MUG10".into()),
        coupon_type: Set(coupon::CouponType::Percentage),
        value: Set(10),
        max_value: Set(None),
        start_at: Set((now - Duration::hours(1)).into()),
        expire_at: Set((now + Duration::hours(1)).into()),
        active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&db)
    .await?;

    coupon_product::ActiveModel { coupon_id: Set(c.id), product_id: Set(p.id) }.insert(&db).await?;
    let mapped = coupon_product::Entity::find()
        .filter(coupon_product::Column::CouponId.eq(c.id))
        .all(&db)
        .await?;
    assert_eq!(mapped.len(), 1);
    assert_eq!(mapped[0].product_id, p.id);

    let loaded = coupon::Entity::find_by_id(c.id).one(&db).await?.expect("coupon");
    assert_eq!(loaded.coupon_type, coupon::CouponType::Percentage);
    Ok(())
}
