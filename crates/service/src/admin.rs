//! Back-office listings.

use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use models::user;

use crate::errors::ServiceError;
use crate::pagination::{Page, Pagination};

#[derive(Clone, Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
    pub roles: Vec<String>,
}

pub async fn list_users(db: &DatabaseConnection, opts: Pagination) -> Result<Page<UserSummary>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let paginator = user::Entity::find().order_by_asc(user::Column::Email).paginate(db, per_page);
    let totals = paginator.num_items_and_pages().await?;
    let mut items = Vec::new();
    for u in paginator.fetch_page(page_idx).await? {
        let roles = crate::roles::roles_of(db, u.id).await?;
        items.push(UserSummary { id: u.id, email: u.email, first_name: u.first_name, last_name: u.last_name, active: u.active, roles });
    }
    Ok(Page { items, page: page_idx + 1, per_page, total_items: totals.number_of_items, total_pages: totals.number_of_pages })
}

pub use crate::orders::{list_all_orders, update_status as update_order_status};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{assign_role, ensure_default_roles};
    use crate::test_support::{get_db, seed_user};

    #[tokio::test]
    async fn users_listed_with_roles() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        ensure_default_roles(&db).await?;
        seed_user(&db, "b@shop.example").await?;
        seed_user(&db, "a@shop.example").await?;
        assign_role(&db, "admin", &["a@shop.example".to_string()]).await?;

        let page = list_users(&db, Pagination { page: 1, per_page: 10 }).await?;
        assert_eq!(page.total_items, 2);
        assert_eq!(page.items[0].email, "a@shop.example");
        assert_eq!(page.items[0].roles, vec!["admin".to_string()]);
        assert!(page.items[1].roles.is_empty());
        Ok(())
    }
}
