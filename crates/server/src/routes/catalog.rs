//! Products, attributes, options, images and categories.
//!
//! Reads are public; writes need the `admin` or `shop_keeper` role.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use common::messages;
use models::{product, product_attribute, product_attribute_option, product_category, product_image};
use service::catalog::attributes::{self, AttributeInput, NamedUpdate, OptionInput};
use service::catalog::categories::{self, CategoryInput, CategoryUpdate};
use service::catalog::{images, products, BulkReport, ProductInput, ProductUpdate};
use service::pagination::{Page, Pagination};

use super::{created, data, done, message, ApiResult, Envelope};
use crate::auth::{require_roles, AuthUser, STAFF};
use crate::errors::JsonBody;
use crate::startup::ServerState;

#[derive(Debug, Deserialize)]
pub struct NewAttribute {
    pub product_id: Uuid,
    #[serde(flatten)]
    pub attribute: AttributeInput,
}

#[derive(Debug, Deserialize)]
pub struct NewOption {
    pub attribute_id: Uuid,
    #[serde(flatten)]
    pub option: OptionInput,
}

#[derive(Debug, Deserialize)]
pub struct ImageNames {
    pub images: Vec<String>,
}

// ---- products ----

#[utoipa::path(get, path = "/product/{slug}", tag = "catalog", params(("slug" = String, Path, description = "Product slug")), responses((status = 200, description = "Product"), (status = 404, description = "Not Found")))]
pub async fn get_product(State(state): State<ServerState>, Path(slug): Path<String>) -> ApiResult<Json<Envelope<product::Model>>> {
    Ok(data(products::get_product(&state.db, &slug).await?))
}

pub async fn create_product(
    State(state): State<ServerState>,
    user: AuthUser,
    JsonBody(input): JsonBody<ProductInput>,
) -> ApiResult<(StatusCode, Json<Envelope<product::Model>>)> {
    require_roles(&state, &user, STAFF).await?;
    let saved = products::create_product(&state.db, input).await?;
    Ok(created("product_created", saved))
}

pub async fn update_product(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(slug): Path<String>,
    JsonBody(input): JsonBody<ProductUpdate>,
) -> ApiResult<Json<Envelope<product::Model>>> {
    require_roles(&state, &user, STAFF).await?;
    let saved = products::update_product(&state.db, &slug, input).await?;
    Ok(done("product_updated", saved))
}

pub async fn remove_product(State(state): State<ServerState>, user: AuthUser, Path(slug): Path<String>) -> ApiResult<Json<Envelope<()>>> {
    require_roles(&state, &user, STAFF).await?;
    products::deactivate_product(&state.db, &slug).await?;
    Ok(message("product_deleted"))
}

#[utoipa::path(get, path = "/products", tag = "catalog", params(("page" = Option<u32>, Query, description = "1-based page"), ("per_page" = Option<u32>, Query, description = "Page size, at most 100")), responses((status = 200, description = "One page of active products")))]
pub async fn list_products(State(state): State<ServerState>, Query(opts): Query<Pagination>) -> ApiResult<Json<Page<product::Model>>> {
    Ok(Json(products::list_products(&state.db, opts).await?))
}

/// Takes the raw body so a non-list payload is reported as a 400 by the service.
pub async fn bulk_create(
    State(state): State<ServerState>,
    user: AuthUser,
    JsonBody(payload): JsonBody<serde_json::Value>,
) -> ApiResult<Json<BulkReport>> {
    require_roles(&state, &user, STAFF).await?;
    Ok(Json(products::bulk_create(&state.db, payload).await?))
}

// ---- attributes ----

pub async fn get_attribute(State(state): State<ServerState>, Path(attr_id): Path<Uuid>) -> ApiResult<Json<Envelope<product_attribute::Model>>> {
    Ok(data(attributes::get_attribute(&state.db, attr_id).await?))
}

pub async fn create_attribute(
    State(state): State<ServerState>,
    user: AuthUser,
    JsonBody(body): JsonBody<NewAttribute>,
) -> ApiResult<(StatusCode, Json<Envelope<product_attribute::Model>>)> {
    require_roles(&state, &user, STAFF).await?;
    let saved = attributes::create_attribute(&state.db, body.product_id, body.attribute).await?;
    Ok(created("attribute_created", saved))
}

pub async fn update_attribute(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(attr_id): Path<Uuid>,
    JsonBody(input): JsonBody<NamedUpdate>,
) -> ApiResult<Json<Envelope<product_attribute::Model>>> {
    require_roles(&state, &user, STAFF).await?;
    let saved = attributes::update_attribute(&state.db, attr_id, input).await?;
    Ok(done("attribute_updated", saved))
}

pub async fn remove_attribute(State(state): State<ServerState>, user: AuthUser, Path(attr_id): Path<Uuid>) -> ApiResult<Json<Envelope<()>>> {
    require_roles(&state, &user, STAFF).await?;
    attributes::deactivate_attribute(&state.db, attr_id).await?;
    Ok(message("attribute_deleted"))
}

pub async fn list_attributes(State(state): State<ServerState>, Path(slug): Path<String>) -> ApiResult<Json<Envelope<Vec<product_attribute::Model>>>> {
    Ok(data(attributes::list_attributes(&state.db, &slug).await?))
}

// ---- options ----

pub async fn get_option(State(state): State<ServerState>, Path(opt_id): Path<Uuid>) -> ApiResult<Json<Envelope<product_attribute_option::Model>>> {
    Ok(data(attributes::get_option(&state.db, opt_id).await?))
}

pub async fn create_option(
    State(state): State<ServerState>,
    user: AuthUser,
    JsonBody(body): JsonBody<NewOption>,
) -> ApiResult<(StatusCode, Json<Envelope<product_attribute_option::Model>>)> {
    require_roles(&state, &user, STAFF).await?;
    let saved = attributes::create_option(&state.db, body.attribute_id, body.option).await?;
    Ok(created("option_created", saved))
}

pub async fn update_option(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(opt_id): Path<Uuid>,
    JsonBody(input): JsonBody<NamedUpdate>,
) -> ApiResult<Json<Envelope<product_attribute_option::Model>>> {
    require_roles(&state, &user, STAFF).await?;
    let saved = attributes::update_option(&state.db, opt_id, input).await?;
    Ok(done("option_updated", saved))
}

pub async fn remove_option(State(state): State<ServerState>, user: AuthUser, Path(opt_id): Path<Uuid>) -> ApiResult<Json<Envelope<()>>> {
    require_roles(&state, &user, STAFF).await?;
    attributes::deactivate_option(&state.db, opt_id).await?;
    Ok(message("option_deleted"))
}

pub async fn list_options(State(state): State<ServerState>, Path(attr_id): Path<Uuid>) -> ApiResult<Json<Envelope<Vec<product_attribute_option::Model>>>> {
    Ok(data(attributes::list_options(&state.db, attr_id).await?))
}

// ---- images ----

pub async fn list_images(State(state): State<ServerState>, Path(slug): Path<String>) -> ApiResult<Json<Envelope<Vec<product_image::Model>>>> {
    Ok(data(images::list_images(&state.db, &slug).await?))
}

/// Records image names; the files themselves are placed in the image directory out of band.
pub async fn register_images(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(slug): Path<String>,
    JsonBody(body): JsonBody<ImageNames>,
) -> ApiResult<(StatusCode, Json<Envelope<Vec<product_image::Model>>>)> {
    require_roles(&state, &user, STAFF).await?;
    let saved = images::register_images(&state.db, &slug, &body.images).await?;
    let msg = messages::format("image_registered", saved.len());
    Ok((StatusCode::CREATED, Json(Envelope { message: Some(msg), data: Some(saved) })))
}

pub async fn get_image(State(state): State<ServerState>, Path((slug, filename)): Path<(String, String)>) -> ApiResult<Response> {
    let bytes = images::read_image(&state.db, &state.images_dir, &slug, &filename).await?;
    Ok(([(header::CONTENT_TYPE, images::content_type_for(&filename))], bytes).into_response())
}

pub async fn remove_image(
    State(state): State<ServerState>,
    user: AuthUser,
    Path((slug, filename)): Path<(String, String)>,
) -> ApiResult<Json<Envelope<()>>> {
    require_roles(&state, &user, STAFF).await?;
    images::deactivate_image(&state.db, &slug, &filename).await?;
    Ok(message("image_deleted"))
}

// ---- categories ----

pub async fn get_category(State(state): State<ServerState>, Path(id): Path<Uuid>) -> ApiResult<Json<Envelope<product_category::Model>>> {
    Ok(data(categories::get_category(&state.db, id).await?))
}

pub async fn update_category(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(input): JsonBody<CategoryUpdate>,
) -> ApiResult<Json<Envelope<product_category::Model>>> {
    require_roles(&state, &user, STAFF).await?;
    let saved = categories::update_category(&state.db, id, input).await?;
    Ok(done("category_updated", saved))
}

pub async fn remove_category(State(state): State<ServerState>, user: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<Envelope<()>>> {
    require_roles(&state, &user, STAFF).await?;
    categories::deactivate_category(&state.db, id).await?;
    Ok(message("category_deleted"))
}

/// `parent_id` is a category id or `root`.
pub async fn list_categories(State(state): State<ServerState>, Path(parent_id): Path<String>) -> ApiResult<Json<Envelope<Vec<product_category::Model>>>> {
    let parent = categories::parse_parent(&parent_id)?;
    Ok(data(categories::list_children(&state.db, parent).await?))
}

pub async fn create_category(
    State(state): State<ServerState>,
    user: AuthUser,
    Path(parent_id): Path<String>,
    JsonBody(input): JsonBody<CategoryInput>,
) -> ApiResult<(StatusCode, Json<Envelope<product_category::Model>>)> {
    require_roles(&state, &user, STAFF).await?;
    let parent = categories::parse_parent(&parent_id)?;
    let saved = categories::create_category(&state.db, parent, input).await?;
    Ok(created("category_created", saved))
}
