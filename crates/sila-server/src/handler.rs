use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;

use sila_inventory::{
    Assembly, AssemblyFilter, AssemblyOrPart, DescendantOptions, Inventory, NewPart, NodeId,
    NodeKind, Part, PartFilter,
};

use crate::error::{ApiError, ApiResult};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub inventory: Inventory,
}

impl AppState {
    pub fn new(inventory: Inventory) -> Self {
        Self { inventory }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAssemblyRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePartRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
}

/// Body of `PUT /assemblies/{id}` and `PUT /parts/{id}`. A null or absent
/// parent detaches the node.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateParentRequest {
    pub parent_assembly_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildrenQuery {
    pub first_level_only: bool,
    pub component_parts_only: bool,
}

impl From<ChildrenQuery> for DescendantOptions {
    fn from(q: ChildrenQuery) -> Self {
        Self {
            first_level_only: q.first_level_only,
            leaves_only: q.component_parts_only,
        }
    }
}

fn node_id(raw: String) -> ApiResult<NodeId> {
    NodeId::new(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn parent_id(req: UpdateParentRequest) -> ApiResult<Option<NodeId>> {
    req.parent_assembly_id.map(node_id).transpose()
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "sila-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---- Assemblies ----

pub async fn create_assembly(
    State(state): State<AppState>,
    Json(req): Json<CreateAssemblyRequest>,
) -> ApiResult<Json<Assembly>> {
    Ok(Json(state.inventory.create_assembly(&req.name).await?))
}

pub async fn list_assemblies(
    State(state): State<AppState>,
    Query(filter): Query<AssemblyFilter>,
) -> ApiResult<Json<Vec<Assembly>>> {
    Ok(Json(state.inventory.assemblies(filter).await?))
}

pub async fn get_assembly(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Assembly>> {
    let id = node_id(id)?;
    state
        .inventory
        .assembly(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn assembly_children(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChildrenQuery>,
) -> ApiResult<Json<Vec<AssemblyOrPart>>> {
    let id = node_id(id)?;
    Ok(Json(state.inventory.children(&id, query.into()).await?))
}

pub async fn assembly_parent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<NodeId>>> {
    let id = node_id(id)?;
    Ok(Json(state.inventory.ancestors(NodeKind::Assembly, &id).await?))
}

pub async fn update_assembly(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateParentRequest>,
) -> ApiResult<StatusCode> {
    let id = node_id(id)?;
    let parent = parent_id(req)?;
    state
        .inventory
        .reparent_assembly(&id, parent.as_ref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_assembly(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = node_id(id)?;
    state.inventory.delete_assembly(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Parts ----

pub async fn create_part(
    State(state): State<AppState>,
    Json(req): Json<CreatePartRequest>,
) -> ApiResult<Json<Part>> {
    let new = NewPart {
        name: req.name,
        color: req.color,
        material: req.material,
    };
    Ok(Json(state.inventory.create_part(new).await?))
}

pub async fn list_parts(
    State(state): State<AppState>,
    Query(filter): Query<PartFilter>,
) -> ApiResult<Json<Vec<Part>>> {
    Ok(Json(state.inventory.parts(filter).await?))
}

pub async fn get_part(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Part>> {
    let id = node_id(id)?;
    state
        .inventory
        .part(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn part_parent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<NodeId>>> {
    let id = node_id(id)?;
    Ok(Json(state.inventory.ancestors(NodeKind::Part, &id).await?))
}

pub async fn update_part(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateParentRequest>,
) -> ApiResult<StatusCode> {
    let id = node_id(id)?;
    let parent = parent_id(req)?;
    state.inventory.reparent_part(&id, parent.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_part(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = node_id(id)?;
    state.inventory.delete_part(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
