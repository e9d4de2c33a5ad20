use crate::auth::auth::AuthUser;
use crate::model::request::{
    ExpenseDetails, LeaveDetails, RequestDetails, RequestKind, TimesheetDetails,
};
use crate::workflow::{
    Workflow,
    error::WorkflowError,
    lifecycle::{ExpensePatch, LeavePatch, RequestPatch, TimesheetPatch},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateTimesheet {
    /// Owner of the request; defaults to the caller, required for admins
    #[schema(example = 3, nullable = true)]
    pub user_id: Option<u64>,
    #[schema(example = 42)]
    pub project_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = 7.5)]
    pub hours: f64,
    #[schema(example = "Integration work")]
    pub description: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateExpense {
    #[schema(example = 3, nullable = true)]
    pub user_id: Option<u64>,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = 120.5)]
    pub amount: f64,
    #[schema(example = "Client dinner")]
    pub description: String,
    /// Reference returned by the upload service
    #[schema(example = "receipts/2026/01/abc.pdf", nullable = true)]
    pub receipt_ref: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = 3, nullable = true)]
    pub user_id: Option<u64>,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
}

/// Body of `POST /{kind}`; the fields depend on the collection
#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
#[serde(untagged)]
pub enum CreatePayload {
    Timesheet(CreateTimesheet),
    Expense(CreateExpense),
    Leave(CreateLeave),
}

/// Body of `PATCH /{kind}/{id}`; every field is optional
#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
#[serde(untagged)]
pub enum UpdatePayload {
    Timesheet(TimesheetPatch),
    Expense(ExpensePatch),
    Leave(LeavePatch),
}

#[derive(Deserialize, ToSchema)]
pub struct RejectBody {
    #[schema(example = "Receipt missing")]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct ListFilter {
    /// `draft`, `submitted`, `approved`, `rejected`, or `all` (leave only)
    pub status: Option<String>,
}

fn resolve_kind(segment: &str) -> Result<RequestKind, WorkflowError> {
    RequestKind::from_plural(segment)
        .ok_or_else(|| WorkflowError::NotFound(format!("Unknown collection '{segment}'")))
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, WorkflowError> {
    serde_json::from_value(body).map_err(|e| WorkflowError::Validation(format!("Invalid payload: {e}")))
}

fn create_details(kind: RequestKind, body: Value) -> Result<(Option<u64>, RequestDetails), WorkflowError> {
    Ok(match kind {
        RequestKind::Timesheet => {
            let p: CreateTimesheet = parse_body(body)?;
            (
                p.user_id,
                RequestDetails::Timesheet(TimesheetDetails {
                    project_id: p.project_id,
                    date: p.date,
                    hours: p.hours,
                    description: p.description,
                }),
            )
        }
        RequestKind::Expense => {
            let p: CreateExpense = parse_body(body)?;
            (
                p.user_id,
                RequestDetails::Expense(ExpenseDetails {
                    date: p.date,
                    amount: p.amount,
                    description: p.description,
                    receipt_ref: p.receipt_ref,
                }),
            )
        }
        RequestKind::Leave => {
            let p: CreateLeave = parse_body(body)?;
            (
                p.user_id,
                RequestDetails::Leave(LeaveDetails {
                    leave_type_id: p.leave_type_id,
                    start_date: p.start_date,
                    end_date: p.end_date,
                    reason: p.reason,
                    applied_at: None,
                }),
            )
        }
    })
}

fn update_patch(kind: RequestKind, body: Value) -> Result<RequestPatch, WorkflowError> {
    Ok(match kind {
        RequestKind::Timesheet => RequestPatch::Timesheet(parse_body(body)?),
        RequestKind::Expense => RequestPatch::Expense(parse_body(body)?),
        RequestKind::Leave => RequestPatch::Leave(parse_body(body)?),
    })
}

/* =========================
Create request (draft)
========================= */
#[utoipa::path(
    post,
    path = "/api/{kind}",
    params(
        ("kind" = String, Path, description = "timesheets, expenses or leaves")
    ),
    request_body(content = CreatePayload, description = "Kind-specific fields", content_type = "application/json"),
    responses(
        (status = 201, description = "Draft created", body = Object),
        (status = 400, description = "Validation or business rule failure", body = Object, example = json!({
            "message": "start_date cannot be after end_date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown collection or user")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn create_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<String>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let kind = resolve_kind(&path)?;
    let (target, details) = create_details(kind, payload.into_inner())?;

    let request = workflow.create(&auth.actor(), target, details).await?;
    Ok(HttpResponse::Created().json(request))
}

#[utoipa::path(
    get,
    path = "/api/{kind}",
    params(
        ("kind" = String, Path, description = "timesheets, expenses or leaves"),
        ListFilter
    ),
    responses(
        (status = 200, description = "Requests visible to the caller", body = Object),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn list_requests(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<String>,
    query: web::Query<ListFilter>,
) -> actix_web::Result<impl Responder> {
    let kind = resolve_kind(&path)?;
    let requests = workflow
        .list(&auth.actor(), kind, query.status.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(requests))
}

#[utoipa::path(
    get,
    path = "/api/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "timesheets, expenses or leaves"),
        ("id" = u64, Path, description = "Request id")
    ),
    responses(
        (status = 200, description = "Request found", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found", body = Object, example = json!({
            "message": "Leave not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn get_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<(String, u64)>,
) -> actix_web::Result<impl Responder> {
    let (segment, id) = path.into_inner();
    let kind = resolve_kind(&segment)?;
    let request = workflow.get(&auth.actor(), kind, id).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    patch,
    path = "/api/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "timesheets, expenses or leaves"),
        ("id" = u64, Path, description = "Request id")
    ),
    request_body(content = UpdatePayload, description = "Fields to change", content_type = "application/json"),
    responses(
        (status = 200, description = "Draft updated", body = Object),
        (status = 400, description = "Not a draft, or invalid fields", body = Object, example = json!({
            "message": "Only draft leaves can be updated"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn update_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<(String, u64)>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let (segment, id) = path.into_inner();
    let kind = resolve_kind(&segment)?;
    let patch = update_patch(kind, payload.into_inner())?;

    let request = workflow.update(&auth.actor(), kind, id, patch).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    delete,
    path = "/api/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "timesheets, expenses or leaves"),
        ("id" = u64, Path, description = "Request id")
    ),
    responses(
        (status = 200, description = "Draft deleted", body = Object, example = json!({
            "message": "Leave deleted"
        })),
        (status = 400, description = "Not a draft"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn delete_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<(String, u64)>,
) -> actix_web::Result<impl Responder> {
    let (segment, id) = path.into_inner();
    let kind = resolve_kind(&segment)?;
    workflow.delete(&auth.actor(), kind, id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("{} deleted", kind.title())
    })))
}

#[utoipa::path(
    post,
    path = "/api/{kind}/{id}/submit",
    params(
        ("kind" = String, Path, description = "timesheets, expenses or leaves"),
        ("id" = u64, Path, description = "Request id")
    ),
    responses(
        (status = 200, description = "Request submitted", body = Object),
        (status = 400, description = "Not a draft"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn submit_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<(String, u64)>,
) -> actix_web::Result<impl Responder> {
    let (segment, id) = path.into_inner();
    let kind = resolve_kind(&segment)?;
    let request = workflow.submit(&auth.actor(), kind, id).await?;
    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Approve / reject (manager, admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/{kind}/{id}/approve",
    params(
        ("kind" = String, Path, description = "timesheets, expenses or leaves"),
        ("id" = u64, Path, description = "Request id")
    ),
    responses(
        (status = 200, description = "Request approved", body = Object),
        (status = 400, description = "Request is not submitted", body = Object, example = json!({
            "message": "Only submitted leaves can be approved"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn approve_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<(String, u64)>,
) -> actix_web::Result<impl Responder> {
    let (segment, id) = path.into_inner();
    let kind = resolve_kind(&segment)?;
    let request = workflow.approve(&auth.actor(), kind, id).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    post,
    path = "/api/{kind}/{id}/reject",
    params(
        ("kind" = String, Path, description = "timesheets, expenses or leaves"),
        ("id" = u64, Path, description = "Request id")
    ),
    request_body(content = RejectBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Request rejected", body = Object),
        (status = 400, description = "Missing reason or request is not submitted", body = Object, example = json!({
            "message": "Rejection reason is required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn reject_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<(String, u64)>,
    body: Option<web::Json<RejectBody>>,
) -> actix_web::Result<impl Responder> {
    let (segment, id) = path.into_inner();
    let kind = resolve_kind(&segment)?;
    let reason = body
        .and_then(|b| b.into_inner().reason)
        .unwrap_or_default();

    let request = workflow.reject(&auth.actor(), kind, id, &reason).await?;
    Ok(HttpResponse::Ok().json(request))
}
