use crate::auth::auth::AuthUser;
use crate::model::{leave_balance::LeaveBalance, leave_type::LeaveType};
use crate::workflow::{Workflow, ledger::InitOutcome};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

fn current_year() -> i32 {
    Utc::now().year()
}

#[derive(Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// Defaults to the caller
    pub user_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct AdjustBalance {
    #[schema(example = 3)]
    pub user_id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    /// Days to add; negative to take away
    #[schema(example = -2)]
    pub delta: i32,
    #[schema(example = 2026, nullable = true)]
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct AdjustedBalance {
    #[schema(example = 3)]
    pub user_id: u64,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 18)]
    pub balance: i32,
}

#[derive(Deserialize, ToSchema)]
pub struct InitializeBalances {
    #[schema(example = 2026, nullable = true)]
    pub year: Option<i32>,
    /// Every active user when omitted
    #[schema(example = 3, nullable = true)]
    pub user_id: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
pub struct WorkingDaysQuery {
    #[param(value_type = String, format = Date, example = "2026-01-05")]
    pub start_date: NaiveDate,
    #[param(value_type = String, format = Date, example = "2026-01-09")]
    pub end_date: NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct WorkingDays {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 5)]
    pub working_days: i32,
}

#[utoipa::path(
    get,
    path = "/api/leave-types",
    responses(
        (status = 200, description = "Active leave types", body = [LeaveType]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leave_types(
    _auth: AuthUser,
    workflow: web::Data<Workflow>,
) -> actix_web::Result<impl Responder> {
    let leave_types = workflow.leave_types().await?;
    Ok(HttpResponse::Ok().json(leave_types))
}

#[utoipa::path(
    get,
    path = "/api/leave-balances",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Balances for the year", body = [LeaveBalance]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_balances(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<impl Responder> {
    let year = query.year.unwrap_or_else(current_year);
    let balances = workflow
        .leave_balances(&auth.actor(), query.user_id, year)
        .await?;
    Ok(HttpResponse::Ok().json(balances))
}

/* =========================
Ledger administration (Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-balances/adjust",
    request_body(content = AdjustBalance, content_type = "application/json"),
    responses(
        (status = 200, description = "New balance", body = AdjustedBalance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User or leave type not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn adjust_balance(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    payload: web::Json<AdjustBalance>,
) -> actix_web::Result<impl Responder> {
    let year = payload.year.unwrap_or_else(current_year);
    let balance = workflow
        .adjust_balance(&auth.actor(), payload.user_id, payload.leave_type_id, payload.delta, year)
        .await?;

    Ok(HttpResponse::Ok().json(AdjustedBalance {
        user_id: payload.user_id,
        leave_type_id: payload.leave_type_id,
        year,
        balance,
    }))
}

#[utoipa::path(
    post,
    path = "/api/leave-balances/initialize",
    request_body(content = InitializeBalances, content_type = "application/json"),
    responses(
        (status = 200, description = "Per leave type outcome, grouped per user when no user_id is given", body = [UserInitOutcome]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn initialize_balances(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    payload: web::Json<InitializeBalances>,
) -> actix_web::Result<impl Responder> {
    let actor = auth.actor();
    let year = payload.year.unwrap_or_else(current_year);

    match payload.user_id {
        Some(user_id) => {
            let outcomes: Vec<InitOutcome> = workflow.initialize_balances(&actor, user_id, year).await?;
            Ok(HttpResponse::Ok().json(outcomes))
        }
        None => {
            let results = workflow.initialize_all_balances(&actor, year).await?;
            Ok(HttpResponse::Ok().json(results))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/working-days",
    params(WorkingDaysQuery),
    responses(
        (status = 200, description = "Weekdays in the range that are not holidays", body = WorkingDays),
        (status = 400, description = "start_date after end_date"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn working_days(
    _auth: AuthUser,
    workflow: web::Data<Workflow>,
    query: web::Query<WorkingDaysQuery>,
) -> actix_web::Result<impl Responder> {
    let working_days = workflow.working_days(query.start_date, query.end_date).await?;
    Ok(HttpResponse::Ok().json(WorkingDays {
        start_date: query.start_date,
        end_date: query.end_date,
        working_days,
    }))
}
