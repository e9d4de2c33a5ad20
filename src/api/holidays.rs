use crate::auth::auth::AuthUser;
use crate::model::holiday::Holiday;
use crate::workflow::Workflow;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateHoliday {
    #[schema(example = "Christmas Day")]
    pub name: String,
    #[schema(example = "2025-12-25", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// Repeat on the same month and day every year
    #[serde(default)]
    pub is_recurring: bool,
}

#[utoipa::path(
    get,
    path = "/api/holidays",
    responses(
        (status = 200, description = "Holiday calendar", body = [Holiday]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Holidays"
)]
pub async fn list_holidays(
    _auth: AuthUser,
    workflow: web::Data<Workflow>,
) -> actix_web::Result<impl Responder> {
    let holidays = workflow.list_holidays().await?;
    Ok(HttpResponse::Ok().json(holidays))
}

#[utoipa::path(
    post,
    path = "/api/holidays",
    request_body(content = CreateHoliday, content_type = "application/json"),
    responses(
        (status = 201, description = "Holiday added", body = Holiday),
        (status = 400, description = "Missing name"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Holidays"
)]
pub async fn create_holiday(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    payload: web::Json<CreateHoliday>,
) -> actix_web::Result<impl Responder> {
    let holiday = workflow
        .add_holiday(&auth.actor(), &payload.name, payload.date, payload.is_recurring)
        .await?;
    Ok(HttpResponse::Created().json(holiday))
}
