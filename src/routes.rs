use crate::{
    api::{holidays, leave, requests},
    auth::middleware::auth_middleware,
    config::Config,
    workflow::error::WorkflowError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter for the protected scope
pub fn build_limiter(requests_per_min: u32) -> anyhow::Result<Arc<Limiter>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit of {requests_per_min} requests per minute"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiter: Arc<Limiter>) {
    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiter) // rate limiting
            .configure(workflow_routes),
    );
}

/// Workflow endpoints, relative to the API prefix.
///
/// Fixed paths come first: a resource matched on path but not on method
/// answers 405 instead of falling through to the `/{kind}` collections.
pub fn workflow_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        WorkflowError::Validation(format!("Invalid payload: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _| {
        WorkflowError::Validation(format!("Invalid query: {err}")).into()
    }))
    // /leave-types
    .service(web::resource("/leave-types").route(web::get().to(leave::list_leave_types)))
    // /leave-balances
    .service(web::resource("/leave-balances").route(web::get().to(leave::list_balances)))
    .service(web::resource("/leave-balances/adjust").route(web::post().to(leave::adjust_balance)))
    .service(
        web::resource("/leave-balances/initialize").route(web::post().to(leave::initialize_balances)),
    )
    // /holidays
    .service(
        web::resource("/holidays")
            .route(web::get().to(holidays::list_holidays))
            .route(web::post().to(holidays::create_holiday)),
    )
    .service(web::resource("/working-days").route(web::get().to(leave::working_days)))
    // /{kind} = timesheets | expenses | leaves
    .service(
        web::resource("/{kind}")
            .route(web::get().to(requests::list_requests))
            .route(web::post().to(requests::create_request)),
    )
    // /{kind}/{id}
    .service(
        web::resource("/{kind}/{id}")
            .route(web::get().to(requests::get_request))
            .route(web::patch().to(requests::update_request))
            .route(web::delete().to(requests::delete_request)),
    )
    .service(web::resource("/{kind}/{id}/submit").route(web::post().to(requests::submit_request)))
    .service(web::resource("/{kind}/{id}/approve").route(web::post().to(requests::approve_request)))
    .service(web::resource("/{kind}/{id}/reject").route(web::post().to(requests::reject_request)));
}
