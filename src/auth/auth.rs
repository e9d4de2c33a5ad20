use crate::config::Config;
use crate::model::role::Role;
use crate::workflow::authz::Actor;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};

use super::jwt::authenticate;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // already verified by auth_middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(
                    actix_web::error::ErrorInternalServerError("Config missing"),
                ));
            }
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(authenticate(header, &config.jwt_secret).map_err(ErrorUnauthorized))
    }
}

impl AuthUser {
    /// The caller as seen by the workflow engine
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            role: self.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn reuses_the_user_stored_by_the_middleware() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(AuthUser {
            user_id: 7,
            username: "erin".into(),
            role: Role::Manager,
        });

        let user = AuthUser::extract(&req).await.unwrap();
        assert_eq!(user.user_id, 7);
        assert_eq!(user.actor().role, Role::Manager);
    }

    #[actix_web::test]
    async fn rejects_requests_without_a_stored_user_or_header() {
        let config = Config {
            server_addr: "127.0.0.1:0".into(),
            database_url: None,
            jwt_secret: "extractor-secret".into(),
            api_prefix: "/api".into(),
            rate_protected_per_min: 10,
            store_backend: crate::config::StoreBackend::Memory,
            run_migrations: false,
            holiday_cache_ttl: std::time::Duration::from_secs(60),
            log_dir: "logs".into(),
            log_level: "info".into(),
        };
        let req = TestRequest::default()
            .app_data(Data::new(config))
            .to_http_request();

        let err = AuthUser::extract(&req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), actix_web::http::StatusCode::UNAUTHORIZED);
    }
}
