//! JWT authentication middleware.
//!
//! Validates the `Authorization: Bearer` header on every request passing
//! through the protected scope and stores the caller's [`UserId`] in the
//! request extensions so handlers can extract it with [`FromRequest`].

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{error::ErrorUnauthorized, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use uuid::Uuid;

/// JWT claims carried by client tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time
    pub exp: usize,
    /// Issued at
    pub iat: usize,
    /// User email
    pub email: String,
}

/// Authenticated user identifier stored in request extensions after auth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

/// Actix middleware that validates a Bearer token with a shared HS256 secret.
pub struct JwtAuthMiddleware {
    secret: String,
}

impl JwtAuthMiddleware {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            secret: self.secret.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    secret: String,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let secret = self.secret.clone();

        Box::pin(async move {
            let auth_header = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| ErrorUnauthorized("Missing Authorization header"))?;

            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or_else(|| ErrorUnauthorized("Authorization must use Bearer scheme"))?;

            let validation = Validation::new(Algorithm::HS256);
            let decoding_key = DecodingKey::from_secret(secret.as_bytes());

            let token_data = decode::<Claims>(token, &decoding_key, &validation)
                .map_err(|_| ErrorUnauthorized("Invalid or expired token"))?;

            let user_id = Uuid::parse_str(&token_data.claims.sub)
                .map_err(|_| ErrorUnauthorized("Invalid user ID in token"))?;

            req.extensions_mut().insert(UserId(user_id));
            req.extensions_mut().insert(token_data.claims);

            service.call(req).await
        })
    }
}

impl FromRequest for UserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserId>()
                .copied()
                .ok_or_else(|| ErrorUnauthorized("User ID missing")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpResponse};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn create_test_jwt(user_id: &str, expires_in_seconds: i64, secret: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let exp = (now + expires_in_seconds) as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            exp,
            iat: now as usize,
            email: "citizen@example.com".to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    async fn echo_user(user: UserId) -> HttpResponse {
        HttpResponse::Ok().body(user.0.to_string())
    }

    #[actix_web::test]
    async fn test_valid_jwt_allows_access() {
        let app = test::init_service(
            App::new()
                .wrap(JwtAuthMiddleware::new("test-secret".to_string()))
                .route("/whoami", web::get().to(echo_user)),
        )
        .await;

        let user_id = Uuid::new_v4();
        let token = create_test_jwt(&user_id.to_string(), 3600, "test-secret");

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body = test::read_body(resp).await;
        assert_eq!(body, user_id.to_string().as_bytes());
    }

    #[actix_web::test]
    async fn test_expired_jwt_rejected() {
        let app = test::init_service(
            App::new()
                .wrap(JwtAuthMiddleware::new("test-secret".to_string()))
                .route("/whoami", web::get().to(echo_user)),
        )
        .await;

        let token = create_test_jwt(&Uuid::new_v4().to_string(), -3600, "test-secret");

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn test_missing_authorization_header() {
        let app = test::init_service(
            App::new()
                .wrap(JwtAuthMiddleware::new("test-secret".to_string()))
                .route("/whoami", web::get().to(echo_user)),
        )
        .await;

        let req = test::TestRequest::get().uri("/whoami").to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn test_wrong_secret_rejected() {
        let app = test::init_service(
            App::new()
                .wrap(JwtAuthMiddleware::new("test-secret".to_string()))
                .route("/whoami", web::get().to(echo_user)),
        )
        .await;

        let token = create_test_jwt(&Uuid::new_v4().to_string(), 3600, "other-secret");

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn test_non_uuid_subject_rejected() {
        let app = test::init_service(
            App::new()
                .wrap(JwtAuthMiddleware::new("test-secret".to_string()))
                .route("/whoami", web::get().to(echo_user)),
        )
        .await;

        let token = create_test_jwt("not-a-uuid", 3600, "test-secret");

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }
}
