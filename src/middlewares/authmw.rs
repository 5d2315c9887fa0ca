use std::future::{Ready, ready};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;

use crate::error::AppError;
use crate::session::Session;

/// Requires a bearer token and puts the decoded [`Session`] in the request
/// extensions. The backend verifies signatures; this only rejects missing,
/// malformed and expired tokens early.
pub struct SessionGuard;

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionGuardMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGuardMiddleware { service }))
    }
}

pub struct SessionGuardMiddleware<S> {
    service: S,
}

fn bearer_token(req: &ServiceRequest) -> Result<&str, AppError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("No authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))
}

impl<S, B> Service<ServiceRequest> for SessionGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let session = bearer_token(&req)
            .and_then(|token| Session::from_token(token, Utc::now()).map_err(AppError::from));

        match session {
            Ok(session) => {
                log::debug!("{} {} as {}", req.method(), req.path(), session.user.id);
                req.extensions_mut().insert(session);
                Box::pin(self.service.call(req))
            }
            Err(e) => {
                log::info!("Rejected {} {}: {}", req.method(), req.path(), e);
                let err: Error = e.into();
                Box::pin(async move { Err(err) })
            }
        }
    }
}
