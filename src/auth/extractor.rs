//! Actix-web extractor for the staff access key.
//!
//! The provided header value is wrapped in `SecretString` immediately and never logged.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, web};
use secrecy::{ExposeSecret, SecretString};
use std::future::{Ready, ready};

use super::AccessKey;
use crate::config::API_KEY_HEADER;
use crate::error::AppError;

/// Extractor that requires the staff access key on the request.
///
/// ```ignore
/// async fn protected_handler(_auth: StaffAuth) -> impl Responder { .. }
/// ```
pub struct StaffAuth;

impl FromRequest for StaffAuth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let stored = match req.app_data::<web::Data<AccessKey>>() {
            Some(key) if key.is_configured() => key,
            _ => {
                return ready(Err(AppError::Unauthorized(
                    "Access key is not configured on this server".to_string(),
                )));
            }
        };

        let provided: Option<SecretString> = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| SecretString::from(s.to_string()));

        match provided {
            Some(ref key) if stored.verify(key.expose_secret()) => ready(Ok(StaffAuth)),
            Some(_) => ready(Err(AppError::Unauthorized("Invalid access key".to_string()))),
            None => ready(Err(AppError::Unauthorized(format!(
                "Missing access key. Provide {} header.",
                API_KEY_HEADER
            )))),
        }
    }
}
