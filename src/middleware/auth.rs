use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::Role;
use crate::services::visibility::Requester;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
    pub department_id: Option<Uuid>,
}

impl Claims {
    pub fn for_requester(requester: &Requester, ttl_secs: i64) -> Self {
        Self {
            sub: requester.id.to_string(),
            exp: (Utc::now().timestamp() + ttl_secs).max(0) as usize,
            role: Some(requester.role.as_str().to_string()),
            department_id: requester.department_id,
        }
    }
}

/// Signs a token the auth layer will accept. Used by the account service and
/// by tests.
pub fn issue_token(secret: &str, requester: &Requester, ttl_secs: i64) -> Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        &Claims::for_requester(requester, ttl_secs),
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("token signing failed: {}", e)))
}

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

fn requester_from_headers(headers: &HeaderMap, secret: &str) -> std::result::Result<Requester, Response> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"));
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|_| reject(StatusCode::UNAUTHORIZED, "invalid_token"))?
        .claims;

    let id = Uuid::parse_str(&claims.sub).map_err(|_| reject(StatusCode::UNAUTHORIZED, "invalid_subject"))?;
    let role = claims
        .role
        .as_deref()
        .and_then(|r| r.parse::<Role>().ok())
        .ok_or_else(|| reject(StatusCode::FORBIDDEN, "forbidden"))?;

    Ok(Requester::new(id, role, claims.department_id))
}

async fn require_roles(state: &AppState, mut req: Request, next: Next, allowed: &[Role]) -> Response {
    let requester = match requester_from_headers(req.headers(), &state.jwt_secret) {
        Ok(requester) => requester,
        Err(resp) => return resp,
    };
    if !allowed.contains(&requester.role) {
        tracing::debug!(role = %requester.role, "Role not allowed on route");
        return reject(StatusCode::FORBIDDEN, "forbidden");
    }
    req.extensions_mut().insert(requester);
    next.run(req).await
}

pub async fn require_candidate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(&state, req, next, &[Role::Candidate]).await
}

pub async fn require_hr_or_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(&state, req, next, &[Role::Hr, Role::Admin]).await
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(&state, req, next, &[Role::Admin]).await
}
