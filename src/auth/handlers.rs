use crate::auth::dto::{
    DoctorLoginRequest, DoctorRegistration, LoginResponse, PatientLoginRequest, PatientRegistration,
    RegisterResponse,
};
use crate::auth::middleware::{access_token_cookie, parse_same_site};
use crate::db::repository::Database;
use crate::error::AppError;
use crate::AppState;
use actix_web::{web, HttpResponse};
use tracing::{error, info};

fn login_response<D: Database>(state: &AppState<D>, token: String) -> HttpResponse {
    let auth = &state.config.auth;
    let cookie = access_token_cookie(
        token.clone(),
        auth.token_ttl_secs,
        auth.cookie_secure,
        parse_same_site(&auth.cookie_same_site),
    );
    HttpResponse::Ok()
        .cookie(cookie)
        .json(LoginResponse { access_token: token })
}

pub async fn register_patient<D: Database>(
    req: web::Json<PatientRegistration>,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    let input = req.into_inner();
    input.validate()?;
    info!("Received patient registration for hospital id: {}", input.hospital_id);

    let result = state
        .auth_service
        .register_patient(&state.request_context(), input)
        .await
        .map_err(|e| {
            error!("Patient registration failed: {}", e);
            e
        })?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "Patient registered successfully".to_string(),
        id: result.user_id,
    }))
}

pub async fn register_doctor<D: Database>(
    req: web::Json<DoctorRegistration>,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    let input = req.into_inner();
    input.validate()?;
    info!("Received doctor registration for username: {}", input.username);

    let result = state
        .auth_service
        .register_doctor(&state.request_context(), input)
        .await
        .map_err(|e| {
            error!("Doctor registration failed: {}", e);
            e
        })?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "Doctor registered successfully".to_string(),
        id: result.user_id,
    }))
}

pub async fn login_patient<D: Database>(
    req: web::Json<PatientLoginRequest>,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let token = state
        .auth_service
        .login_patient(&state.request_context(), &req.hospital_id, &req.password)
        .await
        .map_err(|e| {
            error!("Patient login failed for hospital id {}: {}", req.hospital_id, e);
            e
        })?;

    Ok(login_response(&state, token))
}

pub async fn login_doctor<D: Database>(
    req: web::Json<DoctorLoginRequest>,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let token = state
        .auth_service
        .login_doctor(&state.request_context(), &req.username, &req.password)
        .await
        .map_err(|e| {
            error!("Doctor login failed for username {}: {}", req.username, e);
            e
        })?;

    Ok(login_response(&state, token))
}
