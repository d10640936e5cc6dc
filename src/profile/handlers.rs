use crate::auth::AuthenticatedPrincipal;
use crate::db::models::Role;
use crate::db::repository::Database;
use crate::error::AppError;
use crate::profile::dto::{DoctorChanges, DoctorIdsRequest, PatientChanges, PatientIdsRequest};
use crate::validation;
use crate::AppState;
use actix_web::{web, HttpResponse};
use tracing::{error, info};
use uuid::Uuid;

pub async fn get_my_patient_profile<D: Database>(
    principal: AuthenticatedPrincipal,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    principal.require_role(Role::Patient)?;
    let profile = state
        .profile_service
        .get_patient_profile(&state.request_context(), principal.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn update_my_patient_profile<D: Database>(
    principal: AuthenticatedPrincipal,
    req: web::Json<PatientChanges>,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    let changes = req.into_inner();
    changes.validate()?;
    let profile = state
        .profile_service
        .update_patient_profile(&state.request_context(), &principal, changes)
        .await
        .map_err(|e| {
            error!("Patient profile update failed for {}: {}", principal.user_id, e);
            e
        })?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn get_my_doctor_profile<D: Database>(
    principal: AuthenticatedPrincipal,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    principal.require_role(Role::Doctor)?;
    let profile = state
        .profile_service
        .get_doctor_profile(&state.request_context(), principal.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn update_my_doctor_profile<D: Database>(
    principal: AuthenticatedPrincipal,
    req: web::Json<DoctorChanges>,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    let changes = req.into_inner();
    changes.validate()?;
    let profile = state
        .profile_service
        .update_doctor_profile(&state.request_context(), &principal, changes)
        .await
        .map_err(|e| {
            error!("Doctor profile update failed for {}: {}", principal.user_id, e);
            e
        })?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn get_patient_by_id<D: Database>(
    _principal: AuthenticatedPrincipal,
    path: web::Path<Uuid>,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    let profile = state
        .profile_service
        .get_patient_profile(&state.request_context(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn get_doctor_by_id<D: Database>(
    _principal: AuthenticatedPrincipal,
    path: web::Path<Uuid>,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    let profile = state
        .profile_service
        .get_doctor_profile(&state.request_context(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn get_patients_by_ids<D: Database>(
    principal: AuthenticatedPrincipal,
    req: web::Json<PatientIdsRequest>,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    let ids = validation::uuid_list("patient_ids", &req.patient_ids)?;
    info!("User {} requested {} patient profiles", principal.user_id, ids.len());
    let profiles = state
        .profile_service
        .get_patients_by_ids(&state.request_context(), &ids)
        .await?;
    Ok(HttpResponse::Ok().json(profiles))
}

pub async fn get_doctors_by_ids<D: Database>(
    principal: AuthenticatedPrincipal,
    req: web::Json<DoctorIdsRequest>,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    let ids = validation::uuid_list("doctor_ids", &req.doctor_ids)?;
    info!("User {} requested {} doctor profiles", principal.user_id, ids.len());
    let profiles = state
        .profile_service
        .get_doctors_by_ids(&state.request_context(), &ids)
        .await?;
    Ok(HttpResponse::Ok().json(profiles))
}

pub async fn list_doctors<D: Database>(
    _principal: AuthenticatedPrincipal,
    state: web::Data<AppState<D>>,
) -> Result<HttpResponse, AppError> {
    let profiles = state.profile_service.list_doctors(&state.request_context()).await?;
    Ok(HttpResponse::Ok().json(profiles))
}
