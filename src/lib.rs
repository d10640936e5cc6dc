pub mod auth;
pub mod clients;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod profile;
pub mod validation;

use actix_web::{web, HttpResponse};
use std::sync::Arc;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;
pub use context::RequestContext;

use auth::{AuthService, PasswordHasher, TokenService};
use clients::ProfileLookupClient;
use db::{Database, ProfileRepository};
use profile::ProfileService;

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all workers
pub struct AppState<D: Database> {
    pub config: Arc<Settings>,
    pub repository: ProfileRepository<D>,
    pub auth_service: AuthService<D>,
    pub profile_service: ProfileService<D>,
    pub tokens: TokenService,
    pub profile_lookup: ProfileLookupClient,
}

impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            repository: self.repository.clone(),
            auth_service: self.auth_service.clone(),
            profile_service: self.profile_service.clone(),
            tokens: self.tokens.clone(),
            profile_lookup: self.profile_lookup.clone(),
        }
    }
}

impl<D: Database> AppState<D> {
    pub fn new(config: Settings, db: Arc<D>) -> Result<Self> {
        let repository = ProfileRepository::new(db);
        let hasher = PasswordHasher::new(&config.password)?;
        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl_secs);
        let profile_lookup = ProfileLookupClient::new(&config.profile_lookup)?;

        Ok(Self {
            auth_service: AuthService::new(repository.clone(), hasher, tokens.clone()),
            profile_service: ProfileService::new(repository.clone()),
            repository,
            tokens,
            profile_lookup,
            config: Arc::new(config),
        })
    }

    /// A fresh deadline for one inbound request.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::with_timeout(self.config.request.timeout())
    }
}

/// Registers application data and every route. Call inside `App::configure`.
pub fn configure<D: Database>(state: AppState<D>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        use auth::handlers as a;
        use profile::handlers as p;

        cfg.app_data(web::Data::new(state.tokens.clone()))
            .app_data(web::Data::new(state))
            .app_data(web::JsonConfig::default().error_handler(|err, _| {
                AppError::ValidationError(err.to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _| {
                AppError::ValidationError(err.to_string()).into()
            }))
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/api/user/v1")
                    .route("/patient/register", web::post().to(a::register_patient::<D>))
                    .route("/patient/login", web::post().to(a::login_patient::<D>))
                    .route("/doctor/register", web::post().to(a::register_doctor::<D>))
                    .route("/doctor/login", web::post().to(a::login_doctor::<D>))
                    .route("/patient/me", web::get().to(p::get_my_patient_profile::<D>))
                    .route("/patient/me", web::put().to(p::update_my_patient_profile::<D>))
                    .route("/doctor/me", web::get().to(p::get_my_doctor_profile::<D>))
                    .route("/doctor/me", web::put().to(p::update_my_doctor_profile::<D>))
                    .route("/patient/{id}", web::get().to(p::get_patient_by_id::<D>))
                    .route("/doctor/{id}", web::get().to(p::get_doctor_by_id::<D>))
                    .route("/patients", web::post().to(p::get_patients_by_ids::<D>))
                    .route("/doctors", web::post().to(p::get_doctors_by_ids::<D>))
                    .route("/doctors", web::get().to(p::list_doctors::<D>)),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDatabase;

    #[test]
    fn test_app_state_clone_shares_config() {
        let config = Settings::new_for_test().expect("Failed to load test config");
        let state = AppState::new(config, Arc::new(MemoryDatabase::new())).unwrap();
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.config, &cloned.config));
    }

    #[test]
    fn test_app_state_rejects_bad_hasher_config() {
        let mut config = Settings::new_for_test().expect("Failed to load test config");
        config.password.iterations = 0;
        let state = AppState::new(config, Arc::new(MemoryDatabase::new()));
        assert!(matches!(state, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_request_context_uses_configured_timeout() {
        let mut config = Settings::new_for_test().expect("Failed to load test config");
        config.request.timeout_ms = 500;
        let state = AppState::new(config, Arc::new(MemoryDatabase::new())).unwrap();
        assert!(state.request_context().remaining() <= std::time::Duration::from_millis(500));
    }
}
