use crate::auth::{AuthenticatedPrincipal, ACCESS_TOKEN_COOKIE};
use crate::config::ProfileLookupConfig;
use crate::error::{AppError, ClientError};
use crate::profile::{DoctorProfile, PatientProfile};
use reqwest::header::COOKIE;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// HTTP client for the sibling profile-lookup service. Requests are made on
/// behalf of a caller and forward that caller's access token.
#[derive(Clone)]
pub struct ProfileLookupClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ProfileLookupClient {
    pub fn new(config: &ProfileLookupConfig) -> Result<Self, AppError> {
        let mut base_url =
            Url::parse(&config.base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        // joined paths must extend the base, not replace its last segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::InternalError(format!("failed to build http client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get_doctor_by_id(
        &self,
        principal: &AuthenticatedPrincipal,
        doctor_id: Uuid,
    ) -> Result<DoctorProfile, AppError> {
        self.get(principal, &format!("v1/doctor/{}", doctor_id)).await
    }

    pub async fn get_patient_by_id(
        &self,
        principal: &AuthenticatedPrincipal,
        patient_id: Uuid,
    ) -> Result<PatientProfile, AppError> {
        self.get(principal, &format!("v1/patient/{}", patient_id)).await
    }

    async fn get<T: DeserializeOwned>(&self, principal: &AuthenticatedPrincipal, path: &str) -> Result<T, AppError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))?;
        debug!("profile lookup GET {}", url);

        let res = self
            .http
            .get(url.clone())
            .header(COOKIE, format!("{}={}", ACCESS_TOKEN_COOKIE, principal.token))
            .send()
            .await
            .map_err(|e| {
                warn!("profile lookup to {} failed: {}", url, e);
                ClientError::UnexpectedStatus(e.to_string())
            })?;

        let status = res.status();
        if !status.is_success() {
            warn!("profile lookup to {} returned {}", url, status);
            return Err(ClientError::UnexpectedStatus(format!("{} from {}", status, url)).into());
        }

        res.json::<T>()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()).into())
    }
}
