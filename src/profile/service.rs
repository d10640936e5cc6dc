use crate::auth::AuthenticatedPrincipal;
use crate::context::RequestContext;
use crate::db::models::{Role, User};
use crate::db::repository::{Database, ProfileRepository, ProfileStore};
use crate::error::AppError;
use crate::profile::dto::{DoctorChanges, DoctorProfile, PatientChanges, PatientProfile};
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

type Result<T> = std::result::Result<T, AppError>;

/// Reads and partial updates over identity + role profile pairs.
pub struct ProfileService<D: Database> {
    repository: ProfileRepository<D>,
}

impl<D: Database> Clone for ProfileService<D> {
    fn clone(&self) -> Self {
        Self { repository: self.repository.clone() }
    }
}

fn users_by_id(users: Vec<User>) -> HashMap<Uuid, User> {
    users.into_iter().map(|u| (u.id, u)).collect()
}

impl<D: Database> ProfileService<D> {
    pub fn new(repository: ProfileRepository<D>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_patient_profile(&self, ctx: &RequestContext, user_id: Uuid) -> Result<PatientProfile> {
        ctx.run(async {
            let mut session = self.repository.session().await?;
            let patient = session.find_patient(user_id).await?;
            let user = session.find_user(user_id).await?;
            Ok(PatientProfile::compose(user, patient))
        })
        .await
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_doctor_profile(&self, ctx: &RequestContext, user_id: Uuid) -> Result<DoctorProfile> {
        ctx.run(async {
            let mut session = self.repository.session().await?;
            let doctor = session.find_doctor(user_id).await?;
            let user = session.find_user(user_id).await?;
            Ok(DoctorProfile::compose(user, doctor))
        })
        .await
    }

    /// Loads, patches and writes back the caller's identity and patient rows
    /// in one transaction.
    #[instrument(skip(self, ctx, principal, changes), fields(user_id = %principal.user_id))]
    pub async fn update_patient_profile(
        &self,
        ctx: &RequestContext,
        principal: &AuthenticatedPrincipal,
        changes: PatientChanges,
    ) -> Result<PatientProfile> {
        principal.require_role(Role::Patient)?;
        let user_id = principal.user_id;

        let profile = ctx
            .run(self.repository.run_in_transaction(move |tx| {
                Box::pin(async move {
                    let mut user = tx.find_user(user_id).await?;
                    let mut patient = tx.find_patient(user_id).await?;

                    changes.apply(&mut user, &mut patient);
                    let now = Utc::now();
                    user.updated_at = now;
                    patient.updated_at = now;

                    let user = tx.update_user(&user).await?;
                    let patient = tx.update_patient(&patient).await?;
                    Ok(PatientProfile::compose(user, patient))
                })
            }))
            .await?;

        info!("patient profile updated");
        Ok(profile)
    }

    /// Loads, patches and writes back the caller's identity and doctor rows
    /// in one transaction.
    #[instrument(skip(self, ctx, principal, changes), fields(user_id = %principal.user_id))]
    pub async fn update_doctor_profile(
        &self,
        ctx: &RequestContext,
        principal: &AuthenticatedPrincipal,
        changes: DoctorChanges,
    ) -> Result<DoctorProfile> {
        principal.require_role(Role::Doctor)?;
        let user_id = principal.user_id;

        let profile = ctx
            .run(self.repository.run_in_transaction(move |tx| {
                Box::pin(async move {
                    let mut user = tx.find_user(user_id).await?;
                    let mut doctor = tx.find_doctor(user_id).await?;

                    changes.apply(&mut user, &mut doctor);
                    let now = Utc::now();
                    user.updated_at = now;
                    doctor.updated_at = now;

                    let user = tx.update_user(&user).await?;
                    let doctor = tx.update_doctor(&doctor).await?;
                    Ok(DoctorProfile::compose(user, doctor))
                })
            }))
            .await?;

        info!("doctor profile updated");
        Ok(profile)
    }

    /// Ids without a live patient profile or identity are skipped.
    #[instrument(skip(self, ctx, ids), fields(requested = ids.len()))]
    pub async fn get_patients_by_ids(&self, ctx: &RequestContext, ids: &[Uuid]) -> Result<Vec<PatientProfile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        ctx.run(async {
            let mut session = self.repository.session().await?;
            let patients = session.find_patients(ids).await?;
            let owners: Vec<Uuid> = patients.iter().map(|p| p.user_id).collect();
            let mut users = users_by_id(session.find_users(&owners).await?);

            let profiles: Vec<PatientProfile> = patients
                .into_iter()
                .filter_map(|p| users.remove(&p.user_id).map(|u| PatientProfile::compose(u, p)))
                .collect();
            debug!(found = profiles.len(), "patients resolved");
            Ok(profiles)
        })
        .await
    }

    /// Ids without a live doctor profile or identity are skipped.
    #[instrument(skip(self, ctx, ids), fields(requested = ids.len()))]
    pub async fn get_doctors_by_ids(&self, ctx: &RequestContext, ids: &[Uuid]) -> Result<Vec<DoctorProfile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        ctx.run(async {
            let mut session = self.repository.session().await?;
            let doctors = session.find_doctors(ids).await?;
            let owners: Vec<Uuid> = doctors.iter().map(|d| d.user_id).collect();
            let mut users = users_by_id(session.find_users(&owners).await?);

            let profiles: Vec<DoctorProfile> = doctors
                .into_iter()
                .filter_map(|d| users.remove(&d.user_id).map(|u| DoctorProfile::compose(u, d)))
                .collect();
            debug!(found = profiles.len(), "doctors resolved");
            Ok(profiles)
        })
        .await
    }

    #[instrument(skip(self, ctx))]
    pub async fn list_doctors(&self, ctx: &RequestContext) -> Result<Vec<DoctorProfile>> {
        ctx.run(async {
            let mut session = self.repository.session().await?;
            let doctors = session.list_doctors().await?;
            let owners: Vec<Uuid> = doctors.iter().map(|d| d.user_id).collect();
            let mut users = users_by_id(session.find_users(&owners).await?);

            Ok(doctors
                .into_iter()
                .filter_map(|d| users.remove(&d.user_id).map(|u| DoctorProfile::compose(u, d)))
                .collect())
        })
        .await
    }
}
