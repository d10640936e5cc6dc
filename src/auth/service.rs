use crate::auth::dto::{DoctorRegistration, PatientRegistration, RegistrationResult};
use crate::auth::password::PasswordHasher;
use crate::auth::token::TokenService;
use crate::context::RequestContext;
use crate::db::models::{Doctor, Patient, Role, User};
use crate::db::repository::{Database, ProfileRepository, ProfileStore};
use crate::error::AppError;
use tracing::{info, instrument, warn};
use uuid::Uuid;

type Result<T> = std::result::Result<T, AppError>;

/// Registration and login for patients and doctors.
pub struct AuthService<D: Database> {
    repository: ProfileRepository<D>,
    hasher: PasswordHasher,
    tokens: TokenService,
}

impl<D: Database> Clone for AuthService<D> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            hasher: self.hasher.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

impl<D: Database> AuthService<D> {
    pub fn new(repository: ProfileRepository<D>, hasher: PasswordHasher, tokens: TokenService) -> Self {
        Self { repository, hasher, tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Creates the identity and its patient profile in one transaction.
    #[instrument(skip(self, ctx, input), fields(hospital_id = %input.hospital_id))]
    pub async fn register_patient(&self, ctx: &RequestContext, input: PatientRegistration) -> Result<RegistrationResult> {
        ctx.run(async move {
            let password_hash = self.hasher.hash_async(&input.password).await?;
            let user = User::new(
                password_hash,
                input.first_name,
                input.last_name,
                input.gender,
                input.phone_number,
                Role::Patient,
            );

            let mut patient = Patient::new(user.id, input.hospital_id);
            patient.birth_date = input.birth_date;
            patient.id_card_number = input.id_card_number;
            patient.address = input.address;
            patient.allergies = input.allergies;
            patient.emergency_contact = input.emergency_contact;
            patient.blood_type = input.blood_type;

            let user_id = user.id;
            self.repository
                .run_in_transaction(move |tx| {
                    Box::pin(async move {
                        // users row first, patients references it
                        tx.insert_user(&user).await?;
                        tx.insert_patient(&patient).await?;
                        Ok(())
                    })
                })
                .await?;

            info!(%user_id, "patient registered");
            Ok(RegistrationResult { user_id, role: Role::Patient })
        })
        .await
    }

    /// Creates the identity and its doctor profile in one transaction.
    #[instrument(skip(self, ctx, input), fields(username = %input.username))]
    pub async fn register_doctor(&self, ctx: &RequestContext, input: DoctorRegistration) -> Result<RegistrationResult> {
        ctx.run(async move {
            let password_hash = self.hasher.hash_async(&input.password).await?;
            let user = User::new(
                password_hash,
                input.first_name,
                input.last_name,
                input.gender,
                input.phone_number,
                Role::Doctor,
            );

            let mut doctor = Doctor::new(user.id, input.username);
            doctor.specialty = input.specialty;
            doctor.bio = input.bio;
            doctor.years_experience = input.years_experience;

            let user_id = user.id;
            self.repository
                .run_in_transaction(move |tx| {
                    Box::pin(async move {
                        tx.insert_user(&user).await?;
                        tx.insert_doctor(&doctor).await?;
                        Ok(())
                    })
                })
                .await?;

            info!(%user_id, "doctor registered");
            Ok(RegistrationResult { user_id, role: Role::Doctor })
        })
        .await
    }

    /// Returns a signed access token for a patient's hospital id and password.
    #[instrument(skip(self, ctx, password))]
    pub async fn login_patient(&self, ctx: &RequestContext, hospital_id: &str, password: &str) -> Result<String> {
        ctx.run(async {
            let mut session = self.repository.session().await?;
            match found(session.find_patient_by_hospital_id(hospital_id).await)? {
                Some(patient) => {
                    self.finish_login(&mut session, patient.user_id, Role::Patient, password)
                        .await
                }
                None => self.reject(password).await,
            }
        })
        .await
    }

    /// Returns a signed access token for a doctor's username and password.
    #[instrument(skip(self, ctx, password))]
    pub async fn login_doctor(&self, ctx: &RequestContext, username: &str, password: &str) -> Result<String> {
        ctx.run(async {
            let mut session = self.repository.session().await?;
            match found(session.find_doctor_by_username(username).await)? {
                Some(doctor) => {
                    self.finish_login(&mut session, doctor.user_id, Role::Doctor, password)
                        .await
                }
                None => self.reject(password).await,
            }
        })
        .await
    }

    async fn finish_login(&self, session: &mut D::Session, user_id: Uuid, role: Role, password: &str) -> Result<String> {
        let user = match found(session.find_user(user_id).await)? {
            Some(user) => user,
            None => return self.reject(password).await,
        };
        if user.role != role {
            warn!(%user_id, stored = %user.role, expected = %role, "profile and identity roles disagree");
            return self.reject(password).await;
        }

        if !self.hasher.verify_async(password, &user.password).await? {
            return Err(AppError::invalid_credentials());
        }

        let token = self.tokens.issue(user.id, user.role)?;
        info!(%user_id, %role, "login succeeded");
        Ok(token)
    }

    /// Fails a login that has no stored hash to check, after the same
    /// Argon2 work a wrong password costs.
    async fn reject(&self, password: &str) -> Result<String> {
        self.hasher.verify_dummy_async(password).await?;
        Err(AppError::invalid_credentials())
    }
}

fn found<T>(lookup: Result<T>) -> Result<Option<T>> {
    match lookup {
        Ok(row) => Ok(Some(row)),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
