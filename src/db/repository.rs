//! Storage seam for identities and their role profiles.
//!
//! [`ProfileStore`] is the query surface. It is implemented both by a pooled
//! session and by an open transaction, so the same calls run in either scope.
//! [`Database`] hands out those scopes, and [`ProfileRepository`] wraps a
//! database with the all-or-nothing [`ProfileRepository::run_in_transaction`]
//! boundary.

use crate::db::models::{Doctor, Patient, User};
use crate::error::AppError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

type Result<T> = std::result::Result<T, AppError>;

/// Keyed CRUD over users, patients and doctors. Soft-deleted rows are
/// invisible. Single-row lookups and updates fail with `NotFound` when no
/// live row matches.
#[async_trait]
pub trait ProfileStore: Send {
    async fn find_user(&mut self, id: Uuid) -> Result<User>;
    async fn find_users(&mut self, ids: &[Uuid]) -> Result<Vec<User>>;
    async fn insert_user(&mut self, user: &User) -> Result<User>;
    async fn update_user(&mut self, user: &User) -> Result<User>;

    async fn find_patient(&mut self, user_id: Uuid) -> Result<Patient>;
    async fn find_patient_by_hospital_id(&mut self, hospital_id: &str) -> Result<Patient>;
    async fn find_patients(&mut self, user_ids: &[Uuid]) -> Result<Vec<Patient>>;
    async fn insert_patient(&mut self, patient: &Patient) -> Result<Patient>;
    async fn update_patient(&mut self, patient: &Patient) -> Result<Patient>;

    async fn find_doctor(&mut self, user_id: Uuid) -> Result<Doctor>;
    async fn find_doctor_by_username(&mut self, username: &str) -> Result<Doctor>;
    async fn find_doctors(&mut self, user_ids: &[Uuid]) -> Result<Vec<Doctor>>;
    async fn list_doctors(&mut self) -> Result<Vec<Doctor>>;
    async fn insert_doctor(&mut self, doctor: &Doctor) -> Result<Doctor>;
    async fn update_doctor(&mut self, doctor: &Doctor) -> Result<Doctor>;
}

/// A storage engine able to open pooled sessions and transactions.
///
/// Dropping a `Tx` without passing it to [`Database::commit`] must roll it
/// back, so early returns, panics and cancelled futures never leave partial
/// writes behind.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    type Session: ProfileStore;
    type Tx: ProfileStore;

    async fn session(&self) -> Result<Self::Session>;
    async fn begin(&self) -> Result<Self::Tx>;
    async fn commit(&self, tx: Self::Tx) -> Result<()>;
    async fn rollback(&self, tx: Self::Tx) -> Result<()>;
}

pub struct ProfileRepository<D: Database> {
    db: Arc<D>,
}

impl<D: Database> Clone for ProfileRepository<D> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<D: Database> ProfileRepository<D> {
    pub fn new(db: Arc<D>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &D {
        self.db.as_ref()
    }

    /// Opens a pooled session for reads that need no transaction.
    pub async fn session(&self) -> Result<D::Session> {
        self.db.session().await
    }

    /// Runs `work` inside one transaction. The transaction commits only when
    /// `work` returns `Ok`; an error rolls it back before being returned.
    pub async fn run_in_transaction<T, F>(&self, work: F) -> Result<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut D::Tx) -> BoxFuture<'t, Result<T>> + Send,
    {
        let mut tx = self.db.begin().await?;
        debug!("transaction started");

        let outcome = work(&mut tx).await;
        match outcome {
            Ok(value) => {
                self.db.commit(tx).await?;
                debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.db.rollback(tx).await {
                    warn!("rollback failed after {}: {}", err, rollback_err);
                }
                debug!("transaction rolled back");
                Err(err)
            }
        }
    }

    pub async fn find_user(&self, id: Uuid) -> Result<User> {
        self.session().await?.find_user(id).await
    }

    pub async fn find_patient(&self, user_id: Uuid) -> Result<Patient> {
        self.session().await?.find_patient(user_id).await
    }

    pub async fn find_patient_by_hospital_id(&self, hospital_id: &str) -> Result<Patient> {
        self.session().await?.find_patient_by_hospital_id(hospital_id).await
    }

    pub async fn find_doctor(&self, user_id: Uuid) -> Result<Doctor> {
        self.session().await?.find_doctor(user_id).await
    }

    pub async fn find_doctor_by_username(&self, username: &str) -> Result<Doctor> {
        self.session().await?.find_doctor_by_username(username).await
    }
}
