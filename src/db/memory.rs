//! In-process storage with the same contract as the Postgres backend.
//!
//! Transactions work on a private copy of the committed tables and keep a
//! log of their writes; commit replays the log against the latest committed
//! state and swaps it in only if every write succeeds. A transaction that is
//! dropped without commit simply disappears. Uniqueness, foreign keys and
//! soft deletes behave like the SQL schema in `migrations/`.

use crate::db::models::{Doctor, Patient, User};
use crate::db::repository::{Database, ProfileStore};
use crate::error::{AppError, DatabaseError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

type Result<T> = std::result::Result<T, AppError>;

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    InsertUser,
    UpdateUser,
    InsertPatient,
    UpdatePatient,
    InsertDoctor,
    UpdateDoctor,
    Commit,
}

#[derive(Debug, Clone)]
enum Write {
    InsertUser(User),
    UpdateUser(User),
    InsertPatient(Patient),
    UpdatePatient(Patient),
    InsertDoctor(Doctor),
    UpdateDoctor(Doctor),
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    patients: HashMap<Uuid, Patient>,
    doctors: HashMap<Uuid, Doctor>,
}

fn duplicate(constraint: &str) -> AppError {
    AppError::DatabaseError(DatabaseError::Duplicate(format!(
        "duplicate key value violates unique constraint \"{}\"",
        constraint
    )))
}

fn missing_user(table: &str) -> AppError {
    AppError::DatabaseError(DatabaseError::QueryError(format!(
        "insert on table \"{}\" violates foreign key constraint to \"users\"",
        table
    )))
}

impl Tables {
    fn find_user(&self, id: Uuid) -> Result<User> {
        self.users
            .get(&id)
            .filter(|u| !u.is_deleted())
            .cloned()
            .ok_or_else(|| AppError::not_found("User"))
    }

    fn find_users(&self, ids: &[Uuid]) -> Vec<User> {
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        self.users
            .values()
            .filter(|u| wanted.contains(&u.id) && !u.is_deleted())
            .cloned()
            .collect()
    }

    fn insert_user(&mut self, user: &User) -> Result<User> {
        if self.users.contains_key(&user.id) {
            return Err(duplicate("users_pkey"));
        }
        self.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    fn update_user(&mut self, user: &User) -> Result<User> {
        let row = self
            .users
            .get_mut(&user.id)
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| AppError::not_found("User"))?;
        row.password = user.password.clone();
        row.first_name = user.first_name.clone();
        row.last_name = user.last_name.clone();
        row.gender = user.gender;
        row.phone_number = user.phone_number.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    fn find_patient(&self, user_id: Uuid) -> Result<Patient> {
        self.patients
            .get(&user_id)
            .filter(|p| !p.is_deleted())
            .cloned()
            .ok_or_else(|| AppError::not_found("Patient"))
    }

    fn find_patient_by_hospital_id(&self, hospital_id: &str) -> Result<Patient> {
        self.patients
            .values()
            .find(|p| p.hospital_id == hospital_id && !p.is_deleted())
            .cloned()
            .ok_or_else(|| AppError::not_found("Patient"))
    }

    fn find_patients(&self, user_ids: &[Uuid]) -> Vec<Patient> {
        let wanted: HashSet<&Uuid> = user_ids.iter().collect();
        self.patients
            .values()
            .filter(|p| wanted.contains(&p.user_id) && !p.is_deleted())
            .cloned()
            .collect()
    }

    fn insert_patient(&mut self, patient: &Patient) -> Result<Patient> {
        if !self.users.contains_key(&patient.user_id) {
            return Err(missing_user("patients"));
        }
        if self.patients.contains_key(&patient.user_id) {
            return Err(duplicate("patients_pkey"));
        }
        if self.patients.values().any(|p| p.hospital_id == patient.hospital_id) {
            return Err(duplicate("patients_hospital_id_key"));
        }
        self.patients.insert(patient.user_id, patient.clone());
        Ok(patient.clone())
    }

    fn update_patient(&mut self, patient: &Patient) -> Result<Patient> {
        let row = self
            .patients
            .get_mut(&patient.user_id)
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| AppError::not_found("Patient"))?;
        row.birth_date = patient.birth_date;
        row.id_card_number = patient.id_card_number.clone();
        row.address = patient.address.clone();
        row.allergies = patient.allergies.clone();
        row.emergency_contact = patient.emergency_contact.clone();
        row.blood_type = patient.blood_type.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    fn find_doctor(&self, user_id: Uuid) -> Result<Doctor> {
        self.doctors
            .get(&user_id)
            .filter(|d| !d.is_deleted())
            .cloned()
            .ok_or_else(|| AppError::not_found("Doctor"))
    }

    fn find_doctor_by_username(&self, username: &str) -> Result<Doctor> {
        self.doctors
            .values()
            .find(|d| d.username == username && !d.is_deleted())
            .cloned()
            .ok_or_else(|| AppError::not_found("Doctor"))
    }

    fn find_doctors(&self, user_ids: &[Uuid]) -> Vec<Doctor> {
        let wanted: HashSet<&Uuid> = user_ids.iter().collect();
        self.doctors
            .values()
            .filter(|d| wanted.contains(&d.user_id) && !d.is_deleted())
            .cloned()
            .collect()
    }

    fn list_doctors(&self) -> Vec<Doctor> {
        let mut doctors: Vec<Doctor> = self.doctors.values().filter(|d| !d.is_deleted()).cloned().collect();
        doctors.sort_by(|a, b| a.username.cmp(&b.username));
        doctors
    }

    fn insert_doctor(&mut self, doctor: &Doctor) -> Result<Doctor> {
        if !self.users.contains_key(&doctor.user_id) {
            return Err(missing_user("doctors"));
        }
        if self.doctors.contains_key(&doctor.user_id) {
            return Err(duplicate("doctors_pkey"));
        }
        if self.doctors.values().any(|d| d.username == doctor.username) {
            return Err(duplicate("doctors_username_key"));
        }
        self.doctors.insert(doctor.user_id, doctor.clone());
        Ok(doctor.clone())
    }

    fn update_doctor(&mut self, doctor: &Doctor) -> Result<Doctor> {
        let row = self
            .doctors
            .get_mut(&doctor.user_id)
            .filter(|d| !d.is_deleted())
            .ok_or_else(|| AppError::not_found("Doctor"))?;
        row.specialty = doctor.specialty.clone();
        row.bio = doctor.bio.clone();
        row.years_experience = doctor.years_experience;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    fn apply(&mut self, write: &Write) -> Result<()> {
        match write {
            Write::InsertUser(user) => self.insert_user(user).map(|_| ()),
            Write::UpdateUser(user) => self.update_user(user).map(|_| ()),
            Write::InsertPatient(patient) => self.insert_patient(patient).map(|_| ()),
            Write::UpdatePatient(patient) => self.update_patient(patient).map(|_| ()),
            Write::InsertDoctor(doctor) => self.insert_doctor(doctor).map(|_| ()),
            Write::UpdateDoctor(doctor) => self.update_doctor(doctor).map(|_| ()),
        }
    }
}

#[derive(Default)]
struct Shared {
    committed: Mutex<Tables>,
    failures: Mutex<HashSet<StoreOp>>,
    latency: Mutex<Duration>,
    applied_writes: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl Shared {
    /// Sleeps for the configured latency, then consumes an injected failure.
    async fn check(&self, op: StoreOp) -> Result<()> {
        let latency = *self.latency.lock().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.failures.lock().await.remove(&op) {
            return Err(AppError::DatabaseError(DatabaseError::Injected(format!("{:?}", op))));
        }
        Ok(())
    }
}

/// In-memory [`Database`]. Cloning shares the same tables.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    shared: Arc<Shared>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next occurrence of `op` fail with an injected storage error.
    pub async fn fail_on(&self, op: StoreOp) {
        self.shared.failures.lock().await.insert(op);
    }

    /// Delays every storage operation by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.shared.latency.lock().await = latency;
    }

    pub async fn user_count(&self) -> usize {
        self.shared.committed.lock().await.users.len()
    }

    pub async fn patient_count(&self) -> usize {
        self.shared.committed.lock().await.patients.len()
    }

    pub async fn doctor_count(&self) -> usize {
        self.shared.committed.lock().await.doctors.len()
    }

    /// Number of writes that reached committed state.
    pub fn applied_writes(&self) -> usize {
        self.shared.applied_writes.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.shared.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.shared.rollbacks.load(Ordering::SeqCst)
    }

    pub async fn soft_delete_user(&self, id: Uuid) -> bool {
        let mut tables = self.shared.committed.lock().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.deleted_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    pub async fn soft_delete_patient(&self, user_id: Uuid) -> bool {
        let mut tables = self.shared.committed.lock().await;
        match tables.patients.get_mut(&user_id) {
            Some(patient) => {
                patient.deleted_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    pub async fn soft_delete_doctor(&self, user_id: Uuid) -> bool {
        let mut tables = self.shared.committed.lock().await;
        match tables.doctors.get_mut(&user_id) {
            Some(doctor) => {
                doctor.deleted_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }
}

/// Autocommit scope: every write lands immediately.
pub struct MemorySession {
    shared: Arc<Shared>,
}

impl MemorySession {
    async fn write<T>(&self, op: StoreOp, apply: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        self.shared.check(op).await?;
        let mut tables = self.shared.committed.lock().await;
        let row = apply(&mut tables)?;
        self.shared.applied_writes.fetch_add(1, Ordering::SeqCst);
        Ok(row)
    }
}

/// Transaction scope over a private copy of the tables.
pub struct MemoryTx {
    shared: Arc<Shared>,
    staged: Tables,
    writes: Vec<Write>,
}

#[async_trait]
impl Database for MemoryDatabase {
    type Session = MemorySession;
    type Tx = MemoryTx;

    async fn session(&self) -> Result<Self::Session> {
        Ok(MemorySession { shared: self.shared.clone() })
    }

    async fn begin(&self) -> Result<Self::Tx> {
        let staged = self.shared.committed.lock().await.clone();
        Ok(MemoryTx {
            shared: self.shared.clone(),
            staged,
            writes: Vec::new(),
        })
    }

    async fn commit(&self, tx: Self::Tx) -> Result<()> {
        self.shared.check(StoreOp::Commit).await?;
        let mut committed = self.shared.committed.lock().await;
        let mut next = committed.clone();
        for write in &tx.writes {
            next.apply(write)?;
        }
        *committed = next;
        self.shared.applied_writes.fetch_add(tx.writes.len(), Ordering::SeqCst);
        self.shared.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<()> {
        drop(tx);
        self.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemorySession {
    async fn find_user(&mut self, id: Uuid) -> Result<User> {
        self.shared.committed.lock().await.find_user(id)
    }

    async fn find_users(&mut self, ids: &[Uuid]) -> Result<Vec<User>> {
        Ok(self.shared.committed.lock().await.find_users(ids))
    }

    async fn insert_user(&mut self, user: &User) -> Result<User> {
        self.write(StoreOp::InsertUser, |t| t.insert_user(user)).await
    }

    async fn update_user(&mut self, user: &User) -> Result<User> {
        self.write(StoreOp::UpdateUser, |t| t.update_user(user)).await
    }

    async fn find_patient(&mut self, user_id: Uuid) -> Result<Patient> {
        self.shared.committed.lock().await.find_patient(user_id)
    }

    async fn find_patient_by_hospital_id(&mut self, hospital_id: &str) -> Result<Patient> {
        self.shared.committed.lock().await.find_patient_by_hospital_id(hospital_id)
    }

    async fn find_patients(&mut self, user_ids: &[Uuid]) -> Result<Vec<Patient>> {
        Ok(self.shared.committed.lock().await.find_patients(user_ids))
    }

    async fn insert_patient(&mut self, patient: &Patient) -> Result<Patient> {
        self.write(StoreOp::InsertPatient, |t| t.insert_patient(patient)).await
    }

    async fn update_patient(&mut self, patient: &Patient) -> Result<Patient> {
        self.write(StoreOp::UpdatePatient, |t| t.update_patient(patient)).await
    }

    async fn find_doctor(&mut self, user_id: Uuid) -> Result<Doctor> {
        self.shared.committed.lock().await.find_doctor(user_id)
    }

    async fn find_doctor_by_username(&mut self, username: &str) -> Result<Doctor> {
        self.shared.committed.lock().await.find_doctor_by_username(username)
    }

    async fn find_doctors(&mut self, user_ids: &[Uuid]) -> Result<Vec<Doctor>> {
        Ok(self.shared.committed.lock().await.find_doctors(user_ids))
    }

    async fn list_doctors(&mut self) -> Result<Vec<Doctor>> {
        Ok(self.shared.committed.lock().await.list_doctors())
    }

    async fn insert_doctor(&mut self, doctor: &Doctor) -> Result<Doctor> {
        self.write(StoreOp::InsertDoctor, |t| t.insert_doctor(doctor)).await
    }

    async fn update_doctor(&mut self, doctor: &Doctor) -> Result<Doctor> {
        self.write(StoreOp::UpdateDoctor, |t| t.update_doctor(doctor)).await
    }
}

impl MemoryTx {
    async fn stage(&mut self, op: StoreOp, write: Write) -> Result<()> {
        self.shared.check(op).await?;
        self.staged.apply(&write)?;
        self.writes.push(write);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryTx {
    async fn find_user(&mut self, id: Uuid) -> Result<User> {
        self.staged.find_user(id)
    }

    async fn find_users(&mut self, ids: &[Uuid]) -> Result<Vec<User>> {
        Ok(self.staged.find_users(ids))
    }

    async fn insert_user(&mut self, user: &User) -> Result<User> {
        self.stage(StoreOp::InsertUser, Write::InsertUser(user.clone())).await?;
        self.staged.find_user(user.id)
    }

    async fn update_user(&mut self, user: &User) -> Result<User> {
        self.stage(StoreOp::UpdateUser, Write::UpdateUser(user.clone())).await?;
        self.staged.find_user(user.id)
    }

    async fn find_patient(&mut self, user_id: Uuid) -> Result<Patient> {
        self.staged.find_patient(user_id)
    }

    async fn find_patient_by_hospital_id(&mut self, hospital_id: &str) -> Result<Patient> {
        self.staged.find_patient_by_hospital_id(hospital_id)
    }

    async fn find_patients(&mut self, user_ids: &[Uuid]) -> Result<Vec<Patient>> {
        Ok(self.staged.find_patients(user_ids))
    }

    async fn insert_patient(&mut self, patient: &Patient) -> Result<Patient> {
        self.stage(StoreOp::InsertPatient, Write::InsertPatient(patient.clone())).await?;
        self.staged.find_patient(patient.user_id)
    }

    async fn update_patient(&mut self, patient: &Patient) -> Result<Patient> {
        self.stage(StoreOp::UpdatePatient, Write::UpdatePatient(patient.clone())).await?;
        self.staged.find_patient(patient.user_id)
    }

    async fn find_doctor(&mut self, user_id: Uuid) -> Result<Doctor> {
        self.staged.find_doctor(user_id)
    }

    async fn find_doctor_by_username(&mut self, username: &str) -> Result<Doctor> {
        self.staged.find_doctor_by_username(username)
    }

    async fn find_doctors(&mut self, user_ids: &[Uuid]) -> Result<Vec<Doctor>> {
        Ok(self.staged.find_doctors(user_ids))
    }

    async fn list_doctors(&mut self) -> Result<Vec<Doctor>> {
        Ok(self.staged.list_doctors())
    }

    async fn insert_doctor(&mut self, doctor: &Doctor) -> Result<Doctor> {
        self.stage(StoreOp::InsertDoctor, Write::InsertDoctor(doctor.clone())).await?;
        self.staged.find_doctor(doctor.user_id)
    }

    async fn update_doctor(&mut self, doctor: &Doctor) -> Result<Doctor> {
        self.stage(StoreOp::UpdateDoctor, Write::UpdateDoctor(doctor.clone())).await?;
        self.staged.find_doctor(doctor.user_id)
    }
}
