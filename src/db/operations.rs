use crate::config::DatabaseConfig;
use crate::db::models::{Doctor, Patient, User};
use crate::db::repository::{Database, ProfileStore};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::ops::DerefMut;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

type Result<T> = std::result::Result<T, AppError>;

/// Postgres-backed storage using a shared connection pool.
#[derive(Clone)]
pub struct PgDatabase {
    pool: Arc<PgPool>,
}

impl PgDatabase {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// A Postgres connection scope: either a pooled connection or an open
/// transaction. Both deref to a `PgConnection`.
pub struct PgSession<C> {
    conn: C,
}

#[async_trait]
impl Database for PgDatabase {
    type Session = PgSession<PoolConnection<Postgres>>;
    type Tx = PgSession<Transaction<'static, Postgres>>;

    async fn session(&self) -> Result<Self::Session> {
        let conn = self.pool.acquire().await?;
        Ok(PgSession { conn })
    }

    async fn begin(&self) -> Result<Self::Tx> {
        let conn = self.pool.begin().await?;
        Ok(PgSession { conn })
    }

    async fn commit(&self, tx: Self::Tx) -> Result<()> {
        tx.conn.commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<()> {
        tx.conn.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl<C> ProfileStore for PgSession<C>
where
    C: DerefMut<Target = PgConnection> + Send,
{
    async fn find_user(&mut self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, password, first_name, last_name, gender, phone_number, role, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
    }

    async fn find_users(&mut self, ids: &[Uuid]) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, password, first_name, last_name, gender, phone_number, role, created_at, updated_at, deleted_at
            FROM users
            WHERE id = ANY($1) AND deleted_at IS NULL
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(users)
    }

    async fn insert_user(&mut self, user: &User) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, password, first_name, last_name, gender, phone_number, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, password, first_name, last_name, gender, phone_number, role, created_at, updated_at, deleted_at
            "#,
        )
        .bind(user.id)
        .bind(&user.password)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.gender)
        .bind(&user.phone_number)
        .bind(user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(user)
    }

    async fn update_user(&mut self, user: &User) -> Result<User> {
        // role is immutable and never part of the SET list
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password = $2, first_name = $3, last_name = $4, gender = $5, phone_number = $6, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, password, first_name, last_name, gender, phone_number, role, created_at, updated_at, deleted_at
            "#,
        )
        .bind(user.id)
        .bind(&user.password)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.gender)
        .bind(&user.phone_number)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
    }

    async fn find_patient(&mut self, user_id: Uuid) -> Result<Patient> {
        sqlx::query_as::<_, Patient>(
            r#"
            SELECT user_id, hospital_id, birth_date, id_card_number, address, allergies, emergency_contact, blood_type,
                   created_at, updated_at, deleted_at
            FROM patients
            WHERE user_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| AppError::not_found("Patient"))
    }

    async fn find_patient_by_hospital_id(&mut self, hospital_id: &str) -> Result<Patient> {
        sqlx::query_as::<_, Patient>(
            r#"
            SELECT user_id, hospital_id, birth_date, id_card_number, address, allergies, emergency_contact, blood_type,
                   created_at, updated_at, deleted_at
            FROM patients
            WHERE hospital_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(hospital_id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| AppError::not_found("Patient"))
    }

    async fn find_patients(&mut self, user_ids: &[Uuid]) -> Result<Vec<Patient>> {
        let patients = sqlx::query_as::<_, Patient>(
            r#"
            SELECT user_id, hospital_id, birth_date, id_card_number, address, allergies, emergency_contact, blood_type,
                   created_at, updated_at, deleted_at
            FROM patients
            WHERE user_id = ANY($1) AND deleted_at IS NULL
            "#,
        )
        .bind(user_ids)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(patients)
    }

    async fn insert_patient(&mut self, patient: &Patient) -> Result<Patient> {
        let patient = sqlx::query_as::<_, Patient>(
            r#"
            INSERT INTO patients (user_id, hospital_id, birth_date, id_card_number, address, allergies,
                                  emergency_contact, blood_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING user_id, hospital_id, birth_date, id_card_number, address, allergies, emergency_contact, blood_type,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(patient.user_id)
        .bind(&patient.hospital_id)
        .bind(patient.birth_date)
        .bind(&patient.id_card_number)
        .bind(&patient.address)
        .bind(&patient.allergies)
        .bind(&patient.emergency_contact)
        .bind(&patient.blood_type)
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(patient)
    }

    async fn update_patient(&mut self, patient: &Patient) -> Result<Patient> {
        sqlx::query_as::<_, Patient>(
            r#"
            UPDATE patients
            SET birth_date = $2, id_card_number = $3, address = $4, allergies = $5, emergency_contact = $6,
                blood_type = $7, updated_at = now()
            WHERE user_id = $1 AND deleted_at IS NULL
            RETURNING user_id, hospital_id, birth_date, id_card_number, address, allergies, emergency_contact, blood_type,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(patient.user_id)
        .bind(patient.birth_date)
        .bind(&patient.id_card_number)
        .bind(&patient.address)
        .bind(&patient.allergies)
        .bind(&patient.emergency_contact)
        .bind(&patient.blood_type)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| AppError::not_found("Patient"))
    }

    async fn find_doctor(&mut self, user_id: Uuid) -> Result<Doctor> {
        sqlx::query_as::<_, Doctor>(
            r#"
            SELECT user_id, username, specialty, bio, years_experience, created_at, updated_at, deleted_at
            FROM doctors
            WHERE user_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| AppError::not_found("Doctor"))
    }

    async fn find_doctor_by_username(&mut self, username: &str) -> Result<Doctor> {
        sqlx::query_as::<_, Doctor>(
            r#"
            SELECT user_id, username, specialty, bio, years_experience, created_at, updated_at, deleted_at
            FROM doctors
            WHERE username = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(username)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| AppError::not_found("Doctor"))
    }

    async fn find_doctors(&mut self, user_ids: &[Uuid]) -> Result<Vec<Doctor>> {
        let doctors = sqlx::query_as::<_, Doctor>(
            r#"
            SELECT user_id, username, specialty, bio, years_experience, created_at, updated_at, deleted_at
            FROM doctors
            WHERE user_id = ANY($1) AND deleted_at IS NULL
            "#,
        )
        .bind(user_ids)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(doctors)
    }

    async fn list_doctors(&mut self) -> Result<Vec<Doctor>> {
        let doctors = sqlx::query_as::<_, Doctor>(
            r#"
            SELECT user_id, username, specialty, bio, years_experience, created_at, updated_at, deleted_at
            FROM doctors
            WHERE deleted_at IS NULL
            ORDER BY username
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(doctors)
    }

    async fn insert_doctor(&mut self, doctor: &Doctor) -> Result<Doctor> {
        let doctor = sqlx::query_as::<_, Doctor>(
            r#"
            INSERT INTO doctors (user_id, username, specialty, bio, years_experience, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING user_id, username, specialty, bio, years_experience, created_at, updated_at, deleted_at
            "#,
        )
        .bind(doctor.user_id)
        .bind(&doctor.username)
        .bind(&doctor.specialty)
        .bind(&doctor.bio)
        .bind(doctor.years_experience)
        .bind(doctor.created_at)
        .bind(doctor.updated_at)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(doctor)
    }

    async fn update_doctor(&mut self, doctor: &Doctor) -> Result<Doctor> {
        sqlx::query_as::<_, Doctor>(
            r#"
            UPDATE doctors
            SET specialty = $2, bio = $3, years_experience = $4, updated_at = now()
            WHERE user_id = $1 AND deleted_at IS NULL
            RETURNING user_id, username, specialty, bio, years_experience, created_at, updated_at, deleted_at
            "#,
        )
        .bind(doctor.user_id)
        .bind(&doctor.specialty)
        .bind(&doctor.bio)
        .bind(doctor.years_experience)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| AppError::not_found("Doctor"))
    }
}
