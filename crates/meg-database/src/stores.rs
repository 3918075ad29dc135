//! 存储接口的SQL实现
//!
//! 工作流提交在单个数据库事务中落库：病例更新带版本指针CAS，
//! 版本、审计与交接随之写入，任一失败整体回滚。

use async_trait::async_trait;
use meg_core::{
    Case, CaseAssignment, CaseAudit, CaseProcedure, CaseVersion, HospitalAiSettings, MegError,
    Patient, Result, ServiceUsageLog, User,
};
use meg_workflow::store::{TransitionCommit, WorkflowStore};
use sqlx::Row;
use uuid::Uuid;

use crate::connection::DatabasePool;
use crate::queries::DatabaseQueries;

/// 工作流存储的SQL实现（按医院租户限定）
pub struct SqlWorkflowStore {
    pool: DatabasePool,
    hospital_id: Uuid,
}

impl SqlWorkflowStore {
    pub fn new(pool: DatabasePool, hospital_id: Uuid) -> Self {
        Self { pool, hospital_id }
    }

    fn queries(&self) -> DatabaseQueries<'_> {
        DatabaseQueries::new(&self.pool)
    }
}

#[async_trait]
impl WorkflowStore for SqlWorkflowStore {
    async fn load_case(&self, case_id: Uuid) -> Result<Case> {
        self.queries().get_case(case_id, self.hospital_id).await
    }

    async fn insert_case(&self, case: Case, initial_version: CaseVersion) -> Result<()> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| MegError::Database(e.to_string()))?;

        sqlx::query(r#"
            INSERT INTO cases (id, hospital_id, patient_id, user_id, current_user_id,
                case_date, department_id, sedation_id, priority, status,
                technician_status, scientist_status, doctor_status,
                symptoms, notes, current_version_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        "#)
        .bind(case.id)
        .bind(case.hospital_id)
        .bind(case.patient_id)
        .bind(case.user_id)
        .bind(case.current_user_id)
        .bind(case.case_date)
        .bind(case.department_id)
        .bind(case.sedation_id)
        .bind(case.priority.as_str())
        .bind(case.status.as_str())
        .bind(case.technician_status.as_str())
        .bind(case.scientist_status.as_str())
        .bind(case.doctor_status.as_str())
        .bind(&case.symptoms)
        .bind(&case.notes)
        .bind(case.current_version_id)
        .bind(case.created_at)
        .bind(case.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;

        insert_version(&mut tx, &initial_version).await?;

        tx.commit().await.map_err(|e| MegError::Database(e.to_string()))?;
        Ok(())
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> Result<()> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| MegError::Database(e.to_string()))?;

        // 乐观锁：版本指针仍等于读取时的值才允许更新
        let updated = sqlx::query(r#"
            UPDATE cases SET
                current_user_id = $3, priority = $4, status = $5,
                technician_status = $6, scientist_status = $7, doctor_status = $8,
                symptoms = $9, notes = $10, current_version_id = $11, updated_at = $12
            WHERE id = $1 AND hospital_id = $2
              AND current_version_id IS NOT DISTINCT FROM $13
        "#)
        .bind(commit.case.id)
        .bind(self.hospital_id)
        .bind(commit.case.current_user_id)
        .bind(commit.case.priority.as_str())
        .bind(commit.case.status.as_str())
        .bind(commit.case.technician_status.as_str())
        .bind(commit.case.scientist_status.as_str())
        .bind(commit.case.doctor_status.as_str())
        .bind(&commit.case.symptoms)
        .bind(&commit.case.notes)
        .bind(commit.case.current_version_id)
        .bind(commit.case.updated_at)
        .bind(commit.expected_version_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(MegError::Conflict(format!(
                "Case {} was modified concurrently",
                commit.case.id
            )));
        }

        insert_version(&mut tx, &commit.new_version).await?;

        for audit in &commit.audits {
            sqlx::query(r#"
                INSERT INTO case_audits (id, case_id, version_id, field_name,
                    old_value, new_value, changed_by, notes, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#)
            .bind(audit.id)
            .bind(audit.case_id)
            .bind(audit.version_id)
            .bind(&audit.field_name)
            .bind(&audit.old_value)
            .bind(&audit.new_value)
            .bind(audit.changed_by)
            .bind(&audit.notes)
            .bind(audit.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| MegError::Audit(e.to_string()))?;
        }

        if let Some(assignment) = &commit.assignment {
            sqlx::query(r#"
                INSERT INTO case_assignments (id, case_id, case_version_id,
                    assigned_by, assigned_to, notes, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#)
            .bind(assignment.id)
            .bind(assignment.case_id)
            .bind(assignment.case_version_id)
            .bind(assignment.assigned_by)
            .bind(assignment.assigned_to)
            .bind(&assignment.notes)
            .bind(assignment.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| MegError::Database(e.to_string()))?;
        }

        tx.commit().await.map_err(|e| MegError::Database(e.to_string()))?;
        Ok(())
    }

    async fn next_version_number(&self, case_id: Uuid) -> Result<i32> {
        let row = sqlx::query(
            "SELECT COALESCE(MAX(version_number), 0) + 1 AS next \
             FROM case_versions WHERE case_id = $1",
        )
        .bind(case_id)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(row.get::<i32, _>("next"))
    }

    async fn list_audits(&self, case_id: Uuid) -> Result<Vec<CaseAudit>> {
        self.queries().list_audits(case_id).await
    }

    async fn list_assignments(&self, case_id: Uuid) -> Result<Vec<CaseAssignment>> {
        self.queries().list_assignments(case_id).await
    }

    async fn create_patient_with_user(&self, patient: Patient, user: User) -> Result<()> {
        self.queries().create_patient_with_user(&patient, &user).await
    }

    async fn list_procedures(&self, case_id: Uuid) -> Result<Vec<CaseProcedure>> {
        self.queries().list_case_procedures(case_id).await
    }

    async fn reconcile_procedures(
        &self,
        case_id: Uuid,
        to_insert: Vec<CaseProcedure>,
        to_delete: Vec<Uuid>,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| MegError::Database(e.to_string()))?;

        for id in &to_delete {
            sqlx::query("DELETE FROM case_procedures WHERE id = $1 AND case_id = $2")
                .bind(id)
                .bind(case_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| MegError::Database(e.to_string()))?;
        }

        for procedure in &to_insert {
            sqlx::query(r#"
                INSERT INTO case_procedures (id, case_id, exams_procedure_id,
                    status, scheduled_at, notes)
                VALUES ($1, $2, $3, $4, $5, $6)
            "#)
            .bind(procedure.id)
            .bind(procedure.case_id)
            .bind(procedure.exams_procedure_id)
            .bind(procedure.status.as_str())
            .bind(procedure.scheduled_at)
            .bind(&procedure.notes)
            .execute(&mut *tx)
            .await
            .map_err(|e| MegError::Database(e.to_string()))?;
        }

        tx.commit().await.map_err(|e| MegError::Database(e.to_string()))?;
        Ok(())
    }
}

async fn insert_version(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    version: &CaseVersion,
) -> Result<()> {
    sqlx::query(r#"
        INSERT INTO case_versions (id, case_id, version_number, user_id, created_at)
        VALUES ($1, $2, $3, $4, $5)
    "#)
    .bind(version.id)
    .bind(version.case_id)
    .bind(version.version_number)
    .bind(version.user_id)
    .bind(version.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| MegError::Database(e.to_string()))?;
    Ok(())
}

/// 台账存储的SQL实现
pub struct SqlUsageStore {
    pool: DatabasePool,
}

impl SqlUsageStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl meg_ai::UsageStore for SqlUsageStore {
    async fn insert(&self, log: ServiceUsageLog) -> Result<()> {
        DatabaseQueries::new(&self.pool).insert_usage_log(&log).await
    }

    async fn update(&self, log: ServiceUsageLog) -> Result<()> {
        DatabaseQueries::new(&self.pool).update_usage_log(&log).await
    }

    async fn month_cost(
        &self,
        hospital_id: Uuid,
        provider: &str,
        year: i32,
        month: u32,
    ) -> Result<f64> {
        DatabaseQueries::new(&self.pool)
            .month_cost(hospital_id, provider, year, month)
            .await
    }
}

/// AI设置存储的SQL实现
pub struct SqlSettingsStore {
    pool: DatabasePool,
}

impl SqlSettingsStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl meg_ai::SettingsStore for SqlSettingsStore {
    async fn ai_settings(&self, hospital_id: Uuid) -> Result<Option<HospitalAiSettings>> {
        DatabaseQueries::new(&self.pool).get_ai_settings(hospital_id).await
    }
}
