//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use meg_core::{
    Case, CaseAssignment, CaseAudit, CaseProcedure, CaseVersion, Document, ExamsProcedure,
    HospitalAiSettings, MegError, Patient, Report, Result, ServiceUsageLog, User,
};
use sqlx::Row;
use uuid::Uuid;

/// 数据库查询操作接口
pub struct DatabaseQueries<'a> {
    pool: &'a DatabasePool,
}

impl<'a> DatabaseQueries<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        // 用户表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                hospital_id UUID NOT NULL,
                username VARCHAR(64) UNIQUE NOT NULL,
                email VARCHAR(255) NOT NULL,
                first_name VARCHAR(128) NOT NULL,
                last_name VARCHAR(128) NOT NULL,
                role VARCHAR(20) NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| MegError::Database(e.to_string()))?;

        // 患者表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS patients (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id),
                record_number BIGSERIAL,
                medical_record_number VARCHAR(64) UNIQUE NOT NULL,
                date_of_birth DATE,
                gender VARCHAR(16),
                address TEXT,
                phone VARCHAR(32),
                email VARCHAR(255),
                medical_history TEXT,
                medications TEXT,
                emergency_contact_name VARCHAR(255),
                emergency_contact_phone VARCHAR(32),
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| MegError::Database(e.to_string()))?;

        // 检查项目目录表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS exams_procedures (
                id UUID PRIMARY KEY,
                exam_name VARCHAR(128) NOT NULL,
                modality VARCHAR(64),
                procedure_name VARCHAR(128) NOT NULL,
                description TEXT
            )
        "#).execute(pool).await.map_err(|e| MegError::Database(e.to_string()))?;

        // 病例表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS cases (
                id UUID PRIMARY KEY,
                hospital_id UUID NOT NULL,
                patient_id UUID NOT NULL REFERENCES patients(id),
                user_id UUID NOT NULL REFERENCES users(id),
                current_user_id UUID,
                case_date DATE NOT NULL,
                department_id UUID,
                sedation_id UUID,
                priority VARCHAR(10) NOT NULL DEFAULT 'medium',
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                technician_status VARCHAR(20) NOT NULL DEFAULT 'draft',
                scientist_status VARCHAR(20) NOT NULL DEFAULT 'draft',
                doctor_status VARCHAR(20) NOT NULL DEFAULT 'draft',
                symptoms TEXT NOT NULL DEFAULT '',
                notes TEXT,
                current_version_id UUID,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| MegError::Database(e.to_string()))?;

        // 病例版本表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS case_versions (
                id UUID PRIMARY KEY,
                case_id UUID NOT NULL REFERENCES cases(id),
                version_number INTEGER NOT NULL,
                user_id UUID NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                UNIQUE (case_id, version_number)
            )
        "#).execute(pool).await.map_err(|e| MegError::Database(e.to_string()))?;

        // 审计表（只追加）
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS case_audits (
                id UUID PRIMARY KEY,
                case_id UUID NOT NULL REFERENCES cases(id),
                version_id UUID,
                field_name VARCHAR(64) NOT NULL,
                old_value TEXT NOT NULL,
                new_value TEXT NOT NULL,
                changed_by UUID NOT NULL,
                notes TEXT,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| MegError::Database(e.to_string()))?;

        // 交接表（只追加）
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS case_assignments (
                id UUID PRIMARY KEY,
                case_id UUID NOT NULL REFERENCES cases(id),
                case_version_id UUID,
                assigned_by UUID NOT NULL,
                assigned_to UUID NOT NULL,
                notes TEXT,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| MegError::Database(e.to_string()))?;

        // 病例检查项表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS case_procedures (
                id UUID PRIMARY KEY,
                case_id UUID NOT NULL REFERENCES cases(id),
                exams_procedure_id UUID NOT NULL REFERENCES exams_procedures(id),
                status VARCHAR(10) NOT NULL DEFAULT 'pending',
                scheduled_at TIMESTAMP WITH TIME ZONE,
                notes TEXT
            )
        "#).execute(pool).await.map_err(|e| MegError::Database(e.to_string()))?;

        // 文档表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS documents (
                id UUID PRIMARY KEY,
                case_id UUID NOT NULL REFERENCES cases(id),
                user_id UUID NOT NULL,
                case_procedure_id UUID,
                document_type VARCHAR(20) NOT NULL,
                file_path VARCHAR(512) NOT NULL,
                file_type VARCHAR(64) NOT NULL,
                file_size BIGINT NOT NULL,
                original_filename VARCHAR(255) NOT NULL,
                description TEXT,
                uploaded_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| MegError::Database(e.to_string()))?;

        // 报告表：同一病例同一创建者一份报告
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS reports (
                id UUID PRIMARY KEY,
                case_id UUID NOT NULL REFERENCES cases(id),
                hospital_id UUID NOT NULL,
                user_id UUID NOT NULL,
                status VARCHAR(20) NOT NULL,
                report_type VARCHAR(64) NOT NULL,
                report_data JSONB NOT NULL,
                confidence_score DOUBLE PRECISION,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                UNIQUE (case_id, user_id)
            )
        "#).execute(pool).await.map_err(|e| MegError::Database(e.to_string()))?;

        // 服务台账表（只追加）
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS service_usage_logs (
                id UUID PRIMARY KEY,
                hospital_id UUID NOT NULL,
                service_type VARCHAR(20) NOT NULL,
                provider VARCHAR(32) NOT NULL,
                action VARCHAR(64) NOT NULL,
                user_id UUID,
                related_id UUID,
                request_payload JSONB,
                response_payload JSONB,
                status VARCHAR(10) NOT NULL,
                response_time_ms BIGINT,
                error_code VARCHAR(64),
                error_message TEXT,
                units_consumed BIGINT,
                unit_cost DOUBLE PRECISION,
                total_cost_usd DOUBLE PRECISION,
                metadata JSONB,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| MegError::Database(e.to_string()))?;

        // 医院AI设置表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS hospital_ai_settings (
                hospital_id UUID PRIMARY KEY,
                preferred_provider VARCHAR(32) NOT NULL,
                enabled_providers TEXT[] NOT NULL DEFAULT '{}',
                monthly_budget_usd DOUBLE PRECISION NOT NULL DEFAULT 0
            )
        "#).execute(pool).await.map_err(|e| MegError::Database(e.to_string()))?;

        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let pool = self.pool.pool();

        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_cases_hospital_id ON cases(hospital_id)",
            "CREATE INDEX IF NOT EXISTS idx_cases_patient_id ON cases(patient_id)",
            "CREATE INDEX IF NOT EXISTS idx_cases_status ON cases(status)",
            "CREATE INDEX IF NOT EXISTS idx_case_versions_case_id ON case_versions(case_id)",
            "CREATE INDEX IF NOT EXISTS idx_case_audits_case_id ON case_audits(case_id)",
            "CREATE INDEX IF NOT EXISTS idx_case_assignments_case_id ON case_assignments(case_id)",
            "CREATE INDEX IF NOT EXISTS idx_case_procedures_case_id ON case_procedures(case_id)",
            "CREATE INDEX IF NOT EXISTS idx_documents_case_id ON documents(case_id)",
            "CREATE INDEX IF NOT EXISTS idx_reports_case_id ON reports(case_id)",
            "CREATE INDEX IF NOT EXISTS idx_usage_hospital_provider_created \
             ON service_usage_logs(hospital_id, provider, created_at)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql)
                .execute(pool)
                .await
                .map_err(|e| MegError::Database(e.to_string()))?;
        }

        tracing::info!("Database indexes created successfully");
        Ok(())
    }

    // ========== 病例相关操作 ==========

    /// 读取病例（按医院租户过滤：他院病例等同不存在）
    pub async fn get_case(&self, case_id: Uuid, hospital_id: Uuid) -> Result<Case> {
        let row: Option<DbCase> = sqlx::query_as(
            "SELECT * FROM cases WHERE id = $1 AND hospital_id = $2",
        )
        .bind(case_id)
        .bind(hospital_id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;

        row.map(Case::from)
            .ok_or_else(|| MegError::NotFound(format!("Case {} not found", case_id)))
    }

    /// 插入病例
    pub async fn insert_case(&self, case: &Case) -> Result<()> {
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
        .execute(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(())
    }

    /// 病例的审计行，按时间正序
    pub async fn list_audits(&self, case_id: Uuid) -> Result<Vec<CaseAudit>> {
        let rows: Vec<DbCaseAudit> = sqlx::query_as(
            "SELECT * FROM case_audits WHERE case_id = $1 ORDER BY created_at ASC",
        )
        .bind(case_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(CaseAudit::from).collect())
    }

    /// 病例的交接记录，最新在前
    pub async fn list_assignments(&self, case_id: Uuid) -> Result<Vec<CaseAssignment>> {
        let rows: Vec<DbCaseAssignment> = sqlx::query_as(
            "SELECT * FROM case_assignments WHERE case_id = $1 ORDER BY created_at DESC",
        )
        .bind(case_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(CaseAssignment::from).collect())
    }

    /// 病例的版本历史
    pub async fn list_versions(&self, case_id: Uuid) -> Result<Vec<CaseVersion>> {
        let rows: Vec<DbCaseVersion> = sqlx::query_as(
            "SELECT * FROM case_versions WHERE case_id = $1 ORDER BY version_number ASC",
        )
        .bind(case_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(CaseVersion::from).collect())
    }

    // ========== 检查项操作 ==========

    pub async fn list_case_procedures(&self, case_id: Uuid) -> Result<Vec<CaseProcedure>> {
        let rows: Vec<DbCaseProcedure> = sqlx::query_as(
            "SELECT * FROM case_procedures WHERE case_id = $1",
        )
        .bind(case_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(CaseProcedure::from).collect())
    }

    pub async fn get_exams_procedure(&self, id: Uuid) -> Result<Option<ExamsProcedure>> {
        let row = sqlx::query(
            "SELECT id, exam_name, modality, procedure_name, description \
             FROM exams_procedures WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;

        Ok(row.map(|r| ExamsProcedure {
            id: r.get("id"),
            exam_name: r.get("exam_name"),
            modality: r.get("modality"),
            procedure_name: r.get("procedure_name"),
            description: r.get("description"),
        }))
    }

    // ========== 文档操作 ==========

    pub async fn insert_document(&self, document: &Document) -> Result<()> {
        sqlx::query(r#"
            INSERT INTO documents (id, case_id, user_id, case_procedure_id, document_type,
                file_path, file_type, file_size, original_filename, description, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#)
        .bind(document.id)
        .bind(document.case_id)
        .bind(document.user_id)
        .bind(document.case_procedure_id)
        .bind(document.document_type.as_str())
        .bind(&document.file_path)
        .bind(&document.file_type)
        .bind(document.file_size)
        .bind(&document.original_filename)
        .bind(&document.description)
        .bind(document.uploaded_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn list_documents(&self, case_id: Uuid) -> Result<Vec<Document>> {
        let rows: Vec<DbDocument> = sqlx::query_as(
            "SELECT * FROM documents WHERE case_id = $1 ORDER BY uploaded_at ASC",
        )
        .bind(case_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    // ========== 报告操作 ==========

    /// 写入报告：同一(病例, 创建者)重复生成时覆盖report_data
    pub async fn upsert_report(&self, report: &Report) -> Result<()> {
        sqlx::query(r#"
            INSERT INTO reports (id, case_id, hospital_id, user_id, status, report_type,
                report_data, confidence_score, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (case_id, user_id) DO UPDATE SET
                status = EXCLUDED.status,
                report_type = EXCLUDED.report_type,
                report_data = EXCLUDED.report_data,
                confidence_score = EXCLUDED.confidence_score,
                updated_at = EXCLUDED.updated_at
        "#)
        .bind(report.id)
        .bind(report.case_id)
        .bind(report.hospital_id)
        .bind(report.user_id)
        .bind(&report.status)
        .bind(&report.report_type)
        .bind(&report.report_data)
        .bind(report.confidence_score)
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn get_report(&self, case_id: Uuid, user_id: Uuid) -> Result<Option<Report>> {
        let row: Option<DbReport> = sqlx::query_as(
            "SELECT * FROM reports WHERE case_id = $1 AND user_id = $2",
        )
        .bind(case_id)
        .bind(user_id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(row.map(Report::from))
    }

    // ========== 患者/用户操作 ==========

    /// 患者与账号在单个事务中创建，任一失败整体回滚
    pub async fn create_patient_with_user(&self, patient: &Patient, user: &User) -> Result<()> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| MegError::Database(e.to_string()))?;

        sqlx::query(r#"
            INSERT INTO users (id, hospital_id, username, email, first_name, last_name,
                role, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#)
        .bind(user.id)
        .bind(user.hospital_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;

        sqlx::query(r#"
            INSERT INTO patients (id, user_id, medical_record_number, date_of_birth, gender,
                address, phone, email, medical_history, medications,
                emergency_contact_name, emergency_contact_phone, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#)
        .bind(patient.id)
        .bind(patient.user_id)
        .bind(&patient.medical_record_number)
        .bind(patient.date_of_birth)
        .bind(&patient.gender)
        .bind(&patient.address)
        .bind(&patient.phone)
        .bind(&patient.email)
        .bind(&patient.medical_history)
        .bind(&patient.medications)
        .bind(&patient.emergency_contact_name)
        .bind(&patient.emergency_contact_phone)
        .bind(patient.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;

        tx.commit().await.map_err(|e| MegError::Database(e.to_string()))?;
        tracing::info!(patient_id = %patient.id, "Patient and user created in one transaction");
        Ok(())
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Option<Patient>> {
        let row: Option<DbPatient> = sqlx::query_as("SELECT * FROM patients WHERE id = $1")
            .bind(patient_id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(row.map(Patient::from))
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row: Option<DbUser> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(row.map(User::from))
    }

    // ========== AI设置 ==========

    pub async fn get_ai_settings(&self, hospital_id: Uuid) -> Result<Option<HospitalAiSettings>> {
        let row: Option<DbHospitalAiSettings> = sqlx::query_as(
            "SELECT * FROM hospital_ai_settings WHERE hospital_id = $1",
        )
        .bind(hospital_id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(row.map(HospitalAiSettings::from))
    }

    pub async fn upsert_ai_settings(&self, settings: &HospitalAiSettings) -> Result<()> {
        sqlx::query(r#"
            INSERT INTO hospital_ai_settings
                (hospital_id, preferred_provider, enabled_providers, monthly_budget_usd)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (hospital_id) DO UPDATE SET
                preferred_provider = EXCLUDED.preferred_provider,
                enabled_providers = EXCLUDED.enabled_providers,
                monthly_budget_usd = EXCLUDED.monthly_budget_usd
        "#)
        .bind(settings.hospital_id)
        .bind(&settings.preferred_provider)
        .bind(&settings.enabled_providers)
        .bind(settings.monthly_budget_usd)
        .execute(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(())
    }

    // ========== 服务台账 ==========

    pub async fn insert_usage_log(&self, log: &ServiceUsageLog) -> Result<()> {
        sqlx::query(r#"
            INSERT INTO service_usage_logs (id, hospital_id, service_type, provider, action,
                user_id, related_id, request_payload, response_payload, status,
                response_time_ms, error_code, error_message, units_consumed,
                unit_cost, total_cost_usd, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18)
        "#)
        .bind(log.id)
        .bind(log.hospital_id)
        .bind(&log.service_type)
        .bind(&log.provider)
        .bind(&log.action)
        .bind(log.user_id)
        .bind(log.related_id)
        .bind(&log.request_payload)
        .bind(&log.response_payload)
        .bind(log.status.as_str())
        .bind(log.response_time_ms)
        .bind(&log.error_code)
        .bind(&log.error_message)
        .bind(log.units_consumed)
        .bind(log.unit_cost)
        .bind(log.total_cost_usd)
        .bind(&log.metadata)
        .bind(log.created_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn update_usage_log(&self, log: &ServiceUsageLog) -> Result<()> {
        sqlx::query(r#"
            UPDATE service_usage_logs SET
                response_payload = $2, status = $3, response_time_ms = $4,
                error_code = $5, error_message = $6, units_consumed = $7,
                unit_cost = $8, total_cost_usd = $9
            WHERE id = $1
        "#)
        .bind(log.id)
        .bind(&log.response_payload)
        .bind(log.status.as_str())
        .bind(log.response_time_ms)
        .bind(&log.error_code)
        .bind(&log.error_message)
        .bind(log.units_consumed)
        .bind(log.unit_cost)
        .bind(log.total_cost_usd)
        .execute(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;
        Ok(())
    }

    /// (医院, 供应商)指定自然月的成本合计
    pub async fn month_cost(
        &self,
        hospital_id: Uuid,
        provider: &str,
        year: i32,
        month: u32,
    ) -> Result<f64> {
        let row = sqlx::query(r#"
            SELECT COALESCE(SUM(total_cost_usd), 0)::float8 AS total
            FROM service_usage_logs
            WHERE hospital_id = $1 AND provider = $2
              AND EXTRACT(YEAR FROM created_at)::int = $3
              AND EXTRACT(MONTH FROM created_at)::int = $4
        "#)
        .bind(hospital_id)
        .bind(provider)
        .bind(year)
        .bind(month as i32)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| MegError::Database(e.to_string()))?;

        Ok(row.get::<f64, _>("total"))
    }
}
