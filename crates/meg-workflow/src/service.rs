//! 病例工作流服务
//!
//! 在纯状态机之上叠加版本、审计与乐观并发控制，对控制器层提供
//! 查看/分配/完成/建档等操作。

use chrono::{NaiveDate, Utc};
use meg_core::{
    Case, CaseAssignment, CasePriority, CaseProcedure, CaseStatus, CaseVersion, MegError, Patient,
    ProcedureStatus, Result, RoleStatus, User, UserRole, WorkflowRole,
};
use uuid::Uuid;

use crate::status::{cascade_completion, transition_on_assignment, transition_on_view};
use crate::store::{TransitionCommit, WorkflowStore};

/// 建档请求：技师向导一次性录入患者与其账号
#[derive(Debug, Clone)]
pub struct IntakeRequest {
    pub patient: Patient,
    pub user: User,
}

/// 新建病例参数
#[derive(Debug, Clone)]
pub struct NewCaseRequest {
    pub hospital_id: Uuid,
    pub patient_id: Uuid,
    pub user_id: Uuid,
    pub case_date: NaiveDate,
    pub department_id: Option<Uuid>,
    pub sedation_id: Option<Uuid>,
    pub priority: CasePriority,
    pub symptoms: String,
    pub notes: Option<String>,
}

/// 病例工作流服务
pub struct CaseWorkflowService<S: WorkflowStore> {
    store: S,
}

impl<S: WorkflowStore> CaseWorkflowService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 技师向导创建病例
    ///
    /// 角色子状态初始为 technician=in_progress、scientist/doctor=draft，
    /// 全局状态为draft。写入初始版本，不产生审计行。
    pub async fn create_case(&self, request: NewCaseRequest) -> Result<Case> {
        let now = Utc::now();
        let case_id = Uuid::new_v4();
        let version = CaseVersion {
            id: Uuid::new_v4(),
            case_id,
            version_number: 1,
            user_id: request.user_id,
            created_at: now,
        };
        let case = Case {
            id: case_id,
            hospital_id: request.hospital_id,
            patient_id: request.patient_id,
            user_id: request.user_id,
            current_user_id: Some(request.user_id),
            case_date: request.case_date,
            department_id: request.department_id,
            sedation_id: request.sedation_id,
            priority: request.priority,
            status: CaseStatus::Draft,
            technician_status: RoleStatus::InProgress,
            scientist_status: RoleStatus::Draft,
            doctor_status: RoleStatus::Draft,
            symptoms: request.symptoms,
            notes: request.notes,
            current_version_id: Some(version.id),
            created_at: now,
            updated_at: now,
        };

        self.store.insert_case(case.clone(), version).await?;
        tracing::info!(case_id = %case.id, "Created case");
        Ok(case)
    }

    /// 查看病例触发的状态提升
    ///
    /// 返回是否发生转换。角色子状态非draft时为无操作。
    pub async fn view_case(&self, case_id: Uuid, role: WorkflowRole, user_id: Uuid) -> Result<bool> {
        let mut case = self.store.load_case(case_id).await?;
        let expected_version_id = case.current_version_id;

        let outcome = transition_on_view(&mut case, role, user_id);
        if !outcome.changed {
            return Ok(false);
        }

        let version = self.next_version(&case, user_id).await?;
        case.current_version_id = Some(version.id);
        case.updated_at = Utc::now();

        self.store
            .commit_transition(TransitionCommit {
                case,
                expected_version_id,
                new_version: version,
                audits: outcome.audits,
                assignment: None,
            })
            .await?;

        tracing::info!(case_id = %case_id, role = role.column_name(), "Case view transition committed");
        Ok(true)
    }

    /// 分配病例：交出方完成、接收方获派、全局进入in_progress
    ///
    /// 通过current_version_id做乐观锁，两个用户并发分配同一病例时
    /// 后提交者得到Conflict。
    pub async fn assign_case(
        &self,
        case_id: Uuid,
        from_role: WorkflowRole,
        to_role: WorkflowRole,
        assigned_by: Uuid,
        assigned_to: Uuid,
        notes: Option<String>,
    ) -> Result<CaseAssignment> {
        let mut case = self.store.load_case(case_id).await?;
        let expected_version_id = case.current_version_id;

        let outcome = transition_on_assignment(&mut case, from_role, to_role, assigned_by);

        let version = self.next_version(&case, assigned_by).await?;
        case.current_version_id = Some(version.id);
        case.current_user_id = Some(assigned_to);
        case.updated_at = Utc::now();

        let assignment = CaseAssignment {
            id: Uuid::new_v4(),
            case_id,
            case_version_id: Some(version.id),
            assigned_by,
            assigned_to,
            notes,
            created_at: Utc::now(),
        };

        self.store
            .commit_transition(TransitionCommit {
                case,
                expected_version_id,
                new_version: version,
                audits: outcome.audits,
                assignment: Some(assignment.clone()),
            })
            .await?;

        tracing::info!(
            case_id = %case_id,
            assigned_to = %assigned_to,
            "Case assignment committed"
        );
        Ok(assignment)
    }

    /// 级联完成：全部角色子状态与全局状态置为completed
    pub async fn complete_case(&self, case_id: Uuid, user_id: Uuid) -> Result<()> {
        let mut case = self.store.load_case(case_id).await?;
        let expected_version_id = case.current_version_id;

        let outcome = cascade_completion(&mut case, user_id);

        let version = self.next_version(&case, user_id).await?;
        case.current_version_id = Some(version.id);
        case.updated_at = Utc::now();

        self.store
            .commit_transition(TransitionCommit {
                case,
                expected_version_id,
                new_version: version,
                audits: outcome.audits,
                assignment: None,
            })
            .await?;

        tracing::info!(case_id = %case_id, "Case cascade completion committed");
        Ok(())
    }

    /// 技师建档：患者与账号先整体校验，再在单个事务中持久化
    pub async fn create_intake(&self, request: IntakeRequest) -> Result<()> {
        Self::validate_intake(&request)?;
        self.store
            .create_patient_with_user(request.patient.clone(), request.user.clone())
            .await?;
        tracing::info!(patient_id = %request.patient.id, "Patient intake committed");
        Ok(())
    }

    fn validate_intake(request: &IntakeRequest) -> Result<()> {
        let mut problems = Vec::new();

        if request.user.username.trim().is_empty() {
            problems.push("username不能为空");
        }
        if request.user.email.trim().is_empty() || !request.user.email.contains('@') {
            problems.push("email格式无效");
        }
        if request.user.role != UserRole::Patient {
            problems.push("建档账号角色必须为patient");
        }
        if request.patient.medical_record_number.trim().is_empty() {
            problems.push("medical_record_number不能为空");
        }
        if request.patient.user_id != request.user.id {
            problems.push("患者与账号未关联");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(MegError::Validation(problems.join("; ")))
        }
    }

    /// 检查项集合调和：按所选目录条目与现有关联做差异
    ///
    /// 新选中的插入，不再选中的删除，交集保持不变（保留其状态与备注）。
    pub async fn reconcile_procedures(
        &self,
        case_id: Uuid,
        selected_procedure_ids: &[Uuid],
    ) -> Result<()> {
        let existing = self.store.list_procedures(case_id).await?;

        let to_insert: Vec<CaseProcedure> = selected_procedure_ids
            .iter()
            .filter(|id| !existing.iter().any(|p| p.exams_procedure_id == **id))
            .map(|id| CaseProcedure {
                id: Uuid::new_v4(),
                case_id,
                exams_procedure_id: *id,
                status: ProcedureStatus::Pending,
                scheduled_at: None,
                notes: None,
            })
            .collect();

        let to_delete: Vec<Uuid> = existing
            .iter()
            .filter(|p| !selected_procedure_ids.contains(&p.exams_procedure_id))
            .map(|p| p.id)
            .collect();

        if to_insert.is_empty() && to_delete.is_empty() {
            return Ok(());
        }

        tracing::info!(
            case_id = %case_id,
            inserted = to_insert.len(),
            deleted = to_delete.len(),
            "Reconciling case procedures"
        );
        self.store.reconcile_procedures(case_id, to_insert, to_delete).await
    }

    async fn next_version(&self, case: &Case, user_id: Uuid) -> Result<CaseVersion> {
        let version_number = self.store.next_version_number(case.id).await?;
        Ok(CaseVersion {
            id: Uuid::new_v4(),
            case_id: case.id,
            version_number,
            user_id,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryWorkflowStore;

    fn service() -> CaseWorkflowService<MemoryWorkflowStore> {
        CaseWorkflowService::new(MemoryWorkflowStore::new())
    }

    fn new_case_request() -> NewCaseRequest {
        NewCaseRequest {
            hospital_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            case_date: NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            department_id: None,
            sedation_id: None,
            priority: CasePriority::Medium,
            symptoms: "episodic tremor".to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_case_initial_statuses() {
        let service = service();
        let case = service.create_case(new_case_request()).await.unwrap();

        assert_eq!(case.status, CaseStatus::Draft);
        assert_eq!(case.technician_status, RoleStatus::InProgress);
        assert_eq!(case.scientist_status, RoleStatus::Draft);
        assert_eq!(case.doctor_status, RoleStatus::Draft);
        assert!(case.current_version_id.is_some());
    }

    #[tokio::test]
    async fn test_view_transition_writes_one_audit_row() {
        let service = service();
        let case = service.create_case(new_case_request()).await.unwrap();
        let viewer = Uuid::new_v4();

        let changed = service
            .view_case(case.id, WorkflowRole::Scientist, viewer)
            .await
            .unwrap();
        assert!(changed);

        let audits = service.store().list_audits(case.id).await.unwrap();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].field_name, "scientist_status");
        assert_eq!(audits[0].old_value, "draft");
        assert_eq!(audits[0].new_value, "in_progress");

        // 二次查看为无操作，不追加审计
        let changed = service
            .view_case(case.id, WorkflowRole::Scientist, viewer)
            .await
            .unwrap();
        assert!(!changed);
        assert_eq!(service.store().list_audits(case.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_assignment_invariant_and_audit_count() {
        let service = service();
        let case = service.create_case(new_case_request()).await.unwrap();

        let assignment = service
            .assign_case(
                case.id,
                WorkflowRole::Technician,
                WorkflowRole::Scientist,
                case.user_id,
                Uuid::new_v4(),
                None,
            )
            .await
            .unwrap();

        let updated = service.store().load_case(case.id).await.unwrap();
        assert_eq!(updated.technician_status, RoleStatus::Completed);
        assert_eq!(updated.scientist_status, RoleStatus::Assigned);
        assert_eq!(updated.status, CaseStatus::InProgress);
        assert_eq!(updated.current_user_id, Some(assignment.assigned_to));

        // draft -> in_progress 全局变化，共3条审计行
        let audits = service.store().list_audits(case.id).await.unwrap();
        assert_eq!(audits.len(), 3);

        // 交接记录可查，最新在前
        let assignments = service.store().list_assignments(case.id).await.unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].id, assignment.id);
    }

    #[tokio::test]
    async fn test_assignment_no_redundant_global_audit() {
        let service = service();
        let case = service.create_case(new_case_request()).await.unwrap();
        service
            .view_case(case.id, WorkflowRole::Technician, case.user_id)
            .await
            .unwrap();

        service
            .assign_case(
                case.id,
                WorkflowRole::Technician,
                WorkflowRole::Scientist,
                case.user_id,
                Uuid::new_v4(),
                None,
            )
            .await
            .unwrap();

        let audits = service.store().list_audits(case.id).await.unwrap();
        // 1条查看 + 2条分配（全局已是in_progress，不写冗余行）
        assert_eq!(audits.len(), 3);
        assert_eq!(audits.iter().filter(|a| a.field_name == "status").count(), 0);
    }

    #[tokio::test]
    async fn test_cascade_completion_appends_three_audits() {
        let service = service();
        let case = service.create_case(new_case_request()).await.unwrap();

        service.complete_case(case.id, case.user_id).await.unwrap();

        let updated = service.store().load_case(case.id).await.unwrap();
        assert_eq!(updated.status, CaseStatus::Completed);
        assert_eq!(updated.technician_status, RoleStatus::Completed);
        assert_eq!(updated.scientist_status, RoleStatus::Completed);
        assert_eq!(updated.doctor_status, RoleStatus::Completed);
        assert_eq!(service.store().list_audits(case.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_version_numbers_strictly_increase() {
        let service = service();
        let case = service.create_case(new_case_request()).await.unwrap();

        service
            .view_case(case.id, WorkflowRole::Scientist, case.user_id)
            .await
            .unwrap();
        service.complete_case(case.id, case.user_id).await.unwrap();

        let versions = service.store().versions_for(case.id).await;
        let numbers: Vec<i32> = versions.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        let updated = service.store().load_case(case.id).await.unwrap();
        assert_eq!(updated.current_version_id, Some(versions.last().unwrap().id));
    }

    #[tokio::test]
    async fn test_intake_validation_rejects_before_persist() {
        let service = service();
        let user_id = Uuid::new_v4();
        let request = IntakeRequest {
            user: User {
                id: user_id,
                hospital_id: Uuid::new_v4(),
                username: String::new(), // 无效
                email: "person@example.org".to_string(),
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                role: UserRole::Patient,
                is_active: true,
                created_at: Utc::now(),
            },
            patient: Patient {
                id: Uuid::new_v4(),
                user_id,
                record_number: 7,
                medical_record_number: "MRN-GX-9".to_string(),
                date_of_birth: None,
                gender: None,
                address: None,
                phone: None,
                email: None,
                medical_history: None,
                medications: None,
                emergency_contact_name: None,
                emergency_contact_phone: None,
                created_at: Utc::now(),
            },
        };

        let result = service.create_intake(request).await;
        assert!(matches!(result, Err(MegError::Validation(_))));
        assert_eq!(service.store().patient_count().await, 0);
    }

    #[tokio::test]
    async fn test_procedure_reconciliation_diff() {
        let service = service();
        let case = service.create_case(new_case_request()).await.unwrap();

        let kept = Uuid::new_v4();
        let removed = Uuid::new_v4();
        let added = Uuid::new_v4();

        service
            .reconcile_procedures(case.id, &[kept, removed])
            .await
            .unwrap();
        service.reconcile_procedures(case.id, &[kept, added]).await.unwrap();

        let procedures = service.store().list_procedures(case.id).await.unwrap();
        let ids: Vec<Uuid> = procedures.iter().map(|p| p.exams_procedure_id).collect();
        assert_eq!(procedures.len(), 2);
        assert!(ids.contains(&kept));
        assert!(ids.contains(&added));
        assert!(!ids.contains(&removed));
    }
}
