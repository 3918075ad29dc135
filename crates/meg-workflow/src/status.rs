//! 病例状态机
//!
//! 角色子状态的前向转换：draft → in_progress → assigned → completed。
//! 转换函数只修改内存中的病例并产生对应的审计行，持久化由服务层统一提交。

use chrono::Utc;
use meg_core::{Case, CaseAudit, CaseStatus, RoleStatus, WorkflowRole};
use uuid::Uuid;

/// 转换结果：是否发生变更及产生的审计行
#[derive(Debug, Default)]
pub struct TransitionOutcome {
    pub changed: bool,
    pub audits: Vec<CaseAudit>,
}

fn audit_row(
    case: &Case,
    field_name: &str,
    old_value: String,
    new_value: String,
    changed_by: Uuid,
) -> CaseAudit {
    CaseAudit {
        id: Uuid::new_v4(),
        case_id: case.id,
        version_id: case.current_version_id,
        field_name: field_name.to_string(),
        old_value,
        new_value,
        changed_by,
        notes: None,
        created_at: Utc::now(),
    }
}

/// 查看触发的转换
///
/// 角色子状态为draft时提升为in_progress，全局状态若同为draft则一并提升。
/// 恰好写一条审计行（角色状态列）。其余情况不做任何变更，首次调用后幂等。
pub fn transition_on_view(case: &mut Case, role: WorkflowRole, user_id: Uuid) -> TransitionOutcome {
    if case.role_status(role) != RoleStatus::Draft {
        return TransitionOutcome::default();
    }

    let audit = audit_row(
        case,
        role.column_name(),
        RoleStatus::Draft.as_str().to_string(),
        RoleStatus::InProgress.as_str().to_string(),
        user_id,
    );
    case.set_role_status(role, RoleStatus::InProgress);

    if case.status == CaseStatus::Draft {
        case.status = CaseStatus::InProgress;
    }

    tracing::debug!(case_id = %case.id, role = role.column_name(), "view transition applied");
    TransitionOutcome { changed: true, audits: vec![audit] }
}

/// 分配触发的转换
///
/// 交出方子状态置为completed，接收方置为assigned，全局状态仅在发生变化时
/// 提升为in_progress。写2-3条审计行（交出方、接收方、全局状态变化时追加）。
pub fn transition_on_assignment(
    case: &mut Case,
    from_role: WorkflowRole,
    to_role: WorkflowRole,
    user_id: Uuid,
) -> TransitionOutcome {
    let mut audits = Vec::with_capacity(3);

    let old_from = case.role_status(from_role);
    audits.push(audit_row(
        case,
        from_role.column_name(),
        old_from.as_str().to_string(),
        RoleStatus::Completed.as_str().to_string(),
        user_id,
    ));
    case.set_role_status(from_role, RoleStatus::Completed);

    let old_to = case.role_status(to_role);
    audits.push(audit_row(
        case,
        to_role.column_name(),
        old_to.as_str().to_string(),
        RoleStatus::Assigned.as_str().to_string(),
        user_id,
    ));
    case.set_role_status(to_role, RoleStatus::Assigned);

    if case.status != CaseStatus::InProgress {
        audits.push(audit_row(
            case,
            "status",
            case.status.as_str().to_string(),
            CaseStatus::InProgress.as_str().to_string(),
            user_id,
        ));
        case.status = CaseStatus::InProgress;
    }

    tracing::debug!(
        case_id = %case.id,
        from = from_role.column_name(),
        to = to_role.column_name(),
        "assignment transition applied"
    );
    TransitionOutcome { changed: true, audits }
}

/// 级联完成
///
/// 三个角色子状态与全局状态全部置为completed，写3条审计行（每个角色列一条，
/// 记录各自转换前的值）。不校验先前状态，重复调用在状态上幂等。
pub fn cascade_completion(case: &mut Case, user_id: Uuid) -> TransitionOutcome {
    let mut audits = Vec::with_capacity(3);

    for role in [WorkflowRole::Technician, WorkflowRole::Scientist, WorkflowRole::Doctor] {
        let old = case.role_status(role);
        audits.push(audit_row(
            case,
            role.column_name(),
            old.as_str().to_string(),
            RoleStatus::Completed.as_str().to_string(),
            user_id,
        ));
        case.set_role_status(role, RoleStatus::Completed);
    }
    case.status = CaseStatus::Completed;

    tracing::debug!(case_id = %case.id, "cascade completion applied");
    TransitionOutcome { changed: true, audits }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use meg_core::CasePriority;

    fn draft_case() -> Case {
        Case {
            id: Uuid::new_v4(),
            hospital_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            current_user_id: None,
            case_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            department_id: None,
            sedation_id: None,
            priority: CasePriority::Medium,
            status: CaseStatus::Draft,
            technician_status: RoleStatus::Draft,
            scientist_status: RoleStatus::Draft,
            doctor_status: RoleStatus::Draft,
            symptoms: String::new(),
            notes: None,
            current_version_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_view_transition_from_draft() {
        let mut case = draft_case();
        let user_id = Uuid::new_v4();

        let outcome = transition_on_view(&mut case, WorkflowRole::Technician, user_id);

        assert!(outcome.changed);
        assert_eq!(case.technician_status, RoleStatus::InProgress);
        assert_eq!(case.status, CaseStatus::InProgress);
        assert_eq!(outcome.audits.len(), 1);
        let audit = &outcome.audits[0];
        assert_eq!(audit.field_name, "technician_status");
        assert_eq!(audit.old_value, "draft");
        assert_eq!(audit.new_value, "in_progress");
        assert_eq!(audit.changed_by, user_id);
    }

    #[test]
    fn test_view_transition_idempotent_after_first_call() {
        let mut case = draft_case();
        let user_id = Uuid::new_v4();

        assert!(transition_on_view(&mut case, WorkflowRole::Technician, user_id).changed);
        let second = transition_on_view(&mut case, WorkflowRole::Technician, user_id);

        assert!(!second.changed);
        assert!(second.audits.is_empty());
        assert_eq!(case.technician_status, RoleStatus::InProgress);
    }

    #[test]
    fn test_view_transition_noop_for_non_draft() {
        let mut case = draft_case();
        case.scientist_status = RoleStatus::Assigned;

        let outcome = transition_on_view(&mut case, WorkflowRole::Scientist, Uuid::new_v4());

        assert!(!outcome.changed);
        assert_eq!(case.scientist_status, RoleStatus::Assigned);
    }

    #[test]
    fn test_assignment_transition() {
        let mut case = draft_case();
        case.technician_status = RoleStatus::InProgress;
        case.status = CaseStatus::InProgress;

        let outcome = transition_on_assignment(
            &mut case,
            WorkflowRole::Technician,
            WorkflowRole::Scientist,
            Uuid::new_v4(),
        );

        assert_eq!(case.technician_status, RoleStatus::Completed);
        assert_eq!(case.scientist_status, RoleStatus::Assigned);
        assert_eq!(case.status, CaseStatus::InProgress);
        // 全局状态未变化，不写冗余审计行
        assert_eq!(outcome.audits.len(), 2);
    }

    #[test]
    fn test_assignment_transition_promotes_global_status() {
        let mut case = draft_case();

        let outcome = transition_on_assignment(
            &mut case,
            WorkflowRole::Technician,
            WorkflowRole::Scientist,
            Uuid::new_v4(),
        );

        assert_eq!(case.status, CaseStatus::InProgress);
        assert_eq!(outcome.audits.len(), 3);
        let global = outcome.audits.iter().find(|a| a.field_name == "status").unwrap();
        assert_eq!(global.old_value, "draft");
        assert_eq!(global.new_value, "in_progress");
    }

    #[test]
    fn test_cascade_completion() {
        let mut case = draft_case();
        case.technician_status = RoleStatus::Completed;
        case.scientist_status = RoleStatus::Completed;
        case.doctor_status = RoleStatus::Assigned;
        case.status = CaseStatus::InProgress;

        let outcome = cascade_completion(&mut case, Uuid::new_v4());

        assert_eq!(case.technician_status, RoleStatus::Completed);
        assert_eq!(case.scientist_status, RoleStatus::Completed);
        assert_eq!(case.doctor_status, RoleStatus::Completed);
        assert_eq!(case.status, CaseStatus::Completed);
        assert_eq!(outcome.audits.len(), 3);
    }

    #[test]
    fn test_cascade_completion_idempotent_state() {
        let mut case = draft_case();
        cascade_completion(&mut case, Uuid::new_v4());
        let again = cascade_completion(&mut case, Uuid::new_v4());

        assert_eq!(case.status, CaseStatus::Completed);
        // 状态幂等，但每次调用仍按文档写3条审计行
        assert_eq!(again.audits.len(), 3);
        assert!(again.audits.iter().all(|a| a.old_value == "completed"));
    }
}
