//! 内存工作流存储
//!
//! 测试与演示用的存储实现，提交语义与数据库实现一致：
//! 单次提交内的病例、版本、审计与交接要么全部写入要么全部拒绝。

use async_trait::async_trait;
use meg_core::{
    Case, CaseAssignment, CaseAudit, CaseProcedure, CaseVersion, MegError, Patient, Result, User,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{TransitionCommit, WorkflowStore};

#[derive(Default)]
struct MemoryState {
    cases: HashMap<Uuid, Case>,
    versions: HashMap<Uuid, Vec<CaseVersion>>,    // case_id -> versions
    audits: HashMap<Uuid, Vec<CaseAudit>>,        // case_id -> audit rows
    assignments: HashMap<Uuid, Vec<CaseAssignment>>, // case_id -> assignments
    procedures: HashMap<Uuid, Vec<CaseProcedure>>, // case_id -> procedures
    patients: HashMap<Uuid, Patient>,
    users: HashMap<Uuid, User>,
}

/// 内存工作流存储
pub struct MemoryWorkflowStore {
    state: RwLock<MemoryState>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self { state: RwLock::new(MemoryState::default()) }
    }

    /// 病例的版本历史（测试辅助）
    pub async fn versions_for(&self, case_id: Uuid) -> Vec<CaseVersion> {
        self.state
            .read()
            .await
            .versions
            .get(&case_id)
            .cloned()
            .unwrap_or_default()
    }

    /// 已存储的患者数量（测试辅助）
    pub async fn patient_count(&self) -> usize {
        self.state.read().await.patients.len()
    }

    /// 直接写入病例（演示/测试装配用）
    pub async fn put_case(&self, case: Case) {
        self.state.write().await.cases.insert(case.id, case);
    }

    /// 直接写入检查项（演示/测试装配用）
    pub async fn put_procedure(&self, procedure: CaseProcedure) {
        self.state
            .write()
            .await
            .procedures
            .entry(procedure.case_id)
            .or_default()
            .push(procedure);
    }
}

impl Default for MemoryWorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn load_case(&self, case_id: Uuid) -> Result<Case> {
        self.state
            .read()
            .await
            .cases
            .get(&case_id)
            .cloned()
            .ok_or_else(|| MegError::NotFound(format!("Case {} not found", case_id)))
    }

    async fn insert_case(&self, case: Case, initial_version: CaseVersion) -> Result<()> {
        let mut state = self.state.write().await;
        state.versions.entry(case.id).or_default().push(initial_version);
        state.cases.insert(case.id, case);
        Ok(())
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> Result<()> {
        let mut state = self.state.write().await;

        let stored = state
            .cases
            .get(&commit.case.id)
            .ok_or_else(|| MegError::NotFound(format!("Case {} not found", commit.case.id)))?;

        // 乐观锁检查：版本指针不一致说明提交基于过期快照
        if stored.current_version_id != commit.expected_version_id {
            return Err(MegError::Conflict(format!(
                "Case {} was modified concurrently",
                commit.case.id
            )));
        }

        let case_id = commit.case.id;
        state.versions.entry(case_id).or_default().push(commit.new_version);
        state.audits.entry(case_id).or_default().extend(commit.audits);
        if let Some(assignment) = commit.assignment {
            state.assignments.entry(case_id).or_default().insert(0, assignment);
        }
        state.cases.insert(case_id, commit.case);
        Ok(())
    }

    async fn next_version_number(&self, case_id: Uuid) -> Result<i32> {
        let state = self.state.read().await;
        let last = state
            .versions
            .get(&case_id)
            .and_then(|v| v.last())
            .map(|v| v.version_number)
            .unwrap_or(0);
        Ok(last + 1)
    }

    async fn list_audits(&self, case_id: Uuid) -> Result<Vec<CaseAudit>> {
        Ok(self
            .state
            .read()
            .await
            .audits
            .get(&case_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_assignments(&self, case_id: Uuid) -> Result<Vec<CaseAssignment>> {
        Ok(self
            .state
            .read()
            .await
            .assignments
            .get(&case_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_patient_with_user(&self, patient: Patient, user: User) -> Result<()> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.id) {
            return Err(MegError::Validation(format!("User {} already exists", user.id)));
        }
        state.users.insert(user.id, user);
        state.patients.insert(patient.id, patient);
        Ok(())
    }

    async fn list_procedures(&self, case_id: Uuid) -> Result<Vec<CaseProcedure>> {
        Ok(self
            .state
            .read()
            .await
            .procedures
            .get(&case_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn reconcile_procedures(
        &self,
        case_id: Uuid,
        to_insert: Vec<CaseProcedure>,
        to_delete: Vec<Uuid>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let procedures = state.procedures.entry(case_id).or_default();
        procedures.retain(|p| !to_delete.contains(&p.id));
        procedures.extend(to_insert);
        Ok(())
    }
}
