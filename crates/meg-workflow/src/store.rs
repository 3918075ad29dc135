//! 工作流持久化接口
//!
//! 状态转换、版本、审计与交接记录通过同一个提交单元落库，
//! 保证病例变更与其审计行要么全部生效要么全部失败。

use async_trait::async_trait;
use meg_core::{
    Case, CaseAssignment, CaseAudit, CaseProcedure, CaseVersion, Patient, Result, User,
};
use uuid::Uuid;

/// 一次工作流提交的全部内容
#[derive(Debug)]
pub struct TransitionCommit {
    pub case: Case,
    /// 乐观锁：提交时病例的current_version_id必须仍等于该值
    pub expected_version_id: Option<Uuid>,
    pub new_version: CaseVersion,
    pub audits: Vec<CaseAudit>,
    pub assignment: Option<CaseAssignment>,
}

/// 工作流存储接口
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// 读取病例
    async fn load_case(&self, case_id: Uuid) -> Result<Case>;

    /// 创建新病例（含初始版本）
    async fn insert_case(&self, case: Case, initial_version: CaseVersion) -> Result<()>;

    /// 原子提交一次转换：病例、版本、审计行与可选的交接记录
    ///
    /// expected_version_id不匹配时返回MegError::Conflict，任何部分失败时
    /// 整个提交视为未发生。
    async fn commit_transition(&self, commit: TransitionCommit) -> Result<()>;

    /// 病例的下一个版本号（单病例内严格递增）
    async fn next_version_number(&self, case_id: Uuid) -> Result<i32>;

    /// 病例的全部审计行，按时间正序
    async fn list_audits(&self, case_id: Uuid) -> Result<Vec<CaseAudit>>;

    /// 病例的全部交接记录，最新在前
    async fn list_assignments(&self, case_id: Uuid) -> Result<Vec<CaseAssignment>>;

    /// 在单个事务中创建患者与其用户，任一失败则双双回滚
    async fn create_patient_with_user(&self, patient: Patient, user: User) -> Result<()>;

    /// 病例当前关联的检查项
    async fn list_procedures(&self, case_id: Uuid) -> Result<Vec<CaseProcedure>>;

    /// 在单个事务中应用检查项集合差异（新增+删除）
    async fn reconcile_procedures(
        &self,
        case_id: Uuid,
        to_insert: Vec<CaseProcedure>,
        to_delete: Vec<Uuid>,
    ) -> Result<()>;
}
