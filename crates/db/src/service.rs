use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};
use uuid::Uuid;

use outlay_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink};
use outlay_core::domain::decision::Decision;
use outlay_core::domain::employee::EmployeeId;
use outlay_core::domain::expense::{ExpenseId, ExpenseRequest, ExpenseStatus, Urgency};
use outlay_core::errors::{ApplicationError, DomainError};
use outlay_core::routing::{BudgetTierTable, ChainResolver, ChainStop, OrgDirectory};
use outlay_core::workflow::{
    DecisionEngine, DecisionInput, DecisionOutcome, RoutingState, WorkflowError,
};

use crate::repositories::{
    ApprovalEventRepository, BudgetTierRepository, EmployeeRepository, ExpenseRepository,
    RepositoryError,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Unknown expense ids indicate an integrity violation and are surfaced,
    /// unlike routing gaps which degrade silently inside the resolver.
    #[error("expense request not found: {0:?}")]
    ExpenseNotFound(ExpenseId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ServiceError {
    /// Map into the core application-level taxonomy, e.g. for deriving a
    /// user-safe message at a presentation boundary.
    pub fn into_application(self) -> ApplicationError {
        match self {
            Self::ExpenseNotFound(id) => ApplicationError::ExpenseNotFound(id),
            Self::Repository(error) => ApplicationError::Persistence(error.to_string()),
            Self::Workflow(error) => ApplicationError::Domain(DomainError::Workflow(error)),
            Self::Domain(error) => ApplicationError::Domain(error),
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewExpense {
    pub title: String,
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    pub business_justification: String,
    pub urgency: Urgency,
    pub submitted_by: EmployeeId,
}

#[derive(Clone, Debug)]
pub struct SubmissionOutcome {
    pub expense: ExpenseRequest,
    pub chain: Vec<EmployeeId>,
}

/// Orchestrates the submission/review workflow over the repository
/// collaborators. This is the sole writer of expense status and the approval
/// event log.
///
/// Chains are re-resolved from live configuration on every decision rather
/// than frozen at submission, so an org or tier edit changes routing for
/// in-flight requests.
pub struct ApprovalService {
    employees: Arc<dyn EmployeeRepository>,
    tiers: Arc<dyn BudgetTierRepository>,
    expenses: Arc<dyn ExpenseRepository>,
    events: Arc<dyn ApprovalEventRepository>,
    audit: Arc<dyn AuditSink>,
    engine: DecisionEngine,
    decision_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ApprovalService {
    pub fn new(
        employees: Arc<dyn EmployeeRepository>,
        tiers: Arc<dyn BudgetTierRepository>,
        expenses: Arc<dyn ExpenseRepository>,
        events: Arc<dyn ApprovalEventRepository>,
    ) -> Self {
        Self {
            employees,
            tiers,
            expenses,
            events,
            audit: Arc::new(NoopAuditSink),
            engine: DecisionEngine::new(),
            decision_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    /// Materialize routing snapshots from the current directory and tier
    /// configuration.
    async fn load_resolver(&self) -> Result<ChainResolver, ServiceError> {
        let employees = self.employees.list_all().await?;
        let tiers = self.tiers.list_active().await?;
        Ok(ChainResolver::new(OrgDirectory::new(employees), BudgetTierTable::new(tiers)))
    }

    /// Resolved chain with display metadata, for showing the flow before
    /// submission.
    pub async fn preview_chain(
        &self,
        submitter: &EmployeeId,
        amount: Decimal,
    ) -> Result<Vec<ChainStop>, ServiceError> {
        let resolver = self.load_resolver().await?;
        Ok(resolver.preview_chain(submitter, amount))
    }

    /// Create a request and route it to the first chain entry. An empty chain
    /// means no approval is required: the request is short-circuited to
    /// `approved` at submission time instead of pending forever.
    pub async fn submit_expense(
        &self,
        new_expense: NewExpense,
    ) -> Result<SubmissionOutcome, ServiceError> {
        let resolver = self.load_resolver().await?;
        let chain = resolver.resolve_chain(&new_expense.submitted_by, new_expense.amount);

        let now = Utc::now();
        let expense = ExpenseRequest {
            id: ExpenseId(Uuid::new_v4().to_string()),
            title: new_expense.title,
            amount: new_expense.amount,
            category: new_expense.category,
            description: new_expense.description,
            business_justification: new_expense.business_justification,
            status: if chain.is_empty() { ExpenseStatus::Approved } else { ExpenseStatus::Pending },
            urgency: new_expense.urgency,
            submitted_by: new_expense.submitted_by,
            current_approver: chain.first().cloned(),
            created_at: now,
            updated_at: now,
        };

        self.expenses.save(expense.clone()).await?;

        info!(
            expense_id = %expense.id.0,
            submitter = %expense.submitted_by.0,
            amount = %expense.amount,
            chain_len = chain.len(),
            auto_approved = chain.is_empty(),
            "expense submitted"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(expense.id.clone()),
                expense.id.0.clone(),
                "routing.chain_resolved",
                AuditCategory::Routing,
                "approval-service",
                AuditOutcome::Success,
            )
            .with_metadata("chain_len", chain.len().to_string())
            .with_metadata("auto_approved", chain.is_empty().to_string()),
        );

        Ok(SubmissionOutcome { expense, chain })
    }

    /// Record one approver decision and advance or terminate the request.
    ///
    /// Decisions for the same expense are serialized through a per-expense
    /// mutex: two concurrent approvals would otherwise both resolve the same
    /// next approver and double-advance, and a rejection could race an
    /// approval. Decisions for different expenses proceed in parallel.
    pub async fn record_decision(
        &self,
        expense_id: &ExpenseId,
        approver_id: &EmployeeId,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<DecisionOutcome, ServiceError> {
        let lock = self.decision_lock(expense_id);
        let _serialized = lock.lock().await;

        let mut expense = self
            .expenses
            .find_by_id(expense_id)
            .await?
            .ok_or_else(|| ServiceError::ExpenseNotFound(expense_id.clone()))?;

        let resolver = self.load_resolver().await?;
        let chain = resolver.resolve_chain(&expense.submitted_by, expense.amount);
        let history = self.events.list_for_expense(expense_id).await?;

        let input = DecisionInput { approver_id: approver_id.clone(), decision, comment };
        let outcome = match self.engine.apply_decision(&expense, &chain, &history, input) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    expense_id = %expense_id.0,
                    approver = %approver_id.0,
                    %error,
                    "decision refused"
                );
                self.audit.emit(
                    AuditEvent::new(
                        Some(expense_id.clone()),
                        expense_id.0.clone(),
                        "workflow.decision_refused",
                        AuditCategory::Decision,
                        "approval-service",
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
                return Err(error.into());
            }
        };

        self.events.append(outcome.event.clone()).await?;

        match (&outcome.terminal, &outcome.next_approver) {
            (Some(terminal), _) => expense.transition_to((*terminal).into())?,
            (None, Some(next)) => expense.reassign_approver(next.clone()),
            // apply_decision always sets exactly one of the two.
            (None, None) => {}
        }
        expense.updated_at = Utc::now();
        self.expenses.save(expense).await?;

        info!(
            expense_id = %expense_id.0,
            approver = %approver_id.0,
            decision = ?decision,
            next_approver = outcome.next_approver.as_ref().map(|id| id.0.as_str()),
            terminal = ?outcome.terminal,
            "decision recorded"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(expense_id.clone()),
                outcome.event.id.0.clone(),
                "workflow.decision_recorded",
                AuditCategory::Decision,
                "approval-service",
                AuditOutcome::Success,
            )
            .with_metadata("decision", format!("{decision:?}"))
            .with_metadata(
                "next_approver",
                outcome
                    .next_approver
                    .as_ref()
                    .map(|id| id.0.clone())
                    .unwrap_or_else(|| "none".to_string()),
            ),
        );

        Ok(outcome)
    }

    /// Live routing position of a request against current configuration.
    pub async fn routing_state(&self, expense_id: &ExpenseId) -> Result<RoutingState, ServiceError> {
        let expense = self
            .expenses
            .find_by_id(expense_id)
            .await?
            .ok_or_else(|| ServiceError::ExpenseNotFound(expense_id.clone()))?;

        let resolver = self.load_resolver().await?;
        let chain = resolver.resolve_chain(&expense.submitted_by, expense.amount);
        let history = self.events.list_for_expense(expense_id).await?;
        Ok(self.engine.routing_state(&chain, &history))
    }

    fn decision_lock(&self, expense_id: &ExpenseId) -> Arc<AsyncMutex<()>> {
        let mut locks = match self.decision_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(expense_id.0.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }
}
