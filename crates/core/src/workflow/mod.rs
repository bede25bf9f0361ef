use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::decision::{ApprovalEvent, Decision};
use crate::domain::employee::EmployeeId;
use crate::domain::expense::{ExpenseId, ExpenseRequest, ExpenseStatus};

/// Live position of a pending request inside its chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingState {
    /// The first chain entry without a recorded approval.
    AwaitingDecision(EmployeeId),
    /// Every chain entry has approved (or the chain is empty).
    ChainExhausted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Approved,
    Rejected,
}

impl From<TerminalStatus> for ExpenseStatus {
    fn from(value: TerminalStatus) -> Self {
        match value {
            TerminalStatus::Approved => ExpenseStatus::Approved,
            TerminalStatus::Rejected => ExpenseStatus::Rejected,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionInput {
    pub approver_id: EmployeeId,
    pub decision: Decision,
    pub comment: Option<String>,
}

/// Result of applying one decision: the event to append, plus either the next
/// approver to route to or the terminal status reached. Exactly one of
/// `next_approver` and `terminal` is set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub event: ApprovalEvent,
    pub next_approver: Option<EmployeeId>,
    pub terminal: Option<TerminalStatus>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("expense {expense_id:?} is already terminal ({status:?}); no further decisions apply")]
    TerminalRequest { expense_id: ExpenseId, status: ExpenseStatus },
}

/// Deterministic approval state machine.
///
/// The engine is pure: callers load the request, resolve the current chain,
/// and fetch the decision history; the engine computes the single permitted
/// transition and hands back the event and field updates to persist.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecisionEngine;

impl DecisionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Distinct approver ids with an `approved` event for this request.
    /// Set semantics: a duplicate approval from the same approver adds a log
    /// row but does not move the chain position twice.
    fn approved_set<'a>(history: &'a [ApprovalEvent]) -> HashSet<&'a str> {
        history
            .iter()
            .filter(|event| event.is_approval())
            .map(|event| event.approver_id.0.as_str())
            .collect()
    }

    /// Live routing state: the first chain entry not yet in the approved set,
    /// or exhaustion. An empty chain is exhausted by definition.
    pub fn routing_state(&self, chain: &[EmployeeId], history: &[ApprovalEvent]) -> RoutingState {
        let approved = Self::approved_set(history);
        chain
            .iter()
            .find(|approver| !approved.contains(approver.0.as_str()))
            .map(|approver| RoutingState::AwaitingDecision(approver.clone()))
            .unwrap_or(RoutingState::ChainExhausted)
    }

    /// Apply one decision to a pending request.
    ///
    /// `chain` is the chain as resolved from current configuration at call
    /// time; `history` is the request's full decision log before this call.
    /// Decisions against terminal requests are refused rather than absorbed.
    pub fn apply_decision(
        &self,
        expense: &ExpenseRequest,
        chain: &[EmployeeId],
        history: &[ApprovalEvent],
        input: DecisionInput,
    ) -> Result<DecisionOutcome, WorkflowError> {
        if expense.status.is_terminal() {
            return Err(WorkflowError::TerminalRequest {
                expense_id: expense.id.clone(),
                status: expense.status,
            });
        }

        let event = ApprovalEvent::record(
            expense.id.clone(),
            input.approver_id,
            input.decision,
            input.comment,
        );

        if input.decision == Decision::Rejected {
            // Rejection at any chain position ends the workflow immediately;
            // later approvers are never consulted.
            return Ok(DecisionOutcome {
                event,
                next_approver: None,
                terminal: Some(TerminalStatus::Rejected),
            });
        }

        let mut approved = Self::approved_set(history);
        approved.insert(event.approver_id.0.as_str());

        let next_approver =
            chain.iter().find(|approver| !approved.contains(approver.0.as_str())).cloned();
        let terminal = next_approver.is_none().then_some(TerminalStatus::Approved);

        Ok(DecisionOutcome { event, next_approver, terminal })
    }
}
