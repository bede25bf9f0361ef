pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod routing;
pub mod workflow;

pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
    NoopAuditSink,
};
pub use domain::budget::{BudgetTier, BudgetTierId};
pub use domain::decision::{ApprovalEvent, ApprovalEventId, Decision};
pub use domain::employee::{Employee, EmployeeId, OrgLevel, Role};
pub use domain::expense::{ExpenseId, ExpenseRequest, ExpenseStatus, Urgency};
pub use errors::{ApplicationError, DomainError};
pub use routing::{BudgetTierTable, ChainResolver, ChainStop, OrgDirectory};
pub use workflow::{
    DecisionEngine, DecisionInput, DecisionOutcome, RoutingState, TerminalStatus, WorkflowError,
};
