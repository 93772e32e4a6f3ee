use super::donation_reader::DonationRow;
use crate::application::donation::WorkflowState;
use crate::domain::records::{ProjectId, RecordId, UserId};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Donated,
    Failed,
}

/// What happened to one donation row.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Outcome {
    pub user: UserId,
    pub project: ProjectId,
    pub amount: String,
    pub status: OutcomeStatus,
    pub customer_created: bool,
    pub card_created: bool,
    pub subscription: Option<RecordId>,
    pub redirect: Option<String>,
    pub error: Option<String>,
}

impl Outcome {
    /// Summarizes the settled state of the workflow that ran `row`.
    pub fn from_state(row: &DonationRow, state: &WorkflowState) -> Self {
        Self {
            user: row.user,
            project: row.project,
            amount: row.amount.to_string(),
            status: if state.succeeded() {
                OutcomeStatus::Donated
            } else {
                OutcomeStatus::Failed
            },
            customer_created: state.created.customer.is_some(),
            card_created: state.created.card.is_some(),
            subscription: state.created.subscription.as_ref().map(|s| s.id),
            redirect: state.redirected_to.clone(),
            error: state.error.as_ref().map(|e| e.to_string()),
        }
    }

    /// A row that never reached the workflow.
    pub fn rejected(row: &DonationRow, reason: impl Into<String>) -> Self {
        Self {
            user: row.user,
            project: row.project,
            amount: row.amount.to_string(),
            status: OutcomeStatus::Failed,
            customer_created: false,
            card_created: false,
            subscription: None,
            redirect: None,
            error: Some(reason.into()),
        }
    }
}

/// Writes outcomes as CSV with a header row.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    /// Creates a writer over `sink`. The header is written with the first
    /// outcome.
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Appends one outcome line.
    pub fn write_outcome(&mut self, outcome: &Outcome) -> Result<()> {
        self.writer.serialize(outcome)?;
        Ok(())
    }

    /// Flushes buffered lines to the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
