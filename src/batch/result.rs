use crate::error::{Error, Result};
use crate::protocol::response::ErrPayload;
use crate::resultset::QueryResult;

/// Result of one sub-command of a batch
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(Vec<QueryResult>),
    Failed(ErrPayload),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Affected rows of the first result, 0 for result sets and failures
    pub fn affected_rows(&self) -> u64 {
        match self {
            Outcome::Success(results) => results.first().map_or(0, QueryResult::affected_rows),
            Outcome::Failed(_) => 0,
        }
    }

    pub fn error(&self) -> Option<&ErrPayload> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failed(err) => Some(err),
        }
    }
}

/// Per-command outcomes of a batch, in the order the commands were given
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    outcomes: Vec<Outcome>,
    packets: usize,
}

impl BatchResult {
    pub fn new(outcomes: Vec<Outcome>, packets: usize) -> Self {
        Self { outcomes, packets }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<Outcome> {
        self.outcomes
    }

    /// Index and error of every failed command
    pub fn failures(&self) -> impl Iterator<Item = (usize, &ErrPayload)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(idx, outcome)| outcome.error().map(|err| (idx, err)))
    }

    pub fn first_failure(&self) -> Option<(usize, &ErrPayload)> {
        self.failures().next()
    }

    /// Number of packets written to the server
    pub fn packets_sent(&self) -> usize {
        self.packets
    }

    pub fn affected_rows(&self) -> u64 {
        self.outcomes.iter().map(Outcome::affected_rows).sum()
    }

    /// Turn failures into the batch error.
    ///
    /// With `continue_on_error` any failure yields `BatchPartialFailure` carrying every
    /// outcome. Otherwise the first failure is returned as a server error.
    pub fn into_result(self, continue_on_error: bool) -> Result<Self> {
        match self.first_failure() {
            None => Ok(self),
            Some((_, err)) if !continue_on_error => Err(Error::ServerError(err.clone())),
            Some(_) => Err(Error::BatchPartialFailure(Box::new(self))),
        }
    }
}
