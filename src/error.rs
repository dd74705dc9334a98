//! Error types for maintenance reconciliation.

use thiserror::Error;

/// Errors raised while reading from or writing to the Mesos master.
///
/// Fetch and mutation failures carry the formatted cause chain of the
/// underlying transport error, so the message alone is enough to report.
#[derive(Error, Debug)]
pub enum MaintenanceError {
    /// The master was unreachable or returned an unparseable payload.
    #[error("unable to fetch {what} from the master: {reason}")]
    Fetch { what: &'static str, reason: String },

    /// A host token matched nothing known to the master.
    #[error("no machine matches host '{0}'")]
    Unresolved(String),

    /// An inline `{"hostname", "ip"}` record was not well formed.
    #[error("malformed unmanaged host entry: {0}")]
    MalformedHost(String),

    /// An agent record could not be projected into a machine identity.
    #[error("malformed agent record '{agent}': {reason}")]
    MalformedAgent { agent: String, reason: String },

    /// A window or machine entry in the schedule is missing fields.
    #[error("malformed maintenance schedule: {0}")]
    MalformedSchedule(String),

    /// A write to the master failed. Earlier writes of the same
    /// operation may already have been applied.
    #[error("{operation} failed on the master: {reason}")]
    Mutation {
        operation: &'static str,
        reason: String,
    },
}

impl MaintenanceError {
    pub(crate) fn fetch(what: &'static str, err: anyhow::Error) -> Self {
        Self::Fetch {
            what,
            reason: format!("{:#}", err),
        }
    }

    pub(crate) fn mutation(operation: &'static str, err: anyhow::Error) -> Self {
        Self::Mutation {
            operation,
            reason: format!("{:#}", err),
        }
    }
}
