use thiserror::Error;

pub type AdvisorResult<T> = Result<T, AdvisorError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdvisorError {
    /// No combination of the available indexes answers the statement.
    #[error("no plan answers statement `{statement}`")]
    NoPlan { statement: String },
    #[error("invalid index: {0}")]
    InvalidIndex(String),
    /// The storage budget cannot be met while every statement stays answerable.
    #[error(
        "cannot fit indexes into {max_space} bytes ({required} bytes required) \
         without losing a plan for statement `{statement}`"
    )]
    CapacityInfeasible {
        max_space: f64,
        required: f64,
        statement: String,
    },
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("invalid statement `{statement}`: {reason}")]
    InvalidStatement { statement: String, reason: String },
    #[error("workload has no mix named `{0}`")]
    UnknownMix(String),
}

impl AdvisorError {
    pub(crate) fn invalid_statement<S: Into<String>, R: Into<String>>(
        statement: S,
        reason: R,
    ) -> Self {
        AdvisorError::InvalidStatement {
            statement: statement.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn no_plan<S: Into<String>>(statement: S) -> Self {
        AdvisorError::NoPlan {
            statement: statement.into(),
        }
    }
}
