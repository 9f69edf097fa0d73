//! Error types for the charge pipeline.

use std::path::PathBuf;

/// Money conversion failures.
#[derive(Debug, thiserror::Error)]
pub enum MoneyError {
    #[error("amount is required")]
    Missing,

    #[error("nanos out of range: {0}")]
    NanosOutOfRange(i32),

    #[error("units ({units}) and nanos ({nanos}) must carry the same sign")]
    SignMismatch { units: i64, nanos: i32 },

    #[error("money conversion overflow")]
    Overflow,
}

/// Card number format failures.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("invalid card number length: {0}")]
    InvalidLength(usize),

    #[error("card number contains non-digit characters")]
    NonDigit,
}

/// Service token and key material failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("failed to read key {path}: {source}")]
    KeyLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse key: {0}")]
    KeyParse(String),

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token expired at {expired_at}")]
    Expired { expired_at: u64 },
}

/// Ledger failure classes, derived from a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerErrorKind {
    Unauthorized,
    InsufficientFunds,
    DuplicateTransaction,
    ClientError,
    ServerError,
    Unknown,
    Unreachable,
    Internal,
}

impl LedgerErrorKind {
    /// Label used for the `payment_errors_total` metric.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerErrorKind::Unauthorized => "ledger_unauthorized",
            LedgerErrorKind::InsufficientFunds => "ledger_insufficient_funds",
            LedgerErrorKind::DuplicateTransaction => "ledger_duplicate",
            LedgerErrorKind::ClientError => "ledger_client_error",
            LedgerErrorKind::ServerError => "ledger_server_error",
            LedgerErrorKind::Unknown => "ledger_unknown",
            LedgerErrorKind::Unreachable => "ledger_unreachable",
            LedgerErrorKind::Internal => "ledger_internal",
        }
    }
}

const INSUFFICIENT_FUNDS_CODES: [&str; 3] =
    ["insufficient_funds", "INSUFFICIENT_FUNDS", "insufficient_balance"];
const DUPLICATE_CODES: [&str; 2] = ["duplicate_transaction", "DUPLICATE_TRANSACTION"];

/// Failures talking to the remote ledger.
///
/// Classified once at the client boundary; callers branch on [`kind`](Self::kind)
/// or the predicates, never on the message.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger API error {status} ({code}): {message}")]
    Remote {
        status: u16,
        code: String,
        message: String,
    },

    #[error("ledger unreachable: {message}")]
    Unreachable { timed_out: bool, message: String },

    #[error("unparseable ledger response (status {status}): {message}")]
    MalformedResponse { status: u16, message: String },

    #[error("failed to obtain ledger credential: {0}")]
    Credential(#[from] AuthError),

    #[error("failed to build ledger request: {0}")]
    Request(String),
}

impl LedgerError {
    pub fn remote(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        LedgerError::Remote {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, LedgerError::Remote { status: 401, .. })
    }

    pub fn is_insufficient_funds(&self) -> bool {
        match self {
            LedgerError::Remote { status, code, .. } => {
                *status == 400 && INSUFFICIENT_FUNDS_CODES.contains(&code.as_str())
            }
            _ => false,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        match self {
            LedgerError::Remote { status, code, .. } => {
                *status == 409 || DUPLICATE_CODES.contains(&code.as_str())
            }
            _ => false,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, LedgerError::Unreachable { .. })
    }

    /// Classifies the failure. Precedence: unauthorized, insufficient funds,
    /// duplicate, generic 4xx, 5xx.
    pub fn kind(&self) -> LedgerErrorKind {
        match self {
            LedgerError::Remote { status, .. } => {
                if self.is_unauthorized() {
                    LedgerErrorKind::Unauthorized
                } else if self.is_insufficient_funds() {
                    LedgerErrorKind::InsufficientFunds
                } else if self.is_duplicate() {
                    LedgerErrorKind::DuplicateTransaction
                } else if (400..500).contains(status) {
                    LedgerErrorKind::ClientError
                } else if *status >= 500 {
                    LedgerErrorKind::ServerError
                } else {
                    LedgerErrorKind::Unknown
                }
            }
            LedgerError::Unreachable { .. } => LedgerErrorKind::Unreachable,
            LedgerError::MalformedResponse { .. }
            | LedgerError::Credential(_)
            | LedgerError::Request(_) => LedgerErrorKind::Internal,
        }
    }
}

/// The four outcomes a caller must be able to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// The request itself was wrong.
    CallerInput,
    /// Back off and retry later.
    Backoff,
    /// Retry later; the backend is at fault.
    Backend,
    /// This transaction may already have been applied.
    PossiblyApplied,
}

/// Caller-facing charge failures.
#[derive(Debug, thiserror::Error)]
pub enum ChargeError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    ResourceExhausted(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ChargeError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ChargeError::InvalidInput(_) => "INVALID_ARGUMENT",
            ChargeError::ResourceExhausted(_) => "RESOURCE_EXHAUSTED",
            ChargeError::Unauthenticated(_) => "UNAUTHENTICATED",
            ChargeError::FailedPrecondition(_) => "FAILED_PRECONDITION",
            ChargeError::AlreadyExists(_) => "ALREADY_EXISTS",
            ChargeError::Unavailable(_) => "UNAVAILABLE",
            ChargeError::Internal(_) => "INTERNAL",
        }
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            ChargeError::InvalidInput(_) | ChargeError::FailedPrecondition(_) => {
                FailureCategory::CallerInput
            }
            ChargeError::ResourceExhausted(_) => FailureCategory::Backoff,
            ChargeError::Unauthenticated(_)
            | ChargeError::Unavailable(_)
            | ChargeError::Internal(_) => FailureCategory::Backend,
            ChargeError::AlreadyExists(_) => FailureCategory::PossiblyApplied,
        }
    }
}

impl From<MoneyError> for ChargeError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::Missing => ChargeError::InvalidInput("amount is required".into()),
            e => ChargeError::InvalidInput(format!("invalid amount: {e}")),
        }
    }
}

impl From<CardError> for ChargeError {
    fn from(err: CardError) -> Self {
        ChargeError::InvalidInput(format!("invalid card number: {err}"))
    }
}

impl From<LedgerError> for ChargeError {
    fn from(err: LedgerError) -> Self {
        match (err.kind(), &err) {
            (LedgerErrorKind::Unauthorized, _) => {
                ChargeError::Unauthenticated("authentication with ledger failed".into())
            }
            (LedgerErrorKind::InsufficientFunds, _) => {
                ChargeError::FailedPrecondition("insufficient funds in account".into())
            }
            (LedgerErrorKind::DuplicateTransaction, _) => {
                ChargeError::AlreadyExists("duplicate transaction".into())
            }
            (LedgerErrorKind::ClientError, LedgerError::Remote { message, .. }) => {
                ChargeError::InvalidInput(message.clone())
            }
            (LedgerErrorKind::ServerError, _) => {
                ChargeError::Internal("ledger service error".into())
            }
            (
                LedgerErrorKind::Unreachable,
                LedgerError::Unreachable {
                    timed_out: true, ..
                },
            ) => ChargeError::Unavailable(
                "ledger timed out; transaction outcome unknown".into(),
            ),
            (LedgerErrorKind::Unreachable, _) => {
                ChargeError::Unavailable("ledger unreachable".into())
            }
            _ => ChargeError::Internal(format!("ledger communication error: {err}")),
        }
    }
}
