use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Domain is not active: {0}")]
    DomainInactive(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Dependent resources exist: {0}")]
    DependentsExist(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid password policy: {0}")]
    InvalidPolicy(String),

    #[error("Mail host transport error: {0}")]
    RemoteTransport(String),

    #[error("Mail host rejected mailbox creation: {0}")]
    RemoteCreateFailed(String),

    #[error("Mail host rejected mailbox deletion: {0}")]
    RemoteDeleteFailed(String),

    #[error("Remote mailbox created but local persistence failed: {0}")]
    PartialFailure(#[source] Box<PortalError>),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PortalError>;
