use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("token lookup collision")]
    TokenLookupCollision,

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("cannot find robot with project id: {project_id} and id: {robot_id}")]
    RobotNotFound { project_id: i64, robot_id: i64 },

    #[error("bad request no access")]
    EmptyGrantSet,

    #[error("bad resource {0}")]
    InvalidResource(String),

    #[error("{action} action of {resource} resource not exist in project {project}")]
    GrantNotAllowed {
        action: String,
        resource: String,
        project: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("forbidden")]
    Forbidden,

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("request cancelled")]
    Cancelled,

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl Error {
    /// True for store-level and robot-level absence. Project absence is not
    /// included: a missing project is never an acceptable end state.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound | Error::RobotNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
