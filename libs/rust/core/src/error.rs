//! Error taxonomy for registry reconciliation and image builds.
//!
//! The model registry answers "already exists" and "not found" with a generic
//! server error, so registry failures are classified from the message text of
//! the error payload (see [`classify`]). This is a compatibility shim: it is
//! brittle against upstream wording changes and should be replaced by status
//! code matching once the registry returns 404/409 for these conditions.

use thiserror::Error;

pub type Result<T, E = EdgeError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("no registered model found: {0}")]
    ModelNotFound(String),
    #[error("no model version found: {0}")]
    VersionNotFound(String),
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("model already exists: {0}")]
    ModelExists(String),
    #[error("version already exists: {0}")]
    VersionExists(String),
    #[error("artifact already exists: {0}")]
    ArtifactExists(String),

    #[error("no model versions found: {0}")]
    FindModelVersionFailed(String),
    #[error("no model artifacts found: {0}")]
    FindArtifactFailed(String),

    #[error("image with ID {0} not found")]
    ImageNotFound(String),
    #[error("image with ID {0} needs sync")]
    NeedsSync(String),

    #[error("{key} pipeline parameter {reason}")]
    Validation { key: String, reason: String },
    #[error("failed to decode metadata value for {key}: {reason}")]
    Codec { key: String, reason: String },
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{op}: server responded with {status}{}", detail(.message))]
    UnexpectedStatus { op: &'static str, status: u16, message: Option<String> },
    #[error("{op}: transport error")]
    Transport { op: &'static str, #[source] source: reqwest::Error },
    #[error("parameter file {path}: {reason}")]
    Params { path: String, reason: String },
    #[error("cluster CA bundle {path}: {reason}")]
    Credentials { path: String, reason: String },
    #[error("configuration error")]
    Config(#[from] config::ConfigError),

    #[error("{context}")]
    Context { context: String, #[source] source: Box<EdgeError> },
}

fn detail(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(" ({m})")).unwrap_or_default()
}

impl EdgeError {
    pub fn validation(key: &str, reason: impl Into<String>) -> Self {
        EdgeError::Validation { key: key.to_string(), reason: reason.into() }
    }

    /// Wraps the error with the operation that produced it.
    pub fn context(self, context: impl Into<String>) -> Self {
        EdgeError::Context { context: context.into(), source: Box::new(self) }
    }

    /// Innermost error below any number of [`EdgeError::Context`] layers.
    pub fn root(&self) -> &EdgeError {
        let mut cur = self;
        while let EdgeError::Context { source, .. } = cur { cur = source; }
        cur
    }
}

pub trait ResultExt<T> {
    fn context(self, context: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: &str) -> Result<T> { self.map_err(|e| e.context(context)) }
}

/// Registry operations and the response each one must produce on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryOp {
    ListModels,
    GetModel,
    CreateModel,
    ListVersions,
    GetVersion,
    FindVersion,
    CreateVersion,
    UpdateVersion,
    ListArtifacts,
    CreateArtifact,
    UpdateArtifact,
}

impl RegistryOp {
    pub fn expected_status(self) -> u16 {
        match self {
            RegistryOp::CreateModel | RegistryOp::CreateVersion | RegistryOp::CreateArtifact => 201,
            _ => 200,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            RegistryOp::ListModels => "get registered models",
            RegistryOp::GetModel => "get registered model",
            RegistryOp::CreateModel => "create registered model",
            RegistryOp::ListVersions => "get model versions",
            RegistryOp::GetVersion => "get model version",
            RegistryOp::FindVersion => "find model version by name",
            RegistryOp::CreateVersion => "create model version",
            RegistryOp::UpdateVersion => "update model version",
            RegistryOp::ListArtifacts => "get model version artifacts",
            RegistryOp::CreateArtifact => "create model version artifact",
            RegistryOp::UpdateArtifact => "update model artifact",
        }
    }
}

pub(crate) const MSG_ALREADY_EXISTS: &str = "already exists";
pub(crate) const MSG_MODEL_NOT_FOUND: &str = "no registered model found";
pub(crate) const MSG_VERSION_NOT_FOUND: &str = "no model version found";
pub(crate) const MSG_ARTIFACT_NOT_FOUND: &str = "artifact not found";
pub(crate) const MSG_FIND_VERSION: &str = "no model versions found";

/// Maps a failed registry response onto the error taxonomy.
///
/// `subject` names the resource involved (ids, names) and ends up in the
/// error text. Only the substrings each operation can legitimately produce
/// are checked; anything else is an [`EdgeError::UnexpectedStatus`].
pub fn classify(op: RegistryOp, status: u16, message: Option<&str>, subject: &str) -> EdgeError {
    let unexpected = || EdgeError::UnexpectedStatus { op: op.describe(), status, message: message.map(str::to_string) };
    let Some(msg) = message else { return unexpected() };
    let has = |needle: &str| msg.contains(needle);
    let subject = subject.to_string();
    match op {
        RegistryOp::CreateModel if has(MSG_ALREADY_EXISTS) => EdgeError::ModelExists(subject),
        RegistryOp::CreateVersion if has(MSG_MODEL_NOT_FOUND) => EdgeError::ModelNotFound(subject),
        RegistryOp::CreateVersion if has(MSG_ALREADY_EXISTS) => EdgeError::VersionExists(subject),
        RegistryOp::CreateArtifact if has(MSG_VERSION_NOT_FOUND) => EdgeError::VersionNotFound(subject),
        RegistryOp::CreateArtifact if has(MSG_ALREADY_EXISTS) => EdgeError::ArtifactExists(subject),
        RegistryOp::GetModel | RegistryOp::ListVersions if has(MSG_MODEL_NOT_FOUND) => EdgeError::ModelNotFound(subject),
        RegistryOp::GetVersion | RegistryOp::ListArtifacts | RegistryOp::UpdateVersion if has(MSG_VERSION_NOT_FOUND) => {
            EdgeError::VersionNotFound(subject)
        }
        RegistryOp::FindVersion if has(MSG_FIND_VERSION) => EdgeError::FindModelVersionFailed(subject),
        RegistryOp::UpdateArtifact if has(MSG_ARTIFACT_NOT_FOUND) => EdgeError::ArtifactNotFound(subject),
        _ => unexpected(),
    }
}
