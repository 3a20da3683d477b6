/// Convenience result type used across textreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Result delivered exactly once for every render request.
pub type PipelineResult = Result<std::path::PathBuf, ReelError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid user-provided request or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The encoder sink could not be opened for the chosen output path/settings.
    #[error("cannot open sink: {0}")]
    CannotOpenSink(String),

    /// The sink cannot accept another frame right now; retry after it signals readiness.
    #[error("sink not ready: {0}")]
    SinkNotReady(String),

    /// The sink failed while accepting frames. Fatal for the current request.
    #[error("sink failed: {0}")]
    SinkFailed(String),

    /// Every pixel buffer of the bounded pool is checked out.
    #[error("pixel buffer pool exhausted: {0}")]
    PoolExhausted(String),

    /// The sink reported an error while finalizing the container.
    #[error("finalize failed: {0}")]
    FinalizeFailed(String),

    /// A media asset could not be opened or probed.
    #[error("asset load failed: {0}")]
    AssetLoadFailed(String),

    /// A media asset lacks the track kind the composition needs.
    #[error("missing track: {0}")]
    MissingTrack(String),

    /// The export job finished in the failed state.
    #[error("export failed: {0}")]
    ExportFailed(String),

    /// The export job finished in the cancelled state.
    #[error("export cancelled: {0}")]
    ExportCancelled(String),

    /// The export job reported completion while still in a non-terminal state.
    #[error("unexpected export state: {0}")]
    UnexpectedExportState(String),

    /// A frame buffer could not be allocated.
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    /// An operation was attempted in a state that does not permit it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The request was cancelled by the caller.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// A stage exceeded its configured wall-clock budget.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Invariant violation inside the pipeline itself.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Discriminant of [`ReelError`], stable for logging and matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`ReelError::Validation`].
    Validation,
    /// See [`ReelError::CannotOpenSink`].
    CannotOpenSink,
    /// See [`ReelError::SinkNotReady`].
    SinkNotReady,
    /// See [`ReelError::SinkFailed`].
    SinkFailed,
    /// See [`ReelError::PoolExhausted`].
    PoolExhausted,
    /// See [`ReelError::FinalizeFailed`].
    FinalizeFailed,
    /// See [`ReelError::AssetLoadFailed`].
    AssetLoadFailed,
    /// See [`ReelError::MissingTrack`].
    MissingTrack,
    /// See [`ReelError::ExportFailed`].
    ExportFailed,
    /// See [`ReelError::ExportCancelled`].
    ExportCancelled,
    /// See [`ReelError::UnexpectedExportState`].
    UnexpectedExportState,
    /// See [`ReelError::AllocationFailed`].
    AllocationFailed,
    /// See [`ReelError::InvalidState`].
    InvalidState,
    /// See [`ReelError::Cancelled`].
    Cancelled,
    /// See [`ReelError::Timeout`].
    Timeout,
    /// See [`ReelError::Internal`].
    Internal,
    /// See [`ReelError::Other`].
    Other,
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::CannotOpenSink`] value.
    pub fn cannot_open_sink(msg: impl Into<String>) -> Self {
        Self::CannotOpenSink(msg.into())
    }

    /// Build a [`ReelError::SinkNotReady`] value.
    pub fn sink_not_ready(msg: impl Into<String>) -> Self {
        Self::SinkNotReady(msg.into())
    }

    /// Build a [`ReelError::SinkFailed`] value.
    pub fn sink_failed(msg: impl Into<String>) -> Self {
        Self::SinkFailed(msg.into())
    }

    /// Build a [`ReelError::PoolExhausted`] value.
    pub fn pool_exhausted(msg: impl Into<String>) -> Self {
        Self::PoolExhausted(msg.into())
    }

    /// Build a [`ReelError::FinalizeFailed`] value.
    pub fn finalize_failed(msg: impl Into<String>) -> Self {
        Self::FinalizeFailed(msg.into())
    }

    /// Build a [`ReelError::AssetLoadFailed`] value.
    pub fn asset_load_failed(msg: impl Into<String>) -> Self {
        Self::AssetLoadFailed(msg.into())
    }

    /// Build a [`ReelError::MissingTrack`] value.
    pub fn missing_track(msg: impl Into<String>) -> Self {
        Self::MissingTrack(msg.into())
    }

    /// Build a [`ReelError::ExportFailed`] value.
    pub fn export_failed(msg: impl Into<String>) -> Self {
        Self::ExportFailed(msg.into())
    }

    /// Build a [`ReelError::ExportCancelled`] value.
    pub fn export_cancelled(msg: impl Into<String>) -> Self {
        Self::ExportCancelled(msg.into())
    }

    /// Build a [`ReelError::UnexpectedExportState`] value.
    pub fn unexpected_export_state(msg: impl Into<String>) -> Self {
        Self::UnexpectedExportState(msg.into())
    }

    /// Build a [`ReelError::AllocationFailed`] value.
    pub fn allocation_failed(msg: impl Into<String>) -> Self {
        Self::AllocationFailed(msg.into())
    }

    /// Build a [`ReelError::InvalidState`] value.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Build a [`ReelError::Cancelled`] value.
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Build a [`ReelError::Timeout`] value.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Build a [`ReelError::Internal`] value.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::CannotOpenSink(_) => ErrorKind::CannotOpenSink,
            Self::SinkNotReady(_) => ErrorKind::SinkNotReady,
            Self::SinkFailed(_) => ErrorKind::SinkFailed,
            Self::PoolExhausted(_) => ErrorKind::PoolExhausted,
            Self::FinalizeFailed(_) => ErrorKind::FinalizeFailed,
            Self::AssetLoadFailed(_) => ErrorKind::AssetLoadFailed,
            Self::MissingTrack(_) => ErrorKind::MissingTrack,
            Self::ExportFailed(_) => ErrorKind::ExportFailed,
            Self::ExportCancelled(_) => ErrorKind::ExportCancelled,
            Self::UnexpectedExportState(_) => ErrorKind::UnexpectedExportState,
            Self::AllocationFailed(_) => ErrorKind::AllocationFailed,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Internal(_) => ErrorKind::Internal,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Return `true` for conditions the frame loop retries internally.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::SinkNotReady(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
