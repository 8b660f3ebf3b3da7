//! Pipeline engine error types.
//!
//! Every variant here is an internal fault: a configuration mistake caught at
//! startup, an ordering contract broken at runtime, or a collaborator failure
//! bubbling up through a stage. Expected protocol failures never appear here;
//! stages convert those into a terminal response on the context instead.

/// Boxed error type for collaborator faults raised inside a stage.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the pipeline engine.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// No handler was registered for the context type.
    #[error("no handler registered for context type `{context}`")]
    NoHandler {
        /// Type name of the context the pipeline was built for.
        context: &'static str,
    },

    /// More than one handler was registered for the context type.
    #[error("multiple handlers registered for context type `{context}`: `{first}` and `{second}`")]
    MultipleHandlers {
        /// Type name of the context the pipeline was built for.
        context: &'static str,
        /// Name of the first registered handler.
        first: &'static str,
        /// Name of the conflicting handler.
        second: &'static str,
    },

    /// A stage was registered after the terminal handler.
    #[error("stage `{stage}` registered after handler `{handler}` for context type `{context}`")]
    StageAfterHandler {
        /// Name of the misplaced stage.
        stage: &'static str,
        /// Name of the handler it was registered after.
        handler: &'static str,
        /// Type name of the context the pipeline was built for.
        context: &'static str,
    },

    /// A pipeline was registered twice for the same context type.
    #[error("pipeline already registered for context type `{context}`")]
    DuplicateContextType {
        /// Type name of the context.
        context: &'static str,
    },

    /// The dispatcher received a context type with no registered pipeline.
    #[error("no pipeline registered for context type `{context}`")]
    UnknownContextType {
        /// Type name of the unrecognized context.
        context: &'static str,
    },

    /// The terminal handler completed without setting a response.
    #[error("handler `{handler}` completed without setting a response")]
    MissingResponse {
        /// Name of the offending handler.
        handler: &'static str,
    },

    /// The chain ran to completion without any stage setting a response.
    ///
    /// Reachable only through a misbehaving decorator that neither set a
    /// response nor invoked its continuation.
    #[error("pipeline for context type `{context}` completed without setting a response")]
    NoResponseProduced {
        /// Type name of the context the pipeline ran for.
        context: &'static str,
    },

    /// A stage attempted to overwrite an already-set response.
    ///
    /// The first stage to set the response owns the outcome; a second write
    /// is a pipeline-configuration bug, not a valid state.
    #[error("stage `{stage}` attempted to overwrite an already-set response")]
    ResponseOverwrite {
        /// Name of the offending stage.
        stage: &'static str,
    },

    /// A capability assertion failed: a stage ran before the stage that
    /// populates the data it depends on.
    #[error("capability assertion failed: {message}")]
    CapabilityUnmet {
        /// Description of the unmet capability.
        message: String,
    },

    /// The cancellation signal fired before or during stage execution.
    #[error("pipeline execution cancelled")]
    Cancelled,

    /// A collaborator behind a stage failed unexpectedly.
    #[error("stage `{stage}` failed")]
    Stage {
        /// Name of the failing stage.
        stage: &'static str,
        /// Underlying collaborator error.
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    /// Creates a `CapabilityUnmet` error.
    #[must_use]
    pub fn capability_unmet(message: impl Into<String>) -> Self {
        Self::CapabilityUnmet {
            message: message.into(),
        }
    }

    /// Creates a `Stage` error wrapping a collaborator fault.
    #[must_use]
    pub fn stage(stage: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Stage {
            stage,
            source: source.into(),
        }
    }

    /// Returns `true` if this error was caught at configuration time.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::NoHandler { .. }
                | Self::MultipleHandlers { .. }
                | Self::StageAfterHandler { .. }
                | Self::DuplicateContextType { .. }
        )
    }

    /// Returns `true` if this error represents a cancelled execution.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Attempts to view the underlying collaborator fault as a concrete type.
    #[must_use]
    pub fn stage_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Stage { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}
