//! Pipeline assembly and execution.
//!
//! An ordered stage list is declared per context type at configuration time
//! and compiled into one executable chain. Configuration fails fast at
//! startup if zero or multiple handlers are bound, or if any stage is
//! registered after the handler.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::stage::{Decorator, Handler, PipelineContext, Stage, StageResult, Validator, run_stages};

/// A compiled, immutable chain of stages for one context type.
///
/// Cheap to clone; executions share the stage list.
pub struct Pipeline<C> {
    stages: Arc<[Stage<C>]>,
}

impl<C> Clone for Pipeline<C> {
    fn clone(&self) -> Self {
        Self {
            stages: Arc::clone(&self.stages),
        }
    }
}

impl<C: PipelineContext> Pipeline<C> {
    /// Runs the chain against a context instance.
    ///
    /// Stages execute strictly sequentially. The driver checks the context
    /// after each validator and stops once a response is set; the terminal
    /// handler must set one.
    ///
    /// # Errors
    ///
    /// Returns an internal [`PipelineError`] on cancellation, collaborator
    /// fault, or a broken engine contract (missing response, overwrite).
    /// Expected protocol failures are never errors here; they terminate the
    /// chain through the response on the context.
    pub async fn execute(&self, ctx: &mut C, cancel: &CancellationToken) -> StageResult {
        run_stages(&self.stages, ctx, cancel).await?;

        if ctx.has_response() {
            Ok(())
        } else {
            Err(PipelineError::NoResponseProduced {
                context: std::any::type_name::<C>(),
            })
        }
    }

    /// Returns the names of the compiled stages, in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }
}

/// Ordered stage registration for one context type.
///
/// ```ignore
/// let pipeline = PipelineBuilder::new()
///     .decorator(LoadClient::new(store))
///     .validator(RedirectUriValidator::new())
///     .handler(AuthorizeHandler::new(codes))
///     .build()?;
/// ```
pub struct PipelineBuilder<C> {
    stages: Vec<Stage<C>>,
}

impl<C: PipelineContext> Default for PipelineBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: PipelineContext> PipelineBuilder<C> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a decorator stage.
    #[must_use]
    pub fn decorator(mut self, stage: impl Decorator<C> + 'static) -> Self {
        self.stages.push(Stage::Decorator(Arc::new(stage)));
        self
    }

    /// Appends a validator stage.
    #[must_use]
    pub fn validator(mut self, stage: impl Validator<C> + 'static) -> Self {
        self.stages.push(Stage::Validator(Arc::new(stage)));
        self
    }

    /// Appends the terminal handler stage.
    #[must_use]
    pub fn handler(mut self, stage: impl Handler<C> + 'static) -> Self {
        self.stages.push(Stage::Handler(Arc::new(stage)));
        self
    }

    /// Compiles the stage list into an executable chain.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NoHandler`] if no handler was registered
    /// - [`PipelineError::MultipleHandlers`] if more than one was
    /// - [`PipelineError::StageAfterHandler`] if any stage follows the handler
    pub fn build(self) -> Result<Pipeline<C>, PipelineError> {
        let context = std::any::type_name::<C>();

        let mut handler: Option<&'static str> = None;
        for stage in &self.stages {
            if let Some(first) = handler {
                if stage.is_handler() {
                    return Err(PipelineError::MultipleHandlers {
                        context,
                        first,
                        second: stage.name(),
                    });
                }
                return Err(PipelineError::StageAfterHandler {
                    stage: stage.name(),
                    handler: first,
                    context,
                });
            }
            if stage.is_handler() {
                handler = Some(stage.name());
            }
        }

        if handler.is_none() {
            return Err(PipelineError::NoHandler { context });
        }

        tracing::debug!(
            context,
            stages = self.stages.len(),
            "compiled pipeline"
        );

        Ok(Pipeline {
            stages: self.stages.into(),
        })
    }
}
