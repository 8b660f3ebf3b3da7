//! Stage abstractions: decorators, validators, and the terminal handler.
//!
//! A pipeline is an ordered list of stages bound to one context type.
//! Three stage kinds exist, with different contracts:
//!
//! - [`Decorator`] wraps the remainder of the chain. Code before the
//!   continuation runs pre-continuation; code after it runs post-continuation
//!   even when an inner stage short-circuited. Decorators are the only stages
//!   guaranteed to run "around" a short-circuited chain.
//! - [`Validator`] inspects and mutates the context, and may terminate the
//!   chain by setting the response. Expected validation failures never
//!   surface as `Err`; errors are reserved for unexpected faults.
//! - [`Handler`] is terminal and must set the response. The driver treats a
//!   missing response after the handler as an internal error.
//!
//! All stage calls receive the request's [`CancellationToken`]; a cancelled
//! stage stops promptly and propagates [`PipelineError::Cancelled`] rather
//! than emitting a response.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;

/// Result of a single stage invocation.
///
/// `Ok(())` means the stage completed, whether or not it set the response;
/// the driver inspects the context to decide whether to continue.
pub type StageResult = Result<(), PipelineError>;

/// Minimal view of a context the driver needs: whether a terminal response
/// has been set.
pub trait PipelineContext: Send + 'static {
    /// Returns `true` once a terminal response has been recorded.
    fn has_response(&self) -> bool;
}

/// A stage that wraps the remainder of the chain.
#[async_trait]
pub trait Decorator<C: PipelineContext>: Send + Sync {
    /// Stable stage name used in logs and configuration errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Runs this stage around the continuation.
    ///
    /// Implementations must call `next.run(...)` at most once.
    async fn decorate(
        &self,
        ctx: &mut C,
        next: Next<'_, C>,
        cancel: &CancellationToken,
    ) -> StageResult;
}

/// A stage that inspects or mutates the context and may terminate the chain
/// by setting the response.
#[async_trait]
pub trait Validator<C: PipelineContext>: Send + Sync {
    /// Stable stage name used in logs and configuration errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Validates the context. Expected failures set the response; `Err` is
    /// reserved for unexpected faults.
    async fn validate(&self, ctx: &mut C, cancel: &CancellationToken) -> StageResult;
}

/// The terminal stage of a chain. Must set the response.
#[async_trait]
pub trait Handler<C: PipelineContext>: Send + Sync {
    /// Stable stage name used in logs and configuration errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Produces the terminal response.
    async fn handle(&self, ctx: &mut C, cancel: &CancellationToken) -> StageResult;
}

/// One registered stage of a compiled chain.
pub enum Stage<C> {
    /// A wrapping stage.
    Decorator(Arc<dyn Decorator<C>>),
    /// An inspect/terminate stage.
    Validator(Arc<dyn Validator<C>>),
    /// The terminal stage.
    Handler(Arc<dyn Handler<C>>),
}

impl<C: PipelineContext> Stage<C> {
    /// Returns the stage's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Decorator(d) => d.name(),
            Self::Validator(v) => v.name(),
            Self::Handler(h) => h.name(),
        }
    }

    /// Returns `true` if this stage is the terminal handler.
    #[must_use]
    pub fn is_handler(&self) -> bool {
        matches!(self, Self::Handler(_))
    }
}

impl<C> Clone for Stage<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Decorator(d) => Self::Decorator(Arc::clone(d)),
            Self::Validator(v) => Self::Validator(Arc::clone(v)),
            Self::Handler(h) => Self::Handler(Arc::clone(h)),
        }
    }
}

/// Explicit continuation handed to a [`Decorator`].
///
/// Holds the remainder of the chain. Consuming it more than once is
/// impossible; not consuming it at all skips every inner stage, which is a
/// legitimate short-circuit as long as the decorator set a response.
pub struct Next<'a, C> {
    remaining: &'a [Stage<C>],
}

impl<'a, C: PipelineContext> Next<'a, C> {
    pub(crate) fn new(remaining: &'a [Stage<C>]) -> Self {
        Self { remaining }
    }

    /// Runs the remainder of the chain.
    pub fn run<'b>(
        self,
        ctx: &'b mut C,
        cancel: &'b CancellationToken,
    ) -> BoxFuture<'b, StageResult>
    where
        'a: 'b,
    {
        Box::pin(run_stages(self.remaining, ctx, cancel))
    }
}

/// Driver loop: walks the stage list, passing an explicit continuation to
/// decorators and stopping as soon as a validator sets the response.
pub(crate) async fn run_stages<C: PipelineContext>(
    stages: &[Stage<C>],
    ctx: &mut C,
    cancel: &CancellationToken,
) -> StageResult {
    for (idx, stage) in stages.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        match stage {
            Stage::Decorator(d) => {
                tracing::trace!(stage = d.name(), "entering decorator");
                let next = Next::new(&stages[idx + 1..]);
                return d.decorate(ctx, next, cancel).await;
            }
            Stage::Validator(v) => {
                tracing::trace!(stage = v.name(), "running validator");
                v.validate(ctx, cancel).await?;
                if ctx.has_response() {
                    tracing::debug!(stage = v.name(), "validator terminated the chain");
                    return Ok(());
                }
            }
            Stage::Handler(h) => {
                tracing::trace!(stage = h.name(), "running handler");
                h.handle(ctx, cancel).await?;
                if !ctx.has_response() {
                    return Err(PipelineError::MissingResponse { handler: h.name() });
                }
                return Ok(());
            }
        }
    }

    Ok(())
}
