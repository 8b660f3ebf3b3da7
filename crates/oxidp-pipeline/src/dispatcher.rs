//! Dispatcher: routes a runtime context instance to its compiled chain.
//!
//! Chains are registered per concrete context type at configuration time.
//! At runtime the dispatcher resolves the chain by the context's `TypeId`;
//! an unrecognized context type is an internal configuration error, never a
//! user-facing one.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::stage::{PipelineContext, StageResult};

/// A context instance the dispatcher can route: any pipeline context that is
/// also `Any` (automatic for all `'static` types).
pub trait DispatchableContext: PipelineContext + Any {
    /// Upcasts to `Any` for `TypeId`-based routing.
    fn as_any_mut(&mut self) -> &mut (dyn Any + Send);
}

impl<C: PipelineContext + Any> DispatchableContext for C {
    fn as_any_mut(&mut self) -> &mut (dyn Any + Send) {
        self
    }
}

/// Type-erased compiled chain stored in the routing table.
trait ErasedPipeline: Send + Sync {
    fn execute<'a>(
        &'a self,
        ctx: &'a mut (dyn Any + Send),
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, StageResult>;
}

struct Route<C>(Pipeline<C>);

impl<C: PipelineContext> ErasedPipeline for Route<C> {
    fn execute<'a>(
        &'a self,
        ctx: &'a mut (dyn Any + Send),
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let ctx = ctx
                .downcast_mut::<C>()
                .ok_or(PipelineError::UnknownContextType {
                    context: std::any::type_name::<C>(),
                })?;
            self.0.execute(ctx, cancel).await
        })
    }
}

/// Routing table from concrete context type to compiled chain.
///
/// Built once at startup via [`DispatcherBuilder`]; shared immutably across
/// concurrent request executions afterwards.
pub struct Dispatcher {
    routes: HashMap<TypeId, Box<dyn ErasedPipeline>>,
}

impl Dispatcher {
    /// Starts building a dispatcher.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Routes the context to the chain compiled for its concrete type and
    /// executes it.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownContextType`] if no chain was registered for
    /// the context's type, plus any error the chain itself produces.
    pub async fn dispatch<C: DispatchableContext>(
        &self,
        ctx: &mut C,
        cancel: &CancellationToken,
    ) -> StageResult {
        let type_id = TypeId::of::<C>();
        let route = self
            .routes
            .get(&type_id)
            .ok_or(PipelineError::UnknownContextType {
                context: std::any::type_name::<C>(),
            })?;

        route.execute(ctx.as_any_mut(), cancel).await
    }

    /// Returns the number of registered context types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no chains are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Configuration-time registry of compiled chains.
#[derive(Default)]
pub struct DispatcherBuilder {
    routes: HashMap<TypeId, Box<dyn ErasedPipeline>>,
    duplicate: Option<&'static str>,
}

impl DispatcherBuilder {
    /// Registers the chain for a context type.
    ///
    /// Registering the same context type twice is recorded and reported by
    /// [`build`](Self::build).
    #[must_use]
    pub fn register<C: PipelineContext>(mut self, pipeline: Pipeline<C>) -> Self {
        let previous = self
            .routes
            .insert(TypeId::of::<C>(), Box::new(Route(pipeline)));
        if previous.is_some() && self.duplicate.is_none() {
            self.duplicate = Some(std::any::type_name::<C>());
        }
        self
    }

    /// Finalizes the routing table.
    ///
    /// # Errors
    ///
    /// [`PipelineError::DuplicateContextType`] if any context type was
    /// registered more than once.
    pub fn build(self) -> Result<Dispatcher, PipelineError> {
        if let Some(context) = self.duplicate {
            return Err(PipelineError::DuplicateContextType { context });
        }

        tracing::debug!(routes = self.routes.len(), "dispatcher configured");
        Ok(Dispatcher {
            routes: self.routes,
        })
    }
}
