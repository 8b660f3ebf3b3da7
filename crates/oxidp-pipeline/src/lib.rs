//! # oxidp-pipeline
//!
//! Composable request pipeline engine for the OxIdP authorization server.
//!
//! This crate provides the generic middleware-composition mechanism the
//! protocol endpoints are built on:
//!
//! - Stage abstractions: [`Decorator`], [`Validator`], [`Handler`]
//! - [`PipelineBuilder`] compiling an ordered stage list, bound to a context
//!   type, into one executable chain at configuration time
//! - [`Dispatcher`] routing a runtime context instance to its compiled chain
//!
//! ## Contract
//!
//! The terminal response on the context is write-once: the first stage to
//! set it owns the outcome, and once it is set no further validator or the
//! handler runs. Decorators are the only stages that run "around" a
//! short-circuited chain. Configuration errors (zero or multiple handlers,
//! stages after the handler, duplicate context registrations) fail fast at
//! startup.
//!
//! ## Example
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .decorator(LoadClient::new(clients))
//!     .validator(RedirectUriValidator::new())
//!     .handler(AuthorizeHandler::new(codes))
//!     .build()?;
//!
//! let dispatcher = Dispatcher::builder().register(pipeline).build()?;
//! dispatcher.dispatch(&mut ctx, &cancel).await?;
//! ```

pub mod dispatcher;
pub mod error;
pub mod pipeline;
pub mod stage;

pub use dispatcher::{DispatchableContext, Dispatcher, DispatcherBuilder};
pub use error::{BoxError, PipelineError};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use stage::{Decorator, Handler, Next, PipelineContext, Stage, StageResult, Validator};
