//! The dispatcher, its registry, and the behavior chain.
//!
//! Handlers are registered against concrete request types and stored
//! type-erased behind [`TypeId`] keys. Dispatching a request opens one
//! persistence session, threads it through the behavior chain, and hands
//! the request to its single handler. Behaviors wrap onion-style: the
//! first-registered behavior runs outermost, the last sits closest to the
//! handler.

use crate::error::{AppError, AppResult};
use crate::outcome::Outcome;
use crate::request::{is_transactional, Request};
use async_trait::async_trait;
use inkpost_domain::{SessionFactory, UnitOfWork};
use inkpost_types::CancelToken;
use std::any::{Any, TypeId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// Per-request state: the session and the cancellation token.
///
/// One context is built per dispatched request and shared by every behavior
/// and the handler; nothing outlives the dispatch.
pub struct RequestContext {
    pub uow: Box<dyn UnitOfWork>,
    pub cancel: CancelToken,
}

/// What behaviors may know about the request without seeing its type.
pub struct RequestInfo {
    pub name: &'static str,
    pub transactional: bool,
}

/// The single handler for a request type.
#[async_trait]
pub trait Handler<R: Request>: Send + Sync + 'static {
    async fn handle(&self, request: R, ctx: &RequestContext) -> AppResult<Outcome<R::Response>>;
}

type ErasedPayload = Box<dyn Any + Send>;
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The remainder of the chain, ending at the handler. Consumed by running.
pub struct Next<'a> {
    run: Box<dyn FnOnce() -> BoxFuture<'a, AppResult<ErasedPayload>> + Send + 'a>,
}

impl<'a> Next<'a> {
    pub async fn run(self) -> AppResult<ErasedPayload> {
        (self.run)().await
    }
}

/// A cross-cutting step wrapped around every dispatched request.
///
/// A behavior must call `next.run()` exactly once on the pass-through path;
/// short-circuiting without running it drops the request on the floor.
#[async_trait]
pub trait Behavior: Send + Sync {
    async fn handle(
        &self,
        info: &RequestInfo,
        ctx: &RequestContext,
        next: Next<'_>,
    ) -> AppResult<ErasedPayload>;
}

// ── Type erasure ─────────────────────────────────────────────────

#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn call(&self, request: ErasedPayload, ctx: &RequestContext) -> AppResult<ErasedPayload>;
}

struct TypedHandler<R, H> {
    inner: H,
    _marker: PhantomData<fn(R)>,
}

#[async_trait]
impl<R: Request, H: Handler<R>> ErasedHandler for TypedHandler<R, H> {
    async fn call(&self, request: ErasedPayload, ctx: &RequestContext) -> AppResult<ErasedPayload> {
        let request = request
            .downcast::<R>()
            .map_err(|_| AppError::TypeMismatch(R::NAME))?;
        let outcome = self.inner.handle(*request, ctx).await?;
        Ok(Box::new(outcome))
    }
}

struct RegisteredHandler {
    name: &'static str,
    transactional: bool,
    handler: Box<dyn ErasedHandler>,
}

// ── Registry and dispatch ────────────────────────────────────────

/// Collects handlers and behaviors, rejecting misconfiguration up front.
pub struct DispatcherBuilder {
    handlers: HashMap<TypeId, RegisteredHandler>,
    behaviors: Vec<Arc<dyn Behavior>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            behaviors: Vec::new(),
        }
    }

    /// Registers the sole handler for `R`. The transaction classification
    /// is computed here, once, and stored on the registry entry.
    pub fn handler<R: Request, H: Handler<R>>(mut self, handler: H) -> AppResult<Self> {
        match self.handlers.entry(TypeId::of::<R>()) {
            Entry::Occupied(_) => Err(AppError::DuplicateHandler(R::NAME)),
            Entry::Vacant(slot) => {
                slot.insert(RegisteredHandler {
                    name: R::NAME,
                    transactional: is_transactional::<R>(),
                    handler: Box::new(TypedHandler {
                        inner: handler,
                        _marker: PhantomData,
                    }),
                });
                Ok(self)
            }
        }
    }

    /// Appends a behavior. Registration order is execution order, outermost
    /// first.
    pub fn behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behaviors.push(Arc::new(behavior));
        self
    }

    pub fn build(self, sessions: Arc<dyn SessionFactory>) -> Dispatcher {
        Dispatcher {
            handlers: self.handlers,
            behaviors: self.behaviors,
            sessions,
        }
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes each request to its single handler through the behavior chain.
pub struct Dispatcher {
    handlers: HashMap<TypeId, RegisteredHandler>,
    behaviors: Vec<Arc<dyn Behavior>>,
    sessions: Arc<dyn SessionFactory>,
}

impl Dispatcher {
    /// Dispatches with a fresh, never-cancelled token.
    pub async fn send<R: Request>(&self, request: R) -> AppResult<Outcome<R::Response>> {
        self.send_with(request, CancelToken::new()).await
    }

    /// Dispatches a request, opening one session for its whole lifetime.
    pub async fn send_with<R: Request>(
        &self,
        request: R,
        cancel: CancelToken,
    ) -> AppResult<Outcome<R::Response>> {
        let registered = self
            .handlers
            .get(&TypeId::of::<R>())
            .ok_or(AppError::HandlerNotFound(R::NAME))?;

        let uow = self.sessions.open_session().await?;
        let ctx = RequestContext { uow, cancel };
        let info = RequestInfo {
            name: registered.name,
            transactional: registered.transactional,
        };
        debug!(
            request = info.name,
            transactional = info.transactional,
            "dispatching"
        );

        let payload: ErasedPayload = Box::new(request);
        let handler = registered.handler.as_ref();
        let ctx_ref = &ctx;
        let info_ref = &info;
        let mut next = Next {
            run: Box::new(move || handler.call(payload, ctx_ref)),
        };
        for behavior in self.behaviors.iter().rev() {
            let behavior = behavior.as_ref();
            let inner = next;
            next = Next {
                run: Box::new(move || behavior.handle(info_ref, ctx_ref, inner)),
            };
        }

        let response = next.run().await?;
        let outcome = response
            .downcast::<Outcome<R::Response>>()
            .map_err(|_| AppError::TypeMismatch(R::NAME))?;
        Ok(*outcome)
    }
}
