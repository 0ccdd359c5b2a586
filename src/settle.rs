//! # Settle pairs and deferred outcomes
//!
//! Every on-demand component receives a [`SettlePair`] among its props. Calling
//! [`SettlePair::resolve`] or [`SettlePair::reject`] settles the [`Deferred`]
//! returned to whoever rendered the component, and removes the component from
//! the slot displaying it.
//!
//! Only the first settle call counts. Later calls are ignored, so a component may
//! freely wire `resolve` to a button and `reject` to a backdrop click without
//! guarding against both firing.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::FutureExt;
use tokio::sync::oneshot;

use crate::instance::InstanceKey;
use crate::utils::EqCheapClone;

/// Props of a component that can be rendered on demand by an
/// [`Awaitable`](crate::Awaitable).
///
/// The props type must embed the [`SettlePair`] handed over by
/// [`SettleProps::with_settle`] and the component must eventually call exactly
/// one of its `resolve`/`reject` methods. A component that never settles stays
/// in its slot for as long as the slot lives.
///
/// # Examples
///
/// ```rust,ignore
/// use dioxus::prelude::*;
/// use dioxus_awaitable::prelude::*;
///
/// #[derive(Props, Clone, PartialEq)]
/// struct ConfirmProps {
///     message: String,
///     settle: SettlePair<bool, ()>,
/// }
///
/// impl SettleProps for ConfirmProps {
///     type Args = String;
///     type Value = bool;
///     type Reason = ();
///
///     fn with_settle(message: String, settle: SettlePair<bool, ()>) -> Self {
///         Self { message, settle }
///     }
/// }
///
/// fn Confirm(props: ConfirmProps) -> Element {
///     let yes = props.settle.clone();
///     let no = props.settle.clone();
///     rsx! {
///         p { "{props.message}" }
///         button { onclick: move |_| yes.resolve(true), "Yes" }
///         button { onclick: move |_| no.resolve(false), "No" }
///     }
/// }
/// ```
pub trait SettleProps: Clone + 'static {
    /// What the caller supplies to [`Awaitable::render`](crate::Awaitable::render)
    type Args;
    /// Success value delivered by [`SettlePair::resolve`]
    type Value: 'static;
    /// Failure value delivered by [`SettlePair::reject`]
    type Reason: 'static;

    /// Merge the caller's arguments with the settle pair of a new instance
    fn with_settle(args: Self::Args, settle: SettlePair<Self::Value, Self::Reason>) -> Self;
}

struct SettleState<V, R> {
    key: InstanceKey,
    sender: RefCell<Option<oneshot::Sender<Result<V, R>>>>,
    on_settled: RefCell<Option<Box<dyn FnOnce()>>>,
    settled: Cell<bool>,
}

impl<V, R> Drop for SettleState<V, R> {
    fn drop(&mut self) {
        if !self.settled.get() {
            log::warn!(
                "settle_pair - instance {} dropped without settling, its deferred will never complete",
                self.key
            );
        }
    }
}

/// The `resolve`/`reject` pair injected into an on-demand component's props.
///
/// Cloning is cheap and every clone settles the same instance. Two pairs are
/// equal only when they are clones of one another.
pub struct SettlePair<V, R>(EqCheapClone<SettleState<V, R>>);

impl<V, R> Clone for SettlePair<V, R> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
impl<V, R> PartialEq for SettlePair<V, R> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<V, R> core::fmt::Debug for SettlePair<V, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlePair")
            .field("key", &self.0.key)
            .field("settled", &self.0.settled.get())
            .finish()
    }
}

impl<V, R> SettlePair<V, R> {
    /// Creates a settle pair and the deferred it completes
    pub(crate) fn new(key: InstanceKey) -> (Self, Deferred<V, R>) {
        let (sender, receiver) = oneshot::channel();
        let pair = Self(EqCheapClone::new(SettleState {
            key,
            sender: RefCell::new(Some(sender)),
            on_settled: RefCell::new(None),
            settled: Cell::new(false),
        }));
        let deferred = Deferred {
            key,
            receiver,
            abandoned: false,
        };
        (pair, deferred)
    }

    /// Registers the teardown to run on the first settle call, before the outcome is delivered.
    ///
    /// Runs it right away if the pair already settled.
    pub(crate) fn on_settled(&self, teardown: impl FnOnce() + 'static) {
        if self.is_settled() {
            teardown();
            return;
        }
        *self.0.on_settled.borrow_mut() = Some(Box::new(teardown));
    }

    /// Key of the instance this pair belongs to
    pub fn key(&self) -> InstanceKey {
        self.0.key
    }

    /// `true` once `resolve` or `reject` has been called
    pub fn is_settled(&self) -> bool {
        self.0.settled.get()
    }

    /// Completes the deferred with `Ok(value)`
    pub fn resolve(&self, value: V) {
        self.settle(Ok(value))
    }

    /// Completes the deferred with `Err(reason)`, the reason is delivered untouched
    pub fn reject(&self, reason: R) {
        self.settle(Err(reason))
    }

    fn settle(&self, outcome: Result<V, R>) {
        let key = self.0.key;
        let Some(sender) = self.0.sender.borrow_mut().take() else {
            log::debug!("settle_pair - instance {key} already settled, ignoring");
            return;
        };
        self.0.settled.set(true);
        log::debug!(
            "settle_pair - instance {key} settled ({})",
            if outcome.is_ok() { "resolved" } else { "rejected" }
        );

        let teardown = self.0.on_settled.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }

        if sender.send(outcome).is_err() {
            log::debug!("settle_pair - deferred of instance {key} was dropped by the caller");
        }
    }
}

/// Outcome of an on-demand render, completed by the instance's [`SettlePair`].
///
/// Resolves to `Ok(value)` or `Err(reason)` exactly as passed to the settle pair.
/// If the instance is dropped without settling (for example its slot was
/// unmounted while it was still showing) the deferred never completes.
#[must_use = "the outcome of the rendered component is only observable by awaiting the Deferred"]
pub struct Deferred<V, R> {
    key: InstanceKey,
    receiver: oneshot::Receiver<Result<V, R>>,
    abandoned: bool,
}

impl<V, R> Deferred<V, R> {
    /// Key of the instance that will settle this deferred
    pub fn key(&self) -> InstanceKey {
        self.key
    }
}

impl<V, R> core::fmt::Debug for Deferred<V, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("key", &self.key)
            .field("abandoned", &self.abandoned)
            .finish_non_exhaustive()
    }
}

impl<V, R> Future for Deferred<V, R> {
    type Output = Result<V, R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.abandoned {
            return Poll::Pending;
        }
        match self.receiver.poll_unpin(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => {
                // The receiver must not be polled again once it returned Ready
                self.abandoned = true;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
