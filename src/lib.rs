//! # Awaitable components for Dioxus
//!
//! Render a component on demand and `await` its outcome instead of juggling
//! `is_open` signals and callback props.
//!
//! An [`Awaitable`] wraps a component whose props embed a [`SettlePair`]. Each
//! call to [`Awaitable::render`] mounts a fresh instance into a slot and returns
//! a [`Deferred`]; the instance calls `resolve` or `reject` when it is done,
//! disappears from the slot, and the deferred completes with that outcome.
//!
//! ## Core Concepts
//!
//! - [`SettleProps`]/[`SettlePair`]: the contract on-demand component props fulfil
//! - [`SharedSlot`]: the default placeholder, mounted once near the root
//! - [`Awaitable::slot`]: a placeholder dedicated to one controller, mounted
//!   wherever its instances should appear
//! - [`Registry`]: key allocation and default-slot bookkeeping, one per thread by
//!   default, optionally provided as a context
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use dioxus::prelude::*;
//! use dioxus_awaitable::prelude::*;
//!
//! fn App() -> Element {
//!     let confirm = use_awaitable(Confirm);
//!     rsx! {
//!         SharedSlot {}
//!         button {
//!             onclick: move |_| {
//!                 let answer = confirm.render("Really?".to_owned());
//!                 spawn(async move { log::info!("answer: {:?}", answer.await) });
//!             },
//!             "Ask"
//!         }
//!     }
//! }
//! ```

mod controller;
mod error;
mod instance;
mod registry;
mod settle;
mod slot;
mod utils;

pub use controller::{use_awaitable, Awaitable};
pub use error::DispatchError;
pub use instance::{ComponentInstance, InstanceKey};
pub use registry::{create_shared_slot, Registry, RegistryEntry, SharedSlot};
pub use settle::{Deferred, SettlePair, SettleProps};
pub use slot::{RenderEnvironment, SlotBinding, SlotDispatch, SlotHandle, SlotOutlet};
pub use utils::CCStr;

/// Everything needed to declare, render and mount awaitable components.
///
/// # Example
///
/// ```rust,ignore
/// use dioxus_awaitable::prelude::*;
/// ```
pub mod prelude {
    pub use super::controller::{use_awaitable, Awaitable};
    pub use super::registry::{create_shared_slot, Registry, SharedSlot};
    pub use super::settle::{Deferred, SettlePair, SettleProps};
    pub use super::slot::{RenderEnvironment, SlotHandle, SlotOutlet};
}
