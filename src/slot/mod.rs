//! # Slots
//!
//! A slot is a placeholder that renders the on-demand component instances
//! routed to it, in the order they were rendered.
//!
//! ## Core Concepts
//!
//! - [`SlotHandle`]: the placeholder description, mounted with [`SlotOutlet`]
//!   (or [`SlotHandle::render`])
//! - [`SlotBinding`]: where a mounted outlet publishes its [`SlotDispatch`], and
//!   where controllers and registry entries look it up
//! - [`SlotDispatch`]: the only way to change a mounted slot's instance list,
//!   through functional updates
//! - [`RenderEnvironment`]: whether slots are interactive at all. In a
//!   [`RenderEnvironment::Static`] environment slots are inert: they render
//!   nothing and register nothing.

mod outlet;

pub use outlet::SlotOutlet;

use std::cell::RefCell;

use dioxus::prelude::*;

use crate::error::DispatchError;
use crate::instance::{ComponentInstance, InstanceKey};
use crate::utils::{CCStr, EqCheapClone};

/// Capability flag selecting the slot implementation.
///
/// Chosen once when the [`Registry`](crate::Registry) is built. The default is
/// [`RenderEnvironment::Interactive`] unless the `ssr` feature is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEnvironment {
    /// Slots hold state and render their instances
    Interactive,
    /// Server-side or otherwise non-interactive rendering: slots are inert
    Static,
}
impl Default for RenderEnvironment {
    fn default() -> Self {
        if cfg!(feature = "ssr") {
            Self::Static
        } else {
            Self::Interactive
        }
    }
}

/// Functional-update access to the instance list of a mounted slot.
///
/// Every change replaces the list as a whole, `prev -> next`, so that Dioxus
/// sees each change as a new value. Updates against a slot that has been
/// unmounted are rejected with [`DispatchError::Unmounted`].
#[derive(Clone, Copy, PartialEq)]
pub struct SlotDispatch {
    instances: Signal<Vec<ComponentInstance>>,
}

impl core::fmt::Debug for SlotDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Formatting the signal itself would read a possibly dropped value
        f.debug_struct("SlotDispatch")
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

impl SlotDispatch {
    pub(crate) fn new(instances: Signal<Vec<ComponentInstance>>) -> Self {
        Self { instances }
    }

    /// Replaces the instance list with `update(previous)`
    pub fn apply_update(
        &self,
        slot: &CCStr,
        update: impl FnOnce(Vec<ComponentInstance>) -> Vec<ComponentInstance>,
    ) -> Result<(), DispatchError> {
        let mut instances = self.instances;
        let mut write = instances
            .try_write()
            .map_err(|e| DispatchError::from_borrow(slot.clone(), e))?;
        let previous = std::mem::take(&mut *write);
        *write = update(previous);
        Ok(())
    }

    /// Appends `instance`, leaving the existing ones untouched
    pub(crate) fn push(
        &self,
        slot: &CCStr,
        instance: ComponentInstance,
    ) -> Result<(), DispatchError> {
        let key = instance.key();
        self.apply_update(slot, move |mut instances| {
            instances.push(instance);
            instances
        })?;
        log::debug!("slot {slot} - instance {key} added");
        Ok(())
    }

    /// Removes the instance identified by `id`, wherever it sits in the list
    pub(crate) fn remove(&self, slot: &CCStr, id: uuid::Uuid, key: InstanceKey) {
        match self.apply_update(slot, move |mut instances| {
            instances.retain(|i| i.id() != id);
            instances
        }) {
            Ok(()) => log::debug!("slot {slot} - instance {key} removed"),
            // The list went away with its placeholder, nothing left to remove from
            Err(DispatchError::Unmounted { .. }) => {
                log::debug!("slot {slot} - instance {key} settled after unmount, ignoring")
            }
            Err(e) => log::warn!("slot {slot} - could not remove instance {key}: {e}"),
        }
    }

    /// Keys of the instances currently in the list, in render order
    pub fn live_keys(&self) -> Vec<InstanceKey> {
        match self.instances.try_peek() {
            Ok(instances) => instances.iter().map(ComponentInstance::key).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// `false` once the owning placeholder has been unmounted
    pub fn is_alive(&self) -> bool {
        self.instances.try_peek().is_ok()
    }
}

/// Shared cell through which a mounted outlet publishes its [SlotDispatch].
///
/// When the same slot is mounted in several places at once, the most recent
/// mount wins. Unmounting only clears the binding if it still refers to the
/// unmounted outlet's own list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotBinding(EqCheapClone<RefCell<Option<SlotDispatch>>>);

impl SlotBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dispatch of the currently mounted outlet, if any
    pub fn dispatch(&self) -> Option<SlotDispatch> {
        *self.0.borrow()
    }

    pub(crate) fn mount(&self, name: &CCStr, dispatch: SlotDispatch) {
        if let Some(previous) = self.0.replace(Some(dispatch)) {
            if previous != dispatch && previous.is_alive() {
                log::warn!("slot {name} - mounted again while already mounted, the newest mount takes over");
            }
        }
        log::debug!("slot {name} - mounted");
    }

    pub(crate) fn unmount(&self, name: &CCStr, dispatch: SlotDispatch) {
        let mut current = self.0.borrow_mut();
        if *current == Some(dispatch) {
            *current = None;
            log::debug!("slot {name} - unmounted");
        } else {
            log::debug!("slot {name} - unmounted a superseded mount, binding kept");
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SlotKind {
    Interactive(SlotBinding),
    Inert,
}

/// A mountable placeholder for on-demand component instances.
///
/// Mount it with [`SlotOutlet`]:
///
/// ```rust,ignore
/// rsx! {
///     SlotOutlet { slot: confirm.slot() }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SlotHandle {
    name: CCStr,
    kind: SlotKind,
}

impl SlotHandle {
    /// Builds a placeholder publishing its dispatch into `binding` when mounted.
    ///
    /// In a [`RenderEnvironment::Static`] environment the handle is inert and the
    /// binding is never touched.
    pub fn construct(
        name: impl Into<CCStr>,
        binding: SlotBinding,
        environment: RenderEnvironment,
    ) -> Self {
        let kind = match environment {
            RenderEnvironment::Interactive => SlotKind::Interactive(binding),
            RenderEnvironment::Static => SlotKind::Inert,
        };
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &CCStr {
        &self.name
    }

    pub fn is_inert(&self) -> bool {
        matches!(self.kind, SlotKind::Inert)
    }

    pub(crate) fn binding(&self) -> Option<&SlotBinding> {
        match &self.kind {
            SlotKind::Interactive(binding) => Some(binding),
            SlotKind::Inert => None,
        }
    }

    /// Dispatch of the currently mounted outlet for this slot
    pub fn dispatch(&self) -> Option<SlotDispatch> {
        self.binding().and_then(SlotBinding::dispatch)
    }

    /// Keys of the instances currently shown by this slot, in render order
    pub fn live_keys(&self) -> Vec<InstanceKey> {
        self.dispatch()
            .map(|dispatch| dispatch.live_keys())
            .unwrap_or_default()
    }

    /// The outlet element, for direct use inside `rsx!`
    pub fn render(&self) -> Element {
        rsx! {
            SlotOutlet { slot: self.clone() }
        }
    }
}
