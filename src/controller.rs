use std::cell::{Cell, RefCell};
use std::rc::Rc;

use dioxus::prelude::*;

use crate::instance::ComponentInstance;
use crate::registry::Registry;
use crate::settle::{Deferred, SettlePair, SettleProps};
use crate::slot::{SlotBinding, SlotHandle};
use crate::utils::CCStr;

struct AwaitableInner<P: SettleProps> {
    component: fn(P) -> Element,
    name: CCStr,
    registry: Option<Registry>,
    custom_slot: RefCell<Option<SlotHandle>>,
    pending: Rc<Cell<usize>>,
}

/// Renders a component on demand and hands back its outcome as a [`Deferred`].
///
/// Build one per on-demand component and reuse it: every [`Awaitable::render`]
/// creates a fresh, independent instance. Instances show up in the controller's
/// own slot when it is mounted (see [`Awaitable::slot`]), otherwise in the
/// current shared slot of the registry.
///
/// Cloning the handle shares the controller, custom slot included. Use
/// [`Awaitable::fork`] to get an independent custom slot over the same component.
///
/// # Examples
///
/// ```rust,ignore
/// #[component]
/// fn DeleteButton() -> Element {
///     let confirm = use_awaitable(Confirm);
///     rsx! {
///         button {
///             onclick: move |_| {
///                 let answer = confirm.render("Delete the file?".to_owned());
///                 spawn(async move {
///                     if answer.await == Ok(true) {
///                         log::info!("deleting");
///                     }
///                 });
///             },
///             "Delete"
///         }
///     }
/// }
/// ```
pub struct Awaitable<P: SettleProps>(Rc<AwaitableInner<P>>);

impl<P: SettleProps> Clone for Awaitable<P> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
impl<P: SettleProps> PartialEq for Awaitable<P> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl<P: SettleProps> core::fmt::Debug for Awaitable<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Awaitable")
            .field("name", &self.0.name)
            .field("pending", &self.0.pending.get())
            .finish_non_exhaustive()
    }
}

impl<P: SettleProps> Awaitable<P> {
    /// Wraps `component`. Nothing is rendered until [`Awaitable::render`] is called.
    pub fn new(component: fn(P) -> Element) -> Self {
        Self::build(component, None)
    }

    /// Like [`Awaitable::new`] but routing to `registry` instead of the default one
    pub fn with_registry(component: fn(P) -> Element, registry: Registry) -> Self {
        Self::build(component, Some(registry))
    }

    fn build(component: fn(P) -> Element, registry: Option<Registry>) -> Self {
        Self(Rc::new(AwaitableInner {
            component,
            name: CCStr::from(short_type_name::<P>()),
            registry,
            custom_slot: RefCell::new(None),
            pending: Rc::new(Cell::new(0)),
        }))
    }

    /// A controller over the same component with its own, unmounted, custom slot.
    ///
    /// Needed when the same on-demand component is mounted at two places: each
    /// place gets its own fork so that their instance lists stay apart.
    pub fn fork(&self) -> Self {
        Self::build(self.0.component, self.0.registry.clone())
    }

    /// The registry this controller allocates keys from and falls back to
    pub fn registry(&self) -> Registry {
        self.0.registry.clone().unwrap_or_else(Registry::global)
    }

    /// This controller's own slot, built on first call and the same afterwards.
    ///
    /// Once mounted, subsequent renders show up there instead of the shared slot.
    pub fn slot(&self) -> SlotHandle {
        self.0
            .custom_slot
            .borrow_mut()
            .get_or_insert_with(|| {
                SlotHandle::construct(
                    format!("{}::Slot", self.0.name),
                    SlotBinding::new(),
                    self.registry().environment(),
                )
            })
            .clone()
    }

    /// Number of instances rendered by this controller that have not settled yet
    pub fn pending(&self) -> usize {
        self.0.pending.get()
    }

    /// Renders a new instance of the component with `args` and its settle pair.
    ///
    /// The returned [`Deferred`] completes with whatever the instance passes to
    /// `resolve`/`reject`. The instance leaves its slot as soon as it settles.
    pub fn render(&self, args: P::Args) -> Deferred<P::Value, P::Reason> {
        let registry = self.registry();
        let entry = registry.current_entry();

        let custom = self
            .0
            .custom_slot
            .borrow()
            .as_ref()
            .and_then(SlotHandle::binding)
            .filter(|binding| binding.dispatch().is_some())
            .cloned();
        let custom_target = custom.is_some();
        let (slot_name, binding) = match custom {
            Some(binding) => (format!("{}::Slot", self.0.name), binding),
            None => (
                format!("SharedSlot({})", entry.app_key()),
                entry.binding().clone(),
            ),
        };
        let slot_name = CCStr::from(slot_name);

        // A custom slot outlives changes of the current entry: key it from the root counter
        let key = if custom_target {
            registry.root_entry().next_key()
        } else {
            entry.next_key()
        };
        let (settle, deferred) = SettlePair::new(key);
        let props = P::with_settle(args, settle.clone());
        let instance = ComponentInstance::new(self.0.component, props, key);
        let id = instance.id();

        let Some(dispatch) = binding.dispatch() else {
            log::warn!(
                "awaitable {} - no slot mounted, instance {key} will never be rendered",
                self.0.name
            );
            return deferred;
        };

        log::debug!("awaitable {} - rendering instance {key} in {slot_name}", self.0.name);
        if let Err(e) = dispatch.push(&slot_name, instance) {
            log::warn!("awaitable {} - instance {key} dropped: {e}", self.0.name);
            return deferred;
        }

        let pending = self.0.pending.clone();
        pending.set(pending.get() + 1);
        settle.on_settled(move || {
            pending.set(pending.get().saturating_sub(1));
            // A released binding means the slot is gone and took the instance with it
            if binding.dispatch().is_none() {
                log::debug!("awaitable - {slot_name} unmounted before instance {key} settled");
                return;
            }
            dispatch.remove(&slot_name, id, key);
        });
        deferred
    }
}

fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    let path = name.split('<').next().unwrap_or(name);
    path.rsplit("::").next().unwrap_or(path)
}

/// Creates an [`Awaitable`] for the lifetime of the calling component.
///
/// Keys are allocated from the [`Registry`] provided as a context above the
/// caller, if any, otherwise from the default one.
pub fn use_awaitable<P: SettleProps>(component: fn(P) -> Element) -> Awaitable<P> {
    use_hook(|| match try_consume_context::<Registry>() {
        Some(registry) => Awaitable::with_registry(component, registry),
        None => Awaitable::new(component),
    })
}
