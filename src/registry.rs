//! # Shared registry
//!
//! Maps an app key to a `{counter, slot binding}` entry so that independent
//! call sites funnel their instances into one well-known default slot.
//!
//! A [`Registry`] is an ordinary value. Each thread gets a default one through
//! [`Registry::global`], which is what [`SharedSlot`] and controllers use unless
//! another registry is provided as a Dioxus context or injected explicitly.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use dioxus::prelude::*;

use crate::instance::InstanceKey;
use crate::slot::{RenderEnvironment, SlotBinding, SlotDispatch, SlotHandle, SlotOutlet};
use crate::utils::CCStr;

/// Per app key state: the key generator and the binding of the default slot.
///
/// Created lazily on first access and never destroyed.
#[derive(Debug)]
pub struct RegistryEntry {
    app_key: CCStr,
    count: Cell<u64>,
    binding: SlotBinding,
}

impl RegistryEntry {
    fn new(app_key: CCStr) -> Self {
        Self {
            app_key,
            count: Cell::new(0),
            binding: SlotBinding::new(),
        }
    }

    pub fn app_key(&self) -> &CCStr {
        &self.app_key
    }

    /// Post-increments the counter
    pub(crate) fn next_key(&self) -> InstanceKey {
        let key = self.count.get();
        self.count.set(key + 1);
        InstanceKey::new(key)
    }

    pub(crate) fn binding(&self) -> &SlotBinding {
        &self.binding
    }

    /// Dispatch of the mounted default slot of this entry, if any
    pub fn dispatch(&self) -> Option<SlotDispatch> {
        self.binding.dispatch()
    }
}

struct RegistryInner {
    environment: RenderEnvironment,
    entries: RefCell<HashMap<CCStr, Rc<RegistryEntry>>>,
    current: RefCell<Rc<RegistryEntry>>,
    default_slot: SlotHandle,
}

/// Cheap-clone handle over a set of registry entries.
#[derive(Clone)]
pub struct Registry(Rc<RegistryInner>);

impl PartialEq for Registry {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("environment", &self.0.environment)
            .field("current", &self.0.current.borrow().app_key)
            .field("entries", &self.0.entries.borrow().len())
            .finish()
    }
}

thread_local! {
    static GLOBAL_REGISTRY: RefCell<Option<Registry>> = const { RefCell::new(None) };
}

impl Registry {
    /// Creates a registry whose slots follow `environment`.
    ///
    /// The `""` entry and the default slot bound to it are created right away.
    pub fn new(environment: RenderEnvironment) -> Self {
        let root = Rc::new(RegistryEntry::new(CCStr::default()));
        let default_slot =
            SlotHandle::construct("SharedSlot", root.binding.clone(), environment);
        let entries = HashMap::from([(root.app_key.clone(), root.clone())]);
        Self(Rc::new(RegistryInner {
            environment,
            entries: RefCell::new(entries),
            current: RefCell::new(root),
            default_slot,
        }))
    }

    /// The default registry of the current thread, created on first access with
    /// [`RenderEnvironment::default`]
    pub fn global() -> Self {
        GLOBAL_REGISTRY.with(|global| {
            global
                .borrow_mut()
                .get_or_insert_with(|| {
                    log::debug!("registry - creating the default registry");
                    Registry::new(RenderEnvironment::default())
                })
                .clone()
        })
    }

    /// Installs a fresh default registry for the current thread.
    ///
    /// Meant to be called once at startup, before any slot is mounted, to select
    /// the render environment explicitly.
    pub fn init_global(environment: RenderEnvironment) -> Self {
        let registry = Registry::new(environment);
        let previous = GLOBAL_REGISTRY.with(|global| global.replace(Some(registry.clone())));
        if previous.is_some() {
            log::warn!("registry - default registry replaced, existing slots keep the old one");
        }
        registry
    }

    /// The registry provided as a context above the current component, or the
    /// default one
    pub fn current() -> Self {
        try_consume_context::<Registry>().unwrap_or_else(Registry::global)
    }

    pub fn environment(&self) -> RenderEnvironment {
        self.0.environment
    }

    /// The entry for `app_key`, created on first access
    pub fn get_or_create(&self, app_key: &str) -> Rc<RegistryEntry> {
        self.0
            .entries
            .borrow_mut()
            .entry(CCStr::from(app_key))
            .or_insert_with(|| {
                log::debug!("registry - new entry for app key {app_key:?}");
                Rc::new(RegistryEntry::new(CCStr::from(app_key)))
            })
            .clone()
    }

    /// The `""` entry, whose counter also keys instances of custom slots
    pub(crate) fn root_entry(&self) -> Rc<RegistryEntry> {
        self.get_or_create("")
    }

    /// The entry new instances are routed to when their controller has no
    /// mounted custom slot
    pub fn current_entry(&self) -> Rc<RegistryEntry> {
        self.0.current.borrow().clone()
    }

    /// Builds a default slot for `app_key`.
    ///
    /// A non-empty key also makes its entry the current one, so subsequent
    /// renders without a custom slot land in the returned slot. Only one entry is
    /// current at a time: calling this again with another key redirects them.
    /// Slots built earlier stay bound to their own entry.
    pub fn create_shared_slot(&self, app_key: &str) -> SlotHandle {
        if !app_key.is_empty() {
            let entry = self.get_or_create(app_key);
            log::debug!("registry - current entry is now {app_key:?}");
            *self.0.current.borrow_mut() = entry;
        }
        let entry = self.current_entry();
        SlotHandle::construct(
            format!("SharedSlot({})", entry.app_key),
            entry.binding.clone(),
            self.0.environment,
        )
    }

    /// The slot bound to the `""` entry, built once with the registry
    pub fn default_slot(&self) -> SlotHandle {
        self.0.default_slot.clone()
    }
}

/// See [`Registry::create_shared_slot`], on the default registry of the current thread
pub fn create_shared_slot(app_key: &str) -> SlotHandle {
    Registry::global().create_shared_slot(app_key)
}

/// The default placeholder: mount it once near the root of the application.
///
/// Uses the [`Registry`] provided as a context above it, if any, otherwise the
/// default registry of the current thread.
#[component]
pub fn SharedSlot() -> Element {
    let slot = use_hook(|| Registry::current().default_slot());
    rsx! {
        SlotOutlet { slot }
    }
}
