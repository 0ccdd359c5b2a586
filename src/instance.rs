use std::rc::Rc;

use dioxus::prelude::*;
use uuid::Uuid;

/// Key of a component instance, unique within the registry entry that allocated it.
///
/// Used as the list-diffing key when the instance is rendered by its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceKey(u64);
impl InstanceKey {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
    pub const fn value(self) -> u64 {
        self.0
    }
}
impl core::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One live activation of an on-demand component: the component function, its
/// merged props and the key it is rendered under.
///
/// Instances are compared by identity, two renders with identical props are
/// still two different instances.
#[derive(Clone)]
pub struct ComponentInstance {
    id: Uuid,
    key: InstanceKey,
    name: &'static str,
    render: Rc<dyn Fn() -> Element>,
}

impl ComponentInstance {
    pub(crate) fn new<P: Clone + 'static>(
        component: fn(P) -> Element,
        props: P,
        key: InstanceKey,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            name: std::any::type_name::<P>(),
            render: Rc::new(move || component(props.clone())),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> InstanceKey {
        self.key
    }

    fn render(&self) -> Element {
        (self.render)()
    }
}

impl PartialEq for ComponentInstance {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl core::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Hosts a single instance. The slot keys each host by [InstanceKey] so the
/// instance keeps its hook state while siblings come and go.
#[component]
pub(crate) fn InstanceHost(instance: ComponentInstance) -> Element {
    let key = instance.key();
    log::debug!("InstanceHost {key} Rendered");
    use_drop(move || log::debug!("InstanceHost {key} Dropped"));
    instance.render()
}
