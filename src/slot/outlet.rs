use dioxus::prelude::*;

use super::{SlotBinding, SlotDispatch, SlotHandle};
use crate::instance::{ComponentInstance, InstanceHost};
use crate::utils::CCStr;

/// Mounts `slot` at this position of the tree.
///
/// Instances routed to the slot are rendered here, in the order they were
/// rendered, as regular descendants: contexts provided above the outlet are
/// visible to them. An inert slot renders nothing.
#[component]
pub fn SlotOutlet(slot: SlotHandle) -> Element {
    match slot.binding() {
        Some(binding) => rsx! {
            MountedSlot { name: slot.name().clone(), binding: binding.clone() }
        },
        None => {
            log::debug!("SlotOutlet {} is inert", slot.name());
            rsx! {}
        }
    }
}

#[component]
fn MountedSlot(name: CCStr, binding: SlotBinding) -> Element {
    let instances = use_signal(Vec::<ComponentInstance>::new);
    let dispatch = SlotDispatch::new(instances);

    use_hook({
        let name = name.clone();
        let binding = binding.clone();
        move || binding.mount(&name, dispatch)
    });
    use_drop({
        let name = name.clone();
        move || binding.unmount(&name, dispatch)
    });

    log::debug!("MountedSlot {name} Rendered");

    rsx! {
        for (key, instance) in instances().into_iter().map(|i| (i.key(), i)) {
            InstanceHost { key: "{key}", instance }
        }
    }
}
