use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use dioxus::dioxus_core::{NoOpMutations, VirtualDom};
use dioxus::prelude::*;
use dioxus_awaitable::prelude::*;
use dioxus_awaitable::{CCStr, InstanceKey};
use futures_util::FutureExt;

fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

/// Lets slot list changes and unmounts go through the scheduler
fn flush(dom: &mut VirtualDom) {
    for _ in 0..2 {
        dom.render_immediate(&mut NoOpMutations);
    }
}

type Pairs = Rc<RefCell<Vec<SettlePair<u32, String>>>>;

/// Stays mounted until the test settles it through the collected pair
#[derive(Props, Clone, PartialEq)]
struct HeldProps {
    settle: SettlePair<u32, String>,
}
impl SettleProps for HeldProps {
    type Args = Pairs;
    type Value = u32;
    type Reason = String;

    fn with_settle(pairs: Pairs, settle: SettlePair<u32, String>) -> Self {
        pairs.borrow_mut().push(settle.clone());
        Self { settle }
    }
}
#[allow(non_snake_case)]
fn Held(props: HeldProps) -> Element {
    let key = props.settle.key();
    rsx! {
        span { "held {key}" }
    }
}

/// Settles as soon as it is rendered
#[derive(Props, Clone, PartialEq)]
struct AnswerProps {
    outcome: Result<u32, String>,
    settle: SettlePair<u32, String>,
}
impl SettleProps for AnswerProps {
    type Args = Result<u32, String>;
    type Value = u32;
    type Reason = String;

    fn with_settle(outcome: Result<u32, String>, settle: SettlePair<u32, String>) -> Self {
        Self { outcome, settle }
    }
}
#[allow(non_snake_case)]
fn Answer(props: AnswerProps) -> Element {
    use_hook(|| match props.outcome.clone() {
        Ok(value) => props.settle.resolve(value),
        Err(reason) => props.settle.reject(reason),
    });
    rsx! { "answering" }
}

fn shared_app() -> Element {
    rsx! {
        SharedSlot {}
    }
}

#[test]
fn round_trip_resolves_and_empties_the_slot() {
    init_logger();
    let mut dom = VirtualDom::new(shared_app);
    dom.rebuild_in_place();

    let answer = Awaitable::new(Answer);
    let deferred = dom.in_runtime(|| answer.render(Ok(42)));
    let slot = Registry::global().default_slot();
    assert_eq!(slot.live_keys(), vec![deferred.key()]);
    assert_eq!(answer.pending(), 1);

    flush(&mut dom);
    assert_eq!(deferred.now_or_never(), Some(Ok(42)));
    assert!(slot.live_keys().is_empty());
    assert_eq!(answer.pending(), 0);
}

#[test]
fn rejection_reason_is_delivered_verbatim() {
    init_logger();
    let mut dom = VirtualDom::new(shared_app);
    dom.rebuild_in_place();

    let answer = Awaitable::new(Answer);
    let deferred = dom.in_runtime(|| answer.render(Err("cancelled by user".to_owned())));
    flush(&mut dom);
    assert_eq!(
        deferred.now_or_never(),
        Some(Err("cancelled by user".to_owned()))
    );
    assert!(Registry::global().default_slot().live_keys().is_empty());
}

#[test]
fn concurrent_instances_are_independent() {
    init_logger();
    let mut dom = VirtualDom::new(shared_app);
    dom.rebuild_in_place();

    let pairs = Pairs::default();
    let held = Awaitable::new(Held);
    let mut deferreds: Vec<_> =
        dom.in_runtime(|| (0..3).map(|_| held.render(pairs.clone())).collect());
    flush(&mut dom);

    let keys: Vec<InstanceKey> = deferreds.iter().map(|d| d.key()).collect();
    assert_eq!(keys.iter().collect::<HashSet<_>>().len(), 3);
    let slot = Registry::global().default_slot();
    assert_eq!(slot.live_keys(), keys);
    assert_eq!(held.pending(), 3);

    dom.in_runtime(|| pairs.borrow()[1].resolve(7));
    flush(&mut dom);

    assert_eq!(slot.live_keys(), vec![keys[0], keys[2]]);
    assert_eq!(held.pending(), 2);
    assert_eq!(deferreds.remove(1).now_or_never(), Some(Ok(7)));
    for deferred in deferreds.iter_mut() {
        assert!(deferred.now_or_never().is_none());
    }
}

#[test]
fn only_the_first_settle_is_observed() {
    init_logger();
    let mut dom = VirtualDom::new(shared_app);
    dom.rebuild_in_place();

    let pairs = Pairs::default();
    let held = Awaitable::new(Held);
    let deferred = dom.in_runtime(|| held.render(pairs.clone()));
    let other = dom.in_runtime(|| held.render(pairs.clone()));
    flush(&mut dom);

    dom.in_runtime(|| {
        let pair = pairs.borrow()[0].clone();
        pair.reject("first".to_owned());
        pair.resolve(1);
        pair.reject("third".to_owned());
    });
    flush(&mut dom);

    assert_eq!(deferred.now_or_never(), Some(Err("first".to_owned())));
    assert_eq!(
        Registry::global().default_slot().live_keys(),
        vec![other.key()]
    );
    assert_eq!(held.pending(), 1);
}

#[derive(Clone)]
struct RoutingProps {
    held: Awaitable<HeldProps>,
    toggle: Rc<Cell<Option<Signal<bool>>>>,
}

fn routing_app(props: RoutingProps) -> Element {
    let show_custom = use_signal(|| false);
    use_hook(|| props.toggle.set(Some(show_custom)));
    rsx! {
        SharedSlot {}
        if show_custom() {
            SlotOutlet { slot: props.held.slot() }
        }
    }
}

#[test]
fn custom_slot_takes_over_once_mounted() {
    init_logger();
    let pairs = Pairs::default();
    let held = Awaitable::new(Held);
    let toggle = Rc::new(Cell::new(None));
    let mut dom = VirtualDom::new_with_props(
        routing_app,
        RoutingProps {
            held: held.clone(),
            toggle: toggle.clone(),
        },
    );
    dom.rebuild_in_place();
    let shared = Registry::global().default_slot();
    let mut show_custom = toggle.get().unwrap();

    // Not mounted yet: falls back to the shared slot
    let first = dom.in_runtime(|| held.render(pairs.clone()));
    flush(&mut dom);
    assert_eq!(shared.live_keys(), vec![first.key()]);
    assert!(held.slot().dispatch().is_none());

    dom.in_runtime(|| show_custom.set(true));
    flush(&mut dom);
    assert!(held.slot().dispatch().is_some());

    let second = dom.in_runtime(|| held.render(pairs.clone()));
    flush(&mut dom);
    assert_eq!(held.slot().live_keys(), vec![second.key()]);
    // The earlier instance stays where it was placed
    assert_eq!(shared.live_keys(), vec![first.key()]);

    dom.in_runtime(|| pairs.borrow()[0].resolve(1));
    flush(&mut dom);
    assert!(shared.live_keys().is_empty());
    assert_eq!(held.slot().live_keys(), vec![second.key()]);
    assert_eq!(first.now_or_never(), Some(Ok(1)));
}

#[test]
fn settling_after_the_custom_slot_unmounted_is_harmless() {
    init_logger();
    let pairs = Pairs::default();
    let held = Awaitable::new(Held);
    let toggle = Rc::new(Cell::new(None));
    let mut dom = VirtualDom::new_with_props(
        routing_app,
        RoutingProps {
            held: held.clone(),
            toggle: toggle.clone(),
        },
    );
    dom.rebuild_in_place();
    let mut show_custom = toggle.get().unwrap();

    dom.in_runtime(|| show_custom.set(true));
    flush(&mut dom);
    let orphan = dom.in_runtime(|| held.render(pairs.clone()));
    flush(&mut dom);
    assert_eq!(held.slot().live_keys(), vec![orphan.key()]);

    dom.in_runtime(|| show_custom.set(false));
    flush(&mut dom);
    assert!(held.slot().dispatch().is_none());

    // The removal targets a torn-down list and must be dropped silently
    dom.in_runtime(|| pairs.borrow()[0].resolve(5));
    flush(&mut dom);
    assert_eq!(orphan.now_or_never(), Some(Ok(5)));
    assert_eq!(held.pending(), 0);

    // Next renders fall back to the shared slot
    let next = dom.in_runtime(|| held.render(pairs.clone()));
    flush(&mut dom);
    assert_eq!(
        Registry::global().default_slot().live_keys(),
        vec![next.key()]
    );
}

#[derive(Clone)]
struct ForkProps {
    forked: Awaitable<HeldProps>,
}

fn fork_app(props: ForkProps) -> Element {
    rsx! {
        SharedSlot {}
        SlotOutlet { slot: props.forked.slot() }
    }
}

#[test]
fn forks_do_not_share_custom_slots() {
    init_logger();
    let pairs = Pairs::default();
    let held = Awaitable::new(Held);
    let forked = held.fork();
    let mut dom = VirtualDom::new_with_props(
        fork_app,
        ForkProps {
            forked: forked.clone(),
        },
    );
    dom.rebuild_in_place();

    let through_fork = dom.in_runtime(|| forked.render(pairs.clone()));
    let through_original = dom.in_runtime(|| held.render(pairs.clone()));
    flush(&mut dom);

    assert_eq!(forked.slot().live_keys(), vec![through_fork.key()]);
    assert!(held.slot().live_keys().is_empty());
    assert_eq!(
        Registry::global().default_slot().live_keys(),
        vec![through_original.key()]
    );
}

#[test]
fn custom_slot_keys_stay_unique_when_the_current_entry_moves() {
    init_logger();
    let registry = Registry::new(RenderEnvironment::Interactive);
    let pairs = Pairs::default();
    let held = Awaitable::with_registry(Held, registry.clone());
    let mut dom = VirtualDom::new_with_props(
        fork_app,
        ForkProps {
            forked: held.clone(),
        },
    );
    dom.rebuild_in_place();

    let first = dom.in_runtime(|| held.render(pairs.clone()));
    registry.create_shared_slot("A");
    let second = dom.in_runtime(|| held.render(pairs.clone()));
    flush(&mut dom);

    assert_ne!(first.key(), second.key());
    assert_eq!(held.slot().live_keys(), vec![first.key(), second.key()]);

    // Without a custom slot the new current entry keys from its own counter
    let shared = dom.in_runtime(|| {
        Awaitable::with_registry(Held, registry.clone()).render(pairs.clone())
    });
    assert_eq!(shared.key(), InstanceKey::new(0));
}

#[test]
fn failed_push_is_not_tracked() {
    init_logger();
    let registry = Registry::new(RenderEnvironment::Interactive);
    let pairs = Pairs::default();
    let held = Awaitable::with_registry(Held, registry.clone());
    let mut dom = VirtualDom::new_with_props(
        fork_app,
        ForkProps {
            forked: held.clone(),
        },
    );
    dom.rebuild_in_place();
    let dispatch = held.slot().dispatch().unwrap();

    // Rendering while the list is being updated finds it borrowed
    let mut dropped = None;
    dom.in_runtime(|| {
        dispatch
            .apply_update(&CCStr::from("busy"), |list| {
                dropped = Some(held.render(pairs.clone()));
                list
            })
            .unwrap()
    });
    flush(&mut dom);
    assert_eq!(held.pending(), 0);
    assert!(held.slot().live_keys().is_empty());

    dom.in_runtime(|| pairs.borrow()[0].resolve(1));
    flush(&mut dom);
    assert_eq!(held.pending(), 0);
    assert_eq!(dropped.unwrap().now_or_never(), Some(Ok(1)));

    // The slot keeps working afterwards
    let next = dom.in_runtime(|| held.render(pairs.clone()));
    flush(&mut dom);
    assert_eq!(held.slot().live_keys(), vec![next.key()]);
    assert_eq!(held.pending(), 1);
}

#[derive(Clone)]
struct KeyedProps {
    registry: Registry,
    a: SlotHandle,
    b: SlotHandle,
}

fn keyed_app(props: KeyedProps) -> Element {
    use_context_provider(|| props.registry.clone());
    rsx! {
        div {
            SlotOutlet { slot: props.a.clone() }
        }
        div {
            SlotOutlet { slot: props.b.clone() }
        }
    }
}

#[test]
fn keyed_shared_slots_are_isolated() {
    init_logger();
    let registry = Registry::new(RenderEnvironment::Interactive);
    let a = registry.create_shared_slot("A");
    let b = registry.create_shared_slot("B");
    let pairs = Pairs::default();
    let held = Awaitable::with_registry(Held, registry.clone());

    let mut dom = VirtualDom::new_with_props(
        keyed_app,
        KeyedProps {
            registry: registry.clone(),
            a: a.clone(),
            b: b.clone(),
        },
    );
    dom.rebuild_in_place();

    let in_b = dom.in_runtime(|| held.render(pairs.clone()));
    flush(&mut dom);
    assert_eq!(b.live_keys(), vec![in_b.key()]);
    assert!(a.live_keys().is_empty());

    // Rebinding the current entry redirects new renders, B keeps its instance
    registry.create_shared_slot("A");
    let in_a = dom.in_runtime(|| held.render(pairs.clone()));
    flush(&mut dom);
    assert_eq!(a.live_keys(), vec![in_a.key()]);
    assert_eq!(b.live_keys(), vec![in_b.key()]);

    dom.in_runtime(|| pairs.borrow()[0].resolve(1));
    flush(&mut dom);
    assert!(b.live_keys().is_empty());
    assert_eq!(a.live_keys(), vec![in_a.key()]);
}

#[derive(Clone, PartialEq)]
struct Theme(&'static str);

#[derive(Props, Clone, PartialEq)]
struct ThemeReaderProps {
    settle: SettlePair<&'static str, ()>,
}
impl SettleProps for ThemeReaderProps {
    type Args = ();
    type Value = &'static str;
    type Reason = ();

    fn with_settle(_: (), settle: SettlePair<&'static str, ()>) -> Self {
        Self { settle }
    }
}
#[allow(non_snake_case)]
fn ThemeReader(props: ThemeReaderProps) -> Element {
    let theme = use_context::<Theme>();
    use_hook(|| props.settle.resolve(theme.0));
    rsx! {}
}

fn themed_app() -> Element {
    use_context_provider(|| Theme("dark"));
    rsx! {
        main {
            SharedSlot {}
        }
    }
}

#[test]
fn instances_see_contexts_provided_above_the_slot() {
    init_logger();
    let mut dom = VirtualDom::new(themed_app);
    dom.rebuild_in_place();

    let reader = Awaitable::new(ThemeReader);
    let deferred = dom.in_runtime(|| reader.render(()));
    flush(&mut dom);
    assert_eq!(deferred.now_or_never(), Some(Ok("dark")));
}

#[derive(Clone)]
struct ProvidedProps {
    registry: Registry,
    controller: Rc<RefCell<Option<Awaitable<HeldProps>>>>,
}

fn provided_app(props: ProvidedProps) -> Element {
    use_context_provider(|| props.registry.clone());
    rsx! {
        SharedSlot {}
        Consumer { controller: props.controller.clone() }
    }
}

#[component]
fn Consumer(controller: Rc<RefCell<Option<Awaitable<HeldProps>>>>) -> Element {
    let held = use_awaitable(Held);
    use_hook(|| *controller.borrow_mut() = Some(held));
    rsx! {}
}

#[test]
fn static_environment_renders_nothing() {
    init_logger();
    let registry = Registry::new(RenderEnvironment::Static);
    let controller = Rc::new(RefCell::new(None));
    let mut dom = VirtualDom::new_with_props(
        provided_app,
        ProvidedProps {
            registry: registry.clone(),
            controller: controller.clone(),
        },
    );
    dom.rebuild_in_place();

    let held = controller.borrow().clone().unwrap();
    assert_eq!(held.registry(), registry);
    assert!(registry.default_slot().is_inert());
    assert!(held.slot().is_inert());

    let pairs = Pairs::default();
    let mut deferred = dom.in_runtime(|| held.render(pairs.clone()));
    flush(&mut dom);
    assert!(registry.default_slot().live_keys().is_empty());
    assert_eq!(held.pending(), 0);
    assert!((&mut deferred).now_or_never().is_none());
}

#[test]
fn use_awaitable_picks_up_the_provided_registry() {
    init_logger();
    let registry = Registry::new(RenderEnvironment::Interactive);
    let controller = Rc::new(RefCell::new(None));
    let mut dom = VirtualDom::new_with_props(
        provided_app,
        ProvidedProps {
            registry: registry.clone(),
            controller: controller.clone(),
        },
    );
    dom.rebuild_in_place();

    let held = controller.borrow().clone().unwrap();
    assert_eq!(held.registry(), registry);

    let pairs = Pairs::default();
    let deferred = dom.in_runtime(|| held.render(pairs.clone()));
    flush(&mut dom);
    assert_eq!(registry.default_slot().live_keys(), vec![deferred.key()]);
    // The thread default registry is left alone
    assert!(Registry::global().default_slot().live_keys().is_empty());
}
