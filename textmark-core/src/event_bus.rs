use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    PagesInit { count: usize },
    PageChanging { page_number: usize },
    PageRendered { page_number: usize, error: Option<String> },
    TextLayerRendered { page_number: usize, nodes: usize },
    ScaleChanged { scale: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PagesInit,
    PageChanging,
    PageRendered,
    TextLayerRendered,
    ScaleChanged,
}

impl ViewerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PagesInit { .. } => EventKind::PagesInit,
            Self::PageChanging { .. } => EventKind::PageChanging,
            Self::PageRendered { .. } => EventKind::PageRendered,
            Self::TextLayerRendered { .. } => EventKind::TextLayerRendered,
            Self::ScaleChanged { .. } => EventKind::ScaleChanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&ViewerEvent) + Send + Sync>;

/// Publish/subscribe hub between the viewer and whoever cares about page
/// lifecycle. Listeners run synchronously on the dispatching call.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<EventKind, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&ViewerEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Returns whether a listener was actually removed.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(entries) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        before != entries.len()
    }

    pub fn dispatch(&self, event: ViewerEvent) {
        // Snapshot so listeners can (un)subscribe while being called.
        let snapshot: Vec<Listener> = match self.listeners.lock().get(&event.kind()) {
            Some(entries) if !entries.is_empty() => {
                entries.iter().map(|(_, l)| Arc::clone(l)).collect()
            }
            _ => return,
        };
        for listener in snapshot {
            listener(&event);
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.lock().get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.lock();
        f.debug_struct("EventBus")
            .field("kinds", &listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_reaches_only_matching_listeners() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        bus.on(EventKind::PagesInit, move |event| sink.lock().push(event.clone()));

        bus.dispatch(ViewerEvent::ScaleChanged { scale: 2.0 });
        bus.dispatch(ViewerEvent::PagesInit { count: 3 });

        assert_eq!(*seen.lock(), vec![ViewerEvent::PagesInit { count: 3 }]);
    }

    #[test]
    fn off_removes_only_the_given_listener() {
        let bus = EventBus::new();
        let counter = Arc::new(Mutex::new(0));

        let first = Arc::clone(&counter);
        let id = bus.on(EventKind::ScaleChanged, move |_| *first.lock() += 1);
        let second = Arc::clone(&counter);
        bus.on(EventKind::ScaleChanged, move |_| *second.lock() += 10);

        assert!(bus.off(EventKind::ScaleChanged, id));
        assert!(!bus.off(EventKind::ScaleChanged, id));
        assert!(!bus.off(EventKind::PagesInit, id));

        bus.dispatch(ViewerEvent::ScaleChanged { scale: 1.0 });
        assert_eq!(*counter.lock(), 10);
        assert_eq!(bus.listener_count(EventKind::ScaleChanged), 1);
    }

    #[test]
    fn listener_may_subscribe_during_dispatch() {
        let bus = Arc::new(EventBus::new());
        let calls = Arc::new(Mutex::new(0));

        let inner_bus = Arc::clone(&bus);
        let inner_calls = Arc::clone(&calls);
        bus.on(EventKind::PagesInit, move |_| {
            *inner_calls.lock() += 1;
            let nested = Arc::clone(&inner_calls);
            inner_bus.on(EventKind::PagesInit, move |_| *nested.lock() += 100);
        });

        bus.dispatch(ViewerEvent::PagesInit { count: 1 });
        assert_eq!(*calls.lock(), 1);

        bus.dispatch(ViewerEvent::PagesInit { count: 1 });
        assert_eq!(*calls.lock(), 102);
    }
}
