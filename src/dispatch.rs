//! Notification fan-out with two independent delivery modes: typed
//! listeners and a best-effort named-message send to an optional target.

/// Handle returned by [`Dispatcher::subscribe`]; pass it back to
/// [`Dispatcher::unsubscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Receiver end of the named-message send. Unknown message names should be
/// ignored, not rejected; delivery is best-effort by contract.
pub trait MessageTarget<E> {
    fn receive(&mut self, message: &'static str, payload: &E);
}

pub struct Dispatcher<E> {
    listeners: Vec<(ListenerId, Box<dyn FnMut(&E)>)>,
    target: Option<Box<dyn MessageTarget<E>>>,
    next_listener: u64,
}

impl<E> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Dispatcher<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            target: None,
            next_listener: 0,
        }
    }

    /// Registers a typed listener. Every notification passes the listener a
    /// borrow of the payload, in subscription order.
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false when the handle was already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    /// Installs the named-send target, replacing any previous one.
    pub fn set_message_target(&mut self, target: impl MessageTarget<E> + 'static) {
        self.target = Some(Box::new(target));
    }

    pub fn clear_message_target(&mut self) {
        self.target = None;
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn has_message_target(&self) -> bool {
        self.target.is_some()
    }

    /// Delivers to listeners first, then forwards the named message to the
    /// target when one is installed. No receiver at all is fine.
    pub(crate) fn notify(&mut self, message: &'static str, payload: &E) {
        for (_, listener) in &mut self.listeners {
            listener(payload);
        }
        if let Some(target) = self.target.as_mut() {
            target.receive(message, payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<&'static str>>>);

    impl MessageTarget<u32> for Recorder {
        fn receive(&mut self, message: &'static str, _payload: &u32) {
            self.0.borrow_mut().push(message);
        }
    }

    #[test]
    fn listeners_receive_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher: Dispatcher<u32> = Dispatcher::new();

        let first = Rc::clone(&seen);
        dispatcher.subscribe(move |payload| first.borrow_mut().push(("first", *payload)));
        let second = Rc::clone(&seen);
        dispatcher.subscribe(move |payload| second.borrow_mut().push(("second", *payload)));

        dispatcher.notify("msg", &7);
        assert_eq!(*seen.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher: Dispatcher<u32> = Dispatcher::new();

        let sink = Rc::clone(&seen);
        let id = dispatcher.subscribe(move |payload| sink.borrow_mut().push(*payload));

        dispatcher.notify("msg", &1);
        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));
        dispatcher.notify("msg", &2);

        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(dispatcher.listener_count(), 0);
    }

    #[test]
    fn named_send_reaches_the_target() {
        let messages = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher: Dispatcher<u32> = Dispatcher::new();
        dispatcher.set_message_target(Recorder(Rc::clone(&messages)));

        dispatcher.notify("touch_began", &0);
        dispatcher.notify("touch_ended", &0);

        assert_eq!(*messages.borrow(), vec!["touch_began", "touch_ended"]);
    }

    #[test]
    fn absent_receivers_are_tolerated() {
        let mut dispatcher: Dispatcher<u32> = Dispatcher::new();
        dispatcher.notify("msg", &1);

        dispatcher.set_message_target(Recorder(Rc::new(RefCell::new(Vec::new()))));
        dispatcher.clear_message_target();
        dispatcher.notify("msg", &2);

        assert!(!dispatcher.has_message_target());
    }
}
