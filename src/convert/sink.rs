//! Status notifications
//!
//! Human-readable progress lines for whoever drives a conversion. Delivery is
//! fire-and-forget: a sink that drops or reorders messages does not affect the result.

use std::sync::mpsc::Sender;

/// Receiver of status lines
pub trait StatusSink: Send + Sync {
    fn status(&self, message: &str);
}

impl<F> StatusSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn status(&self, message: &str) {
        self(message)
    }
}

impl StatusSink for Sender<String> {
    fn status(&self, message: &str) {
        // A closed receiver means nobody is listening anymore
        let _ = self.send(message.to_string());
    }
}

/// Discards every message
impl StatusSink for () {
    fn status(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::mpsc;

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |message: &str| seen.lock().unwrap().push(message.to_string());
        sink.status("one");
        sink.status("two");
        assert_eq!(*seen.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::channel::<String>();
        tx.status("hello");
        assert_eq!(rx.recv().unwrap(), "hello");
        drop(rx);
        tx.status("nobody listens");
    }
}
