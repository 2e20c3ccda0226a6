//! Tests for notification sinks

use super::*;
use crate::update::{UpdateEvent, UpdateEventKind};
use parking_lot::Mutex;

struct CountingSink {
    delivered: Mutex<usize>,
    fail: bool,
}

impl CountingSink {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            delivered: Mutex::new(0),
            fail,
        })
    }

    fn delivered(&self) -> usize {
        *self.delivered.lock()
    }
}

impl NotificationSink for CountingSink {
    fn deliver(&self, _event: &UpdateEvent) -> Result<(), SinkError> {
        *self.delivered.lock() += 1;
        if self.fail {
            Err(SinkError::Delivery("webview destroyed".to_string()))
        } else {
            Ok(())
        }
    }
}

#[test]
fn test_channel_sink_delivers_in_order() {
    let (sink, mut rx) = ChannelSink::new();
    sink.deliver(&UpdateEvent::new(UpdateEventKind::Checking, None))
        .unwrap();
    sink.deliver(&UpdateEvent::new(UpdateEventKind::NotAvailable, None))
        .unwrap();

    assert_eq!(rx.try_recv().unwrap().kind, UpdateEventKind::Checking);
    assert_eq!(rx.try_recv().unwrap().kind, UpdateEventKind::NotAvailable);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_channel_sink_closed() {
    let (sink, rx) = ChannelSink::new();
    drop(rx);
    let result = sink.deliver(&UpdateEvent::idle());
    assert!(matches!(result, Err(SinkError::Closed)));
}

#[test]
fn test_fanout_reaches_every_sink() {
    let first = CountingSink::new(false);
    let second = CountingSink::new(false);
    let fanout = FanoutSink::default()
        .with(first.clone())
        .with(second.clone());

    assert_eq!(fanout.len(), 2);
    fanout.deliver(&UpdateEvent::idle()).unwrap();

    assert_eq!(first.delivered(), 1);
    assert_eq!(second.delivered(), 1);
}

#[test]
fn test_fanout_failure_does_not_stop_delivery() {
    let broken = CountingSink::new(true);
    let healthy = CountingSink::new(false);
    let sinks: Vec<Arc<dyn NotificationSink>> = vec![broken.clone(), healthy.clone()];
    let fanout = FanoutSink::new(sinks);

    let result = fanout.deliver(&UpdateEvent::disabled());

    assert!(matches!(result, Err(SinkError::Delivery(_))));
    assert_eq!(broken.delivered(), 1);
    assert_eq!(healthy.delivered(), 1);
}

#[test]
fn test_empty_fanout() {
    let fanout = FanoutSink::default();
    assert!(fanout.is_empty());
    assert!(fanout.deliver(&UpdateEvent::idle()).is_ok());
}

#[test]
fn test_sink_error_messages() {
    assert_eq!(SinkError::Closed.to_string(), "Notification channel closed");
    assert_eq!(
        SinkError::Delivery("gone".to_string()).to_string(),
        "Failed to deliver notification: gone"
    );
}
