//! Dedicated notifier thread (§5): state-change callbacks run off the
//! player thread so a slow or buggy consumer callback can never stall
//! decode/mix work or deadlock by calling back into the player.

use std::sync::mpsc::{self, Sender};

use super::state::StateEvent;

pub struct Notifier {
    tx: Option<Sender<StateEvent>>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Notifier {
    /// Spawns the consumer thread now; `on_event` runs there, never on the
    /// caller's thread.
    pub fn spawn(on_event: impl Fn(StateEvent) + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel::<StateEvent>();
        let handle = std::thread::spawn(move || {
            while let Ok(event) = rx.recv() {
                on_event(event);
            }
        });
        Self { tx: Some(tx), handle: Some(handle) }
    }

    /// Enqueue an event; never blocks the player thread (unbounded channel,
    /// per §5's "must never await/block on the consumer" rule).
    pub fn notify(&self, event: StateEvent) {
        // A disconnected receiver (consumer dropped) is not the player's
        // problem to report.
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        // Drop the sender first so the consumer thread's `recv` loop
        // terminates, then join it.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::state::PlaybackState;
    use std::sync::{Arc, Mutex};

    #[test]
    fn events_are_delivered_in_order_off_caller_thread() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        let notifier = Notifier::spawn(move |event| {
            received_clone.lock().unwrap().push(event.position_samples);
        });

        for i in 0..5u64 {
            notifier.notify(StateEvent {
                state: PlaybackState::Playing,
                position_samples: i,
                duration_samples: 100,
                current_track_id: Some(1),
                preset: None,
                timestamp_ms: 0,
            });
        }

        drop(notifier);
        assert_eq!(*received.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
