//! Consumer-side flow control: keeps a bounded number of Interests
//! outstanding, retransmits ones that time out before an RTT estimate, and
//! matches returning content objects back to the Interest that requested
//! them.
//!
//! Grounded on `CCNxz/FlowControllerThread.py`: `TxQueueEntry` becomes
//! [`InFlightEntry`], `__window_size`/`__max_window`/`__rtt_estimate` become
//! [`WINDOW_SIZE`]/[`MAX_WINDOW`]/[`RTT_ESTIMATE`], and `__expire_tx_queue` /
//! `__enqueue_tx` / `__receive` become [`FlowController::expire_in_flight`] /
//! [`FlowController::enqueue`] / [`FlowController::receive`]. The Python
//! version's single `net_write_queue` `PriorityQueue` becomes two channels
//! here (`rtx_tx`/`data_tx`) read with a `biased` `select!` on the writer
//! side, so retransmissions still win without needing a priority queue type.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};

use ccnx_wire::{ContentObject, Interest, Message};

/// Interests in flight at once. Matches the reference's fixed `__window_size`.
pub const WINDOW_SIZE: usize = 4;
/// Upper bound the window is allowed to grow to, kept for parity with the
/// reference's `__max_window`; nothing in this transport currently grows
/// the window past [`WINDOW_SIZE`].
pub const MAX_WINDOW: usize = 128;
/// Fixed RTT estimate used both as the retransmission timer and the longest
/// this worker will sleep between polls.
pub const RTT_ESTIMATE: Duration = Duration::from_millis(100);

struct InFlightEntry {
    interest: Interest,
    expiry: Instant,
}

/// Drives one consumer's outstanding-Interest window. Owns no channels
/// itself — [`FlowController::run`] is handed all four it needs to bridge
/// user and network traffic, so callers can wire it into whatever pipeline
/// shape they're building (direct user loop, or behind a manifest
/// processor).
pub struct FlowController {
    window_size: usize,
    rtt_estimate: Duration,
    in_flight: VecDeque<InFlightEntry>,
    rtx_queue: VecDeque<Interest>,
}

impl Default for FlowController {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowController {
    pub fn new() -> Self {
        FlowController {
            window_size: WINDOW_SIZE,
            rtt_estimate: RTT_ESTIMATE,
            in_flight: VecDeque::new(),
            rtx_queue: VecDeque::new(),
        }
    }

    pub fn current_window_size(&self) -> usize {
        self.window_size
    }

    /// Grows or shrinks the window, clamped to [`MAX_WINDOW`].
    pub fn set_window_size(&mut self, window_size: usize) {
        self.window_size = window_size.min(MAX_WINDOW);
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn rtx_queue_len(&self) -> usize {
        self.rtx_queue.len()
    }

    /// Runs the controller until `shutdown` fires or a channel closes:
    /// pulls Interests to send from `user_read_rx`, sends their wire bytes
    /// to `rtx_tx`/`data_tx`, and matches incoming `net_read_rx` messages
    /// back to the window, forwarding matches to `user_write_tx`.
    pub async fn run(
        mut self,
        mut user_read_rx: mpsc::Receiver<Interest>,
        user_write_tx: mpsc::Sender<ContentObject>,
        mut net_read_rx: mpsc::Receiver<Message>,
        rtx_tx: mpsc::Sender<Vec<u8>>,
        data_tx: mpsc::Sender<Vec<u8>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            self.expire_in_flight();
            if self.enqueue(&mut user_read_rx, &rtx_tx, &data_tx).await.is_err() {
                break;
            }

            let wait = self.next_wait();
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(wait) => {},
                maybe_message = net_read_rx.recv() => {
                    match maybe_message {
                        Some(message) => self.receive(message, &user_write_tx).await,
                        None => break,
                    }
                }
            }
        }
    }

    /// Moves any Interest whose RTT-estimate expiry has passed from
    /// `in_flight` to `rtx_queue` — `__expire_tx_queue`. Only the head is
    /// ever checked, matching the reference's documented imprecision: an
    /// RTT estimate that shrinks mid-flight can leave a later entry expired
    /// without noticing until it reaches the head.
    fn expire_in_flight(&mut self) {
        let now = Instant::now();
        while let Some(front) = self.in_flight.front() {
            if front.expiry <= now {
                let expired = self.in_flight.pop_front().unwrap();
                self.rtx_queue.push_back(expired.interest);
            } else {
                break;
            }
        }
    }

    /// Fills the window from `rtx_queue` first, then fresh Interests off
    /// `user_read_rx` — `__enqueue_tx`.
    async fn enqueue(
        &mut self,
        user_read_rx: &mut mpsc::Receiver<Interest>,
        rtx_tx: &mpsc::Sender<Vec<u8>>,
        data_tx: &mpsc::Sender<Vec<u8>>,
    ) -> Result<(), ()> {
        while self.in_flight.len() < self.window_size {
            if let Some(interest) = self.rtx_queue.pop_front() {
                let bytes = Message::Interest(interest.clone()).wire_bytes();
                if rtx_tx.send(bytes).await.is_err() {
                    return Err(());
                }
                self.append_in_flight(interest);
            } else if let Ok(interest) = user_read_rx.try_recv() {
                let bytes = Message::Interest(interest.clone()).wire_bytes();
                if data_tx.send(bytes).await.is_err() {
                    return Err(());
                }
                self.append_in_flight(interest);
            } else {
                break;
            }
        }
        Ok(())
    }

    fn append_in_flight(&mut self, interest: Interest) {
        let expiry = Instant::now() + self.rtt_estimate;
        self.in_flight.push_back(InFlightEntry { interest, expiry });
    }

    /// Matches an incoming message against the window by name, KeyId
    /// restriction, and hash restriction, removing the match and handing
    /// the content object to the user — `__receive`.
    async fn receive(&mut self, message: Message, user_write_tx: &mpsc::Sender<ContentObject>) {
        let co = match message {
            Message::ContentObject(co) => co,
            Message::Interest(_) => {
                log::warn!("flow controller received an Interest from the network, dropping");
                return;
            }
        };
        let hash = Message::ContentObject(co.clone()).content_object_hash();

        let position = self
            .in_flight
            .iter()
            .position(|entry| entry.interest.name == co.name && keyid_ok(&entry.interest, &co) && hash_ok(&entry.interest, &hash));

        match position {
            Some(index) => {
                self.in_flight.remove(index);
                let _ = user_write_tx.send(co).await;
            }
            None => {
                log::warn!("could not match content object {:?} to an in-flight interest", co.name);
            }
        }
    }

    /// How long to sleep before re-checking the window: no more than the
    /// RTT estimate, and no less than the time left until the earliest
    /// in-flight entry expires.
    fn next_wait(&self) -> Duration {
        match self.in_flight.front() {
            Some(entry) => {
                let now = Instant::now();
                if entry.expiry <= now {
                    Duration::ZERO
                } else {
                    (entry.expiry - now).min(self.rtt_estimate)
                }
            }
            None => self.rtt_estimate,
        }
    }
}

fn keyid_ok(interest: &Interest, co: &ContentObject) -> bool {
    match &interest.keyid_restr {
        Some(restr) => co.validation.as_ref().map(|v| &v.keyid == restr).unwrap_or(false),
        None => true,
    }
}

fn hash_ok(interest: &Interest, hash: &[u8; 32]) -> bool {
    match &interest.hash_restr {
        Some(restr) => restr.as_slice() == hash,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccnx_tlv::Name;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[tokio::test]
    async fn matched_reply_is_forwarded_to_user() {
        let controller = FlowController::new();
        let (user_read_tx, user_read_rx) = mpsc::channel(8);
        let (user_write_tx, mut user_write_rx) = mpsc::channel(8);
        let (net_read_tx, net_read_rx) = mpsc::channel(8);
        let (rtx_tx, mut rtx_rx) = mpsc::channel(8);
        let (data_tx, mut data_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(controller.run(user_read_rx, user_write_tx, net_read_rx, rtx_tx, data_tx, shutdown_rx));

        let interest = Interest::new(name("lci:/apple/pie"), None, None);
        user_read_tx.send(interest).await.unwrap();

        let sent = tokio::time::timeout(Duration::from_secs(1), data_rx.recv()).await.unwrap().unwrap();
        assert!(rtx_rx.try_recv().is_err());

        let parsed = ccnx_wire::parser::parse(&sent).unwrap();
        assert!(matches!(parsed.message, Message::Interest(_)));

        let co = ContentObject::new(name("lci:/apple/pie"), Some(1000), Some(vec![1, 2, 3]), None);
        net_read_tx.send(Message::ContentObject(co.clone())).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), user_write_rx.recv()).await.unwrap().unwrap();
        assert_eq!(received.name, co.name);

        shutdown_tx.send(true).unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }

    #[tokio::test]
    async fn unmatched_reply_is_dropped_silently() {
        let controller = FlowController::new();
        let (_user_read_tx, user_read_rx) = mpsc::channel(8);
        let (user_write_tx, mut user_write_rx) = mpsc::channel(8);
        let (net_read_tx, net_read_rx) = mpsc::channel(8);
        let (rtx_tx, _rtx_rx) = mpsc::channel(8);
        let (data_tx, _data_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(controller.run(user_read_rx, user_write_tx, net_read_rx, rtx_tx, data_tx, shutdown_rx));

        let co = ContentObject::new(name("lci:/never/requested"), Some(1000), Some(vec![9]), None);
        net_read_tx.send(Message::ContentObject(co)).await.unwrap();

        let result = tokio::time::timeout(Duration::from_millis(300), user_write_rx.recv()).await;
        assert!(result.is_err(), "nothing should have been forwarded");

        shutdown_tx.send(true).unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }
}
