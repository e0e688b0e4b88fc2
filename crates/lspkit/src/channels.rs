//! One-shot / many-shot completions and the pending-response table.

use lspkit_core::id::RequestId;
use lspkit_core::{Error, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

/// A value a pending request resolves to: either the server's `result`, or
/// the error it mapped from a JSON-RPC error response / transport failure.
pub type Completion = Result<Value>;

/// The sending half of a one-shot completion. A second [`OneShotTx::send`]
/// is a programmer error and is reported rather than silently dropped.
pub struct OneShotTx(Option<oneshot::Sender<Completion>>);

impl OneShotTx {
    pub fn send(mut self, value: Completion) -> std::result::Result<(), Completion> {
        match self.0.take() {
            Some(tx) => tx.send(value).map_err(|v| v),
            None => Err(value),
        }
    }
}

pub struct OneShotRx(oneshot::Receiver<Completion>);

impl OneShotRx {
    pub async fn recv(self) -> Completion {
        match self.0.await {
            Ok(value) => value,
            Err(_) => Err(Error::TransportClosed(
                "one-shot completion dropped before a value arrived".into(),
            )),
        }
    }
}

pub fn one_shot() -> (OneShotTx, OneShotRx) {
    let (tx, rx) = oneshot::channel();
    (OneShotTx(Some(tx)), OneShotRx(rx))
}

struct ManyShotInner {
    expected: usize,
    collected: Vec<Completion>,
    completion: Option<oneshot::Sender<Vec<Completion>>>,
}

/// The sending half of a many-shot completion: accumulates `expected`
/// values (one per pool replica) before the receiver resolves.
#[derive(Clone)]
pub struct ManyShotTx(Arc<Mutex<ManyShotInner>>);

impl ManyShotTx {
    /// Returns `true` if this send completed the many-shot (all expected
    /// values have now arrived).
    pub fn send(&self, value: Completion) -> bool {
        let mut inner = self.0.lock();
        inner.collected.push(value);
        if inner.collected.len() >= inner.expected {
            if let Some(tx) = inner.completion.take() {
                let _ = tx.send(std::mem::take(&mut inner.collected));
            }
            true
        } else {
            false
        }
    }
}

pub struct ManyShotRx(oneshot::Receiver<Vec<Completion>>);

impl ManyShotRx {
    pub async fn recv(self) -> Result<Vec<Completion>> {
        self.0.await.map_err(|_| {
            Error::TransportClosed("many-shot completion dropped before filling".into())
        })
    }
}

/// Create a many-shot pair expecting exactly `expected` sends before the
/// receiver resolves. `expected == 0` resolves immediately with an empty
/// vector.
pub fn many_shot(expected: usize) -> (ManyShotTx, ManyShotRx) {
    let (tx, rx) = oneshot::channel();
    let completion = if expected == 0 {
        let _ = tx.send(Vec::new());
        None
    } else {
        Some(tx)
    };
    let inner = Arc::new(Mutex::new(ManyShotInner {
        expected: expected.max(1),
        collected: Vec::new(),
        completion,
    }));
    (ManyShotTx(inner), ManyShotRx(rx))
}

enum PendingEntry {
    One(OneShotTx),
    Many(ManyShotTx),
}

/// Keyed registry of in-flight requests, shared between the read loop
/// (producer) and every task that called `request()` (consumer).
///
/// Invariant: at any moment the table contains exactly the ids
/// of requests whose futures are still pending.
#[derive(Default)]
pub struct PendingTable {
    entries: Mutex<HashMap<RequestId, PendingEntry>>,
    empty_notify: tokio::sync::Notify,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_one(&self, id: RequestId) -> Result<OneShotRx> {
        let (tx, rx) = one_shot();
        let mut entries = self.entries.lock();
        if entries.contains_key(&id) {
            return Err(Error::Internal(format!("request id {id} already pending")));
        }
        entries.insert(id, PendingEntry::One(tx));
        Ok(rx)
    }

    pub fn register_many(&self, id: RequestId, expected: usize) -> Result<ManyShotRx> {
        let (tx, rx) = many_shot(expected);
        let mut entries = self.entries.lock();
        if entries.contains_key(&id) {
            return Err(Error::Internal(format!("request id {id} already pending")));
        }
        entries.insert(id, PendingEntry::Many(tx));
        Ok(rx)
    }

    /// Fulfil the entry for `id`. Returns `true` if a pending entry existed;
    /// an unknown id is the caller's cue to log-and-drop.
    pub fn complete(&self, id: &RequestId, value: Completion) -> bool {
        let mut entries = self.entries.lock();
        let found = match entries.remove(id) {
            Some(PendingEntry::One(tx)) => {
                let _ = tx.send(value);
                true
            }
            Some(PendingEntry::Many(many)) => {
                let done = many.send(value);
                if !done {
                    entries.insert(id.clone(), PendingEntry::Many(many));
                }
                true
            }
            None => false,
        };
        if found && entries.is_empty() {
            self.empty_notify.notify_waiters();
        }
        found
    }

    /// Release an entry without fulfilling it (cancellation: the id must
    /// not leak, but the server is not told to cancel).
    pub fn release(&self, id: &RequestId) {
        let mut entries = self.entries.lock();
        entries.remove(id);
        if entries.is_empty() {
            self.empty_notify.notify_waiters();
        }
    }

    /// Fail every pending entry with `error` and clear the table (used when
    /// the transport is poisoned).
    pub fn drain_with_error(&self, make_error: impl Fn() -> Error) {
        let mut entries = self.entries.lock();
        for (_, entry) in entries.drain() {
            match entry {
                PendingEntry::One(tx) => {
                    let _ = tx.send(Err(make_error()));
                }
                PendingEntry::Many(many) => {
                    many.send(Err(make_error()));
                }
            }
        }
        self.empty_notify.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until the table is empty (used on shutdown).
    pub async fn wait_complete(&self) {
        loop {
            if self.is_empty() {
                return;
            }
            let notified = self.empty_notify.notified();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn one_shot_completes_with_its_value() {
        let table = PendingTable::new();
        let id = RequestId::Int(1);
        let rx = table.register_one(id.clone()).unwrap();
        assert!(table.complete(&id, Ok(serde_json::json!(42))));
        assert_eq!(rx.recv().await.unwrap(), serde_json::json!(42));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn unknown_id_completion_is_a_no_op() {
        let table = PendingTable::new();
        assert!(!table.complete(&RequestId::Int(99), Ok(serde_json::json!(null))));
    }

    #[tokio::test]
    async fn many_shot_waits_for_every_replica() {
        let table = PendingTable::new();
        let id = RequestId::Str("initialize".into());
        let rx = table.register_many(id.clone(), 3).unwrap();
        assert!(!table.complete(&id, Ok(serde_json::json!(1))));
        assert!(!table.complete(&id, Ok(serde_json::json!(2))));
        assert!(table.complete(&id, Ok(serde_json::json!(3))));
        let values: Vec<_> = rx.recv().await.unwrap().into_iter().map(|v| v.unwrap()).collect();
        assert_eq!(values, vec![serde_json::json!(1), serde_json::json!(2), serde_json::json!(3)]);
    }

    #[tokio::test]
    async fn register_with_duplicate_id_fails() {
        let table = PendingTable::new();
        let id = RequestId::Int(1);
        let _rx = table.register_one(id.clone()).unwrap();
        assert!(table.register_one(id).is_err());
    }

    #[tokio::test]
    async fn drain_fails_every_pending_entry() {
        let table = PendingTable::new();
        let a = table.register_one(RequestId::Int(1)).unwrap();
        let b = table.register_one(RequestId::Int(2)).unwrap();
        table.drain_with_error(|| Error::TransportClosed("eof".into()));
        assert!(a.recv().await.is_err());
        assert!(b.recv().await.is_err());
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn wait_complete_resolves_once_table_drains() {
        let table = Arc::new(PendingTable::new());
        let id = RequestId::Int(1);
        let _rx = table.register_one(id.clone()).unwrap();

        let waiter = {
            let table = table.clone();
            tokio::spawn(async move {
                table.wait_complete().await;
            })
        };
        tokio::task::yield_now().await;
        table.complete(&id, Ok(serde_json::json!(null)));
        waiter.await.unwrap();
    }
}
