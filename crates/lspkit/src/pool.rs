//! A small pool of replica clients behind one handle: requests are load
//! balanced across replicas, while lifecycle operations that must reach
//! every replica (`initialize` happens per [`Client::connect`], but
//! `workspace/didChangeConfiguration` broadcasts and pool-wide `shutdown`
//! do not) fan out and wait for every reply before resolving.
//!
//! The fan-in for a broadcast is the same [`crate::channels::many_shot`]
//! primitive `Transport` uses internally for a single request awaiting one
//! reply, just with one send per replica instead of one send per frame.

use crate::channels::many_shot;
use crate::client::{Client, ClientOptions};
use lspkit_core::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How [`Pool::pick`] selects a replica for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalancePolicy {
    RoundRobin,
    Random,
}

/// N independently-connected clients, load balanced for per-request traffic
/// and jointly addressable for broadcasts.
pub struct Pool {
    replicas: Vec<Arc<Client>>,
    policy: BalancePolicy,
    next: AtomicUsize,
}

impl Pool {
    /// Connect every replica concurrently. `options` holds one
    /// [`ClientOptions`] per replica, since each needs its own
    /// [`crate::supervisor::FallbackChain`] to spawn its own server (or
    /// dial its own socket). If any replica fails to connect, every replica
    /// that did connect is shut down and the first error is returned.
    pub async fn connect(options: Vec<ClientOptions>, policy: BalancePolicy) -> Result<Arc<Pool>> {
        if options.is_empty() {
            return Err(Error::Internal("a pool needs at least one replica".into()));
        }
        let attempts = futures::future::join_all(options.into_iter().map(Client::connect)).await;

        let mut replicas = Vec::with_capacity(attempts.len());
        let mut first_error = None;
        for attempt in attempts {
            match attempt {
                Ok(client) => replicas.push(client),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(_) => {}
            }
        }

        if let Some(e) = first_error {
            futures::future::join_all(replicas.into_iter().map(|r| r.shutdown())).await;
            return Err(e);
        }

        Ok(Arc::new(Pool {
            replicas,
            policy,
            next: AtomicUsize::new(0),
        }))
    }

    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    pub fn replicas(&self) -> &[Arc<Client>] {
        &self.replicas
    }

    /// Select one replica to handle a single request, per `policy`.
    pub fn pick(&self) -> Arc<Client> {
        let index = match self.policy {
            BalancePolicy::RoundRobin => self.next.fetch_add(1, Ordering::Relaxed) % self.replicas.len(),
            BalancePolicy::Random => rand::random::<usize>() % self.replicas.len(),
        };
        self.replicas[index].clone()
    }

    /// Fan a plain notification out to every replica and wait until all of
    /// them have enqueued it. A send failure on one replica does not stop
    /// the others; every failure is reported once all sends have completed.
    pub async fn broadcast_notify(&self, method: impl Into<String> + Clone + Send + 'static, params: serde_json::Value) -> Result<()> {
        let (tx, rx) = many_shot(self.replicas.len());
        for replica in &self.replicas {
            let tx = tx.clone();
            let replica = replica.clone();
            let method = method.clone();
            let params = params.clone();
            tokio::spawn(async move {
                let result = replica.notify(method, params).map(|_| serde_json::Value::Null);
                tx.send(result);
            });
        }
        let results = rx.recv().await?;
        results.into_iter().collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    /// Broadcast `workspace/didChangeConfiguration` to every replica.
    pub async fn did_change_configuration(&self, settings: serde_json::Value) -> Result<()> {
        self.broadcast_notify(
            "workspace/didChangeConfiguration",
            serde_json::to_value(lsp_types::DidChangeConfigurationParams { settings })?,
        )
        .await
    }

    /// Shut down every replica concurrently and wait for all of them to
    /// finish. The first error (if any) is returned once every replica has
    /// been given the chance to tear down.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = many_shot(self.replicas.len());
        for replica in self.replicas.iter().cloned() {
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = replica.shutdown().await.map(|_| serde_json::Value::Null);
                tx.send(result);
            });
        }
        let results = rx.recv().await?;
        results.into_iter().collect::<Result<Vec<_>>>()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_cycles_through_every_replica_index() {
        let next = AtomicUsize::new(0);
        let indices: Vec<_> = (0..5).map(|_| next.fetch_add(1, Ordering::Relaxed) % 3).collect();
        assert_eq!(indices, vec![0, 1, 2, 0, 1]);
    }

    #[tokio::test]
    async fn broadcast_fan_in_waits_for_every_reply() {
        let (tx, rx) = many_shot(3);
        for i in 0..3 {
            let tx = tx.clone();
            tokio::spawn(async move {
                tx.send(Ok(serde_json::json!(i)));
            });
        }
        let mut values: Vec<_> = rx.recv().await.unwrap().into_iter().map(|v| v.unwrap()).collect();
        values.sort_by_key(|v| v.as_i64().unwrap());
        assert_eq!(values, vec![serde_json::json!(0), serde_json::json!(1), serde_json::json!(2)]);
    }

    #[tokio::test]
    async fn broadcast_fan_in_surfaces_a_failure_from_any_replica() {
        let (tx, rx) = many_shot(2);
        tx.send(Ok(serde_json::json!(null)));
        tx.send(Err(Error::Internal("replica unreachable".into())));
        let results = rx.recv().await.unwrap();
        assert!(results.into_iter().collect::<Result<Vec<_>>>().is_err());
    }
}
