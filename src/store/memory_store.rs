use crate::store::{StateStore, StoreOp};
use anyhow::{anyhow, Result};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

#[derive(Default)]
struct State {
    strings: HashMap<String, (String, Option<Instant>)>,
    lists: HashMap<String, VecDeque<String>>,
    zsets: HashMap<String, Vec<(f64, String)>>,
}

impl State {
    fn live_string(&mut self, key: &str) -> Option<&String> {
        let expired = self
            .strings
            .get(key)
            .is_some_and(|(_, deadline)| deadline.is_some_and(|d| Instant::now() >= d));
        if expired {
            self.strings.remove(key);
            return None;
        }
        self.strings.get(key).map(|(v, _)| v)
    }
}

/// Single-process stand-in for the shared store, with the same atomicity per call.
///
/// Useful for tests and for running the gateway without Redis. Nothing is shared
/// across processes, so only one instance of the gateway may use it.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    pushed: Notify,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StateStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().await;
        Ok(state.live_string(key).cloned())
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let mut state = self.state.lock().await;
        Ok(keys.iter().map(|k| state.live_string(k).cloned()).collect())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.strings.insert(key.to_string(), (value.to_string(), None));
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.live_string(key).is_some() {
            return Ok(false);
        }
        state
            .strings
            .insert(key.to_string(), (value.to_string(), Some(Instant::now() + ttl)));
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.strings.remove(key);
        state.lists.remove(key);
        state.zsets.remove(key);
        Ok(())
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .lists
            .entry(key.to_string())
            .or_default()
            .push_front(value.to_string());
        drop(state);
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn brpop(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(value) = state.lists.get_mut(key).and_then(|l| l.pop_back()) {
                    return Ok(Some(value));
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state.lists.get(key).map(|l| l.len() as u64).unwrap_or(0))
    }

    async fn zrange_by_score(&self, key: &str, min: Option<f64>, max: Option<f64>) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let mut matched: Vec<&(f64, String)> = state
            .zsets
            .get(key)
            .map(|set| {
                set.iter()
                    .filter(|(score, _)| !min.is_some_and(|m| *score < m) && !max.is_some_and(|m| *score > m))
                    .collect()
            })
            .unwrap_or_default();
        matched.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(matched.into_iter().map(|(_, member)| member.clone()).collect())
    }

    async fn atomic(&self, ops: Vec<StoreOp>) -> Result<()> {
        let mut state = self.state.lock().await;

        let mut increments: Vec<(String, i64)> = Vec::new();
        for op in &ops {
            if let StoreOp::IncrBy { key, by } = op {
                let current = match state.live_string(key) {
                    Some(v) => v
                        .parse::<i64>()
                        .map_err(|_| anyhow!("value at {} is not an integer", key))?,
                    None => 0,
                };
                let pending = increments
                    .iter()
                    .rev()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| *v)
                    .unwrap_or(current);
                increments.push((key.clone(), pending + by));
            }
        }

        for (key, value) in increments {
            state.strings.insert(key, (value.to_string(), None));
        }
        for op in ops {
            if let StoreOp::ZAdd { key, score, member } = op {
                let set = state.zsets.entry(key).or_default();
                match set.iter_mut().find(|(_, m)| *m == member) {
                    Some(entry) => entry.0 = score,
                    None => set.push((score, member)),
                }
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
