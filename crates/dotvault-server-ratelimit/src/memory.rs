// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process counters for single-instance deployments.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::RateLimitError;
use crate::store::{RateLimitStore, WindowSnapshot};

#[derive(Debug, Clone, Copy)]
struct Slot {
	count: u32,
	reset_at: Instant,
}

#[derive(Debug)]
pub struct MemoryRateLimitStore {
	slots: DashMap<String, Slot>,
	max_tracked: usize,
}

impl MemoryRateLimitStore {
	pub fn new(max_tracked: usize) -> Self {
		Self {
			slots: DashMap::new(),
			max_tracked: max_tracked.max(1),
		}
	}

	fn purge(&self, now: Instant, grace: Duration) -> usize {
		let before = self.slots.len();
		self.slots.retain(|_, slot| now < slot.reset_at + grace);
		before.saturating_sub(self.slots.len())
	}
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
	fn name(&self) -> &'static str {
		"memory"
	}

	async fn hit(&self, key: &str, window: Duration) -> Result<WindowSnapshot, RateLimitError> {
		let now = Instant::now();

		if !self.slots.contains_key(key) && self.slots.len() >= self.max_tracked {
			let removed = self.purge(now, Duration::ZERO);
			tracing::debug!(removed, "purged expired rate limit slots at capacity");
			if self.slots.len() >= self.max_tracked {
				let retry_at = self
					.slots
					.iter()
					.map(|entry| entry.reset_at)
					.min()
					.unwrap_or(now + window);
				return Err(RateLimitError::Capacity {
					tracked: self.slots.len(),
					retry_at,
				});
			}
		}

		// The entry guard holds the shard lock, so increment-or-reset is atomic
		// per key while other keys proceed.
		let mut slot = self.slots.entry(key.to_string()).or_insert(Slot {
			count: 0,
			reset_at: now + window,
		});
		if now >= slot.reset_at {
			slot.count = 0;
			slot.reset_at = now + window;
		}
		slot.count = slot.count.saturating_add(1);

		Ok(WindowSnapshot {
			count: slot.count,
			reset_at: slot.reset_at,
		})
	}

	async fn sweep(&self, grace: Duration) -> Result<usize, RateLimitError> {
		Ok(self.purge(Instant::now(), grace))
	}

	fn tracked(&self) -> Option<usize> {
		Some(self.slots.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	const WINDOW: Duration = Duration::from_secs(60);

	#[tokio::test(start_paused = true)]
	async fn counts_within_window_then_resets() {
		let store = MemoryRateLimitStore::new(100);

		let first = store.hit("k", WINDOW).await.unwrap();
		assert_eq!(first.count, 1);
		tokio::time::advance(Duration::from_secs(30)).await;
		let second = store.hit("k", WINDOW).await.unwrap();
		assert_eq!(second.count, 2);
		assert_eq!(second.reset_at, first.reset_at);

		tokio::time::advance(Duration::from_secs(30)).await;
		let fresh = store.hit("k", WINDOW).await.unwrap();
		assert_eq!(fresh.count, 1);
		assert_eq!(fresh.reset_at, Instant::now() + WINDOW);
	}

	#[tokio::test]
	async fn keys_are_independent() {
		let store = MemoryRateLimitStore::new(100);
		store.hit("a", WINDOW).await.unwrap();
		store.hit("a", WINDOW).await.unwrap();
		assert_eq!(store.hit("b", WINDOW).await.unwrap().count, 1);
		assert_eq!(store.tracked(), Some(2));
	}

	#[tokio::test(start_paused = true)]
	async fn sweep_respects_grace() {
		let store = MemoryRateLimitStore::new(100);
		store.hit("old", WINDOW).await.unwrap();
		tokio::time::advance(Duration::from_secs(90)).await;
		store.hit("new", WINDOW).await.unwrap();

		assert_eq!(store.sweep(WINDOW).await.unwrap(), 0);
		tokio::time::advance(Duration::from_secs(30)).await;
		assert_eq!(store.sweep(WINDOW).await.unwrap(), 1);
		assert_eq!(store.tracked(), Some(1));
	}

	#[tokio::test(start_paused = true)]
	async fn capacity_purges_expired_before_refusing() {
		let store = MemoryRateLimitStore::new(2);
		store.hit("a", WINDOW).await.unwrap();
		store.hit("b", WINDOW).await.unwrap();

		tokio::time::advance(Duration::from_secs(10)).await;
		store.hit("b", WINDOW).await.unwrap();
		match store.hit("c", WINDOW).await {
			Err(RateLimitError::Capacity { tracked, retry_at }) => {
				assert_eq!(tracked, 2);
				assert_eq!(retry_at, Instant::now() + Duration::from_secs(50));
			}
			other => panic!("expected capacity error, got {other:?}"),
		}
		// Existing keys keep counting at capacity.
		assert_eq!(store.hit("a", WINDOW).await.unwrap().count, 2);

		tokio::time::advance(WINDOW).await;
		assert_eq!(store.hit("c", WINDOW).await.unwrap().count, 1);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_hits_on_one_key_are_all_counted() {
		let store = Arc::new(MemoryRateLimitStore::new(100));
		let handles: Vec<_> = (0..200)
			.map(|_| {
				let store = store.clone();
				tokio::spawn(async move { store.hit("shared", WINDOW).await.unwrap().count })
			})
			.collect();

		let mut counts: Vec<u32> = futures::future::join_all(handles)
			.await
			.into_iter()
			.map(|r| r.unwrap())
			.collect();
		counts.sort_unstable();
		assert_eq!(counts, (1..=200).collect::<Vec<_>>());
	}
}
