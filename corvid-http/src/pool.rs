//! [`ConnectionPool`]: tracks reusable connections to `api.discord.com`
//! (spec.md §3/§4.4).
//!
//! `twilight-http` has no equivalent public type — it delegates entirely to
//! `hyper_util`'s legacy client, which pools connections internally but
//! exposes no health tracking, load-balancing choice, or emergency-slot
//! concept. This is new relative to the teacher; it sits in front of one
//! shared [`hyper_util::client::legacy::Client`] as a permit-counted
//! bookkeeping layer (grounded in `tower-resilience-bulkhead`'s
//! permit-counting design) rather than managing raw sockets itself — actual
//! TCP/TLS reuse still happens inside `hyper_util`.

use corvid_ratelimiting::Priority;
use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

/// How to pick among several healthy connections to the same endpoint.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LoadBalancing {
    #[default]
    RoundRobin,
    LeastConnections,
    Random,
}

/// Bookkeeping for one logical connection slot, identified by a stable `id`
/// rather than its position in [`Endpoint::slots`] — positions shift as
/// slots are removed, but a [`Lease`] may outlive several such removals.
#[derive(Clone, Debug)]
struct Slot {
    id: u64,
    in_use: bool,
    last_used: Instant,
    requests_handled: u64,
    emergency: bool,
    healthy: bool,
}

impl Slot {
    fn new(id: u64, emergency: bool) -> Self {
        Self {
            id,
            in_use: true,
            last_used: Instant::now(),
            requests_handled: 0,
            emergency,
            healthy: true,
        }
    }
}

struct Endpoint {
    slots: Vec<Slot>,
    round_robin_cursor: usize,
    next_slot_id: u64,
}

impl Endpoint {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            round_robin_cursor: 0,
            next_slot_id: 0,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_slot_id;
        self.next_slot_id += 1;
        id
    }
}

/// Configuration for a [`ConnectionPool`].
#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    pub max_connections: usize,
    pub max_idle_time: Duration,
    pub keepalive_timeout: Duration,
    pub health_check_interval: Duration,
    pub load_balancing: LoadBalancing,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 6,
            max_idle_time: Duration::from_secs(90),
            keepalive_timeout: Duration::from_secs(90),
            health_check_interval: Duration::from_secs(30),
            load_balancing: LoadBalancing::RoundRobin,
        }
    }
}

/// A guard representing a borrowed connection slot; releases the slot (or,
/// if it was an emergency slot, discards it) on drop.
pub struct Lease<'a> {
    pool: &'a ConnectionPool,
    endpoint: String,
    slot_id: u64,
    emergency: bool,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.pool.release(&self.endpoint, self.slot_id, self.emergency);
    }
}

/// Tracks, per `host:port`, how many logical connections are outstanding,
/// their health, and how long they've sat idle.
pub struct ConnectionPool {
    endpoints: Mutex<HashMap<String, Endpoint>>,
    config: PoolConfig,
}

impl ConnectionPool {
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self {
            endpoints: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Acquire a slot for `host:port` (spec.md §4.4 `get_connection`).
    ///
    /// # Errors
    ///
    /// Returns `None` if the pool is at capacity and `priority` is not
    /// `HIGH` or above.
    pub fn acquire(&self, host_port: &str, priority: Priority) -> Option<Lease<'_>> {
        let mut endpoints = self.endpoints.lock().expect("pool poisoned");
        let endpoint = endpoints.entry(host_port.to_owned()).or_insert_with(Endpoint::new);

        self.evict_stale(endpoint);

        if let Some(index) = self.pick_idle(endpoint) {
            endpoint.slots[index].in_use = true;
            endpoint.slots[index].last_used = Instant::now();
            return Some(Lease {
                pool: self,
                endpoint: host_port.to_owned(),
                slot_id: endpoint.slots[index].id,
                emergency: endpoint.slots[index].emergency,
            });
        }

        let non_emergency_count = endpoint.slots.iter().filter(|s| !s.emergency).count();

        if non_emergency_count < self.config.max_connections {
            let id = endpoint.next_id();
            endpoint.slots.push(Slot::new(id, false));
            return Some(Lease {
                pool: self,
                endpoint: host_port.to_owned(),
                slot_id: id,
                emergency: false,
            });
        }

        if priority.is_burst_eligible() {
            let id = endpoint.next_id();
            endpoint.slots.push(Slot::new(id, true));
            return Some(Lease {
                pool: self,
                endpoint: host_port.to_owned(),
                slot_id: id,
                emergency: true,
            });
        }

        None
    }

    fn pick_idle(&self, endpoint: &mut Endpoint) -> Option<usize> {
        let candidates: Vec<usize> = endpoint
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.in_use && s.healthy)
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            return None;
        }

        match self.config.load_balancing {
            LoadBalancing::RoundRobin => {
                endpoint.round_robin_cursor = (endpoint.round_robin_cursor + 1) % candidates.len();
                Some(candidates[endpoint.round_robin_cursor])
            }
            LoadBalancing::LeastConnections => candidates
                .into_iter()
                .min_by_key(|&i| endpoint.slots[i].requests_handled),
            LoadBalancing::Random => {
                let pick = fastrand::usize(..candidates.len());
                Some(candidates[pick])
            }
        }
    }

    fn evict_stale(&self, endpoint: &mut Endpoint) {
        let max_idle = self.config.max_idle_time;
        endpoint
            .slots
            .retain(|slot| slot.in_use || slot.last_used.elapsed() <= max_idle);
    }

    fn release(&self, host_port: &str, slot_id: u64, emergency: bool) {
        let mut endpoints = self.endpoints.lock().expect("pool poisoned");
        let Some(endpoint) = endpoints.get_mut(host_port) else {
            return;
        };

        // Look the slot up by its stable id rather than a cached position: a
        // concurrent emergency release may have already shifted every index
        // after it.
        let Some(index) = endpoint.slots.iter().position(|s| s.id == slot_id) else {
            return;
        };

        if emergency {
            endpoint.slots.remove(index);
            return;
        }

        let slot = &mut endpoint.slots[index];
        slot.in_use = false;
        slot.last_used = Instant::now();
        slot.requests_handled += 1;
    }

    /// Mark every idle-and-expired slot for `host:port` unhealthy (spec.md
    /// §4.4 "periodic health check"). Intended to be called on a timer.
    pub fn run_health_check(&self, host_port: &str) {
        let mut endpoints = self.endpoints.lock().expect("pool poisoned");
        let Some(endpoint) = endpoints.get_mut(host_port) else {
            return;
        };

        for slot in &mut endpoint.slots {
            if !slot.in_use && slot.last_used.elapsed() > self.config.keepalive_timeout {
                slot.healthy = false;
            }
        }

        endpoint.slots.retain(|slot| slot.in_use || slot.healthy);
    }

    #[must_use]
    pub fn in_flight(&self, host_port: &str) -> usize {
        self.endpoints
            .lock()
            .expect("pool poisoned")
            .get(host_port)
            .map(|e| e.slots.iter().filter(|s| s.in_use).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_pool_rejects_normal_priority() {
        let pool = ConnectionPool::new(PoolConfig {
            max_connections: 1,
            ..PoolConfig::default()
        });

        let _first = pool.acquire("discord.com:443", Priority::Normal).unwrap();
        assert!(pool.acquire("discord.com:443", Priority::Normal).is_none());
    }

    #[test]
    fn exhausted_pool_grants_emergency_slot_to_high_priority() {
        let pool = ConnectionPool::new(PoolConfig {
            max_connections: 1,
            ..PoolConfig::default()
        });

        let _first = pool.acquire("discord.com:443", Priority::Normal).unwrap();
        let emergency = pool.acquire("discord.com:443", Priority::High);
        assert!(emergency.is_some());
    }

    #[test]
    fn releasing_a_slot_makes_it_reusable() {
        let pool = ConnectionPool::new(PoolConfig::default());
        {
            let _lease = pool.acquire("discord.com:443", Priority::Normal).unwrap();
            assert_eq!(pool.in_flight("discord.com:443"), 1);
        }
        assert_eq!(pool.in_flight("discord.com:443"), 0);
    }

    #[test]
    fn emergency_slot_is_discarded_not_recycled_on_release() {
        let pool = ConnectionPool::new(PoolConfig {
            max_connections: 1,
            ..PoolConfig::default()
        });

        let _first = pool.acquire("discord.com:443", Priority::Normal).unwrap();
        {
            let _emergency = pool.acquire("discord.com:443", Priority::Critical).unwrap();
        }

        // Only the original, non-emergency slot should remain tracked.
        let endpoints = pool.endpoints.lock().unwrap();
        assert_eq!(endpoints.get("discord.com:443").unwrap().slots.len(), 1);
    }

    #[test]
    fn releasing_an_earlier_emergency_slot_does_not_corrupt_a_later_lease() {
        let pool = ConnectionPool::new(PoolConfig {
            max_connections: 1,
            ..PoolConfig::default()
        });

        let _first = pool.acquire("discord.com:443", Priority::Normal).unwrap();
        let emergency_a = pool.acquire("discord.com:443", Priority::Critical).unwrap();
        let emergency_b = pool.acquire("discord.com:443", Priority::Critical).unwrap();

        // Drops `emergency_a`, which sits earlier in the slot vec than
        // `emergency_b`. A positional release would shift `emergency_b`'s
        // stored index out from under it; a stable id release does not.
        drop(emergency_a);
        drop(emergency_b);

        let endpoints = pool.endpoints.lock().unwrap();
        assert_eq!(endpoints.get("discord.com:443").unwrap().slots.len(), 1);
    }
}
