use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::bandwidth::UsageReading;
use crate::cooldown::CooldownPolicy;

// Outcome of one admission check.
#[derive(Debug)]
pub enum Decision {
    Allow(InFlightGuard),
    Reject { retry_after: Duration },
    Busy,
}

#[derive(Debug, Clone, Copy)]
struct ClientRecord {
    last_served_at: Instant,
    in_flight: bool,
}

// Per-identity admission state. The check-and-update for one identity runs
// under the dashmap entry lock for that key, so two concurrent requests
// from the same identity can never both read a stale timestamp; unrelated
// identities live on other shards and proceed independently.
#[derive(Clone)]
pub struct AdmissionGate {
    policy: CooldownPolicy,
    records: Arc<DashMap<String, ClientRecord>>,
}

impl AdmissionGate {
    pub fn new(policy: CooldownPolicy) -> Self {
        Self {
            policy,
            records: Arc::new(DashMap::new()),
        }
    }

    pub fn admit(&self, identity: &str, now: Instant, usage: &UsageReading) -> Decision {
        let duration = self.policy.evaluate(usage.effective());

        match self.records.entry(identity.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(ClientRecord {
                    last_served_at: now,
                    in_flight: true,
                });
                Decision::Allow(self.guard(identity))
            }
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();

                // one outstanding request per identity, checked before the
                // cooldown so a mid-stream client cannot double-dip
                if record.in_flight {
                    return Decision::Busy;
                }

                if !duration.is_zero() {
                    let elapsed = now.duration_since(record.last_served_at);
                    if elapsed < duration {
                        return Decision::Reject {
                            retry_after: duration - elapsed,
                        };
                    }
                }

                record.last_served_at = now;
                record.in_flight = true;
                Decision::Allow(self.guard(identity))
            }
        }
    }

    fn guard(&self, identity: &str) -> InFlightGuard {
        InFlightGuard {
            records: Arc::clone(&self.records),
            identity: identity.to_string(),
        }
    }

    // Drop records idle longer than `idle`. In-flight streams are never
    // evicted, whatever their age.
    pub fn prune(&self, now: Instant, idle: Duration) {
        self.records.retain(|_, record| {
            record.in_flight || now.duration_since(record.last_served_at) < idle
        });
    }

    pub fn tracked(&self) -> usize {
        self.records.len()
    }
}

// Clears the identity's in-flight flag once the admitted request's response
// stream is released: completed, failed, or abandoned by the client. The
// recorded last_served_at stands either way; an abandoned stream still
// spent its cooldown slot.
pub struct InFlightGuard {
    records: Arc<DashMap<String, ClientRecord>>,
    identity: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(mut record) = self.records.get_mut(&self.identity) {
            record.in_flight = false;
        }
    }
}

impl std::fmt::Debug for InFlightGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightGuard")
            .field("identity", &self.identity)
            .finish()
    }
}
