//! Admission control for pool checkouts.
//!
//! sqlx queues acquirers without bound. `QueueGate` adds the `queue_limit` knob: at
//! most `max_connections + queue_limit` callers may be waiting for or holding a
//! connection at once, and anyone beyond that is turned away immediately. A limit of
//! zero disables the gate.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::db::errors::DbError;

#[derive(Debug, Clone)]
pub struct QueueGate {
    in_flight: Arc<AtomicUsize>,
    capacity: Option<usize>,
    queue_limit: usize,
}

/// Held for as long as the caller occupies a slot; dropping it frees the slot.
#[derive(Debug)]
pub struct QueueTicket {
    in_flight: Arc<AtomicUsize>,
}

impl QueueGate {
    pub fn new(max_connections: u32, queue_limit: usize) -> Self {
        let capacity = (queue_limit > 0).then(|| max_connections as usize + queue_limit);
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            capacity,
            queue_limit,
        }
    }

    pub fn enter(&self) -> Result<QueueTicket, DbError> {
        let admitted = self.in_flight.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| match self.capacity {
            Some(capacity) if n >= capacity => None,
            _ => Some(n + 1),
        });

        match admitted {
            Ok(_) => Ok(QueueTicket {
                in_flight: self.in_flight.clone(),
            }),
            Err(_) => Err(DbError::QueueFull { limit: self.queue_limit }),
        }
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for QueueTicket {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limit_is_unbounded() {
        let gate = QueueGate::new(1, 0);
        let tickets: Vec<_> = (0..100).map(|_| gate.enter().unwrap()).collect();
        assert_eq!(gate.in_flight(), 100);
        drop(tickets);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn test_rejects_beyond_pool_plus_queue() {
        let gate = QueueGate::new(2, 1);
        let _a = gate.enter().unwrap();
        let _b = gate.enter().unwrap();
        let c = gate.enter().unwrap();

        match gate.enter() {
            Err(DbError::QueueFull { limit }) => assert_eq!(limit, 1),
            other => panic!("expected QueueFull, got {other:?}"),
        }

        // Releasing a slot lets the next caller in
        drop(c);
        assert!(gate.enter().is_ok());
    }
}
