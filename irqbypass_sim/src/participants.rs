//! Simulated producers and consumers.
//!
//! Each participant records every call the manager makes into a shared
//! [`CallLog`] and fails on demand, as configured by its scenario entry.

use crate::scenario::{ConsumerSpec, ProducerSpec};
use irqbypass::{
    BindError, BypassConsumer, BypassProducer, ConsumerCaps, ProducerCaps, Step, Token,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

/// A single recorded participant call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRecord {
    /// Participant name
    pub participant: String,
    /// Participant token
    pub token: Token,
    /// Call, e.g. `producer.add_consumer`
    pub call: String,
    /// Whether the call reported success
    pub ok: bool,
}

/// Ordered log of participant calls, shared by all simulated participants.
#[derive(Debug, Default)]
pub struct CallLog {
    records: Mutex<Vec<CallRecord>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, participant: &str, token: Token, step: Step, ok: bool) {
        trace!(participant, %token, call = %step, ok, "Participant call");
        self.records.lock().push(CallRecord {
            participant: participant.to_string(),
            token,
            call: step.to_string(),
            ok,
        });
    }

    /// Number of recorded calls.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Copy of all records from `start` on.
    pub fn since(&self, start: usize) -> Vec<CallRecord> {
        self.records
            .lock()
            .get(start..)
            .map(<[CallRecord]>::to_vec)
            .unwrap_or_default()
    }

    /// Copy of all records.
    pub fn snapshot(&self) -> Vec<CallRecord> {
        self.since(0)
    }
}

/// Producer driven by a [`ProducerSpec`].
pub struct SimProducer {
    name: String,
    token: Token,
    caps: ProducerCaps,
    fail_add: bool,
    fail_del: bool,
    log: Arc<CallLog>,
}

impl SimProducer {
    /// Build a producer from its scenario entry.
    pub fn new(spec: &ProducerSpec, log: Arc<CallLog>) -> Self {
        debug!(name = %spec.name, token = spec.token, "Simulated producer created");
        Self {
            name: spec.name.clone(),
            token: Token::new(spec.token),
            caps: spec.caps(),
            fail_add: spec.fail_add_consumer,
            fail_del: spec.fail_del_consumer,
            log,
        }
    }

    /// Participant name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl BypassProducer for SimProducer {
    fn token(&self) -> Token {
        self.token
    }

    fn capabilities(&self) -> ProducerCaps {
        self.caps
    }

    fn stop(&self) {
        self.log.record(&self.name, self.token, Step::ProducerStop, true);
    }

    fn start(&self) {
        self.log.record(&self.name, self.token, Step::ProducerStart, true);
    }

    fn add_consumer(&self, _consumer: &dyn BypassConsumer) -> Result<(), BindError> {
        self.log
            .record(&self.name, self.token, Step::ProducerAddConsumer, !self.fail_add);
        if self.fail_add {
            return Err(BindError::NotSupported(format!(
                "{} refuses to bind",
                self.name
            )));
        }
        Ok(())
    }

    fn del_consumer(&self, _consumer: &dyn BypassConsumer) -> Result<(), BindError> {
        self.log
            .record(&self.name, self.token, Step::ProducerDelConsumer, !self.fail_del);
        if self.fail_del {
            return Err(BindError::Failed(format!("{} failed to unbind", self.name)));
        }
        Ok(())
    }
}

/// Consumer driven by a [`ConsumerSpec`].
pub struct SimConsumer {
    name: String,
    token: Token,
    caps: ConsumerCaps,
    fail_add: bool,
    fail_del: bool,
    log: Arc<CallLog>,
}

impl SimConsumer {
    /// Build a consumer from its scenario entry.
    pub fn new(spec: &ConsumerSpec, log: Arc<CallLog>) -> Self {
        debug!(name = %spec.name, token = spec.token, "Simulated consumer created");
        Self {
            name: spec.name.clone(),
            token: Token::new(spec.token),
            caps: spec.caps(),
            fail_add: spec.fail_add_producer,
            fail_del: spec.fail_del_producer,
            log,
        }
    }

    /// Participant name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl BypassConsumer for SimConsumer {
    fn token(&self) -> Token {
        self.token
    }

    fn capabilities(&self) -> ConsumerCaps {
        self.caps
    }

    fn add_producer(&self, _producer: &dyn BypassProducer) -> Result<(), BindError> {
        self.log
            .record(&self.name, self.token, Step::ConsumerAddProducer, !self.fail_add);
        if self.fail_add {
            return Err(BindError::ResourceExhausted(format!(
                "{} has no free routing entry",
                self.name
            )));
        }
        Ok(())
    }

    fn del_producer(&self, _producer: &dyn BypassProducer) -> Result<(), BindError> {
        self.log
            .record(&self.name, self.token, Step::ConsumerDelProducer, !self.fail_del);
        if self.fail_del {
            return Err(BindError::Failed(format!("{} failed to unbind", self.name)));
        }
        Ok(())
    }

    fn stop(&self) {
        self.log.record(&self.name, self.token, Step::ConsumerStop, true);
    }

    fn start(&self) {
        self.log.record(&self.name, self.token, Step::ConsumerStart, true);
    }
}
