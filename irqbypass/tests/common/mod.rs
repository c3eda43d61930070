//! Recording participants shared by the integration tests.

#![allow(dead_code)]

use irqbypass::{BindError, BypassConsumer, BypassProducer, ConsumerCaps, ProducerCaps, Token};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Ordered log of every participant call, tagged with the caller's token.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<(Token, &'static str)>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, token: Token, op: &'static str) {
        self.calls.lock().push((token, op));
    }

    /// Operation names in call order.
    pub fn ops(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(|(_, op)| *op).collect()
    }

    /// Full log.
    pub fn calls(&self) -> Vec<(Token, &'static str)> {
        self.calls.lock().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().iter().filter(|(_, o)| *o == op).count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

pub struct RecordingProducer {
    token: Token,
    caps: ProducerCaps,
    log: Arc<Recorder>,
    fail_add: Option<BindError>,
    fail_del: bool,
    delay: Duration,
}

impl RecordingProducer {
    pub fn new(token: u64, log: &Arc<Recorder>) -> Self {
        Self {
            token: Token::new(token),
            caps: ProducerCaps::all(),
            log: Arc::clone(log),
            fail_add: None,
            fail_del: false,
            delay: Duration::ZERO,
        }
    }

    pub fn caps(mut self, caps: ProducerCaps) -> Self {
        self.caps = caps;
        self
    }

    pub fn refusing(mut self, err: BindError) -> Self {
        self.fail_add = Some(err);
        self
    }

    pub fn failing_teardown(mut self) -> Self {
        self.fail_del = true;
        self
    }

    /// Sleep inside every call, widening race windows.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn record(&self, op: &'static str) {
        self.log.push(self.token, op);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}

impl BypassProducer for RecordingProducer {
    fn token(&self) -> Token {
        self.token
    }

    fn capabilities(&self) -> ProducerCaps {
        self.caps
    }

    fn stop(&self) {
        self.record("producer.stop");
    }

    fn start(&self) {
        self.record("producer.start");
    }

    fn add_consumer(&self, _consumer: &dyn BypassConsumer) -> Result<(), BindError> {
        self.record("producer.add_consumer");
        match &self.fail_add {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn del_consumer(&self, _consumer: &dyn BypassConsumer) -> Result<(), BindError> {
        self.record("producer.del_consumer");
        if self.fail_del {
            return Err(BindError::Failed("producer teardown".to_string()));
        }
        Ok(())
    }
}

pub struct RecordingConsumer {
    token: Token,
    caps: ConsumerCaps,
    log: Arc<Recorder>,
    fail_add: Option<BindError>,
    fail_del: bool,
    delay: Duration,
}

impl RecordingConsumer {
    pub fn new(token: u64, log: &Arc<Recorder>) -> Self {
        Self {
            token: Token::new(token),
            caps: ConsumerCaps::all(),
            log: Arc::clone(log),
            fail_add: None,
            fail_del: false,
            delay: Duration::ZERO,
        }
    }

    pub fn caps(mut self, caps: ConsumerCaps) -> Self {
        self.caps = caps;
        self
    }

    pub fn refusing(mut self, err: BindError) -> Self {
        self.fail_add = Some(err);
        self
    }

    pub fn failing_teardown(mut self) -> Self {
        self.fail_del = true;
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn record(&self, op: &'static str) {
        self.log.push(self.token, op);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}

impl BypassConsumer for RecordingConsumer {
    fn token(&self) -> Token {
        self.token
    }

    fn capabilities(&self) -> ConsumerCaps {
        self.caps
    }

    fn add_producer(&self, _producer: &dyn BypassProducer) -> Result<(), BindError> {
        self.record("consumer.add_producer");
        match &self.fail_add {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn del_producer(&self, _producer: &dyn BypassProducer) -> Result<(), BindError> {
        self.record("consumer.del_producer");
        if self.fail_del {
            return Err(BindError::Failed("consumer teardown".to_string()));
        }
        Ok(())
    }

    fn stop(&self) {
        self.record("consumer.stop");
    }

    fn start(&self) {
        self.record("consumer.start");
    }
}

pub const CONNECT_ORDER: [&str; 6] = [
    "producer.stop",
    "consumer.stop",
    "producer.add_consumer",
    "consumer.add_producer",
    "consumer.start",
    "producer.start",
];

pub const DISCONNECT_ORDER: [&str; 6] = [
    "producer.stop",
    "consumer.stop",
    "consumer.del_producer",
    "producer.del_consumer",
    "consumer.start",
    "producer.start",
];
