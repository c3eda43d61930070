//! Connect / disconnect sequences for a matched producer-consumer pair.
//!
//! Both sides are quiesced before anything is bound or unbound, and on
//! resume the consumer is started before the producer so the sink is ready
//! before the source can emit.
//!
//! ```text
//! connect:     P.stop  C.stop  P.add_consumer  C.add_producer  C.start  P.start
//! disconnect:  P.stop  C.stop  C.del_producer  P.del_consumer  C.start  P.start
//! ```
//!
//! Every optional call is skipped when its capability flag is clear.

use crate::config::ManagerConfig;
use crate::error::{BypassError, BypassResult};
use crate::participant::{BindError, BypassConsumer, BypassProducer, ConsumerCaps, ProducerCaps};
use crate::token::Token;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Which sequence is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    /// Pause, bind, resume.
    Connect,
    /// Pause, unbind, resume.
    Disconnect,
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceKind::Connect => write!(f, "connect"),
            SequenceKind::Disconnect => write!(f, "disconnect"),
        }
    }
}

/// Individual participant call within a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Producer `stop`
    ProducerStop,
    /// Consumer `stop`
    ConsumerStop,
    /// Producer `add_consumer`
    ProducerAddConsumer,
    /// Consumer `add_producer`
    ConsumerAddProducer,
    /// Consumer `del_producer`
    ConsumerDelProducer,
    /// Producer `del_consumer`
    ProducerDelConsumer,
    /// Consumer `start`
    ConsumerStart,
    /// Producer `start`
    ProducerStart,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ProducerStop => "producer.stop",
            Step::ConsumerStop => "consumer.stop",
            Step::ProducerAddConsumer => "producer.add_consumer",
            Step::ConsumerAddProducer => "consumer.add_producer",
            Step::ConsumerDelProducer => "consumer.del_producer",
            Step::ProducerDelConsumer => "producer.del_consumer",
            Step::ConsumerStart => "consumer.start",
            Step::ProducerStart => "producer.start",
        };
        f.write_str(name)
    }
}

/// Summary of one finished sequence.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SequenceReport {
    pub elapsed: Duration,
    pub violations: usize,
    pub slow: bool,
}

/// Book-keeping for one running sequence: step logging, contract
/// violations and timing.
pub(crate) struct Sequence<'a> {
    kind: SequenceKind,
    token: Token,
    config: &'a ManagerConfig,
    started: Instant,
    violations: usize,
}

impl<'a> Sequence<'a> {
    pub(crate) fn new(kind: SequenceKind, token: Token, config: &'a ManagerConfig) -> Self {
        Self {
            kind,
            token,
            config,
            started: Instant::now(),
            violations: 0,
        }
    }

    fn step(&self, step: Step) {
        if self.config.log_protocol_steps {
            debug!(
                manager = %self.config.name,
                token = %self.token,
                sequence = %self.kind,
                %step,
                "bypass step"
            );
        }
    }

    fn violation(&mut self, step: Step, err: &BindError) {
        self.violations += 1;
        error!(
            manager = %self.config.name,
            token = %self.token,
            sequence = %self.kind,
            %step,
            error = %err,
            "participant contract violation: teardown call must not fail"
        );
    }

    pub(crate) fn finish(self) -> SequenceReport {
        let elapsed = self.started.elapsed();
        let slow = self
            .config
            .slow_threshold()
            .is_some_and(|threshold| elapsed > threshold);
        if slow {
            warn!(
                manager = %self.config.name,
                token = %self.token,
                sequence = %self.kind,
                elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
                threshold_us = self.config.slow_sequence_threshold_us,
                "slow bypass sequence"
            );
        }
        SequenceReport {
            elapsed,
            violations: self.violations,
            slow,
        }
    }
}

fn pause(seq: &Sequence<'_>, producer: &dyn BypassProducer, consumer: &dyn BypassConsumer) {
    if producer.capabilities().contains(ProducerCaps::STOP) {
        seq.step(Step::ProducerStop);
        producer.stop();
    }
    if consumer.capabilities().contains(ConsumerCaps::STOP) {
        seq.step(Step::ConsumerStop);
        consumer.stop();
    }
}

fn resume(seq: &Sequence<'_>, producer: &dyn BypassProducer, consumer: &dyn BypassConsumer) {
    if consumer.capabilities().contains(ConsumerCaps::START) {
        seq.step(Step::ConsumerStart);
        consumer.start();
    }
    if producer.capabilities().contains(ProducerCaps::START) {
        seq.step(Step::ProducerStart);
        producer.start();
    }
}

/// Bind `producer` to `consumer`.
///
/// A producer-side bind failure returns at once, leaving both sides paused
/// and nothing bound. A consumer-side failure calls the producer's
/// `del_consumer` when declared, resumes both sides, then returns the error.
pub(crate) fn connect(
    seq: &mut Sequence<'_>,
    producer: &dyn BypassProducer,
    consumer: &dyn BypassConsumer,
) -> BypassResult<()> {
    let token = seq.token;
    let producer_caps = producer.capabilities();

    pause(seq, producer, consumer);

    if producer_caps.contains(ProducerCaps::ADD_CONSUMER) {
        seq.step(Step::ProducerAddConsumer);
        if let Err(source) = producer.add_consumer(consumer) {
            warn!(
                manager = %seq.config.name,
                %token,
                error = %source,
                "producer refused bypass, sequence aborted"
            );
            return Err(BypassError::ProducerBind { token, source });
        }
    }

    seq.step(Step::ConsumerAddProducer);
    let result = consumer.add_producer(producer).map_err(|source| {
        warn!(
            manager = %seq.config.name,
            %token,
            error = %source,
            "consumer refused bypass, rolling back producer"
        );
        BypassError::ConsumerBind { token, source }
    });

    if result.is_err() && producer_caps.contains(ProducerCaps::DEL_CONSUMER) {
        seq.step(Step::ProducerDelConsumer);
        if let Err(err) = producer.del_consumer(consumer) {
            seq.violation(Step::ProducerDelConsumer, &err);
        }
    }

    resume(seq, producer, consumer);
    result
}

/// Tear down the bypass between `producer` and `consumer`.
///
/// Always runs to completion; teardown failures are counted as contract
/// violations.
pub(crate) fn disconnect(
    seq: &mut Sequence<'_>,
    producer: &dyn BypassProducer,
    consumer: &dyn BypassConsumer,
) {
    pause(seq, producer, consumer);

    seq.step(Step::ConsumerDelProducer);
    if let Err(err) = consumer.del_producer(producer) {
        seq.violation(Step::ConsumerDelProducer, &err);
    }

    if producer.capabilities().contains(ProducerCaps::DEL_CONSUMER) {
        seq.step(Step::ProducerDelConsumer);
        if let Err(err) = producer.del_consumer(consumer) {
            seq.violation(Step::ProducerDelConsumer, &err);
        }
    }

    resume(seq, producer, consumer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    type Log = Mutex<Vec<&'static str>>;

    struct Producer<'l> {
        log: &'l Log,
        caps: ProducerCaps,
        fail_add: bool,
        fail_del: bool,
    }

    impl BypassProducer for Producer<'_> {
        fn token(&self) -> Token {
            Token::new(1)
        }
        fn capabilities(&self) -> ProducerCaps {
            self.caps
        }
        fn stop(&self) {
            self.log.lock().push("p.stop");
        }
        fn start(&self) {
            self.log.lock().push("p.start");
        }
        fn add_consumer(&self, _c: &dyn BypassConsumer) -> Result<(), BindError> {
            self.log.lock().push("p.add");
            if self.fail_add {
                return Err(BindError::Busy("test".into()));
            }
            Ok(())
        }
        fn del_consumer(&self, _c: &dyn BypassConsumer) -> Result<(), BindError> {
            self.log.lock().push("p.del");
            if self.fail_del {
                return Err(BindError::Failed("test".into()));
            }
            Ok(())
        }
    }

    struct Consumer<'l> {
        log: &'l Log,
        caps: ConsumerCaps,
        fail_add: bool,
    }

    impl BypassConsumer for Consumer<'_> {
        fn token(&self) -> Token {
            Token::new(1)
        }
        fn capabilities(&self) -> ConsumerCaps {
            self.caps
        }
        fn add_producer(&self, _p: &dyn BypassProducer) -> Result<(), BindError> {
            self.log.lock().push("c.add");
            if self.fail_add {
                return Err(BindError::NotSupported("test".into()));
            }
            Ok(())
        }
        fn del_producer(&self, _p: &dyn BypassProducer) -> Result<(), BindError> {
            self.log.lock().push("c.del");
            Ok(())
        }
        fn stop(&self) {
            self.log.lock().push("c.stop");
        }
        fn start(&self) {
            self.log.lock().push("c.start");
        }
    }

    fn producer(log: &Log) -> Producer<'_> {
        Producer {
            log,
            caps: ProducerCaps::all(),
            fail_add: false,
            fail_del: false,
        }
    }

    fn consumer(log: &Log) -> Consumer<'_> {
        Consumer {
            log,
            caps: ConsumerCaps::all(),
            fail_add: false,
        }
    }

    #[test]
    fn connect_full_order() {
        let log = Log::default();
        let config = ManagerConfig::default();
        let mut seq = Sequence::new(SequenceKind::Connect, Token::new(1), &config);

        connect(&mut seq, &producer(&log), &consumer(&log)).unwrap();
        assert_eq!(
            *log.lock(),
            ["p.stop", "c.stop", "p.add", "c.add", "c.start", "p.start"]
        );
        assert_eq!(seq.finish().violations, 0);
    }

    #[test]
    fn connect_skips_absent_capabilities() {
        let log = Log::default();
        let config = ManagerConfig::default();
        let mut seq = Sequence::new(SequenceKind::Connect, Token::new(1), &config);
        let p = Producer {
            caps: ProducerCaps::START | ProducerCaps::ADD_CONSUMER,
            ..producer(&log)
        };
        let c = Consumer {
            caps: ConsumerCaps::REQUIRED | ConsumerCaps::STOP,
            ..consumer(&log)
        };

        connect(&mut seq, &p, &c).unwrap();
        assert_eq!(*log.lock(), ["c.stop", "p.add", "c.add", "p.start"]);
    }

    #[test]
    fn producer_refusal_aborts_without_resume() {
        let log = Log::default();
        let config = ManagerConfig::default();
        let mut seq = Sequence::new(SequenceKind::Connect, Token::new(1), &config);
        let p = Producer {
            fail_add: true,
            ..producer(&log)
        };

        let err = connect(&mut seq, &p, &consumer(&log)).unwrap_err();
        assert!(matches!(err, BypassError::ProducerBind { .. }));
        assert_eq!(*log.lock(), ["p.stop", "c.stop", "p.add"]);
    }

    #[test]
    fn consumer_refusal_rolls_back_and_resumes() {
        let log = Log::default();
        let config = ManagerConfig::default();
        let mut seq = Sequence::new(SequenceKind::Connect, Token::new(1), &config);
        let c = Consumer {
            fail_add: true,
            ..consumer(&log)
        };

        let err = connect(&mut seq, &producer(&log), &c).unwrap_err();
        assert!(matches!(err, BypassError::ConsumerBind { .. }));
        assert_eq!(
            *log.lock(),
            ["p.stop", "c.stop", "p.add", "c.add", "p.del", "c.start", "p.start"]
        );
    }

    #[test]
    fn rollback_runs_without_producer_add_consumer() {
        let log = Log::default();
        let config = ManagerConfig::default();
        let mut seq = Sequence::new(SequenceKind::Connect, Token::new(1), &config);
        let p = Producer {
            caps: ProducerCaps::DEL_CONSUMER,
            ..producer(&log)
        };
        let c = Consumer {
            fail_add: true,
            caps: ConsumerCaps::REQUIRED,
            ..consumer(&log)
        };

        assert!(connect(&mut seq, &p, &c).is_err());
        assert_eq!(*log.lock(), ["c.add", "p.del"]);
    }

    #[test]
    fn disconnect_order_and_violation_count() {
        let log = Log::default();
        let config = ManagerConfig::default();
        let mut seq = Sequence::new(SequenceKind::Disconnect, Token::new(1), &config);
        let p = Producer {
            fail_del: true,
            ..producer(&log)
        };

        disconnect(&mut seq, &p, &consumer(&log));
        assert_eq!(
            *log.lock(),
            ["p.stop", "c.stop", "c.del", "p.del", "c.start", "p.start"]
        );
        assert_eq!(seq.finish().violations, 1);
    }

    #[test]
    fn step_names() {
        assert_eq!(Step::ConsumerAddProducer.to_string(), "consumer.add_producer");
        assert_eq!(SequenceKind::Disconnect.to_string(), "disconnect");
    }
}
