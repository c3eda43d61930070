//! Bypass manager: the token-matched producer/consumer registry.
//!
//! One `parking_lot::Mutex` guards both participant maps. Every
//! registration, unregistration and lookup takes it, and the connect or
//! disconnect sequence for a pair runs while it is held, so sequences never
//! interleave and a token cannot be re-matched mid-teardown.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use irqbypass_common::config::ConfigError;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ManagerConfig;
use crate::error::{BypassError, BypassResult};
use crate::lifecycle::{Lifecycle, PinGuard};
use crate::participant::{BypassConsumer, BypassProducer, ConsumerCaps};
use crate::protocol::{self, Sequence, SequenceKind, SequenceReport};
use crate::token::Token;

/// A registered participant and the pin it holds on the manager.
struct Registered<P: ?Sized> {
    participant: Arc<P>,
    _pin: PinGuard,
}

impl<P: ?Sized> Registered<P> {
    fn is<T: ?Sized>(&self, other: &T) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.participant), other as *const T)
    }
}

#[derive(Debug, Default)]
struct Counters {
    connects: u64,
    connect_failures: u64,
    disconnects: u64,
    contract_violations: u64,
    slow_sequences: u64,
}

impl Counters {
    fn record(&mut self, kind: SequenceKind, report: &SequenceReport, succeeded: bool) {
        match (kind, succeeded) {
            (SequenceKind::Connect, true) => self.connects += 1,
            (SequenceKind::Connect, false) => self.connect_failures += 1,
            (SequenceKind::Disconnect, _) => self.disconnects += 1,
        }
        self.contract_violations += report.violations as u64;
        if report.slow {
            self.slow_sequences += 1;
        }
    }
}

#[derive(Default)]
struct State {
    producers: HashMap<Token, Registered<dyn BypassProducer>>,
    consumers: HashMap<Token, Registered<dyn BypassConsumer>>,
    counters: Counters,
}

impl State {
    fn connection_count(&self) -> usize {
        self.producers
            .keys()
            .filter(|token| self.consumers.contains_key(token))
            .count()
    }
}

/// Point-in-time manager statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BypassStats {
    /// Registered producers
    pub producers: usize,
    /// Registered consumers
    pub consumers: usize,
    /// Tokens with both a producer and a consumer
    pub connections: usize,
    /// Successful connect sequences
    pub connects: u64,
    /// Connect sequences that ended in a bind failure
    pub connect_failures: u64,
    /// Disconnect sequences
    pub disconnects: u64,
    /// Teardown calls that reported a failure
    pub contract_violations: u64,
    /// Sequences over the configured threshold
    pub slow_sequences: u64,
    /// Live lifecycle pins
    pub pinned: usize,
}

/// Registry matching producers and consumers by token.
///
/// Constructed by the owner and shared by reference; see
/// [`crate::global`] for the process-wide instance.
///
/// # Ownership
///
/// The manager stores an `Arc` clone of every registered participant rather
/// than a non-owning reference. A participant therefore stays alive from a
/// successful `register_*` until the matching `unregister_*` (or until its
/// registration fails), even if the caller drops its own handle earlier.
/// Callers still unregister through their own handle; identity is checked by
/// address.
pub struct BypassManager {
    config: ManagerConfig,
    lifecycle: Lifecycle,
    state: Mutex<State>,
}

impl BypassManager {
    /// Create a manager with default configuration.
    pub fn new() -> Self {
        Self {
            config: ManagerConfig::default(),
            lifecycle: Lifecycle::new(),
            state: Mutex::new(State::default()),
        }
    }

    /// Create a manager with custom configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn with_config(config: ManagerConfig) -> Result<Self, ConfigError> {
        Self::with_lifecycle(config, Lifecycle::new())
    }

    /// Create a manager pinning an externally owned lifecycle.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn with_lifecycle(config: ManagerConfig, lifecycle: Lifecycle) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            lifecycle,
            state: Mutex::new(State::default()),
        })
    }

    /// Get the manager configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Lifecycle pinned by registered participants.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Refuse all further registrations.
    ///
    /// Registered participants stay connected and can still unregister.
    /// Returns the number of participants still pinning the manager.
    pub fn retire(&self) -> usize {
        let remaining = self.lifecycle.retire();
        info!(
            manager = %self.config.name,
            remaining,
            "Bypass manager retired"
        );
        remaining
    }

    /// Register a producer.
    ///
    /// If a consumer with the same token is registered the pair is
    /// connected before the producer becomes visible; on failure the
    /// producer is not registered and the bind error is returned.
    ///
    /// # Errors
    /// - `InvalidArgument` if the token is zero
    /// - `Unavailable` if the manager is retired
    /// - `DuplicateToken` if a producer already holds the token
    /// - `ProducerBind` / `ConsumerBind` if connecting failed
    pub fn register_producer(&self, producer: Arc<dyn BypassProducer>) -> BypassResult<()> {
        let token = producer.token();
        if !token.is_valid() {
            return Err(BypassError::InvalidArgument {
                reason: "producer token is zero",
            });
        }

        let pin = self.pin()?;
        let mut state = self.state.lock();

        let already = state
            .producers
            .values()
            .any(|entry| entry.is(&*producer));
        if already || state.producers.contains_key(&token) {
            warn!(manager = %self.config.name, %token, "Producer token already registered");
            return Err(BypassError::DuplicateToken { token });
        }

        let consumer = state
            .consumers
            .get(&token)
            .map(|entry| Arc::clone(&entry.participant));

        if let Some(consumer) = consumer {
            self.run_connect(&mut state, token, &*producer, &*consumer)?;
            info!(manager = %self.config.name, %token, "Producer registered, bypass connected");
        } else {
            info!(manager = %self.config.name, %token, "Producer registered, no consumer yet");
        }

        state.producers.insert(
            token,
            Registered {
                participant: producer,
                _pin: pin,
            },
        );
        Ok(())
    }

    /// Unregister a producer, disconnecting it first if it is matched.
    ///
    /// A no-op when the token is not registered, or is registered by a
    /// different producer.
    pub fn unregister_producer(&self, producer: &dyn BypassProducer) {
        let token = producer.token();
        if !token.is_valid() {
            return;
        }

        let mut state = self.state.lock();

        let registered = match state.producers.get(&token) {
            None => {
                debug!(manager = %self.config.name, %token, "Producer not registered");
                return;
            }
            Some(entry) if !entry.is(producer) => {
                warn!(manager = %self.config.name, %token, "Producer unregister mismatch");
                return;
            }
            Some(entry) => Arc::clone(&entry.participant),
        };

        let consumer = state
            .consumers
            .get(&token)
            .map(|entry| Arc::clone(&entry.participant));

        if let Some(consumer) = consumer {
            self.run_disconnect(&mut state, token, &*registered, &*consumer);
        }

        // Dropping the entry releases its pin.
        state.producers.remove(&token);
        info!(manager = %self.config.name, %token, "Producer unregistered");
    }

    /// Register a consumer.
    ///
    /// Symmetric to [`register_producer`](Self::register_producer).
    ///
    /// # Errors
    /// - `InvalidArgument` if the token is zero or `ADD_PRODUCER` /
    ///   `DEL_PRODUCER` are not declared
    /// - `Unavailable` if the manager is retired
    /// - `DuplicateToken` if a consumer already holds the token
    /// - `ProducerBind` / `ConsumerBind` if connecting failed
    pub fn register_consumer(&self, consumer: Arc<dyn BypassConsumer>) -> BypassResult<()> {
        let token = consumer.token();
        if !token.is_valid() {
            return Err(BypassError::InvalidArgument {
                reason: "consumer token is zero",
            });
        }
        if !consumer.capabilities().contains(ConsumerCaps::REQUIRED) {
            return Err(BypassError::InvalidArgument {
                reason: "consumer must implement add_producer and del_producer",
            });
        }

        let pin = self.pin()?;
        let mut state = self.state.lock();

        let already = state
            .consumers
            .values()
            .any(|entry| entry.is(&*consumer));
        if already || state.consumers.contains_key(&token) {
            warn!(manager = %self.config.name, %token, "Consumer token already registered");
            return Err(BypassError::DuplicateToken { token });
        }

        let producer = state
            .producers
            .get(&token)
            .map(|entry| Arc::clone(&entry.participant));

        if let Some(producer) = producer {
            self.run_connect(&mut state, token, &*producer, &*consumer)?;
            info!(manager = %self.config.name, %token, "Consumer registered, bypass connected");
        } else {
            info!(manager = %self.config.name, %token, "Consumer registered, no producer yet");
        }

        state.consumers.insert(
            token,
            Registered {
                participant: consumer,
                _pin: pin,
            },
        );
        Ok(())
    }

    /// Unregister a consumer, disconnecting it first if it is matched.
    ///
    /// A no-op when the token is not registered, or is registered by a
    /// different consumer.
    pub fn unregister_consumer(&self, consumer: &dyn BypassConsumer) {
        let token = consumer.token();
        if !token.is_valid() {
            return;
        }

        let mut state = self.state.lock();

        let registered = match state.consumers.get(&token) {
            None => {
                debug!(manager = %self.config.name, %token, "Consumer not registered");
                return;
            }
            Some(entry) if !entry.is(consumer) => {
                warn!(manager = %self.config.name, %token, "Consumer unregister mismatch");
                return;
            }
            Some(entry) => Arc::clone(&entry.participant),
        };

        let producer = state
            .producers
            .get(&token)
            .map(|entry| Arc::clone(&entry.participant));

        if let Some(producer) = producer {
            self.run_disconnect(&mut state, token, &*producer, &*registered);
        }

        state.consumers.remove(&token);
        info!(manager = %self.config.name, %token, "Consumer unregistered");
    }

    /// Whether a producer and a consumer are both registered under `token`.
    pub fn is_connected(&self, token: Token) -> bool {
        let state = self.state.lock();
        state.producers.contains_key(&token) && state.consumers.contains_key(&token)
    }

    /// Whether a producer is registered under `token`.
    pub fn has_producer(&self, token: Token) -> bool {
        self.state.lock().producers.contains_key(&token)
    }

    /// Whether a consumer is registered under `token`.
    pub fn has_consumer(&self, token: Token) -> bool {
        self.state.lock().consumers.contains_key(&token)
    }

    /// Number of registered producers.
    pub fn producer_count(&self) -> usize {
        self.state.lock().producers.len()
    }

    /// Number of registered consumers.
    pub fn consumer_count(&self) -> usize {
        self.state.lock().consumers.len()
    }

    /// Number of connected pairs.
    pub fn connection_count(&self) -> usize {
        self.state.lock().connection_count()
    }

    /// Sorted tokens held by at least one participant.
    pub fn tokens(&self) -> Vec<Token> {
        let state = self.state.lock();
        let tokens: BTreeSet<Token> = state
            .producers
            .keys()
            .chain(state.consumers.keys())
            .copied()
            .collect();
        tokens.into_iter().collect()
    }

    /// Snapshot of manager statistics.
    pub fn stats(&self) -> BypassStats {
        let state = self.state.lock();
        BypassStats {
            producers: state.producers.len(),
            consumers: state.consumers.len(),
            connections: state.connection_count(),
            connects: state.counters.connects,
            connect_failures: state.counters.connect_failures,
            disconnects: state.counters.disconnects,
            contract_violations: state.counters.contract_violations,
            slow_sequences: state.counters.slow_sequences,
            pinned: self.lifecycle.pin_count(),
        }
    }

    fn pin(&self) -> BypassResult<PinGuard> {
        self.lifecycle.try_pin().ok_or_else(|| {
            warn!(manager = %self.config.name, "Registration refused, manager retired");
            BypassError::Unavailable
        })
    }

    fn run_connect(
        &self,
        state: &mut State,
        token: Token,
        producer: &dyn BypassProducer,
        consumer: &dyn BypassConsumer,
    ) -> BypassResult<()> {
        let mut seq = Sequence::new(SequenceKind::Connect, token, &self.config);
        let result = protocol::connect(&mut seq, producer, consumer);
        let report = seq.finish();
        state
            .counters
            .record(SequenceKind::Connect, &report, result.is_ok());
        debug!(
            manager = %self.config.name,
            %token,
            ok = result.is_ok(),
            elapsed_us = u64::try_from(report.elapsed.as_micros()).unwrap_or(u64::MAX),
            "Connect sequence finished"
        );
        result
    }

    fn run_disconnect(
        &self,
        state: &mut State,
        token: Token,
        producer: &dyn BypassProducer,
        consumer: &dyn BypassConsumer,
    ) {
        let mut seq = Sequence::new(SequenceKind::Disconnect, token, &self.config);
        protocol::disconnect(&mut seq, producer, consumer);
        let report = seq.finish();
        state
            .counters
            .record(SequenceKind::Disconnect, &report, true);
        info!(
            manager = %self.config.name,
            %token,
            violations = report.violations,
            elapsed_us = u64::try_from(report.elapsed.as_micros()).unwrap_or(u64::MAX),
            "Bypass disconnected"
        );
    }
}

impl Default for BypassManager {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(BypassManager: Send, Sync);
