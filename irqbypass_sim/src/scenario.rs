//! Scenario file model.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! log_level = "info"
//! service_name = "vfio-posted-intr"
//!
//! [manager]
//! slow_sequence_threshold_us = 500
//!
//! [[producers]]
//! name = "vfio-msi-0"
//! token = 0x1000
//!
//! [[consumers]]
//! name = "vcpu-route-0"
//! token = 0x1000
//! fail_add_producer = true
//!
//! [[steps]]
//! action = "register_producer"
//! participant = "vfio-msi-0"
//!
//! [[steps]]
//! action = "register_consumer"
//! participant = "vcpu-route-0"
//! expect = "bind_failed"
//! ```

use crate::error::SimError;
use irqbypass::{BypassError, BypassResult, ConsumerCaps, ManagerConfig, ProducerCaps};
use irqbypass_common::config::SharedConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Optional participant call a simulated participant can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// `stop` (either kind)
    Stop,
    /// `start` (either kind)
    Start,
    /// Producer `add_consumer`
    AddConsumer,
    /// Producer `del_consumer`
    DelConsumer,
    /// Consumer `add_producer`
    AddProducer,
    /// Consumer `del_producer`
    DelProducer,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Stop => "stop",
            Capability::Start => "start",
            Capability::AddConsumer => "add_consumer",
            Capability::DelConsumer => "del_consumer",
            Capability::AddProducer => "add_producer",
            Capability::DelProducer => "del_producer",
        };
        f.write_str(name)
    }
}

impl Capability {
    fn producer_flag(self) -> Option<ProducerCaps> {
        match self {
            Capability::Stop => Some(ProducerCaps::STOP),
            Capability::Start => Some(ProducerCaps::START),
            Capability::AddConsumer => Some(ProducerCaps::ADD_CONSUMER),
            Capability::DelConsumer => Some(ProducerCaps::DEL_CONSUMER),
            Capability::AddProducer | Capability::DelProducer => None,
        }
    }

    fn consumer_flag(self) -> Option<ConsumerCaps> {
        match self {
            Capability::Stop => Some(ConsumerCaps::STOP),
            Capability::Start => Some(ConsumerCaps::START),
            Capability::AddProducer => Some(ConsumerCaps::ADD_PRODUCER),
            Capability::DelProducer => Some(ConsumerCaps::DEL_PRODUCER),
            Capability::AddConsumer | Capability::DelConsumer => None,
        }
    }
}

fn all_producer_capabilities() -> Vec<Capability> {
    vec![
        Capability::Stop,
        Capability::Start,
        Capability::AddConsumer,
        Capability::DelConsumer,
    ]
}

fn all_consumer_capabilities() -> Vec<Capability> {
    vec![
        Capability::Stop,
        Capability::Start,
        Capability::AddProducer,
        Capability::DelProducer,
    ]
}

/// Simulated producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProducerSpec {
    /// Unique participant name
    pub name: String,
    /// Raw token; 0 is allowed so rejection can be exercised
    pub token: u64,
    /// Declared calls (default: all four)
    #[serde(default = "all_producer_capabilities")]
    pub capabilities: Vec<Capability>,
    /// `add_consumer` refuses the bind
    #[serde(default)]
    pub fail_add_consumer: bool,
    /// `del_consumer` reports a failure
    #[serde(default)]
    pub fail_del_consumer: bool,
}

impl ProducerSpec {
    /// Declared capabilities as flags. Entries that do not apply to a
    /// producer are ignored; [`Scenario::validate`] rejects them.
    pub fn caps(&self) -> ProducerCaps {
        self.capabilities
            .iter()
            .filter_map(|cap| cap.producer_flag())
            .fold(ProducerCaps::empty(), |acc, flag| acc | flag)
    }
}

/// Simulated consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsumerSpec {
    /// Unique participant name
    pub name: String,
    /// Raw token
    pub token: u64,
    /// Declared calls (default: all four)
    #[serde(default = "all_consumer_capabilities")]
    pub capabilities: Vec<Capability>,
    /// `add_producer` refuses the bind
    #[serde(default)]
    pub fail_add_producer: bool,
    /// `del_producer` reports a failure
    #[serde(default)]
    pub fail_del_producer: bool,
}

impl ConsumerSpec {
    /// Declared capabilities as flags.
    pub fn caps(&self) -> ConsumerCaps {
        self.capabilities
            .iter()
            .filter_map(|cap| cap.consumer_flag())
            .fold(ConsumerCaps::empty(), |acc, flag| acc | flag)
    }
}

/// What a step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Register the named producer
    RegisterProducer,
    /// Unregister the named producer
    UnregisterProducer,
    /// Register the named consumer
    RegisterConsumer,
    /// Unregister the named consumer
    UnregisterConsumer,
    /// Retire the manager
    Retire,
}

impl Action {
    fn participant_kind(self) -> Option<&'static str> {
        match self {
            Action::RegisterProducer | Action::UnregisterProducer => Some("producer"),
            Action::RegisterConsumer | Action::UnregisterConsumer => Some("consumer"),
            Action::Retire => None,
        }
    }

    fn is_unregister(self) -> bool {
        matches!(self, Action::UnregisterProducer | Action::UnregisterConsumer)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::RegisterProducer => "register_producer",
            Action::UnregisterProducer => "unregister_producer",
            Action::RegisterConsumer => "register_consumer",
            Action::UnregisterConsumer => "unregister_consumer",
            Action::Retire => "retire",
        };
        f.write_str(name)
    }
}

/// Result class of a step, as expected by the scenario or observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Success
    #[default]
    Ok,
    /// `BypassError::DuplicateToken`
    DuplicateToken,
    /// `BypassError::InvalidArgument`
    InvalidArgument,
    /// `BypassError::Unavailable`
    Unavailable,
    /// Either bind error
    BindFailed,
}

impl From<&BypassResult<()>> for Outcome {
    fn from(result: &BypassResult<()>) -> Self {
        match result {
            Ok(()) => Outcome::Ok,
            Err(BypassError::DuplicateToken { .. }) => Outcome::DuplicateToken,
            Err(BypassError::InvalidArgument { .. }) => Outcome::InvalidArgument,
            Err(BypassError::Unavailable) => Outcome::Unavailable,
            Err(BypassError::ProducerBind { .. } | BypassError::ConsumerBind { .. }) => {
                Outcome::BindFailed
            }
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Ok => "ok",
            Outcome::DuplicateToken => "duplicate_token",
            Outcome::InvalidArgument => "invalid_argument",
            Outcome::Unavailable => "unavailable",
            Outcome::BindFailed => "bind_failed",
        };
        f.write_str(name)
    }
}

/// One scripted action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepSpec {
    /// Action to perform
    pub action: Action,
    /// Participant name (absent for `retire`)
    #[serde(default)]
    pub participant: Option<String>,
    /// Expected outcome
    #[serde(default)]
    pub expect: Outcome,
}

/// A full scenario file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Log level and scenario name
    pub shared: SharedConfig,
    /// Manager tuning
    #[serde(default)]
    pub manager: ManagerConfig,
    /// Simulated producers
    #[serde(default)]
    pub producers: Vec<ProducerSpec>,
    /// Simulated consumers
    #[serde(default)]
    pub consumers: Vec<ConsumerSpec>,
    /// Steps, run in order
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

impl Scenario {
    /// Validate the scenario.
    ///
    /// # Validation Rules
    /// 1. `[shared]` and `[manager]` are valid
    /// 2. Participant names are unique across both kinds
    /// 3. Capabilities fit the participant kind
    /// 4. Register/unregister steps name an existing participant of the
    ///    right kind; `retire` names none
    /// 5. Unregister steps expect `ok`
    pub fn validate(&self) -> Result<(), SimError> {
        self.shared.validate()?;
        self.manager.validate()?;

        let mut names = HashSet::new();
        for name in self
            .producers
            .iter()
            .map(|p| &p.name)
            .chain(self.consumers.iter().map(|c| &c.name))
        {
            if !names.insert(name.as_str()) {
                return Err(SimError::DuplicateName(name.clone()));
            }
        }

        for producer in &self.producers {
            if let Some(cap) = producer.capabilities.iter().find(|c| c.producer_flag().is_none()) {
                return Err(SimError::InvalidCapability {
                    name: producer.name.clone(),
                    capability: cap.to_string(),
                    kind: "producer",
                });
            }
        }
        for consumer in &self.consumers {
            if let Some(cap) = consumer.capabilities.iter().find(|c| c.consumer_flag().is_none()) {
                return Err(SimError::InvalidCapability {
                    name: consumer.name.clone(),
                    capability: cap.to_string(),
                    kind: "consumer",
                });
            }
        }

        for (idx, step) in self.steps.iter().enumerate() {
            self.validate_step(idx + 1, step)?;
        }
        Ok(())
    }

    fn validate_step(&self, index: usize, step: &StepSpec) -> Result<(), SimError> {
        let Some(expected) = step.action.participant_kind() else {
            if step.participant.is_some() {
                return Err(SimError::InvalidStep {
                    step: index,
                    reason: "retire takes no participant",
                });
            }
            return Ok(());
        };

        let Some(name) = step.participant.as_deref() else {
            return Err(SimError::InvalidStep {
                step: index,
                reason: "missing participant",
            });
        };

        let is_producer = self.producer(name).is_some();
        let is_consumer = self.consumer(name).is_some();
        if !is_producer && !is_consumer {
            return Err(SimError::UnknownParticipant {
                step: index,
                name: name.to_string(),
            });
        }
        if (expected == "producer") != is_producer {
            return Err(SimError::WrongKind {
                step: index,
                name: name.to_string(),
                expected,
            });
        }

        if step.action.is_unregister() && step.expect != Outcome::Ok {
            return Err(SimError::InvalidStep {
                step: index,
                reason: "unregistration always succeeds",
            });
        }
        Ok(())
    }

    /// Find a producer by name.
    pub fn producer(&self, name: &str) -> Option<&ProducerSpec> {
        self.producers.iter().find(|p| p.name == name)
    }

    /// Find a consumer by name.
    pub fn consumer(&self, name: &str) -> Option<&ConsumerSpec> {
        self.consumers.iter().find(|c| c.name == name)
    }
}
