//! Scenario execution.

use crate::error::SimError;
use crate::participants::{CallLog, CallRecord, SimConsumer, SimProducer};
use crate::scenario::{Action, Outcome, Scenario};
use irqbypass::{BypassManager, BypassStats};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// 1-based index
    pub index: usize,
    /// Action performed
    pub action: Action,
    /// Participant name, if any
    pub participant: Option<String>,
    /// Outcome the scenario expected
    pub expected: Outcome,
    /// Outcome observed
    pub outcome: Outcome,
    /// `expected == outcome`
    pub matched: bool,
    /// Error text when the call failed
    pub error: Option<String>,
    /// Participant calls made during this step
    pub calls: Vec<CallRecord>,
}

/// Result of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    /// Scenario service name
    pub scenario: String,
    /// Per-step results
    pub steps: Vec<StepReport>,
    /// Every participant call, in order
    pub calls: Vec<CallRecord>,
    /// Manager statistics after the last step
    pub stats: BypassStats,
}

impl SimReport {
    /// Whether every step matched its expectation.
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|step| step.matched)
    }

    /// Steps that did not match.
    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|step| !step.matched)
    }
}

/// A validated scenario bound to a fresh manager.
pub struct Simulation {
    scenario: Scenario,
    manager: BypassManager,
    log: Arc<CallLog>,
    producers: HashMap<String, Arc<SimProducer>>,
    consumers: HashMap<String, Arc<SimConsumer>>,
}

impl Simulation {
    /// Validate `scenario` and build its participants.
    ///
    /// # Errors
    /// Any [`Scenario::validate`] failure.
    pub fn new(scenario: Scenario) -> Result<Self, SimError> {
        scenario.validate()?;
        let manager = BypassManager::with_config(scenario.manager.clone())?;
        let log = CallLog::new();

        let producers = scenario
            .producers
            .iter()
            .map(|spec| {
                let producer = Arc::new(SimProducer::new(spec, Arc::clone(&log)));
                (producer.name().to_string(), producer)
            })
            .collect();
        let consumers = scenario
            .consumers
            .iter()
            .map(|spec| {
                let consumer = Arc::new(SimConsumer::new(spec, Arc::clone(&log)));
                (consumer.name().to_string(), consumer)
            })
            .collect();

        Ok(Self {
            scenario,
            manager,
            log,
            producers,
            consumers,
        })
    }

    /// Execute every step in order.
    pub fn run(self) -> SimReport {
        info!(
            scenario = %self.scenario.shared.service_name,
            steps = self.scenario.steps.len(),
            "Simulation starting"
        );

        let mut steps = Vec::with_capacity(self.scenario.steps.len());
        for (idx, spec) in self.scenario.steps.iter().enumerate() {
            let start = self.log.len();
            let name = spec.participant.as_deref();
            let result = self.execute(spec.action, name);
            let outcome = Outcome::from(&result);
            let matched = outcome == spec.expect;

            if let Err(err) = &result {
                if err.is_bind_failure() {
                    info!(step = idx + 1, participant = name, error = %err, "Participant refused bind");
                }
            }

            if matched {
                info!(step = idx + 1, action = %spec.action, participant = name, %outcome, "Step ok");
            } else {
                warn!(
                    step = idx + 1,
                    action = %spec.action,
                    participant = name,
                    expected = %spec.expect,
                    %outcome,
                    "Step did not match expectation"
                );
            }

            steps.push(StepReport {
                index: idx + 1,
                action: spec.action,
                participant: spec.participant.clone(),
                expected: spec.expect,
                outcome,
                matched,
                error: result.err().map(|e| e.to_string()),
                calls: self.log.since(start),
            });
        }

        let report = SimReport {
            scenario: self.scenario.shared.service_name.clone(),
            steps,
            calls: self.log.snapshot(),
            stats: self.manager.stats(),
        };
        info!(
            scenario = %report.scenario,
            passed = report.passed(),
            calls = report.calls.len(),
            "Simulation finished"
        );
        report
    }

    fn execute(&self, action: Action, name: Option<&str>) -> irqbypass::BypassResult<()> {
        // Names were checked by `Scenario::validate`; a miss here is a no-op.
        let producer = name.and_then(|n| self.producers.get(n));
        let consumer = name.and_then(|n| self.consumers.get(n));

        match action {
            Action::RegisterProducer => match producer {
                Some(p) => self.manager.register_producer(p.clone()),
                None => Ok(()),
            },
            Action::UnregisterProducer => {
                if let Some(p) = producer {
                    self.manager.unregister_producer(&**p);
                }
                Ok(())
            }
            Action::RegisterConsumer => match consumer {
                Some(c) => self.manager.register_consumer(c.clone()),
                None => Ok(()),
            },
            Action::UnregisterConsumer => {
                if let Some(c) = consumer {
                    self.manager.unregister_consumer(&**c);
                }
                Ok(())
            }
            Action::Retire => {
                self.manager.retire();
                Ok(())
            }
        }
    }
}
