//! Model-based property test: random register/unregister sequences are
//! checked against a plain set model after every operation.

mod common;

use common::{Recorder, RecordingConsumer, RecordingProducer};
use irqbypass::{BindError, BypassError, BypassManager, Token};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Op {
    RegisterProducer(u64),
    UnregisterProducer(u64),
    RegisterConsumer { token: u64, refusing: bool },
    UnregisterConsumer(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let token = 1u64..=4;
    prop_oneof![
        token.clone().prop_map(Op::RegisterProducer),
        token.clone().prop_map(Op::UnregisterProducer),
        (token.clone(), prop::bool::weighted(0.2))
            .prop_map(|(token, refusing)| Op::RegisterConsumer { token, refusing }),
        token.prop_map(Op::UnregisterConsumer),
    ]
}

#[derive(Default)]
struct Model {
    producers: HashMap<u64, Arc<RecordingProducer>>,
    /// Registered consumers and whether they refuse to bind.
    consumers: HashMap<u64, (Arc<RecordingConsumer>, bool)>,
    connects: u64,
    connect_failures: u64,
    disconnects: u64,
}

impl Model {
    fn apply(&mut self, manager: &BypassManager, log: &Arc<Recorder>, op: Op) {
        match op {
            Op::RegisterProducer(token) => {
                let producer = RecordingProducer::new(token, log).build();
                let result = manager.register_producer(producer.clone());
                if self.producers.contains_key(&token) {
                    assert!(matches!(result, Err(BypassError::DuplicateToken { .. })));
                } else if let Some((_, refusing)) = self.consumers.get(&token) {
                    if *refusing {
                        assert!(matches!(result, Err(BypassError::ConsumerBind { .. })));
                        self.connect_failures += 1;
                    } else {
                        assert_eq!(result, Ok(()));
                        self.connects += 1;
                        self.producers.insert(token, producer);
                    }
                } else {
                    assert_eq!(result, Ok(()));
                    self.producers.insert(token, producer);
                }
            }
            Op::UnregisterProducer(token) => match self.producers.remove(&token) {
                Some(producer) => {
                    manager.unregister_producer(&*producer);
                    if self.consumers.contains_key(&token) {
                        self.disconnects += 1;
                    }
                }
                None => {
                    let stranger = RecordingProducer::new(token, log).build();
                    manager.unregister_producer(&*stranger);
                }
            },
            Op::RegisterConsumer { token, refusing } => {
                let mut builder = RecordingConsumer::new(token, log);
                if refusing {
                    builder = builder.refusing(BindError::Busy("model".to_string()));
                }
                let consumer = builder.build();
                let result = manager.register_consumer(consumer.clone());
                if self.consumers.contains_key(&token) {
                    assert!(matches!(result, Err(BypassError::DuplicateToken { .. })));
                } else if self.producers.contains_key(&token) && refusing {
                    assert!(matches!(result, Err(BypassError::ConsumerBind { .. })));
                    self.connect_failures += 1;
                } else {
                    assert_eq!(result, Ok(()));
                    if self.producers.contains_key(&token) {
                        self.connects += 1;
                    }
                    self.consumers.insert(token, (consumer, refusing));
                }
            }
            Op::UnregisterConsumer(token) => match self.consumers.remove(&token) {
                Some((consumer, _)) => {
                    manager.unregister_consumer(&*consumer);
                    if self.producers.contains_key(&token) {
                        self.disconnects += 1;
                    }
                }
                None => {
                    let stranger = RecordingConsumer::new(token, log).build();
                    manager.unregister_consumer(&*stranger);
                }
            },
        }
    }

    fn check(&self, manager: &BypassManager) {
        for raw in 1u64..=4 {
            let token = Token::new(raw);
            assert_eq!(manager.has_producer(token), self.producers.contains_key(&raw));
            assert_eq!(manager.has_consumer(token), self.consumers.contains_key(&raw));
            assert_eq!(
                manager.is_connected(token),
                self.producers.contains_key(&raw) && self.consumers.contains_key(&raw)
            );
        }

        let stats = manager.stats();
        assert_eq!(stats.producers, self.producers.len());
        assert_eq!(stats.consumers, self.consumers.len());
        assert_eq!(stats.connects, self.connects);
        assert_eq!(stats.connect_failures, self.connect_failures);
        assert_eq!(stats.disconnects, self.disconnects);
        assert_eq!(stats.pinned, self.producers.len() + self.consumers.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn registry_matches_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let log = Recorder::new();
        let manager = BypassManager::new();
        let mut model = Model::default();

        for op in ops {
            model.apply(&manager, &log, op);
            model.check(&manager);
        }

        // Drain: everything unregisters cleanly and releases its pin.
        for (_, producer) in model.producers.drain() {
            manager.unregister_producer(&*producer);
        }
        for (_, (consumer, _)) in model.consumers.drain() {
            manager.unregister_consumer(&*consumer);
        }
        prop_assert_eq!(manager.lifecycle().pin_count(), 0);
        prop_assert_eq!(manager.connection_count(), 0);
    }
}
