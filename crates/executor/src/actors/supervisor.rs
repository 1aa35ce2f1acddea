use std::{collections::HashMap, time::Duration};
use tracing::{error, info, warn};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, Instant},
};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};

type ActorFactory = Box<dyn Fn() -> Box<dyn Actor> + Send + Sync>;

pub struct Supervisor {
    actor_factories: HashMap<ActorType, ActorFactory>,
    running: HashMap<Uuid, ActorType>,
    pulses: HashMap<Uuid, Instant>,
    handles: HashMap<Uuid, JoinHandle<()>>,
    supervisor_tx: mpsc::Sender<ControlMessage>,
    supervisor_rx: mpsc::Receiver<ControlMessage>,
    check_interval: Duration,
    unresponsive_after: Duration,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::with_timeouts(Duration::from_secs(1), Duration::from_secs(3))
    }

    pub fn with_timeouts(check_interval: Duration, unresponsive_after: Duration) -> Self {
        let (supervisor_tx, supervisor_rx) = mpsc::channel::<ControlMessage>(512);
        Self {
            actor_factories: HashMap::new(),
            running: HashMap::new(),
            pulses: HashMap::new(),
            handles: HashMap::new(),
            supervisor_tx,
            supervisor_rx,
            check_interval,
            unresponsive_after,
        }
    }

    pub fn register_actor(&mut self, actor_type: ActorType, factory: ActorFactory) {
        self.actor_factories.insert(actor_type, factory);
    }

    /// Runs until `shutdown` flips to true or its sender is dropped, then
    /// aborts every actor.
    pub async fn start(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut check_interval = time::interval(self.check_interval);

        let actors: Vec<ActorType> = self.actor_factories.keys().copied().collect();
        for actor_type in actors {
            self.spawn_actor(actor_type);
        }

        loop {
            tokio::select! {
                Some(msg) = self.supervisor_rx.recv() => {
                    match msg {
                        ControlMessage::Heartbeat(id) => {
                            if let Some(pulse) = self.pulses.get_mut(&id) {
                                *pulse = Instant::now();
                            }
                        }
                        ControlMessage::Shutdown(id) => {
                            if let Some(actor_type) = self.running.remove(&id) {
                                warn!("{:?} is shutting down gracefully.", actor_type);
                            }
                            self.pulses.remove(&id);
                            if let Some(handle) = self.handles.remove(&id) {
                                handle.abort();
                            }
                        }
                        ControlMessage::Error(id, error_msg) => {
                            let actor_type = self.running.get(&id);
                            error!("Actor {:?} reported error: {}", actor_type, error_msg);
                            if let Some(pulse) = self.pulses.get_mut(&id) {
                                *pulse = Instant::now();
                            }
                        }
                    }
                }

                _ = check_interval.tick() => {
                    let dead_timeout = Instant::now() - self.unresponsive_after;

                    let dead_actors: Vec<Uuid> = self
                        .pulses
                        .iter()
                        .filter(|(_, last)| **last < dead_timeout)
                        .map(|(id, _)| *id)
                        .collect();

                    for id in dead_actors {
                        self.pulses.remove(&id);
                        if let Some(handle) = self.handles.remove(&id) {
                            handle.abort();
                        }
                        if let Some(actor_type) = self.running.remove(&id) {
                            warn!("{:?} is unresponsive! Restarting.", actor_type);
                            self.spawn_actor(actor_type);
                        }
                    }
                }

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Supervisor stopping {} actor(s)", self.handles.len());
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
        self.pulses.clear();
        self.running.clear();
    }

    fn spawn_actor(&mut self, actor_type: ActorType) {
        let Some(factory) = self.actor_factories.get(&actor_type) else {
            return;
        };
        let mut new_actor = factory();
        let id = new_actor.id();
        let tx = self.supervisor_tx.clone();

        let new_actor_handle = tokio::spawn(async move {
            if let Err(e) = new_actor.run(tx).await {
                error!("Actor {:?} crashed: {}", actor_type, e);
            }
        });
        self.handles.insert(id, new_actor_handle);
        self.running.insert(id, actor_type);
        self.pulses.insert(id, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    struct StubActor {
        id: Uuid,
        beats: bool,
    }

    #[async_trait]
    impl Actor for StubActor {
        fn name(&self) -> ActorType {
            ActorType::SignalTicker
        }

        fn id(&self) -> Uuid {
            self.id
        }

        async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
            let heartbeat = self.beats.then(|| self.spawn_heartbeat(supervisor_tx));
            time::sleep(Duration::from_secs(3600)).await;
            if let Some(handle) = heartbeat {
                handle.abort();
            }
            Ok(())
        }
    }

    fn supervisor_with(
        beats: bool,
        unresponsive_after: Duration,
        spawned: Arc<AtomicUsize>,
    ) -> Supervisor {
        let mut supervisor = Supervisor::with_timeouts(Duration::from_millis(50), unresponsive_after);
        supervisor.register_actor(
            ActorType::SignalTicker,
            Box::new(move || {
                spawned.fetch_add(1, Ordering::SeqCst);
                Box::new(StubActor {
                    id: Uuid::new_v4(),
                    beats,
                })
            }),
        );
        supervisor
    }

    #[tokio::test]
    async fn test_silent_actor_is_restarted() {
        let spawned = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(
            supervisor_with(false, Duration::from_millis(150), spawned.clone()).start(shutdown_rx),
        );

        time::sleep(Duration::from_millis(600)).await;
        assert!(spawned.load(Ordering::SeqCst) >= 2);

        shutdown_tx.send(true).unwrap();
        time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_healthy_actor_is_left_alone() {
        let spawned = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(
            supervisor_with(true, Duration::from_millis(1200), spawned.clone()).start(shutdown_rx),
        );

        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(spawned.load(Ordering::SeqCst), 1);

        drop(shutdown_tx);
        time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
