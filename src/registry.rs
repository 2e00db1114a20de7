//! Registry of managed covers.
//!
//! Each registered cover runs as its own actor task that owns the
//! `MotionController` and consumes `CoverRequest`s in arrival order. Callers
//! talk to it through a cloneable `CoverHandle`.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::{CoverConfig, HostConfig};
use crate::cover::{CoverSnapshot, MotionController};
use crate::error::CoverError;
use crate::observer::StateObserver;
use crate::transport::CommandTransport;

const REQUEST_QUEUE_DEPTH: usize = 16;

/// A request sent from a handle to a cover's actor task.
#[derive(Debug)]
pub enum CoverRequest {
    Open {
        respond_to: oneshot::Sender<Result<(), CoverError>>,
    },
    Close {
        respond_to: oneshot::Sender<Result<(), CoverError>>,
    },
    Stop {
        respond_to: oneshot::Sender<Result<(), CoverError>>,
    },
    SetPosition {
        position: f64,
        respond_to: oneshot::Sender<Result<(), CoverError>>,
    },
    /// Snapshot taken after every earlier request has been applied.
    Snapshot {
        respond_to: oneshot::Sender<CoverSnapshot>,
    },
    /// Cancel motion and stop the actor.
    Shutdown {
        respond_to: oneshot::Sender<()>,
    },
}

#[derive(Debug, Clone)]
pub struct CoverHandle {
    name: String,
    tx: mpsc::Sender<CoverRequest>,
    state: watch::Receiver<CoverSnapshot>,
}

impl CoverHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latest published state, without queueing behind pending commands.
    pub fn current(&self) -> CoverSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CoverSnapshot> {
        self.state.clone()
    }

    pub async fn open(&self) -> Result<(), CoverError> {
        self.request(|respond_to| CoverRequest::Open { respond_to }).await?
    }

    pub async fn close(&self) -> Result<(), CoverError> {
        self.request(|respond_to| CoverRequest::Close { respond_to }).await?
    }

    pub async fn stop(&self) -> Result<(), CoverError> {
        self.request(|respond_to| CoverRequest::Stop { respond_to }).await?
    }

    pub async fn set_position(&self, position: f64) -> Result<(), CoverError> {
        self.request(|respond_to| CoverRequest::SetPosition { position, respond_to })
            .await?
    }

    pub async fn snapshot(&self) -> Result<CoverSnapshot, CoverError> {
        self.request(|respond_to| CoverRequest::Snapshot { respond_to }).await
    }

    async fn shutdown(&self) -> Result<(), CoverError> {
        self.request(|respond_to| CoverRequest::Shutdown { respond_to }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> CoverRequest,
    ) -> Result<T, CoverError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        if self.tx.send(make(resp_tx)).await.is_err() {
            return Err(CoverError::Unavailable(self.name.clone()));
        }
        resp_rx
            .await
            .map_err(|_| CoverError::Unavailable(self.name.clone()))
    }
}

struct RegisteredCover {
    handle: CoverHandle,
    actor: JoinHandle<()>,
}

/// Owns every registered cover's actor.
pub struct CoverRegistry {
    host: HostConfig,
    transport: Arc<dyn CommandTransport>,
    observer: Arc<dyn StateObserver>,
    covers: HashMap<String, RegisteredCover>,
}

impl CoverRegistry {
    pub fn new(
        host: HostConfig,
        transport: Arc<dyn CommandTransport>,
        observer: Arc<dyn StateObserver>,
    ) -> Self {
        Self {
            host,
            transport,
            observer,
            covers: HashMap::new(),
        }
    }

    /// Register a cover using the registry's shared transport.
    pub fn register(&mut self, config: &CoverConfig) -> Result<CoverHandle, CoverError> {
        let transport = self.transport.clone();
        self.register_with_transport(config, transport)
    }

    /// Register a cover that dispatches through its own transport.
    pub fn register_with_transport(
        &mut self,
        config: &CoverConfig,
        transport: Arc<dyn CommandTransport>,
    ) -> Result<CoverHandle, CoverError> {
        if self.covers.contains_key(&config.name) {
            return Err(CoverError::DuplicateCover(config.name.clone()));
        }
        let controller = MotionController::new(config, &self.host, transport, self.observer.clone())?;
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let handle = CoverHandle {
            name: config.name.clone(),
            tx,
            state: controller.subscribe(),
        };
        let actor = tokio::spawn(run_cover(controller, rx));
        self.covers.insert(
            config.name.clone(),
            RegisteredCover {
                handle: handle.clone(),
                actor,
            },
        );
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Option<CoverHandle> {
        self.covers.get(name).map(|cover| cover.handle.clone())
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.covers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.covers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.covers.is_empty()
    }

    /// Stop a cover's motion and actor, then forget it.
    pub async fn remove(&mut self, name: &str) -> Result<(), CoverError> {
        let cover = self
            .covers
            .remove(name)
            .ok_or_else(|| CoverError::UnknownCover(name.to_string()))?;
        retire(cover).await;
        Ok(())
    }

    pub async fn shutdown_all(&mut self) {
        let covers: Vec<RegisteredCover> = self.covers.drain().map(|(_, cover)| cover).collect();
        futures::future::join_all(covers.into_iter().map(retire)).await;
    }
}

async fn retire(cover: RegisteredCover) {
    let name = cover.handle.name().to_string();
    if let Err(e) = cover.handle.shutdown().await {
        tracing::debug!("Curtain {} actor already gone: {}", name, e);
    }
    drop(cover.handle);
    if let Err(e) = cover.actor.await {
        tracing::error!("Curtain {} actor failed: {}", name, e);
    }
}

async fn run_cover(mut controller: MotionController, mut rx: mpsc::Receiver<CoverRequest>) {
    while let Some(request) = rx.recv().await {
        match request {
            CoverRequest::Open { respond_to } => {
                let _ = respond_to.send(controller.open().await);
            }
            CoverRequest::Close { respond_to } => {
                let _ = respond_to.send(controller.close().await);
            }
            CoverRequest::Stop { respond_to } => {
                let _ = respond_to.send(controller.stop().await);
            }
            CoverRequest::SetPosition { position, respond_to } => {
                let _ = respond_to.send(controller.set_position(position).await);
            }
            CoverRequest::Snapshot { respond_to } => {
                let _ = respond_to.send(controller.snapshot());
            }
            CoverRequest::Shutdown { respond_to } => {
                controller.shutdown().await;
                let _ = respond_to.send(());
                return;
            }
        }
    }
    // Every handle dropped.
    controller.shutdown().await;
}
