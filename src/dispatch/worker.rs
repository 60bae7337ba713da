//! Worker Event Loop
//!
//! Owns the session: the transport, the backend and the object registry. Each
//! round reads one command code from the controller and runs the matching handler
//! to completion before the next code is read. There is never more than one command
//! in flight, and this loop is the only place codes are interpreted.

use super::handlers;
use super::protocol::Command;
use crate::config::WorkerConfig;
use crate::error::Result;
use crate::linalg::local::LocalBackend;
use crate::linalg::types::Backend;
use crate::registry::store::ObjectRegistry;
use crate::transport::endpoint::{Collective, Endpoint};
use crate::types::Code;

use tokio::net::TcpStream;

/// Lifecycle of one worker.
///
/// `Idle -> AwaitingCommand -> Dispatching -> Idle` per round, then
/// `Disconnecting -> Terminated` once an out-of-range code arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    AwaitingCommand,
    Dispatching(Command),
    Disconnecting,
    Terminated,
}

pub struct Worker<C, B: Backend> {
    transport: C,
    backend: B,
    registry: ObjectRegistry<B>,
    state: WorkerState,
    commands_handled: u64,
}

impl<C, B> Worker<C, B>
where
    C: Collective,
    B: Backend,
{
    pub fn new(transport: C, backend: B) -> Self {
        Self {
            transport,
            backend,
            registry: ObjectRegistry::new(),
            state: WorkerState::Idle,
            commands_handled: 0,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn registry(&self) -> &ObjectRegistry<B> {
        &self.registry
    }

    pub fn commands_handled(&self) -> u64 {
        self.commands_handled
    }

    /// Runs rounds until the controller broadcasts a code outside the command
    /// table, then disconnects.
    ///
    /// Any error ends the session immediately; the registry has no rollback, so
    /// there is nothing to resume from.
    #[tracing::instrument(
        name = "worker",
        skip_all,
        fields(rank = self.transport.rank(), size = self.transport.group_size())
    )]
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Worker event loop started");

        loop {
            self.state = WorkerState::AwaitingCommand;
            tracing::debug!("waiting");

            let code: Code = self.transport.broadcast_one().await?;
            tracing::debug!("received {}", code);

            let Some(command) = Command::from_code(code) else {
                tracing::debug!("quit");
                break;
            };

            self.state = WorkerState::Dispatching(command);
            self.dispatch(command).await?;
            self.commands_handled += 1;
            self.state = WorkerState::Idle;
        }

        self.state = WorkerState::Disconnecting;
        self.transport.disconnect().await?;
        self.state = WorkerState::Terminated;

        tracing::info!(
            "Worker event loop finished after {} commands ({} objects)",
            self.commands_handled,
            self.registry.total()
        );

        Ok(())
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        let transport = &mut self.transport;
        let backend = &self.backend;
        let registry = &mut self.registry;

        match command {
            Command::CreateMatrix => handlers::create_matrix(transport, backend, registry).await,
            Command::CreateVector => handlers::create_vector(transport, backend, registry).await,
            Command::AccumulateVector => handlers::accumulate_vector(transport, registry).await,
            Command::ReadVector => handlers::read_vector(transport, registry).await,
            Command::CreateMap => handlers::create_map(transport, backend, registry).await,
            Command::CreateGraph => handlers::create_graph(transport, backend, registry).await,
        }
    }
}

/// Connects to the controller described by `config` and serves one session
/// with the in-memory backend.
pub async fn run_eventloop(config: &WorkerConfig) -> Result<()> {
    tracing::info!(
        "Worker {}/{} connecting to controller at {}",
        config.rank,
        config.group_size,
        config.controller
    );

    let stream = TcpStream::connect(config.controller).await?;
    stream.set_nodelay(true)?;

    let endpoint = Endpoint::connect(
        stream,
        config.rank,
        config.group_size,
        config.recv_timeout,
    )
    .await?;
    let mut worker = Worker::new(endpoint, LocalBackend);

    worker.run().await
}
