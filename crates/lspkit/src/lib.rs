//! Client-side runtime for the Language Server Protocol.
//!
//! Layers, roughly bottom to top:
//! - [`codec`] / [`message`]: base-protocol framing and JSON-RPC envelopes.
//! - [`channels`] / [`transport`]: the pending-request table and the
//!   read/write loops that turn a pair of pipes into `request`/`notify`.
//! - [`supervisor`]: how a server process or socket gets spawned and torn
//!   down.
//! - [`capability`] / [`registry`] / [`capabilities`]: what a client
//!   advertises, what it asserts of the server, and what it does with
//!   server-to-client traffic.
//! - [`client`]: the facade that wires all of the above into one handshake
//!   and a set of typed async operations.
//! - [`pool`]: N [`client::Client`]s behind one load-balanced handle.

pub mod capabilities;
pub mod capability;
pub mod channels;
pub mod client;
pub mod codec;
pub mod message;
pub mod pool;
pub mod registry;
pub mod supervisor;
pub mod transport;
pub mod workspace;

pub use capability::{Capability, CapabilityHandle};
pub use client::{Client, ClientOptions, ClientOptionsBuilder, ClientState};
pub use lspkit_core::{Error, ErrorContext, ErrorKind, Result};
pub use pool::{BalancePolicy, Pool};
pub use supervisor::{ContainerBackend, ContainerRuntime, FallbackChain, LocalRuntime, RunningServer, ServerRuntime, SocketAddress, SocketRuntime};
pub use workspace::{FileBuffers, OpenFilesGuard, WorkspaceFolder};
