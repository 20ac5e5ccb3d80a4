//! JSON-RPC bridge to the host-side shim.
//!
//! The shim is a thin script living inside the CAD host. It forwards host
//! events to this process and executes host calls on its behalf. Both
//! directions share one stdio stream of newline-delimited JSON-RPC 2.0.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  openedFromUrl, launchClient, ...  ┌─────────────────┐
//! │              │ ─────────────────────────────────▶ │  BridgeServer   │
//! │  Host shim   │                                    │        │        │
//! │  (in CAD)    │  host/findDataFile, ...            │        ▼        │
//! │              │ ◀───────────────────────────────── │     RpcHost     │
//! └──────────────┘         replies by id              │ (session calls) │
//!                                                     └─────────────────┘
//! ```

pub mod host;
pub mod protocol;
pub mod server;
pub mod transport;

pub use host::RpcHost;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
pub use server::{BridgeOptions, BridgeServer, ServerState, DEFAULT_HOST_TIMEOUT};
pub use transport::{LineTransport, StdioTransport};
