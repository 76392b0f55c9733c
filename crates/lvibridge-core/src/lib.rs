//! Command routing, session lifecycle and device registry for the LVI
//! heater adapter.
//!
//! This crate owns the adapter's behaviour between the FIMP bus and the
//! vendor API:
//!
//! - **[`Router`]**: Single consumer of inbound bus messages. Checks the
//!   session, dispatches on the typed [`Command`], drives the gateway and
//!   registry, and publishes replies through a [`BusPublisher`].
//!   [`process_inbound`] runs it as a cancellable loop over an `mpsc` queue.
//!
//! - **[`SessionManager`]**: Two-step vendor login, refresh-before-dispatch
//!   and reset. Tokens live in a [`Session`] whose `Debug` output is redacted.
//!
//! - **[`DeviceRegistry`]**: Snapshot of homes, rooms and heaters,
//!   rebuilt wholesale by [`DeviceRegistry::resync_all`] and queried by
//!   normalized bus address.
//!
//! - **[`VendorGateway`]**: Seam over `lvibridge-api`'s `LviClient`; tests
//!   substitute fakes or point the real client at a mock server.
//!
//! - **FIMP model** ([`fimp`]): Message envelope and topic addressing.

pub mod command;
pub mod convert;
pub mod error;
pub mod fimp;
pub mod gateway;
pub mod inclusion;
pub mod lifecycle;
pub mod manifest;
pub mod model;
pub mod ports;
pub mod registry;
pub mod router;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Command;
pub use error::CoreError;
pub use fimp::{Address, FimpMessage, Inbound, Props, ValueType};
pub use gateway::{TokenGrant, VendorGateway};
pub use inclusion::InclusionReport;
pub use lifecycle::{AppState, AuthState, ConfigState, ConnectionState, Lifecycle};
pub use model::{Device, DeviceIndex, Home, Room, Snapshot, TargetTemperatures};
pub use ports::{AdapterSettings, BusPublisher, LogControl, PersistedState, StateStore};
pub use registry::{DeviceRegistry, normalize_address};
pub use router::{BusEvent, Router, RouterConfig, process_inbound};
pub use session::{Credentials, RefreshOutcome, Session, SessionManager, SessionState};
