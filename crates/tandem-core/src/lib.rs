//! tandem-core: shared types, wire protocol, and configuration.
//! All other tandem crates depend on this one.

pub mod config;
pub mod id;
pub mod location;
pub mod protocol;
pub mod report;

pub use id::{PeerId, SessionId};
pub use location::Location;
pub use protocol::{ClientMessage, PartnerInfo, ServerMessage, SignalKind, SignalPayload};
pub use report::{ReportReason, ReportRecord};
