//! tandem-services: the matching and relay coordinator plus the
//! collaborators it consumes (clock, geolocation, report sink, rate limits).

pub mod clock;
pub mod coordinator;
pub mod geolocation;
pub mod matcher;
pub mod moderation;
pub mod queue;
pub mod rate_limit;
pub mod registry;
pub mod report_sink;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{
    new_shared, Coordinator, CoordinatorError, CoordinatorStats, MatchOutcome, RelayOutcome,
    ReportOutcome, SharedCoordinator, TeardownOutcome, TeardownReason,
};
pub use geolocation::{CachedResolver, GeoResolver, HttpGeoResolver, StaticResolver};
pub use moderation::BlockList;
pub use queue::WaitingQueue;
pub use rate_limit::{KeyedLimiter, TokenBucket};
pub use registry::{Peer, PeerRegistry, PeerStatus, PeerTx};
pub use report_sink::{ReportSink, TracingReportSink};
pub use session::{Session, SessionTable};
