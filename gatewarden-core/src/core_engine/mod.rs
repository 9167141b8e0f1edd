//! Moderation Engine
//!
//! Consumes membership-change events, consults the group registry and the
//! member ledger, applies the admission algorithm, and issues ban commands
//! through the moderation gateway.

pub mod clock;
pub mod engine;
pub mod event;
pub mod gateway;

pub use clock::{day_bounds, Clock, SystemClock};
pub use engine::{EngineError, ModerationEngine, Outcome};
pub use event::{EventKind, MembershipEvent, Participant};
pub use gateway::{GatewayError, ModerationGateway};
