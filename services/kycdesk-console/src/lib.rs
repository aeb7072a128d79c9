//! KycDesk admin console service layer: the authorization gate and the
//! authorized session it guards.

pub mod gate;
pub mod memory;
pub mod session;
pub mod telemetry;

pub use gate::{AdminGate, GateState};
pub use memory::MemoryIdentityProvider;
pub use session::AdminSession;
pub use telemetry::init_tracing;
