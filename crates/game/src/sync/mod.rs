mod clock;
mod engine;
mod input;
mod lifecycle;

pub use clock::{Clock, ManualClock, SystemClock, TickScheduler};
pub use engine::{LocalIdentity, SyncEngine};
pub use input::{InputSample, InputSource};
pub use lifecycle::{ConnectionState, DisconnectOutcome, Lifecycle};
