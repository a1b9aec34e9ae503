// Game-session synchronization and turn-authorization engine.
//
// Everything in this crate is synchronous and I/O free: the client crate owns
// the socket and the timers and feeds events into a `GameSession`.

pub mod authz;
pub mod command;
pub mod endpoint;
pub mod identity;
pub mod locks;
pub mod notify;
pub mod protocol;
pub mod session;
pub mod store;
pub mod supervisor;
pub mod view;
