//! Background tasks that run alongside the HTTP server.

pub mod invites;

pub use invites::{start_invite_polling_task, InvitePollerConfig};
