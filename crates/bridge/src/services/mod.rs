pub mod dispatch;
pub mod reply;

pub use dispatch::{DispatchReport, InviteDispatcher, SkipReason};
pub use reply::{ReplyError, ReplyHandler, ResolvedReply};
