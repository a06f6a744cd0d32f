//! Domain services layered over the storage traits
//!
//! Each service holds an `Arc<dyn Storage>` plus, where it notifies
//! people, a handle to the [`NotificationOutbox`]. Services enforce the
//! rules the stores deliberately do not: membership role floors, the
//! praying-for duplicate guard and private-comment visibility.

pub mod meetings;
pub mod membership;
pub mod outbox;
pub mod recovery;
pub mod requests;
pub mod sweeper;

pub use meetings::MeetingService;
pub use membership::MembershipService;
pub use outbox::{Audience, NotificationBatch, NotificationOutbox};
pub use recovery::RecoveryService;
pub use requests::RequestService;
pub use sweeper::StaleSweeper;
