pub mod membership_service;
pub mod message_service;
pub mod reconciler;
pub mod room_service;

pub use membership_service::MembershipService;
pub use message_service::{MessageService, SendOutcome};
pub use reconciler::Reconciler;
pub use room_service::{DirectRoomOutcome, RoomOverview, RoomService};
