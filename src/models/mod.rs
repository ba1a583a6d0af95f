pub mod membership;
pub mod message;
pub mod room;

pub use membership::Membership;
pub use message::{Message, MessageDto, MessageType};
pub use room::Room;
