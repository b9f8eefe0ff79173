pub mod message;
pub mod room;
pub mod user;

pub use message::{Author, Message};
pub use room::{Room, RoomDraft, RoomFields, RoomUpdate, RoomView, Visibility};
pub use user::User;
