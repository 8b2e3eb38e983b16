pub mod message;
pub mod user;

pub use message::{Message, MessageDraft};
pub use user::{NewUser, ProfileUpdate, User};
