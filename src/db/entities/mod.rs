pub mod chats;
pub mod links;
pub mod subscriptions;
