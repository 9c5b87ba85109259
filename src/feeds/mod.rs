//! The feeds relayed through [`crate::watcher`].

pub mod comments;
pub mod favorites;
pub mod modqueue;

pub use comments::CommentFeed;
pub use favorites::{FavoritesWatcher, UserFavorites};
pub use modqueue::ModqueueFeed;
