pub mod calendar;
pub mod notifier;
pub mod repository;

pub use calendar::*;
pub use notifier::*;
pub use repository::*;
