pub mod model;
pub mod registry;
pub mod store;

pub use model::{Subscriber, SubscriberId};
pub use registry::SubscriberRegistry;
pub use store::KvStore;
