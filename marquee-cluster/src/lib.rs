pub mod error;
pub mod sync;

pub use error::{Error, Result};
pub use sync::{generate_node_id, LayoutEvent, LayoutHub, RedisRelay, Subscription, SubscriptionGuard};
