// Module: sync

pub mod events;
pub mod layout_hub;
pub mod redis_relay;

pub use events::LayoutEvent;
pub use layout_hub::{EventSender, LayoutHub, SessionId, Subscription, SubscriptionGuard};
pub use redis_relay::{generate_node_id, layout_channel, RedisRelay, LAYOUT_CHANNEL};
