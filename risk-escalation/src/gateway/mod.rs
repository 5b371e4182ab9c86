//! Notification gateways.
//!
//! - Batched messaging behind the [`MessagingGateway`] trait
//! - Live push to connected clients via [`LiveChannelRegistry`]
//! - Mock messaging gateway for testing

pub mod live;
pub mod mock;
pub mod traits;

pub use live::{LiveChannel, LiveChannelRegistry};
pub use mock::{MockMessagingGateway, SentBatch};
pub use traits::{DeliveryReport, LiveEvent, LivePush, MessagingGateway};
