pub mod registry;

pub use registry::{ActiveSubscription, SubscriptionRegistry};
