//! Domain model (IDs, identity, roles, errors).

pub mod errors;
pub mod identity;
pub mod ids;
pub mod role;

pub use self::errors::{AttachError, BroadcastError, ConfigError, DeliveryError};
pub use self::identity::Identity;
pub use self::ids::{Id, IdMarker, SubscriptionId};
pub use self::role::{Role, StageInfo};
