//! Data model (§3): scenario-scoped entities shared by every module.

pub mod enums;
pub mod events;
pub mod ids;
pub mod logs;
pub mod mission;
pub mod planning;
pub mod scenario;
pub mod space;
pub mod strategy;
pub mod tasking;

pub use enums::*;
pub use events::*;
pub use ids::*;
pub use logs::*;
pub use mission::*;
pub use planning::*;
pub use scenario::*;
pub use space::*;
pub use strategy::*;
pub use tasking::*;
