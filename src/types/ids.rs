//! Newtype identifiers shared across the data model.
//!
//! All entity primary keys are UUIDv4, matching the teacher's `uuid` usage
//! in fleet event identifiers. Newtypes stop a `MissionId` and a
//! `ScenarioId` from being swapped at a call site by accident.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
        #[sqlx(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(ScenarioId);
id_type!(StrategyDocId);
id_type!(PlanningDocId);
id_type!(TaskingOrderId);
id_type!(MissionPackageId);
id_type!(MissionId);
id_type!(SpaceNeedId);
id_type!(SpaceAssetId);
id_type!(ScenarioInjectId);
id_type!(SimEventId);
id_type!(IngestLogId);
id_type!(GenerationLogId);
id_type!(DecisionId);
