//! Correlation identifiers.
//!
//! All identifiers are opaque strings on the wire. Fresh values are UUID v4.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of one benchmark invocation. Referenced by every message and record.
    TestRunId
);

string_id!(
    /// Identifier of a dispatch group (session, partition or message group).
    GroupId
);

string_id!(
    /// Identity of the consumer process that produced a record.
    InstanceId
);

string_id!(
    /// Unique per processed message; lets the collector drop broker redeliveries.
    ExecutionId
);

static PROCESS_INSTANCE_ID: OnceLock<InstanceId> = OnceLock::new();

impl InstanceId {
    /// The instance id of this process.
    ///
    /// Generated on first use and stable for the lifetime of the process.
    pub fn process() -> InstanceId {
        PROCESS_INSTANCE_ID.get_or_init(InstanceId::generate).clone()
    }
}
