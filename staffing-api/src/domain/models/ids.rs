use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! serial_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            pub fn new(id: i32) -> Self {
                Self(id)
            }

            pub fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

serial_id!(
    /// An employee identifier (database SERIAL).
    EmployeeId
);
serial_id!(
    /// A project identifier. Projects live outside this service; only the id
    /// is stored on allocations.
    ProjectId
);
serial_id!(
    /// An allocation identifier (database SERIAL).
    AllocationId
);
serial_id!(
    /// An allocation history record identifier (database SERIAL).
    AllocationHistoryId
);
