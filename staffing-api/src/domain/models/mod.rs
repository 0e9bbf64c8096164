mod allocation;
mod employee;
mod history;
mod ids;

pub use self::allocation::*;
pub use employee::*;
pub use history::*;
pub use ids::*;
