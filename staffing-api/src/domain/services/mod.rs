mod allocation;

pub use self::allocation::AllocationServiceImpl;
