pub mod allocator;
pub mod booking;

pub use allocator::{SlotAllocator, SlotStore};
pub use booking::BookingService;
