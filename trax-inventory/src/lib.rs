pub mod allocator;
pub mod availability;
pub mod conflict;
pub mod pricing;

pub use allocator::SeatAllocator;
pub use availability::AvailabilityCounter;
pub use conflict::ConflictDetector;
pub use pricing::SegmentPriceCalculator;
