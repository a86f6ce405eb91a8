pub mod batch_clock;
pub mod cycle;

pub use batch_clock::BatchClock;
pub use cycle::CycleState;
