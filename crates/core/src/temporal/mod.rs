//! Time-ordered frame stacks
//!
//! A [`FrameStack`] holds every acquisition of one tile: per-frame bands,
//! masks and scalars, plus timeless masks such as the nominal water extent.

mod frame;
mod series;
mod stack;

pub use frame::Frame;
pub use series::ScalarSeries;
pub use stack::FrameStack;
