//! Partitioning of detection rectangles into groups of duplicates.
//!
//! The core is a block-local kernel: every lane of an execution group owns
//! one rectangle, and lanes union matching rectangles through a shared label
//! array using lock-free atomics. [`partitioner::Partitioner`] launches it on
//! the host.

pub mod atomics;
pub mod config;
pub mod group;
pub mod kernel;
pub mod partitioner;
pub mod predicate;
pub mod rect;
pub mod union_find;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use crate::atomics::AtomicMinStrategy;
    pub use crate::config::PartitionConfig;
    pub use crate::partitioner::{Partition, Partitioner};
    pub use crate::predicate::{ComponentPredicate, InSameComponent};
    pub use crate::rect::Rect;
}
