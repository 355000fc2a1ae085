pub mod access_list;
pub mod bounded_heap;
pub mod frequency_index;

pub use access_list::{AccessList, NodeId};
pub use bounded_heap::BoundedMaxHeap;
pub use frequency_index::FrequencyIndex;
