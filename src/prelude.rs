pub use crate::builder::{Forest, ForestBuilder, ForestPolicy};
pub use crate::capacity::Capacity;
pub use crate::ds::{AccessList, BoundedMaxHeap, FrequencyIndex, NodeId};
pub use crate::forest::{
    FrequencyForest, LearnedFrequencyForest, LearnedRecencyForest, RecencyForest, SearchForest,
};
pub use crate::predict::{prediction_to_level, PredictionSketch, NO_PREDICTION};
pub use crate::stats::ForestStats;
pub use crate::traits::{CoreForest, PredictedForest, SelfTuningForest};
