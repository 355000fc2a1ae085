pub mod frequency;
pub mod learned_frequency;
pub mod learned_recency;
pub mod recency;
pub mod skeleton;

pub use frequency::FrequencyForest;
pub use learned_frequency::LearnedFrequencyForest;
pub use learned_recency::LearnedRecencyForest;
pub use recency::RecencyForest;
pub use skeleton::SearchForest;
