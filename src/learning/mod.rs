//! The self-improvement loop: label outcomes, retrain, promote.

mod labeler;
mod registry;
mod scheduler;
mod trainer;

pub use labeler::OutcomeLabeler;
pub use registry::ModelRegistry;
pub use scheduler::{
    run_retrain_cycle, RetrainConfig, RetrainScheduler, RetrainSchedulerHandle, RetrainTickReport,
};
pub use trainer::{train_candidate, TrainerConfig, TrainingSample};
