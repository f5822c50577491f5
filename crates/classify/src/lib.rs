pub mod classifier;
pub mod openai;
pub mod pipeline;
pub mod types;

pub use classifier::{Classifier, ClassifierError, MockClassifier};
pub use openai::{OpenAiClassifier, OpenAiConfig};
pub use pipeline::{BulkClassifyReport, ClassificationPipeline, PipelineError};
pub use types::{
    CategoryShare, CategorySuggestion, ClassificationRequest, DeductibilityShare,
    DeductibilitySuggestion, ExpenseInsights,
};
