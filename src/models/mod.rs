pub mod answer_key;
pub mod graded;
pub mod captured;
pub mod loaders;
pub mod scoring;

pub use answer_key::{AnswerKey, ComplexChoiceAnswer, EssayAnswer, MultipleChoiceAnswer};
pub use graded::{GradedStudent, SectionScores};
pub use captured::CapturedImage;
pub use loaders::{list_image_files, load_image_file};
pub use scoring::{ScoreField, ScoringConfig};
