pub mod csv_export;
pub mod grading;
pub mod key_extraction;
pub mod ledger;
pub mod llm_service;
pub mod response_schema;

pub use csv_export::{default_export_path, export_csv, write_csv_file};
pub use grading::Grader;
pub use key_extraction::KeyExtractor;
pub use ledger::ResultsLedger;
pub use llm_service::{LlmService, VisionModel};
