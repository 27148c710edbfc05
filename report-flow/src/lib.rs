pub mod config;
pub mod error;
pub mod extract;
pub mod generate;
pub mod normalize;
pub mod pipeline;
pub mod report;

// Re-export commonly used types
pub use config::{GeneratorConfig, Provider};
pub use error::{ReportError, Result};
pub use extract::{ExtractedText, extract};
pub use generate::{CompletionProvider, GeminiProvider, GroqProvider, ReportGenerator};
pub use normalize::{MANDATORY_SCREENS, normalize};
pub use pipeline::{ReportPipeline, canned_report};
pub use report::{LayoutSection, MediaType, RawDocument, Screen, StyleSheet, UIReport};
