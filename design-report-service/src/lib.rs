pub mod figma;
pub mod models;
pub mod service;

pub use figma::FigmaClient;
pub use models::ReportResponse;
pub use service::{AppState, create_app};
