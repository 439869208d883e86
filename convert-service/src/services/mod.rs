pub mod converter;
pub mod metrics;
pub mod scratch;

pub use converter::MarkdownConverter;
pub use metrics::{get_metrics, init_metrics};
pub use scratch::ScratchPair;
