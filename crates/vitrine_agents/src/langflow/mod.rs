//! Agents that talk to Langflow workflows.

pub mod fetcher;
pub mod formatter;
pub mod processor;

pub use fetcher::LangflowFetcher;
pub use formatter::LangflowFormatter;
pub use processor::LangflowProcessor;
