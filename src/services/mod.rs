pub mod batch;
pub mod llm;
pub mod oracle;
pub mod pipeline;
pub mod reconciler;
pub mod store;
pub mod summarizer;
pub mod transplant;
