pub mod llm_oracle;
pub mod oracle;

pub use llm_oracle::LlmOracle;
pub use oracle::{DocumentShape, TranslationOracle};
