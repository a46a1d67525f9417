pub mod exam_translator;
pub mod permutation;
pub mod prefetcher;
pub mod single_flight;

pub use exam_translator::{ExamTranslator, QuestionTranslator};
pub use prefetcher::{Prefetcher, TranslationCache};
pub use single_flight::SingleFlightCache;
