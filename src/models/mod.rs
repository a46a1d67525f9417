pub mod exam;
pub mod language;
pub mod loaders;
pub mod view;

pub use exam::{
    Answer, AnswerId, Exam, ExamId, ExamQuestion, Question, QuestionBank, QuestionId,
    TranslationKey, TranslationRecord,
};
pub use language::Language;
pub use loaders::{load_all_question_banks, load_question_bank};
pub use view::{ExamResult, QuestionOption, QuestionView, SubmissionOutcome};
