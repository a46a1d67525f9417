pub mod question_assembler;
pub mod render;

pub use question_assembler::QuestionAssembler;
pub use render::render_text;
