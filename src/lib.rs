//! # Exam Translation
//!
//! 考试题目按需翻译：题目以源语言存储，展示时翻译成考试的目标语言，
//! 并提前翻译后面几道题，让考生翻页时不用等待。
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 存储边界和后台任务调度
//! - `ExamStore` - 考试 / 题目 / 作答状态的读写能力
//! - `TaskScheduler` - 提交后台任务，不等待
//!
//! ### ② 外部客户端（Clients）
//! - `clients/` - 翻译服务边界
//! - `TranslationOracle` - 批量翻译 / 结构化翻译
//! - `LlmOracle` - 基于 OpenAI 兼容接口的实现
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每次只处理一个键
//! - `permutation` - 按考试种子确定选项顺序
//! - `SingleFlightCache` - 每个键最多一个进行中的计算，失败不缓存
//! - `ExamTranslator` - 翻译一道考试题
//! - `Prefetcher` - 提前翻译后面的题目
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"展示一道题 / 提交一次答案"的完整流程
//! - `QuestionAssembler` - 排列 → 等待翻译 → 预取 → 合并作答状态
//! - `render_text` - 渲染成纯文本
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{LlmOracle, TranslationOracle};
pub use config::{Config, TranslationMode};
pub use error::{AppError, AppResult};
pub use infrastructure::{ExamStore, InMemoryExamStore, TaskScheduler, TokioScheduler};
pub use models::{Language, QuestionView, TranslationKey, TranslationRecord};
pub use services::{Prefetcher, SingleFlightCache};
pub use workflow::{render_text, QuestionAssembler};
