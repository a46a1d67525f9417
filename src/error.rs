use std::sync::Arc;

use thiserror::Error;

/// 应用程序错误类型
///
/// 所有变体都实现 `Clone`：同一个单飞计算的失败需要原样分发给每一个等待者。
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// 考试业务错误
    #[error("考试错误: {0}")]
    Exam(#[from] ExamError),
    /// 翻译服务（oracle）错误
    #[error("翻译服务错误: {0}")]
    Oracle(#[from] OracleError),
    /// 附着在他人发起的计算上，而该计算失败了
    #[error("并发翻译计算失败 {key}: {cause}")]
    ConcurrentComputationFailed {
        key: String,
        #[source]
        cause: Arc<AppError>,
    },
    /// 计算任务 panic
    #[error("翻译计算异常终止 {key}")]
    ComputationPanicked { key: String },
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 存储层错误
    #[error("存储错误: {message}")]
    Storage { message: String },
}

/// 考试业务错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExamError {
    /// 考试不存在
    #[error("考试不存在: {exam_id}")]
    ExamNotFound { exam_id: u64 },
    /// 考试中不存在该序号的题目
    #[error("考试 {exam_id} 中不存在第 {ordinal} 题")]
    QuestionNotFound { exam_id: u64, ordinal: u64 },
    /// 题库不存在
    #[error("题库不存在: {bank_id}")]
    BankNotFound { bank_id: u64 },
    /// 题库题目数量不足
    #[error("题库 {bank_id} 只有 {available} 道题，无法抽取 {requested} 道")]
    NotEnoughQuestions {
        bank_id: u64,
        available: usize,
        requested: usize,
    },
    /// 提交了不存在的选项标签
    #[error("无效的选项标签: {label}")]
    InvalidLabel { label: String },
    /// 提交的答案为空
    #[error("提交的答案不能为空")]
    EmptySubmission,
}

/// 翻译服务错误
///
/// 客户端不做重试，是否重试由上层（单飞缓存的下一次请求）决定。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// 超时
    #[error("翻译服务超时 ({timeout_secs} 秒)")]
    Timeout { timeout_secs: u64 },
    /// 返回结构与输入结构不一致
    #[error("翻译结果结构不符: {detail}")]
    SchemaViolation { detail: String },
    /// 请求失败（网络、鉴权、API 返回错误等）
    #[error("翻译请求失败 (模型: {model}): {message}")]
    Request { model: String, message: String },
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 未知的语言代码
    #[error("未知的语言代码: {code}")]
    UnknownLanguage { code: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建考试不存在错误
    pub fn exam_not_found(exam_id: u64) -> Self {
        AppError::Exam(ExamError::ExamNotFound { exam_id })
    }

    /// 创建题目不存在错误
    pub fn question_not_found(exam_id: u64, ordinal: u64) -> Self {
        AppError::Exam(ExamError::QuestionNotFound { exam_id, ordinal })
    }

    /// 创建结构不符错误
    pub fn schema_violation(detail: impl Into<String>) -> Self {
        AppError::Oracle(OracleError::SchemaViolation {
            detail: detail.into(),
        })
    }

    /// 创建存储错误
    pub fn storage(message: impl Into<String>) -> Self {
        AppError::Storage {
            message: message.into(),
        }
    }

    /// 是否值得稍后重试
    ///
    /// 翻译服务的失败（以及包装它们的并发失败）是暂时性的；
    /// 找不到考试、标签错误之类的问题重试也不会变好。
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Oracle(_) | AppError::ComputationPanicked { .. } => true,
            AppError::ConcurrentComputationFailed { cause, .. } => cause.is_retryable(),
            AppError::Exam(_) | AppError::Config(_) | AppError::Storage { .. } => false,
        }
    }

    /// 剥掉并发包装，拿到最初的失败原因
    pub fn root_cause(&self) -> &AppError {
        match self {
            AppError::ConcurrentComputationFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
