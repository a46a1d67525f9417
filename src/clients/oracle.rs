//! 翻译服务（oracle）边界
//!
//! 远端服务是黑盒：给一批文本片段或一份结构化文档，返回同样结构的译文。
//! 这里只定义边界和结构校验，具体实现见 `llm_oracle`。

use async_trait::async_trait;
use serde_json::Value;

use crate::error::OracleError;
use crate::models::Language;

/// 翻译服务
#[async_trait]
pub trait TranslationOracle: Send + Sync {
    /// 批量翻译
    ///
    /// 返回值与输入等长，第 `i` 个元素是第 `i` 个输入的译文；
    /// 数量不符时返回 `SchemaViolation`。
    async fn translate_batch(
        &self,
        fragments: &[String],
        language: Language,
    ) -> Result<Vec<String>, OracleError>;

    /// 结构化翻译
    ///
    /// 整个文档作为一个整体送去翻译（标题、选项、解析之间的术语保持一致），
    /// 返回的文档必须符合 `shape`。
    async fn translate_structured(
        &self,
        document: &Value,
        language: Language,
        shape: &DocumentShape,
    ) -> Result<Value, OracleError>;
}

/// 文档结构：字段名、数组长度、标量类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentShape {
    Null,
    Bool,
    Number,
    String,
    Array(Vec<DocumentShape>),
    Object(Vec<(String, DocumentShape)>),
}

impl DocumentShape {
    /// 从输入文档推导结构
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => DocumentShape::Null,
            Value::Bool(_) => DocumentShape::Bool,
            Value::Number(_) => DocumentShape::Number,
            Value::String(_) => DocumentShape::String,
            Value::Array(items) => DocumentShape::Array(items.iter().map(Self::of).collect()),
            Value::Object(fields) => {
                let mut fields: Vec<(String, DocumentShape)> = fields
                    .iter()
                    .map(|(name, v)| (name.clone(), Self::of(v)))
                    .collect();
                fields.sort_by(|a, b| a.0.cmp(&b.0));
                DocumentShape::Object(fields)
            }
        }
    }

    /// 校验输出文档，失败时返回第一个不符的位置
    pub fn check(&self, value: &Value) -> Result<(), OracleError> {
        self.check_at("$", value)
    }

    fn check_at(&self, path: &str, value: &Value) -> Result<(), OracleError> {
        match (self, value) {
            (DocumentShape::Null, Value::Null)
            | (DocumentShape::Bool, Value::Bool(_))
            | (DocumentShape::Number, Value::Number(_))
            | (DocumentShape::String, Value::String(_)) => Ok(()),
            (DocumentShape::Array(expected), Value::Array(items)) => {
                if expected.len() != items.len() {
                    return Err(violation(format!(
                        "{} 数组长度应为 {}，实际为 {}",
                        path,
                        expected.len(),
                        items.len()
                    )));
                }
                for (i, (shape, item)) in expected.iter().zip(items).enumerate() {
                    shape.check_at(&format!("{}[{}]", path, i), item)?;
                }
                Ok(())
            }
            (DocumentShape::Object(expected), Value::Object(fields)) => {
                if expected.len() != fields.len() {
                    let mut actual: Vec<&String> = fields.keys().collect();
                    actual.sort();
                    return Err(violation(format!(
                        "{} 字段应为 {:?}，实际为 {:?}",
                        path,
                        expected.iter().map(|(n, _)| n).collect::<Vec<_>>(),
                        actual
                    )));
                }
                for (name, shape) in expected {
                    let field = fields
                        .get(name)
                        .ok_or_else(|| violation(format!("{} 缺少字段 {}", path, name)))?;
                    shape.check_at(&format!("{}.{}", path, name), field)?;
                }
                Ok(())
            }
            (expected, actual) => Err(violation(format!(
                "{} 类型应为 {}，实际为 {}",
                path,
                expected.kind(),
                kind_of(actual)
            ))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            DocumentShape::Null => "null",
            DocumentShape::Bool => "bool",
            DocumentShape::Number => "number",
            DocumentShape::String => "string",
            DocumentShape::Array(_) => "array",
            DocumentShape::Object(_) => "object",
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    DocumentShape::of(value).kind()
}

fn violation(detail: String) -> OracleError {
    OracleError::SchemaViolation { detail }
}

/// 批量翻译的长度校验
pub fn check_batch_len(expected: usize, translated: &[String]) -> Result<(), OracleError> {
    if translated.len() != expected {
        return Err(violation(format!(
            "输入 {} 个片段，返回 {} 个",
            expected,
            translated.len()
        )));
    }
    Ok(())
}
