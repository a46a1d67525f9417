use crate::error::ConfigError;

/// 考试目标语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// 英语
    English,
    /// 韩语
    Korean,
    /// 西班牙语
    Spanish,
    /// 法语
    French,
}

static LANGUAGE_CODES: phf::Map<&'static str, Language> = phf::phf_map! {
    "en" => Language::English,
    "ko" => Language::Korean,
    "es" => Language::Spanish,
    "fr" => Language::French,
};

impl Language {
    /// 获取 ISO 639-1 代码
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Korean => "ko",
            Language::Spanish => "es",
            Language::French => "fr",
        }
    }

    /// 获取英文名称（写进翻译提示词）
    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Korean => "Korean",
            Language::Spanish => "Spanish",
            Language::French => "French",
        }
    }

    /// 从代码解析语言，不区分大小写
    pub fn from_code(code: &str) -> Result<Self, ConfigError> {
        LANGUAGE_CODES
            .get(code.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| ConfigError::UnknownLanguage {
                code: code.to_string(),
            })
    }

    /// 所有支持的语言
    pub fn all() -> &'static [Language] {
        &[
            Language::English,
            Language::Korean,
            Language::Spanish,
            Language::French,
        ]
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Language {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}
