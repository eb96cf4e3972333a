use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::domain::entities::{FilterKeywordRecord, FilterRecord};

const WORD_BREAK_START: &str = r"(?:\b|\s|^)";
const WORD_BREAK_END: &str = r"(?:\b|\s|$)";
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Build the case-insensitive matcher for one filter keyword.
pub fn compile_keyword(keyword: &FilterKeywordRecord) -> Result<Regex, regex::Error> {
    let body = if keyword.regex {
        format!("(?:{})", keyword.keyword)
    } else {
        regex::escape(&keyword.keyword)
    };
    let pattern = if keyword.whole_word {
        format!("{WORD_BREAK_START}{body}{WORD_BREAK_END}")
    } else {
        body
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
}

pub(super) struct CompiledKeyword {
    pub keyword: String,
    pub regex: Regex,
}

/// Compile every keyword of `filter`, logging and skipping the ones that fail.
pub(super) fn compile_filter(filter: &FilterRecord) -> Vec<CompiledKeyword> {
    filter
        .keywords
        .iter()
        .filter_map(|keyword| match compile_keyword(keyword) {
            Ok(regex) => Some(CompiledKeyword {
                keyword: keyword.keyword.clone(),
                regex,
            }),
            Err(err) => {
                warn!(
                    filter_id = %filter.id,
                    keyword_id = %keyword.id,
                    error = %err,
                    "skipping filter keyword that does not compile"
                );
                None
            }
        })
        .collect()
}

impl CompiledKeyword {
    pub fn matches_any(&self, fields: &[String]) -> bool {
        fields.iter().any(|field| self.regex.is_match(field))
    }
}
