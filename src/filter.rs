// In: src/filter.rs

//! The dashboard's first pass over a loaded table: keep the columns analysis
//! needs, drop short posts, match keywords, restrict to a year range.
//!
//! Every surviving post gains an integer `year` field derived from its UTC
//! datetime, so downstream grouping does not have to recompute it.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IngestError;
use crate::table::{ParsedPost, ResultTable};

/// Columns kept by default; the derived datetime column is always kept.
pub const DEFAULT_COLUMNS: &[&str] = &[
    "title",
    "selftext",
    "score",
    "archived",
    "author",
    "created_utc",
    "id",
    "media",
    "num_comments",
    "subreddit",
];

/// The body field that length and keyword filters look at.
pub const BODY_FIELD: &str = "selftext";
/// The derived field added to every kept post.
pub const YEAR_FIELD: &str = "year";

/// Serde-facing description of a filter, e.g. from a dashboard request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct FilterConfig {
    #[serde(default)]
    pub min_chars: usize,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
    /// `None` keeps [`DEFAULT_COLUMNS`].
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

/// A compiled post filter.
#[derive(Debug, Clone)]
pub struct PostFilter {
    min_chars: usize,
    keywords: Vec<String>,
    start_year: Option<i32>,
    end_year: Option<i32>,
    columns: Vec<String>,
}

impl PostFilter {
    /// Keeps posts whose body is longer than `min_chars` characters.
    pub fn new(min_chars: usize) -> Self {
        Self {
            min_chars,
            keywords: Vec::new(),
            start_year: None,
            end_year: None,
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Whole-word, case-insensitive keywords; a post matching any is kept.
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn start_year(mut self, year: i32) -> Self {
        self.start_year = Some(year);
        self
    }

    pub fn end_year(mut self, year: i32) -> Self {
        self.end_year = Some(year);
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the `\b(k1|k2|...)\b` matcher, or `None` without keywords.
    fn keyword_regex(&self) -> Result<Option<Regex>, IngestError> {
        let alternatives: Vec<String> = self
            .keywords
            .iter()
            .filter(|k| !k.is_empty())
            .map(|k| regex::escape(k))
            .collect();
        if alternatives.is_empty() {
            return Ok(None);
        }
        let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
        let regex = RegexBuilder::new(&pattern).case_insensitive(true).build()?;
        Ok(Some(regex))
    }

    fn year_in_range(&self, year: i32) -> bool {
        self.start_year.map_or(true, |start| year >= start)
            && self.end_year.map_or(true, |end| year <= end)
    }

    /// Applies the filter, returning a new table in the same order.
    pub fn apply(&self, table: &ResultTable) -> Result<ResultTable, IngestError> {
        log::info!("Filtering data...");
        let keyword_regex = self.keyword_regex()?;

        let filtered = table.filter_map(|post| {
            let body = post.get_str(BODY_FIELD)?;
            if body.chars().count() <= self.min_chars {
                return None;
            }
            if let Some(regex) = &keyword_regex {
                if !regex.is_match(body) {
                    return None;
                }
            }
            if !self.year_in_range(post.year()) {
                return None;
            }
            Some(self.project(post))
        });

        log::info!("Filtered data to {} rows.", filtered.len());
        Ok(filtered)
    }

    fn project(&self, post: &ParsedPost) -> ParsedPost {
        let mut projected = post.clone();
        let fields = projected.fields_mut();
        fields.retain(|key, _| self.columns.iter().any(|c| c == key));
        fields.insert(YEAR_FIELD.to_string(), Value::from(post.year()));
        projected
    }
}

impl From<FilterConfig> for PostFilter {
    fn from(config: FilterConfig) -> Self {
        let mut filter = PostFilter::new(config.min_chars).keywords(config.keywords);
        filter.start_year = config.start_year;
        filter.end_year = config.end_year;
        if let Some(columns) = config.columns {
            filter = filter.columns(columns);
        }
        filter
    }
}
