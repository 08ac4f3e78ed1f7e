// In: src/table/mod.rs

//! The in-memory result of an ingest pass.
//!
//! A [`ResultTable`] is an ordered list of [`ParsedPost`]s in archive order.
//! Rows are schemaless JSON objects; the only guaranteed columns are the
//! source timestamp and the derived UTC datetime. [`arrow_impl`] turns the
//! table into a columnar `RecordBatch` for analysis code.

use chrono::{DateTime, Datelike, Utc};
use hashbrown::HashSet;
use serde_json::{Map, Value};

pub mod arrow_impl;

/// Where a record sat in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordPosition {
    /// 1-based line number in the decompressed stream.
    pub line: u64,
    /// Decompressed byte offset just past the record's newline.
    pub decompressed_offset: u64,
    /// Archive bytes consumed by the decompressor when the record was emitted.
    pub compressed_offset: u64,
}

/// One accepted record: its JSON fields plus the derived UTC datetime.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPost {
    fields: Map<String, Value>,
    created_utc: i64,
    created_datetime: DateTime<Utc>,
    position: RecordPosition,
}

impl ParsedPost {
    pub(crate) fn new(
        fields: Map<String, Value>,
        created_utc: i64,
        created_datetime: DateTime<Utc>,
        position: RecordPosition,
    ) -> Self {
        Self {
            fields,
            created_utc,
            created_datetime,
            position,
        }
    }

    /// The original JSON field, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Convenience accessor for string fields like `title` or `selftext`.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    /// The source timestamp as whole epoch seconds.
    pub fn created_utc(&self) -> i64 {
        self.created_utc
    }

    pub fn created_datetime(&self) -> DateTime<Utc> {
        self.created_datetime
    }

    pub fn year(&self) -> i32 {
        self.created_datetime.year()
    }

    pub fn position(&self) -> RecordPosition {
        self.position
    }
}

/// Ordered collection of parsed posts, insertion order = archive order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    posts: Vec<ParsedPost>,
    datetime_field: String,
}

impl ResultTable {
    pub fn new(datetime_field: impl Into<String>) -> Self {
        Self {
            posts: Vec::new(),
            datetime_field: datetime_field.into(),
        }
    }

    pub(crate) fn push(&mut self, post: ParsedPost) {
        self.posts.push(post);
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParsedPost> {
        self.posts.iter()
    }

    pub fn posts(&self) -> &[ParsedPost] {
        &self.posts
    }

    pub fn into_posts(self) -> Vec<ParsedPost> {
        self.posts
    }

    /// Name of the derived datetime column.
    pub fn datetime_field(&self) -> &str {
        &self.datetime_field
    }

    /// One entry per row: the row's value for `name`, or `None` when absent.
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Option<&'a Value>> + 'a {
        self.posts.iter().map(move |post| post.get(name))
    }

    /// All JSON keys in first-seen order across rows, then the datetime column.
    pub fn column_names(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut names = Vec::new();
        for post in &self.posts {
            for key in post.fields.keys() {
                if key != &self.datetime_field && seen.insert(key.as_str()) {
                    names.push(key.clone());
                }
            }
        }
        names.push(self.datetime_field.clone());
        names
    }

    /// Builds a new table from the posts that `f` maps to `Some`.
    pub(crate) fn filter_map<F>(&self, mut f: F) -> ResultTable
    where
        F: FnMut(&ParsedPost) -> Option<ParsedPost>,
    {
        ResultTable {
            posts: self.posts.iter().filter_map(&mut f).collect(),
            datetime_field: self.datetime_field.clone(),
        }
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a ParsedPost;
    type IntoIter = std::slice::Iter<'a, ParsedPost>;

    fn into_iter(self) -> Self::IntoIter {
        self.posts.iter()
    }
}

impl IntoIterator for ResultTable {
    type Item = ParsedPost;
    type IntoIter = std::vec::IntoIter<ParsedPost>;

    fn into_iter(self) -> Self::IntoIter {
        self.posts.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn post(value: Value, ts: i64) -> ParsedPost {
        let fields = value.as_object().cloned().unwrap();
        ParsedPost::new(
            fields,
            ts,
            Utc.timestamp_opt(ts, 0).unwrap(),
            RecordPosition::default(),
        )
    }

    #[test]
    fn test_column_names_are_first_seen_order() {
        let mut table = ResultTable::new("created_datetime");
        table.push(post(json!({"created_utc": 1, "title": "a"}), 1));
        table.push(post(json!({"created_utc": 2, "author": "b", "title": "c"}), 2));

        assert_eq!(
            table.column_names(),
            vec!["created_utc", "title", "author", "created_datetime"]
        );
    }

    #[test]
    fn test_column_yields_none_for_missing_keys() {
        let mut table = ResultTable::new("created_datetime");
        table.push(post(json!({"created_utc": 1, "score": 5}), 1));
        table.push(post(json!({"created_utc": 2}), 2));

        let scores: Vec<_> = table.column("score").collect();
        assert_eq!(scores, vec![Some(&json!(5)), None]);
    }

    #[test]
    fn test_into_posts_keeps_archive_order() {
        let mut table = ResultTable::new("created_datetime");
        for ts in [30, 10, 20] {
            table.push(post(json!({"created_utc": ts}), ts));
        }
        let order: Vec<i64> = table.into_posts().iter().map(ParsedPost::created_utc).collect();
        assert_eq!(order, vec![30, 10, 20]);
    }

    #[test]
    fn test_year_is_derived_from_datetime() {
        // 2021-03-04T05:06:07Z
        let p = post(json!({"created_utc": 1_614_834_367}), 1_614_834_367);
        assert_eq!(p.year(), 2021);
        assert_eq!(p.created_utc(), 1_614_834_367);
    }
}
