// In: src/table/arrow_impl.rs

use std::sync::Arc;

use arrow::array::{
    new_null_array, ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use serde_json::Value;

use crate::error::IngestError;
use crate::table::ResultTable;

/// The Arrow type chosen for one JSON column, widened value by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    /// Only nulls or missing keys so far.
    Null,
    Boolean,
    Int64,
    Float64,
    Utf8,
    /// Mixed or nested values, stored as JSON text.
    Json,
}

impl ColumnKind {
    fn widen(self, value: &Value) -> ColumnKind {
        use ColumnKind::*;
        match (self, value) {
            (_, Value::Null) => self,
            (Json, _) => Json,
            (Null | Boolean, Value::Bool(_)) => Boolean,
            (Null | Int64, Value::Number(n)) if n.is_i64() => Int64,
            (Null | Int64 | Float64, Value::Number(_)) => Float64,
            (Null | Utf8, Value::String(_)) => Utf8,
            _ => Json,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            ColumnKind::Boolean => DataType::Boolean,
            ColumnKind::Int64 => DataType::Int64,
            ColumnKind::Float64 => DataType::Float64,
            ColumnKind::Null | ColumnKind::Utf8 | ColumnKind::Json => DataType::Utf8,
        }
    }
}

fn infer_kind(table: &ResultTable, name: &str) -> ColumnKind {
    table
        .column(name)
        .flatten()
        .fold(ColumnKind::Null, |kind, value| kind.widen(value))
}

/// DATA MARSHALLING
/// Converts one JSON column of the table into an Arrow array.
fn build_json_column(table: &ResultTable, name: &str, kind: ColumnKind) -> ArrayRef {
    let rows = table.len();
    match kind {
        ColumnKind::Null => new_null_array(&DataType::Utf8, rows),
        ColumnKind::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(rows);
            for value in table.column(name) {
                builder.append_option(value.and_then(Value::as_bool));
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Int64 => {
            let mut builder = Int64Builder::with_capacity(rows);
            for value in table.column(name) {
                builder.append_option(value.and_then(Value::as_i64));
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Float64 => {
            let mut builder = Float64Builder::with_capacity(rows);
            for value in table.column(name) {
                builder.append_option(value.and_then(Value::as_f64));
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Utf8 => {
            let mut builder = StringBuilder::with_capacity(rows, rows * 16);
            for value in table.column(name) {
                builder.append_option(value.and_then(Value::as_str));
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Json => {
            let mut builder = StringBuilder::with_capacity(rows, rows * 32);
            for value in table.column(name) {
                match value {
                    None | Some(Value::Null) => builder.append_null(),
                    Some(Value::String(s)) => builder.append_value(s),
                    Some(other) => builder.append_value(other.to_string()),
                }
            }
            Arc::new(builder.finish())
        }
    }
}

fn build_datetime_column(table: &ResultTable) -> ArrayRef {
    let seconds: Vec<i64> = table
        .iter()
        .map(|post| post.created_datetime().timestamp())
        .collect();
    Arc::new(TimestampSecondArray::from(seconds).with_timezone("UTC"))
}

impl ResultTable {
    /// Exports the table as a single Arrow `RecordBatch`.
    ///
    /// With `columns = None` every column from [`ResultTable::column_names`] is
    /// exported. The datetime column is a non-nullable `Timestamp(Second, UTC)`;
    /// every other column's type is inferred from its values.
    pub fn to_record_batch(&self, columns: Option<&[&str]>) -> Result<RecordBatch, IngestError> {
        let names: Vec<String> = match columns {
            Some(requested) => requested.iter().map(|s| s.to_string()).collect(),
            None => self.column_names(),
        };

        let mut fields = Vec::with_capacity(names.len());
        let mut arrays = Vec::with_capacity(names.len());
        for name in &names {
            if name == self.datetime_field() {
                fields.push(Field::new(
                    name.as_str(),
                    DataType::Timestamp(TimeUnit::Second, Some("UTC".into())),
                    false,
                ));
                arrays.push(build_datetime_column(self));
            } else {
                let kind = infer_kind(self, name);
                fields.push(Field::new(name.as_str(), kind.data_type(), true));
                arrays.push(build_json_column(self, name, kind));
            }
        }

        log_metric!("event"="to_record_batch", "rows"=&self.len(), "columns"=&names.len());

        let options = RecordBatchOptions::new().with_row_count(Some(self.len()));
        let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ParsedPost, RecordPosition};
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{Float64Type, Int64Type, TimestampSecondType};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn table_of(rows: Vec<Value>) -> ResultTable {
        let mut table = ResultTable::new("created_datetime");
        for row in rows {
            let ts = row["created_utc"].as_i64().unwrap();
            table.push(ParsedPost::new(
                row.as_object().cloned().unwrap(),
                ts,
                Utc.timestamp_opt(ts, 0).unwrap(),
                RecordPosition::default(),
            ));
        }
        table
    }

    #[test]
    fn test_inferred_types_per_column() {
        let table = table_of(vec![
            json!({"created_utc": 1000, "score": 3, "ratio": 1, "over_18": false, "title": "a", "media": null}),
            json!({"created_utc": 2000, "score": 7, "ratio": 0.5, "over_18": true, "title": "b", "media": {"type": "x"}}),
        ]);

        let batch = table.to_record_batch(None).unwrap();
        let schema = batch.schema();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(schema.field_with_name("score").unwrap().data_type(), &DataType::Int64);
        assert_eq!(schema.field_with_name("ratio").unwrap().data_type(), &DataType::Float64);
        assert_eq!(schema.field_with_name("over_18").unwrap().data_type(), &DataType::Boolean);
        assert_eq!(schema.field_with_name("title").unwrap().data_type(), &DataType::Utf8);
        assert_eq!(schema.field_with_name("media").unwrap().data_type(), &DataType::Utf8);

        let ratio = batch.column_by_name("ratio").unwrap().as_primitive::<Float64Type>();
        assert_eq!(ratio.value(0), 1.0);
        assert_eq!(ratio.value(1), 0.5);

        let media = batch.column_by_name("media").unwrap().as_string::<i32>();
        assert!(media.is_null(0));
        assert_eq!(media.value(1), r#"{"type":"x"}"#);
    }

    #[test]
    fn test_datetime_column_is_utc_seconds() {
        let table = table_of(vec![json!({"created_utc": 1000}), json!({"created_utc": 2000})]);
        let batch = table.to_record_batch(None).unwrap();

        let field = batch.schema().field_with_name("created_datetime").unwrap().clone();
        assert_eq!(
            field.data_type(),
            &DataType::Timestamp(TimeUnit::Second, Some("UTC".into()))
        );
        assert!(!field.is_nullable());

        let ts = batch
            .column_by_name("created_datetime")
            .unwrap()
            .as_primitive::<TimestampSecondType>();
        assert_eq!(ts.values().to_vec(), vec![1000, 2000]);
    }

    #[test]
    fn test_projection_with_unknown_and_sparse_columns() {
        let table = table_of(vec![
            json!({"created_utc": 1, "score": 10}),
            json!({"created_utc": 2}),
        ]);
        let batch = table
            .to_record_batch(Some(&["score", "does_not_exist"][..]))
            .unwrap();

        assert_eq!(batch.num_columns(), 2);
        let score = batch.column(0).as_primitive::<Int64Type>();
        assert_eq!(score.value(0), 10);
        assert!(score.is_null(1));
        assert_eq!(batch.column(1).null_count(), 2);
    }

    #[test]
    fn test_empty_table_exports_zero_rows() {
        let table = ResultTable::new("created_datetime");
        let batch = table.to_record_batch(None).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 1);
    }
}
