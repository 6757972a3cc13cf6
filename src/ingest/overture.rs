//! Reads Overture GeoParquet files into [`OvertureRecord`]s.
//!
//! Nested columns (`names.primary`, `categories.primary`) are read from their
//! struct parents. Geometry is WKB and decoded with geozero.

use crate::error::{FinderError, io_err};
use crate::models::{OvertureRecord, OvertureTaxonomy};
use arrow::array::{Array, ArrayRef, AsArray, BinaryArray, Float64Array, StringArray, StructArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use geozero::ToGeo;
use geozero::wkb::Wkb;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Top-level columns carrying at least one taxonomy level.
const TAXONOMY_COLUMNS: [&str; 4] = ["categories", "basic_category", "subtype", "class"];

pub fn has_taxonomy_columns(schema: &Schema) -> bool {
    TAXONOMY_COLUMNS
        .iter()
        .any(|name| schema.column_with_name(name).is_some())
}

/// A string column, possibly nested one level inside a struct column.
struct TextColumn<'a> {
    parent: Option<&'a StructArray>,
    values: Option<StringArray>,
}

impl<'a> TextColumn<'a> {
    fn top_level(batch: &'a RecordBatch, name: &str) -> Result<Self, ArrowError> {
        Ok(Self {
            parent: None,
            values: batch.column_by_name(name).map(as_utf8).transpose()?,
        })
    }

    fn nested(batch: &'a RecordBatch, parent: &str, child: &str) -> Result<Self, ArrowError> {
        let parent = batch.column_by_name(parent).and_then(|c| c.as_struct_opt());
        let values = parent
            .and_then(|p| p.column_by_name(child))
            .map(as_utf8)
            .transpose()?;
        Ok(Self { parent, values })
    }

    fn get(&self, row: usize) -> Option<String> {
        if self.parent.is_some_and(|p| p.is_null(row)) {
            return None;
        }
        let values = self.values.as_ref()?;
        values.is_valid(row).then(|| values.value(row).to_string())
    }
}

fn as_utf8(array: &ArrayRef) -> Result<StringArray, ArrowError> {
    Ok(cast(array, &DataType::Utf8)?.as_string::<i32>().clone())
}

fn as_f64(array: &ArrayRef) -> Result<Float64Array, ArrowError> {
    Ok(cast(array, &DataType::Float64)?
        .as_primitive::<Float64Type>()
        .clone())
}

fn as_binary(array: &ArrayRef) -> Result<BinaryArray, ArrowError> {
    Ok(cast(array, &DataType::Binary)?.as_binary::<i32>().clone())
}

fn decode_wkb(bytes: &[u8]) -> Option<geo_types::Geometry<f64>> {
    match Wkb(bytes.to_vec()).to_geo() {
        Ok(geometry) => Some(geometry),
        Err(e) => {
            debug!("Dropping undecodable WKB geometry: {}", e);
            None
        }
    }
}

/// Converts one record batch. Missing columns read as absent values.
pub fn records_from_batch(batch: &RecordBatch) -> Result<Vec<OvertureRecord>, FinderError> {
    let ids = TextColumn::top_level(batch, "id")?;
    let names = TextColumn::nested(batch, "names", "primary")?;
    let themes = TextColumn::top_level(batch, "theme")?;
    let kinds = TextColumn::top_level(batch, "type")?;
    let subtypes = TextColumn::top_level(batch, "subtype")?;
    let classes = TextColumn::top_level(batch, "class")?;
    let basic_categories = TextColumn::top_level(batch, "basic_category")?;
    let primary_categories = TextColumn::nested(batch, "categories", "primary")?;

    let confidence = batch.column_by_name("confidence").map(as_f64).transpose()?;
    let geometry = batch.column_by_name("geometry").map(as_binary).transpose()?;

    let records = (0..batch.num_rows())
        .map(|row| OvertureRecord {
            id: ids.get(row).unwrap_or_default(),
            name: names.get(row),
            theme: themes.get(row),
            kind: kinds.get(row),
            taxonomy: OvertureTaxonomy {
                primary_category: primary_categories.get(row),
                basic_category: basic_categories.get(row),
                subtype: subtypes.get(row),
                class: classes.get(row),
            },
            confidence: confidence
                .as_ref()
                .and_then(|c| c.is_valid(row).then(|| c.value(row))),
            geometry: geometry
                .as_ref()
                .and_then(|g| g.is_valid(row).then(|| g.value(row)))
                .and_then(decode_wkb),
        })
        .collect();

    Ok(records)
}

/// Reads every row of one parquet file.
pub fn read_file(path: &Path) -> Result<Vec<OvertureRecord>, FinderError> {
    let file = File::open(path).map_err(|e| io_err!(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    if !has_taxonomy_columns(builder.schema()) {
        return Err(FinderError::NoAttributesRecognized {
            path: path.to_path_buf(),
        });
    }

    let mut records = Vec::new();
    for batch in builder.build()? {
        records.extend(records_from_batch(&batch?)?);
    }

    debug!("Read {} Overture records from {:?}", records.len(), path);
    Ok(records)
}
