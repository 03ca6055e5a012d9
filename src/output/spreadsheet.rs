//! Spreadsheet export of the result file
//!
//! One row per product. Product columns come first, followed by the category
//! columns repeated on every row and a human-readable summary of the spec
//! groups. Nested values that have no natural cell form (`extra.groups`,
//! `extra.image_links`) are written as compact JSON.

use crate::model::{CategoryResult, Product};
use crate::output::load_result;
use crate::Result;
use std::io::Write;
use std::path::Path;

/// Header row; the first column is the zero-based row index
pub const SPREADSHEET_HEADERS: [&str; 12] = [
    "",
    "name",
    "price",
    "availability",
    "link",
    "thumb",
    "extra.groups",
    "extra.description",
    "extra.image_links",
    "title",
    "item_count",
    "extra_groups_summary",
];

fn product_row(index: usize, product: &Product, category: &CategoryResult) -> Result<Vec<String>> {
    Ok(vec![
        index.to_string(),
        product.stub.name.clone(),
        product.stub.price.clone(),
        product.stub.availability.clone(),
        product.stub.detail_link.clone().unwrap_or_default(),
        product.stub.thumbnail.clone().unwrap_or_default(),
        serde_json::to_string(&product.extra.spec_groups)?,
        product.extra.description.clone(),
        serde_json::to_string(&product.extra.image_links)?,
        category.title.clone(),
        category
            .item_count
            .map(|count| count.to_string())
            .unwrap_or_default(),
        product.extra.groups_summary(),
    ])
}

/// Writes `category` as CSV into `writer`, returning the number of rows
pub fn write_spreadsheet<W: Write>(category: &CategoryResult, writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(SPREADSHEET_HEADERS)?;

    for (index, product) in category.products.iter().enumerate() {
        csv_writer.write_record(product_row(index, product, category)?)?;
    }

    csv_writer.flush()?;
    Ok(category.products.len())
}

/// Converts the result file at `input` into a spreadsheet at `output`
pub fn export_spreadsheet(input: &Path, output: &Path) -> Result<usize> {
    let category = load_result(input)?;
    let file = std::fs::File::create(output)?;
    let rows = write_spreadsheet(&category, file)?;

    tracing::info!(path = %output.display(), rows, "Spreadsheet exported");
    Ok(rows)
}
