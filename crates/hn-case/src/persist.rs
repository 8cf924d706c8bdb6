//! Property and table payloads stored in record files.
//!
//! Layout: group `CASE`, cell `HEADER` holds the case name, digest and
//! creation time. Group `ITEMS` holds one cell `K<key>` per item:
//!
//! - `Type`, `Name`
//! - `ScalarNames`, `ScalarValues`, `ScalarSpecified`: every scalar input
//! - `ListNames`, `ListSelections`: specified drop-down selections
//! - `TableProperties`, `TableColumns` and one element `T<n>` per non-empty
//!   table column

use chrono::Utc;
use hn_core::ItemKey;
use hn_model::{ColumnData, Item, Network, PropertyValue};
use hn_record::{ElementDef, ElementPath, ElementType, RecordFile, Window};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::convert::snapshot;
use crate::schema::CaseDef;
use crate::{CaseError, CaseResult};

pub const CASE_GROUP: &str = "CASE";
pub const HEADER_CELL: &str = "HEADER";
pub const ITEMS_GROUP: &str = "ITEMS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub case_name: String,
    /// SHA-256 of the case snapshot, hex encoded.
    pub digest: String,
    /// RFC 3339 creation time.
    pub created: String,
    pub item_count: i32,
}

pub fn case_digest(case: &CaseDef) -> String {
    let mut hasher = Sha256::new();
    let json = serde_json::to_string(case).unwrap_or_default();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn item_cell(key: ItemKey) -> String {
    format!("K{}", key.value())
}

fn persist_error(what: impl Into<String>) -> CaseError {
    CaseError::Persist { what: what.into() }
}

// ---- element helpers ----

fn put_text(file: &mut RecordFile, group: &str, cell: &str, name: &str, value: &str) -> CaseResult<()> {
    file.define_element(group, cell, ElementDef::chars(name, value.len().max(1), &[]))?;
    file.write_string(ElementPath::new(group, cell, name), value)?;
    Ok(())
}

fn put_strings(file: &mut RecordFile, group: &str, cell: &str, name: &str, values: &[String]) -> CaseResult<()> {
    if values.is_empty() {
        return Ok(());
    }
    let width = values.iter().map(String::len).max().unwrap_or(0).max(1);
    file.define_element(group, cell, ElementDef::chars(name, width, &[values.len()]))?;
    file.write_strings(ElementPath::new(group, cell, name), Window::all(values.len()), values, None)?;
    Ok(())
}

fn put_floats(file: &mut RecordFile, group: &str, cell: &str, name: &str, values: &[f64]) -> CaseResult<()> {
    if values.is_empty() {
        return Ok(());
    }
    file.define_element(group, cell, ElementDef::float64(name, &[values.len()]))?;
    file.write_vector_f64(ElementPath::new(group, cell, name), Window::all(values.len()), values)?;
    Ok(())
}

fn put_ints(file: &mut RecordFile, group: &str, cell: &str, name: &str, values: &[i32]) -> CaseResult<()> {
    if values.is_empty() {
        return Ok(());
    }
    file.define_element(group, cell, ElementDef::int32(name, &[values.len()]))?;
    file.write_vector_i32(ElementPath::new(group, cell, name), Window::all(values.len()), values)?;
    Ok(())
}

fn extent(file: &RecordFile, at: ElementPath<'_>) -> CaseResult<usize> {
    let def = file.element_def(at)?;
    match def.dims.as_slice() {
        [n] => Ok(*n),
        _ => Err(persist_error(format!("{at} is not a list"))),
    }
}

fn get_strings(file: &RecordFile, at: ElementPath<'_>) -> CaseResult<Vec<String>> {
    if !file.has_element(at) {
        return Ok(Vec::new());
    }
    let n = extent(file, at)?;
    Ok(file.read_strings(at, Window::all(n))?)
}

fn get_floats(file: &RecordFile, at: ElementPath<'_>) -> CaseResult<Vec<f64>> {
    if !file.has_element(at) {
        return Ok(Vec::new());
    }
    let n = extent(file, at)?;
    Ok(file.read_vector_f64(at, Window::all(n))?)
}

fn get_ints(file: &RecordFile, at: ElementPath<'_>) -> CaseResult<Vec<i32>> {
    if !file.has_element(at) {
        return Ok(Vec::new());
    }
    let n = extent(file, at)?;
    Ok(file.read_vector_i32(at, Window::all(n))?)
}

// ---- writing ----

/// Store the network's inputs into `file` and flush it. Any previous item
/// payloads in the file are replaced.
pub fn write_network(network: &Network, case_name: &str, file: &mut RecordFile) -> CaseResult<RecordHeader> {
    let header = RecordHeader {
        case_name: case_name.to_string(),
        digest: case_digest(&snapshot(network, case_name)),
        created: Utc::now().to_rfc3339(),
        item_count: i32::try_from(network.len()).map_err(|_| persist_error("too many items"))?,
    };

    file.create_group(CASE_GROUP)?;
    file.create_cell(CASE_GROUP, HEADER_CELL)?;
    put_text(file, CASE_GROUP, HEADER_CELL, "Name", &header.case_name)?;
    put_text(file, CASE_GROUP, HEADER_CELL, "Digest", &header.digest)?;
    put_text(file, CASE_GROUP, HEADER_CELL, "Created", &header.created)?;
    file.define_element(CASE_GROUP, HEADER_CELL, ElementDef::int32("ItemCount", &[]))?;
    file.write_scalar_i32(ElementPath::new(CASE_GROUP, HEADER_CELL, "ItemCount"), header.item_count)?;

    if file.has_group(ITEMS_GROUP) {
        file.delete_group(ITEMS_GROUP)?;
    }
    file.create_group(ITEMS_GROUP)?;
    for item in network.items() {
        write_item(item, file)?;
    }
    file.flush()?;
    info!(file = %file.path().display(), items = header.item_count, "network written");
    Ok(header)
}

fn write_item(item: &Item, file: &mut RecordFile) -> CaseResult<()> {
    let cell = item_cell(item.key());
    file.create_cell(ITEMS_GROUP, &cell)?;
    put_text(file, ITEMS_GROUP, &cell, "Type", item.type_name())?;
    put_text(file, ITEMS_GROUP, &cell, "Name", item.name())?;

    let mut scalar_names = Vec::new();
    let mut scalar_values = Vec::new();
    let mut scalar_specified = Vec::new();
    let mut list_names = Vec::new();
    let mut list_selections = Vec::new();
    let mut table_properties = Vec::new();
    let mut table_columns = Vec::new();
    let mut table_data: Vec<&ColumnData> = Vec::new();

    for p in item.properties().iter().filter(|p| p.is_input()) {
        match p.value() {
            PropertyValue::ScalarInput(s) | PropertyValue::SeriesInput { scalar: s, .. } => {
                scalar_names.push(p.description().to_string());
                scalar_values.push(s.value);
                scalar_specified.push(i32::from(s.specified));
            }
            PropertyValue::List(l) if l.specified => {
                list_names.push(p.description().to_string());
                list_selections.push(i32::try_from(l.selection).unwrap_or(1));
            }
            PropertyValue::Table(t) => {
                for d in t.descriptions() {
                    if let Some(c) = t.column(d)
                        && !c.data.is_empty()
                    {
                        table_properties.push(p.description().to_string());
                        table_columns.push(d.clone());
                        table_data.push(&c.data);
                    }
                }
            }
            _ => {}
        }
    }

    put_strings(file, ITEMS_GROUP, &cell, "ScalarNames", &scalar_names)?;
    put_floats(file, ITEMS_GROUP, &cell, "ScalarValues", &scalar_values)?;
    put_ints(file, ITEMS_GROUP, &cell, "ScalarSpecified", &scalar_specified)?;
    put_strings(file, ITEMS_GROUP, &cell, "ListNames", &list_names)?;
    put_ints(file, ITEMS_GROUP, &cell, "ListSelections", &list_selections)?;
    put_strings(file, ITEMS_GROUP, &cell, "TableProperties", &table_properties)?;
    put_strings(file, ITEMS_GROUP, &cell, "TableColumns", &table_columns)?;
    for (n, data) in table_data.into_iter().enumerate() {
        let name = format!("T{}", n + 1);
        match data {
            ColumnData::Float(v) => put_floats(file, ITEMS_GROUP, &cell, &name, v)?,
            ColumnData::Text(v) => put_strings(file, ITEMS_GROUP, &cell, &name, v)?,
        }
    }
    Ok(())
}

// ---- reading ----

pub fn read_header(file: &RecordFile) -> CaseResult<RecordHeader> {
    let at = |name: &'static str| ElementPath::new(CASE_GROUP, HEADER_CELL, name);
    Ok(RecordHeader {
        case_name: file.read_string(at("Name"))?,
        digest: file.read_string(at("Digest"))?,
        created: file.read_string(at("Created"))?,
        item_count: file.read_scalar_i32(at("ItemCount"))?,
    })
}

/// Load stored inputs back into the matching items of `network`.
///
/// Cells whose key is not in the network are skipped with a warning.
/// Returns the number of items updated.
pub fn read_network(network: &mut Network, file: &RecordFile) -> CaseResult<usize> {
    let mut updated = 0;
    for cell in file.cells(ITEMS_GROUP)? {
        let key = cell
            .strip_prefix('K')
            .and_then(|k| k.parse::<i32>().ok())
            .ok_or_else(|| persist_error(format!("bad item cell name '{cell}'")))?;
        let Some(id) = network.find_by_key(ItemKey(key)) else {
            warn!(file = %file.path().display(), key, "no item for stored key");
            continue;
        };
        let item = network.item_mut(id)?;
        read_item(item, file, &cell)?;
        updated += 1;
    }
    info!(file = %file.path().display(), items = updated, "network read");
    Ok(updated)
}

fn parallel<A, B>(what: &str, a: Vec<A>, b: Vec<B>) -> CaseResult<Vec<(A, B)>> {
    if a.len() != b.len() {
        return Err(persist_error(format!(
            "{what}: {} names for {} values",
            a.len(),
            b.len()
        )));
    }
    Ok(a.into_iter().zip(b).collect())
}

fn read_item(item: &mut Item, file: &RecordFile, cell: &str) -> CaseResult<()> {
    let at = |name: &'static str| ElementPath::new(ITEMS_GROUP, cell, name);
    let qualified = item.qualified_name();

    let names = get_strings(file, at("ScalarNames"))?;
    let values = get_floats(file, at("ScalarValues"))?;
    let specified = get_ints(file, at("ScalarSpecified"))?;
    let scalars = parallel("scalars", names, values)?;
    let scalars = parallel("scalar flags", scalars, specified)?;
    for ((name, value), flag) in scalars {
        let property = item.property_mut(&name)?;
        if flag != 0 {
            property.set_scalar(value).map_err(|e| e.in_item(&qualified))?;
        } else {
            property.unspecify();
        }
    }

    let lists = parallel(
        "lists",
        get_strings(file, at("ListNames"))?,
        get_ints(file, at("ListSelections"))?,
    )?;
    for (name, selection) in lists {
        item.property_mut(&name)?
            .set_scalar(f64::from(selection))
            .map_err(|e| e.in_item(&qualified))?;
    }

    let columns = parallel(
        "tables",
        get_strings(file, at("TableProperties"))?,
        get_strings(file, at("TableColumns"))?,
    )?;
    let mut cleared: Vec<&str> = Vec::new();
    for (n, (property, column)) in columns.iter().enumerate() {
        let element = format!("T{}", n + 1);
        let data_at = ElementPath::new(ITEMS_GROUP, cell, &element);
        let text = file.element_def(data_at)?.element_type == ElementType::Char;
        let table = item
            .property_mut(property)?
            .table_mut()
            .map_err(|e| e.in_item(&qualified))?;
        if !cleared.contains(&property.as_str()) {
            table.clear();
            cleared.push(property);
        }
        let result = if text {
            table.set_texts(column, get_strings(file, data_at)?)
        } else {
            table.set_floats(column, get_floats(file, data_at)?)
        };
        result.map_err(|e| e.in_item(&qualified))?;
    }
    Ok(())
}
