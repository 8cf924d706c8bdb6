//! Typed element access on a record file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::container::{Container, Element, Fault};
use crate::element::{ElementData, ElementDef, ElementType, Numeric};
use crate::error::{RecordError, RecordResult};
use crate::format;
use crate::strings;
use crate::window::{Window, storage_offsets};

/// Group, cell and element name of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementPath<'a> {
    pub group: &'a str,
    pub cell: &'a str,
    pub element: &'a str,
}

impl<'a> ElementPath<'a> {
    pub fn new(group: &'a str, cell: &'a str, element: &'a str) -> Self {
        Self {
            group,
            cell,
            element,
        }
    }
}

impl fmt::Display for ElementPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.cell, self.element)
    }
}

/// A record file held in memory and written back on [`RecordFile::flush`].
#[derive(Debug)]
pub struct RecordFile {
    path: PathBuf,
    container: Container,
    dirty: bool,
}

impl RecordFile {
    /// Create an empty record file at `path`, replacing any existing file.
    pub fn create(path: impl AsRef<Path>) -> RecordResult<Self> {
        let mut file = Self {
            path: path.as_ref().to_path_buf(),
            container: Container::default(),
            dirty: true,
        };
        file.flush()?;
        info!(file = %file.path.display(), "record file created");
        Ok(file)
    }

    pub fn open(path: impl AsRef<Path>) -> RecordResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file_name = path.display().to_string();
        let bytes = fs::read(&path).map_err(|e| RecordError::Backend {
            file: file_name.clone(),
            message: e.to_string(),
        })?;
        let container = format::decode(&bytes).map_err(|f| fault(&file_name, f))?;
        info!(file = %file_name, groups = container.groups.len(), "record file opened");
        Ok(Self {
            path,
            container,
            dirty: false,
        })
    }

    /// Write the file to disk through a temporary sibling and a rename.
    pub fn flush(&mut self) -> RecordResult<()> {
        let bytes = format::encode(&self.container).map_err(|f| self.fault(f))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, &bytes)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| self.fault(Fault::Backend(e.to_string())))?;
        self.dirty = false;
        debug!(file = %self.path.display(), bytes = bytes.len(), "record file flushed");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Changes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn file_name(&self) -> String {
        self.path.display().to_string()
    }

    fn fault(&self, f: Fault) -> RecordError {
        fault(&self.file_name(), f)
    }

    fn invalid(&self, what: impl Into<String>) -> RecordError {
        RecordError::InvalidArgument {
            file: self.file_name(),
            what: what.into(),
        }
    }

    // ---- groups / cells ----

    /// Returns `true` if the group was created, `false` if it already existed.
    pub fn create_group(&mut self, name: &str) -> RecordResult<bool> {
        let created = self
            .container
            .create_group(name)
            .map_err(|f| self.fault(f))?;
        self.dirty |= created;
        Ok(created)
    }

    pub fn delete_group(&mut self, name: &str) -> RecordResult<()> {
        self.container
            .delete_group(name)
            .map_err(|f| self.fault(f))?;
        self.dirty = true;
        Ok(())
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.container.groups.contains_key(name)
    }

    pub fn groups(&self) -> Vec<String> {
        self.container.groups.keys().cloned().collect()
    }

    pub fn create_cell(&mut self, group: &str, cell: &str) -> RecordResult<bool> {
        let created = self
            .container
            .create_cell(group, cell)
            .map_err(|f| self.fault(f))?;
        self.dirty |= created;
        Ok(created)
    }

    pub fn cells(&self, group: &str) -> RecordResult<Vec<String>> {
        let g = self.container.group(group).map_err(|f| self.fault(f))?;
        Ok(g.cells.keys().cloned().collect())
    }

    // ---- elements ----

    /// Define an element in an existing cell. Redefining with a different
    /// shape or type resets its contents.
    pub fn define_element(&mut self, group: &str, cell: &str, def: ElementDef) -> RecordResult<()> {
        let name = def.name.clone();
        let changed = self
            .container
            .define(group, cell, def)
            .map_err(|f| self.fault(f))?;
        if changed {
            debug!(file = %self.path.display(), element = %ElementPath::new(group, cell, &name), "element defined");
            self.dirty = true;
        }
        Ok(())
    }

    pub fn element_def(&self, at: ElementPath<'_>) -> RecordResult<&ElementDef> {
        Ok(&self.element(at)?.def)
    }

    pub fn elements(&self, group: &str, cell: &str) -> RecordResult<Vec<String>> {
        let c = self
            .container
            .cell(group, cell)
            .map_err(|f| self.fault(f))?;
        Ok(c.elements.keys().cloned().collect())
    }

    pub fn has_element(&self, at: ElementPath<'_>) -> bool {
        self.element(at).is_ok()
    }

    fn element(&self, at: ElementPath<'_>) -> RecordResult<&Element> {
        self.container
            .element(at.group, at.cell, at.element)
            .map_err(|f| self.fault(f))
    }

    fn mismatch(&self, at: ElementPath<'_>, expected: ElementType, actual: ElementType) -> RecordError {
        RecordError::TypeMismatch {
            file: self.file_name(),
            element: at.to_string(),
            expected,
            actual,
        }
    }

    fn offsets(&self, def: &ElementDef, windows: &[Window]) -> RecordResult<Vec<usize>> {
        storage_offsets(&def.dims, windows).map_err(|e| self.invalid(format!("{}: {e}", def.name)))
    }

    fn expect_rank(&self, def: &ElementDef, ranks: &[usize]) -> RecordResult<()> {
        if ranks.contains(&def.rank()) {
            Ok(())
        } else {
            Err(self.invalid(format!(
                "{} is {}-dimensional",
                def.name,
                def.rank()
            )))
        }
    }

    fn read_values<T: Numeric>(&self, at: ElementPath<'_>, windows: &[Window]) -> RecordResult<Vec<T>> {
        let el = self.element(at)?;
        let Some(values) = T::values(&el.data) else {
            return Err(self.mismatch(at, T::TYPE, el.data.element_type()));
        };
        let offsets = self.offsets(&el.def, windows)?;
        Ok(offsets.into_iter().map(|o| values[o]).collect())
    }

    fn write_values<T: Numeric>(
        &mut self,
        at: ElementPath<'_>,
        windows: &[Window],
        input: &[T],
    ) -> RecordResult<()> {
        let el = self.element(at)?;
        if T::values(&el.data).is_none() {
            return Err(self.mismatch(at, T::TYPE, el.data.element_type()));
        }
        let offsets = self.offsets(&el.def, windows)?;
        if offsets.len() != input.len() {
            return Err(self.invalid(format!(
                "{at}: window selects {} values, {} given",
                offsets.len(),
                input.len()
            )));
        }
        let el = self
            .container
            .element_mut(at.group, at.cell, at.element)
            .map_err(|f| fault(&self.path.display().to_string(), f))?;
        if let Some(values) = T::values_mut(&mut el.data) {
            for (o, v) in offsets.into_iter().zip(input) {
                values[o] = *v;
            }
        }
        self.dirty = true;
        Ok(())
    }

    fn first_value_windows(&self, def: &ElementDef) -> Vec<Window> {
        vec![Window::single(1); def.rank()]
    }

    /// Read values of an n-dimensional float element in row-major order.
    pub fn read_block_f64(&self, at: ElementPath<'_>, windows: &[Window]) -> RecordResult<Vec<f64>> {
        self.read_values(at, windows)
    }

    pub fn write_block_f64(&mut self, at: ElementPath<'_>, windows: &[Window], values: &[f64]) -> RecordResult<()> {
        self.write_values(at, windows, values)
    }

    pub fn read_block_i32(&self, at: ElementPath<'_>, windows: &[Window]) -> RecordResult<Vec<i32>> {
        self.read_values(at, windows)
    }

    pub fn write_block_i32(&mut self, at: ElementPath<'_>, windows: &[Window], values: &[i32]) -> RecordResult<()> {
        self.write_values(at, windows, values)
    }

    /// First value of the element.
    pub fn read_scalar_f64(&self, at: ElementPath<'_>) -> RecordResult<f64> {
        let windows = self.first_value_windows(&self.element(at)?.def);
        Ok(self.read_values::<f64>(at, &windows)?[0])
    }

    pub fn write_scalar_f64(&mut self, at: ElementPath<'_>, value: f64) -> RecordResult<()> {
        let windows = self.first_value_windows(&self.element(at)?.def);
        self.write_values(at, &windows, &[value])
    }

    pub fn read_scalar_i32(&self, at: ElementPath<'_>) -> RecordResult<i32> {
        let windows = self.first_value_windows(&self.element(at)?.def);
        Ok(self.read_values::<i32>(at, &windows)?[0])
    }

    pub fn write_scalar_i32(&mut self, at: ElementPath<'_>, value: i32) -> RecordResult<()> {
        let windows = self.first_value_windows(&self.element(at)?.def);
        self.write_values(at, &windows, &[value])
    }

    pub fn read_vector_f64(&self, at: ElementPath<'_>, window: Window) -> RecordResult<Vec<f64>> {
        self.expect_rank(&self.element(at)?.def, &[1])?;
        self.read_values(at, &[window])
    }

    pub fn write_vector_f64(&mut self, at: ElementPath<'_>, window: Window, values: &[f64]) -> RecordResult<()> {
        self.expect_rank(&self.element(at)?.def, &[1])?;
        self.write_values(at, &[window], values)
    }

    pub fn read_vector_i32(&self, at: ElementPath<'_>, window: Window) -> RecordResult<Vec<i32>> {
        self.expect_rank(&self.element(at)?.def, &[1])?;
        self.read_values(at, &[window])
    }

    pub fn write_vector_i32(&mut self, at: ElementPath<'_>, window: Window, values: &[i32]) -> RecordResult<()> {
        self.expect_rank(&self.element(at)?.def, &[1])?;
        self.write_values(at, &[window], values)
    }

    /// Rows of a two-dimensional float element.
    pub fn read_matrix_f64(&self, at: ElementPath<'_>, rows: Window, cols: Window) -> RecordResult<Vec<Vec<f64>>> {
        self.expect_rank(&self.element(at)?.def, &[2])?;
        let flat = self.read_values::<f64>(at, &[rows, cols])?;
        Ok(flat.chunks(cols.count()).map(<[f64]>::to_vec).collect())
    }

    pub fn write_matrix_f64(
        &mut self,
        at: ElementPath<'_>,
        rows: Window,
        cols: Window,
        values: &[Vec<f64>],
    ) -> RecordResult<()> {
        self.expect_rank(&self.element(at)?.def, &[2])?;
        if values.len() != rows.count() || values.iter().any(|r| r.len() != cols.count()) {
            return Err(self.invalid(format!(
                "{at}: expected {} rows of {} values",
                rows.count(),
                cols.count()
            )));
        }
        let flat: Vec<f64> = values.iter().flatten().copied().collect();
        self.write_values(at, &[rows, cols], &flat)
    }

    // ---- strings ----

    fn char_element(&self, at: ElementPath<'_>) -> RecordResult<&Element> {
        let el = self.element(at)?;
        match el.data {
            ElementData::Char(_) => Ok(el),
            _ => Err(self.mismatch(at, ElementType::Char, el.data.element_type())),
        }
    }

    pub fn read_string(&self, at: ElementPath<'_>) -> RecordResult<String> {
        let el = self.char_element(at)?;
        let windows = self.first_value_windows(&el.def);
        Ok(self.read_text(at, &windows)?.into_iter().next().unwrap_or_default())
    }

    pub fn write_string(&mut self, at: ElementPath<'_>, value: &str) -> RecordResult<()> {
        let el = self.char_element(at)?;
        let windows = self.first_value_windows(&el.def);
        self.write_text(at, &windows, &[value], None)
    }

    pub fn read_strings(&self, at: ElementPath<'_>, window: Window) -> RecordResult<Vec<String>> {
        self.expect_rank(&self.char_element(at)?.def, &[1])?;
        self.read_text(at, &[window])
    }

    /// Write strings padded to `width` bytes, or to the declared width when
    /// `None`. A width above the declared one is rejected.
    pub fn write_strings<S: AsRef<str>>(
        &mut self,
        at: ElementPath<'_>,
        window: Window,
        values: &[S],
        width: Option<usize>,
    ) -> RecordResult<()> {
        self.expect_rank(&self.char_element(at)?.def, &[1])?;
        self.write_text(at, &[window], values, width)
    }

    fn read_text(&self, at: ElementPath<'_>, windows: &[Window]) -> RecordResult<Vec<String>> {
        let el = self.char_element(at)?;
        let ElementData::Char(bytes) = &el.data else {
            return Err(self.mismatch(at, ElementType::Char, el.data.element_type()));
        };
        let w = el.def.width;
        let offsets = self.offsets(&el.def, windows)?;
        Ok(offsets
            .into_iter()
            .map(|o| strings::trim(&bytes[o * w..(o + 1) * w]))
            .collect())
    }

    fn write_text<S: AsRef<str>>(
        &mut self,
        at: ElementPath<'_>,
        windows: &[Window],
        values: &[S],
        width: Option<usize>,
    ) -> RecordResult<()> {
        let el = self.char_element(at)?;
        let declared = el.def.width;
        let offsets = self.offsets(&el.def, windows)?;
        if offsets.len() != values.len() {
            return Err(self.invalid(format!(
                "{at}: window selects {} strings, {} given",
                offsets.len(),
                values.len()
            )));
        }
        let width = width.unwrap_or(declared);
        let too_long = |len, max| RecordError::LengthExceeded {
            file: self.file_name(),
            element: at.to_string(),
            len,
            max,
        };
        if width > declared {
            return Err(too_long(width, declared));
        }
        let block = strings::encode(values, width, declared, offsets.len() * declared)
            .map_err(|o| too_long(o.len, o.max))?;

        let file_name = self.file_name();
        let el = self
            .container
            .element_mut(at.group, at.cell, at.element)
            .map_err(|f| fault(&file_name, f))?;
        if let ElementData::Char(bytes) = &mut el.data {
            for (o, chunk) in offsets.into_iter().zip(block.chunks(declared)) {
                bytes[o * declared..(o + 1) * declared].copy_from_slice(chunk);
            }
        }
        self.dirty = true;
        Ok(())
    }
}

fn fault(file: &str, f: Fault) -> RecordError {
    match f {
        Fault::Missing { what, name } => RecordError::NotFound {
            file: file.to_string(),
            what,
            name,
        },
        Fault::Backend(message) => RecordError::Backend {
            file: file.to_string(),
            message,
        },
    }
}
