//! hn-record: binary record files of named, dimensioned elements.
//!
//! A file holds groups, groups hold cells and cells hold elements. Elements
//! are `Float64`, `Int32` or fixed-width `Char` arrays of up to five
//! dimensions, addressed through 1-based [`Window`]s.
//!
//! ```no_run
//! use hn_record::{ElementDef, ElementPath, RecordFile, Window};
//!
//! # fn main() -> hn_record::RecordResult<()> {
//! let mut file = RecordFile::create("case.hnr")?;
//! file.create_group("ITEMS")?;
//! file.create_cell("ITEMS", "K12")?;
//! file.define_element("ITEMS", "K12", ElementDef::float64("Distance", &[3]))?;
//! let at = ElementPath::new("ITEMS", "K12", "Distance");
//! file.write_vector_f64(at, Window::all(3), &[0.0, 40.0, 95.5])?;
//! file.flush()?;
//! # Ok(())
//! # }
//! ```

mod container;
pub mod element;
pub mod error;
pub mod file;
pub mod format;
pub mod strings;
pub mod window;

pub use element::{ElementDef, ElementType, MAX_DIMS};
pub use error::{RecordError, RecordResult};
pub use file::{ElementPath, RecordFile};
pub use window::Window;
