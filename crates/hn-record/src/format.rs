//! On-disk layout of a record file.
//!
//! ```text
//! +------------------+
//! | Magic (4B)       |  "HNR1"
//! | Version (4B)     |
//! | Flags (4B)       |
//! | Directory (8B)   |  offset of the directory
//! +------------------+
//! | Element payloads |  little endian, column-major
//! +------------------+
//! | Directory        |  JSON
//! +------------------+
//! ```

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use serde::{Deserialize, Serialize};

use crate::container::{Call, Cell, Container, Element, Fault, Group};
use crate::element::{ElementData, ElementDef};

pub const MAGIC: &[u8; 4] = b"HNR1";
pub const VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub flags: u32,
    pub directory_offset: u64,
}

impl Header {
    pub const SIZE: usize = 4 + 4 + 4 + 8;

    pub fn new() -> Self {
        Self {
            version: VERSION,
            flags: 0,
            directory_offset: 0,
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;
        writer.write_all(&self.directory_offset.to_le_bytes())?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "not a record file (bad magic)",
            ));
        }
        let mut buf4 = [0u8; 4];
        let mut buf8 = [0u8; 8];
        reader.read_exact(&mut buf4)?;
        let version = u32::from_le_bytes(buf4);
        reader.read_exact(&mut buf4)?;
        let flags = u32::from_le_bytes(buf4);
        reader.read_exact(&mut buf8)?;
        let directory_offset = u64::from_le_bytes(buf8);
        Ok(Self {
            version,
            flags,
            directory_offset,
        })
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Directory {
    groups: Vec<GroupEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroupEntry {
    name: String,
    cells: Vec<CellEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CellEntry {
    name: String,
    elements: Vec<ElementEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ElementEntry {
    #[serde(flatten)]
    def: ElementDef,
    offset: u64,
    size: u64,
}

fn backend(e: impl std::fmt::Display) -> Fault {
    Fault::Backend(e.to_string())
}

pub(crate) fn encode(container: &Container) -> Call<Vec<u8>> {
    write_to(container, Cursor::new(Vec::new()))
        .map(Cursor::into_inner)
        .map_err(backend)
}

fn write_to<W: Write + Seek>(container: &Container, mut writer: W) -> io::Result<W> {
    Header::new().write(&mut writer)?;
    let mut offset = Header::SIZE as u64;
    let mut directory = Directory { groups: Vec::new() };
    for (gname, group) in &container.groups {
        let mut g = GroupEntry {
            name: gname.clone(),
            cells: Vec::new(),
        };
        for (cname, cell) in &group.cells {
            let mut c = CellEntry {
                name: cname.clone(),
                elements: Vec::new(),
            };
            for element in cell.elements.values() {
                let bytes = element.data.to_le_bytes();
                writer.write_all(&bytes)?;
                c.elements.push(ElementEntry {
                    def: element.def.clone(),
                    offset,
                    size: bytes.len() as u64,
                });
                offset += bytes.len() as u64;
            }
            g.cells.push(c);
        }
        directory.groups.push(g);
    }

    let json = serde_json::to_vec(&directory)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(&json)?;

    writer.seek(SeekFrom::Start(0))?;
    Header {
        directory_offset: offset,
        ..Header::new()
    }
    .write(&mut writer)?;
    Ok(writer)
}

pub(crate) fn decode(bytes: &[u8]) -> Call<Container> {
    let mut reader = Cursor::new(bytes);
    let header = Header::read(&mut reader).map_err(backend)?;
    if header.version != VERSION {
        return Err(Fault::Backend(format!(
            "unsupported format version {}",
            header.version
        )));
    }
    let start = usize::try_from(header.directory_offset).map_err(backend)?;
    let Some(json) = bytes.get(start..) else {
        return Err(Fault::Backend(format!(
            "directory offset {start} is past the end of the file"
        )));
    };
    let directory: Directory = serde_json::from_slice(json).map_err(backend)?;

    let mut container = Container::default();
    for g in directory.groups {
        let mut group = Group::default();
        for c in g.cells {
            let mut cell = Cell::default();
            for e in c.elements {
                e.def.check().map_err(Fault::Backend)?;
                let lo = usize::try_from(e.offset).map_err(backend)?;
                let size = usize::try_from(e.size).map_err(backend)?;
                let Some(hi) = lo.checked_add(size) else {
                    return Err(Fault::Backend(format!(
                        "element '{}' payload {lo}+{size} overflows the file",
                        e.def.name
                    )));
                };
                if lo < Header::SIZE || hi > start {
                    return Err(Fault::Backend(format!(
                        "element '{}' payload {lo}..{hi} lies outside the data section",
                        e.def.name
                    )));
                }
                let data = ElementData::from_le_bytes(&e.def, &bytes[lo..hi]).map_err(Fault::Backend)?;
                cell.elements
                    .insert(e.def.name.clone(), Element { def: e.def, data });
            }
            group.cells.insert(c.name, cell);
        }
        container.groups.insert(g.name, group);
    }
    Ok(container)
}
