//! In-memory group/cell/element tree behind a record file.

use std::collections::BTreeMap;

use crate::element::{ElementData, ElementDef};

/// Failure reported by the container layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fault {
    Missing { what: &'static str, name: String },
    Backend(String),
}

pub(crate) type Call<T> = Result<T, Fault>;

fn missing<T>(what: &'static str, name: &str) -> Call<T> {
    Err(Fault::Missing {
        what,
        name: name.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Element {
    pub def: ElementDef,
    pub data: ElementData,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Cell {
    pub elements: BTreeMap<String, Element>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Group {
    pub cells: BTreeMap<String, Cell>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Container {
    pub groups: BTreeMap<String, Group>,
}

impl Container {
    /// Returns `true` when the group did not exist yet.
    pub fn create_group(&mut self, name: &str) -> Call<bool> {
        if name.trim().is_empty() {
            return Err(Fault::Backend("group name is empty".into()));
        }
        if self.groups.contains_key(name) {
            return Ok(false);
        }
        self.groups.insert(name.to_string(), Group::default());
        Ok(true)
    }

    pub fn delete_group(&mut self, name: &str) -> Call<()> {
        match self.groups.remove(name) {
            Some(_) => Ok(()),
            None => missing("group", name),
        }
    }

    pub fn group(&self, name: &str) -> Call<&Group> {
        match self.groups.get(name) {
            Some(g) => Ok(g),
            None => missing("group", name),
        }
    }

    fn group_mut(&mut self, name: &str) -> Call<&mut Group> {
        match self.groups.get_mut(name) {
            Some(g) => Ok(g),
            None => missing("group", name),
        }
    }

    pub fn create_cell(&mut self, group: &str, cell: &str) -> Call<bool> {
        if cell.trim().is_empty() {
            return Err(Fault::Backend("cell name is empty".into()));
        }
        let g = self.group_mut(group)?;
        if g.cells.contains_key(cell) {
            return Ok(false);
        }
        g.cells.insert(cell.to_string(), Cell::default());
        Ok(true)
    }

    pub fn cell(&self, group: &str, cell: &str) -> Call<&Cell> {
        match self.group(group)?.cells.get(cell) {
            Some(c) => Ok(c),
            None => missing("cell", &format!("{group}/{cell}")),
        }
    }

    fn cell_mut(&mut self, group: &str, cell: &str) -> Call<&mut Cell> {
        match self.group_mut(group)?.cells.get_mut(cell) {
            Some(c) => Ok(c),
            None => missing("cell", &format!("{group}/{cell}")),
        }
    }

    /// Define (or redefine) an element. An identical definition keeps the
    /// stored payload; any other definition resets it.
    pub fn define(&mut self, group: &str, cell: &str, def: ElementDef) -> Call<bool> {
        def.check().map_err(Fault::Backend)?;
        let c = self.cell_mut(group, cell)?;
        if let Some(existing) = c.elements.get(&def.name)
            && existing.def == def
        {
            return Ok(false);
        }
        let data = ElementData::zeroed(&def);
        c.elements.insert(def.name.clone(), Element { def, data });
        Ok(true)
    }

    pub fn element(&self, group: &str, cell: &str, name: &str) -> Call<&Element> {
        match self.cell(group, cell)?.elements.get(name) {
            Some(e) => Ok(e),
            None => missing("element", &format!("{group}/{cell}/{name}")),
        }
    }

    pub fn element_mut(&mut self, group: &str, cell: &str, name: &str) -> Call<&mut Element> {
        match self.cell_mut(group, cell)?.elements.get_mut(name) {
            Some(e) => Ok(e),
            None => missing("element", &format!("{group}/{cell}/{name}")),
        }
    }
}
