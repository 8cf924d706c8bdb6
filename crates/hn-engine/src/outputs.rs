//! Result buffers collected from an engine session.
//!
//! The store owns every buffer; output properties are bound to them through
//! weak references, so dropping the store (or calling [`OutputStore::clear`])
//! leaves the properties reporting `DataNotLoaded`.

use std::collections::BTreeMap;
use std::sync::Arc;

use hn_core::ItemKey;
use hn_model::{Extremes, Network, PropertyValue, SeriesBuffer};
use tracing::debug;

use crate::engine::Engine;
use crate::error::EngineResult;
use crate::session::EngineSession;

/// Item key, property description and element (0 = whole item).
pub type SeriesKey = (ItemKey, String, usize);

#[derive(Debug, Default)]
struct Track {
    values: Vec<f64>,
    extremes: Option<Extremes>,
}

#[derive(Debug, Default)]
pub struct OutputStore {
    times: Vec<f64>,
    tracks: BTreeMap<SeriesKey, Track>,
    published: BTreeMap<SeriesKey, (Arc<SeriesBuffer>, Arc<Extremes>)>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded time points.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn values(&self, key: &SeriesKey) -> Option<&[f64]> {
        self.tracks.get(key).map(|t| t.values.as_slice())
    }

    pub fn extremes(&self, key: &SeriesKey) -> Option<Extremes> {
        self.tracks.get(key).and_then(|t| t.extremes)
    }

    /// Push every specified scalar input of the in-use items to the engine.
    pub fn commit_inputs<E: Engine>(
        &self,
        network: &Network,
        session: &mut EngineSession<E>,
    ) -> EngineResult<usize> {
        let mut pushed = 0;
        for item in network.items().filter(|i| !i.is_disused()) {
            for p in item.properties().iter().filter(|p| p.is_input()) {
                let value = match p.value() {
                    PropertyValue::ScalarInput(s) | PropertyValue::SeriesInput { scalar: s, .. } => {
                        s.get()
                    }
                    _ => None,
                };
                if let Some(v) = value {
                    session.set_value(item.key(), p.description(), v)?;
                    pushed += 1;
                }
            }
        }
        debug!(pushed, "inputs committed");
        Ok(pushed)
    }

    /// Append the engine's current output values at its current time and
    /// copy the whole-item value into each output property.
    pub fn record<E: Engine>(
        &mut self,
        network: &mut Network,
        session: &EngineSession<E>,
    ) -> EngineResult<()> {
        let t = session.current_time()?;
        self.times.push(t);
        let slot = self.times.len();
        for id in network.ids() {
            let item = network.item_mut(id)?;
            if item.is_disused() {
                continue;
            }
            let key = item.key();
            let qualified = item.qualified_name();
            for p in item.properties_mut().filter(|p| is_output(p.value())) {
                let description = p.description().to_string();
                let v = session.get_value(key, &description)?;
                p.set_scalar(v).map_err(|e| e.in_item(&qualified))?;
                self.push(slot, (key, description.clone(), 0), t, v);

                let elements = p.element_count();
                if elements > 0 {
                    let vector = session.get_vector(key, &description)?;
                    for (i, v) in vector.into_iter().take(elements).enumerate() {
                        self.push(slot, (key, description.clone(), i + 1), t, v);
                    }
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, slot: usize, key: SeriesKey, t: f64, v: f64) {
        let track = self.tracks.entry(key).or_default();
        // a series first seen late is padded so it stays aligned with `times`
        track.values.resize(slot - 1, f64::NAN);
        track.values.push(v);
        match &mut track.extremes {
            Some(e) => e.update(v, t),
            None => track.extremes = Some(Extremes::first(v, t)),
        }
    }

    /// Publish the recorded series and bind them to the network's series
    /// properties. Returns the number of bindings made.
    pub fn bind(&mut self, network: &mut Network) -> EngineResult<usize> {
        let times = Arc::new(self.times.clone());
        self.published.clear();
        for (key, track) in &self.tracks {
            let Some(ext) = track.extremes else { continue };
            let buffer = SeriesBuffer::new(Arc::clone(&times), track.values.clone());
            self.published
                .insert(key.clone(), (Arc::new(buffer), Arc::new(ext)));
        }

        let mut bound = 0;
        for ((item_key, description, element), (series, ext)) in &self.published {
            let Some(id) = network.find_by_key(*item_key) else {
                continue;
            };
            let item = network.item_mut(id)?;
            let qualified = item.qualified_name();
            let p = item.property_mut(description)?;
            if !is_series(p.value()) {
                continue;
            }
            p.bind_series(*element, Arc::downgrade(series))
                .map_err(|e| e.in_item(&qualified))?;
            p.bind_extremes(*element, Arc::downgrade(ext))
                .map_err(|e| e.in_item(&qualified))?;
            bound += 1;
        }
        debug!(bound, "output series bound");
        Ok(bound)
    }

    /// Drop all buffers. Bound properties then report `DataNotLoaded`.
    pub fn clear(&mut self) {
        self.times.clear();
        self.tracks.clear();
        self.published.clear();
    }
}

fn is_output(value: &PropertyValue) -> bool {
    matches!(
        value,
        PropertyValue::ScalarOutput(_) | PropertyValue::SeriesOutput { .. }
    )
}

fn is_series(value: &PropertyValue) -> bool {
    matches!(
        value,
        PropertyValue::SeriesInput { .. } | PropertyValue::SeriesOutput { .. }
    )
}
