/// Write buffer shared with the host page.
/// Must stay in sync with the page's `protocol.ts`.
///
/// Layout (all values in f32 / 4 bytes):
/// ```text
/// [Header: 4 floats]
/// [Writes: max_writes × 4 floats]   element, property code, value, pad
/// ```
///
/// Capacity is written into the header on every pack so the host can read
/// it without a separate call. Element ids travel as f32, so only ids up to
/// [`MAX_WIRE_ID`] arrive intact.
use std::collections::HashMap;

use crate::api::error::{RevealError, Result};
use crate::api::types::{ElementId, PropertyWrite};

/// Number of floats in the header section.
pub const HEADER_FLOATS: usize = 4;

/// Header field indices.
pub const HEADER_FRAME_COUNTER: usize = 0;
pub const HEADER_WRITE_COUNT: usize = 1;
pub const HEADER_MAX_WRITES: usize = 2;
pub const HEADER_PROTOCOL_VERSION: usize = 3;

/// Protocol version written into the header.
pub const PROTOCOL_VERSION: f32 = 1.0;

/// Largest element id an f32 carries exactly.
pub const MAX_WIRE_ID: u32 = 1 << 24;

/// Reject ids the write buffer would alias.
pub fn check_wire_id(element: ElementId) -> Result<()> {
    if element.0 > MAX_WIRE_ID {
        return Err(RevealError::invalid_spec(format!(
            "element id {} exceeds the wire limit {}",
            element.0, MAX_WIRE_ID
        )));
    }
    Ok(())
}

/// One frame's property writes, packed for a single host read.
#[derive(Debug, Clone)]
pub struct WriteBuffer {
    data: Vec<f32>,
    max_writes: usize,
    /// Writes that did not fit, carried into the next pack.
    backlog: Vec<PropertyWrite>,
}

impl WriteBuffer {
    pub fn new(max_writes: usize) -> Self {
        let mut data = vec![0.0; HEADER_FLOATS + max_writes * PropertyWrite::FLOATS];
        data[HEADER_MAX_WRITES] = max_writes as f32;
        data[HEADER_PROTOCOL_VERSION] = PROTOCOL_VERSION;
        Self {
            data,
            max_writes,
            backlog: Vec::new(),
        }
    }

    /// Pack a frame's writes after whatever the last frame could not fit.
    /// A later write to the same (element, property) replaces the earlier one;
    /// writes past capacity wait for the next pack.
    /// Returns the number of packed writes.
    pub fn pack(&mut self, frame: u32, writes: &[PropertyWrite]) -> usize {
        let carried = std::mem::take(&mut self.backlog);
        let total = carried.len() + writes.len();
        let mut merged: Vec<PropertyWrite> = Vec::with_capacity(total);
        let mut slots: HashMap<(u32, u32), usize> = HashMap::with_capacity(total);
        for write in carried.iter().chain(writes) {
            let key = (write.element.to_bits(), write.property.to_bits());
            match slots.get(&key) {
                Some(&slot) => merged[slot] = *write,
                None => {
                    slots.insert(key, merged.len());
                    merged.push(*write);
                }
            }
        }

        if merged.len() > self.max_writes {
            log::warn!(
                "write buffer full: deferring {} of {} writes to the next frame",
                merged.len() - self.max_writes,
                merged.len()
            );
            self.backlog = merged.split_off(self.max_writes);
        }

        let floats: &[f32] = bytemuck::cast_slice(&merged);
        self.data[HEADER_FLOATS..HEADER_FLOATS + floats.len()].copy_from_slice(floats);
        self.data[HEADER_FRAME_COUNTER] = frame as f32;
        self.data[HEADER_WRITE_COUNT] = merged.len() as f32;
        merged.len()
    }

    /// Writes packed by the last `pack`.
    pub fn writes(&self) -> &[PropertyWrite] {
        let end = HEADER_FLOATS + self.write_count() * PropertyWrite::FLOATS;
        bytemuck::cast_slice(&self.data[HEADER_FLOATS..end])
    }

    pub fn write_count(&self) -> usize {
        self.data[HEADER_WRITE_COUNT] as usize
    }

    pub fn max_writes(&self) -> usize {
        self.max_writes
    }

    /// Writes waiting for the next pack.
    pub fn deferred(&self) -> usize {
        self.backlog.len()
    }

    /// Raw pointer to the buffer, for the host to view as a Float32Array.
    pub fn as_ptr(&self) -> *const f32 {
        self.data.as_ptr()
    }

    /// Total buffer length in floats.
    pub fn len_floats(&self) -> usize {
        self.data.len()
    }
}
