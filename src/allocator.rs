use crate::object::{IndirectObject, FIRST_FREE_OBJECT};
use crate::{EmbedError, Result};

/// Whether the run synthesizes a new document or extends a prior one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Fresh,
    Extend,
}

/// First object number available to the builder, and the mode it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub next: u32,
    pub mode: Mode,
}

/// Compute the next free object number.
///
/// No existing objects means a fresh document whose baseline objects occupy
/// 1–3. Otherwise numbering continues at `max + 1`; freed numbers and gaps are
/// never reused.
pub fn allocate(objects: &[IndirectObject]) -> Result<Allocation> {
    let max = match objects.iter().map(IndirectObject::number).max() {
        Some(max) => max,
        None => {
            return Ok(Allocation {
                next: FIRST_FREE_OBJECT,
                mode: Mode::Fresh,
            })
        }
    };

    // The builder needs three consecutive numbers after `max`.
    if max.checked_add(3).is_none() {
        return Err(EmbedError::StructuralCorruption(format!(
            "object number {max} leaves no room for new objects"
        )));
    }

    Ok(Allocation {
        next: max + 1,
        mode: Mode::Extend,
    })
}
