//! Append-only handle table.

use super::types::ObjectKind;
use crate::error::{Error, Result};
use crate::types::Handle;

/// One append-only table mapping handles to objects of a single kind.
///
/// There is no removal: a slot, once allocated, lives until the table is dropped
/// at the end of the session. This is what keeps handle numbering identical on
/// every worker of the group.
#[derive(Debug)]
pub struct HandleTable<T> {
    kind: ObjectKind,
    slots: Vec<T>,
}

impl<T> HandleTable<T> {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// The handle the next `allocate` will return.
    pub fn next_handle(&self) -> Handle {
        Handle::try_from(self.slots.len()).unwrap_or(Handle::MAX)
    }

    /// Appends `object` and returns its handle.
    pub fn allocate(&mut self, object: T) -> Result<Handle> {
        let handle = Handle::try_from(self.slots.len())
            .map_err(|_| Error::HandleSpaceExhausted(self.kind))?;

        self.slots.push(object);

        tracing::trace!("Allocated {} #{}", self.kind, handle);

        Ok(handle)
    }

    pub fn resolve(&self, handle: Handle) -> Result<&T> {
        let index = self.index_of(handle)?;
        Ok(&self.slots[index])
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> Result<&mut T> {
        let index = self.index_of(handle)?;
        Ok(&mut self.slots[index])
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn index_of(&self, handle: Handle) -> Result<usize> {
        usize::try_from(handle)
            .ok()
            .filter(|&index| index < self.slots.len())
            .ok_or(Error::InvalidHandle {
                kind: self.kind,
                handle,
                len: self.slots.len(),
            })
    }
}
