use crate::Field;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// A fixed-length run of [`Field`]s.
///
/// Backs one swapped-in page, or is supplied by callers as the target of a
/// paged-area read / source of a write. The length never changes after
/// construction; all indexed access is bounds-checked.
#[derive(Clone, Eq, PartialEq)]
pub struct Buffer {
    fields: Vec<Field>,
}

impl Buffer {
    /// A buffer of `len` unpopulated fields.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            fields: vec![Field::EMPTY; len],
        }
    }

    #[must_use]
    pub fn from_fields(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// # Errors
    /// [`BufferError::OutOfBounds`] if `index >= len`.
    pub fn get(&self, index: usize) -> Result<Field, BufferError> {
        self.fields
            .get(index)
            .copied()
            .ok_or(BufferError::OutOfBounds {
                index,
                len: self.fields.len(),
            })
    }

    /// # Errors
    /// [`BufferError::OutOfBounds`] if `index >= len`.
    pub fn set(&mut self, index: usize, field: Field) -> Result<(), BufferError> {
        let len = self.fields.len();
        match self.fields.get_mut(index) {
            Some(slot) => {
                *slot = field;
                Ok(())
            }
            None => Err(BufferError::OutOfBounds { index, len }),
        }
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Field] {
        &self.fields
    }

    #[inline]
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    /// Bounds-checked sub-slice `[offset, offset + len)`.
    ///
    /// # Errors
    /// [`BufferError::OutOfBounds`] if the range does not fit.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[Field], BufferError> {
        let end = offset.checked_add(len).ok_or(BufferError::OutOfBounds {
            index: offset,
            len: self.fields.len(),
        })?;
        self.fields
            .get(offset..end)
            .ok_or(BufferError::OutOfBounds {
                index: end,
                len: self.fields.len(),
            })
    }

    /// Bounds-checked mutable sub-slice `[offset, offset + len)`.
    ///
    /// # Errors
    /// [`BufferError::OutOfBounds`] if the range does not fit.
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> Result<&mut [Field], BufferError> {
        let total = self.fields.len();
        let end = offset.checked_add(len).ok_or(BufferError::OutOfBounds {
            index: offset,
            len: total,
        })?;
        self.fields
            .get_mut(offset..end)
            .ok_or(BufferError::OutOfBounds { index: end, len: total })
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({} fields)", self.fields.len())
    }
}

/// Out-of-range access to a [`Buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("index {index} out of bounds for buffer of {len} fields")]
    OutOfBounds { index: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_unpopulated() {
        let buf = Buffer::new(4);
        assert_eq!(buf.len(), 4);
        assert!(buf.as_slice().iter().all(|f| *f == Field::EMPTY));
    }

    #[test]
    fn get_and_set_are_bounds_checked() {
        let mut buf = Buffer::new(2);
        buf.set(1, Field::new(7)).unwrap();
        assert_eq!(buf.get(1).unwrap(), Field::new(7));
        assert!(matches!(
            buf.get(2),
            Err(BufferError::OutOfBounds { index: 2, len: 2 })
        ));
        assert!(buf.set(2, Field::EMPTY).is_err());
    }

    #[test]
    fn slices_are_bounds_checked() {
        let mut buf = Buffer::new(8);
        assert_eq!(buf.slice(2, 4).unwrap().len(), 4);
        assert!(buf.slice(6, 4).is_err());
        buf.slice_mut(0, 8).unwrap()[7] = Field::new(1);
        assert_eq!(buf.get(7).unwrap(), Field::new(1));
    }
}
