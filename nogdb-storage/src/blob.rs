//! Owning mutable byte buffer with explicit capacity/size tracking, the
//! substrate every record and adjacency value is built on.

/// A contiguous byte buffer of fixed `capacity` with a current `size`
/// high-water mark. Byte order is host-native throughout; the codec never
/// assumes NUL-termination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Vec<u8>,
    size: usize,
}

impl Blob {
    /// Allocates `capacity` bytes, zero-filled, with `size = 0`.
    pub fn new(capacity: usize) -> Self {
        Blob {
            data: vec![0u8; capacity],
            size: 0,
        }
    }

    /// Allocates capacity `len` from an existing byte slice and marks the
    /// whole thing as occupied (`size = len`).
    pub fn from(bytes: &[u8]) -> Self {
        Blob {
            data: bytes.to_vec(),
            size: bytes.len(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.size]
    }

    /// Writes `data` starting at the current size, advancing it.
    ///
    /// Panics if `size + data.len() > capacity`, same as the original
    /// engine's assertion-guarded `append`.
    pub fn append(&mut self, data: &[u8]) -> &mut Self {
        assert!(
            self.size + data.len() <= self.data.len(),
            "Blob::append would exceed capacity"
        );
        self.data[self.size..self.size + data.len()].copy_from_slice(data);
        self.size += data.len();
        self
    }

    /// Returns a new blob of length `max(capacity, offset + data.len())`
    /// with `data` written at `offset`, leaving `self` untouched.
    pub fn overwrite(&self, offset: usize, data: &[u8]) -> Blob {
        let new_len = self.capacity().max(offset + data.len());
        let mut out = Blob::new(new_len);
        out.data[..self.size].copy_from_slice(&self.data[..self.size]);
        out.size = self.size.max(offset + data.len());
        out.data[offset..offset + data.len()].copy_from_slice(data);
        out
    }

    /// Copies `n` bytes starting at `offset` into `dst`; returns `offset + n`,
    /// matching the original engine's `Blob::retrieve`.
    pub fn retrieve(&self, dst: &mut [u8], offset: usize, n: usize) -> usize {
        assert!(offset + n <= self.data.len(), "Blob::retrieve out of range");
        dst[..n].copy_from_slice(&self.data[offset..offset + n]);
        offset + n
    }

    /// In-place mutation at `offset`. Precondition: `offset + data.len() <= capacity`.
    pub fn update(&mut self, offset: usize, data: &[u8]) {
        assert!(
            offset + data.len() <= self.data.len(),
            "Blob::update out of range"
        );
        self.data[offset..offset + data.len()].copy_from_slice(data);
        self.size = self.size.max(offset + data.len());
    }

    /// Concatenates two blobs into a new one with capacity `a.size + b.size`.
    pub fn concat(&self, other: &Blob) -> Blob {
        let mut out = Blob::new(self.size + other.size);
        out.append(self.as_bytes());
        out.append(other.as_bytes());
        out
    }
}

impl std::ops::Add for &Blob {
    type Output = Blob;
    fn add(self, rhs: &Blob) -> Blob {
        self.concat(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_retrieve_round_trip() {
        let mut b = Blob::new(8);
        b.append(&[1, 2, 3]);
        b.append(&[4, 5]);
        assert_eq!(b.size(), 5);
        let mut out = [0u8; 3];
        let next = b.retrieve(&mut out, 0, 3);
        assert_eq!(out, [1, 2, 3]);
        assert_eq!(next, 3);
    }

    #[test]
    fn retrieve_returns_advanced_offset() {
        let b = Blob::from(&[9, 9, 9, 7, 7]);
        let mut out = [0u8; 2];
        let next = b.retrieve(&mut out, 3, 2);
        assert_eq!(out, [7, 7]);
        assert_eq!(next, 5);
    }

    #[test]
    fn overwrite_grows_capacity_when_needed() {
        let b = Blob::from(&[1, 2, 3]);
        let grown = b.overwrite(5, &[9, 9]);
        assert_eq!(grown.capacity(), 7);
        assert_eq!(&grown.as_bytes()[..3], &[1, 2, 3]);
        assert_eq!(&grown.as_bytes()[5..7], &[9, 9]);
    }

    #[test]
    fn update_mutates_in_place() {
        let mut b = Blob::from(&[1, 2, 3, 4]);
        b.update(1, &[9, 9]);
        assert_eq!(b.as_bytes(), &[1, 9, 9, 4]);
    }

    #[test]
    fn concat_produces_new_blob() {
        let a = Blob::from(&[1, 2]);
        let b = Blob::from(&[3, 4, 5]);
        let c = &a + &b;
        assert_eq!(c.as_bytes(), &[1, 2, 3, 4, 5]);
        assert_eq!(c.capacity(), 5);
    }

    #[test]
    #[should_panic]
    fn append_past_capacity_panics() {
        let mut b = Blob::new(2);
        b.append(&[1, 2, 3]);
    }
}
