//! Fixed-layout report helpers.
//!
//! Vendor reports are read field by field at known offsets, little-endian.
//! Outgoing command/feature reports are assembled with [`ReportBuilder`].

use crate::error::{Error, Result};

/// Offset-addressed view of one input report.
#[derive(Clone, Copy, Debug)]
pub struct ReportReader<'a> {
    data: &'a [u8],
}

impl<'a> ReportReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Fails unless the report is at least `needed` bytes long.
    pub fn require(&self, needed: usize) -> Result<()> {
        if self.data.len() < needed {
            return Err(Error::ShortReport {
                len: self.data.len(),
                needed,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        self.require(offset + 1)?;
        Ok(self.data[offset])
    }

    pub fn bit(&self, offset: usize, bit: u8) -> Result<bool> {
        Ok(self.u8_at(offset)? & (1 << bit) != 0)
    }

    pub fn u16_le(&self, offset: usize) -> Result<u16> {
        self.require(offset + 2)?;
        Ok(u16::from_le_bytes([self.data[offset], self.data[offset + 1]]))
    }

    pub fn i16_le(&self, offset: usize) -> Result<i16> {
        Ok(self.u16_le(offset)? as i16)
    }

    pub fn bytes(&self, offset: usize, count: usize) -> Result<&'a [u8]> {
        self.require(offset + count)?;
        Ok(&self.data[offset..offset + count])
    }
}

/// Builds an outgoing report of fixed length, zero padded.
#[derive(Clone, Debug)]
pub struct ReportBuilder {
    buffer: Vec<u8>,
    len: usize,
}

impl ReportBuilder {
    pub fn new(len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(len),
            len,
        }
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.buffer.push(value);
        self
    }

    pub fn bytes(mut self, values: &[u8]) -> Self {
        self.buffer.extend_from_slice(values);
        self
    }

    pub fn u16_le(mut self, value: u16) -> Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Pads (or truncates) to the declared length.
    pub fn build(mut self) -> Vec<u8> {
        self.buffer.resize(self.len, 0);
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_fields() {
        let data = [0x01, 0x34, 0x12, 0xff, 0x7f, 0b0000_0100];
        let r = ReportReader::new(&data);
        assert_eq!(r.u16_le(1).unwrap(), 0x1234);
        assert_eq!(r.i16_le(3).unwrap(), 0x7fff);
        assert!(r.bit(5, 2).unwrap());
        assert!(!r.bit(5, 1).unwrap());
    }

    #[test]
    fn short_reports_are_rejected() {
        let r = ReportReader::new(&[0u8; 3]);
        assert!(matches!(
            r.u16_le(2),
            Err(Error::ShortReport { len: 3, needed: 4 })
        ));
    }

    #[test]
    fn builder_pads_to_length() {
        let report = ReportBuilder::new(7).u8(0xf8).u8(0x09).u16_le(0x0105).build();
        assert_eq!(report, vec![0xf8, 0x09, 0x05, 0x01, 0, 0, 0]);
    }
}
