//! Byte-level writer and reader for the canonical format.

use super::CodecError;

/// Largest payload a variable-length prefix can describe.
pub const MAX_VL_LENGTH: usize = 918_744;

pub fn write_vl_length(len: usize, out: &mut Vec<u8>) -> Result<(), CodecError> {
    if len <= 192 {
        out.push(len as u8);
    } else if len <= 12_480 {
        let rest = len - 193;
        out.push(193 + (rest >> 8) as u8);
        out.push((rest & 0xFF) as u8);
    } else if len <= MAX_VL_LENGTH {
        let rest = len - 12_481;
        out.push(241 + (rest >> 16) as u8);
        out.push(((rest >> 8) & 0xFF) as u8);
        out.push((rest & 0xFF) as u8);
    } else {
        return Err(CodecError::LengthOverflow(len));
    }
    Ok(())
}

pub fn write_vl(bytes: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
    write_vl_length(bytes.len(), out)?;
    out.extend_from_slice(bytes);
    Ok(())
}

/// Cursor over a serialized blob. Every read is bounds-checked.
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(CodecError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_vl_length(&mut self) -> Result<usize, CodecError> {
        let b1 = self.read_u8()? as usize;
        match b1 {
            0..=192 => Ok(b1),
            193..=240 => {
                let b2 = self.read_u8()? as usize;
                Ok(193 + (b1 - 193) * 256 + b2)
            }
            241..=254 => {
                let b2 = self.read_u8()? as usize;
                let b3 = self.read_u8()? as usize;
                Ok(12_481 + (b1 - 241) * 65_536 + b2 * 256 + b3)
            }
            _ => Err(CodecError::InvalidLengthPrefix(b1 as u8)),
        }
    }

    pub fn read_vl(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_vl_length()?;
        self.read_bytes(len)
    }
}
