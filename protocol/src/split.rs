// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Responses split across several datagrams.
//!
//! A fragment starts with [`SPLIT_HEADER`](crate::SPLIT_HEADER). Source servers
//! may compress a split response with bzip2, in which case the first fragment
//! carries the size and CRC32 of the decompressed data.

use std::collections::HashMap;

use log::trace;

use crate::cursor::{Cursor, CursorMut};
use crate::types::Str;
use crate::{Error, SPLIT_HEADER};

/// Maximum payload size of a Source fragment announced by servers.
pub const SOURCE_SPLIT_SIZE: u16 = 1248;

const COMPRESSED_FLAG: u32 = 0x8000_0000;

/// Layout of the split header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Framing {
    /// `id:i32 total:u8 number:u8 size:u16` with optional compression.
    Source,
    /// `id:i32` and one byte with `number` in the high nibble and `total` in the low.
    GoldSrc,
}

/// Compression header of the first fragment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Compression {
    /// Size of decompressed data.
    pub size: u32,
    /// CRC32 of decompressed data.
    pub crc32: u32,
}

/// A fragment of a split response.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fragment<'a> {
    /// Request identifier shared by all fragments of a response.
    pub id: i32,
    /// Index of the fragment.
    pub number: u8,
    /// Number of fragments.
    pub total: u8,
    /// Compression header, only in the first fragment of a compressed response.
    pub compression: Option<Compression>,
    /// Fragment data.
    pub payload: &'a [u8],
}

impl<'a> Fragment<'a> {
    /// Returns `true` if the response is compressed.
    pub fn is_compressed(&self) -> bool {
        self.id as u32 & COMPRESSED_FLAG != 0
    }

    /// Decode fragment from `src`.
    pub fn decode(framing: Framing, src: &'a [u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(src);
        let header = cur.get_i32_le()?;
        if header != SPLIT_HEADER {
            return Err(Error::InvalidHeader(header));
        }
        let id = cur.get_i32_le()?;
        let (total, number) = match framing {
            Framing::Source => {
                let total = cur.get_u8()?;
                let number = cur.get_u8()?;
                let _size = cur.get_u16_le()?;
                (total, number)
            }
            Framing::GoldSrc => {
                let packed = cur.get_u8()?;
                (packed & 15, packed >> 4)
            }
        };
        if total == 0 || number >= total {
            return Err(Error::InvalidSplitPacket);
        }

        let mut ret = Self {
            id,
            number,
            total,
            compression: None,
            payload: &[],
        };
        if ret.is_compressed() {
            if framing == Framing::GoldSrc {
                return Err(Error::InvalidSplitPacket);
            }
            if number == 0 {
                ret.compression = Some(Compression {
                    size: cur.get_u32_le()?,
                    crc32: cur.get_u32_le()?,
                });
            }
        }
        ret.payload = cur.end();
        Ok(ret)
    }

    /// Encode fragment to `buf`.
    pub fn encode(&self, framing: Framing, buf: &mut [u8]) -> Result<usize, Error> {
        let mut cur = CursorMut::new(buf);
        cur.put_i32_le(SPLIT_HEADER)?.put_i32_le(self.id)?;
        match framing {
            Framing::Source => {
                cur.put_u8(self.total)?
                    .put_u8(self.number)?
                    .put_u16_le(SOURCE_SPLIT_SIZE)?;
                if let Some(compression) = self.compression {
                    cur.put_u32_le(compression.size)?
                        .put_u32_le(compression.crc32)?;
                }
            }
            Framing::GoldSrc => {
                cur.put_u8(self.number << 4 | self.total & 15)?;
            }
        }
        Ok(cur.put_bytes(self.payload)?.pos())
    }
}

#[derive(Debug)]
struct Pending {
    total: u8,
    compression: Option<Compression>,
    parts: Vec<Option<Vec<u8>>>,
}

impl Pending {
    fn is_complete(&self) -> bool {
        self.parts.iter().all(Option::is_some)
    }

    fn concat(self) -> Vec<u8> {
        self.parts.into_iter().flatten().flatten().collect()
    }
}

/// Collects fragments until a response is complete.
///
/// Fragments may arrive in any order, a duplicated fragment replaces the
/// earlier copy.
#[derive(Debug)]
pub struct Reassembler {
    framing: Framing,
    pending: HashMap<i32, Pending>,
}

impl Reassembler {
    /// Creates a new `Reassembler`.
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            pending: HashMap::new(),
        }
    }

    /// Returns the framing of fragments.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Returns `true` if some response is incomplete.
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drops all incomplete responses.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Adds a fragment.
    ///
    /// Returns a complete response which starts with the simple header.
    pub fn push(&mut self, src: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let fragment = Fragment::decode(self.framing, src)?;
        trace!(
            "fragment {}/{} of {:#010x}: {}",
            fragment.number + 1,
            fragment.total,
            fragment.id,
            Str(fragment.payload)
        );

        let pending = self.pending.entry(fragment.id).or_insert_with(|| Pending {
            total: fragment.total,
            compression: None,
            parts: vec![None; fragment.total as usize],
        });
        if pending.total != fragment.total {
            self.pending.remove(&fragment.id);
            return Err(Error::InvalidSplitPacket);
        }
        if fragment.compression.is_some() {
            pending.compression = fragment.compression;
        }
        pending.parts[fragment.number as usize] = Some(fragment.payload.to_vec());

        if !pending.is_complete() {
            return Ok(None);
        }

        let pending = match self.pending.remove(&fragment.id) {
            Some(pending) => pending,
            None => return Ok(None),
        };
        let compression = pending.compression;
        let data = pending.concat();
        if fragment.is_compressed() {
            let compression = compression.ok_or(Error::InvalidSplitPacket)?;
            decompress(&data, compression).map(Some)
        } else {
            Ok(Some(data))
        }
    }
}

#[cfg(feature = "bzip2")]
const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// Returns CRC32 used to check decompressed responses.
#[cfg(feature = "bzip2")]
pub fn checksum(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Decompresses a bzip2 response and checks its size and CRC32.
#[cfg(feature = "bzip2")]
pub fn decompress(data: &[u8], compression: Compression) -> Result<Vec<u8>, Error> {
    use std::io::Read;

    let mut out = Vec::with_capacity((compression.size as usize).min(1 << 20));
    // one extra byte to detect a response larger than announced
    bzip2::read::BzDecoder::new(data)
        .take(compression.size as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|_| Error::Decompression)?;

    if out.len() != compression.size as usize {
        return Err(Error::SizeMismatch {
            expected: compression.size,
            actual: out.len() as u32,
        });
    }

    let actual = checksum(&out);
    if actual != compression.crc32 {
        return Err(Error::ChecksumMismatch {
            expected: compression.crc32,
            actual,
        });
    }

    Ok(out)
}

/// Compressed responses require the `bzip2` feature.
#[cfg(not(feature = "bzip2"))]
pub fn decompress(_data: &[u8], _compression: Compression) -> Result<Vec<u8>, Error> {
    Err(Error::CompressionUnsupported)
}
