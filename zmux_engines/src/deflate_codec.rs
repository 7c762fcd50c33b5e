use std::io::{self, Read, Write};

use flate2::bufread::{DeflateDecoder, GzDecoder};
use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::{Compression, GzBuilder};

use zmux_core::DataFormat;

use crate::FrameError;

/// DEFLATE kernel covering the four container formats.
///
/// `Raw` is a bare deflate stream; `FourByte` prefixes it with a 4-byte LE
/// raw-length header; `Gzip` is a standard gzip member; `GzipExt` is a gzip
/// member whose FEXTRA field carries a "QZ" subfield with the frame's raw
/// length, so readers can pre-size without inflating.
pub(crate) fn encode(src: &[u8], level: u32, format: DataFormat) -> io::Result<Vec<u8>> {
    let compression = Compression::new(level);
    match format {
        DataFormat::Raw => {
            let mut enc = DeflateEncoder::new(Vec::new(), compression);
            enc.write_all(src)?;
            enc.finish()
        }
        DataFormat::FourByte => {
            let mut out = Vec::with_capacity(src.len() / 2 + 16);
            out.extend_from_slice(&(src.len() as u32).to_le_bytes());
            let mut enc = DeflateEncoder::new(out, compression);
            enc.write_all(src)?;
            enc.finish()
        }
        DataFormat::Gzip => {
            let mut enc = GzEncoder::new(Vec::new(), compression);
            enc.write_all(src)?;
            enc.finish()
        }
        DataFormat::GzipExt => {
            // FEXTRA subfield: SI "QZ", LEN 4, raw frame length LE.
            let mut extra = Vec::with_capacity(8);
            extra.extend_from_slice(b"QZ");
            extra.extend_from_slice(&4u16.to_le_bytes());
            extra.extend_from_slice(&(src.len() as u32).to_le_bytes());
            let mut enc = GzBuilder::new().extra(extra).write(Vec::new(), compression);
            enc.write_all(src)?;
            enc.finish()
        }
    }
}

/// Decode exactly one frame starting at `src[0]`.
///
/// Returns the bytes consumed (frame length including any container header
/// and trailer) and the inflated payload.
pub(crate) fn decode_frame(src: &[u8], format: DataFormat) -> Result<(usize, Vec<u8>), FrameError> {
    match format {
        DataFormat::Raw => {
            let mut dec = DeflateDecoder::new(src);
            let mut out = Vec::new();
            dec.read_to_end(&mut out).map_err(classify)?;
            Ok((dec.total_in() as usize, out))
        }
        DataFormat::FourByte => {
            if src.len() < 4 {
                return Err(FrameError::Truncated);
            }
            let raw_len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
            let mut dec = DeflateDecoder::new(&src[4..]);
            let mut out = Vec::with_capacity(raw_len);
            dec.read_to_end(&mut out).map_err(classify)?;
            if out.len() != raw_len {
                return Err(FrameError::Corrupt);
            }
            Ok((4 + dec.total_in() as usize, out))
        }
        DataFormat::Gzip | DataFormat::GzipExt => {
            // The bufread decoder consumes exactly through the gzip trailer;
            // whatever it hands back is the start of the next frame.
            let mut dec = GzDecoder::new(src);
            let mut out = Vec::new();
            dec.read_to_end(&mut out).map_err(classify)?;
            let rest = dec.into_inner();
            Ok((src.len() - rest.len(), out))
        }
    }
}

fn classify(err: io::Error) -> FrameError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        FrameError::Truncated
    } else {
        FrameError::Corrupt
    }
}
