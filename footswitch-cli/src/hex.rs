use anyhow::{bail, Context, Result};
use tracing::debug;

/// Contiguous run of bytes from an Intel HEX file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexSegment {
    pub address: u32,
    pub data: Vec<u8>,
}

/// ATmega32U4 flash size; no image may span more than this.
const MAX_IMAGE_SPAN: u32 = 0x8000;

impl HexSegment {
    /// One past the last byte, `None` if that lies beyond the 32-bit space.
    fn end(&self) -> Option<u32> {
        u32::try_from(self.data.len())
            .ok()
            .and_then(|len| self.address.checked_add(len))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordType {
    Data,
    EndOfFile,
    ExtendedSegmentAddress,
    StartSegmentAddress,
    ExtendedLinearAddress,
    StartLinearAddress,
}

impl RecordType {
    fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x00 => Self::Data,
            0x01 => Self::EndOfFile,
            0x02 => Self::ExtendedSegmentAddress,
            0x03 => Self::StartSegmentAddress,
            0x04 => Self::ExtendedLinearAddress,
            0x05 => Self::StartLinearAddress,
            _ => return None,
        })
    }
}

/// Parse an Intel HEX image (as produced by `avr-objcopy -O ihex`).
///
/// Start-address records are accepted and ignored; AVR always starts at 0.
pub fn parse_hex(input: &str) -> Result<Vec<HexSegment>> {
    let mut segments: Vec<HexSegment> = Vec::new();
    let mut base_address: u32 = 0;

    for (idx, line) in input.lines().enumerate() {
        let line_num = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(body) = line.strip_prefix(':') else {
            bail!("line {line_num}: missing start code ':'");
        };

        let bytes =
            decode_hex_bytes(body).with_context(|| format!("line {line_num}: invalid hex data"))?;
        if bytes.len() < 5 {
            bail!("line {line_num}: record too short");
        }

        let byte_count = usize::from(bytes[0]);
        if bytes.len() != 5 + byte_count {
            bail!(
                "line {line_num}: expected {byte_count} data bytes, got {}",
                bytes.len() - 5
            );
        }

        // Sum of every byte including the checksum is 0 mod 256
        if bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) != 0 {
            bail!("line {line_num}: checksum mismatch");
        }

        let offset = u32::from(u16::from_be_bytes([bytes[1], bytes[2]]));
        let data = &bytes[4..4 + byte_count];
        let Some(record) = RecordType::from_u8(bytes[3]) else {
            bail!("line {line_num}: unsupported record type 0x{:02X}", bytes[3]);
        };

        match record {
            RecordType::Data => {
                let Some(address) = base_address
                    .checked_add(offset)
                    .filter(|a| a.checked_add(byte_count as u32).is_some())
                else {
                    bail!("line {line_num}: address overflow");
                };
                match segments.last_mut() {
                    Some(last) if last.end() == Some(address) => {
                        last.data.extend_from_slice(data)
                    }
                    _ => segments.push(HexSegment {
                        address,
                        data: data.to_vec(),
                    }),
                }
            }
            RecordType::EndOfFile => break,
            RecordType::ExtendedSegmentAddress | RecordType::ExtendedLinearAddress => {
                let [hi, lo] = data else {
                    bail!("line {line_num}: address record must be 2 bytes");
                };
                let upper = u32::from(u16::from_be_bytes([*hi, *lo]));
                base_address = if record == RecordType::ExtendedLinearAddress {
                    upper << 16
                } else {
                    upper << 4
                };
            }
            RecordType::StartSegmentAddress | RecordType::StartLinearAddress => {
                debug!(line = line_num, "ignoring start address record");
            }
        }
    }

    debug!(segments = segments.len(), "parsed HEX image");
    Ok(segments)
}

/// Lay the segments out as one image starting at the lowest address.
/// Gaps are filled with 0xFF (erased flash).
pub fn flatten_segments(segments: &[HexSegment]) -> Result<(u32, Vec<u8>)> {
    let Some(min_addr) = segments.iter().map(|s| s.address).min() else {
        bail!("no data segments in HEX file");
    };
    let Some(max_addr) = segments
        .iter()
        .try_fold(min_addr, |max, seg| seg.end().map(|end| max.max(end)))
    else {
        bail!("segment extends past the 32-bit address space");
    };
    if max_addr - min_addr > MAX_IMAGE_SPAN {
        bail!(
            "image spans 0x{:08X}..0x{:08X}, more than the {} byte flash",
            min_addr,
            max_addr,
            MAX_IMAGE_SPAN
        );
    }

    let mut image = vec![0xFFu8; (max_addr - min_addr) as usize];
    for seg in segments {
        let offset = (seg.address - min_addr) as usize;
        image[offset..offset + seg.data.len()].copy_from_slice(&seg.data);
    }

    Ok((min_addr, image))
}

fn decode_hex_bytes(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        bail!("odd number of hex characters");
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            let pair = hex.get(i..i + 2).context("non-ASCII character")?;
            u8::from_str_radix(pair, 16).with_context(|| format!("invalid hex at position {i}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_hex() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F78\n\
                   :00000001FF\n";
        let segments = parse_hex(hex).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].address, 0);
        assert_eq!(segments[0].data, (0u8..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_parse_extended_segment() {
        let hex = ":020000020100FB\n\
                   :10000000112233445566778899AABBCCDDEEFF00F8\n\
                   :00000001FF\n";
        let segments = parse_hex(hex).unwrap();
        assert_eq!(segments.len(), 1);
        // 0x0100 << 4
        assert_eq!(segments[0].address, 0x1000);
    }

    #[test]
    fn test_parse_extended_linear() {
        let hex = ":020000040001F9\n\
                   :0100000055AA\n\
                   :00000001FF\n";
        let segments = parse_hex(hex).unwrap();
        assert_eq!(segments[0].address, 0x1_0000);
        assert_eq!(segments[0].data, vec![0x55]);
    }

    #[test]
    fn test_start_address_record_ignored() {
        let hex = ":0400000300000000F9\n\
                   :0100000055AA\n\
                   :00000001FF\n";
        let segments = parse_hex(hex).unwrap();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_checksum_error() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F00\n\
                   :00000001FF\n";
        assert!(parse_hex(hex).is_err());
    }

    #[test]
    fn test_missing_start_code() {
        assert!(parse_hex("00000001FF\n").is_err());
    }

    #[test]
    fn test_stops_at_end_of_file() {
        let hex = ":00000001FF\n\
                   garbage after eof\n";
        assert!(parse_hex(hex).unwrap().is_empty());
    }

    #[test]
    fn test_contiguous_merge() {
        let hex = ":04000000AABBCCDDEE\n\
                   :04000400112233444E\n\
                   :00000001FF\n";
        let segments = parse_hex(hex).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].data, vec![0xAA, 0xBB, 0xCC, 0xDD, 0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn test_flatten_fills_gaps() {
        let segments = vec![
            HexSegment {
                address: 0x100,
                data: vec![0xAA, 0xBB],
            },
            HexSegment {
                address: 0x110,
                data: vec![0xCC, 0xDD],
            },
        ];
        let (base, image) = flatten_segments(&segments).unwrap();
        assert_eq!(base, 0x100);
        assert_eq!(image.len(), 0x12);
        assert_eq!(&image[..3], &[0xAA, 0xBB, 0xFF]);
        assert_eq!(&image[0x10..], &[0xCC, 0xDD]);
    }

    #[test]
    fn test_address_overflow_rejected() {
        let hex = ":02000004FFFFFC\n\
                   :10FFF80000000000000000000000000000000000F9\n\
                   :10FFF80000000000000000000000000000000000F9\n\
                   :00000001FF\n";
        let err = parse_hex(hex).unwrap_err();
        assert!(err.to_string().contains("line 2: address overflow"));
    }

    #[test]
    fn test_flatten_rejects_oversized_span() {
        let segments = vec![
            HexSegment {
                address: 0,
                data: vec![0xAA],
            },
            HexSegment {
                address: 0xFFFF_0000,
                data: vec![0xBB],
            },
        ];
        assert!(flatten_segments(&segments).is_err());
    }

    #[test]
    fn test_flatten_accepts_full_flash() {
        let segments = vec![HexSegment {
            address: 0,
            data: vec![0u8; MAX_IMAGE_SPAN as usize],
        }];
        let (_, image) = flatten_segments(&segments).unwrap();
        assert_eq!(image.len(), MAX_IMAGE_SPAN as usize);
    }

    #[test]
    fn test_flatten_empty() {
        assert!(flatten_segments(&[]).is_err());
    }
}
