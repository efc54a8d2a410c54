//! # NavData Decoder
//!
//! Decodes raw telemetry datagrams. Every field is read explicitly with a
//! bounds check first; a truncated or zero-sized record ends parsing early
//! and keeps whatever was already decoded.

use bytes::Buf;
use tracing::debug;

use super::protocol::*;
use crate::error::{DroneError, Result};

/// Decode one telemetry datagram
///
/// # Arguments
///
/// * `data` - Raw UDP payload
///
/// # Returns
///
/// * `Result<NavData>` - Decoded datagram. `contains_valid_data` is false
///   when the checksum record is missing or does not match.
///
/// # Errors
///
/// Returns `MalformedPacket` if the datagram is shorter than the header
///
/// # Examples
///
/// ```
/// use ardrone_link::navdata::decoder::decode_navdata;
///
/// assert!(decode_navdata(&[0u8; 8]).is_err());
/// ```
pub fn decode_navdata(data: &[u8]) -> Result<NavData> {
    if data.len() < NAVDATA_HEADER_SIZE {
        return Err(DroneError::MalformedPacket(format!(
            "NavData too short: {} bytes (header is {})",
            data.len(),
            NAVDATA_HEADER_SIZE
        )));
    }

    let mut header_buf = &data[..NAVDATA_HEADER_SIZE];
    let mut navdata = NavData {
        header: NavDataHeader {
            magic: header_buf.get_u32_le(),
            status: header_buf.get_u32_le(),
            sequence: header_buf.get_u32_le(),
            vision_defined: header_buf.get_u32_le(),
        },
        ..Default::default()
    };

    let mut position = NAVDATA_HEADER_SIZE;

    while position + NAVDATA_RECORD_HEADER_SIZE <= data.len() {
        let mut record_header = &data[position..position + NAVDATA_RECORD_HEADER_SIZE];
        let tag = record_header.get_u16_le();
        let size = record_header.get_u16_le() as usize;

        if size == 0 || position + size > data.len() {
            debug!("NavData record {} truncated at offset {} (size {})", tag, position, size);
            break;
        }

        let payload = &data[position + NAVDATA_RECORD_HEADER_SIZE..position + size];

        match tag {
            NAVDATA_TAG_DEMO => match decode_demo(payload) {
                Some(demo) => navdata.demo = Some(demo),
                None => break,
            },
            NAVDATA_TAG_VISION_DETECT => match decode_vision_detect(payload) {
                Some(tags) => navdata.vision_tags = tags,
                None => break,
            },
            NAVDATA_TAG_CHECKSUM => {
                if payload.len() < NAVDATA_CHECKSUM_PAYLOAD_SIZE {
                    break;
                }
                let mut checksum_buf = payload;
                let expected = checksum_buf.get_u32_le();
                navdata.checksum = Some(expected);
                navdata.contains_valid_data = expected == navdata_checksum(data);
            }
            _ => {}
        }

        position += size;
    }

    Ok(navdata)
}

/// Byte sum of the datagram without the trailing checksum record
pub fn navdata_checksum(data: &[u8]) -> u32 {
    let end = data.len().saturating_sub(NAVDATA_CHECKSUM_RECORD_SIZE);

    data[..end]
        .iter()
        .fold(0u32, |sum, &byte| sum.wrapping_add(byte as u32))
}

/// Check a decoded datagram's checksum
///
/// # Errors
///
/// Returns `ChecksumMismatch` if the checksum record is missing or wrong
pub fn verify_checksum(navdata: &NavData, data: &[u8]) -> Result<()> {
    let computed = navdata_checksum(data);
    match navdata.checksum {
        Some(expected) if expected == computed => Ok(()),
        Some(expected) => Err(DroneError::ChecksumMismatch { expected, computed }),
        None => Err(DroneError::ChecksumMismatch { expected: 0, computed }),
    }
}

fn decode_demo(mut payload: &[u8]) -> Option<DemoData> {
    if payload.remaining() < NAVDATA_DEMO_PAYLOAD_SIZE {
        return None;
    }

    Some(DemoData {
        control_state: payload.get_u32_le(),
        battery_percentage: payload.get_u32_le(),
        theta: payload.get_f32_le(),
        phi: payload.get_f32_le(),
        psi: payload.get_f32_le(),
        altitude_mm: payload.get_i32_le(),
        velocity_x: payload.get_f32_le(),
        velocity_y: payload.get_f32_le(),
        velocity_z: payload.get_f32_le(),
        last_frame_index: payload.get_u32_le(),
    })
}

fn decode_vision_detect(mut payload: &[u8]) -> Option<Vec<VisionTag>> {
    if payload.remaining() < NAVDATA_VISION_DETECT_PAYLOAD_SIZE {
        return None;
    }

    let count = (payload.get_u32_le() as usize).min(MAX_VISION_TAGS);

    // Fields are stored column-wise: four types, four x, four y, ...
    let mut columns = [[0u32; MAX_VISION_TAGS]; 6];
    for column in columns.iter_mut() {
        for value in column.iter_mut() {
            *value = payload.get_u32_le();
        }
    }
    let mut angles = [0f32; MAX_VISION_TAGS];
    for angle in angles.iter_mut() {
        *angle = payload.get_f32_le();
    }

    let [types, xs, ys, widths, heights, distances] = columns;

    Some(
        (0..count)
            .map(|i| {
                VisionTag::from_raw(types[i], xs[i], ys[i], widths[i], heights[i], distances[i], angles[i])
            })
            .collect(),
    )
}
