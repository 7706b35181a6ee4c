//! Tajima DST decoding.
//!
//! A DST file is a 512-byte text header followed by 3-byte stitch records.
//! Each record stores a relative displacement in balanced ternary plus a
//! control pattern in the third byte.

use crate::error::PreviewError;
use crate::pattern::{Pattern, PatternMetadata, PatternStatistics, StitchCommand};
use std::fs;
use std::path::Path;

const HEADER_SIZE: usize = 512;
const RECORD_SIZE: usize = 3;

const MACHINE_SPEED_SPM: f64 = 800.0;
const COLOR_CHANGE_PENALTY_SECONDS: f64 = 15.0;

const END_MASK: u8 = 0b1111_0011;
const COLOR_CHANGE_MASK: u8 = 0b1100_0011;
const SEQUIN_MODE_MASK: u8 = 0b0100_0011;
const JUMP_MASK: u8 = 0b1000_0011;

/// (byte, bit, weight) triples for the X displacement
const DX_TRITS: [(usize, u8, i32); 10] = [
    (2, 2, 81),
    (2, 3, -81),
    (1, 2, 27),
    (1, 3, -27),
    (0, 2, 9),
    (0, 3, -9),
    (1, 0, 3),
    (1, 1, -3),
    (0, 0, 1),
    (0, 1, -1),
];

/// (byte, bit, weight) triples for the Y displacement, before inversion
const DY_TRITS: [(usize, u8, i32); 10] = [
    (2, 5, 81),
    (2, 4, -81),
    (1, 5, 27),
    (1, 4, -27),
    (0, 5, 9),
    (0, 4, -9),
    (1, 7, 3),
    (1, 6, -3),
    (0, 7, 1),
    (0, 6, -1),
];

/// Boundary between the session and whatever turns a file into a [`Pattern`].
pub trait PatternParser {
    fn parse(&self, path: &Path) -> Result<Pattern, PreviewError>;
}

/// Reads and decodes `.dst` files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DstParser;

impl PatternParser for DstParser {
    fn parse(&self, path: &Path) -> Result<Pattern, PreviewError> {
        let data = fs::read(path)?;
        parse_dst(&data)
    }
}

fn decode(record: &[u8; RECORD_SIZE], trits: &[(usize, u8, i32)]) -> i32 {
    trits
        .iter()
        .filter(|(byte, bit, _)| (record[*byte] >> bit) & 1 == 1)
        .map(|(_, _, weight)| weight)
        .sum()
}

fn decode_dx(record: &[u8; RECORD_SIZE]) -> i32 {
    decode(record, &DX_TRITS)
}

fn decode_dy(record: &[u8; RECORD_SIZE]) -> i32 {
    -decode(record, &DY_TRITS)
}

fn header_field(data: &[u8], range: std::ops::Range<usize>) -> Option<String> {
    let raw = std::str::from_utf8(&data[range]).ok()?;
    let value = raw.trim_end_matches(char::from(0)).trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_header(header: &[u8]) -> PatternMetadata {
    PatternMetadata {
        label: header_field(header, 3..19),
        stitch_count: header_field(header, 23..30).and_then(|v| v.parse().ok()),
        color_count: header_field(header, 34..37).and_then(|v| v.parse().ok()),
    }
}

fn classify(control: u8, sequin_mode: bool) -> StitchCommand {
    if control & END_MASK == END_MASK {
        StitchCommand::End
    } else if control & COLOR_CHANGE_MASK == COLOR_CHANGE_MASK {
        StitchCommand::ColorChange
    } else if control & SEQUIN_MODE_MASK == SEQUIN_MODE_MASK {
        StitchCommand::SequinMode
    } else if control & JUMP_MASK == JUMP_MASK {
        if sequin_mode {
            StitchCommand::SequinEject
        } else {
            StitchCommand::Move
        }
    } else {
        StitchCommand::Stitch
    }
}

fn decode_records(body: &[u8], pattern: &mut Pattern) -> PatternStatistics {
    let mut stats = PatternStatistics::default();
    let (mut x, mut y) = (0.0f64, 0.0f64);
    let mut sequin_mode = false;

    for chunk in body.chunks_exact(RECORD_SIZE) {
        let record = [chunk[0], chunk[1], chunk[2]];
        x += decode_dx(&record) as f64;
        y += decode_dy(&record) as f64;

        let command = classify(record[2], sequin_mode);
        pattern.add_stitch(x, y, command);
        match command {
            StitchCommand::End => break,
            StitchCommand::ColorChange => stats.color_change_count += 1,
            StitchCommand::SequinMode => sequin_mode = !sequin_mode,
            StitchCommand::Move => stats.jump_count += 1,
            StitchCommand::Stitch => stats.real_stitch_count += 1,
            _ => {}
        }
    }

    stats.estimated_time_minutes = stats.real_stitch_count as f64 / MACHINE_SPEED_SPM
        + stats.color_change_count as f64 * COLOR_CHANGE_PENALTY_SECONDS / 60.0;
    stats
}

/// Decode a complete DST file held in memory.
pub fn parse_dst(data: &[u8]) -> Result<Pattern, PreviewError> {
    if data.len() < HEADER_SIZE {
        return Err(PreviewError::InsufficientData);
    }

    let (header, body) = data.split_at(HEADER_SIZE);
    let mut pattern = Pattern::new();
    pattern.metadata = parse_header(header);
    pattern.statistics = Some(decode_records(body, &mut pattern));
    pattern.calculate_bounds();

    log::debug!(
        "Decoded DST: {} records, {} color changes",
        pattern.stitches.len(),
        pattern.color_changes
    );

    Ok(pattern)
}
