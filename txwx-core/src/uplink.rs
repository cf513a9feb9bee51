//! FIS-B text-product uplink encoding for re-emitting received reports.
//!
//! Builds 432-byte UAT ground uplink application-data blocks:
//! - 8-byte UAT-specific header: 23-bit lat, 24-bit lon (360/2^24 deg),
//!   position-valid, UTC-coupled, app-data-valid
//! - one information frame: 9-bit length, 4-bit type (0 = FIS-B APDU)
//! - APDU header: product id, time option 0, hours, minutes
//! - report text in 6-bit DLAC, four characters per three bytes
//!
//! Reed-Solomon FEC and interleaving belong to the modulator.

/// Uplink application-data block size.
pub const UPLINK_DATA_LEN: usize = 432;

const UAT_HEADER_LEN: usize = 8;
const INFO_FRAME_HEADER_LEN: usize = 2;
const APDU_HEADER_LEN: usize = 4;

/// FIS-B product id for textual METAR/TAF reports.
pub const TEXT_PRODUCT_ID: u16 = 413;

/// DLAC bytes that fit after all headers.
const MAX_DLAC_BYTES: usize =
    UPLINK_DATA_LEN - UAT_HEADER_LEN - INFO_FRAME_HEADER_LEN - APDU_HEADER_LEN;

/// DLAC characters per uplink block.
pub const MAX_CHARS_PER_UPLINK: usize = MAX_DLAC_BYTES / 3 * 4;

// ---------------------------------------------------------------------------
// DLAC
// ---------------------------------------------------------------------------

/// 6-bit DLAC character set. Index 0 is ETX, 29 is the record separator.
const DLAC_ALPHABET: &[u8; 64] =
    b"\x03ABCDEFGHIJKLMNOPQRSTUVWXYZ\x1A\t\x1E\n| !\"#$%&'()*+,-./0123456789:;<=>?";

const DLAC_ETX: u8 = 0;
const DLAC_RS: u8 = 29;
const DLAC_SPACE: u8 = 32;

/// DLAC code for a printable character. Lowercase folds to uppercase;
/// control and unsupported characters become a space.
pub fn dlac_code(c: char) -> u8 {
    let c = c.to_ascii_uppercase();
    if !c.is_ascii() || c.is_ascii_control() {
        return DLAC_SPACE;
    }
    DLAC_ALPHABET
        .iter()
        .position(|&b| b == c as u8)
        .map(|i| i as u8)
        .unwrap_or(DLAC_SPACE)
}

/// Pack 6-bit codes, padding the last group with ETX.
pub fn dlac_pack(codes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(codes.len().div_ceil(4) * 3);
    for group in codes.chunks(4) {
        let mut c = [DLAC_ETX; 4];
        c[..group.len()].copy_from_slice(group);
        out.push((c[0] << 2) | (c[1] >> 4));
        out.push((c[1] << 4) | (c[2] >> 2));
        out.push((c[2] << 6) | (c[3] & 0x3F));
    }
    out
}

/// Unpack DLAC bytes back into text, stopping at ETX.
///
/// Record separators come back as `'\x1e'`.
pub fn dlac_unpack(data: &[u8]) -> String {
    let mut out = String::new();
    for group in data.chunks(3) {
        if group.len() < 3 {
            break;
        }
        let codes = [
            group[0] >> 2,
            ((group[0] & 0x03) << 4) | (group[1] >> 4),
            ((group[1] & 0x0F) << 2) | (group[2] >> 6),
            group[2] & 0x3F,
        ];
        for code in codes {
            if code == DLAC_ETX {
                return out;
            }
            out.push(DLAC_ALPHABET[code as usize] as char);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Text report
// ---------------------------------------------------------------------------

/// A textual report to re-emit, positioned at the originating station.
#[derive(Debug, Clone, PartialEq)]
pub struct TextReport {
    pub text: String,
    pub lat: f64,
    pub lng: f64,
    /// UTC hour of the observation
    pub hours: u8,
    /// UTC minute of the observation
    pub minutes: u8,
    pub product_id: u16,
}

impl TextReport {
    /// Report stamped with the UTC hour/minute of `observation_time`.
    pub fn new(text: impl Into<String>, lat: f64, lng: f64, observation_time: u32) -> Self {
        let secs_of_day = observation_time % 86_400;
        TextReport {
            text: text.into(),
            lat,
            lng,
            hours: (secs_of_day / 3600) as u8,
            minutes: (secs_of_day / 60 % 60) as u8,
            product_id: TEXT_PRODUCT_ID,
        }
    }
}

fn write_uat_header(buf: &mut [u8], lat: f64, lng: f64) {
    let lat = if lat < 0.0 { lat + 180.0 } else { lat };
    let lng = if lng < 0.0 { lng + 360.0 } else { lng };
    let raw_lat = ((lat * 16_777_216.0 / 360.0).round() as u32) & 0x7F_FFFF;
    let raw_lon = ((lng * 16_777_216.0 / 360.0).round() as u32) & 0xFF_FFFF;

    buf[0] = (raw_lat >> 15) as u8;
    buf[1] = (raw_lat >> 7) as u8;
    buf[2] = ((raw_lat << 1) as u8) | ((raw_lon >> 23) as u8 & 0x01);
    buf[3] = (raw_lon >> 15) as u8;
    buf[4] = (raw_lon >> 7) as u8;
    buf[5] = ((raw_lon << 1) as u8) | 0x01; // position valid
    buf[6] = 0x80 | 0x20; // UTC coupled, app data valid, slot 0
    buf[7] = 0;
}

fn write_apdu_header(buf: &mut [u8], report: &TextReport) {
    let product = report.product_id & 0x7FF;
    let hours = report.hours & 0x1F;
    let minutes = report.minutes & 0x3F;
    // A/G/P flags clear, S flag clear, time option 0
    buf[0] = (product >> 6) as u8 & 0x1F;
    buf[1] = ((product & 0x3F) as u8) << 2;
    buf[2] = (hours << 2) | (minutes >> 4);
    buf[3] = (minutes & 0x0F) << 4;
}

/// Encode a report into one or more uplink blocks.
///
/// The text is terminated with a record separator; text longer than one
/// block continues in the next.
pub fn encode_text_uplinks(report: &TextReport) -> Vec<Vec<u8>> {
    let mut codes: Vec<u8> = report.text.chars().map(dlac_code).collect();
    codes.push(DLAC_RS);

    codes
        .chunks(MAX_CHARS_PER_UPLINK)
        .map(|chunk| {
            let dlac = dlac_pack(chunk);
            let frame_len = APDU_HEADER_LEN + dlac.len();

            let mut block = vec![0u8; UPLINK_DATA_LEN];
            write_uat_header(&mut block[..UAT_HEADER_LEN], report.lat, report.lng);

            let frame = &mut block[UAT_HEADER_LEN..];
            frame[0] = (frame_len >> 1) as u8;
            frame[1] = ((frame_len & 0x01) as u8) << 7; // type 0: FIS-B APDU

            let apdu = &mut frame[INFO_FRAME_HEADER_LEN..];
            write_apdu_header(&mut apdu[..APDU_HEADER_LEN], report);
            apdu[APDU_HEADER_LEN..APDU_HEADER_LEN + dlac.len()].copy_from_slice(&dlac);
            block
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
