//! Text codec for MBO input records and MBP-10 output rows.
//!
//! Input format (one header line, then one record per line):
//!
//! ```text
//! ts_recv,ts_event,rtype,publisher_id,instrument_id,action,side,price,size,
//! channel_id,order_id,flags,ts_in_delta,sequence,symbol
//! ```
//!
//! - `price` is a decimal number; empty means 0 (unset)
//! - `size` empty means 0
//! - `side` empty means `N`
//! - Timestamps and symbol are kept as opaque text
//!
//! Output rows start with a 0-based row index, echo the event metadata and
//! then carry ten `(px, sz, ct)` triples per side, interleaved bid/ask per
//! level. A zero price is written as an empty field.

use std::fmt::Write as _;
use std::str::FromStr;

use crate::error::{MbpError, Result};
use crate::types::{format_price, Action, MboEvent, MbpSnapshot, Side, MBP_DEPTH, PRICE_SCALE};

/// Number of comma-separated fields in an MBO record.
pub const MBO_FIELD_COUNT: usize = 15;

/// Fractional digits accepted in an input price (the fixed-point scale).
const MAX_PRICE_DECIMALS: usize = 9;

/// Output number formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvFormat {
    /// Decimals for the event `price` column
    pub event_price_decimals: usize,
    /// Decimals for the `bid_px_NN` / `ask_px_NN` columns
    pub level_price_decimals: usize,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            event_price_decimals: 8,
            level_price_decimals: 2,
        }
    }
}

impl CsvFormat {
    /// Set decimals for the event price column.
    pub fn with_event_price_decimals(mut self, decimals: usize) -> Self {
        self.event_price_decimals = decimals;
        self
    }

    /// Set decimals for level price columns.
    pub fn with_level_price_decimals(mut self, decimals: usize) -> Self {
        self.level_price_decimals = decimals;
        self
    }
}

// ============================================================================
// Input
// ============================================================================

/// Parse a decimal price into fixed-point (9 implied decimals).
///
/// Accepts `123`, `123.45`, `.5` and `7.`; rejects signs other than a
/// leading `+`, exponents, more than 9 fractional digits and values that
/// overflow `i64`.
pub fn parse_price(text: &str) -> Result<i64> {
    let invalid = || MbpError::InvalidPrice(text.to_string());
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (unsigned, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if frac_part.len() > MAX_PRICE_DECIMALS
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid())?
    };

    let mut frac: i64 = 0;
    for digit in frac_part.bytes() {
        frac = frac * 10 + i64::from(digit - b'0');
    }
    for _ in frac_part.len()..MAX_PRICE_DECIMALS {
        frac *= 10;
    }

    whole
        .checked_mul(PRICE_SCALE)
        .and_then(|scaled| scaled.checked_add(frac))
        .ok_or_else(invalid)
}

fn parse_number<T: FromStr>(field: &'static str, text: &str) -> Result<T> {
    text.trim().parse().map_err(|_| MbpError::InvalidField {
        field,
        value: text.to_string(),
    })
}

fn parse_number_or_zero<T: FromStr + Default>(field: &'static str, text: &str) -> Result<T> {
    if text.trim().is_empty() {
        Ok(T::default())
    } else {
        parse_number(field, text)
    }
}

fn parse_action(text: &str) -> Result<Action> {
    let byte = match text.trim().as_bytes().first() {
        Some(byte) => *byte,
        None => {
            return Err(MbpError::InvalidField {
                field: "action",
                value: text.to_string(),
            })
        }
    };
    Action::from_byte(byte).ok_or(MbpError::InvalidAction(byte as char))
}

fn parse_side(text: &str) -> Result<Side> {
    match text.trim().as_bytes().first() {
        None => Ok(Side::None),
        Some(byte) => Side::from_byte(*byte).ok_or(MbpError::InvalidSide(*byte as char)),
    }
}

/// Parse one MBO record.
///
/// `line_no` is the 1-based line number (header = 1) used in error
/// messages. Fields past the fifteenth are ignored.
pub fn parse_mbo_line(line: &str, line_no: u64) -> Result<MboEvent> {
    parse_fields(line.trim_end_matches(['\r', '\n'])).map_err(|e| e.at_line(line_no))
}

fn parse_fields(line: &str) -> Result<MboEvent> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < MBO_FIELD_COUNT {
        return Err(MbpError::generic(format!(
            "expected {MBO_FIELD_COUNT} fields, found {}",
            fields.len()
        )));
    }

    let price = if fields[7].trim().is_empty() {
        0
    } else {
        parse_price(fields[7])?
    };

    Ok(MboEvent {
        ts_recv: fields[0].to_string(),
        ts_event: fields[1].to_string(),
        rtype: parse_number("rtype", fields[2])?,
        publisher_id: parse_number("publisher_id", fields[3])?,
        instrument_id: parse_number("instrument_id", fields[4])?,
        action: parse_action(fields[5])?,
        side: parse_side(fields[6])?,
        price,
        size: parse_number_or_zero("size", fields[8])?,
        channel_id: parse_number("channel_id", fields[9])?,
        order_id: parse_number("order_id", fields[10])?,
        flags: parse_number("flags", fields[11])?,
        ts_in_delta: parse_number("ts_in_delta", fields[12])?,
        sequence: parse_number("sequence", fields[13])?,
        symbol: fields[14].to_string(),
    })
}

// ============================================================================
// Output
// ============================================================================

/// Header line of the MBP-10 output (without trailing newline).
pub fn mbp_header() -> String {
    let mut header = String::from(
        ",ts_recv,ts_event,rtype,publisher_id,instrument_id,action,side,depth,price,size,flags,ts_in_delta,sequence,",
    );
    for i in 0..MBP_DEPTH {
        let _ = write!(
            header,
            "bid_px_{i:02},bid_sz_{i:02},bid_ct_{i:02},ask_px_{i:02},ask_sz_{i:02},ask_ct_{i:02},"
        );
    }
    header.push_str("symbol,order_id");
    header
}

fn push_price(out: &mut String, price: i64, decimals: usize) {
    if price != 0 {
        out.push_str(&format_price(price, decimals));
    }
}

/// Format one snapshot as an output row (without trailing newline).
pub fn format_mbp_line(snapshot: &MbpSnapshot, index: u64, format: &CsvFormat) -> String {
    let mut line = String::with_capacity(512);

    // `write!` into a String cannot fail
    let _ = write!(
        line,
        "{index},{},{},{},{},{},{},{},{},",
        snapshot.ts_recv,
        snapshot.ts_event,
        snapshot.rtype,
        snapshot.publisher_id,
        snapshot.instrument_id,
        snapshot.action.as_char(),
        snapshot.side.as_char(),
        snapshot.depth,
    );
    push_price(&mut line, snapshot.price, format.event_price_decimals);
    let _ = write!(
        line,
        ",{},{},{},{},",
        snapshot.size, snapshot.flags, snapshot.ts_in_delta, snapshot.sequence
    );

    for (bid, ask) in snapshot.bids.iter().zip(snapshot.asks.iter()) {
        push_price(&mut line, bid.price, format.level_price_decimals);
        let _ = write!(line, ",{},{},", bid.size, bid.count);
        push_price(&mut line, ask.price, format.level_price_decimals);
        let _ = write!(line, ",{},{},", ask.size, ask.count);
    }

    let _ = write!(line, "{},{}", snapshot.symbol, snapshot.order_id);
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LevelSnapshot;

    const SAMPLE: &str = "2025-07-17T08:05:03.360842448Z,2025-07-17T08:05:03.360677248Z,160,2,1108,A,B,5.510000000,100,0,817593,130,165200,851012,ARL";

    // =========================================================================
    // Price parsing
    // =========================================================================

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("5.51").unwrap(), 5_510_000_000);
        assert_eq!(parse_price("5.510000000").unwrap(), 5_510_000_000);
        assert_eq!(parse_price("10").unwrap(), 10 * PRICE_SCALE);
        assert_eq!(parse_price(".5").unwrap(), 500_000_000);
        assert_eq!(parse_price("7.").unwrap(), 7 * PRICE_SCALE);
        assert_eq!(parse_price(" 0.000000001 ").unwrap(), 1);
        assert_eq!(parse_price("+1.25").unwrap(), 1_250_000_000);
    }

    #[test]
    fn test_parse_price_rejects_bad_input() {
        for bad in ["", ".", "-1.0", "1e5", "abc", "1.2.3", "0.0000000001", "99999999999999"] {
            assert!(
                matches!(parse_price(bad), Err(MbpError::InvalidPrice(_))),
                "expected {bad:?} to be rejected"
            );
        }
    }

    // =========================================================================
    // Record parsing
    // =========================================================================

    #[test]
    fn test_parse_mbo_line() {
        let event = parse_mbo_line(SAMPLE, 2).unwrap();

        assert_eq!(event.ts_recv, "2025-07-17T08:05:03.360842448Z");
        assert_eq!(event.ts_event, "2025-07-17T08:05:03.360677248Z");
        assert_eq!(event.rtype, 160);
        assert_eq!(event.publisher_id, 2);
        assert_eq!(event.instrument_id, 1108);
        assert_eq!(event.action, Action::Add);
        assert_eq!(event.side, Side::Bid);
        assert_eq!(event.price, 5_510_000_000);
        assert_eq!(event.size, 100);
        assert_eq!(event.channel_id, 0);
        assert_eq!(event.order_id, 817593);
        assert_eq!(event.flags, 130);
        assert_eq!(event.ts_in_delta, 165200);
        assert_eq!(event.sequence, 851012);
        assert_eq!(event.symbol, "ARL");
    }

    #[test]
    fn test_parse_clear_record_with_empty_fields() {
        let line = "2025-07-17T07:05:09.035793433Z,2025-07-17T07:05:09.035627674Z,160,2,1108,R,N,,0,0,0,8,0,0,ARL\r";
        let event = parse_mbo_line(line, 2).unwrap();
        assert_eq!(event.action, Action::Clear);
        assert_eq!(event.side, Side::None);
        assert_eq!(event.price, 0);
        assert_eq!(event.symbol, "ARL");
    }

    #[test]
    fn test_empty_side_and_size_default() {
        let line = "a,b,160,2,1108,T,,5.51,,0,1,0,0,0,ARL";
        let event = parse_mbo_line(line, 9).unwrap();
        assert_eq!(event.side, Side::None);
        assert_eq!(event.size, 0);
    }

    #[test]
    fn test_modify_and_none_actions_parse() {
        let modify = SAMPLE.replace(",A,B,", ",M,B,");
        assert_eq!(parse_mbo_line(&modify, 2).unwrap().action, Action::Modify);
        let none = SAMPLE.replace(",A,B,", ",N,N,");
        assert_eq!(parse_mbo_line(&none, 2).unwrap().action, Action::None);
    }

    #[test]
    fn test_malformed_records() {
        let unknown_action = SAMPLE.replace(",A,B,", ",X,B,");
        assert_eq!(
            parse_mbo_line(&unknown_action, 4).unwrap_err(),
            MbpError::MalformedRecord {
                line: 4,
                reason: "Invalid action: 'X'".to_string()
            }
        );

        let unknown_side = SAMPLE.replace(",A,B,", ",A,S,");
        assert!(matches!(
            parse_mbo_line(&unknown_side, 5),
            Err(MbpError::MalformedRecord { line: 5, .. })
        ));

        let empty_action = SAMPLE.replace(",A,B,", ",,B,");
        assert!(parse_mbo_line(&empty_action, 6).is_err());

        let bad_size = SAMPLE.replace(",100,", ",ten,");
        let err = parse_mbo_line(&bad_size, 7).unwrap_err();
        assert!(err.to_string().contains("size"));

        let truncated = "a,b,160,2";
        assert!(matches!(
            parse_mbo_line(truncated, 8),
            Err(MbpError::MalformedRecord { line: 8, .. })
        ));
    }

    // =========================================================================
    // Output
    // =========================================================================

    #[test]
    fn test_header_layout() {
        let header = mbp_header();
        assert!(header.starts_with(",ts_recv,ts_event,rtype,"));
        assert!(header.contains(",sequence,bid_px_00,bid_sz_00,bid_ct_00,ask_px_00,ask_sz_00,ask_ct_00,bid_px_01,"));
        assert!(header.ends_with("ask_ct_09,symbol,order_id"));
        assert_eq!(header.split(',').count(), 14 + 6 * MBP_DEPTH + 2);
    }

    #[test]
    fn test_format_row() {
        let event = parse_mbo_line(SAMPLE, 2).unwrap();
        let mut snap = MbpSnapshot::from_event(&event);
        snap.bids[0] = LevelSnapshot::new(5_510_000_000, 100, 1);

        let row = format_mbp_line(&snap, 3, &CsvFormat::default());
        let cols: Vec<&str> = row.split(',').collect();

        assert_eq!(cols.len(), 14 + 6 * MBP_DEPTH + 2);
        assert_eq!(cols[0], "3");
        assert_eq!(cols[3], "10");
        assert_eq!(cols[6], "A");
        assert_eq!(cols[7], "B");
        assert_eq!(cols[8], "0");
        assert_eq!(cols[9], "5.51000000");
        assert_eq!(cols[10], "100");
        assert_eq!(cols[11], "130");
        assert_eq!(&cols[14..20], &["5.51", "100", "1", "", "0", "0"]);
        assert_eq!(cols[cols.len() - 2], "ARL");
        assert_eq!(cols[cols.len() - 1], "817593");
    }

    #[test]
    fn test_zero_event_price_is_blank() {
        let event = MboEvent::new(0, Action::Clear, Side::None, 0, 0).with_symbol("ARL");
        let snap = MbpSnapshot::from_event(&event);
        let row = format_mbp_line(&snap, 0, &CsvFormat::default());
        let cols: Vec<&str> = row.split(',').collect();
        assert_eq!(cols[6], "R");
        assert_eq!(cols[7], "N");
        assert_eq!(cols[9], "");
    }

    #[test]
    fn test_custom_decimals() {
        let mut snap = MbpSnapshot::from_event(&MboEvent::new(1, Action::Add, Side::Ask, 1_234_567_891, 5));
        snap.asks[0] = LevelSnapshot::new(1_234_567_891, 5, 1);
        let format = CsvFormat::default()
            .with_event_price_decimals(9)
            .with_level_price_decimals(4);
        let row = format_mbp_line(&snap, 0, &format);
        let cols: Vec<&str> = row.split(',').collect();
        assert_eq!(cols[9], "1.234567891");
        assert_eq!(cols[17], "1.2346");
    }
}
