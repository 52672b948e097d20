// src/gps/nmea.rs
//! NMEA sentence validation and parsing

use super::data::{FixQuality, FixState};

const KNOTS_TO_MPS: f64 = 0.514;
const KMH_TO_MPS: f64 = 3.6;

/// Verify the trailing `*hh` checksum of a raw sentence.
///
/// The checksum is the XOR of every payload byte, skipping a leading `$`.
/// The claimed value is compared numerically, so `*0A`, `*0a` and `*A`
/// are all accepted for the same payload.
pub fn validate_checksum(sentence: &str) -> bool {
    let Some(star) = sentence.find('*') else {
        return false;
    };
    if star == 0 {
        return false;
    }

    let payload = sentence[..star].trim();
    let claimed = sentence[star + 1..].trim();

    let Ok(claimed) = u8::from_str_radix(claimed, 16) else {
        return false;
    };

    compute_checksum(payload) == claimed
}

/// XOR of the payload bytes, ignoring a leading `$`.
pub fn compute_checksum(payload: &str) -> u8 {
    let payload = payload.strip_prefix('$').unwrap_or(payload);
    payload.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Convert a `[d]ddmm.mmmm` coordinate plus hemisphere into signed decimal degrees.
///
/// Returns `None` when the field has no decimal point, fewer than two minute
/// digits before it, or any non-numeric part.
pub fn convert_coordinate(value: &str, hemisphere: &str) -> Option<f64> {
    let value = value.trim();
    if !value.is_ascii() {
        return None;
    }

    let dot = value.find('.')?;
    let minutes_start = dot.checked_sub(2)?;

    let degrees: f64 = value[..minutes_start].parse().ok()?;
    let minutes: f64 = value[minutes_start..].parse().ok()?;

    let decimal = degrees + minutes / 60.0;
    if !decimal.is_finite() {
        return None;
    }

    match hemisphere.trim() {
        h if h.eq_ignore_ascii_case("S") || h.eq_ignore_ascii_case("W") => Some(-decimal),
        _ => Some(decimal),
    }
}

/// Sentence types the dispatcher interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceKind {
    /// Global positioning fix data
    Gga,
    /// Recommended minimum
    Rmc,
    /// Track and speed over ground
    Vtg,
}

impl SentenceKind {
    /// Match on a substring of the tag so any talker ID (GP, GN, GL...) is accepted.
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag.contains("GGA") {
            Some(SentenceKind::Gga)
        } else if tag.contains("RMC") {
            Some(SentenceKind::Rmc)
        } else if tag.contains("VTG") {
            Some(SentenceKind::Vtg)
        } else {
            None
        }
    }
}

/// What a single dispatch did to the fix state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub kind: Option<SentenceKind>,
    /// A GGA sentence left the state with a valid position.
    pub fresh_fix: bool,
    pub heading_updated: bool,
}

/// Parse a checksum-validated sentence and apply its fields to `state`.
///
/// Fields are applied one at a time; a missing or unparsable field is
/// skipped without affecting the others.
pub fn dispatch(state: &mut FixState, sentence: &str) -> DispatchOutcome {
    let body = sentence.split('*').next().unwrap_or(sentence).trim();
    let parts: Vec<&str> = body.split(',').collect();

    let kind = parts.first().and_then(|tag| SentenceKind::from_tag(tag));
    let mut outcome = DispatchOutcome {
        kind,
        ..Default::default()
    };

    match kind {
        Some(SentenceKind::Gga) => outcome.fresh_fix = parse_gga(state, &parts),
        Some(SentenceKind::Rmc) => outcome.heading_updated = parse_rmc(state, &parts),
        Some(SentenceKind::Vtg) => outcome.heading_updated = parse_vtg(state, &parts),
        None => {}
    }

    outcome
}

fn field<'a>(parts: &[&'a str], index: usize) -> Option<&'a str> {
    parts.get(index).copied().map(str::trim).filter(|f| !f.is_empty())
}

fn numeric(parts: &[&str], index: usize) -> Option<f64> {
    field(parts, index).and_then(|f| f.parse::<f64>().ok())
}

/// Parse GGA (Global Positioning System Fix Data). Returns whether the
/// resulting state holds a valid position.
fn parse_gga(state: &mut FixState, parts: &[&str]) -> bool {
    // Number of satellites (field 7)
    if let Some(sats) = field(parts, 7).and_then(|f| f.parse::<u32>().ok()) {
        state.set_satellites(sats);
    }

    // HDOP (field 8)
    if let Some(hdop) = numeric(parts, 8) {
        state.set_hdop(hdop);
    }

    // Latitude/longitude (fields 2-5), then fix quality (field 6) on success
    if parts.len() > 5 {
        let located = state.set_position(parts[2], parts[3], parts[4], parts[5]);
        if located {
            if let Some(quality) = field(parts, 6)
                .and_then(|f| f.parse::<u8>().ok())
                .and_then(FixQuality::from_code)
            {
                state.set_quality(quality);
            }
        }
    }

    state.position_valid()
}

/// Parse RMC (Recommended Minimum). Returns whether the heading changed.
fn parse_rmc(state: &mut FixState, parts: &[&str]) -> bool {
    // Speed over ground in knots (field 7)
    if let Some(knots) = numeric(parts, 7) {
        state.set_velocity(knots * KNOTS_TO_MPS);
    }

    // Course over ground in degrees (field 8)
    numeric(parts, 8).is_some_and(|course| state.set_heading(course))
}

/// Parse VTG (Track made good and ground speed). Returns whether the heading changed.
fn parse_vtg(state: &mut FixState, parts: &[&str]) -> bool {
    let heading_updated = numeric(parts, 1).is_some_and(|course| state.set_heading(course));

    // Speed over ground in km/h (field 7)
    if let Some(kmh) = numeric(parts, 7) {
        state.set_velocity(kmh / KMH_TO_MPS);
    }

    heading_updated
}

#[cfg(test)]
mod tests {
    use super::*;

    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    fn with_checksum(payload: &str) -> String {
        format!("{}*{:02X}", payload, compute_checksum(payload))
    }

    #[test]
    fn test_checksum_accepts_known_sentences() {
        assert!(validate_checksum(GGA));
        assert!(validate_checksum(RMC));
        assert!(validate_checksum(&format!("{}\r\n", GGA)));
    }

    #[test]
    fn test_checksum_rejects_mutation() {
        let mutated = GGA.replace("4807.038", "4807.039");
        assert!(!validate_checksum(&mutated));
    }

    #[test]
    fn test_checksum_rejects_missing_or_leading_star() {
        assert!(!validate_checksum("$GPGGA,123519,4807.038,N"));
        assert!(!validate_checksum("*47"));
        assert!(!validate_checksum("$GPGGA,123519*"));
        assert!(!validate_checksum("$GPGGA,123519*ZZ"));
    }

    #[test]
    fn test_checksum_case_and_padding() {
        let payload = "$GPTXT,A";
        let sum = compute_checksum(payload);
        assert!(validate_checksum(&format!("{}*{:x}", payload, sum)));
        assert!(validate_checksum(&format!("{}*{:X}", payload, sum)));
        assert!(validate_checksum(&format!("{}*{:02X}", payload, sum)));
    }

    #[test]
    fn test_checksum_is_stable() {
        let sentence = with_checksum("$GNVTG,054.7,T,034.4,M,005.5,N,010.2,K");
        let first = validate_checksum(&sentence);
        assert!(first);
        assert_eq!(validate_checksum(&sentence), first);
    }

    #[test]
    fn test_convert_coordinate() {
        let lat = convert_coordinate("4807.038", "N").unwrap();
        assert!((lat - 48.1173).abs() < 1e-4);

        let lon = convert_coordinate("01131.000", "W").unwrap();
        assert!((lon - -11.5167).abs() < 1e-4);

        let south = convert_coordinate("3351.500", "s").unwrap();
        assert!((south - -33.8583).abs() < 1e-4);
    }

    #[test]
    fn test_convert_coordinate_rejects_garbage() {
        assert_eq!(convert_coordinate("4807", "N"), None);
        assert_eq!(convert_coordinate("7.5", "N"), None);
        assert_eq!(convert_coordinate("48x7.038", "N"), None);
        assert_eq!(convert_coordinate("", "N"), None);
        assert_eq!(convert_coordinate("48°07.038", "N"), None);
    }

    #[test]
    fn test_gga_parsing() {
        let mut state = FixState::new();
        let outcome = dispatch(&mut state, GGA);

        assert_eq!(outcome.kind, Some(SentenceKind::Gga));
        assert!(outcome.fresh_fix);
        assert_eq!(state.satellites(), 8);
        assert_eq!(state.hdop(), 0.9);
        assert_eq!(state.quality(), FixQuality::Gps);
        let position = state.position().unwrap();
        assert!((position.latitude - 48.1173).abs() < 1e-4);
        assert!((position.longitude - 11.5167).abs() < 1e-4);
    }

    #[test]
    fn test_gga_low_satellites_keeps_reported_quality() {
        let mut state = FixState::new();
        let outcome = dispatch(
            &mut state,
            &with_checksum("$GPGGA,123519,4807.038,N,01131.000,E,1,03,0.9,545.4,M,46.9,M,,"),
        );

        // Provisional Estimated is overwritten by the quality field, the
        // satellite gate still blocks the fix.
        assert_eq!(state.quality(), FixQuality::Gps);
        assert!(state.position().is_none());
        assert!(!outcome.fresh_fix);
    }

    #[test]
    fn test_gga_empty_position_invalidates() {
        let mut state = FixState::new();
        dispatch(&mut state, GGA);
        let outcome = dispatch(&mut state, &with_checksum("$GPGGA,123520,,,,,1,08,0.9,,,,,,"));

        assert_eq!(state.quality(), FixQuality::Invalid);
        assert!(state.position().is_some());
        assert!(!outcome.fresh_fix);
    }

    #[test]
    fn test_truncated_gga_applies_leading_fields() {
        let mut state = FixState::new();
        let outcome = dispatch(&mut state, "$GPGGA,123519,4807.038,N,01131.000,E,1,08");

        assert_eq!(state.satellites(), 8);
        assert!(state.hdop().is_infinite());
        assert_eq!(state.quality(), FixQuality::Gps);
        assert!(state.position().is_some());
        assert!(outcome.fresh_fix);
    }

    #[test]
    fn test_very_short_gga_does_not_panic() {
        let mut state = FixState::new();
        let outcome = dispatch(&mut state, "$GPGGA,123519,4807.038");
        assert_eq!(outcome.kind, Some(SentenceKind::Gga));
        assert_eq!(state, FixState::new());
    }

    #[test]
    fn test_non_numeric_satellites_do_not_block_hdop() {
        let mut state = FixState::new();
        dispatch(&mut state, "$GPGGA,123519,4807.038,N,01131.000,E,1,xx,1.5");
        assert_eq!(state.satellites(), 0);
        assert_eq!(state.hdop(), 1.5);
    }

    #[test]
    fn test_rmc_parsing() {
        let mut state = FixState::new();
        let outcome = dispatch(&mut state, RMC);

        assert!(outcome.heading_updated);
        assert!((state.velocity() - 22.4 * 0.514).abs() < 1e-9);
        assert_eq!(state.heading(), 84.4);
    }

    #[test]
    fn test_vtg_parsing() {
        let mut state = FixState::new();
        let outcome = dispatch(
            &mut state,
            &with_checksum("$GNVTG,054.7,T,034.4,M,005.5,N,010.2,K"),
        );

        assert_eq!(outcome.kind, Some(SentenceKind::Vtg));
        assert!(outcome.heading_updated);
        assert_eq!(state.heading(), 54.7);
        assert!((state.velocity() - 10.2 / 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_sentence_is_ignored() {
        let mut state = FixState::new();
        let outcome = dispatch(
            &mut state,
            "$GPGSV,3,1,12,01,40,083,46,02,17,308,41,12,07,344,39,14,22,228,45*7F",
        );

        assert_eq!(outcome, DispatchOutcome::default());
        assert_eq!(state, FixState::new());
    }
}
