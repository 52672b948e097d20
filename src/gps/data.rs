// src/gps/data.rs
//! GPS fix state and the published fix record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::nmea;

/// Minimum number of satellites for a position to be considered authoritative.
pub const MIN_SATELLITES_FOR_FIX: u32 = 4;

/// GGA fix quality indicator (field 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FixQuality {
    #[default]
    Invalid,
    Gps,
    Dgps,
    Pps,
    Rtk,
    RtkFloat,
    Estimated,
    ManualInput,
    Simulation,
}

impl FixQuality {
    /// Map the numeric GGA quality code to a variant.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FixQuality::Invalid),
            1 => Some(FixQuality::Gps),
            2 => Some(FixQuality::Dgps),
            3 => Some(FixQuality::Pps),
            4 => Some(FixQuality::Rtk),
            5 => Some(FixQuality::RtkFloat),
            6 => Some(FixQuality::Estimated),
            7 => Some(FixQuality::ManualInput),
            8 => Some(FixQuality::Simulation),
            _ => None,
        }
    }

    /// Whether the accuracy model trusts a solution of this class.
    pub fn is_confident(self) -> bool {
        matches!(
            self,
            FixQuality::Gps
                | FixQuality::Dgps
                | FixQuality::Pps
                | FixQuality::Rtk
                | FixQuality::RtkFloat
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            FixQuality::Invalid => "No fix",
            FixQuality::Gps => "GPS",
            FixQuality::Dgps => "DGPS",
            FixQuality::Pps => "PPS",
            FixQuality::Rtk => "RTK",
            FixQuality::RtkFloat => "Float RTK",
            FixQuality::Estimated => "Estimated",
            FixQuality::ManualInput => "Manual",
            FixQuality::Simulation => "Simulation",
        }
    }
}

/// A WGS-84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Last-known receiver state, mutated field by field as sentences arrive.
#[derive(Debug, Clone, PartialEq)]
pub struct FixState {
    satellites: u32,
    quality: FixQuality,
    hdop: f64,
    position: Option<Position>,
    velocity: f64, // m/s
    heading: f64,  // degrees
}

impl Default for FixState {
    fn default() -> Self {
        Self {
            satellites: 0,
            quality: FixQuality::Invalid,
            hdop: f64::INFINITY,
            position: None,
            velocity: 0.0,
            heading: 0.0,
        }
    }
}

impl FixState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn satellites(&self) -> u32 {
        self.satellites
    }

    pub fn quality(&self) -> FixQuality {
        self.quality
    }

    /// Horizontal dilution of precision; infinite until the receiver reports one.
    pub fn hdop(&self) -> f64 {
        self.hdop
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// True when enough satellites are tracked and the quality is neither
    /// `Invalid` nor `Estimated`.
    pub fn position_valid(&self) -> bool {
        self.satellites >= MIN_SATELLITES_FOR_FIX
            && !matches!(self.quality, FixQuality::Invalid | FixQuality::Estimated)
    }

    pub fn set_satellites(&mut self, satellites: u32) -> bool {
        self.satellites = satellites;
        true
    }

    pub fn set_quality(&mut self, quality: FixQuality) -> bool {
        self.quality = quality;
        true
    }

    /// Rejects non-positive and non-finite values.
    pub fn set_hdop(&mut self, hdop: f64) -> bool {
        if !hdop.is_finite() || hdop <= 0.0 {
            return false;
        }
        self.hdop = hdop;
        true
    }

    /// Velocity in meters per second; rejects negative and non-finite values.
    pub fn set_velocity(&mut self, velocity: f64) -> bool {
        if !velocity.is_finite() || velocity < 0.0 {
            return false;
        }
        self.velocity = velocity;
        true
    }

    /// Heading in degrees, stored as given when it lies in `0..=360`.
    pub fn set_heading(&mut self, heading: f64) -> bool {
        if !(0.0..=360.0).contains(&heading) {
            return false;
        }
        self.heading = heading;
        true
    }

    /// Apply a GGA coordinate quadruple.
    ///
    /// Unparsable coordinates downgrade the quality to `Invalid` and return
    /// `false`, leaving the stored position alone. Parsable coordinates return
    /// `true`; the position is only replaced when at least four satellites are
    /// tracked; otherwise the quality is set to a provisional `Estimated` that
    /// the sentence's own quality field is expected to overwrite.
    pub fn set_position(
        &mut self,
        latitude: &str,
        lat_hemisphere: &str,
        longitude: &str,
        lon_hemisphere: &str,
    ) -> bool {
        let lat = nmea::convert_coordinate(latitude, lat_hemisphere);
        let lon = nmea::convert_coordinate(longitude, lon_hemisphere);

        let (Some(lat), Some(lon)) = (lat, lon) else {
            self.quality = FixQuality::Invalid;
            return false;
        };

        if self.satellites >= MIN_SATELLITES_FOR_FIX {
            self.position = Some(Position::new(lon, lat));
        } else {
            self.quality = FixQuality::Estimated;
        }
        true
    }

    /// Zero the velocity ahead of a stale publish; position and heading are kept.
    pub fn mark_stale(&mut self) {
        self.velocity = 0.0;
    }
}

/// A positioning fix handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub position: Position,
    /// 1-sigma horizontal accuracy radius in meters.
    pub accuracy: f64,
    /// Meters per second.
    pub velocity: f64,
    /// Degrees.
    pub heading: f64,
    /// Set when the position was carried over after the receiver went quiet.
    pub stale: bool,
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    /// Format a coordinate for display
    pub fn format_coordinate(value: f64) -> String {
        format!("{:>12.6}°", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_not_valid() {
        let state = FixState::new();
        assert!(!state.position_valid());
        assert!(state.position().is_none());
        assert!(state.hdop().is_infinite());
    }

    #[test]
    fn test_position_validity_gate() {
        let mut state = FixState::new();
        state.set_quality(FixQuality::Gps);
        state.set_satellites(3);
        assert!(!state.position_valid());

        state.set_satellites(4);
        assert!(state.position_valid());

        state.set_quality(FixQuality::Estimated);
        assert!(!state.position_valid());

        state.set_quality(FixQuality::Simulation);
        assert!(state.position_valid());
    }

    #[test]
    fn test_set_position_requires_four_satellites() {
        let mut state = FixState::new();
        state.set_satellites(3);
        assert!(state.set_position("4807.038", "N", "01131.000", "E"));
        assert!(state.position().is_none());
        assert_eq!(state.quality(), FixQuality::Estimated);

        state.set_satellites(8);
        assert!(state.set_position("4807.038", "N", "01131.000", "E"));
        let position = state.position().unwrap();
        assert!((position.latitude - 48.1173).abs() < 1e-4);
        assert!((position.longitude - 11.5167).abs() < 1e-4);
    }

    #[test]
    fn test_low_satellite_count_keeps_previous_position() {
        let mut state = FixState::new();
        state.set_satellites(6);
        state.set_position("4807.038", "N", "01131.000", "E");
        let before = state.position();

        state.set_satellites(2);
        assert!(state.set_position("5000.000", "S", "00100.000", "W"));
        assert_eq!(state.position(), before);
    }

    #[test]
    fn test_bad_coordinates_invalidate_quality() {
        let mut state = FixState::new();
        state.set_satellites(8);
        state.set_quality(FixQuality::Gps);
        assert!(!state.set_position("", "", "01131.000", "E"));
        assert_eq!(state.quality(), FixQuality::Invalid);
        assert!(state.position().is_none());
    }

    #[test]
    fn test_setters_reject_out_of_range() {
        let mut state = FixState::new();
        assert!(!state.set_hdop(0.0));
        assert!(!state.set_hdop(f64::NAN));
        assert!(state.set_hdop(1.2));
        assert!(!state.set_velocity(-1.0));
        assert!(!state.set_heading(361.0));
        assert!(state.set_heading(360.0));
        assert_eq!(state.hdop(), 1.2);
    }

    #[test]
    fn test_quality_codes() {
        assert_eq!(FixQuality::from_code(2), Some(FixQuality::Dgps));
        assert_eq!(FixQuality::from_code(9), None);
        assert!(FixQuality::RtkFloat.is_confident());
        assert!(!FixQuality::ManualInput.is_confident());
        assert_eq!(FixQuality::RtkFloat.description(), "Float RTK");
    }
}
