// src/gps/accuracy.rs
//! Accuracy radius estimation from fix quality and HDOP

use super::data::FixQuality;

/// Radius reported when the fix class gives no usable accuracy bound.
pub const UNKNOWN_ACCURACY_M: f64 = 10_000.0;

const GPS_UERE_M: f64 = 5.102;
const DGPS_UERE_M: f64 = 3.878;
const RTK_UERE_M: f64 = 0.1;

/// 1-sigma horizontal accuracy in meters.
///
/// An unknown HDOP yields [`UNKNOWN_ACCURACY_M`], never an infinite radius.
pub fn estimate(quality: FixQuality, hdop: f64) -> f64 {
    let uere = match quality {
        FixQuality::Gps => GPS_UERE_M,
        FixQuality::Dgps => DGPS_UERE_M,
        FixQuality::Pps | FixQuality::Rtk | FixQuality::RtkFloat => RTK_UERE_M,
        _ => return UNKNOWN_ACCURACY_M,
    };

    let radius = uere * hdop;
    if radius.is_finite() {
        radius
    } else {
        UNKNOWN_ACCURACY_M
    }
}
