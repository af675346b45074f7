//! Volume conversions between rainfall depth and standing-water gallons.
//!
//! All conversions are exact arithmetic on the configured basin area; no
//! rounding is applied here.

/// US liquid gallons in one cubic foot of water.
pub const GALLONS_PER_CUBIC_FOOT: f64 = 7.48052;

pub const SQUARE_INCHES_PER_SQUARE_FOOT: f64 = 144.0;

pub const CUBIC_INCHES_PER_GALLON: f64 = 231.0;

/// Gallons held by one sixteenth of an inch of water across `area_square_feet`.
///
/// This is the drain-activation threshold: shallower sheets than this are
/// left to evaporate.
pub fn sixteenth_inch_gallons(area_square_feet: f64) -> f64 {
    area_square_feet * (0.0625 / 12.0) * GALLONS_PER_CUBIC_FOOT
}

/// Gallons added to a basin of `area_square_feet` by `rainfall_inches` of
/// accumulated rain.
pub fn rainfall_gallons(area_square_feet: f64, rainfall_inches: f64) -> f64 {
    area_square_feet * SQUARE_INCHES_PER_SQUARE_FOOT * rainfall_inches / CUBIC_INCHES_PER_GALLON
}
