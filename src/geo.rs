//! Decodificación de posiciones GPS a grados decimales WGS84.
//!
//! Acepta tripletas grados/minutos/segundos con referencia de hemisferio
//! (EXIF) y cadenas ISO 6709 (átomo `©xyz` de QuickTime). Nunca recorta
//! valores fuera de rango: los rechaza.

use crate::error::InvalidCoordinate;
use crate::record::GeoPoint;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DmsTriplet {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
}

impl DmsTriplet {
    pub fn new(degrees: f64, minutes: f64, seconds: f64) -> Self {
        Self {
            degrees,
            minutes,
            seconds,
        }
    }

    pub fn to_decimal(self) -> f64 {
        self.degrees + self.minutes / 60.0 + self.seconds / 3600.0
    }

    fn check_components(self) -> Result<(), InvalidCoordinate> {
        for (label, value) in [
            ("grados", self.degrees),
            ("minutos", self.minutes),
            ("segundos", self.seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidCoordinate::InvalidComponent(format!(
                    "{label} = {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawAltitude {
    pub meters: f64,
    pub below_sea_level: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RawPosition {
    Dms {
        latitude: DmsTriplet,
        latitude_ref: Option<String>,
        longitude: DmsTriplet,
        longitude_ref: Option<String>,
        altitude: Option<RawAltitude>,
    },
    Iso6709(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Latitude,
    Longitude,
}

pub fn decode(raw: &RawPosition) -> Result<GeoPoint, InvalidCoordinate> {
    match raw {
        RawPosition::Dms {
            latitude,
            latitude_ref,
            longitude,
            longitude_ref,
            altitude,
        } => {
            let latitude_deg =
                signed_component(*latitude, latitude_ref.as_deref(), Axis::Latitude)?;
            let longitude_deg =
                signed_component(*longitude, longitude_ref.as_deref(), Axis::Longitude)?;
            check_range(latitude_deg, longitude_deg)?;
            let mut point = GeoPoint::new(latitude_deg, longitude_deg);
            if let Some(altitude) = altitude
                && altitude.meters.is_finite()
            {
                let meters = altitude.meters.abs();
                point.altitude_meters = Some(if altitude.below_sea_level {
                    -meters
                } else {
                    meters
                });
            }
            Ok(point)
        }
        RawPosition::Iso6709(text) => parse_iso6709(text),
    }
}

/// Comprueba que la pareja esté dentro de [-90, 90] y [-180, 180].
pub fn check_range(latitude_deg: f64, longitude_deg: f64) -> Result<(), InvalidCoordinate> {
    if !latitude_deg.is_finite() || !(-90.0..=90.0).contains(&latitude_deg) {
        return Err(InvalidCoordinate::LatitudeOutOfRange(latitude_deg));
    }
    if !longitude_deg.is_finite() || !(-180.0..=180.0).contains(&longitude_deg) {
        return Err(InvalidCoordinate::LongitudeOutOfRange(longitude_deg));
    }
    Ok(())
}

fn signed_component(
    triplet: DmsTriplet,
    reference: Option<&str>,
    axis: Axis,
) -> Result<f64, InvalidCoordinate> {
    triplet.check_components()?;
    let magnitude = triplet.to_decimal();
    let reference = reference
        .map(|value| value.trim_matches(|c: char| c == '\0' || c.is_whitespace()))
        .filter(|value| !value.is_empty());
    let negative = match (reference, axis) {
        // Sin referencia se asume hemisferio positivo.
        (None, _) => false,
        (Some(value), Axis::Latitude) if value.eq_ignore_ascii_case("N") => false,
        (Some(value), Axis::Latitude) if value.eq_ignore_ascii_case("S") => true,
        (Some(value), Axis::Longitude) if value.eq_ignore_ascii_case("E") => false,
        (Some(value), Axis::Longitude) if value.eq_ignore_ascii_case("W") => true,
        (Some(value), _) => return Err(InvalidCoordinate::UnknownReference(value.to_string())),
    };
    Ok(if negative { -magnitude } else { magnitude })
}

/// Interpreta `±DD.D±DDD.D[±AAA.A][CRS...]/` y sus variantes `±DDMM.M`
/// y `±DDMMSS.S`.
pub fn parse_iso6709(text: &str) -> Result<GeoPoint, InvalidCoordinate> {
    let invalid = || InvalidCoordinate::Iso6709(text.to_string());
    let body = text.trim().trim_end_matches('/');
    let body = body.split("CRS").next().unwrap_or(body);
    if !body.starts_with(['+', '-']) {
        return Err(invalid());
    }
    let tokens = signed_tokens(body);
    let (latitude, longitude, altitude) = match tokens.as_slice() {
        [latitude, longitude] => (*latitude, *longitude, None),
        [latitude, longitude, altitude] => (*latitude, *longitude, Some(*altitude)),
        _ => return Err(invalid()),
    };
    let latitude_deg = iso_angle(latitude, 2).ok_or_else(invalid)?;
    let longitude_deg = iso_angle(longitude, 3).ok_or_else(invalid)?;
    check_range(latitude_deg, longitude_deg)?;
    let mut point = GeoPoint::new(latitude_deg, longitude_deg);
    if let Some(altitude) = altitude {
        let meters: f64 = altitude.parse().map_err(|_| invalid())?;
        if meters.is_finite() {
            point.altitude_meters = Some(meters);
        }
    }
    Ok(point)
}

fn signed_tokens(body: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (index, ch) in body.char_indices() {
        if ch == '+' || ch == '-' {
            if let Some(begin) = start {
                tokens.push(&body[begin..index]);
            }
            start = Some(index);
        }
    }
    if let Some(begin) = start {
        tokens.push(&body[begin..]);
    }
    tokens
}

fn iso_angle(token: &str, degree_digits: usize) -> Option<f64> {
    let sign = if token.starts_with('-') { -1.0 } else { 1.0 };
    let body = token.get(1..)?;
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    let integer_len = body.find('.').unwrap_or(body.len());
    let (integer, fraction) = body.split_at(integer_len);
    let number = |digits: &str| digits.parse::<f64>().ok();
    let magnitude = if integer_len == degree_digits {
        number(body)?
    } else if integer_len == degree_digits + 2 {
        let degrees = number(&integer[..degree_digits])?;
        let minutes = number(&format!("{}{}", &integer[degree_digits..], fraction))?;
        DmsTriplet::new(degrees, minutes, 0.0).to_decimal()
    } else if integer_len == degree_digits + 4 {
        let degrees = number(&integer[..degree_digits])?;
        let minutes = number(&integer[degree_digits..degree_digits + 2])?;
        let seconds = number(&format!("{}{}", &integer[degree_digits + 2..], fraction))?;
        DmsTriplet::new(degrees, minutes, seconds).to_decimal()
    } else {
        return None;
    };
    Some(sign * magnitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dms(
        latitude: DmsTriplet,
        latitude_ref: Option<&str>,
        longitude: DmsTriplet,
        longitude_ref: Option<&str>,
    ) -> RawPosition {
        RawPosition::Dms {
            latitude,
            latitude_ref: latitude_ref.map(str::to_string),
            longitude,
            longitude_ref: longitude_ref.map(str::to_string),
            altitude: None,
        }
    }

    #[test]
    fn southern_and_western_references_negate() {
        let point = decode(&dms(
            DmsTriplet::new(40.0, 44.0, 55.77),
            Some("N"),
            DmsTriplet::new(73.0, 59.0, 1.15),
            Some("W"),
        ))
        .unwrap();
        assert!((point.latitude_deg - 40.748825).abs() < 1e-5);
        assert!((point.longitude_deg + 73.983653).abs() < 1e-5);

        let south = decode(&dms(
            DmsTriplet::new(33.0, 52.0, 0.0),
            Some("S"),
            DmsTriplet::new(151.0, 12.0, 0.0),
            Some("E"),
        ))
        .unwrap();
        assert!(south.latitude_deg < 0.0);
        assert!(south.longitude_deg > 0.0);
    }

    #[test]
    fn missing_reference_is_positive() {
        let point = decode(&dms(
            DmsTriplet::new(10.0, 30.0, 0.0),
            None,
            DmsTriplet::new(20.0, 0.0, 0.0),
            None,
        ))
        .unwrap();
        assert_eq!(point.latitude_deg, 10.5);
        assert_eq!(point.longitude_deg, 20.0);
    }

    #[test]
    fn unknown_reference_is_rejected() {
        let error = decode(&dms(
            DmsTriplet::new(10.0, 0.0, 0.0),
            Some("E"),
            DmsTriplet::new(20.0, 0.0, 0.0),
            Some("E"),
        ))
        .unwrap_err();
        assert_eq!(error, InvalidCoordinate::UnknownReference("E".into()));
    }

    #[test]
    fn out_of_range_latitude_is_rejected_not_clamped() {
        let error = decode(&dms(
            DmsTriplet::new(95.0, 0.0, 0.0),
            Some("N"),
            DmsTriplet::new(20.0, 0.0, 0.0),
            Some("E"),
        ))
        .unwrap_err();
        assert!(matches!(error, InvalidCoordinate::LatitudeOutOfRange(_)));
    }

    #[test]
    fn zero_denominator_component_is_rejected() {
        let error = decode(&dms(
            DmsTriplet::new(f64::NAN, 0.0, 0.0),
            Some("N"),
            DmsTriplet::new(20.0, 0.0, 0.0),
            Some("E"),
        ))
        .unwrap_err();
        assert!(matches!(error, InvalidCoordinate::InvalidComponent(_)));
    }

    #[test]
    fn altitude_below_sea_level_is_negative() {
        let point = decode(&RawPosition::Dms {
            latitude: DmsTriplet::new(31.0, 30.0, 0.0),
            latitude_ref: Some("N".into()),
            longitude: DmsTriplet::new(35.0, 30.0, 0.0),
            longitude_ref: Some("E".into()),
            altitude: Some(RawAltitude {
                meters: 430.0,
                below_sea_level: true,
            }),
        })
        .unwrap();
        assert_eq!(point.altitude_meters, Some(-430.0));
    }

    #[test]
    fn iso6709_decimal_form() {
        let point = parse_iso6709("+40.7488-073.9857+010.000/").unwrap();
        assert!((point.latitude_deg - 40.7488).abs() < 1e-9);
        assert!((point.longitude_deg + 73.9857).abs() < 1e-9);
        assert_eq!(point.altitude_meters, Some(10.0));
    }

    #[test]
    fn iso6709_minutes_form() {
        let point = parse_iso6709("+4044.9295-07359.0191/").unwrap();
        assert!((point.latitude_deg - 40.748825).abs() < 1e-5);
        assert!((point.longitude_deg + 73.983652).abs() < 1e-5);
        assert_eq!(point.altitude_meters, None);
    }

    #[test]
    fn iso6709_garbage_is_rejected() {
        assert!(parse_iso6709("40.7,-73.9").is_err());
        assert!(parse_iso6709("+40.7/").is_err());
        assert!(parse_iso6709("+95.0+010.0/").is_err());
    }

    proptest! {
        #[test]
        fn decoded_points_stay_in_range(
            lat_deg in 0.0f64..200.0,
            lat_min in 0.0f64..60.0,
            lon_deg in 0.0f64..400.0,
            lon_min in 0.0f64..60.0,
            south in any::<bool>(),
            west in any::<bool>(),
        ) {
            let raw = dms(
                DmsTriplet::new(lat_deg, lat_min, 0.0),
                Some(if south { "S" } else { "N" }),
                DmsTriplet::new(lon_deg, lon_min, 0.0),
                Some(if west { "W" } else { "E" }),
            );
            if let Ok(point) = decode(&raw) {
                prop_assert!((-90.0..=90.0).contains(&point.latitude_deg));
                prop_assert!((-180.0..=180.0).contains(&point.longitude_deg));
                prop_assert_eq!(point.latitude_deg < 0.0, south && point.latitude_deg != 0.0);
            }
        }
    }
}
