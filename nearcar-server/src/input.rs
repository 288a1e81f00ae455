use nearcar_core::Coordinate;
use serde::Deserialize;

/// Raw query string of `GET /nearest-car`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct NearestCarQuery {
    pub(crate) lat: Option<String>,
    pub(crate) lng: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InputError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl NearestCarQuery {
    /// Both components parsed as finite decimal degrees.
    pub(crate) fn target(&self) -> Result<Coordinate, InputError> {
        Ok(Coordinate::new(
            parse_degrees("lat", self.lat.as_deref())?,
            parse_degrees("lng", self.lng.as_deref())?,
        ))
    }
}

fn parse_degrees(name: &'static str, raw: Option<&str>) -> Result<f64, InputError> {
    let raw = raw.map(str::trim).filter(|value| !value.is_empty());
    let value: f64 = raw
        .ok_or(InputError::Missing(name))?
        .parse()
        .map_err(|_err| InputError::Invalid(name))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InputError::Invalid(name))
    }
}
