//! Environmental sensor read-out shown in the header.

/// Temperature and relative humidity from the panel's climate sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

impl ClimateReading {
    /// Build a reading, discarding samples where either value is NaN.
    pub fn new(temperature_c: f32, humidity_pct: f32) -> Option<Self> {
        if temperature_c.is_nan() || humidity_pct.is_nan() {
            return None;
        }
        Some(Self {
            temperature_c,
            humidity_pct,
        })
    }

    pub fn label(&self) -> String {
        format!("{:.1}°C  {:.0}%", self.temperature_c, self.humidity_pct)
    }
}

pub trait ClimateSensor {
    fn sample(&mut self) -> Option<ClimateReading>;
}

/// Used when no sensor is fitted; the header then shows only the title.
#[derive(Debug, Default)]
pub struct NoClimateSensor;

impl ClimateSensor for NoClimateSensor {
    fn sample(&mut self) -> Option<ClimateReading> {
        None
    }
}

/// Replays a fixed list of readings, holding the last one.
#[derive(Debug, Default)]
pub struct ScriptedClimate {
    readings: Vec<ClimateReading>,
    cursor: usize,
}

impl ScriptedClimate {
    pub fn new(readings: Vec<ClimateReading>) -> Self {
        Self {
            readings,
            cursor: 0,
        }
    }
}

impl ClimateSensor for ScriptedClimate {
    fn sample(&mut self) -> Option<ClimateReading> {
        let reading = self
            .readings
            .get(self.cursor)
            .or_else(|| self.readings.last())
            .copied();
        self.cursor = self.cursor.saturating_add(1);
        reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_samples_are_discarded() {
        assert!(ClimateReading::new(f32::NAN, 40.0).is_none());
        assert!(ClimateReading::new(21.0, f32::NAN).is_none());
    }

    #[test]
    fn label_matches_header_format() {
        let reading = ClimateReading::new(21.46, 39.6).unwrap();
        assert_eq!(reading.label(), "21.5°C  40%");
    }

    #[test]
    fn scripted_climate_holds_last_reading() {
        let first = ClimateReading::new(20.0, 50.0).unwrap();
        let second = ClimateReading::new(22.0, 45.0).unwrap();
        let mut sensor = ScriptedClimate::new(vec![first, second]);
        assert_eq!(sensor.sample(), Some(first));
        assert_eq!(sensor.sample(), Some(second));
        assert_eq!(sensor.sample(), Some(second));
        assert_eq!(ScriptedClimate::default().sample(), None);
    }
}
