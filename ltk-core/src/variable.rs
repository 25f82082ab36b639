//! Display metadata for the measured variables.

/// Column holding the lake level, the primary forecast target.
pub const LAKE_LEVEL: &str = "lakelevel";

/// Label, unit and chart colour for a variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    pub label: String,
    pub unit: String,
    pub color: (u8, u8, u8),
}

const KNOWN_VARIABLES: [(&str, &str, &str, (u8, u8, u8)); 5] = [
    ("temperature", "Temperature", "°C", (255, 0, 0)),
    ("humidity", "Humidity", "%", (128, 0, 128)),
    ("precipitation", "Precipitation", "mm", (0, 128, 0)),
    ("windspeed", "Wind Speed", "km/h", (255, 165, 0)),
    (LAKE_LEVEL, "Lake Level", "m", (0, 0, 255)),
];

impl VariableInfo {
    /// Metadata for `name`; unknown variables get their name as label, no
    /// unit and a neutral colour.
    pub fn describe(name: &str) -> VariableInfo {
        let name = name.trim().to_lowercase();
        match KNOWN_VARIABLES.iter().find(|(n, ..)| *n == name) {
            Some((_, label, unit, color)) => VariableInfo {
                name,
                label: label.to_string(),
                unit: unit.to_string(),
                color: *color,
            },
            None => VariableInfo {
                label: name.clone(),
                name,
                unit: String::new(),
                color: (70, 70, 70),
            },
        }
    }

    /// Axis label, e.g. `Lake Level (m)`.
    pub fn axis_label(&self) -> String {
        if self.unit.is_empty() {
            self.label.clone()
        } else {
            format!("{} ({})", self.label, self.unit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_variable_labels() {
        assert_eq!(VariableInfo::describe("LakeLevel").axis_label(), "Lake Level (m)");
        assert_eq!(
            VariableInfo::describe("temperature").axis_label(),
            "Temperature (°C)"
        );
    }

    #[test]
    fn test_unknown_variable_label() {
        let info = VariableInfo::describe("turbidity");
        assert_eq!(info.axis_label(), "turbidity");
        assert!(info.unit.is_empty());
    }
}
