//! Header and footer templates.
//!
//! Templates are plain text with `{key}` placeholders filled from
//! [`Settings::to_map`](tiltslice_slicer::Settings::to_map). Placeholders
//! with no value are left as written.

use std::collections::BTreeMap;

use tracing::warn;

/// Header used when none is given: home, heat up, reset extrusion.
pub const DEFAULT_HEADER: &str = "\
; generated by tiltslice on {date_time}
; layer height {layer_height}, walls {wall_thickness}, fill {fill_density}%
; layers {layer_count}
G21 ; Millimeters
G90 ; Absolute positioning
M82 ; Absolute extrusion
G28 ; Home all axes
M104 S{extruder_temperature} ; Set nozzle temp
M140 S{bed_temperature} ; Set bed temp
M109 S{extruder_temperature} ; Wait for nozzle temp
M190 S{bed_temperature} ; Wait for bed temp
G92 E0 ; Reset extruder
G1 Z5 F3000 ; Move Z up
";

/// Footer used when none is given: heaters off, park, motors off.
pub const DEFAULT_FOOTER: &str = "\
M107 ; Fan off
M104 S0 ; Turn off nozzle
M140 S0 ; Turn off bed
G91 ; Relative positioning
G1 Z10 F3000 ; Move Z up
G90 ; Absolute positioning
G28 X0 Y0 ; Present print
M84 ; Disable motors
";

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Text(String),
    Key(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    parts: Vec<Part>,
}

impl Template {
    /// Split `text` into literal text and `{key}` placeholders.
    ///
    /// Keys are ASCII letters, digits and underscores; braces around
    /// anything else are literal.
    pub fn parse(text: &str) -> Self {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) if is_key(&after[..close]) => {
                    if !literal.is_empty() {
                        parts.push(Part::Text(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Key(after[..close].to_string()));
                    rest = &after[close + 1..];
                }
                _ => {
                    literal.push('{');
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(Part::Text(literal));
        }
        Self { parts }
    }

    /// The built-in header.
    pub fn default_header() -> Self {
        Self::parse(DEFAULT_HEADER)
    }

    /// The built-in footer.
    pub fn default_footer() -> Self {
        Self::parse(DEFAULT_FOOTER)
    }

    /// Placeholder names in order of appearance.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            Part::Key(k) => Some(k.as_str()),
            Part::Text(_) => None,
        })
    }

    /// Substitute placeholders from `values`.
    pub fn render(&self, values: &BTreeMap<String, String>) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Key(key) => match values.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        warn!(key = %key, "Unknown template placeholder");
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                },
            }
        }
        out
    }
}

fn is_key(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
