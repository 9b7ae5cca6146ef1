use std::fmt;

use serde::{Deserialize, Serialize};

/// A CSS-style color like `#4F46E5`. Whatever the catalog says is kept verbatim; an empty string
/// means no color.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HexColor(String);

impl HexColor {
    pub fn new<S: Into<String>>(color: S) -> Self {
        Self(color.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses `#rgb` or `#rrggbb`.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.0.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let expanded = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => hex.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
        Some((channel(0)?, channel(2)?, channel(4)?))
    }

    /// `rgba(r, g, b, alpha)` for hex colors. Anything that isn't a hex color is passed through
    /// unchanged.
    pub fn with_opacity(&self, alpha: f64) -> String {
        match self.rgb() {
            Some((r, g, b)) => format!("rgba({r}, {g}, {b}, {alpha})"),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::HexColor;

    #[test]
    fn with_opacity() {
        assert_eq!(
            HexColor::new("#4F46E5").with_opacity(0.5),
            "rgba(79, 70, 229, 0.5)"
        );
        assert_eq!(
            HexColor::new("#fa0").with_opacity(0.55),
            "rgba(255, 170, 0, 0.55)"
        );
        assert_eq!(HexColor::new("tomato").with_opacity(0.5), "tomato");
        assert_eq!(HexColor::new("#12345").with_opacity(0.5), "#12345");
        assert_eq!(HexColor::new("#zzzzzz").with_opacity(0.5), "#zzzzzz");
        assert!(HexColor::default().is_empty());
    }
}
