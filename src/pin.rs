use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::Position;

/// Kind of resource a pin stands for. Each kind has exactly one color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Primary emergency ambulance (RTW).
    EmsPrimary,
    /// Patient transport ambulance (KTW).
    EmsTransport,
    FootPatrol,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Self; 4] = [
        Self::EmsPrimary,
        Self::EmsTransport,
        Self::FootPatrol,
        Self::Other,
    ];

    /// Identifier used in export files.
    pub fn key(self) -> &'static str {
        match self {
            Self::EmsPrimary => "ems-primary",
            Self::EmsTransport => "ems-transport",
            Self::FootPatrol => "foot-patrol",
            Self::Other => "other",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::EmsPrimary => "EMS primary (RTW)",
            Self::EmsTransport => "EMS transport (KTW)",
            Self::FootPatrol => "Foot patrol",
            Self::Other => "Other",
        }
    }

    /// Canonical fill color as `#rrggbb`.
    pub fn color(self) -> &'static str {
        match self {
            Self::EmsPrimary => "#ff0000",
            Self::EmsTransport => "#ff8c00",
            Self::FootPatrol => "#0066ff",
            Self::Other => "#000000",
        }
    }

    pub fn rgb(self) -> [u8; 3] {
        match self {
            Self::EmsPrimary => [0xff, 0x00, 0x00],
            Self::EmsTransport => [0xff, 0x8c, 0x00],
            Self::FootPatrol => [0x00, 0x66, 0xff],
            Self::Other => [0x00, 0x00, 0x00],
        }
    }

    fn color_aliases(self) -> &'static [&'static str] {
        match self {
            Self::EmsPrimary => &["#ff0000", "red"],
            Self::EmsTransport => &["#ff8c00", "orange"],
            Self::FootPatrol => &["#0066ff", "blue"],
            Self::Other => &["#000000", "black"],
        }
    }

    /// Reverse color lookup.
    ///
    /// Surfaces append shade or alpha suffixes to fill strings, so a category
    /// matches when the color starts with or contains one of its aliases,
    /// ignoring case. Anything unrecognised is [`Category::Other`].
    pub fn from_color(color: &str) -> Self {
        let color = color.trim().to_ascii_lowercase();
        if color.is_empty() {
            return Self::Other;
        }
        Self::ALL
            .into_iter()
            .find(|category| {
                category
                    .color_aliases()
                    .iter()
                    .any(|alias| color.starts_with(alias) || color.contains(alias))
            })
            .unwrap_or(Self::Other)
    }

    /// Parses an export key or display name, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|c| {
            c.key().eq_ignore_ascii_case(value) || c.display_name().eq_ignore_ascii_case(value)
        })
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One placed marker.
#[derive(Clone, Debug, PartialEq)]
pub struct Pin {
    pub id: u32,
    pub position: Position,
    pub category: Category,
    /// User-entered name; may be empty.
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl Pin {
    /// Derived from the category; pins carry no color of their own.
    pub fn color(&self) -> &'static str {
        self.category.color()
    }

    /// The label, or the category name while the label is blank.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            self.category.display_name()
        } else {
            &self.label
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_round_trips_through_its_color() {
        for category in Category::ALL {
            assert_eq!(Category::from_color(category.color()), category);
        }
    }

    #[test]
    fn test_from_color_tolerates_case_and_suffixes() {
        assert_eq!(Category::from_color("#FF0000"), Category::EmsPrimary);
        assert_eq!(Category::from_color("#ff8c00cc"), Category::EmsTransport);
        assert_eq!(Category::from_color(" #0066FF "), Category::FootPatrol);
        assert_eq!(Category::from_color("Red"), Category::EmsPrimary);
        assert_eq!(Category::from_color("blue"), Category::FootPatrol);
    }

    #[test]
    fn test_from_color_falls_back_to_other() {
        assert_eq!(Category::from_color("#123456"), Category::Other);
        assert_eq!(Category::from_color(""), Category::Other);
        assert_eq!(Category::from_color("rgba(0, 255, 0, 0.3)"), Category::Other);
    }

    #[test]
    fn test_parse_accepts_keys_and_names() {
        assert_eq!(Category::parse("foot-patrol"), Some(Category::FootPatrol));
        assert_eq!(Category::parse("EMS-PRIMARY"), Some(Category::EmsPrimary));
        assert_eq!(Category::parse("Other"), Some(Category::Other));
        assert_eq!(Category::parse("helicopter"), None);
    }

    #[test]
    fn test_display_label_defaults_to_category() {
        let mut pin = Pin {
            id: 1,
            position: Position::new(1.0, 2.0),
            category: Category::EmsTransport,
            label: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(pin.display_label(), "EMS transport (KTW)");
        pin.label = "KTW 2".to_owned();
        assert_eq!(pin.display_label(), "KTW 2");
        assert_eq!(pin.color(), "#ff8c00");
    }
}
