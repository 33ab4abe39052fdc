use serde::{Deserialize, Serialize};

/// Honours band awarded for a cumulative grade-point average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HonoursClass {
    FirstClass,
    SecondClassUpper,
    SecondClassLower,
    ThirdClass,
    Pass,
}

impl HonoursClass {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::FirstClass,
            Self::SecondClassUpper,
            Self::SecondClassLower,
            Self::ThirdClass,
            Self::Pass,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstClass => "First Class Honours",
            Self::SecondClassUpper => "Second Class Honours (Upper Division)",
            Self::SecondClassLower => "Second Class Honours (Lower Division)",
            Self::ThirdClass => "Third Class Honours",
            Self::Pass => "Pass",
        }
    }

    /// Lowest CGPA that still earns this band.
    pub const fn floor(self) -> f64 {
        match self {
            Self::FirstClass => 3.7,
            Self::SecondClassUpper => 3.3,
            Self::SecondClassLower => 2.7,
            Self::ThirdClass => 2.0,
            Self::Pass => 0.0,
        }
    }
}

/// Classify a CGPA in `[0.0, 4.0]`; the first band whose floor is reached wins.
pub fn classify_cgpa(cgpa: f64) -> HonoursClass {
    HonoursClass::ordered()
        .into_iter()
        .find(|class| cgpa >= class.floor())
        .unwrap_or(HonoursClass::Pass)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_cgpas_classify_into_expected_bands() {
        let cases = [
            (1.9, HonoursClass::Pass),
            (2.0, HonoursClass::ThirdClass),
            (2.6, HonoursClass::ThirdClass),
            (2.7, HonoursClass::SecondClassLower),
            (3.2, HonoursClass::SecondClassLower),
            (3.3, HonoursClass::SecondClassUpper),
            (3.6, HonoursClass::SecondClassUpper),
            (3.7, HonoursClass::FirstClass),
            (4.0, HonoursClass::FirstClass),
        ];

        for (cgpa, expected) in cases {
            assert_eq!(classify_cgpa(cgpa), expected, "cgpa {cgpa}");
        }
    }

    #[test]
    fn labels_match_published_wording() {
        assert_eq!(classify_cgpa(3.9).label(), "First Class Honours");
        assert_eq!(
            classify_cgpa(3.4).label(),
            "Second Class Honours (Upper Division)"
        );
        assert_eq!(
            classify_cgpa(2.8).label(),
            "Second Class Honours (Lower Division)"
        );
        assert_eq!(classify_cgpa(2.1).label(), "Third Class Honours");
        assert_eq!(classify_cgpa(0.0).label(), "Pass");
    }
}
