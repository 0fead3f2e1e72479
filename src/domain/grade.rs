use serde::{Deserialize, Serialize};

/// Letter grade on the ten-point scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Grade {
    pub const ALL: [Grade; 7] = [
        Grade::S,
        Grade::A,
        Grade::B,
        Grade::C,
        Grade::D,
        Grade::E,
        Grade::F,
    ];

    /// Point value used in GPA arithmetic.
    pub fn points(&self) -> u32 {
        match self {
            Grade::S => 10,
            Grade::A => 9,
            Grade::B => 8,
            Grade::C => 7,
            Grade::D => 6,
            Grade::E => 5,
            Grade::F => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "S" => Some(Grade::S),
            "A" => Some(Grade::A),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            "E" => Some(Grade::E),
            "F" => Some(Grade::F),
            _ => None,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::from_str(s).ok_or_else(|| format!("unknown grade: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_table() {
        let points: Vec<u32> = Grade::ALL.iter().map(Grade::points).collect();
        assert_eq!(points, vec![10, 9, 8, 7, 6, 5, 0]);
    }

    #[test]
    fn test_points_descend_with_letters() {
        for pair in Grade::ALL.windows(2) {
            assert!(pair[0].points() > pair[1].points());
        }
    }

    #[test]
    fn test_parse_lowercase() {
        assert_eq!(Grade::from_str("a"), Some(Grade::A));
        assert_eq!(Grade::from_str(" f "), Some(Grade::F));
        assert_eq!(Grade::from_str("A+"), None);
        assert_eq!("s".parse::<Grade>(), Ok(Grade::S));
    }
}
