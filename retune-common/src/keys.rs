//! Chromatic key table and semitone distance
//!
//! Keys are compared by root pitch class only. The root is the leading token of
//! the key string ("C#" from "C# Minor"); mode qualifiers are ignored.

/// Pitch classes with enharmonic aliases, C = 0 through B = 11
const PITCH_CLASSES: [(&str, i32); 17] = [
    ("C", 0),
    ("C#", 1),
    ("Db", 1),
    ("D", 2),
    ("D#", 3),
    ("Eb", 3),
    ("E", 4),
    ("F", 5),
    ("F#", 6),
    ("Gb", 6),
    ("G", 7),
    ("G#", 8),
    ("Ab", 8),
    ("A", 9),
    ("A#", 10),
    ("Bb", 10),
    ("B", 11),
];

/// Signed semitone distance between two keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDistance {
    /// Both roots recognized; `to - from`, in -11..=11
    Semitones(i32),
    /// At least one root missing from the chromatic table
    Unrecognized,
}

impl KeyDistance {
    /// Shift to apply; 0 when unrecognized
    pub fn semitones(self) -> i32 {
        match self {
            KeyDistance::Semitones(n) => n,
            KeyDistance::Unrecognized => 0,
        }
    }

    pub fn is_recognized(self) -> bool {
        matches!(self, KeyDistance::Semitones(_))
    }
}

/// Root token of a key string ("C#" from "C# Minor")
pub fn key_root(key: &str) -> &str {
    key.split(' ').next().unwrap_or("")
}

/// Pitch class (0-11) of the key's root, if the root is in the table
pub fn pitch_class(key: &str) -> Option<i32> {
    let root = key_root(key);
    PITCH_CLASSES
        .iter()
        .find(|(name, _)| *name == root)
        .map(|(_, value)| *value)
}

/// Semitones from `from_key` to `to_key`
///
/// Not normalized to the shortest rotation: "B" → "C" is -11, not +1.
pub fn semitone_distance(from_key: &str, to_key: &str) -> KeyDistance {
    match (pitch_class(from_key), pitch_class(to_key)) {
        (Some(from), Some(to)) => KeyDistance::Semitones(to - from),
        _ => KeyDistance::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_major_to_d_major_is_two() {
        assert_eq!(semitone_distance("C Major", "D Major"), KeyDistance::Semitones(2));
    }

    #[test]
    fn test_mode_is_ignored() {
        assert_eq!(semitone_distance("A Minor", "C Major"), KeyDistance::Semitones(-9));
        assert_eq!(semitone_distance("C# Minor", "Db Major"), KeyDistance::Semitones(0));
    }

    #[test]
    fn test_distance_is_antisymmetric_with_zero_diagonal() {
        for (a, _) in PITCH_CLASSES.iter() {
            assert_eq!(semitone_distance(a, a).semitones(), 0);
            for (b, _) in PITCH_CLASSES.iter() {
                let forward = semitone_distance(a, b);
                let backward = semitone_distance(b, a);
                assert!(forward.is_recognized());
                assert_eq!(forward.semitones(), -backward.semitones(), "{} -> {}", a, b);
                assert!((-11..=11).contains(&forward.semitones()));
            }
        }
    }

    #[test]
    fn test_unrecognized_root_is_flagged() {
        let d = semitone_distance("H Major", "C Major");
        assert_eq!(d, KeyDistance::Unrecognized);
        assert_eq!(d.semitones(), 0);
        assert!(!semitone_distance("C Major", "").is_recognized());
        // Lowercase roots are not in the table
        assert!(!semitone_distance("c", "D").is_recognized());
    }

    #[test]
    fn test_no_rotation_normalization() {
        assert_eq!(semitone_distance("B", "C").semitones(), -11);
        assert_eq!(semitone_distance("C", "B").semitones(), 11);
    }
}
