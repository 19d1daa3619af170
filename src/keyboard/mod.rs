// SPDX-License-Identifier: GPL-3.0-only

//! Keyboard layout collaborator.
//!
//! A [`Keyboard`] owns the keys of the loaded layout and answers geometric
//! queries for the session coordinator. Keys are addressed by [`KeyId`], the
//! index assigned when the layout was loaded.
//!
//! Layouts are read from a JSON list of keys:
//!
//! ```json
//! [
//!     { "code": 50, "label": "Shift", "x": 0, "y": 40, "width": 60, "height": 40, "modifier": 1 },
//!     { "code": 38, "label": "A", "x": 0, "y": 0, "width": 40, "height": 40 }
//! ]
//! ```

pub mod key;

pub use key::{Key, KeyClass, KeyId, KeyState};

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// The keys of a loaded layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keyboard {
    keys: Vec<Key>,
    by_code: HashMap<u32, KeyId>,
}

impl Keyboard {
    /// Builds a keyboard from a list of keys.
    ///
    /// Returns [`LayoutError::DuplicateCode`] if two keys share a code.
    pub fn new(keys: Vec<Key>) -> Result<Self, LayoutError> {
        let mut by_code = HashMap::with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            if let Some(first) = by_code.insert(key.code, KeyId(index)) {
                return Err(LayoutError::DuplicateCode {
                    code: key.code,
                    first: first.0,
                    second: index,
                });
            }
            if !(key.width > 0.0 && key.height > 0.0) {
                tracing::warn!("{} has an empty rectangle and can never be hit", key);
            }
        }
        Ok(Self { keys, by_code })
    }

    /// Parses a keyboard from a JSON key list.
    pub fn from_json_str(json: &str) -> Result<Self, LayoutError> {
        let keys: Vec<Key> = serde_json::from_str(json)?;
        Self::new(keys)
    }

    /// Reads a keyboard from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| LayoutError::Io {
            source,
            path: path.display().to_string(),
        })?;
        let keyboard = Self::from_json_str(&contents)?;
        tracing::info!("Loaded {} keys from {}", keyboard.len(), path.display());
        Ok(keyboard)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the keyboard has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the key with the given id.
    pub fn get(&self, id: KeyId) -> Option<&Key> {
        self.keys.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: KeyId) -> Option<&mut Key> {
        self.keys.get_mut(id.0)
    }

    /// Returns the id of the key with the given hardware code.
    pub fn find_code(&self, code: u32) -> Option<KeyId> {
        self.by_code.get(&code).copied()
    }

    /// Returns the key under the point, or `None`.
    ///
    /// When keys overlap the one declared last wins, as it is drawn on top.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<KeyId> {
        self.keys
            .iter()
            .rposition(|key| key.contains(x, y))
            .map(KeyId)
    }

    /// Iterates over all keys with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (KeyId, &Key)> {
        self.keys.iter().enumerate().map(|(i, key)| (KeyId(i), key))
    }

    pub(crate) fn release_all(&mut self) {
        for key in &mut self.keys {
            key.set_state(KeyState::Released);
        }
    }
}

/// Error type for layout loading.
#[derive(Debug)]
pub enum LayoutError {
    /// The layout file could not be read.
    Io {
        /// The underlying I/O error
        source: std::io::Error,
        /// Path of the file being read
        path: String,
    },
    /// The layout is not a valid JSON key list.
    Json(serde_json::Error),
    /// Two keys share a hardware code.
    DuplicateCode {
        /// The duplicated code
        code: u32,
        /// Index of the first key using it
        first: usize,
        /// Index of the second key using it
        second: usize,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Io { source, path } => {
                write!(f, "failed to read layout '{}': {}", path, source)
            }
            LayoutError::Json(source) => {
                write!(f, "invalid layout at line {}: {}", source.line(), source)
            }
            LayoutError::DuplicateCode { code, first, second } => write!(
                f,
                "key code {} is used by keys {} and {}; codes must be unique",
                code, first, second
            ),
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LayoutError::Io { source, .. } => Some(source),
            LayoutError::Json(source) => Some(source),
            LayoutError::DuplicateCode { .. } => None,
        }
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(source: serde_json::Error) -> Self {
        LayoutError::Json(source)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn two_keys() -> Keyboard {
        Keyboard::new(vec![
            Key::new(38, 0.0, 0.0, 40.0, 40.0).with_label("A"),
            Key::new(50, 40.0, 0.0, 60.0, 40.0).with_modifier(1),
        ])
        .unwrap()
    }

    #[test]
    fn test_hit_test() {
        let keyboard = two_keys();
        assert_eq!(keyboard.hit_test(10.0, 10.0), Some(KeyId(0)));
        assert_eq!(keyboard.hit_test(45.0, 10.0), Some(KeyId(1)));
        assert_eq!(keyboard.hit_test(500.0, 10.0), None, "No key is not an error");
    }

    /// Overlapping keys resolve to the last declared one.
    #[test]
    fn test_hit_test_overlap() {
        let keyboard = Keyboard::new(vec![
            Key::new(1, 0.0, 0.0, 100.0, 100.0),
            Key::new(2, 10.0, 10.0, 20.0, 20.0),
        ])
        .unwrap();
        assert_eq!(keyboard.hit_test(15.0, 15.0), Some(KeyId(1)));
        assert_eq!(keyboard.hit_test(50.0, 50.0), Some(KeyId(0)));
    }

    #[test]
    fn test_find_code() {
        let keyboard = two_keys();
        assert_eq!(keyboard.find_code(50), Some(KeyId(1)));
        assert_eq!(keyboard.find_code(99), None);
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let err = Keyboard::new(vec![
            Key::new(7, 0.0, 0.0, 1.0, 1.0),
            Key::new(7, 1.0, 0.0, 1.0, 1.0),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            LayoutError::DuplicateCode { code: 7, first: 0, second: 1 }
        ));
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            { "code": 50, "label": "Shift", "x": 0, "y": 40, "width": 60, "height": 40, "modifier": 1 },
            { "code": 66, "x": 60, "y": 40, "width": 60, "height": 40, "modifier": 2, "locker": true },
            { "code": 38, "label": "A", "x": 0, "y": 0, "width": 40, "height": 40 }
        ]"#;
        let keyboard = Keyboard::from_json_str(json).unwrap();
        assert_eq!(keyboard.len(), 3);
        assert_eq!(keyboard.get(KeyId(0)).unwrap().class(), KeyClass::Modifier);
        assert_eq!(keyboard.get(KeyId(1)).unwrap().class(), KeyClass::Locker);
        assert_eq!(keyboard.get(KeyId(2)).unwrap().label, "A");
    }

    #[test]
    fn test_from_json_syntax_error() {
        let err = Keyboard::from_json_str("[{ \"code\": }]").unwrap_err();
        assert!(matches!(err, LayoutError::Json(_)));
    }
}
