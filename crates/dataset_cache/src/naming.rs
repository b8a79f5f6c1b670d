//! Fixed-width key naming for archive entries.

/// Maps example indices to fixed-width archive entry keys.
///
/// Keys look like `example_0042.bin`. The digit width is computed once from
/// the dataset length, so every key in one archive has the same width and
/// lexicographic order matches numeric order. The mapping is deterministic
/// and injective over `[0, len)`; reads look entries up by re-encoding the
/// index, so no decode direction is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    width: usize,
}

impl KeyTemplate {
    /// Creates a template sized for a dataset of `len` examples.
    ///
    /// The width is the decimal digit count of the largest index, `len - 1`.
    /// An empty dataset gets width 1 rather than panicking; no keys are ever
    /// generated for it.
    pub fn new(len: usize) -> Self {
        let width = match len.checked_sub(1) {
            Some(max_index) => max_index.checked_ilog10().map_or(1, |d| d as usize + 1),
            None => 1,
        };
        Self { width }
    }

    /// Returns the archive key for `index`.
    pub fn key(&self, index: usize) -> String {
        format!("example_{index:0width$}.bin", width = self.width)
    }

    /// Digit width used for all keys from this template.
    pub fn width(&self) -> usize {
        self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn width_matches_largest_index() {
        assert_eq!(KeyTemplate::new(0).width(), 1);
        assert_eq!(KeyTemplate::new(1).width(), 1);
        assert_eq!(KeyTemplate::new(10).width(), 1); // largest index is 9
        assert_eq!(KeyTemplate::new(11).width(), 2);
        assert_eq!(KeyTemplate::new(100).width(), 2);
        assert_eq!(KeyTemplate::new(101).width(), 3);
    }

    #[test]
    fn keys_are_fixed_width_and_injective() {
        let template = KeyTemplate::new(250);
        let keys: Vec<String> = (0..250).map(|i| template.key(i)).collect();

        let first_len = keys[0].len();
        assert!(keys.iter().all(|k| k.len() == first_len));

        let unique: HashSet<&String> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn lexicographic_order_matches_numeric_order() {
        let template = KeyTemplate::new(1000);
        let mut keys: Vec<String> = (0..1000).map(|i| template.key(i)).collect();
        let sorted = {
            let mut s = keys.clone();
            s.sort();
            s
        };
        assert_eq!(keys, sorted);
        keys.dedup();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn key_format() {
        let template = KeyTemplate::new(100);
        assert_eq!(template.key(0), "example_00.bin");
        assert_eq!(template.key(42), "example_42.bin");
        assert_eq!(template.key(99), "example_99.bin");
    }
}
