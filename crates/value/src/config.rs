//! Compile-time-tunable, implementation-defined behaviors, collected into
//! one struct rather than scattered constants so a driver can override
//! them per-compilation.

/// The whitelist `encvalue_unichar`/`decvalue_unichar` validate their
/// encoding-name argument against. Whether a match is exact or
/// case-insensitive is configurable, exact match by default.
#[derive(Debug, Clone)]
pub struct FoldConfig {
    pub unichar_encodings: Vec<String>,
    pub case_insensitive_encoding_names: bool,
}

impl Default for FoldConfig {
    fn default() -> Self {
        FoldConfig {
            unichar_encodings: vec![
                "UTF-8".into(),
                "UTF-16BE".into(),
                "UTF-16LE".into(),
                "UTF-32BE".into(),
                "UTF-32LE".into(),
            ],
            case_insensitive_encoding_names: false,
        }
    }
}

impl FoldConfig {
    pub fn accepts_encoding(&self, name: &str) -> bool {
        if self.case_insensitive_encoding_names {
            self.unichar_encodings.iter().any(|e| e.eq_ignore_ascii_case(name))
        } else {
            self.unichar_encodings.iter().any(|e| e == name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_the_default() {
        let cfg = FoldConfig::default();
        assert!(cfg.accepts_encoding("UTF-8"));
        assert!(!cfg.accepts_encoding("utf-8"));
    }
}
