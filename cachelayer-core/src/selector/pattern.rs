use bson::Bson;
use regex::{Regex, RegexBuilder};

use crate::error::{CompileError, CompileResult};

/// A compiled regular expression used by `$regex` and regex literals in selectors.
///
/// Only string-like values (strings and symbols) can match a pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Compiles `source` with inline flags. `i`, `m`, `s` and `x` are honoured; any other
    /// flag (such as `g`) is accepted and ignored.
    pub fn new(source: &str, flags: &str) -> CompileResult<Self> {
        let mut builder = RegexBuilder::new(source);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                _ => &mut builder,
            };
        }

        let regex = builder.build().map_err(|err| CompileError::InvalidRegex {
            pattern: source.to_owned(),
            reason: err.to_string(),
        })?;
        log::trace!("compiled pattern /{source}/{flags}");

        Ok(Self { regex })
    }

    /// Compiles a `$regex` operand with explicit `$options`, which may only contain `i`, `m` and `g`.
    pub fn with_options(source: &str, options: &str) -> CompileResult<Self> {
        if options.chars().any(|flag| !matches!(flag, 'g' | 'i' | 'm')) {
            return Err(CompileError::UnsupportedRegexOptions(options.to_owned()));
        }
        Self::new(source, options)
    }

    pub fn from_bson(regex: &bson::Regex) -> CompileResult<Self> {
        Self::new(regex.pattern.as_str(), regex.options.as_str())
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, value: Option<&Bson>) -> bool {
        match value {
            Some(Bson::String(text)) | Some(Bson::Symbol(text)) => self.regex.is_match(text),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_flags() {
        let pattern = Pattern::new("^abc", "i").unwrap();
        assert!(pattern.is_match(Some(&Bson::String("ABCdef".into()))));
        assert!(!pattern.is_match(Some(&Bson::Int32(1))));
        assert!(!pattern.is_match(None));
    }

    #[test]
    fn explicit_options_are_restricted() {
        assert!(Pattern::with_options("a", "gim").is_ok());
        assert_eq!(
            Pattern::with_options("a", "s").unwrap_err(),
            CompileError::UnsupportedRegexOptions("s".into())
        );
    }

    #[test]
    fn invalid_syntax_is_a_compile_error() {
        assert!(matches!(
            Pattern::new("(", ""),
            Err(CompileError::InvalidRegex { .. })
        ));
    }
}
