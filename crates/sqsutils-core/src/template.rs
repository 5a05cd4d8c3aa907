use crate::error::{Error, Result};
use std::str::FromStr;

/// A record template with exactly one `%s` placeholder. `%%` is a literal `%`.
///
/// Parsed once up front so formatting a line is two string copies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatTemplate {
    prefix: String,
    suffix: String,
}

impl FormatTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::Template {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut seen_placeholder = false;
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            let out = if seen_placeholder { &mut suffix } else { &mut prefix };
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => out.push('%'),
                Some('s') if !seen_placeholder => seen_placeholder = true,
                Some('s') => return Err(invalid("more than one %s placeholder")),
                Some(other) => return Err(invalid(&format!("unsupported verb %{other}"))),
                None => return Err(invalid("trailing %")),
            }
        }

        if !seen_placeholder {
            return Err(invalid("missing %s placeholder"));
        }

        Ok(Self { prefix, suffix })
    }

    pub fn render(&self, line: &str) -> String {
        let mut record = String::with_capacity(self.prefix.len() + line.len() + self.suffix.len());
        record.push_str(&self.prefix);
        record.push_str(line);
        record.push_str(&self.suffix);
        record
    }
}

impl FromStr for FormatTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_passes_lines_through() {
        assert_eq!(FormatTemplate::default().render("a b c"), "a b c");
        assert_eq!(FormatTemplate::parse("%s").unwrap(), FormatTemplate::default());
    }

    #[test]
    fn wraps_line() {
        let template = FormatTemplate::parse(r#"{"id": "%s", "pct": "100%%"}"#).unwrap();
        assert_eq!(template.render("42"), r#"{"id": "42", "pct": "100%"}"#);
    }

    #[test]
    fn line_content_is_not_interpreted() {
        let template = FormatTemplate::parse("<%s>").unwrap();
        assert_eq!(template.render("%s %d %%"), "<%s %d %%>");
    }

    #[test]
    fn rejects_bad_templates() {
        for bad in ["", "no placeholder", "%s and %s", "%d", "%s%"] {
            assert!(
                matches!(FormatTemplate::parse(bad), Err(Error::Template { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
