use regex::Regex;
use tracing::warn;

use crate::constants::NAME_TAG;

/// Extracts the tag of `name` according to `template`.
///
/// Returns:
/// - `Some("")` if the template carries no placeholder
/// - `Some(tag)` if every placeholder occurrence resolves to the same non-empty tag and the
///   literal segments line up exactly
/// - `None` otherwise
///
/// # Example
/// ```
/// use session_expiry::match_tag;
///
/// assert_eq!(match_tag("abc_EN01_xyz", "abc_%TAG%_xyz").as_deref(), Some("EN01"));
/// assert_eq!(match_tag("abc_EN01_xyz_test", "abc_%TAG%_xyz"), None);
/// ```
pub fn match_tag(
    name: &str,
    template: &str,
) -> Option<String> {
    let segments: Vec<&str> = template.split(NAME_TAG).collect();
    extract_tag(name, &segments)
}

/// Substitutes `tag` into every placeholder of `pattern`.
///
/// The substitution is literal. An empty tag leaves the pattern untouched.
pub fn substitute_tag(
    pattern: &str,
    tag: &str,
) -> String {
    if tag.is_empty() {
        return pattern.to_string();
    }
    pattern.replace(NAME_TAG, tag)
}

/// Compiles `pattern` so that it has to match a whole cache name.
pub fn anchored_regex(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// With n placeholders and literal segments s0..sn the tag length is fixed by
/// `(len(name) - sum(len(si))) / n`; the candidate is then checked by rebuilding
/// the name.
fn extract_tag<S: AsRef<str>>(
    name: &str,
    segments: &[S],
) -> Option<String> {
    if segments.len() < 2 {
        return Some(String::new());
    }

    let placeholders = segments.len() - 1;
    let literal_len: usize = segments.iter().map(|s| s.as_ref().len()).sum();
    let remainder = name.len().checked_sub(literal_len)?;
    if remainder == 0 || remainder % placeholders != 0 {
        return None;
    }
    let tag_len = remainder / placeholders;

    let prefix = segments[0].as_ref();
    if !name.starts_with(prefix) {
        return None;
    }
    let tag = name.get(prefix.len()..prefix.len() + tag_len)?;

    let mut rebuilt = String::with_capacity(name.len());
    rebuilt.push_str(prefix);
    for segment in &segments[1..] {
        rebuilt.push_str(tag);
        rebuilt.push_str(segment.as_ref());
    }

    (rebuilt == name).then(|| tag.to_string())
}

/// Primary cache name template parsed once at configuration time.
#[derive(Debug, Clone)]
pub struct TagTemplate {
    template: String,
    segments: Vec<String>,
    /// Set only for placeholder-less templates that compile as a regex
    literal: Option<Regex>,
}

impl TagTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let segments: Vec<String> = template.split(NAME_TAG).map(str::to_string).collect();

        let literal = if segments.len() < 2 {
            match anchored_regex(&template) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!(
                        template = %template,
                        error = %e,
                        "Primary cache pattern is not a valid regex, falling back to exact name match"
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            template,
            segments,
            literal,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn has_placeholder(&self) -> bool {
        self.segments.len() > 1
    }

    /// Returns the tag of `name`, or `None` if the name does not belong to this template.
    ///
    /// A placeholder-less template matches by anchored regex and yields the empty tag.
    pub fn extract(
        &self,
        name: &str,
    ) -> Option<String> {
        if !self.has_placeholder() {
            let matched = match &self.literal {
                Some(regex) => regex.is_match(name),
                None => name == self.template,
            };
            return matched.then(String::new);
        }
        extract_tag(name, &self.segments)
    }
}
