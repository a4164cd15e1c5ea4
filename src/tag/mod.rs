//! Cache name tag matching.
//!
//! A templated cache name carries one or more [`NAME_TAG`] placeholders, e.g.
//! `session_%TAG%` or `abc_%TAG%_xyz_%TAG%_test`. Matching a concrete cache
//! name against the template extracts the tag (for instance an environment
//! suffix) which is then substituted into every relevant cache pattern.
//!
//! Extraction is validated by an exact round trip: the candidate tag,
//! substituted back into every placeholder, must reproduce the concrete name.
//! Every occurrence must carry the same tag.

mod matcher;

pub use matcher::*;
