//! Article extractors.
//!
//! An extractor turns a parsed HTML document into a single normalised text
//! string, or `None` when the page has nothing worth recording.
//!
//! | Source | Module | Article body |
//! |--------|--------|--------------|
//! | Wikipedia | [`wikipedia`] | first `div.mw-parser-output` |

pub mod wikipedia;
