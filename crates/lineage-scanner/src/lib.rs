//! Directive scanning, record building and template discovery

pub mod builder;
pub mod discover;
pub mod lexer;
pub mod resolve;
pub mod scan;


pub use builder::{BuiltRecord, build_record, directive_fingerprint, pair_directives};
pub use discover::{discover_templates, template_matcher};
pub use lexer::{RawDirective, lex};
pub use resolve::PathResolver;
pub use scan::{Token, scan, scan_directives, scan_file};
