//! Directive scanner: lexes a template and resolves its targets

use crate::lexer::{self, RawDirective};
use crate::resolve::PathResolver;
use lineage_core::{Directive, DirectiveKind, FileId, ScanError, Storage};

/// One element of the scanner's output stream. A `Keyword` is always
/// followed by the `Path` it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Keyword(DirectiveKind),
    Path(FileId),
}

/// Scan template source for directives.
pub fn scan(source: &[u8], file: &FileId, resolver: &PathResolver) -> Vec<Token> {
    let text = String::from_utf8_lossy(source);
    let raw = lexer::lex(&text);
    tracing::trace!("Lexed {} directives from {}", raw.len(), file);

    raw.into_iter()
        .flat_map(|RawDirective { kind, path, .. }| {
            [Token::Keyword(kind), Token::Path(resolver.resolve(file, &path))]
        })
        .collect()
}

/// Read `file` from storage and scan it.
pub fn scan_file(
    storage: &dyn Storage,
    file: &FileId,
    resolver: &PathResolver,
) -> Result<Vec<Token>, ScanError> {
    let source = storage.read(file.as_path()).map_err(|source| ScanError::Read {
        path: file.as_path().to_path_buf(),
        source,
    })?;
    Ok(scan(&source, file, resolver))
}

/// Convenience for callers that want directives rather than tokens.
pub fn scan_directives(source: &[u8], file: &FileId, resolver: &PathResolver) -> Vec<Directive> {
    scan(source, file, resolver)
        .chunks(2)
        .filter_map(|pair| match pair {
            [Token::Keyword(kind), Token::Path(target)] => Some(Directive {
                kind: *kind,
                target: target.clone(),
            }),
            _ => None,
        })
        .collect()
}
