//! Inheritance record builder

use crate::scan::Token;
use lineage_core::{BuildError, Directive, DirectiveKind, FileId, InheritanceRecord, ProjectFiles};
use sha2::{Digest, Sha256};

/// A record together with what the cache needs to judge its freshness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRecord {
    pub record: InheritanceRecord,
    /// Targets dropped because they are not project files.
    pub unresolved: Vec<FileId>,
    /// Fingerprint of the full directive list, tracked or not.
    pub fingerprint: String,
}

/// Pair up keyword/path tokens into directives.
pub fn pair_directives(owner: &FileId, tokens: &[Token]) -> Result<Vec<Directive>, BuildError> {
    let mut directives = Vec::with_capacity(tokens.len() / 2);
    let mut iter = tokens.iter().enumerate();

    while let Some((index, token)) = iter.next() {
        match token {
            Token::Keyword(kind) => match iter.next() {
                Some((_, Token::Path(target))) => directives.push(Directive {
                    kind: *kind,
                    target: target.clone(),
                }),
                _ => {
                    return Err(BuildError::ExpectedPath {
                        owner: owner.as_path().to_path_buf(),
                        keyword: kind.as_str(),
                        index,
                    });
                }
            },
            Token::Path(path) => {
                return Err(BuildError::DanglingPath {
                    owner: owner.as_path().to_path_buf(),
                    path: path.as_path().to_path_buf(),
                    index,
                });
            }
        }
    }

    Ok(directives)
}

/// Build the inheritance record of `owner` from its scanned tokens, keeping
/// only targets that are members of `known`.
pub fn build_record(
    owner: &FileId,
    tokens: &[Token],
    known: &ProjectFiles,
) -> Result<BuiltRecord, BuildError> {
    let directives = pair_directives(owner, tokens)?;
    let mut record = InheritanceRecord::new(owner.clone());
    let mut unresolved = Vec::new();

    for Directive { kind, target } in &directives {
        if !known.contains(target) {
            tracing::debug!("{}: {} target {} is not a project file", owner, kind, target);
            if !unresolved.contains(target) {
                unresolved.push(target.clone());
            }
            continue;
        }
        let bucket = match kind {
            DirectiveKind::Extends => &mut record.extends,
            DirectiveKind::Include => &mut record.includes,
        };
        if !bucket.contains(target) {
            bucket.push(target.clone());
        }
    }

    Ok(BuiltRecord {
        record,
        unresolved,
        fingerprint: directive_fingerprint(&directives),
    })
}

/// SHA-256 over the sorted, de-duplicated `kind:path` lines of `directives`.
pub fn directive_fingerprint(directives: &[Directive]) -> String {
    let mut lines: Vec<String> = directives
        .iter()
        .map(|d| format!("{}:{}", d.kind, d.target))
        .collect();
    lines.sort();
    lines.dedup();

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
