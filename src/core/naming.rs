//! Name normalization and output file naming.
//!
//! The default [`NamingMode::CheckThenWrite`] resolves a free path with an
//! existence check and writes it later. Two workers rendering the same name
//! at the same time can both see the same path as free; the later write
//! wins. [`NamingMode::Claim`] creates the file atomically instead, so
//! concurrent duplicates always land on distinct paths.

use crate::utils::error::{CertError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingMode {
    #[default]
    CheckThenWrite,
    Claim,
}

/// Trim and title-case a raw name.
///
/// Follows Python's `str.title`: the first cased letter after an uncased
/// character gets its titlecase mapping and every other cased letter is
/// lowercased, so `"o'neil"` becomes `"O'Neil"`, `"3rd"` becomes `"3Rd"` and
/// `"ßtraße"` becomes `"Sstraße"`.
pub fn normalize_name(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut previous_cased = false;

    for c in raw.trim().chars() {
        let cased = is_cased(c);
        if cased {
            if previous_cased {
                normalized.extend(c.to_lowercase());
            } else {
                push_titlecase(&mut normalized, c);
            }
        } else {
            normalized.push(c);
        }
        previous_cased = cased;
    }

    normalized
}

/// Unicode titlecase letters (general category Lt).
fn is_titlecase(c: char) -> bool {
    matches!(
        c,
        '\u{01C5}'
            | '\u{01C8}'
            | '\u{01CB}'
            | '\u{01F2}'
            | '\u{1F88}'..='\u{1F8F}'
            | '\u{1F98}'..='\u{1F9F}'
            | '\u{1FA8}'..='\u{1FAF}'
            | '\u{1FBC}'
            | '\u{1FCC}'
            | '\u{1FFC}'
    )
}

fn is_cased(c: char) -> bool {
    c.is_lowercase() || c.is_uppercase() || is_titlecase(c)
}

fn push_titlecase(out: &mut String, c: char) {
    let single = match c {
        '\u{01C4}'..='\u{01C6}' => Some('\u{01C5}'),
        '\u{01C7}'..='\u{01C9}' => Some('\u{01C8}'),
        '\u{01CA}'..='\u{01CC}' => Some('\u{01CB}'),
        '\u{01F1}'..='\u{01F3}' => Some('\u{01F2}'),
        '\u{1F80}'..='\u{1F87}' | '\u{1F90}'..='\u{1F97}' | '\u{1FA0}'..='\u{1FA7}' => {
            char::from_u32(c as u32 + 8)
        }
        '\u{1FB3}' => Some('\u{1FBC}'),
        '\u{1FC3}' => Some('\u{1FCC}'),
        '\u{1FF3}' => Some('\u{1FFC}'),
        _ if is_titlecase(c) => Some(c),
        _ => None,
    };
    if let Some(title) = single {
        out.push(title);
        return;
    }

    // Multi-letter expansions (ß, ligatures) keep only the first letter upper.
    let mut upper = c.to_uppercase();
    if let Some(first) = upper.next() {
        out.push(first);
    }
    for rest in upper {
        out.extend(rest.to_lowercase());
    }
}

/// Reject names that would not stay a single file name inside the output
/// and QR directories.
pub fn check_file_stem(name: &str) -> Result<()> {
    let invalid = |reason: &str| CertError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains(['/', '\\']) {
        return Err(invalid("name contains a path separator"));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid("name is not a plain file name")),
    }
}

fn candidate_path(output_dir: &Path, name: &str, attempt: usize) -> PathBuf {
    if attempt == 0 {
        output_dir.join(format!("{}.pdf", name))
    } else {
        output_dir.join(format!("{}_{}.pdf", name, attempt))
    }
}

/// First of `<name>.pdf`, `<name>_1.pdf`, `<name>_2.pdf`, … that does not exist.
pub fn resolve_output_path(output_dir: &Path, name: &str) -> PathBuf {
    (0..)
        .map(|attempt| candidate_path(output_dir, name, attempt))
        .find(|path| !path.exists())
        .unwrap_or_else(|| candidate_path(output_dir, name, 0))
}

/// Atomically create the first free candidate and hand back its open file.
pub fn claim_output_path(output_dir: &Path, name: &str) -> Result<(PathBuf, File)> {
    let mut attempt = 0;
    loop {
        let path = candidate_path(output_dir, name, attempt);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Where an output document goes.
///
/// In [`NamingMode::Claim`] the file already exists and is held open; in
/// [`NamingMode::CheckThenWrite`] it is only created when writing starts.
pub struct OutputTarget {
    path: PathBuf,
    claimed: Option<File>,
}

impl OutputTarget {
    pub fn reserve(output_dir: &Path, name: &str, mode: NamingMode) -> Result<Self> {
        match mode {
            NamingMode::CheckThenWrite => Ok(Self {
                path: resolve_output_path(output_dir, name),
                claimed: None,
            }),
            NamingMode::Claim => {
                let (path, file) = claim_output_path(output_dir, name)?;
                Ok(Self {
                    path,
                    claimed: Some(file),
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the target for writing, truncating whatever is there.
    pub fn into_file(self) -> Result<(PathBuf, File)> {
        let file = match self.claimed {
            Some(file) => file,
            None => File::create(&self.path)?,
        };
        Ok((self.path, file))
    }
}
