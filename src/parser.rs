use csv::{ReaderBuilder, Terminator};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;

use crate::domain::{Account, BalanceCheck, Ledger, Payment, Snapshot};
use crate::error::DumpError;
use crate::writer::{
    ACCOUNTS_DUMP, FAVORITES_DUMP, FIELD_DELIMITER, PAYMENTS_DUMP, RECORD_TERMINATOR,
};

/// Reads `;`-separated records of type `T` from a dump, one at a time.
pub struct DumpReader<R: Read, T> {
    reader: csv::Reader<R>,
    file: String,
    record_number: usize,
    _record: PhantomData<T>,
}

impl<R: Read, T> std::fmt::Debug for DumpReader<R, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpReader")
            .field("file", &self.file)
            .field("record_number", &self.record_number)
            .finish_non_exhaustive()
    }
}

impl<R: Read, T: DeserializeOwned> DumpReader<R, T> {
    /// `terminator` is `b'|'` for dumps and `b'\n'` for history files.
    pub fn new(reader: R, file: impl Into<String>, terminator: u8) -> Self {
        let terminator = if terminator == b'\n' {
            Terminator::CRLF
        } else {
            Terminator::Any(terminator)
        };

        let csv_reader = ReaderBuilder::new()
            .delimiter(FIELD_DELIMITER)
            .terminator(terminator)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        DumpReader {
            reader: csv_reader,
            file: file.into(),
            record_number: 0,
            _record: PhantomData,
        }
    }

    pub fn next_record(&mut self) -> Option<Result<T, DumpError>> {
        let mut record = csv::StringRecord::new();

        loop {
            match self.reader.read_record(&mut record) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => return Some(Err(e.into())),
            }
            // Fields keep their whitespace; only a record that is nothing but
            // whitespace (e.g. a newline after the last terminator) is skipped.
            if record.len() == 1 && record[0].trim().is_empty() {
                continue;
            }
            break;
        }

        self.record_number += 1;
        Some(
            record
                .deserialize(None)
                .map_err(|e| DumpError::InvalidRecord {
                    file: self.file.clone(),
                    line: self.record_number,
                    message: e.to_string(),
                }),
        )
    }
}

impl<R: Read, T: DeserializeOwned> Iterator for DumpReader<R, T> {
    type Item = Result<T, DumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

fn read_dump<T: DeserializeOwned>(path: &Path, terminator: u8) -> Result<Vec<T>, DumpError> {
    let file = File::open(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    DumpReader::new(BufReader::new(file), name, terminator).collect()
}

/// Reads whichever of the accounts, payments and favorites dumps exist.
/// A missing file is skipped; a malformed record fails the whole import.
pub fn import_dir(dir: impl AsRef<Path>) -> Result<Snapshot, DumpError> {
    let dir = dir.as_ref();
    let mut snapshot = Snapshot::default();

    let accounts = dir.join(ACCOUNTS_DUMP);
    if accounts.exists() {
        snapshot.accounts = read_dump(&accounts, RECORD_TERMINATOR)?;
    } else {
        tracing::warn!("Skipping missing dump {}", accounts.display());
    }

    let payments = dir.join(PAYMENTS_DUMP);
    if payments.exists() {
        snapshot.payments = read_dump(&payments, RECORD_TERMINATOR)?;
    } else {
        tracing::warn!("Skipping missing dump {}", payments.display());
    }

    let favorites = dir.join(FAVORITES_DUMP);
    if favorites.exists() {
        snapshot.favorites = read_dump(&favorites, RECORD_TERMINATOR)?;
    } else {
        tracing::warn!("Skipping missing dump {}", favorites.display());
    }

    tracing::info!(
        "Imported {} accounts, {} payments, {} favorites from {}",
        snapshot.accounts.len(),
        snapshot.payments.len(),
        snapshot.favorites.len(),
        dir.display()
    );
    Ok(snapshot)
}

/// Imports `dir` into a fresh ledger.
pub fn load_ledger(
    dir: impl AsRef<Path>,
    balance_check: BalanceCheck,
) -> Result<Ledger, DumpError> {
    let snapshot = import_dir(dir)?;
    Ok(Ledger::from_snapshot(snapshot, balance_check)?)
}

pub fn import_accounts_file(path: impl AsRef<Path>) -> Result<Vec<Account>, DumpError> {
    read_dump(path.as_ref(), RECORD_TERMINATOR)
}

/// Reads one newline-terminated history file.
pub fn read_history_file(path: impl AsRef<Path>) -> Result<Vec<Payment>, DumpError> {
    read_dump(path.as_ref(), b'\n')
}
