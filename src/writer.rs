use csv::{Terminator, WriterBuilder};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::types::{AccountId, Phone};
use crate::domain::{Account, Ledger, Payment};
use crate::error::DumpError;

pub const ACCOUNTS_DUMP: &str = "accounts.dump";
pub const PAYMENTS_DUMP: &str = "payments.dump";
pub const FAVORITES_DUMP: &str = "favorites.dump";

pub const FIELD_DELIMITER: u8 = b';';
pub const RECORD_TERMINATOR: u8 = b'|';

fn write_dump<'a, T, I>(path: &Path, records: I, terminator: Terminator) -> Result<(), DumpError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let file = BufWriter::new(File::create(path)?);
    let mut writer = WriterBuilder::new()
        .delimiter(FIELD_DELIMITER)
        .terminator(terminator)
        .has_headers(false)
        .from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes accounts, payments and favorites dumps into `dir`. Empty
/// collections produce no file.
pub fn export_dir(ledger: &Ledger, dir: impl AsRef<Path>) -> Result<(), DumpError> {
    let dir = dir.as_ref();
    let pipe = Terminator::Any(RECORD_TERMINATOR);

    let accounts: Vec<&Account> = ledger.accounts().collect();
    if !accounts.is_empty() {
        write_dump(&dir.join(ACCOUNTS_DUMP), accounts, pipe)?;
    }
    if !ledger.payments().is_empty() {
        write_dump(&dir.join(PAYMENTS_DUMP), ledger.payments(), pipe)?;
    }
    if !ledger.favorites().is_empty() {
        write_dump(&dir.join(FAVORITES_DUMP), ledger.favorites(), pipe)?;
    }

    tracing::info!("Exported ledger to {}", dir.display());
    Ok(())
}

/// Writes only the accounts to a single dump file, even when there are none.
pub fn export_accounts_file(ledger: &Ledger, path: impl AsRef<Path>) -> Result<(), DumpError> {
    write_dump(
        path.as_ref(),
        ledger.accounts(),
        Terminator::Any(RECORD_TERMINATOR),
    )
}

/// Writes newline-terminated payment records: a single `payments.dump` when
/// they fit in `records_per_file`, otherwise `payments1.dump`,
/// `payments2.dump`, ... Returns the number of files written.
pub fn write_history_files(
    payments: &[Payment],
    dir: impl AsRef<Path>,
    records_per_file: usize,
) -> Result<usize, DumpError> {
    if records_per_file == 0 {
        return Err(DumpError::InvalidRecordsPerFile);
    }
    if payments.is_empty() {
        return Ok(0);
    }

    let dir = dir.as_ref();
    let newline = Terminator::Any(b'\n');

    if payments.len() <= records_per_file {
        write_dump(&dir.join(PAYMENTS_DUMP), payments, newline)?;
        return Ok(1);
    }

    let mut files = 0;
    for (i, chunk) in payments.chunks(records_per_file).enumerate() {
        write_dump(&dir.join(format!("payments{}.dump", i + 1)), chunk, newline)?;
        files += 1;
    }
    tracing::debug!("Wrote {} payments into {} history files", payments.len(), files);
    Ok(files)
}

pub struct BalanceRecord {
    pub id: AccountId,
    pub phone: Phone,
    pub balance: Decimal,
}

impl BalanceRecord {
    pub fn from_account(account: &Account) -> Self {
        BalanceRecord {
            id: account.id,
            phone: account.phone.clone(),
            balance: account.balance.to_major(),
        }
    }
}

/// Human-readable balance report, amounts in major units.
pub fn write_balances<'a, W: Write>(
    writer: &mut W,
    accounts: impl Iterator<Item = &'a Account>,
) -> std::io::Result<()> {
    writeln!(writer, "id,phone,balance")?;

    for record in accounts.map(BalanceRecord::from_account) {
        writeln!(writer, "{},{},{}", record.id, record.phone, record.balance)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Money, PaymentCategory};
    use std::fs;

    fn ledger_with_payment() -> Ledger {
        let mut ledger = Ledger::new();
        let account = ledger
            .register_account(Phone::from("+992000000001"))
            .expect("failed to register account");
        ledger
            .deposit(account.id, Money(1_000_00))
            .expect("failed to deposit");
        ledger
            .pay(account.id, Money(250), PaymentCategory::from("auto"))
            .expect("failed to pay");
        ledger
    }

    #[test]
    fn test_export_dir_layout() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let ledger = ledger_with_payment();
        export_dir(&ledger, dir.path()).expect("failed to export");

        let accounts =
            fs::read_to_string(dir.path().join(ACCOUNTS_DUMP)).expect("accounts dump");
        assert_eq!(accounts, "1;+992000000001;99750|");

        let payments =
            fs::read_to_string(dir.path().join(PAYMENTS_DUMP)).expect("payments dump");
        let payment = &ledger.payments()[0];
        assert_eq!(payments, format!("{};1;250;auto;INPROGRESS|", payment.id));

        assert!(!dir.path().join(FAVORITES_DUMP).exists());
    }

    #[test]
    fn test_export_empty_ledger_writes_nothing() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        export_dir(&Ledger::new(), dir.path()).expect("failed to export");
        let entries = fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(entries, 0);
    }

    #[test]
    fn test_history_single_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let ledger = ledger_with_payment();
        let files = write_history_files(ledger.payments(), dir.path(), 10).expect("history");
        assert_eq!(files, 1);

        let contents = fs::read_to_string(dir.path().join(PAYMENTS_DUMP)).expect("history file");
        assert!(contents.ends_with("auto;INPROGRESS\n"));
    }

    #[test]
    fn test_history_split_into_numbered_files() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let payments: Vec<Payment> = (0..5)
            .map(|_| Payment::new(AccountId(1), Money(1), PaymentCategory::from("auto")))
            .collect();

        let files = write_history_files(&payments, dir.path(), 2).expect("history");
        assert_eq!(files, 3);
        assert!(!dir.path().join(PAYMENTS_DUMP).exists());

        let last = fs::read_to_string(dir.path().join("payments3.dump")).expect("third file");
        assert_eq!(last.lines().count(), 1);
        let first = fs::read_to_string(dir.path().join("payments1.dump")).expect("first file");
        assert_eq!(first.lines().count(), 2);
    }

    #[test]
    fn test_history_zero_records_per_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        assert!(matches!(
            write_history_files(&[], dir.path(), 0),
            Err(DumpError::InvalidRecordsPerFile)
        ));
    }

    #[test]
    fn test_history_empty_payments_writes_nothing() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        assert_eq!(write_history_files(&[], dir.path(), 5).expect("history"), 0);
    }

    #[test]
    fn test_balance_report_major_units() {
        let ledger = ledger_with_payment();
        let mut output = Vec::new();
        write_balances(&mut output, ledger.accounts()).expect("failed to write balances");
        let csv = String::from_utf8(output).expect("output should be valid UTF-8");
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "id,phone,balance");
        assert_eq!(lines[1], "1,+992000000001,997.50");
    }

    #[test]
    fn test_balance_report_negative_balance() {
        let mut output = Vec::new();
        let mut account = Account::new(AccountId(3), Phone::from("7"));
        account.debit(Money(80)).expect("failed to debit");
        write_balances(&mut output, std::iter::once(&account)).expect("failed to write balances");
        let csv = String::from_utf8(output).expect("output should be valid UTF-8");
        assert!(csv.contains("3,7,-0.80"));
    }
}
