mod connected_to_journal;

use std::{
    io::Write as _,
    sync::{PoisonError, RwLock},
    time::SystemTime,
};

use anstyle::{AnsiColor, Effects, Style};
use connected_to_journal::connected_to_journal;
use env_logger::Env;
use log::Level;

static ACCOUNT: RwLock<String> = RwLock::new(String::new());

/// Prefixes every log line with `account` until the returned guard is dropped.
#[must_use = "the prefix is removed when the guard is dropped"]
pub fn for_account(account: &str) -> AccountGuard {
    *ACCOUNT.write().unwrap_or_else(PoisonError::into_inner) = format!("{account} ");
    AccountGuard
}

pub struct AccountGuard;

impl Drop for AccountGuard {
    fn drop(&mut self) {
        ACCOUNT
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

fn account() -> String {
    ACCOUNT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// syslog priority of `level`, see `sd-daemon(3)`.
fn priority(level: Level) -> u8 {
    match level {
        Level::Error => 3,
        Level::Warn => 4,
        Level::Info => 6,
        Level::Debug | Level::Trace => 7,
    }
}

fn level_style(level: Level) -> Style {
    match level {
        Level::Error => AnsiColor::Red.on_default().effects(Effects::BOLD),
        Level::Warn => AnsiColor::Yellow.on_default(),
        Level::Info => AnsiColor::Green.on_default(),
        Level::Debug => AnsiColor::Blue.on_default(),
        Level::Trace => AnsiColor::Cyan.on_default(),
    }
}

pub fn init() {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if connected_to_journal() {
        builder.format(move |buf, record| {
            writeln!(
                buf,
                "<{}>{}{}: {}",
                priority(record.level()),
                account(),
                record.target(),
                record.args()
            )
        });
    } else {
        let subtle = AnsiColor::BrightBlack.on_default();
        builder.format(move |buf, record| {
            let now = SystemTime::now();
            write!(buf, "{subtle}[{subtle:#}")?;
            if let Ok(now) = jiff::Timestamp::try_from(now) {
                write!(buf, "{now:.3} ")?;
            } else {
                write!(buf, "timestamp_error ")?;
            }
            let level_style = level_style(record.level());
            write!(
                buf,
                "{level_style}{}{level_style:#} {}{}",
                record.level(),
                account(),
                record.target(),
            )?;
            if let Some(line) = record.line() {
                write!(buf, ":{line}")?;
            }
            write!(buf, "{subtle}]{subtle:#} ")?;
            writeln!(buf, "{}", record.args())
        });
    }
    builder.init();
}
