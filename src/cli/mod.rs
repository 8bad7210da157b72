mod rules;

use anyhow::{Context as _, Result};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

pub use rules::RuleTally;
pub use rules::Stop;
pub use rules::apply_rules;

use crate::{
    Args,
    config::{AccountConfig, Config, ProviderConfig},
    error::Error,
    imap::Client,
    logging,
    prune::{Limits, Pruner},
    store::MailStore as _,
};

/// How a run treats failures and whether it changes anything on the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub permanent: bool,
    pub halt_on_error: bool,
}

impl From<&Args> for RunOptions {
    fn from(args: &Args) -> Self {
        Self {
            permanent: args.permanent,
            halt_on_error: args.halt_on_error,
        }
    }
}

/// Processes every selected account. Returns whether everything succeeded.
pub fn run(args: &Args, config: &Config) -> Result<bool> {
    let accounts = config.selected_accounts(args.account.as_deref())?;
    let options = RunOptions::from(args);
    if !options.permanent {
        info!("Safe mode: nothing will be deleted, pass --permanent to change that");
    }
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("tokio runtime should be buildable")?;

    rt.block_on(async {
        let cancel = CancellationToken::new();
        tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

        let mut success = true;
        for (name, account) in accounts {
            let _prefix = logging::for_account(name);
            let provider = config
                .provider_of(account)
                .with_context(|| format!("provider of account {name} should be configured"))?;
            match prune_account(account, provider, config.limits(), options, &cancel).await {
                Ok(tally) => {
                    success &= tally.failed == 0;
                    if matches!(tally.stopped, Some(Stop::Halted | Stop::Cancelled)) {
                        break;
                    }
                }
                Err(error) => {
                    error!("{error:#}");
                    success = false;
                    if options.halt_on_error
                        || matches!(error.downcast_ref::<Error>(), Some(Error::Cancelled))
                    {
                        break;
                    }
                }
            }
        }

        Ok(success)
    })
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Interrupted, stopping before the next change to the mailbox");
        cancel.cancel();
    }
}

/// Logs in, applies every rule of `account` and logs out again.
///
/// Fails only if the account could not be used at all. Failed rules are counted in the tally.
async fn prune_account(
    account: &AccountConfig,
    provider: &ProviderConfig,
    limits: Limits,
    options: RunOptions,
    cancel: &CancellationToken,
) -> Result<RuleTally> {
    let user = account.auth().user();
    let password = account.auth().password()?;
    let client = Client::connect(provider.host(), provider.port())
        .await
        .map_err(Error::from)?;
    let session = client.login(user, &password).await?;

    let mut pruner = Pruner::new(session, limits, cancel.clone());
    let tally = apply_rules(&mut pruner, &account.resolved_rules(provider), options).await;
    info!(
        "{} of {} rules succeeded",
        tally.succeeded,
        tally.succeeded + tally.failed
    );

    if tally.stopped.is_none() {
        pruner
            .into_store()
            .logout()
            .await
            .map_err(|e| Error::at_stage(e, Error::Logout))?;
    }

    Ok(tally)
}
