use color_eyre::eyre::{
    self,
    WrapErr as _,
};
use secrecy::ExposeSecret as _;
use stx_api_client::HttpClient;
use stx_core::{
    Address,
    ContractIdentifier,
};
use tracing::{
    info,
    instrument,
    warn,
};

use crate::{
    catalog::{
        CatalogPlan,
        OperationPlan as _,
        PlanContext,
    },
    credential::Credential,
    nonce::NonceCounter,
    orchestrator::Orchestrator,
    report::BatchReport,
    retry::FixedRetry,
    signer::Signer,
    submitter::LedgerSubmitter,
    Config,
};

/// A batch run that is ready to go: sender derived, contract resolved, starting nonce known.
#[derive(Debug)]
pub struct Batcher {
    orchestrator: Orchestrator,
    submitter: LedgerSubmitter,
    plan: CatalogPlan,
}

impl Batcher {
    /// Prepares a run from `cfg`, including fetching the sender's starting nonce.
    ///
    /// # Errors
    /// Returns an error if the credential is malformed, no key can be derived from it, the
    /// contract or recipient do not parse, or the starting nonce cannot be fetched.
    #[instrument(skip_all, err)]
    pub async fn new(cfg: &Config) -> eyre::Result<Self> {
        let credential = Credential::classify(cfg.sender_private_key.expose_secret())
            .wrap_err("failed reading the sender credential")?;
        let signer = Signer::derive(&credential, cfg.stacks_network)
            .wrap_err("failed deriving the sender's signing key")?;
        drop(credential);

        let default_name = cfg
            .contract
            .default_contract_name()
            .wrap_err("catalog has an invalid default contract name")?;
        let contract = ContractIdentifier::parse_with_default(&cfg.contract_address, &default_name)
            .wrap_err_with(|| {
                format!(
                    "failed parsing contract identifier `{}`",
                    cfg.contract_address
                )
            })?;
        if contract.address.is_mainnet() != cfg.stacks_network.is_mainnet() {
            warn!(
                %contract,
                network = %cfg.stacks_network,
                "contract address is encoded for a different network than the one selected",
            );
        }

        let recipient: Address = match cfg.test_recipient() {
            Some(recipient) => recipient
                .parse()
                .wrap_err_with(|| format!("failed parsing test recipient `{recipient}`"))?,
            None => *signer.address(),
        };
        let plan = cfg
            .contract
            .plan(PlanContext {
                sender: *signer.address(),
                recipient,
            })
            .wrap_err("failed preparing the operation catalog")?;

        let api_url = cfg.api_url();
        let client = HttpClient::new(api_url)
            .wrap_err_with(|| format!("failed constructing ledger client for `{api_url}`"))?;
        let retry = FixedRetry {
            attempts: cfg.nonce_fetch_attempts,
            delay: cfg.nonce_fetch_delay(),
        };
        let counter = NonceCounter::fetch_initial(&client, signer.address(), retry)
            .await
            .wrap_err("failed fetching the sender's starting nonce; refusing to guess one")?;

        let operations_per_cycle = plan.operations(0).len();
        let total = u64::from(cfg.cycles)
            .saturating_mul(u64::try_from(operations_per_cycle).unwrap_or(u64::MAX));
        info!(
            network = %cfg.stacks_network,
            api_url = %client.base(),
            %contract,
            catalog = %plan.catalog(),
            cycles = cfg.cycles,
            operations_per_cycle,
            total,
            sender = %signer.address(),
            %recipient,
            starting_nonce = counter.initial(),
            "prepared batch run",
        );
        println!(
            "submitting {total} transactions to {contract} on {} from {} ({} cycles of {} \
             operations, starting at nonce {})",
            cfg.stacks_network,
            signer.address(),
            cfg.cycles,
            operations_per_cycle,
            counter.initial(),
        );

        let submitter = LedgerSubmitter::new(client, signer, contract, cfg.fee(), retry);
        Ok(Self {
            orchestrator: Orchestrator::new(counter, cfg.cycles, cfg.delay()),
            submitter,
            plan,
        })
    }

    /// Submits every operation of the run.
    ///
    /// # Errors
    /// Returns an error only if the run cannot continue; rejected operations are part of the
    /// report.
    pub async fn run(self) -> eyre::Result<BatchReport> {
        let Self {
            orchestrator,
            submitter,
            plan,
        } = self;
        orchestrator
            .run(&submitter, &plan)
            .await
            .wrap_err("batch run aborted")
    }
}
