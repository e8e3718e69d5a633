//! Terraform lifecycle for one cluster.

use std::io::Write;
use std::path::Path;

use tfkit::{Client, Invocation, PlanArtifact};

use crate::descriptor::ProviderDescriptor;
use crate::error::{Error, Result};
use crate::secrets::{EnvVar, SecretsGetter};

/// Resolve the provider's required variables for `cluster`.
pub fn resolve_secrets(
    secrets: &dyn SecretsGetter,
    cluster: &str,
    provider: &ProviderDescriptor,
) -> Result<Vec<EnvVar>> {
    secrets
        .get_as_environment_variables(cluster, provider.environment_variables())
        .map_err(|source| Error::SecretResolution {
            cluster: cluster.to_string(),
            source,
        })
}

/// Runs init, plan, apply and destroy in a cluster's state directory.
///
/// Every command sees the same environment: the process environment, the
/// resolved secrets and `TF_IN_AUTOMATION`.
pub struct LifecycleDriver<'a> {
    client: &'a Client,
    cluster: String,
    invocation: Invocation,
}

impl<'a> LifecycleDriver<'a> {
    /// Driver for `cluster`, working in `state_dir`.
    pub fn new(client: &'a Client, state_dir: &Path, cluster: &str, secrets: &[EnvVar]) -> Self {
        let invocation = Invocation::new(state_dir)
            .with_env(secrets.iter().map(|v| (v.name.clone(), v.value.clone())));
        Self {
            client,
            cluster: cluster.to_string(),
            invocation,
        }
    }

    /// Invocation shared by every command, output queries included.
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// `terraform init <provider_dir>`
    pub fn init(&self, provider_dir: &Path, output: &mut (dyn Write + Send)) -> Result<()> {
        self.client.init(&self.invocation, provider_dir, output)?;
        Ok(())
    }

    /// `terraform plan -out=<cluster> <provider_dir>`
    pub fn plan(
        &self,
        provider_dir: &Path,
        output: &mut (dyn Write + Send),
    ) -> Result<PlanArtifact> {
        Ok(self
            .client
            .plan(&self.invocation, provider_dir, &self.cluster, output)?)
    }

    /// `terraform apply -input=false <plan>`
    pub fn apply(&self, plan: &PlanArtifact, output: &mut (dyn Write + Send)) -> Result<()> {
        self.client.apply(&self.invocation, plan, output)?;
        log::info!("Terraform apply finished for cluster {}", self.cluster);
        Ok(())
    }

    /// `terraform destroy -force`
    pub fn destroy(&self, output: &mut (dyn Write + Send)) -> Result<()> {
        self.client.destroy(&self.invocation, output)?;
        log::info!("Terraform destroy finished for cluster {}", self.cluster);
        Ok(())
    }
}
