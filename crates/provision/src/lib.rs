//! # provision
//!
//! Creates and destroys cluster infrastructure with Terraform.
//!
//! [`Provisioner::provision`] takes a [`ClusterPlan`] describing how many
//! nodes of each role a cluster needs and which provider builds them. It:
//!
//! 1. loads the provider descriptor from `<providers>/<provider>/provider.yaml`
//! 2. creates the cluster state directory `<state>/<cluster>/`
//! 3. makes sure the cluster's SSH key pair exists (generated once, never repaired)
//! 4. writes `terraform.tfvars` and `provider.auto.tfvars`
//! 5. resolves the provider's secrets and runs `init`, `plan` and `apply`
//! 6. reads node addresses back from Terraform outputs into the plan
//!
//! Every step fails fast; nothing is retried.
//!
//! ## Example
//!
//! ```no_run
//! use provision::{ClusterPlan, Provisioner};
//! use std::path::Path;
//!
//! let client = tfkit::Client::new(None).expect("terraform not available");
//! let provisioner = Provisioner::new(client, "/etc/provctl/providers", "/var/lib/provctl");
//!
//! let plan = ClusterPlan::load(Path::new("cluster.yaml")).unwrap();
//! let populated = provisioner.provision(plan, &mut std::io::stderr()).unwrap();
//! println!("{}", populated.to_yaml().unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptor;
pub mod error;
pub mod keypair;
pub mod lifecycle;
pub mod plan;
pub mod populate;
pub mod reconcile;
pub mod secrets;
pub mod state;
pub mod variables;

pub use descriptor::{ProviderDescriptor, list_providers};
pub use error::{Error, ErrorCategory, Result};
pub use keypair::{KeyGenerator, KeyPair, KeyStatus, SshKeygen};
pub use plan::{ClusterPlan, MasterNodeGroup, Node, NodeGroup, Role};
pub use secrets::{EnvVar, EnvironmentSecrets, SecretsGetter, StaticSecrets};
pub use state::{ClusterStatus, LastOperation, StateRecord};

use lifecycle::LifecycleDriver;
use reconcile::OutputReconciler;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tfkit::Client;

/// Version written into `terraform.tfvars` unless overridden.
pub const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Provisions and destroys clusters.
///
/// Holds no per-cluster state; every call re-reads the disk and
/// re-queries Terraform.
pub struct Provisioner {
    client: Client,
    providers_dir: PathBuf,
    state_dir: PathBuf,
    build_version: String,
    cluster_owner: String,
    secrets: Box<dyn SecretsGetter>,
    keygen: Box<dyn KeyGenerator>,
}

impl Provisioner {
    /// Create a provisioner reading secrets from the environment and
    /// generating keys with `ssh-keygen`.
    pub fn new(
        client: Client,
        providers_dir: impl Into<PathBuf>,
        state_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            providers_dir: providers_dir.into(),
            state_dir: state_dir.into(),
            build_version: BUILD_VERSION.to_string(),
            cluster_owner: String::new(),
            secrets: Box::new(EnvironmentSecrets),
            keygen: Box::new(SshKeygen::new()),
        }
    }

    /// Use a different secrets source.
    pub fn with_secrets(mut self, secrets: impl SecretsGetter + 'static) -> Self {
        self.secrets = Box::new(secrets);
        self
    }

    /// Use a different key generator.
    pub fn with_key_generator(mut self, keygen: impl KeyGenerator + 'static) -> Self {
        self.keygen = Box::new(keygen);
        self
    }

    /// Override the version written into the variables file.
    pub fn with_build_version(mut self, version: impl Into<String>) -> Self {
        self.build_version = version.into();
        self
    }

    /// Set the cluster owner written into the variables file.
    pub fn with_cluster_owner(mut self, owner: impl Into<String>) -> Self {
        self.cluster_owner = owner.into();
        self
    }

    /// Root of the provider directories.
    pub fn providers_dir(&self) -> &Path {
        &self.providers_dir
    }

    /// Root of the cluster state directories.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// State directory of one cluster.
    pub fn cluster_dir(&self, cluster: &str) -> PathBuf {
        self.state_dir.join(cluster)
    }

    /// Create or update the infrastructure for `plan`.
    ///
    /// Terraform output is streamed to `output`. On success the plan comes
    /// back with its SSH key path and every role's nodes filled in.
    pub fn provision(
        &self,
        mut plan: ClusterPlan,
        output: &mut (dyn Write + Send),
    ) -> Result<ClusterPlan> {
        plan.validate()?;
        let provider = ProviderDescriptor::load(&self.providers_dir, plan.provider())?;
        let cluster = plan.name().to_string();
        log::info!("Provisioning cluster {cluster} with provider {}", provider.name());

        let cluster_dir = self.cluster_dir(&cluster);
        create_state_dir(&cluster_dir)?;

        let keys = KeyPair::for_cluster(&cluster_dir, &cluster);
        keys.ensure(self.keygen.as_ref())?;
        plan.cluster.ssh.key = Some(keys.private_key().to_path_buf());

        variables::write(
            &cluster_dir,
            &plan,
            &keys,
            &self.build_version,
            &self.cluster_owner,
        )?;

        let env = lifecycle::resolve_secrets(self.secrets.as_ref(), &cluster, &provider)?;
        let driver = LifecycleDriver::new(&self.client, &cluster_dir, &cluster, &env);
        driver.init(provider.dir(), output)?;
        let artifact = driver.plan(provider.dir(), output)?;
        driver.apply(&artifact, output)?;

        let outputs = OutputReconciler::new(&self.client, driver.invocation());
        let plan = populate::populate(&outputs, plan)?;

        // Informational only; the infrastructure already exists.
        if let Err(e) = StateRecord::now(&cluster, provider.name(), LastOperation::Provision)
            .with_load_balancer(plan.master.load_balanced_fqdn.clone())
            .save(&cluster_dir)
        {
            log::warn!("Could not record provisioning of {cluster}: {e}");
        }
        log::info!("Cluster {cluster} provisioned");
        Ok(plan)
    }

    /// Tear down the infrastructure of `cluster`.
    ///
    /// The state directory and key pair are kept.
    pub fn destroy(
        &self,
        provider: &str,
        cluster: &str,
        output: &mut (dyn Write + Send),
    ) -> Result<()> {
        plan::validate_name("cluster", cluster)?;
        let provider = ProviderDescriptor::load(&self.providers_dir, provider)?;
        let cluster_dir = self.cluster_dir(cluster);
        if !cluster_dir.is_dir() {
            return Err(Error::ClusterNotFound {
                cluster: cluster.to_string(),
                dir: cluster_dir,
            });
        }
        log::info!("Destroying cluster {cluster} with provider {}", provider.name());

        let env = lifecycle::resolve_secrets(self.secrets.as_ref(), cluster, &provider)?;
        LifecycleDriver::new(&self.client, &cluster_dir, cluster, &env).destroy(output)?;

        StateRecord::now(cluster, provider.name(), LastOperation::Destroy).save(&cluster_dir)
    }
}

fn create_state_dir(path: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path).map_err(|source| Error::StateDir {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::tests::FakeKeygen;
    use crate::plan::tests::sample_plan;
    use tempfile::TempDir;
    use tfkit::{MockBackend, Operation};

    struct Fixture {
        _tmp: TempDir,
        providers: PathBuf,
        state: PathBuf,
        mock: MockBackend,
        keygen: FakeKeygen,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let providers = tmp.path().join("providers");
            let state = tmp.path().join("clusters");
            fs::create_dir_all(providers.join("aws")).unwrap();
            fs::write(
                providers.join("aws").join("provider.yaml"),
                "description: AWS\nenvironmentVariables:\n  access_key: AWS_ACCESS_KEY_ID\n",
            )
            .unwrap();
            Self {
                _tmp: tmp,
                providers,
                state,
                mock: MockBackend::new(),
                keygen: FakeKeygen::default(),
            }
        }

        fn provisioner(&self) -> Provisioner {
            Provisioner::new(
                Client::with_backend(Box::new(self.mock.clone())),
                &self.providers,
                &self.state,
            )
            .with_secrets(StaticSecrets::new().with("AWS_ACCESS_KEY_ID", "id"))
            .with_key_generator(self.keygen.clone())
            .with_build_version("1.0.0")
            .with_cluster_owner("ops")
        }

        fn set_outputs(&self) {
            for (role, ip, host) in [
                ("master", "1.1.1.1", "m1"),
                ("etcd", "2.2.2.2", "e1"),
                ("worker", "3.3.3.3", "w1"),
            ] {
                self.mock.set_output_values(format!("{role}_pub_ips"), &[ip]);
                self.mock
                    .set_output_values(format!("{role}_priv_ips"), &[format!("10.0.0.{}", &ip[..1])]);
                self.mock.set_output_values(format!("{role}_hosts"), &[host]);
            }
            self.mock.set_output_values("master_lb", &["lb.example.com"]);
        }
    }

    #[test]
    fn test_provision_end_to_end() {
        let fx = Fixture::new();
        fx.set_outputs();
        let mut out = Vec::new();

        let plan = fx
            .provisioner()
            .provision(sample_plan("demo"), &mut out)
            .unwrap();

        let cluster_dir = fx.state.join("demo");
        assert_eq!(plan.cluster.ssh.key, Some(cluster_dir.join("demo-ssh.pem")));
        assert_eq!(plan.master.nodes[0].ip, "1.1.1.1");
        assert_eq!(plan.master.load_balanced_short_name, "lb.example.com");
        assert_eq!(plan.etcd.nodes[0].internal_ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(plan.worker.nodes[0].host, "w1");
        assert_eq!(plan.ingress, NodeGroup::default());
        assert_eq!(plan.storage, NodeGroup::default());

        assert_eq!(
            fx.mock.operations()[..3],
            [Operation::Init, Operation::Plan, Operation::Apply]
        );
        assert!(
            fx.mock
                .queried_keys()
                .iter()
                .all(|k| !k.starts_with("ingress") && !k.starts_with("storage"))
        );
        for call in fx.mock.calls() {
            assert_eq!(call.working_dir, cluster_dir);
            assert!(call.env.contains(&("AWS_ACCESS_KEY_ID".to_string(), "id".to_string())));
        }
        assert_eq!(
            fx.mock.calls()[0].target.as_deref(),
            Some(fx.providers.join("aws").to_str().unwrap())
        );

        assert!(cluster_dir.join("terraform.tfvars").is_file());
        assert!(cluster_dir.join("provider.auto.tfvars").is_file());
        let record = StateRecord::load(&cluster_dir).unwrap().unwrap();
        assert_eq!(record.operation, LastOperation::Provision);
        assert_eq!(record.master_load_balancer.as_deref(), Some("lb.example.com"));
        assert_eq!(fx.keygen.count(), 1);
        assert!(!out.is_empty());
    }

    #[test]
    fn test_reprovision_reuses_keys() {
        let fx = Fixture::new();
        fx.set_outputs();
        let provisioner = fx.provisioner();

        let first = provisioner
            .provision(sample_plan("demo"), &mut std::io::sink())
            .unwrap();
        let second = provisioner
            .provision(sample_plan("demo"), &mut std::io::sink())
            .unwrap();
        assert_eq!(first.cluster.ssh.key, second.cluster.ssh.key);
        assert_eq!(fx.keygen.count(), 1);
    }

    #[test]
    fn test_invalid_plan_touches_nothing() {
        let fx = Fixture::new();
        let err = fx
            .provisioner()
            .provision(sample_plan("Bad Name"), &mut std::io::sink())
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(!fx.state.exists());
        assert!(fx.mock.calls().is_empty());
    }

    #[test]
    fn test_unknown_provider() {
        let fx = Fixture::new();
        let mut plan = sample_plan("demo");
        plan.provisioner.provider = "gcp".to_string();
        let err = fx
            .provisioner()
            .provision(plan, &mut std::io::sink())
            .unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound { .. }));
        assert!(!fx.state.exists());
    }

    #[test]
    fn test_inconsistent_keys_stop_before_terraform() {
        let fx = Fixture::new();
        let dir = fx.state.join("demo");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("demo-ssh.pem"), "orphan").unwrap();

        let err = fx
            .provisioner()
            .provision(sample_plan("demo"), &mut std::io::sink())
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::StateConsistency);
        assert!(fx.mock.calls().is_empty());
        assert!(!dir.join("terraform.tfvars").exists());
        assert_eq!(fx.keygen.count(), 0);
    }

    #[test]
    fn test_missing_secrets_stop_before_terraform() {
        let fx = Fixture::new();
        let provisioner = fx.provisioner().with_secrets(StaticSecrets::new());
        let err = provisioner
            .provision(sample_plan("demo"), &mut std::io::sink())
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::SecretResolution);
        assert!(fx.mock.calls().is_empty());
    }

    #[test]
    fn test_apply_failure_skips_outputs() {
        let fx = Fixture::new();
        fx.set_outputs();
        fx.mock.fail(Operation::Apply, "exit status: 1");

        let err = fx
            .provisioner()
            .provision(sample_plan("demo"), &mut std::io::sink())
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ExternalTool);
        assert!(fx.mock.queried_keys().is_empty());
        assert!(StateRecord::load(&fx.state.join("demo")).unwrap().is_none());
    }

    #[test]
    fn test_destroy() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.state.join("demo")).unwrap();

        fx.provisioner()
            .destroy("aws", "demo", &mut std::io::sink())
            .unwrap();
        assert_eq!(fx.mock.operations(), vec![Operation::Destroy]);
        let record = StateRecord::load(&fx.state.join("demo")).unwrap().unwrap();
        assert_eq!(record.operation, LastOperation::Destroy);
    }

    #[test]
    fn test_destroy_unknown_cluster() {
        let fx = Fixture::new();
        let err = fx
            .provisioner()
            .destroy("aws", "ghost", &mut std::io::sink())
            .unwrap_err();
        assert!(matches!(err, Error::ClusterNotFound { .. }));
        assert!(fx.mock.calls().is_empty());
    }

    #[test]
    fn test_destroy_rejects_names_outside_state_root() {
        let fx = Fixture::new();
        fs::create_dir_all(&fx.state).unwrap();
        let absolute = fx.state.join("demo");
        fs::create_dir_all(&absolute).unwrap();

        for cluster in ["..", "a/b", absolute.to_str().unwrap()] {
            let err = fx
                .provisioner()
                .destroy("aws", cluster, &mut std::io::sink())
                .unwrap_err();
            assert!(
                matches!(err, Error::InvalidName { kind: "cluster", .. }),
                "{cluster:?} accepted"
            );
        }
        assert!(fx.mock.calls().is_empty());
        assert!(!fx.state.join(state::RECORD_FILE).exists());
        assert!(!fx.state.parent().unwrap().join(state::RECORD_FILE).exists());
    }

    #[test]
    fn test_destroy_rejects_provider_outside_root() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.state.join("demo")).unwrap();
        let err = fx
            .provisioner()
            .destroy("../providers/aws", "demo", &mut std::io::sink())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidName { kind: "provider", .. }));
        assert!(fx.mock.calls().is_empty());
    }

    #[test]
    fn test_unwritable_state_record_keeps_populated_plan() {
        let fx = Fixture::new();
        fx.set_outputs();
        let dir = fx.state.join("demo");
        fs::create_dir_all(&dir).unwrap();
        // A directory in the record's place makes the write fail for any user.
        fs::create_dir(dir.join(state::RECORD_FILE)).unwrap();

        let plan = fx
            .provisioner()
            .provision(sample_plan("demo"), &mut std::io::sink())
            .unwrap();
        assert_eq!(plan.master.load_balanced_fqdn, "lb.example.com");
        assert!(dir.join(state::RECORD_FILE).is_dir());
    }
}
