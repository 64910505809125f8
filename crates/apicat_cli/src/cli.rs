use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "apicat", about = "Catalog of API services and their published specs", version)]
pub struct Cli {
    /// TOML config file; `APICAT_*` variables override its values.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register, inspect and rename services
    #[command(subcommand)]
    Service(ServiceCommand),
    /// List and publish specification versions
    #[command(subcommand)]
    Version(VersionCommand),
}

#[derive(Subcommand)]
pub enum ServiceCommand {
    /// Register a service under a generated id
    Create(CreateServiceArgs),
    /// Show one service
    Get(ServiceIdArgs),
    /// List every service
    List,
    /// Change a service's name
    Rename(RenameServiceArgs),
    /// Delete a service record
    Delete(ServiceIdArgs),
}

#[derive(Args)]
pub struct CreateServiceArgs {
    pub name: String,
}

#[derive(Args)]
pub struct ServiceIdArgs {
    pub id: String,
}

#[derive(Args)]
pub struct RenameServiceArgs {
    pub id: String,
    pub name: String,
}

#[derive(Subcommand)]
pub enum VersionCommand {
    /// List the versions of a service in publish order
    List(ServiceIdArgs),
    /// Upload a spec document as a version of a service
    Upload(UploadArgs),
    /// Repoint an existing version and change its flag or tag
    Update(UpdateVersionArgs),
}

#[derive(Args)]
pub struct UpdateVersionArgs {
    pub service_id: String,
    pub version: String,
    /// Blob key of the artifact
    #[arg(long)]
    pub path: String,
    #[arg(long)]
    pub tag: String,
    /// Mark the version as disabled
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Args)]
pub struct UploadArgs {
    pub service_id: String,
    /// Spec document to upload
    pub file: PathBuf,
    /// Document version, e.g. `1.2.0`
    #[arg(long = "spec-version")]
    pub spec_version: String,
    /// `yaml`, `yml` or `json`; taken from the file extension when omitted
    #[arg(long)]
    pub format: Option<String>,
    #[arg(long, default_value = "latest")]
    pub tag: String,
    /// Publish the version as disabled
    #[arg(long)]
    pub disabled: bool,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, VersionCommand};
    use clap::{CommandFactory, Parser};

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn upload_defaults_to_enabled_latest() {
        let cli = Cli::try_parse_from([
            "apicat",
            "version",
            "upload",
            "S1",
            "spec.yaml",
            "--spec-version",
            "1.0.0",
        ])
        .unwrap();

        match cli.command {
            Command::Version(VersionCommand::Upload(args)) => {
                assert_eq!(args.service_id, "S1");
                assert_eq!(args.tag, "latest");
                assert!(!args.disabled);
                assert!(args.format.is_none());
            }
            _ => panic!("expected version upload"),
        }
    }

    #[test]
    fn update_takes_key_positionally_and_requires_path() {
        let cli = Cli::try_parse_from([
            "apicat",
            "version",
            "update",
            "S1",
            "1.0.0",
            "--path",
            "k2",
            "--tag",
            "beta",
            "--disabled",
        ])
        .unwrap();
        match cli.command {
            Command::Version(VersionCommand::Update(args)) => {
                assert_eq!(args.service_id, "S1");
                assert_eq!(args.version, "1.0.0");
                assert_eq!(args.path, "k2");
                assert!(args.disabled);
            }
            _ => panic!("expected version update"),
        }

        let missing_path =
            Cli::try_parse_from(["apicat", "version", "update", "S1", "1.0.0", "--tag", "x"]);
        assert!(missing_path.is_err());
    }
}
