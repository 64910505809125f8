use crate::cli::{Cli, Command, ServiceCommand, UploadArgs, VersionCommand};
use anyhow::{anyhow, bail, Context};
use apicat_core::{
    init_from_config, Catalog, CatalogConfig, PublishRequest, VersionUpdateRequest,
};
use serde::Serialize;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => CatalogConfig::load(path)
            .with_context(|| format!("loading config `{}`", path.display()))?,
        None => CatalogConfig::from_env().context("loading config from environment")?,
    };
    init_from_config(&config).context("initializing logging")?;

    let catalog = Catalog::open(config).context("opening catalog")?;
    let service = catalog.catalog_service();

    match cli.command {
        Command::Service(ServiceCommand::Create(args)) => {
            print_json(&service.register_service(&args.name)?)
        }
        Command::Service(ServiceCommand::Get(args)) => match service.get_service(&args.id)? {
            Some(record) => print_json(&record),
            None => bail!("service `{}` not found", args.id),
        },
        Command::Service(ServiceCommand::List) => print_json(&service.list_services()?),
        Command::Service(ServiceCommand::Rename(args)) => {
            print_json(&service.rename_service(&args.id, &args.name)?)
        }
        Command::Service(ServiceCommand::Delete(args)) => {
            match service.delete_service(&args.id)? {
                Some(record) => print_json(&record),
                None => bail!("service `{}` not found", args.id),
            }
        }
        Command::Version(VersionCommand::List(args)) => {
            print_json(&service.list_versions(&args.id)?)
        }
        Command::Version(VersionCommand::Upload(args)) => {
            let request = publish_request(&args)?;
            print_json(&service.publish_version(&args.service_id, &request)?)
        }
        Command::Version(VersionCommand::Update(args)) => {
            let request = VersionUpdateRequest {
                path: args.path,
                enabled: !args.disabled,
                tag: args.tag,
            };
            print_json(&service.update_version(&args.service_id, &args.version, &request)?)
        }
    }
}

fn publish_request(args: &UploadArgs) -> anyhow::Result<PublishRequest> {
    let format = match &args.format {
        Some(format) => format.clone(),
        None => args
            .file
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow!(
                    "cannot infer format of `{}`; pass --format",
                    args.file.display()
                )
            })?,
    };
    let contents = std::fs::read(&args.file)
        .with_context(|| format!("reading `{}`", args.file.display()))?;

    Ok(PublishRequest {
        version: args.spec_version.clone(),
        format,
        enabled: !args.disabled,
        tag: args.tag.clone(),
        contents,
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
