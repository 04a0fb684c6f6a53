use clap::{Parser, ValueEnum};
use schemars::gen::SchemaSettings;
use tenant_control_plane::crd::TenantControlPlaneStatus;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

/// Print the OpenAPI v3 schema of the TenantControlPlane status
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output format
    #[arg(long, env = "STATUSGEN_FORMAT", value_enum, default_value_t = Format::Yaml)]
    format: Format,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let schema = SchemaSettings::openapi3()
        .into_generator()
        .into_root_schema_for::<TenantControlPlaneStatus>();
    debug!(
        definitions = schema.definitions.len(),
        format = ?args.format,
        "Generated status schema"
    );

    let output = match args.format {
        Format::Yaml => serde_yaml::to_string(&schema)?,
        Format::Json => serde_json::to_string_pretty(&schema)?,
    };
    print!("{output}");
    Ok(())
}
