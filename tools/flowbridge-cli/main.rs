use clap::{Parser, ValueEnum};
use flowbridge::prelude::*;
use flowbridge::report::ReportFormatter;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Define a CLI-specific enum for clap to parse.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum DialectCli {
    Mule,
    Boomi,
    Webmethods,
}

impl From<DialectCli> for DialectId {
    fn from(value: DialectCli) -> Self {
        match value {
            DialectCli::Mule => DialectId::Mule,
            DialectCli::Boomi => DialectId::Boomi,
            DialectCli::Webmethods => DialectId::WebMethods,
        }
    }
}

/// Converts Mule, Boomi and webMethods flows into BPMN integration-flow XML
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source documents belonging to one flow
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// The dialect of every source document
    #[arg(short, long, value_enum)]
    dialect: DialectCli,

    /// Flow identifier (defaults to the first file's stem)
    #[arg(long)]
    flow_id: Option<String>,

    /// Pipeline configuration in TOML
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mapping table JSON replacing the built-in table
    #[arg(short, long)]
    mapping_table: Option<PathBuf>,

    /// Where to write the generated document (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    report_json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let total_start = Instant::now();

    // --- 1. Pipeline Setup ---
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e))),
        None => {
            let mut config = PipelineConfig::default();
            config
                .apply_env_overrides()
                .unwrap_or_else(|e| exit_with_error(&format!("Invalid environment: {}", e)));
            config
        }
    };

    let mut builder = Pipeline::builder().with_config(config);
    if let Some(path) = &cli.mapping_table {
        let json = fs::read_to_string(path).unwrap_or_else(|e| {
            exit_with_error(&format!(
                "Failed to read mapping table '{}': {}",
                path.display(),
                e
            ))
        });
        let table = MappingTable::from_json_str(&json)
            .unwrap_or_else(|e| exit_with_error(&format!("Invalid mapping table: {}", e)));
        builder = builder.with_mapping_table(table);
    }
    let pipeline = builder
        .build()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to build pipeline: {}", e)));

    // --- 2. Source Loading ---
    let flow_id = cli.flow_id.clone().unwrap_or_else(|| {
        cli.files
            .first()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "flow".to_string())
    });
    let dialect = DialectId::from(cli.dialect);
    let mut bundle = FlowBundle::new(flow_id.clone(), flow_id);
    for path in &cli.files {
        let bytes = fs::read(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to read '{}': {}", path.display(), e))
        });
        bundle = bundle.with_document(SourceDocument::new(
            path.display().to_string(),
            dialect,
            bytes,
        ));
    }

    // --- 3. Conversion ---
    let (output, report) = match pipeline.run(&bundle) {
        Ok(output) => {
            let report = output.report.clone();
            (Some(output), report)
        }
        Err(e) => {
            eprintln!("\nError: {}", e);
            (None, e.report().cloned().unwrap_or_default())
        }
    };

    if cli.report_json {
        match report.to_json() {
            Ok(json) => eprintln!("{}", json),
            Err(e) => exit_with_error(&format!("Failed to serialize report: {}", e)),
        }
    } else {
        eprintln!("\n{}", ReportFormatter::format_report(&report));
    }

    let Some(output) = output else {
        std::process::exit(1);
    };

    // --- 4. Output ---
    let xml = output
        .document
        .to_xml_string()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize document: {}", e)));
    match &cli.output {
        Some(path) => {
            fs::write(path, xml).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to write '{}': {}", path.display(), e))
            });
            eprintln!(
                "Wrote {} nodes and {} edges to {} in {:?}",
                output.manifest.node_count,
                output.manifest.edge_count,
                path.display(),
                total_start.elapsed()
            );
        }
        None => println!("{}", xml),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
