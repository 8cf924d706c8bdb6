use clap::{Parser, Subcommand};
use hn_case::{CaseDef, CaseResult};
use hn_model::{Catalogue, GeometryRepr, Network};
use hn_record::RecordFile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hn-cli")]
#[command(about = "HydroNet CLI - hydraulic network case tool", long_about = None)]
struct Cli {
    /// Component-type catalogue replacing the built-in one
    #[arg(long, global = true)]
    catalogue: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check required inputs and connectivity of a case
    Validate {
        /// Path to the case file (YAML or JSON)
        case_path: PathBuf,
    },
    /// Switch a pipe to another geometry representation
    Geometry {
        /// Path to the case file
        case_path: PathBuf,
        /// Qualified pipe name (e.g., PIPE.P1)
        pipe: String,
        /// Target representation: length-elevation, l-h, xyz or xyz-dif
        repr: String,
        /// Output case file (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the items of a case into a record file
    Export {
        /// Path to the case file
        case_path: PathBuf,
        /// Record file to create
        record_path: PathBuf,
    },
    /// List the contents of a record file
    Inspect {
        /// Path to the record file
        record_path: PathBuf,
    },
    /// Apply a tab-delimited template to one item
    Template {
        /// Path to the case file
        case_path: PathBuf,
        /// Qualified item name (e.g., VALVE.V1)
        item: String,
        /// Template text file
        template_path: PathBuf,
        /// Output case file (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> CaseResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let catalogue = load_catalogue(cli.catalogue.as_deref())?;

    match cli.command {
        Commands::Validate { case_path } => cmd_validate(&case_path, catalogue),
        Commands::Geometry {
            case_path,
            pipe,
            repr,
            output,
        } => cmd_geometry(&case_path, &pipe, &repr, output.as_deref(), catalogue),
        Commands::Export {
            case_path,
            record_path,
        } => cmd_export(&case_path, &record_path, catalogue),
        Commands::Inspect { record_path } => cmd_inspect(&record_path),
        Commands::Template {
            case_path,
            item,
            template_path,
            output,
        } => cmd_template(
            &case_path,
            &item,
            &template_path,
            output.as_deref(),
            catalogue,
        ),
    }
}

fn load_catalogue(path: Option<&Path>) -> CaseResult<Arc<Catalogue>> {
    let catalogue = match path {
        Some(p) => {
            let catalogue = Catalogue::load(p)?;
            tracing::info!(path = %p.display(), "user catalogue loaded");
            catalogue
        }
        None => Catalogue::builtin()?,
    };
    Ok(Arc::new(catalogue))
}

fn open_case(case_path: &Path, catalogue: Arc<Catalogue>) -> CaseResult<(CaseDef, Network)> {
    let case = hn_case::load(case_path)?;
    let network = hn_case::build_network(&case, catalogue)?;
    Ok((case, network))
}

fn save_case(network: &Network, case: &CaseDef, target: &Path) -> CaseResult<()> {
    let mut updated = hn_case::snapshot(network, &case.name);
    updated.view_mask = case.view_mask;
    hn_case::save(target, &updated)?;
    println!("✓ Saved {}", target.display());
    Ok(())
}

fn cmd_validate(case_path: &Path, catalogue: Arc<Catalogue>) -> CaseResult<()> {
    println!("Validating case: {}", case_path.display());
    let (case, network) = open_case(case_path, catalogue)?;
    let report = network.validate()?;

    println!("  {} items in '{}'", network.len(), case.name);
    for item in &report.items {
        println!("  {} needs: {}", item.name, item.missing.join(", "));
    }
    for issue in &report.connectivity {
        println!("  {issue}");
    }
    if report.is_complete() {
        println!("✓ Case is complete");
    } else {
        println!(
            "✗ {} missing inputs, {} connectivity issues",
            report.missing_count(),
            report.connectivity.len()
        );
    }
    Ok(())
}

fn cmd_geometry(
    case_path: &Path,
    pipe: &str,
    repr: &str,
    output: Option<&Path>,
    catalogue: Arc<Catalogue>,
) -> CaseResult<()> {
    let target: GeometryRepr = repr.parse()?;
    let (case, mut network) = open_case(case_path, catalogue)?;
    let id = network.named(pipe)?;
    if network.switch_pipe_geometry(id, target)? {
        let length = network.item(id)?.get_scalar("Length")?;
        println!("✓ {pipe} is now {target} (length {length:.3})");
        save_case(&network, &case, output.unwrap_or(case_path))?;
    } else {
        println!("✗ {pipe} not switched: its current geometry has fewer than 2 points");
    }
    Ok(())
}

fn cmd_export(case_path: &Path, record_path: &Path, catalogue: Arc<Catalogue>) -> CaseResult<()> {
    let (case, network) = open_case(case_path, catalogue)?;
    let mut file = RecordFile::create(record_path)?;
    let header = hn_case::write_network(&network, &case.name, &mut file)?;
    println!("✓ Exported {} items to {}", header.item_count, record_path.display());
    println!("  Digest: {}", header.digest);
    Ok(())
}

fn cmd_inspect(record_path: &Path) -> CaseResult<()> {
    let file = RecordFile::open(record_path)?;
    if let Ok(header) = hn_case::read_header(&file) {
        println!("Case: {} ({} items)", header.case_name, header.item_count);
        println!("  Created: {}", header.created);
        println!("  Digest: {}", header.digest);
    }
    for group in file.groups() {
        println!("{group}/");
        for cell in file.cells(&group)? {
            println!("  {cell}/");
            for element in file.elements(&group, &cell)? {
                let def = file.element_def(hn_record::ElementPath::new(&group, &cell, &element))?;
                let dims: Vec<String> = def.dims.iter().map(ToString::to_string).collect();
                println!("    {element}: {} [{}]", def.element_type, dims.join("x"));
            }
        }
    }
    Ok(())
}

fn cmd_template(
    case_path: &Path,
    item: &str,
    template_path: &Path,
    output: Option<&Path>,
    catalogue: Arc<Catalogue>,
) -> CaseResult<()> {
    let text = std::fs::read_to_string(template_path)?;
    let (case, mut network) = open_case(case_path, catalogue)?;
    let id = network.named(item)?;
    let target = network.item_mut(id)?;
    let report = target.add_data_from_template(&text);
    for message in target.messages() {
        println!("  {}", message.text);
    }
    println!(
        "✓ Applied {} entries to {item} ({} skipped)",
        report.applied, report.skipped
    );
    save_case(&network, &case, output.unwrap_or(case_path))?;
    Ok(())
}
