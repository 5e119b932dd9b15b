//! fm - field ownership CLI.
//!
//! Runs apply and update writes against YAML objects on disk, carrying
//! ownership records in the object's `metadata.managedFields` list the
//! same way a server would.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use field_manager::manager::{
    field_manager_or_user_agent, managed_from_object, managed_to_object,
    remove_object_field_manager, validate_field_manager, DeducedTypeConverter, GroupVersion,
    IdentityVersionConverter, NoopDefaulter, StructuredMergeManager, UpdatePreparers,
};
use field_manager::{ManagerIdentity, Object, Operation, TypedValue};
use field_manager::value::{from_yaml, to_yaml};

#[derive(Debug, Parser)]
#[command(name = "fm", version, about = "Field ownership over YAML objects")]
struct Cli {
    /// Manager name attributed to the write.
    #[arg(short, long, global = true, default_value = "")]
    manager: String,

    /// Output location. Use '-' for stdout.
    #[arg(short, long, global = true, default_value = "-")]
    output: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge a partial patch into a live object, tracking ownership.
    Apply {
        /// Live object file; omit for a fresh object.
        #[arg(long)]
        live: Option<PathBuf>,
        /// Patch file (full intent of the applier).
        #[arg(long)]
        patch: PathBuf,
        /// Take disputed fields from their current owners.
        #[arg(long)]
        force: bool,
    },
    /// Replace a live object wholesale, recording what changed.
    Update {
        /// Live object file; omit for a fresh object.
        #[arg(long)]
        live: Option<PathBuf>,
        /// Replacement object file.
        #[arg(long)]
        new: PathBuf,
    },
    /// Print the field set a YAML object covers.
    Fieldset {
        /// Object file.
        file: PathBuf,
    },
    /// Print the ownership records stored on an object.
    Managers {
        /// Object file.
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut output: Box<dyn Write> = if cli.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(
            fs::File::create(&cli.output)
                .map_err(|e| format!("Failed to create output file {:?}: {}", cli.output, e))?,
        )
    };

    match cli.command {
        Command::Apply { live, patch, force } => {
            apply(live.as_deref(), &patch, &cli.manager, force, &mut output)
        }
        Command::Update { live, new } => {
            update(live.as_deref(), &new, &cli.manager, &mut output)
        }
        Command::Fieldset { file } => fieldset(&file, &mut output),
        Command::Managers { file } => managers(&file, &mut output),
    }
}

fn read_object(path: &std::path::Path) -> Result<Object, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read file {:?}: {}", path, e))?;
    let value = from_yaml(&content).map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;
    Ok(Object::new(value)?)
}

fn read_live(path: Option<&std::path::Path>) -> Result<Object, Box<dyn std::error::Error>> {
    match path {
        Some(p) => read_object(p),
        None => Ok(Object::empty()),
    }
}

fn manager_for(obj: &Object) -> Result<StructuredMergeManager, Box<dyn std::error::Error>> {
    let gv = GroupVersion::from_object(obj).ok_or("object has no apiVersion")?;
    Ok(StructuredMergeManager::new(
        Arc::new(DeducedTypeConverter::new()),
        Arc::new(IdentityVersionConverter::new(gv.clone())),
        Arc::new(NoopDefaulter),
        UpdatePreparers::new(),
        gv.clone(),
        gv,
    ))
}

fn resolve_manager(name: &str) -> Result<String, Box<dyn std::error::Error>> {
    validate_field_manager(name)?;
    Ok(field_manager_or_user_agent(name, ""))
}

/// Detaches the bookkeeping the merge must not see as content.
fn strip_bookkeeping(obj: &mut Object) {
    obj.set_managed_fields(None);
    remove_object_field_manager(obj);
}

fn write_result(
    mut obj: Object,
    managed: &field_manager::Managed,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    managed_to_object(managed, &mut obj)?;
    let yaml = to_yaml(obj.as_value())?;
    write!(output, "{}", yaml)?;
    Ok(())
}

fn apply(
    live_path: Option<&std::path::Path>,
    patch_path: &std::path::Path,
    manager_name: &str,
    force: bool,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut live = read_live(live_path)?;
    let patch = read_object(patch_path)?;

    let managed = managed_from_object(&live)?;
    strip_bookkeeping(&mut live);

    let name = resolve_manager(manager_name)?;
    let mgr = manager_for(&patch)?;

    let (merged, managed) = mgr.apply(&live, &patch, &managed, &name, force)?;
    let managed = managed.with_time(
        ManagerIdentity::new(&name, Operation::Apply),
        chrono::Utc::now(),
    );

    match merged {
        Some(obj) => write_result(obj, &managed, output),
        None => {
            writeln!(output, "null")?;
            Ok(())
        }
    }
}

fn update(
    live_path: Option<&std::path::Path>,
    new_path: &std::path::Path,
    manager_name: &str,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut live = read_live(live_path)?;
    let mut new = read_object(new_path)?;

    let managed = managed_from_object(&live)?;
    strip_bookkeeping(&mut live);
    strip_bookkeeping(&mut new);

    let name = resolve_manager(manager_name)?;
    let mgr = manager_for(&new)?;

    let (out, managed) = mgr.update(&live, &new, &managed, &name)?;
    let managed = managed.with_time(
        ManagerIdentity::new(&name, Operation::Update),
        chrono::Utc::now(),
    );

    write_result(out, &managed, output)
}

fn fieldset(
    path: &std::path::Path,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut obj = read_object(path)?;
    strip_bookkeeping(&mut obj);

    let typed = TypedValue::deduced(obj.into_value());
    let set = typed.to_field_set()?;

    for path in set.paths() {
        writeln!(output, "{}", path)?;
    }
    Ok(())
}

fn managers(
    path: &std::path::Path,
    output: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let obj = read_object(path)?;
    let managed = managed_from_object(&obj)?;

    if managed.fields().is_empty() {
        writeln!(output, "No ownership records")?;
        return Ok(());
    }
    for (identity, vs) in managed.fields().iter() {
        writeln!(output, "{} ({}):", identity, vs.api_version())?;
        for path in vs.set().paths() {
            writeln!(output, "  {}", path)?;
        }
    }
    Ok(())
}
