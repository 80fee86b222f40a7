use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tangjeon_core::*;

#[derive(Parser)]
#[command(name = "tangjeon")]
#[command(about = "Herbal decoction prescription calculator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Formula template catalog (.json or .csv)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Herb ordering table (CSV with id,name)
    #[arg(long, global = true)]
    herb_order: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a prescription from a formula expression
    Compute {
        /// Formula expression, e.g. "소시호 반하사심*1.5"
        formula: String,

        /// Number of doses (첩)
        #[arg(long)]
        doses: Option<f64>,

        /// Treatment days
        #[arg(long)]
        days: Option<u32>,

        /// Doses per day
        #[arg(long)]
        per_day: Option<u32>,

        /// Volume of one pack in ml
        #[arg(long)]
        pack_volume: Option<u32>,

        /// Manual adjustments, e.g. "녹용37-인삼30"
        #[arg(long, default_value = "")]
        adjust: String,
    },

    /// Show which template a name matches
    Lookup {
        name: String,
    },

    /// Show a template with its resolved ingredients
    Show {
        name: String,
    },

    /// Search templates by name, alias or composition
    Search {
        #[arg(value_parser = parse_search_term)]
        term: String,

        /// Only templates in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Check the catalog for problems
    Validate,
}

fn parse_search_term(term: &str) -> std::result::Result<String, String> {
    if term.trim().chars().count() < 2 {
        return Err("search term must be at least 2 characters".into());
    }
    Ok(term.trim().to_string())
}

fn main() -> ExitCode {
    // Initialize logging
    tangjeon_core::logging::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let catalog = load_catalog(cli.catalog.as_deref(), &config)?;

    match cli.command {
        Commands::Compute {
            formula,
            doses,
            days,
            per_day,
            pack_volume,
            adjust,
        } => {
            let mut inputs = config.dispensing.inputs_for(formula);
            inputs.total_doses = doses.unwrap_or(inputs.total_doses);
            inputs.days = days.unwrap_or(inputs.days);
            inputs.doses_per_day = per_day.unwrap_or(inputs.doses_per_day);
            inputs.pack_volume_ml = pack_volume.unwrap_or(inputs.pack_volume_ml);
            inputs.adjustment = adjust;
            let herb_order = load_herb_order(cli.herb_order.as_deref(), &config)?;
            cmd_compute(&inputs, &catalog, &herb_order, &config, cli.json)
        }
        Commands::Lookup { name } => cmd_lookup(&name, &catalog, cli.json),
        Commands::Show { name } => cmd_show(&name, &catalog, cli.json),
        Commands::Search { term, category } => {
            cmd_search(&term, category.as_deref(), &catalog, cli.json)
        }
        Commands::Validate => cmd_validate(&catalog),
    }
}

fn load_catalog(flag: Option<&Path>, config: &Config) -> Result<TemplateCatalog> {
    let suffixes = config.matching.suffixes.clone();
    match flag.or(config.data.catalog_path.as_deref()) {
        Some(path) => TemplateCatalog::load(path, suffixes),
        None => {
            tracing::info!("No catalog configured, using the built-in sample catalog");
            Ok(TemplateCatalog::with_suffixes(
                sample_catalog().templates().to_vec(),
                suffixes,
            ))
        }
    }
}

fn load_herb_order(flag: Option<&Path>, config: &Config) -> Result<HerbOrder> {
    match flag.or(config.data.herb_order_path.as_deref()) {
        Some(path) => HerbOrder::load_csv(path),
        None => Ok(HerbOrder::default()),
    }
}

fn cmd_compute(
    inputs: &PrescriptionInputs,
    catalog: &TemplateCatalog,
    herb_order: &HerbOrder,
    config: &Config,
    json: bool,
) -> Result<()> {
    let computation = compute(inputs, catalog, herb_order, &config.decoction)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&computation)?);
        return Ok(());
    }

    let plan = &computation.plan;
    println!("Formula: {}", computation.formula);
    println!("Composition: {}", format_composition(&computation.merged));
    println!();
    println!("Per dose ({}g):", plan.total_dosage);
    for herb in &computation.merged {
        println!("  {:<8} {:>6}g", herb.name, herb.dosage);
    }
    println!();
    println!("Final ({} doses):", plan.total_doses);
    for herb in &computation.final_ingredients {
        println!("  {:<8} {:>6}g", herb.herb_name, herb.total_grams);
    }
    println!();
    println!("Total herbs: {}g", plan.final_total_grams);
    println!(
        "Packs: {} ({} days x {}/day, {}ml each)",
        plan.total_packs, plan.days, plan.doses_per_day, plan.pack_volume_ml
    );
    println!("Water: {}ml", plan.water_volume_ml);

    if let Some(doses) = computation.recommended_doses {
        println!();
        println!(
            "Recommended doses: {} (per-dose total above {}g)",
            doses, config.decoction.target_grams_per_dose
        );
    }

    Ok(())
}

fn cmd_lookup(name: &str, catalog: &TemplateCatalog, json: bool) -> Result<()> {
    let name = name.trim();
    match catalog.matcher().lookup(name) {
        MatchOutcome::Found(template) => {
            if json {
                println!("{}", serde_json::to_string_pretty(template)?);
            } else {
                println!("{} -> {} (id {})", name, template.name, template.id);
            }
            Ok(())
        }
        MatchOutcome::NotFound => Err(Error::UnresolvedReference(vec![name.to_string()])),
        MatchOutcome::Ambiguous(candidates) => Err(Error::AmbiguousReference(vec![
            AmbiguousTerm {
                term: name.to_string(),
                candidates,
            },
        ])),
    }
}

fn cmd_show(name: &str, catalog: &TemplateCatalog, json: bool) -> Result<()> {
    let name = name.trim();
    let template = match catalog.matcher().lookup(name) {
        MatchOutcome::Found(template) => template,
        MatchOutcome::NotFound => {
            return Err(Error::UnresolvedReference(vec![name.to_string()]))
        }
        MatchOutcome::Ambiguous(candidates) => {
            return Err(Error::AmbiguousReference(vec![AmbiguousTerm {
                term: name.to_string(),
                candidates,
            }]))
        }
    };

    let resolved = catalog.resolve(template).ok_or_else(|| {
        Error::CatalogValidation(format!("Template '{}' is not in the catalog", template.name))
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(resolved)?);
        return Ok(());
    }

    println!("{} (id {})", template.name, template.id);
    if let Some(ref alias) = template.alias {
        println!("  Alias:    {}", alias);
    }
    if let Some(ref category) = template.category {
        println!("  Category: {}", category);
    }
    if let Some(ref source) = template.source {
        println!("  Source:   {}", source);
    }
    println!("  Composition: {}", template.composition);
    if is_compound(&template.composition) {
        println!("  Resolved:    {}", format_composition(&resolved.ingredients));
    }
    println!();
    for herb in &resolved.ingredients {
        println!("  {:<8} {:>6}g", herb.name, herb.dosage);
    }
    println!("  Total: {}g", resolved.total_dosage());

    Ok(())
}

fn cmd_search(
    term: &str,
    category: Option<&str>,
    catalog: &TemplateCatalog,
    json: bool,
) -> Result<()> {
    let hits = catalog.search(term, category);

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No templates match '{}'", term);
        return Ok(());
    }

    for template in hits {
        let category = template.category.as_deref().unwrap_or("-");
        match template.alias {
            Some(ref alias) => println!(
                "{:>5}  {} ({})  [{}]",
                template.id, template.name, alias, category
            ),
            None => println!("{:>5}  {}  [{}]", template.id, template.name, category),
        }
        println!("       {}", template.composition);
    }

    Ok(())
}

fn cmd_validate(catalog: &TemplateCatalog) -> Result<()> {
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in &errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation(format!(
            "{} problem(s) in catalog",
            errors.len()
        )));
    }

    println!("✓ {} templates, no problems found", catalog.len());
    Ok(())
}
