use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{HarvestConfig, Subject};
use crate::harvest::Category;

#[derive(Parser)]
#[command(
    name = "lookout",
    version,
    about = "Harvest brand-risk news and reports from web search into a CSV report"
)]
pub struct Cli {
    /// TOML config file (default: $LOOKOUT_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the harvest and write the report (default)
    Run(RunArgs),
    /// Print the query matrix without calling any backend
    Plan(SelectArgs),
}

#[derive(Args, Default)]
pub struct SelectArgs {
    /// Only harvest this subject (repeatable)
    #[arg(long = "subject", value_name = "NAME")]
    pub subjects: Vec<String>,

    /// Only query this category, in the given order (repeatable)
    #[arg(long = "category", value_name = "CATEGORY", value_parser = parse_category)]
    pub categories: Vec<Category>,
}

#[derive(Args, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Report path; `{date}` expands to the run date
    #[arg(short, long)]
    pub output: Option<String>,

    /// Search region, e.g. es-es or wt-wt
    #[arg(long)]
    pub region: Option<String>,
}

impl SelectArgs {
    /// Subjects already in the config keep their groups. Repeats of one
    /// subject, up to space and case, collapse into its first mention.
    pub fn apply(&self, config: &mut HarvestConfig) {
        if !self.subjects.is_empty() {
            config.subjects = self
                .subjects
                .iter()
                .fold(Vec::<Subject>::new(), |mut picked, name| {
                    if !picked.iter().any(|s| s.is_named(name)) {
                        let subject = config
                            .subjects
                            .iter()
                            .find(|s| s.is_named(name))
                            .cloned()
                            .unwrap_or_else(|| Subject::new(name.trim()));
                        picked.push(subject);
                    }
                    picked
                });
        }
        if !self.categories.is_empty() {
            config.categories = self.categories.clone();
        }
    }
}

impl RunArgs {
    pub fn apply(&self, config: &mut HarvestConfig) {
        self.select.apply(config);
        if let Some(ref output) = self.output {
            config.output = output.clone();
        }
        if let Some(ref region) = self.region {
            config.backend.region = region.clone();
        }
    }
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::parse(s).ok_or_else(|| {
        let known: Vec<_> = Category::all().iter().map(|c| c.label()).collect();
        format!("unknown category '{s}' (expected one of: {})", known.join(", "))
    })
}
