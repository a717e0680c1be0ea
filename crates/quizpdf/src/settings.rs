use std::path::{Path, PathBuf};

use colored::Colorize;
use pdf::RasterOptions;
use quizpdf_core::config::ConfigFile;
use quizpdf_core::SegmenterConfig;

use crate::prelude::{println, *};

/// Segmentation settings shared by every subcommand.
#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone, Default)]
pub struct SegmenterArgs {
    /// TOML file with segmentation settings
    #[arg(long, env = "QUIZPDF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Font-name substring that marks a bold weight. Repeat to pass several;
    /// replaces the configured list
    #[arg(long = "bold-hint", value_name = "HINT")]
    pub bold_hints: Vec<String>,
}

impl SegmenterArgs {
    /// Read the config file (if any), then apply flag overrides.
    pub fn load(&self) -> Result<SegmenterConfig> {
        let mut file = match &self.config {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };

        if !self.bold_hints.is_empty() {
            file.bold_hints = self.bold_hints.clone();
        }

        SegmenterConfig::try_from(file).map_err(|e| Error::Config(e.to_string()).into())
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| f!("Failed to read config file {}", path.display()))?;
    ConfigFile::from_toml_str(&text)
        .map_err(|e| Error::Config(f!("{}: {}", path.display(), e)).into())
}

/// Resolution of the cropped figures.
#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct RasterArgs {
    /// Render figures at this many dots per inch
    #[arg(
        long,
        env = "QUIZPDF_DPI",
        default_value_t = pdf::DEFAULT_DPI,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub dpi: u32,

    /// Keep the embedded images' native pixel size instead of resampling
    #[arg(long, conflicts_with = "dpi")]
    pub native: bool,
}

impl RasterArgs {
    pub fn options(&self) -> RasterOptions {
        RasterOptions {
            dpi: (!self.native).then_some(self.dpi),
        }
    }
}

/// Print the effective configuration.
pub fn print_settings(config: &SegmenterConfig, raster: &RasterOptions, out_dir: Option<&Path>) {
    println!("{}", "Effective configuration".cyan().bold());

    let mut table = new_table();
    table.add_row(prettytable::row!["Bold hints", config.bold_hints.join(", ")]);
    table.add_row(prettytable::row!["Bold window", config.bold_window]);
    table.add_row(prettytable::row!["Start pattern", config.start_pattern.as_str()]);
    table.add_row(prettytable::row![
        "Fallback pattern",
        config.fallback_pattern.as_str()
    ]);
    table.add_row(prettytable::row!["Line quantum", config.line_quantum]);
    let resolution = match raster.dpi {
        Some(dpi) => f!("{} dpi", dpi),
        None => "native".to_string(),
    };
    table.add_row(prettytable::row!["Figures", resolution]);
    if let Some(dir) = out_dir {
        table.add_row(prettytable::row!["Output directory", dir.display()]);
    }
    table.printstd();
}
