use crate::prelude::*;
use clap::Parser;

mod error;
mod extract;
mod inspect;
mod prelude;
mod settings;
mod store;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Split quiz PDFs into numbered questions and the figures that belong to them"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "QUIZPDF_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Extract questions and their figures from a PDF
    Extract(crate::extract::ExtractOptions),

    /// Show how each page's lines are classified
    Inspect(crate::inspect::InspectOptions),
}

fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Extract(options) => crate::extract::run(options, app.global),
        SubCommands::Inspect(options) => crate::inspect::run(options, app.global),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        App::command().debug_assert();
    }

    #[test]
    fn test_extract_defaults() {
        let app = App::try_parse_from(["quizpdf", "extract", "exam.pdf"]).unwrap();
        let SubCommands::Extract(options) = app.command else {
            panic!("expected extract");
        };
        assert_eq!(options.path, std::path::PathBuf::from("exam.pdf"));
        assert_eq!(options.format, crate::extract::OutputFormat::Json);
        assert!(options.segmenter.bold_hints.is_empty());
    }

    #[test]
    fn test_repeated_bold_hints() {
        let app = App::try_parse_from([
            "quizpdf",
            "extract",
            "exam.pdf",
            "--bold-hint",
            "Heavy",
            "--bold-hint",
            "Demi",
            "--format",
            "table",
        ])
        .unwrap();
        let SubCommands::Extract(options) = app.command else {
            panic!("expected extract");
        };
        assert_eq!(options.segmenter.bold_hints, vec!["Heavy", "Demi"]);
        assert_eq!(options.format, crate::extract::OutputFormat::Table);
    }

    #[test]
    fn test_dpi_and_native_conflict() {
        let result = App::try_parse_from(["quizpdf", "extract", "a.pdf", "--dpi", "150", "--native"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_dpi_rejected() {
        let result = App::try_parse_from(["quizpdf", "extract", "a.pdf", "--dpi", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_inspect_page_flag() {
        let app = App::try_parse_from(["quizpdf", "inspect", "a.pdf", "--page", "3", "--verbose"]).unwrap();
        assert!(app.global.verbose);
        let SubCommands::Inspect(options) = app.command else {
            panic!("expected inspect");
        };
        assert_eq!(options.page, Some(3));
    }
}
