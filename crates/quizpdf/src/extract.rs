use std::ops::ControlFlow;
use std::path::PathBuf;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use pdf::PdfDocument;
use quizpdf_core::walker::PageProgress;
use quizpdf_core::{Extraction, QuestionBlock, WalkError, Walker};

use crate::prelude::{eprintln, println, *};
use crate::settings::{print_settings, RasterArgs, SegmenterArgs};
use crate::store::PngDirectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
pub enum OutputFormat {
    /// Pretty-printed JSON array of questions
    Json,
    /// One row per question
    Table,
}

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct ExtractOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Directory the figure PNGs are written to
    #[arg(short, long, env = "QUIZPDF_OUT_DIR", default_value = "q_images")]
    pub out_dir: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[clap(flatten)]
    pub segmenter: SegmenterArgs,

    #[clap(flatten)]
    pub raster: RasterArgs,
}

pub fn run(options: ExtractOptions, global: crate::Global) -> Result<()> {
    let config = options.segmenter.load()?;
    let raster = options.raster.options();

    if global.verbose {
        print_settings(&config, &raster, Some(&options.out_dir));
    }

    let doc = PdfDocument::open(&options.path, raster)
        .wrap_err_with(|| f!("Failed to open {}", options.path.display()))?;
    let mut store = PngDirectory::create(&options.out_dir)?;

    let progress = progress_bar(doc.page_count())?;
    let result = Walker::new(&config).walk_with_progress(&doc, &mut store, |p| {
        report_progress(&progress, p);
        ControlFlow::Continue(())
    });
    progress.finish_and_clear();

    let extraction = result.map_err(|e| match e {
        WalkError::NoQuestionsFound => Error::NoQuestionsFound(options.path.display().to_string()),
    })?;

    report_problems(&extraction);

    if global.verbose {
        eprintln!(
            "{} {} questions, {} figures written to {}",
            "Extracted".green().bold(),
            extraction.blocks.len(),
            store.written(),
            store.dir().display()
        );
    }

    match options.format {
        OutputFormat::Json => println!("{}", format_blocks_json(&extraction.blocks)?),
        OutputFormat::Table => output_table(&extraction),
    }

    Ok(())
}

fn progress_bar(pages: usize) -> Result<ProgressBar> {
    if pages <= 1 {
        return Ok(ProgressBar::hidden());
    }

    let progress = ProgressBar::new(pages as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] page {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    progress.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(progress)
}

fn report_progress(progress: &ProgressBar, page: &PageProgress) {
    progress.set_position(page.position as u64);
    progress.set_message(f!("{} questions", page.blocks));
}

/// Warn about pages and figures that could not be extracted.
fn report_problems(extraction: &Extraction) {
    for skipped in &extraction.skipped_pages {
        warning(f!("page {} skipped: {}", skipped.page, skipped.reason));
    }
    for failure in &extraction.figure_failures {
        warning(failure);
    }
    if extraction.used_fallback {
        eprintln!(
            "{} no numbered lines found in the page layout; questions were split from plain text and carry no figures",
            "note:".cyan().bold()
        );
    }
}

/// Serialize blocks as the pretty JSON array printed by `extract`.
pub fn format_blocks_json(blocks: &[QuestionBlock]) -> Result<String> {
    serde_json::to_string_pretty(blocks).map_err(|e| eyre!("JSON serialization failed: {}", e))
}

fn output_table(extraction: &Extraction) {
    let mut table = new_table();
    table.add_row(prettytable::row!["#", "Page", "Question", "Figures"]);

    for block in &extraction.blocks {
        let number = block
            .number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        let page = block
            .page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let figures = block
            .figures
            .iter()
            .map(|fig| fig.path.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");

        table.add_row(prettytable::row![
            number.yellow().bold(),
            page,
            first_line(&block.text, 60),
            figures
        ]);
    }

    table.printstd();
}

/// First line of `text`, cut to at most `max` characters.
fn first_line(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max {
        return line.to_string();
    }
    let cut: String = line.chars().take(max.saturating_sub(3)).collect();
    f!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use quizpdf_core::{BBox, Figure};

    use super::*;

    fn block(number: Option<u32>, figures: Vec<&str>) -> QuestionBlock {
        QuestionBlock {
            number,
            text: "1. What is 2+2?\n(A) 3 (B) 4".to_string(),
            page: Some(1),
            bounding_box: Some(BBox::new(72.0, 80.0, 300.0, 130.0)),
            figures: figures
                .into_iter()
                .enumerate()
                .map(|(i, p)| Figure {
                    path: PathBuf::from(p),
                    region_index: i,
                    region: BBox::new(100.0, 90.0, 200.0, 120.0),
                })
                .collect(),
        }
    }

    #[test]
    fn test_json_shape() {
        let json = format_blocks_json(&[block(Some(1), vec!["q_images/p1_q0_img0.png"])]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let first = &value[0];
        assert_eq!(first["number"], 1);
        assert_eq!(first["page"], 1);
        assert_eq!(first["text"], "1. What is 2+2?\n(A) 3 (B) 4");
        assert_eq!(first["boundingBox"][0], 72.0);
        assert_eq!(first["boundingBox"][3], 130.0);
        assert_eq!(first["figures"][0], "q_images/p1_q0_img0.png");
    }

    #[test]
    fn test_json_fallback_block_has_nulls() {
        let fallback = QuestionBlock {
            number: None,
            text: "Instructions".to_string(),
            page: None,
            bounding_box: None,
            figures: vec![],
        };
        let json = format_blocks_json(&[fallback]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value[0]["number"].is_null());
        assert!(value[0]["page"].is_null());
        assert!(value[0]["boundingBox"].is_null());
        assert_eq!(value[0]["figures"], serde_json::json!([]));
    }

    #[test]
    fn test_first_line_truncates() {
        assert_eq!(first_line("short\nsecond", 60), "short");
        assert_eq!(first_line("abcdefghij", 8), "abcde...");
        assert_eq!(first_line("", 8), "");
    }

    #[test]
    fn test_hidden_progress_for_single_page() {
        assert!(progress_bar(1).unwrap().is_hidden());
    }
}
