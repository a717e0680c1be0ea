use std::path::PathBuf;

use colored::Colorize;
use pdf::parser::layout::font_size_histogram;
use pdf::{DocumentInfo, PdfDocument, RasterOptions};
use quizpdf_core::lines::group_lines;
use quizpdf_core::segment::choose_boundaries;
use quizpdf_core::starts::detect_starts;
use quizpdf_core::{DocumentSource, Line, PageSource, SegmenterConfig};

use crate::prelude::{println, *};
use crate::settings::{print_settings, SegmenterArgs};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct InspectOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Only inspect this page (1-based)
    #[arg(short, long)]
    pub page: Option<usize>,

    #[clap(flatten)]
    pub segmenter: SegmenterArgs,
}

/// How segmentation saw one line of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct LineReport {
    pub index: usize,
    pub top: f64,
    pub text: String,
    /// Parsed number when the line is a start candidate.
    pub number: Option<u32>,
    pub bold: bool,
    /// Chosen as a question boundary.
    pub boundary: bool,
}

/// Classify every line of a page the way the segmenter does.
pub fn classify_lines(lines: &[Line], config: &SegmenterConfig) -> Vec<LineReport> {
    let starts = detect_starts(lines, config);
    let boundaries = choose_boundaries(&starts);

    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let start = starts.iter().find(|s| s.line_index == index);
            LineReport {
                index,
                top: line.bbox.top,
                text: line.text.clone(),
                number: start.map(|s| s.number),
                bold: start.is_some_and(|s| s.is_bold),
                boundary: boundaries.contains(&index),
            }
        })
        .collect()
}

/// One-line description of the document from its Info dictionary.
pub fn document_summary(name: &str, info: &DocumentInfo) -> String {
    let mut summary = match &info.title {
        Some(title) if !title.trim().is_empty() => f!("{} \"{}\"", name, title.trim()),
        _ => name.to_string(),
    };
    if let Some(author) = info.author.as_deref().filter(|a| !a.trim().is_empty()) {
        summary.push_str(&f!(" by {}", author.trim()));
    }
    let plural = if info.page_count == 1 { "" } else { "s" };
    summary.push_str(&f!(", {} page{}", info.page_count, plural));
    summary
}

pub fn run(options: InspectOptions, global: crate::Global) -> Result<()> {
    let config = options.segmenter.load()?;
    let raster = RasterOptions::default();

    if global.verbose {
        print_settings(&config, &raster, None);
    }

    let doc = PdfDocument::open(&options.path, raster)
        .wrap_err_with(|| f!("Failed to open {}", options.path.display()))?;

    let name = options
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| options.path.display().to_string());
    println!("{}", document_summary(&name, &doc.info()).bold());

    let pages = match options.page {
        Some(n) => vec![n],
        None => doc.page_numbers(),
    };

    for number in pages {
        let page = match doc.load_page(number) {
            Ok(page) => page,
            Err(e) if options.page.is_some() => {
                return Err(eyre!("Failed to decode page {}: {}", number, e));
            }
            Err(e) => {
                warning(f!("page {} skipped: {}", number, e));
                continue;
            }
        };

        print_page(&page, &config);
    }

    Ok(())
}

fn print_page(page: &pdf::PdfPage<'_>, config: &SegmenterConfig) {
    let lines = group_lines(page.characters(), config.line_quantum);
    let reports = classify_lines(&lines, config);
    let boundaries = reports.iter().filter(|r| r.boundary).count();
    let media_box = &page.layout().media_box;

    println!(
        "\n{} {} ({:.0}x{:.0} pt, {} lines, {} questions, {} images)",
        "Page".cyan().bold(),
        page.number().to_string().cyan().bold(),
        media_box.width(),
        media_box.height(),
        lines.len(),
        boundaries,
        page.image_regions().len()
    );

    let sizes = font_size_histogram(&page.layout().glyphs)
        .iter()
        .map(|(size, count)| f!("{:.1}pt x{}", size, count))
        .collect::<Vec<_>>()
        .join(", ");
    if !sizes.is_empty() {
        println!("Font sizes: {}", sizes);
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["Line", "Top", "Start", "Bold", "Text"]);

    for report in &reports {
        let start = match (report.number, report.boundary) {
            (Some(n), true) => f!("Q{}", n).green().bold().to_string(),
            (Some(n), false) => f!("({})", n).yellow().to_string(),
            (None, _) => String::new(),
        };
        let bold = if report.bold { "yes".bold().to_string() } else { String::new() };

        table.add_row(prettytable::row![
            report.index,
            f!("{:.1}", report.top),
            start,
            bold,
            report.text
        ]);
    }
    table.printstd();

    for (index, region) in page.image_regions().iter().enumerate() {
        println!("  image {} {} at {}", index, region.name.magenta(), region.bbox);
    }
}

#[cfg(test)]
mod tests {
    use quizpdf_core::{BBox, Character};

    use super::*;

    fn line(text: &str, top: f64, digit_font: &str) -> Line {
        let chars: Vec<Character> = text
            .chars()
            .enumerate()
            .map(|(i, c)| Character {
                text: c.to_string(),
                bbox: BBox::new(72.0 + i as f64 * 6.0, top, 78.0 + i as f64 * 6.0, top + 12.0),
                font_name: if c.is_ascii_digit() {
                    digit_font.to_string()
                } else {
                    "Helvetica".to_string()
                },
                font_size: 12.0,
            })
            .collect();
        group_lines(&chars, 1.0).remove(0)
    }

    #[test]
    fn test_classify_marks_bold_boundaries_only() {
        let lines = vec![
            line("1. Which option?", 100.0, "Helvetica-Bold"),
            line("2) an option", 115.0, "Helvetica"),
            line("plain text", 130.0, "Helvetica"),
            line("3. Next", 145.0, "Arial-BoldMT"),
        ];

        let reports = classify_lines(&lines, &SegmenterConfig::default());

        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].number, Some(1));
        assert!(reports[0].bold && reports[0].boundary);
        assert_eq!(reports[1].number, Some(2));
        assert!(!reports[1].bold && !reports[1].boundary);
        assert_eq!(reports[2].number, None);
        assert!(reports[3].boundary);
        assert_eq!(reports[3].top, 145.0);
    }

    #[test]
    fn test_classify_without_bold_uses_every_start() {
        let lines = vec![
            line("1. First", 100.0, "Helvetica"),
            line("2. Second", 115.0, "Helvetica"),
        ];

        let reports = classify_lines(&lines, &SegmenterConfig::default());
        assert!(reports.iter().all(|r| r.boundary));
    }

    #[test]
    fn test_document_summary() {
        let info = DocumentInfo {
            title: Some("Unit 3 Quiz".to_string()),
            author: Some("Physics Dept".to_string()),
            creator: None,
            page_count: 4,
        };
        assert_eq!(
            document_summary("exam.pdf", &info),
            "exam.pdf \"Unit 3 Quiz\" by Physics Dept, 4 pages"
        );

        let bare = DocumentInfo {
            title: Some("  ".to_string()),
            author: None,
            creator: None,
            page_count: 1,
        };
        assert_eq!(document_summary("exam.pdf", &bare), "exam.pdf, 1 page");
    }

    #[test]
    fn test_classify_empty_page() {
        assert!(classify_lines(&[], &SegmenterConfig::default()).is_empty());
    }
}
