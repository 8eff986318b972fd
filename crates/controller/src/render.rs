//! Rendering decoded replies.
//!
//! [`render`] maps each response shape to exactly one sink call. Two sinks
//! ship with the crate: [`TextSink`] for terminals and [`ViewSink`], which
//! collects serializable blocks for a web front end.

use std::io::Write;

use csv_agent_core::{AgentResponse, CellValue, RenderSink, Result};
use serde::{Deserialize, Serialize};

/// Width of the longest bar drawn by [`TextSink`].
const BAR_WIDTH: usize = 40;
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Send a decoded reply to a sink.
pub fn render(response: &AgentResponse, sink: &mut dyn RenderSink) -> Result<()> {
    match response {
        AgentResponse::Answer { text } => sink.show_text(text),
        AgentResponse::Table { columns, rows } => sink.show_table(columns, rows),
        AgentResponse::BarSeries { categories, values } => sink.show_bar_chart(categories, values),
        AgentResponse::LineSeries { categories, values } => {
            sink.show_line_chart(categories, values)
        }
    }
}

// =============================================================================
// View Sink
// =============================================================================

/// One rendered block, in a form a browser can draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewBlock {
    Text {
        text: String,
    },
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    },
    BarChart {
        categories: Vec<String>,
        values: Vec<f64>,
    },
    LineChart {
        categories: Vec<String>,
        values: Vec<f64>,
    },
}

/// Collects [`ViewBlock`]s.
#[derive(Debug, Default)]
pub struct ViewSink {
    blocks: Vec<ViewBlock>,
}

impl ViewSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[ViewBlock] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<ViewBlock> {
        self.blocks
    }
}

impl RenderSink for ViewSink {
    fn show_text(&mut self, text: &str) -> Result<()> {
        self.blocks.push(ViewBlock::Text {
            text: text.to_string(),
        });
        Ok(())
    }

    fn show_table(&mut self, columns: &[String], rows: &[Vec<CellValue>]) -> Result<()> {
        self.blocks.push(ViewBlock::Table {
            columns: columns.to_vec(),
            rows: rows.to_vec(),
        });
        Ok(())
    }

    fn show_bar_chart(&mut self, categories: &[String], values: &[f64]) -> Result<()> {
        self.blocks.push(ViewBlock::BarChart {
            categories: categories.to_vec(),
            values: values.to_vec(),
        });
        Ok(())
    }

    fn show_line_chart(&mut self, categories: &[String], values: &[f64]) -> Result<()> {
        self.blocks.push(ViewBlock::LineChart {
            categories: categories.to_vec(),
            values: values.to_vec(),
        });
        Ok(())
    }
}

// =============================================================================
// Text Sink
// =============================================================================

/// Plain-text renderer for terminals.
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_labeled(&mut self, categories: &[String], suffixes: Vec<String>) -> Result<()> {
        let label_width = categories.iter().map(|c| width(c)).max().unwrap_or(0);
        for (category, suffix) in categories.iter().zip(suffixes) {
            writeln!(self.out, "{} | {}", pad(category, label_width), suffix)?;
        }
        Ok(())
    }
}

impl<W: Write> RenderSink for TextSink<W> {
    fn show_text(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    fn show_table(&mut self, columns: &[String], rows: &[Vec<CellValue>]) -> Result<()> {
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(CellValue::display).collect())
            .collect();

        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                cells
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|c| width(c))
                    .fold(width(col), usize::max)
            })
            .collect();

        let header: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| pad(c, *w))
            .collect();
        writeln!(self.out, "{}", header.join(" | ").trim_end())?;

        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(self.out, "{}", rule.join("-+-"))?;

        for row in &cells {
            let line: Vec<String> = row.iter().zip(&widths).map(|(c, w)| pad(c, *w)).collect();
            writeln!(self.out, "{}", line.join(" | ").trim_end())?;
        }
        Ok(())
    }

    fn show_bar_chart(&mut self, categories: &[String], values: &[f64]) -> Result<()> {
        if categories.is_empty() {
            writeln!(self.out, "(no data)")?;
            return Ok(());
        }
        let max = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let bars = values
            .iter()
            .map(|v| {
                let len = if max > 0.0 {
                    ((v.abs() / max) * BAR_WIDTH as f64).round() as usize
                } else {
                    0
                };
                let sign = if *v < 0.0 { "-" } else { "" };
                format!("{sign}{} {}", "█".repeat(len), format_number(*v))
            })
            .collect();
        self.write_labeled(categories, bars)
    }

    fn show_line_chart(&mut self, categories: &[String], values: &[f64]) -> Result<()> {
        if categories.is_empty() {
            writeln!(self.out, "(no data)")?;
            return Ok(());
        }
        writeln!(self.out, "{}", sparkline(values))?;
        self.write_labeled(categories, values.iter().map(|v| format_number(*v)).collect())
    }
}

fn width(s: &str) -> usize {
    s.chars().count()
}

fn pad(s: &str, to: usize) -> String {
    format!("{s}{}", " ".repeat(to.saturating_sub(width(s))))
}

/// Integers print without a fractional part.
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn sparkline(values: &[f64]) -> String {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let span = max - min;
    values
        .iter()
        .map(|v| {
            let level = if span > 0.0 {
                (((v - min) / span) * (SPARK_LEVELS.len() - 1) as f64).round() as usize
            } else {
                0
            };
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect()
}
