use owo_colors::OwoColorize;
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::scoring::advice::POPULATION_AVERAGE_RISK;
use crate::scoring::{NoteSeverity, RiskFactor, RiskResult, RiskTier};

/// Widest factor bar, in characters
const MAX_BAR_WIDTH: usize = 24;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a percentage with one decimal; a trailing asterisk marks a
/// clinical request that was scored with screening rules.
pub fn format_percentage(percentage: f64, degraded: bool) -> String {
    let formatted = format!("{:.1}%", percentage);
    if degraded {
        format!("{}*", formatted)
    } else {
        formatted
    }
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate text to fit available width, accounting for Unicode
fn truncate_text(text: &str, max_width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_width {
        text.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

fn paint_tier(text: &str, tier: RiskTier, use_colors: bool) -> String {
    if !use_colors {
        return text.to_string();
    }
    match tier {
        RiskTier::Low => text.green().bold().to_string(),
        RiskTier::Moderate => text.yellow().bold().to_string(),
        RiskTier::High => text.red().bold().to_string(),
        RiskTier::Critical => text.bright_red().bold().reversed().to_string(),
    }
}

/// Bar proportional to the largest contribution
fn factor_bar(contribution: f64, largest: f64, width: usize) -> String {
    if largest <= 0.0 || width == 0 {
        return String::new();
    }
    let filled = ((contribution / largest) * width as f64).round() as usize;
    "█".repeat(filled.clamp(1, width))
}

/// Format the top factors as an indexed bar chart.
/// Index column: 3 chars (fits "99."), right-aligned
/// Name column: 20 chars, points right-aligned in 6
pub fn format_factors(factors: &[RiskFactor], use_colors: bool) -> String {
    if factors.is_empty() {
        return "No risk factors contributed to this score.".to_string();
    }

    let name_width = 20;
    let points_width = 6;
    let separator = "  ";
    let largest = factors
        .iter()
        .map(|f| f.contribution)
        .fold(0.0_f64, f64::max);

    let term_width = get_terminal_width();
    let fixed_width = 3 + 1 + name_width + points_width + separator.len() * 3;
    let bar_width = match term_width {
        Some(width) if width > fixed_width + MAX_BAR_WIDTH + 10 => MAX_BAR_WIDTH,
        Some(width) if width > fixed_width + 10 => (width - fixed_width - 10).min(MAX_BAR_WIDTH),
        Some(_) => 0,
        None => MAX_BAR_WIDTH,
    };

    factors
        .iter()
        .enumerate()
        .map(|(idx, factor)| {
            let index_str = format!("{:>2}.", idx + 1);
            let name = format!("{:<width$}", factor.factor.to_string(), width = name_width);
            let points = format!("{:>width$.1}", factor.contribution, width = points_width);
            let bar = format!(
                "{:<width$}",
                factor_bar(factor.contribution, largest, bar_width),
                width = bar_width
            );

            let detail = match term_width {
                Some(width) if width > fixed_width + bar_width + 10 => {
                    truncate_text(&factor.detail, width - fixed_width - bar_width)
                }
                Some(_) => truncate_text(&factor.detail, 20),
                // No terminal (pipe), don't truncate
                None => factor.detail.clone(),
            };

            if use_colors {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    index_str.dimmed(),
                    name.bold(),
                    separator,
                    points,
                    separator,
                    bar.cyan(),
                    separator,
                    detail.dimmed()
                )
            } else {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    index_str, name, separator, points, separator, bar, separator, detail
                )
            }
        })
        .map(|line| line.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a full assessment for the terminal.
pub fn format_result(result: &RiskResult, top: usize, use_colors: bool) -> String {
    let mut lines = Vec::new();

    let headline = format!(
        "Diabetes risk: {}  {} RISK",
        format_percentage(result.percentage, result.is_degraded()),
        result.tier
    );
    lines.push(paint_tier(&headline, result.tier, use_colors));
    lines.push(format!(
        "  Assessment: {} | Confidence: {}",
        result.assessment,
        result.assessment.confidence()
    ));
    lines.push(format!(
        "  {:.1}x the population average of {}%",
        result.relative_to_average(),
        POPULATION_AVERAGE_RISK
    ));
    lines.push(format!(
        "  BMI: {:.1} kg/m² ({})",
        result.bmi, result.bmi_category
    ));

    if result.is_degraded() {
        let missing = result
            .missing_labs
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "  * Lab panel incomplete (missing {}); screening rules were used.",
            missing
        ));
    }

    lines.push(String::new());
    lines.push(section("Key risk factors", use_colors));
    lines.push(format_factors(result.top_factors(top), use_colors));

    if !result.clinical_notes.is_empty() {
        lines.push(String::new());
        lines.push(section("Clinical interpretation", use_colors));
        for note in &result.clinical_notes {
            let line = match note.severity {
                NoteSeverity::Critical => format!("  ! CRITICAL: {}", note.message),
                NoteSeverity::Warning => format!("  ! {}", note.message),
            };
            if use_colors && note.severity == NoteSeverity::Critical {
                lines.push(line.red().to_string());
            } else if use_colors {
                lines.push(line.yellow().to_string());
            } else {
                lines.push(line);
            }
        }
    }

    lines.push(String::new());
    lines.push(section("Recommendations", use_colors));
    for rec in &result.recommendations {
        lines.push(format!("  - {}", rec));
    }

    lines.push(String::new());
    lines.push(
        "This is a risk estimate, not a diagnosis. Only a licensed healthcare provider can diagnose diabetes."
            .to_string(),
    );

    lines.join("\n")
}

fn section(title: &str, use_colors: bool) -> String {
    if use_colors {
        title.bold().underline().to_string()
    } else {
        title.to_string()
    }
}

/// Format an assessment as one tab-separated line for scripting
/// Columns: percentage, tier, assessment, raw score, top factors (comma separated)
/// No headers, no colors
pub fn format_tsv(result: &RiskResult, top: usize) -> String {
    let factors = result
        .top_factors(top)
        .iter()
        .map(|f| f.factor.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{:.1}\t{}\t{}\t{:.2}\t{}",
        result.percentage,
        result.tier.to_string().to_lowercase(),
        result.assessment.to_string().to_lowercase(),
        result.raw_score,
        factors
    )
}

pub fn format_json(result: &RiskResult) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}
