use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fmt::Display;
use std::io::{BufRead, Write};

use crate::profile::units::{
    cm_to_inches, feet_inches_to_cm, inches_to_cm, kg_to_pounds, pounds_to_kg,
};
use crate::profile::validation::{
    lab_range, AGE_RANGE, HEIGHT_CM_RANGE, WAIST_CM_RANGE, WEIGHT_KG_RANGE,
};
use crate::profile::{ActivityLevel, Ethnicity, LabField, LabValues, PatientProfile, Sex};

/// Answers collected by the questionnaire.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewAnswers {
    pub profile: PatientProfile,
    /// None for a screening assessment
    pub labs: Option<LabValues>,
}

/// Line-oriented prompts over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Prompt user with a message and return their trimmed input.
    fn prompt(&mut self, message: &str) -> Result<String> {
        write!(self.output, "{}", message).context("Failed to write prompt")?;
        self.output.flush().context("Failed to flush output")?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read input")?;
        if read == 0 {
            anyhow::bail!("Input ended before the questionnaire was finished");
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text).context("Failed to write output")
    }

    /// Prompt with a default value. Returns default if input is empty.
    fn prompt_with_default(&mut self, message: &str, default: &str) -> Result<String> {
        let input = self.prompt(&format!("{} [{}]: ", message, default))?;
        if input.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(input)
        }
    }

    /// Prompt with a yes/no question. Returns bool based on input and default.
    pub fn prompt_yes_no(&mut self, message: &str, default_yes: bool) -> Result<bool> {
        let hint = if default_yes { "Y/n" } else { "y/N" };
        loop {
            let input = self.prompt(&format!("{} [{}]: ", message, hint))?;
            match input.to_lowercase().as_str() {
                "" => return Ok(default_yes),
                "y" | "yes" => return Ok(true),
                "n" | "no" | "unknown" => return Ok(false),
                _ => self.say("  Invalid: answer y or n. Try again.")?,
            }
        }
    }

    /// Prompt for a number inside `[min, max]`, asking again until one is given.
    pub fn prompt_number(
        &mut self,
        message: &str,
        default: f64,
        (min, max): (f64, f64),
    ) -> Result<f64> {
        loop {
            let input = self.prompt_with_default(message, &default.to_string())?;
            match parse_number(&input, min, max) {
                Ok(v) => return Ok(v),
                Err(e) => self.say(&format!("  Invalid: {}. Try again.", e))?,
            }
        }
    }

    /// Like [`Self::prompt_number`], but 0 or an empty answer skips the value.
    pub fn prompt_optional_number(
        &mut self,
        message: &str,
        (min, max): (f64, f64),
    ) -> Result<Option<f64>> {
        loop {
            let input = self.prompt_with_default(&format!("{} (0 to skip)", message), "0")?;
            if input.parse::<f64>() == Ok(0.0) {
                return Ok(None);
            }
            match parse_number(&input, min, max) {
                Ok(v) => return Ok(Some(v)),
                Err(e) => self.say(&format!("  Invalid: {}. Try again.", e))?,
            }
        }
    }

    /// Prompt for one of an enum's values, by number or by name.
    pub fn prompt_choice<T>(&mut self, message: &str, default: T) -> Result<T>
    where
        T: ValueEnum + Display + Copy + PartialEq,
    {
        let variants = T::value_variants();
        self.say(message)?;
        for (idx, variant) in variants.iter().enumerate() {
            self.say(&format!("  {}. {}", idx + 1, variant))?;
        }
        let default_idx = variants.iter().position(|v| *v == default).unwrap_or(0) + 1;

        loop {
            let input = self.prompt_with_default("Choice", &default_idx.to_string())?;
            match parse_choice(&input, variants) {
                Some(choice) => return Ok(choice),
                None => self.say(&format!(
                    "  Invalid: enter a number from 1 to {}. Try again.",
                    variants.len()
                ))?,
            }
        }
    }
}

/// Parse a finite number inside `[min, max]`.
fn parse_number(input: &str, min: f64, max: f64) -> Result<f64, String> {
    let value: f64 = input
        .parse()
        .map_err(|_| format!("'{}' is not a number", input))?;
    if !value.is_finite() || value < min || value > max {
        return Err(format!("must be between {} and {}", min, max));
    }
    Ok(value)
}

/// Convert a metric range for an imperial prompt, rounded inward to 0.1 so
/// every accepted answer converts back inside the metric range.
fn imperial_range((min, max): (f64, f64), convert: fn(f64) -> f64) -> (f64, f64) {
    (
        (convert(min) * 10.0).ceil() / 10.0,
        (convert(max) * 10.0).floor() / 10.0,
    )
}

fn parse_choice<T: ValueEnum + Copy>(input: &str, variants: &[T]) -> Option<T> {
    if let Ok(idx) = input.parse::<usize>() {
        return idx.checked_sub(1).and_then(|i| variants.get(i)).copied();
    }
    T::from_str(input, true).ok()
}

/// Run the questionnaire. Defaults follow a typical adult: 45 years,
/// 5'8", 180 lb, and a normal lab panel.
pub fn run_interview<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
) -> Result<InterviewAnswers> {
    prompter.say("Diabetes risk questionnaire")?;
    prompter.say("Press Enter to accept the value in brackets.")?;
    prompter.say("")?;

    let clinical = prompter.prompt_yes_no(
        "Do you have recent lab results (clinical assessment)?",
        false,
    )?;

    let age = prompter.prompt_number("Age (years)", 45.0, AGE_RANGE)?;
    let sex = prompter.prompt_choice("Sex", Sex::Male)?;
    let ethnicity = prompter.prompt_choice("Race/ethnicity", Ethnicity::NonHispanicWhite)?;

    prompter.say("")?;
    let imperial =
        prompter.prompt_yes_no("Enter body measurements in feet/inches and pounds?", true)?;
    let (height_cm, weight_kg, waist_cm) = if imperial {
        let height_cm = loop {
            let feet = prompter.prompt_number("Height (feet)", 5.0, (3.0, 8.0))?;
            let inches = prompter.prompt_number("Height (inches)", 8.0, (0.0, 11.99))?;
            let cm = feet_inches_to_cm(feet, inches);
            let (min, max) = HEIGHT_CM_RANGE;
            if (min..=max).contains(&cm) {
                break cm;
            }
            prompter.say(&format!(
                "  Invalid: {}'{}\" is outside {:.1}-{:.1} in. Try again.",
                feet,
                inches,
                cm_to_inches(min),
                cm_to_inches(max)
            ))?;
        };
        let pounds = prompter.prompt_number(
            "Weight (pounds)",
            180.0,
            imperial_range(WEIGHT_KG_RANGE, kg_to_pounds),
        )?;
        let waist = prompter.prompt_optional_number(
            "Waist circumference (inches)",
            imperial_range(WAIST_CM_RANGE, cm_to_inches),
        )?;
        (height_cm, pounds_to_kg(pounds), waist.map(inches_to_cm))
    } else {
        let height = prompter.prompt_number("Height (cm)", 173.0, HEIGHT_CM_RANGE)?;
        let weight = prompter.prompt_number("Weight (kg)", 82.0, WEIGHT_KG_RANGE)?;
        let waist = prompter.prompt_optional_number("Waist circumference (cm)", WAIST_CM_RANGE)?;
        (height, weight, waist)
    };

    prompter.say("")?;
    let family_history = prompter.prompt_yes_no(
        "Parent, sibling or child with diabetes? (unknown counts as no)",
        false,
    )?;
    let hypertension = prompter.prompt_yes_no("Diagnosed with high blood pressure?", false)?;
    let activity = prompter.prompt_choice(
        "Physical activity (sedentary <30, light 30-150, moderate 150-300, active >300 min/week)",
        ActivityLevel::Sedentary,
    )?;

    let mut profile = PatientProfile::new(age, sex, height_cm, weight_kg, activity)
        .with_family_history(family_history)
        .with_hypertension(hypertension)
        .with_ethnicity(ethnicity);
    if let Some(waist) = waist_cm {
        profile = profile.with_waist_cm(waist);
    }

    let labs = if clinical {
        prompter.say("")?;
        prompter.say("Laboratory values (within the past 3 months)")?;
        let mut labs = LabValues::default();
        for (field, default) in [
            (LabField::FastingGlucose, 95.0),
            (LabField::Hba1c, 5.4),
            (LabField::Triglycerides, 150.0),
            (LabField::Hdl, 50.0),
            (LabField::SystolicBp, 120.0),
        ] {
            let message = format!("{} ({})", capitalize(&field.to_string()), field.unit());
            let value = prompter.prompt_number(&message, default, lab_range(field))?;
            set_lab(&mut labs, field, value);
        }
        Some(labs)
    } else {
        None
    };

    Ok(InterviewAnswers { profile, labs })
}

/// Run the questionnaire on the terminal.
pub fn run_interview_stdio() -> Result<InterviewAnswers> {
    let stdin = std::io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), std::io::stdout());
    run_interview(&mut prompter)
}

fn set_lab(labs: &mut LabValues, field: LabField, value: f64) {
    let slot = match field {
        LabField::FastingGlucose => &mut labs.fasting_glucose,
        LabField::Hba1c => &mut labs.hba1c,
        LabField::Triglycerides => &mut labs.triglycerides,
        LabField::Hdl => &mut labs.hdl,
        LabField::SystolicBp => &mut labs.systolic_bp,
    };
    *slot = Some(value);
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
